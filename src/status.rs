//! Contributor eligibility states and the award-page gate.
//!
//! A contributor only ever moves forward: unseen -> invited -> authorized ->
//! awarded. The raw ordinals (0-3) exist solely at the storage edge and on the
//! status surface; everything in between works on the closed enum.

use serde::{Deserialize, Serialize};

/// Eligibility of a single contributor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityStatus {
    /// No record: the contributor never triggered a qualifying event.
    Unknown,
    /// Record exists, not yet authenticated.
    Invited,
    /// Authenticated, has not yet submitted.
    Authorized,
    /// Submission accepted. Terminal.
    Awarded,
}

impl EligibilityStatus {
    /// Ordinal used in the database and on the status surface.
    pub fn as_ordinal(self) -> u8 {
        match self {
            EligibilityStatus::Unknown => 0,
            EligibilityStatus::Invited => 1,
            EligibilityStatus::Authorized => 2,
            EligibilityStatus::Awarded => 3,
        }
    }

    /// Inverse of [`as_ordinal`](Self::as_ordinal); `None` for anything outside 0-3.
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(EligibilityStatus::Unknown),
            1 => Some(EligibilityStatus::Invited),
            2 => Some(EligibilityStatus::Authorized),
            3 => Some(EligibilityStatus::Awarded),
            _ => None,
        }
    }
}

/// What the award page should do for a contributor in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardDecision {
    /// No record of this contributor; reject.
    NoRecord,
    /// First visit after the invitation: durably mark authorized, then show the form.
    PromoteAndShowForm,
    /// Already authorized; show the form.
    ShowForm,
    /// Already awarded; the form is never shown again.
    AlreadyAwarded,
}

/// Pure mapping from stored status to award-page behavior.
///
/// `Invited` and `Authorized` both lead to the submission form; the distinction
/// exists only so the one-time promotion to `Authorized` happens exactly once.
pub fn decide_award(status: EligibilityStatus) -> AwardDecision {
    match status {
        EligibilityStatus::Unknown => AwardDecision::NoRecord,
        EligibilityStatus::Invited => AwardDecision::PromoteAndShowForm,
        EligibilityStatus::Authorized => AwardDecision::ShowForm,
        EligibilityStatus::Awarded => AwardDecision::AlreadyAwarded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_round_trip() {
        for status in [
            EligibilityStatus::Unknown,
            EligibilityStatus::Invited,
            EligibilityStatus::Authorized,
            EligibilityStatus::Awarded,
        ] {
            assert_eq!(
                EligibilityStatus::from_ordinal(status.as_ordinal()),
                Some(status)
            );
        }
        assert_eq!(EligibilityStatus::from_ordinal(4), None);
        assert_eq!(EligibilityStatus::from_ordinal(255), None);
    }

    #[test]
    fn test_states_are_ordered() {
        assert!(EligibilityStatus::Unknown < EligibilityStatus::Invited);
        assert!(EligibilityStatus::Invited < EligibilityStatus::Authorized);
        assert!(EligibilityStatus::Authorized < EligibilityStatus::Awarded);
    }

    #[test]
    fn test_award_decisions() {
        assert_eq!(
            decide_award(EligibilityStatus::Unknown),
            AwardDecision::NoRecord
        );
        assert_eq!(
            decide_award(EligibilityStatus::Invited),
            AwardDecision::PromoteAndShowForm
        );
        assert_eq!(
            decide_award(EligibilityStatus::Authorized),
            AwardDecision::ShowForm
        );
        assert_eq!(
            decide_award(EligibilityStatus::Awarded),
            AwardDecision::AlreadyAwarded
        );
    }
}
