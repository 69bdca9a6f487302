//! Typed decode of inbound GitHub webhook payloads.
//!
//! The webhook body is form-encoded with the event JSON under a `payload` key.
//! Decoding happens once, at the boundary, into the few fields this service
//! consumes; anything that does not fit is one structured malformed-payload
//! error rather than a scatter of lookup failures.

use serde::Deserialize;
use thiserror::Error;

/// The only event kind this service processes.
pub const PULL_REQUEST_EVENT: &str = "pull_request";

#[derive(Debug, Error)]
pub enum PayloadError {
    /// The form body had no `payload` field.
    #[error("webhook form body is missing the payload field")]
    MissingPayload,

    /// The payload was not the JSON shape of a pull request event.
    #[error("malformed pull request payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A pull request event, reduced to the fields the eligibility filter reads.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub pull_request: PullRequest,
    pub repository: Repository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    /// GitHub sends `merged: false` for closes without a merge; treat an
    /// absent flag the same way.
    #[serde(default)]
    pub merged: bool,
    pub number: u64,
    pub user: Account,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

/// Decodes the `payload` JSON of a `pull_request` delivery.
pub fn parse_pull_request_event(raw: &str) -> Result<PullRequestEvent, PayloadError> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_merged_pull_request() {
        let raw = r#"{
            "action": "closed",
            "pull_request": {
                "number": 42,
                "merged": true,
                "user": {"login": "alice"}
            },
            "repository": {"full_name": "octocat/hello-world"}
        }"#;

        let event = parse_pull_request_event(raw).unwrap();
        assert!(event.pull_request.merged);
        assert_eq!(event.pull_request.number, 42);
        assert_eq!(event.pull_request.user.login, "alice");
        assert_eq!(event.repository.full_name, "octocat/hello-world");
    }

    #[test]
    fn test_parse_unmerged_close_and_missing_flag() {
        let closed = r#"{
            "pull_request": {
                "number": 7,
                "merged": false,
                "user": {"login": "bob"}
            },
            "repository": {"full_name": "octocat/hello-world"}
        }"#;
        assert!(!parse_pull_request_event(closed).unwrap().pull_request.merged);

        let no_flag = r#"{
            "pull_request": {
                "number": 7,
                "user": {"login": "bob"}
            },
            "repository": {"full_name": "octocat/hello-world"}
        }"#;
        assert!(!parse_pull_request_event(no_flag).unwrap().pull_request.merged);
    }

    #[test]
    fn test_parse_rejects_malformed_payloads() {
        // Not JSON at all.
        assert!(matches!(
            parse_pull_request_event("payload=true"),
            Err(PayloadError::Malformed(_))
        ));

        // JSON, but not a pull request event.
        assert!(matches!(
            parse_pull_request_event(r#"{"zen": "Design for failure."}"#),
            Err(PayloadError::Malformed(_))
        ));

        // Pull request object missing the contributor.
        assert!(matches!(
            parse_pull_request_event(
                r#"{"pull_request": {"number": 1, "merged": true},
                    "repository": {"full_name": "octocat/hello-world"}}"#
            ),
            Err(PayloadError::Malformed(_))
        ));
    }
}
