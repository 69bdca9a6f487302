//! Contributor records and their state transitions.
//!
//! The store is the only shared mutable resource in the service. Every
//! transition is a single guarded SQL write, so idempotency holds under
//! concurrent duplicate webhook deliveries and duplicate submissions without
//! any locking beyond the connection itself.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;

use crate::dispatch::Submission;
use crate::status::EligibilityStatus;

/// One contributor row.
#[derive(Debug, Clone, Serialize)]
pub struct ContributorRecord {
    pub login: String,
    pub status: EligibilityStatus,
    /// Present only once the contributor has been awarded.
    pub submission: Option<Submission>,
    pub created_at: DateTime<Utc>,
    pub awarded_at: Option<DateTime<Utc>>,
}

/// Contributor counts by status, for the stats surface.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusCounts {
    pub invited: u64,
    pub authorized: u64,
    pub awarded: u64,
}

impl StatusCounts {
    pub fn total(&self) -> u64 {
        self.invited + self.authorized + self.awarded
    }
}

pub struct ContributorStore {
    conn: Mutex<Connection>,
}

impl ContributorStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS contributors (
                login TEXT PRIMARY KEY,
                status INTEGER NOT NULL,
                name TEXT,
                address TEXT,
                email TEXT,
                size TEXT,
                created_at TEXT NOT NULL,
                awarded_at TEXT
            )",
            [],
        )?;
        Ok(())
    }

    /// Creates the record for `login` if this is the first qualifying event.
    ///
    /// Returns true iff this call created the row (the contributor was
    /// previously unknown). Concurrent duplicate deliveries race on the
    /// `INSERT OR IGNORE`, so exactly one caller sees true.
    pub fn schedule_contributor(&self, login: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "INSERT OR IGNORE INTO contributors (login, status, created_at) VALUES (?1, ?2, ?3)",
            params![
                login,
                EligibilityStatus::Invited.as_ordinal(),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(changed == 1)
    }

    /// Read-only status lookup; a missing row reads as `Unknown`.
    pub fn status_of(&self, login: &str) -> Result<EligibilityStatus> {
        let conn = self.conn.lock().unwrap();
        let ordinal: Option<u8> = conn
            .query_row(
                "SELECT status FROM contributors WHERE login = ?1",
                params![login],
                |row| row.get(0),
            )
            .optional()?;
        match ordinal {
            None => Ok(EligibilityStatus::Unknown),
            Some(n) => EligibilityStatus::from_ordinal(n)
                .ok_or_else(|| anyhow::anyhow!("contributor {} has invalid status {}", login, n)),
        }
    }

    pub fn get(&self, login: &str) -> Result<Option<ContributorRecord>> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT login, status, name, address, email, size, created_at, awarded_at
                 FROM contributors WHERE login = ?1",
                params![login],
                |row| {
                    let name: Option<String> = row.get(2)?;
                    let address: Option<String> = row.get(3)?;
                    let email: Option<String> = row.get(4)?;
                    let size: Option<String> = row.get(5)?;
                    let submission = match (name, address, email, size) {
                        (Some(name), Some(address), Some(email), Some(size)) => Some(Submission {
                            name,
                            address,
                            email,
                            size,
                        }),
                        _ => None,
                    };
                    Ok(ContributorRecord {
                        login: row.get(0)?,
                        status: EligibilityStatus::from_ordinal(row.get(1)?)
                            .unwrap_or(EligibilityStatus::Unknown),
                        submission,
                        created_at: DateTime::parse_from_rfc3339(&row.get::<_, String>(6)?)
                            .unwrap()
                            .with_timezone(&Utc),
                        awarded_at: row.get::<_, Option<String>>(7)?.map(|t| {
                            DateTime::parse_from_rfc3339(&t)
                                .unwrap()
                                .with_timezone(&Utc)
                        }),
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// One-time `Invited -> Authorized` promotion.
    ///
    /// Idempotent: re-marking an already-authorized (or awarded) contributor
    /// changes nothing and is not an error. An awarded row can never move
    /// backward because the guard only matches `Invited`.
    pub fn mark_authorized(&self, login: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE contributors SET status = ?1 WHERE login = ?2 AND status = ?3",
            params![
                EligibilityStatus::Authorized.as_ordinal(),
                login,
                EligibilityStatus::Invited.as_ordinal()
            ],
        )?;
        Ok(())
    }

    /// `Authorized -> Awarded`, accepting the submission.
    ///
    /// Returns true iff this call won the transition. The guard on
    /// `Authorized` makes the check and the award one atomic write: concurrent
    /// duplicate submissions get exactly one true, re-submission after a prior
    /// award gets false, and an uninvited or unauthenticated login gets false.
    pub fn record_submission(&self, login: &str, submission: &Submission) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE contributors
             SET status = ?1, name = ?2, address = ?3, email = ?4, size = ?5, awarded_at = ?6
             WHERE login = ?7 AND status = ?8",
            params![
                EligibilityStatus::Awarded.as_ordinal(),
                submission.name,
                submission.address,
                submission.email,
                submission.size,
                Utc::now().to_rfc3339(),
                login,
                EligibilityStatus::Authorized.as_ordinal()
            ],
        )?;
        Ok(changed == 1)
    }

    pub fn status_counts(&self) -> Result<StatusCounts> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM contributors GROUP BY status")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, u8>(0)?, row.get::<_, u64>(1)?)))?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let (ordinal, count) = row?;
            match EligibilityStatus::from_ordinal(ordinal) {
                Some(EligibilityStatus::Invited) => counts.invited = count,
                Some(EligibilityStatus::Authorized) => counts.authorized = count,
                Some(EligibilityStatus::Awarded) => counts.awarded = count,
                _ => {}
            }
        }
        Ok(counts)
    }
}
