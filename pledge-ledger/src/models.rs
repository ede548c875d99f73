//! Ledger data models

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Approval state of a point entry
///
/// `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    /// Value stored in the `approval_status` column
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }

    /// Whether a decision may move an entry from `self` to `target`
    pub fn can_transition_to(&self, target: ApprovalStatus) -> bool {
        matches!(
            (self, target),
            (ApprovalStatus::Pending, ApprovalStatus::Approved)
                | (ApprovalStatus::Pending, ApprovalStatus::Rejected)
        )
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            other => Err(Error::InvalidInput(format!(
                "unknown approval status '{}'",
                other
            ))),
        }
    }
}

/// One point award or deduction
///
/// A value with `id == None` is a candidate that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointEntry {
    pub id: Option<i64>,
    pub occurred_at: DateTime<FixedOffset>,
    pub delta: i64,
    pub subject: String,
    pub submitter: String,
    pub note: String,
    pub status: ApprovalStatus,
    pub decided_by: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl PointEntry {
    /// Create a pending candidate entry
    ///
    /// `subject` should be a canonical name from the registry (as produced
    /// by [`crate::parse`]); the ledger stores it without checking.
    pub fn candidate(
        occurred_at: DateTime<FixedOffset>,
        delta: i64,
        subject: impl Into<String>,
        submitter: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            occurred_at,
            delta,
            subject: subject.into(),
            submitter: submitter.into(),
            note: note.into(),
            status: ApprovalStatus::Pending,
            decided_by: None,
            decided_at: None,
        }
    }

    /// Duplicate-detection key for this entry
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::from(self)
    }
}

/// Fields that decide whether two entries are the same submission
///
/// `DateTime` equality only compares instants, so the UTC offset is kept as a
/// separate component: the same instant recorded with two different offsets
/// is two different submissions. Submitter and decision fields are excluded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    instant: DateTime<Utc>,
    offset_seconds: i32,
    delta: i64,
    subject: String,
    note: String,
}

impl From<&PointEntry> for IdentityKey {
    fn from(entry: &PointEntry) -> Self {
        Self {
            instant: entry.occurred_at.with_timezone(&Utc),
            offset_seconds: entry.occurred_at.offset().local_minus_utc(),
            delta: entry.delta,
            subject: entry.subject.clone(),
            note: entry.note.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample() -> PointEntry {
        let ts = Utc
            .with_ymd_and_hms(2024, 9, 1, 12, 0, 0)
            .unwrap()
            .fixed_offset();
        PointEntry::candidate(ts, 10, "Eli", "Alex", "Great job")
    }

    #[test]
    fn test_candidate_starts_pending() {
        let entry = sample();
        assert_eq!(entry.id, None);
        assert_eq!(entry.status, ApprovalStatus::Pending);
        assert!(entry.decided_by.is_none());
        assert!(entry.decided_at.is_none());
    }

    #[test]
    fn test_status_round_trip_and_unknown() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<ApprovalStatus>().unwrap(), status);
        }
        assert!("PENDING".parse::<ApprovalStatus>().is_err());
        assert!("".parse::<ApprovalStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ApprovalStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
    }

    #[test]
    fn test_transitions_only_out_of_pending() {
        use ApprovalStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Pending));
        assert!(Approved.is_terminal() && Rejected.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn test_identity_ignores_submitter_and_decision() {
        let a = sample();
        let mut b = sample();
        b.submitter = "Someone Else".to_string();
        b.status = ApprovalStatus::Rejected;
        b.decided_by = Some("Chair".to_string());
        b.id = Some(42);
        assert_eq!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn test_identity_sensitive_to_nanoseconds() {
        let a = sample();
        let mut b = sample();
        b.occurred_at = b.occurred_at + Duration::nanoseconds(1);
        assert_ne!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn test_identity_sensitive_to_offset() {
        let a = sample();
        let mut b = sample();
        b.occurred_at = a
            .occurred_at
            .with_timezone(&FixedOffset::east_opt(3600).unwrap());
        assert_eq!(a.occurred_at, b.occurred_at);
        assert_ne!(a.identity_key(), b.identity_key());
    }
}
