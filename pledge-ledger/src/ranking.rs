//! Ranking of approved point totals

use crate::db::LedgerStore;
use crate::models::{ApprovalStatus, PointEntry};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One subject's approved total
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    pub subject: String,
    pub total: i64,
}

/// Approved totals per subject, highest first
///
/// Ties are ordered by subject name. Pending and rejected entries never count.
pub async fn rank(store: &LedgerStore) -> Result<Vec<Ranking>> {
    let approved = store.list_approved().await?;
    Ok(rank_entries(&approved))
}

/// Aggregate `entries`, counting only approved ones
///
/// Totals saturate at the `i64` bounds.
pub fn rank_entries(entries: &[PointEntry]) -> Vec<Ranking> {
    let mut totals: HashMap<&str, i64> = HashMap::new();
    for entry in entries
        .iter()
        .filter(|e| e.status == ApprovalStatus::Approved)
    {
        let total = totals.entry(entry.subject.as_str()).or_insert(0);
        *total = total.saturating_add(entry.delta);
    }

    let mut rankings: Vec<Ranking> = totals
        .into_iter()
        .map(|(subject, total)| Ranking {
            subject: subject.to_string(),
            total,
        })
        .collect();

    rankings.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.subject.cmp(&b.subject)));
    rankings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn approved(subject: &str, delta: i64) -> PointEntry {
        let mut entry = PointEntry::candidate(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().fixed_offset(),
            delta,
            subject,
            "Alex",
            "note",
        );
        entry.status = ApprovalStatus::Approved;
        entry
    }

    fn pairs(rankings: &[Ranking]) -> Vec<(&str, i64)> {
        rankings
            .iter()
            .map(|r| (r.subject.as_str(), r.total))
            .collect()
    }

    #[test]
    fn test_sums_and_orders() {
        let entries = vec![
            approved("John", 10),
            approved("John", 15),
            approved("Jane", 5),
            approved("Jane", -5),
            approved("Bob", 20),
        ];
        assert_eq!(
            pairs(&rank_entries(&entries)),
            vec![("John", 25), ("Bob", 20), ("Jane", 0)]
        );
    }

    #[test]
    fn test_ties_broken_by_name() {
        let entries = vec![approved("Zed", 5), approved("Amy", 5), approved("Max", 5)];
        assert_eq!(
            pairs(&rank_entries(&entries)),
            vec![("Amy", 5), ("Max", 5), ("Zed", 5)]
        );
    }

    #[test]
    fn test_non_approved_ignored() {
        let mut pending = approved("John", 100);
        pending.status = ApprovalStatus::Pending;
        let mut rejected = approved("Bob", 100);
        rejected.status = ApprovalStatus::Rejected;

        assert_eq!(
            pairs(&rank_entries(&[pending, rejected, approved("Jane", 1)])),
            vec![("Jane", 1)]
        );
    }

    #[test]
    fn test_empty() {
        assert!(rank_entries(&[]).is_empty());
    }

    #[test]
    fn test_saturates() {
        let entries = vec![approved("Max", i64::MAX), approved("Max", 1)];
        assert_eq!(rank_entries(&entries)[0].total, i64::MAX);
    }
}
