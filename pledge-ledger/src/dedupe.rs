//! Duplicate filtering
//!
//! A submission that was ever recorded, whatever its status, cannot be
//! recorded again. Rejected entries stay in the comparison set so re-sending
//! a rejected message does not bring it back as pending.

use crate::db::LedgerStore;
use crate::models::{IdentityKey, PointEntry};
use crate::Result;
use std::collections::HashSet;
use tracing::debug;

/// Drop candidates already present in the ledger
///
/// Issues a single read of the whole ledger regardless of batch size and
/// never writes. Candidates are not compared with each other. The result
/// can go stale before it is inserted; use
/// [`LedgerStore::insert_unique`] when other writers may be active.
pub async fn dedupe(candidates: Vec<PointEntry>, store: &LedgerStore) -> Result<Vec<PointEntry>> {
    let existing = store.list_all(None).await?;
    Ok(dedupe_against(candidates, &existing))
}

/// Keep candidates whose identity key does not occur in `existing`
pub fn dedupe_against(candidates: Vec<PointEntry>, existing: &[PointEntry]) -> Vec<PointEntry> {
    let seen: HashSet<IdentityKey> = existing.iter().map(IdentityKey::from).collect();

    let before = candidates.len();
    let unique: Vec<PointEntry> = candidates
        .into_iter()
        .filter(|candidate| !seen.contains(&candidate.identity_key()))
        .collect();

    debug!(
        candidates = before,
        duplicates = before - unique.len(),
        existing = existing.len(),
        "Filtered duplicate submissions"
    );
    unique
}
