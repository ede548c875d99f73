//! Approval workflow
//!
//! ```text
//!            approve(actor)
//! pending ───────────────▶ approved
//!    │
//!    │       reject(actor)
//!    └───────────────────▶ rejected
//! ```
//!
//! `approved` and `rejected` are terminal. Deciding a row that is not pending
//! is not an error; the row is just missing from the result.

use crate::db::LedgerStore;
use crate::models::{ApprovalStatus, PointEntry};
use crate::Result;
use tracing::info;

/// What to do with the selected entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target_status(&self) -> ApprovalStatus {
        match self {
            Decision::Approve => ApprovalStatus::Approved,
            Decision::Reject => ApprovalStatus::Rejected,
        }
    }
}

/// Which entries a decision applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Explicit ids; non-pending and unknown ids are skipped
    Ids(Vec<i64>),
    /// Every entry pending at the time of the call
    AllPending,
}

/// Applies decisions to ledger entries
pub struct ApprovalWorkflow<'a> {
    store: &'a LedgerStore,
}

impl<'a> ApprovalWorkflow<'a> {
    pub fn new(store: &'a LedgerStore) -> Self {
        Self { store }
    }

    /// Apply `decision` to `selection` as `actor`; returns the entries changed
    pub async fn decide(
        &self,
        decision: Decision,
        selection: &Selection,
        actor: &str,
    ) -> Result<Vec<PointEntry>> {
        let changed = match (decision, selection) {
            (Decision::Approve, Selection::Ids(ids)) => self.store.approve(ids, actor).await?,
            (Decision::Reject, Selection::Ids(ids)) => self.store.reject(ids, actor).await?,
            (Decision::Approve, Selection::AllPending) => {
                self.store.approve_all_pending(actor).await?
            }
            (Decision::Reject, Selection::AllPending) => {
                self.store.reject_all_pending(actor).await?
            }
        };

        info!(
            decision = ?decision,
            actor,
            changed = changed.len(),
            "Applied decision"
        );
        Ok(changed)
    }

    pub async fn approve(&self, ids: &[i64], approver: &str) -> Result<Vec<PointEntry>> {
        self.decide(Decision::Approve, &Selection::Ids(ids.to_vec()), approver)
            .await
    }

    pub async fn reject(&self, ids: &[i64], actor: &str) -> Result<Vec<PointEntry>> {
        self.decide(Decision::Reject, &Selection::Ids(ids.to_vec()), actor)
            .await
    }

    pub async fn approve_all_pending(&self, approver: &str) -> Result<Vec<PointEntry>> {
        self.decide(Decision::Approve, &Selection::AllPending, approver)
            .await
    }

    pub async fn reject_all_pending(&self, actor: &str) -> Result<Vec<PointEntry>> {
        self.decide(Decision::Reject, &Selection::AllPending, actor)
            .await
    }
}
