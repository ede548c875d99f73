//! Submission ingestion
//!
//! Runs a batch of raw submissions through the full pipeline:
//! parse → drop duplicates → persist as pending.
//!
//! Each submission gets an outcome the host can use to acknowledge the
//! original message (e.g. a success or failure reaction). A submission that
//! parses but turns out to be a duplicate is still `Accepted`.

use crate::db::LedgerStore;
use crate::models::PointEntry;
use crate::parser::{parse, ParseFailure};
use crate::registry::NameRegistry;
use crate::Result;
use chrono::{DateTime, FixedOffset};
use tracing::{debug, info};

/// Raw submission as delivered by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Display name of the author
    pub submitter: String,
    pub occurred_at: DateTime<FixedOffset>,
    pub text: String,
}

impl Submission {
    pub fn new(
        submitter: impl Into<String>,
        occurred_at: DateTime<FixedOffset>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            submitter: submitter.into(),
            occurred_at,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted,
    Rejected(ParseFailure),
}

impl SubmissionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted)
    }
}

/// Parsed batch; `outcomes[i]` belongs to the i-th submission
#[derive(Debug, Clone, Default)]
pub struct ProcessedBatch {
    pub entries: Vec<PointEntry>,
    pub outcomes: Vec<SubmissionOutcome>,
}

/// Parse every submission into a candidate entry
pub fn process_submissions(submissions: &[Submission], registry: &NameRegistry) -> ProcessedBatch {
    let mut batch = ProcessedBatch {
        entries: Vec::with_capacity(submissions.len()),
        outcomes: Vec::with_capacity(submissions.len()),
    };

    for submission in submissions {
        match parse(&submission.text, registry) {
            Ok(parsed) => {
                batch.entries.push(PointEntry::candidate(
                    submission.occurred_at,
                    parsed.delta,
                    parsed.subject,
                    submission.submitter.clone(),
                    parsed.note,
                ));
                batch.outcomes.push(SubmissionOutcome::Accepted);
            }
            Err(failure) => {
                debug!(
                    submitter = %submission.submitter,
                    reason = %failure,
                    "Rejected submission"
                );
                batch.outcomes.push(SubmissionOutcome::Rejected(failure));
            }
        }
    }

    batch
}

/// Result of one ingest call
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub received: usize,
    pub rejected: usize,
    pub duplicates: usize,
    pub inserted: u64,
    pub outcomes: Vec<SubmissionOutcome>,
}

/// Parses, deduplicates and records submissions
///
/// The duplicate check and the insert run in one write transaction, so
/// concurrent `ingest` calls with overlapping batches record each
/// submission once.
pub struct Ingestor<'a> {
    store: &'a LedgerStore,
    registry: &'a NameRegistry,
}

impl<'a> Ingestor<'a> {
    pub fn new(store: &'a LedgerStore, registry: &'a NameRegistry) -> Self {
        Self { store, registry }
    }

    pub async fn ingest(&self, submissions: &[Submission]) -> Result<IngestReport> {
        let ProcessedBatch { entries, outcomes } = process_submissions(submissions, self.registry);
        let parsed = entries.len();

        let inserted = self.store.insert_unique(entries).await?;
        let duplicates = parsed - inserted as usize;

        let report = IngestReport {
            received: submissions.len(),
            rejected: submissions.len() - parsed,
            duplicates,
            inserted,
            outcomes,
        };

        info!(
            received = report.received,
            rejected = report.rejected,
            duplicates = report.duplicates,
            inserted = report.inserted,
            "Ingested submissions"
        );
        Ok(report)
    }
}
