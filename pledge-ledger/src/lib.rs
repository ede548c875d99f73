//! # Pledge Ledger
//!
//! Core library for point-award submissions:
//! - Name registry (valid subjects + alias table)
//! - Submission parsing and normalization
//! - Persistent SQLite ledger with a pending/approved/rejected workflow
//! - Duplicate filtering against everything already recorded
//! - Ranking of approved point totals
//!
//! The host process supplies raw `(submitter, timestamp, text)` triples and
//! decides how to acknowledge results; this crate performs no network I/O.

pub mod config;
pub mod db;
pub mod dedupe;
pub mod error;
pub mod ingest;
pub mod models;
pub mod parser;
pub mod ranking;
pub mod registry;
pub mod time;
pub mod workflow;

pub use config::LedgerConfig;
pub use db::LedgerStore;
pub use dedupe::dedupe;
pub use error::{Error, Result};
pub use ingest::{Ingestor, IngestReport, Submission, SubmissionOutcome};
pub use models::{ApprovalStatus, IdentityKey, PointEntry};
pub use parser::{parse, ParseFailure, ParsedLine};
pub use ranking::{rank, Ranking};
pub use registry::NameRegistry;
pub use workflow::{ApprovalWorkflow, Decision, Selection};
