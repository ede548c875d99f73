//! Ledger store
//!
//! Durable table of point entries with an approval status. Every mutating
//! call runs in exactly one transaction: it either commits completely or is
//! rolled back when the transaction guard drops on the error path.
//!
//! Reads are tolerant of damaged rows. A row that cannot be decoded (bad
//! timestamp, unknown status, wrong column type) is skipped, logged at WARN
//! and counted in [`LedgerStore::skipped_rows`]; the rest of the read
//! succeeds.

use crate::db::init::{init_database, initialize_schema};
use crate::dedupe::dedupe_against;
use crate::models::{ApprovalStatus, PointEntry};
use crate::time::{format_timestamp, is_storable, now, parse_timestamp};
use crate::{Error, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SELECT_COLUMNS: &str = "id, occurred_at, point_change, subject, submitter, note, \
                              approval_status, decided_by, decided_at";

/// Status with NULL read as pending, matching how rows are decoded
const STATUS_EXPR: &str = "COALESCE(approval_status, 'pending')";

/// Ids bound per statement; SQLite caps host parameters per query
const ID_CHUNK_SIZE: usize = 500;

/// Per-status row totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

impl StatusCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.approved + self.rejected
    }
}

#[derive(Debug, thiserror::Error)]
enum RowError {
    #[error("column decode failed: {0}")]
    Column(#[from] sqlx::Error),

    #[error("unreadable timestamp '{0}'")]
    Timestamp(String),

    #[error("unknown approval status '{0}'")]
    Status(String),
}

/// Persistent point-entry ledger backed by SQLite
///
/// Cloning is cheap and clones share the connection pool and the
/// skipped-row counter.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    pool: SqlitePool,
    skipped_rows: Arc<AtomicU64>,
}

impl LedgerStore {
    /// Open (or create) the ledger at `db_path` and bring its schema current
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = init_database(db_path).await?;
        Ok(Self::with_pool(pool))
    }

    /// Wrap an existing pool, creating/upgrading the schema first
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        initialize_schema(&pool).await?;
        Ok(Self::with_pool(pool))
    }

    fn with_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            skipped_rows: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of rows skipped as unreadable since this store was opened
    pub fn skipped_rows(&self) -> u64 {
        self.skipped_rows.load(Ordering::Relaxed)
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Ledger database closed");
    }

    /// Append entries as `pending` in one transaction
    ///
    /// Ids, statuses and decision fields on the inputs are ignored. Either
    /// every entry is written or none is. Returns the number inserted.
    ///
    /// Subjects are stored as given. Callers are expected to pass entries
    /// built from [`crate::parse`] output, whose subjects are registry
    /// canonical names; nothing here re-checks that.
    pub async fn insert_batch(&self, entries: &[PointEntry]) -> Result<u64> {
        if entries.is_empty() {
            return Ok(0);
        }
        check_storable(entries)?;

        let mut tx = self.pool.begin().await?;
        insert_rows(&mut *tx, entries).await?;
        tx.commit().await?;

        debug!(inserted = entries.len(), "Inserted point entries");
        Ok(entries.len() as u64)
    }

    /// Insert the candidates not already in the ledger; returns how many
    ///
    /// The duplicate check and the inserts share one `BEGIN IMMEDIATE`
    /// transaction, so concurrent callers cannot both record the same
    /// submission. Same identity rules as [`crate::dedupe::dedupe`].
    pub async fn insert_unique(&self, candidates: Vec<PointEntry>) -> Result<u64> {
        if candidates.is_empty() {
            return Ok(0);
        }
        check_storable(&candidates)?;

        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        match self.insert_unique_in(&mut *conn, candidates).await {
            Ok(inserted) => {
                if let Err(e) = sqlx::query("COMMIT").execute(&mut *conn).await {
                    let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                    return Err(e.into());
                }
                debug!(inserted, "Inserted new point entries");
                Ok(inserted)
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }

    async fn insert_unique_in(
        &self,
        conn: &mut SqliteConnection,
        candidates: Vec<PointEntry>,
    ) -> Result<u64> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM point_entries ORDER BY id",
            SELECT_COLUMNS
        ))
        .fetch_all(&mut *conn)
        .await?;
        let existing = self.decode_rows(rows);

        let unique = dedupe_against(candidates, &existing);
        insert_rows(conn, &unique).await?;
        Ok(unique.len() as u64)
    }

    /// Entries whose status is in `status_filter`, ordered by id
    ///
    /// `None` returns every row. An empty filter matches nothing.
    pub async fn list_all(&self, status_filter: Option<&[ApprovalStatus]>) -> Result<Vec<PointEntry>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM point_entries", SELECT_COLUMNS));

        if let Some(statuses) = status_filter {
            if statuses.is_empty() {
                return Ok(Vec::new());
            }
            builder.push(format!(" WHERE {} IN (", STATUS_EXPR));
            let mut separated = builder.separated(", ");
            for status in statuses {
                separated.push_bind(status.as_str());
            }
            separated.push_unseparated(")");
        }
        builder.push(" ORDER BY id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(self.decode_rows(rows))
    }

    pub async fn list_pending(&self) -> Result<Vec<PointEntry>> {
        self.list_all(Some(&[ApprovalStatus::Pending])).await
    }

    pub async fn list_approved(&self) -> Result<Vec<PointEntry>> {
        self.list_all(Some(&[ApprovalStatus::Approved])).await
    }

    /// Single entry by id; an unreadable row reads as `None`
    pub async fn get_by_id(&self, id: i64) -> Result<Option<PointEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM point_entries WHERE id = ?",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|row| self.decode_row(&row)))
    }

    /// Approve the pending entries among `ids`; returns the rows changed
    pub async fn approve(&self, ids: &[i64], approver: &str) -> Result<Vec<PointEntry>> {
        self.decide(Some(ids), ApprovalStatus::Approved, approver).await
    }

    /// Reject the pending entries among `ids`; returns the rows changed
    pub async fn reject(&self, ids: &[i64], actor: &str) -> Result<Vec<PointEntry>> {
        self.decide(Some(ids), ApprovalStatus::Rejected, actor).await
    }

    pub async fn approve_all_pending(&self, approver: &str) -> Result<Vec<PointEntry>> {
        self.decide(None, ApprovalStatus::Approved, approver).await
    }

    pub async fn reject_all_pending(&self, actor: &str) -> Result<Vec<PointEntry>> {
        self.decide(None, ApprovalStatus::Rejected, actor).await
    }

    /// Move pending rows to `target` in one transaction
    ///
    /// `ids == None` selects every pending row. Only rows still `pending` at
    /// update time change; the pending guard lives in the
    /// UPDATE itself, so a row is decided at most once even under concurrent
    /// callers. Returns the updated rows, ordered by id.
    async fn decide(
        &self,
        ids: Option<&[i64]>,
        target: ApprovalStatus,
        actor: &str,
    ) -> Result<Vec<PointEntry>> {
        if matches!(ids, Some(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }

        let decided_at = format_timestamp(&now().fixed_offset());
        let mut tx = self.pool.begin().await?;
        let mut rows = Vec::new();

        match ids {
            Some(ids) => {
                for chunk in ids.chunks(ID_CHUNK_SIZE) {
                    let mut builder = decision_update(target, actor, &decided_at);
                    builder.push(" AND id IN (");
                    let mut separated = builder.separated(", ");
                    for id in chunk {
                        separated.push_bind(*id);
                    }
                    separated.push_unseparated(")");
                    builder.push(format!(" RETURNING {}", SELECT_COLUMNS));

                    rows.extend(builder.build().fetch_all(&mut *tx).await?);
                }
            }
            None => {
                let mut builder = decision_update(target, actor, &decided_at);
                builder.push(format!(" RETURNING {}", SELECT_COLUMNS));
                rows = builder.build().fetch_all(&mut *tx).await?;
            }
        }

        tx.commit().await?;

        let mut changed = self.decode_rows(rows);
        changed.sort_by_key(|entry| entry.id);

        debug!(
            status = %target,
            actor,
            changed = changed.len(),
            "Recorded decision"
        );
        Ok(changed)
    }

    /// Row totals per approval status
    pub async fn count_by_status(&self) -> Result<StatusCounts> {
        let rows: Vec<(Option<String>, i64)> = sqlx::query_as(
            "SELECT approval_status, COUNT(*) FROM point_entries GROUP BY approval_status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            let count = count.max(0) as u64;
            match status.as_deref().unwrap_or("pending").parse::<ApprovalStatus>() {
                Ok(ApprovalStatus::Pending) => counts.pending += count,
                Ok(ApprovalStatus::Approved) => counts.approved += count,
                Ok(ApprovalStatus::Rejected) => counts.rejected += count,
                Err(_) => {}
            }
        }
        Ok(counts)
    }

    fn decode_rows(&self, rows: Vec<SqliteRow>) -> Vec<PointEntry> {
        rows.iter().filter_map(|row| self.decode_row(row)).collect()
    }

    fn decode_row(&self, row: &SqliteRow) -> Option<PointEntry> {
        match entry_from_row(row) {
            Ok(entry) => Some(entry),
            Err(e) => {
                self.skipped_rows.fetch_add(1, Ordering::Relaxed);
                warn!(
                    row_id = ?row.try_get::<i64, _>("id").ok(),
                    error = %e,
                    "Skipping unreadable ledger row"
                );
                None
            }
        }
    }
}

/// `UPDATE ... WHERE <status is pending>`, ready for extra conditions
fn decision_update<'a>(
    target: ApprovalStatus,
    actor: &'a str,
    decided_at: &'a str,
) -> QueryBuilder<'a, Sqlite> {
    let mut builder = QueryBuilder::new("UPDATE point_entries SET approval_status = ");
    builder.push_bind(target.as_str());
    builder.push(", decided_by = ");
    builder.push_bind(actor);
    builder.push(", decided_at = ");
    builder.push_bind(decided_at);
    builder.push(format!(" WHERE {} = 'pending'", STATUS_EXPR));
    builder
}

/// Reject timestamps that would be written but could not be read back
fn check_storable(entries: &[PointEntry]) -> Result<()> {
    match entries.iter().find(|e| !is_storable(&e.occurred_at)) {
        Some(entry) => Err(Error::InvalidInput(format!(
            "timestamp {} is outside the storable year range",
            entry.occurred_at
        ))),
        None => Ok(()),
    }
}

async fn insert_rows(conn: &mut SqliteConnection, entries: &[PointEntry]) -> Result<()> {
    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO point_entries (
                occurred_at, point_change, subject, submitter, note, approval_status
            )
            VALUES (?, ?, ?, ?, ?, 'pending')
            "#,
        )
        .bind(format_timestamp(&entry.occurred_at))
        .bind(entry.delta)
        .bind(&entry.subject)
        .bind(&entry.submitter)
        .bind(&entry.note)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

fn entry_from_row(row: &SqliteRow) -> std::result::Result<PointEntry, RowError> {
    let occurred_raw: String = row.try_get("occurred_at")?;
    let occurred_at =
        parse_timestamp(&occurred_raw).ok_or_else(|| RowError::Timestamp(occurred_raw.clone()))?;

    // Rows written before the approval columns existed have NULL status
    let status_raw: Option<String> = row.try_get("approval_status")?;
    let status = match status_raw.as_deref() {
        None => ApprovalStatus::Pending,
        Some(raw) => raw
            .parse::<ApprovalStatus>()
            .map_err(|_| RowError::Status(raw.to_string()))?,
    };

    // An unreadable decision time is dropped rather than losing the row
    let decided_at = row
        .try_get::<Option<String>, _>("decided_at")?
        .and_then(|raw| parse_timestamp(&raw))
        .map(|ts| ts.with_timezone(&Utc));

    Ok(PointEntry {
        id: Some(row.try_get("id")?),
        occurred_at,
        delta: row.try_get("point_change")?,
        subject: row.try_get("subject")?,
        submitter: row.try_get("submitter")?,
        note: row.try_get("note")?,
        status,
        decided_by: row.try_get("decided_by")?,
        decided_at,
    })
}
