//! Table schema definitions
//!
//! Single source of truth for the columns each ledger table must have.

use crate::db::schema_sync::{sync_table, ColumnDefinition, TableSchema};
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Table holding every point entry ever ingested
pub const POINT_ENTRIES_TABLE: &str = "point_entries";

/// `point_entries` table schema
///
/// The first six columns predate the approval workflow; ledgers created
/// before it get the last three added on open.
pub struct PointEntriesTableSchema;

impl TableSchema for PointEntriesTableSchema {
    fn table_name() -> &'static str {
        POINT_ENTRIES_TABLE
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("occurred_at", "TEXT"),
            ColumnDefinition::new("point_change", "INTEGER"),
            ColumnDefinition::new("subject", "TEXT"),
            ColumnDefinition::new("submitter", "TEXT"),
            ColumnDefinition::new("note", "TEXT"),
            // Approval workflow
            ColumnDefinition::new("approval_status", "TEXT").default("'pending'"),
            ColumnDefinition::new("decided_by", "TEXT"),
            ColumnDefinition::new("decided_at", "TEXT"),
        ]
    }
}

/// Add missing columns to every ledger table
pub async fn sync_all_table_schemas(pool: &SqlitePool) -> Result<()> {
    let added = sync_table::<PointEntriesTableSchema>(pool).await?;
    if !added.is_empty() {
        info!(
            table = POINT_ENTRIES_TABLE,
            columns = ?added,
            "Upgraded ledger schema"
        );
    }
    Ok(())
}
