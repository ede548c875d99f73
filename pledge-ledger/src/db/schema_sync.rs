//! Automatic schema synchronization
//!
//! Ledgers created by older releases lack columns added since (the approval
//! columns in particular). Instead of versioned migrations, each table declares
//! its expected columns and startup adds whatever is missing.
//!
//! Initialization runs in two phases:
//! 1. `CREATE TABLE IF NOT EXISTS` with the current definition
//! 2. Column sync: `ALTER TABLE ... ADD COLUMN` for every missing column
//!
//! Adding a column that already exists is a no-op, so the sync can run on
//! every open, including from two processes at once.

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER")
    pub sql_type: String,
    pub primary_key: bool,
    /// DEFAULT clause, already SQL-quoted (e.g., `'pending'`)
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            primary_key: false,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// Actual column from `PRAGMA table_info`
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub name: String,
    pub type_name: String,
}

/// Difference between expected and actual schema
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDrift {
    /// Column missing from database (fixable)
    MissingColumn { column: ColumnDefinition },
    /// Column type mismatch (reported only)
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },
}

/// Expected schema of one table
pub trait TableSchema {
    fn table_name() -> &'static str;

    /// Expected columns, in creation order
    fn expected_columns() -> Vec<ColumnDefinition>;
}

/// Read actual columns via `PRAGMA table_info`, ordered by position
pub async fn introspect_table(pool: &SqlitePool, table_name: &str) -> Result<Vec<ActualColumn>> {
    let rows = sqlx::query("SELECT name, type FROM pragma_table_info(?) ORDER BY cid")
        .bind(table_name)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| ActualColumn {
            name: row.get("name"),
            type_name: row.get("type"),
        })
        .collect())
}

pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
    )
    .bind(table_name)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Compare expected columns to actual columns
pub fn compare(expected: &[ColumnDefinition], actual: &[ActualColumn]) -> Vec<SchemaDrift> {
    expected
        .iter()
        .filter_map(|col| match actual.iter().find(|a| a.name.eq_ignore_ascii_case(&col.name)) {
            None => Some(SchemaDrift::MissingColumn {
                column: col.clone(),
            }),
            Some(found) if !types_compatible(&col.sql_type, &found.type_name) => {
                Some(SchemaDrift::TypeMismatch {
                    column: col.name.clone(),
                    expected: col.sql_type.clone(),
                    actual: found.type_name.clone(),
                })
            }
            Some(_) => None,
        })
        .collect()
}

/// SQLite type affinity comparison
fn types_compatible(expected: &str, actual: &str) -> bool {
    let exp = expected.to_uppercase();
    let act = actual.to_uppercase();

    if exp == act {
        return true;
    }

    let text_like = |t: &str| t.contains("TEXT") || t.contains("CHAR") || t.contains("CLOB");
    (exp.contains("INT") && act.contains("INT")) || (text_like(&exp) && text_like(&act))
}

/// Add every missing column of `T`; returns the names of columns added
///
/// Type mismatches are logged and left alone.
pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<Vec<String>> {
    let table_name = T::table_name();

    if !table_exists(pool, table_name).await? {
        warn!(
            table = table_name,
            "Schema sync skipped: table does not exist"
        );
        return Ok(Vec::new());
    }

    let actual = introspect_table(pool, table_name).await?;
    let drift = compare(&T::expected_columns(), &actual);

    if drift.is_empty() {
        info!(table = table_name, "Schema up to date");
        return Ok(Vec::new());
    }

    let mut added = Vec::new();
    for change in drift {
        match change {
            SchemaDrift::MissingColumn { column } => {
                add_column(pool, table_name, &column).await?;
                added.push(column.name);
            }
            SchemaDrift::TypeMismatch {
                column,
                expected,
                actual,
            } => {
                warn!(
                    table = table_name,
                    column = %column,
                    expected = %expected,
                    actual = %actual,
                    "Column type mismatch; manual migration required"
                );
            }
        }
    }

    Ok(added)
}

async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<()> {
    if column.primary_key {
        warn!(
            table = table,
            column = %column.name,
            "Cannot add PRIMARY KEY column via ALTER TABLE; adding it as a plain column"
        );
    }

    let mut sql = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        table, column.name, column.sql_type
    );
    if let Some(default) = &column.default_value {
        sql.push_str(&format!(" DEFAULT {}", default));
    }

    info!(table = table, column = %column.name, sql_type = %column.sql_type, "Adding missing column");

    match sqlx::query(&sql).execute(pool).await {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
            info!(table = table, column = %column.name, "Column already present");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
