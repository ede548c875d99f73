//! Ledger persistence

pub mod init;
pub mod ledger;
pub mod schema_sync;
pub mod table_schemas;

pub use init::{init_database, initialize_schema};
pub use ledger::{LedgerStore, StatusCounts};
pub use table_schemas::POINT_ENTRIES_TABLE;
