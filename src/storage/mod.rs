mod any;
mod backend;
mod csv_file;
mod memory;
#[cfg(feature = "sheets")]
mod sheets;
mod sqlite;

pub use any::*;
pub use backend::*;
pub use csv_file::*;
pub use memory::*;
#[cfg(feature = "sheets")]
pub use sheets::*;
pub use sqlite::*;

/// SQL migration for the ledger table
pub const MIGRATION_001_LEDGER_ROWS: &str = include_str!("migrations/001_ledger_rows.sql");
