use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row as _, Sqlite, SqlitePool, Transaction};
use tokio::sync::Mutex;

use crate::domain::Row;

use super::{Backend, BackendError, MIGRATION_001_LEDGER_ROWS, Revision};

/// Ledger rows in an embedded SQLite table, ordered by insertion position.
pub struct SqliteBackend {
    pool: SqlitePool,
    // Serializes this process's writers so a versioned write sees no
    // interleaving from its own pool.
    write_lock: Mutex<()>,
}

impl SqliteBackend {
    /// Create a new backend with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    /// Connect to a SQLite database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_LEDGER_ROWS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Open (creating if needed) the database file at `path` and migrate it.
    pub async fn open(path: &str) -> Result<Self> {
        let backend = Self::connect(&format!("sqlite:{}?mode=rwc", path)).await?;
        backend.migrate().await?;
        Ok(backend)
    }

    fn row_from_sql(row: &SqliteRow) -> Row {
        Row {
            date: row.get("date"),
            kind: row.get("type"),
            category: row.get("category"),
            amount: row.get("amount"),
            note: row.get("note"),
        }
    }

    async fn fetch_rows(tx: &mut Transaction<'_, Sqlite>) -> Result<Vec<Row>, BackendError> {
        let rows = sqlx::query(
            "SELECT date, type, category, amount, note FROM ledger_rows ORDER BY position",
        )
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.iter().map(Self::row_from_sql).collect())
    }

    async fn insert_row(tx: &mut Transaction<'_, Sqlite>, row: &Row) -> Result<(), BackendError> {
        sqlx::query(
            r#"
            INSERT INTO ledger_rows (date, type, category, amount, note)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.date)
        .bind(&row.kind)
        .bind(&row.category)
        .bind(&row.amount)
        .bind(&row.note)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn replace_rows(tx: &mut Transaction<'_, Sqlite>, rows: &[Row]) -> Result<(), BackendError> {
        sqlx::query("DELETE FROM ledger_rows")
            .execute(&mut **tx)
            .await?;
        for row in rows {
            Self::insert_row(tx, row).await?;
        }
        Ok(())
    }
}

impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn read(&self) -> Result<Vec<Row>, BackendError> {
        let mut tx = self.pool.begin().await?;
        let rows = Self::fetch_rows(&mut tx).await?;
        tx.commit().await?;
        Ok(rows)
    }

    async fn overwrite(&self, rows: &[Row]) -> Result<(), BackendError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        Self::replace_rows(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn append(&self, row: &Row) -> Result<(), BackendError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        Self::insert_row(&mut tx, row).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn overwrite_if(&self, expected: Revision, rows: &[Row]) -> Result<(), BackendError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let found = Revision::of(&Self::fetch_rows(&mut tx).await?);
        if found != expected {
            // Dropping the transaction rolls it back
            return Err(BackendError::Conflict { expected, found });
        }

        Self::replace_rows(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(())
    }
}
