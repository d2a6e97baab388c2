//! Table and column DDL operations
//!
//! Identifiers are validated and quoted before they reach SQL text; column
//! types must come from the fixed allow-list, so the only free-form SQL this
//! module ever builds is assembled from vetted pieces.

use sqlx::mysql::MySqlPool;
use tracing::info;

use crate::database::DatabaseError;
use crate::ident;

/// Column types offered for ALTER/ADD operations.
pub const ALLOWED_COLUMN_TYPES: &[&str] = &[
    "INT",
    "BIGINT",
    "VARCHAR(50)",
    "VARCHAR(100)",
    "TEXT",
    "DATE",
    "DATETIME",
    "DECIMAL(10,2)",
    "FLOAT",
    "BIT",
];

/// Resolve a requested column type against the allow-list,
/// case-insensitively, returning the canonical spelling.
pub fn column_type(requested: &str) -> Option<&'static str> {
    let wanted = requested.trim();
    ALLOWED_COLUMN_TYPES
        .iter()
        .find(|t| t.eq_ignore_ascii_case(wanted))
        .copied()
}

/// Table-level DDL against the connected database.
pub struct TableOps {
    pool: MySqlPool,
}

impl TableOps {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Create a table with only the auto-increment `Id` primary key; columns
    /// are added afterwards.
    pub async fn create_table(&self, name: &str) -> Result<(), DatabaseError> {
        let table = ident::quoted(name)?;
        sqlx::query(&format!(
            "CREATE TABLE {table} (Id INT PRIMARY KEY AUTO_INCREMENT);"
        ))
        .execute(&self.pool)
        .await?;
        info!(table = name, "table created");
        Ok(())
    }

    pub async fn drop_table(&self, name: &str) -> Result<(), DatabaseError> {
        let table = ident::quoted(name)?;
        sqlx::query(&format!("DROP TABLE {table};"))
            .execute(&self.pool)
            .await?;
        info!(table = name, "table dropped");
        Ok(())
    }

    pub async fn add_column(
        &self,
        table: &str,
        column: &str,
        requested_type: &str,
    ) -> Result<(), DatabaseError> {
        let t = ident::quoted(table)?;
        let c = ident::quoted(column)?;
        let ty = column_type(requested_type)
            .ok_or_else(|| DatabaseError::DisallowedColumnType(requested_type.to_string()))?;

        sqlx::query(&format!("ALTER TABLE {t} ADD {c} {ty};"))
            .execute(&self.pool)
            .await?;
        info!(table, column, column_type = ty, "column added");
        Ok(())
    }

    pub async fn drop_column(&self, table: &str, column: &str) -> Result<(), DatabaseError> {
        let t = ident::quoted(table)?;
        let c = ident::quoted(column)?;
        sqlx::query(&format!("ALTER TABLE {t} DROP COLUMN {c};"))
            .execute(&self.pool)
            .await?;
        info!(table, column, "column dropped");
        Ok(())
    }

    /// Rename a column and/or change its type in one CHANGE statement.
    pub async fn change_column(
        &self,
        table: &str,
        old_column: &str,
        new_column: &str,
        requested_type: &str,
    ) -> Result<(), DatabaseError> {
        let t = ident::quoted(table)?;
        let old = ident::quoted(old_column)?;
        let new = ident::quoted(new_column)?;
        let ty = column_type(requested_type)
            .ok_or_else(|| DatabaseError::DisallowedColumnType(requested_type.to_string()))?;

        sqlx::query(&format!("ALTER TABLE {t} CHANGE {old} {new} {ty};"))
            .execute(&self.pool)
            .await?;
        info!(table, old = old_column, new = new_column, "column changed");
        Ok(())
    }
}
