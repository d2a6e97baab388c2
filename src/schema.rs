//! Schema metadata access for MySQL/MariaDB
//!
//! Reads live table and column metadata the way the server reports it
//! (`SHOW TABLES` / `SHOW COLUMNS`). Results are per-request snapshots owned
//! by the caller; nothing is cached here.

use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::{Column, Row};
use tracing::debug;

use crate::database::DatabaseError;
use crate::ident;

/// One column of schema metadata: name plus the server's type string
/// (e.g. `int(11)`, `varchar(255)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub type_name: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Reads table/column metadata to feed both display and prompt construction.
///
/// All failures surface as [`DatabaseError::SchemaRead`]; display-side
/// callers degrade to an empty listing instead of propagating.
pub struct SchemaInspector {
    pool: MySqlPool,
}

impl SchemaInspector {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// List the tables of the current database.
    pub async fn tables(&self) -> Result<Vec<String>, DatabaseError> {
        let rows = sqlx::query("SHOW TABLES;")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::SchemaRead(format!("failed to list tables: {e}")))?;

        let tables: Vec<String> = rows.iter().map(|row| string_at(row, 0)).collect();
        debug!(count = tables.len(), "listed tables");
        Ok(tables)
    }

    /// Read column name + type for one table, in ordinal order.
    pub async fn columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>, DatabaseError> {
        let quoted = ident::quoted(table)?;
        let rows = sqlx::query(&format!("SHOW COLUMNS FROM {quoted};"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DatabaseError::SchemaRead(format!("failed to read columns of '{table}': {e}"))
            })?;

        let columns: Vec<ColumnDescriptor> = rows
            .iter()
            .map(|row| ColumnDescriptor {
                name: string_named(row, "Field", 0),
                type_name: string_named(row, "Type", 1),
            })
            .collect();
        debug!(table, count = columns.len(), "read columns");
        Ok(columns)
    }

    /// Whether a table with exactly this name exists.
    pub async fn table_exists(&self, table: &str) -> Result<bool, DatabaseError> {
        ident::validate(table)?;
        let row = sqlx::query("SHOW TABLES LIKE ?;")
            .bind(table)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DatabaseError::SchemaRead(format!("failed to check for table '{table}': {e}"))
            })?;
        Ok(row.is_some())
    }

    /// First `limit` rows of a table as a display grid: header row first,
    /// values rendered as strings, NULLs as empty cells.
    pub async fn preview(
        &self,
        table: &str,
        limit: u32,
    ) -> Result<Vec<Vec<String>>, DatabaseError> {
        let quoted = ident::quoted(table)?;
        let rows = sqlx::query(&format!("SELECT * FROM {quoted} LIMIT {limit};"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DatabaseError::SchemaRead(format!("failed to preview '{table}': {e}"))
            })?;

        if rows.is_empty() {
            return Ok(vec![]);
        }

        let mut grid = Vec::with_capacity(rows.len() + 1);
        let header: Vec<String> = (0..rows[0].len())
            .map(|i| rows[0].column(i).name().to_string())
            .collect();
        grid.push(header);

        for row in &rows {
            let rendered: Vec<String> = (0..row.len()).map(|i| format_mysql_value(row, i)).collect();
            grid.push(rendered);
        }
        Ok(grid)
    }
}

/// Decode a string-ish cell. MySQL frequently hands metadata back as
/// VARBINARY, so a bytes fallback is required.
fn string_at(row: &MySqlRow, index: usize) -> String {
    if let Ok(name) = row.try_get::<String, _>(index) {
        name
    } else {
        row.try_get::<Vec<u8>, _>(index)
            .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

fn string_named(row: &MySqlRow, column: &str, index: usize) -> String {
    if let Ok(name) = row.try_get::<String, _>(column) {
        name
    } else {
        string_at(row, index)
    }
}

/// Render one cell of an arbitrary result row as display text.
fn format_mysql_value(row: &MySqlRow, index: usize) -> String {
    use sqlx::ValueRef;

    if let Ok(value_ref) = row.try_get_raw(index) {
        if value_ref.is_null() {
            return String::new();
        }
    }

    if let Ok(val) = row.try_get::<i64, _>(index) {
        return val.to_string();
    }
    if let Ok(val) = row.try_get::<u64, _>(index) {
        return val.to_string();
    }
    if let Ok(val) = row.try_get::<f64, _>(index) {
        return val.to_string();
    }
    if let Ok(val) = row.try_get::<String, _>(index) {
        return val;
    }
    if let Ok(val) = row.try_get::<bool, _>(index) {
        return if val { "1".to_string() } else { "0".to_string() };
    }
    if let Ok(val) = row.try_get::<chrono::NaiveDateTime, _>(index) {
        return val.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    if let Ok(val) = row.try_get::<chrono::NaiveDate, _>(index) {
        return val.format("%Y-%m-%d").to_string();
    }
    if let Ok(val) = row.try_get::<chrono::NaiveTime, _>(index) {
        return val.format("%H:%M:%S").to_string();
    }
    row.try_get::<Vec<u8>, _>(index)
        .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
        .unwrap_or_else(|_| "?".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connect_lazy;

    #[test]
    fn column_descriptor_holds_name_and_type() {
        let col = ColumnDescriptor::new("title", "varchar(100)");
        assert_eq!(col.name, "title");
        assert_eq!(col.type_name, "varchar(100)");
    }

    #[tokio::test]
    async fn bad_identifiers_fail_before_any_io() {
        let inspector = SchemaInspector::new(connect_lazy("mysql://root@localhost/x").unwrap());
        let err = inspector.columns("users; DROP TABLE x").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Ident(_)));

        let err = inspector.preview("users`", 10).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Ident(_)));
    }
}
