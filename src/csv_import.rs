//! CSV import into existing or freshly created tables
//!
//! Parsing and validation are separate from insertion: a payload is fully
//! read and checked before the first statement runs, and all inserts for one
//! file happen inside a single transaction — a bad row aborts the whole
//! import with nothing committed.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use sqlx::mysql::MySqlPool;
use tracing::{debug, info};

use crate::database::DatabaseError;
use crate::ident;
use crate::schema::{ColumnDescriptor, SchemaInspector};

/// A parsed CSV file: trimmed header names plus rows aligned to the header.
/// Empty fields become `None` and are inserted as SQL NULL.
#[derive(Debug, Clone)]
pub struct CsvPayload {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// Read and materialise a CSV document with a header row.
pub fn parse_csv<R: Read>(reader: R) -> Result<CsvPayload, DatabaseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DatabaseError::Import(format!("failed to read CSV header: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() {
        return Err(DatabaseError::Import("CSV file has no header row".to_string()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| DatabaseError::Import(format!("failed to read CSV row: {e}")))?;
        let row: Vec<Option<String>> = (0..headers.len())
            .map(|i| {
                record
                    .get(i)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            })
            .collect();
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(DatabaseError::Import(
            "CSV file contains no data rows".to_string(),
        ));
    }

    debug!(columns = headers.len(), rows = rows.len(), "parsed CSV payload");
    Ok(CsvPayload { headers, rows })
}

/// Parse a CSV file from disk.
pub fn parse_csv_file(path: &Path) -> Result<CsvPayload, DatabaseError> {
    let file = File::open(path)
        .map_err(|e| DatabaseError::Import(format!("cannot open {}: {e}", path.display())))?;
    parse_csv(file)
}

/// Header names become column identifiers of a new table, so each must pass
/// the identifier allow-list.
pub fn validate_new_table_headers(headers: &[String]) -> Result<(), DatabaseError> {
    for header in headers {
        ident::validate(header).map_err(|_| {
            DatabaseError::Import(format!("invalid column name in CSV header: '{header}'"))
        })?;
    }
    Ok(())
}

/// Every CSV header must match an existing column, case-insensitively.
pub fn validate_existing_headers(
    headers: &[String],
    columns: &[ColumnDescriptor],
) -> Result<(), DatabaseError> {
    for header in headers {
        if !columns.iter().any(|c| c.name.eq_ignore_ascii_case(header)) {
            return Err(DatabaseError::Import(format!(
                "CSV column '{header}' does not exist in the target table"
            )));
        }
    }
    Ok(())
}

/// Build the CREATE TABLE statement for a new import target: auto-increment
/// `id` key plus one generic VARCHAR(255) column per CSV header.
pub fn build_create_table_sql(table: &str, headers: &[String]) -> Result<String, DatabaseError> {
    let t = ident::quoted(table)?;
    let mut sql = format!("CREATE TABLE {t} (\n");
    sql.push_str("  `id` INT(11) NOT NULL AUTO_INCREMENT,\n");
    for header in headers {
        let column = ident::quoted(header)?;
        sql.push_str(&format!("  {column} VARCHAR(255) NULL,\n"));
    }
    sql.push_str("  PRIMARY KEY (`id`)\n");
    sql.push_str(") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;");
    Ok(sql)
}

/// Imports parsed CSV payloads into the database.
pub struct CsvImporter {
    pool: MySqlPool,
}

impl CsvImporter {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Import into an existing table after checking the header against its
    /// columns. Returns the number of imported rows.
    pub async fn import_existing(
        &self,
        table: &str,
        payload: &CsvPayload,
    ) -> Result<u64, DatabaseError> {
        let inspector = SchemaInspector::new(self.pool.clone());
        let columns = inspector.columns(table).await?;
        if columns.is_empty() {
            return Err(DatabaseError::Import(format!(
                "table '{table}' has no columns or does not exist"
            )));
        }
        validate_existing_headers(&payload.headers, &columns)?;
        self.insert_rows(table, payload).await
    }

    /// Create a new table shaped after the CSV header, then import into it.
    pub async fn import_new(&self, table: &str, payload: &CsvPayload) -> Result<u64, DatabaseError> {
        let inspector = SchemaInspector::new(self.pool.clone());
        if inspector.table_exists(table).await? {
            return Err(DatabaseError::Import(format!(
                "a table named '{table}' already exists"
            )));
        }
        validate_new_table_headers(&payload.headers)?;

        let create_sql = build_create_table_sql(table, &payload.headers)?;
        sqlx::query(&create_sql).execute(&self.pool).await?;
        info!(table, "table created from CSV header");

        self.insert_rows(table, payload).await
    }

    async fn insert_rows(&self, table: &str, payload: &CsvPayload) -> Result<u64, DatabaseError> {
        let t = ident::quoted(table)?;
        let columns = payload
            .headers
            .iter()
            .map(|h| ident::quoted(h))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");
        let placeholders = vec!["?"; payload.headers.len()].join(", ");
        let insert_sql = format!("INSERT INTO {t} ({columns}) VALUES ({placeholders});");

        // One transaction for the whole file; dropping the tx on error rolls
        // everything back.
        let mut tx = self.pool.begin().await?;
        for row in &payload.rows {
            let mut query = sqlx::query(&insert_sql);
            for value in row {
                query = query.bind(value.as_deref());
            }
            query.execute(&mut *tx).await?;
        }
        tx.commit().await?;

        let imported = payload.rows.len() as u64;
        info!(table, rows = imported, "CSV rows imported");
        Ok(imported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn payload(csv: &str) -> CsvPayload {
        parse_csv(csv.as_bytes()).unwrap()
    }

    #[test]
    fn parses_header_and_rows() {
        let p = payload("name,age\nAda,36\nGrace,45\n");
        assert_eq!(p.headers, vec!["name", "age"]);
        assert_eq!(p.rows.len(), 2);
        assert_eq!(p.rows[0], vec![Some("Ada".to_string()), Some("36".to_string())]);
    }

    #[test]
    fn empty_fields_become_null() {
        let p = payload("name,age\nAda,\n");
        assert_eq!(p.rows[0], vec![Some("Ada".to_string()), None]);
    }

    #[test]
    fn short_rows_pad_with_null() {
        let p = payload("name,age,city\nAda,36\n");
        assert_eq!(
            p.rows[0],
            vec![Some("Ada".to_string()), Some("36".to_string()), None]
        );
    }

    #[test]
    fn header_only_file_is_rejected() {
        let err = parse_csv("name,age\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DatabaseError::Import(_)));
    }

    #[rstest]
    #[case("col one")]
    #[case("")]
    #[case("naïve")]
    #[case("x;y")]
    fn new_table_headers_must_be_identifiers(#[case] bad: &str) {
        let headers = vec!["ok".to_string(), bad.to_string()];
        assert!(validate_new_table_headers(&headers).is_err());
    }

    #[test]
    fn existing_header_match_is_case_insensitive() {
        let columns = vec![
            ColumnDescriptor::new("Name", "varchar(255)"),
            ColumnDescriptor::new("Age", "int(11)"),
        ];
        let headers = vec!["name".to_string(), "AGE".to_string()];
        assert!(validate_existing_headers(&headers, &columns).is_ok());

        let unknown = vec!["name".to_string(), "city".to_string()];
        assert!(validate_existing_headers(&unknown, &columns).is_err());
    }

    #[test]
    fn create_table_sql_covers_every_header() {
        let headers = vec!["name".to_string(), "age".to_string()];
        let sql = build_create_table_sql("people", &headers).unwrap();
        assert!(sql.starts_with("CREATE TABLE `people` ("));
        assert!(sql.contains("`id` INT(11) NOT NULL AUTO_INCREMENT"));
        assert!(sql.contains("`name` VARCHAR(255) NULL"));
        assert!(sql.contains("`age` VARCHAR(255) NULL"));
        assert!(sql.contains("PRIMARY KEY (`id`)"));
        assert!(sql.trim_end().ends_with("ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;"));
    }
}
