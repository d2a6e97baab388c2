//! MySQL/MariaDB connection handling and the shared database error type

use std::time::Duration;

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Default MySQL port applied when the connection URL omits one.
pub const DEFAULT_PORT: u16 = 3306;

/// Errors that can occur during database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("invalid database URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported database URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("schema read failed: {0}")]
    SchemaRead(String),

    #[error("statement batch is empty")]
    EmptyBatch,

    #[error("batch aborted and rolled back at statement `{statement}`: {message}")]
    BatchFailed { statement: String, message: String },

    #[error("statement timed out after {timeout_secs}s: `{statement}`")]
    StatementTimeout {
        statement: String,
        timeout_secs: u64,
    },

    #[error("identifier error: {0}")]
    Ident(#[from] crate::ident::IdentError),

    #[error("column type '{0}' is not in the allowed set")]
    DisallowedColumnType(String),

    #[error("import error: {0}")]
    Import(String),

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Normalize a connection URL: add the mysql scheme when missing, reject
/// other schemes, and fill in the default port.
pub fn normalize_url(raw: &str) -> Result<Url, DatabaseError> {
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("mysql://{raw}")
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|e| DatabaseError::InvalidUrl(format!("failed to parse URL: {e}")))?;

    if url.scheme() != "mysql" {
        return Err(DatabaseError::UnsupportedScheme(url.scheme().to_string()));
    }

    if url.port().is_none() && url.host_str().is_some() {
        url.set_port(Some(DEFAULT_PORT))
            .map_err(|_| DatabaseError::InvalidUrl(with_scheme.clone()))?;
    }

    Ok(url)
}

/// Open a connection pool against the given URL.
pub async fn connect(raw_url: &str) -> Result<MySqlPool, DatabaseError> {
    let url = normalize_url(raw_url)?;
    debug!(host = ?url.host_str(), db = url.path(), "connecting to MySQL");

    MySqlPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(url.as_str())
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))
}

/// Build a pool without connecting. Connections are established on first
/// use, which lets pure validation paths run without a reachable server.
pub fn connect_lazy(raw_url: &str) -> Result<MySqlPool, DatabaseError> {
    let url = normalize_url(raw_url)?;
    MySqlPoolOptions::new()
        .max_connections(5)
        .connect_lazy(url.as_str())
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("mysql://root:pw@localhost:3306/appdb", "localhost", 3306, "/appdb")]
    #[case("mysql://root@db.internal/appdb", "db.internal", 3306, "/appdb")]
    #[case("root:pw@localhost/appdb", "localhost", 3306, "/appdb")]
    fn normalizes_connection_urls(
        #[case] raw: &str,
        #[case] host: &str,
        #[case] port: u16,
        #[case] path: &str,
    ) {
        let url = normalize_url(raw).unwrap();
        assert_eq!(url.scheme(), "mysql");
        assert_eq!(url.host_str(), Some(host));
        assert_eq!(url.port(), Some(port));
        assert_eq!(url.path(), path);
    }

    #[test]
    fn rejects_foreign_schemes() {
        assert!(matches!(
            normalize_url("postgres://localhost/db"),
            Err(DatabaseError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            normalize_url("://"),
            Err(DatabaseError::InvalidUrl(_))
        ));
    }

    #[test]
    fn lazy_pool_builds_without_a_server() {
        assert!(connect_lazy("mysql://root@localhost/appdb").is_ok());
    }
}
