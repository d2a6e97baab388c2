pub mod ai_sql;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod csv_import;
pub mod database;
pub mod executor;
pub mod format;
pub mod ident;
pub mod logging;
pub mod prompt;
pub mod schema;
pub mod table_ops;

pub use ai_sql::{AiError, GeneratedScript, SqlAssistant};
pub use auth::CredentialStore;
pub use config::Config;
pub use executor::{ExecutionOutcome, StatementExecutor};
pub use schema::{ColumnDescriptor, SchemaInspector};
