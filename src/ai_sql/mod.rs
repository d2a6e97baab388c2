//! SQL generation from natural language with a locally hosted model
//!
//! The pipeline: build a prompt (optionally embedding schema context), hand
//! it to the serialized model worker, extract executable statements from the
//! raw completion, and leave execution to the statement executor. Scripts are
//! per-request values; nothing here is persisted.

pub mod client;
pub mod error;
pub mod extract;
pub mod prompt;

pub use client::{CompletionEngine, GenerationClient};
pub use error::{AiError, AiResult};
pub use extract::AnchorMode;
pub use prompt::PromptBuilder;

use tracing::{debug, info};

use crate::config::AiConfig;
use crate::schema::ColumnDescriptor;

/// One generation result: the raw model text plus the statements isolated
/// from it. `statements` may be empty — callers must report that distinctly
/// instead of executing nothing.
#[derive(Debug, Clone)]
pub struct GeneratedScript {
    pub table_name: Option<String>,
    pub raw_text: String,
    pub statements: Vec<String>,
}

impl GeneratedScript {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Orchestrates prompt building, generation and statement extraction.
pub struct SqlAssistant {
    client: GenerationClient,
    default_rows: usize,
}

impl SqlAssistant {
    /// Build the assistant over the configured local model.
    ///
    /// Model-load failures abort construction; there is no "AI disabled"
    /// fallback mode.
    pub fn new(config: &AiConfig) -> AiResult<Self> {
        let client = GenerationClient::local(config)?;
        Ok(Self {
            client,
            default_rows: config.default_rows_to_generate,
        })
    }

    /// Assistant over an already-running client (test seam).
    pub fn with_client(client: GenerationClient, default_rows: usize) -> Self {
        Self {
            client,
            default_rows,
        }
    }

    /// How many INSERT rows to generate when the caller does not say.
    pub fn default_rows(&self) -> usize {
        self.default_rows
    }

    /// Generate a CREATE TABLE statement from a free-text description.
    pub async fn create_table(&self, request: &str) -> AiResult<GeneratedScript> {
        info!("generating CREATE TABLE from request");
        let prompt = PromptBuilder::create_table(request);
        let raw = self.client.generate(&prompt).await?;
        let statements = extract::extract(&raw, "CREATE TABLE", AnchorMode::Last);
        debug!(statements = statements.len(), "extraction finished");
        Ok(GeneratedScript {
            table_name: None,
            raw_text: raw,
            statements,
        })
    }

    /// Generate one free-form MariaDB statement.
    ///
    /// Anchoring still looks for CREATE TABLE; when the model produced some
    /// other statement the extractor degrades to the whole cleaned text.
    pub async fn statement(&self, request: &str) -> AiResult<GeneratedScript> {
        info!("generating free-form statement from request");
        let prompt = PromptBuilder::statement(request);
        let raw = self.client.generate(&prompt).await?;
        let statements = extract::extract(&raw, "CREATE TABLE", AnchorMode::Last);
        Ok(GeneratedScript {
            table_name: None,
            raw_text: raw,
            statements,
        })
    }

    /// Generate `rows` INSERT statements for a table with known columns.
    pub async fn insert_rows(
        &self,
        table: &str,
        columns: &[ColumnDescriptor],
        rows: usize,
    ) -> AiResult<GeneratedScript> {
        info!(table, rows, "generating INSERT batch");
        let prompt = PromptBuilder::insert_rows(table, columns, rows);
        let raw = self.client.generate(&prompt).await?;
        let statements = extract::extract_all(&raw, "INSERT");
        debug!(statements = statements.len(), "extraction finished");
        Ok(GeneratedScript {
            table_name: Some(table.to_string()),
            raw_text: raw,
            statements,
        })
    }

    /// Release the model. Idempotent; also runs on drop.
    pub fn shutdown(&self) {
        self.client.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Canned(&'static str);

    impl CompletionEngine for Canned {
        fn complete(&mut self, _prompt: &str) -> AiResult<String> {
            Ok(self.0.to_string())
        }
    }

    fn assistant(reply: &'static str) -> SqlAssistant {
        let client = GenerationClient::start(
            move || Ok(Box::new(Canned(reply)) as Box<dyn CompletionEngine>),
            Duration::from_secs(5),
        )
        .unwrap();
        SqlAssistant::with_client(client, 5)
    }

    #[tokio::test]
    async fn create_table_flow_extracts_the_statement() {
        let assistant =
            assistant("Sure, here you go:\nCREATE TABLE invoices (id INT);\nHope that helps!");
        let script = assistant.create_table("a table for invoices").await.unwrap();
        assert_eq!(script.statements, vec!["CREATE TABLE invoices (id INT);"]);
        assert!(script.raw_text.contains("Hope that helps!"));
        assert!(script.table_name.is_none());
    }

    #[tokio::test]
    async fn insert_flow_keeps_only_insert_segments() {
        let assistant = assistant(
            "INSERT INTO t VALUES (1);\nAs requested.\nINSERT INTO t VALUES (2);",
        );
        let columns = vec![ColumnDescriptor::new("id", "int(11)")];
        let script = assistant.insert_rows("t", &columns, 2).await.unwrap();
        assert_eq!(script.statements.len(), 2);
        assert_eq!(script.table_name.as_deref(), Some("t"));
    }

    #[tokio::test]
    async fn insert_flow_can_come_back_empty() {
        let assistant = assistant("I cannot generate rows for that table.");
        let columns = vec![ColumnDescriptor::new("id", "int(11)")];
        let script = assistant.insert_rows("t", &columns, 3).await.unwrap();
        assert!(script.is_empty());
    }
}
