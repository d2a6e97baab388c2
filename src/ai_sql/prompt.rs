//! Prompt templates for local SQL generation

use std::fmt::Write as _;

use crate::schema::ColumnDescriptor;

/// Prompt generator for the SQL assistant
///
/// Every template is deterministic and line-oriented: a directive, the schema
/// context when one is supplied, the user's instruction quoted verbatim. The
/// user text is not sanitised beyond quoting — the model is a text generator,
/// not an interpreter; what it produces goes through extraction and an
/// execution confirmation before it can touch the database.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Assemble a prompt from a directive, the user's instruction and an
    /// optional column context.
    pub fn build(
        directive: &str,
        user_text: &str,
        schema: Option<&[ColumnDescriptor]>,
    ) -> String {
        let mut prompt = String::new();
        let _ = writeln!(prompt, "{directive}");
        if let Some(columns) = schema {
            if !columns.is_empty() {
                let listed = columns
                    .iter()
                    .map(|c| format!("{} {}", c.name, c.type_name))
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = writeln!(prompt, "Columns: {listed}.");
            }
        }
        let _ = writeln!(prompt, "User instruction: \"{user_text}\"");
        prompt
    }

    /// Prompt for a single CREATE TABLE statement from a free-text request.
    pub fn create_table(user_text: &str) -> String {
        let mut prompt = Self::build(
            "You are a helpful assistant. ONLY output the SQL statement, without any extra explanation or commentary.",
            user_text,
            None,
        );
        prompt.push_str(
            "Respond with a valid MariaDB CREATE TABLE statement, starting exactly with \"CREATE TABLE\" and ending with a semicolon. Do NOT include any leading or trailing text.",
        );
        prompt
    }

    /// Prompt for one free-form MariaDB statement.
    pub fn statement(user_text: &str) -> String {
        Self::build(
            "You are an assistant that generates valid SQL for MariaDB. Respond ONLY with a valid MariaDB statement (no explanations, no comments).",
            user_text,
            None,
        )
    }

    /// Prompt for a batch of INSERT statements against a known table.
    pub fn insert_rows(table: &str, columns: &[ColumnDescriptor], rows: usize) -> String {
        let listed = columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.type_name))
            .collect::<Vec<_>>()
            .join(", ");
        let mut prompt = String::new();
        let _ = writeln!(
            prompt,
            "Generate {rows} valid MariaDB INSERT statements for table '{table}' (columns: {listed})."
        );
        prompt.push_str(
            "Provide only the INSERT statements, each ending with semicolon. Do NOT include any commentary or extra text.",
        );
        prompt
    }
}
