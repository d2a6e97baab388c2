//! Error types for local SQL generation

use std::path::PathBuf;

use thiserror::Error;

/// Result type for SQL assistant operations
pub type AiResult<T> = Result<T, AiError>;

/// Errors that can occur while generating SQL with the local model
#[derive(Error, Debug)]
pub enum AiError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("model artifact not found at {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("generation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("model worker is no longer running")]
    WorkerGone,
}

impl AiError {
    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            AiError::Configuration(msg) => {
                format!("Configuration issue: {msg}. Check your config file.")
            }
            AiError::ArtifactNotFound(path) => format!(
                "Model file not found at {}. Point [ai] model_path at a GGUF file.",
                path.display()
            ),
            AiError::EmptyPrompt => "The instruction text is empty.".to_string(),
            AiError::Timeout { timeout_secs } => format!(
                "The model did not answer within {timeout_secs}s. Increase [ai] generation_timeout_secs or use a smaller model."
            ),
            _ => self.to_string(),
        }
    }
}
