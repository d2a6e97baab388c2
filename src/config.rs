//! Configuration file handling
//!
//! Settings live in `config.toml` under the platform config directory.
//! Loading never fails: a missing or unreadable file falls back to defaults
//! so the shell always starts.

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    #[serde(rename = "trace")]
    Trace,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "info")]
    Info,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "error")]
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Settings for the local SQL assistant.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AiConfig {
    /// Path to the GGUF model artifact. The assistant refuses to start
    /// without one.
    pub model_path: Option<PathBuf>,
    /// CPU threads for inference.
    pub n_threads: i32,
    /// Context window in tokens.
    pub context_size: u32,
    /// Generation budget per completion.
    pub max_tokens: usize,
    /// Hard cap on one generation call.
    pub generation_timeout_secs: u64,
    /// INSERT rows generated when the command does not say how many.
    pub default_rows_to_generate: usize,
    /// Execute generated scripts without asking first.
    pub auto_execute: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            n_threads: 4,
            context_size: 2048,
            max_tokens: 1024,
            generation_timeout_secs: 120,
            default_rows_to_generate: 5,
            auto_execute: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Default connection URL used when none is given on the command line.
    pub database_url: Option<String>,
    /// XML credential list consulted at login.
    pub users_file: PathBuf,
    /// Rows shown by the table preview.
    pub preview_rows: u32,
    /// Hard cap on one executed statement.
    pub statement_timeout_secs: u64,
    pub log_level: LogLevel,
    pub ai: AiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            users_file: PathBuf::from("users.xml"),
            preview_rows: 10,
            statement_timeout_secs: 30,
            log_level: LogLevel::default(),
            ai: AiConfig::default(),
        }
    }
}

impl Config {
    /// Get the configuration directory path - single source of truth for all
    /// config files. Returns a temp directory during tests, the real config
    /// directory otherwise.
    pub fn get_config_directory() -> Result<PathBuf, Box<dyn Error>> {
        let is_test = std::env::var("RUST_TEST_MODE").is_ok()
            || std::thread::current()
                .name()
                .map(|name| name.contains("test"))
                .unwrap_or(false);

        let dir = if is_test {
            std::env::temp_dir().join(format!("tablesmith_test_{}", std::process::id()))
        } else {
            dirs::config_dir()
                .ok_or("failed to determine the configuration directory")?
                .join("tablesmith")
        };

        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }

    fn config_path() -> Option<PathBuf> {
        Self::get_config_directory()
            .ok()
            .map(|dir| dir.join("config.toml"))
    }

    /// Load the configuration, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!(
                        "Warning: {} is not valid TOML ({e}); using default configuration.",
                        path.display()
                    );
                    Self::default()
                }
            },
            Err(_) => {
                // First run: write the defaults so the file is there to edit.
                let config = Self::default();
                let _ = config.save();
                config
            }
        }
    }

    /// Persist the configuration as TOML.
    pub fn save(&self) -> Result<(), Box<dyn Error>> {
        let path = Self::config_path().ok_or("failed to determine the config file path")?;
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_behaviour() {
        let config = Config::default();
        assert_eq!(config.users_file, PathBuf::from("users.xml"));
        assert_eq!(config.preview_rows, 10);
        assert_eq!(config.ai.default_rows_to_generate, 5);
        assert!(!config.ai.auto_execute);
        assert!(config.ai.model_path.is_none());
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.statement_timeout_secs, 30);
        assert_eq!(config.ai.n_threads, 4);
    }

    #[test]
    fn partial_toml_overrides_only_named_keys() {
        let config: Config = toml::from_str(
            r#"
database_url = "mysql://root@localhost/appdb"

[ai]
model_path = "/models/sql.gguf"
default_rows_to_generate = 8
"#,
        )
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("mysql://root@localhost/appdb"));
        assert_eq!(config.ai.model_path, Some(PathBuf::from("/models/sql.gguf")));
        assert_eq!(config.ai.default_rows_to_generate, 8);
        // untouched keys keep their defaults
        assert_eq!(config.preview_rows, 10);
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = Config::default();
        config.database_url = Some("mysql://root@localhost/appdb".to_string());
        config.ai.max_tokens = 512;

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.database_url, config.database_url);
        assert_eq!(parsed.ai.max_tokens, 512);
    }
}
