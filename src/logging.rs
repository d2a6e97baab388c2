//! Logging initialisation
//!
//! One fmt subscriber on stderr. The configured level is the default;
//! `TABLESMITH_LOG` overrides it with a full EnvFilter directive.

use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;

pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_env("TABLESMITH_LOG")
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    // try_init: tests and repeated embedding may initialise more than once.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
