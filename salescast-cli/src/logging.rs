//! Subscriber setup for the binary. Logs go to stderr so stdout stays
//! clean for chart output.

use anyhow::{bail, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_level: String,
    pub format: LogFormat,
}

impl LoggingConfig {
    /// `RUST_LOG` (default `info`) and `SALESCAST_LOG_FORMAT` (`pretty` | `compact`).
    pub fn from_env() -> Result<Self> {
        let format = match std::env::var("SALESCAST_LOG_FORMAT") {
            Ok(raw) => parse_format(&raw)?,
            Err(_) => LogFormat::Compact,
        };
        Ok(Self {
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            format,
        })
    }
}

fn parse_format(raw: &str) -> Result<LogFormat> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" => Ok(LogFormat::Pretty),
        "compact" | "" => Ok(LogFormat::Compact),
        other => bail!("SALESCAST_LOG_FORMAT must be 'pretty' or 'compact', got '{other}'"),
    }
}

pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_level)?;
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()?,
    }
    Ok(())
}
