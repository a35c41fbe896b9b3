//! Log output for a run.
//!
//! The global section chooses the level (`log_level`, default `WARNING`) and
//! the layout (`log_format`: `SHORT`, `DEFAULT` or `LONG`). `RUST_LOG`, when
//! set, replaces the level filter.

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{ConfigEntry, SettingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Short,
    Default,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `"warn"`.
    pub directive: &'static str,
    pub format: LogFormat,
}

impl LogSettings {
    pub fn from_global(global: &ConfigEntry) -> Result<Self, SettingError> {
        let level = global.text_or("log_level", "WARNING").to_ascii_uppercase();
        let directive = match level.as_str() {
            "FATAL" | "ERROR" => "error",
            "WARNING" => "warn",
            "STATUS" | "INFO" => "info",
            "DEBUG" => "debug",
            "TRACE" => "trace",
            _ => {
                return Err(invalid(
                    global,
                    "log_level",
                    level,
                    "expected one of: FATAL, ERROR, WARNING, STATUS, INFO, DEBUG, TRACE",
                ));
            }
        };

        let format = global.text_or("log_format", "DEFAULT").to_ascii_uppercase();
        let format = match format.as_str() {
            "SHORT" => LogFormat::Short,
            "DEFAULT" => LogFormat::Default,
            "LONG" => LogFormat::Long,
            _ => {
                return Err(invalid(
                    global,
                    "log_format",
                    format,
                    "expected one of: SHORT, DEFAULT, LONG",
                ));
            }
        };

        Ok(Self { directive, format })
    }
}

fn invalid(global: &ConfigEntry, key: &str, value: String, reason: &str) -> SettingError {
    SettingError::Invalid {
        entry: global.name().to_string(),
        key: key.to_string(),
        value,
        reason: reason.to_string(),
    }
}

/// Installs the global subscriber. Does nothing if one is already installed.
pub fn init(global: &ConfigEntry) -> Result<(), SettingError> {
    let settings = LogSettings::from_global(global)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.directive));

    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let _ = match settings.format {
        LogFormat::Short => builder.without_time().with_target(false).compact().try_init(),
        LogFormat::Default => builder.with_target(false).try_init(),
        LogFormat::Long => builder
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .try_init(),
    };
    Ok(())
}
