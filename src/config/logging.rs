//! Logging configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Crates whose own logging is too chatty at `debug` and below
const NOISY_DEPENDENCIES: [&str; 4] = ["hyper", "hyper_util", "reqwest", "html5ever"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Raise the level by `-v` repetitions (never lowers it)
    pub fn raised_by(self, verbose: u8) -> Self {
        let requested = match verbose {
            0 => return self,
            1 => Self::Debug,
            _ => Self::Trace,
        };
        self.max(requested)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Colour codes in text output
    pub ansi: bool,
    /// Keep HTTP and HTML parser internals at `warn` whatever the level
    pub quiet_dependencies: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            level: LogLevel::Info,
            ansi: true,
            quiet_dependencies: true,
        }
    }
}

impl LoggingConfig {
    /// Effective level after `-v` repetitions and `--quiet`
    pub fn effective_level(&self, verbose: u8, quiet: bool) -> LogLevel {
        if quiet && verbose == 0 {
            return self.level.min(LogLevel::Warn);
        }
        self.level.raised_by(verbose)
    }

    /// `EnvFilter` directive for the effective level
    pub fn directive(&self, verbose: u8, quiet: bool) -> String {
        let level = self.effective_level(verbose, quiet);
        let mut directive = level.as_str().to_string();
        if self.quiet_dependencies && level > LogLevel::Warn {
            for name in NOISY_DEPENDENCIES {
                directive.push_str(&format!(",{}=warn", name));
            }
        }
        directive
    }
}
