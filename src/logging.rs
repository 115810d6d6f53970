// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Logging setup for the transfer and rewrite layers.
//!
//! ## Why This Module Exists
//!
//! The copier and the rewrite pass both emit `tracing` events. Embedding
//! applications need one place to install a subscriber with sensible
//! defaults, while still letting `RUST_LOG` override them at runtime.
//!
//! ## Targets
//!
//! - `rust_ai::transfer` - copy path selection and conversion failures
//! - `rust_ai::memory` - lock acquire and release on device memory
//! - `rust_ai::graph` - applied graph rewrites
//!
//! Copy tracing is noisy (one event per lock and per copy), so it has its own
//! level that applies to the first two targets only.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Targets that log once per copy or lock.
const COPY_TARGETS: [&str; 2] = ["rust_ai::transfer", "rust_ai::memory"];

/// Subscriber settings used when `RUST_LOG` is unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Level for every target without its own directive.
    pub level: LogLevel,
    /// Level for copy and lock events; `None` keeps `level`.
    pub copy_level: Option<LogLevel>,
    /// Prefix each line with a timestamp.
    pub with_timestamps: bool,
    /// Use ANSI colors.
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            copy_level: None,
            with_timestamps: true,
            with_ansi: true,
        }
    }
}

impl LogConfig {
    /// Create a new logging configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the level for all targets.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set a separate level for copy and lock events.
    #[must_use]
    pub fn with_copy_level(mut self, level: LogLevel) -> Self {
        self.copy_level = Some(level);
        self
    }

    /// Enable or disable timestamps.
    #[must_use]
    pub fn with_timestamps(mut self, enable: bool) -> Self {
        self.with_timestamps = enable;
        self
    }

    /// Enable or disable ANSI colors.
    #[must_use]
    pub fn with_ansi(mut self, enable: bool) -> Self {
        self.with_ansi = enable;
        self
    }

    /// Warnings only, no colors or timestamps; suits captured test output.
    #[must_use]
    pub fn testing() -> Self {
        Self {
            level: LogLevel::Warn,
            copy_level: None,
            with_timestamps: false,
            with_ansi: false,
        }
    }

    /// Filter directives equivalent to this configuration.
    fn directives(&self) -> String {
        let mut directives = self.level.as_filter_str().to_string();
        if let Some(copy) = self.copy_level {
            for target in COPY_TARGETS {
                directives.push_str(&format!(",{target}={}", copy.as_filter_str()));
            }
        }
        directives
    }
}

/// Log level enumeration.
///
/// Maps to tracing levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and above.
    Warn,
    /// Informational messages and above.
    #[default]
    Info,
    /// Debug messages and above.
    Debug,
    /// All messages including trace.
    Trace,
}

impl LogLevel {
    fn as_filter_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

static INIT_LOGGING: Once = Once::new();

/// Install the global tracing subscriber.
///
/// Only the first call in a process has any effect. A valid `RUST_LOG`
/// replaces the configured levels entirely.
///
/// ## Example
///
/// ```rust
/// use rust_ai_transfer::logging::{init_logging, LogConfig, LogLevel};
///
/// init_logging(&LogConfig::new().with_copy_level(LogLevel::Trace));
/// ```
pub fn init_logging(config: &LogConfig) {
    INIT_LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.directives()));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(config.with_ansi)
            .with_target(true);

        if config.with_timestamps {
            builder.init();
        } else {
            builder.without_time().init();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_builder() {
        let config = LogConfig::new()
            .with_level(LogLevel::Error)
            .with_copy_level(LogLevel::Trace)
            .with_timestamps(false)
            .with_ansi(false);

        assert_eq!(config.level, LogLevel::Error);
        assert_eq!(config.copy_level, Some(LogLevel::Trace));
        assert!(!config.with_timestamps);
        assert!(!config.with_ansi);
    }

    #[test]
    fn test_directives() {
        assert_eq!(LogConfig::default().directives(), "info");
        assert_eq!(LogConfig::testing().directives(), "warn");
        assert_eq!(
            LogConfig::new()
                .with_level(LogLevel::Warn)
                .with_copy_level(LogLevel::Debug)
                .directives(),
            "warn,rust_ai::transfer=debug,rust_ai::memory=debug"
        );
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(&LogConfig::testing());
        init_logging(&LogConfig::new().with_copy_level(LogLevel::Trace));
        tracing::trace!(target: "rust_ai::transfer", "after init");
    }
}
