// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Execution streams: the ordering context passed to every memory lock.
//!
//! A [`Stream`] stands for one device command queue. Locks on device memory
//! are acquired against a stream so an implementation can wait for work queued
//! on it before exposing host-visible bytes.
//!
//! ## Environment Variables
//!
//! - `RUST_AI_DEVICE_ORDINAL` - Device ordinal the stream is bound to (e.g., `0`, `1`)
//! - `RUST_AI_STREAM_LABEL` - Label attached to the stream in logs
//!
//! ## Example
//!
//! ```rust
//! use rust_ai_transfer::{Stream, StreamConfig};
//!
//! let stream = Stream::new(&StreamConfig::new().with_label("upload"))?;
//! assert_eq!(stream.label(), Some("upload"));
//! # Ok::<(), rust_ai_transfer::CoreError>(())
//! ```

use crate::error::{CoreError, Result};
use crate::traits::ValidatableConfig;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Configuration for creating a [`Stream`].
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    /// Device ordinal the stream is bound to.
    pub device_ordinal: usize,
    /// Label used in log output.
    pub label: Option<String>,
    /// Emit a trace event for every lock routed through the stream.
    pub profiling: bool,
}

impl StreamConfig {
    /// Create a new stream configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the device ordinal.
    #[must_use]
    pub fn with_device_ordinal(mut self, ordinal: usize) -> Self {
        self.device_ordinal = ordinal;
        self
    }

    /// Set the stream label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Enable or disable per-lock trace events.
    #[must_use]
    pub fn with_profiling(mut self, enable: bool) -> Self {
        self.profiling = enable;
        self
    }

    /// Build configuration from environment variables.
    ///
    /// Reads `RUST_AI_DEVICE_ORDINAL` and `RUST_AI_STREAM_LABEL`. Unparseable
    /// values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RUST_AI_DEVICE_ORDINAL") {
            if let Ok(ordinal) = val.parse::<usize>() {
                config.device_ordinal = ordinal;
            }
        }

        if let Ok(label) = std::env::var("RUST_AI_STREAM_LABEL") {
            if !label.is_empty() {
                config.label = Some(label);
            }
        }

        config
    }
}

impl ValidatableConfig for StreamConfig {
    fn validate(&self) -> Result<()> {
        if self.label.as_deref().is_some_and(|l| l.trim().is_empty()) {
            return Err(CoreError::invalid_config("stream label must not be blank"));
        }
        Ok(())
    }
}

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(0);

/// Ordering context for device memory access.
#[derive(Debug)]
pub struct Stream {
    id: u64,
    config: StreamConfig,
    locks: AtomicUsize,
}

impl Stream {
    /// Create a stream from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if the configuration fails validation.
    pub fn new(config: &StreamConfig) -> Result<Self> {
        config.validate()?;
        let id = NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            target: "rust_ai::memory",
            stream = id,
            device = config.device_ordinal,
            label = config.label.as_deref().unwrap_or(""),
            "Stream created"
        );
        Ok(Self {
            id,
            config: config.clone(),
            locks: AtomicUsize::new(0),
        })
    }

    /// Process-unique stream id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Device ordinal the stream is bound to.
    #[must_use]
    pub fn device_ordinal(&self) -> usize {
        self.config.device_ordinal
    }

    /// Stream label, if configured.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.config.label.as_deref()
    }

    /// Number of memory locks acquired against this stream.
    #[must_use]
    pub fn lock_count(&self) -> usize {
        self.locks.load(Ordering::SeqCst)
    }

    /// Record a lock acquisition. Called by [`crate::DeviceMemory`] implementations.
    pub fn record_lock(&self, write: bool) {
        self.locks.fetch_add(1, Ordering::SeqCst);
        if self.config.profiling {
            tracing::trace!(
                target: "rust_ai::memory",
                stream = self.id,
                write,
                "Lock routed through stream"
            );
        }
    }
}
