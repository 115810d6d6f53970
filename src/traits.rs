// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Common traits shared by configuration types.

use crate::error::Result;

/// Configuration validation trait.
///
/// Configuration structs implement this so constructors can reject bad
/// parameters up front.
///
/// # Example
///
/// ```rust
/// use rust_ai_transfer::{CoreError, Result, ValidatableConfig};
///
/// #[derive(Clone)]
/// struct ChunkConfig {
///     chunk_elems: usize,
/// }
///
/// impl ValidatableConfig for ChunkConfig {
///     fn validate(&self) -> Result<()> {
///         if self.chunk_elems == 0 {
///             return Err(CoreError::invalid_config("chunk_elems must be > 0"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait ValidatableConfig: Clone + Send + Sync {
    /// Validate the configuration parameters.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if validation fails.
    fn validate(&self) -> Result<()>;
}
