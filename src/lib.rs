// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! # rust-ai-transfer
//!
//! Tensor data movement and graph normalization for the rust-ai inference
//! stack: a layout-aware, type-converting copier between host and device
//! buffers, and a rewrite that brings fully-connected inputs to rank 2 before
//! lowering.
//!
//! ## Design Philosophy
//!
//! **Fail before writing**: every copy validates types and buffer sizes up
//! front. A rejected copy never leaves a half-written destination, and any
//! lock it took is released on every exit path.
//!
//! ## Modules
//!
//! - [`dtype`] - Element types, native-endian access and cast rules
//! - [`layout`] - Six-axis tensor addressing with optional padding
//! - [`stream`] - Ordering context and its configuration
//! - [`memory`] - Lockable device memory and scoped lock guards
//! - [`tensor`] - Host and remote tensor handles
//! - [`convert`] - Supported conversion table and the copy core
//! - [`copy`] - Copy entry points used by tensor I/O
//! - [`interop`] - Candle tensor conversion
//! - [`graph`] - Dataflow graph and the fully-connected rank rewrite
//! - [`error`] - Error type shared by every module
//! - [`logging`] - Subscriber setup
//! - [`traits`] - Configuration validation
//!
//! ## Quick Start
//!
//! ```rust
//! use rust_ai_transfer::{
//!     copy_from_memory, DeviceBuffer, ElementType, HostTensor, Layout, Padding, Result, Stream,
//!     StreamConfig,
//! };
//!
//! fn main() -> Result<()> {
//!     let stream = Stream::new(&StreamConfig::default())?;
//!
//!     // 1x4 f32 rows padded by one element on each side of x
//!     let layout = Layout::new(ElementType::F32, &[1, 1, 2, 2])?
//!         .with_padding(Padding::from_shape_order(&[0, 0, 0, 1], &[0, 0, 0, 1])?);
//!     let physical = [0.0f32, 1.5, 2.5, 0.0, 0.0, 3.5, 4.5, 0.0];
//!     let device = DeviceBuffer::from_slice(layout, &physical)?;
//!
//!     let mut host = HostTensor::zeros(ElementType::F16, &[1, 1, 2, 2]);
//!     copy_from_memory(&device, &mut host, &stream)?;
//!
//!     let values: Vec<f32> = host.to_vec::<half::f16>()?.iter().map(|v| v.to_f32()).collect();
//!     assert_eq!(values, vec![1.5, 2.5, 3.5, 4.5]);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod convert;
pub mod copy;
pub mod dtype;
pub mod error;
pub mod graph;
pub mod interop;
pub mod layout;
pub mod logging;
pub mod memory;
pub mod stream;
pub mod tensor;
pub mod traits;

// Re-exports for convenience
pub use convert::{convert_and_copy, is_supported, supported_conversions, ConversionKey};
pub use copy::{copy_from_memory, copy_tensor};
pub use dtype::{CastInto, Element, ElementType};
pub use error::{CopySide, CoreError, Result};
pub use graph::pass::{GraphRewrite, MatcherRule, TransformationCallback};
pub use graph::reshape_fc::ReshapeFullyConnected;
pub use graph::{infer_reshape, Graph, Node, NodeId, Op};
pub use layout::{Layout, Padding, TensorDims, MAX_RANK};
pub use logging::{init_logging, LogConfig, LogLevel};
pub use memory::{DeviceBuffer, DeviceMemory, MemReadLock, MemWriteLock};
pub use stream::{Stream, StreamConfig};
pub use tensor::{HostTensor, ReadAccess, RemoteTensor, TensorHandle, WriteAccess};
pub use traits::ValidatableConfig;
