// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Tensor handles and their buffer provenance.
//!
//! A tensor is either **direct** (its bytes live in host memory and can be
//! borrowed) or **indirect** (its bytes live in [`DeviceMemory`] and must be
//! locked first). [`TensorHandle`] exposes that distinction as a capability so
//! the copier classifies a handle by asking it, never by downcasting.
//!
//! ## Example
//!
//! ```rust
//! use rust_ai_transfer::{HostTensor, Stream, StreamConfig, TensorHandle};
//!
//! let tensor = HostTensor::from_slice(&[2], &[1.0f32, 2.0])?;
//! let stream = Stream::new(&StreamConfig::default())?;
//!
//! let access = tensor.acquire_read(&stream)?;
//! assert!(!access.is_locked());
//! assert_eq!(access.len(), 8);
//! # Ok::<(), rust_ai_transfer::CoreError>(())
//! ```

use crate::dtype::{Element, ElementType};
use crate::error::{CopySide, CoreError, Result};
use crate::memory::{DeviceMemory, MemReadLock, MemWriteLock};
use crate::stream::Stream;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A tensor whose bytes may be host-resident or device-resident.
pub trait TensorHandle {
    /// Element type of the tensor.
    fn element_type(&self) -> ElementType;

    /// Logical shape.
    fn shape(&self) -> &[usize];

    /// `true` if the bytes need a lock before host access.
    fn is_indirect(&self) -> bool;

    /// Host bytes of a direct tensor.
    fn data(&self) -> Option<&[u8]>;

    /// Mutable host bytes of a direct tensor.
    fn data_mut(&mut self) -> Option<&mut [u8]>;

    /// Backing memory of an indirect tensor.
    fn memory(&self) -> Option<&dyn DeviceMemory> {
        None
    }

    /// Logical element count.
    fn element_count(&self) -> usize {
        self.shape().iter().product()
    }

    /// Obtain host-visible bytes for reading, locking indirect memory.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NullBuffer` if the handle exposes nothing for its
    /// provenance, or the lock error of the backing memory.
    fn acquire_read<'a>(&'a self, stream: &Stream) -> Result<ReadAccess<'a>> {
        if self.is_indirect() {
            let memory = self
                .memory()
                .ok_or_else(|| CoreError::null_buffer(CopySide::Source))?;
            return Ok(ReadAccess::Locked(memory.lock_read(stream)?));
        }
        self.data()
            .map(ReadAccess::Host)
            .ok_or_else(|| CoreError::null_buffer(CopySide::Source))
    }

    /// Obtain host-visible bytes for writing, locking indirect memory.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NullBuffer` if the handle exposes nothing for its
    /// provenance, or the lock error of the backing memory.
    fn acquire_write<'a>(&'a mut self, stream: &Stream) -> Result<WriteAccess<'a>> {
        if self.is_indirect() {
            let memory = self
                .memory()
                .ok_or_else(|| CoreError::null_buffer(CopySide::Destination))?;
            return Ok(WriteAccess::Locked(memory.lock_write(stream)?));
        }
        self.data_mut()
            .map(WriteAccess::Host)
            .ok_or_else(|| CoreError::null_buffer(CopySide::Destination))
    }
}

/// Readable bytes of a tensor, held for the duration of a copy.
#[derive(Debug)]
pub enum ReadAccess<'a> {
    /// Borrowed host memory.
    Host(&'a [u8]),
    /// Locked device memory.
    Locked(MemReadLock<'a>),
}

impl ReadAccess<'_> {
    /// `true` if a device lock is held.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked(_))
    }
}

impl Deref for ReadAccess<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Host(bytes) => &**bytes,
            Self::Locked(lock) => &**lock,
        }
    }
}

/// Writable bytes of a tensor, held for the duration of a copy.
#[derive(Debug)]
pub enum WriteAccess<'a> {
    /// Borrowed host memory.
    Host(&'a mut [u8]),
    /// Locked device memory.
    Locked(MemWriteLock<'a>),
}

impl WriteAccess<'_> {
    /// `true` if a device lock is held.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked(_))
    }
}

impl Deref for WriteAccess<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Host(bytes) => &**bytes,
            Self::Locked(lock) => &**lock,
        }
    }
}

impl DerefMut for WriteAccess<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        match self {
            Self::Host(bytes) => &mut **bytes,
            Self::Locked(lock) => &mut **lock,
        }
    }
}

/// Contiguous tensor in host memory.
#[derive(Debug, Clone, PartialEq)]
pub struct HostTensor {
    element_type: ElementType,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl HostTensor {
    /// Zero-filled tensor.
    #[must_use]
    pub fn zeros(element_type: ElementType, shape: &[usize]) -> Self {
        let count: usize = shape.iter().product();
        Self {
            element_type,
            shape: shape.to_vec(),
            data: vec![0; element_type.bytes_for(count)],
        }
    }

    /// Tensor from typed values in row-major order.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ShapeMismatch` if `values.len()` differs from the
    /// shape's element count.
    pub fn from_slice<T: Element>(shape: &[usize], values: &[T]) -> Result<Self> {
        let count: usize = shape.iter().product();
        if values.len() != count {
            return Err(CoreError::shape_mismatch(shape, vec![values.len()]));
        }
        let mut data = vec![0; count * T::SIZE];
        for (value, slot) in values.iter().zip(data.chunks_exact_mut(T::SIZE)) {
            value.write_ne(slot);
        }
        Ok(Self {
            element_type: T::TYPE,
            shape: shape.to_vec(),
            data,
        })
    }

    /// Tensor from raw native-endian bytes.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::BufferTooSmall` if `bytes` is shorter than the shape
    /// requires, or `CoreError::ShapeMismatch` if it is longer.
    pub fn from_bytes(element_type: ElementType, shape: &[usize], bytes: Vec<u8>) -> Result<Self> {
        let count: usize = shape.iter().product();
        let required = element_type.bytes_for(count);
        if bytes.len() < required {
            return Err(CoreError::buffer_too_small(
                CopySide::Source,
                required,
                bytes.len(),
            ));
        }
        if bytes.len() > required {
            return Err(CoreError::shape_mismatch(
                shape,
                vec![bytes.len() / element_type.size()],
            ));
        }
        Ok(Self {
            element_type,
            shape: shape.to_vec(),
            data: bytes,
        })
    }

    /// Raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Copy out the values as `T`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnsupportedDType` if `T` is not the tensor's element
    /// type.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if T::TYPE != self.element_type {
            return Err(CoreError::UnsupportedDType(format!(
                "tensor holds {}, {} was requested",
                self.element_type,
                T::TYPE
            )));
        }
        Ok(self.data.chunks_exact(T::SIZE).map(T::read_ne).collect())
    }
}

impl TensorHandle for HostTensor {
    fn element_type(&self) -> ElementType {
        self.element_type
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn is_indirect(&self) -> bool {
        false
    }

    fn data(&self) -> Option<&[u8]> {
        Some(&self.data)
    }

    fn data_mut(&mut self) -> Option<&mut [u8]> {
        Some(&mut self.data)
    }
}

/// Tensor backed by device memory.
#[derive(Clone)]
pub struct RemoteTensor {
    memory: Arc<dyn DeviceMemory>,
}

impl RemoteTensor {
    /// Wrap a device allocation.
    pub fn new(memory: Arc<dyn DeviceMemory>) -> Self {
        Self { memory }
    }

    /// Shared handle to the backing allocation.
    #[must_use]
    pub fn original_memory(&self) -> &Arc<dyn DeviceMemory> {
        &self.memory
    }
}

impl std::fmt::Debug for RemoteTensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTensor")
            .field("layout", self.memory.layout())
            .finish()
    }
}

impl TensorHandle for RemoteTensor {
    fn element_type(&self) -> ElementType {
        self.memory.layout().element_type()
    }

    fn shape(&self) -> &[usize] {
        self.memory.layout().shape()
    }

    fn is_indirect(&self) -> bool {
        true
    }

    fn data(&self) -> Option<&[u8]> {
        None
    }

    fn data_mut(&mut self) -> Option<&mut [u8]> {
        None
    }

    fn memory(&self) -> Option<&dyn DeviceMemory> {
        Some(self.memory.as_ref())
    }
}
