// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Device memory and scoped host-access locks.
//!
//! ## Why This Module Exists
//!
//! Device (or remote) memory is not host-addressable. Before its bytes can be
//! read or written a lock must be taken that maps the buffer into host memory
//! and excludes concurrent device access, e.g. a command queue draining into
//! the same allocation. This module provides:
//!
//! 1. **[`DeviceMemory`]**: the capability trait the copier depends on
//! 2. **[`MemReadLock`] / [`MemWriteLock`]**: scoped guards released on drop
//! 3. **[`DeviceBuffer`]**: a host-emulated implementation backed by a
//!    `parking_lot::RwLock`, used when no real device runtime is attached
//!
//! ## Design Decisions
//!
//! - **Release on drop**: locks are plain guards, so every exit path of a copy
//!   (success, conversion error, panic) releases them.
//!
//! - **Type-erased guards**: the lock types box whatever guard the backing
//!   allocator hands out, so the copier never names a concrete memory type.

use crate::dtype::Element;
use crate::error::{CoreError, Result};
use crate::layout::Layout;
use crate::stream::Stream;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::ops::{Deref, DerefMut};

/// Memory that needs an explicit lock before its bytes are host-visible.
pub trait DeviceMemory: Send + Sync {
    /// Layout of the allocation, including element type and padding.
    fn layout(&self) -> &Layout;

    /// Acquire shared host access for reading.
    ///
    /// # Errors
    ///
    /// Implementations return an error if the buffer cannot be mapped.
    fn lock_read<'a>(&'a self, stream: &Stream) -> Result<MemReadLock<'a>>;

    /// Acquire exclusive host access for writing.
    ///
    /// # Errors
    ///
    /// Implementations return an error if the buffer cannot be mapped.
    fn lock_write<'a>(&'a self, stream: &Stream) -> Result<MemWriteLock<'a>>;
}

/// Shared host view of locked device memory.
pub struct MemReadLock<'a> {
    guard: Box<dyn Deref<Target = [u8]> + 'a>,
}

impl<'a> MemReadLock<'a> {
    /// Wrap an allocator guard.
    pub fn new(guard: impl Deref<Target = [u8]> + 'a) -> Self {
        Self {
            guard: Box::new(guard),
        }
    }

    /// Locked bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.guard
    }
}

impl Deref for MemReadLock<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.guard
    }
}

impl Drop for MemReadLock<'_> {
    fn drop(&mut self) {
        tracing::trace!(target: "rust_ai::memory", bytes = self.guard.len(), "Read lock released");
    }
}

impl std::fmt::Debug for MemReadLock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemReadLock")
            .field("bytes", &self.guard.len())
            .finish()
    }
}

/// Exclusive host view of locked device memory.
pub struct MemWriteLock<'a> {
    guard: Box<dyn DerefMut<Target = [u8]> + 'a>,
}

impl<'a> MemWriteLock<'a> {
    /// Wrap an allocator guard.
    pub fn new(guard: impl DerefMut<Target = [u8]> + 'a) -> Self {
        Self {
            guard: Box::new(guard),
        }
    }

    /// Locked bytes.
    #[must_use]
    pub fn data(&mut self) -> &mut [u8] {
        &mut self.guard
    }
}

impl Deref for MemWriteLock<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.guard
    }
}

impl DerefMut for MemWriteLock<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.guard
    }
}

impl Drop for MemWriteLock<'_> {
    fn drop(&mut self) {
        tracing::trace!(target: "rust_ai::memory", bytes = self.guard.len(), "Write lock released");
    }
}

impl std::fmt::Debug for MemWriteLock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemWriteLock")
            .field("bytes", &self.guard.len())
            .finish()
    }
}

/// Host-emulated device allocation.
///
/// Holds `layout.byte_size()` bytes, padding included, behind a reader/writer
/// lock.
#[derive(Debug)]
pub struct DeviceBuffer {
    layout: Layout,
    data: RwLock<Vec<u8>>,
}

impl DeviceBuffer {
    /// Allocate a zero-filled buffer for `layout`.
    #[must_use]
    pub fn new(layout: Layout) -> Self {
        let bytes = vec![0; layout.byte_size()];
        Self {
            layout,
            data: RwLock::new(bytes),
        }
    }

    /// Wrap existing physical bytes.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::BufferTooSmall` if `bytes` does not hold the
    /// layout's physical size.
    pub fn from_bytes(layout: Layout, bytes: Vec<u8>) -> Result<Self> {
        let required = layout.byte_size();
        if bytes.len() < required {
            return Err(CoreError::buffer_too_small(
                crate::error::CopySide::Source,
                required,
                bytes.len(),
            ));
        }
        Ok(Self {
            layout,
            data: RwLock::new(bytes),
        })
    }

    /// Wrap typed physical values, padding slots included.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidLayout` if `T` differs from the layout's
    /// element type, or `CoreError::BufferTooSmall` if too few values are given.
    pub fn from_slice<T: Element>(layout: Layout, values: &[T]) -> Result<Self> {
        if T::TYPE != layout.element_type() {
            return Err(CoreError::invalid_layout(format!(
                "layout holds {} but values are {}",
                layout.element_type(),
                T::TYPE
            )));
        }
        let mut bytes = vec![0; values.len() * T::SIZE];
        for (value, slot) in values.iter().zip(bytes.chunks_exact_mut(T::SIZE)) {
            value.write_ne(slot);
        }
        Self::from_bytes(layout, bytes)
    }

    /// Copy out the physical contents as `T`, padding slots included.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidLayout` if `T` differs from the layout's
    /// element type.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if T::TYPE != self.layout.element_type() {
            return Err(CoreError::invalid_layout(format!(
                "layout holds {} but {} was requested",
                self.layout.element_type(),
                T::TYPE
            )));
        }
        Ok(self
            .data
            .read()
            .chunks_exact(T::SIZE)
            .map(T::read_ne)
            .collect())
    }
}

impl DeviceMemory for DeviceBuffer {
    fn layout(&self) -> &Layout {
        &self.layout
    }

    fn lock_read<'a>(&'a self, stream: &Stream) -> Result<MemReadLock<'a>> {
        stream.record_lock(false);
        let guard = RwLockReadGuard::map(self.data.read(), Vec::as_slice);
        tracing::trace!(
            target: "rust_ai::memory",
            stream = stream.id(),
            bytes = guard.len(),
            "Read lock acquired"
        );
        Ok(MemReadLock::new(guard))
    }

    fn lock_write<'a>(&'a self, stream: &Stream) -> Result<MemWriteLock<'a>> {
        stream.record_lock(true);
        let guard = RwLockWriteGuard::map(self.data.write(), Vec::as_mut_slice);
        tracing::trace!(
            target: "rust_ai::memory",
            stream = stream.id(),
            bytes = guard.len(),
            "Write lock acquired"
        );
        Ok(MemWriteLock::new(guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::ElementType;
    use crate::layout::{Padding, TensorDims};
    use crate::stream::StreamConfig;

    fn stream() -> Stream {
        Stream::new(&StreamConfig::default()).unwrap()
    }

    #[test]
    fn test_new_buffer_is_zeroed_and_sized_with_padding() {
        let layout = Layout::new(ElementType::F32, &[1, 1, 2, 2])
            .unwrap()
            .with_padding(Padding::new(TensorDims::splat(0), TensorDims::new(0, 0, 1, 0, 0, 0)));
        let buffer = DeviceBuffer::new(layout);
        assert_eq!(buffer.to_vec::<f32>().unwrap(), vec![0.0; 6]);
    }

    #[test]
    fn test_write_then_read_through_locks() {
        let stream = stream();
        let buffer = DeviceBuffer::new(Layout::flat(ElementType::U8, 4));
        {
            let mut lock = buffer.lock_write(&stream).unwrap();
            lock.data().copy_from_slice(&[1, 2, 3, 4]);
        }
        let lock = buffer.lock_read(&stream).unwrap();
        assert_eq!(lock.data(), &[1, 2, 3, 4]);
        assert_eq!(stream.lock_count(), 2);
    }

    #[test]
    fn test_concurrent_readers() {
        let stream = stream();
        let buffer =
            DeviceBuffer::from_slice(Layout::flat(ElementType::I32, 2), &[5i32, 6]).unwrap();
        let a = buffer.lock_read(&stream).unwrap();
        let b = buffer.lock_read(&stream).unwrap();
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn test_from_slice_checks_type_and_size() {
        let layout = Layout::flat(ElementType::F32, 3);
        assert!(DeviceBuffer::from_slice(layout.clone(), &[1i32, 2, 3]).is_err());
        assert!(matches!(
            DeviceBuffer::from_slice(layout.clone(), &[1.0f32]),
            Err(CoreError::BufferTooSmall { .. })
        ));
        let buffer = DeviceBuffer::from_slice(layout, &[1.0f32, 2.0, 3.0]).unwrap();
        assert_eq!(buffer.to_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(buffer.to_vec::<u32>().is_err());
    }
}
