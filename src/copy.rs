// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Boundary entry points for host/device tensor copies.
//!
//! Both functions resolve host-visible bytes for each side, holding any device
//! locks for the whole copy, and delegate to [`convert_and_copy`]. The element
//! count always comes from the destination's logical shape.
//!
//! | entry point          | source provenance             | source layout        |
//! |----------------------|-------------------------------|----------------------|
//! | [`copy_from_memory`] | device memory, always locked  | the memory's layout  |
//! | [`copy_tensor`]      | classified via `is_indirect`  | flat, unpadded       |
//!
//! Locks are taken source first, then destination, and released when the
//! function returns, whether it succeeds or fails. When both sides are the
//! same device allocation no lock is taken: a same-type, unpadded copy is a
//! no-op and anything else is rejected with `CoreError::AliasedBuffers`.

use crate::convert::convert_and_copy;
use crate::dtype::ElementType;
use crate::error::{CoreError, Result};
use crate::layout::Layout;
use crate::memory::DeviceMemory;
use crate::stream::Stream;
use crate::tensor::TensorHandle;

fn same_allocation(a: &dyn DeviceMemory, b: &dyn DeviceMemory) -> bool {
    std::ptr::addr_eq(a, b)
}

/// Resolve a copy whose two sides are one allocation without locking it.
fn aliased_copy(src_type: ElementType, dst_type: ElementType, padded: bool) -> Result<()> {
    if src_type == dst_type && !padded {
        tracing::trace!(
            target: "rust_ai::transfer",
            path = "aliased",
            %src_type,
            "Copy onto itself skipped"
        );
        return Ok(());
    }
    tracing::error!(
        target: "rust_ai::transfer",
        %src_type,
        %dst_type,
        "Source and destination share one allocation"
    );
    Err(CoreError::AliasedBuffers {
        src: src_type,
        dst: dst_type,
    })
}

/// Copy device memory into a tensor, converting element type and removing
/// source padding as needed.
///
/// # Errors
///
/// Returns `CoreError::UnsupportedConversion` for a pair missing from the
/// conversion table, `CoreError::BufferTooSmall` or
/// `CoreError::ElementCountMismatch` for inconsistent sizes, and any lock error
/// of either side. Returns `CoreError::AliasedBuffers` if `dst` is backed by
/// `src` itself and the copy would convert or unpad in place; a same-type,
/// unpadded copy onto itself succeeds without touching the memory.
///
/// # Example
///
/// ```rust
/// use rust_ai_transfer::{
///     copy_from_memory, DeviceBuffer, ElementType, HostTensor, Layout, Stream, StreamConfig,
/// };
///
/// let stream = Stream::new(&StreamConfig::default())?;
/// let layout = Layout::new(ElementType::F32, &[2])?;
/// let memory = DeviceBuffer::from_slice(layout, &[0.5f32, 1.5])?;
/// let mut host = HostTensor::zeros(ElementType::F16, &[2]);
///
/// copy_from_memory(&memory, &mut host, &stream)?;
/// assert_eq!(host.to_vec::<half::f16>()?[1].to_f32(), 1.5);
/// # Ok::<(), rust_ai_transfer::CoreError>(())
/// ```
pub fn copy_from_memory(
    src: &dyn DeviceMemory,
    dst: &mut dyn TensorHandle,
    stream: &Stream,
) -> Result<()> {
    let src_layout = src.layout();
    let src_type = src_layout.element_type();
    let dst_type = dst.element_type();
    let count = dst.element_count();

    if dst.memory().is_some_and(|memory| same_allocation(src, memory)) {
        return aliased_copy(src_type, dst_type, src_layout.is_padded());
    }

    let src_lock = src.lock_read(stream)?;
    let mut dst_access = dst.acquire_write(stream)?;

    tracing::debug!(
        target: "rust_ai::transfer",
        %src_type,
        %dst_type,
        count,
        padded = src_layout.is_padded(),
        dst_locked = dst_access.is_locked(),
        "Copying device memory to tensor"
    );

    convert_and_copy(
        &src_lock,
        src_type,
        &mut dst_access,
        dst_type,
        count,
        src_layout,
    )
}

/// Copy one tensor into another, locking whichever side is indirect.
///
/// The source is always read as a flat, unpadded run of elements.
///
/// # Errors
///
/// Returns `CoreError::UnsupportedConversion` for a pair missing from the
/// conversion table, `CoreError::BufferTooSmall` for inconsistent sizes,
/// `CoreError::NullBuffer` if a handle exposes no bytes, and any lock error of
/// either side. Returns `CoreError::AliasedBuffers` if both handles are backed
/// by the same device allocation and the element types differ; with equal
/// types the copy succeeds without touching the memory.
pub fn copy_tensor(
    src: &dyn TensorHandle,
    dst: &mut dyn TensorHandle,
    stream: &Stream,
) -> Result<()> {
    let src_type = src.element_type();
    let dst_type = dst.element_type();
    let count = dst.element_count();
    let src_layout = Layout::flat(src_type, count);

    if let (Some(a), Some(b)) = (src.memory(), dst.memory()) {
        if same_allocation(a, b) {
            return aliased_copy(src_type, dst_type, false);
        }
    }

    let src_access = src.acquire_read(stream)?;
    let mut dst_access = dst.acquire_write(stream)?;

    tracing::debug!(
        target: "rust_ai::transfer",
        %src_type,
        %dst_type,
        count,
        src_locked = src_access.is_locked(),
        dst_locked = dst_access.is_locked(),
        "Copying tensor to tensor"
    );

    convert_and_copy(
        &src_access,
        src_type,
        &mut dst_access,
        dst_type,
        count,
        &src_layout,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Padding;
    use crate::memory::{DeviceBuffer, MemReadLock, MemWriteLock};
    use crate::stream::StreamConfig;
    use crate::tensor::{HostTensor, RemoteTensor};
    use half::f16;
    use std::ops::{Deref, DerefMut};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Guard wrapper that records its own release.
    struct Counted<'a, G> {
        guard: G,
        released: &'a AtomicUsize,
    }

    impl<G: Deref<Target = [u8]>> Deref for Counted<'_, G> {
        type Target = [u8];
        fn deref(&self) -> &[u8] {
            &self.guard
        }
    }

    impl<G: DerefMut<Target = [u8]>> DerefMut for Counted<'_, G> {
        fn deref_mut(&mut self) -> &mut [u8] {
            &mut self.guard
        }
    }

    impl<G> Drop for Counted<'_, G> {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Device memory that counts lock acquisitions and releases.
    struct CountingMemory {
        inner: DeviceBuffer,
        acquired: AtomicUsize,
        released: AtomicUsize,
    }

    impl CountingMemory {
        fn new(inner: DeviceBuffer) -> Self {
            Self {
                inner,
                acquired: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
            }
        }

        fn counts(&self) -> (usize, usize) {
            (
                self.acquired.load(Ordering::SeqCst),
                self.released.load(Ordering::SeqCst),
            )
        }
    }

    impl DeviceMemory for CountingMemory {
        fn layout(&self) -> &Layout {
            self.inner.layout()
        }

        fn lock_read<'a>(&'a self, stream: &Stream) -> Result<MemReadLock<'a>> {
            self.acquired.fetch_add(1, Ordering::SeqCst);
            let guard = self.inner.lock_read(stream)?;
            Ok(MemReadLock::new(Counted {
                guard,
                released: &self.released,
            }))
        }

        fn lock_write<'a>(&'a self, stream: &Stream) -> Result<MemWriteLock<'a>> {
            self.acquired.fetch_add(1, Ordering::SeqCst);
            let guard = self.inner.lock_write(stream)?;
            Ok(MemWriteLock::new(Counted {
                guard,
                released: &self.released,
            }))
        }
    }

    fn stream() -> Stream {
        Stream::new(&StreamConfig::default()).unwrap()
    }

    #[test]
    fn test_memory_to_host_with_conversion() {
        let stream = stream();
        let layout = Layout::new(ElementType::F32, &[3]).unwrap();
        let memory =
            CountingMemory::new(DeviceBuffer::from_slice(layout, &[1.0f32, -0.5, 8.0]).unwrap());
        let mut host = HostTensor::zeros(ElementType::F16, &[3]);

        copy_from_memory(&memory, &mut host, &stream).unwrap();

        assert_eq!(
            host.to_vec::<f16>().unwrap(),
            vec![f16::from_f32(1.0), f16::from_f32(-0.5), f16::from_f32(8.0)]
        );
        assert_eq!(memory.counts(), (1, 1));
    }

    #[test]
    fn test_padded_memory_to_host() {
        let stream = stream();
        let layout = Layout::new(ElementType::F32, &[1, 2, 1, 2])
            .unwrap()
            .with_padding(Padding::from_shape_order(&[0, 0, 0, 0], &[0, 0, 0, 2]).unwrap());
        // Physical x extent is 4: [a, b, pad, pad] per feature.
        let physical = [1.0f32, 2.0, -1.0, -1.0, 3.0, 4.0, -1.0, -1.0];
        let memory = DeviceBuffer::from_slice(layout, &physical).unwrap();
        let mut host = HostTensor::zeros(ElementType::F32, &[1, 2, 1, 2]);

        copy_from_memory(&memory, &mut host, &stream).unwrap();

        assert_eq!(host.to_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_memory_to_remote_locks_both_sides() {
        let stream = stream();
        let layout = Layout::new(ElementType::I64, &[2]).unwrap();
        let src = CountingMemory::new(DeviceBuffer::from_slice(layout, &[-1i64, 9]).unwrap());
        let dst_memory = Arc::new(CountingMemory::new(DeviceBuffer::new(
            Layout::new(ElementType::I32, &[2]).unwrap(),
        )));
        let mut dst = RemoteTensor::new(dst_memory.clone());

        copy_from_memory(&src, &mut dst, &stream).unwrap();

        assert_eq!(src.counts(), (1, 1));
        assert_eq!(dst_memory.counts(), (1, 1));
        assert_eq!(dst_memory.inner.to_vec::<i32>().unwrap(), vec![-1, 9]);
    }

    #[test]
    fn test_unsupported_pair_releases_locks() {
        let stream = stream();
        let layout = Layout::new(ElementType::U8, &[2]).unwrap();
        let src = CountingMemory::new(DeviceBuffer::from_slice(layout, &[1u8, 2]).unwrap());
        let dst_memory = Arc::new(CountingMemory::new(DeviceBuffer::new(
            Layout::new(ElementType::F64, &[2]).unwrap(),
        )));
        let mut dst = RemoteTensor::new(dst_memory.clone());

        let err = copy_from_memory(&src, &mut dst, &stream).unwrap_err();

        assert!(matches!(
            err,
            CoreError::UnsupportedConversion {
                src: ElementType::U8,
                dst: ElementType::F64
            }
        ));
        assert_eq!(src.counts(), (1, 1));
        assert_eq!(dst_memory.counts(), (1, 1));
        assert_eq!(dst_memory.inner.to_vec::<f64>().unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_copy_tensor_host_to_host() {
        let stream = stream();
        let src = HostTensor::from_slice(&[2, 2], &[1u32, 2, 3, u32::MAX]).unwrap();
        let mut dst = HostTensor::zeros(ElementType::I32, &[2, 2]);

        copy_tensor(&src, &mut dst, &stream).unwrap();

        assert_eq!(dst.to_vec::<i32>().unwrap(), vec![1, 2, 3, -1]);
        assert_eq!(stream.lock_count(), 0);
    }

    #[test]
    fn test_copy_tensor_same_type_is_raw() {
        let stream = stream();
        let src = HostTensor::from_slice(&[3], &[7i8, -8, 9]).unwrap();
        let mut dst = HostTensor::zeros(ElementType::I8, &[3]);

        copy_tensor(&src, &mut dst, &stream).unwrap();

        assert_eq!(dst.as_bytes(), src.as_bytes());
    }

    #[test]
    fn test_copy_tensor_remote_to_host() {
        let stream = stream();
        let layout = Layout::new(ElementType::F32, &[2]).unwrap();
        let src_memory = Arc::new(CountingMemory::new(
            DeviceBuffer::from_slice(layout, &[2.5f32, -7.9]).unwrap(),
        ));
        let src = RemoteTensor::new(src_memory.clone());
        let mut dst = HostTensor::zeros(ElementType::I16, &[2]);

        copy_tensor(&src, &mut dst, &stream).unwrap();

        assert_eq!(dst.to_vec::<i16>().unwrap(), vec![2, -7]);
        assert_eq!(src_memory.counts(), (1, 1));
    }

    #[test]
    fn test_copy_tensor_host_to_remote() {
        let stream = stream();
        let src = HostTensor::from_slice(&[2], &[1.25f64, 3.0]).unwrap();
        let dst_memory = Arc::new(DeviceBuffer::new(
            Layout::new(ElementType::F32, &[2]).unwrap(),
        ));
        let mut dst = RemoteTensor::new(dst_memory.clone());

        copy_tensor(&src, &mut dst, &stream).unwrap();

        assert_eq!(dst_memory.to_vec::<f32>().unwrap(), vec![1.25, 3.0]);
        assert_eq!(stream.lock_count(), 1);
    }

    #[test]
    fn test_empty_destination_is_noop() {
        let stream = stream();
        let src = HostTensor::zeros(ElementType::U8, &[0]);
        let mut dst = HostTensor::zeros(ElementType::F64, &[0]);
        copy_tensor(&src, &mut dst, &stream).unwrap();
        assert!(dst.as_bytes().is_empty());
    }

    #[test]
    fn test_copy_tensor_onto_own_clone_is_noop() {
        let stream = stream();
        let layout = Layout::new(ElementType::F32, &[2]).unwrap();
        let memory = Arc::new(CountingMemory::new(
            DeviceBuffer::from_slice(layout, &[4.0f32, 5.0]).unwrap(),
        ));
        let src = RemoteTensor::new(memory.clone());
        let mut dst = src.clone();

        copy_tensor(&src, &mut dst, &stream).unwrap();

        assert_eq!(memory.counts(), (0, 0));
        assert_eq!(memory.inner.to_vec::<f32>().unwrap(), vec![4.0, 5.0]);
    }

    #[test]
    fn test_memory_onto_own_remote_view() {
        let stream = stream();
        let layout = Layout::new(ElementType::I32, &[3]).unwrap();
        let memory = Arc::new(DeviceBuffer::from_slice(layout, &[1i32, 2, 3]).unwrap());
        let mut view = RemoteTensor::new(memory.clone());

        copy_from_memory(&*memory, &mut view, &stream).unwrap();

        assert_eq!(stream.lock_count(), 0);
        assert_eq!(memory.to_vec::<i32>().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_padded_memory_onto_itself_is_rejected() {
        let stream = stream();
        let layout = Layout::new(ElementType::F32, &[1, 1, 1, 2])
            .unwrap()
            .with_padding(Padding::from_shape_order(&[0, 0, 0, 1], &[0, 0, 0, 0]).unwrap());
        let memory = Arc::new(DeviceBuffer::new(layout));
        let mut view = RemoteTensor::new(memory.clone());

        let err = copy_from_memory(&*memory, &mut view, &stream).unwrap_err();

        assert!(matches!(
            err,
            CoreError::AliasedBuffers {
                src: ElementType::F32,
                dst: ElementType::F32
            }
        ));
        assert_eq!(stream.lock_count(), 0);
    }

    #[test]
    fn test_converting_onto_same_allocation_is_rejected() {
        let stream = stream();
        let memory = Arc::new(CountingMemory::new(DeviceBuffer::new(
            Layout::new(ElementType::F32, &[2]).unwrap(),
        )));
        let view: Arc<dyn DeviceMemory> = memory.clone();
        let src = RemoteTensor::new(view.clone());
        let mut dst = RemoteTensor::new(view);

        // Finishes instead of blocking on the allocation's own lock.
        let err = copy_tensor(&src, &mut dst, &stream).unwrap_err();
        assert!(matches!(err, CoreError::AliasedBuffers { .. }));
        assert_eq!(memory.counts(), (0, 0));

        let mut other = RemoteTensor::new(Arc::new(DeviceBuffer::new(
            Layout::new(ElementType::F32, &[2]).unwrap(),
        )));
        copy_tensor(&src, &mut other, &stream).unwrap();
        assert_eq!(memory.counts(), (1, 1));
    }
}
