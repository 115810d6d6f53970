// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Candle ↔ host tensor conversion.
//!
//! Moves data between Candle tensors and [`HostTensor`] so Candle-produced
//! data can enter the copier and copier output can go back to Candle. Only
//! dtypes present on both sides are accepted: f64, f32, f16, u8, u32 and i64.

use crate::dtype::{Element, ElementType};
use crate::error::{CoreError, Result};
use crate::tensor::{HostTensor, TensorHandle};
use candle_core::{Device, Tensor, WithDType};

fn extract<T: Element + WithDType>(tensor: &Tensor) -> Result<HostTensor> {
    let data: Vec<T> = tensor.flatten_all()?.to_vec1()?;
    HostTensor::from_slice(tensor.dims(), &data)
}

fn rebuild<T: Element + WithDType>(host: &HostTensor, device: &Device) -> Result<Tensor> {
    let data: Vec<T> = host.to_vec()?;
    Ok(Tensor::from_vec(data, host.shape(), device)?)
}

/// Copy a Candle tensor into host memory.
///
/// Non-contiguous tensors are materialized in row-major order.
///
/// # Errors
///
/// Returns `CoreError::UnsupportedDType` for dtypes without an
/// [`ElementType`], or a Candle error if the data cannot be read back.
///
/// # Example
///
/// ```rust
/// use candle_core::{Device, Tensor};
/// use rust_ai_transfer::interop::host_tensor_from_candle;
///
/// let tensor = Tensor::new(&[[1u32, 2], [3, 4]], &Device::Cpu)?;
/// let host = host_tensor_from_candle(&tensor)?;
/// assert_eq!(host.to_vec::<u32>()?, vec![1, 2, 3, 4]);
/// # Ok::<(), rust_ai_transfer::CoreError>(())
/// ```
pub fn host_tensor_from_candle(tensor: &Tensor) -> Result<HostTensor> {
    match ElementType::try_from(tensor.dtype())? {
        ElementType::F64 => extract::<f64>(tensor),
        ElementType::F32 => extract::<f32>(tensor),
        ElementType::F16 => extract::<half::f16>(tensor),
        ElementType::U8 => extract::<u8>(tensor),
        ElementType::U32 => extract::<u32>(tensor),
        ElementType::I64 => extract::<i64>(tensor),
        other => Err(CoreError::UnsupportedDType(format!(
            "{other} has no candle dtype"
        ))),
    }
}

/// Build a Candle tensor on `device` from host memory.
///
/// # Errors
///
/// Returns `CoreError::UnsupportedDType` if Candle has no matching dtype, or a
/// Candle error if the tensor cannot be created on `device`.
pub fn host_tensor_to_candle(host: &HostTensor, device: &Device) -> Result<Tensor> {
    match host.element_type() {
        ElementType::F64 => rebuild::<f64>(host, device),
        ElementType::F32 => rebuild::<f32>(host, device),
        ElementType::F16 => rebuild::<half::f16>(host, device),
        ElementType::U8 => rebuild::<u8>(host, device),
        ElementType::U32 => rebuild::<u32>(host, device),
        ElementType::I64 => rebuild::<i64>(host, device),
        other => Err(CoreError::UnsupportedDType(format!(
            "{other} has no candle dtype"
        ))),
    }
}
