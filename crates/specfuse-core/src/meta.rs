//! Tensor Metadata
//!
//! `TensorMeta` is the value-free description of one kernel input. The
//! `TensorDescriptor` trait lets any tensor type hand its metadata to the
//! specialization engine without exposing its storage.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use crate::device::Device;
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::layout::{contiguous_strides, StrideClass};

// =============================================================================
// TensorDescriptor Trait
// =============================================================================

/// Anything that can describe its shape, layout, dtype and device.
pub trait TensorDescriptor {
    /// Dimension sizes.
    fn dims(&self) -> &[usize];

    /// Strides in elements, one per dimension.
    fn strides(&self) -> &[usize];

    /// Element type.
    fn dtype(&self) -> DType;

    /// Device holding the data.
    fn device(&self) -> Device;

    /// Layout class derived from dims and strides.
    fn stride_class(&self) -> StrideClass {
        StrideClass::classify(self.dims(), self.strides())
    }
}

// =============================================================================
// TensorMeta
// =============================================================================

/// Shape, strides, dtype and device of a tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TensorMeta {
    dims: Vec<usize>,
    strides: Vec<usize>,
    dtype: DType,
    device: Device,
}

impl TensorMeta {
    /// Creates metadata with explicit strides.
    pub fn new(dims: &[usize], strides: &[usize], dtype: DType, device: Device) -> Result<Self> {
        if dims.len() != strides.len() {
            return Err(Error::RankMismatch {
                dims: dims.len(),
                strides: strides.len(),
            });
        }
        Ok(Self {
            dims: dims.to_vec(),
            strides: strides.to_vec(),
            dtype,
            device,
        })
    }

    /// Creates metadata for a row-major contiguous tensor.
    pub fn contiguous(dims: &[usize], dtype: DType, device: Device) -> Self {
        Self {
            dims: dims.to_vec(),
            strides: contiguous_strides(dims),
            dtype,
            device,
        }
    }

    /// Contiguous f32 tensor on the CPU.
    pub fn f32(dims: &[usize]) -> Self {
        Self::contiguous(dims, DType::F32, Device::Cpu)
    }

    /// Returns the number of dimensions.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns a copy moved to another device.
    pub fn to_device(&self, device: Device) -> Self {
        Self {
            device,
            ..self.clone()
        }
    }

    /// Returns a copy with another dtype.
    pub fn with_dtype(&self, dtype: DType) -> Self {
        Self {
            dtype,
            ..self.clone()
        }
    }
}

impl TensorDescriptor for TensorMeta {
    fn dims(&self) -> &[usize] {
        &self.dims
    }

    fn strides(&self) -> &[usize] {
        &self.strides
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn device(&self) -> Device {
        self.device
    }
}

impl<T: TensorDescriptor + ?Sized> TensorDescriptor for &T {
    fn dims(&self) -> &[usize] {
        (**self).dims()
    }

    fn strides(&self) -> &[usize] {
        (**self).strides()
    }

    fn dtype(&self) -> DType {
        (**self).dtype()
    }

    fn device(&self) -> Device {
        (**self).device()
    }
}

// =============================================================================
// Tests
// =============================================================================
