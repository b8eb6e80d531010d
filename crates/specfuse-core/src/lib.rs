//! Specfuse Core - Tensor Metadata for Specialization
//!
//! This crate provides the metadata types the specialization engine keys
//! its compiled variants on. Nothing here touches element values: a tensor
//! is described by its dimensions, its stride layout, its data type and the
//! device it lives on.
//!
//! # Key Features
//! - Device and data type descriptors
//! - Stride classification (order, density, broadcast dimensions)
//! - `TensorDescriptor` trait for anything that can report its metadata
//!
//! # Example
//! ```rust
//! use specfuse_core::{DType, Device, TensorDescriptor, TensorMeta};
//!
//! let meta = TensorMeta::contiguous(&[2, 3], DType::F32, Device::Cpu);
//! assert!(meta.stride_class().is_contiguous());
//! ```
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

// =============================================================================
// Modules
// =============================================================================

pub mod device;
pub mod dtype;
pub mod error;
pub mod layout;
pub mod meta;

// =============================================================================
// Re-exports
// =============================================================================

pub use device::Device;
pub use dtype::DType;
pub use error::{Error, Result};
pub use layout::{contiguous_strides, StrideClass};
pub use meta::{TensorDescriptor, TensorMeta};
