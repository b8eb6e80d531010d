//! Device Descriptor
//!
//! Identifies where a tensor lives. A compiled specialization is only valid
//! for the device it was compiled for, so the device is part of every shape
//! signature.
//!
//! # Example
//! ```rust
//! use specfuse_core::Device;
//!
//! let cpu = Device::Cpu;
//! assert!(cpu.is_cpu());
//! assert_eq!(Device::cuda(1).to_string(), "cuda:1");
//! ```
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use core::fmt;
use core::str::FromStr;

use crate::error::Error;

// =============================================================================
// Device Enum
// =============================================================================

/// A compute device on which tensors are allocated and kernels run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Device {
    /// Host CPU.
    Cpu,
    /// NVIDIA CUDA GPU with device index.
    Cuda(usize),
    /// Apple Metal GPU with device index.
    Metal(usize),
    /// Vulkan GPU with device index.
    Vulkan(usize),
}

impl Device {
    /// Returns true if this is the host CPU.
    #[must_use]
    pub const fn is_cpu(self) -> bool {
        matches!(self, Self::Cpu)
    }

    /// Returns true if this is any GPU device.
    #[must_use]
    pub const fn is_gpu(self) -> bool {
        !self.is_cpu()
    }

    /// Returns the device index for GPU devices, or 0 for CPU.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Cpu => 0,
            Self::Cuda(idx) | Self::Metal(idx) | Self::Vulkan(idx) => idx,
        }
    }

    /// Returns the name of this device type.
    #[must_use]
    pub const fn device_type(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Cuda(_) => "cuda",
            Self::Metal(_) => "metal",
            Self::Vulkan(_) => "vulkan",
        }
    }

    /// Returns a CUDA device with the given index.
    #[must_use]
    pub const fn cuda(index: usize) -> Self {
        Self::Cuda(index)
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            other => write!(f, "{}:{}", other.device_type(), other.index()),
        }
    }
}

impl FromStr for Device {
    type Err = Error;

    /// Parses `cpu`, `cuda`, `cuda:N`, `metal:N` or `vulkan:N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, index) = match s.split_once(':') {
            Some((kind, idx)) => {
                let idx = idx
                    .parse::<usize>()
                    .map_err(|_| Error::InvalidDevice(s.to_string()))?;
                (kind, idx)
            }
            None => (s, 0),
        };

        match kind {
            "cpu" if index == 0 => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda(index)),
            "metal" => Ok(Self::Metal(index)),
            "vulkan" => Ok(Self::Vulkan(index)),
            _ => Err(Error::InvalidDevice(s.to_string())),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_device() {
        let cpu = Device::Cpu;
        assert!(cpu.is_cpu());
        assert!(!cpu.is_gpu());
        assert_eq!(cpu.index(), 0);
        assert_eq!(Device::default(), Device::Cpu);
    }

    #[test]
    fn test_device_display() {
        assert_eq!(Device::Cpu.to_string(), "cpu");
        assert_eq!(Device::cuda(2).to_string(), "cuda:2");
    }

    #[test]
    fn test_device_parse() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("cuda".parse::<Device>().unwrap(), Device::Cuda(0));
        assert_eq!("metal:3".parse::<Device>().unwrap(), Device::Metal(3));
        assert!("tpu:0".parse::<Device>().is_err());
        assert!("cuda:x".parse::<Device>().is_err());
    }
}
