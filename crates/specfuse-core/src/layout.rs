//! Stride Layout Classification
//!
//! Compiled kernels depend on how a tensor is laid out in memory, not on the
//! exact stride numbers. A `StrideClass` keeps only the properties that
//! change generated code: the order of dimensions by stride, whether the
//! storage is dense, and which dimensions are broadcast (stride 0).
//!
//! Dimensions of size 0 or 1 carry no layout information and are ignored
//! when computing the order.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use core::fmt;

// =============================================================================
// StrideClass
// =============================================================================

/// Layout class of a strided tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StrideClass {
    /// Indices of the non-trivial, non-broadcast dimensions, outermost first.
    order: Vec<usize>,
    /// Per-dimension flag: true when the dimension is broadcast (stride 0).
    expanded: Vec<bool>,
    /// True when the non-broadcast dimensions cover storage without gaps.
    dense: bool,
}

impl StrideClass {
    /// Classifies a tensor given its dimensions and strides (in elements).
    ///
    /// Strides of the wrong rank describe no real layout; they get a class
    /// with no order that is never dense, which no well-formed tensor has.
    pub fn classify(dims: &[usize], strides: &[usize]) -> Self {
        if dims.len() != strides.len() {
            return Self {
                order: Vec::new(),
                expanded: vec![false; dims.len()],
                dense: false,
            };
        }

        let expanded: Vec<bool> = dims
            .iter()
            .zip(strides)
            .map(|(&d, &s)| d > 1 && s == 0)
            .collect();

        let mut order: Vec<usize> = (0..dims.len())
            .filter(|&i| dims[i] > 1 && strides[i] != 0)
            .collect();
        // Stable: equal strides keep their dimension order.
        order.sort_by(|&a, &b| strides[b].cmp(&strides[a]));

        let mut expected = 1usize;
        let mut dense = true;
        for &i in order.iter().rev() {
            if strides[i] != expected {
                dense = false;
                break;
            }
            expected = expected.saturating_mul(dims[i]);
        }

        Self {
            order,
            expanded,
            dense,
        }
    }

    /// Class of a row-major contiguous tensor of the given dimensions.
    pub fn contiguous(dims: &[usize]) -> Self {
        Self::classify(dims, &contiguous_strides(dims))
    }

    /// Returns the dimension order (outermost first).
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Returns the per-dimension broadcast flags.
    pub fn expanded(&self) -> &[bool] {
        &self.expanded
    }

    /// Returns true if the storage is dense.
    pub fn is_dense(&self) -> bool {
        self.dense
    }

    /// Returns true if any dimension is broadcast.
    pub fn has_broadcast(&self) -> bool {
        self.expanded.iter().any(|&e| e)
    }

    /// Returns true for dense, row-major, non-broadcast layouts.
    pub fn is_contiguous(&self) -> bool {
        self.dense && !self.has_broadcast() && self.order.windows(2).all(|w| w[0] < w[1])
    }
}

impl fmt::Display for StrideClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_contiguous() {
            return write!(f, "contiguous");
        }
        write!(f, "order{:?}", self.order)?;
        if !self.dense {
            write!(f, "+gaps")?;
        }
        if self.has_broadcast() {
            write!(f, "+broadcast")?;
        }
        Ok(())
    }
}

/// Row-major strides (in elements) for the given dimensions.
pub fn contiguous_strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; dims.len()];
    for i in (0..dims.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1].saturating_mul(dims[i + 1].max(1));
    }
    strides
}

// =============================================================================
// Tests
// =============================================================================
