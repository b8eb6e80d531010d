//! Shape Signatures and Symbolic Patterns
//!
//! A [`ShapeSignature`] is the fingerprint of one invocation: for every input
//! tensor its dimensions, stride class, dtype and device. It is computed from
//! metadata only and never looks at tensor values.
//!
//! A STATIC specialization is keyed on a signature directly. A DYNAMIC
//! specialization is keyed on a [`SymbolicPattern`] generalized from the
//! signature that triggered it: every dimension becomes a [`SymbolicClass`],
//! and numerically equal sizes share one class. `[4, 4]` generalizes to
//! `[A, A]` and accepts `[6, 6]` but not `[6, 7]`; `[3, 5]` generalizes to
//! `[A, B]`. Sizes 0 and 1 stay pinned, since an empty or broadcast
//! dimension changes the generated kernel.
//!
//! Dtype, device and stride class are never generalized: any difference is
//! a non-match for both kinds.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::fmt;

use rustc_hash::FxHashMap;
use specfuse_core::{DType, Device, StrideClass, TensorDescriptor};

use crate::strategy::SpecializationKind;

// =============================================================================
// Shape Signature
// =============================================================================

/// Metadata of one input tensor as seen by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TensorSignature {
    dims: Vec<usize>,
    stride_class: StrideClass,
    dtype: DType,
    device: Device,
}

impl TensorSignature {
    /// Builds the signature of a single tensor.
    pub fn of<T: TensorDescriptor + ?Sized>(tensor: &T) -> Self {
        Self {
            dims: tensor.dims().to_vec(),
            stride_class: tensor.stride_class(),
            dtype: tensor.dtype(),
            device: tensor.device(),
        }
    }

    /// Dimension sizes.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Layout class.
    pub fn stride_class(&self) -> &StrideClass {
        &self.stride_class
    }

    /// Element type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Device.
    pub fn device(&self) -> Device {
        self.device
    }
}

impl fmt::Display for TensorSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}@{}", self.dtype, self.dims, self.device)
    }
}

/// Immutable fingerprint of an invocation's inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeSignature {
    tensors: Vec<TensorSignature>,
}

impl ShapeSignature {
    /// Computes the signature of a call from its inputs' metadata.
    pub fn from_inputs<T: TensorDescriptor>(inputs: &[T]) -> Self {
        Self {
            tensors: inputs.iter().map(TensorSignature::of).collect(),
        }
    }

    /// Per-tensor signatures, in argument order.
    pub fn tensors(&self) -> &[TensorSignature] {
        &self.tensors
    }

    /// Number of input tensors.
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// True for a call without tensor inputs.
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Returns true if this call may run a slot compiled for `pattern`.
    pub fn matches(&self, pattern: &SlotPattern) -> bool {
        match pattern {
            SlotPattern::Static(sig) => sig == self,
            SlotPattern::Dynamic(symbolic) => symbolic.matches(self),
        }
    }

    /// Generalizes this signature into a symbolic pattern.
    ///
    /// Classes are numbered in order of first appearance, so
    /// `[2, 3, 4], [3, 4, 5]` becomes `[A, B, C], [B, C, D]`.
    pub fn generalize(&self) -> SymbolicPattern {
        let mut classes: FxHashMap<usize, SymbolicClass> = FxHashMap::default();
        let mut tensors = Vec::with_capacity(self.tensors.len());
        for t in &self.tensors {
            let dims = t
                .dims
                .iter()
                .map(|&d| {
                    if d > 1 {
                        let next = SymbolicClass(classes.len() as u32);
                        DimPattern::Symbol(*classes.entry(d).or_insert(next))
                    } else {
                        DimPattern::Fixed(d)
                    }
                })
                .collect();
            tensors.push(TensorPattern {
                dims,
                stride_class: t.stride_class.clone(),
                dtype: t.dtype,
                device: t.device,
            });
        }

        SymbolicPattern {
            tensors,
            num_classes: classes.len(),
        }
    }
}

impl fmt::Display for ShapeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, t) in self.tensors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{t}")?;
        }
        write!(f, ")")
    }
}

// =============================================================================
// Symbolic Pattern
// =============================================================================

/// Equivalence class of dimension sizes inside one symbolic pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolicClass(pub(crate) u32);

impl SymbolicClass {
    /// Returns the raw index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolicClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = char::from(b'A' + (self.0 % 26) as u8);
        match self.0 / 26 {
            0 => write!(f, "{letter}"),
            n => write!(f, "{letter}{n}"),
        }
    }
}

/// One dimension of a symbolic pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimPattern {
    /// Must equal this size.
    Fixed(usize),
    /// Any size, equal across all occurrences of the class.
    Symbol(SymbolicClass),
}

impl fmt::Display for DimPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{n}"),
            Self::Symbol(class) => write!(f, "{class}"),
        }
    }
}

/// Symbolic description of one input tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TensorPattern {
    dims: Vec<DimPattern>,
    stride_class: StrideClass,
    dtype: DType,
    device: Device,
}

impl TensorPattern {
    /// Dimension patterns.
    pub fn dims(&self) -> &[DimPattern] {
        &self.dims
    }

    /// Layout class.
    pub fn stride_class(&self) -> &StrideClass {
        &self.stride_class
    }

    /// Element type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Device.
    pub fn device(&self) -> Device {
        self.device
    }
}

impl fmt::Display for TensorPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.dtype)?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]@{}", self.device)
    }
}

/// Shape pattern a DYNAMIC slot was compiled for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolicPattern {
    tensors: Vec<TensorPattern>,
    num_classes: usize,
}

impl SymbolicPattern {
    /// Per-tensor patterns.
    pub fn tensors(&self) -> &[TensorPattern] {
        &self.tensors
    }

    /// Number of distinct symbolic classes.
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Binds every class to a concrete size, or `None` on mismatch.
    pub fn bind(&self, signature: &ShapeSignature) -> Option<Vec<usize>> {
        if self.tensors.len() != signature.tensors.len() {
            return None;
        }

        let mut bound: Vec<Option<usize>> = vec![None; self.num_classes];
        for (pattern, tensor) in self.tensors.iter().zip(&signature.tensors) {
            if pattern.dims.len() != tensor.dims.len()
                || pattern.dtype != tensor.dtype
                || pattern.device != tensor.device
                || pattern.stride_class != tensor.stride_class
            {
                return None;
            }
            for (dim, &size) in pattern.dims.iter().zip(&tensor.dims) {
                match *dim {
                    DimPattern::Fixed(n) if n != size => return None,
                    DimPattern::Fixed(_) => {}
                    DimPattern::Symbol(class) => {
                        let slot = bound.get_mut(class.index())?;
                        match *slot {
                            Some(prev) if prev != size => return None,
                            Some(_) => {}
                            // A class stands for a non-trivial size; 0 and 1
                            // would change broadcast behavior.
                            None if size <= 1 => return None,
                            None => *slot = Some(size),
                        }
                    }
                }
            }
        }

        bound.into_iter().collect()
    }

    /// Returns true if `signature` satisfies every class constraint.
    pub fn matches(&self, signature: &ShapeSignature) -> bool {
        self.bind(signature).is_some()
    }
}

impl fmt::Display for SymbolicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, t) in self.tensors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{t}")?;
        }
        write!(f, ")")
    }
}

// =============================================================================
// Slot Pattern
// =============================================================================

/// What a specialization slot was compiled for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotPattern {
    /// Exact signature.
    Static(ShapeSignature),
    /// Symbolic shape pattern.
    Dynamic(SymbolicPattern),
}

impl SlotPattern {
    /// Builds the pattern of `kind` for the triggering `signature`.
    pub fn for_signature(kind: SpecializationKind, signature: &ShapeSignature) -> Self {
        match kind {
            SpecializationKind::Static => Self::Static(signature.clone()),
            SpecializationKind::Dynamic => Self::Dynamic(signature.generalize()),
        }
    }

    /// Kind of specialization this pattern belongs to.
    pub fn kind(&self) -> SpecializationKind {
        match self {
            Self::Static(_) => SpecializationKind::Static,
            Self::Dynamic(_) => SpecializationKind::Dynamic,
        }
    }
}

impl fmt::Display for SlotPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(sig) => write!(f, "STATIC{sig}"),
            Self::Dynamic(pattern) => write!(f, "DYNAMIC{pattern}"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
