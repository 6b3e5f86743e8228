//! # Shape Trait Module
//!
//! The rank model: a unified way to read the nesting depth of any operand.
//!
//! Ranks come from static shapes ([`TypeShape`]), so they hold for values,
//! for Rust types through [`Shaped`], and for expressions, which report their
//! declared rank rather than being unwrapped further.

use crate::enums::shape_kind::{ShapeKind, TypeShape};
use crate::traits::param::Shaped;

/// Rank of a static shape.
///
/// - `Void` is -1.
/// - Scalars and pointer-like owners are 0.
/// - An opaque pointer is 1: it addresses elements of an unknown type.
/// - Each array, vector or iterable layer adds 1.
/// - An expression reports its declared rank.
/// - A reference reports the rank of its referent.
pub fn shape_rank(shape: &TypeShape) -> i32 {
    match shape {
        TypeShape::Void => -1,
        TypeShape::Scalar(_) | TypeShape::Pointer(_) => 0,
        TypeShape::Opaque => 1,
        TypeShape::Reference(inner) => shape_rank(inner),
        TypeShape::Fixed { elem, .. } | TypeShape::Dynamic(elem) | TypeShape::Iterable(elem) => {
            1 + shape_rank(elem).max(0)
        }
        TypeShape::Expression { rank, .. } => *rank as i32,
    }
}

/// Rank of a Rust type.
pub fn rank_of<T: Shaped>() -> i32 {
    shape_rank(&T::type_shape())
}

/// Rank trait.
///
/// Implementors provide their static shape; rank and kind follow from it.
pub trait Rank {
    /// Returns the static shape of the receiver.
    fn type_shape(&self) -> TypeShape;

    /// Returns the nesting depth of the receiver
    fn rank(&self) -> i32 {
        shape_rank(&self.type_shape())
    }

    /// Returns the shape category of the receiver
    fn shape_kind(&self) -> ShapeKind {
        self.type_shape().kind()
    }
}

impl Rank for TypeShape {
    fn type_shape(&self) -> TypeShape {
        self.clone()
    }

    fn rank(&self) -> i32 {
        shape_rank(self)
    }

    fn shape_kind(&self) -> ShapeKind {
        self.kind()
    }
}
