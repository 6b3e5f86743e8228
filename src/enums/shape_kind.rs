//! # ShapeKind Enum Module
//!
//! Companion to [crate::traits::shape::Rank].
//!
//! Contains the closed set of shape categories every operand falls into, and
//! [`TypeShape`], the static type descriptor the rank model, the adaptation
//! layer and the broadcast planner all dispatch over.

use std::fmt;

use crate::enums::scalar::ScalarType;

/// Category of a value's shape, fixed once per operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Absent, e.g. the result of a side-effecting operation.
    Void,
    /// Rank-0 values, including pointer-like owners of a single value.
    Scalar,
    /// Length known from the type.
    FixedArray,
    /// Length known at runtime, indexed access.
    DynamicArray,
    /// Forward traversal only.
    Iterable,
    /// An unevaluated expression, reporting its declared rank.
    Expression,
    /// Address with no element type.
    OpaquePointer,
}

/// Static shape of a value or an operation parameter.
///
/// The rank of a value is read from its `TypeShape`, never from its contents,
/// so an empty `Dynamic(Int32)` still has rank 1.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeShape {
    Void,
    Scalar(ScalarType),
    Opaque,
    /// Pointer-like owner: scalar-like for rank, dereferenced by adaptation.
    Pointer(Box<TypeShape>),
    /// Explicit reference into shared storage.
    Reference(Box<TypeShape>),
    Fixed { len: usize, elem: Box<TypeShape> },
    Dynamic(Box<TypeShape>),
    Iterable(Box<TypeShape>),
    Expression { rank: usize, output: Box<TypeShape> },
}

impl TypeShape {
    #[inline]
    pub fn scalar(ty: ScalarType) -> Self {
        TypeShape::Scalar(ty)
    }

    pub fn fixed(len: usize, elem: TypeShape) -> Self {
        TypeShape::Fixed {
            len,
            elem: Box::new(elem),
        }
    }

    pub fn dynamic(elem: TypeShape) -> Self {
        TypeShape::Dynamic(Box::new(elem))
    }

    pub fn iterable(elem: TypeShape) -> Self {
        TypeShape::Iterable(Box::new(elem))
    }

    pub fn pointer(target: TypeShape) -> Self {
        TypeShape::Pointer(Box::new(target))
    }

    pub fn reference(target: TypeShape) -> Self {
        TypeShape::Reference(Box::new(target))
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            TypeShape::Void => ShapeKind::Void,
            TypeShape::Scalar(_) | TypeShape::Pointer(_) => ShapeKind::Scalar,
            TypeShape::Opaque => ShapeKind::OpaquePointer,
            TypeShape::Reference(inner) => inner.kind(),
            TypeShape::Fixed { .. } => ShapeKind::FixedArray,
            TypeShape::Dynamic(_) => ShapeKind::DynamicArray,
            TypeShape::Iterable(_) => ShapeKind::Iterable,
            TypeShape::Expression { .. } => ShapeKind::Expression,
        }
    }

    /// Shape of one element along the outer axis.
    ///
    /// Returns `None` for rank-0 shapes and for opaque pointers, whose element
    /// type is unknown.
    pub fn element(&self) -> Option<TypeShape> {
        match self {
            TypeShape::Fixed { elem, .. } | TypeShape::Dynamic(elem) | TypeShape::Iterable(elem) => {
                Some((**elem).clone())
            }
            TypeShape::Reference(inner) => inner.element().map(TypeShape::reference),
            TypeShape::Expression { rank: 0, .. } => None,
            TypeShape::Expression { rank: 1, output } => Some((**output).clone()),
            TypeShape::Expression { rank, output } => Some(TypeShape::Expression {
                rank: rank - 1,
                output: output.clone(),
            }),
            TypeShape::Void | TypeShape::Scalar(_) | TypeShape::Pointer(_) | TypeShape::Opaque => None,
        }
    }

    /// Strips explicit-reference layers.
    pub fn referent(&self) -> &TypeShape {
        match self {
            TypeShape::Reference(inner) => inner.referent(),
            other => other,
        }
    }

    /// Number of wrapper and container layers, used to bound adaptation.
    pub fn depth(&self) -> usize {
        match self {
            TypeShape::Void | TypeShape::Scalar(_) | TypeShape::Opaque => 0,
            TypeShape::Pointer(inner) | TypeShape::Reference(inner) => 1 + inner.depth(),
            TypeShape::Fixed { elem, .. } | TypeShape::Dynamic(elem) | TypeShape::Iterable(elem) => {
                1 + elem.depth()
            }
            TypeShape::Expression { rank, output } => 1 + rank + output.depth(),
        }
    }
}

impl fmt::Display for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeShape::Void => f.write_str("()"),
            TypeShape::Scalar(ty) => write!(f, "{}", ty),
            TypeShape::Opaque => f.write_str("*opaque"),
            TypeShape::Pointer(inner) => write!(f, "*{}", inner),
            TypeShape::Reference(inner) => write!(f, "&{}", inner),
            TypeShape::Fixed { len, elem } => write!(f, "[{}; {}]", elem, len),
            TypeShape::Dynamic(elem) => write!(f, "Vec<{}>", elem),
            TypeShape::Iterable(elem) => write!(f, "Iter<{}>", elem),
            TypeShape::Expression { rank, output } => write!(f, "Expr<{}, rank {}>", output, rank),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_element_walks_down_to_output() {
        let e = TypeShape::Expression {
            rank: 2,
            output: Box::new(TypeShape::scalar(ScalarType::Int32)),
        };
        let inner = e.element().unwrap();
        assert_eq!(inner.kind(), ShapeKind::Expression);
        assert_eq!(inner.element(), Some(TypeShape::scalar(ScalarType::Int32)));
    }

    #[test]
    fn test_reference_reports_referent_kind() {
        let r = TypeShape::reference(TypeShape::dynamic(TypeShape::scalar(ScalarType::Int32)));
        assert_eq!(r.kind(), ShapeKind::DynamicArray);
        assert_eq!(
            r.element(),
            Some(TypeShape::reference(TypeShape::scalar(ScalarType::Int32)))
        );
        assert_eq!(r.referent().kind(), ShapeKind::DynamicArray);
    }

    #[test]
    fn test_pointer_is_scalar_like() {
        let p = TypeShape::pointer(TypeShape::fixed(3, TypeShape::scalar(ScalarType::Int32)));
        assert_eq!(p.kind(), ShapeKind::Scalar);
        assert_eq!(p.element(), None);
        assert_eq!(p.to_string(), "*[i32; 3]");
    }
}
