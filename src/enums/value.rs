//! # Value Module
//!
//! Contains the `Value` enum, the unified container for every operand an
//! expression can hold and every result an operation can produce.
//!
//! ## Description
//! - Encapsulates scalars, fixed and dynamic arrays, forward-only iterables,
//! pointer-like owners, explicit references into shared storage, and nested
//! expressions.
//! - Array carriers record their element shape, so that the rank of an empty
//! container is still known.
//!
//! ## Ownership
//! Cloning a `Value` duplicates owned data. `Ref` clones share their backing
//! storage and `Pointer` clones share their pointee.

use std::collections::LinkedList;
use std::fmt;
use std::rc::Rc;

use crate::enums::error::LazyError;
use crate::enums::scalar::Scalar;
use crate::enums::shape_kind::TypeShape;
use crate::structs::expression::Expression;
use crate::structs::place::Place;
use crate::traits::shape::Rank;

/// Address of an element of unknown type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpaqueHandle(pub usize);

/// Array whose length is part of its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedArray {
    pub elem: TypeShape,
    pub items: Box<[Value]>,
}

/// Array whose length is only known at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicArray {
    pub elem: TypeShape,
    pub items: Vec<Value>,
}

/// Sequence that supports forward traversal only.
#[derive(Debug, Clone, PartialEq)]
pub struct IterableSeq {
    pub elem: TypeShape,
    pub items: LinkedList<Value>,
}

/// # Value
///
/// Unified operand and result enum.
///
/// ## Details
/// - `Void` is the result of side-effecting operations.
/// - `Ref` is the explicit-reference wrapper: the expression does not own the
/// storage, and mutations through either side are observed by the other.
/// - `Expr` is an unevaluated expression, acting as an array of its rank.
#[derive(Debug, Clone)]
pub enum Value {
    Void,
    Scalar(Scalar),
    Opaque(OpaqueHandle),
    Pointer(Rc<Value>),
    Ref(Place),
    Fixed(FixedArray),
    Dynamic(DynamicArray),
    Iterable(IterableSeq),
    Expr(Box<Expression>),
}

impl Value {
    pub fn fixed(elem: TypeShape, items: Vec<Value>) -> Self {
        Value::Fixed(FixedArray {
            elem,
            items: items.into_boxed_slice(),
        })
    }

    pub fn dynamic(elem: TypeShape, items: Vec<Value>) -> Self {
        Value::Dynamic(DynamicArray { elem, items })
    }

    pub fn iterable(elem: TypeShape, items: impl IntoIterator<Item = Value>) -> Self {
        Value::Iterable(IterableSeq {
            elem,
            items: items.into_iter().collect(),
        })
    }

    pub fn pointer(target: Value) -> Self {
        Value::Pointer(Rc::new(target))
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    /// Unwraps the sub-expression produced by slicing a rank > 1 expression.
    pub fn into_expression(self) -> Result<Expression, LazyError> {
        match self {
            Value::Expr(e) => Ok(*e),
            other => Err(LazyError::TypeError {
                expected: "expression".to_string(),
                found: other.type_shape().to_string(),
            }),
        }
    }
}

impl Rank for Value {
    fn type_shape(&self) -> TypeShape {
        match self {
            Value::Void => TypeShape::Void,
            Value::Scalar(s) => TypeShape::Scalar(s.scalar_type()),
            Value::Opaque(_) => TypeShape::Opaque,
            Value::Pointer(target) => TypeShape::pointer(target.type_shape()),
            Value::Ref(place) => TypeShape::reference(place.type_shape()),
            Value::Fixed(a) => TypeShape::fixed(a.items.len(), a.elem.clone()),
            Value::Dynamic(a) => TypeShape::dynamic(a.elem.clone()),
            Value::Iterable(a) => TypeShape::iterable(a.elem.clone()),
            Value::Expr(e) => e.type_shape(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Void, Void) => true,
            (Scalar(a), Scalar(b)) => a == b,
            (Opaque(a), Opaque(b)) => a == b,
            (Pointer(a), Pointer(b)) => a == b,
            (Ref(a), Ref(b)) => a.same_location(b),
            (Fixed(a), Fixed(b)) => a == b,
            (Dynamic(a), Dynamic(b)) => a == b,
            (Iterable(a), Iterable(b)) => a == b,
            // Unevaluated expressions have no value to compare.
            (Expr(_), Expr(_)) => false,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<'a>(f: &mut fmt::Formatter<'_>, items: impl Iterator<Item = &'a Value>) -> fmt::Result {
            f.write_str("[")?;
            for (i, v) in items.enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", v)?;
            }
            f.write_str("]")
        }
        match self {
            Value::Void => f.write_str("()"),
            Value::Scalar(s) => write!(f, "{}", s),
            Value::Opaque(h) => write!(f, "0x{:x}", h.0),
            Value::Pointer(target) => write!(f, "*{}", target),
            Value::Ref(place) => write!(f, "&{}", place),
            Value::Fixed(a) => list(f, a.items.iter()),
            Value::Dynamic(a) => list(f, a.items.iter()),
            Value::Iterable(a) => list(f, a.items.iter()),
            Value::Expr(e) => write!(f, "{}", e.type_shape()),
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<Expression> for Value {
    fn from(e: Expression) -> Self {
        Value::Expr(Box::new(e))
    }
}

impl From<Place> for Value {
    fn from(p: Place) -> Self {
        Value::Ref(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::scalar::ScalarType;
    use crate::traits::param::IntoValue;

    #[test]
    fn test_empty_dynamic_keeps_rank() {
        let v = Value::dynamic(TypeShape::dynamic(TypeShape::scalar(ScalarType::Int32)), vec![]);
        assert_eq!(v.rank(), 2);
    }

    #[test]
    fn test_pointer_is_scalar_like() {
        let v = Value::pointer(5i32.into_value());
        assert_eq!(v.rank(), 0);
        assert_eq!(v, Value::pointer(5i32.into_value()));
    }

    #[test]
    fn test_display_nested() {
        let v = [[1i32, 2], [3, 4]].into_value();
        assert_eq!(v.to_string(), "[[1, 2], [3, 4]]");
    }
}
