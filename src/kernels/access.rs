// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Access Module
//!
//! Uniform element access over every operand carrier.
//!
//! - Arrays and vectors index directly, iterables walk forward.
//! - Scalars and pointer-like owners act as a one-element axis.
//! - References yield child references, so writes reach the caller's storage.
//! - Expressions yield their slice at the offset, evaluating when the slice
//! reaches rank 0.

use std::borrow::Cow;

use crate::enums::error::{Incompatibility, LazyError};
use crate::enums::shape_kind::ShapeKind;
use crate::enums::value::Value;
use crate::traits::shape::Rank;

fn no_elements(value: &Value) -> LazyError {
    LazyError::TypeError {
        expected: "addressable elements".to_string(),
        found: value.type_shape().to_string(),
    }
}

/// Size of the outermost axis of `value`.
///
/// Scalar-like values report 1, so they broadcast against any extent.
pub fn axis_size(value: &Value) -> Result<usize, LazyError> {
    match value {
        Value::Scalar(_) | Value::Pointer(_) => Ok(1),
        Value::Fixed(a) => Ok(a.items.len()),
        Value::Dynamic(a) => Ok(a.items.len()),
        Value::Iterable(a) => Ok(a.items.len()),
        Value::Ref(place) => place.with(axis_size),
        Value::Expr(e) if e.rank() == 0 => Ok(1),
        Value::Expr(e) => e.size(),
        Value::Void | Value::Opaque(_) => Err(no_elements(value)),
    }
}

/// Element `index` along the outermost axis of `value`.
///
/// Borrows where the element is stored inline; references and expressions
/// produce owned values.
pub fn element_at(value: &Value, index: usize) -> Result<Cow<'_, Value>, LazyError> {
    let out_of_bounds = |size| LazyError::OutOfBounds {
        axis: 0,
        index,
        size,
    };
    match value {
        Value::Scalar(_) | Value::Pointer(_) => match index {
            0 => Ok(Cow::Borrowed(value)),
            _ => Err(out_of_bounds(1)),
        },
        Value::Fixed(a) => a
            .items
            .get(index)
            .map(Cow::Borrowed)
            .ok_or_else(|| out_of_bounds(a.items.len())),
        Value::Dynamic(a) => a
            .items
            .get(index)
            .map(Cow::Borrowed)
            .ok_or_else(|| out_of_bounds(a.items.len())),
        Value::Iterable(a) => a
            .items
            .iter()
            .nth(index)
            .map(Cow::Borrowed)
            .ok_or_else(|| out_of_bounds(a.items.len())),
        Value::Ref(place) => place.with(|target| match target {
            Value::Expr(e) if e.rank() > 0 => e.index(index).map(Cow::Owned),
            Value::Scalar(_) | Value::Pointer(_) | Value::Expr(_) => match index {
                0 => Ok(Cow::Borrowed(value)),
                _ => Err(out_of_bounds(1)),
            },
            other => {
                let size = axis_size(other)?;
                if index < size {
                    Ok(Cow::Owned(Value::Ref(place.child(index))))
                } else {
                    Err(out_of_bounds(size))
                }
            }
        }),
        Value::Expr(e) if e.rank() == 0 => match index {
            0 => Ok(Cow::Borrowed(value)),
            _ => Err(out_of_bounds(1)),
        },
        Value::Expr(e) => e.index(index).map(Cow::Owned),
        Value::Void | Value::Opaque(_) => Err(no_elements(value)),
    }
}

/// Sizes of the outer `depth` axes of operand `operand`.
///
/// Every sibling along an axis must agree, otherwise the operand is rejected
/// as ragged. Expressions, held directly or by reference, are rectangular by
/// construction and are only measured along their first element.
pub fn extents(value: &Value, depth: usize, operand: usize) -> Result<Vec<usize>, LazyError> {
    let mut sizes: Vec<Option<usize>> = vec![None; depth];
    measure(value, 0, &mut sizes, operand)?;
    Ok(sizes.into_iter().map(|s| s.unwrap_or(0)).collect())
}

fn measure(
    value: &Value,
    axis: usize,
    sizes: &mut [Option<usize>],
    operand: usize,
) -> Result<(), LazyError> {
    if axis == sizes.len() {
        return Ok(());
    }
    let size = axis_size(value)?;
    match sizes[axis] {
        None => sizes[axis] = Some(size),
        Some(expected) if expected != size => {
            return Err(Incompatibility::Ragged {
                operand,
                axis,
                expected,
                found: size,
            }
            .into());
        }
        Some(_) => {}
    }
    if axis + 1 == sizes.len() {
        return Ok(());
    }
    let visit = match value.shape_kind() {
        ShapeKind::Expression => size.min(1),
        _ => size,
    };
    for index in 0..visit {
        let element = element_at(value, index)?;
        measure(&element, axis + 1, sizes, operand)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::scalar::ScalarType;
    use crate::enums::shape_kind::TypeShape;
    use crate::structs::place::Shared;
    use crate::traits::param::IntoValue;

    #[test]
    fn test_scalar_is_one_wide() {
        let v = 3i32.into_value();
        assert_eq!(axis_size(&v).unwrap(), 1);
        assert_eq!(*element_at(&v, 0).unwrap(), v);
        assert!(matches!(
            element_at(&v, 1),
            Err(LazyError::OutOfBounds { index: 1, size: 1, .. })
        ));
    }

    #[test]
    fn test_iterable_walks_forward() {
        let v = std::collections::LinkedList::from([4i32, 5, 6]).into_value();
        assert_eq!(axis_size(&v).unwrap(), 3);
        assert_eq!(*element_at(&v, 2).unwrap(), 6i32.into_value());
    }

    #[test]
    fn test_reference_yields_child_reference() {
        let s = Shared::new([[1i32, 2], [3, 4]]);
        let r = s.by_ref();
        let row = element_at(&r, 1).unwrap().into_owned();
        assert!(matches!(row, Value::Ref(_)));
        assert_eq!(axis_size(&row).unwrap(), 2);
        let Value::Ref(cell) = element_at(&row, 0).unwrap().into_owned() else {
            panic!("expected a reference");
        };
        cell.write(9i32.into_value()).unwrap();
        assert_eq!(s.read::<[[i32; 2]; 2]>().unwrap(), [[1, 2], [9, 4]]);
    }

    #[test]
    fn test_opaque_has_no_elements() {
        let v = Value::Opaque(crate::enums::value::OpaqueHandle(0x10));
        assert!(matches!(axis_size(&v), Err(LazyError::TypeError { .. })));
    }

    #[test]
    fn test_extents_rectangular() {
        let v = vec![vec![1i32, 2, 3], vec![4, 5, 6]].into_value();
        assert_eq!(extents(&v, 2, 0).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_extents_ragged() {
        let v = vec![vec![1i32, 2, 3], vec![4]].into_value();
        assert_eq!(
            extents(&v, 2, 1),
            Err(LazyError::IncompatibleExpression(Incompatibility::Ragged {
                operand: 1,
                axis: 1,
                expected: 3,
                found: 1,
            }))
        );
        // Only outer axes are checked.
        assert_eq!(extents(&v, 1, 1).unwrap(), vec![2]);
    }

    #[test]
    fn test_extents_of_empty() {
        let v = Value::dynamic(TypeShape::dynamic(TypeShape::scalar(ScalarType::Int32)), vec![]);
        assert_eq!(extents(&v, 2, 0).unwrap(), vec![0, 0]);
    }
}
