//! # Place Module
//!
//! Explicit references into shared, caller-owned storage.
//!
//! [`Shared`] owns a value behind `Rc<RefCell<_>>`. Handing `shared.by_ref()`
//! to an expression stores a [`Place`] instead of a copy, so evaluations write
//! into the caller's storage and observe the caller's later mutations. Places
//! are addressed by an index path from the root, and borrows are only held for
//! the duration of a single read or write.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::enums::error::LazyError;
use crate::enums::shape_kind::TypeShape;
use crate::enums::value::Value;
use crate::traits::param::{FromValue, IntoValue};
use crate::traits::shape::Rank;

use tracing::debug;

/// Location inside shared storage.
#[derive(Clone)]
pub struct Place {
    root: Rc<RefCell<Value>>,
    path: Vec<usize>,
    writable: bool,
}

fn walk<'a>(mut cur: &'a Value, path: &[usize]) -> Result<&'a Value, LazyError> {
    for (axis, &index) in path.iter().enumerate() {
        cur = match cur {
            Value::Fixed(a) => a.items.get(index).ok_or(LazyError::OutOfBounds {
                axis,
                index,
                size: a.items.len(),
            })?,
            Value::Dynamic(a) => a.items.get(index).ok_or(LazyError::OutOfBounds {
                axis,
                index,
                size: a.items.len(),
            })?,
            Value::Iterable(a) => a.items.iter().nth(index).ok_or(LazyError::OutOfBounds {
                axis,
                index,
                size: a.items.len(),
            })?,
            other => {
                return Err(LazyError::TypeError {
                    expected: "array".to_string(),
                    found: other.type_shape().to_string(),
                });
            }
        };
    }
    Ok(cur)
}

fn walk_mut<'a>(mut cur: &'a mut Value, path: &[usize]) -> Result<&'a mut Value, LazyError> {
    for (axis, &index) in path.iter().enumerate() {
        cur = match cur {
            Value::Fixed(a) => {
                let size = a.items.len();
                a.items
                    .get_mut(index)
                    .ok_or(LazyError::OutOfBounds { axis, index, size })?
            }
            Value::Dynamic(a) => {
                let size = a.items.len();
                a.items
                    .get_mut(index)
                    .ok_or(LazyError::OutOfBounds { axis, index, size })?
            }
            Value::Iterable(a) => {
                let size = a.items.len();
                a.items
                    .iter_mut()
                    .nth(index)
                    .ok_or(LazyError::OutOfBounds { axis, index, size })?
            }
            other => {
                return Err(LazyError::TypeError {
                    expected: "array".to_string(),
                    found: other.type_shape().to_string(),
                });
            }
        };
    }
    Ok(cur)
}

impl Place {
    /// A writable place over a private temporary.
    ///
    /// Used when an owned operand fills an output parameter: the operation may
    /// write, but nothing outside the call observes it.
    pub fn detached(value: Value) -> Self {
        Place {
            root: Rc::new(RefCell::new(value)),
            path: Vec::new(),
            writable: true,
        }
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Same storage and same path.
    pub fn same_location(&self, other: &Place) -> bool {
        Rc::ptr_eq(&self.root, &other.root) && self.path == other.path
    }

    /// Place of element `index` of the referenced array.
    pub fn child(&self, index: usize) -> Place {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(index);
        Place {
            root: Rc::clone(&self.root),
            path,
            writable: self.writable,
        }
    }

    /// Borrows the referenced value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> Result<R, LazyError>) -> Result<R, LazyError> {
        let root = self.root.try_borrow().map_err(|_| LazyError::BorrowConflict)?;
        f(walk(&root, &self.path)?)
    }

    pub fn read(&self) -> Result<Value, LazyError> {
        self.with(|v| Ok(v.clone()))
    }

    pub fn write(&self, value: Value) -> Result<(), LazyError> {
        if !self.writable {
            return Err(LazyError::ReadOnly);
        }
        let mut root = self
            .root
            .try_borrow_mut()
            .map_err(|_| LazyError::BorrowConflict)?;
        *walk_mut(&mut root, &self.path)? = value;
        Ok(())
    }

    /// Shape of the referenced value.
    ///
    /// `Void` when the storage is mutably borrowed or the path no longer
    /// resolves, e.g. after the owner replaced the value with a smaller one.
    pub fn type_shape(&self) -> TypeShape {
        match self.with(|v| Ok(v.type_shape())) {
            Ok(shape) => shape,
            Err(e) => {
                debug!(path = ?self.path, error = %e, "place does not resolve");
                TypeShape::Void
            }
        }
    }
}

impl fmt::Debug for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Place")
            .field("root", &Rc::as_ptr(&self.root))
            .field("path", &self.path)
            .field("writable", &self.writable)
            .finish()
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.read() {
            Ok(v) => write!(f, "{}", v),
            Err(_) => f.write_str("<borrowed>"),
        }
    }
}

/// # Shared
///
/// Caller-owned storage that expressions reference rather than copy.
///
/// Clones share the same storage.
///
/// ```
/// use lazyexpr::{Shared, Operation, Out, make_expression, operands};
///
/// let z = Shared::new([0i32; 3]);
/// let op = Operation::from_fn("store", |x: i32, mut z: Out<i32>| z.set(x * 2));
/// let e = make_expression(op, operands![[1i32, 2, 3], &z]).unwrap();
/// e.eval().unwrap();
/// assert_eq!(z.read::<[i32; 3]>().unwrap(), [2, 4, 6]);
/// ```
#[derive(Clone, Debug)]
pub struct Shared {
    cell: Rc<RefCell<Value>>,
}

impl Shared {
    pub fn new<T: IntoValue>(value: T) -> Self {
        Self::from_value(value.into_value())
    }

    pub fn from_value(value: Value) -> Self {
        Shared {
            cell: Rc::new(RefCell::new(value)),
        }
    }

    /// Writable reference operand.
    pub fn by_ref(&self) -> Value {
        Value::Ref(Place {
            root: Rc::clone(&self.cell),
            path: Vec::new(),
            writable: true,
        })
    }

    /// Read-only reference operand.
    pub fn by_cref(&self) -> Value {
        Value::Ref(Place {
            root: Rc::clone(&self.cell),
            path: Vec::new(),
            writable: false,
        })
    }

    pub fn get(&self) -> Result<Value, LazyError> {
        self.at(&[])
    }

    pub fn read<T: FromValue>(&self) -> Result<T, LazyError> {
        let root = self.cell.try_borrow().map_err(|_| LazyError::BorrowConflict)?;
        T::from_value(&root)
    }

    pub fn at(&self, path: &[usize]) -> Result<Value, LazyError> {
        let root = self.cell.try_borrow().map_err(|_| LazyError::BorrowConflict)?;
        walk(&root, path).cloned()
    }

    pub fn set_at<T: IntoValue>(&self, path: &[usize], value: T) -> Result<(), LazyError> {
        let mut root = self
            .cell
            .try_borrow_mut()
            .map_err(|_| LazyError::BorrowConflict)?;
        *walk_mut(&mut root, path)? = value.into_value();
        Ok(())
    }

    /// Swaps in a new value, returning the old one.
    pub fn replace(&self, value: Value) -> Result<Value, LazyError> {
        let mut root = self
            .cell
            .try_borrow_mut()
            .map_err(|_| LazyError::BorrowConflict)?;
        Ok(std::mem::replace(&mut *root, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_place_writes_into_root() {
        let s = Shared::new([[0i32; 2]; 2]);
        let Value::Ref(root) = s.by_ref() else {
            panic!("expected a reference");
        };
        root.child(1).child(0).write(7i32.into_value()).unwrap();
        assert_eq!(s.read::<[[i32; 2]; 2]>().unwrap(), [[0, 0], [7, 0]]);
    }

    #[test]
    fn test_read_only_place_rejects_writes() {
        let s = Shared::new(1i32);
        let Value::Ref(p) = s.by_cref() else {
            panic!("expected a reference");
        };
        assert_eq!(p.write(2i32.into_value()), Err(LazyError::ReadOnly));
        assert_eq!(s.read::<i32>().unwrap(), 1);
    }

    #[test]
    fn test_unresolved_place_has_void_shape() {
        let s = Shared::new([1i32, 2, 3]);
        let Value::Ref(root) = s.by_ref() else {
            panic!("expected a reference");
        };
        let last = root.child(2);
        assert_eq!(last.type_shape(), TypeShape::scalar(crate::enums::scalar::ScalarType::Int32));

        let guard = s.cell.borrow_mut();
        assert_eq!(last.type_shape(), TypeShape::Void);
        drop(guard);

        s.replace([1i32].into_value()).unwrap();
        assert_eq!(last.type_shape(), TypeShape::Void);
        assert_eq!(root.type_shape(), TypeShape::fixed(1, TypeShape::scalar(crate::enums::scalar::ScalarType::Int32)));
    }

    #[test]
    fn test_out_of_bounds_path() {
        let s = Shared::new(vec![1i32, 2]);
        assert_eq!(
            s.at(&[5]),
            Err(LazyError::OutOfBounds { axis: 0, index: 5, size: 2 })
        );
    }

    #[test]
    fn test_same_location() {
        let s = Shared::new([1i32, 2]);
        let (Value::Ref(a), Value::Ref(b)) = (s.by_ref(), s.by_cref()) else {
            panic!("expected references");
        };
        assert!(a.child(1).same_location(&b.child(1)));
        assert!(!a.child(0).same_location(&b.child(1)));
    }
}
