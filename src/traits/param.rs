//! # Param Trait Module
//!
//! Bridges Rust types and the dynamic [`Value`] universe.
//!
//! - [`Shaped`] gives a Rust type its static [`TypeShape`].
//! - [`IntoValue`] / [`FromValue`] move data in and out of `Value`.
//! - [`ParamType`] and [`Returns`] let a plain closure become an `Operation`
//! whose parameter list and result type are read from its signature.
//! - [`IntoOperand`] backs the `operands!` macro.

use std::collections::{BTreeSet, LinkedList};
use std::rc::Rc;

use crate::enums::error::LazyError;
use crate::enums::scalar::{Scalar, ScalarType};
use crate::enums::shape_kind::TypeShape;
use crate::enums::value::Value;
use crate::structs::expression::Expression;
use crate::structs::operation::{Arg, Param};
use crate::structs::place::Shared;
use crate::traits::shape::Rank;

/// Static shape of a Rust type.
pub trait Shaped {
    fn type_shape() -> TypeShape;
}

/// Conversion of Rust data into a `Value`.
pub trait IntoValue: Shaped {
    fn into_value(self) -> Value;
}

/// Extraction of Rust data from a `Value`.
///
/// References and pointer-like owners are looked through.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, LazyError>;
}

/// A type usable as a parameter of an operation built with `Operation::from_fn`.
pub trait ParamType: Sized {
    fn param() -> Param;
    fn from_arg(arg: Arg) -> Result<Self, LazyError>;
}

/// A type usable as the return of an operation built with `Operation::from_fn`.
pub trait Returns {
    fn output_shape() -> TypeShape;
    fn into_result(self) -> Result<Value, LazyError>;
}

/// Anything that can be passed as an operand.
pub trait IntoOperand {
    fn into_operand(self) -> Value;
}

pub(crate) fn type_error<T>(found: &Value) -> LazyError {
    LazyError::TypeError {
        expected: std::any::type_name::<T>().to_string(),
        found: found.type_shape().to_string(),
    }
}

macro_rules! impl_scalar_value {
    ($t:ty, $variant:ident) => {
        impl Shaped for $t {
            #[inline]
            fn type_shape() -> TypeShape {
                TypeShape::Scalar(ScalarType::$variant)
            }
        }

        impl IntoValue for $t {
            #[inline]
            fn into_value(self) -> Value {
                Value::Scalar(Scalar::$variant(self))
            }
        }

        impl FromValue for $t {
            fn from_value(value: &Value) -> Result<Self, LazyError> {
                match value {
                    Value::Scalar(Scalar::$variant(v)) => Ok(v.clone()),
                    Value::Ref(place) => place.with(Self::from_value),
                    Value::Pointer(target) => Self::from_value(target),
                    other => Err(type_error::<Self>(other)),
                }
            }
        }
    };
}

impl_scalar_value!(bool, Boolean);
impl_scalar_value!(i32, Int32);
impl_scalar_value!(i64, Int64);
impl_scalar_value!(u32, UInt32);
impl_scalar_value!(u64, UInt64);
impl_scalar_value!(f32, Float32);
impl_scalar_value!(f64, Float64);
impl_scalar_value!(char, Char);
impl_scalar_value!(String, String);

impl Shaped for () {
    fn type_shape() -> TypeShape {
        TypeShape::Void
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Void
    }
}

impl FromValue for () {
    fn from_value(value: &Value) -> Result<Self, LazyError> {
        match value {
            Value::Void => Ok(()),
            other => Err(type_error::<Self>(other)),
        }
    }
}

/// Items of any sequence, looking through references and pointers.
fn sequence_items<T: FromValue>(value: &Value) -> Result<Vec<T>, LazyError> {
    match value {
        Value::Fixed(a) => a.items.iter().map(T::from_value).collect(),
        Value::Dynamic(a) => a.items.iter().map(T::from_value).collect(),
        Value::Iterable(a) => a.items.iter().map(T::from_value).collect(),
        Value::Ref(place) => place.with(sequence_items),
        Value::Pointer(target) => sequence_items(target),
        other => Err(type_error::<Vec<T>>(other)),
    }
}

impl<T: Shaped, const N: usize> Shaped for [T; N] {
    fn type_shape() -> TypeShape {
        TypeShape::fixed(N, T::type_shape())
    }
}

impl<T: IntoValue, const N: usize> IntoValue for [T; N] {
    fn into_value(self) -> Value {
        Value::fixed(T::type_shape(), self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue, const N: usize> FromValue for [T; N] {
    fn from_value(value: &Value) -> Result<Self, LazyError> {
        let items = sequence_items::<T>(value)?;
        let found = items.len();
        items.try_into().map_err(|_| LazyError::TypeError {
            expected: format!("array of length {}", N),
            found: format!("sequence of length {}", found),
        })
    }
}

impl<T: Shaped> Shaped for Vec<T> {
    fn type_shape() -> TypeShape {
        TypeShape::dynamic(T::type_shape())
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::dynamic(T::type_shape(), self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, LazyError> {
        sequence_items(value)
    }
}

impl<T: Shaped> Shaped for LinkedList<T> {
    fn type_shape() -> TypeShape {
        TypeShape::iterable(T::type_shape())
    }
}

impl<T: IntoValue> IntoValue for LinkedList<T> {
    fn into_value(self) -> Value {
        Value::iterable(T::type_shape(), self.into_iter().map(IntoValue::into_value))
    }
}

impl<T: FromValue> FromValue for LinkedList<T> {
    fn from_value(value: &Value) -> Result<Self, LazyError> {
        Ok(sequence_items(value)?.into_iter().collect())
    }
}

impl<T: Shaped> Shaped for BTreeSet<T> {
    fn type_shape() -> TypeShape {
        TypeShape::iterable(T::type_shape())
    }
}

impl<T: IntoValue> IntoValue for BTreeSet<T> {
    fn into_value(self) -> Value {
        Value::iterable(T::type_shape(), self.into_iter().map(IntoValue::into_value))
    }
}

impl<T: FromValue + Ord> FromValue for BTreeSet<T> {
    fn from_value(value: &Value) -> Result<Self, LazyError> {
        Ok(sequence_items(value)?.into_iter().collect())
    }
}

impl<T: Shaped> Shaped for Rc<T> {
    fn type_shape() -> TypeShape {
        TypeShape::pointer(T::type_shape())
    }
}

impl<T: IntoValue + Clone> IntoValue for Rc<T> {
    fn into_value(self) -> Value {
        let target = Rc::try_unwrap(self).unwrap_or_else(|shared| (*shared).clone());
        Value::pointer(target.into_value())
    }
}

impl<T: FromValue> FromValue for Rc<T> {
    fn from_value(value: &Value) -> Result<Self, LazyError> {
        match value {
            Value::Pointer(target) => Ok(Rc::new(T::from_value(target)?)),
            Value::Ref(place) => place.with(Self::from_value),
            other => Err(type_error::<Self>(other)),
        }
    }
}

impl<T: FromValue + Shaped> ParamType for T {
    fn param() -> Param {
        Param::value(T::type_shape())
    }

    fn from_arg(arg: Arg) -> Result<Self, LazyError> {
        match arg {
            Arg::Value(v) => T::from_value(&v),
            Arg::Place(p) => p.with(T::from_value),
        }
    }
}

impl<T: IntoValue> Returns for T {
    fn output_shape() -> TypeShape {
        T::type_shape()
    }

    fn into_result(self) -> Result<Value, LazyError> {
        Ok(self.into_value())
    }
}

impl<T: IntoValue> Returns for Result<T, LazyError> {
    fn output_shape() -> TypeShape {
        T::type_shape()
    }

    fn into_result(self) -> Result<Value, LazyError> {
        self.map(IntoValue::into_value)
    }
}

impl<T: IntoValue> IntoOperand for T {
    fn into_operand(self) -> Value {
        self.into_value()
    }
}

impl IntoOperand for Value {
    fn into_operand(self) -> Value {
        self
    }
}

impl IntoOperand for Expression {
    fn into_operand(self) -> Value {
        Value::from(self)
    }
}

/// A shared handle is passed as a writable reference.
impl IntoOperand for &Shared {
    fn into_operand(self) -> Value {
        self.by_ref()
    }
}
