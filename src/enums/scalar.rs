//! # Scalar Module - *Single Value Container*
//!
//! Contains the Scalar type for holding a single, rank-0 value, and the
//! matching [`ScalarType`] tag used by static shape descriptors.
//!
//! ## Purpose
//! - Supports boolean, numeric, character, text and custom object variants.
//! - Hosts the scalar half of argument adaptation: the numeric conversions an
//! operation parameter may request from a differently typed operand.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use num_traits::NumCast;

use crate::enums::error::LazyError;
use crate::traits::custom_value::CustomValue;

/// # Scalar
///
/// Scalar literals covering all supported element types.
///
/// `Custom` holds user objects, e.g. the receiver of a bound call.
#[derive(Debug, Clone)]
pub enum Scalar {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Char(char),
    String(String),
    Custom(Arc<dyn CustomValue>),
}

/// Static type tag of a [`Scalar`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarType {
    Boolean,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Char,
    String,
    Custom { id: TypeId, name: &'static str },
}

impl ScalarType {
    /// Tag for a user type stored under `Scalar::Custom`.
    pub fn custom<T: Any>() -> Self {
        ScalarType::Custom {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Booleans, characters, integers and floats share one conversion family.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        !matches!(self, ScalarType::String | ScalarType::Custom { .. })
    }

    /// Whether a value of this type may be implicitly converted to `target`.
    ///
    /// This is a type-level answer. A permitted conversion may still fail for a
    /// particular value, e.g. `-1` into `UInt32`.
    pub fn can_cast_to(&self, target: &ScalarType) -> bool {
        self == target || (self.is_numeric() && target.is_numeric())
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Boolean => "bool",
            ScalarType::Int32 => "i32",
            ScalarType::Int64 => "i64",
            ScalarType::UInt32 => "u32",
            ScalarType::UInt64 => "u64",
            ScalarType::Float32 => "f32",
            ScalarType::Float64 => "f64",
            ScalarType::Char => "char",
            ScalarType::String => "String",
            ScalarType::Custom { name, .. } => name,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Scalar {
    /// Wraps a user object.
    pub fn custom<T: CustomValue>(value: T) -> Self {
        Scalar::Custom(Arc::new(value))
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Scalar::Boolean(_) => ScalarType::Boolean,
            Scalar::Int32(_) => ScalarType::Int32,
            Scalar::Int64(_) => ScalarType::Int64,
            Scalar::UInt32(_) => ScalarType::UInt32,
            Scalar::UInt64(_) => ScalarType::UInt64,
            Scalar::Float32(_) => ScalarType::Float32,
            Scalar::Float64(_) => ScalarType::Float64,
            Scalar::Char(_) => ScalarType::Char,
            Scalar::String(_) => ScalarType::String,
            Scalar::Custom(v) => ScalarType::Custom {
                id: v.as_any().type_id(),
                name: v.type_name(),
            },
        }
    }

    /// Downcasts a custom payload.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Scalar::Custom(v) => v.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Reads a numeric-family scalar as `T`, returning `None` when the value
    /// does not fit or the scalar is not numeric.
    pub fn num<T: NumCast>(&self) -> Option<T> {
        match self {
            Scalar::Boolean(v) => T::from(*v as u8),
            Scalar::Int32(v) => T::from(*v),
            Scalar::Int64(v) => T::from(*v),
            Scalar::UInt32(v) => T::from(*v),
            Scalar::UInt64(v) => T::from(*v),
            Scalar::Float32(v) => T::from(*v),
            Scalar::Float64(v) => T::from(*v),
            Scalar::Char(c) => T::from(*c as u32),
            Scalar::String(_) | Scalar::Custom(_) => None,
        }
    }

    /// Converts to `target`, cloning when the type already matches.
    pub fn cast(&self, target: &ScalarType) -> Result<Scalar, LazyError> {
        let source = self.scalar_type();
        if &source == target {
            return Ok(self.clone());
        }
        if !source.can_cast_to(target) {
            return Err(LazyError::TypeError {
                expected: target.to_string(),
                found: source.to_string(),
            });
        }
        let cast = match target {
            ScalarType::Boolean => self.num::<f64>().map(|v| Scalar::Boolean(v != 0.0)),
            ScalarType::Int32 => self.num().map(Scalar::Int32),
            ScalarType::Int64 => self.num().map(Scalar::Int64),
            ScalarType::UInt32 => self.num().map(Scalar::UInt32),
            ScalarType::UInt64 => self.num().map(Scalar::UInt64),
            ScalarType::Float32 => self.num().map(Scalar::Float32),
            ScalarType::Float64 => self.num().map(Scalar::Float64),
            ScalarType::Char => self.num::<u32>().and_then(char::from_u32).map(Scalar::Char),
            ScalarType::String | ScalarType::Custom { .. } => None,
        };
        cast.ok_or_else(|| LazyError::Conversion {
            value: self.to_string(),
            target: target.to_string(),
        })
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        use Scalar::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => a == b,
            (Int32(a), Int32(b)) => a == b,
            (Int64(a), Int64(b)) => a == b,
            (UInt32(a), UInt32(b)) => a == b,
            (UInt64(a), UInt64(b)) => a == b,
            (Float32(a), Float32(b)) => a == b,
            (Float64(a), Float64(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Custom(a), Custom(b)) => a.eq_box(&**b),
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Boolean(v) => write!(f, "{}", v),
            Scalar::Int32(v) => write!(f, "{}", v),
            Scalar::Int64(v) => write!(f, "{}", v),
            Scalar::UInt32(v) => write!(f, "{}", v),
            Scalar::UInt64(v) => write!(f, "{}", v),
            Scalar::Float32(v) => write!(f, "{}", v),
            Scalar::Float64(v) => write!(f, "{}", v),
            Scalar::Char(v) => write!(f, "{:?}", v),
            Scalar::String(v) => write!(f, "{:?}", v),
            Scalar::Custom(v) => write!(f, "{:?}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Tag(u8);

    #[test]
    fn test_char_widens_to_int() {
        let c = Scalar::Char('c');
        assert_eq!(c.cast(&ScalarType::Int32).unwrap(), Scalar::Int32(99));
    }

    #[test]
    fn test_cast_rejects_lossy_range() {
        let v = Scalar::Int32(-1);
        assert!(matches!(
            v.cast(&ScalarType::UInt32),
            Err(LazyError::Conversion { .. })
        ));
        assert_eq!(v.cast(&ScalarType::Int64).unwrap(), Scalar::Int64(-1));
    }

    #[test]
    fn test_string_and_custom_do_not_convert() {
        assert!(!ScalarType::String.can_cast_to(&ScalarType::Int32));
        assert!(!ScalarType::custom::<Tag>().can_cast_to(&ScalarType::Int32));
        assert!(ScalarType::Boolean.can_cast_to(&ScalarType::Float64));
    }

    #[test]
    fn test_custom_equality_and_type() {
        let a = Scalar::custom(Tag(1));
        let b = Scalar::custom(Tag(1));
        assert_eq!(a, b);
        assert_eq!(a.scalar_type(), ScalarType::custom::<Tag>());
        assert_eq!(a.downcast_ref::<Tag>(), Some(&Tag(1)));
    }
}
