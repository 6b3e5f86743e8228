//! # **Custom Value Trait Module** - *Lets user types travel through expressions*
//!
//! Includes the [`CustomValue`] trait, enabling storage of arbitrary user-defined
//! types inside [`Scalar::Custom`](crate::Scalar::Custom).
//!
//! Typical payloads are receivers of bound calls (`Operation::method`) and
//! wrapper types built by a parameter's constructor during adaptation.
//!
//! ## Key Points
//! - Any `Clone + PartialEq + Debug + Send + Sync + 'static` type qualifies
//! through the blanket implementation.
//! - Borrowed types are not supported; use owned types or `Arc`.

use std::{any::Any, sync::Arc};

/// # Custom Value
///
/// Trait for any object that can be stored in `Scalar::Custom`.
///
/// **Dynamic dispatch and downcasting** recover the concrete type when an
/// operation parameter of type `Obj<T>` is filled.
pub trait CustomValue: Any + Send + Sync + std::fmt::Debug {
    /// Downcasts the type as `Any`
    fn as_any(&self) -> &dyn Any;

    /// Returns a deep clone of the object.
    fn deep_clone(&self) -> Arc<dyn CustomValue>;

    /// Performs semantic equality on the boxed object.
    fn eq_box(&self, other: &dyn CustomValue) -> bool;

    /// Concrete type name, used in shape descriptors and error messages.
    fn type_name(&self) -> &'static str;
}

impl<T> CustomValue for T
where
    T: Any + Send + Sync + Clone + PartialEq + std::fmt::Debug,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn deep_clone(&self) -> Arc<dyn CustomValue> {
        Arc::new(self.clone())
    }

    fn eq_box(&self, other: &dyn CustomValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |o| self == o)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}
