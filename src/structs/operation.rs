//! # Operation Module
//!
//! A callable with a declared parameter list, the thing an expression defers.
//!
//! ## Overview
//! - [`Operation`] pairs a kernel with the static [`Param`] shapes the
//! broadcast planner and the adaptation layer reason about.
//! - [`Operation::from_fn`] reads parameters and result type straight from a
//! closure signature, for closures of up to six parameters.
//! - [`Out`] marks an output parameter: the operation writes through it and the
//! write lands in the caller's storage when the operand is a reference.
//! - [`Obj`] carries user types through [`Scalar::Custom`](crate::Scalar::Custom).
//!
//! ## Example
//! ```
//! use lazyexpr::{Operation, Param, TypeShape, ScalarType, Value};
//!
//! let add = Operation::from_fn("add", |a: i32, b: i32| a + b);
//! assert_eq!(add.arity(), 2);
//!
//! // Untyped equivalent
//! let int = TypeShape::scalar(ScalarType::Int32);
//! let add = Operation::new("add", |args| {
//!         Ok(Value::from(lazyexpr::Scalar::Int32(args.get::<i32>(0)? + args.get::<i32>(1)?)))
//!     })
//!     .param(Param::value(int.clone()))
//!     .param(Param::value(int.clone()))
//!     .returns(int);
//! assert_eq!(add.params().len(), 2);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::aliases::{Constructor, Kernel};
use crate::enums::error::LazyError;
use crate::enums::scalar::{Scalar, ScalarType};
use crate::enums::shape_kind::TypeShape;
use crate::enums::value::Value;
use crate::structs::place::Place;
use crate::traits::custom_value::CustomValue;
use crate::traits::param::{FromValue, IntoValue, ParamType, Returns, Shaped, type_error};
use crate::traits::shape::{Rank, shape_rank};

/// How an operand reaches a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// The operation reads a copy.
    Value,
    /// The operation writes through a place.
    Output,
}

/// # Param
///
/// Declared parameter of an operation.
///
/// The shape fixes the parameter's rank, which decides how many outer axes of
/// the matching operand are broadcast. An optional constructor accepts a
/// foreign source shape and builds the parameter value from it.
#[derive(Clone)]
pub struct Param {
    shape: TypeShape,
    pass: Pass,
    constructor: Option<(TypeShape, Constructor)>,
}

impl Param {
    pub fn value(shape: TypeShape) -> Self {
        Param {
            shape,
            pass: Pass::Value,
            constructor: None,
        }
    }

    pub fn output(shape: TypeShape) -> Self {
        Param {
            shape,
            pass: Pass::Output,
            constructor: None,
        }
    }

    /// Registers a constructor from `source`.
    ///
    /// Operands whose element shape is `source`, or converts to it, are
    /// accepted and passed through `f` before the call.
    pub fn constructible_from(
        mut self,
        source: TypeShape,
        f: impl Fn(&Value) -> Result<Value, LazyError> + 'static,
    ) -> Self {
        self.constructor = Some((source, Rc::new(f)));
        self
    }

    #[inline]
    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    #[inline]
    pub fn pass(&self) -> Pass {
        self.pass
    }

    #[inline]
    pub fn rank(&self) -> i32 {
        shape_rank(&self.shape)
    }

    #[inline]
    pub fn is_pointer(&self) -> bool {
        matches!(self.shape, TypeShape::Pointer(_))
    }

    pub fn constructor_source(&self) -> Option<&TypeShape> {
        self.constructor.as_ref().map(|(source, _)| source)
    }

    pub(crate) fn construct(&self, value: &Value) -> Result<Value, LazyError> {
        match &self.constructor {
            Some((_, f)) => f(value),
            None => Err(LazyError::Adaptation {
                from: value.type_shape().to_string(),
                to: self.shape.to_string(),
            }),
        }
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("shape", &self.shape)
            .field("pass", &self.pass)
            .field("constructor", &self.constructor_source())
            .finish()
    }
}

/// Adapted argument handed to a kernel.
#[derive(Debug, Clone)]
pub enum Arg {
    Value(Value),
    Place(Place),
}

/// Arguments of a single invocation, in parameter order.
#[derive(Debug)]
pub struct Args {
    items: Vec<Option<Arg>>,
}

impl Args {
    pub fn new(items: Vec<Arg>) -> Self {
        Args {
            items: items.into_iter().map(Some).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn slot(&self, index: usize) -> Result<&Arg, LazyError> {
        self.items
            .get(index)
            .and_then(Option::as_ref)
            .ok_or_else(|| LazyError::kernel(format!("argument {} is not available", index)))
    }

    /// Moves argument `index` out.
    pub fn take(&mut self, index: usize) -> Result<Arg, LazyError> {
        self.items
            .get_mut(index)
            .and_then(Option::take)
            .ok_or_else(|| LazyError::kernel(format!("argument {} is not available", index)))
    }

    pub fn get<T: FromValue>(&self, index: usize) -> Result<T, LazyError> {
        match self.slot(index)? {
            Arg::Value(v) => T::from_value(v),
            Arg::Place(p) => p.with(T::from_value),
        }
    }
}

/// Output parameter of type `T`.
pub struct Out<T> {
    place: Place,
    _marker: PhantomData<fn() -> T>,
}

impl<T: IntoValue> Out<T> {
    pub fn set(&mut self, value: T) -> Result<(), LazyError> {
        self.place.write(value.into_value())
    }
}

impl<T: FromValue> Out<T> {
    pub fn get(&self) -> Result<T, LazyError> {
        self.place.with(T::from_value)
    }
}

impl<T> fmt::Debug for Out<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Out").field(&self.place).finish()
    }
}

impl<T: Shaped> ParamType for Out<T> {
    fn param() -> Param {
        Param::output(T::type_shape())
    }

    fn from_arg(arg: Arg) -> Result<Self, LazyError> {
        let place = match arg {
            Arg::Place(p) => p,
            Arg::Value(v) => Place::detached(v),
        };
        Ok(Out {
            place,
            _marker: PhantomData,
        })
    }
}

/// User object parameter, stored as a custom scalar.
#[derive(Debug, Clone, PartialEq)]
pub struct Obj<S>(pub S);

impl<S: CustomValue + Clone> Shaped for Obj<S> {
    fn type_shape() -> TypeShape {
        TypeShape::Scalar(ScalarType::custom::<S>())
    }
}

impl<S: CustomValue + Clone> IntoValue for Obj<S> {
    fn into_value(self) -> Value {
        Value::Scalar(Scalar::custom(self.0))
    }
}

impl<S: CustomValue + Clone> FromValue for Obj<S> {
    fn from_value(value: &Value) -> Result<Self, LazyError> {
        match value {
            Value::Scalar(s) => s
                .downcast_ref::<S>()
                .cloned()
                .map(Obj)
                .ok_or_else(|| type_error::<S>(value)),
            Value::Ref(place) => place.with(Self::from_value),
            Value::Pointer(target) => Self::from_value(target),
            other => Err(type_error::<S>(other)),
        }
    }
}

/// # Operation
///
/// Deferred callable with a declared signature.
///
/// A bound operation is a method call: its first parameter is the receiver.
/// The receiver broadcasts like any operand but does not raise the rank of
/// an expression when other operands are present.
#[derive(Clone)]
pub struct Operation {
    name: String,
    params: Vec<Param>,
    output: TypeShape,
    bound: bool,
    kernel: Kernel,
}

impl Operation {
    /// Untyped operation with no parameters and a `Void` result.
    ///
    /// Add parameters with [`Operation::param`] and declare the result shape
    /// with [`Operation::returns`].
    pub fn new(
        name: impl Into<String>,
        kernel: impl Fn(&mut Args) -> Result<Value, LazyError> + 'static,
    ) -> Self {
        Operation {
            name: name.into(),
            params: Vec::new(),
            output: TypeShape::Void,
            bound: false,
            kernel: Rc::new(kernel),
        }
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn returns(mut self, shape: TypeShape) -> Self {
        self.output = shape;
        self
    }

    /// Marks the first parameter as the receiver of a method call.
    pub fn bound(mut self) -> Self {
        self.bound = true;
        self
    }

    pub fn from_fn<M, F: IntoOperation<M>>(name: impl Into<String>, f: F) -> Self {
        f.into_operation(name.into())
    }

    /// Like [`Operation::from_fn`], with the first parameter as receiver.
    pub fn method<M, F: IntoOperation<M>>(name: impl Into<String>, f: F) -> Self {
        Self::from_fn(name, f).bound()
    }

    /// Replaces parameter `index`, e.g. to attach a constructor to a
    /// signature read by [`Operation::from_fn`].
    pub fn with_param(mut self, index: usize, param: Param) -> Self {
        if let Some(slot) = self.params.get_mut(index) {
            *slot = param;
        }
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn output(&self) -> &TypeShape {
        &self.output
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub(crate) fn invoke(&self, args: Vec<Arg>) -> Result<Value, LazyError> {
        let mut args = Args::new(args);
        (self.kernel)(&mut args)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("output", &self.output)
            .field("bound", &self.bound)
            .finish()
    }
}

/// Closures convertible to an [`Operation`].
///
/// `Marker` only disambiguates the per-arity implementations.
pub trait IntoOperation<Marker> {
    fn into_operation(self, name: String) -> Operation;
}

macro_rules! impl_into_operation {
    ($($arg:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
        impl<Func, Ret, $($arg,)*> IntoOperation<(Ret, $($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Ret + 'static,
            Ret: Returns,
            $($arg: ParamType,)*
        {
            fn into_operation(self, name: String) -> Operation {
                let params = vec![$($arg::param()),*];
                let kernel = move |args: &mut Args| -> Result<Value, LazyError> {
                    let mut slot = 0usize;
                    $(
                        let $arg = $arg::from_arg(args.take(slot)?)?;
                        slot += 1;
                    )*
                    (self)($($arg),*).into_result()
                };
                Operation {
                    name,
                    params,
                    output: Ret::output_shape(),
                    bound: false,
                    kernel: Rc::new(kernel),
                }
            }
        }
    };
}

impl_into_operation!();
impl_into_operation!(A1);
impl_into_operation!(A1, A2);
impl_into_operation!(A1, A2, A3);
impl_into_operation!(A1, A2, A3, A4);
impl_into_operation!(A1, A2, A3, A4, A5);
impl_into_operation!(A1, A2, A3, A4, A5, A6);
