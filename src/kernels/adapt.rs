// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Adaptation Module
//!
//! Turns a broadcast-reduced operand element into an argument of the exact
//! parameter type.
//!
//! ## Rules
//! One rule is selected per step, in priority order:
//! 1. [`Rule::Identity`]: shapes already match, pass through.
//! 2. [`Rule::Unwrap`]: read through an explicit reference.
//! 3. [`Rule::Convert`]: implicit scalar conversion, or a sequence rebuilt as
//!    the parameter's container.
//! 4. [`Rule::Construct`]: the parameter's registered constructor.
//! 5. [`Rule::Invoke`]: evaluate a rank-0 expression.
//! 6. [`Rule::Deref`]: follow a pointer-like owner.
//!
//! Unwrap, Invoke and Deref produce a new element and selection repeats, at
//! most once per wrapper layer. The same selection drives the construction-time
//! [`check`] over shapes and the call-time [`argument`] over values, so a
//! constructed expression never meets an element it cannot adapt.
//!
//! Output parameters bind to a place: only Identity and Unwrap apply.

use std::borrow::Cow;
use std::rc::Rc;

use crate::enums::error::LazyError;
use crate::enums::shape_kind::TypeShape;
use crate::enums::value::Value;
use crate::structs::operation::{Arg, Param, Pass};
use crate::structs::place::Place;
use crate::traits::shape::Rank;

/// Slack on top of the shape depth for the adaptation loop.
const EXTRA_STEPS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Identity,
    Unwrap,
    Convert,
    Construct,
    Invoke,
    Deref,
}

/// Picks the first rule that applies to an element of shape `shape`.
pub fn select_rule(shape: &TypeShape, param: &Param) -> Option<Rule> {
    let target = param.shape();
    match (shape, param.pass()) {
        (TypeShape::Reference(inner), Pass::Output) => {
            (inner.referent() == target).then_some(Rule::Identity)
        }
        (TypeShape::Reference(_), Pass::Value) => Some(Rule::Unwrap),
        (s, _) if s == target => Some(Rule::Identity),
        (_, Pass::Output) => None,
        (s, Pass::Value) if convertible(s, target) => Some(Rule::Convert),
        (s, Pass::Value) if constructible(s, param) => Some(Rule::Construct),
        (TypeShape::Expression { rank: 0, .. }, Pass::Value) => Some(Rule::Invoke),
        (TypeShape::Pointer(_), Pass::Value) if !param.is_pointer() => Some(Rule::Deref),
        _ => None,
    }
}

/// Whether `from` converts implicitly to `to`.
pub fn convertible(from: &TypeShape, to: &TypeShape) -> bool {
    let compatible = |a: &TypeShape, b: &TypeShape| a == b || convertible(a, b);
    match (from, to) {
        (TypeShape::Scalar(a), TypeShape::Scalar(b)) => a != b && a.can_cast_to(b),
        (
            TypeShape::Fixed { elem, .. } | TypeShape::Dynamic(elem) | TypeShape::Iterable(elem),
            TypeShape::Dynamic(target) | TypeShape::Iterable(target),
        ) => from != to && compatible(elem, target),
        (TypeShape::Fixed { len, elem }, TypeShape::Fixed { len: n, elem: target }) => {
            len == n && from != to && compatible(elem, target)
        }
        _ => false,
    }
}

fn constructible(shape: &TypeShape, param: &Param) -> bool {
    param
        .constructor_source()
        .is_some_and(|source| shape == source || convertible(shape, source))
}

/// Converts `value` to `target`, following [`convertible`].
pub fn convert(value: &Value, target: &TypeShape) -> Result<Value, LazyError> {
    let items = |v: &Value| -> Result<Vec<Value>, LazyError> {
        match v {
            Value::Fixed(a) => Ok(a.items.to_vec()),
            Value::Dynamic(a) => Ok(a.items.clone()),
            Value::Iterable(a) => Ok(a.items.iter().cloned().collect()),
            other => Err(LazyError::Adaptation {
                from: other.type_shape().to_string(),
                to: target.to_string(),
            }),
        }
    };
    let element = |v: Value, elem: &TypeShape| -> Result<Value, LazyError> {
        if &v.type_shape() == elem {
            Ok(v)
        } else {
            convert(&v, elem)
        }
    };
    match (value, target) {
        (Value::Scalar(s), TypeShape::Scalar(ty)) => Ok(Value::Scalar(s.cast(ty)?)),
        (_, TypeShape::Dynamic(elem)) => Ok(Value::dynamic(
            (**elem).clone(),
            items(value)?
                .into_iter()
                .map(|v| element(v, elem))
                .collect::<Result<_, _>>()?,
        )),
        (_, TypeShape::Iterable(elem)) => Ok(Value::iterable(
            (**elem).clone(),
            items(value)?
                .into_iter()
                .map(|v| element(v, elem))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        (_, TypeShape::Fixed { elem, .. }) => Ok(Value::fixed(
            (**elem).clone(),
            items(value)?
                .into_iter()
                .map(|v| element(v, elem))
                .collect::<Result<_, _>>()?,
        )),
        _ => Err(LazyError::Adaptation {
            from: value.type_shape().to_string(),
            to: target.to_string(),
        }),
    }
}

/// Strips pointer-like layers the parameter does not ask for.
///
/// Applied once to each operand at construction, so that a pointer to an
/// array broadcasts like the array itself.
pub fn prepare(value: Value, param: &Param) -> Value {
    if param.is_pointer() {
        return value;
    }
    let mut value = value;
    while let Value::Pointer(target) = value {
        value = Rc::try_unwrap(target).unwrap_or_else(|shared| (*shared).clone());
    }
    value
}

/// Construction-time check that an element of shape `shape` adapts to `param`.
pub fn check(shape: &TypeShape, param: &Param) -> Result<(), LazyError> {
    let rejected = || LazyError::Adaptation {
        from: shape.to_string(),
        to: param.shape().to_string(),
    };
    let mut current = shape.clone();
    for _ in 0..=shape.depth() + EXTRA_STEPS {
        current = match (select_rule(&current, param), current) {
            (Some(Rule::Identity | Rule::Convert | Rule::Construct), _) => return Ok(()),
            (Some(Rule::Unwrap), TypeShape::Reference(inner)) => *inner,
            (Some(Rule::Invoke), TypeShape::Expression { output, .. }) => *output,
            (Some(Rule::Deref), TypeShape::Pointer(inner)) => *inner,
            _ => return Err(rejected()),
        };
    }
    Err(rejected())
}

/// Call-time adaptation of one element to `param`.
pub fn argument(value: Cow<'_, Value>, param: &Param) -> Result<Arg, LazyError> {
    let mut current = value;
    let mut steps = current.type_shape().depth() + EXTRA_STEPS;
    loop {
        let shape = current.type_shape();
        let rejected = || LazyError::Adaptation {
            from: shape.to_string(),
            to: param.shape().to_string(),
        };
        let rule = select_rule(&shape, param);
        let next = match (rule, &*current) {
            (Some(Rule::Identity), _) => {
                return match (param.pass(), current.into_owned()) {
                    (Pass::Output, Value::Ref(place)) if !place.is_writable() => {
                        Err(LazyError::ReadOnly)
                    }
                    (Pass::Output, Value::Ref(place)) => Ok(Arg::Place(place)),
                    (Pass::Output, owned) => Ok(Arg::Place(Place::detached(owned))),
                    (Pass::Value, owned) => Ok(Arg::Value(owned)),
                };
            }
            (Some(Rule::Convert), v) => return Ok(Arg::Value(convert(v, param.shape())?)),
            (Some(Rule::Construct), v) => {
                let source = param.constructor_source().ok_or_else(rejected)?;
                let input = if &shape == source {
                    Cow::Borrowed(v)
                } else {
                    Cow::Owned(convert(v, source)?)
                };
                return Ok(Arg::Value(param.construct(&input)?));
            }
            (Some(Rule::Unwrap), Value::Ref(place)) => place.read()?,
            (Some(Rule::Invoke), Value::Expr(e)) => e.call()?,
            (Some(Rule::Deref), Value::Pointer(target)) => (**target).clone(),
            _ => return Err(rejected()),
        };
        if steps == 0 {
            return Err(rejected());
        }
        steps -= 1;
        current = Cow::Owned(next);
    }
}
