//! # Expression Module
//!
//! Deferred, broadcast application of an [`Operation`] to operands of
//! arbitrary rank.
//!
//! ## Overview
//! - Built by [`make_expression`] (or [`Expression::new`]), which validates
//! arity, ranks, adaptability and axis extents up front, so that a
//! constructed expression only fails at evaluation through index misuse or
//! the operation itself.
//! - Evaluated in place with [`Expression::eval`], point-wise with
//! [`Expression::eval_at`], or sliced lazily with [`Expression::index`].
//! - An expression is itself an operand: nesting one inside another defers
//! both, and the inner one is recomputed at each coordinate it is read.
//!
//! ## Example
//! ```
//! use lazyexpr::{Operation, Shared, Out, make_expression, operands};
//!
//! let out = Shared::new([[0i32; 3]; 2]);
//! let add = Operation::from_fn("add", |a: i32, b: i32, mut z: Out<i32>| z.set(a + b));
//! let e = make_expression(add, operands![[1i32, 2, 3], [[10i32], [20]], &out]).unwrap();
//! assert_eq!(e.rank(), 2);
//! e.eval().unwrap();
//! assert_eq!(out.read::<[[i32; 3]; 2]>().unwrap(), [[11, 12, 13], [21, 22, 23]]);
//! ```

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::enums::error::{Incompatibility, LazyError};
use crate::enums::shape_kind::TypeShape;
use crate::enums::validation::{ValidationMode, validation_mode};
use crate::enums::value::Value;
use crate::kernels::access::{self, element_at};
use crate::kernels::adapt;
use crate::kernels::broadcast::BroadcastPlan;
use crate::structs::operation::{Arg, Operation};
use crate::traits::shape::{Rank, shape_rank};

/// # Expression
///
/// An operation bound to its operands, evaluated on demand.
///
/// ## Ownership
/// Operands are owned, except explicit references, which point at caller
/// storage through [`Shared`](crate::Shared). Cloning an expression clones
/// its owned operands and shares its operation and referenced storage.
#[derive(Clone)]
pub struct Expression {
    operation: Rc<Operation>,
    operands: Vec<Value>,
    plan: BroadcastPlan,
    validation: Option<ValidationMode>,
}

/// Builds an expression, validating it against `operation`'s signature.
pub fn make_expression(operation: Operation, operands: Vec<Value>) -> Result<Expression, LazyError> {
    Expression::new(operation, operands)
}

impl Expression {
    pub fn new(operation: Operation, operands: Vec<Value>) -> Result<Self, LazyError> {
        let name = operation.name().to_string();
        Self::build(Rc::new(operation), operands).inspect_err(|e| {
            debug!(operation = %name, error = %e, "expression rejected");
        })
    }

    fn build(operation: Rc<Operation>, operands: Vec<Value>) -> Result<Self, LazyError> {
        let params = operation.params();
        if params.len() != operands.len() {
            return Err(Incompatibility::Arity {
                expected: params.len(),
                found: operands.len(),
            }
            .into());
        }
        let operands: Vec<Value> = operands
            .into_iter()
            .zip(params)
            .map(|(v, p)| adapt::prepare(v, p))
            .collect();
        let shapes: Vec<TypeShape> = operands.iter().map(Rank::type_shape).collect();
        let param_ranks: Vec<i32> = params.iter().map(|p| p.rank()).collect();
        let operand_ranks: Vec<i32> = shapes.iter().map(shape_rank).collect();
        let plan = BroadcastPlan::new(&param_ranks, &operand_ranks, operation.is_bound())?;

        for (i, (shape, param)) in shapes.iter().zip(params).enumerate() {
            let diff = plan.rank_diffs()[i];
            let rejected = |from: &TypeShape| Incompatibility::Adaptation {
                operand: i,
                from: from.to_string(),
                to: param.shape().to_string(),
            };
            let mut element = shape.clone();
            for _ in 0..diff {
                element = element.element().ok_or_else(|| rejected(shape))?;
            }
            adapt::check(&element, param).map_err(|_| rejected(&element))?;
            access::extents(&operands[i], diff, i)?;
        }
        plan.validate(&operands)?;

        debug!(
            operation = %operation.name(),
            rank = plan.rank(),
            operands = operands.len(),
            "expression built"
        );
        Ok(Expression {
            operation,
            operands,
            plan,
            validation: None,
        })
    }

    /// Overrides the process-wide [`ValidationMode`] for this expression and
    /// every slice taken from it.
    pub fn with_validation(mut self, mode: ValidationMode) -> Self {
        self.validation = Some(mode);
        self
    }

    pub fn validation_mode(&self) -> ValidationMode {
        self.validation.unwrap_or_else(validation_mode)
    }

    /// Number of broadcast axes.
    #[inline]
    pub fn rank(&self) -> usize {
        self.plan.rank()
    }

    /// Result type of a single invocation.
    #[inline]
    pub fn output_shape(&self) -> &TypeShape {
        self.operation.output()
    }

    #[inline]
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    #[inline]
    pub fn operands(&self) -> &[Value] {
        &self.operands
    }

    #[inline]
    pub fn plan(&self) -> &BroadcastPlan {
        &self.plan
    }

    fn check(&self, holds: bool, violation: impl FnOnce() -> LazyError) -> Result<(), LazyError> {
        self.validation_mode().check(holds, violation)
    }

    fn roots(&self) -> Vec<Cow<'_, Value>> {
        self.operands.iter().map(Cow::Borrowed).collect()
    }

    /// Extent of the outermost axis, or 0 for a rank-0 expression.
    pub fn size(&self) -> Result<usize, LazyError> {
        if self.rank() == 0 {
            return Ok(0);
        }
        self.plan.axis_size(0, &self.roots())
    }

    /// Invokes a rank-0 expression once.
    pub fn call(&self) -> Result<Value, LazyError> {
        self.check(self.rank() == 0, || LazyError::RankMismatch {
            expected: "0",
            found: self.rank(),
        })?;
        self.invoke(&self.roots())
    }

    /// Invokes the operation at every coordinate, outermost axis first.
    pub fn eval(&self) -> Result<(), LazyError> {
        self.eval_step(1)
    }

    /// Like [`Expression::eval`], advancing the innermost axis by `step`.
    ///
    /// `step` must evenly divide the innermost extent.
    pub fn eval_step(&self, step: usize) -> Result<(), LazyError> {
        self.check(self.rank() > 0, || LazyError::RankMismatch {
            expected: "> 0",
            found: 0,
        })?;
        self.check(step > 0, || LazyError::StepMismatch { step, size: 0 })?;
        if self.rank() == 0 {
            return self.call().map(|_| ());
        }
        self.sweep(0, &self.roots(), step.max(1))
    }

    fn sweep(&self, level: usize, operands: &[Cow<'_, Value>], step: usize) -> Result<(), LazyError> {
        let size = self.plan.axis_size(level, operands)?;
        let innermost = level + 1 == self.rank();
        let stride = if innermost {
            self.check(size % step == 0, || LazyError::StepMismatch { step, size })?;
            step
        } else {
            1
        };
        trace!(level, size, stride, "sweep");
        for offset in (0..size).step_by(stride) {
            let reduced = self.reduce(level, operands, offset)?;
            if innermost {
                self.invoke(&reduced)?;
            } else {
                self.sweep(level + 1, &reduced, step)?;
            }
        }
        Ok(())
    }

    /// Invokes the operation at one coordinate.
    pub fn eval_at(&self, offsets: &[usize]) -> Result<Value, LazyError> {
        self.check(self.rank() > 0, || LazyError::RankMismatch {
            expected: "> 0",
            found: 0,
        })?;
        self.check(offsets.len() == self.rank(), || LazyError::OffsetCount {
            expected: self.rank(),
            found: offsets.len(),
        })?;
        self.point(0, &self.roots(), offsets)
    }

    fn point(&self, level: usize, operands: &[Cow<'_, Value>], offsets: &[usize]) -> Result<Value, LazyError> {
        let Some(&offset) = offsets.get(level).filter(|_| level < self.rank()) else {
            return self.invoke(operands);
        };
        let size = self.plan.axis_size(level, operands)?;
        self.check(offset < size, || LazyError::OutOfBounds {
            axis: level,
            index: offset,
            size,
        })?;
        let reduced = self.reduce(level, operands, offset)?;
        self.point(level + 1, &reduced, offsets)
    }

    /// Slice at `offset` along the outermost axis.
    ///
    /// A rank-1 expression is invoked and yields the operation's result. A
    /// higher-rank expression yields `Value::Expr` holding a rank - 1
    /// expression that shares this one's operation.
    pub fn index(&self, offset: usize) -> Result<Value, LazyError> {
        self.check(self.rank() > 0, || LazyError::RankMismatch {
            expected: "> 0",
            found: 0,
        })?;
        let roots = self.roots();
        let size = self.plan.axis_size(0, &roots)?;
        self.check(offset < size, || LazyError::OutOfBounds {
            axis: 0,
            index: offset,
            size,
        })?;
        let reduced = self.reduce(0, &roots, offset)?;
        let sub = Expression {
            operation: Rc::clone(&self.operation),
            operands: reduced.into_iter().map(Cow::into_owned).collect(),
            plan: self.plan.descend(),
            validation: self.validation,
        };
        trace!(offset, rank = sub.rank(), "slice");
        if sub.rank() == 0 {
            sub.call()
        } else {
            Ok(Value::from(sub))
        }
    }

    /// Sub-expression at `offset`; requires rank > 1.
    pub fn slice(&self, offset: usize) -> Result<Expression, LazyError> {
        self.check(self.rank() > 1, || LazyError::RankMismatch {
            expected: "> 1",
            found: self.rank(),
        })?;
        self.index(offset)?.into_expression()
    }

    /// Evaluates every coordinate and collects the results into nested
    /// vectors of the output type.
    pub fn materialize(&self) -> Result<Value, LazyError> {
        if self.rank() == 0 {
            return self.call();
        }
        self.gather(0, &self.roots())
    }

    fn gather(&self, level: usize, operands: &[Cow<'_, Value>]) -> Result<Value, LazyError> {
        let size = self.plan.axis_size(level, operands)?;
        let innermost = level + 1 == self.rank();
        let mut items = Vec::with_capacity(size);
        for offset in 0..size {
            let reduced = self.reduce(level, operands, offset)?;
            items.push(if innermost {
                self.invoke(&reduced)?
            } else {
                self.gather(level + 1, &reduced)?
            });
        }
        let mut elem = self.output_shape().clone();
        for _ in level + 1..self.rank() {
            elem = TypeShape::dynamic(elem);
        }
        Ok(Value::dynamic(elem, items))
    }

    /// Advances every participating operand of `level` to `offset`.
    fn reduce<'a>(
        &self,
        level: usize,
        operands: &'a [Cow<'_, Value>],
        offset: usize,
    ) -> Result<Vec<Cow<'a, Value>>, LazyError> {
        let row = self.plan.participation(level);
        operands
            .iter()
            .zip(row)
            .map(|(op, &takes)| {
                if !takes {
                    return Ok(Cow::Borrowed(&**op));
                }
                let at = if access::axis_size(op)? == 1 { 0 } else { offset };
                element_at(op, at).map_err(|e| match e {
                    LazyError::OutOfBounds { index, size, .. } => LazyError::OutOfBounds {
                        axis: level,
                        index,
                        size,
                    },
                    other => other,
                })
            })
            .collect()
    }

    fn invoke(&self, operands: &[Cow<'_, Value>]) -> Result<Value, LazyError> {
        let args = operands
            .iter()
            .zip(self.operation.params())
            .map(|(op, param)| adapt::argument(Cow::Borrowed(&**op), param))
            .collect::<Result<Vec<Arg>, _>>()?;
        self.operation.invoke(args)
    }
}

impl Rank for Expression {
    fn type_shape(&self) -> TypeShape {
        TypeShape::Expression {
            rank: self.rank(),
            output: Box::new(self.output_shape().clone()),
        }
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("operation", &self.operation.name())
            .field("rank", &self.rank())
            .field("operands", &self.operands)
            .field("validation", &self.validation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::operation::Out;
    use crate::structs::place::Shared;
    use crate::traits::param::{IntoOperand, IntoValue};

    fn sum3() -> Operation {
        Operation::from_fn("sum", |a: i32, b: i32, c: i32| a + b + c)
    }

    #[test]
    fn test_rank_zero_call() {
        let e = make_expression(sum3(), vec![1i32.into_value(), 2i32.into_value(), 3i32.into_value()])
            .unwrap();
        assert_eq!(e.rank(), 0);
        assert_eq!(e.size().unwrap(), 0);
        assert_eq!(e.call().unwrap(), 6i32.into_value());
        assert!(matches!(e.eval(), Err(LazyError::RankMismatch { .. })));
    }

    #[test]
    fn test_arity_mismatch() {
        let err = make_expression(sum3(), vec![1i32.into_value()]).unwrap_err();
        assert_eq!(
            err,
            LazyError::IncompatibleExpression(Incompatibility::Arity { expected: 3, found: 1 })
        );
    }

    #[test]
    fn test_eval_at_and_index_agree() {
        let e = make_expression(
            sum3(),
            vec![
                [[1i32, 2], [3, 4]].into_value(),
                [10i32, 20].into_value(),
                100i32.into_value(),
            ],
        )
        .unwrap();
        assert_eq!(e.rank(), 2);
        assert_eq!(e.eval_at(&[1, 0]).unwrap(), 113i32.into_value());
        let row = e.slice(1).unwrap();
        assert_eq!(row.rank(), 1);
        assert_eq!(row.index(0).unwrap(), 113i32.into_value());
        assert_eq!(
            e.eval_at(&[2, 0]),
            Err(LazyError::OutOfBounds { axis: 0, index: 2, size: 2 })
        );
        assert_eq!(
            e.eval_at(&[0]),
            Err(LazyError::OffsetCount { expected: 2, found: 1 })
        );
    }

    #[test]
    fn test_materialize_nests_results() {
        let e = make_expression(
            sum3(),
            vec![[[1i32, 2], [3, 4]].into_value(), 0i32.into_value(), [0i32, 1].into_value()],
        )
        .unwrap();
        assert_eq!(e.materialize().unwrap(), vec![vec![1i32, 3], vec![3, 5]].into_value());
    }

    #[test]
    fn test_step_must_divide_innermost() {
        let z = Shared::new([[0i32; 3]; 4]);
        let op = Operation::from_fn("store", |x: i32, mut z: Out<i32>| z.set(x));
        let e = make_expression(op, vec![1i32.into_value(), (&z).into_operand()]).unwrap();
        assert_eq!(e.eval_step(2), Err(LazyError::StepMismatch { step: 2, size: 3 }));
        assert_eq!(z.read::<[[i32; 3]; 4]>().unwrap(), [[0; 3]; 4]);
        e.eval_step(3).unwrap();
        assert_eq!(z.read::<[[i32; 3]; 4]>().unwrap(), [[1, 0, 0]; 4]);
    }

    #[test]
    fn test_disabled_validation_skips_step_check() {
        let z = Shared::new([0i32; 3]);
        let op = Operation::from_fn("store", |x: i32, mut z: Out<i32>| z.set(x));
        let e = make_expression(op, vec![5i32.into_value(), z.by_ref()])
            .unwrap()
            .with_validation(ValidationMode::Disabled);
        e.eval_step(2).unwrap();
        assert_eq!(z.read::<[i32; 3]>().unwrap(), [5, 0, 5]);
    }

    #[test]
    fn test_type_shape_reports_declared_rank() {
        let e = make_expression(
            sum3(),
            vec![[1i32, 2].into_value(), 0i32.into_value(), 0i32.into_value()],
        )
        .unwrap();
        assert_eq!(Rank::rank(&e), 1);
        assert_eq!(e.shape_kind(), crate::enums::shape_kind::ShapeKind::Expression);
    }
}
