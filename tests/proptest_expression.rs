//! Property tests for broadcasting and evaluation
//!
//! Checks that every evaluation route agrees with an eager reference
//! computation over randomly shaped operands.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use lazyexpr::{
    Incompatibility, IntoValue, LazyError, Operation, Out, Shared, ValidationMode, lazy,
};
use proptest::collection::vec;
use proptest::prelude::*;

fn add() -> Operation {
    Operation::from_fn("add", |x: i32, y: i32| x + y)
}

fn store() -> Operation {
    Operation::from_fn("store", |x: i32, y: i32, mut z: Out<i32>| z.set(x + y))
}

/// A `rows x cols` matrix with a row vector of `cols` entries.
fn matrix_and_row() -> impl Strategy<Value = (Vec<Vec<i32>>, Vec<i32>)> {
    (1usize..6, 1usize..6).prop_flat_map(|(rows, cols)| {
        (
            vec(vec(-1000i32..1000, cols), rows),
            vec(-1000i32..1000, cols),
        )
    })
}

/// A `rows x cols` matrix with a `rows x 1` column.
fn matrix_and_column() -> impl Strategy<Value = (Vec<Vec<i32>>, Vec<Vec<i32>>)> {
    (1usize..6, 1usize..6).prop_flat_map(|(rows, cols)| {
        (
            vec(vec(-1000i32..1000, cols), rows),
            vec(vec(-1000i32..1000, 1), rows),
        )
    })
}

fn zeros(rows: usize, cols: usize) -> Vec<Vec<i32>> {
    vec![vec![0; cols]; rows]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Rank-0 expressions invoke the operation once
    #[test]
    fn scalar_call_matches_direct_call(a in -10_000i32..10_000, b in -10_000i32..10_000) {
        let e = lazy!(add(), a, b).unwrap();
        prop_assert_eq!(e.rank(), 0);
        prop_assert_eq!(e.call().unwrap(), (a + b).into_value());
    }

    /// Row vectors align with the trailing axis
    #[test]
    fn row_broadcast_matches_eager((m, v) in matrix_and_row()) {
        let (rows, cols) = (m.len(), v.len());
        let e = lazy!(add(), m.clone(), v.clone()).unwrap();
        prop_assert_eq!(e.rank(), 2);
        prop_assert_eq!(e.size().unwrap(), rows);

        let expected: Vec<Vec<i32>> = m
            .iter()
            .map(|row| row.iter().zip(&v).map(|(a, b)| a + b).collect())
            .collect();
        prop_assert_eq!(e.materialize().unwrap(), expected.clone().into_value());

        for i in 0..rows {
            for j in 0..cols {
                let want = expected[i][j].into_value();
                prop_assert_eq!(e.eval_at(&[i, j]).unwrap(), want.clone());
                prop_assert_eq!(e.slice(i).unwrap().index(j).unwrap(), want);
            }
        }
    }

    /// Size-1 axes are read at offset 0
    #[test]
    fn column_broadcast_matches_eager((m, c) in matrix_and_column()) {
        let (rows, cols) = (m.len(), m[0].len());
        let z = Shared::new(zeros(rows, cols));
        let e = lazy!(store(), m.clone(), c.clone(), &z).unwrap();
        e.eval().unwrap();

        let expected: Vec<Vec<i32>> = m
            .iter()
            .zip(&c)
            .map(|(row, col)| row.iter().map(|a| a + col[0]).collect())
            .collect();
        prop_assert_eq!(z.read::<Vec<Vec<i32>>>().unwrap(), expected);
    }

    /// A sweep visits every coordinate once, in row-major order
    #[test]
    fn sweep_visits_each_coordinate_once(rows in 1usize..6, cols in 1usize..6) {
        let m: Vec<Vec<i32>> = (0..rows)
            .map(|i| (0..cols).map(|j| (i * cols + j) as i32).collect())
            .collect();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let record = Operation::from_fn("record", move |x: i32| sink.borrow_mut().push(x));
        lazy!(record, m).unwrap().eval().unwrap();
        let visited: Vec<i32> = (0..(rows * cols) as i32).collect();
        prop_assert_eq!(log.borrow().clone(), visited);
    }

    /// Stepping requires the innermost extent to be a multiple of the step
    #[test]
    fn eval_step_requires_divisible_extent(
        rows in 1usize..5,
        cols in 1usize..9,
        step in 1usize..5,
    ) {
        let z = Shared::new(zeros(rows, cols));
        let e = lazy!(store(), zeros(rows, cols), 1i32, &z)
            .unwrap()
            .with_validation(ValidationMode::Recoverable);
        let result = e.eval_step(step);
        if cols % step == 0 {
            prop_assert!(result.is_ok());
            let expected: Vec<Vec<i32>> = (0..rows)
                .map(|_| (0..cols).map(|j| i32::from(j % step == 0)).collect())
                .collect();
            prop_assert_eq!(z.read::<Vec<Vec<i32>>>().unwrap(), expected);
        } else {
            prop_assert_eq!(result, Err(LazyError::StepMismatch { step, size: cols }));
        }
    }

    /// Operands must be rectangular over their broadcast axes
    #[test]
    fn ragged_operands_are_rejected(lengths in vec(1usize..4, 2..5)) {
        let rows: Vec<Vec<i32>> = lengths.iter().map(|&n| vec![1; n]).collect();
        let result = lazy!(Operation::from_fn("id", |x: i32| x), rows);
        if lengths.iter().all(|&n| n == lengths[0]) {
            prop_assert!(result.is_ok());
        } else {
            let ragged = matches!(
                result,
                Err(LazyError::IncompatibleExpression(Incompatibility::Ragged { operand: 0, axis: 1, .. }))
            );
            prop_assert!(ragged);
        }
    }

    /// Nested expressions are recomputed at every coordinate of the outer sweep
    #[test]
    fn nested_expression_recomputes_per_coordinate((m, v) in matrix_and_row()) {
        let (rows, cols) = (m.len(), v.len());
        let calls = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&calls);
        let counted = Operation::from_fn("add", move |x: i32, y: i32| {
            counter.set(counter.get() + 1);
            x + y
        });
        let inner = lazy!(counted, m.clone(), v.clone()).unwrap();
        let outer = lazy!(add(), inner, 1i32).unwrap();
        prop_assert_eq!(calls.get(), 0);

        let expected: Vec<Vec<i32>> = m
            .iter()
            .map(|row| row.iter().zip(&v).map(|(a, b)| a + b + 1).collect())
            .collect();
        prop_assert_eq!(outer.materialize().unwrap(), expected.into_value());
        prop_assert_eq!(calls.get(), rows * cols);
    }
}
