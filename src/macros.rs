//! # Macros Module
//!
//! Construction shorthands.

/// Builds an operand list from Rust values, expressions, raw `Value`s and
/// `&Shared` handles (passed by reference).
///
/// ```
/// use lazyexpr::{Shared, Value, operands};
///
/// let z = Shared::new(0i32);
/// let ops = operands![[1i32, 2], 3.5f64, &z];
/// assert_eq!(ops.len(), 3);
/// assert!(matches!(ops[2], Value::Ref(_)));
/// ```
#[macro_export]
macro_rules! operands {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($operand:expr),+ $(,)?) => {
        ::std::vec![$($crate::traits::param::IntoOperand::into_operand($operand)),+]
    };
}

/// Builds an expression from an operation and operands, as [`operands!`].
///
/// ```
/// use lazyexpr::{Operation, lazy};
///
/// let e = lazy!(Operation::from_fn("neg", |x: i32| -x), [1i32, 2, 3]).unwrap();
/// assert_eq!(e.rank(), 1);
/// ```
#[macro_export]
macro_rules! lazy {
    ($operation:expr $(, $operand:expr)* $(,)?) => {
        $crate::make_expression($operation, $crate::operands![$($operand),*])
    };
}
