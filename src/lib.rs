//! # Lazyexpr
//!
//! Lazy expression templates with rank-based broadcasting.
//!
//! An [`Expression`] binds an [`Operation`] to operands of any rank without
//! running it. Each operand's rank is compared with the rank of the matching
//! parameter; the surplus axes are broadcast, and the operation is invoked
//! once per coordinate of the resulting index space, either in a sweep
//! ([`Expression::eval`]), at a single point ([`Expression::eval_at`]) or
//! through lazy slicing ([`Expression::index`]).
//!
//! ```
//! use lazyexpr::{Operation, Shared, Out, lazy};
//!
//! let z = Shared::new([[0.0f64; 2]; 2]);
//! let scale = Operation::from_fn("scale", |x: f64, k: f64, mut z: Out<f64>| z.set(x * k));
//! lazy!(scale, [1.0f64, 2.0], [[1.0f64], [10.0]], &z).unwrap().eval().unwrap();
//! assert_eq!(z.read::<[[f64; 2]; 2]>().unwrap(), [[1.0, 2.0], [10.0, 20.0]]);
//! ```

pub mod enums {
    pub mod error;
    pub mod scalar;
    pub mod shape_kind;
    pub mod validation;
    pub mod value;
}

pub mod structs {
    pub mod expression;
    pub mod operation;
    pub mod place;
}

pub mod kernels {
    pub mod access;
    pub mod adapt;
    pub mod broadcast;
}

pub mod traits {
    pub mod custom_value;
    pub mod param;
    pub mod shape;
}

pub mod aliases;
pub mod macros;

pub use aliases::{Constructor, Kernel};
pub use enums::error::{ErrorClass, Incompatibility, LazyError};
pub use enums::scalar::{Scalar, ScalarType};
pub use enums::shape_kind::{ShapeKind, TypeShape};
pub use enums::validation::{ValidationMode, set_validation_mode, validation_mode};
pub use enums::value::{OpaqueHandle, Value};
pub use kernels::broadcast::BroadcastPlan;
pub use structs::expression::{Expression, make_expression};
pub use structs::operation::{Arg, Args, IntoOperation, Obj, Operation, Out, Param, Pass};
pub use structs::place::{Place, Shared};
pub use traits::custom_value::CustomValue;
pub use traits::param::{FromValue, IntoOperand, IntoValue, ParamType, Returns, Shaped};
pub use traits::shape::{Rank, rank_of, shape_rank};
