use std::rc::Rc;

use crate::enums::error::LazyError;
use crate::enums::value::Value;
use crate::structs::operation::Args;

/// Type-erased operation body.
pub type Kernel = Rc<dyn Fn(&mut Args) -> Result<Value, LazyError>>;

/// Builds a parameter value from a foreign element.
pub type Constructor = Rc<dyn Fn(&Value) -> Result<Value, LazyError>>;
