//! The JS `Function` value: user-defined closures, host-native callables,
//! and bound functions all share one [`FunctionData`] shape (`§3`
//! "Runtime Values" — Function).

use std::rc::Rc;

use crate::ast::{FunctionBody, Param};
use crate::evaluator::Evaluator;
use crate::exception::Exception;
use crate::heap::HeapId;
use crate::object::JsObject;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FunctionKind {
    Normal,
    Arrow,
    Method,
    Constructor,
    Getter,
    Setter,
}

/// `this` binding mode, fixed at function-creation time (`§4.6` "`this` and
/// `arguments`"). Arrow functions never rebind `this`; everything else
/// resolves it per the call (plain vs. method vs. constructor) in the
/// evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ThisMode {
    Lexical,
    Dynamic,
}

/// A host-native function body (`§6` `set_global_function`): takes the
/// evaluator (for callbacks back into guest code), `this`, and the call
/// arguments, returning a guest-visible value or a guest `throw`.
pub type HostFn = Rc<dyn Fn(&mut Evaluator, Value, &[Value]) -> Result<Value, Exception>>;

/// The three ways a heap-allocated function value can actually run.
pub(crate) enum Callable {
    /// A user-defined function/arrow/method: its body is interpreted
    /// against an environment chained from `closure`.
    User { params: Rc<[Param]>, body: Rc<FunctionBody>, closure: HeapId },
    /// A standard-library method implemented in Rust.
    Host(HostFn),
    /// Created by `Function.prototype.bind`: forwards to `target` with a
    /// fixed `this` and a prefix of arguments.
    Bound { target: HeapId, bound_this: Value, bound_args: Vec<Value> },
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User { .. } => write!(f, "Callable::User"),
            Self::Host(_) => write!(f, "Callable::Host"),
            Self::Bound { .. } => write!(f, "Callable::Bound"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct FunctionData {
    pub object: JsObject,
    pub name: Rc<str>,
    pub kind: FunctionKind,
    pub this_mode: ThisMode,
    pub is_async: bool,
    pub is_generator: bool,
    pub callable: Callable,
    /// The object whose prototype `super.m()` resolves against, set for
    /// class/object methods (`§4.6` "Classes").
    pub home_object: Option<HeapId>,
    /// Present only for classes, so `extends`'s constructor-chaining logic
    /// can find the parent constructor without re-walking the prototype.
    pub parent_constructor: Option<HeapId>,
    /// Present only for class constructors: the instance field initializers
    /// (`§4.6` "Classes") run against each new instance before the
    /// constructor body's own statements.
    pub class_fields: Option<Rc<[crate::evaluator::classes::ClassFieldInit]>>,
}

impl FunctionData {
    pub fn declared_param_count(&self) -> usize {
        match &self.callable {
            Callable::User { params, .. } => {
                params.iter().take_while(|p| p.default.is_none() && !p.is_rest).count()
            }
            Callable::Host(_) | Callable::Bound { .. } => 0,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { "<anonymous>" } else { &self.name }
    }
}
