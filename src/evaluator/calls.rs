//! Function creation and invocation (`§4.6` "Functions & Closures",
//! "`this` and `arguments`"): parameter binding, `this` resolution by call
//! shape, and the `[[Construct]]` protocol `new` drives.

use std::rc::Rc;

use crate::ast::{CallArgs, Expr, ExprKind, FunctionDef, Param, TemplateLiteral};
use crate::environment::{self, BindingKind};
use crate::exception::RunResult;
use crate::function::{Callable, FunctionData, FunctionKind as FnKind, HostFn, ThisMode};
use crate::heap::{HeapData, HeapId};
use crate::object::{JsObject, PropertyDescriptor};
use crate::value::Value;

use super::Evaluator;

pub(crate) fn make_function_value(
    ev: &mut Evaluator,
    def: &FunctionDef,
    closure: HeapId,
    name_override: Option<String>,
) -> RunResult<Value> {
    let name: Rc<str> = Rc::from(name_override.unwrap_or_default());
    let kind = match def.kind {
        crate::ast::FunctionKind::Normal => FnKind::Normal,
        crate::ast::FunctionKind::Arrow => FnKind::Arrow,
        crate::ast::FunctionKind::Method => FnKind::Method,
        crate::ast::FunctionKind::Constructor => FnKind::Constructor,
        crate::ast::FunctionKind::Getter => FnKind::Getter,
        crate::ast::FunctionKind::Setter => FnKind::Setter,
    };
    let this_mode = if kind == FnKind::Arrow { ThisMode::Lexical } else { ThisMode::Dynamic };
    let func_proto = ev.realm().function_proto;
    let param_count = def.params.iter().take_while(|p| p.default.is_none() && !p.is_rest).count();
    let mut object = JsObject::with_class(Some(func_proto), "Function");
    object.set_own(crate::object::PropertyKey::from_str("length"), PropertyDescriptor::non_enumerable(Value::Number(param_count as f64)));
    object.set_own(crate::object::PropertyKey::from_str("name"), PropertyDescriptor::non_enumerable(Value::string(name.to_string())));
    if !def.is_generator && !matches!(kind, FnKind::Arrow | FnKind::Getter | FnKind::Setter | FnKind::Method) {
        let object_proto = ev.realm().object_proto;
        let proto_obj = ev.heap_mut().alloc(HeapData::Object(JsObject::new(Some(object_proto))));
        object.set_own(crate::object::PropertyKey::from_str("prototype"), PropertyDescriptor::non_enumerable(Value::Object(proto_obj)));
        let ctor_key = crate::object::PropertyKey::from_str("constructor");
        // set once the function itself is allocated, below
        let _ = (proto_obj, ctor_key);
    }
    let data = FunctionData {
        object,
        name,
        kind,
        this_mode,
        is_async: def.is_async,
        is_generator: def.is_generator,
        callable: Callable::User {
            params: Rc::from(def.params.clone()),
            body: Rc::new(def.body.clone()),
            closure,
        },
        home_object: None,
        parent_constructor: None,
        class_fields: None,
    };
    let id = ev.heap_mut().alloc(HeapData::Function(data));
    if let Some(proto_val) = ev.get_property(Value::Object(id), "prototype").ok().filter(|v| v.as_object().is_some()) {
        if let Value::Object(proto_id) = proto_val {
            let ctor_key = crate::object::PropertyKey::from_str("constructor");
            if let Some(proto_obj) = ev.heap_mut().get_mut(proto_id).as_object_mut() {
                proto_obj.set_own(ctor_key, PropertyDescriptor::non_enumerable(Value::Object(id)));
            }
        }
    }
    Ok(Value::Object(id))
}

pub(crate) fn make_host_function(ev: &mut Evaluator, name: &str, arity: usize, f: HostFn) -> Value {
    let proto = ev.realm().function_proto;
    let mut object = JsObject::with_class(Some(proto), "Function");
    object.set_own(crate::object::PropertyKey::from_str("length"), PropertyDescriptor::non_enumerable(Value::Number(arity as f64)));
    object.set_own(crate::object::PropertyKey::from_str("name"), PropertyDescriptor::non_enumerable(Value::string(name)));
    let data = FunctionData {
        object,
        name: Rc::from(name),
        kind: FnKind::Normal,
        this_mode: ThisMode::Dynamic,
        is_async: false,
        is_generator: false,
        callable: Callable::Host(f),
        home_object: None,
        parent_constructor: None,
        class_fields: None,
    };
    Value::Object(ev.heap_mut().alloc(HeapData::Function(data)))
}

pub(crate) fn set_home_object(ev: &mut Evaluator, func: &Value, home: HeapId) {
    if let Value::Object(id) = func {
        if let HeapData::Function(data) = ev.heap_mut().get_mut(*id) {
            data.home_object = Some(home);
        }
    }
}

/// Builds the parameter-binding environment for a call: `this`/`arguments`
/// (unless arrow), then destructures `params` against `args` left to right,
/// evaluating defaults against the partially-bound env so later parameters
/// can reference earlier ones.
pub(crate) fn bind_params_env(
    ev: &mut Evaluator,
    params: &[Param],
    args: &[Value],
    closure: HeapId,
    this: Value,
    is_arrow: bool,
) -> RunResult<HeapId> {
    let env = environment::create(ev.heap_mut(), Some(closure), true);
    if !is_arrow {
        environment::set_this(ev.heap_mut(), env, this);
        let arguments = ev.new_array(args.iter().cloned().map(Some).collect());
        environment::declare(ev.heap_mut(), env, Rc::from("arguments"), BindingKind::Var, true, arguments);
    }
    for (i, param) in params.iter().enumerate() {
        if param.is_rest {
            let rest: Vec<Option<Value>> = args.get(i..).unwrap_or(&[]).iter().cloned().map(Some).collect();
            let rest_value = Value::Object(ev.new_array(rest));
            super::destructure::bind_declaration(ev, &param.pattern, rest_value, env, crate::ast::VarKind::Let)?;
            break;
        }
        let mut value = args.get(i).cloned().unwrap_or(Value::Undefined);
        if value.is_undefined() {
            if let Some(default) = &param.default {
                value = super::statements::eval_expr(ev, default, env)?;
            }
        }
        super::destructure::bind_param(ev, &param.pattern, value, env)?;
    }
    Ok(env)
}

pub(crate) fn eval_args(ev: &mut Evaluator, args: &CallArgs, env: HeapId) -> RunResult<Vec<Value>> {
    let mut out = Vec::with_capacity(args.args.len());
    for el in &args.args {
        match el {
            crate::ast::ArrayElement::Item(expr) => out.push(super::statements::eval_expr(ev, expr, env)?),
            crate::ast::ArrayElement::Spread(expr) => {
                let value = super::statements::eval_expr(ev, expr, env)?;
                out.extend(super::iteration::iterate_to_vec(ev, value)?);
            }
            crate::ast::ArrayElement::Hole => out.push(Value::Undefined),
        }
    }
    Ok(out)
}

pub(crate) fn eval_call(ev: &mut Evaluator, callee: &Expr, args: &CallArgs, optional: bool, env: HeapId) -> RunResult<Value> {
    let (func, this) = match &callee.kind {
        ExprKind::Member { object, property, optional: member_optional } => {
            super::access::eval_member(ev, object, property, *member_optional, env)?
        }
        ExprKind::Super => {
            let (_, this) = super_property_base(ev, env)?;
            let parent = super_constructor(ev, env)?;
            let arg_values = eval_args(ev, args, env)?;
            if let Some(parent) = parent {
                ev.call_function(parent, this.clone(), &arg_values)?;
            }
            return Ok(Value::Undefined);
        }
        ExprKind::Identifier(name) if name == "eval" && matches!(environment::get(ev.heap(), env, name), crate::environment::GetOutcome::NotFound) => {
            let arg_values = eval_args(ev, args, env)?;
            let Some(Value::String(src)) = arg_values.first().cloned() else {
                return Ok(arg_values.into_iter().next().unwrap_or(Value::Undefined));
            };
            return direct_eval(ev, &src, env);
        }
        ExprKind::Identifier(name) if name == "__debug" && matches!(environment::get(ev.heap(), env, name), crate::environment::GetOutcome::NotFound) => {
            return direct_debug(ev, env);
        }
        _ => (super::statements::eval_expr(ev, callee, env)?, Value::Undefined),
    };
    if optional && func.is_nullish() {
        return Ok(Value::Undefined);
    }
    let arg_values = eval_args(ev, args, env)?;
    ev.call_function(func, this, &arg_values)
}

pub(crate) fn direct_eval(ev: &mut Evaluator, source: &str, env: HeapId) -> RunResult<Value> {
    let handle = crate::source::SourceHandle::new("<eval>", source.to_string());
    let output = crate::parser::parse(handle).map_err(|e| {
        let value = super::access::make_error_value(ev, crate::exception::ExcType::SyntaxError, e.message());
        ev.make_exception(value)
    })?;
    let mut program = crate::build::build(&output.arena, output.program);
    crate::fold::fold_program(&mut program);
    super::statements::hoist(ev, &program.body, env, false)?;
    let mut last = Value::Undefined;
    for stmt in &program.body {
        match ev.exec_stmt(stmt, env)? {
            super::Completion::Normal(v) => last = v,
            super::Completion::Return(v) => return Ok(v),
            _ => break,
        }
    }
    Ok(last)
}

/// The guest-visible `__debug()` global (`§6`/`§7`): snapshots every
/// binding visible from the call site plus the current call stack and
/// mirrors it onto the diagnostics channel as a [`crate::diagnostics::DebugMessage`].
/// There's no paused control-flow signal to describe at an ordinary call
/// site, so `control_flow_state` is always `"normal"`.
fn direct_debug(ev: &mut Evaluator, env: HeapId) -> RunResult<Value> {
    let variables = environment::visible_bindings(ev.heap(), env)
        .into_iter()
        .map(|(name, value)| {
            let display = crate::ops::to_js_string(ev, &value).map(|s| s.to_string()).unwrap_or_else(|_| "<unprintable>".to_string());
            (name, display)
        })
        .collect();
    let call_stack = ev.call_stack_snapshot();
    ev.push_debug_message(crate::diagnostics::DebugMessage { variables, call_stack, control_flow_state: "normal".to_string() });
    Ok(Value::Undefined)
}

pub(crate) fn eval_tagged_template(ev: &mut Evaluator, tag: &Expr, quasi: &TemplateLiteral, env: HeapId) -> RunResult<Value> {
    let (func, this) = match &tag.kind {
        ExprKind::Member { object, property, optional } => super::access::eval_member(ev, object, property, *optional, env)?,
        _ => (super::statements::eval_expr(ev, tag, env)?, Value::Undefined),
    };
    let cooked: Vec<Option<Value>> = quasi.quasis.iter().map(|s| Some(Value::string(s.as_str()))).collect();
    let raw: Vec<Option<Value>> = quasi.raw_quasis.iter().map(|s| Some(Value::string(s.as_str()))).collect();
    let strings_id = ev.new_array(cooked);
    let raw_id = ev.new_array(raw);
    ev.set_property(Value::Object(strings_id), "raw", Value::Object(raw_id))?;
    let mut call_args = vec![Value::Object(strings_id)];
    for expr in &quasi.expressions {
        call_args.push(super::statements::eval_expr(ev, expr, env)?);
    }
    ev.call_function(func, this, &call_args)
}

/// `super.prop`'s base object is the active method's `home_object`'s
/// prototype; `this` is the ordinary lexical `this`. Both are looked up via
/// hidden bindings `bind_params_env`/`call_function` install alongside the
/// ordinary parameter bindings.
pub(crate) fn super_property_base(ev: &mut Evaluator, env: HeapId) -> RunResult<(Option<HeapId>, Value)> {
    let this = environment::resolve_this(ev.heap(), env).unwrap_or(Value::Undefined);
    let home = match environment::resolve(ev.heap(), env, "%home%") {
        Some((_, slot)) => slot.value.as_object(),
        None => None,
    };
    let proto = home.and_then(|id| ev.heap().get(id).as_object().and_then(|o| o.prototype));
    Ok((proto, this))
}

fn super_constructor(ev: &mut Evaluator, env: HeapId) -> RunResult<Option<Value>> {
    match environment::resolve(ev.heap(), env, "%constructor%") {
        Some((_, slot)) => {
            let Value::Object(ctor_id) = slot.value else { return Ok(None) };
            let parent = match ev.heap().get(ctor_id) {
                HeapData::Function(data) => data.parent_constructor,
                _ => None,
            };
            Ok(parent.map(Value::Object))
        }
        None => Ok(None),
    }
}

pub(crate) fn call_function(ev: &mut Evaluator, callee: Value, this: Value, args: &[Value]) -> RunResult<Value> {
    let Value::Object(id) = callee else {
        return ev.throw_type_error("value is not a function");
    };
    let data = match ev.heap().get(id) {
        HeapData::Function(f) => f,
        _ => return ev.throw_type_error("value is not a function"),
    };
    let display_name = data.display_name().to_string();
    match &data.callable {
        Callable::Host(f) => {
            let f = f.clone();
            ev.push_frame(display_name);
            let result = f(ev, this, args);
            ev.pop_frame();
            result
        }
        Callable::Bound { target, bound_this, bound_args } => {
            let target = *target;
            let mut full_args = bound_args.clone();
            full_args.extend_from_slice(args);
            let this = bound_this.clone();
            call_function(ev, Value::Object(target), this, &full_args)
        }
        Callable::User { params, body, closure } => {
            let params = params.clone();
            let body = body.clone();
            let closure = *closure;
            let this_mode = data.this_mode;
            let home_object = data.home_object;
            let is_generator = data.is_generator;
            let is_async = data.is_async;
            let is_constructor = data.kind == FnKind::Constructor;
            let effective_this = if this_mode == ThisMode::Dynamic && this.is_nullish() && !ev.is_strict() {
                Value::Object(ev.global_object())
            } else {
                this
            };
            if is_generator {
                return super::iteration::make_generator_value(ev, body, params, args.to_vec(), closure);
            }
            ev.push_frame(display_name);
            if let Err(e) = ev.resource().enter_call() {
                ev.pop_frame();
                let value = super::access::make_error_value(ev, crate::exception::ExcType::RangeError, e.to_string());
                return Err(ev.make_exception(value));
            }
            let call_env = bind_params_env(ev, &params, args, closure, effective_this.clone(), this_mode == ThisMode::Lexical);
            let call_env = match call_env {
                Ok(env) => env,
                Err(e) => {
                    ev.resource().exit_call();
                    ev.pop_frame();
                    return Err(e);
                }
            };
            if let Some(home) = home_object {
                environment::declare(ev.heap_mut(), call_env, Rc::from("%home%"), BindingKind::Const, true, Value::Object(home));
            }
            if is_constructor {
                environment::declare(ev.heap_mut(), call_env, Rc::from("%constructor%"), BindingKind::Const, true, Value::Object(id));
                if let Value::Object(instance) = effective_this {
                    if let Err(e) = super::classes::run_field_initializers(ev, id, instance, call_env) {
                        ev.resource().exit_call();
                        ev.pop_frame();
                        return Err(e);
                    }
                }
            }
            let result = match &*body {
                crate::ast::FunctionBody::Block(stmts) => ev.exec_block(stmts, call_env),
                crate::ast::FunctionBody::Expression(expr) => ev.eval_expr(expr, call_env).map(super::Completion::Return),
            };
            ev.resource().exit_call();
            ev.pop_frame();
            // `cps::transform_program` rewrites every ordinary async function body
            // into its own `new Promise(...)` wrapper before this code ever runs, so
            // `is_async` should be false here in practice. This is the fallback for
            // whatever shape that whole-program walk didn't reach.
            if is_async {
                let promise_id = super::promise::new_promise(ev);
                match result {
                    Ok(super::Completion::Return(v)) => super::promise::resolve_promise(ev, promise_id, v),
                    Ok(_) => super::promise::resolve_promise(ev, promise_id, Value::Undefined),
                    Err(e) => super::promise::reject_promise(ev, promise_id, e.value),
                }
                return Ok(Value::Object(promise_id));
            }
            let value = match result? {
                super::Completion::Return(v) => v,
                _ => Value::Undefined,
            };
            Ok(value)
        }
    }
}

pub(crate) fn construct(ev: &mut Evaluator, callee: Value, args: &[Value], new_target: Option<Value>) -> RunResult<Value> {
    let Value::Object(id) = callee.clone() else {
        return ev.throw_type_error("not a constructor");
    };
    if !ev.heap().is_callable(id) {
        return ev.throw_type_error("not a constructor");
    }
    if let HeapData::Function(FunctionData { callable: Callable::Bound { target, bound_args, .. }, .. }) = ev.heap().get(id) {
        let target = *target;
        let mut full_args = bound_args.clone();
        full_args.extend_from_slice(args);
        return construct(ev, Value::Object(target), &full_args, new_target);
    }
    let target_for_proto = new_target.clone().unwrap_or(callee.clone());
    let proto = match ev.get_property(target_for_proto, "prototype")? {
        Value::Object(p) => Some(p),
        _ => Some(ev.realm().object_proto),
    };
    let instance = ev.new_object_with_proto(proto);
    let result = call_function(ev, callee, Value::Object(instance), args)?;
    match result {
        Value::Object(_) => Ok(result),
        _ => Ok(Value::Object(instance)),
    }
}
