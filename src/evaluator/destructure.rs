//! Pattern binding: the single recursive walk that backs `let`/`const`/`var`
//! declarations, parameter binding, destructuring assignment, and
//! `for`-loop bindings (`§4.6` "Destructuring").

use std::rc::Rc;

use crate::ast::{Expr, ExprKind, Pattern, PropertyKey as AstPropertyKey, VarKind};
use crate::exception::RunResult;
use crate::heap::{BindingKind, HeapId};
use crate::value::Value;

use super::Evaluator;

#[derive(Clone, Copy)]
enum Mode {
    Declare(BindingKind),
    Assign,
}

fn bind_name(ev: &mut Evaluator, name: &str, value: Value, env: HeapId, mode: Mode) -> RunResult<()> {
    match mode {
        Mode::Declare(kind) => {
            crate::environment::declare(ev.heap_mut(), env, Rc::from(name), kind, true, value);
            Ok(())
        }
        Mode::Assign => super::access::assign_identifier(ev, name, value, env),
    }
}

pub(crate) fn bind_declaration(ev: &mut Evaluator, pattern: &Pattern, value: Value, env: HeapId, kind: VarKind) -> RunResult<()> {
    let binding_kind = match kind {
        VarKind::Var => BindingKind::Var,
        VarKind::Let => BindingKind::Let,
        VarKind::Const => BindingKind::Const,
    };
    destructure(ev, pattern, value, env, Mode::Declare(binding_kind))
}

pub(crate) fn bind_param(ev: &mut Evaluator, pattern: &Pattern, value: Value, env: HeapId) -> RunResult<()> {
    destructure(ev, pattern, value, env, Mode::Declare(BindingKind::Param))
}

pub(crate) fn assign_pattern(ev: &mut Evaluator, pattern: &Pattern, value: Value, env: HeapId) -> RunResult<()> {
    destructure(ev, pattern, value, env, Mode::Assign)
}

fn destructure(ev: &mut Evaluator, pattern: &Pattern, value: Value, env: HeapId, mode: Mode) -> RunResult<()> {
    match pattern {
        Pattern::Identifier(name) => bind_name(ev, name, value, env, mode),
        Pattern::Assignment { pattern, default } => {
            let value = if value.is_undefined() { super::statements::eval_expr(ev, default, env)? } else { value };
            destructure(ev, pattern, value, env, mode)
        }
        Pattern::MemberTarget(expr) => {
            if let ExprKind::Member { object, property, .. } = &expr.kind {
                let base = super::statements::eval_expr(ev, object, env)?;
                let key = super::access::eval_property_key(ev, property, env)?;
                super::access::set_property(ev, base, &key, value)
            } else {
                ev.throw_syntax_error("Invalid destructuring assignment target")
            }
        }
        Pattern::Array { elements, rest } => destructure_array(ev, elements, rest.as_deref(), value, env, mode),
        Pattern::Object { properties, rest } => destructure_object(ev, properties, rest.as_deref(), value, env, mode),
    }
}

fn destructure_array(
    ev: &mut Evaluator,
    elements: &[Option<Pattern>],
    rest: Option<&Pattern>,
    value: Value,
    env: HeapId,
    mode: Mode,
) -> RunResult<()> {
    let items = super::iteration::iterate_to_vec(ev, value)?;
    for (i, element) in elements.iter().enumerate() {
        if let Some(pattern) = element {
            let item = items.get(i).cloned().unwrap_or(Value::Undefined);
            destructure(ev, pattern, item, env, mode)?;
        }
    }
    if let Some(rest_pattern) = rest {
        let rest_items: Vec<Option<Value>> = items.get(elements.len()..).unwrap_or(&[]).iter().cloned().map(Some).collect();
        let rest_value = Value::Object(ev.new_array(rest_items));
        destructure(ev, rest_pattern, rest_value, env, mode)?;
    }
    Ok(())
}

fn destructure_object(
    ev: &mut Evaluator,
    properties: &[(AstPropertyKey, Pattern)],
    rest: Option<&Pattern>,
    value: Value,
    env: HeapId,
    mode: Mode,
) -> RunResult<()> {
    if value.is_nullish() {
        return ev.throw_type_error("Cannot destructure null or undefined value");
    }
    let mut used_keys = Vec::new();
    for (key, pattern) in properties {
        let key_str = super::access::eval_property_key(ev, key, env)?;
        used_keys.push(key_str.clone());
        let prop_value = super::access::get_property(ev, value.clone(), &key_str)?;
        destructure(ev, pattern, prop_value, env, mode)?;
    }
    if let Some(rest_pattern) = rest {
        let obj_id = ev.new_plain_object();
        super::access::copy_own_enumerable(ev, value, obj_id)?;
        for key in &used_keys {
            let pkey = crate::object::PropertyKey::from_str(key);
            if let Some(obj) = ev.heap_mut().get_mut(obj_id).as_object_mut() {
                obj.delete_own(&pkey);
            }
        }
        destructure(ev, rest_pattern, Value::Object(obj_id), env, mode)?;
    }
    Ok(())
}

/// `({a} = b)`'s LHS parses as an ordinary object/array `Expr`
/// (`build.rs`'s "plain assignment target reinterpreted as pattern" note);
/// this reinterprets that expression shape as the `Pattern` destructuring
/// needs, without re-parsing.
pub(crate) fn expr_to_pattern(expr: &Expr) -> RunResult<Pattern> {
    match &expr.kind {
        ExprKind::Identifier(name) => Ok(Pattern::Identifier(name.clone())),
        ExprKind::Member { .. } => Ok(Pattern::MemberTarget(Box::new(expr.clone()))),
        ExprKind::Assignment { op: crate::ast::AssignOp::Assign, target, value } => {
            Ok(Pattern::Assignment { pattern: Box::new(expr_to_pattern(target)?), default: value.clone() })
        }
        ExprKind::Array(elements) => {
            let mut out = Vec::with_capacity(elements.len());
            let mut rest = None;
            for el in elements {
                match el {
                    crate::ast::ArrayElement::Item(e) => out.push(Some(expr_to_pattern(e)?)),
                    crate::ast::ArrayElement::Hole => out.push(None),
                    crate::ast::ArrayElement::Spread(e) => rest = Some(Box::new(expr_to_pattern(e)?)),
                }
            }
            Ok(Pattern::Array { elements: out, rest })
        }
        ExprKind::Object { properties } => {
            let mut out = Vec::with_capacity(properties.len());
            let mut rest = None;
            for prop in properties {
                match prop {
                    crate::ast::ObjectProperty::KeyValue { key, value, .. } => {
                        out.push((key.clone(), expr_to_pattern(value)?));
                    }
                    crate::ast::ObjectProperty::Spread(e) => rest = Some(Box::new(expr_to_pattern(e)?)),
                    _ => return Err(pattern_error()),
                }
            }
            Ok(Pattern::Object { properties: out, rest })
        }
        _ => Err(pattern_error()),
    }
}

fn pattern_error() -> crate::exception::Exception {
    crate::exception::Exception::new(Value::string("Invalid destructuring assignment target"))
}
