//! Statement and expression dispatch (`§4.6` "Dispatch"): the evaluator's
//! main recursive-descent walk over the typed AST. Hoisting runs once per
//! function/program entry before the body executes, matching `§4.6`
//! "Scoping"'s "`var` declarations hoist to the enclosing function frame".

use std::rc::Rc;

use crate::ast::*;
use crate::environment::{self, GetOutcome};
use crate::exception::RunResult;
use crate::heap::{BindingKind, HeapData, HeapId};
use crate::ops;
use crate::value::Value;

use super::{Completion, Evaluator};

/// Walks `stmts` collecting every `var`/function declaration that hoists to
/// this frame, per `§4.6`: `var`s are pre-declared as `undefined` (no-op if
/// already present), function declarations are both hoisted *and*
/// initialized immediately so calling a function before its textual
/// declaration works (`§8` seed test 3's `if (false) ; else function
/// f(){...}` shows the non-block-scoped, "function is visible throughout
/// the enclosing function" legacy behavior this targets). Nested function
/// and block bodies are not descended into for `var`-hoisting purposes
/// beyond what `collect_var_names` already recurses through; block-scoped
/// `let`/`const`/`class` at this level are declared uninitialized (TDZ).
pub(crate) fn hoist(ev: &mut Evaluator, stmts: &[Stmt], env: HeapId, is_function_or_program: bool) -> RunResult<()> {
    for stmt in stmts {
        collect_var_names(stmt, &mut |name| environment::hoist_var(ev.heap_mut(), env, Rc::from(name)));
    }
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::VariableDeclaration(decl) if decl.kind != VarKind::Var => {
                for binding in &decl.bindings {
                    declare_pattern_uninitialized(ev, &binding.pattern, env, decl.kind);
                }
            }
            StmtKind::FunctionDeclaration { name, def } => {
                let value = make_function_value(ev, def, env, Some(name.clone()))?;
                environment::declare(ev.heap_mut(), env, Rc::from(name.as_str()), BindingKind::FunctionDecl, true, value.clone());
                if is_function_or_program {
                    let global_object = ev.global_object();
                    ev.set_property(Value::Object(global_object), name, value)?;
                }
            }
            StmtKind::ClassDeclaration { name, .. } => {
                environment::declare(ev.heap_mut(), env, Rc::from(name.as_str()), BindingKind::Let, false, Value::Undefined);
            }
            _ => {}
        }
    }
    Ok(())
}

fn declare_pattern_uninitialized(ev: &mut Evaluator, pattern: &Pattern, env: HeapId, kind: VarKind) {
    let binding_kind = match kind {
        VarKind::Let => BindingKind::Let,
        VarKind::Const => BindingKind::Const,
        VarKind::Var => BindingKind::Var,
    };
    for name in pattern_names(pattern) {
        environment::declare(ev.heap_mut(), env, Rc::from(name.as_str()), binding_kind, false, Value::Undefined);
    }
}

fn pattern_names(pattern: &Pattern) -> Vec<String> {
    let mut out = Vec::new();
    collect_pattern_names(pattern, &mut out);
    out
}

fn collect_pattern_names(pattern: &Pattern, out: &mut Vec<String>) {
    match pattern {
        Pattern::Identifier(name) => out.push(name.clone()),
        Pattern::Array { elements, rest } => {
            for el in elements.iter().flatten() {
                collect_pattern_names(el, out);
            }
            if let Some(rest) = rest {
                collect_pattern_names(rest, out);
            }
        }
        Pattern::Object { properties, rest } => {
            for (_, p) in properties {
                collect_pattern_names(p, out);
            }
            if let Some(rest) = rest {
                collect_pattern_names(rest, out);
            }
        }
        Pattern::Assignment { pattern, .. } => collect_pattern_names(pattern, out),
        Pattern::MemberTarget(_) => {}
    }
}

fn collect_var_names(stmt: &Stmt, sink: &mut impl FnMut(&str)) {
    match &stmt.kind {
        StmtKind::VariableDeclaration(decl) if decl.kind == VarKind::Var => {
            for binding in &decl.bindings {
                for name in pattern_names(&binding.pattern) {
                    sink(&name);
                }
            }
        }
        StmtKind::Block(body) => body.iter().for_each(|s| collect_var_names(s, sink)),
        StmtKind::If { consequent, alternate, .. } => {
            collect_var_names(consequent, sink);
            if let Some(alt) = alternate {
                collect_var_names(alt, sink);
            }
        }
        StmtKind::For { head, body } => {
            if let Some(init) = &head.init {
                collect_var_names(init, sink);
            }
            collect_var_names(body, sink);
        }
        StmtKind::ForIn(inner) | StmtKind::ForOf { inner, .. } => {
            if inner.binding_kind == ForBindingKind::Var {
                for name in pattern_names(&inner.pattern) {
                    sink(&name);
                }
            }
            collect_var_names(&inner.body, sink);
        }
        StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => collect_var_names(body, sink),
        StmtKind::Switch { cases, .. } => {
            for case in cases {
                case.body.iter().for_each(|s| collect_var_names(s, sink));
            }
        }
        StmtKind::Try { block, handler, finalizer } => {
            block.iter().for_each(|s| collect_var_names(s, sink));
            if let Some(h) = handler {
                h.body.iter().for_each(|s| collect_var_names(s, sink));
            }
            if let Some(f) = finalizer {
                f.iter().for_each(|s| collect_var_names(s, sink));
            }
        }
        StmtKind::Labeled { body, .. } => collect_var_names(body, sink),
        _ => {}
    }
}

pub(crate) fn make_function_value(
    ev: &mut Evaluator,
    def: &FunctionDef,
    closure: HeapId,
    name_override: Option<String>,
) -> RunResult<Value> {
    super::calls::make_function_value(ev, def, closure, name_override)
}

pub(crate) fn exec_stmt(ev: &mut Evaluator, stmt: &Stmt, env: HeapId) -> RunResult<Completion> {
    match &stmt.kind {
        StmtKind::Empty | StmtKind::Debugger => Ok(Completion::Normal(Value::Undefined)),
        StmtKind::Block(body) => {
            let block_env = environment::create(ev.heap_mut(), Some(env), false);
            ev.exec_block(body, block_env)
        }
        StmtKind::ExpressionStatement(expr) => Ok(Completion::Normal(eval_expr(ev, expr, env)?)),
        StmtKind::VariableDeclaration(decl) => {
            for binding in &decl.bindings {
                let value = match &binding.init {
                    Some(init) => eval_expr(ev, init, env)?,
                    None => Value::Undefined,
                };
                super::destructure::bind_declaration(ev, &binding.pattern, value, env, decl.kind)?;
            }
            Ok(Completion::Normal(Value::Undefined))
        }
        StmtKind::FunctionDeclaration { .. } => Ok(Completion::Normal(Value::Undefined)),
        StmtKind::ClassDeclaration { name, def } => {
            let value = super::classes::eval_class(ev, def, env)?;
            environment::initialize(ev.heap_mut(), env, name, value);
            Ok(Completion::Normal(Value::Undefined))
        }
        StmtKind::If { test, consequent, alternate } => {
            if eval_expr(ev, test, env)?.to_boolean() {
                exec_stmt(ev, consequent, env)
            } else if let Some(alt) = alternate {
                exec_stmt(ev, alt, env)
            } else {
                Ok(Completion::Normal(Value::Undefined))
            }
        }
        StmtKind::While { test, body } => exec_while(ev, test, body, env, None),
        StmtKind::DoWhile { test, body } => exec_do_while(ev, test, body, env, None),
        StmtKind::For { head, body } => exec_for(ev, head, body, env, None),
        StmtKind::ForIn(inner) => super::iteration::exec_for_in(ev, inner, env, None),
        StmtKind::ForOf { is_await, inner } => super::iteration::exec_for_of(ev, inner, *is_await, env, None),
        StmtKind::Switch { discriminant, cases } => exec_switch(ev, discriminant, cases, env),
        StmtKind::Try { block, handler, finalizer } => exec_try(ev, block, handler, finalizer, env),
        StmtKind::Throw(expr) => {
            let value = eval_expr(ev, expr, env)?;
            Err(ev.make_exception(value))
        }
        StmtKind::Return(expr) => {
            let value = match expr {
                Some(e) => eval_expr(ev, e, env)?,
                None => Value::Undefined,
            };
            Ok(Completion::Return(value))
        }
        StmtKind::Break(label) => Ok(Completion::Break(label.clone())),
        StmtKind::Continue(label) => Ok(Completion::Continue(label.clone())),
        StmtKind::Labeled { label, body } => exec_labeled(ev, label, body, env),
        StmtKind::Unknown(_) => ev.throw_syntax_error("unsupported syntax (Unknown node reached evaluator)"),
    }
}

/// Labeled loops need their label recognized by `break label`/`continue
/// label` from inside the loop body; non-loop labeled statements only
/// catch a matching `break label`.
fn exec_labeled(ev: &mut Evaluator, label: &str, body: &Stmt, env: HeapId) -> RunResult<Completion> {
    let completion = match &body.kind {
        StmtKind::While { test, body: inner } => exec_while(ev, test, inner, env, Some(label))?,
        StmtKind::DoWhile { test, body: inner } => exec_do_while(ev, test, inner, env, Some(label))?,
        StmtKind::For { head, body: inner } => exec_for(ev, head, inner, env, Some(label))?,
        StmtKind::ForIn(inner) => super::iteration::exec_for_in(ev, inner, env, Some(label))?,
        StmtKind::ForOf { is_await, inner } => super::iteration::exec_for_of(ev, inner, *is_await, env, Some(label))?,
        _ => exec_stmt(ev, body, env)?,
    };
    match completion {
        Completion::Break(Some(l)) if l == label => Ok(Completion::Normal(Value::Undefined)),
        other => Ok(other),
    }
}

pub(crate) fn loop_should_stop(completion: Completion, label: Option<&str>) -> RunResult<Option<Completion>> {
    match completion {
        Completion::Normal(_) => Ok(None),
        Completion::Continue(None) => Ok(None),
        Completion::Continue(Some(l)) if Some(l.as_str()) == label => Ok(None),
        Completion::Break(None) => Ok(Some(Completion::Normal(Value::Undefined))),
        Completion::Break(Some(l)) if Some(l.as_str()) == label => Ok(Some(Completion::Normal(Value::Undefined))),
        other => Ok(Some(other)),
    }
}

fn exec_while(ev: &mut Evaluator, test: &Expr, body: &Stmt, env: HeapId, label: Option<&str>) -> RunResult<Completion> {
    while eval_expr(ev, test, env)?.to_boolean() {
        let completion = exec_stmt(ev, body, env)?;
        if let Some(stop) = loop_should_stop(completion, label)? {
            return Ok(stop);
        }
    }
    Ok(Completion::Normal(Value::Undefined))
}

fn exec_do_while(ev: &mut Evaluator, test: &Expr, body: &Stmt, env: HeapId, label: Option<&str>) -> RunResult<Completion> {
    loop {
        let completion = exec_stmt(ev, body, env)?;
        if let Some(stop) = loop_should_stop(completion, label)? {
            return Ok(stop);
        }
        if !eval_expr(ev, test, env)?.to_boolean() {
            break;
        }
    }
    Ok(Completion::Normal(Value::Undefined))
}

fn exec_for(ev: &mut Evaluator, head: &ForHead, body: &Stmt, env: HeapId, label: Option<&str>) -> RunResult<Completion> {
    let loop_env = environment::create(ev.heap_mut(), Some(env), false);
    if let Some(init) = &head.init {
        exec_stmt(ev, init, loop_env)?;
    }
    loop {
        if let Some(test) = &head.test {
            if !eval_expr(ev, test, loop_env)?.to_boolean() {
                break;
            }
        }
        // Each iteration gets a fresh copy of `let`-bound loop variables so
        // closures created inside the body capture that iteration's value,
        // matching `for (let i = 0; ...)`'s per-iteration binding semantics.
        let iter_env = environment::create(ev.heap_mut(), Some(env), false);
        copy_bindings(ev, loop_env, iter_env);
        let completion = exec_stmt(ev, body, iter_env)?;
        copy_bindings(ev, iter_env, loop_env);
        if let Some(stop) = loop_should_stop(completion, label)? {
            return Ok(stop);
        }
        if let Some(update) = &head.update {
            eval_expr(ev, update, loop_env)?;
        }
    }
    Ok(Completion::Normal(Value::Undefined))
}

fn copy_bindings(ev: &mut Evaluator, from: HeapId, to: HeapId) {
    let bindings: Vec<(Rc<str>, crate::heap::Slot)> = ev
        .heap()
        .get(from)
        .as_environment()
        .map(|e| e.bindings.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();
    for (name, slot) in bindings {
        if let HeapData::Environment(data) = ev.heap_mut().get_mut(to) {
            data.bindings.insert(name, slot);
        }
    }
}

fn exec_switch(ev: &mut Evaluator, discriminant: &Expr, cases: &[SwitchCase], env: HeapId) -> RunResult<Completion> {
    let switch_env = environment::create(ev.heap_mut(), Some(env), false);
    for case in cases {
        for stmt in &case.body {
            collect_var_names(stmt, &mut |name| environment::hoist_var(ev.heap_mut(), env, Rc::from(name)));
        }
    }
    let value = eval_expr(ev, discriminant, env)?;
    let mut matched_index = None;
    for (i, case) in cases.iter().enumerate() {
        if let Some(test) = &case.test {
            let test_value = eval_expr(ev, test, switch_env)?;
            if value.strict_eq(&test_value) {
                matched_index = Some(i);
                break;
            }
        }
    }
    if matched_index.is_none() {
        matched_index = cases.iter().position(|c| c.test.is_none());
    }
    let Some(start) = matched_index else { return Ok(Completion::Normal(Value::Undefined)) };
    for case in &cases[start..] {
        for stmt in &case.body {
            let completion = exec_stmt(ev, stmt, switch_env)?;
            match completion {
                Completion::Normal(_) => {}
                Completion::Break(None) => return Ok(Completion::Normal(Value::Undefined)),
                other => return Ok(other),
            }
        }
    }
    Ok(Completion::Normal(Value::Undefined))
}

fn exec_try(
    ev: &mut Evaluator,
    block: &[Stmt],
    handler: &Option<CatchClause>,
    finalizer: &Option<Vec<Stmt>>,
    env: HeapId,
) -> RunResult<Completion> {
    let block_env = environment::create(ev.heap_mut(), Some(env), false);
    let try_result = ev.exec_block(block, block_env);
    let mut outcome = match try_result {
        Ok(completion) => Ok(completion),
        Err(exception) => {
            if let Some(handler) = handler {
                let catch_env = environment::create(ev.heap_mut(), Some(env), false);
                if let Some(param) = &handler.param {
                    super::destructure::bind_declaration(ev, param, exception.value.clone(), catch_env, VarKind::Let)?;
                }
                ev.exec_block(&handler.body, catch_env)
            } else {
                Err(exception)
            }
        }
    };
    if let Some(finalizer) = finalizer {
        let finally_env = environment::create(ev.heap_mut(), Some(env), false);
        match ev.exec_block(finalizer, finally_env) {
            Ok(Completion::Normal(_)) => {}
            // A finally that itself completes abruptly overrides whatever
            // the try/catch produced (`§7` "Policy": "if a finally issues
            // its own abrupt completion, it overrides the original").
            Ok(other) => outcome = Ok(other),
            Err(e) => outcome = Err(e),
        }
    }
    outcome
}

// ---------------------------------------------------------------- Expr --

pub(crate) fn eval_expr(ev: &mut Evaluator, expr: &Expr, env: HeapId) -> RunResult<Value> {
    match &expr.kind {
        ExprKind::Literal(lit) => Ok(eval_literal(ev, lit)),
        ExprKind::Identifier(name) => eval_identifier(ev, name, env),
        ExprKind::This => Ok(environment::resolve_this(ev.heap(), env).unwrap_or_else(|| {
            if ev.is_strict() { Value::Undefined } else { Value::Object(ev.global_object()) }
        })),
        ExprKind::Super => ev.throw_syntax_error("'super' keyword is only valid inside a class"),
        ExprKind::Array(elements) => eval_array_literal(ev, elements, env),
        ExprKind::Object { properties } => eval_object_literal(ev, properties, env),
        ExprKind::Function(def) => make_function_value(ev, def, env, def.name.clone()),
        ExprKind::Arrow(def) => make_function_value(ev, def, env, None),
        ExprKind::Class(def) => super::classes::eval_class(ev, def, env),
        ExprKind::Member { object, property, optional } => {
            let (value, _) = super::access::eval_member(ev, object, property, *optional, env)?;
            Ok(value)
        }
        ExprKind::Call { callee, args, optional } => super::calls::eval_call(ev, callee, args, *optional, env),
        ExprKind::New { callee, args } => {
            let ctor = eval_expr(ev, callee, env)?;
            let arg_values = super::calls::eval_args(ev, args, env)?;
            ev.construct(ctor, &arg_values, None)
        }
        ExprKind::Unary { op, argument } => eval_unary(ev, *op, argument, env),
        ExprKind::Update { op, argument, prefix } => eval_update(ev, *op, argument, *prefix, env),
        ExprKind::Binary { op, left, right } => eval_binary(ev, *op, left, right, env),
        ExprKind::Logical { op, left, right } => eval_logical(ev, *op, left, right, env),
        ExprKind::Assignment { op, target, value } => super::access::eval_assignment(ev, *op, target, value, env),
        ExprKind::Conditional { test, consequent, alternate } => {
            if eval_expr(ev, test, env)?.to_boolean() { eval_expr(ev, consequent, env) } else { eval_expr(ev, alternate, env) }
        }
        ExprKind::Sequence(exprs) => {
            let mut last = Value::Undefined;
            for e in exprs {
                last = eval_expr(ev, e, env)?;
            }
            Ok(last)
        }
        ExprKind::Template(tpl) => eval_template(ev, tpl, env),
        ExprKind::TaggedTemplate { tag, quasi } => super::calls::eval_tagged_template(ev, tag, quasi, env),
        ExprKind::Spread(_) => ev.throw_syntax_error("unexpected spread element"),
        ExprKind::Yield { argument, delegate } => eval_yield(ev, argument.as_deref(), *delegate, env),
        ExprKind::Await(argument) => super::promise::eval_await(ev, argument, env),
        ExprKind::RegExp { pattern, flags } => super::access::make_regexp(ev, pattern, flags),
        ExprKind::Unknown(_) => ev.throw_syntax_error("unsupported syntax (Unknown node reached evaluator)"),
    }
}

fn eval_literal(_ev: &mut Evaluator, lit: &Literal) -> Value {
    match lit {
        Literal::Number(n) => Value::Number(*n),
        Literal::BigInt(digits) => Value::BigInt(Rc::new(digits.parse().unwrap_or_default())),
        Literal::String(s) => Value::string(s.as_str()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
        Literal::Undefined => Value::Undefined,
    }
}

fn eval_identifier(ev: &mut Evaluator, name: &str, env: HeapId) -> RunResult<Value> {
    if name == "undefined" {
        return Ok(Value::Undefined);
    }
    if name == "globalThis" {
        return Ok(Value::Object(ev.global_object()));
    }
    if name == "NaN" {
        return Ok(Value::Number(f64::NAN));
    }
    if name == "Infinity" {
        return Ok(Value::Number(f64::INFINITY));
    }
    match environment::get(ev.heap(), env, name) {
        GetOutcome::Value(v) => Ok(v),
        GetOutcome::Uninitialized => {
            ev.throw_reference_error(format!("Cannot access '{name}' before initialization"))
        }
        GetOutcome::NotFound => match global_fallback(ev, name) {
            Some(value) => Ok(value),
            None => ev.throw_reference_error(format!("{name} is not defined")),
        },
    }
}

/// The Global Environment Record's object-record half (`§3` "Environment"):
/// names neither `let`/`const`/`class`-declared nor function/`var`-hoisted
/// into `global_env`'s bindings (every intrinsic the stdlib installs —
/// `Array`, `console`, `Math`, …, plus anything a script hung directly off
/// `globalThis`) still resolve as bare identifiers because they live as
/// ordinary properties of the global object instead. Only consulted once
/// the declarative scope chain comes up empty, so a `let Array = …` shadow
/// still wins.
fn global_fallback(ev: &mut Evaluator, name: &str) -> Option<Value> {
    let global = ev.global_object();
    if super::access::has_property(ev, global, name) { ev.get_property(Value::Object(global), name).ok() } else { None }
}

fn eval_array_literal(ev: &mut Evaluator, elements: &[ArrayElement], env: HeapId) -> RunResult<Value> {
    let mut out = Vec::with_capacity(elements.len());
    for el in elements {
        match el {
            ArrayElement::Item(expr) => out.push(Some(eval_expr(ev, expr, env)?)),
            ArrayElement::Hole => out.push(None),
            ArrayElement::Spread(expr) => {
                let value = eval_expr(ev, expr, env)?;
                for item in super::iteration::iterate_to_vec(ev, value)? {
                    out.push(Some(item));
                }
            }
        }
    }
    Ok(Value::Object(ev.new_array(out)))
}

fn eval_object_literal(ev: &mut Evaluator, properties: &[ObjectProperty], env: HeapId) -> RunResult<Value> {
    let obj_id = ev.new_plain_object();
    for prop in properties {
        match prop {
            ObjectProperty::KeyValue { key, value, .. } => {
                let key_str = super::access::eval_property_key(ev, key, env)?;
                let value = eval_expr(ev, value, env)?;
                ev.set_property(Value::Object(obj_id), &key_str, value)?;
            }
            ObjectProperty::Method { key, def } => {
                let key_str = super::access::eval_property_key(ev, key, env)?;
                let func = make_function_value(ev, def, env, Some(key_str.clone()))?;
                super::calls::set_home_object(ev, &func, obj_id);
                ev.set_property(Value::Object(obj_id), &key_str, func)?;
            }
            ObjectProperty::Getter { key, def } => {
                let key_str = super::access::eval_property_key(ev, key, env)?;
                let func = make_function_value(ev, def, env, Some(format!("get {key_str}")))?;
                super::access::define_accessor(ev, obj_id, &key_str, Some(func), None);
            }
            ObjectProperty::Setter { key, def } => {
                let key_str = super::access::eval_property_key(ev, key, env)?;
                let func = make_function_value(ev, def, env, Some(format!("set {key_str}")))?;
                super::access::define_accessor(ev, obj_id, &key_str, None, Some(func));
            }
            ObjectProperty::Spread(expr) => {
                let value = eval_expr(ev, expr, env)?;
                super::access::copy_own_enumerable(ev, value, obj_id)?;
            }
        }
    }
    Ok(Value::Object(obj_id))
}

fn eval_template(ev: &mut Evaluator, tpl: &TemplateLiteral, env: HeapId) -> RunResult<Value> {
    let mut out = String::new();
    for (i, quasi) in tpl.quasis.iter().enumerate() {
        out.push_str(quasi);
        if let Some(expr) = tpl.expressions.get(i) {
            let value = eval_expr(ev, expr, env)?;
            out.push_str(&ops::to_js_string(ev, &value)?);
        }
    }
    Ok(Value::string(out))
}

fn eval_unary(ev: &mut Evaluator, op: UnaryOp, argument: &Expr, env: HeapId) -> RunResult<Value> {
    if op == UnaryOp::Typeof {
        if let ExprKind::Identifier(name) = &argument.kind {
            let bound = !matches!(environment::get(ev.heap(), env, name), GetOutcome::NotFound)
                || is_global_name(name)
                || global_fallback(ev, name).is_some();
            if bound {
                let value = eval_expr(ev, argument, env)?;
                return Ok(Value::string(ops::typeof_value(ev, &value)));
            }
            return Ok(Value::string("undefined"));
        }
    }
    if op == UnaryOp::Delete {
        return super::access::eval_delete(ev, argument, env);
    }
    let value = eval_expr(ev, argument, env)?;
    match op {
        UnaryOp::Neg => match &value {
            Value::BigInt(b) => Ok(Value::BigInt(Rc::new(-b.as_ref().clone()))),
            _ => Ok(Value::Number(-ops::to_number(ev, &value)?)),
        },
        UnaryOp::Plus => Ok(Value::Number(ops::to_number(ev, &value)?)),
        UnaryOp::Not => Ok(Value::Bool(!value.to_boolean())),
        UnaryOp::BitNot => match &value {
            Value::BigInt(b) => Ok(Value::BigInt(Rc::new(!b.as_ref().clone()))),
            _ => Ok(Value::Number(f64::from(!ops::to_int32(ops::to_number(ev, &value)?)))),
        },
        UnaryOp::Typeof => Ok(Value::string(ops::typeof_value(ev, &value))),
        UnaryOp::Void => Ok(Value::Undefined),
        UnaryOp::Delete => unreachable!("handled above"),
    }
}

fn is_global_name(name: &str) -> bool {
    matches!(name, "undefined" | "globalThis" | "NaN" | "Infinity")
}

fn eval_update(ev: &mut Evaluator, op: UpdateOp, argument: &Expr, prefix: bool, env: HeapId) -> RunResult<Value> {
    let old = eval_expr(ev, argument, env)?;
    let old_num = ops::to_number(ev, &old)?;
    let new_num = match op {
        UpdateOp::Increment => old_num + 1.0,
        UpdateOp::Decrement => old_num - 1.0,
    };
    let new_value = Value::Number(new_num);
    super::access::assign_to_target(ev, argument, new_value.clone(), env)?;
    Ok(if prefix { new_value } else { Value::Number(old_num) })
}

fn eval_binary(ev: &mut Evaluator, op: BinaryOp, left: &Expr, right: &Expr, env: HeapId) -> RunResult<Value> {
    if op == BinaryOp::In {
        let key = eval_expr(ev, left, env)?;
        let key_str = ops::to_js_string(ev, &key)?;
        let obj = eval_expr(ev, right, env)?;
        let Value::Object(id) = obj else { return ev.throw_type_error("Cannot use 'in' operator on non-object") };
        return Ok(Value::Bool(super::access::has_property(ev, id, &key_str)));
    }
    let l = eval_expr(ev, left, env)?;
    let r = eval_expr(ev, right, env)?;
    if op == BinaryOp::Instanceof {
        return Ok(Value::Bool(ops::instance_of(ev, &l, &r)?));
    }
    match op {
        BinaryOp::Add => ops::add(ev, &l, &r),
        BinaryOp::Sub => ops::sub(ev, &l, &r),
        BinaryOp::Mul => ops::mul(ev, &l, &r),
        BinaryOp::Div => ops::div(ev, &l, &r),
        BinaryOp::Mod => ops::rem(ev, &l, &r),
        BinaryOp::Pow => ops::pow(ev, &l, &r),
        BinaryOp::BitAnd => ops::bit_and(ev, &l, &r),
        BinaryOp::BitOr => ops::bit_or(ev, &l, &r),
        BinaryOp::BitXor => ops::bit_xor(ev, &l, &r),
        BinaryOp::Shl => ops::shl(ev, &l, &r),
        BinaryOp::Shr => ops::shr(ev, &l, &r),
        BinaryOp::UShr => ops::ushr(ev, &l, &r),
        BinaryOp::Lt => Ok(Value::Bool(ops::less_than(ev, &l, &r)?.unwrap_or(false))),
        BinaryOp::Gt => Ok(Value::Bool(ops::less_than(ev, &r, &l)?.unwrap_or(false))),
        BinaryOp::LtEq => Ok(Value::Bool(!ops::less_than(ev, &r, &l)?.unwrap_or(true))),
        BinaryOp::GtEq => Ok(Value::Bool(!ops::less_than(ev, &l, &r)?.unwrap_or(true))),
        BinaryOp::Eq => Ok(Value::Bool(ops::loose_eq(ev, &l, &r)?)),
        BinaryOp::NotEq => Ok(Value::Bool(!ops::loose_eq(ev, &l, &r)?)),
        BinaryOp::StrictEq => Ok(Value::Bool(l.strict_eq(&r))),
        BinaryOp::StrictNotEq => Ok(Value::Bool(!l.strict_eq(&r))),
        BinaryOp::In | BinaryOp::Instanceof => unreachable!("handled above"),
    }
}

fn eval_logical(ev: &mut Evaluator, op: LogicalOp, left: &Expr, right: &Expr, env: HeapId) -> RunResult<Value> {
    let l = eval_expr(ev, left, env)?;
    match op {
        LogicalOp::And => if l.to_boolean() { eval_expr(ev, right, env) } else { Ok(l) },
        LogicalOp::Or => if l.to_boolean() { Ok(l) } else { eval_expr(ev, right, env) },
        LogicalOp::Nullish => if l.is_nullish() { eval_expr(ev, right, env) } else { Ok(l) },
    }
}

fn eval_yield(ev: &mut Evaluator, argument: Option<&Expr>, delegate: bool, env: HeapId) -> RunResult<Value> {
    let value = match argument {
        Some(e) => eval_expr(ev, e, env)?,
        None => Value::Undefined,
    };
    if delegate {
        for item in super::iteration::iterate_to_vec(ev, value)? {
            super::generator::push_yield(ev, item)?;
        }
    } else {
        super::generator::push_yield(ev, value)?;
    }
    Ok(Value::Undefined)
}
