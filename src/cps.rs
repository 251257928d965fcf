//! The CPS Transformer (`§4.5`): rewrites every `async function`/async
//! arrow/async method so it returns an ordinary (non-`async`) function whose
//! body is `new Promise((resolve, reject) => { try { <body'> } catch (e) {
//! reject(e); } })`, where `body'` is `body` with every `return expr;`
//! replaced by `resolve(expr); return;` (a bare `return;`/fallthrough becomes
//! `resolve(undefined);`).
//!
//! `await E` itself is left untouched inside `body'` — this crate's
//! evaluator runs `await` natively (`evaluator::promise::await_value`) by
//! reading `E`'s settled value directly off the heap once it has one,
//! single-stepping the event loop one job at a time (and touching none of
//! it at all when `E` is already settled) rather than synthesizing an
//! explicit `.then()` chain. So the part of `§4.5` this module is
//! responsible for is exactly the outer completion reification (turning a
//! `return`/fallthrough/throw into a `resolve`/`reject` call); the
//! suspension-at-`await` half of the algorithm is delegated to that native
//! evaluation path. This trades away true suspend-and-resume: an async
//! function still runs past every `await` to its next suspension point (or
//! completion) within the same host call, so code written after the call
//! site (`f(); somethingElse();`) still observes `somethingElse()` running
//! only after `f`'s synchronous prefix *and* its first await's settlement,
//! not before it as real `await` suspension would order it — `SPEC_FULL.md`
//! §4.5/§5 documents this gap and why draining is scoped the way it is.
//! `DESIGN.md` records this as the resolution of `§4.5`'s "transformer is
//! permitted to reject unsupported shapes... falls back to [native]
//! evaluation" escape hatch — exercised here for every `await` site rather
//! than only pathological ones.
//!
//! Nodes synthesized by this pass carry `source_ref: None` rather than a
//! pre-transform origin pointer: origin back-links are an IR-level concept
//! (`ir.rs`'s `Cell.origin`) that `fold.rs`, which runs just before this pass
//! and also rewrites nodes in place, does not populate either.

use crate::ast::*;

const RESOLVE_NAME: &str = "__async_resolve";
const REJECT_NAME: &str = "__async_reject";
const ERROR_NAME: &str = "__async_error";

pub(crate) fn transform_program(program: &mut Program) {
    walk_stmts(&mut program.body);
}

fn no_ref(kind: ExprKind) -> Expr {
    Expr { kind, source_ref: None }
}

fn no_ref_stmt(kind: StmtKind) -> Stmt {
    Stmt { kind, source_ref: None }
}

fn ident(name: &str) -> Expr {
    no_ref(ExprKind::Identifier(name.to_string()))
}

fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    no_ref(ExprKind::Call {
        callee: Box::new(callee),
        args: CallArgs { args: args.into_iter().map(ArrayElement::Item).collect() },
        optional: false,
    })
}

// ---------------------------------------------------------------- walk --

/// Recurses over every statement/expression position in the program looking
/// for `FunctionDef`s (declarations, expressions, arrows, methods, getters,
/// setters). Nested defs are transformed first (innermost-out), so an async
/// arrow nested inside another async function's body is itself already a
/// plain function by the time the outer function's `return`-rewrite walk
/// passes over it (which doesn't matter either way, since that walk stops at
/// function boundaries — see `rewrite_returns`).
fn walk_stmts(stmts: &mut [Stmt]) {
    for stmt in stmts {
        walk_stmt(stmt);
    }
}

fn walk_stmt(stmt: &mut Stmt) {
    match &mut stmt.kind {
        StmtKind::Block(body) => walk_stmts(body),
        StmtKind::ExpressionStatement(expr) => walk_expr(expr),
        StmtKind::VariableDeclaration(decl) => {
            for binding in &mut decl.bindings {
                if let Some(init) = &mut binding.init {
                    walk_expr(init);
                }
            }
        }
        StmtKind::FunctionDeclaration { def, .. } => walk_function_def(def),
        StmtKind::ClassDeclaration { def, .. } => walk_class_def(def),
        StmtKind::If { test, consequent, alternate } => {
            walk_expr(test);
            walk_stmt(consequent);
            if let Some(alt) = alternate {
                walk_stmt(alt);
            }
        }
        StmtKind::For { head, body } => {
            if let Some(init) = &mut head.init {
                walk_stmt(init);
            }
            if let Some(test) = &mut head.test {
                walk_expr(test);
            }
            if let Some(update) = &mut head.update {
                walk_expr(update);
            }
            walk_stmt(body);
        }
        StmtKind::ForIn(inner) | StmtKind::ForOf { inner, .. } => {
            walk_expr(&mut inner.right);
            walk_stmt(&mut inner.body);
        }
        StmtKind::While { test, body } | StmtKind::DoWhile { test, body } => {
            walk_expr(test);
            walk_stmt(body);
        }
        StmtKind::Switch { discriminant, cases } => {
            walk_expr(discriminant);
            for case in cases {
                if let Some(test) = &mut case.test {
                    walk_expr(test);
                }
                walk_stmts(&mut case.body);
            }
        }
        StmtKind::Try { block, handler, finalizer } => {
            walk_stmts(block);
            if let Some(h) = handler {
                walk_stmts(&mut h.body);
            }
            if let Some(f) = finalizer {
                walk_stmts(f);
            }
        }
        StmtKind::Throw(expr) => walk_expr(expr),
        StmtKind::Return(Some(expr)) => walk_expr(expr),
        StmtKind::Labeled { body, .. } => walk_stmt(body),
        StmtKind::Return(None)
        | StmtKind::Break(_)
        | StmtKind::Continue(_)
        | StmtKind::Empty
        | StmtKind::Debugger
        | StmtKind::Unknown(_) => {}
    }
}

fn walk_expr(expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Literal(_) | ExprKind::Identifier(_) | ExprKind::This | ExprKind::Super | ExprKind::Unknown(_) | ExprKind::RegExp { .. } => {}
        ExprKind::Array(elements) => walk_array_elements(elements),
        ExprKind::Object { properties } => {
            for prop in properties {
                match prop {
                    ObjectProperty::KeyValue { key, value, .. } => {
                        walk_property_key(key);
                        walk_expr(value);
                    }
                    ObjectProperty::Method { key, def } | ObjectProperty::Getter { key, def } | ObjectProperty::Setter { key, def } => {
                        walk_property_key(key);
                        walk_function_def(def);
                    }
                    ObjectProperty::Spread(e) => walk_expr(e),
                }
            }
        }
        ExprKind::Function(def) | ExprKind::Arrow(def) => walk_function_def(def),
        ExprKind::Class(def) => walk_class_def(def),
        ExprKind::Member { object, property, .. } => {
            walk_expr(object);
            walk_property_key(property);
        }
        ExprKind::Call { callee, args, .. } => {
            walk_expr(callee);
            walk_array_elements(&mut args.args);
        }
        ExprKind::New { callee, args } => {
            walk_expr(callee);
            walk_array_elements(&mut args.args);
        }
        ExprKind::Unary { argument, .. } | ExprKind::Update { argument, .. } | ExprKind::Spread(argument) | ExprKind::Await(argument) => {
            walk_expr(argument);
        }
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            walk_expr(left);
            walk_expr(right);
        }
        ExprKind::Assignment { target, value, .. } => {
            walk_expr(target);
            walk_expr(value);
        }
        ExprKind::Conditional { test, consequent, alternate } => {
            walk_expr(test);
            walk_expr(consequent);
            walk_expr(alternate);
        }
        ExprKind::Sequence(exprs) => {
            for e in exprs {
                walk_expr(e);
            }
        }
        ExprKind::Template(tpl) => {
            for e in &mut tpl.expressions {
                walk_expr(e);
            }
        }
        ExprKind::TaggedTemplate { tag, quasi } => {
            walk_expr(tag);
            for e in &mut quasi.expressions {
                walk_expr(e);
            }
        }
        ExprKind::Yield { argument, .. } => {
            if let Some(arg) = argument {
                walk_expr(arg);
            }
        }
    }
}

fn walk_array_elements(elements: &mut [ArrayElement]) {
    for el in elements {
        match el {
            ArrayElement::Item(e) | ArrayElement::Spread(e) => walk_expr(e),
            ArrayElement::Hole => {}
        }
    }
}

fn walk_property_key(key: &mut PropertyKey) {
    if let PropertyKey::Computed(expr) = key {
        walk_expr(expr);
    }
}

fn walk_class_def(def: &mut ClassDef) {
    if let Some(superclass) = &mut def.superclass {
        walk_expr(superclass);
    }
    for member in &mut def.members {
        walk_property_key(&mut member.key);
        match &mut member.kind {
            ClassMemberKind::Method(def) | ClassMemberKind::Getter(def) | ClassMemberKind::Setter(def) => walk_function_def(def),
            ClassMemberKind::Field(Some(init)) => walk_expr(init),
            ClassMemberKind::Field(None) => {}
        }
    }
}

fn walk_function_def(def: &mut FunctionDef) {
    for param in &mut def.params {
        if let Some(default) = &mut param.default {
            walk_expr(default);
        }
    }
    match &mut def.body {
        FunctionBody::Block(stmts) => walk_stmts(stmts),
        FunctionBody::Expression(expr) => walk_expr(expr),
    }
    if def.is_async && !def.is_generator {
        transform_async_def(def);
    }
}

// ------------------------------------------------------- transform body --

fn transform_async_def(def: &mut FunctionDef) {
    def.is_async = false;
    let mut stmts = match std::mem::replace(&mut def.body, FunctionBody::Block(Vec::new())) {
        FunctionBody::Block(stmts) => stmts,
        FunctionBody::Expression(expr) => vec![no_ref_stmt(StmtKind::Return(Some(*expr)))],
    };
    for stmt in &mut stmts {
        rewrite_returns(stmt);
    }
    // Fallthrough past the last statement without an explicit `return` is
    // itself a `return undefined;` (`§4.6` "a function that falls off its
    // body's end returns `undefined`").
    stmts.push(no_ref_stmt(StmtKind::ExpressionStatement(call(ident(RESOLVE_NAME), vec![no_ref(ExprKind::Literal(Literal::Undefined))]))));

    let try_stmt = no_ref_stmt(StmtKind::Try {
        block: stmts,
        handler: Some(CatchClause {
            param: Some(Pattern::Identifier(ERROR_NAME.to_string())),
            body: vec![no_ref_stmt(StmtKind::ExpressionStatement(call(ident(REJECT_NAME), vec![ident(ERROR_NAME)])))],
        }),
        finalizer: None,
    });

    let executor = FunctionDef {
        name: None,
        params: vec![
            Param { pattern: Pattern::Identifier(RESOLVE_NAME.to_string()), default: None, is_rest: false },
            Param { pattern: Pattern::Identifier(REJECT_NAME.to_string()), default: None, is_rest: false },
        ],
        body: FunctionBody::Block(vec![try_stmt]),
        is_async: false,
        is_generator: false,
        kind: FunctionKind::Arrow,
    };
    let promise_expr = no_ref(ExprKind::New {
        callee: Box::new(ident("Promise")),
        args: CallArgs { args: vec![ArrayElement::Item(no_ref(ExprKind::Arrow(Box::new(executor))))] },
    });
    def.body = FunctionBody::Block(vec![no_ref_stmt(StmtKind::Return(Some(promise_expr)))]);
}

/// Rewrites every `return expr;` reachable from `stmt` without crossing a
/// nested function/class boundary (there isn't one below a `Stmt`, since
/// function/class literals only ever appear inside expressions, which this
/// walk doesn't descend into) into `resolve(expr); return;`, so an early
/// `return` still halts the enclosing (now-synchronous) function the same
/// way it always did — only what "returning" *means* changes.
fn rewrite_returns(stmt: &mut Stmt) {
    match &mut stmt.kind {
        StmtKind::Return(expr) => {
            let arg = expr.take().unwrap_or(no_ref(ExprKind::Literal(Literal::Undefined)));
            let resolve_call = no_ref_stmt(StmtKind::ExpressionStatement(call(ident(RESOLVE_NAME), vec![arg])));
            let bare_return = no_ref_stmt(StmtKind::Return(None));
            stmt.kind = StmtKind::Block(vec![resolve_call, bare_return]);
        }
        StmtKind::Block(body) => body.iter_mut().for_each(rewrite_returns),
        StmtKind::If { consequent, alternate, .. } => {
            rewrite_returns(consequent);
            if let Some(alt) = alternate {
                rewrite_returns(alt);
            }
        }
        StmtKind::For { body, .. } | StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } | StmtKind::Labeled { body, .. } => {
            rewrite_returns(body);
        }
        StmtKind::ForIn(inner) | StmtKind::ForOf { inner, .. } => rewrite_returns(&mut inner.body),
        StmtKind::Switch { cases, .. } => cases.iter_mut().for_each(|c| c.body.iter_mut().for_each(rewrite_returns)),
        StmtKind::Try { block, handler, finalizer } => {
            block.iter_mut().for_each(rewrite_returns);
            if let Some(h) = handler {
                h.body.iter_mut().for_each(rewrite_returns);
            }
            if let Some(f) = finalizer {
                f.iter_mut().for_each(rewrite_returns);
            }
        }
        // `FunctionDeclaration`/`ClassDeclaration` statements introduce a new
        // `return` scope; leave them untouched (they were already visited,
        // and independently transformed if async, by `walk_stmt`).
        _ => {}
    }
}
