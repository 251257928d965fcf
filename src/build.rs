//! Lifts `parser.rs`'s untagged IR into the typed AST (`ast.rs`).
//!
//! The parser only knows how to build list-structured cells tagged by a
//! `Sym` head; it has no notion of `StmtKind`/`ExprKind` at all. This module
//! is the other half of that split: it walks an [`IrArena`] from a root
//! [`IrId`] and matches each cell's tag against the exact shape `parser.rs`
//! is documented to emit for that tag, producing the typed nodes the rest
//! of the pipeline (`fold.rs`, `cps.rs`, the evaluator) actually operates
//! on. A tag this builder doesn't recognize — none exist yet, but a future
//! parser change could add one before this module catches up — becomes
//! [`StmtKind::Unknown`]/[`ExprKind::Unknown`], carrying the raw `IrId` so
//! the evaluator can still run it via the legacy IR interpreter.
//!
//! Every child-index assumption here (`children[0]` is the test, `[1]` the
//! consequent, ...) mirrors the exact `vec![...]` order `parser.rs` passes
//! to `Parser::node` for that tag — the two files must be read together.

use crate::ast::*;
use crate::ir::{Atom, Cell, IrArena, IrId};

pub(crate) fn build(arena: &IrArena, program_root: IrId) -> Program {
    let body = build_stmt_list(arena, program_root);
    let strict = has_use_strict_directive(&body);
    Program { body, strict }
}

/// Directive prologue detection (`§3`'s `Program(body, strict)`): a leading
/// `"use strict"` string-literal expression statement switches the whole
/// program strict, matching every other ECMAScript host.
fn has_use_strict_directive(body: &[Stmt]) -> bool {
    matches!(
        body.first(),
        Some(Stmt { kind: StmtKind::ExpressionStatement(Expr { kind: ExprKind::Literal(Literal::String(s)), .. }), .. })
        if s == "use strict"
    )
}

// ---- low-level cell accessors ------------------------------------------

fn cell(arena: &IrArena, id: IrId) -> &Cell {
    arena.get(id)
}

/// A cell's `Sym` head names the production that built it. This is called
/// only on statement/expression/pattern/etc. node `IrId`s reached by
/// recursing through `rest` — never on a bare operator/flag leaf (those are
/// read directly by [`sym_of`] at the specific child index the parser put
/// them), so there's no ambiguity from an empty-children tagged node (`{}`,
/// `[]`, `f()`) looking like a leaf.
fn tag(c: &Cell) -> Option<&'static str> {
    match c.head {
        Atom::Sym(s) => Some(s),
        _ => None,
    }
}

fn str_of(arena: &IrArena, id: IrId) -> String {
    match &cell(arena, id).head {
        Atom::Str(s) => s.clone(),
        other => unreachable!("expected Str leaf, got {other:?}"),
    }
}

fn num_of(arena: &IrArena, id: IrId) -> f64 {
    match &cell(arena, id).head {
        Atom::Num(n) => *n,
        other => unreachable!("expected Num leaf, got {other:?}"),
    }
}

fn bigint_of(arena: &IrArena, id: IrId) -> String {
    match &cell(arena, id).head {
        Atom::BigInt(s) => s.clone(),
        other => unreachable!("expected BigInt leaf, got {other:?}"),
    }
}

fn bool_of(arena: &IrArena, id: IrId) -> bool {
    match &cell(arena, id).head {
        Atom::Bool(b) => *b,
        other => unreachable!("expected Bool leaf, got {other:?}"),
    }
}

fn sym_of(arena: &IrArena, id: IrId) -> &'static str {
    match &cell(arena, id).head {
        Atom::Sym(s) => s,
        other => unreachable!("expected Sym leaf, got {other:?}"),
    }
}

fn is_nil(arena: &IrArena, id: IrId) -> bool {
    matches!(cell(arena, id).head, Atom::Nil)
}

// ---- statements ---------------------------------------------------------

/// Builds the children of a `block`/`program`-shaped node (a plain list of
/// statement `IrId`s) into typed `Stmt`s.
fn build_stmt_list(arena: &IrArena, list_id: IrId) -> Vec<Stmt> {
    cell(arena, list_id).rest.iter().map(|&id| build_stmt(arena, id)).collect()
}

fn build_stmt(arena: &IrArena, id: IrId) -> Stmt {
    let c = cell(arena, id);
    let source_ref = c.source_ref.clone();
    let kind = build_stmt_kind(arena, id, c);
    Stmt { kind, source_ref }
}

fn build_stmt_kind(arena: &IrArena, id: IrId, c: &Cell) -> StmtKind {
    let Some(t) = tag(c) else { return StmtKind::Unknown(id) };
    let ch = &c.rest;
    match t {
        "block" => StmtKind::Block(build_stmt_list(arena, id)),
        "empty" => StmtKind::Empty,
        "debugger" => StmtKind::Debugger,
        "expr-stmt" => StmtKind::ExpressionStatement(build_expr(arena, ch[0])),
        "var-decl" => StmtKind::VariableDeclaration(build_var_decl(arena, ch)),
        "func-decl" => {
            let name = str_of(arena, ch[0]);
            let def = build_func_node(arena, ch[1], Some(name.clone()));
            StmtKind::FunctionDeclaration { name, def: Box::new(def) }
        }
        "class-decl" => {
            let name = str_of(arena, ch[0]);
            let def = build_class_node(arena, ch[1]);
            StmtKind::ClassDeclaration { name, def }
        }
        "if" => {
            let test = build_expr(arena, ch[0]);
            let consequent = Box::new(build_stmt(arena, ch[1]));
            let alternate = ch.get(2).map(|&a| Box::new(build_stmt(arena, a)));
            StmtKind::If { test, consequent, alternate }
        }
        "for" => {
            let init = if is_nil(arena, ch[0]) { None } else { Some(Box::new(build_stmt(arena, ch[0]))) };
            let test = if is_nil(arena, ch[1]) { None } else { Some(build_expr(arena, ch[1])) };
            let update = if is_nil(arena, ch[2]) { None } else { Some(build_expr(arena, ch[2])) };
            let body = Box::new(build_stmt(arena, ch[3]));
            StmtKind::For { head: Box::new(ForHead { init, test, update }), body }
        }
        "for-in" => StmtKind::ForIn(build_for_in_of(arena, ch)),
        "for-of" => {
            let is_await = bool_of(arena, ch[0]);
            StmtKind::ForOf { is_await, inner: build_for_in_of(arena, &ch[1..]) }
        }
        "while" => StmtKind::While { test: build_expr(arena, ch[0]), body: Box::new(build_stmt(arena, ch[1])) },
        "do-while" => StmtKind::DoWhile { test: build_expr(arena, ch[1]), body: Box::new(build_stmt(arena, ch[0])) },
        "switch" => {
            let discriminant = build_expr(arena, ch[0]);
            let cases = ch[1..].iter().map(|&c| build_switch_case(arena, c)).collect();
            StmtKind::Switch { discriminant, cases }
        }
        "try" => build_try(arena, ch),
        "throw" => StmtKind::Throw(build_expr(arena, ch[0])),
        "return" => StmtKind::Return(ch.first().map(|&e| build_expr(arena, e))),
        "break" => StmtKind::Break(ch.first().map(|&l| str_of(arena, l))),
        "continue" => StmtKind::Continue(ch.first().map(|&l| str_of(arena, l))),
        "labeled" => StmtKind::Labeled { label: str_of(arena, ch[0]), body: Box::new(build_stmt(arena, ch[1])) },
        _ => StmtKind::Unknown(id),
    }
}

fn build_var_decl(arena: &IrArena, ch: &[IrId]) -> VariableDeclaration {
    let kind = match sym_of(arena, ch[0]) {
        "var" => VarKind::Var,
        "let" => VarKind::Let,
        "const" => VarKind::Const,
        other => unreachable!("unknown var-decl kind {other}"),
    };
    let bindings = ch[1..].iter().map(|&d| build_declarator(arena, d)).collect();
    VariableDeclaration { kind, bindings }
}

fn build_declarator(arena: &IrArena, id: IrId) -> VariableDeclarator {
    let ch = &cell(arena, id).rest;
    let pattern = build_pattern(arena, ch[0]);
    let init = ch.get(1).map(|&e| build_expr(arena, e));
    VariableDeclarator { pattern, init }
}

fn build_for_in_of(arena: &IrArena, ch: &[IrId]) -> ForInOf {
    let binding_kind = match sym_of(arena, ch[0]) {
        "var" => ForBindingKind::Var,
        "let" => ForBindingKind::Let,
        "const" => ForBindingKind::Const,
        "assign" => ForBindingKind::Assign,
        other => unreachable!("unknown for-in/of binding kind {other}"),
    };
    let pattern = if binding_kind == ForBindingKind::Assign {
        expr_to_pattern(build_expr(arena, ch[1]))
    } else {
        build_pattern(arena, ch[1])
    };
    let right = Box::new(build_expr(arena, ch[2]));
    let body = Box::new(build_stmt(arena, ch[3]));
    ForInOf { binding_kind, pattern, right, body }
}

fn build_switch_case(arena: &IrArena, id: IrId) -> SwitchCase {
    let c = cell(arena, id);
    match tag(c) {
        Some("case") => {
            let ch = &c.rest;
            SwitchCase { test: Some(build_expr(arena, ch[0])), body: ch[1..].iter().map(|&s| build_stmt(arena, s)).collect() }
        }
        Some("default-case") => SwitchCase { test: None, body: c.rest.iter().map(|&s| build_stmt(arena, s)).collect() },
        other => unreachable!("expected case/default-case, got {other:?}"),
    }
}

fn build_try(arena: &IrArena, ch: &[IrId]) -> StmtKind {
    let block = build_stmt_list(arena, ch[0]);
    let mut handler = None;
    let mut finalizer = None;
    for &id in &ch[1..] {
        let c = cell(arena, id);
        match tag(c) {
            Some("catch") => {
                let cch = &c.rest;
                let (param, body_id) = if cch.len() == 2 { (Some(build_pattern(arena, cch[0])), cch[1]) } else { (None, cch[0]) };
                handler = Some(CatchClause { param, body: build_stmt_list(arena, body_id) });
            }
            Some("finally") => {
                finalizer = Some(build_stmt_list(arena, c.rest[0]));
            }
            other => unreachable!("expected catch/finally, got {other:?}"),
        }
    }
    StmtKind::Try { block, handler, finalizer }
}

// ---- expressions ----------------------------------------------------------

fn build_expr(arena: &IrArena, id: IrId) -> Expr {
    let c = cell(arena, id);
    let source_ref = c.source_ref.clone();
    let kind = build_expr_kind(arena, id, c);
    Expr { kind, source_ref }
}

fn build_expr_kind(arena: &IrArena, id: IrId, c: &Cell) -> ExprKind {
    match &c.head {
        Atom::Num(n) => return ExprKind::Literal(Literal::Number(*n)),
        Atom::BigInt(s) => return ExprKind::Literal(Literal::BigInt(s.clone())),
        Atom::Bool(b) => return ExprKind::Literal(Literal::Bool(*b)),
        _ => {}
    }
    let Some(t) = tag(c) else { return ExprKind::Unknown(id) };
    let ch = &c.rest;
    match t {
        "string" => ExprKind::Literal(Literal::String(str_of(arena, ch[0]))),
        "null" => ExprKind::Literal(Literal::Null),
        "undefined" => ExprKind::Literal(Literal::Undefined),
        "this" => ExprKind::This,
        "super" => ExprKind::Super,
        "ident" => ExprKind::Identifier(str_of(arena, ch[0])),
        "array" => ExprKind::Array(build_array_elements(arena, ch)),
        "object" => ExprKind::Object { properties: ch.iter().map(|&p| build_object_property(arena, p)).collect() },
        "func" => ExprKind::Function(Box::new(build_func_node(arena, id, None))),
        "named-func-expr" => {
            let name = str_of(arena, ch[0]);
            ExprKind::Function(Box::new(build_func_node(arena, ch[1], Some(name))))
        }
        "arrow" => ExprKind::Arrow(Box::new(build_arrow_node(arena, ch))),
        "class" => ExprKind::Class(Box::new(build_class_node(arena, id))),
        "member" => ExprKind::Member {
            object: Box::new(build_expr(arena, ch[0])),
            property: build_property_key(arena, ch[1]),
            optional: bool_of(arena, ch[2]),
        },
        "call" => ExprKind::Call {
            callee: Box::new(build_expr(arena, ch[0])),
            args: build_call_args(arena, ch[1]),
            optional: bool_of(arena, ch[2]),
        },
        "new" => ExprKind::New { callee: Box::new(build_expr(arena, ch[0])), args: build_call_args(arena, ch[1]) },
        "unary" => ExprKind::Unary { op: unary_op(sym_of(arena, ch[0])), argument: Box::new(build_expr(arena, ch[1])) },
        "update" => ExprKind::Update {
            op: update_op(sym_of(arena, ch[0])),
            argument: Box::new(build_expr(arena, ch[1])),
            prefix: bool_of(arena, ch[2]),
        },
        "await" => ExprKind::Await(Box::new(build_expr(arena, ch[0]))),
        "binary" => ExprKind::Binary {
            op: binary_op(sym_of(arena, ch[0])),
            left: Box::new(build_expr(arena, ch[1])),
            right: Box::new(build_expr(arena, ch[2])),
        },
        "logical" => ExprKind::Logical {
            op: logical_op(sym_of(arena, ch[0])),
            left: Box::new(build_expr(arena, ch[1])),
            right: Box::new(build_expr(arena, ch[2])),
        },
        "assign" => ExprKind::Assignment {
            op: assign_op(sym_of(arena, ch[0])),
            target: Box::new(build_expr(arena, ch[1])),
            value: Box::new(build_expr(arena, ch[2])),
        },
        "conditional" => ExprKind::Conditional {
            test: Box::new(build_expr(arena, ch[0])),
            consequent: Box::new(build_expr(arena, ch[1])),
            alternate: Box::new(build_expr(arena, ch[2])),
        },
        "sequence" => ExprKind::Sequence(ch.iter().map(|&e| build_expr(arena, e)).collect()),
        "template" => ExprKind::Template(build_template_literal(arena, ch)),
        "tagged-template" => ExprKind::TaggedTemplate {
            tag: Box::new(build_expr(arena, ch[0])),
            quasi: build_template_literal(arena, &cell(arena, ch[1]).rest),
        },
        "spread" => ExprKind::Spread(Box::new(build_expr(arena, ch[0]))),
        "yield" => ExprKind::Yield { delegate: bool_of(arena, ch[0]), argument: ch.get(1).map(|&a| Box::new(build_expr(arena, a))) },
        "regexp" => ExprKind::RegExp { pattern: str_of(arena, ch[0]), flags: str_of(arena, ch[1]) },
        _ => ExprKind::Unknown(id),
    }
}

fn build_array_elements(arena: &IrArena, ch: &[IrId]) -> Vec<ArrayElement> {
    ch.iter()
        .map(|&e| {
            let c = cell(arena, e);
            match tag(c) {
                Some("hole") => ArrayElement::Hole,
                Some("spread") => ArrayElement::Spread(build_expr(arena, c.rest[0])),
                _ => ArrayElement::Item(build_expr(arena, e)),
            }
        })
        .collect()
}

fn build_call_args(arena: &IrArena, args_id: IrId) -> CallArgs {
    let ch = &cell(arena, args_id).rest;
    CallArgs { args: build_array_elements(arena, ch) }
}

fn build_object_property(arena: &IrArena, id: IrId) -> ObjectProperty {
    let c = cell(arena, id);
    let ch = &c.rest;
    match tag(c) {
        Some("kv-prop") => ObjectProperty::KeyValue {
            key: build_property_key(arena, ch[0]),
            value: build_expr(arena, ch[1]),
            shorthand: bool_of(arena, ch[2]),
        },
        Some("method-prop") => ObjectProperty::Method { key: build_property_key(arena, ch[0]), def: build_func_node(arena, ch[1], None) },
        Some("getter-prop") => ObjectProperty::Getter { key: build_property_key(arena, ch[0]), def: build_func_node(arena, ch[1], None) },
        Some("setter-prop") => ObjectProperty::Setter { key: build_property_key(arena, ch[0]), def: build_func_node(arena, ch[1], None) },
        Some("spread") => ObjectProperty::Spread(build_expr(arena, ch[0])),
        other => unreachable!("unexpected object property tag {other:?}"),
    }
}

fn build_template_literal(arena: &IrArena, ch: &[IrId]) -> TemplateLiteral {
    let quasis = cell(arena, ch[0]).rest.iter().map(|&s| str_of(arena, s)).collect();
    let raw_quasis = cell(arena, ch[1]).rest.iter().map(|&s| str_of(arena, s)).collect();
    let expressions = cell(arena, ch[2]).rest.iter().map(|&e| build_expr(arena, e)).collect();
    TemplateLiteral { quasis, raw_quasis, expressions }
}

fn build_property_key(arena: &IrArena, id: IrId) -> PropertyKey {
    let c = cell(arena, id);
    let ch = &c.rest;
    match tag(c) {
        Some("key-ident") => PropertyKey::Identifier(str_of(arena, ch[0])),
        Some("key-private") => PropertyKey::Private(str_of(arena, ch[0])),
        Some("key-string") => PropertyKey::String(str_of(arena, ch[0])),
        Some("key-number") => PropertyKey::Number(num_of(arena, ch[0])),
        Some("key-computed") => PropertyKey::Computed(Box::new(build_expr(arena, ch[0]))),
        other => unreachable!("unexpected property key tag {other:?}"),
    }
}

// ---- functions & classes --------------------------------------------------

/// Builds a `func`-tagged node: `[params, block, is_async, is_generator, kind]`.
fn build_func_node(arena: &IrArena, id: IrId, name: Option<String>) -> FunctionDef {
    let ch = &cell(arena, id).rest;
    let params = build_params(arena, ch[0]);
    let body = FunctionBody::Block(build_stmt_list(arena, ch[1]));
    let is_async = bool_of(arena, ch[2]);
    let is_generator = bool_of(arena, ch[3]);
    let kind = function_kind(sym_of(arena, ch[4]));
    FunctionDef { name, params, body, is_async, is_generator, kind }
}

/// Builds an `arrow`-tagged node: `[params, arrow_body, is_async, is_generator, kind]`.
fn build_arrow_node(arena: &IrArena, ch: &[IrId]) -> FunctionDef {
    let params = build_params(arena, ch[0]);
    let body_cell = cell(arena, ch[1]);
    let body = match tag(body_cell) {
        Some("body-block-ref") => FunctionBody::Block(build_stmt_list(arena, body_cell.rest[0])),
        Some("body-expr") => FunctionBody::Expression(Box::new(build_expr(arena, body_cell.rest[0]))),
        other => unreachable!("unexpected arrow body tag {other:?}"),
    };
    let is_async = bool_of(arena, ch[2]);
    let is_generator = bool_of(arena, ch[3]);
    FunctionDef { name: None, params, body, is_async, is_generator, kind: FunctionKind::Arrow }
}

fn function_kind(tag: &str) -> FunctionKind {
    match tag {
        "normal" => FunctionKind::Normal,
        "arrow" => FunctionKind::Arrow,
        "method" => FunctionKind::Method,
        "getter" => FunctionKind::Getter,
        "setter" => FunctionKind::Setter,
        other => unreachable!("unknown function kind tag {other}"),
    }
}

fn build_params(arena: &IrArena, params_id: IrId) -> Vec<Param> {
    cell(arena, params_id).rest.iter().map(|&p| build_param(arena, p)).collect()
}

fn build_param(arena: &IrArena, id: IrId) -> Param {
    let ch = &cell(arena, id).rest;
    let pattern = build_pattern(arena, ch[0]);
    let is_rest = bool_of(arena, ch[1]);
    let default = ch.get(2).map(|&d| build_expr(arena, d));
    Param { pattern, default, is_rest }
}

/// Builds a `class`-tagged node: `[name, has-super|no-super, class-member...]`.
fn build_class_node(arena: &IrArena, id: IrId) -> ClassDef {
    let ch = &cell(arena, id).rest;
    let raw_name = str_of(arena, ch[0]);
    let name = if raw_name.is_empty() { None } else { Some(raw_name) };
    let super_cell = cell(arena, ch[1]);
    let superclass = match tag(super_cell) {
        Some("has-super") => Some(Box::new(build_expr(arena, super_cell.rest[0]))),
        Some("no-super") => None,
        other => unreachable!("unexpected superclass tag {other:?}"),
    };
    let members = ch[2..].iter().map(|&m| build_class_member(arena, m)).collect();
    ClassDef { name, superclass, members }
}

fn build_class_member(arena: &IrArena, id: IrId) -> ClassMember {
    let ch = &cell(arena, id).rest;
    let key = build_property_key(arena, ch[0]);
    let is_static = bool_of(arena, ch[1]);
    let is_private = bool_of(arena, ch[2]);
    let member_cell = cell(arena, ch[3]);
    let kind = match tag(member_cell) {
        Some("field") => ClassMemberKind::Field(member_cell.rest.first().map(|&v| build_expr(arena, v))),
        Some("func") => {
            let def = build_func_node(arena, ch[3], None);
            match def.kind {
                FunctionKind::Getter => ClassMemberKind::Getter(def),
                FunctionKind::Setter => ClassMemberKind::Setter(def),
                _ if !is_static && matches!(&key, PropertyKey::Identifier(n) if n == "constructor") => {
                    ClassMemberKind::Method(FunctionDef { kind: FunctionKind::Constructor, ..def })
                }
                _ => ClassMemberKind::Method(def),
            }
        }
        other => unreachable!("unexpected class member kind tag {other:?}"),
    };
    ClassMember { key, is_static, is_private, kind }
}

// ---- patterns --------------------------------------------------------------

fn build_pattern(arena: &IrArena, id: IrId) -> Pattern {
    let c = cell(arena, id);
    let ch = &c.rest;
    match tag(c) {
        Some("pat-ident") => Pattern::Identifier(str_of(arena, ch[0])),
        Some("pat-assign") => {
            Pattern::Assignment { pattern: Box::new(build_pattern(arena, ch[0])), default: Box::new(build_expr(arena, ch[1])) }
        }
        Some("pat-array") => build_array_pattern(arena, ch),
        Some("pat-object") => build_object_pattern(arena, ch),
        other => unreachable!("unexpected pattern tag {other:?}"),
    }
}

fn build_array_pattern(arena: &IrArena, ch: &[IrId]) -> Pattern {
    let mut elements = Vec::new();
    let mut rest = None;
    for &id in ch {
        let c = cell(arena, id);
        match tag(c) {
            Some("pat-hole") => elements.push(None),
            Some("pat-rest") => {
                rest = Some(Box::new(build_pattern(arena, c.rest[0])));
                break;
            }
            _ => elements.push(Some(build_pattern(arena, id))),
        }
    }
    Pattern::Array { elements, rest }
}

fn build_object_pattern(arena: &IrArena, ch: &[IrId]) -> Pattern {
    let mut properties = Vec::new();
    let mut rest = None;
    for &id in ch {
        let c = cell(arena, id);
        match tag(c) {
            Some("pat-rest") => {
                rest = Some(Box::new(build_pattern(arena, c.rest[0])));
                break;
            }
            Some("pat-prop") => {
                let pch = &c.rest;
                properties.push((build_property_key(arena, pch[0]), build_pattern(arena, pch[1])));
            }
            other => unreachable!("unexpected object pattern entry tag {other:?}"),
        }
    }
    Pattern::Object { properties, rest }
}

/// Re-interprets an already-built expression as a destructuring-assignment
/// target — the shape `for (x in y)`/`for ([a, b] of pairs)` need when no
/// `var`/`let`/`const` keyword introduces a fresh binding, and arbitrary
/// `[a, b] = arr` assignment expressions need on their left-hand side.
/// `parser.rs` parses these targets as plain expressions (it can't know
/// they're destructuring patterns until it sees the following `=`/`in`/`of`),
/// so the conversion happens here instead of in the parser.
fn expr_to_pattern(expr: Expr) -> Pattern {
    match expr.kind {
        ExprKind::Identifier(name) => Pattern::Identifier(name),
        ExprKind::Member { .. } => Pattern::MemberTarget(Box::new(expr)),
        ExprKind::Array(elements) => {
            let mut out = Vec::new();
            let mut rest = None;
            for el in elements {
                match el {
                    ArrayElement::Hole => out.push(None),
                    ArrayElement::Spread(e) => {
                        rest = Some(Box::new(expr_to_pattern(e)));
                        break;
                    }
                    ArrayElement::Item(e) => out.push(Some(expr_to_pattern(e))),
                }
            }
            Pattern::Array { elements: out, rest }
        }
        ExprKind::Object { properties } => {
            let mut out = Vec::new();
            let mut rest = None;
            for prop in properties {
                match prop {
                    ObjectProperty::KeyValue { key, value, .. } => out.push((key, expr_to_pattern(value))),
                    ObjectProperty::Spread(e) => {
                        rest = Some(Box::new(expr_to_pattern(e)));
                        break;
                    }
                    _ => {}
                }
            }
            Pattern::Object { properties: out, rest }
        }
        ExprKind::Assignment { target, value, .. } => Pattern::Assignment { pattern: Box::new(expr_to_pattern(*target)), default: value },
        _ => Pattern::MemberTarget(Box::new(expr)),
    }
}

// ---- operator tag -> typed enum -------------------------------------------

fn unary_op(s: &str) -> UnaryOp {
    match s {
        "neg" => UnaryOp::Neg,
        "pos" => UnaryOp::Plus,
        "not" => UnaryOp::Not,
        "bitnot" => UnaryOp::BitNot,
        "typeof" => UnaryOp::Typeof,
        "void" => UnaryOp::Void,
        "delete" => UnaryOp::Delete,
        other => unreachable!("unknown unary op {other}"),
    }
}

fn update_op(s: &str) -> UpdateOp {
    match s {
        "++" => UpdateOp::Increment,
        "--" => UpdateOp::Decrement,
        other => unreachable!("unknown update op {other}"),
    }
}

fn binary_op(s: &str) -> BinaryOp {
    match s {
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        "*" => BinaryOp::Mul,
        "/" => BinaryOp::Div,
        "%" => BinaryOp::Mod,
        "**" => BinaryOp::Pow,
        "&" => BinaryOp::BitAnd,
        "|" => BinaryOp::BitOr,
        "^" => BinaryOp::BitXor,
        "<<" => BinaryOp::Shl,
        ">>" => BinaryOp::Shr,
        ">>>" => BinaryOp::UShr,
        "<" => BinaryOp::Lt,
        ">" => BinaryOp::Gt,
        "<=" => BinaryOp::LtEq,
        ">=" => BinaryOp::GtEq,
        "==" => BinaryOp::Eq,
        "!=" => BinaryOp::NotEq,
        "===" => BinaryOp::StrictEq,
        "!==" => BinaryOp::StrictNotEq,
        "in" => BinaryOp::In,
        "instanceof" => BinaryOp::Instanceof,
        other => unreachable!("unknown binary op {other}"),
    }
}

fn logical_op(s: &str) -> LogicalOp {
    match s {
        "||" => LogicalOp::Or,
        "&&" => LogicalOp::And,
        "??" => LogicalOp::Nullish,
        other => unreachable!("unknown logical op {other}"),
    }
}

fn assign_op(s: &str) -> AssignOp {
    match s {
        "=" => AssignOp::Assign,
        "+=" => AssignOp::Add,
        "-=" => AssignOp::Sub,
        "*=" => AssignOp::Mul,
        "/=" => AssignOp::Div,
        "%=" => AssignOp::Mod,
        "**=" => AssignOp::Pow,
        "<<=" => AssignOp::Shl,
        ">>=" => AssignOp::Shr,
        ">>>=" => AssignOp::UShr,
        "&=" => AssignOp::BitAnd,
        "|=" => AssignOp::BitOr,
        "^=" => AssignOp::BitXor,
        "&&=" => AssignOp::LogicalAnd,
        "||=" => AssignOp::LogicalOr,
        "??=" => AssignOp::Nullish,
        other => unreachable!("unknown assign op {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use crate::source::SourceHandle;

    fn build_source(src: &str) -> Program {
        let handle = SourceHandle::new("t.js", src);
        let parsed = parser::parse(handle).expect("parses");
        build(&parsed.arena, parsed.program)
    }

    #[test]
    fn lifts_var_decl_and_binary() {
        let program = build_source("let x = 1 + 2;");
        assert_eq!(program.body.len(), 1);
        let StmtKind::VariableDeclaration(decl) = &program.body[0].kind else { panic!("expected var decl") };
        assert_eq!(decl.kind, VarKind::Let);
        let Some(Expr { kind: ExprKind::Binary { op: BinaryOp::Add, .. }, .. }) = &decl.bindings[0].init else {
            panic!("expected binary init")
        };
    }

    #[test]
    fn lifts_function_declaration_with_params() {
        let program = build_source("function f(a, b = 2, ...rest) { return a; }");
        let StmtKind::FunctionDeclaration { name, def } = &program.body[0].kind else { panic!("expected func decl") };
        assert_eq!(name, "f");
        assert_eq!(def.params.len(), 3);
        assert!(def.params[2].is_rest);
        assert!(matches!(def.params[1].default, Some(_)));
    }

    #[test]
    fn lifts_arrow_with_expression_body() {
        let program = build_source("const f = x => x * 2;");
        let StmtKind::VariableDeclaration(decl) = &program.body[0].kind else { panic!() };
        let Some(Expr { kind: ExprKind::Arrow(def), .. }) = &decl.bindings[0].init else { panic!() };
        assert!(matches!(def.body, FunctionBody::Expression(_)));
    }

    #[test]
    fn lifts_destructuring_for_of() {
        let program = build_source("for (const [k, v] of entries) { use(k, v); }");
        let StmtKind::ForOf { is_await, inner } = &program.body[0].kind else { panic!("expected for-of") };
        assert!(!is_await);
        assert!(matches!(inner.pattern, Pattern::Array { .. }));
    }

    #[test]
    fn lifts_class_with_constructor_and_private_field() {
        let program = build_source("class C { #x = 1; constructor() { this.#x = 2; } get val() { return this.#x; } }");
        let StmtKind::ClassDeclaration { def, .. } = &program.body[0].kind else { panic!("expected class decl") };
        assert_eq!(def.members.len(), 3);
        assert!(matches!(def.members[0].kind, ClassMemberKind::Field(_)));
        assert!(def.members[0].is_private);
        assert!(matches!(def.members[1].kind, ClassMemberKind::Method(FunctionDef { kind: FunctionKind::Constructor, .. })));
        assert!(matches!(def.members[2].kind, ClassMemberKind::Getter(_)));
    }

    #[test]
    fn use_strict_directive_sets_program_strict() {
        let program = build_source("\"use strict\";\nlet x = 1;");
        assert!(program.strict);
    }

    #[test]
    fn plain_assignment_target_reinterpreted_as_pattern() {
        let program = build_source("for ([a, b] in obj) {}");
        let StmtKind::ForIn(inner) = &program.body[0].kind else { panic!("expected for-in") };
        assert_eq!(inner.binding_kind, ForBindingKind::Assign);
        assert!(matches!(inner.pattern, Pattern::Array { .. }));
    }
}
