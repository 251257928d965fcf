//! Constant folding over the typed AST (`§4.4`): folds `Binary`/`Logical`/
//! `Unary` nodes whose operands are themselves already `Literal` after
//! being recursively folded, and only when the operation is deterministic
//! (no coercion that could call user code — impossible here anyway, since
//! a `Literal` can never be a heap object). Anything that doesn't meet that
//! bar — mixed `BigInt`/`Number` arithmetic, `in`/`instanceof`, `delete` —
//! is left as the original node; the evaluator still handles it correctly
//! at runtime, just without the constant having been precomputed.
//!
//! Folding mutates the tree in place rather than rebuilding it, so an
//! unchanged subtree really is the same allocation it started as —
//! `§4.4`'s "returns the same tree object when nothing changed" read as
//! identity-stability of the owned tree, the closest analogue available
//! without reference-counted AST nodes.

use num_bigint::BigInt;
use num_traits::Zero;

use crate::ast::*;

pub(crate) fn fold_program(program: &mut Program) {
    fold_stmts(&mut program.body);
}

fn fold_stmts(stmts: &mut [Stmt]) {
    for stmt in stmts {
        fold_stmt(stmt);
    }
}

fn fold_stmt(stmt: &mut Stmt) {
    match &mut stmt.kind {
        StmtKind::Block(body) => fold_stmts(body),
        StmtKind::ExpressionStatement(expr) => fold_expr(expr),
        StmtKind::VariableDeclaration(decl) => {
            for binding in &mut decl.bindings {
                fold_pattern(&mut binding.pattern);
                if let Some(init) = &mut binding.init {
                    fold_expr(init);
                }
            }
        }
        StmtKind::FunctionDeclaration { def, .. } => fold_function_def(def),
        StmtKind::ClassDeclaration { def, .. } => fold_class_def(def),
        StmtKind::If { test, consequent, alternate } => {
            fold_expr(test);
            fold_stmt(consequent);
            if let Some(alt) = alternate {
                fold_stmt(alt);
            }
        }
        StmtKind::For { head, body } => {
            if let Some(init) = &mut head.init {
                fold_stmt(init);
            }
            if let Some(test) = &mut head.test {
                fold_expr(test);
            }
            if let Some(update) = &mut head.update {
                fold_expr(update);
            }
            fold_stmt(body);
        }
        StmtKind::ForIn(inner) => fold_for_in_of(inner),
        StmtKind::ForOf { inner, .. } => fold_for_in_of(inner),
        StmtKind::While { test, body } | StmtKind::DoWhile { test, body } => {
            fold_expr(test);
            fold_stmt(body);
        }
        StmtKind::Switch { discriminant, cases } => {
            fold_expr(discriminant);
            for case in cases {
                if let Some(test) = &mut case.test {
                    fold_expr(test);
                }
                fold_stmts(&mut case.body);
            }
        }
        StmtKind::Try { block, handler, finalizer } => {
            fold_stmts(block);
            if let Some(handler) = handler {
                if let Some(param) = &mut handler.param {
                    fold_pattern(param);
                }
                fold_stmts(&mut handler.body);
            }
            if let Some(finalizer) = finalizer {
                fold_stmts(finalizer);
            }
        }
        StmtKind::Throw(expr) => fold_expr(expr),
        StmtKind::Return(expr) => {
            if let Some(expr) = expr {
                fold_expr(expr);
            }
        }
        StmtKind::Labeled { body, .. } => fold_stmt(body),
        StmtKind::Break(_) | StmtKind::Continue(_) | StmtKind::Empty | StmtKind::Debugger | StmtKind::Unknown(_) => {}
    }
}

fn fold_for_in_of(inner: &mut ForInOf) {
    fold_pattern(&mut inner.pattern);
    fold_expr(&mut inner.right);
    fold_stmt(&mut inner.body);
}

fn fold_function_def(def: &mut FunctionDef) {
    for param in &mut def.params {
        fold_pattern(&mut param.pattern);
        if let Some(default) = &mut param.default {
            fold_expr(default);
        }
    }
    match &mut def.body {
        FunctionBody::Block(stmts) => fold_stmts(stmts),
        FunctionBody::Expression(expr) => fold_expr(expr),
    }
}

fn fold_class_def(def: &mut ClassDef) {
    if let Some(superclass) = &mut def.superclass {
        fold_expr(superclass);
    }
    for member in &mut def.members {
        fold_property_key(&mut member.key);
        match &mut member.kind {
            ClassMemberKind::Method(def) | ClassMemberKind::Getter(def) | ClassMemberKind::Setter(def) => fold_function_def(def),
            ClassMemberKind::Field(value) => {
                if let Some(value) = value {
                    fold_expr(value);
                }
            }
        }
    }
}

fn fold_pattern(pattern: &mut Pattern) {
    match pattern {
        Pattern::Identifier(_) => {}
        Pattern::Array { elements, rest } => {
            for element in elements.iter_mut().flatten() {
                fold_pattern(element);
            }
            if let Some(rest) = rest {
                fold_pattern(rest);
            }
        }
        Pattern::Object { properties, rest } => {
            for (key, pattern) in properties {
                fold_property_key(key);
                fold_pattern(pattern);
            }
            if let Some(rest) = rest {
                fold_pattern(rest);
            }
        }
        Pattern::Assignment { pattern, default } => {
            fold_pattern(pattern);
            fold_expr(default);
        }
        Pattern::MemberTarget(expr) => fold_expr(expr),
    }
}

fn fold_property_key(key: &mut PropertyKey) {
    if let PropertyKey::Computed(expr) = key {
        fold_expr(expr);
    }
}

fn fold_array_elements(elements: &mut [ArrayElement]) {
    for element in elements {
        match element {
            ArrayElement::Item(expr) | ArrayElement::Spread(expr) => fold_expr(expr),
            ArrayElement::Hole => {}
        }
    }
}

fn fold_expr(expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Literal(_) | ExprKind::Identifier(_) | ExprKind::This | ExprKind::Super | ExprKind::RegExp { .. } | ExprKind::Unknown(_) => {}
        ExprKind::Array(elements) => fold_array_elements(elements),
        ExprKind::Object { properties } => {
            for prop in properties {
                match prop {
                    ObjectProperty::KeyValue { key, value, .. } => {
                        fold_property_key(key);
                        fold_expr(value);
                    }
                    ObjectProperty::Method { key, def } | ObjectProperty::Getter { key, def } | ObjectProperty::Setter { key, def } => {
                        fold_property_key(key);
                        fold_function_def(def);
                    }
                    ObjectProperty::Spread(expr) => fold_expr(expr),
                }
            }
        }
        ExprKind::Function(def) | ExprKind::Arrow(def) => fold_function_def(def),
        ExprKind::Class(def) => fold_class_def(def),
        ExprKind::Member { object, property, .. } => {
            fold_expr(object);
            fold_property_key(property);
        }
        ExprKind::Call { callee, args, .. } => {
            fold_expr(callee);
            fold_array_elements(&mut args.args);
        }
        ExprKind::New { callee, args } => {
            fold_expr(callee);
            fold_array_elements(&mut args.args);
        }
        ExprKind::Unary { op, argument } => {
            fold_expr(argument);
            if let ExprKind::Literal(lit) = &argument.kind {
                if let Some(folded) = try_fold_unary(*op, lit) {
                    expr.kind = ExprKind::Literal(folded);
                }
            }
        }
        ExprKind::Update { argument, .. } => fold_expr(argument),
        ExprKind::Binary { op, left, right } => {
            fold_expr(left);
            fold_expr(right);
            if let (ExprKind::Literal(l), ExprKind::Literal(r)) = (&left.kind, &right.kind) {
                if let Some(folded) = try_fold_binary(*op, l, r) {
                    expr.kind = ExprKind::Literal(folded);
                }
            }
        }
        ExprKind::Logical { op, left, right } => {
            fold_expr(left);
            fold_expr(right);
            if let (ExprKind::Literal(l), ExprKind::Literal(r)) = (&left.kind, &right.kind) {
                expr.kind = ExprKind::Literal(fold_logical(*op, l, r));
            }
        }
        ExprKind::Assignment { target, value, .. } => {
            fold_expr(target);
            fold_expr(value);
        }
        ExprKind::Conditional { test, consequent, alternate } => {
            fold_expr(test);
            fold_stmt_like_expr(consequent);
            fold_stmt_like_expr(alternate);
        }
        ExprKind::Sequence(exprs) => {
            for expr in exprs {
                fold_expr(expr);
            }
        }
        ExprKind::Template(tpl) => {
            for expr in &mut tpl.expressions {
                fold_expr(expr);
            }
        }
        ExprKind::TaggedTemplate { tag, quasi } => {
            fold_expr(tag);
            for expr in &mut quasi.expressions {
                fold_expr(expr);
            }
        }
        ExprKind::Spread(inner) | ExprKind::Await(inner) => fold_expr(inner),
        ExprKind::Yield { argument, .. } => {
            if let Some(argument) = argument {
                fold_expr(argument);
            }
        }
    }
}

/// `fold_expr` takes `&mut Expr`; `Conditional`'s branches are `Box<Expr>`,
/// which derefs the same way — named separately only so the call site above
/// reads as operating on expressions, not implementation plumbing.
fn fold_stmt_like_expr(expr: &mut Expr) {
    fold_expr(expr);
}

// ---- literal coercions (restricted to the six primitive `Literal` kinds) --

fn to_boolean(lit: &Literal) -> bool {
    match lit {
        Literal::Number(n) => *n != 0.0 && !n.is_nan(),
        Literal::BigInt(s) => !parse_bigint(s).is_zero(),
        Literal::String(s) => !s.is_empty(),
        Literal::Bool(b) => *b,
        Literal::Null | Literal::Undefined => false,
    }
}

/// ToNumber, restricted to non-`BigInt` literals — `BigInt` has no implicit
/// numeric conversion in ECMAScript (`5 + 1n` throws, `Number(1n)` needs an
/// explicit call), so callers must branch on `BigInt` before reaching this.
fn to_number(lit: &Literal) -> f64 {
    match lit {
        Literal::Number(n) => *n,
        Literal::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Literal::Null => 0.0,
        Literal::Undefined => f64::NAN,
        Literal::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Literal::BigInt(_) => unreachable!("ToNumber(BigInt) callers must branch before calling to_number"),
    }
}

fn to_js_string(lit: &Literal) -> String {
    match lit {
        Literal::Number(n) => format_number(*n),
        Literal::BigInt(s) => s.clone(),
        Literal::String(s) => s.clone(),
        Literal::Bool(b) => b.to_string(),
        Literal::Null => "null".to_owned(),
        Literal::Undefined => "undefined".to_owned(),
    }
}

/// Approximates ECMAScript's `Number::toString` for the folder's purposes:
/// exact for integers and the common decimal cases constant expressions
/// produce; doesn't replicate the shortest-round-trip grisu algorithm the
/// full runtime's `ToString` (not yet written) will need for every double.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity".to_owned() } else { "-Infinity".to_owned() };
    }
    if n == 0.0 {
        return "0".to_owned();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        return format!("{n:.0}");
    }
    format!("{n}")
}

fn parse_bigint(digits: &str) -> BigInt {
    digits.parse().unwrap_or_else(|_| BigInt::zero())
}

fn try_fold_unary(op: UnaryOp, lit: &Literal) -> Option<Literal> {
    match op {
        UnaryOp::Neg => match lit {
            Literal::BigInt(s) => Some(Literal::BigInt((-parse_bigint(s)).to_string())),
            other => Some(Literal::Number(-to_number(other))),
        },
        UnaryOp::Plus => match lit {
            Literal::BigInt(_) => None, // unary `+` on a BigInt throws TypeError at runtime.
            other => Some(Literal::Number(to_number(other))),
        },
        UnaryOp::Not => Some(Literal::Bool(!to_boolean(lit))),
        UnaryOp::BitNot => match lit {
            Literal::BigInt(s) => Some(Literal::BigInt((!parse_bigint(s)).to_string())),
            other => Some(Literal::Number(f64::from(!to_int32(to_number(other))))),
        },
        UnaryOp::Typeof => Some(Literal::String(
            match lit {
                Literal::Number(_) => "number",
                Literal::BigInt(_) => "bigint",
                Literal::String(_) => "string",
                Literal::Bool(_) => "boolean",
                Literal::Undefined => "undefined",
                Literal::Null => "object",
            }
            .to_owned(),
        )),
        UnaryOp::Void => Some(Literal::Undefined),
        UnaryOp::Delete => None, // only meaningful against a member expression target.
    }
}

fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    let truncated = n.trunc();
    let modulo = truncated.rem_euclid(4294967296.0);
    if modulo >= 2147483648.0 {
        (modulo - 4294967296.0) as i32
    } else {
        modulo as i32
    }
}

fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4294967296.0) as u32
}

fn try_fold_binary(op: BinaryOp, l: &Literal, r: &Literal) -> Option<Literal> {
    // `in`/`instanceof` always need a runtime object on the right; neither
    // is ever deterministic over bare literals.
    if matches!(op, BinaryOp::In | BinaryOp::Instanceof) {
        return None;
    }
    let both_bigint = matches!((l, r), (Literal::BigInt(_), Literal::BigInt(_)));
    let either_bigint = matches!(l, Literal::BigInt(_)) || matches!(r, Literal::BigInt(_));
    if either_bigint && !both_bigint {
        // `1n + 1` throws TypeError at runtime; the folder must not turn
        // that failure into a silently-produced constant.
        return match op {
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => {
                // Loose/strict equality between a BigInt and a non-BigInt
                // never throws — it's just never `true` unless the other
                // side is a numeric string that parses to the same value.
                try_fold_equality(op, l, r)
            }
            _ => None,
        };
    }
    if both_bigint {
        return try_fold_bigint_binary(op, l, r);
    }
    match op {
        BinaryOp::Add => {
            if matches!(l, Literal::String(_)) || matches!(r, Literal::String(_)) {
                Some(Literal::String(to_js_string(l) + &to_js_string(r)))
            } else {
                Some(Literal::Number(to_number(l) + to_number(r)))
            }
        }
        BinaryOp::Sub => Some(Literal::Number(to_number(l) - to_number(r))),
        BinaryOp::Mul => Some(Literal::Number(to_number(l) * to_number(r))),
        BinaryOp::Div => Some(Literal::Number(to_number(l) / to_number(r))),
        BinaryOp::Mod => Some(Literal::Number(to_number(l) % to_number(r))),
        BinaryOp::Pow => Some(Literal::Number(to_number(l).powf(to_number(r)))),
        BinaryOp::BitAnd => Some(Literal::Number(f64::from(to_int32(to_number(l)) & to_int32(to_number(r))))),
        BinaryOp::BitOr => Some(Literal::Number(f64::from(to_int32(to_number(l)) | to_int32(to_number(r))))),
        BinaryOp::BitXor => Some(Literal::Number(f64::from(to_int32(to_number(l)) ^ to_int32(to_number(r))))),
        BinaryOp::Shl => Some(Literal::Number(f64::from(to_int32(to_number(l)).wrapping_shl(to_uint32(to_number(r)) & 31)))),
        BinaryOp::Shr => Some(Literal::Number(f64::from(to_int32(to_number(l)).wrapping_shr(to_uint32(to_number(r)) & 31)))),
        BinaryOp::UShr => Some(Literal::Number(f64::from(to_uint32(to_number(l)).wrapping_shr(to_uint32(to_number(r)) & 31)))),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => try_fold_relational(op, l, r),
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => try_fold_equality(op, l, r),
        BinaryOp::In | BinaryOp::Instanceof => unreachable!("handled above"),
    }
}

fn try_fold_bigint_binary(op: BinaryOp, l: &Literal, r: &Literal) -> Option<Literal> {
    let (Literal::BigInt(ls), Literal::BigInt(rs)) = (l, r) else { unreachable!("caller checked both_bigint") };
    let (a, b) = (parse_bigint(ls), parse_bigint(rs));
    match op {
        BinaryOp::Add => Some(Literal::BigInt((a + b).to_string())),
        BinaryOp::Sub => Some(Literal::BigInt((a - b).to_string())),
        BinaryOp::Mul => Some(Literal::BigInt((a * b).to_string())),
        BinaryOp::Div => {
            if b.is_zero() {
                None // division by zero throws RangeError for BigInt; let the evaluator raise it.
            } else {
                Some(Literal::BigInt((a / b).to_string()))
            }
        }
        BinaryOp::Mod => {
            if b.is_zero() {
                None
            } else {
                Some(Literal::BigInt((a % b).to_string()))
            }
        }
        BinaryOp::Pow => {
            use num_traits::ToPrimitive;
            b.to_u32().map(|exp| Literal::BigInt(a.pow(exp).to_string()))
        }
        BinaryOp::BitAnd => Some(Literal::BigInt((a & b).to_string())),
        BinaryOp::BitOr => Some(Literal::BigInt((a | b).to_string())),
        BinaryOp::BitXor => Some(Literal::BigInt((a ^ b).to_string())),
        BinaryOp::Lt => Some(Literal::Bool(a < b)),
        BinaryOp::Gt => Some(Literal::Bool(a > b)),
        BinaryOp::LtEq => Some(Literal::Bool(a <= b)),
        BinaryOp::GtEq => Some(Literal::Bool(a >= b)),
        BinaryOp::Eq | BinaryOp::StrictEq => Some(Literal::Bool(a == b)),
        BinaryOp::NotEq | BinaryOp::StrictNotEq => Some(Literal::Bool(a != b)),
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr | BinaryOp::In | BinaryOp::Instanceof => None,
    }
}

fn try_fold_relational(op: BinaryOp, l: &Literal, r: &Literal) -> Option<Literal> {
    let ordering = if let (Literal::String(a), Literal::String(b)) = (l, r) {
        a.partial_cmp(b)
    } else {
        let (a, b) = (to_number(l), to_number(r));
        if a.is_nan() || b.is_nan() {
            return Some(Literal::Bool(false));
        }
        a.partial_cmp(&b)
    };
    let Some(ordering) = ordering else { return Some(Literal::Bool(false)) };
    let result = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::LtEq => ordering.is_le(),
        BinaryOp::GtEq => ordering.is_ge(),
        _ => unreachable!("caller only passes relational ops"),
    };
    Some(Literal::Bool(result))
}

/// Strict and loose equality, restricted to the six primitive `Literal`
/// kinds — tractable to fold exactly because no operand can be a heap
/// object (`§7.2.13`/`§7.2.14` of ECMA-262, minus every object branch).
fn try_fold_equality(op: BinaryOp, l: &Literal, r: &Literal) -> Option<Literal> {
    let strict = matches!(op, BinaryOp::StrictEq | BinaryOp::StrictNotEq);
    let eq = if strict { strict_eq(l, r) } else { loose_eq(l, r) };
    let result = if matches!(op, BinaryOp::NotEq | BinaryOp::StrictNotEq) { !eq } else { eq };
    Some(Literal::Bool(result))
}

fn strict_eq(l: &Literal, r: &Literal) -> bool {
    match (l, r) {
        (Literal::Number(a), Literal::Number(b)) => a == b,
        (Literal::BigInt(a), Literal::BigInt(b)) => parse_bigint(a) == parse_bigint(b),
        (Literal::String(a), Literal::String(b)) => a == b,
        (Literal::Bool(a), Literal::Bool(b)) => a == b,
        (Literal::Null, Literal::Null) | (Literal::Undefined, Literal::Undefined) => true,
        _ => false,
    }
}

fn loose_eq(l: &Literal, r: &Literal) -> bool {
    use Literal::*;
    match (l, r) {
        (Null | Undefined, Null | Undefined) => true,
        (Null, _) | (_, Null) | (Undefined, _) | (_, Undefined) => false,
        (Number(_), Number(_)) | (String(_), String(_)) | (Bool(_), Bool(_)) => strict_eq(l, r),
        (BigInt(a), BigInt(b)) => parse_bigint(a) == parse_bigint(b),
        (Number(a), String(s)) | (String(s), Number(a)) => *a == to_number(&String(s.clone())),
        (BigInt(a), String(s)) | (String(s), BigInt(a)) => s.trim().parse::<BigInt>().is_ok_and(|parsed| parsed == parse_bigint(a)),
        (BigInt(a), Number(b)) | (Number(b), BigInt(a)) => b.fract() == 0.0 && parse_bigint(a) == BigInt::from(*b as i64),
        (Bool(b), other) | (other, Bool(b)) => loose_eq(&Number(if *b { 1.0 } else { 0.0 }), other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build;
    use crate::parser;
    use crate::source::SourceHandle;

    fn fold_source(src: &str) -> Program {
        let handle = SourceHandle::new("t.js", src);
        let parsed = parser::parse(handle).expect("parses");
        let mut program = build::build(&parsed.arena, parsed.program);
        fold_program(&mut program);
        program
    }

    fn first_expr(program: &Program) -> &Expr {
        let StmtKind::ExpressionStatement(expr) = &program.body[0].kind else { panic!("expected expression statement") };
        expr
    }

    #[test]
    fn folds_arithmetic() {
        let program = fold_source("1 + 2 * 3;");
        assert!(matches!(first_expr(&program).kind, ExprKind::Literal(Literal::Number(n)) if n == 7.0));
    }

    #[test]
    fn folds_string_concatenation() {
        let program = fold_source("'a' + 'b' + 1;");
        assert!(matches!(&first_expr(&program).kind, ExprKind::Literal(Literal::String(s)) if s == "ab1"));
    }

    #[test]
    fn does_not_fold_non_literal_operands() {
        let program = fold_source("1 + x;");
        assert!(matches!(first_expr(&program).kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn does_not_fold_mixed_bigint_and_number_arithmetic() {
        let program = fold_source("1n + 1;");
        assert!(matches!(first_expr(&program).kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn folds_bigint_arithmetic() {
        let program = fold_source("10n * 3n;");
        assert!(matches!(&first_expr(&program).kind, ExprKind::Literal(Literal::BigInt(s)) if s == "30"));
    }

    #[test]
    fn folds_logical_short_circuit() {
        let program = fold_source("true && false;");
        assert!(matches!(first_expr(&program).kind, ExprKind::Literal(Literal::Bool(false))));
    }

    #[test]
    fn folds_nested_inside_function_body() {
        let program = fold_source("function f() { return 2 * 3; }");
        let StmtKind::FunctionDeclaration { def, .. } = &program.body[0].kind else { panic!() };
        let FunctionBody::Block(body) = &def.body else { panic!() };
        let StmtKind::Return(Some(expr)) = &body[0].kind else { panic!() };
        assert!(matches!(expr.kind, ExprKind::Literal(Literal::Number(n)) if n == 6.0));
    }
}
