//! Abstract operations that may call into user code (`ToPrimitive` via
//! `valueOf`/`toString`, coercions built on top of it) — split out from
//! [`crate::value`]'s user-code-free helpers (`ToBoolean`, `===`) the same
//! way `§4.6` separates "operators" from "member access", since both need
//! `&mut Evaluator` to invoke a guest method and both can throw.

use std::cmp::Ordering;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::Zero;

use crate::evaluator::Evaluator;
use crate::exception::RunResult;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hint {
    Number,
    String,
    Default,
}

/// `ToPrimitive` (`§4.6` "Operators"): objects convert via `valueOf`/
/// `toString` in hint-dependent order; everything else is already
/// primitive. `Symbol.toPrimitive` is not part of this engine's supported
/// surface — only the legacy `valueOf`/`toString` fallback order.
pub(crate) fn to_primitive(ev: &mut Evaluator, value: &Value, hint: Hint) -> RunResult<Value> {
    let Value::Object(id) = value else { return Ok(value.clone()) };
    let id = *id;
    let method_order: [&str; 2] = match hint {
        Hint::String => ["toString", "valueOf"],
        Hint::Number | Hint::Default => ["valueOf", "toString"],
    };
    for name in method_order {
        if let Some(method) = ev.get_method(id, name)? {
            let result = ev.call_function(method, Value::Object(id), &[])?;
            if !matches!(result, Value::Object(_)) {
                return Ok(result);
            }
        }
    }
    ev.throw_type_error("Cannot convert object to primitive value")
}

/// `ToNumber` (`§4.6`): throws for `BigInt`, since there is no implicit
/// `BigInt` -> `Number` conversion in ECMAScript.
pub(crate) fn to_number(ev: &mut Evaluator, value: &Value) -> RunResult<f64> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Null => Ok(0.0),
        Value::Undefined => Ok(f64::NAN),
        Value::String(s) => Ok(string_to_number(s)),
        Value::BigInt(_) => ev.throw_type_error("Cannot convert a BigInt value to a number"),
        Value::Symbol(_) => ev.throw_type_error("Cannot convert a Symbol value to a number"),
        Value::Object(_) => {
            let prim = to_primitive(ev, value, Hint::Number)?;
            to_number(ev, &prim)
        }
    }
}

pub(crate) fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(|c: char| c.is_whitespace());
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    if let Some(oct) = trimmed.strip_prefix("0o").or_else(|| trimmed.strip_prefix("0O")) {
        return i64::from_str_radix(oct, 8).map_or(f64::NAN, |n| n as f64);
    }
    if let Some(bin) = trimmed.strip_prefix("0b").or_else(|| trimmed.strip_prefix("0B")) {
        return i64::from_str_radix(bin, 2).map_or(f64::NAN, |n| n as f64);
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => trimmed.parse().unwrap_or(f64::NAN),
    }
}

/// `ToString` (`§4.6`): objects go through `ToPrimitive(hint String)` first.
pub(crate) fn to_js_string(ev: &mut Evaluator, value: &Value) -> RunResult<Rc<str>> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(Rc::from(number_to_string(*n))),
        Value::Bool(b) => Ok(Rc::from(if *b { "true" } else { "false" })),
        Value::Null => Ok(Rc::from("null")),
        Value::Undefined => Ok(Rc::from("undefined")),
        Value::BigInt(b) => Ok(Rc::from(b.to_string())),
        Value::Symbol(_) => ev.throw_type_error("Cannot convert a Symbol value to a string"),
        Value::Object(_) => {
            let prim = to_primitive(ev, value, Hint::String)?;
            to_js_string(ev, &prim)
        }
    }
}

/// Approximates ECMAScript's `Number::toString` the same way `fold.rs`'s
/// folding-time copy does — exact for integers, inexact for the shortest-
/// round-trip form of arbitrary doubles.
pub(crate) fn number_to_string(n: f64) -> String {
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

/// `ToIntegerOrInfinity` (used by `Array.prototype` index/length arguments):
/// `NaN` folds to `0`, otherwise truncates toward zero. Infinities pass
/// through unchanged so callers can clamp against array bounds afterward.
pub(crate) fn to_integer_or_infinity(ev: &mut Evaluator, value: &Value) -> RunResult<f64> {
    let n = to_number(ev, value)?;
    if n.is_nan() {
        return Ok(0.0);
    }
    Ok(n.trunc())
}

pub(crate) fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    let modulo = n.trunc().rem_euclid(4_294_967_296.0);
    if modulo >= 2_147_483_648.0 { (modulo - 4_294_967_296.0) as i32 } else { modulo as i32 }
}

pub(crate) fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

/// `§4.6`'s "operator coercion rules including BigInt restrictions": `+`
/// between a `BigInt` and a non-`BigInt` throws rather than implicitly
/// converting, everywhere except string concatenation.
pub(crate) fn add(ev: &mut Evaluator, left: &Value, right: &Value) -> RunResult<Value> {
    let lp = to_primitive(ev, left, Hint::Default)?;
    let rp = to_primitive(ev, right, Hint::Default)?;
    if matches!(lp, Value::String(_)) || matches!(rp, Value::String(_)) {
        let ls = to_js_string(ev, &lp)?;
        let rs = to_js_string(ev, &rp)?;
        return Ok(Value::string(format!("{ls}{rs}")));
    }
    match (&lp, &rp) {
        (Value::BigInt(a), Value::BigInt(b)) => Ok(Value::BigInt(Rc::new(&**a + &**b))),
        (Value::BigInt(_), _) | (_, Value::BigInt(_)) => {
            ev.throw_type_error("Cannot mix BigInt and other types, use explicit conversions")
        }
        _ => Ok(Value::Number(to_number(ev, &lp)? + to_number(ev, &rp)?)),
    }
}

macro_rules! numeric_binop {
    ($name:ident, $bigint_op:tt, $num_op:tt) => {
        pub(crate) fn $name(ev: &mut Evaluator, left: &Value, right: &Value) -> RunResult<Value> {
            match (left, right) {
                (Value::BigInt(a), Value::BigInt(b)) => Ok(Value::BigInt(Rc::new(&**a $bigint_op &**b))),
                (Value::BigInt(_), _) | (_, Value::BigInt(_)) => {
                    ev.throw_type_error("Cannot mix BigInt and other types, use explicit conversions")
                }
                _ => Ok(Value::Number(to_number(ev, left)? $num_op to_number(ev, right)?)),
            }
        }
    };
}

numeric_binop!(sub, -, -);
numeric_binop!(mul, *, *);
numeric_binop!(div, /, /);
numeric_binop!(rem, %, %);

pub(crate) fn pow(ev: &mut Evaluator, left: &Value, right: &Value) -> RunResult<Value> {
    match (left, right) {
        (Value::BigInt(a), Value::BigInt(b)) => {
            use num_traits::ToPrimitive;
            let Some(exp) = b.to_u32() else {
                return ev.throw_range_error("Exponent must be non-negative");
            };
            Ok(Value::BigInt(Rc::new(a.as_ref().clone().pow(exp))))
        }
        (Value::BigInt(_), _) | (_, Value::BigInt(_)) => {
            ev.throw_type_error("Cannot mix BigInt and other types, use explicit conversions")
        }
        _ => Ok(Value::Number(to_number(ev, left)?.powf(to_number(ev, right)?))),
    }
}

macro_rules! bitwise_binop {
    ($name:ident, $bigint_op:tt, $op:tt) => {
        pub(crate) fn $name(ev: &mut Evaluator, left: &Value, right: &Value) -> RunResult<Value> {
            match (left, right) {
                (Value::BigInt(a), Value::BigInt(b)) => Ok(Value::BigInt(Rc::new(&**a $bigint_op &**b))),
                (Value::BigInt(_), _) | (_, Value::BigInt(_)) => {
                    ev.throw_type_error("Cannot mix BigInt and other types, use explicit conversions")
                }
                _ => Ok(Value::Number(f64::from(to_int32(to_number(ev, left)?) $op to_int32(to_number(ev, right)?)))),
            }
        }
    };
}

bitwise_binop!(bit_and, &, &);
bitwise_binop!(bit_or, |, |);
bitwise_binop!(bit_xor, ^, ^);

pub(crate) fn shl(ev: &mut Evaluator, left: &Value, right: &Value) -> RunResult<Value> {
    let (l, r) = (to_int32(to_number(ev, left)?), to_uint32(to_number(ev, right)?) & 31);
    Ok(Value::Number(f64::from(l.wrapping_shl(r))))
}

pub(crate) fn shr(ev: &mut Evaluator, left: &Value, right: &Value) -> RunResult<Value> {
    let (l, r) = (to_int32(to_number(ev, left)?), to_uint32(to_number(ev, right)?) & 31);
    Ok(Value::Number(f64::from(l.wrapping_shr(r))))
}

pub(crate) fn ushr(ev: &mut Evaluator, left: &Value, right: &Value) -> RunResult<Value> {
    let (l, r) = (to_uint32(to_number(ev, left)?), to_uint32(to_number(ev, right)?) & 31);
    Ok(Value::Number(f64::from(l.wrapping_shr(r))))
}

/// Abstract relational comparison (`§4.6` "Operators"): `None` means
/// "undefined" (NaN was involved), which every relational operator folds to
/// `false`.
pub(crate) fn less_than(ev: &mut Evaluator, left: &Value, right: &Value) -> RunResult<Option<bool>> {
    let lp = to_primitive(ev, left, Hint::Number)?;
    let rp = to_primitive(ev, right, Hint::Number)?;
    if let (Value::String(a), Value::String(b)) = (&lp, &rp) {
        return Ok(Some(a.as_ref() < b.as_ref()));
    }
    if let (Value::BigInt(a), Value::BigInt(b)) = (&lp, &rp) {
        return Ok(Some(a < b));
    }
    let (a, b) = (to_number(ev, &lp)?, to_number(ev, &rp)?);
    if a.is_nan() || b.is_nan() {
        return Ok(None);
    }
    Ok(Some(a < b))
}

/// Abstract equality (`§4.6`, loose `==`). Mirrors `fold.rs`'s literal-only
/// copy but over full `Value`s, so it can coerce through `valueOf`.
pub(crate) fn loose_eq(ev: &mut Evaluator, left: &Value, right: &Value) -> RunResult<bool> {
    use Value::*;
    match (left, right) {
        (Null | Undefined, Null | Undefined) => Ok(true),
        (Null, _) | (_, Null) | (Undefined, _) | (_, Undefined) => Ok(false),
        (Number(_), Number(_))
        | (String(_), String(_))
        | (Bool(_), Bool(_))
        | (BigInt(_), BigInt(_))
        | (Object(_), Object(_))
        | (Symbol(_), Symbol(_)) => Ok(left.strict_eq(right)),
        (Number(a), String(s)) | (String(s), Number(a)) => Ok(*a == string_to_number(s)),
        (BigInt(a), String(s)) | (String(s), BigInt(a)) => Ok(s.trim().parse::<BigInt>().is_ok_and(|p| p == **a)),
        (BigInt(a), Number(b)) | (Number(b), BigInt(a)) => Ok(b.fract() == 0.0 && b.is_finite() && BigInt::from(*b as i64) == **a),
        (Bool(b), other) | (other, Bool(b)) => {
            let coerced = Number(if *b { 1.0 } else { 0.0 });
            loose_eq(ev, &coerced, other)
        }
        (Object(_), other) | (other, Object(_)) if !matches!(other, Object(_)) => {
            let prim = to_primitive(ev, if matches!(left, Object(_)) { left } else { right }, Hint::Default)?;
            let other = if matches!(left, Object(_)) { right } else { left };
            loose_eq(ev, &prim, other)
        }
        _ => Ok(false),
    }
}

pub(crate) fn typeof_value(ev: &Evaluator, value: &Value) -> &'static str {
    if let Value::Object(id) = value {
        if ev.heap().is_callable(*id) {
            return "function";
        }
    }
    value.type_of()
}

/// `instanceof` (`§4.6`): walks `ctor.prototype` against the receiver's
/// prototype chain.
pub(crate) fn instance_of(ev: &mut Evaluator, value: &Value, ctor: &Value) -> RunResult<bool> {
    let Value::Object(ctor_id) = ctor else {
        return ev.throw_type_error("Right-hand side of 'instanceof' is not callable");
    };
    if !ev.heap().is_callable(*ctor_id) {
        return ev.throw_type_error("Right-hand side of 'instanceof' is not callable");
    }
    let Value::Object(obj_id) = value else { return Ok(false) };
    let Some(proto) = ev.get_property(Value::Object(*ctor_id), "prototype")?.as_object() else {
        return ev.throw_type_error("Function has non-object prototype in instanceof check");
    };
    let mut current = ev.heap().get(*obj_id).as_object().and_then(|o| o.prototype);
    let mut guard = 0;
    while let Some(id) = current {
        guard += 1;
        if guard > 10_000 {
            break;
        }
        if id == proto {
            return Ok(true);
        }
        current = ev.heap().get(id).as_object().and_then(|o| o.prototype);
    }
    Ok(false)
}

/// `§4.6`'s "SameValueZero" is already primitive-only (`Value::same_value_zero`);
/// re-exported here for symmetry with the rest of this module's coercions.
pub(crate) fn same_value_zero(a: &Value, b: &Value) -> bool {
    a.same_value_zero(b)
}

pub(crate) fn ordering_from_less_than(less: Option<bool>, equal: bool) -> Option<Ordering> {
    if equal {
        Some(Ordering::Equal)
    } else {
        less.map(|l| if l { Ordering::Less } else { Ordering::Greater })
    }
}

pub(crate) fn is_zero_bigint(b: &BigInt) -> bool {
    b.is_zero()
}
