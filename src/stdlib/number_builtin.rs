//! `Number` constructor, prototype, and statics (`§4.7`: `isInteger`,
//! `isFinite`, `isNaN`, `isSafeInteger`, `parseInt`, `parseFloat`, and the
//! numeric-limit constants — all culture-invariant, so no locale-aware
//! formatting is implemented for `toLocaleString`).

use std::rc::Rc;

use crate::object::{PropertyDescriptor, PropertyKey};
use crate::value::Value;

use crate::evaluator::Evaluator;

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn this_number(ev: &mut Evaluator, this: &Value) -> crate::exception::RunResult<f64> {
    match this {
        Value::Number(n) => Ok(*n),
        _ => crate::ops::to_number(ev, this),
    }
}

/// `Number.parseInt`/global `parseInt` (`§4.7`): skips leading whitespace,
/// an optional sign, an optional radix prefix (`0x`/`0X` implies base 16),
/// then consumes digits valid in the resolved radix; stops at the first
/// invalid character rather than requiring the whole string to parse.
pub(crate) fn parse_int(s: &str, radix: Option<u32>) -> f64 {
    let trimmed = s.trim_start();
    let mut chars = trimmed.chars().peekable();
    let mut sign = 1.0;
    if let Some(&c) = chars.peek() {
        if c == '+' || c == '-' {
            if c == '-' {
                sign = -1.0;
            }
            chars.next();
        }
    }
    let rest: String = chars.collect();
    let mut radix = radix.unwrap_or(0);
    let mut digits = rest.as_str();
    if radix == 0 || radix == 16 {
        if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            digits = hex;
            radix = 16;
        } else if radix == 0 {
            radix = 10;
        }
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    let end = digits.chars().take_while(|c| c.to_digit(radix).is_some()).count();
    if end == 0 {
        return f64::NAN;
    }
    let digit_str = &digits[..digits.char_indices().nth(end).map_or(digits.len(), |(i, _)| i)];
    let mut value = 0.0;
    for c in digit_str.chars() {
        value = value * f64::from(radix) + f64::from(c.to_digit(radix).unwrap());
    }
    sign * value
}

/// `Number.parseFloat`/global `parseFloat` (`§4.7`): parses the longest
/// prefix that forms a valid JS decimal literal (optionally `Infinity`/
/// `-Infinity`), `NaN` if none does.
pub(crate) fn parse_float(s: &str) -> f64 {
    let trimmed = s.trim_start();
    if trimmed.starts_with("Infinity") || trimmed.starts_with("+Infinity") {
        return f64::INFINITY;
    }
    if trimmed.starts_with("-Infinity") {
        return f64::NEG_INFINITY;
    }
    let bytes = trimmed.as_bytes();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_digit() {
            seen_digit = true;
            i += 1;
            end = i;
        } else if c == '.' && !seen_dot && !seen_exp {
            seen_dot = true;
            i += 1;
            if seen_digit {
                end = i;
            }
        } else if (c == 'e' || c == 'E') && seen_digit && !seen_exp {
            let save = i;
            i += 1;
            if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
                i += 1;
            }
            let exp_start = i;
            while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
                i += 1;
            }
            if i > exp_start {
                seen_exp = true;
                end = i;
            } else {
                i = save;
                break;
            }
        } else {
            break;
        }
    }
    if !seen_digit {
        return f64::NAN;
    }
    trimmed[..end].parse().unwrap_or(f64::NAN)
}

pub(crate) fn install(ev: &mut Evaluator) {
    let proto = ev.realm().number_proto;

    super::def_method(ev, proto, "toString", 1, Rc::new(|ev, this, args| {
        let n = this_number(ev, &this)?;
        match args.first() {
            Some(Value::Number(radix)) if *radix != 10.0 => {
                Ok(Value::string(number_to_radix_string(n, *radix as u32)))
            }
            _ => Ok(Value::string(crate::ops::number_to_string(n))),
        }
    }));

    super::def_method(ev, proto, "valueOf", 0, Rc::new(|ev, this, _args| Ok(Value::Number(this_number(ev, &this)?))));

    super::def_method(ev, proto, "toFixed", 1, Rc::new(|ev, this, args| {
        let n = this_number(ev, &this)?;
        let digits = args.first().map_or(Ok(0.0), |v| crate::ops::to_number(ev, v))? as usize;
        if n.is_nan() {
            return Ok(Value::string("NaN"));
        }
        Ok(Value::string(format!("{n:.digits$}")))
    }));

    super::def_method(ev, proto, "toPrecision", 1, Rc::new(|ev, this, args| {
        let n = this_number(ev, &this)?;
        match args.first() {
            None | Some(Value::Undefined) => Ok(Value::string(crate::ops::number_to_string(n))),
            Some(v) => {
                let precision = crate::ops::to_number(ev, v)? as usize;
                Ok(Value::string(format!("{n:.precision$e}")))
            }
        }
    }));

    let ctor = ev.make_host_function("Number", 1, Rc::new(|ev, _this, args| {
        match args.first() {
            Some(v) => Ok(Value::Number(crate::ops::to_number(ev, v)?)),
            None => Ok(Value::Number(0.0)),
        }
    }));
    let Value::Object(ctor_id) = ctor else { unreachable!() };
    if let Some(obj) = ev.heap_mut().get_mut(ctor_id).as_object_mut() {
        obj.set_own(PropertyKey::from_str("prototype"), PropertyDescriptor::non_enumerable(Value::Object(proto)));
    }
    if let Some(proto_obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        proto_obj.set_own(PropertyKey::from_str("constructor"), PropertyDescriptor::non_enumerable(Value::Object(ctor_id)));
    }

    super::def_value(ev, ctor_id, "MAX_SAFE_INTEGER", Value::Number(MAX_SAFE_INTEGER));
    super::def_value(ev, ctor_id, "MIN_SAFE_INTEGER", Value::Number(-MAX_SAFE_INTEGER));
    super::def_value(ev, ctor_id, "MAX_VALUE", Value::Number(f64::MAX));
    super::def_value(ev, ctor_id, "MIN_VALUE", Value::Number(f64::MIN_POSITIVE));
    super::def_value(ev, ctor_id, "EPSILON", Value::Number(f64::EPSILON));
    super::def_value(ev, ctor_id, "POSITIVE_INFINITY", Value::Number(f64::INFINITY));
    super::def_value(ev, ctor_id, "NEGATIVE_INFINITY", Value::Number(f64::NEG_INFINITY));
    super::def_value(ev, ctor_id, "NaN", Value::Number(f64::NAN));

    super::def_method(ev, ctor_id, "isInteger", 1, Rc::new(|_ev, _this, args| {
        Ok(Value::Bool(matches!(args.first(), Some(Value::Number(n)) if n.is_finite() && n.fract() == 0.0)))
    }));
    super::def_method(ev, ctor_id, "isFinite", 1, Rc::new(|_ev, _this, args| {
        Ok(Value::Bool(matches!(args.first(), Some(Value::Number(n)) if n.is_finite())))
    }));
    super::def_method(ev, ctor_id, "isNaN", 1, Rc::new(|_ev, _this, args| {
        Ok(Value::Bool(matches!(args.first(), Some(Value::Number(n)) if n.is_nan())))
    }));
    super::def_method(ev, ctor_id, "isSafeInteger", 1, Rc::new(|_ev, _this, args| {
        Ok(Value::Bool(matches!(args.first(), Some(Value::Number(n)) if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER)))
    }));
    super::def_method(ev, ctor_id, "parseInt", 2, Rc::new(|ev, _this, args| {
        let s = crate::ops::to_js_string(ev, args.first().unwrap_or(&Value::Undefined))?;
        let radix = match args.get(1) {
            Some(v) if !v.is_undefined() => {
                let r = crate::ops::to_number(ev, v)? as i64;
                if r == 0 { None } else { Some(r as u32) }
            }
            _ => None,
        };
        Ok(Value::Number(parse_int(&s, radix)))
    }));
    super::def_method(ev, ctor_id, "parseFloat", 1, Rc::new(|ev, _this, args| {
        let s = crate::ops::to_js_string(ev, args.first().unwrap_or(&Value::Undefined))?;
        Ok(Value::Number(parse_float(&s)))
    }));

    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), "Number", Value::Object(ctor_id));

    let parse_int_fn = ev.make_host_function("parseInt", 2, Rc::new(|ev, _this, args| {
        let s = crate::ops::to_js_string(ev, args.first().unwrap_or(&Value::Undefined))?;
        let radix = match args.get(1) {
            Some(v) if !v.is_undefined() => {
                let r = crate::ops::to_number(ev, v)? as i64;
                if r == 0 { None } else { Some(r as u32) }
            }
            _ => None,
        };
        Ok(Value::Number(parse_int(&s, radix)))
    }));
    let _ = ev.set_property(Value::Object(global), "parseInt", parse_int_fn);

    let parse_float_fn = ev.make_host_function("parseFloat", 1, Rc::new(|ev, _this, args| {
        let s = crate::ops::to_js_string(ev, args.first().unwrap_or(&Value::Undefined))?;
        Ok(Value::Number(parse_float(&s)))
    }));
    let _ = ev.set_property(Value::Object(global), "parseFloat", parse_float_fn);

    let is_nan_fn = ev.make_host_function("isNaN", 1, Rc::new(|ev, _this, args| {
        let n = crate::ops::to_number(ev, args.first().unwrap_or(&Value::Undefined))?;
        Ok(Value::Bool(n.is_nan()))
    }));
    let _ = ev.set_property(Value::Object(global), "isNaN", is_nan_fn);

    let is_finite_fn = ev.make_host_function("isFinite", 1, Rc::new(|ev, _this, args| {
        let n = crate::ops::to_number(ev, args.first().unwrap_or(&Value::Undefined))?;
        Ok(Value::Bool(n.is_finite()))
    }));
    let _ = ev.set_property(Value::Object(global), "isFinite", is_finite_fn);
}

fn number_to_radix_string(mut n: f64, radix: u32) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if !n.is_finite() {
        return if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() };
    }
    let negative = n < 0.0;
    n = n.abs();
    let mut int_part = n.trunc() as u64;
    let mut digits = Vec::new();
    if int_part == 0 {
        digits.push('0');
    }
    while int_part > 0 {
        let d = (int_part % u64::from(radix)) as u32;
        digits.push(std::char::from_digit(d, radix).unwrap());
        int_part /= u64::from(radix);
    }
    digits.reverse();
    let mut out: String = digits.into_iter().collect();
    if negative {
        out.insert(0, '-');
    }
    out
}
