//! `JSON.parse`/`JSON.stringify` (`§4.7`). Neither reuses the JS lexer —
//! JSON's grammar is a small, closed subset of it — so this module carries
//! its own minimal recursive-descent reader, mirroring how `regexp.rs` keeps
//! its own compiled-pattern layer separate from the engine's own lexer.

use std::rc::Rc;

use crate::exception::{ExcType, RunResult};
use crate::heap::HeapData;
use crate::object::PropertyDescriptor;
use crate::value::Value;

use crate::evaluator::Evaluator;

struct JsonParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> JsonParser<'a> {
    fn new(text: &'a str) -> Self {
        Self { bytes: text.as_bytes(), pos: 0 }
    }

    fn skip_ws(&mut self) {
        while matches!(self.bytes.get(self.pos), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, b: u8) -> Result<(), String> {
        if self.peek() == Some(b) {
            self.pos += 1;
            Ok(())
        } else {
            Err(format!("expected {:?} at position {}", b as char, self.pos))
        }
    }

    fn parse_value(&mut self, ev: &mut Evaluator) -> Result<Value, String> {
        self.skip_ws();
        match self.peek() {
            Some(b'{') => self.parse_object(ev),
            Some(b'[') => self.parse_array(ev),
            Some(b'"') => self.parse_string().map(Value::string),
            Some(b't') => self.parse_literal("true", Value::Bool(true)),
            Some(b'f') => self.parse_literal("false", Value::Bool(false)),
            Some(b'n') => self.parse_literal("null", Value::Null),
            Some(c) if c == b'-' || c.is_ascii_digit() => self.parse_number(),
            _ => Err(format!("unexpected token at position {}", self.pos)),
        }
    }

    fn parse_literal(&mut self, lit: &str, value: Value) -> Result<Value, String> {
        if self.bytes[self.pos..].starts_with(lit.as_bytes()) {
            self.pos += lit.len();
            Ok(value)
        } else {
            Err(format!("invalid literal at position {}", self.pos))
        }
    }

    fn parse_number(&mut self) -> Result<Value, String> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
        text.parse::<f64>().map(Value::Number).map_err(|_| format!("invalid number at position {start}"))
    }

    fn parse_string(&mut self) -> Result<String, String> {
        self.expect(b'"')?;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err("unterminated string".to_string()),
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(b'"') => { out.push('"'); self.pos += 1; }
                        Some(b'\\') => { out.push('\\'); self.pos += 1; }
                        Some(b'/') => { out.push('/'); self.pos += 1; }
                        Some(b'b') => { out.push('\u{8}'); self.pos += 1; }
                        Some(b'f') => { out.push('\u{c}'); self.pos += 1; }
                        Some(b'n') => { out.push('\n'); self.pos += 1; }
                        Some(b'r') => { out.push('\r'); self.pos += 1; }
                        Some(b't') => { out.push('\t'); self.pos += 1; }
                        Some(b'u') => {
                            self.pos += 1;
                            let hex = std::str::from_utf8(&self.bytes[self.pos..self.pos + 4]).map_err(|_| "bad unicode escape".to_string())?;
                            let code = u32::from_str_radix(hex, 16).map_err(|_| "bad unicode escape".to_string())?;
                            out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                            self.pos += 4;
                        }
                        _ => return Err("bad escape sequence".to_string()),
                    }
                }
                Some(_) => {
                    let ch_start = self.pos;
                    let text = std::str::from_utf8(&self.bytes[ch_start..]).map_err(|_| "invalid utf-8".to_string())?;
                    let ch = text.chars().next().unwrap();
                    out.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
    }

    fn parse_array(&mut self, ev: &mut Evaluator) -> Result<Value, String> {
        self.expect(b'[')?;
        let mut elements = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Value::Object(ev.new_array(elements)));
        }
        loop {
            let v = self.parse_value(ev)?;
            elements.push(Some(v));
            self.skip_ws();
            match self.peek() {
                Some(b',') => { self.pos += 1; }
                Some(b']') => { self.pos += 1; break; }
                _ => return Err(format!("expected ',' or ']' at position {}", self.pos)),
            }
        }
        Ok(Value::Object(ev.new_array(elements)))
    }

    fn parse_object(&mut self, ev: &mut Evaluator) -> Result<Value, String> {
        self.expect(b'{')?;
        let id = ev.new_plain_object();
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Value::Object(id));
        }
        loop {
            self.skip_ws();
            let key = self.parse_string()?;
            self.skip_ws();
            self.expect(b':')?;
            let value = self.parse_value(ev)?;
            ev.set_property(Value::Object(id), &key, value).map_err(|e| format!("{e:?}"))?;
            self.skip_ws();
            match self.peek() {
                Some(b',') => { self.pos += 1; }
                Some(b'}') => { self.pos += 1; break; }
                _ => return Err(format!("expected ',' or '}}' at position {}", self.pos)),
            }
        }
        Ok(Value::Object(id))
    }
}

fn parse_json(ev: &mut Evaluator, text: &str) -> RunResult<Value> {
    let mut parser = JsonParser::new(text);
    let value = parser.parse_value(ev).map_err(|e| ev.make_exception(ev_syntax_error_value(ev, e)))?;
    parser.skip_ws();
    if parser.pos != parser.bytes.len() {
        let msg = format!("Unexpected non-whitespace character after JSON at position {}", parser.pos);
        return Err(ev.make_exception(ev_syntax_error_value(ev, msg)));
    }
    Ok(value)
}

fn ev_syntax_error_value(ev: &mut Evaluator, message: String) -> Value {
    ev.make_error_value(ExcType::SyntaxError, message)
}

fn quote_json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// `JSON.stringify`'s recursive serializer (`§4.7`). Honors `toJSON()` when
/// present, drops `undefined`/functions/symbols (as array `null` or omitted
/// object members, matching the spec's "SerializeJSONProperty" rule), and
/// guards against cyclic structures with the same data-recursion ceiling
/// `resource.rs` uses elsewhere.
fn stringify_value(ev: &mut Evaluator, value: Value, indent: &str, depth: usize) -> RunResult<Option<String>> {
    let value = coerce_to_json(ev, value)?;
    match &value {
        Value::Undefined => Ok(None),
        Value::Null => Ok(Some("null".to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(if n.is_finite() { crate::ops::number_to_string(*n) } else { "null".to_string() })),
        Value::String(s) => Ok(Some(quote_json_string(s))),
        Value::BigInt(_) => ev.throw_type_error("Do not know how to serialize a BigInt"),
        Value::Symbol(_) => Ok(None),
        Value::Object(id) => {
            if ev.heap().is_callable(*id) {
                return Ok(None);
            }
            ev.resource().enter_data_recursion().map_err(|e| ev.make_exception(ev.make_error_value(ExcType::RangeError, e.to_string())))?;
            let result = stringify_object(ev, *id, indent, depth);
            ev.resource().exit_data_recursion();
            result
        }
    }
}

fn coerce_to_json(ev: &mut Evaluator, value: Value) -> RunResult<Value> {
    if let Value::Object(id) = &value {
        if let Some(to_json) = ev.get_method(*id, "toJSON")? {
            return ev.call_function(to_json, value, &[]);
        }
    }
    Ok(value)
}

fn stringify_object(ev: &mut Evaluator, id: crate::heap::HeapId, indent: &str, depth: usize) -> RunResult<Option<String>> {
    let inner_indent = indent.repeat(depth + 1);
    let outer_indent = indent.repeat(depth);
    let nl = if indent.is_empty() { "" } else { "\n" };
    let sep = if indent.is_empty() { ":" } else { ": " };

    if let HeapData::Array(arr) = ev.heap().get(id) {
        let len = arr.elements.len();
        if len == 0 {
            return Ok(Some("[]".to_string()));
        }
        let mut parts = Vec::with_capacity(len);
        for i in 0..len {
            let element = match ev.heap().get(id) {
                HeapData::Array(a) => a.elements.get(i).cloned().flatten().unwrap_or(Value::Undefined),
                _ => Value::Undefined,
            };
            let rendered = stringify_value(ev, element, indent, depth + 1)?.unwrap_or_else(|| "null".to_string());
            parts.push(format!("{inner_indent}{rendered}"));
        }
        return Ok(Some(format!("[{nl}{}{nl}{outer_indent}]", parts.join(&format!(",{nl}")))));
    }

    let keys: Vec<String> = match ev.heap().get(id).as_object() {
        Some(obj) => obj
            .own_keys_ordered()
            .into_iter()
            .filter_map(|k| k.as_str().map(str::to_string))
            .filter(|k| ev.heap().get(id).as_object().and_then(|o| o.get_own(&crate::object::PropertyKey::from_str(k)).cloned()).is_some_and(|d| matches!(d, PropertyDescriptor::Data { enumerable: true, .. }) || matches!(d, PropertyDescriptor::Accessor { enumerable: true, .. })))
            .collect(),
        None => return Ok(Some("{}".to_string())),
    };

    let mut parts = Vec::new();
    for key in keys {
        let value = ev.get_property(Value::Object(id), &key)?;
        if let Some(rendered) = stringify_value(ev, value, indent, depth + 1)? {
            parts.push(format!("{inner_indent}{}{sep}{rendered}", quote_json_string(&key)));
        }
    }
    if parts.is_empty() {
        return Ok(Some("{}".to_string()));
    }
    Ok(Some(format!("{{{nl}{}{nl}{outer_indent}}}", parts.join(&format!(",{nl}")))))
}

fn resolve_indent(ev: &mut Evaluator, arg: Option<&Value>) -> RunResult<String> {
    match arg {
        None | Some(Value::Undefined) => Ok(String::new()),
        Some(Value::Number(n)) => Ok(" ".repeat((*n).clamp(0.0, 10.0) as usize)),
        Some(Value::String(s)) => Ok(s.chars().take(10).collect()),
        Some(other) => {
            let n = crate::ops::to_number(ev, other)?;
            if n.is_nan() { Ok(String::new()) } else { Ok(" ".repeat(n.clamp(0.0, 10.0) as usize)) }
        }
    }
}

pub(crate) fn install(ev: &mut Evaluator) {
    let object_proto = ev.realm().object_proto;
    let json = ev.new_object_with_proto(Some(object_proto));

    super::def_method(ev, json, "parse", 2, Rc::new(|ev, _this, args| {
        let text = crate::ops::to_js_string(ev, args.first().unwrap_or(&Value::Undefined))?;
        let value = parse_json(ev, &text)?;
        if let Some(reviver) = args.get(1).cloned().filter(Value::is_callable_hint) {
            return apply_reviver(ev, value, &reviver);
        }
        Ok(value)
    }));

    super::def_method(ev, json, "stringify", 3, Rc::new(|ev, _this, args| {
        let value = args.first().cloned().unwrap_or(Value::Undefined);
        let indent = resolve_indent(ev, args.get(2))?;
        match stringify_value(ev, value, &indent, 0)? {
            Some(s) => Ok(Value::string(s)),
            None => Ok(Value::Undefined),
        }
    }));

    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), "JSON", Value::Object(json));
}

/// `JSON.parse`'s reviver pass (`§4.7`): walks the freshly-built value
/// bottom-up, replacing each property with `reviver.call(holder, key,
/// value)`'s result; a `Value::Undefined` result deletes the property.
fn apply_reviver(ev: &mut Evaluator, value: Value, reviver: &Value) -> RunResult<Value> {
    let holder = ev.new_plain_object();
    ev.set_property(Value::Object(holder), "", value)?;
    walk_revive(ev, holder, "", reviver)
}

fn walk_revive(ev: &mut Evaluator, holder: crate::heap::HeapId, key: &str, reviver: &Value) -> RunResult<Value> {
    let value = ev.get_property(Value::Object(holder), key)?;
    if let Value::Object(id) = &value {
        let id = *id;
        if let HeapData::Array(arr) = ev.heap().get(id) {
            let len = arr.elements.len();
            for i in 0..len {
                let revived = walk_revive(ev, id, &i.to_string(), reviver)?;
                if revived.is_undefined() {
                    if let HeapData::Array(a) = ev.heap_mut().get_mut(id) {
                        if let Some(slot) = a.elements.get_mut(i) {
                            *slot = None;
                        }
                    }
                } else {
                    ev.set_property(Value::Object(id), &i.to_string(), revived)?;
                }
            }
        } else if let Some(obj) = ev.heap().get(id).as_object() {
            let keys: Vec<String> = obj.own_keys_ordered().into_iter().filter_map(|k| k.as_str().map(str::to_string)).collect();
            for k in keys {
                let revived = walk_revive(ev, id, &k, reviver)?;
                if revived.is_undefined() {
                    if let Some(obj) = ev.heap_mut().get_mut(id).as_object_mut() {
                        obj.delete_own(&crate::object::PropertyKey::from_str(&k));
                    }
                } else {
                    ev.set_property(Value::Object(id), &k, revived)?;
                }
            }
        }
    }
    ev.call_function(reviver.clone(), Value::Object(holder), &[Value::string(key), value])
}
