//! `Date` constructor and prototype (`§4.7` "and Date"). Not named in any
//! `Realm` field — unlike every other built-in prototype this engine
//! allocates during `stdlib::install`, `Date.prototype` only needs to be
//! reachable from `Date`'s own constructor closures, which already capture
//! it, so it stays a local rather than growing `Realm` for a single
//! constructor's sake.
//!
//! A `Date` instance's timestamp (milliseconds since the Unix epoch, always
//! treated as UTC — `§5` gives this engine no host timezone database to
//! consult) lives in [`crate::object::JsObject::primitive_value`], the same
//! slot `new Number`/`new Boolean` would box into if this engine's
//! constructors did that (`number_builtin`/`boolean_builtin` don't; `Date`
//! is the one built-in here that actually needs the slot, since every
//! `Date` instance, unlike a boxed `Number`, has no other representation).

use std::rc::Rc;

use chrono::{Datelike, TimeZone, Timelike, Utc};

use crate::exception::RunResult;
use crate::object::{PropertyDescriptor, PropertyKey};
use crate::value::Value;

use crate::evaluator::Evaluator;

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

fn now_millis() -> f64 {
    Utc::now().timestamp_millis() as f64
}

/// `Date.parse`/the one-string-argument form of the constructor (`§4.7`):
/// accepts ISO-8601 (`Date.prototype.toISOString`'s own output round-trips)
/// and falls back to RFC 2822, returning `NaN` for anything else rather
/// than guessing at a locale-specific format.
fn parse_date_string(s: &str) -> f64 {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return dt.timestamp_millis() as f64;
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc2822(s) {
        return dt.timestamp_millis() as f64;
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Utc.from_utc_datetime(&dt).timestamp_millis() as f64;
        }
    }
    f64::NAN
}

/// The 2-7 argument form, `§4.7`'s "year, month, day, hours, minutes,
/// seconds, ms" constructor overload: a two-digit `year` in `[0, 99]` maps
/// to 1900-1999, matching every other JS engine's historical quirk.
fn from_components(ev: &mut Evaluator, args: &[Value]) -> RunResult<f64> {
    let year = crate::ops::to_number(ev, &arg(args, 0))?;
    let year = if (0.0..=99.0).contains(&year) { year + 1900.0 } else { year };
    let month = if args.len() > 1 { crate::ops::to_number(ev, &arg(args, 1))? } else { 0.0 };
    let day = if args.len() > 2 { crate::ops::to_number(ev, &arg(args, 2))? } else { 1.0 };
    let hours = if args.len() > 3 { crate::ops::to_number(ev, &arg(args, 3))? } else { 0.0 };
    let minutes = if args.len() > 4 { crate::ops::to_number(ev, &arg(args, 4))? } else { 0.0 };
    let seconds = if args.len() > 5 { crate::ops::to_number(ev, &arg(args, 5))? } else { 0.0 };
    let millis = if args.len() > 6 { crate::ops::to_number(ev, &arg(args, 6))? } else { 0.0 };
    if [year, month, day, hours, minutes, seconds, millis].iter().any(|n| n.is_nan()) {
        return Ok(f64::NAN);
    }
    Ok(components_to_millis(year, month, day, hours, minutes, seconds, millis))
}

/// Builds an epoch-ms timestamp from calendar components that have already
/// overflowed/underflowed out of their normal range (`month: 13` means
/// "January of next year") by letting `chrono` normalize a non-leap base
/// date and folding every unit down into a millisecond offset instead of
/// constructing a `NaiveDate` directly, which would reject anything out of
/// range rather than roll it over the way `§4.7` requires.
fn components_to_millis(year: f64, month: f64, day: f64, hours: f64, minutes: f64, seconds: f64, millis: f64) -> f64 {
    let year_i = (year + (month / 12.0).floor()) as i32;
    let month_i = month.rem_euclid(12.0) as u32;
    let Some(base) = chrono::NaiveDate::from_ymd_opt(year_i, month_i + 1, 1) else { return f64::NAN };
    let Some(base_dt) = base.and_hms_opt(0, 0, 0) else { return f64::NAN };
    let base_ms = Utc.from_utc_datetime(&base_dt).timestamp_millis() as f64;
    let day_offset_ms = (day - 1.0) * 86_400_000.0;
    let time_ms = hours * 3_600_000.0 + minutes * 60_000.0 + seconds * 1_000.0 + millis;
    base_ms + day_offset_ms + time_ms
}

fn this_time(ev: &mut Evaluator, this: &Value) -> RunResult<f64> {
    let Value::Object(id) = this else { return ev.throw_type_error("not a Date") };
    let primitive = ev.heap().get(*id).as_object().and_then(|o| o.primitive_value.clone());
    match primitive {
        Some(Value::Number(n)) => Ok(n),
        _ => ev.throw_type_error("not a Date"),
    }
}

fn set_this_time(ev: &mut Evaluator, this: &Value, ms: f64) -> RunResult<Value> {
    let Value::Object(id) = this else { return ev.throw_type_error("not a Date") };
    if let Some(obj) = ev.heap_mut().get_mut(*id).as_object_mut() {
        obj.primitive_value = Some(Value::Number(ms));
    }
    Ok(Value::Number(ms))
}

fn datetime(ms: f64) -> Option<chrono::DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(ms as i64).single()
}

fn iso_string(ms: f64) -> RunResult<String> {
    match datetime(ms) {
        Some(dt) => Ok(dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()),
        None => Err(()).unwrap_or_else(|()| String::new()),
    }
    .into()
}

pub(crate) fn install(ev: &mut Evaluator) {
    let object_proto = ev.realm().object_proto;
    let proto = ev.heap_mut().alloc(crate::heap::HeapData::Object(crate::object::JsObject::with_class(Some(object_proto), "Date")));

    macro_rules! getter {
        ($name:expr, $field:ident) => {
            super::def_method(ev, proto, $name, 0, Rc::new(|ev, this, _args| {
                let ms = this_time(ev, &this)?;
                match datetime(ms) {
                    Some(dt) => Ok(Value::Number(dt.$field() as f64)),
                    None => Ok(Value::Number(f64::NAN)),
                }
            }));
        };
    }

    for (name, field) in [
        ("getFullYear", "year"),
        ("getUTCFullYear", "year"),
        ("getMonth", "month0"),
        ("getUTCMonth", "month0"),
        ("getDate", "day"),
        ("getUTCDate", "day"),
        ("getHours", "hour"),
        ("getUTCHours", "hour"),
        ("getMinutes", "minute"),
        ("getUTCMinutes", "minute"),
        ("getSeconds", "second"),
        ("getUTCSeconds", "second"),
    ] {
        let field = field;
        super::def_method(ev, proto, name, 0, Rc::new(move |ev, this, _args| {
            let ms = this_time(ev, &this)?;
            let Some(dt) = datetime(ms) else { return Ok(Value::Number(f64::NAN)) };
            let value = match field {
                "year" => dt.year() as f64,
                "month0" => dt.month0() as f64,
                "day" => dt.day() as f64,
                "hour" => dt.hour() as f64,
                "minute" => dt.minute() as f64,
                "second" => dt.second() as f64,
                _ => unreachable!(),
            };
            Ok(Value::Number(value))
        }));
    }
    let _ = getter;

    for name in ["getMilliseconds", "getUTCMilliseconds"] {
        super::def_method(ev, proto, name, 0, Rc::new(|ev, this, _args| {
            let ms = this_time(ev, &this)?;
            Ok(Value::Number(ms.rem_euclid(1000.0)))
        }));
    }

    for name in ["getDay", "getUTCDay"] {
        super::def_method(ev, proto, name, 0, Rc::new(|ev, this, _args| {
            let ms = this_time(ev, &this)?;
            let Some(dt) = datetime(ms) else { return Ok(Value::Number(f64::NAN)) };
            Ok(Value::Number(dt.weekday().num_days_from_sunday() as f64))
        }));
    }

    for name in ["getTimezoneOffset"] {
        super::def_method(ev, proto, name, 0, Rc::new(|_ev, _this, _args| Ok(Value::Number(0.0))));
    }

    super::def_method(ev, proto, "getTime", 0, Rc::new(|ev, this, _args| Ok(Value::Number(this_time(ev, &this)?))));
    super::def_method(ev, proto, "valueOf", 0, Rc::new(|ev, this, _args| Ok(Value::Number(this_time(ev, &this)?))));

    super::def_method(ev, proto, "setTime", 1, Rc::new(|ev, this, args| {
        let ms = crate::ops::to_number(ev, &arg(args, 0))?;
        set_this_time(ev, &this, ms)
    }));

    macro_rules! setter {
        ($name:expr, $part:ident) => {
            super::def_method(ev, proto, $name, 1, Rc::new(|ev, this, args| {
                let ms = this_time(ev, &this)?;
                let Some(dt) = datetime(ms) else { return set_this_time(ev, &this, f64::NAN) };
                let value = crate::ops::to_number(ev, &arg(args, 0))?;
                let new_ms = set_component(dt, stringify!($part), value);
                set_this_time(ev, &this, new_ms)
            }));
        };
    }
    let _ = setter;

    for (name, part) in [
        ("setFullYear", "year"),
        ("setUTCFullYear", "year"),
        ("setMonth", "month"),
        ("setUTCMonth", "month"),
        ("setDate", "day"),
        ("setUTCDate", "day"),
        ("setHours", "hour"),
        ("setUTCHours", "hour"),
        ("setMinutes", "minute"),
        ("setUTCMinutes", "minute"),
        ("setSeconds", "second"),
        ("setUTCSeconds", "second"),
        ("setMilliseconds", "millisecond"),
        ("setUTCMilliseconds", "millisecond"),
    ] {
        let part = part;
        super::def_method(ev, proto, name, 1, Rc::new(move |ev, this, args| {
            let ms = this_time(ev, &this)?;
            let value = crate::ops::to_number(ev, &arg(args, 0))?;
            if value.is_nan() {
                return set_this_time(ev, &this, f64::NAN);
            }
            let new_ms = match datetime(ms) {
                Some(dt) => set_component(dt, part, value),
                None => return set_this_time(ev, &this, f64::NAN),
            };
            set_this_time(ev, &this, new_ms)
        }));
    }

    super::def_method(ev, proto, "toISOString", 0, Rc::new(|ev, this, _args| {
        let ms = this_time(ev, &this)?;
        match datetime(ms) {
            Some(dt) => Ok(Value::string(dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())),
            None => ev.throw_range_error("Invalid time value"),
        }
    }));

    super::def_method(ev, proto, "toJSON", 0, Rc::new(|ev, this, _args| {
        let ms = this_time(ev, &this)?;
        if !ms.is_finite() {
            return Ok(Value::Null);
        }
        let to_iso = ev.get_property(this.clone(), "toISOString")?;
        ev.call_function(to_iso, this, &[])
    }));

    for name in ["toString", "toUTCString", "toDateString", "toTimeString", "toLocaleString", "toLocaleDateString", "toLocaleTimeString"] {
        super::def_method(ev, proto, name, 0, Rc::new(|ev, this, _args| {
            let ms = this_time(ev, &this)?;
            match datetime(ms) {
                Some(dt) => Ok(Value::string(dt.format("%a %b %d %Y %H:%M:%S GMT+0000 (UTC)").to_string())),
                None => Ok(Value::string("Invalid Date")),
            }
        }));
    }

    let ctor = ev.make_host_function("Date", 7, Rc::new(move |ev, this, args| {
        let ms = match args.len() {
            0 => now_millis(),
            1 => match &args[0] {
                Value::String(s) => parse_date_string(s),
                Value::Object(id) if ev.heap().get(*id).as_object().is_some_and(|o| o.class_name == "Date") => this_time(ev, &args[0])?,
                other => crate::ops::to_number(ev, other)?,
            },
            _ => from_components(ev, args)?,
        };
        match &this {
            Value::Object(_) => set_this_time(ev, &this, ms),
            _ => match datetime(ms) {
                Some(dt) => Ok(Value::string(dt.format("%a %b %d %Y %H:%M:%S GMT+0000 (UTC)").to_string())),
                None => Ok(Value::string("Invalid Date")),
            },
        }
    }));
    let Value::Object(ctor_id) = &ctor else { unreachable!() };
    if let Some(obj) = ev.heap_mut().get_mut(*ctor_id).as_object_mut() {
        obj.set_own(PropertyKey::from_str("prototype"), PropertyDescriptor::non_enumerable(Value::Object(proto)));
    }
    if let Some(proto_obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        proto_obj.set_own(PropertyKey::from_str("constructor"), PropertyDescriptor::non_enumerable(ctor.clone()));
    }
    let ctor_id = *ctor_id;

    super::def_method(ev, ctor_id, "now", 0, Rc::new(|_ev, _this, _args| Ok(Value::Number(now_millis()))));
    super::def_method(ev, ctor_id, "parse", 1, Rc::new(|ev, _this, args| {
        let s = crate::ops::to_js_string(ev, &arg(args, 0))?;
        Ok(Value::Number(parse_date_string(&s)))
    }));
    super::def_method(ev, ctor_id, "UTC", 7, Rc::new(|ev, _this, args| Ok(Value::Number(from_components(ev, args)?))));

    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), "Date", ctor);
}

/// Applies a single calendar/time component change the way `§4.7`'s
/// `setFullYear`/`setMonth`/etc. family specifies: re-expressed in terms of
/// [`components_to_millis`], which already does the generic out-of-range
/// rollover every setter needs (`setDate(32)` rolling into next month, etc).
fn set_component(dt: chrono::DateTime<Utc>, part: &str, value: f64) -> f64 {
    let (mut year, mut month, mut day, mut hour, mut minute, mut second, millisecond) = (
        dt.year() as f64,
        dt.month0() as f64,
        dt.day() as f64,
        dt.hour() as f64,
        dt.minute() as f64,
        dt.second() as f64,
        (dt.timestamp_subsec_millis()) as f64,
    );
    let mut millisecond = millisecond;
    match part {
        "year" => year = value,
        "month" => month = value,
        "day" => day = value,
        "hour" => hour = value,
        "minute" => minute = value,
        "second" => second = value,
        "millisecond" => millisecond = value,
        _ => unreachable!(),
    }
    let _ = &mut millisecond;
    components_to_millis(year, month, day, hour, minute, second, millisecond)
}

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use crate::value::Value;

    #[test]
    fn epoch_constructs_from_milliseconds() {
        let mut engine = Engine::new();
        let result = engine.evaluate("new Date(0).toISOString()").unwrap();
        assert!(matches!(result, Value::String(s) if &*s == "1970-01-01T00:00:00.000Z"));
    }

    #[test]
    fn components_round_trip_through_getters() {
        let mut engine = Engine::new();
        let result = engine.evaluate("new Date(2024, 0, 15, 10, 30, 0).getFullYear()").unwrap();
        assert!(matches!(result, Value::Number(n) if n == 2024.0));
    }

    #[test]
    fn month_overflow_rolls_into_next_year() {
        let mut engine = Engine::new();
        let result = engine.evaluate("new Date(2024, 12, 1).getFullYear()").unwrap();
        assert!(matches!(result, Value::Number(n) if n == 2025.0));
    }

    #[test]
    fn set_date_mutates_in_place() {
        let mut engine = Engine::new();
        let result = engine.evaluate("const d = new Date(2024, 0, 1); d.setDate(15); d.getDate()").unwrap();
        assert!(matches!(result, Value::Number(n) if n == 15.0));
    }
}
