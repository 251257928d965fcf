//! `Math` namespace object (`§4.7`): a plain object of constants and
//! stateless numeric methods, never a constructor.

use std::rc::Rc;

use crate::value::Value;

use crate::evaluator::Evaluator;

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

fn num(ev: &mut Evaluator, args: &[Value], i: usize) -> crate::exception::RunResult<f64> {
    crate::ops::to_number(ev, &arg(args, i))
}

pub(crate) fn install(ev: &mut Evaluator) {
    let object_proto = ev.realm().object_proto;
    let math = ev.new_object_with_proto(Some(object_proto));

    super::def_value(ev, math, "PI", Value::Number(std::f64::consts::PI));
    super::def_value(ev, math, "E", Value::Number(std::f64::consts::E));
    super::def_value(ev, math, "LN2", Value::Number(std::f64::consts::LN_2));
    super::def_value(ev, math, "LN10", Value::Number(std::f64::consts::LN_10));
    super::def_value(ev, math, "LOG2E", Value::Number(std::f64::consts::LOG2_E));
    super::def_value(ev, math, "LOG10E", Value::Number(std::f64::consts::LOG10_E));
    super::def_value(ev, math, "SQRT2", Value::Number(std::f64::consts::SQRT_2));
    super::def_value(ev, math, "SQRT1_2", Value::Number(std::f64::consts::FRAC_1_SQRT_2));

    macro_rules! unary {
        ($name:literal, $f:expr) => {
            super::def_method(ev, math, $name, 1, Rc::new(|ev, _this, args| {
                let n = num(ev, args, 0)?;
                let f: fn(f64) -> f64 = $f;
                Ok(Value::Number(f(n)))
            }));
        };
    }

    unary!("abs", f64::abs);
    unary!("floor", f64::floor);
    unary!("ceil", f64::ceil);
    unary!("trunc", f64::trunc);
    unary!("sign", f64::signum_js);
    unary!("sqrt", f64::sqrt);
    unary!("cbrt", f64::cbrt);
    unary!("sin", f64::sin);
    unary!("cos", f64::cos);
    unary!("tan", f64::tan);
    unary!("asin", f64::asin);
    unary!("acos", f64::acos);
    unary!("atan", f64::atan);
    unary!("sinh", f64::sinh);
    unary!("cosh", f64::cosh);
    unary!("tanh", f64::tanh);
    unary!("log", f64::ln);
    unary!("log2", f64::log2);
    unary!("log10", f64::log10);
    unary!("exp", f64::exp);

    super::def_method(ev, math, "round", 1, Rc::new(|ev, _this, args| {
        let n = num(ev, args, 0)?;
        if n.is_nan() || n.is_infinite() {
            return Ok(Value::Number(n));
        }
        // JS rounds halves toward +Infinity, not away from zero.
        Ok(Value::Number((n + 0.5).floor()))
    }));

    super::def_method(ev, math, "max", 2, Rc::new(|ev, _this, args| {
        let mut best = f64::NEG_INFINITY;
        for i in 0..args.len() {
            let n = num(ev, args, i)?;
            if n.is_nan() {
                return Ok(Value::Number(f64::NAN));
            }
            if n > best || (n == 0.0 && best == 0.0 && n.is_sign_positive()) {
                best = n;
            }
        }
        Ok(Value::Number(best))
    }));

    super::def_method(ev, math, "min", 2, Rc::new(|ev, _this, args| {
        let mut best = f64::INFINITY;
        for i in 0..args.len() {
            let n = num(ev, args, i)?;
            if n.is_nan() {
                return Ok(Value::Number(f64::NAN));
            }
            if n < best || (n == 0.0 && best == 0.0 && n.is_sign_negative()) {
                best = n;
            }
        }
        Ok(Value::Number(best))
    }));

    super::def_method(ev, math, "pow", 2, Rc::new(|ev, _this, args| {
        let base = num(ev, args, 0)?;
        let exp = num(ev, args, 1)?;
        Ok(Value::Number(base.powf(exp)))
    }));

    super::def_method(ev, math, "atan2", 2, Rc::new(|ev, _this, args| {
        let y = num(ev, args, 0)?;
        let x = num(ev, args, 1)?;
        Ok(Value::Number(y.atan2(x)))
    }));

    super::def_method(ev, math, "hypot", 2, Rc::new(|ev, _this, args| {
        let mut sum = 0.0;
        for i in 0..args.len() {
            let n = num(ev, args, i)?;
            sum += n * n;
        }
        Ok(Value::Number(sum.sqrt()))
    }));

    super::def_method(ev, math, "random", 0, Rc::new(|_ev, _this, _args| {
        // Non-determinism source explicitly excluded from the folding/CPS
        // equivalence guarantees (`§8` "Round-trips/laws"); a xorshift seeded
        // from the address of a stack value is good enough for guest code
        // that just wants "a number in [0, 1)", not cryptographic quality.
        use std::cell::Cell;
        thread_local! {
            static STATE: Cell<u64> = Cell::new(0x2545_F491_4F6C_DD1D);
        }
        let bits = STATE.with(|s| {
            let mut x = s.get();
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            s.set(x);
            x
        });
        Ok(Value::Number((bits >> 11) as f64 / (1u64 << 53) as f64))
    }));

    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), "Math", Value::Object(math));
}

trait SignumJs {
    fn signum_js(self) -> Self;
}

impl SignumJs for f64 {
    fn signum_js(self) -> Self {
        if self.is_nan() || self == 0.0 {
            self
        } else {
            self.signum()
        }
    }
}
