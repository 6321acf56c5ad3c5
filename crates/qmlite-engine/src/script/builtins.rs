//! Global objects and functions available to every script.

use indexmap::IndexMap;

use crate::elements::easing::CURVE_NAMES;
use crate::engine::Engine;
use crate::error::EvalError;
use crate::logging::SCRIPT_TARGET;
use crate::value::{self, Function, Value};

use super::methods;

fn native(name: &str, f: impl Fn(&Engine, &Value, &[Value]) -> Result<Value, EvalError> + 'static) -> Value {
    Function::native(name, f)
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

fn num_arg(args: &[Value], i: usize) -> f64 {
    arg(args, i).to_number()
}

/// Populate `globals` with the standard library.
pub(crate) fn install_globals(globals: &mut IndexMap<String, Value>) {
    globals.insert("NaN".into(), Value::Number(f64::NAN));
    globals.insert("Infinity".into(), Value::Number(f64::INFINITY));
    globals.insert("Math".into(), math());
    globals.insert("console".into(), console());
    globals.insert("JSON".into(), json());
    globals.insert("Qt".into(), qt());
    globals.insert("Easing".into(), easing());

    let mut animation = IndexMap::new();
    animation.insert("Infinite".to_string(), Value::Number(-1.0));
    globals.insert("Animation".into(), Value::map(animation));

    globals.insert("parseInt".into(), native("parseInt", |_, _, args| {
        let radix = args.get(1).filter(|r| !r.is_undefined()).map(|r| r.to_int32());
        Ok(Value::Number(parse_int(&arg(args, 0).to_display_string(), radix)))
    }));
    globals.insert("parseFloat".into(), native("parseFloat", |_, _, args| {
        Ok(Value::Number(parse_float(&arg(args, 0).to_display_string())))
    }));
    globals.insert("isNaN".into(), native("isNaN", |_, _, args| Ok(Value::Bool(num_arg(args, 0).is_nan()))));
    globals.insert("isFinite".into(), native("isFinite", |_, _, args| {
        Ok(Value::Bool(num_arg(args, 0).is_finite()))
    }));
    globals.insert("String".into(), native("String", |_, _, args| {
        Ok(Value::from(args.first().map(Value::to_display_string).unwrap_or_default()))
    }));
    globals.insert("Number".into(), native("Number", |_, _, args| {
        Ok(Value::Number(args.first().map_or(0.0, Value::to_number)))
    }));
    globals.insert("Boolean".into(), native("Boolean", |_, _, args| Ok(Value::Bool(arg(args, 0).truthy()))));
    globals.insert("Array".into(), native("Array", |_, _, args| match args {
        [Value::Number(n)] => Ok(Value::array(vec![Value::Undefined; methods::array_length(*n)?])),
        items => Ok(Value::array(items.to_vec())),
    }));
    globals.insert("Object".into(), native("Object", |_, _, args| match args.first() {
        Some(v) if !v.is_nullish() => Ok(v.clone()),
        _ => Ok(Value::map(IndexMap::new())),
    }));
}

// ── Math ──────────────────────────────────────────────────────────────────

fn math() -> Value {
    let mut m = IndexMap::new();
    let consts = [
        ("PI", std::f64::consts::PI),
        ("E", std::f64::consts::E),
        ("LN2", std::f64::consts::LN_2),
        ("LN10", std::f64::consts::LN_10),
        ("LOG2E", std::f64::consts::LOG2_E),
        ("LOG10E", std::f64::consts::LOG10_E),
        ("SQRT2", std::f64::consts::SQRT_2),
        ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
    ];
    for (name, v) in consts {
        m.insert(name.to_string(), Value::Number(v));
    }

    let unary: [(&str, fn(f64) -> f64); 14] = [
        ("abs", f64::abs),
        ("floor", f64::floor),
        ("ceil", f64::ceil),
        ("round", |x| (x + 0.5).floor()),
        ("sqrt", f64::sqrt),
        ("sin", f64::sin),
        ("cos", f64::cos),
        ("tan", f64::tan),
        ("asin", f64::asin),
        ("acos", f64::acos),
        ("atan", f64::atan),
        ("exp", f64::exp),
        ("log", f64::ln),
        ("sign", |x| if x.is_nan() || x == 0.0 { x } else { x.signum() }),
    ];
    for (name, f) in unary {
        m.insert(name.to_string(), native(name, move |_, _, args| Ok(Value::Number(f(num_arg(args, 0))))));
    }

    m.insert("pow".into(), native("pow", |_, _, args| Ok(Value::Number(num_arg(args, 0).powf(num_arg(args, 1))))));
    m.insert("atan2".into(), native("atan2", |_, _, args| {
        Ok(Value::Number(num_arg(args, 0).atan2(num_arg(args, 1))))
    }));
    m.insert("min".into(), native("min", |_, _, args| Ok(Value::Number(fold_extreme(args, f64::INFINITY, f64::min)))));
    m.insert("max".into(), native("max", |_, _, args| {
        Ok(Value::Number(fold_extreme(args, f64::NEG_INFINITY, f64::max)))
    }));
    m.insert("random".into(), native("random", |_, _, _| Ok(Value::Number(rand::random::<f64>()))));
    Value::map(m)
}

/// `Math.min`/`Math.max`: NaN in any argument wins.
fn fold_extreme(args: &[Value], init: f64, pick: fn(f64, f64) -> f64) -> f64 {
    args.iter().map(Value::to_number).try_fold(init, |acc, x| if x.is_nan() { None } else { Some(pick(acc, x)) }).unwrap_or(f64::NAN)
}

// ── console ───────────────────────────────────────────────────────────────

fn console() -> Value {
    fn line(args: &[Value]) -> String {
        args.iter().map(Value::to_display_string).collect::<Vec<_>>().join(" ")
    }
    let mut m = IndexMap::new();
    m.insert("log".to_string(), native("log", |_, _, args| {
        log::info!(target: SCRIPT_TARGET, "{}", line(args));
        Ok(Value::Undefined)
    }));
    m.insert("info".to_string(), native("info", |_, _, args| {
        log::info!(target: SCRIPT_TARGET, "{}", line(args));
        Ok(Value::Undefined)
    }));
    m.insert("debug".to_string(), native("debug", |_, _, args| {
        log::debug!(target: SCRIPT_TARGET, "{}", line(args));
        Ok(Value::Undefined)
    }));
    m.insert("warn".to_string(), native("warn", |_, _, args| {
        log::warn!(target: SCRIPT_TARGET, "{}", line(args));
        Ok(Value::Undefined)
    }));
    m.insert("error".to_string(), native("error", |_, _, args| {
        log::error!(target: SCRIPT_TARGET, "{}", line(args));
        Ok(Value::Undefined)
    }));
    Value::map(m)
}

// ── JSON ──────────────────────────────────────────────────────────────────

fn json() -> Value {
    let mut m = IndexMap::new();
    m.insert("stringify".to_string(), native("stringify", |_, _, args| {
        let Some(json) = to_json(&arg(args, 0)) else { return Ok(Value::Undefined) };
        let pretty = arg(args, 2).truthy();
        let text = if pretty { serde_json::to_string_pretty(&json) } else { serde_json::to_string(&json) };
        text.map(Value::from).map_err(|e| EvalError::type_error(e.to_string()))
    }));
    m.insert("parse".to_string(), native("parse", |_, _, args| {
        let text = arg(args, 0).to_display_string();
        serde_json::from_str::<serde_json::Value>(&text)
            .map(|json| from_json(&json))
            .map_err(|e| EvalError::Thrown(Value::from(format!("SyntaxError: JSON.parse: {e}"))))
    }));
    Value::map(m)
}

/// Script value to JSON. Functions, signals and `undefined` have no JSON
/// form; objects serialise as their display name.
fn to_json(v: &Value) -> Option<serde_json::Value> {
    use serde_json::Value as J;
    Some(match v {
        Value::Undefined | Value::Function(_) | Value::Signal(_) | Value::Element(_) => return None,
        Value::Null => J::Null,
        Value::Bool(b) => J::Bool(*b),
        Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => J::Number((*n as i64).into()),
        Value::Number(n) => serde_json::Number::from_f64(*n).map_or(J::Null, J::Number),
        Value::String(s) => J::String(s.to_string()),
        Value::Array(items) => J::Array(items.borrow().iter().map(|i| to_json(i).unwrap_or(J::Null)).collect()),
        Value::Map(map) => J::Object(
            map.borrow()
                .iter()
                .filter_map(|(k, v)| to_json(v).map(|j| (k.clone(), j)))
                .collect(),
        ),
        Value::Object(_) => J::String(v.to_display_string()),
    })
}

fn from_json(j: &serde_json::Value) -> Value {
    use serde_json::Value as J;
    match j {
        J::Null => Value::Null,
        J::Bool(b) => Value::Bool(*b),
        J::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        J::String(s) => Value::from(s.as_str()),
        J::Array(items) => Value::array(items.iter().map(from_json).collect()),
        J::Object(map) => Value::map(map.iter().map(|(k, v)| (k.clone(), from_json(v))).collect()),
    }
}

// ── Qt and enumerations ───────────────────────────────────────────────────

fn qt() -> Value {
    let mut m = IndexMap::new();
    m.insert("rgba".to_string(), native("rgba", |_, _, args| {
        let channel = |i| (num_arg(args, i) * 255.0 + 0.5).floor();
        Ok(Value::from(format!(
            "rgba({},{},{},{})",
            value::number_to_string(channel(0)),
            value::number_to_string(channel(1)),
            value::number_to_string(channel(2)),
            arg(args, 3).to_display_string()
        )))
    }));
    let constants = [
        ("LeftButton", 1.0),
        ("RightButton", 2.0),
        ("MiddleButton", 4.0),
        ("NoModifier", 0.0),
        ("ShiftModifier", 1.0),
        ("ControlModifier", 2.0),
        ("AltModifier", 4.0),
        ("MetaModifier", 8.0),
        ("KeypadModifier", 16.0),
        ("LeftToRight", 0.0),
        ("RightToLeft", 1.0),
    ];
    for (name, v) in constants {
        m.insert(name.to_string(), Value::Number(v));
    }
    Value::map(m)
}

fn easing() -> Value {
    let codes = CURVE_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_string(), Value::Number(i as f64 + 1.0)))
        .collect();
    Value::map(codes)
}

// ── Number parsing ────────────────────────────────────────────────────────

fn split_sign(s: &str) -> (f64, &str) {
    match s.as_bytes().first() {
        Some(b'-') => (-1.0, &s[1..]),
        Some(b'+') => (1.0, &s[1..]),
        _ => (1.0, s),
    }
}

pub(crate) fn parse_int(s: &str, radix: Option<i32>) -> f64 {
    let (sign, mut rest) = split_sign(s.trim_start());
    let (mut radix, explicit) = match radix {
        None | Some(0) => (10, false),
        Some(r) if (2..=36).contains(&r) => (r as u32, true),
        Some(_) => return f64::NAN,
    };
    if !explicit || radix == 16 {
        if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
            rest = hex;
            radix = 16;
        }
    }
    let digits: Vec<u32> = rest.chars().map_while(|c| c.to_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    sign * digits.iter().fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(*d))
}

pub(crate) fn parse_float(s: &str) -> f64 {
    let (sign, rest) = split_sign(s.trim_start());
    if rest.starts_with("Infinity") {
        return sign * f64::INFINITY;
    }
    let bytes = rest.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };
    let int_end = digits_from(0);
    let mut end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if frac_end > end + 1 || int_end > 0 {
            end = frac_end;
        }
    }
    if end == 0 || (end == 1 && bytes[0] == b'.') {
        return f64::NAN;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    sign * rest[..end].parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::script::run_script;

    fn run(src: &str) -> Value {
        let engine = Engine::new(EngineConfig::default());
        run_script(&engine, src).unwrap()
    }

    #[test]
    fn parse_int_forms() {
        assert_eq!(parse_int("42px", None), 42.0);
        assert_eq!(parse_int("  -0x1F", None), -31.0);
        assert_eq!(parse_int("ff", Some(16)), 255.0);
        assert!(parse_int("px", None).is_nan());
    }

    #[test]
    fn parse_float_forms() {
        assert_eq!(parse_float("3.25e2xyz"), 325.0);
        assert_eq!(parse_float(".5"), 0.5);
        assert_eq!(parse_float("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_float("e5").is_nan());
    }

    #[test]
    fn math_and_qt_globals() {
        assert_eq!(run("return Math.max(1, 7, 3)"), Value::from(7));
        assert_eq!(run("return Math.round(-2.5)"), Value::from(-2));
        assert_eq!(run("return Qt.rgba(1, 0.5, 0, 1)"), Value::from("rgba(255,128,0,1)"));
        assert_eq!(run("return Easing.OutBounce"), Value::from(39));
        assert_eq!(run("return Animation.Infinite"), Value::from(-1));
    }

    #[test]
    fn json_round_trip_keeps_key_order() {
        assert_eq!(run("return JSON.stringify(JSON.parse('{\"b\":1,\"a\":[true,null]}'))"), Value::from("{\"b\":1,\"a\":[true,null]}"));
    }

    #[test]
    fn random_is_in_unit_interval() {
        let r = run("return Math.random()").to_number();
        assert!((0.0..1.0).contains(&r));
    }
}
