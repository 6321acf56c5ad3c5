//! Member access and built-in methods on script values.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use crate::engine::Engine;
use crate::error::EvalError;
use crate::signal::{Receiver, Signal, Slot};
use crate::value::{self, Value};

use super::interp::array_index;

type MethodResult = Result<Value, EvalError>;

// ── Member access ─────────────────────────────────────────────────────────

pub(crate) fn get_member(engine: &Engine, target: &Value, key: &str) -> MethodResult {
    Ok(match target {
        Value::Object(obj) => obj.get(engine, key)?,
        Value::Map(map) => map.borrow().get(key).cloned().unwrap_or_default(),
        Value::Array(items) => {
            let items = items.borrow();
            match key {
                "length" => Value::from(items.len() as f64),
                _ => array_index(key).and_then(|i| items.get(i).cloned()).unwrap_or_default(),
            }
        }
        Value::String(s) => match key {
            "length" => Value::from(s.chars().count() as f64),
            _ => array_index(key)
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::from(c.to_string()))
                .unwrap_or_default(),
        },
        Value::Function(f) if key == "name" => Value::from(f.name()),
        Value::Undefined | Value::Null => {
            return Err(EvalError::type_error(format!(
                "Cannot read property '{key}' of {}",
                target.to_display_string()
            )));
        }
        _ => Value::Undefined,
    })
}

/// Longest array a script may grow; arrays are stored densely.
pub(crate) const MAX_ARRAY_LENGTH: usize = 1 << 24;

/// Validates a script-supplied array length.
pub(crate) fn array_length(len: f64) -> Result<usize, EvalError> {
    if len < 0.0 || len.fract() != 0.0 || len > MAX_ARRAY_LENGTH as f64 {
        return Err(EvalError::range_error("Invalid array length"));
    }
    Ok(len as usize)
}

pub(crate) fn set_member(engine: &Engine, target: &Value, key: &str, value: Value) -> Result<(), EvalError> {
    match target {
        Value::Object(obj) => match obj.property(key) {
            Some(prop) => prop.set(engine, value, false, None)?,
            None => log::warn!("Cannot assign to non-existent property \"{key}\" of {}", obj.class_name()),
        },
        Value::Map(map) => {
            map.borrow_mut().insert(key.to_string(), value);
        }
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            if key == "length" {
                let len = array_length(value.to_number())?;
                items.resize(len, Value::Undefined);
            } else if let Some(i) = array_index(key) {
                if i >= items.len() {
                    let len = i.checked_add(1).filter(|&n| n <= MAX_ARRAY_LENGTH);
                    let len = len.ok_or_else(|| EvalError::range_error("Invalid array length"))?;
                    items.resize(len, Value::Undefined);
                }
                items[i] = value;
            }
        }
        Value::Undefined | Value::Null => {
            return Err(EvalError::type_error(format!(
                "Cannot set property '{key}' of {}",
                target.to_display_string()
            )));
        }
        _ => {}
    }
    Ok(())
}

// ── Method calls ──────────────────────────────────────────────────────────

/// `receiver.name(args)`, with `this` bound to the receiver.
pub(crate) fn call_method(engine: &Engine, receiver: &Value, name: &str, args: &[Value]) -> MethodResult {
    match receiver {
        Value::Array(items) => {
            if let Some(v) = array_method(engine, receiver, items, name, args)? {
                return Ok(v);
            }
        }
        Value::String(s) => {
            if let Some(v) = string_method(s, name, args) {
                return Ok(v);
            }
        }
        Value::Number(n) => {
            if let Some(v) = number_method(*n, name, args) {
                return Ok(v);
            }
        }
        Value::Signal(signal) => match name {
            "connect" | "disconnect" => return signal_connection(signal, name == "connect", args),
            _ => {}
        },
        Value::Function(_) => match name {
            "call" => {
                let this = args.first().cloned().unwrap_or_default();
                return engine.call(receiver, this, args.get(1..).unwrap_or_default());
            }
            "apply" => {
                let this = args.first().cloned().unwrap_or_default();
                let list = args.get(1).and_then(Value::array_items).unwrap_or_default();
                return engine.call(receiver, this, &list);
            }
            _ => {}
        },
        Value::Map(map) if name == "hasOwnProperty" => {
            let key = args.first().map(Value::to_display_string).unwrap_or_default();
            return Ok(Value::Bool(map.borrow().contains_key(&key)));
        }
        _ => {}
    }
    if name == "toString" {
        return Ok(Value::from(receiver.to_display_string()));
    }

    let f = get_member(engine, receiver, name)?;
    match &f {
        Value::Function(_) | Value::Signal(_) => engine.call(&f, receiver.clone(), args),
        _ => Err(EvalError::type_error(format!(
            "Property '{name}' of {} is not a function",
            receiver.to_display_string()
        ))),
    }
}

/// `signal.connect(fn)`, `signal.connect(obj, fn)` or
/// `signal.connect(obj, "method")`, and the same for `disconnect`.
fn signal_connection(signal: &Signal, connect: bool, args: &[Value]) -> MethodResult {
    let (receiver, slot) = match args {
        [Value::Object(obj), Value::String(method)] => {
            let f = obj
                .method(method)
                .ok_or_else(|| EvalError::type_error(format!("{}.{method} is not a function", obj.class_name())))?;
            (Some(Receiver::object(obj)), Some(f))
        }
        [Value::Object(obj), f @ Value::Function(_)] => (Some(Receiver::object(obj)), Some(f.clone())),
        [f @ Value::Function(_)] => (None, Some(f.clone())),
        [Value::Object(obj)] if !connect => (Some(Receiver::object(obj)), None),
        _ => {
            return Err(EvalError::type_error(format!(
                "{}.{}: expected a function",
                signal.name(),
                if connect { "connect" } else { "disconnect" }
            )));
        }
    };
    match (connect, receiver, slot) {
        (true, receiver, Some(f)) => signal.connect(receiver, Slot::Callable(f)),
        (false, Some(receiver), Some(f)) => signal.disconnect(&receiver, &Slot::Callable(f)),
        (false, None, Some(f)) => signal.disconnect_slot(&Slot::Callable(f)),
        (false, Some(receiver), None) => signal.disconnect_receiver(&receiver),
        _ => {}
    }
    Ok(Value::Undefined)
}

// ── Arrays ────────────────────────────────────────────────────────────────

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

/// Resolve a relative index (negative counts from the end) into `0..=len`.
fn relative_index(v: &Value, len: usize, default: usize) -> usize {
    if v.is_undefined() {
        return default;
    }
    let n = v.to_number();
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        (n as usize).min(len)
    }
}

fn array_method(
    engine: &Engine,
    this: &Value,
    items: &Rc<RefCell<Vec<Value>>>,
    name: &str,
    args: &[Value],
) -> Result<Option<Value>, EvalError> {
    let len = items.borrow().len();
    let callback = |f: &Value, item: &Value, i: usize| {
        engine.call(f, Value::Undefined, &[item.clone(), Value::from(i as f64), this.clone()])
    };
    let v = match name {
        "push" => {
            let mut items = items.borrow_mut();
            items.extend(args.iter().cloned());
            Value::from(items.len() as f64)
        }
        "pop" => items.borrow_mut().pop().unwrap_or_default(),
        "shift" => {
            let mut items = items.borrow_mut();
            if items.is_empty() { Value::Undefined } else { items.remove(0) }
        }
        "unshift" => {
            let mut items = items.borrow_mut();
            items.splice(0..0, args.iter().cloned());
            Value::from(items.len() as f64)
        }
        "indexOf" => {
            let needle = arg(args, 0);
            let pos = items.borrow().iter().position(|v| v.strict_eq(&needle));
            Value::from(pos.map_or(-1.0, |p| p as f64))
        }
        "lastIndexOf" => {
            let needle = arg(args, 0);
            let pos = items.borrow().iter().rposition(|v| v.strict_eq(&needle));
            Value::from(pos.map_or(-1.0, |p| p as f64))
        }
        "join" => {
            let sep = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(v) => v.to_display_string(),
            };
            Value::from(join(&items.borrow(), &sep))
        }
        "toString" => Value::from(join(&items.borrow(), ",")),
        "slice" => {
            let start = relative_index(&arg(args, 0), len, 0);
            let end = relative_index(&arg(args, 1), len, len);
            let out = if start < end { items.borrow()[start..end].to_vec() } else { Vec::new() };
            Value::array(out)
        }
        "splice" => {
            let start = relative_index(&arg(args, 0), len, 0);
            let count = match args.get(1) {
                None => len - start,
                Some(v) => (v.to_number().max(0.0) as usize).min(len - start),
            };
            let inserted = args.get(2..).unwrap_or_default().to_vec();
            let removed: Vec<Value> = items.borrow_mut().splice(start..start + count, inserted).collect();
            Value::array(removed)
        }
        "concat" => {
            let mut out = items.borrow().clone();
            for a in args {
                match a.array_items() {
                    Some(more) => out.extend(more),
                    None => out.push(a.clone()),
                }
            }
            Value::array(out)
        }
        "reverse" => {
            items.borrow_mut().reverse();
            this.clone()
        }
        "forEach" | "map" | "filter" | "some" | "every" => {
            let f = arg(args, 0);
            let snapshot = items.borrow().clone();
            let mut mapped = Vec::new();
            for (i, item) in snapshot.iter().enumerate() {
                let r = callback(&f, item, i)?;
                match name {
                    "map" => mapped.push(r),
                    "filter" if r.truthy() => mapped.push(item.clone()),
                    "some" if r.truthy() => return Ok(Some(Value::Bool(true))),
                    "every" if !r.truthy() => return Ok(Some(Value::Bool(false))),
                    _ => {}
                }
            }
            match name {
                "map" | "filter" => Value::array(mapped),
                "some" => Value::Bool(false),
                "every" => Value::Bool(true),
                _ => Value::Undefined,
            }
        }
        "reduce" => {
            let f = arg(args, 0);
            let snapshot = items.borrow().clone();
            let mut iter = snapshot.into_iter().enumerate();
            let mut acc = match args.get(1) {
                Some(init) => init.clone(),
                None => match iter.next() {
                    Some((_, first)) => first,
                    None => return Err(EvalError::type_error("Reduce of empty array with no initial value")),
                },
            };
            for (i, item) in iter {
                acc = engine.call(&f, Value::Undefined, &[acc, item, Value::from(i as f64), this.clone()])?;
            }
            acc
        }
        "sort" => {
            let compare = arg(args, 0);
            let mut sorted = items.borrow().clone();
            let mut failure = None;
            sorted.sort_by(|a, b| {
                if failure.is_some() {
                    return Ordering::Equal;
                }
                if compare.is_undefined() {
                    return a.to_display_string().cmp(&b.to_display_string());
                }
                match engine.call(&compare, Value::Undefined, &[a.clone(), b.clone()]) {
                    Ok(r) => r.to_number().partial_cmp(&0.0).unwrap_or(Ordering::Equal),
                    Err(e) => {
                        failure = Some(e);
                        Ordering::Equal
                    }
                }
            });
            if let Some(e) = failure {
                return Err(e);
            }
            *items.borrow_mut() = sorted;
            this.clone()
        }
        _ => return Ok(None),
    };
    Ok(Some(v))
}

fn join(items: &[Value], sep: &str) -> String {
    items
        .iter()
        .map(|v| if v.is_nullish() { String::new() } else { v.to_display_string() })
        .collect::<Vec<_>>()
        .join(sep)
}

// ── Strings ───────────────────────────────────────────────────────────────

/// Character-indexed substring.
fn char_slice(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

fn char_index_of(s: &str, needle: &str, from: usize) -> Option<usize> {
    let byte_from = s.char_indices().nth(from).map_or(s.len(), |(b, _)| b);
    s[byte_from..].find(needle).map(|b| s[..byte_from + b].chars().count())
}

fn string_method(s: &str, name: &str, args: &[Value]) -> Option<Value> {
    let len = s.chars().count();
    let text = |i: usize| arg(args, i).to_display_string();
    let index = |i: usize, default: f64| {
        let v = arg(args, i);
        if v.is_undefined() { default } else { v.to_number() }
    };
    let clamp = |n: f64| if n.is_nan() { 0 } else { n.clamp(0.0, len as f64) as usize };

    Some(match name {
        "charAt" => Value::from(s.chars().nth(clamp(index(0, 0.0))).map(String::from).unwrap_or_default()),
        "charCodeAt" => {
            let i = index(0, 0.0);
            match s.chars().nth(clamp(i)) {
                Some(c) if i >= 0.0 => Value::from(f64::from(u32::from(c))),
                _ => Value::Number(f64::NAN),
            }
        }
        "indexOf" => {
            let from = clamp(index(1, 0.0));
            Value::from(char_index_of(s, &text(0), from).map_or(-1.0, |i| i as f64))
        }
        "lastIndexOf" => {
            let needle = text(0);
            let found = s.rfind(needle.as_str()).map(|b| s[..b].chars().count());
            Value::from(found.map_or(-1.0, |i| i as f64))
        }
        "substring" => {
            let (a, b) = (clamp(index(0, 0.0)), clamp(index(1, len as f64)));
            Value::from(char_slice(s, a.min(b), a.max(b)))
        }
        "substr" => {
            let start = relative_index(&arg(args, 0), len, 0);
            let count = clamp(index(1, (len - start) as f64));
            Value::from(char_slice(s, start, start + count))
        }
        "slice" => {
            let start = relative_index(&arg(args, 0), len, 0);
            let end = relative_index(&arg(args, 1), len, len);
            Value::from(char_slice(s, start, end))
        }
        "toUpperCase" | "toLocaleUpperCase" => Value::from(s.to_uppercase()),
        "toLowerCase" | "toLocaleLowerCase" => Value::from(s.to_lowercase()),
        "trim" => Value::from(s.trim()),
        "concat" => Value::from(args.iter().fold(s.to_string(), |acc, a| acc + &a.to_display_string())),
        "split" => {
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::Undefined) => vec![Value::from(s)],
                Some(sep) => {
                    let sep = sep.to_display_string();
                    if sep.is_empty() {
                        s.chars().map(|c| Value::from(c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(Value::from).collect()
                    }
                }
            };
            let limit = args.get(1).map_or(usize::MAX, |l| l.to_number().max(0.0) as usize);
            Value::array(parts.into_iter().take(limit).collect())
        }
        "replace" => Value::from(s.replacen(&text(0), &text(1), 1)),
        "arg" => Value::from(qt_arg(s, &text(0))),
        "toString" | "valueOf" => Value::from(s),
        _ => return None,
    })
}

/// Qt's `QString::arg`: replace every occurrence of the lowest-numbered
/// `%N` marker.
fn qt_arg(s: &str, replacement: &str) -> String {
    let markers = || {
        s.match_indices('%').filter_map(|(at, _)| {
            let digits: String = s[at + 1..].chars().take_while(char::is_ascii_digit).take(2).collect();
            digits.parse::<u32>().ok().map(|n| (at, n, digits.len()))
        })
    };
    let Some(lowest) = markers().map(|(_, n, _)| n).min() else {
        log::warn!("String.arg(): no place marker in \"{s}\"");
        return s.to_string();
    };
    let mut out = String::with_capacity(s.len() + replacement.len());
    let mut last = 0;
    for (at, n, width) in markers() {
        if n == lowest {
            out.push_str(&s[last..at]);
            out.push_str(replacement);
            last = at + 1 + width;
        }
    }
    out.push_str(&s[last..]);
    out
}

// ── Numbers ───────────────────────────────────────────────────────────────

fn number_method(n: f64, name: &str, args: &[Value]) -> Option<Value> {
    Some(match name {
        "toFixed" => {
            let digits = arg(args, 0).to_number();
            let digits = if digits.is_nan() { 0 } else { digits.clamp(0.0, 20.0) as usize };
            if n.is_finite() { Value::from(format!("{n:.digits$}")) } else { Value::from(value::number_to_string(n)) }
        }
        "toString" | "toLocaleString" | "valueOf" => Value::from(value::number_to_string(n)),
        _ => return None,
    })
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
    fn array_methods() {
        assert_eq!(run("var a = [3, 1, 2]; a.push(4); return a.length"), Value::from(4));
        assert_eq!(run("return [1, 2, 3].map(function (x) { return x * 2 }).join('-')"), Value::from("2-4-6"));
        assert_eq!(run("return [3, 1, 2].sort().join()"), Value::from("1,2,3"));
        assert_eq!(run("return [5, 10, 1].sort(function (a, b) { return a - b })[2]"), Value::from(10));
        assert_eq!(run("return [1, 2, 3, 4].slice(-2).join()"), Value::from("3,4"));
        assert_eq!(run("var a = [1, 2, 3]; a.splice(1, 1); return a.join()"), Value::from("1,3"));
        assert_eq!(run("return [1, 2, 3].reduce(function (s, x) { return s + x })"), Value::from(6));
    }

    #[test]
    fn string_methods() {
        assert_eq!(run("return 'Hello'.charAt(1)"), Value::from("e"));
        assert_eq!(run("return 'a,b,c'.split(',').length"), Value::from(3));
        assert_eq!(run("return 'hello'.substring(3, 1)"), Value::from("el"));
        assert_eq!(run("return '  x '.trim().toUpperCase()"), Value::from("X"));
        assert_eq!(run("return 'banana'.indexOf('an', 2)"), Value::from(3));
    }

    #[test]
    fn qt_arg_replaces_lowest_marker() {
        assert_eq!(qt_arg("%2 of %1", "ten"), "%2 of ten");
        assert_eq!(qt_arg("%1-%1", "x"), "x-x");
    }

    #[test]
    fn number_to_fixed() {
        assert_eq!(run("return (2.345).toFixed(1)"), Value::from("2.3"));
        assert_eq!(run("return (3).toFixed(2)"), Value::from("3.00"));
    }

    #[test]
    fn function_call_and_apply() {
        assert_eq!(run("function f(a, b) { return a + b } return f.apply(null, [1, 2]) + f.call(null, 3, 4)"), Value::from(10));
    }
}
