//! Dynamic values shared by the script interpreter and the property store.
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | `Undefined`, `Null`, `Bool`, `Number`, `String` | script primitives |
//! | `Array` | shared, interior-mutable list |
//! | `Map` | object literal with declaration-ordered keys |
//! | `Object` | engine object (elements, groups, components) |
//! | `Function` | script closure or native function |
//! | `Signal` | first-class signal, callable to emit |
//! | `Element` | element template waiting to be instantiated |
//!
//! Reference variants compare by identity, like script objects do.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use qmlite_syntax::ast;

use crate::engine::Engine;
use crate::error::EvalError;
use crate::meta::MetaElement;
use crate::object::ObjectRef;
use crate::script::Scope;
use crate::signal::Signal;

pub type Array = Rc<RefCell<Vec<Value>>>;
pub type Map = Rc<RefCell<IndexMap<String, Value>>>;

/// Native function signature: engine, `this`, arguments.
pub type NativeFn = dyn Fn(&Engine, &Value, &[Value]) -> Result<Value, EvalError>;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Array),
    Map(Map),
    Object(ObjectRef),
    Function(Rc<Function>),
    Signal(Signal),
    Element(Rc<MetaElement>),
}

/// A callable value.
pub enum Function {
    /// Closure over the scope chain it was created in.
    Script { def: Rc<ast::Function>, scope: Rc<Scope> },
    Native { name: String, call: Rc<NativeFn> },
}

impl Function {
    /// Wrap a Rust closure as a script-callable function value.
    pub fn native(
        name: impl Into<String>,
        call: impl Fn(&Engine, &Value, &[Value]) -> Result<Value, EvalError> + 'static,
    ) -> Value {
        Value::Function(Rc::new(Function::Native { name: name.into(), call: Rc::new(call) }))
    }

    pub fn name(&self) -> &str {
        match self {
            Function::Script { def, .. } => def.name.as_deref().unwrap_or(""),
            Function::Native { name, .. } => name,
        }
    }
}

// ── Constructors ──────────────────────────────────────────────────────────

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn map(entries: IndexMap<String, Value>) -> Self {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    /// Arrays are stored by value in properties: copy the outer list, keep the
    /// items shared.
    pub fn copied(&self) -> Self {
        match self {
            Value::Array(items) => Value::array(items.borrow().clone()),
            other => other.clone(),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<Option<ObjectRef>> for Value {
    fn from(o: Option<ObjectRef>) -> Self {
        o.map_or(Value::Null, Value::Object)
    }
}

// ── Accessors ─────────────────────────────────────────────────────────────

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Items of an array value, cloned out of the shared cell.
    pub fn array_items(&self) -> Option<Vec<Value>> {
        match self {
            Value::Array(items) => Some(items.borrow().clone()),
            _ => None,
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Array(_) => string_to_number(&self.to_display_string()),
            _ => f64::NAN,
        }
    }

    pub fn to_int32(&self) -> i32 {
        number_to_int32(self.to_number())
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) | Value::Signal(_) => "function",
            _ => "object",
        }
    }

    /// Script `String(value)`.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.to_string(),
            Value::Array(items) => items
                .borrow()
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_display_string() })
                .collect::<Vec<_>>()
                .join(","),
            Value::Map(_) => "[object Object]".into(),
            Value::Object(o) => match o.id() {
                Some(id) => format!("{}({})", o.class_name(), id),
                None => o.class_name().to_string(),
            },
            Value::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
            Value::Signal(s) => format!("function {}() {{ [signal] }}", s.name()),
            Value::Element(e) => format!("[element {}]", e.class_name),
        }
    }

    /// `===`: primitives by value, everything else by identity.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Signal(a), Value::Signal(b)) => a.same(b),
            (Value::Element(a), Value::Element(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `==` with the usual primitive coercions.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Bool(_), Value::Bool(_)) => self.strict_eq(other),
            (Value::Bool(_), _) => Value::Number(self.to_number()).loose_eq(other),
            (_, Value::Bool(_)) => self.loose_eq(&Value::Number(other.to_number())),
            (Value::Number(n), b) | (b, Value::Number(n)) if !b.is_primitive() => {
                *n == b.to_number()
            }
            (a, b) if a.is_primitive() != b.is_primitive() => {
                a.to_display_string() == b.to_display_string()
            }
            _ => self.strict_eq(other),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)
        )
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&number_to_string(*n)),
            Value::String(s) => write!(f, "{:?}", &**s),
            Value::Array(items) => f.debug_list().entries(items.borrow().iter()).finish(),
            Value::Map(entries) => f.debug_map().entries(entries.borrow().iter()).finish(),
            Value::Object(o) => write!(f, "Object({})", o.class_name()),
            Value::Function(func) => write!(f, "Function({})", func.name()),
            Value::Signal(s) => write!(f, "Signal({})", s.name()),
            Value::Element(e) => write!(f, "Element({})", e.class_name),
        }
    }
}

// ── Number helpers ────────────────────────────────────────────────────────

pub(crate) fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    match t {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts "inf" and "nan" spellings that scripts do not.
        _ if t.chars().any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E')) => f64::NAN,
        _ => t.parse::<f64>().unwrap_or(f64::NAN),
    }
}

pub(crate) fn number_to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    let wrapped = n.trunc().rem_euclid(4_294_967_296.0);
    if wrapped >= 2_147_483_648.0 {
        (wrapped - 4_294_967_296.0) as i32
    } else {
        wrapped as i32
    }
}

pub(crate) fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".into();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity".into() } else { "-Infinity".into() };
    }
    if n == 0.0 {
        return "0".into();
    }
    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        if n.fract() == 0.0 {
            format!("{n:.0}")
        } else {
            format!("{n}")
        }
    } else {
        let s = format!("{n:e}");
        match s.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_print_like_scripts() {
        assert_eq!(number_to_string(5.0), "5");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1.5e-7), "1.5e-7");
        assert_eq!(number_to_string(f64::NAN), "NaN");
    }

    #[test]
    fn string_to_number_edge_cases() {
        assert_eq!(string_to_number("  12 "), 12.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x1F"), 31.0);
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("12px").is_nan());
        assert_eq!(string_to_number("1e3"), 1000.0);
    }

    #[test]
    fn int32_wraps() {
        assert_eq!(number_to_int32(3.9), 3);
        assert_eq!(number_to_int32(-3.9), -3);
        assert_eq!(number_to_int32(4_294_967_297.0), 1);
        assert_eq!(number_to_int32(2_147_483_648.0), -2_147_483_648);
    }

    #[test]
    fn equality() {
        let a = Value::array(vec![1.into()]);
        assert!(a.strict_eq(&a.clone()));
        assert!(!a.strict_eq(&a.copied()));
        assert!(Value::from("5").loose_eq(&Value::from(5)));
        assert!(Value::Null.loose_eq(&Value::Undefined));
        assert!(!Value::Null.loose_eq(&Value::from(0)));
        assert!(Value::from(true).loose_eq(&Value::from(1)));
        assert!(!Value::from(f64::NAN).strict_eq(&Value::from(f64::NAN)));
    }

    #[test]
    fn arrays_join_on_display() {
        let v = Value::array(vec![1.into(), Value::Null, "x".into()]);
        assert_eq!(v.to_display_string(), "1,,x");
        assert_eq!(v.type_of(), "object");
    }
}
