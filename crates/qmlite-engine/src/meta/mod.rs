//! Element templates.
//!
//! The compiler turns a parsed document into a tree of `MetaElement`s: one
//! per element block, with its property entries in declaration order and its
//! child elements. Templates are immutable and shared through `Rc`; the
//! constructor re-walks them for every instantiation.

mod compiler;

use std::rc::Rc;

use indexmap::IndexMap;
use qmlite_syntax::ast;

use crate::binding::Binding;
use crate::value::Value;

pub use compiler::{compile, compile_element, parse_and_compile};

/// Template for one element block.
#[derive(Debug, Clone)]
pub struct MetaElement {
    pub class_name: String,
    /// `Behavior on x { ... }` targets property `x` of the enclosing element.
    pub on_property: Option<String>,
    pub id: Option<String>,
    pub properties: IndexMap<String, MetaValue>,
    pub children: Vec<Rc<MetaElement>>,
    /// Set by `default property ...`.
    pub default_property: Option<String>,
    pub line: usize,
    pub col: usize,
}

impl MetaElement {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            on_property: None,
            id: None,
            properties: IndexMap::new(),
            children: Vec::new(),
            default_property: None,
            line: 0,
            col: 0,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: MetaValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn with_child(mut self, child: MetaElement) -> Self {
        self.children.push(Rc::new(child));
        self
    }
}

/// Right-hand side of a property entry: a value or a definition.
#[derive(Debug, Clone)]
pub enum MetaValue {
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<MetaValue>),
    Element(Rc<MetaElement>),
    Binding(Rc<Binding>),
    /// `property <type> name [: value]`
    PropertyDef { type_name: String, value: Option<Box<MetaValue>> },
    /// `property alias name: object[.property]`
    Alias { object: String, property: Option<String> },
    /// `signal name(type a, type b)`, keeping the parameter names.
    Signal(Vec<String>),
    Method(Rc<ast::Function>),
    /// `a.b: ...` and `a { b: ... }` entries merged per group name.
    Group(IndexMap<String, MetaValue>),
}

impl MetaValue {
    /// The plain value of a folded literal, list or element template.
    /// Definitions and bindings have none.
    pub fn to_value(&self) -> Option<Value> {
        Some(match self {
            MetaValue::Bool(b) => Value::Bool(*b),
            MetaValue::Number(n) => Value::Number(*n),
            MetaValue::String(s) => Value::from(s.as_str()),
            MetaValue::List(items) => Value::array(items.iter().filter_map(MetaValue::to_value).collect()),
            MetaValue::Element(e) => Value::Element(e.clone()),
            _ => return None,
        })
    }

    pub fn is_binding(&self) -> bool {
        matches!(self, MetaValue::Binding(_))
    }
}
