use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::engine::Engine;
use crate::error::EvalError;
use crate::object::{Context, Object, ObjectRef};
use crate::value::Value;

/// One link of the scope chain.
pub enum Frame {
    /// Function locals (parameters, `var`, function declarations).
    Locals { vars: RefCell<IndexMap<String, Value>>, this: Value },
    /// Members of the object a binding belongs to.
    Object(Weak<Object>),
    /// Ids and component-root members of a component instance.
    Context(Rc<Context>),
    /// `with (value) { ... }`
    With(Value),
}

/// Lexical scope chain. Names not found in any frame fall through to the
/// engine's globals.
pub struct Scope {
    frame: Frame,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    /// The scope of a binding: the object's members, then its context.
    pub fn binding(object: &ObjectRef, context: &Rc<Context>) -> Rc<Scope> {
        let ctx = Rc::new(Scope { frame: Frame::Context(context.clone()), parent: None });
        Rc::new(Scope { frame: Frame::Object(Rc::downgrade(object)), parent: Some(ctx) })
    }

    /// Fresh function-local frame.
    pub fn locals(parent: &Rc<Scope>, this: Value) -> Rc<Scope> {
        Rc::new(Scope {
            frame: Frame::Locals { vars: RefCell::new(IndexMap::new()), this },
            parent: Some(parent.clone()),
        })
    }

    /// Top-level scope for free-standing scripts: locals over globals.
    pub fn global() -> Rc<Scope> {
        Rc::new(Scope {
            frame: Frame::Locals { vars: RefCell::new(IndexMap::new()), this: Value::Undefined },
            parent: None,
        })
    }

    pub fn with(parent: &Rc<Scope>, value: Value) -> Rc<Scope> {
        Rc::new(Scope { frame: Frame::With(value), parent: Some(parent.clone()) })
    }

    fn frames(&self) -> impl Iterator<Item = &Scope> {
        std::iter::successors(Some(self), |s| s.parent.as_deref())
    }

    /// `this` of the innermost function frame.
    pub fn this(&self) -> Value {
        self.frames()
            .find_map(|s| match &s.frame {
                Frame::Locals { this, .. } => Some(this.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Declare in the innermost function frame, keeping an existing value
    /// when `value` is `None`.
    pub fn declare(&self, name: &str, value: Option<Value>) {
        let frame = self.frames().find_map(|s| match &s.frame {
            Frame::Locals { vars, .. } => Some(vars),
            _ => None,
        });
        if let Some(vars) = frame {
            let mut vars = vars.borrow_mut();
            match value {
                Some(v) => {
                    vars.insert(name.to_string(), v);
                }
                None => {
                    vars.entry(name.to_string()).or_default();
                }
            }
        }
    }

    /// Resolve a free name, or `None` when nothing defines it.
    pub fn resolve(&self, engine: &Engine, name: &str) -> Result<Option<Value>, EvalError> {
        for scope in self.frames() {
            let found = match &scope.frame {
                Frame::Locals { vars, .. } => vars.borrow().get(name).cloned(),
                Frame::Object(obj) => match obj.upgrade() {
                    Some(obj) if !obj.is_deleted() => obj.member(engine, name)?,
                    _ => None,
                },
                Frame::Context(ctx) => ctx.lookup(engine, name)?,
                Frame::With(value) => with_member(engine, value, name)?,
            };
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(engine.global(name))
    }

    pub fn lookup(&self, engine: &Engine, name: &str) -> Result<Value, EvalError> {
        self.resolve(engine, name)?.ok_or_else(|| EvalError::Reference(name.to_string()))
    }

    /// Assign to the innermost definition of `name`; undeclared names become
    /// globals.
    pub fn assign(&self, engine: &Engine, name: &str, value: Value) -> Result<(), EvalError> {
        for scope in self.frames() {
            match &scope.frame {
                Frame::Locals { vars, .. } => {
                    if let Some(slot) = vars.borrow_mut().get_mut(name) {
                        *slot = value;
                        return Ok(());
                    }
                }
                Frame::Object(obj) => {
                    if let Some(prop) = obj.upgrade().and_then(|o| o.property(name)) {
                        return prop.set(engine, value, false, None);
                    }
                }
                Frame::Context(ctx) => {
                    if ctx.assign(engine, name, &value)? {
                        return Ok(());
                    }
                }
                Frame::With(Value::Object(obj)) => {
                    if let Some(prop) = obj.property(name) {
                        return prop.set(engine, value, false, None);
                    }
                }
                Frame::With(Value::Map(map)) => {
                    if let Some(slot) = map.borrow_mut().get_mut(name) {
                        *slot = value;
                        return Ok(());
                    }
                }
                Frame::With(_) => {}
            }
        }
        engine.set_global(name, value);
        Ok(())
    }
}

fn with_member(engine: &Engine, value: &Value, name: &str) -> Result<Option<Value>, EvalError> {
    Ok(match value {
        Value::Object(obj) => obj.member(engine, name)?,
        Value::Map(map) => map.borrow().get(name).cloned(),
        _ => None,
    })
}
