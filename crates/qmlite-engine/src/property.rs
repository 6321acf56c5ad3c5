//! Reactive property cells.
//!
//! A `Property` stores the current value, an optional binding with the scope
//! it evaluates in, and a change signal. Dependencies are not stored as a
//! graph: reading a property while another one is being evaluated connects
//! the read property's change signal to the reader's `update`.
//!
//! Assignment rules, in order:
//!
//! 1. a binding needs an object scope and a component scope; during the
//!    init phase it is queued, otherwise evaluated on the spot;
//! 2. a plain value drops the binding unless the write comes from an
//!    animation; arrays are copied;
//! 3. coercion: `list` properties construct element templates, element
//!    templates become objects (or components), objects and falsy values are
//!    stored as they are, anything else goes through the declared type;
//! 4. the change signal fires `(new, old, name)` on strict inequality only.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::binding::Binding;
use crate::construct;
use crate::elements::animation;
use crate::engine::Engine;
use crate::error::EvalError;
use crate::object::{Context, Object, ObjectRef};
use crate::signal::{Receiver, Signal, Slot};
use crate::value::Value;

/// What can be written into a property.
#[derive(Clone)]
pub enum Assignment {
    Value(Value),
    Binding(Rc<Binding>),
}

impl From<Value> for Assignment {
    fn from(v: Value) -> Self {
        Assignment::Value(v)
    }
}

impl From<Rc<Binding>> for Assignment {
    fn from(b: Rc<Binding>) -> Self {
        Assignment::Binding(b)
    }
}

/// The (objectScope, componentScope) pair a binding evaluates in.
#[derive(Clone)]
pub struct EvalScope {
    pub object: ObjectRef,
    pub context: Rc<Context>,
}

impl EvalScope {
    pub fn new(object: &ObjectRef, context: &Rc<Context>) -> Self {
        Self { object: object.clone(), context: context.clone() }
    }
}

#[derive(Clone)]
pub(crate) struct ActiveBinding {
    pub binding: Rc<Binding>,
    pub object: Weak<Object>,
    pub context: Rc<Context>,
}

/// `property alias name: object[.property]`, resolved on every access.
#[derive(Clone)]
pub struct AliasTarget {
    pub object: String,
    pub property: Option<String>,
    pub context: Rc<Context>,
}

pub struct Property {
    name: String,
    type_name: String,
    owner: Weak<Object>,
    value: RefCell<Value>,
    binding: RefCell<Option<ActiveBinding>>,
    changed: Signal,
    animation: RefCell<Option<Weak<Object>>>,
    alias: RefCell<Option<AliasTarget>>,
    /// Signals this property's `update` is connected to.
    tidyup: RefCell<Vec<Signal>>,
    self_weak: Weak<Property>,
}

impl Property {
    pub fn new(name: &str, type_name: &str, owner: Weak<Object>) -> Rc<Self> {
        Rc::new_cyclic(|me| Property {
            name: name.to_string(),
            type_name: type_name.to_string(),
            changed: Signal::new(format!("{name}Changed"), Vec::new(), owner.clone()),
            owner,
            value: RefCell::new(Value::Undefined),
            binding: RefCell::new(None),
            animation: RefCell::new(None),
            alias: RefCell::new(None),
            tidyup: RefCell::new(Vec::new()),
            self_weak: me.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn owner(&self) -> Option<ObjectRef> {
        self.owner.upgrade()
    }

    pub fn changed(&self) -> &Signal {
        &self.changed
    }

    pub fn has_binding(&self) -> bool {
        self.binding.borrow().is_some()
    }

    /// Source text of the current binding.
    pub fn binding_source(&self) -> Option<String> {
        self.binding.borrow().as_ref().map(|b| b.binding.source().to_string())
    }

    pub(crate) fn active_binding(&self) -> Option<ActiveBinding> {
        self.binding.borrow().clone()
    }

    pub fn is_alias(&self) -> bool {
        self.alias.borrow().is_some()
    }

    pub(crate) fn set_alias(&self, target: AliasTarget) {
        *self.alias.borrow_mut() = Some(target);
    }

    /// Current value without registering a dependency.
    pub fn peek(&self) -> Value {
        self.value.borrow().clone()
    }

    pub fn animation(&self) -> Option<ObjectRef> {
        self.animation.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn set_animation(&self, animation: Option<&ObjectRef>) {
        *self.animation.borrow_mut() = animation.map(Rc::downgrade);
    }

    // ── Reading ───────────────────────────────────────────────────────────

    /// Read the value and, while a binding is being evaluated, subscribe that
    /// binding's property to this one's change signal.
    pub fn get(&self, engine: &Engine) -> Result<Value, EvalError> {
        if let Some(target) = self.alias.borrow().clone() {
            return self.alias_get(engine, &target);
        }
        if let Some(reader) = engine.evaluating_property() {
            if !std::ptr::eq(Rc::as_ptr(&reader), self) && !self.changed.is_update_connected(&reader) {
                self.changed.connect_update(&reader);
            }
        }
        Ok(self.value.borrow().clone())
    }

    fn alias_get(&self, engine: &Engine, target: &AliasTarget) -> Result<Value, EvalError> {
        let object = target
            .context
            .lookup(engine, &target.object)?
            .ok_or_else(|| EvalError::Reference(target.object.clone()))?;
        match (&target.property, object) {
            (None, object) => Ok(object),
            (Some(prop), Value::Object(obj)) => obj.get(engine, prop),
            (Some(_), _) => Ok(Value::Undefined),
        }
    }

    fn alias_property(&self, engine: &Engine, target: &AliasTarget) -> Result<Rc<Property>, EvalError> {
        let Some(prop_name) = &target.property else {
            return Err(EvalError::type_error("Cannot set alias property pointing to an QML object."));
        };
        let object = target.context.lookup(engine, &target.object)?;
        object
            .as_ref()
            .and_then(Value::as_object)
            .and_then(|o| o.property(prop_name))
            .ok_or_else(|| EvalError::Reference(format!("{}.{prop_name}", target.object)))
    }

    /// Forward the aliased property's change signal to this one's.
    pub(crate) fn wire_alias(&self, engine: &Engine) -> Result<(), EvalError> {
        let Some(target) = self.alias.borrow().clone() else { return Ok(()) };
        if target.property.is_none() {
            return Ok(());
        }
        let source = self.alias_property(engine, &target)?;
        let me = self.self_weak.clone();
        source.changed.connect(
            Some(Receiver::Property(me.clone())),
            Slot::native(move |engine, args| match me.upgrade() {
                Some(alias) => alias.changed.emit(engine, args),
                None => Ok(()),
            }),
        );
        Ok(())
    }

    // ── Writing ───────────────────────────────────────────────────────────

    pub fn set(
        &self,
        engine: &Engine,
        value: impl Into<Assignment>,
        from_animation: bool,
        scope: Option<EvalScope>,
    ) -> Result<(), EvalError> {
        let value = value.into();
        if let Some(target) = self.alias.borrow().clone() {
            let source = self.alias_property(engine, &target)?;
            return source.set(engine, value, from_animation, scope);
        }

        let old = self.value.borrow().clone();
        let context = scope.as_ref().map(|s| s.context.clone());
        let new = match value {
            Assignment::Binding(binding) => {
                let Some(scope) = scope else {
                    return Err(EvalError::BindingScope(self.name.clone()));
                };
                let active = ActiveBinding {
                    binding,
                    object: Rc::downgrade(&scope.object),
                    context: scope.context,
                };
                *self.binding.borrow_mut() = Some(active.clone());
                if engine.is_initializing() {
                    engine.queue_binding(self.self_weak.clone());
                    return Ok(());
                }
                self.evaluate(engine, &active)?
            }
            Assignment::Value(v) => {
                if !from_animation {
                    *self.binding.borrow_mut() = None;
                }
                v.copied()
            }
        };

        let new = self.coerce(engine, new, context)?;
        self.commit(engine, old, new, from_animation)
    }

    /// Re-evaluate the binding, if any, and propagate a change.
    pub fn update(&self, engine: &Engine) -> Result<(), EvalError> {
        let Some(active) = self.active_binding() else { return Ok(()) };
        let Some(me) = self.self_weak.upgrade() else { return Ok(()) };
        let _guard = engine.enter_update(&me)?;
        let old = self.value.borrow().clone();
        let new = self.evaluate(engine, &active)?;
        let new = self.coerce(engine, new, Some(active.context.clone()))?;
        self.commit(engine, old, new, false)
    }

    fn evaluate(&self, engine: &Engine, active: &ActiveBinding) -> Result<Value, EvalError> {
        let (Some(object), Some(me)) = (active.object.upgrade(), self.self_weak.upgrade()) else {
            return Ok(Value::Undefined);
        };
        let _guard = engine.enter_evaluation(&me)?;
        active.binding.eval(engine, &object, &active.context)
    }

    fn commit(&self, engine: &Engine, old: Value, new: Value, from_animation: bool) -> Result<(), EvalError> {
        if new.strict_eq(&old) {
            return Ok(());
        }
        if !from_animation && engine.animates_behaviors() {
            if let Some(anim) = self.animation() {
                if animation::animate_behavior(engine, &anim, self.owner(), &self.name, old.clone(), new.clone())? {
                    return Ok(());
                }
            }
        }
        *self.value.borrow_mut() = new.clone();
        self.changed.emit(engine, &[new, old, Value::from(self.name.as_str())])
    }

    /// Store without notifying. The caller emits later, e.g. `Timer` after
    /// `triggered`.
    pub(crate) fn store_silently(&self, value: Value) {
        *self.value.borrow_mut() = value;
    }

    fn coerce(&self, engine: &Engine, value: Value, context: Option<Rc<Context>>) -> Result<Value, EvalError> {
        let owner = self.owner();
        let context = || {
            context
                .clone()
                .or_else(|| owner.as_ref().and_then(|o| o.context()))
                .unwrap_or_else(Context::new_root)
        };

        if self.type_name == "list" {
            let items = match value {
                Value::Array(items) => items.borrow().clone(),
                Value::Undefined | Value::Null => Vec::new(),
                other => vec![other],
            };
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(match item {
                    Value::Element(meta) => {
                        construct::instantiate(engine, &meta, owner.as_ref(), &context(), false)?
                    }
                    other => other,
                });
            }
            return Ok(Value::array(out));
        }

        match value {
            Value::Element(meta) => {
                let as_component = self.type_name == "Component";
                construct::instantiate(engine, &meta, owner.as_ref(), &context(), as_component)
            }
            v if !v.is_primitive() || !v.truthy() => Ok(v),
            v => Ok(coerce_to_type(&self.type_name, v)),
        }
    }

    // ── List helpers ──────────────────────────────────────────────────────

    /// Append to a list value in place and notify.
    pub(crate) fn push_to_list(&self, engine: &Engine, item: Value) -> Result<(), EvalError> {
        let list = match &*self.value.borrow() {
            Value::Array(items) => Some(items.clone()),
            _ => None,
        };
        match list {
            Some(items) => items.borrow_mut().push(item),
            None => *self.value.borrow_mut() = Value::array(vec![item]),
        }
        self.notify_in_place(engine)
    }

    /// Remove an object from a list value in place, without notifying.
    pub(crate) fn remove_from_list(&self, obj: &ObjectRef) -> bool {
        if let Value::Array(items) = &*self.value.borrow() {
            let mut items = items.borrow_mut();
            let before = items.len();
            items.retain(|v| !matches!(v, Value::Object(o) if Rc::ptr_eq(o, obj)));
            return items.len() != before;
        }
        false
    }

    /// Emit the change signal for a value mutated in place.
    pub(crate) fn notify_in_place(&self, engine: &Engine) -> Result<(), EvalError> {
        let v = self.value.borrow().clone();
        self.changed.emit(engine, &[v.clone(), v, Value::from(self.name.as_str())])
    }

    // ── Teardown ──────────────────────────────────────────────────────────

    pub(crate) fn track_signal(&self, signal: Signal) {
        let mut tidyup = self.tidyup.borrow_mut();
        if !tidyup.iter().any(|s| s.same(&signal)) {
            tidyup.push(signal);
        }
    }

    pub(crate) fn teardown(&self) {
        let me = Receiver::Property(self.self_weak.clone());
        let signals = std::mem::take(&mut *self.tidyup.borrow_mut());
        for signal in signals {
            signal.disconnect_receiver(&me);
        }
        self.changed.clear();
        *self.binding.borrow_mut() = None;
        *self.animation.borrow_mut() = None;
        *self.alias.borrow_mut() = None;
        *self.value.borrow_mut() = Value::Undefined;
    }
}

/// Value a declared property starts with when the declaration has none.
pub fn default_for_type(type_name: &str) -> Value {
    match type_name {
        "int" | "real" | "double" | "number" | "enum" => Value::Number(0.0),
        "bool" => Value::Bool(false),
        "string" | "url" | "color" => Value::from(""),
        "list" => Value::array(Vec::new()),
        _ => Value::Undefined,
    }
}

/// Coercion of a truthy primitive to a declared type.
pub fn coerce_to_type(type_name: &str, v: Value) -> Value {
    match type_name {
        "int" => Value::Number(f64::from(v.to_int32())),
        "real" | "double" | "number" | "enum" => Value::Number(v.to_number()),
        "string" | "url" | "color" => Value::from(v.to_display_string()),
        "bool" => Value::Bool(v.truthy()),
        _ => v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_coercions() {
        assert_eq!(coerce_to_type("int", Value::from(3.7)), Value::from(3));
        assert_eq!(coerce_to_type("real", Value::from("2.5")), Value::from(2.5));
        assert_eq!(coerce_to_type("string", Value::from(4)), Value::from("4"));
        assert_eq!(coerce_to_type("bool", Value::from("yes")), Value::from(true));
        assert_eq!(coerce_to_type("var", Value::from("x")), Value::from("x"));
    }

    #[test]
    fn declared_defaults() {
        assert_eq!(default_for_type("int"), Value::from(0));
        assert_eq!(default_for_type("string"), Value::from(""));
        assert!(default_for_type("var").is_undefined());
        assert_eq!(default_for_type("list").array_items().map(|v| v.len()), Some(0));
    }
}
