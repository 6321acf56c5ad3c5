//! Runtime objects and evaluation contexts.
//!
//! An `Object` is the composition of a few capability maps (properties,
//! signals, methods, property groups) plus a `Kind` carrying the per-element
//! state that built-in element behaviour needs. Objects own their children
//! through the tidy-up list; parents are weak.
//!
//! A `Context` is the component scope of one component instance: the ids
//! declared in it, its root object and the enclosing context.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::elements::animation::AnimationState;
use crate::elements::component::ComponentData;
use crate::elements::item::ItemState;
use crate::elements::state::ChangeEntry;
use crate::elements::timer::TimerState;
use crate::engine::Engine;
use crate::error::EvalError;
use crate::property::Property;
use crate::signal::{Receiver, Signal};
use crate::value::Value;

pub type ObjectRef = Rc<Object>;

/// Per-element state for built-in element behaviour.
pub enum Kind {
    QtObject,
    /// Property group such as `anchors` or `font`, or the attached
    /// `Component` object.
    Group,
    Item(ItemState),
    Component(ComponentData),
    State,
    PropertyChanges(RefCell<Vec<ChangeEntry>>),
    Transition,
    Animation(AnimationState),
    Behavior,
    Timer(TimerState),
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::QtObject => "QtObject",
            Kind::Group => "group",
            Kind::Item(_) => "Item",
            Kind::Component(_) => "Component",
            Kind::State => "State",
            Kind::PropertyChanges(_) => "PropertyChanges",
            Kind::Transition => "Transition",
            Kind::Animation(_) => "Animation",
            Kind::Behavior => "Behavior",
            Kind::Timer(_) => "Timer",
        }
    }
}

/// Something to release when the owning object is deleted.
pub(crate) enum TidyUp {
    /// Owned child object, deleted recursively.
    Child(ObjectRef),
    /// A signal this object is connected to as receiver.
    Signal(Signal),
}

pub struct Object {
    class_name: String,
    kind: Kind,
    id: RefCell<Option<String>>,
    parent: RefCell<Weak<Object>>,
    properties: RefCell<IndexMap<String, Rc<Property>>>,
    signals: RefCell<IndexMap<String, Signal>>,
    methods: RefCell<IndexMap<String, Value>>,
    groups: RefCell<IndexMap<String, ObjectRef>>,
    context: RefCell<Option<Rc<Context>>>,
    default_property: RefCell<Option<String>>,
    is_component_root: Cell<bool>,
    tidyup: RefCell<Vec<TidyUp>>,
    deleted: Cell<bool>,
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.class_name)
    }
}

impl Object {
    /// Create an object owned by `parent`.
    pub fn new(class_name: impl Into<String>, kind: Kind, parent: Option<&ObjectRef>) -> ObjectRef {
        let obj = Rc::new(Object {
            class_name: class_name.into(),
            kind,
            id: RefCell::new(None),
            parent: RefCell::new(parent.map(Rc::downgrade).unwrap_or_default()),
            properties: RefCell::new(IndexMap::new()),
            signals: RefCell::new(IndexMap::new()),
            methods: RefCell::new(IndexMap::new()),
            groups: RefCell::new(IndexMap::new()),
            context: RefCell::new(None),
            default_property: RefCell::new(None),
            is_component_root: Cell::new(false),
            tidyup: RefCell::new(Vec::new()),
            deleted: Cell::new(false),
        });
        if let Some(parent) = parent {
            parent.tidyup.borrow_mut().push(TidyUp::Child(obj.clone()));
        }
        obj
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// The document id this object was declared with, if any.
    pub fn id(&self) -> Option<String> {
        self.id.borrow().clone()
    }

    pub(crate) fn set_id(&self, id: &str) {
        *self.id.borrow_mut() = Some(id.to_string());
    }

    /// Owning object (not the visual `parent` property of items).
    pub fn owner(&self) -> Option<ObjectRef> {
        self.parent.borrow().upgrade()
    }

    pub fn context(&self) -> Option<Rc<Context>> {
        self.context.borrow().clone()
    }

    pub(crate) fn set_context(&self, context: &Rc<Context>) {
        *self.context.borrow_mut() = Some(context.clone());
    }

    pub fn default_property(&self) -> Option<String> {
        self.default_property.borrow().clone()
    }

    pub fn set_default_property(&self, name: impl Into<String>) {
        *self.default_property.borrow_mut() = Some(name.into());
    }

    pub fn is_component_root(&self) -> bool {
        self.is_component_root.get()
    }

    pub(crate) fn mark_component_root(&self) {
        self.is_component_root.set(true);
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.get()
    }

    /// Objects owned by this one, in creation order.
    pub fn owned_children(&self) -> Vec<ObjectRef> {
        self.tidyup
            .borrow()
            .iter()
            .filter_map(|t| match t {
                TidyUp::Child(c) => Some(c.clone()),
                TidyUp::Signal(_) => None,
            })
            .collect()
    }

    pub(crate) fn track_signal(&self, signal: Signal) {
        if !self.deleted.get() {
            self.tidyup.borrow_mut().push(TidyUp::Signal(signal));
        }
    }

    // ── Properties ────────────────────────────────────────────────────────

    /// Declare a property, replacing any earlier declaration of the same name.
    pub fn add_property(self: &Rc<Self>, name: &str, type_name: &str) -> Rc<Property> {
        let prop = Property::new(name, type_name, Rc::downgrade(self));
        self.properties.borrow_mut().insert(name.to_string(), prop.clone());
        prop
    }

    pub(crate) fn insert_property(&self, prop: Rc<Property>) {
        self.properties.borrow_mut().insert(prop.name().to_string(), prop);
    }

    pub fn property(&self, name: &str) -> Option<Rc<Property>> {
        self.properties.borrow().get(name).cloned()
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.borrow().contains_key(name)
    }

    /// All property cells in declaration order.
    pub fn properties(&self) -> Vec<Rc<Property>> {
        self.properties.borrow().values().cloned().collect()
    }

    /// Read a property through its tracked getter. Unknown names read as
    /// `undefined`.
    pub fn get(self: &Rc<Self>, engine: &Engine, name: &str) -> Result<Value, EvalError> {
        Ok(self.member(engine, name)?.unwrap_or_default())
    }

    /// Assign a plain value to a property, as a script assignment would.
    pub fn set(&self, engine: &Engine, name: &str, value: impl Into<Value>) -> Result<(), EvalError> {
        let value: Value = value.into();
        match self.property(name) {
            Some(prop) => prop.set(engine, value, false, None),
            None => Err(EvalError::type_error(format!(
                "Cannot assign to non-existent property \"{name}\" of {}",
                self.class_name
            ))),
        }
    }

    // ── Signals, methods and groups ───────────────────────────────────────

    pub fn add_signal(self: &Rc<Self>, name: &str, params: Vec<String>) -> Signal {
        let signal = Signal::new(name, params, Rc::downgrade(self));
        self.signals.borrow_mut().insert(name.to_string(), signal.clone());
        signal
    }

    /// A declared signal, or the change signal of property `x` for `xChanged`.
    pub fn signal(&self, name: &str) -> Option<Signal> {
        if let Some(s) = self.signals.borrow().get(name) {
            return Some(s.clone());
        }
        let prop = name.strip_suffix("Changed")?;
        self.property(prop).map(|p| p.changed().clone())
    }

    pub fn add_method(&self, name: &str, function: Value) {
        self.methods.borrow_mut().insert(name.to_string(), function);
    }

    pub fn method(&self, name: &str) -> Option<Value> {
        self.methods.borrow().get(name).cloned()
    }

    /// Call a method with `this` bound to the object.
    pub fn invoke(self: &Rc<Self>, engine: &Engine, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        let f = self
            .method(name)
            .ok_or_else(|| EvalError::type_error(format!("{}.{name} is not a function", self.class_name)))?;
        engine.call(&f, Value::Object(self.clone()), args)
    }

    pub fn add_group(self: &Rc<Self>, name: &str) -> ObjectRef {
        let group = Object::new(name, Kind::Group, Some(self));
        if let Some(ctx) = self.context() {
            group.set_context(&ctx);
        }
        self.groups.borrow_mut().insert(name.to_string(), group.clone());
        group
    }

    pub fn group(&self, name: &str) -> Option<ObjectRef> {
        self.groups.borrow().get(name).cloned()
    }

    /// Resolve a member the way a script sees it: property, group, signal,
    /// method, then the implicit `<name>Changed` signals.
    pub fn member(self: &Rc<Self>, engine: &Engine, name: &str) -> Result<Option<Value>, EvalError> {
        if let Some(prop) = self.property(name) {
            return prop.get(engine).map(Some);
        }
        if let Some(group) = self.group(name) {
            return Ok(Some(Value::Object(group)));
        }
        if let Some(signal) = self.signals.borrow().get(name) {
            return Ok(Some(Value::Signal(signal.clone())));
        }
        if let Some(method) = self.method(name) {
            return Ok(Some(method));
        }
        Ok(self.signal(name).map(Value::Signal))
    }

    /// True when `name` is any kind of member.
    pub fn has_member(&self, name: &str) -> bool {
        self.has_property(name)
            || self.groups.borrow().contains_key(name)
            || self.signals.borrow().contains_key(name)
            || self.methods.borrow().contains_key(name)
            || self.signal(name).is_some()
    }

    // ── Teardown ──────────────────────────────────────────────────────────

    /// Recursively delete owned children, sever every connection recorded in
    /// either direction and detach from the owner. Idempotent.
    pub fn delete(self: &Rc<Self>) {
        if self.deleted.replace(true) {
            return;
        }
        log::trace!("deleting {}", self.class_name);

        let receiver = Receiver::Object(Rc::downgrade(self));
        let tidy = std::mem::take(&mut *self.tidyup.borrow_mut());
        for entry in tidy {
            match entry {
                TidyUp::Child(child) => child.delete(),
                TidyUp::Signal(signal) => signal.disconnect_receiver(&receiver),
            }
        }

        let props = std::mem::take(&mut *self.properties.borrow_mut());
        for prop in props.values() {
            prop.teardown();
        }
        let signals = std::mem::take(&mut *self.signals.borrow_mut());
        for signal in signals.values() {
            signal.clear();
        }
        self.methods.borrow_mut().clear();
        self.groups.borrow_mut().clear();
        *self.context.borrow_mut() = None;

        let owner = std::mem::take(&mut *self.parent.borrow_mut());
        if let Some(owner) = owner.upgrade() {
            owner
                .tidyup
                .borrow_mut()
                .retain(|t| !matches!(t, TidyUp::Child(c) if Rc::ptr_eq(c, self)));
            for list in ["data", "children", "resources"] {
                if let Some(prop) = owner.property(list) {
                    prop.remove_from_list(self);
                }
            }
        }
    }
}

// ── Context ───────────────────────────────────────────────────────────────

/// Component scope: ids, the component root and the enclosing context.
#[derive(Default)]
pub struct Context {
    parent: Option<Rc<Context>>,
    ids: RefCell<IndexMap<String, Weak<Object>>>,
    root: RefCell<Weak<Object>>,
}

impl Context {
    pub fn new_root() -> Rc<Self> {
        Rc::new(Context::default())
    }

    /// Fresh scope whose unresolved names fall back to `parent`.
    pub fn child(parent: &Rc<Context>) -> Rc<Self> {
        Rc::new(Context { parent: Some(parent.clone()), ..Context::default() })
    }

    pub fn register_id(&self, id: &str, obj: &ObjectRef) {
        let mut ids = self.ids.borrow_mut();
        if ids.get(id).is_some_and(|w| w.strong_count() > 0) {
            log::warn!("Duplicate id \"{id}\", the later declaration wins");
        }
        ids.insert(id.to_string(), Rc::downgrade(obj));
    }

    /// Look up an id in this context and its ancestors.
    pub fn id(&self, name: &str) -> Option<ObjectRef> {
        if let Some(obj) = self.ids.borrow().get(name).and_then(Weak::upgrade) {
            return Some(obj);
        }
        self.parent.as_ref().and_then(|p| p.id(name))
    }

    pub(crate) fn set_root(&self, obj: &ObjectRef) {
        *self.root.borrow_mut() = Rc::downgrade(obj);
    }

    pub fn root(&self) -> Option<ObjectRef> {
        self.root.borrow().upgrade()
    }

    /// Resolve a free name: ids, then members of the component root, then the
    /// enclosing context.
    pub fn lookup(&self, engine: &Engine, name: &str) -> Result<Option<Value>, EvalError> {
        let id = self.ids.borrow().get(name).and_then(Weak::upgrade);
        if let Some(obj) = id {
            return Ok(Some(Value::Object(obj)));
        }
        if let Some(root) = self.root() {
            if let Some(v) = root.member(engine, name)? {
                return Ok(Some(v));
            }
        }
        match &self.parent {
            Some(parent) => parent.lookup(engine, name),
            None => Ok(None),
        }
    }

    /// Assign to a component-root property visible from this context.
    /// Returns false when no context in the chain has one.
    pub fn assign(&self, engine: &Engine, name: &str, value: &Value) -> Result<bool, EvalError> {
        if let Some(prop) = self.root().and_then(|r| r.property(name)) {
            prop.set(engine, value.clone(), false, None)?;
            return Ok(true);
        }
        match &self.parent {
            Some(parent) => parent.assign(engine, name, value),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn signal_falls_back_to_change_signal() {
        let obj = Object::new("QtObject", Kind::QtObject, None);
        obj.add_property("width", "real");
        assert!(obj.signal("widthChanged").is_some());
        assert!(obj.signal("heightChanged").is_none());
    }

    #[test]
    fn delete_detaches_from_owner() {
        let parent = Object::new("QtObject", Kind::QtObject, None);
        let child = Object::new("QtObject", Kind::QtObject, Some(&parent));
        assert_eq!(parent.owned_children().len(), 1);
        child.delete();
        assert!(parent.owned_children().is_empty());
        assert!(child.owner().is_none());
        child.delete();
    }

    #[test]
    fn context_lookup_walks_outwards() {
        let engine = Engine::new(EngineConfig::default());
        let outer = Context::new_root();
        let inner = Context::child(&outer);
        let a = Object::new("QtObject", Kind::QtObject, None);
        outer.register_id("a", &a);
        let found = inner.lookup(&engine, "a").unwrap();
        assert!(matches!(found, Some(Value::Object(o)) if Rc::ptr_eq(&o, &a)));
        assert!(inner.lookup(&engine, "b").unwrap().is_none());
    }
}
