//! Built-in element types.
//!
//! | Module       | Types |
//! |--------------|-------|
//! | `item`       | `Item`, `Rectangle`, `Text`; state switching |
//! | `state`      | `State`, `PropertyChanges` |
//! | `transition` | `Transition` |
//! | `animation`  | `PropertyAnimation`, `NumberAnimation`, `SequentialAnimation`, `ParallelAnimation` |
//! | `behavior`   | `Behavior` |
//! | `timer`      | `Timer` |
//! | `component`  | `Component` objects and `createObject` |
//! | `easing`     | easing curves |
//!
//! Every object starts from [`base`], which attaches the `Component` group
//! with its `completed` signal. Layout and painting are left to the host:
//! the visual types only declare the properties a renderer reads.

pub mod animation;
pub mod behavior;
pub mod component;
pub mod easing;
pub mod item;
pub mod state;
pub mod timer;
pub mod transition;

use std::rc::Rc;

use crate::engine::Engine;
use crate::error::EvalError;
use crate::object::{Kind, Object, ObjectRef};
use crate::property::Property;
use crate::registry::{CreateArgs, Factory, TypeRegistry};
use crate::value::{Function, Value};

pub(crate) fn register_builtins(registry: &mut TypeRegistry) {
    registry.register("QtObject", factory(create_qt_object));
    registry.register("Item", factory(item::create_item));
    registry.register("Rectangle", factory(item::create_rectangle));
    registry.register("Text", factory(item::create_text));
    registry.register("State", factory(state::create_state));
    registry.register("PropertyChanges", factory(state::create_property_changes));
    registry.register("Transition", factory(transition::create));
    registry.register("PropertyAnimation", factory(animation::create_property_animation));
    registry.register("NumberAnimation", factory(animation::create_property_animation));
    registry.register("SequentialAnimation", factory(animation::create_sequential));
    registry.register("ParallelAnimation", factory(animation::create_parallel));
    registry.register("Behavior", factory(behavior::create));
    registry.register("Timer", factory(timer::create));
}

fn factory(f: fn(&Engine, &CreateArgs<'_>) -> Result<ObjectRef, EvalError>) -> Factory {
    Rc::new(f)
}

/// Bare object of `kind` with the `Component.completed` signal queued.
pub fn base(engine: &Engine, args: &CreateArgs<'_>, kind: Kind) -> ObjectRef {
    let obj = Object::new(args.meta.class_name.as_str(), kind, args.parent);
    obj.set_context(args.context);
    let group = obj.add_group("Component");
    let completed = group.add_signal("completed", Vec::new());
    engine.queue_completed(completed);
    obj
}

fn create_qt_object(engine: &Engine, args: &CreateArgs<'_>) -> Result<ObjectRef, EvalError> {
    let obj = base(engine, args, Kind::QtObject);
    declare(&obj, "objectName", "string", "");
    Ok(obj)
}

// ── Helpers for element factories ─────────────────────────────────────────

/// Declare a property holding `initial` without notifying.
pub(crate) fn declare(obj: &ObjectRef, name: &str, type_name: &str, initial: impl Into<Value>) -> Rc<Property> {
    let prop = obj.add_property(name, type_name);
    prop.store_silently(initial.into());
    prop
}

/// Add a native method whose `this` must be the object itself.
pub(crate) fn method(
    obj: &ObjectRef,
    name: &str,
    f: impl Fn(&Engine, &ObjectRef, &[Value]) -> Result<Value, EvalError> + 'static,
) {
    let method_name = name.to_string();
    obj.add_method(
        name,
        Function::native(name, move |engine, this, args| match this {
            Value::Object(obj) => f(engine, obj, args),
            _ => Err(EvalError::type_error(format!("{method_name} called on a non-object"))),
        }),
    );
}

/// Untracked read of a property value; `undefined` when missing.
pub(crate) fn read(engine: &Engine, obj: &ObjectRef, name: &str) -> Value {
    engine.untracked(|| obj.get(engine, name)).unwrap_or_default()
}

/// Objects of a list property, skipping non-object items.
pub(crate) fn objects_of(engine: &Engine, obj: &ObjectRef, name: &str) -> Vec<ObjectRef> {
    read(engine, obj, name)
        .array_items()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect()
}

// ── Scheduler dispatch ────────────────────────────────────────────────────

pub(crate) fn tick(engine: &Engine, obj: &ObjectRef, now_ms: f64, elapsed_ms: f64) -> Result<(), EvalError> {
    match obj.kind() {
        Kind::Animation(state) => animation::tick(engine, obj, state, elapsed_ms),
        Kind::Timer(state) => timer::tick(engine, obj, state, now_ms),
        _ => Ok(()),
    }
}

pub(crate) fn on_engine_start(engine: &Engine, obj: &ObjectRef) -> Result<(), EvalError> {
    match obj.kind() {
        Kind::Animation(state) if state.is_group() => animation::on_engine_start(engine, obj),
        Kind::Timer(_) => timer::on_engine_start(engine, obj),
        _ => Ok(()),
    }
}

pub(crate) fn on_engine_stop(engine: &Engine, obj: &ObjectRef) -> Result<(), EvalError> {
    match obj.kind() {
        Kind::Animation(state) if state.is_group() => animation::stop(engine, obj),
        Kind::Timer(_) => timer::stop(engine, obj),
        _ => Ok(()),
    }
}
