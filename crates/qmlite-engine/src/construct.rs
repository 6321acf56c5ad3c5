//! Instantiation of element templates.
//!
//! `construct` builds one object from a `MetaElement`:
//!
//! 1. the bare object comes from the type registry, else from a registered
//!    component (its own template is built first, in a fresh context), else
//!    a `QtObject` placeholder;
//! 2. the id is registered in the component scope;
//! 3. the entries are applied in declaration order (handlers, signals,
//!    methods, aliases, property declarations, groups, plain assignments);
//! 4. child elements are assigned to the default property;
//! 5. a `default property` declaration takes effect for later users.
//!
//! Everything runs inside the init phase, so bindings only evaluate once the
//! whole tree exists.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::elements::state::ChangeEntry;
use crate::elements::{self, component};
use crate::engine::Engine;
use crate::error::EvalError;
use crate::meta::{MetaElement, MetaValue};
use crate::object::{Context, Kind, ObjectRef};
use crate::property::{default_for_type, AliasTarget, Assignment, EvalScope};
use crate::registry::CreateArgs;
use crate::script::Scope;
use crate::signal::{Receiver, Slot};
use crate::value::{Function, Value};

/// Instantiate a template as a property value: a `Component` object when the
/// slot wants one (or the template is a `Component`), a constructed object
/// otherwise.
pub fn instantiate(
    engine: &Engine,
    meta: &Rc<MetaElement>,
    owner: Option<&ObjectRef>,
    context: &Rc<Context>,
    as_component: bool,
) -> Result<Value, EvalError> {
    if as_component || meta.class_name == "Component" {
        return Ok(Value::Object(component::create(meta, owner, context)));
    }
    engine.begin_init();
    let built = construct(engine, meta, owner, context, false);
    let ended = engine.end_init();
    let obj = built?;
    ended?;
    Ok(Value::Object(obj))
}

/// Build a new component instance: the template's root becomes the root of
/// a fresh context nested in `context`.
pub fn create_object(
    engine: &Engine,
    meta: &Rc<MetaElement>,
    parent: Option<&ObjectRef>,
    context: &Rc<Context>,
) -> Result<ObjectRef, EvalError> {
    let scope = Context::child(context);
    engine.begin_init();
    let built = construct(engine, meta, parent, &scope, true);
    let ended = engine.end_init();
    let obj = built?;
    ended?;
    Ok(obj)
}

pub(crate) fn construct(
    engine: &Engine,
    meta: &Rc<MetaElement>,
    parent: Option<&ObjectRef>,
    context: &Rc<Context>,
    is_component_root: bool,
) -> Result<ObjectRef, EvalError> {
    let obj = create_bare(engine, meta, parent, context)?;
    obj.set_context(context);
    if is_component_root {
        obj.mark_component_root();
        context.set_root(&obj);
    }
    if let Some(id) = &meta.id {
        context.register_id(id, &obj);
        obj.set_id(id);
    }

    let scope = EvalScope::new(&obj, context);
    apply_properties(engine, &meta.properties, &obj, &scope)?;
    assign_children(engine, meta, &obj, &scope)?;

    if let Some(name) = &meta.default_property {
        obj.set_default_property(name.as_str());
    }
    Ok(obj)
}

fn create_bare(
    engine: &Engine,
    meta: &Rc<MetaElement>,
    parent: Option<&ObjectRef>,
    context: &Rc<Context>,
) -> Result<ObjectRef, EvalError> {
    let args = CreateArgs { meta, parent, context };
    if let Some(factory) = engine.factory(&meta.class_name) {
        return factory(engine, &args);
    }
    if let Some(template) = engine.component(&meta.class_name).as_ref().and_then(component::template_of) {
        if engine.enter_component(&meta.class_name) {
            let built = construct(engine, &template, parent, &Context::new_root(), true);
            engine.leave_component();
            return built;
        }
        log::warn!("Component {} instantiates itself, using a placeholder", meta.class_name);
    } else {
        log::warn!("No constructor found for {}", meta.class_name);
    }
    Ok(elements::base(engine, &args, Kind::QtObject))
}

/// Apply template entries to `target`. Bindings and handlers evaluate in
/// `scope`, which stays the element's own object for nested groups.
pub(crate) fn apply_properties(
    engine: &Engine,
    properties: &IndexMap<String, MetaValue>,
    target: &ObjectRef,
    scope: &EvalScope,
) -> Result<(), EvalError> {
    for (name, value) in properties {
        if let Some(signal_name) = handler_signal(name) {
            connect_handler(target, &signal_name, value, scope)?;
            continue;
        }
        match value {
            MetaValue::Signal(params) => {
                target.add_signal(name, params.clone());
            }
            MetaValue::Method(def) => {
                let f = Value::Function(Rc::new(Function::Script {
                    def: def.clone(),
                    scope: Scope::binding(&scope.object, &scope.context),
                }));
                target.add_method(name, f);
            }
            MetaValue::Alias { object, property } => {
                let prop = target.add_property(name, "alias");
                prop.set_alias(AliasTarget {
                    object: object.clone(),
                    property: property.clone(),
                    context: scope.context.clone(),
                });
                if engine.is_initializing() {
                    engine.queue_alias(Rc::downgrade(&prop));
                } else if let Err(e) = prop.wire_alias(engine) {
                    log::warn!("alias \"{name}\" has no target: {e}");
                }
            }
            MetaValue::PropertyDef { type_name, value } => {
                let prop = target.add_property(name, type_name);
                prop.store_silently(default_for_type(type_name));
                if let Some(assignment) = value.as_deref().and_then(to_assignment) {
                    prop.set(engine, assignment, true, Some(scope.clone()))?;
                }
            }
            MetaValue::Group(entries) => match group_target(target, name) {
                Some(group) => apply_properties(engine, entries, &group, scope)?,
                None => log::warn!("Cannot assign to non-existent property group \"{name}\". Ignoring assignment."),
            },
            other => {
                let Some(assignment) = to_assignment(other) else { continue };
                if let Some(prop) = target.property(name) {
                    prop.set(engine, assignment, true, Some(scope.clone()))?;
                } else if let Kind::PropertyChanges(entries) = target.kind() {
                    entries.borrow_mut().push(ChangeEntry { property: name.clone(), value: assignment });
                } else {
                    log::warn!("Cannot assign to non-existent property \"{name}\". Ignoring assignment.");
                }
            }
        }
    }
    Ok(())
}

/// `onFooBar` handles signal `fooBar`.
fn handler_signal(name: &str) -> Option<String> {
    let rest = name.strip_prefix("on")?;
    let mut chars = rest.chars();
    let first = chars.next().filter(char::is_ascii_uppercase)?;
    Some(first.to_ascii_lowercase().to_string() + chars.as_str())
}

fn connect_handler(target: &ObjectRef, signal_name: &str, value: &MetaValue, scope: &EvalScope) -> Result<(), EvalError> {
    let Some(signal) = target.signal(signal_name) else {
        if target.has_member(signal_name) {
            log::warn!("{signal_name} is not a signal!");
        } else {
            log::warn!("No signal called {signal_name} found!");
        }
        return Ok(());
    };
    let MetaValue::Binding(binding) = value else {
        log::warn!("handler for {signal_name} is not code, ignored");
        return Ok(());
    };
    let handler = binding.to_function(signal.params(), &scope.object, &scope.context)?;
    signal.connect(Some(Receiver::object(target)), Slot::Callable(handler));
    Ok(())
}

fn group_target(target: &ObjectRef, name: &str) -> Option<ObjectRef> {
    target
        .group(name)
        .or_else(|| target.property(name).and_then(|p| p.peek().as_object().cloned()))
}

fn to_assignment(value: &MetaValue) -> Option<Assignment> {
    match value {
        MetaValue::Binding(b) => Some(Assignment::Binding(b.clone())),
        other => other.to_value().map(Assignment::Value),
    }
}

/// Child elements go to the default property. A list property takes them
/// all; any other property takes the single child.
fn assign_children(engine: &Engine, meta: &MetaElement, obj: &ObjectRef, scope: &EvalScope) -> Result<(), EvalError> {
    if meta.children.is_empty() {
        return Ok(());
    }
    let Some(prop) = obj.default_property().and_then(|name| obj.property(&name)) else {
        log::warn!("Cannot assign to unexistant default property of {}", obj.class_name());
        return Ok(());
    };
    let mut children = meta.children.iter().map(|c| Value::Element(c.clone()));
    let value = if prop.type_name() == "list" {
        Value::array(children.collect())
    } else {
        if meta.children.len() > 1 {
            log::warn!(
                "default property \"{}\" of {} takes one element, ignoring the rest",
                prop.name(),
                obj.class_name()
            );
        }
        children.next().unwrap_or_default()
    };
    prop.set(engine, value, true, Some(scope.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_names() {
        assert_eq!(handler_signal("onClicked").as_deref(), Some("clicked"));
        assert_eq!(handler_signal("onWidthChanged").as_deref(), Some("widthChanged"));
        assert_eq!(handler_signal("one"), None);
        assert_eq!(handler_signal("on"), None);
    }
}
