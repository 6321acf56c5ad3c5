//! `Component`: an element template kept for later instantiation.
//!
//! Components appear as `Component { ... }` elements, as values of
//! `Component`-typed properties, and as the document root. Each new object
//! gets its own component scope nested in the one the template was
//! declared in, so it sees outer ids but its own ids stay private.

use std::rc::Rc;

use crate::construct;
use crate::engine::Engine;
use crate::error::EvalError;
use crate::meta::MetaElement;
use crate::object::{Context, Kind, Object, ObjectRef};
use crate::value::Value;

use super::method;

pub struct ComponentData {
    /// Element built by `createObject`; `None` for an empty `Component {}`.
    pub meta: Option<Rc<MetaElement>>,
    /// Scope the template was declared in.
    pub context: Rc<Context>,
}

/// The element a component builds: the single child of a `Component`
/// element, or the element itself.
pub fn template_of(meta: &Rc<MetaElement>) -> Option<Rc<MetaElement>> {
    if meta.class_name == "Component" {
        meta.children.first().cloned()
    } else {
        Some(meta.clone())
    }
}

pub fn create(meta: &Rc<MetaElement>, owner: Option<&ObjectRef>, context: &Rc<Context>) -> ObjectRef {
    if meta.class_name == "Component" && meta.children.len() > 1 {
        log::warn!("Component at {}:{} has more than one root element", meta.line, meta.col);
    }
    let data = ComponentData { meta: template_of(meta), context: context.clone() };
    let obj = Object::new("Component", Kind::Component(data), owner);
    obj.set_context(context);
    if meta.class_name == "Component" {
        if let Some(id) = &meta.id {
            context.register_id(id, &obj);
            obj.set_id(id);
        }
    }

    method(&obj, "createObject", |engine, component, args| {
        let parent = args.first().and_then(Value::as_object);
        let obj = create_object(engine, component, parent)?;
        if let Some(Value::Map(initial)) = args.get(1) {
            let entries: Vec<(String, Value)> = initial.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            for (name, value) in entries {
                obj.set(engine, &name, value)?;
            }
        }
        Ok(Value::Object(obj))
    });
    obj
}

/// Build a new object from `component`, owned by `parent`. Items also get
/// `parent` as their visual parent.
pub fn create_object(engine: &Engine, component: &ObjectRef, parent: Option<&ObjectRef>) -> Result<ObjectRef, EvalError> {
    let Kind::Component(data) = component.kind() else {
        return Err(EvalError::type_error("createObject called on a non-component"));
    };
    let Some(meta) = &data.meta else {
        return Err(EvalError::type_error("Component has no content"));
    };
    let obj = construct::create_object(engine, meta, parent, &data.context)?;
    if let Some(parent) = parent {
        if obj.has_property("parent") && parent.has_property("children") {
            obj.set(engine, "parent", parent.clone())?;
        }
    }
    Ok(obj)
}
