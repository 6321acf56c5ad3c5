//! `Behavior on prop { Animation }`: route plain writes to `prop` through
//! the animation.

use std::rc::{Rc, Weak};

use crate::engine::Engine;
use crate::error::EvalError;
use crate::object::{Kind, Object, ObjectRef};
use crate::property::Property;
use crate::registry::CreateArgs;
use crate::value::Value;

use super::{base, declare, read};

pub(crate) fn create(engine: &Engine, args: &CreateArgs<'_>) -> Result<ObjectRef, EvalError> {
    let obj = base(engine, args, Kind::Behavior);
    let animation = declare(&obj, "animation", "Animation", Value::Undefined);
    let enabled = declare(&obj, "enabled", "bool", true);
    obj.set_default_property("animation");

    let Some(on) = &args.meta.on_property else {
        log::warn!("Behavior without a target property");
        return Ok(obj);
    };
    let Some(target) = args.parent.and_then(|owner| owner.property(on)) else {
        log::warn!("Behavior on non-existent property \"{on}\"");
        return Ok(obj);
    };

    let attach = Rc::new(Attach { behavior: Rc::downgrade(&obj), target: Rc::downgrade(&target) });
    let on_animation = attach.clone();
    animation.changed().connect_native(&obj, move |engine, _| {
        on_animation.apply(engine);
        Ok(())
    });
    enabled.changed().connect_native(&obj, move |engine, _| {
        attach.apply(engine);
        Ok(())
    });
    Ok(obj)
}

struct Attach {
    behavior: Weak<Object>,
    target: Weak<Property>,
}

impl Attach {
    /// Point the target property at the animation, or detach when disabled.
    fn apply(&self, engine: &Engine) {
        let (Some(behavior), Some(target)) = (self.behavior.upgrade(), self.target.upgrade()) else { return };
        let animation = read(engine, &behavior, "animation");
        let enabled = read(engine, &behavior, "enabled").truthy();
        target.set_animation(animation.as_object().filter(|_| enabled));
    }
}
