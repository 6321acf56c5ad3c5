//! `State` and `PropertyChanges`.
//!
//! A state is a named list of `PropertyChanges`, optionally extending
//! another state of the same item. Entries of a `PropertyChanges` that are
//! not its own properties are recorded as change entries instead of being
//! rejected.

use std::rc::{Rc, Weak};

use crate::engine::Engine;
use crate::error::EvalError;
use crate::object::{Kind, Object, ObjectRef};
use crate::property::{Assignment, EvalScope};
use crate::registry::CreateArgs;
use crate::value::Value;

use super::{base, declare, objects_of, read};

/// `property: value` inside a `PropertyChanges`.
#[derive(Clone)]
pub struct ChangeEntry {
    pub property: String,
    pub value: Assignment,
}

/// One property write of a state switch, also used to revert it later.
#[derive(Clone)]
pub struct Action {
    pub target: Weak<Object>,
    pub property: String,
    pub value: Assignment,
    /// Where a binding value evaluates; `None` means the target itself in
    /// the entering state's context.
    pub scope: Option<EvalScope>,
    pub from: Value,
    pub to: Value,
    pub explicit: bool,
}

impl Action {
    pub fn targets(&self, obj: &ObjectRef, property: &str) -> bool {
        self.property == property && std::ptr::eq(self.target.as_ptr(), Rc::as_ptr(obj))
    }
}

pub(crate) fn create_state(engine: &Engine, args: &CreateArgs<'_>) -> Result<ObjectRef, EvalError> {
    let obj = base(engine, args, Kind::State);
    declare(&obj, "name", "string", "");
    declare(&obj, "changes", "list", Value::array(Vec::new()));
    declare(&obj, "extend", "string", "");
    let when = declare(&obj, "when", "bool", false);
    obj.set_default_property("changes");

    let me = Rc::downgrade(&obj);
    when.changed().connect_native(&obj, move |engine, args| {
        let Some(state) = me.upgrade() else { return Ok(()) };
        let Some(item) = state.owner() else { return Ok(()) };
        let name = read(engine, &state, "name");
        if args.first().is_some_and(Value::truthy) {
            item.set(engine, "state", name)
        } else if read(engine, &item, "state").strict_eq(&name) {
            item.set(engine, "state", "")
        } else {
            Ok(())
        }
    });
    Ok(obj)
}

pub(crate) fn create_property_changes(engine: &Engine, args: &CreateArgs<'_>) -> Result<ObjectRef, EvalError> {
    let obj = base(engine, args, Kind::PropertyChanges(Default::default()));
    declare(&obj, "target", "QtObject", Value::Undefined);
    declare(&obj, "explicit", "bool", false);
    declare(&obj, "restoreEntryValues", "bool", true);
    Ok(obj)
}

/// The `PropertyChanges` of `state`, preceded by those of the state it
/// extends (recursively, looked up among the item's states).
pub fn all_changes(engine: &Engine, state: &ObjectRef, item: &ObjectRef) -> Vec<ObjectRef> {
    let mut chain = vec![state.clone()];
    loop {
        let Some(current) = chain.last() else { break };
        let extend = read(engine, current, "extend").to_display_string();
        if extend.is_empty() {
            break;
        }
        let parent = objects_of(engine, item, "states")
            .into_iter()
            .find(|s| read(engine, s, "name").to_display_string() == extend);
        match parent {
            Some(p) if !chain.iter().any(|c| Rc::ptr_eq(c, &p)) => chain.push(p),
            Some(_) => {
                log::warn!("State \"{extend}\" extends itself");
                break;
            }
            None => {
                log::warn!("State \"{extend}\" not found for extend");
                break;
            }
        }
    }
    chain.iter().rev().flat_map(|s| objects_of(engine, s, "changes")).collect()
}

/// Change entries recorded on a `PropertyChanges` object.
pub fn entries(changes: &ObjectRef) -> Vec<ChangeEntry> {
    match changes.kind() {
        Kind::PropertyChanges(entries) => entries.borrow().clone(),
        _ => Vec::new(),
    }
}
