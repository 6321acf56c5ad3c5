//! `Item` and the property-holder visual types built on it.
//!
//! Items keep the visual tree consistent (`data` distributes to `children`
//! and `resources`, `parent` moves an item between `children` lists) and run
//! the state machine when `state` changes. Geometry is not computed here;
//! anchors and sizes are plain properties for the host to read.

use std::cell::RefCell;
use std::rc::Rc;

use crate::engine::Engine;
use crate::error::EvalError;
use crate::object::{Kind, ObjectRef};
use crate::property::{Assignment, EvalScope, Property};
use crate::registry::CreateArgs;
use crate::value::Value;

use super::state::{self, Action};
use super::{base, declare, objects_of, read, transition};

/// Per-item state: the writes to undo when leaving the current state.
#[derive(Default)]
pub struct ItemState {
    revert_actions: RefCell<Vec<Action>>,
}

impl ItemState {
    pub fn revert_count(&self) -> usize {
        self.revert_actions.borrow().len()
    }
}

const ANCHOR_LINES: [&str; 6] = ["left", "right", "top", "bottom", "horizontalCenter", "verticalCenter"];
const ANCHOR_MARGINS: [&str; 5] = ["margins", "leftMargin", "rightMargin", "topMargin", "bottomMargin"];

pub(crate) fn create_item(engine: &Engine, args: &CreateArgs<'_>) -> Result<ObjectRef, EvalError> {
    let obj = base(engine, args, Kind::Item(ItemState::default()));

    let data = declare(&obj, "data", "list", Value::array(Vec::new()));
    declare(&obj, "children", "list", Value::array(Vec::new()));
    declare(&obj, "resources", "list", Value::array(Vec::new()));
    let parent = declare(&obj, "parent", "Item", Value::Null);
    obj.set_default_property("data");

    for name in ["x", "y", "z", "width", "height", "implicitWidth", "implicitHeight", "rotation"] {
        declare(&obj, name, "real", 0);
    }
    declare(&obj, "scale", "real", 1);
    declare(&obj, "opacity", "real", 1);
    declare(&obj, "visible", "bool", true);
    declare(&obj, "clip", "bool", false);
    declare(&obj, "transform", "list", Value::array(Vec::new()));

    let anchors = obj.add_group("anchors");
    for name in ANCHOR_LINES {
        declare(&anchors, name, "var", Value::Undefined);
    }
    declare(&anchors, "fill", "QtObject", Value::Undefined);
    declare(&anchors, "centerIn", "QtObject", Value::Undefined);
    for name in ANCHOR_MARGINS {
        declare(&anchors, name, "real", 0);
    }

    declare(&obj, "states", "list", Value::array(Vec::new()));
    let state = declare(&obj, "state", "string", "");
    declare(&obj, "transitions", "list", Value::array(Vec::new()));

    connect_tree_handlers(&obj, &data, &parent);

    let me = Rc::downgrade(&obj);
    state.changed().connect_native(&obj, move |engine, args| {
        let Some(item) = me.upgrade() else { return Ok(()) };
        let new = args.first().map(Value::to_display_string).unwrap_or_default();
        let old = args.get(1).map(Value::to_display_string).unwrap_or_default();
        engine.untracked(|| change_state(engine, &item, &new, &old))
    });
    Ok(obj)
}

pub(crate) fn create_rectangle(engine: &Engine, args: &CreateArgs<'_>) -> Result<ObjectRef, EvalError> {
    let obj = create_item(engine, args)?;
    declare(&obj, "color", "color", "white");
    declare(&obj, "radius", "real", 0);
    let border = obj.add_group("border");
    declare(&border, "width", "int", 0);
    declare(&border, "color", "color", "black");
    Ok(obj)
}

pub(crate) fn create_text(engine: &Engine, args: &CreateArgs<'_>) -> Result<ObjectRef, EvalError> {
    let obj = create_item(engine, args)?;
    declare(&obj, "text", "string", "");
    declare(&obj, "color", "color", "black");
    declare(&obj, "wrapMode", "enum", 0);
    declare(&obj, "horizontalAlignment", "enum", 0);
    declare(&obj, "verticalAlignment", "enum", 0);
    let font = obj.add_group("font");
    declare(&font, "family", "string", "");
    declare(&font, "pointSize", "real", 0);
    declare(&font, "pixelSize", "real", 0);
    declare(&font, "bold", "bool", false);
    declare(&font, "italic", "bool", false);
    declare(&font, "underline", "bool", false);
    Ok(obj)
}

// ── Visual tree ───────────────────────────────────────────────────────────

fn connect_tree_handlers(obj: &ObjectRef, data: &Rc<Property>, parent: &Rc<Property>) {
    let me = Rc::downgrade(obj);
    parent.changed().connect_native(obj, move |engine, args| {
        let Some(me) = me.upgrade() else { return Ok(()) };
        if let Some(Value::Object(old)) = args.get(1) {
            if let Some(children) = old.property("children") {
                if children.remove_from_list(&me) {
                    children.notify_in_place(engine)?;
                }
            }
        }
        if let Some(Value::Object(new)) = args.first() {
            if let Some(children) = new.property("children") {
                if !contains(&children.peek(), &me) {
                    children.push_to_list(engine, Value::Object(me.clone()))?;
                }
            }
        }
        Ok(())
    });

    let me = Rc::downgrade(obj);
    data.changed().connect_native(obj, move |engine, args| {
        let Some(me) = me.upgrade() else { return Ok(()) };
        for child in args.first().and_then(Value::array_items).unwrap_or_default() {
            match &child {
                Value::Object(o) if o.has_property("parent") => {
                    o.set(engine, "parent", Value::Object(me.clone()))?;
                }
                _ => {
                    if let Some(resources) = me.property("resources") {
                        resources.push_to_list(engine, child)?;
                    }
                }
            }
        }
        Ok(())
    });
}

fn contains(list: &Value, obj: &ObjectRef) -> bool {
    list.array_items()
        .is_some_and(|items| items.iter().any(|v| matches!(v, Value::Object(o) if Rc::ptr_eq(o, obj))))
}

// ── States ────────────────────────────────────────────────────────────────

/// Switch `item` from state `old_name` to `new_name`.
///
/// Pending revert actions are re-read as the starting point, the new
/// state's changes are merged over them, every write is applied before any
/// result is read back, and the best-rated transition animates the result.
pub fn change_state(engine: &Engine, item: &ObjectRef, new_name: &str, old_name: &str) -> Result<(), EvalError> {
    let Kind::Item(item_state) = item.kind() else { return Ok(()) };
    log::debug!("{}: state \"{old_name}\" -> \"{new_name}\"", item.class_name());

    let new_state = objects_of(engine, item, "states")
        .into_iter()
        .find(|s| read(engine, s, "name").to_display_string() == new_name);

    let mut reverts = item_state.revert_actions.borrow().clone();
    let mut actions = reverts.clone();
    for action in &mut actions {
        if let Some(target) = action.target.upgrade() {
            action.from = read(engine, &target, &action.property);
        }
    }

    if let Some(new_state) = &new_state {
        for changes in state::all_changes(engine, new_state, item) {
            let Some(target) = read(engine, &changes, "target").as_object().cloned() else {
                log::warn!("PropertyChanges without target in state \"{new_name}\"");
                continue;
            };
            let explicit = read(engine, &changes, "explicit").truthy();
            let restore = read(engine, &changes, "restoreEntryValues").truthy();
            for entry in state::entries(&changes) {
                let Some(prop) = target.property(&entry.property) else {
                    log::warn!("Cannot assign to non-existent property \"{}\". Ignoring assignment.", entry.property);
                    continue;
                };
                let action = Action {
                    target: Rc::downgrade(&target),
                    property: entry.property.clone(),
                    value: entry.value.clone(),
                    scope: None,
                    from: read(engine, &target, &entry.property),
                    to: Value::Undefined,
                    explicit,
                };
                match actions.iter_mut().find(|a| a.targets(&target, &entry.property)) {
                    Some(existing) => *existing = action,
                    None => actions.push(action),
                }

                match reverts.iter().position(|a| a.targets(&target, &entry.property)) {
                    Some(i) if !restore => {
                        reverts.remove(i);
                    }
                    Some(_) => {}
                    None if restore => reverts.push(revert_action(engine, &target, &prop)),
                    None => {}
                }
            }
        }
    }
    *item_state.revert_actions.borrow_mut() = reverts;

    // All writes first: later values may depend on earlier ones.
    let context = new_state.as_ref().and_then(|s| s.context());
    for action in &actions {
        let Some(target) = action.target.upgrade() else { continue };
        let Some(prop) = target.property(&action.property) else { continue };
        let scope = action.scope.clone().or_else(|| {
            context
                .clone()
                .or_else(|| target.context())
                .map(|ctx| EvalScope::new(&target, &ctx))
        });
        prop.set(engine, action.value.clone(), false, scope)?;
    }
    for action in &mut actions {
        let Some(target) = action.target.upgrade() else { continue };
        action.to = read(engine, &target, &action.property);
        if action.explicit {
            target.set(engine, &action.property, action.to.clone())?;
            action.value = Assignment::Value(action.to.clone());
        }
    }

    let transitions = objects_of(engine, item, "transitions");
    let mut best: Option<(u32, &ObjectRef)> = None;
    for t in &transitions {
        transition::stop(engine, t)?;
        let rating = transition::rate(engine, t, old_name, new_name);
        if rating > best.map_or(0, |(r, _)| r) {
            best = Some((rating, t));
        }
    }
    if let Some((_, t)) = best {
        transition::start(engine, t, &actions)?;
    }
    Ok(())
}

/// Snapshot of what `prop` holds now: its binding with the scope it runs in,
/// or its value.
fn revert_action(engine: &Engine, target: &ObjectRef, prop: &Rc<Property>) -> Action {
    let (value, scope) = match prop.active_binding() {
        Some(active) => {
            let scope = active.object.upgrade().map(|o| EvalScope::new(&o, &active.context));
            (Assignment::Binding(active.binding), scope)
        }
        None => (Assignment::Value(prop.peek()), None),
    };
    Action {
        target: Rc::downgrade(target),
        property: prop.name().to_string(),
        value,
        scope,
        from: Value::Undefined,
        to: read(engine, target, prop.name()),
        explicit: false,
    }
}
