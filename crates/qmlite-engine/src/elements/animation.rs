//! Animations.
//!
//! Property animations interpolate a list of actions (target, property,
//! from, to) once per tick. An action list comes from one of three places:
//! the animation's own `target(s)`/`property`/`properties` and `from`/`to`,
//! a transition handing over the writes of a state switch, or a behavior
//! reacting to a property write.
//!
//! Group animations (`SequentialAnimation`, `ParallelAnimation`) do not tick;
//! they start and stop their children and follow their `running` flags.
//!
//! All writes go through `Property::set` with `from_animation` set, so
//! bindings on the animated properties survive.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::engine::Engine;
use crate::error::EvalError;
use crate::object::{Kind, Object, ObjectRef};
use crate::registry::CreateArgs;
use crate::value::Value;

use super::easing::{self, EasingParams};
use super::state::Action;
use super::{base, declare, method, objects_of, read};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Mode {
    Property,
    Sequential,
    Parallel,
}

/// One interpolated property write.
#[derive(Clone)]
pub struct AnimAction {
    pub target: Weak<Object>,
    pub property: String,
    pub from: Value,
    pub to: Value,
}

pub struct AnimationState {
    mode: Mode,
    /// Progress of the current loop, `0..=1`.
    at: Cell<f64>,
    loops_done: Cell<i64>,
    /// Stopped with `alwaysRunToEnd`: finish the current loop, then stop.
    finishing: Cell<bool>,
    actions: RefCell<Vec<AnimAction>>,
    // Sequential
    current: Cell<i64>,
    passed_loops: Cell<i64>,
    // Parallel
    running_children: Cell<i64>,
    /// Children whose `running` flag is already followed.
    hooked: RefCell<Vec<Weak<Object>>>,
}

impl AnimationState {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            at: Cell::new(0.0),
            loops_done: Cell::new(0),
            finishing: Cell::new(false),
            actions: RefCell::new(Vec::new()),
            current: Cell::new(-1),
            passed_loops: Cell::new(0),
            running_children: Cell::new(0),
            hooked: RefCell::new(Vec::new()),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_group(&self) -> bool {
        self.mode != Mode::Property
    }

    pub fn actions(&self) -> Vec<AnimAction> {
        self.actions.borrow().clone()
    }

    pub fn progress(&self) -> f64 {
        self.at.get()
    }
}

fn state_of(obj: &ObjectRef) -> Option<&AnimationState> {
    match obj.kind() {
        Kind::Animation(state) => Some(state),
        _ => None,
    }
}

fn is_running(engine: &Engine, obj: &ObjectRef) -> bool {
    read(engine, obj, "running").truthy()
}

// ── Factories ─────────────────────────────────────────────────────────────

fn create_common(engine: &Engine, args: &CreateArgs<'_>, mode: Mode) -> ObjectRef {
    let obj = base(engine, args, Kind::Animation(AnimationState::new(mode)));
    declare(&obj, "alwaysRunToEnd", "bool", false);
    declare(&obj, "loops", "int", 1);
    declare(&obj, "paused", "bool", false);
    declare(&obj, "running", "bool", false);

    method(&obj, "start", |engine, obj, _| start(engine, obj).map(|_| Value::Undefined));
    method(&obj, "stop", |engine, obj, _| stop(engine, obj).map(|_| Value::Undefined));
    method(&obj, "restart", |engine, obj, _| {
        stop(engine, obj)?;
        start(engine, obj)?;
        Ok(Value::Undefined)
    });
    method(&obj, "pause", |engine, obj, _| obj.set(engine, "paused", true).map(|_| Value::Undefined));
    method(&obj, "resume", |engine, obj, _| obj.set(engine, "paused", false).map(|_| Value::Undefined));
    method(&obj, "complete", |engine, obj, _| complete(engine, obj).map(|_| Value::Undefined));

    engine.add_ticker(&obj);
    obj
}

pub(crate) fn create_property_animation(engine: &Engine, args: &CreateArgs<'_>) -> Result<ObjectRef, EvalError> {
    let obj = create_common(engine, args, Mode::Property);
    declare(&obj, "duration", "int", 250);
    declare(&obj, "from", "real", Value::Undefined);
    declare(&obj, "to", "real", Value::Undefined);
    declare(&obj, "properties", "string", "");
    let property = declare(&obj, "property", "string", "");
    let target = declare(&obj, "target", "QtObject", Value::Undefined);
    declare(&obj, "targets", "list", Value::array(Vec::new()));

    let curve = obj.add_group("easing");
    let defaults = EasingParams::default();
    declare(&curve, "type", "enum", f64::from(easing::LINEAR));
    declare(&curve, "amplitude", "real", defaults.amplitude);
    declare(&curve, "overshoot", "real", defaults.overshoot);
    declare(&curve, "period", "real", defaults.period);

    // `NumberAnimation on x { ... }` animates x of the enclosing element.
    if let Some(on) = &args.meta.on_property {
        property.store_silently(Value::from(on.as_str()));
        target.store_silently(Value::from(args.parent.cloned()));
    }

    let me = Rc::downgrade(&obj);
    if let Some(running) = obj.property("running") {
        running.changed().connect_native(&obj, move |engine, args| match me.upgrade() {
            Some(obj) => running_changed(engine, &obj, args.first().is_some_and(Value::truthy)),
            None => Ok(()),
        });
    }
    Ok(obj)
}

pub(crate) fn create_sequential(engine: &Engine, args: &CreateArgs<'_>) -> Result<ObjectRef, EvalError> {
    create_group(engine, args, Mode::Sequential)
}

pub(crate) fn create_parallel(engine: &Engine, args: &CreateArgs<'_>) -> Result<ObjectRef, EvalError> {
    create_group(engine, args, Mode::Parallel)
}

fn create_group(engine: &Engine, args: &CreateArgs<'_>, mode: Mode) -> Result<ObjectRef, EvalError> {
    let obj = create_common(engine, args, mode);
    let animations = declare(&obj, "animations", "list", Value::array(Vec::new()));
    obj.set_default_property("animations");

    let me = Rc::downgrade(&obj);
    animations.changed().connect_native(&obj, move |engine, _| {
        if let Some(obj) = me.upgrade() {
            hook_children(engine, &obj);
        }
        Ok(())
    });
    Ok(obj)
}

/// Follow the `running` flag of every child not followed yet.
fn hook_children(engine: &Engine, group: &ObjectRef) {
    let Some(state) = state_of(group) else { return };
    for child in objects_of(engine, group, "animations") {
        let weak_child = Rc::downgrade(&child);
        if state.hooked.borrow().iter().any(|w| w.ptr_eq(&weak_child)) {
            continue;
        }
        state.hooked.borrow_mut().push(weak_child);
        let Some(running) = child.property("running") else { continue };
        let me = Rc::downgrade(group);
        running.changed().connect_native(group, move |engine, args| {
            let Some(group) = me.upgrade() else { return Ok(()) };
            child_running_changed(engine, &group, args.first().is_some_and(Value::truthy))
        });
    }
}

fn child_running_changed(engine: &Engine, group: &ObjectRef, child_running: bool) -> Result<(), EvalError> {
    let Some(state) = state_of(group) else { return Ok(()) };
    match state.mode {
        Mode::Sequential if !child_running => next_animation(engine, group, state),
        Mode::Parallel => {
            let count = state.running_children.get() + if child_running { 1 } else { -1 };
            state.running_children.set(count);
            if count == 0 {
                group.set(engine, "running", false)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

// ── Control ───────────────────────────────────────────────────────────────

pub fn start(engine: &Engine, obj: &ObjectRef) -> Result<(), EvalError> {
    let Some(state) = state_of(obj) else { return Ok(()) };
    match state.mode {
        Mode::Property => obj.set(engine, "running", true),
        _ if is_running(engine, obj) => Ok(()),
        Mode::Sequential => {
            obj.set(engine, "running", true)?;
            state.current.set(-1);
            state.passed_loops.set(0);
            next_animation(engine, obj, state)
        }
        Mode::Parallel => {
            obj.set(engine, "running", true)?;
            for child in objects_of(engine, obj, "animations") {
                start(engine, &child)?;
            }
            Ok(())
        }
    }
}

pub fn stop(engine: &Engine, obj: &ObjectRef) -> Result<(), EvalError> {
    let Some(state) = state_of(obj) else { return Ok(()) };
    match state.mode {
        Mode::Property => obj.set(engine, "running", false),
        _ if !is_running(engine, obj) => Ok(()),
        Mode::Sequential => {
            obj.set(engine, "running", false)?;
            let current = usize::try_from(state.current.get()).ok();
            match current.and_then(|i| objects_of(engine, obj, "animations").into_iter().nth(i)) {
                Some(child) => stop(engine, &child),
                None => Ok(()),
            }
        }
        Mode::Parallel => {
            for child in objects_of(engine, obj, "animations") {
                stop(engine, &child)?;
            }
            obj.set(engine, "running", false)
        }
    }
}

/// Jump to the end: property animations write their end values, groups stop.
pub fn complete(engine: &Engine, obj: &ObjectRef) -> Result<(), EvalError> {
    match state_of(obj) {
        Some(state) if state.mode == Mode::Property => complete_loop(engine, obj, state),
        Some(_) => stop(engine, obj),
        None => Ok(()),
    }
}

/// Engine start: group animations declared running start for real.
pub(crate) fn on_engine_start(engine: &Engine, obj: &ObjectRef) -> Result<(), EvalError> {
    if is_running(engine, obj) {
        obj.set(engine, "running", false)?;
        start(engine, obj)?;
    }
    Ok(())
}

fn next_animation(engine: &Engine, group: &ObjectRef, state: &AnimationState) -> Result<(), EvalError> {
    if !is_running(engine, group) {
        return Ok(());
    }
    let children = objects_of(engine, group, "animations");
    if children.is_empty() {
        return complete(engine, group);
    }
    let index = state.current.get() + 1;
    state.current.set(index);
    if let Some(child) = usize::try_from(index).ok().and_then(|i| children.get(i)) {
        return start(engine, child);
    }
    let passed = state.passed_loops.get() + 1;
    state.passed_loops.set(passed);
    let loops = read(engine, group, "loops").to_number() as i64;
    if loops >= 0 && passed >= loops {
        complete(engine, group)
    } else {
        state.current.set(-1);
        next_animation(engine, group, state)
    }
}

// ── Property animations ───────────────────────────────────────────────────

fn running_changed(engine: &Engine, obj: &ObjectRef, running: bool) -> Result<(), EvalError> {
    let Some(state) = state_of(obj) else { return Ok(()) };
    if running {
        start_loop(engine, state);
        obj.set(engine, "paused", false)
    } else if read(engine, obj, "alwaysRunToEnd").truthy() && state.at.get() < 1.0 {
        state.finishing.set(true);
        Ok(())
    } else {
        state.loops_done.set(0);
        state.actions.borrow_mut().clear();
        Ok(())
    }
}

/// Restart progress; actions without a start value begin at the current one.
fn start_loop(engine: &Engine, state: &AnimationState) {
    for action in state.actions.borrow_mut().iter_mut() {
        if action.from.is_undefined() {
            if let Some(target) = action.target.upgrade() {
                action.from = read(engine, &target, &action.property);
            }
        }
    }
    state.at.set(0.0);
}

pub(crate) fn tick(engine: &Engine, obj: &ObjectRef, state: &AnimationState, elapsed_ms: f64) -> Result<(), EvalError> {
    if state.is_group() {
        return Ok(());
    }
    let active = is_running(engine, obj) || state.finishing.get();
    if !active || read(engine, obj, "paused").truthy() {
        return Ok(());
    }
    if state.at.get() == 0.0 && state.loops_done.get() == 0 && state.actions.borrow().is_empty() {
        redo_actions(engine, obj, state);
    }
    let duration = read(engine, obj, "duration").to_number();
    let at = if duration > 0.0 { state.at.get() + elapsed_ms / duration } else { 1.0 };
    state.at.set(at);
    if at >= 1.0 {
        return complete_loop(engine, obj, state);
    }

    let (code, params) = easing_of(engine, obj);
    let eased = easing::value_for_progress(code, at, &params);
    for action in state.actions() {
        let (Value::Number(from), Value::Number(to)) = (&action.from, &action.to) else { continue };
        write(engine, &action, Value::Number(eased * (to - from) + from))?;
    }
    Ok(())
}

fn complete_loop(engine: &Engine, obj: &ObjectRef, state: &AnimationState) -> Result<(), EvalError> {
    for action in state.actions() {
        write(engine, &action, action.to.clone())?;
    }
    if state.finishing.replace(false) {
        state.loops_done.set(0);
        state.actions.borrow_mut().clear();
        return Ok(());
    }
    let done = state.loops_done.get() + 1;
    state.loops_done.set(done);
    if done == read(engine, obj, "loops").to_number() as i64 {
        obj.set(engine, "running", false)
    } else if !is_running(engine, obj) {
        state.actions.borrow_mut().clear();
        Ok(())
    } else {
        start_loop(engine, state);
        Ok(())
    }
}

fn write(engine: &Engine, action: &AnimAction, value: Value) -> Result<(), EvalError> {
    let Some(target) = action.target.upgrade() else { return Ok(()) };
    match target.property(&action.property) {
        Some(prop) => prop.set(engine, value, true, None),
        None => Ok(()),
    }
}

fn easing_of(engine: &Engine, obj: &ObjectRef) -> (u32, EasingParams) {
    let Some(group) = obj.group("easing") else { return (easing::LINEAR, EasingParams::default()) };
    let code = match read(engine, &group, "type") {
        Value::String(name) => easing::code_of(&name).unwrap_or(easing::LINEAR),
        v => v.to_number() as u32,
    };
    let params = EasingParams {
        amplitude: read(engine, &group, "amplitude").to_number(),
        overshoot: read(engine, &group, "overshoot").to_number(),
        period: read(engine, &group, "period").to_number(),
    };
    (code, params)
}

/// `targets` plus `target`.
fn targets(engine: &Engine, obj: &ObjectRef) -> Vec<ObjectRef> {
    let mut targets = objects_of(engine, obj, "targets");
    if let Value::Object(target) = read(engine, obj, "target") {
        if !targets.iter().any(|t| Rc::ptr_eq(t, &target)) {
            targets.push(target);
        }
    }
    targets
}

/// Words of `properties` plus `property`.
fn property_names(engine: &Engine, obj: &ObjectRef) -> Vec<String> {
    let list = read(engine, obj, "properties").to_display_string();
    let mut names: Vec<String> = list
        .split(',')
        .filter_map(|part| {
            part.split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .find(|w| !w.is_empty())
                .map(str::to_string)
        })
        .collect();
    let single = read(engine, obj, "property").to_display_string();
    if !single.is_empty() && !names.contains(&single) {
        names.push(single);
    }
    names
}

/// Actions from the animation's own targets, properties and end values.
/// A missing `from` starts at the current value.
fn redo_actions(engine: &Engine, obj: &ObjectRef, state: &AnimationState) {
    let from = read(engine, obj, "from");
    let to = read(engine, obj, "to");
    let names = property_names(engine, obj);
    let mut actions = Vec::new();
    for target in targets(engine, obj) {
        for name in &names {
            let start = if from.is_undefined() { read(engine, &target, name) } else { from.clone() };
            actions.push(AnimAction {
                target: Rc::downgrade(&target),
                property: name.clone(),
                from: start,
                to: to.clone(),
            });
        }
    }
    *state.actions.borrow_mut() = actions;
}

/// Give `anim` (or each child of a group) the state-switch actions it
/// covers. An empty target or property filter covers everything.
pub fn scope_actions(engine: &Engine, anim: &ObjectRef, actions: &[Action]) {
    let Some(state) = state_of(anim) else { return };
    if state.is_group() {
        for child in objects_of(engine, anim, "animations") {
            scope_actions(engine, &child, actions);
        }
        return;
    }
    let targets = targets(engine, anim);
    let names = property_names(engine, anim);
    let covered = actions
        .iter()
        .filter(|a| targets.is_empty() || targets.iter().any(|t| std::ptr::eq(a.target.as_ptr(), Rc::as_ptr(t))))
        .filter(|a| names.is_empty() || names.contains(&a.property))
        .map(|a| AnimAction {
            target: a.target.clone(),
            property: a.property.clone(),
            from: a.from.clone(),
            to: a.to.clone(),
        })
        .collect();
    *state.actions.borrow_mut() = covered;
}

/// A write to a property with a behavior: animate from the old value to the
/// new one instead. Returns false when `anim` cannot take the write, in
/// which case the caller stores it directly.
pub(crate) fn animate_behavior(
    engine: &Engine,
    anim: &ObjectRef,
    owner: Option<ObjectRef>,
    name: &str,
    old: Value,
    new: Value,
) -> Result<bool, EvalError> {
    let Some(state) = state_of(anim).filter(|s| !s.is_group()) else { return Ok(false) };
    let target = match read(engine, anim, "target") {
        Value::Object(target) => target,
        _ => match owner {
            Some(owner) => owner,
            None => return Ok(false),
        },
    };
    let property = match read(engine, anim, "property").to_display_string() {
        p if p.is_empty() => name.to_string(),
        p => p,
    };
    let from = Some(read(engine, anim, "from")).filter(Value::truthy).unwrap_or(old);
    let to = Some(read(engine, anim, "to")).filter(Value::truthy).unwrap_or(new);

    anim.set(engine, "running", false)?;
    *state.actions.borrow_mut() = vec![AnimAction { target: Rc::downgrade(&target), property, from, to }];
    anim.set(engine, "running", true)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_lists_take_the_first_word_of_each_entry() {
        let engine = Engine::default();
        let anim = engine
            .compile_and_instantiate("NumberAnimation { properties: 'x, y ,width.z'; property: 'opacity' }", None)
            .unwrap();
        assert_eq!(property_names(&engine, &anim), vec!["x", "y", "width", "opacity"]);
    }

    #[test]
    fn groups_hand_actions_to_matching_children() {
        let engine = Engine::default();
        let group = engine
            .compile_and_instantiate(
                "ParallelAnimation {
                    NumberAnimation { id: widths; properties: 'width' }
                    NumberAnimation { id: all }
                }",
                None,
            )
            .unwrap();
        let target = engine.compile_and_instantiate("Item { }", None).unwrap();
        let action = |property: &str| Action {
            target: Rc::downgrade(&target),
            property: property.to_string(),
            value: Value::Number(1.0).into(),
            scope: None,
            from: Value::Number(0.0),
            to: Value::Number(1.0),
            explicit: false,
        };
        scope_actions(&engine, &group, &[action("width"), action("height")]);

        let children = objects_of(&engine, &group, "animations");
        let counts: Vec<usize> = children
            .iter()
            .map(|c| state_of(c).map_or(0, |s| s.actions().len()))
            .collect();
        assert_eq!(counts, vec![1, 2]);
    }
}
