//! `Timer`: fires `triggered` every `interval` milliseconds of engine time.

use std::cell::Cell;
use std::rc::Rc;

use crate::engine::Engine;
use crate::error::EvalError;
use crate::object::{Kind, ObjectRef};
use crate::registry::CreateArgs;
use crate::value::Value;

use super::{base, declare, method, read};

pub struct TimerState {
    /// Engine time of the last trigger; NaN until the first tick.
    prev_trigger: Cell<f64>,
}

impl Default for TimerState {
    fn default() -> Self {
        Self { prev_trigger: Cell::new(f64::NAN) }
    }
}

fn state_of(obj: &ObjectRef) -> Option<&TimerState> {
    match obj.kind() {
        Kind::Timer(state) => Some(state),
        _ => None,
    }
}

pub(crate) fn create(engine: &Engine, args: &CreateArgs<'_>) -> Result<ObjectRef, EvalError> {
    let obj = base(engine, args, Kind::Timer(TimerState::default()));
    declare(&obj, "interval", "int", 1000);
    declare(&obj, "repeat", "bool", false);
    let running = declare(&obj, "running", "bool", false);
    declare(&obj, "triggeredOnStart", "bool", false);
    obj.add_signal("triggered", Vec::new());

    method(&obj, "start", |engine, obj, _| start(engine, obj).map(|_| Value::Undefined));
    method(&obj, "stop", |engine, obj, _| stop(engine, obj).map(|_| Value::Undefined));
    method(&obj, "restart", |engine, obj, _| {
        stop(engine, obj)?;
        start(engine, obj)?;
        Ok(Value::Undefined)
    });

    // Set directly, the timer counts from its next tick.
    let me = Rc::downgrade(&obj);
    running.changed().connect_native(&obj, move |_, args| {
        let Some(obj) = me.upgrade() else { return Ok(()) };
        if let Some(state) = state_of(&obj).filter(|_| args.first().is_some_and(Value::truthy)) {
            state.prev_trigger.set(f64::NAN);
        }
        Ok(())
    });

    engine.add_ticker(&obj);
    Ok(obj)
}

pub fn start(engine: &Engine, obj: &ObjectRef) -> Result<(), EvalError> {
    obj.set(engine, "running", true)?;
    if let Some(state) = state_of(obj) {
        state.prev_trigger.set(engine.now());
    }
    if read(engine, obj, "triggeredOnStart").truthy() {
        trigger(engine, obj)?;
    }
    Ok(())
}

pub fn stop(engine: &Engine, obj: &ObjectRef) -> Result<(), EvalError> {
    obj.set(engine, "running", false)
}

/// Engine start: timers declared running start for real.
pub(crate) fn on_engine_start(engine: &Engine, obj: &ObjectRef) -> Result<(), EvalError> {
    if read(engine, obj, "running").truthy() {
        obj.set(engine, "running", false)?;
        start(engine, obj)?;
    }
    Ok(())
}

pub(crate) fn tick(engine: &Engine, obj: &ObjectRef, state: &TimerState, now_ms: f64) -> Result<(), EvalError> {
    if !read(engine, obj, "running").truthy() {
        return Ok(());
    }
    let prev = state.prev_trigger.get();
    if prev.is_nan() {
        state.prev_trigger.set(now_ms);
        return Ok(());
    }
    if now_ms - prev >= read(engine, obj, "interval").to_number() {
        state.prev_trigger.set(now_ms);
        trigger(engine, obj)?;
    }
    Ok(())
}

/// A one-shot timer is already stopped when its handlers run, but
/// `runningChanged` follows `triggered`.
fn trigger(engine: &Engine, obj: &ObjectRef) -> Result<(), EvalError> {
    let one_shot = !read(engine, obj, "repeat").truthy();
    let running = obj.property("running");
    if one_shot {
        if let Some(running) = &running {
            running.store_silently(Value::Bool(false));
        }
    }
    if let Some(triggered) = obj.signal("triggered") {
        triggered.emit(engine, &[])?;
    }
    match running {
        Some(running) if one_shot => {
            running.changed().emit(engine, &[Value::Bool(false), Value::Bool(true), Value::from("running")])
        }
        _ => Ok(()),
    }
}
