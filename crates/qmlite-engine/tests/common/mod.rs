#![allow(dead_code)]

use qmlite_engine::{Engine, LoggingConfig, ObjectRef, Value, init_logging};

pub fn load(src: &str) -> (Engine, ObjectRef) {
    init_logging(LoggingConfig::for_tests());
    let engine = Engine::default();
    let root = engine.compile_and_instantiate(src, None).unwrap();
    (engine, root)
}

pub fn num(engine: &Engine, obj: &ObjectRef, name: &str) -> f64 {
    obj.get(engine, name).unwrap().to_number()
}

pub fn text(engine: &Engine, obj: &ObjectRef, name: &str) -> String {
    obj.get(engine, name).unwrap().to_display_string()
}

pub fn truthy(engine: &Engine, obj: &ObjectRef, name: &str) -> bool {
    obj.get(engine, name).unwrap().truthy()
}

pub fn by_id(root: &ObjectRef, id: &str) -> ObjectRef {
    root.context()
        .and_then(|ctx| ctx.id(id))
        .unwrap_or_else(|| panic!("no object with id {id}"))
}

/// Advance the engine in fixed steps of `step` ms, `count` times, starting
/// after `*now`.
pub fn run(engine: &Engine, now: &mut f64, step: f64, count: usize) {
    for _ in 0..count {
        *now += step;
        engine.tick(*now, step).unwrap();
    }
}

pub fn object(value: Value) -> ObjectRef {
    value.as_object().cloned().expect("object value")
}
