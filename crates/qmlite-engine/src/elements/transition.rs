//! `Transition`: animations run when an item switches state.

use crate::engine::Engine;
use crate::error::EvalError;
use crate::object::{Kind, ObjectRef};
use crate::registry::CreateArgs;
use crate::value::Value;

use super::animation;
use super::state::Action;
use super::{base, declare, objects_of, read};

pub(crate) fn create(engine: &Engine, args: &CreateArgs<'_>) -> Result<ObjectRef, EvalError> {
    let obj = base(engine, args, Kind::Transition);
    declare(&obj, "animations", "list", Value::array(Vec::new()));
    declare(&obj, "from", "string", "*");
    declare(&obj, "to", "string", "*");
    declare(&obj, "reversible", "bool", false);
    obj.set_default_property("animations");
    Ok(obj)
}

/// How well `transition` matches a switch from `old` to `new`: 2 for an
/// exact end, 1 for `*`, 0 when either end does not match. Reversible
/// transitions also match the swapped direction.
pub fn rate(engine: &Engine, transition: &ObjectRef, old: &str, new: &str) -> u32 {
    let from = read(engine, transition, "from").to_display_string();
    let to = read(engine, transition, "to").to_display_string();
    let reversible = read(engine, transition, "reversible").truthy();

    let from_rating = if from == old || reversible && from == new {
        2
    } else if from == "*" {
        1
    } else {
        return 0;
    };
    let to_rating = if to == new || reversible && to == old {
        2
    } else if to == "*" {
        1
    } else {
        return 0;
    };
    from_rating + to_rating
}

/// Hand each animation the actions it covers and start it.
pub fn start(engine: &Engine, transition: &ObjectRef, actions: &[Action]) -> Result<(), EvalError> {
    for anim in objects_of(engine, transition, "animations") {
        animation::scope_actions(engine, &anim, actions);
        animation::start(engine, &anim)?;
    }
    Ok(())
}

pub fn stop(engine: &Engine, transition: &ObjectRef) -> Result<(), EvalError> {
    for anim in objects_of(engine, transition, "animations") {
        animation::stop(engine, &anim)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(src: &str, old: &str, new: &str) -> u32 {
        let engine = Engine::default();
        let transition = engine.compile_and_instantiate(src, None).unwrap();
        rate(&engine, &transition, old, new)
    }

    #[test]
    fn exact_ends_outrank_wildcards() {
        assert_eq!(rating("Transition { }", "a", "b"), 2);
        assert_eq!(rating("Transition { to: 'b' }", "a", "b"), 3);
        assert_eq!(rating("Transition { from: 'a'; to: 'b' }", "a", "b"), 4);
        assert_eq!(rating("Transition { from: 'c' }", "a", "b"), 0);
    }

    #[test]
    fn reversible_matches_the_way_back() {
        assert_eq!(rating("Transition { from: 'a'; to: 'b'; reversible: true }", "b", "a"), 4);
        assert_eq!(rating("Transition { from: 'a'; to: 'b' }", "b", "a"), 0);
    }
}
