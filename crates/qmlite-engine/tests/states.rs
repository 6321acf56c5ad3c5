mod common;

use common::{by_id, load, num, run, text, truthy};
use pretty_assertions::assert_eq;
use qmlite_engine::Kind;
use qmlite_engine::elements::transition;

const SIZES: &str = "Item {
    id: root
    property int base: 10
    width: base
    states: [
        State { name: 'big'; PropertyChanges { target: root; width: 100 } },
        State {
            name: 'tall'
            extend: 'big'
            PropertyChanges { target: root; height: 50 }
        },
        State { name: 'double'; PropertyChanges { target: root; width: base * 2 } }
    ]
}";

fn revert_count(root: &qmlite_engine::ObjectRef) -> usize {
    match root.kind() {
        Kind::Item(state) => state.revert_count(),
        _ => panic!("not an item"),
    }
}

#[test]
fn entering_and_leaving_a_state() {
    let (engine, root) = load(SIZES);
    root.set(&engine, "state", "big").unwrap();
    assert_eq!(num(&engine, &root, "width"), 100.0);
    assert_eq!(revert_count(&root), 1);
    root.set(&engine, "state", "").unwrap();
    assert_eq!(num(&engine, &root, "width"), 10.0);
    assert_eq!(revert_count(&root), 1);
}

#[test]
fn leaving_restores_the_binding() {
    let (engine, root) = load(SIZES);
    root.set(&engine, "state", "big").unwrap();
    root.set(&engine, "state", "").unwrap();
    root.set(&engine, "base", 20).unwrap();
    assert_eq!(num(&engine, &root, "width"), 20.0);
}

#[test]
fn extended_states_apply_parent_changes_first() {
    let (engine, root) = load(SIZES);
    root.set(&engine, "state", "tall").unwrap();
    assert_eq!(num(&engine, &root, "width"), 100.0);
    assert_eq!(num(&engine, &root, "height"), 50.0);
    root.set(&engine, "state", "").unwrap();
    assert_eq!(num(&engine, &root, "width"), 10.0);
    assert_eq!(num(&engine, &root, "height"), 0.0);
}

#[test]
fn state_values_can_be_bindings() {
    let (engine, root) = load(SIZES);
    root.set(&engine, "state", "double").unwrap();
    assert_eq!(num(&engine, &root, "width"), 20.0);
    root.set(&engine, "base", 15).unwrap();
    assert_eq!(num(&engine, &root, "width"), 30.0);
}

#[test]
fn switching_between_states_keeps_the_original_for_revert() {
    let (engine, root) = load(SIZES);
    root.set(&engine, "state", "big").unwrap();
    root.set(&engine, "state", "double").unwrap();
    assert_eq!(num(&engine, &root, "width"), 20.0);
    root.set(&engine, "state", "").unwrap();
    root.set(&engine, "base", 7).unwrap();
    assert_eq!(num(&engine, &root, "width"), 7.0);
}

#[test]
fn when_condition_selects_the_state() {
    let (engine, root) = load(
        "Item {
            id: root
            property bool pressed: false
            states: State {
                name: 'down'
                when: root.pressed
                PropertyChanges { target: root; opacity: 0.5 }
            }
        }",
    );
    root.set(&engine, "pressed", true).unwrap();
    assert_eq!(text(&engine, &root, "state"), "down");
    assert_eq!(num(&engine, &root, "opacity"), 0.5);
    root.set(&engine, "pressed", false).unwrap();
    assert_eq!(text(&engine, &root, "state"), "");
    assert_eq!(num(&engine, &root, "opacity"), 1.0);
}

#[test]
fn entry_values_need_not_be_restored() {
    let (engine, root) = load(
        "Item {
            id: root
            states: State {
                name: 'moved'
                PropertyChanges { target: root; x: 40; restoreEntryValues: false }
            }
        }",
    );
    root.set(&engine, "state", "moved").unwrap();
    root.set(&engine, "state", "").unwrap();
    assert_eq!(num(&engine, &root, "x"), 40.0);
}

const TRANSITIONS: &str = "Item {
    id: root
    width: 10
    states: State { name: 'big'; PropertyChanges { target: root; width: 110 } }
    transitions: [
        Transition { NumberAnimation { id: any1; properties: 'width'; duration: 100 } },
        Transition { NumberAnimation { id: any2; properties: 'width'; duration: 100 } },
        Transition { to: 'big'; NumberAnimation { id: exact; properties: 'width'; duration: 100 } }
    ]
}";

#[test]
fn best_rated_transition_runs() {
    let (engine, root) = load(TRANSITIONS);
    root.set(&engine, "state", "big").unwrap();
    assert!(truthy(&engine, &by_id(&root, "exact"), "running"));
    assert!(!truthy(&engine, &by_id(&root, "any1"), "running"));
    assert!(!truthy(&engine, &by_id(&root, "any2"), "running"));
}

#[test]
fn equal_ratings_pick_the_first_transition() {
    let (engine, root) = load(TRANSITIONS);
    root.set(&engine, "state", "big").unwrap();
    root.set(&engine, "state", "").unwrap();
    assert!(truthy(&engine, &by_id(&root, "any1"), "running"));
    assert!(!truthy(&engine, &by_id(&root, "any2"), "running"));
    assert!(!truthy(&engine, &by_id(&root, "exact"), "running"));
}

#[test]
fn transition_animates_from_old_to_new_value() {
    let (engine, root) = load(TRANSITIONS);
    let mut now = 0.0;
    root.set(&engine, "state", "big").unwrap();
    run(&engine, &mut now, 25.0, 1);
    assert_eq!(num(&engine, &root, "width"), 35.0);
    run(&engine, &mut now, 25.0, 3);
    assert_eq!(num(&engine, &root, "width"), 110.0);
    assert!(!truthy(&engine, &by_id(&root, "exact"), "running"));
}

fn crossed_wildcards(first: &str, second: &str) -> String {
    format!(
        "Item {{
            id: root
            width: 10
            states: [
                State {{ name: 'A'; PropertyChanges {{ target: root; width: 50 }} }},
                State {{ name: 'B'; PropertyChanges {{ target: root; width: 90 }} }}
            ]
            transitions: [ {first}, {second} ]
        }}"
    )
}

const INTO_B: &str = "Transition { from: '*'; to: 'B'; NumberAnimation { id: intoB; properties: 'width'; duration: 100 } }";
const OUT_OF_A: &str = "Transition { from: 'A'; to: '*'; NumberAnimation { id: outOfA; properties: 'width'; duration: 100 } }";

#[test]
fn crossed_wildcards_tie_and_declaration_order_decides() {
    let (engine, root) = load(&crossed_wildcards(INTO_B, OUT_OF_A));
    let transitions = root.get(&engine, "transitions").unwrap().array_items().unwrap();
    let ratings: Vec<u32> = transitions
        .iter()
        .map(|t| transition::rate(&engine, t.as_object().unwrap(), "A", "B"))
        .collect();
    assert_eq!(ratings, vec![3, 3]);

    root.set(&engine, "state", "A").unwrap();
    assert!(!truthy(&engine, &by_id(&root, "intoB"), "running"));
    assert!(!truthy(&engine, &by_id(&root, "outOfA"), "running"));
    assert_eq!(num(&engine, &root, "width"), 50.0);

    root.set(&engine, "state", "B").unwrap();
    assert!(truthy(&engine, &by_id(&root, "intoB"), "running"));
    assert!(!truthy(&engine, &by_id(&root, "outOfA"), "running"));

    let (engine, root) = load(&crossed_wildcards(OUT_OF_A, INTO_B));
    root.set(&engine, "state", "A").unwrap();
    root.set(&engine, "state", "B").unwrap();
    assert!(truthy(&engine, &by_id(&root, "outOfA"), "running"));
    assert!(!truthy(&engine, &by_id(&root, "intoB"), "running"));
}
