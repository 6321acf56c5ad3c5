mod common;

use common::{by_id, load, num, object, text};
use pretty_assertions::assert_eq;
use qmlite_engine::{Engine, EngineError, Value};

#[test]
fn create_object_builds_a_child_in_the_declaring_scope() {
    let (engine, root) = load(
        "Item {
            id: root
            width: 40
            property var made
            Component { id: comp; Rectangle { width: root.width / 2 } }
            function make() { made = comp.createObject(root) }
        }",
    );
    root.invoke(&engine, "make", &[]).unwrap();
    let made = object(root.get(&engine, "made").unwrap());
    assert_eq!(made.class_name(), "Rectangle");
    assert_eq!(num(&engine, &made, "width"), 20.0);
    assert!(made.get(&engine, "parent").unwrap().strict_eq(&Value::Object(root.clone())));
    root.set(&engine, "width", 80).unwrap();
    assert_eq!(num(&engine, &made, "width"), 40.0);
}

#[test]
fn create_object_applies_initial_properties() {
    let (engine, root) = load(
        "Item {
            id: root
            Component { id: comp; Item { property string tag: 'none' } }
            function make() { return comp.createObject(root, { tag: 'set', x: 3 }) }
        }",
    );
    let made = object(root.invoke(&engine, "make", &[]).unwrap());
    assert_eq!(text(&engine, &made, "tag"), "set");
    assert_eq!(num(&engine, &made, "x"), 3.0);
}

#[test]
fn instances_have_private_ids() {
    let (engine, root) = load(
        "Item {
            id: root
            property var first
            property var second
            Component {
                id: comp
                Item { property int n: inner.width; Item { id: inner; width: 5 } }
            }
            Component.onCompleted: { first = comp.createObject(root); second = comp.createObject(root) }
        }",
    );
    let first = object(root.get(&engine, "first").unwrap());
    let second = object(root.get(&engine, "second").unwrap());
    assert_eq!(num(&engine, &first, "n"), 5.0);
    assert_eq!(num(&engine, &second, "n"), 5.0);
    assert!(root.context().unwrap().id("inner").is_none());
}

#[test]
fn registered_components_are_element_types() {
    let engine = Engine::default();
    engine
        .register_component("Box", "Rectangle { property int size: 3; width: size * 10 }")
        .unwrap();
    let root = engine
        .compile_and_instantiate("Item { Box { id: small } Box { id: big; size: 5 } }", None)
        .unwrap();
    assert_eq!(num(&engine, &by_id(&root, "small"), "width"), 30.0);
    assert_eq!(num(&engine, &by_id(&root, "big"), "width"), 50.0);
}

#[test]
fn registered_components_can_be_created_by_name() {
    let engine = Engine::default();
    engine.register_component("Label", "Text { text: 'hello' }").unwrap();
    let label = engine.create_component("Label", None).unwrap();
    assert_eq!(text(&engine, &label, "text"), "hello");
    let err = engine.create_component("Missing", None).unwrap_err();
    assert!(matches!(err, EngineError::UnknownComponent(name) if name == "Missing"));
}

#[test]
fn component_typed_properties_hold_templates() {
    let (engine, root) = load(
        "Item {
            id: root
            property Component delegate: Text { text: 'row' }
            property var made: delegate.createObject(root)
        }",
    );
    let made = object(root.get(&engine, "made").unwrap());
    assert_eq!(text(&engine, &made, "text"), "row");
}

#[test]
fn completed_fires_once_per_object() {
    let (engine, root) = load(
        "Item {
            id: root
            property int completions: 0
            Component.onCompleted: completions++
            Item { Component.onCompleted: root.completions++ }
        }",
    );
    engine.fire_completed().unwrap();
    assert_eq!(num(&engine, &root, "completions"), 2.0);
}
