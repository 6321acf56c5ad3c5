mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{by_id, load, num, text};
use pretty_assertions::assert_eq;
use qmlite_engine::{Engine, EngineError, EvalError, Value};

#[test]
fn forward_references_resolve_after_init() {
    let (engine, root) = load(
        "Item {
            id: root
            width: other.width * 2
            Item { id: other; width: 5 }
        }",
    );
    assert_eq!(num(&engine, &root, "width"), 10.0);
}

#[test]
fn writes_propagate_through_dependents() {
    let (engine, root) = load(
        "Item {
            property int a: 1
            property int b: a + 1
            property int c: b * 10
        }",
    );
    assert_eq!(num(&engine, &root, "c"), 20.0);
    root.set(&engine, "a", 4).unwrap();
    assert_eq!(num(&engine, &root, "b"), 5.0);
    assert_eq!(num(&engine, &root, "c"), 50.0);
}

#[test]
fn change_signal_carries_new_old_and_name() {
    let (engine, root) = load("Item { property int a: 1 }");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    root.property("a").unwrap().changed().connect_native(&root, move |_, args| {
        sink.borrow_mut().push(args.iter().map(Value::to_display_string).collect::<Vec<_>>());
        Ok(())
    });
    root.set(&engine, "a", 2).unwrap();
    assert_eq!(*seen.borrow(), vec![vec!["2".to_string(), "1".to_string(), "a".to_string()]]);
}

#[test]
fn dependent_notifies_once_per_upstream_write() {
    let (engine, root) = load("Item { property int a: 1; property int b: a * 2 }");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    root.property("b").unwrap().changed().connect_native(&root, move |_, args| {
        sink.borrow_mut().push(args.iter().map(Value::to_display_string).collect::<Vec<_>>());
        Ok(())
    });
    root.set(&engine, "a", 5).unwrap();
    assert_eq!(*seen.borrow(), vec![vec!["10".to_string(), "2".to_string(), "b".to_string()]]);
}

#[test]
fn own_members_shadow_component_names() {
    let (engine, root) = load(
        "Item {
            property int level: 7
            property int zed: 7
            QtObject {
                id: inner
                property int level: 2
                property int mine: level
                property int inherited: zed
            }
        }",
    );
    let inner = by_id(&root, "inner");
    assert_eq!(num(&engine, &inner, "mine"), 2.0);
    assert_eq!(num(&engine, &inner, "inherited"), 7.0);
    root.set(&engine, "level", 40).unwrap();
    root.set(&engine, "zed", 8).unwrap();
    assert_eq!(num(&engine, &inner, "mine"), 2.0);
    assert_eq!(num(&engine, &inner, "inherited"), 8.0);
}

#[test]
fn unchanged_values_do_not_notify() {
    let (engine, root) = load(
        "Item {
            property int hits: 0
            height: width
            onHeightChanged: hits = hits + 1
        }",
    );
    assert_eq!(num(&engine, &root, "hits"), 0.0);
    root.set(&engine, "width", 3).unwrap();
    root.set(&engine, "width", 3).unwrap();
    assert_eq!(num(&engine, &root, "hits"), 1.0);
}

#[test]
fn plain_write_replaces_binding() {
    let (engine, root) = load("Item { height: width * 2 }");
    root.set(&engine, "height", 1).unwrap();
    root.set(&engine, "width", 9).unwrap();
    assert_eq!(num(&engine, &root, "height"), 1.0);
    assert!(!root.property("height").unwrap().has_binding());
}

#[test]
fn completed_runs_after_bindings() {
    let (engine, root) = load(
        "Item {
            property int seen: -1
            property int a: b + 1
            property int b: 2
            Component.onCompleted: seen = a
        }",
    );
    assert_eq!(num(&engine, &root, "seen"), 3.0);
}

#[test]
fn declared_types_coerce_values() {
    let (engine, root) = load(
        "Item {
            property int whole: 3.9
            property string label: 12
            property bool flag: 'yes'
            property var anything
        }",
    );
    assert_eq!(num(&engine, &root, "whole"), 3.0);
    assert_eq!(text(&engine, &root, "label"), "12");
    assert!(root.get(&engine, "flag").unwrap().strict_eq(&Value::Bool(true)));
    assert!(root.get(&engine, "anything").unwrap().is_undefined());
}

#[test]
fn block_bindings_return_values() {
    let (engine, root) = load(
        "Item {
            property int limit: 10
            width: { if (limit > 5) return limit * 3; return 0 }
        }",
    );
    assert_eq!(num(&engine, &root, "width"), 30.0);
    root.set(&engine, "limit", 2).unwrap();
    assert_eq!(num(&engine, &root, "width"), 0.0);
}

#[test]
fn mutual_bindings_are_reported_as_loops() {
    let engine = Engine::default();
    let err = engine
        .compile_and_instantiate("Item { property int a: b; property int b: a + 1 }", None)
        .unwrap_err();
    assert!(matches!(err, EngineError::Eval(EvalError::CyclicBinding(_))), "{err}");
}

#[test]
fn handler_feedback_that_settles_is_allowed() {
    let (engine, root) = load(
        "Item {
            property int source: 0
            property int follower: source
            onFollowerChanged: if (follower < 3) source = follower + 1
        }",
    );
    root.set(&engine, "source", 1).unwrap();
    assert_eq!(num(&engine, &root, "follower"), 3.0);
    assert_eq!(num(&engine, &root, "source"), 3.0);
}

#[test]
fn handler_feedback_that_never_settles_is_a_loop() {
    let (engine, root) = load(
        "Item {
            property int source: 0
            property int follower: source
            onFollowerChanged: source = follower + 1
        }",
    );
    let err = root.set(&engine, "source", 1).unwrap_err();
    assert!(matches!(err, EvalError::CyclicBinding(ref name) if name == "follower"), "{err}");
}

#[test]
fn reading_itself_is_not_a_loop() {
    let (engine, root) = load("Item { property int a: a + 1 }");
    assert_eq!(num(&engine, &root, "a"), 1.0);
}

#[test]
fn aliases_read_and_write_through() {
    let (engine, root) = load(
        "Item {
            property alias label: t.text
            property int changes: 0
            onLabelChanged: changes++
            Text { id: t; text: 'a' }
        }",
    );
    assert_eq!(text(&engine, &root, "label"), "a");
    root.set(&engine, "label", "b").unwrap();
    assert_eq!(text(&engine, &by_id(&root, "t"), "text"), "b");
    by_id(&root, "t").set(&engine, "text", "c").unwrap();
    assert_eq!(text(&engine, &root, "label"), "c");
    assert_eq!(num(&engine, &root, "changes"), 2.0);
}

#[test]
fn signals_handlers_and_methods() {
    let (engine, root) = load(
        "Item {
            signal bumped(int by)
            property int total: 0
            onBumped: total += by
            function bump(n) { bumped(n); return total }
        }",
    );
    let returned = root.invoke(&engine, "bump", &[Value::from(3)]).unwrap();
    assert_eq!(returned.to_number(), 3.0);
    root.invoke(&engine, "bump", &[Value::from(4)]).unwrap();
    assert_eq!(num(&engine, &root, "total"), 7.0);
}

#[test]
fn grouped_properties_and_dotted_assignments() {
    let (engine, root) = load(
        "Rectangle {
            border.width: 2
            border { color: 'red' }
            anchors.margins: 4
        }",
    );
    let border = root.group("border").unwrap();
    assert_eq!(num(&engine, &border, "width"), 2.0);
    assert_eq!(text(&engine, &border, "color"), "red");
    assert_eq!(num(&engine, &root.group("anchors").unwrap(), "margins"), 4.0);
}

#[test]
fn children_get_visual_parents() {
    let (engine, root) = load(
        "Item {
            id: root
            width: 30
            Rectangle { id: child; width: parent.width / 3 }
            QtObject { id: helper }
        }",
    );
    let child = by_id(&root, "child");
    assert_eq!(num(&engine, &child, "width"), 10.0);
    let children = root.get(&engine, "children").unwrap().array_items().unwrap();
    assert_eq!(children.len(), 1);
    let resources = root.get(&engine, "resources").unwrap().array_items().unwrap();
    assert_eq!(resources.len(), 1);
    root.set(&engine, "width", 60).unwrap();
    assert_eq!(num(&engine, &child, "width"), 20.0);
}

#[test]
fn unknown_names_warn_and_continue() {
    let (engine, root) = load("Item { bogus: 1; Frobnicator { }; onNothing: x() }");
    assert!(!root.has_property("bogus"));
    assert_eq!(root.get(&engine, "data").unwrap().array_items().unwrap().len(), 1);
}

#[test]
fn parse_errors_stop_loading() {
    let engine = Engine::default();
    let err = engine.compile_and_instantiate("Item { width: }", None).unwrap_err();
    assert!(matches!(err, EngineError::Compile(_)), "{err}");
    assert!(engine.roots().is_empty());
}

#[test]
fn script_globals_are_available() {
    let (engine, root) = load(
        "Item {
            property real root2: Math.sqrt(16)
            property string json: JSON.stringify({ a: [1, 2] })
            property string joined: ['x', 'y'].join('-')
        }",
    );
    assert_eq!(num(&engine, &root, "root2"), 4.0);
    assert_eq!(text(&engine, &root, "json"), r#"{"a":[1,2]}"#);
    assert_eq!(text(&engine, &root, "joined"), "x-y");
}
