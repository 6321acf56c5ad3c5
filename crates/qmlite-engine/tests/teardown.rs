mod common;

use common::{by_id, load, num};
use pretty_assertions::assert_eq;

#[test]
fn deleted_dependents_are_not_updated() {
    let (engine, root) = load(
        "Item {
            id: root
            property int v: 1
            Item { id: child; property int w: root.v * 2 }
        }",
    );
    let child = by_id(&root, "child");
    assert_eq!(num(&engine, &child, "w"), 2.0);
    child.delete();
    assert!(child.is_deleted());
    root.set(&engine, "v", 5).unwrap();
    assert!(root.get(&engine, "children").unwrap().array_items().unwrap().is_empty());
}

#[test]
fn handlers_on_deleted_receivers_are_skipped() {
    let (engine, root) = load(
        "Item {
            id: root
            signal ping
            property int heard: 0
            Item {
                id: listener
                Component.onCompleted: root.ping.connect(listener, function () { root.heard++ })
            }
        }",
    );
    root.signal("ping").unwrap().emit(&engine, &[]).unwrap();
    assert_eq!(num(&engine, &root, "heard"), 1.0);
    by_id(&root, "listener").delete();
    root.signal("ping").unwrap().emit(&engine, &[]).unwrap();
    assert_eq!(num(&engine, &root, "heard"), 1.0);
}

#[test]
fn deleting_twice_is_harmless() {
    let (engine, root) = load("Item { Rectangle { Text { } } }");
    root.delete();
    root.delete();
    assert!(root.is_deleted());
    assert!(root.owned_children().is_empty());
    drop(engine);
}

#[test]
fn dropping_the_engine_tears_down_documents() {
    let (engine, root) = load("Item { id: root; property int a: 1; property int b: a + 1 }");
    drop(engine);
    assert!(root.is_deleted());
}
