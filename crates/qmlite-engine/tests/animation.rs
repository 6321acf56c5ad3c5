mod common;

use common::{by_id, load, num, run, truthy};
use pretty_assertions::assert_eq;

#[test]
fn animation_on_property_runs_over_ticks() {
    let (engine, root) = load(
        "Item {
            NumberAnimation on x { id: anim; to: 100; duration: 100; running: true }
        }",
    );
    let mut now = 0.0;
    run(&engine, &mut now, 50.0, 1);
    assert_eq!(num(&engine, &root, "x"), 50.0);
    run(&engine, &mut now, 50.0, 1);
    assert_eq!(num(&engine, &root, "x"), 100.0);
    assert!(!truthy(&engine, &by_id(&root, "anim"), "running"));
}

#[test]
fn loops_repeat_from_the_start_value() {
    let (engine, root) = load(
        "Item {
            NumberAnimation on x { id: anim; from: 0; to: 10; duration: 100; loops: 2; running: true }
        }",
    );
    let mut now = 0.0;
    run(&engine, &mut now, 50.0, 3);
    assert_eq!(num(&engine, &root, "x"), 5.0);
    assert!(truthy(&engine, &by_id(&root, "anim"), "running"));
    run(&engine, &mut now, 50.0, 1);
    assert_eq!(num(&engine, &root, "x"), 10.0);
    assert!(!truthy(&engine, &by_id(&root, "anim"), "running"));
}

#[test]
fn easing_shapes_intermediate_values() {
    let (engine, root) = load(
        "Item {
            NumberAnimation on x {
                from: 0; to: 100; duration: 100; running: true
                easing.type: Easing.InQuad
            }
        }",
    );
    let mut now = 0.0;
    run(&engine, &mut now, 50.0, 1);
    assert_eq!(num(&engine, &root, "x"), 25.0);
    run(&engine, &mut now, 50.0, 1);
    assert_eq!(num(&engine, &root, "x"), 100.0);
}

#[test]
fn paused_animations_hold_their_value() {
    let (engine, root) = load(
        "Item {
            NumberAnimation on x { id: anim; from: 0; to: 100; duration: 100; running: true }
        }",
    );
    let anim = by_id(&root, "anim");
    let mut now = 0.0;
    run(&engine, &mut now, 25.0, 1);
    anim.invoke(&engine, "pause", &[]).unwrap();
    run(&engine, &mut now, 25.0, 2);
    assert_eq!(num(&engine, &root, "x"), 25.0);
    anim.invoke(&engine, "resume", &[]).unwrap();
    run(&engine, &mut now, 25.0, 1);
    assert_eq!(num(&engine, &root, "x"), 50.0);
}

#[test]
fn complete_jumps_to_the_end() {
    let (engine, root) = load(
        "Item {
            NumberAnimation on x { id: anim; from: 0; to: 80; duration: 1000; running: true }
        }",
    );
    let mut now = 0.0;
    run(&engine, &mut now, 10.0, 1);
    by_id(&root, "anim").invoke(&engine, "complete", &[]).unwrap();
    assert_eq!(num(&engine, &root, "x"), 80.0);
    assert!(!truthy(&engine, &by_id(&root, "anim"), "running"));
}

#[test]
fn animated_writes_keep_bindings() {
    let (engine, root) = load(
        "Item {
            property int base: 7
            y: base
            NumberAnimation on y { id: anim; from: 0; to: 50; duration: 100; running: true }
        }",
    );
    let mut now = 0.0;
    run(&engine, &mut now, 50.0, 2);
    assert_eq!(num(&engine, &root, "y"), 50.0);
    root.set(&engine, "base", 9).unwrap();
    assert_eq!(num(&engine, &root, "y"), 9.0);
}

#[test]
fn sequential_runs_children_in_order() {
    let (engine, root) = load(
        "Item {
            id: r
            SequentialAnimation {
                id: seq
                running: true
                NumberAnimation { target: r; property: 'x'; to: 10; duration: 100 }
                NumberAnimation { target: r; property: 'y'; to: 20; duration: 100 }
            }
        }",
    );
    let seq = by_id(&root, "seq");
    assert!(truthy(&engine, &seq, "running"));
    let mut now = 0.0;
    run(&engine, &mut now, 50.0, 1);
    assert_eq!((num(&engine, &root, "x"), num(&engine, &root, "y")), (5.0, 0.0));
    run(&engine, &mut now, 50.0, 1);
    assert_eq!(num(&engine, &root, "x"), 10.0);
    run(&engine, &mut now, 50.0, 2);
    assert_eq!(num(&engine, &root, "y"), 20.0);
    assert!(!truthy(&engine, &seq, "running"));
}

#[test]
fn parallel_finishes_with_its_longest_child() {
    let (engine, root) = load(
        "Item {
            id: r
            ParallelAnimation {
                id: par
                running: true
                NumberAnimation { target: r; property: 'x'; to: 10; duration: 100 }
                NumberAnimation { target: r; property: 'y'; to: 20; duration: 200 }
            }
        }",
    );
    let par = by_id(&root, "par");
    let mut now = 0.0;
    run(&engine, &mut now, 50.0, 2);
    assert_eq!((num(&engine, &root, "x"), num(&engine, &root, "y")), (10.0, 10.0));
    assert!(truthy(&engine, &par, "running"));
    run(&engine, &mut now, 50.0, 2);
    assert_eq!(num(&engine, &root, "y"), 20.0);
    assert!(!truthy(&engine, &par, "running"));
}

#[test]
fn behavior_animates_plain_writes() {
    let (engine, root) = load(
        "Item {
            Behavior on x { NumberAnimation { duration: 100 } }
        }",
    );
    root.set(&engine, "x", 100).unwrap();
    assert_eq!(num(&engine, &root, "x"), 0.0);
    let mut now = 0.0;
    run(&engine, &mut now, 50.0, 1);
    assert_eq!(num(&engine, &root, "x"), 50.0);
    run(&engine, &mut now, 50.0, 1);
    assert_eq!(num(&engine, &root, "x"), 100.0);
}

#[test]
fn disabled_behavior_writes_directly() {
    let (engine, root) = load(
        "Item {
            Behavior on x { id: b; enabled: false; NumberAnimation { duration: 100 } }
        }",
    );
    root.set(&engine, "x", 30).unwrap();
    assert_eq!(num(&engine, &root, "x"), 30.0);
    by_id(&root, "b").set(&engine, "enabled", true).unwrap();
    root.set(&engine, "x", 60).unwrap();
    assert_eq!(num(&engine, &root, "x"), 30.0);
}

#[test]
fn repeating_timer_triggers_every_interval() {
    let (engine, root) = load(
        "Item {
            Timer { id: t; interval: 100; repeat: true; running: true; property int count: 0; onTriggered: count++ }
        }",
    );
    let timer = by_id(&root, "t");
    let mut now = 0.0;
    run(&engine, &mut now, 50.0, 4);
    assert_eq!(num(&engine, &timer, "count"), 2.0);
    timer.invoke(&engine, "stop", &[]).unwrap();
    run(&engine, &mut now, 50.0, 4);
    assert_eq!(num(&engine, &timer, "count"), 2.0);
}

#[test]
fn single_shot_timer_stops_before_handlers_run() {
    let (engine, root) = load(
        "Item {
            Timer {
                id: t
                interval: 100
                running: true
                property bool runningInHandler: true
                property int count: 0
                onTriggered: { count++; runningInHandler = running }
            }
        }",
    );
    let timer = by_id(&root, "t");
    let mut now = 0.0;
    run(&engine, &mut now, 50.0, 6);
    assert_eq!(num(&engine, &timer, "count"), 1.0);
    assert!(!truthy(&engine, &timer, "runningInHandler"));
    assert!(!truthy(&engine, &timer, "running"));
}

#[test]
fn triggered_on_start_fires_immediately() {
    let (engine, root) = load(
        "Item {
            Timer { id: t; triggeredOnStart: true; repeat: true; running: true; property int count: 0; onTriggered: count++ }
        }",
    );
    assert_eq!(num(&engine, &by_id(&root, "t"), "count"), 1.0);
}
