//! Integration tests for node ownership, links, invalidation and update.

use std::cell::RefCell;
use std::rc::Rc;

use posegraph::domain::{
    names, DomainError, EventKind, Flow, Graph, NodeEvent, NodeId, Scalar, TypeRegistry,
};
use posegraph::util::testing;

fn group(graph: &mut Graph, name: &str) -> NodeId {
    graph.create(names::ITEM, name).unwrap()
}

fn number(graph: &mut Graph, name: &str) -> NodeId {
    graph.create(names::NUMBER, name).unwrap()
}

// ============================================================
// Type registry
// ============================================================

#[test]
fn given_registered_type_without_blueprint_when_creating_then_configuration_error() {
    // Arrange
    let mut registry = TypeRegistry::with_builtins();
    let simple = registry.lookup(names::SIMPLE).unwrap();
    registry.register("marker", Some(simple)).unwrap();
    let mut graph = Graph::with_registry(registry);

    // Act
    let result = graph.create("marker", "m");

    // Assert
    assert!(matches!(result, Err(DomainError::Configuration { .. })));
}

#[test]
fn given_unknown_type_name_when_creating_then_unknown_type() {
    let mut graph = Graph::new();
    let result = graph.create("teapot", "t");
    assert_eq!(result, Err(DomainError::UnknownType("teapot".into())));
}

#[test]
fn given_node_then_is_follows_type_chain() {
    let mut graph = Graph::new();
    let distance = graph.create(names::DISTANCE, "d").unwrap();

    assert!(graph.is(distance, names::DISTANCE).unwrap());
    assert!(graph.is(distance, names::MEASURE).unwrap());
    assert!(graph.is(distance, names::NUMBER).unwrap());
    assert!(graph.is(distance, names::ITEM).unwrap());
    assert!(!graph.is(distance, names::ANGLE).unwrap());
    assert_eq!(graph.type_name(distance).unwrap(), names::DISTANCE);
}

// ============================================================
// Children collection
// ============================================================

#[test]
fn given_children_when_inserting_at_negative_position_then_counted_from_end() {
    // Arrange
    let mut graph = Graph::new();
    let root = group(&mut graph, "root");
    for name in ["a", "b", "c"] {
        let child = number(&mut graph, name);
        graph.add_child(root, child, None).unwrap();
    }
    let inserted = number(&mut graph, "x");

    // Act
    let index = graph.add_child(root, inserted, Some(-1)).unwrap();

    // Assert
    assert_eq!(index, 2);
    let names: Vec<_> = graph
        .node(root)
        .unwrap()
        .children()
        .iter()
        .map(|id| graph.node(id).unwrap().name().to_string())
        .collect();
    assert_eq!(names, vec!["a", "b", "x", "c"]);
    assert_eq!(graph.child(root, "x").unwrap(), inserted);
    assert_eq!(graph.child_at(root, 3).unwrap(), Some(graph.child(root, "c").unwrap()));
}

#[test]
fn given_child_of_other_owner_when_adding_then_moved() {
    // Arrange
    let mut graph = Graph::new();
    let first = group(&mut graph, "first");
    let second = group(&mut graph, "second");
    let leaf = number(&mut graph, "leaf");
    graph.add_child(first, leaf, None).unwrap();

    // Act
    graph.add_child(second, leaf, None).unwrap();

    // Assert
    assert_eq!(graph.node(first).unwrap().children().count(), 0);
    assert_eq!(graph.node(second).unwrap().children().count(), 1);
    assert_eq!(graph.node(leaf).unwrap().parent(), Some(second));
}

#[test]
fn given_children_when_clearing_then_all_destroyed() {
    let mut graph = Graph::new();
    let root = group(&mut graph, "root");
    let kids: Vec<_> = (0..3).map(|i| number(&mut graph, &format!("n{i}"))).collect();
    for kid in &kids {
        graph.add_child(root, *kid, None).unwrap();
    }

    let removed = graph.clear_children(root).unwrap();

    assert_eq!(removed, 3);
    assert!(kids.iter().all(|k| !graph.contains(*k)));
    assert!(graph.node(root).unwrap().children().is_empty());
    assert_eq!(graph.len(), 1);
}

#[test]
fn given_missing_child_name_then_child_not_found() {
    let mut graph = Graph::new();
    let root = group(&mut graph, "root");

    let result = graph.resolve(root, "nope.deeper");

    assert!(matches!(result, Err(DomainError::ChildNotFound { .. })));
}

// ============================================================
// Invalidation and update
// ============================================================

#[test]
fn given_updated_chain_when_leaf_changes_then_every_ancestor_invalidated() {
    // Arrange
    testing::init_test_setup();
    let mut graph = Graph::new();
    let root = group(&mut graph, "root");
    let mid = group(&mut graph, "mid");
    let leaf = number(&mut graph, "leaf");
    graph.add_child(root, mid, None).unwrap();
    graph.add_child(mid, leaf, None).unwrap();
    graph.update(root, 0.0, false).unwrap();
    assert!([root, mid, leaf].iter().all(|n| graph.node(*n).unwrap().is_updated()));

    // Act
    graph.set_value(leaf, Some(Scalar::Number(4.0))).unwrap();

    // Assert
    assert!([root, mid, leaf].iter().all(|n| !graph.node(*n).unwrap().is_updated()));

    graph.update(root, 0.0, false).unwrap();
    assert!([root, mid, leaf].iter().all(|n| graph.node(*n).unwrap().is_updated()));
}

#[test]
fn given_link_when_source_changes_then_dependent_and_its_owner_invalidated() {
    // Arrange
    let mut graph = Graph::new();
    let source = number(&mut graph, "source");
    let owner = group(&mut graph, "owner");
    let dependent = group(&mut graph, "dependent");
    graph.add_child(owner, dependent, None).unwrap();
    graph.link(source, dependent).unwrap();
    graph.update(source, 0.0, false).unwrap();
    graph.update(owner, 0.0, false).unwrap();

    // Act
    graph.set_value(source, Some(Scalar::Number(1.0))).unwrap();

    // Assert
    assert!(!graph.node(dependent).unwrap().is_updated());
    assert!(!graph.node(owner).unwrap().is_updated());
}

#[test]
fn given_link_cycle_when_invalidating_then_each_node_modified_once() {
    // Arrange
    let mut graph = Graph::new();
    let a = group(&mut graph, "a");
    let b = group(&mut graph, "b");
    graph.link(a, b).unwrap();
    graph.link(b, a).unwrap();
    let count = Rc::new(RefCell::new(0));
    let c = Rc::clone(&count);
    graph
        .on_type(
            names::ITEM,
            EventKind::Modified,
            Rc::new(move |_: &mut Graph, _: &NodeEvent| {
                *c.borrow_mut() += 1;
                Flow::Continue
            }),
        )
        .unwrap();

    // Act
    graph.invalidate(a).unwrap();

    // Assert
    assert_eq!(*count.borrow(), 2);
}

#[test]
fn given_unchanged_value_when_setting_then_no_invalidation() {
    let mut graph = Graph::new();
    let leaf = number(&mut graph, "leaf");
    graph.set_value(leaf, Some(Scalar::Number(2.0))).unwrap();
    graph.update(leaf, 0.0, false).unwrap();

    let changed = graph.set_value(leaf, Some(Scalar::Number(2.0))).unwrap();

    assert!(!changed);
    assert!(graph.node(leaf).unwrap().is_updated());
}

#[test]
fn given_destroyed_linked_node_then_link_target_survives() {
    let mut graph = Graph::new();
    let source = number(&mut graph, "source");
    let dependent = group(&mut graph, "dependent");
    graph.link(source, dependent).unwrap();

    graph.destroy(source).unwrap();

    assert!(graph.contains(dependent));
    assert!(matches!(
        graph.node(source),
        Err(DomainError::NodeNotFound(_))
    ));
}

// ============================================================
// Events
// ============================================================

#[test]
fn given_three_listeners_when_second_captures_then_third_not_called() {
    // Arrange
    let mut graph = Graph::new();
    let leaf = number(&mut graph, "leaf");
    let calls = Rc::new(RefCell::new(Vec::new()));
    for (label, flow) in [(1, Flow::Continue), (2, Flow::Capture), (3, Flow::Continue)] {
        let calls = Rc::clone(&calls);
        graph
            .on(
                leaf,
                EventKind::Modified,
                Rc::new(move |_: &mut Graph, _: &NodeEvent| {
                    calls.borrow_mut().push(label);
                    flow
                }),
            )
            .unwrap();
    }

    // Act
    graph.set_value(leaf, Some(Scalar::Number(1.0))).unwrap();

    // Assert
    assert_eq!(*calls.borrow(), vec![1, 2]);
}

#[test]
fn given_modified_event_then_origin_is_changed_leaf() {
    let mut graph = Graph::new();
    let root = group(&mut graph, "root");
    let leaf = number(&mut graph, "leaf");
    graph.add_child(root, leaf, None).unwrap();
    let seen = Rc::new(RefCell::new(None));
    let s = Rc::clone(&seen);
    graph
        .on(
            root,
            EventKind::Modified,
            Rc::new(move |_: &mut Graph, e: &NodeEvent| {
                *s.borrow_mut() = Some((e.source, e.origin));
                Flow::Continue
            }),
        )
        .unwrap();

    graph.set_value(leaf, Some(Scalar::Number(3.0))).unwrap();

    assert_eq!(*seen.borrow(), Some((root, leaf)));
}

#[test]
fn given_update_listener_then_receives_delta_time() {
    let mut graph = Graph::new();
    let root = group(&mut graph, "root");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = Rc::clone(&seen);
    let listener: posegraph::domain::NodeListener =
        Rc::new(move |_: &mut Graph, e: &NodeEvent| {
            s.borrow_mut().push((e.kind, e.delta_time));
            Flow::Continue
        });
    graph.on(root, EventKind::PreUpdate, Rc::clone(&listener)).unwrap();
    graph.on(root, EventKind::PostUpdate, Rc::clone(&listener)).unwrap();

    graph.update(root, 0.25, false).unwrap();
    graph.off(root, EventKind::PostUpdate, &listener).unwrap();
    graph.update(root, 0.5, true).unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![
            (EventKind::PreUpdate, Some(0.25)),
            (EventKind::PostUpdate, Some(0.25)),
            (EventKind::PreUpdate, Some(0.5)),
        ]
    );
}
