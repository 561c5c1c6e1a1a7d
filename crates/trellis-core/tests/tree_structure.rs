// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use trellis_core::{Graph, GraphError, NodeOptions, W_INDEX_WITHOUT_PARENT};
use trellis_dry_tests::{init_test_tracing, list_of, login_form};

#[test]
fn adding_to_a_second_parent_detaches_from_the_first() {
    init_test_tracing();
    let mut graph = Graph::new();
    let b = graph.create_node(NodeOptions::group("b")).unwrap();
    let c = graph.create_node(NodeOptions::group("c")).unwrap();
    let a = graph.create_node(NodeOptions::input("a")).unwrap();

    graph.add(b, a, None).unwrap();
    assert_eq!(graph.value(b).unwrap(), &json!({"a": null}));

    graph.add(c, a, None).unwrap();
    assert_eq!(graph.parent(a).unwrap(), Some(c));
    assert!(graph.children(b).unwrap().is_empty());
    assert_eq!(graph.children(c).unwrap(), &[a]);
    assert_eq!(graph.value(b).unwrap(), &json!({}));
    assert_eq!(graph.value(c).unwrap(), &json!({"a": null}));
}

#[test]
fn adding_a_present_child_is_a_no_op() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    graph.add(form.form, form.email, None).unwrap();
    assert_eq!(graph.children(form.form).unwrap(), &[form.email, form.password]);
}

#[test]
fn shape_errors() {
    let mut graph = Graph::new();
    let root = graph.create_node(NodeOptions::group("root")).unwrap();
    let inner = graph.create_node(NodeOptions::group("inner").parent(root)).unwrap();
    let leaf = graph.create_node(NodeOptions::input("leaf")).unwrap();

    assert!(matches!(graph.add(inner, root, None), Err(GraphError::Cycle { .. })));
    assert!(matches!(graph.add(root, root, None), Err(GraphError::Cycle { .. })));
    let err = graph.add(leaf, inner, None).unwrap_err();
    assert_eq!(err.code(), 100);

    let child = graph.create_node(NodeOptions::input("child")).unwrap();
    let err = graph
        .create_node(NodeOptions::input("bad").child(child))
        .unwrap_err();
    assert!(matches!(err, GraphError::LeafWithChildren { .. }));
}

#[test]
fn list_reordering_and_clamping() {
    let mut graph = Graph::new();
    let (list, xs) = list_of(&mut graph, "list", ["x0", "x1", "x2", "x3"].map(|s| json!(s))).unwrap();
    assert_eq!(graph.value(list).unwrap(), &json!(["x0", "x1", "x2", "x3"]));

    assert!(graph.set_index(xs[2], 1).unwrap());
    assert_eq!(graph.children(list).unwrap(), &[xs[0], xs[2], xs[1], xs[3]]);
    assert_eq!(graph.value(list).unwrap(), &json!(["x0", "x2", "x1", "x3"]));
    assert_eq!(graph.name(xs[2]).unwrap(), "1");
    assert_eq!(graph.index(xs[2]).unwrap(), Some(1));

    graph.set_index(xs[3], -5).unwrap();
    assert_eq!(graph.children(list).unwrap()[0], xs[3]);
    graph.set_index(xs[0], 99).unwrap();
    assert_eq!(graph.children(list).unwrap()[3], xs[0]);
    assert_eq!(graph.value(list).unwrap(), &json!(["x3", "x2", "x1", "x0"]));
    assert!(graph.is_settled(list).unwrap());
}

#[test]
fn index_without_parent_warns() {
    let mut graph = Graph::new();
    let warnings = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&warnings);
    graph.on_warning(move |w| sink.borrow_mut().push(w.code));

    let lone = graph.create_node(NodeOptions::input("lone")).unwrap();
    assert_eq!(graph.index(lone).unwrap(), None);
    assert!(!graph.set_index(lone, 0).unwrap());
    assert_eq!(*warnings.borrow(), vec![W_INDEX_WITHOUT_PARENT]);
}

#[test]
fn addresses_and_lookup() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    let (list, items) = list_of(&mut graph, "tags", [json!("a"), json!("b")]).unwrap();
    graph.add(form.form, list, None).unwrap();

    assert_eq!(graph.address(form.email).unwrap().join("."), "login.email");
    assert_eq!(graph.address(items[1]).unwrap().join("."), "login.tags.1");

    assert_eq!(graph.at(form.form, "login.email").unwrap(), Some(form.email));
    assert_eq!(graph.at(form.form, "tags.1").unwrap(), Some(items[1]));
    assert_eq!(graph.at(form.email, "password").unwrap(), Some(form.password));
    assert_eq!(graph.at(items[0], "$root").unwrap(), Some(form.form));
    assert_eq!(graph.at(form.email, "$parent.password").unwrap(), Some(form.password));
    assert_eq!(graph.at(items[0], "$parent.$parent.email").unwrap(), Some(form.email));
    assert_eq!(graph.at(form.email, "$self").unwrap(), Some(form.email));
    assert_eq!(graph.at(form.form, "login.missing").unwrap(), None);

    assert_eq!(graph.find(form.form, "password").unwrap(), Some(form.password));
    assert_eq!(graph.find(form.form, "nope").unwrap(), None);
    assert_eq!(graph.root(items[0]).unwrap(), form.form);
    assert_eq!(
        graph.descendants(form.form).unwrap(),
        vec![form.email, form.password, list, items[0], items[1]]
    );
}

#[test]
fn walk_can_stop_everything() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    let extra = graph.create_node(NodeOptions::group("extra").parent(form.form)).unwrap();
    graph.create_node(NodeOptions::input("deep").parent(extra)).unwrap();

    let mut seen = Vec::new();
    graph
        .walk(form.form, true, |graph, node| {
            seen.push(graph.name(node).unwrap());
            node != form.password
        })
        .unwrap();
    assert_eq!(seen, vec!["email", "password"]);

    let mut all = 0;
    graph.walk(form.form, false, |_, _| {
        all += 1;
        false
    })
    .unwrap();
    assert_eq!(all, 4);

    let mut direct = 0;
    graph.each(form.form, |_, _| direct += 1).unwrap();
    assert_eq!(direct, 3);
}

#[test]
fn preserve_keeps_the_key_on_removal() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    graph.input(form.email, json!("kept"), false).unwrap();
    graph.set_prop(form.email, "preserve", json!(true)).unwrap();

    graph.remove(form.form, form.email).unwrap();
    assert_eq!(graph.parent(form.email).unwrap(), None);
    assert_eq!(graph.value(form.form).unwrap(), &json!({"email": "kept", "password": ""}));

    graph.remove(form.form, form.password).unwrap();
    assert_eq!(graph.value(form.form).unwrap(), &json!({"email": "kept"}));
}

#[test]
fn group_value_wins_over_a_new_child() {
    let mut graph = Graph::new();
    let group = graph
        .create_node(NodeOptions::group("g").value(json!({"name": "from group"})))
        .unwrap();
    let name = graph
        .create_node(NodeOptions::input("name").value("from child").parent(group))
        .unwrap();
    let other = graph
        .create_node(NodeOptions::input("other").value("mine").parent(group))
        .unwrap();
    assert_eq!(graph.value(name).unwrap(), &json!("from group"));
    assert_eq!(graph.value(other).unwrap(), &json!("mine"));
    assert_eq!(
        graph.value(group).unwrap(),
        &json!({"name": "from group", "other": "mine"})
    );
}

#[test]
fn destroy_frees_the_subtree() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    let outer = graph.create_node(NodeOptions::group("outer")).unwrap();
    graph.add(outer, form.form, None).unwrap();

    graph.destroy(form.form).unwrap();
    assert!(!graph.contains(form.email));
    assert!(!graph.contains(form.form));
    assert!(matches!(graph.value(form.email), Err(GraphError::UnknownNode(_))));
    assert!(graph.children(outer).unwrap().is_empty());
    assert_eq!(graph.value(outer).unwrap(), &json!({}));
    assert_eq!(graph.len(), 1);

    let reused = graph.create_node(NodeOptions::input("reused")).unwrap();
    assert_ne!(reused, form.form);
    assert!(!graph.contains(form.password));
}
