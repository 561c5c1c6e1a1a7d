// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{json, Map};
use trellis_core::{Graph, ListenOptions, Message, NodeId, Payload, Receipt};
use trellis_dry_tests::{init_test_tracing, login_form, EventRecorder};

fn counter(graph: &mut Graph, node: NodeId, spec: &str) -> Rc<Cell<usize>> {
    let hits = Rc::new(Cell::new(0));
    let sink = Rc::clone(&hits);
    graph
        .on(node, spec, move |_, _| sink.set(sink.get() + 1))
        .unwrap();
    hits
}

#[test]
fn deep_listeners_see_descendant_events() {
    init_test_tracing();
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    let shallow = counter(&mut graph, form.form, "commit");
    let deep = counter(&mut graph, form.form, "commit.deep");

    graph.input(form.email, json!("a"), false).unwrap();
    assert_eq!(shallow.get(), 1);
    assert_eq!(deep.get(), 2);
}

#[test]
fn stop_propagation_ends_bubbling() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    graph
        .on(form.email, "commit", |_, event| event.stop_propagation())
        .unwrap();
    let recorder = EventRecorder::attach(&mut graph, form.form, &["commit"]).unwrap();

    graph.input(form.email, json!("a"), false).unwrap();
    let origins: Vec<_> = recorder.named("commit").into_iter().map(|e| e.origin).collect();
    assert_eq!(origins, vec![form.form]);
}

#[test]
fn off_removes_every_registration_under_a_receipt() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    let hits = Rc::new(Cell::new(0));
    let receipt = Receipt::named("mine");
    for spec in ["input", "commit"] {
        let sink = Rc::clone(&hits);
        let got = graph
            .on_with(
                form.email,
                spec,
                move |_, _| sink.set(sink.get() + 1),
                ListenOptions::receipt(receipt.clone()),
            )
            .unwrap();
        assert_eq!(got, receipt);
    }
    graph.input(form.email, json!("a"), false).unwrap();
    assert_eq!(hits.get(), 2);

    assert!(graph.off(form.email, &receipt).unwrap());
    assert!(!graph.off(form.email, &receipt).unwrap());
    assert_eq!(graph.listener_count(form.email, "commit").unwrap(), 0);
    graph.input(form.email, json!("b"), false).unwrap();
    assert_eq!(hits.get(), 2);
}

#[test]
fn generated_receipts_are_unique() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    let a = graph.on(form.email, "commit", |_, _| {}).unwrap();
    let b = graph.on(form.email, "commit", |_, _| {}).unwrap();
    assert_ne!(a, b);
    assert_eq!(graph.listener_count(form.email, "commit").unwrap(), 2);
    graph.off(form.email, &a).unwrap();
    assert_eq!(graph.listener_count(form.email, "commit").unwrap(), 1);
}

#[test]
fn unshifted_listeners_run_first() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    let order = Rc::new(RefCell::new(Vec::new()));
    let first = Rc::clone(&order);
    graph
        .on(form.email, "ping", move |_, _| first.borrow_mut().push("pushed"))
        .unwrap();
    let second = Rc::clone(&order);
    graph
        .on_with(
            form.email,
            "ping",
            move |_, _| second.borrow_mut().push("unshifted"),
            ListenOptions::default().unshift(),
        )
        .unwrap();

    graph.emit(form.email, "ping", Payload::None, false).unwrap();
    assert_eq!(*order.borrow(), vec!["unshifted", "pushed"]);
}

#[test]
fn paused_nodes_replay_the_latest_event_of_each_kind() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    let recorder = EventRecorder::attach(&mut graph, form.email, &["commit"]).unwrap();

    graph.pause(form.email).unwrap();
    assert!(graph.is_paused(form.email).unwrap());
    graph.input(form.email, json!("a"), false).unwrap();
    graph.input(form.email, json!("b"), false).unwrap();
    assert_eq!(recorder.count("commit"), 0);
    assert_eq!(graph.value(form.form).unwrap(), &json!({"email": "b", "password": ""}));

    graph.play(form.email).unwrap();
    let commits = recorder.named("commit");
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].payload, Payload::Value(json!("b")));
}

#[test]
fn meta_travels_with_the_event() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    let seen = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&seen);
    graph
        .on(form.form, "custom.deep", move |_, event| {
            *sink.borrow_mut() = event.meta().and_then(|m| m.get("why").cloned());
        })
        .unwrap();

    let mut meta = Map::new();
    meta.insert("why".into(), json!("testing"));
    graph
        .emit_with_meta(form.email, "custom", Payload::None, true, Some(meta))
        .unwrap();
    assert_eq!(*seen.borrow(), Some(json!("testing")));
}

#[test]
fn listeners_may_mutate_the_graph() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    graph
        .on(form.email, "commit", |graph, event| {
            graph
                .set_message(event.origin(), Message::state("committed", true))
                .unwrap();
        })
        .unwrap();

    graph.input(form.email, json!("a"), false).unwrap();
    assert!(graph.store(form.email).unwrap().has("committed"));
}

#[test]
fn lifecycle_events_reach_the_parent() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    let recorder =
        EventRecorder::attach(&mut graph, form.form, &["child", "childRemoved", "destroying"]).unwrap();

    let extra = graph
        .create_node(trellis_core::NodeOptions::input("extra").parent(form.form))
        .unwrap();
    graph.destroy(extra).unwrap();

    assert_eq!(recorder.named("child")[0].payload, Payload::Node(extra));
    assert_eq!(recorder.named("childRemoved")[0].payload, Payload::Node(extra));
    assert_eq!(recorder.from("destroying", extra).len(), 1);
}
