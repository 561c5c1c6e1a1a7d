// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
use std::cell::Cell;
use std::rc::Rc;

use serde_json::{json, Map};
use trellis_core::{Graph, GraphSettings, NodeId, NodeOptions, Payload, PropChange, PropDef};
use trellis_dry_tests::{init_test_tracing, login_form, EventRecorder};

fn count_events(graph: &mut Graph, node: NodeId, name: &str) -> Rc<Cell<usize>> {
    let hits = Rc::new(Cell::new(0));
    let sink = Rc::clone(&hits);
    graph
        .on(node, name, move |_, _| sink.set(sink.get() + 1))
        .unwrap();
    hits
}

#[test]
fn shared_config_stops_at_a_local_override() {
    init_test_tracing();
    let mut graph = Graph::new();
    let mut values = Map::new();
    values.insert("color".into(), json!("red"));
    let shared = graph.create_config(values);

    let root = graph
        .create_node(NodeOptions::group("root").shared_config(shared))
        .unwrap();
    let a = graph.create_node(NodeOptions::group("a").parent(root)).unwrap();
    let b = graph
        .create_node(NodeOptions::group("b").config("color", "blue").parent(a))
        .unwrap();
    let c = graph.create_node(NodeOptions::input("c").parent(b)).unwrap();
    assert_eq!(graph.shared_config_of(c).unwrap(), Some(shared));
    assert_eq!(graph.config_value(a, "color").unwrap(), Some(json!("red")));

    let hits: Vec<_> = [root, a, b, c]
        .into_iter()
        .map(|n| count_events(&mut graph, n, "config:color"))
        .collect();
    graph.set_shared_config(shared, "color", json!("green")).unwrap();

    let counts: Vec<usize> = hits.iter().map(|h| h.get()).collect();
    assert_eq!(counts, vec![1, 1, 0, 0]);
    assert_eq!(graph.config_value(a, "color").unwrap(), Some(json!("green")));
    assert_eq!(graph.config_value(c, "color").unwrap(), Some(json!("blue")));
    assert_eq!(graph.shared_config_value(shared, "color").unwrap(), Some(json!("green")));

    // Writing the same value again notifies nobody.
    graph.set_shared_config(shared, "color", json!("green")).unwrap();
    assert_eq!(hits[0].get(), 1);
}

#[test]
fn detached_nodes_leave_an_inherited_shared_config() {
    let mut graph = Graph::new();
    let shared = graph.create_config(Map::new());
    let root = graph
        .create_node(NodeOptions::group("root").shared_config(shared))
        .unwrap();
    let leaf = graph.create_node(NodeOptions::input("leaf").parent(root)).unwrap();
    assert_eq!(graph.shared_config_of(leaf).unwrap(), Some(shared));

    graph.remove(root, leaf).unwrap();
    assert_eq!(graph.shared_config_of(leaf).unwrap(), None);
    assert_eq!(graph.shared_config_of(root).unwrap(), Some(shared));

    graph.set_shared_config(shared, "locale", json!("fr")).unwrap();
    assert_eq!(graph.config_value(root, "locale").unwrap(), Some(json!("fr")));
    assert_eq!(graph.config_value(leaf, "locale").unwrap(), Some(json!("en")));
}

#[test]
fn set_config_cascades_but_skips_overriding_subtrees() {
    let mut graph = Graph::new();
    let root = graph.create_node(NodeOptions::group("root")).unwrap();
    let a = graph.create_node(NodeOptions::input("a").parent(root)).unwrap();
    let b = graph
        .create_node(NodeOptions::group("b").config("theme", "light").parent(root))
        .unwrap();
    let c = graph.create_node(NodeOptions::input("c").parent(b)).unwrap();

    let hits: Vec<_> = [root, a, b, c]
        .into_iter()
        .map(|n| count_events(&mut graph, n, "config:theme"))
        .collect();
    graph.set_config(root, "theme", json!("dark")).unwrap();

    let counts: Vec<usize> = hits.iter().map(|h| h.get()).collect();
    assert_eq!(counts, vec![1, 1, 0, 0]);
    assert_eq!(graph.prop(a, "theme").unwrap(), json!("dark"));
    assert_eq!(graph.prop(c, "theme").unwrap(), json!("light"));

    let merged = graph.config(c).unwrap();
    assert_eq!(merged["theme"], json!("light"));
    assert_eq!(merged["delimiter"], json!("."));
}

#[test]
fn prop_writes_emit_once_per_change() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    let recorder = EventRecorder::attach(&mut graph, form.form, &["prop", "prop:label"]).unwrap();

    graph.set_prop(form.email, "label", json!("Email")).unwrap();
    graph.set_prop(form.email, "label", json!("Email")).unwrap();

    let props = recorder.named("prop");
    assert_eq!(props.len(), 1);
    assert_eq!(props[0].origin, form.email);
    assert_eq!(
        props[0].payload,
        Payload::Prop(PropChange {
            prop: "label".into(),
            value: json!("Email"),
        })
    );
    // `prop:label` does not bubble to the form.
    assert_eq!(recorder.count("prop:label"), 0);
    assert_eq!(graph.prop(form.email, "label").unwrap(), json!("Email"));
}

#[test]
fn prop_hook_can_rename_writes() {
    let mut graph = Graph::new();
    let email = graph.create_node(NodeOptions::input("email")).unwrap();
    graph.hooks_mut(email).unwrap().prop.use_fn(|mut change, next| {
        if change.prop == "caption" {
            change.prop = "label".into();
        }
        next.call(change)
    });

    graph.set_prop(email, "caption", json!("Email")).unwrap();
    assert_eq!(graph.prop(email, "label").unwrap(), json!("Email"));
    assert_eq!(graph.prop(email, "caption").unwrap(), json!(null));
}

#[test]
fn declared_boolean_props_adopt_attrs() {
    let mut graph = Graph::new();
    let field = graph
        .create_node(NodeOptions::input("field").attr("disabled", ""))
        .unwrap();
    assert_eq!(graph.prop(field, "disabled").unwrap(), json!(""));

    graph
        .add_props(
            field,
            vec![
                PropDef::new("disabled").boolean(),
                PropDef::new("label")
                    .with_default("Name")
                    .getter(|v| json!(format!("{}:", v.as_str().unwrap_or_default()))),
            ],
        )
        .unwrap();
    assert_eq!(graph.prop(field, "disabled").unwrap(), json!(true));
    assert_eq!(graph.prop(field, "label").unwrap(), json!("Name:"));

    graph.set_prop(field, "disabled", json!("false")).unwrap();
    assert_eq!(graph.prop(field, "disabled").unwrap(), json!(false));

    let props = graph.props(field).unwrap();
    assert_eq!(props["disabled"], json!(false));
    assert_eq!(props["label"], json!("Name:"));
}

#[test]
fn attrs_outrank_local_props() {
    let mut graph = Graph::new();
    let field = graph
        .create_node(NodeOptions::input("field").prop("placeholder", "local"))
        .unwrap();
    graph.set_attr(field, "placeholder", json!("attr")).unwrap();
    graph.set_prop(field, "placeholder", json!("ignored")).unwrap();
    assert_eq!(graph.prop(field, "placeholder").unwrap(), json!("attr"));
}

#[test]
fn setters_transform_writes() {
    let mut graph = Graph::new();
    let field = graph.create_node(NodeOptions::input("field")).unwrap();
    graph
        .add_props(
            field,
            vec![PropDef::new("help").setter(|v| json!(v.as_str().unwrap_or_default().trim()))],
        )
        .unwrap();
    graph.set_prop(field, "help", json!("  spaced  ")).unwrap();
    assert_eq!(graph.prop(field, "help").unwrap(), json!("spaced"));
}

#[test]
fn id_prop_registers_the_node() {
    let mut graph = Graph::new();
    let field = graph
        .create_node(NodeOptions::input("field").prop("id", "first"))
        .unwrap();
    assert_eq!(graph.get_node("first"), Some(field));

    graph.set_prop(field, "id", json!("second")).unwrap();
    assert_eq!(graph.get_node("first"), None);
    assert_eq!(graph.get_node("second"), Some(field));
}

#[test]
fn delimiter_comes_from_settings_or_config() {
    let mut graph = Graph::with_settings(GraphSettings {
        delimiter: "/".into(),
        ..GraphSettings::default()
    });
    let form = login_form(&mut graph).unwrap();
    assert_eq!(graph.at(form.form, "login/email").unwrap(), Some(form.email));
    assert_eq!(graph.at(form.form, "login.email").unwrap(), None);

    graph.set_config(form.form, "delimiter", json!(">")).unwrap();
    assert_eq!(
        graph.at(form.email, "$parent>password").unwrap(),
        Some(form.password)
    );
}
