// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use futures_util::FutureExt;
use serde_json::json;
use trellis_core::{
    Condition, Graph, Message, MessageType, NodeOptions, Payload, W_RESET_UNKNOWN_ID,
};
use trellis_dry_tests::{init_test_tracing, login_form, EventRecorder};

#[test]
fn blocking_counter_tracks_the_subtree() {
    init_test_tracing();
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    let recorder = EventRecorder::attach(
        &mut graph,
        form.form,
        &["count:blocking", "unsettled:blocking", "settled:blocking"],
    )
    .unwrap();

    let initial = graph
        .count(form.form, "blocking", Some(Condition::new(|m| m.blocking)))
        .unwrap();
    assert!(initial.is_resolved());
    assert_eq!(graph.ledger_value(form.form, "blocking").unwrap(), 0);

    graph
        .set_message(form.email, Message::error("required", "Required").blocking(true))
        .unwrap();
    graph
        .set_message(form.password, Message::error("hint", "Use a passphrase"))
        .unwrap();
    assert_eq!(graph.ledger_value(form.form, "blocking").unwrap(), 1);
    assert_eq!(graph.ledger_value(form.email, "blocking").unwrap(), 1);
    assert_eq!(graph.ledger_value(form.password, "blocking").unwrap(), 0);

    let pending = graph.ledger_settled(form.form, "blocking").unwrap();
    assert_eq!(pending.clone().now_or_never(), None);

    assert!(graph.remove_message(form.email, "required").unwrap());
    assert!(!graph.remove_message(form.email, "required").unwrap());
    assert_eq!(pending.now_or_never(), Some(()));

    let counts: Vec<_> = recorder
        .named("count:blocking")
        .into_iter()
        .map(|e| e.payload)
        .collect();
    assert_eq!(counts, vec![Payload::Count(1), Payload::Count(0)]);
    assert_eq!(recorder.count("unsettled:blocking"), 1);
    assert_eq!(recorder.count("settled:blocking"), 1);
}

#[test]
fn default_condition_matches_the_counter_name_as_type() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    graph
        .set_message(form.password, Message::error("short", "Too short"))
        .unwrap();
    graph
        .set_message(form.password, Message::new("loading", MessageType::from("loading"), true))
        .unwrap();

    graph.count(form.form, "error", None).unwrap();
    graph.count(form.form, "loading", None).unwrap();
    assert_eq!(graph.ledger_value(form.form, "error").unwrap(), 1);
    assert_eq!(graph.ledger_value(form.form, "loading").unwrap(), 1);
    assert!(graph.ledger(form.password).unwrap().has("error"));

    // Replacing a message re-evaluates both sides.
    graph
        .set_message(form.password, Message::state("short", true))
        .unwrap();
    assert_eq!(graph.ledger_value(form.form, "error").unwrap(), 0);
}

#[test]
fn adding_and_removing_children_merges_their_counts() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    graph.count(form.form, "error", None).unwrap();
    graph
        .set_message(form.email, Message::error("required", "Required"))
        .unwrap();

    let extra = graph.create_node(NodeOptions::input("extra")).unwrap();
    graph
        .set_message(extra, Message::error("bad", "Bad"))
        .unwrap();
    graph
        .set_message(extra, Message::error("worse", "Worse"))
        .unwrap();

    graph.add(form.form, extra, None).unwrap();
    assert_eq!(graph.ledger_value(form.form, "error").unwrap(), 3);
    assert_eq!(graph.ledger_value(extra, "error").unwrap(), 2);

    graph.remove(form.form, extra).unwrap();
    assert_eq!(graph.ledger_value(form.form, "error").unwrap(), 1);
    assert_eq!(graph.ledger_value(extra, "error").unwrap(), 2);

    graph.destroy(form.email).unwrap();
    assert_eq!(graph.ledger_value(form.form, "error").unwrap(), 0);
}

#[test]
fn set_errors_targets_descendants_and_buffers_unknown_ones() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();

    let mut children = BTreeMap::new();
    children.insert("email".to_owned(), vec!["Already taken".to_owned()]);
    children.insert("nickname".to_owned(), vec!["Not allowed".to_owned()]);
    graph
        .set_errors(form.form, vec!["Server down".into()], children)
        .unwrap();

    let local = graph.store(form.form).unwrap().get("server-down").cloned().unwrap();
    assert_eq!(local.kind, MessageType::Error);
    assert_eq!(local.meta_str("source"), Some("login-set"));
    assert!(graph.store(form.email).unwrap().has("already-taken"));

    let nickname = graph
        .create_node(NodeOptions::input("nickname").parent(form.form))
        .unwrap();
    assert!(graph.store(nickname).unwrap().has("not-allowed"));

    graph
        .set_errors(form.form, vec!["Try later".into()], BTreeMap::new())
        .unwrap();
    let store = graph.store(form.form).unwrap();
    assert!(!store.has("server-down"));
    assert!(store.has("try-later"));

    graph.clear_errors(form.form, true).unwrap();
    assert!(graph.store(form.form).unwrap().is_empty());
    assert!(!graph.store(form.email).unwrap().has("already-taken"));
    assert!(!graph.store(nickname).unwrap().has("not-allowed"));
}

#[test]
fn set_errors_hook_can_rewrite_the_payload() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    graph
        .hooks_mut(form.form)
        .unwrap()
        .set_errors
        .use_fn(|mut payload, next| {
            payload.local_errors.retain(|e| !e.is_empty());
            next.call(payload)
        });
    graph
        .set_errors(form.form, vec![String::new(), "Kept".into()], BTreeMap::new())
        .unwrap();
    assert_eq!(graph.store(form.form).unwrap().len(), 1);
}

#[test]
fn string_messages_are_localized_through_the_text_hook() {
    let mut graph = Graph::new();
    let email = graph.create_node(NodeOptions::input("email")).unwrap();
    graph.hooks_mut(email).unwrap().text.use_fn(|mut fragment, next| {
        if fragment.key == "required" {
            fragment.value = "Obligatoire".into();
        }
        next.call(fragment)
    });

    let stored = graph
        .set_message(email, Message::error("required", "Required"))
        .unwrap();
    assert_eq!(stored.value, json!("Obligatoire"));
    assert_eq!(stored.meta_str("locale"), Some("en"));

    let raw = graph
        .set_message(
            email,
            Message::error("required", "Required").with_meta("localize", false),
        )
        .unwrap();
    assert_eq!(raw.value, json!("Required"));
    assert_eq!(
        graph.store(email).unwrap().get("required").unwrap().value,
        json!("Required")
    );
}

#[test]
fn storing_the_same_message_twice_is_a_no_op() {
    let mut graph = Graph::new();
    let email = graph.create_node(NodeOptions::input("email")).unwrap();
    let recorder = EventRecorder::attach(
        &mut graph,
        email,
        &["message-added", "message-updated", "message-removed"],
    )
    .unwrap();

    let dirty = Rc::new(Message::state("dirty", true));
    graph.set_message(email, Rc::clone(&dirty)).unwrap();
    graph.set_message(email, Rc::clone(&dirty)).unwrap();
    assert_eq!(recorder.count("message-added"), 1);
    assert_eq!(recorder.count("message-updated"), 0);

    graph.set_message(email, Message::state("dirty", true)).unwrap();
    assert_eq!(recorder.count("message-updated"), 1);

    let removed = graph
        .filter_messages(email, |m| m.key != "dirty", Some(MessageType::State))
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(recorder.count("message-removed"), 1);
}

#[test]
fn localized_message_stored_twice_is_a_no_op() {
    let mut graph = Graph::new();
    let email = graph.create_node(NodeOptions::input("email")).unwrap();
    let translations = Rc::new(RefCell::new(0_u32));
    let seen = Rc::clone(&translations);
    graph.hooks_mut(email).unwrap().text.use_fn(move |mut fragment, next| {
        *seen.borrow_mut() += 1;
        fragment.value = fragment.value.to_uppercase();
        next.call(fragment)
    });
    let recorder = EventRecorder::attach(&mut graph, email, &["message-added", "message-updated"])
        .unwrap();

    let required = Rc::new(Message::error("required", "required"));
    let first = graph.set_message(email, Rc::clone(&required)).unwrap();
    let second = graph.set_message(email, Rc::clone(&required)).unwrap();
    graph.set_message(email, Rc::clone(&required)).unwrap();
    assert_eq!(first.value, json!("REQUIRED"));
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(recorder.count("message-added"), 1);
    assert_eq!(recorder.count("message-updated"), 0);
    assert_eq!(*translations.borrow(), 1);

    graph.set_message(email, Rc::clone(&first)).unwrap();
    assert_eq!(recorder.count("message-updated"), 0);

    graph
        .set_message(email, Message::error("required", "required"))
        .unwrap();
    assert_eq!(recorder.count("message-updated"), 1);
    assert_eq!(*translations.borrow(), 2);
}

#[test]
fn reset_restores_values_and_clears_transient_messages() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();
    let recorder = EventRecorder::attach(&mut graph, form.form, &["reset", "commit"]).unwrap();

    graph.input(form.email, json!("typed"), false).unwrap();
    graph.input(form.password, json!("secret"), true).unwrap();
    for message in [
        Message::error("required", "Required"),
        Message::state("dirty", true),
        Message::ui("incomplete", "Incomplete"),
        Message::ui("submit", "Submit"),
    ] {
        graph.set_message(form.email, message).unwrap();
    }
    recorder.clear();

    graph.reset(form.form, None).unwrap();
    assert_eq!(graph.value(form.form).unwrap(), &json!({"email": "", "password": ""}));
    assert_eq!(graph.pending_timers(), 0);
    assert!(graph.is_settled(form.form).unwrap());
    assert!(!graph.is_paused(form.email).unwrap());

    let store = graph.store(form.email).unwrap();
    assert!(!store.has("required"));
    assert!(!store.has("incomplete"));
    assert!(store.has("submit"));
    assert_eq!(store.get("dirty").unwrap().value, json!(false));

    assert_eq!(recorder.count("reset"), 1);
    assert!(!recorder.from("commit", form.email).is_empty());
}

#[test]
fn reset_with_a_value_replaces_the_snapshot() {
    let mut graph = Graph::new();
    let form = login_form(&mut graph).unwrap();

    graph.reset(form.email, Some(json!("seed"))).unwrap();
    assert_eq!(graph.initial_value(form.email).unwrap(), &json!("seed"));
    assert_eq!(graph.value(form.form).unwrap(), &json!({"email": "seed", "password": ""}));

    graph.input(form.email, json!("changed"), false).unwrap();
    graph.reset(form.email, None).unwrap();
    assert_eq!(graph.value(form.email).unwrap(), &json!("seed"));
}

#[test]
fn reset_by_id_warns_for_unknown_ids() {
    let mut graph = Graph::new();
    let warnings = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&warnings);
    graph.on_warning(move |w| sink.borrow_mut().push(w.code));

    let email = graph
        .create_node(NodeOptions::input("email").prop("id", "email-field").value("start"))
        .unwrap();
    graph.input(email, json!("typed"), false).unwrap();

    assert_eq!(graph.reset_by_id("email-field", None).unwrap(), Some(email));
    assert_eq!(graph.value(email).unwrap(), &json!("start"));
    assert_eq!(graph.reset_by_id("nope", None).unwrap(), None);
    assert_eq!(*warnings.borrow(), vec![W_RESET_UNKNOWN_ID]);
}
