// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Event recorder.
use std::cell::RefCell;
use std::rc::Rc;

use trellis_core::{Graph, GraphResult, NodeId, Payload, Receipt};

/// One observed event.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    /// Event name.
    pub name: String,
    /// Where the event originated.
    pub origin: NodeId,
    /// Payload as emitted.
    pub payload: Payload,
}

/// Records every event of the given names reaching a node (deep).
///
/// # Example
///
/// ```
/// use trellis_core::{Graph, NodeOptions};
/// use trellis_dry_tests::EventRecorder;
///
/// let mut graph = Graph::new();
/// let node = graph.create_node(NodeOptions::input("email")).unwrap();
/// let recorder = EventRecorder::attach(&mut graph, node, &["commit"]).unwrap();
/// graph.input(node, "a".into(), false).unwrap();
/// assert_eq!(recorder.count("commit"), 1);
/// ```
#[derive(Debug, Clone)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<Recorded>>>,
    receipt: Receipt,
}

impl EventRecorder {
    /// Listen on `node` for each of `names` with the `deep` modifier.
    pub fn attach(graph: &mut Graph, node: NodeId, names: &[&str]) -> GraphResult<Self> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let receipt = Receipt::named(format!("recorder@{node}"));
        for name in names {
            let sink = Rc::clone(&events);
            graph.on_with(
                node,
                &format!("{name}.deep"),
                move |_graph, event| {
                    sink.borrow_mut().push(Recorded {
                        name: event.name().to_owned(),
                        origin: event.origin(),
                        payload: event.payload().clone(),
                    });
                },
                trellis_core::ListenOptions::receipt(receipt.clone()),
            )?;
        }
        Ok(Self { events, receipt })
    }

    /// Receipt shared by every registration, for `Graph::off`.
    pub fn receipt(&self) -> &Receipt {
        &self.receipt
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<Recorded> {
        self.events.borrow().clone()
    }

    /// Events named `name`.
    pub fn named(&self, name: &str) -> Vec<Recorded> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    /// Number of events named `name`.
    pub fn count(&self, name: &str) -> usize {
        self.events.borrow().iter().filter(|e| e.name == name).count()
    }

    /// Events named `name` that originated at `origin`.
    pub fn from(&self, name: &str, origin: NodeId) -> Vec<Recorded> {
        self.named(name)
            .into_iter()
            .filter(|e| e.origin == origin)
            .collect()
    }

    /// Forget everything recorded.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}
