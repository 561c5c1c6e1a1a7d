// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Events, listeners and the per-node emitter.
//!
//! Emission and bubbling are driven by the graph (see `Graph::emit`); the
//! emitter here only stores registrations and the pause buffer.
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::graph::Graph;
use crate::hooks::PropChange;
use crate::ident::{NodeId, Receipt};
use crate::message::{Message, Meta};

/// Data carried by an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No payload.
    None,
    /// A node value (`input`, `commit`, `config:*`, ...).
    Value(Value),
    /// A flag (`settled`).
    Bool(bool),
    /// A ledger count (`count:*`).
    Count(i64),
    /// A node handle (`created`, `child`, ...).
    Node(NodeId),
    /// An added or removed message.
    Message(Rc<Message>),
    /// A replaced message.
    MessageUpdated {
        /// Message that was replaced.
        previous: Rc<Message>,
        /// Message now stored.
        current: Rc<Message>,
    },
    /// A prop change (`prop`).
    Prop(PropChange),
}

impl Payload {
    /// Value payload, also unwrapping the value of a prop change.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Prop(change) => Some(&change.value),
            _ => None,
        }
    }

    /// Node payload.
    pub const fn as_node(&self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// Flag payload.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Count payload.
    pub const fn as_count(&self) -> Option<i64> {
        match self {
            Self::Count(n) => Some(*n),
            _ => None,
        }
    }

    /// The message an event is about (the current one for updates).
    pub fn as_message(&self) -> Option<&Rc<Message>> {
        match self {
            Self::Message(m) | Self::MessageUpdated { current: m, .. } => Some(m),
            _ => None,
        }
    }
}

/// An emitted event. Everything but the bubble flag is immutable.
#[derive(Debug)]
pub struct Event {
    name: String,
    payload: Payload,
    bubble: Cell<bool>,
    origin: NodeId,
    meta: Option<Meta>,
}

impl Event {
    pub(crate) fn new(
        name: impl Into<String>,
        payload: Payload,
        bubble: bool,
        origin: NodeId,
        meta: Option<Meta>,
    ) -> Self {
        Self {
            name: name.into(),
            payload,
            bubble: Cell::new(bubble),
            origin,
            meta,
        }
    }

    /// Event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Event payload.
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Node that emitted the event.
    pub const fn origin(&self) -> NodeId {
        self.origin
    }

    /// Optional metadata.
    pub const fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }

    /// Whether the event will continue to the parent.
    pub fn bubbles(&self) -> bool {
        self.bubble.get()
    }

    /// Stop the event at the current level.
    pub fn stop_propagation(&self) {
        self.bubble.set(false);
    }
}

/// Event callback. Listeners get the graph so they can react with mutations.
pub type Listener = Rc<dyn Fn(&mut Graph, &Event)>;

/// Where a new listener goes relative to existing ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Placement {
    /// After existing listeners.
    #[default]
    Push,
    /// Before existing listeners.
    Unshift,
}

/// Options for `Graph::on_with`.
#[derive(Debug, Clone, Default)]
pub struct ListenOptions {
    /// Receipt to register under; generated when absent.
    pub receipt: Option<Receipt>,
    /// Placement among existing listeners.
    pub placement: Placement,
}

impl ListenOptions {
    /// Register under an explicit receipt.
    pub fn receipt(receipt: Receipt) -> Self {
        Self {
            receipt: Some(receipt),
            placement: Placement::Push,
        }
    }

    /// Run before previously registered listeners.
    pub fn unshift(mut self) -> Self {
        self.placement = Placement::Unshift;
        self
    }
}

struct Registration {
    listener: Listener,
    modifiers: Vec<String>,
    receipt: Receipt,
}

impl Registration {
    fn deep(&self) -> bool {
        self.modifiers.iter().any(|m| m == "deep")
    }
}

/// Listener table and pause buffer for one node.
#[derive(Default)]
pub(crate) struct Emitter {
    listeners: FxHashMap<String, Vec<Registration>>,
    paused: bool,
    held: Vec<Rc<Event>>,
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("events", &self.listeners.len())
            .field("paused", &self.paused)
            .field("held", &self.held.len())
            .finish()
    }
}

impl Emitter {
    /// Register under `pattern` (`name` or `name.modifier...`).
    pub(crate) fn on(
        &mut self,
        pattern: &str,
        listener: Listener,
        receipt: Receipt,
        placement: Placement,
    ) {
        let mut parts = pattern.split('.');
        let name = parts.next().unwrap_or_default().to_owned();
        let registration = Registration {
            listener,
            modifiers: parts.map(str::to_owned).collect(),
            receipt,
        };
        let list = self.listeners.entry(name).or_default();
        match placement {
            Placement::Push => list.push(registration),
            Placement::Unshift => list.insert(0, registration),
        }
    }

    /// Drop every registration made under `receipt`.
    pub(crate) fn off(&mut self, receipt: &Receipt) -> bool {
        let mut removed = false;
        self.listeners.retain(|_, list| {
            let before = list.len();
            list.retain(|r| &r.receipt != receipt);
            removed |= before != list.len();
            !list.is_empty()
        });
        removed
    }

    /// Listeners that should see `event` at node `at`, in invocation order.
    pub(crate) fn matching(&self, event: &Event, at: NodeId) -> Vec<Listener> {
        self.listeners
            .get(event.name())
            .map(|list| {
                list.iter()
                    .filter(|r| event.origin() == at || r.deep())
                    .map(|r| Rc::clone(&r.listener))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn listener_count(&self, name: &str) -> usize {
        self.listeners.get(name).map_or(0, Vec::len)
    }

    pub(crate) fn pause(&mut self) {
        self.paused = true;
    }

    pub(crate) const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Buffer an event while paused; a later event with the same name and origin replaces it.
    pub(crate) fn hold(&mut self, event: Rc<Event>) {
        if let Some(slot) = self
            .held
            .iter_mut()
            .find(|e| e.name() == event.name() && e.origin() == event.origin())
        {
            *slot = event;
        } else {
            self.held.push(event);
        }
    }

    /// Unpause and hand back the buffered events in arrival order.
    pub(crate) fn play(&mut self) -> Vec<Rc<Event>> {
        self.paused = false;
        std::mem::take(&mut self.held)
    }

    pub(crate) fn clear(&mut self) {
        self.listeners.clear();
        self.held.clear();
    }
}
