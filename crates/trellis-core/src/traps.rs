// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Named node operations resolved by key at runtime.
//!
//! Each node resolves a key against its own [`TrapRegistry`] (capabilities
//! added with `Graph::extend`) and then against the graph's built-in table.
//! Keys with no trap fall through to the node's props.
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::address::Address;
use crate::error::GraphResult;
use crate::graph::Graph;
use crate::ident::NodeId;
use crate::plugin::Plugin;
use crate::promise::Promise;

/// Callback used by `walk`/`each` traps; `false` stops or skips per operation.
pub type Visitor = Rc<dyn Fn(&mut Graph, NodeId) -> bool>;

/// Argument passed to a trap.
#[derive(Clone)]
pub enum TrapArg {
    /// Plain value.
    Value(Value),
    /// Node handle or null.
    Node(Option<NodeId>),
    /// Flag.
    Bool(bool),
    /// Plugin for `use`.
    Plugin(Plugin),
    /// Traversal callback.
    Visitor(Visitor),
}

impl fmt::Debug for TrapArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Node(n) => f.debug_tuple("Node").field(n).finish(),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Plugin(p) => f.debug_tuple("Plugin").field(p).finish(),
            Self::Visitor(_) => f.write_str("Visitor"),
        }
    }
}

/// Method trap bound to a node, ready to be invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundTrap {
    node: NodeId,
    key: String,
}

impl BoundTrap {
    pub(crate) fn new(node: NodeId, key: impl Into<String>) -> Self {
        Self {
            node,
            key: key.into(),
        }
    }

    /// Node the trap was read from.
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// Trap key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Invoke with `args`.
    pub fn invoke(&self, graph: &mut Graph, args: &[TrapArg]) -> GraphResult<TrapValue> {
        graph.call(self.node, &self.key, args)
    }
}

/// Result of reading or invoking a trap.
#[derive(Debug, Clone)]
pub enum TrapValue {
    /// Nothing.
    Unit,
    /// Plain value.
    Value(Value),
    /// Flag.
    Bool(bool),
    /// Integer (`index`).
    Int(i64),
    /// Node handle or null.
    Node(Option<NodeId>),
    /// Node list.
    Nodes(Vec<NodeId>),
    /// Address.
    Address(Address),
    /// Settlement promise.
    Settled(Promise<Value>),
    /// Method bound to a node.
    Bound(BoundTrap),
}

impl TrapValue {
    /// Plain value, if this is one.
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Node handle, if this is one.
    pub const fn as_node(&self) -> Option<NodeId> {
        match self {
            Self::Node(n) => *n,
            _ => None,
        }
    }

    /// Integer, if this is one.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Flag, if this is one.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Trap body: receives the graph, the target node and call arguments.
pub type TrapFn = Rc<dyn Fn(&mut Graph, NodeId, &[TrapArg]) -> GraphResult<TrapValue>>;
/// Setter body: returns whether the assignment took effect.
pub type TrapSetFn = Rc<dyn Fn(&mut Graph, NodeId, TrapArg) -> GraphResult<bool>>;

/// How a trap getter behaves on read.
#[derive(Clone)]
pub enum TrapGetter {
    /// Computed property, evaluated on read.
    Direct(TrapFn),
    /// Method; reading yields a [`BoundTrap`].
    Curried(TrapFn),
}

/// Getter with an optional setter.
#[derive(Clone)]
pub struct Trap {
    pub(crate) get: TrapGetter,
    pub(crate) set: Option<TrapSetFn>,
}

impl Trap {
    /// Read-only computed property.
    pub fn property<F>(f: F) -> Self
    where
        F: Fn(&mut Graph, NodeId) -> GraphResult<TrapValue> + 'static,
    {
        Self {
            get: TrapGetter::Direct(Rc::new(move |graph, node, _| f(graph, node))),
            set: None,
        }
    }

    /// Method taking arguments.
    pub fn method<F>(f: F) -> Self
    where
        F: Fn(&mut Graph, NodeId, &[TrapArg]) -> GraphResult<TrapValue> + 'static,
    {
        Self {
            get: TrapGetter::Curried(Rc::new(f)),
            set: None,
        }
    }

    /// Attach a setter.
    pub fn with_setter<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Graph, NodeId, TrapArg) -> GraphResult<bool> + 'static,
    {
        self.set = Some(Rc::new(f));
        self
    }

    /// Whether reading the trap yields a bound method.
    pub const fn is_method(&self) -> bool {
        matches!(self.get, TrapGetter::Curried(_))
    }

    /// Whether the trap accepts assignment.
    pub const fn is_writable(&self) -> bool {
        self.set.is_some()
    }
}

impl fmt::Debug for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trap")
            .field("method", &self.is_method())
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// Key → trap table.
#[derive(Clone, Default)]
pub struct TrapRegistry {
    traps: FxHashMap<String, Trap>,
}

impl TrapRegistry {
    /// Trap for `key`.
    pub fn get(&self, key: &str) -> Option<&Trap> {
        self.traps.get(key)
    }

    /// Install or replace a trap.
    pub fn insert(&mut self, key: impl Into<String>, trap: Trap) -> Option<Trap> {
        self.traps.insert(key.into(), trap)
    }

    /// Whether `key` has a trap.
    pub fn contains(&self, key: &str) -> bool {
        self.traps.contains_key(key)
    }

    /// Installed keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.traps.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl fmt::Debug for TrapRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys()).finish()
    }
}
