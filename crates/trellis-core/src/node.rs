// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Node types, creation options and the per-node context.
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock::TimerId;
use crate::event::Emitter;
use crate::hooks::Hooks;
use crate::ident::{ConfigId, NodeId};
use crate::ledger::Ledger;
use crate::plugin::Plugin;
use crate::promise::{Promise, Resolver};
use crate::props::Props;
use crate::store::MessageStore;
use crate::traps::TrapRegistry;

/// Shape of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Leaf holding a single value.
    #[default]
    Input,
    /// Keyed aggregate; value is an object of child values.
    Group,
    /// Ordered aggregate; value is an array of child values.
    List,
}

impl NodeType {
    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Group => "group",
            Self::List => "list",
        }
    }

    /// Whether the node composes its value from children.
    pub const fn is_aggregate(self) -> bool {
        matches!(self, Self::Group | Self::List)
    }

    /// Starting value for a new node of this type.
    pub(crate) fn initial_value(self, supplied: Option<Value>) -> Value {
        match (self, supplied) {
            (Self::Input, supplied) => supplied.unwrap_or(Value::Null),
            (Self::Group, Some(Value::Object(map))) => Value::Object(map),
            (Self::Group, _) => Value::Object(Map::new()),
            (Self::List, Some(Value::Array(items))) => Value::Array(items),
            (Self::List, _) => Value::Array(Vec::new()),
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change applied to one slot of an aggregate value.
#[derive(Debug, Clone, PartialEq)]
pub enum PartialChange {
    /// Write the slot.
    Set(Value),
    /// Drop the slot.
    Removed,
    /// Insert before the slot (lists) or write it (groups).
    Inserted(Value),
    /// Move the list entry at `from` to the slot.
    Moved {
        /// Previous position.
        from: usize,
    },
}

/// Everything `Graph::create_node` needs to build a node.
#[derive(Debug, Default)]
pub struct NodeOptions {
    /// Shape of the node.
    pub node_type: NodeType,
    /// Name; `{type}_{n}` when absent.
    pub name: Option<String>,
    /// Starting value.
    pub value: Option<Value>,
    /// Parent to insert into after construction.
    pub parent: Option<NodeId>,
    /// Position among the parent's children.
    pub index: Option<usize>,
    /// Declared plugins, run before inherited ones.
    pub plugins: Vec<Plugin>,
    /// Local config entries.
    pub config: Map<String, Value>,
    /// Shared config object to join.
    pub shared_config: Option<ConfigId>,
    /// Local props.
    pub props: Map<String, Value>,
    /// Attrs (highest prop precedence).
    pub attrs: Map<String, Value>,
    /// Existing nodes to adopt as children.
    pub children: Vec<NodeId>,
}

impl NodeOptions {
    /// Options for an unnamed node of `node_type`.
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            ..Self::default()
        }
    }

    /// Named input.
    pub fn input(name: impl Into<String>) -> Self {
        Self::new(NodeType::Input).name(name)
    }

    /// Named group.
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(NodeType::Group).name(name)
    }

    /// Named list.
    pub fn list(name: impl Into<String>) -> Self {
        Self::new(NodeType::List).name(name)
    }

    /// Set the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the starting value.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Insert under `parent`.
    pub fn parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Insert at `index` among the parent's children.
    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Declare a plugin.
    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Add a local config entry.
    pub fn config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Join a shared config object.
    pub fn shared_config(mut self, config: ConfigId) -> Self {
        self.shared_config = Some(config);
        self
    }

    /// Add a local prop.
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Add an attr.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Adopt an existing node as a child.
    pub fn child(mut self, child: NodeId) -> Self {
        self.children.push(child);
        self
    }
}

/// Physical state of one node. Only the graph touches it.
#[derive(Debug)]
pub(crate) struct Context {
    pub(crate) name: String,
    pub(crate) node_type: NodeType,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) value: Value,
    pub(crate) raw: Value,
    pub(crate) initial: Value,
    pub(crate) config: Map<String, Value>,
    pub(crate) shared_config: Option<ConfigId>,
    pub(crate) explicit_shared: bool,
    pub(crate) props: Props,
    pub(crate) plugins: Vec<Plugin>,
    pub(crate) hooks: Hooks,
    pub(crate) store: MessageStore,
    pub(crate) ledger: Ledger,
    pub(crate) traps: TrapRegistry,
    pub(crate) emitter: Emitter,
    pub(crate) disturbance: u32,
    pub(crate) settlement: Promise<Value>,
    pub(crate) resolver: Option<Resolver<Value>>,
    pub(crate) timer: Option<TimerId>,
    pub(crate) created: bool,
}

impl Context {
    pub(crate) fn new(
        name: String,
        node_type: NodeType,
        value: Value,
        config: Map<String, Value>,
    ) -> Self {
        Self {
            name,
            node_type,
            parent: None,
            children: Vec::new(),
            raw: value.clone(),
            initial: value.clone(),
            settlement: Promise::resolved(value.clone()),
            value,
            config,
            shared_config: None,
            explicit_shared: false,
            props: Props::default(),
            plugins: Vec::new(),
            hooks: Hooks::default(),
            store: MessageStore::default(),
            ledger: Ledger::default(),
            traps: TrapRegistry::default(),
            emitter: Emitter::default(),
            disturbance: 0,
            resolver: None,
            timer: None,
            created: false,
        }
    }

    pub(crate) const fn is_settled(&self) -> bool {
        self.disturbance == 0
    }
}
