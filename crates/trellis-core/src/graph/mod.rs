// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The graph: sole owner of nodes, timers, shared configs and the registry.
//!
//! Nodes are addressed by [`NodeId`] handles into a generational arena.
//! Every operation is a `&mut self` method taking the target node; callbacks
//! (listeners, traps, plugins) receive the graph back so they can mutate it.
//! Callback lists are cloned out of the node before they run, so no borrow of
//! the arena is held across user code.
mod commit;
mod config;
mod events;
mod messages;
mod plugins;
mod registry;
mod traps;
mod tree;

use std::rc::Rc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::arena::Arena;
use crate::classes::{merge_class_lists, render_class_list};
use crate::clock::{Clock, TimerQueue, VirtualClock};
use crate::config::SharedConfig;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{GraphError, GraphResult};
use crate::event::Payload;
use crate::hooks::{ClassMap, ClassesPayload, Hooks, TextFragment};
use crate::ident::{NodeId, Receipt};
use crate::ledger::Ledger;
use crate::node::{Context, NodeOptions, NodeType};
use crate::plugin::Plugin;
use crate::promise::Promise;
use crate::registry::Registry;
use crate::settings::GraphSettings;
use crate::store::MessageStore;
use crate::traps::TrapRegistry;


/// Owner of a node tree (or forest) and everything attached to it.
pub struct Graph {
    nodes: Arena<Context>,
    timers: TimerQueue,
    clock: Rc<dyn Clock>,
    virtual_clock: Option<VirtualClock>,
    configs: Vec<SharedConfig>,
    registry: Registry,
    diagnostics: Diagnostics,
    settings: GraphSettings,
    builtins: Rc<TrapRegistry>,
    name_seq: u64,
    receipt_seq: u64,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.len())
            .field("timers", &self.timers.len())
            .field("configs", &self.configs.len())
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Graph {
    /// Graph with default settings and a virtual clock at zero.
    pub fn new() -> Self {
        Self::with_settings(GraphSettings::default())
    }

    /// Graph with `settings` and a virtual clock at zero.
    pub fn with_settings(settings: GraphSettings) -> Self {
        Self::with_virtual_clock(settings, VirtualClock::new())
    }

    /// Graph driven by a caller-held virtual clock.
    pub fn with_virtual_clock(settings: GraphSettings, clock: VirtualClock) -> Self {
        Self::build(settings, Rc::new(clock.clone()), Some(clock))
    }

    /// Graph driven by an arbitrary clock; the host calls [`Graph::tick`].
    pub fn with_clock<C>(settings: GraphSettings, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        Self::build(settings, Rc::new(clock), None)
    }

    fn build(
        settings: GraphSettings,
        clock: Rc<dyn Clock>,
        virtual_clock: Option<VirtualClock>,
    ) -> Self {
        Self {
            nodes: Arena::default(),
            timers: TimerQueue::default(),
            clock,
            virtual_clock,
            configs: Vec::new(),
            registry: Registry::default(),
            diagnostics: Diagnostics::default(),
            settings,
            builtins: Rc::new(traps::builtin_traps()),
            name_seq: 0,
            receipt_seq: 0,
        }
    }

    /// Active settings.
    pub const fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    /// Current clock reading.
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 0
    }

    /// Whether `node` is live.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(node)
    }

    pub(crate) fn ctx(&self, node: NodeId) -> GraphResult<&Context> {
        self.nodes.get(node).ok_or(GraphError::UnknownNode(node))
    }

    pub(crate) fn ctx_mut(&mut self, node: NodeId) -> GraphResult<&mut Context> {
        self.nodes.get_mut(node).ok_or(GraphError::UnknownNode(node))
    }

    pub(crate) fn next_receipt(&mut self) -> Receipt {
        self.receipt_seq += 1;
        Receipt::named(format!("r{}", self.receipt_seq))
    }

    /// Register a warning handler.
    pub fn on_warning<F>(&mut self, handler: F)
    where
        F: Fn(&Warning) + 'static,
    {
        self.diagnostics.add(Rc::new(handler));
    }

    pub(crate) fn warn(&self, code: u16, message: impl Into<String>) {
        self.diagnostics.report(&Warning {
            code,
            message: message.into(),
        });
    }

    /// Build a node, run its plugins, insert it and perform the initial commit.
    #[instrument(level = "debug", skip_all, fields(node_type = %options.node_type))]
    pub fn create_node(&mut self, options: NodeOptions) -> GraphResult<NodeId> {
        let NodeOptions {
            node_type,
            name,
            value,
            parent,
            index,
            plugins,
            config,
            shared_config,
            props,
            attrs,
            children,
        } = options;
        let name = name.unwrap_or_else(|| {
            self.name_seq += 1;
            format!("{}_{}", node_type.as_str(), self.name_seq)
        });
        if node_type == NodeType::Input && !children.is_empty() {
            return Err(GraphError::LeafWithChildren { name });
        }
        if let Some(parent) = parent {
            self.ctx(parent)?;
        }
        for child in &children {
            self.ctx(*child)?;
        }
        if let Some(config) = shared_config {
            self.shared(config)?;
        }

        let mut ctx = Context::new(name, node_type, node_type.initial_value(value), config);
        ctx.props.local = props;
        ctx.props.attrs = attrs;
        let id = self.nodes.insert(ctx);
        if let Some(config) = shared_config {
            self.join_shared_config(id, config, true)?;
        }
        for plugin in &plugins {
            self.use_plugin(id, plugin)?;
        }
        for child in children {
            self.add(id, child, None)?;
        }
        if let Some(parent) = parent {
            self.add(parent, id, index)?;
        }

        let raw = self.ctx(id)?.raw.clone();
        self.input(id, raw, false)?;
        let ctx = self.ctx_mut(id)?;
        ctx.initial = ctx.value.clone();

        if let Some(key) = self.prop(id, "id")?.as_str().map(str::to_owned) {
            self.register(id, &key)?;
        }
        self.emit(id, "created", Payload::Node(id), true)?;
        self.ctx_mut(id)?.created = true;
        debug!(node = %id, "node created");
        Ok(id)
    }

    /// Detach `node` and tear down its whole subtree.
    #[instrument(level = "debug", skip(self))]
    pub fn destroy(&mut self, node: NodeId) -> GraphResult<()> {
        self.ctx(node)?;
        self.emit(node, "destroying", Payload::Node(node), true)?;
        if let Some(parent) = self.ctx(node)?.parent {
            self.remove(parent, node)?;
        }
        let mut doomed = self.descendants(node)?;
        doomed.reverse();
        doomed.push(node);
        for id in &doomed {
            self.teardown(*id)?;
        }
        for id in doomed {
            self.nodes.remove(id);
        }
        debug!(node = %node, "node destroyed");
        Ok(())
    }

    fn teardown(&mut self, id: NodeId) -> GraphResult<()> {
        if let Some(timer) = self.ctx_mut(id)?.timer.take() {
            self.timers.cancel(timer);
        }
        let changes = {
            let ctx = self.ctx_mut(id)?;
            ctx.store.clear_buffered();
            ctx.store.take_all()
        };
        for change in changes {
            self.store_changed(id, change)?;
        }
        self.deregister(id)?;
        self.leave_shared_config(id)?;
        let ctx = self.ctx_mut(id)?;
        ctx.disturbance = 0;
        ctx.ledger.release();
        if let Some(resolver) = ctx.resolver.take() {
            resolver.resolve(ctx.value.clone());
        }
        self.emit(id, "destroyed", Payload::Node(id), false)?;
        self.ctx_mut(id)?.emitter.clear();
        Ok(())
    }

    /// Node name; children of a list report their position.
    pub fn name(&self, node: NodeId) -> GraphResult<String> {
        let ctx = self.ctx(node)?;
        if let Some(parent) = ctx.parent {
            if self.ctx(parent)?.node_type == NodeType::List {
                return Ok(self.slot_key(parent, node)?.text().into_owned());
            }
        }
        Ok(ctx.name.clone())
    }

    /// Node shape.
    pub fn node_type(&self, node: NodeId) -> GraphResult<NodeType> {
        Ok(self.ctx(node)?.node_type)
    }

    /// Committed value.
    pub fn value(&self, node: NodeId) -> GraphResult<&Value> {
        Ok(&self.ctx(node)?.value)
    }

    /// Latest raw (uncommitted) value.
    pub fn raw_value(&self, node: NodeId) -> GraphResult<&Value> {
        Ok(&self.ctx(node)?.raw)
    }

    /// Snapshot restored by `reset`.
    pub fn initial_value(&self, node: NodeId) -> GraphResult<&Value> {
        Ok(&self.ctx(node)?.initial)
    }

    /// Whether the subtree has no pending commit.
    pub fn is_settled(&self, node: NodeId) -> GraphResult<bool> {
        Ok(self.ctx(node)?.is_settled())
    }

    /// Promise resolving with the value once the subtree settles.
    pub fn settled(&self, node: NodeId) -> GraphResult<Promise<Value>> {
        Ok(self.ctx(node)?.settlement.clone())
    }

    /// Whether construction finished.
    pub fn is_created(&self, node: NodeId) -> GraphResult<bool> {
        Ok(self.ctx(node)?.created)
    }

    /// Hook dispatchers.
    pub fn hooks(&self, node: NodeId) -> GraphResult<&Hooks> {
        Ok(&self.ctx(node)?.hooks)
    }

    /// Hook dispatchers, for registering middleware.
    pub fn hooks_mut(&mut self, node: NodeId) -> GraphResult<&mut Hooks> {
        Ok(&mut self.ctx_mut(node)?.hooks)
    }

    /// Read-only view of the message store.
    pub fn store(&self, node: NodeId) -> GraphResult<&MessageStore> {
        Ok(&self.ctx(node)?.store)
    }

    /// Read-only view of the ledger.
    pub fn ledger(&self, node: NodeId) -> GraphResult<&Ledger> {
        Ok(&self.ctx(node)?.ledger)
    }

    /// Plugins recorded on the node.
    pub fn plugins(&self, node: NodeId) -> GraphResult<&[Plugin]> {
        Ok(&self.ctx(node)?.plugins)
    }

    /// Run `fragment` through the node's `text` hook.
    pub fn text(&self, node: NodeId, fragment: TextFragment) -> GraphResult<TextFragment> {
        Ok(self.ctx(node)?.hooks.text.dispatch(fragment))
    }

    /// Merge class maps for `property` and render the enabled classes.
    pub fn class_list<'a, I>(
        &self,
        node: NodeId,
        property: &str,
        lists: I,
    ) -> GraphResult<Option<String>>
    where
        I: IntoIterator<Item = Option<&'a ClassMap>>,
    {
        let payload = ClassesPayload {
            property: property.to_owned(),
            classes: merge_class_lists(lists),
        };
        let payload = self.ctx(node)?.hooks.classes.dispatch(payload);
        Ok(render_class_list(&payload.classes))
    }
}
