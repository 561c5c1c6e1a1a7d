// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Input, debounce, commit and settlement.
//!
//! Each node keeps a disturbance counter. Every increment has exactly one
//! matching decrement: an armed debounce timer holds one, a synchronous
//! commit holds one for its own duration, and add/remove/reorder wrap their
//! value change in a disturb/calm pair. The 0→1 edge disturbs the parent;
//! the 1→0 edge resolves the settlement promise and hands the committed
//! value to the parent as a partial change.
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, instrument, trace};

use super::Graph;
use crate::address::Segment;
use crate::clock::Clock;
use crate::diagnostics::W_RESET_UNKNOWN_ID;
use crate::error::{GraphError, GraphResult};
use crate::event::Payload;
use crate::ident::NodeId;
use crate::message::{Message, MessageType};
use crate::node::{NodeType, PartialChange};
use crate::promise::Promise;

/// A partial change addressed to one slot of an aggregate.
#[derive(Debug, Clone)]
pub(crate) struct SlotChange {
    pub(crate) key: Segment,
    pub(crate) change: PartialChange,
}

impl SlotChange {
    pub(crate) const fn new(key: Segment, change: PartialChange) -> Self {
        Self { key, change }
    }
}

impl Graph {
    /// Feed a raw value to `node`.
    ///
    /// With `should_commit` the commit is debounced by the node's `delay`
    /// prop; otherwise it happens synchronously. Returns the settlement
    /// promise current after the call.
    pub fn input(
        &mut self,
        node: NodeId,
        value: Value,
        should_commit: bool,
    ) -> GraphResult<Promise<Value>> {
        let raw = self.ctx(node)?.hooks.input.dispatch(value);
        self.ctx_mut(node)?.raw = raw.clone();
        self.emit(node, "input", Payload::Value(raw.clone()), true)?;
        self.emit(node, "commitRaw", Payload::Value(raw), true)?;

        let ctx = self.ctx(node)?;
        if ctx.created && ctx.node_type == NodeType::Input && ctx.raw == ctx.value {
            if let Some(timer) = self.ctx_mut(node)?.timer.take() {
                self.timers.cancel(timer);
                self.calm(node, None)?;
            }
            return self.settled(node);
        }

        if should_commit {
            let deadline = self.clock.now() + self.delay(node)?;
            let timer = self.timers.schedule(deadline, node);
            trace!(node = %node, ?deadline, "debounce armed");
            match self.ctx_mut(node)?.timer.replace(timer) {
                Some(previous) => {
                    self.timers.cancel(previous);
                }
                None => self.disturb(node)?,
            }
        } else {
            match self.ctx_mut(node)?.timer.take() {
                Some(previous) => {
                    self.timers.cancel(previous);
                }
                None => self.disturb(node)?,
            }
            self.commit(node, true, true)?;
        }
        self.settled(node)
    }

    /// Debounce delay resolved from the `delay` prop or the settings.
    pub fn delay(&self, node: NodeId) -> GraphResult<Duration> {
        let prop = self.prop(node, "delay")?;
        let ms = prop
            .as_u64()
            .or_else(|| prop.as_str().and_then(|s| s.parse().ok()))
            .unwrap_or_else(|| {
                if self.ctx(node).is_ok_and(|c| c.node_type.is_aggregate()) {
                    self.settings.aggregate_delay_ms
                } else {
                    self.settings.input_delay_ms
                }
            });
        Ok(Duration::from_millis(ms))
    }

    fn commit(&mut self, node: NodeId, calm: bool, hydrate: bool) -> GraphResult<()> {
        let ctx = self.ctx_mut(node)?;
        let value = ctx.hooks.commit.dispatch(ctx.raw.clone());
        ctx.raw = value.clone();
        ctx.value = value;
        if hydrate && ctx.node_type.is_aggregate() {
            self.hydrate(node)?;
        }
        let value = self.ctx(node)?.value.clone();
        debug!(node = %node, value = %value, "commit");
        self.emit(node, "commit", Payload::Value(value), true)?;
        if calm {
            self.calm(node, None)?;
        }
        Ok(())
    }

    /// Reconcile an aggregate's raw value with its children: present keys are
    /// pushed down to settled children, missing keys are pulled up.
    fn hydrate(&mut self, node: NodeId) -> GraphResult<()> {
        let (node_type, children) = {
            let ctx = self.ctx(node)?;
            (ctx.node_type, ctx.children.clone())
        };
        let mut pulled = false;
        for (position, child) in children.into_iter().enumerate() {
            if !self.contains(child) {
                continue;
            }
            let key = match node_type {
                NodeType::List => Segment::Index(position),
                _ => Segment::Name(self.ctx(child)?.name.clone()),
            };
            match slot(&self.ctx(node)?.raw, &key).cloned() {
                Some(value) => {
                    let child_ctx = self.ctx(child)?;
                    if child_ctx.is_settled() && child_ctx.raw != value {
                        self.input(child, value, false)?;
                    }
                }
                None => {
                    let value = self.ctx(child)?.value.clone();
                    let ctx = self.ctx_mut(node)?;
                    apply_partial(&mut ctx.raw, node_type, &key, PartialChange::Set(value));
                    pulled = true;
                }
            }
        }
        if pulled {
            let ctx = self.ctx_mut(node)?;
            ctx.value = ctx.raw.clone();
        }
        Ok(())
    }

    pub(crate) fn disturb(&mut self, node: NodeId) -> GraphResult<()> {
        let ctx = self.ctx_mut(node)?;
        ctx.disturbance += 1;
        if ctx.disturbance > 1 {
            return Ok(());
        }
        let (promise, resolver) = Promise::pending();
        ctx.settlement = promise;
        ctx.resolver = Some(resolver);
        trace!(node = %node, "disturbed");
        self.emit(node, "settled", Payload::Bool(false), false)?;
        if let Some(parent) = self.ctx(node)?.parent {
            self.disturb(parent)?;
        }
        Ok(())
    }

    pub(crate) fn calm(&mut self, node: NodeId, change: Option<SlotChange>) -> GraphResult<()> {
        if let Some(SlotChange { key, change }) = change {
            let ctx = self.ctx_mut(node)?;
            if ctx.node_type.is_aggregate() {
                apply_partial(&mut ctx.raw, ctx.node_type, &key, change);
                return self.commit(node, true, false);
            }
        }
        let ctx = self.ctx_mut(node)?;
        if ctx.disturbance == 0 {
            return Ok(());
        }
        ctx.disturbance -= 1;
        if ctx.disturbance > 0 {
            return Ok(());
        }
        let value = ctx.value.clone();
        if let Some(resolver) = ctx.resolver.take() {
            resolver.resolve(value.clone());
        }
        trace!(node = %node, "settled");
        self.emit(node, "settled", Payload::Bool(true), false)?;
        let Some(parent) = self.ctx(node)?.parent else {
            return Ok(());
        };
        let key = self.slot_key(parent, node)?;
        self.calm(parent, Some(SlotChange::new(key, PartialChange::Set(value))))
    }

    fn flush_timer(&mut self, node: NodeId) -> GraphResult<()> {
        if let Some(timer) = self.ctx_mut(node)?.timer.take() {
            self.timers.cancel(timer);
            self.commit(node, true, true)?;
        }
        Ok(())
    }

    /// Fire every timer due at the current clock reading. Returns how many fired.
    pub fn tick(&mut self) -> GraphResult<usize> {
        let now = self.clock.now();
        let mut fired = 0;
        while let Some((timer, node)) = self.timers.pop_due(now) {
            let Some(ctx) = self.nodes.get_mut(node) else {
                continue;
            };
            if ctx.timer != Some(timer) {
                continue;
            }
            ctx.timer = None;
            trace!(node = %node, "debounce fired");
            self.commit(node, true, true)?;
            fired += 1;
        }
        Ok(fired)
    }

    /// Advance the virtual clock by `by`, firing timers at their own deadlines.
    pub fn advance(&mut self, by: Duration) -> GraphResult<usize> {
        let clock = self
            .virtual_clock
            .clone()
            .ok_or(GraphError::ClockNotVirtual)?;
        let target = clock.now() + by;
        let mut fired = 0;
        while let Some(deadline) = self.timers.next_deadline().filter(|d| *d <= target) {
            clock.advance_to(deadline);
            fired += self.tick()?;
        }
        clock.advance_to(target);
        fired += self.tick()?;
        Ok(fired)
    }

    /// Advance the virtual clock until no timer is pending.
    pub fn run_until_idle(&mut self) -> GraphResult<usize> {
        let clock = self
            .virtual_clock
            .clone()
            .ok_or(GraphError::ClockNotVirtual)?;
        let mut fired = 0;
        while let Some(deadline) = self.timers.next_deadline() {
            clock.advance_to(deadline);
            fired += self.tick()?;
        }
        Ok(fired)
    }

    /// Advance the virtual clock until `node` settles and return its value.
    pub fn run_until_settled(&mut self, node: NodeId) -> GraphResult<Value> {
        let clock = self
            .virtual_clock
            .clone()
            .ok_or(GraphError::ClockNotVirtual)?;
        while !self.is_settled(node)? {
            let Some(deadline) = self.timers.next_deadline() else {
                return Err(GraphError::Usage(format!(
                    "{node} is disturbed with no pending timer"
                )));
            };
            clock.advance_to(deadline);
            self.tick()?;
        }
        Ok(self.ctx(node)?.value.clone())
    }

    /// Earliest pending deadline, for hosts that sleep between ticks.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Number of armed timers.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Restore `node` and its subtree to their initial snapshots.
    ///
    /// A supplied `value` becomes the node's new snapshot. Events raised
    /// while resetting are buffered and replayed once the subtree is
    /// consistent again.
    #[instrument(level = "debug", skip(self, value))]
    pub fn reset(&mut self, node: NodeId, value: Option<Value>) -> GraphResult<()> {
        self.ctx(node)?;
        self.pause(node)?;
        if let Some(value) = value {
            self.ctx_mut(node)?.initial = value;
        }
        let descendants = self.descendants(node)?;
        for &child in &descendants {
            if !self.contains(child) {
                continue;
            }
            self.flush_timer(child)?;
            let initial = self.ctx(child)?.initial.clone();
            self.input(child, initial, false)?;
        }
        self.flush_timer(node)?;
        let initial = self.ctx(node)?.initial.clone();
        self.input(node, initial, false)?;

        self.reset_messages(node)?;
        for child in descendants {
            if self.contains(child) {
                self.reset_messages(child)?;
            }
        }
        self.play(node)?;
        debug!(node = %node, "reset");
        self.emit(node, "reset", Payload::Node(node), true)
    }

    /// Reset the node registered under `id`. Warns and returns `None` if unknown.
    pub fn reset_by_id(&mut self, id: &str, value: Option<Value>) -> GraphResult<Option<NodeId>> {
        let Some(node) = self.get_node(id) else {
            self.warn(W_RESET_UNKNOWN_ID, format!("cannot reset `{id}`: no node is registered"));
            return Ok(None);
        };
        self.reset(node, value)?;
        Ok(Some(node))
    }

    fn reset_messages(&mut self, node: NodeId) -> GraphResult<()> {
        let changes = self.ctx_mut(node)?.store.filter(
            |m| !(m.kind == MessageType::Error || (m.kind == MessageType::Ui && m.key == "incomplete")),
            None,
        );
        for change in changes {
            self.store_changed(node, change)?;
        }
        let states: Vec<Message> = self
            .ctx(node)?
            .store
            .iter()
            .filter(|m| m.kind == MessageType::State && m.value != Value::Bool(false))
            .map(|m| Message {
                value: Value::Bool(false),
                ..(**m).clone()
            })
            .collect();
        for message in states {
            self.set_message(node, message)?;
        }
        Ok(())
    }
}

fn slot<'v>(raw: &'v Value, key: &Segment) -> Option<&'v Value> {
    match (raw, key) {
        (Value::Object(map), key) => map.get(&*key.text()),
        (Value::Array(items), Segment::Index(i)) => items.get(*i),
        _ => None,
    }
}

/// Apply one slot change to an aggregate value, coercing a non-aggregate raw value first.
pub(crate) fn apply_partial(
    raw: &mut Value,
    node_type: NodeType,
    key: &Segment,
    change: PartialChange,
) {
    match node_type {
        NodeType::Input => {}
        NodeType::Group => {
            if !raw.is_object() {
                *raw = Value::Object(Map::new());
            }
            let Some(map) = raw.as_object_mut() else {
                return;
            };
            let name = key.text().into_owned();
            match change {
                PartialChange::Set(v) | PartialChange::Inserted(v) => {
                    map.insert(name, v);
                }
                PartialChange::Removed => {
                    map.remove(&name);
                }
                PartialChange::Moved { .. } => {}
            }
        }
        NodeType::List => {
            if !raw.is_array() {
                *raw = Value::Array(Vec::new());
            }
            let Some(items) = raw.as_array_mut() else {
                return;
            };
            let index = match key {
                Segment::Index(i) => *i,
                Segment::Name(name) => name.parse().unwrap_or(items.len()),
            };
            match change {
                PartialChange::Set(v) => {
                    if index < items.len() {
                        items[index] = v;
                    } else {
                        items.resize(index, Value::Null);
                        items.push(v);
                    }
                }
                PartialChange::Inserted(v) => items.insert(index.min(items.len()), v),
                PartialChange::Removed => {
                    if index < items.len() {
                        items.remove(index);
                    }
                }
                PartialChange::Moved { from } => {
                    if from < items.len() {
                        let v = items.remove(from);
                        items.insert(index.min(items.len()), v);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_partials() {
        let mut raw = json!(["a", "b", "c", "d"]);
        apply_partial(&mut raw, NodeType::List, &Segment::Index(1), PartialChange::Moved { from: 2 });
        assert_eq!(raw, json!(["a", "c", "b", "d"]));
        apply_partial(&mut raw, NodeType::List, &Segment::Index(0), PartialChange::Removed);
        assert_eq!(raw, json!(["c", "b", "d"]));
        apply_partial(&mut raw, NodeType::List, &Segment::Index(9), PartialChange::Inserted(json!("z")));
        assert_eq!(raw, json!(["c", "b", "d", "z"]));
        apply_partial(&mut raw, NodeType::List, &Segment::Index(5), PartialChange::Set(json!(1)));
        assert_eq!(raw, json!(["c", "b", "d", "z", null, 1]));
    }

    #[test]
    fn group_partials_coerce_non_objects() {
        let mut raw = json!("garbage");
        apply_partial(&mut raw, NodeType::Group, &Segment::Name("a".into()), PartialChange::Set(json!(1)));
        assert_eq!(raw, json!({"a": 1}));
        apply_partial(&mut raw, NodeType::Group, &Segment::Name("a".into()), PartialChange::Removed);
        assert_eq!(raw, json!({}));
    }
}
