// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Parent/child structure, addressing and traversal.
use std::collections::VecDeque;

use tracing::{debug, trace};

use super::commit::SlotChange;
use super::Graph;
use crate::address::{Address, Segment};
use crate::diagnostics::W_INDEX_WITHOUT_PARENT;
use crate::error::{GraphError, GraphResult};
use crate::event::Payload;
use crate::ident::NodeId;
use crate::node::{NodeType, PartialChange};
use crate::props::coerce_bool;

/// Traversal control returned by internal visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Visit {
    Continue,
    SkipSubtree,
    Stop,
}

impl Graph {
    /// Insert `child` beneath `parent` at `index` (appended when `None`).
    ///
    /// A child with a different parent is detached there first. Adding a
    /// child that is already present only repairs its parent link.
    pub fn add(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) -> GraphResult<()> {
        let parent_ctx = self.ctx(parent)?;
        if parent_ctx.node_type == NodeType::Input {
            return Err(GraphError::LeafWithChildren {
                name: parent_ctx.name.clone(),
            });
        }
        self.ctx(child)?;
        if parent == child || self.is_ancestor(child, parent)? {
            return Err(GraphError::Cycle {
                name: self.ctx(child)?.name.clone(),
            });
        }
        if self.ctx(parent)?.children.contains(&child) {
            self.ctx_mut(child)?.parent = Some(parent);
            return Ok(());
        }
        if let Some(previous) = self.ctx(child)?.parent {
            self.remove(previous, child)?;
        }
        if !self.ctx(child)?.is_settled() {
            self.disturb(parent)?;
        }

        let (node_type, existing) = {
            let ctx = self.ctx(parent)?;
            (ctx.node_type, ctx.children.len())
        };
        let position = index.map_or(existing, |i| i.min(existing));
        self.ctx_mut(parent)?.children.insert(position, child);
        self.ctx_mut(child)?.parent = Some(parent);
        self.inherit_shared_config(child)?;
        trace!(parent = %parent, child = %child, position, "child inserted");

        match node_type {
            NodeType::List => {
                let hydrating = position == existing
                    && self
                        .ctx(parent)?
                        .raw
                        .as_array()
                        .is_some_and(|items| items.len() > existing);
                if hydrating {
                    let incoming = self.ctx(parent)?.raw.get(position).cloned();
                    self.push_down(child, incoming)?;
                } else {
                    let value = self.ctx(child)?.value.clone();
                    self.disturb(parent)?;
                    self.calm(
                        parent,
                        Some(SlotChange::new(
                            Segment::Index(position),
                            PartialChange::Inserted(value),
                        )),
                    )?;
                }
            }
            NodeType::Group => {
                let name = self.ctx(child)?.name.clone();
                let incoming = self.ctx(parent)?.raw.get(&name).cloned();
                if incoming.is_some() {
                    self.push_down(child, incoming)?;
                } else {
                    let value = self.ctx(child)?.value.clone();
                    self.disturb(parent)?;
                    self.calm(
                        parent,
                        Some(SlotChange::new(Segment::Name(name), PartialChange::Set(value))),
                    )?;
                }
            }
            NodeType::Input => {}
        }

        let plugins = self.ctx(parent)?.plugins.clone();
        for plugin in &plugins {
            self.use_plugin(child, plugin)?;
        }
        self.merge_ledger(parent, child, 1)?;
        self.release_buffered_errors(child)?;
        self.emit(parent, "child", Payload::Node(child), true)
    }

    fn push_down(&mut self, child: NodeId, incoming: Option<serde_json::Value>) -> GraphResult<()> {
        let Some(value) = incoming else {
            return Ok(());
        };
        let ctx = self.ctx(child)?;
        if ctx.is_settled() && ctx.raw != value {
            self.input(child, value, false)?;
        }
        Ok(())
    }

    /// Detach `child` from `parent`. No-op when `child` is not present.
    ///
    /// The child's key leaves the parent value unless the `preserve` prop
    /// is set on the child or any ancestor.
    pub fn remove(&mut self, parent: NodeId, child: NodeId) -> GraphResult<()> {
        let Some(position) = self.ctx(parent)?.children.iter().position(|c| *c == child) else {
            return Ok(());
        };
        let key = self.slot_key(parent, child)?;
        let mut preserve = false;
        let mut cursor = Some(child);
        while let Some(node) = cursor {
            if coerce_bool(&self.prop(node, "preserve")?) {
                preserve = true;
                break;
            }
            cursor = self.ctx(node)?.parent;
        }

        self.merge_ledger(parent, child, -1)?;
        if self.ctx(child)?.is_settled() {
            self.disturb(parent)?;
        }
        self.ctx_mut(parent)?.children.remove(position);
        self.ctx_mut(child)?.parent = None;
        self.inherit_shared_config(child)?;
        trace!(parent = %parent, child = %child, preserve, "child detached");

        let change = (!preserve).then(|| SlotChange::new(key, PartialChange::Removed));
        self.calm(parent, change)?;
        self.emit(parent, "childRemoved", Payload::Node(child), true)
    }

    /// Move `child` beneath `parent`, or detach it when `parent` is `None`.
    pub fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) -> GraphResult<()> {
        match parent {
            Some(parent) => self.add(parent, child, None),
            None => match self.ctx(child)?.parent {
                Some(previous) => self.remove(previous, child),
                None => Ok(()),
            },
        }
    }

    /// Current parent.
    pub fn parent(&self, node: NodeId) -> GraphResult<Option<NodeId>> {
        Ok(self.ctx(node)?.parent)
    }

    /// Ordered children.
    pub fn children(&self, node: NodeId) -> GraphResult<&[NodeId]> {
        Ok(&self.ctx(node)?.children)
    }

    /// Position within the parent's children; `None` without a parent.
    pub fn index(&self, node: NodeId) -> GraphResult<Option<usize>> {
        let Some(parent) = self.ctx(node)?.parent else {
            return Ok(None);
        };
        Ok(self.ctx(parent)?.children.iter().position(|c| *c == node))
    }

    /// Move `node` to `index` among its siblings, clamped to the valid range.
    ///
    /// Returns `false` (with a warning) when the node has no parent.
    pub fn set_index(&mut self, node: NodeId, index: i64) -> GraphResult<bool> {
        let (Some(parent), Some(from)) = (self.ctx(node)?.parent, self.index(node)?) else {
            self.warn(
                W_INDEX_WITHOUT_PARENT,
                format!("cannot set the index of {node}: it has no parent"),
            );
            return Ok(false);
        };
        let last = self.ctx(parent)?.children.len().saturating_sub(1);
        let target = usize::try_from(index.max(0)).unwrap_or(last).min(last);
        if target == from {
            return Ok(true);
        }
        let children = &mut self.ctx_mut(parent)?.children;
        children.remove(from);
        children.insert(target, node);
        debug!(node = %node, from, to = target, "reordered");

        self.disturb(parent)?;
        let change = match self.ctx(parent)?.node_type {
            NodeType::List => Some(SlotChange::new(
                Segment::Index(target),
                PartialChange::Moved { from },
            )),
            _ => None,
        };
        self.calm(parent, change)?;
        Ok(true)
    }

    /// Key `child` occupies in `parent`'s value.
    pub(crate) fn slot_key(&self, parent: NodeId, child: NodeId) -> GraphResult<Segment> {
        let ctx = self.ctx(parent)?;
        match ctx.node_type {
            NodeType::List => ctx
                .children
                .iter()
                .position(|c| *c == child)
                .map(Segment::Index)
                .ok_or_else(|| {
                    GraphError::Usage(format!("{child} is not a child of {parent}"))
                }),
            _ => Ok(Segment::Name(self.ctx(child)?.name.clone())),
        }
    }

    /// Path from the root to `node`.
    pub fn address(&self, node: NodeId) -> GraphResult<Address> {
        let mut segments = Vec::new();
        let mut cursor = node;
        while let Some(parent) = self.ctx(cursor)?.parent {
            segments.push(self.slot_key(parent, cursor)?);
            cursor = parent;
        }
        segments.push(Segment::Name(self.ctx(cursor)?.name.clone()));
        segments.reverse();
        Ok(Address::new(segments))
    }

    /// Resolve a delimiter-separated path relative to `node`.
    ///
    /// Lookup starts at the parent (so siblings are addressable by name);
    /// a root skips its own leading name. `$root`, `$parent` and `$self`
    /// jump within the tree.
    pub fn at(&self, node: NodeId, path: &str) -> GraphResult<Option<NodeId>> {
        let delimiter = self.delimiter(node)?;
        self.at_address(node, &Address::parse(path, &delimiter))
    }

    /// [`Graph::at`] over an already split address.
    pub fn at_address(&self, node: NodeId, address: &Address) -> GraphResult<Option<NodeId>> {
        let mut segments = address.segments();
        let Some(first) = segments.first() else {
            return Ok(None);
        };
        let mut pointer = match self.ctx(node)?.parent {
            Some(parent) => Some(parent),
            None => {
                if first.text() == self.name(node)? {
                    segments = &segments[1..];
                }
                Some(node)
            }
        };
        if first.text() == "$parent" && !segments.is_empty() {
            segments = &segments[1..];
        }
        for segment in segments {
            let Some(current) = pointer else {
                break;
            };
            pointer = match &*segment.text() {
                "$root" => Some(self.root(node)?),
                "$parent" => self.ctx(current)?.parent,
                "$self" => Some(node),
                _ => self.child_named(current, segment)?,
            };
        }
        Ok(pointer)
    }

    pub(crate) fn child_named(&self, parent: NodeId, segment: &Segment) -> GraphResult<Option<NodeId>> {
        let text = segment.text();
        for &child in &self.ctx(parent)?.children {
            if self.name(child)? == text {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    /// Walk `address` downward from `node`, without the special segments.
    pub(crate) fn descendant_at(&self, node: NodeId, address: &Address) -> GraphResult<Option<NodeId>> {
        let mut pointer = node;
        for segment in address.segments() {
            match self.child_named(pointer, segment)? {
                Some(next) => pointer = next,
                None => return Ok(None),
            }
        }
        Ok(Some(pointer))
    }

    /// Breadth-first search of the subtree (including `node`) for `name`.
    pub fn find(&self, node: NodeId, name: &str) -> GraphResult<Option<NodeId>> {
        self.find_by(node, |graph, candidate| {
            graph.name(candidate).is_ok_and(|n| n == name)
        })
    }

    /// Breadth-first search of the subtree (including `node`) with a predicate.
    pub fn find_by<F>(&self, node: NodeId, mut predicate: F) -> GraphResult<Option<NodeId>>
    where
        F: FnMut(&Self, NodeId) -> bool,
    {
        let mut queue = VecDeque::from([node]);
        while let Some(candidate) = queue.pop_front() {
            if predicate(self, candidate) {
                return Ok(Some(candidate));
            }
            queue.extend(self.ctx(candidate)?.children.iter().copied());
        }
        Ok(None)
    }

    /// Topmost ancestor.
    pub fn root(&self, node: NodeId) -> GraphResult<NodeId> {
        let mut cursor = node;
        while let Some(parent) = self.ctx(cursor)?.parent {
            cursor = parent;
        }
        Ok(cursor)
    }

    /// Ancestors, nearest first.
    pub fn ancestors(&self, node: NodeId) -> GraphResult<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut cursor = self.ctx(node)?.parent;
        while let Some(parent) = cursor {
            out.push(parent);
            cursor = self.ctx(parent)?.parent;
        }
        Ok(out)
    }

    /// Whether `ancestor` lies strictly above `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> GraphResult<bool> {
        Ok(self.ancestors(node)?.contains(&ancestor))
    }

    /// Every descendant in pre-order, excluding `node`.
    pub fn descendants(&self, node: NodeId) -> GraphResult<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.ctx(node)?.children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.ctx(next)?.children.iter().rev().copied());
        }
        Ok(out)
    }

    /// Call `f` on each immediate child.
    pub fn each<F>(&mut self, node: NodeId, mut f: F) -> GraphResult<()>
    where
        F: FnMut(&mut Self, NodeId),
    {
        let children = self.ctx(node)?.children.clone();
        for child in children {
            f(self, child);
        }
        Ok(())
    }

    /// Pre-order walk of every descendant.
    ///
    /// With `stop_if_false`, a `false` from `f` ends the whole traversal.
    pub fn walk<F>(&mut self, node: NodeId, stop_if_false: bool, mut f: F) -> GraphResult<()>
    where
        F: FnMut(&mut Self, NodeId) -> bool,
    {
        let children = self.ctx(node)?.children.clone();
        let mut visitor = |graph: &mut Self, n: NodeId| -> GraphResult<Visit> {
            Ok(if f(graph, n) || !stop_if_false {
                Visit::Continue
            } else {
                Visit::Stop
            })
        };
        for child in children {
            if !self.visit(child, &mut visitor)? {
                break;
            }
        }
        Ok(())
    }

    /// Pre-order visit of `node` and its subtree. Returns `false` once stopped.
    pub(crate) fn visit<F>(&mut self, node: NodeId, f: &mut F) -> GraphResult<bool>
    where
        F: FnMut(&mut Self, NodeId) -> GraphResult<Visit>,
    {
        if !self.contains(node) {
            return Ok(true);
        }
        match f(self, node)? {
            Visit::Stop => return Ok(false),
            Visit::SkipSubtree => return Ok(true),
            Visit::Continue => {}
        }
        let children = match self.nodes.get(node) {
            Some(ctx) => ctx.children.clone(),
            None => return Ok(true),
        };
        for child in children {
            if !self.visit(child, f)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
