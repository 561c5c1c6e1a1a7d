// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Id → node index for nodes that carry an explicit `id` prop.
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::graph::Graph;
use crate::ident::{NodeId, Receipt};

/// Called with `Some(node)` when `id` is registered and `None` when it is released.
pub type RegistryListener = Rc<dyn Fn(&mut Graph, &str, Option<NodeId>)>;

#[derive(Default)]
pub(crate) struct Registry {
    nodes: BTreeMap<String, NodeId>,
    watchers: BTreeMap<String, Vec<(Receipt, RegistryListener)>>,
}

impl Registry {
    pub(crate) fn insert(&mut self, id: &str, node: NodeId) -> Option<NodeId> {
        self.nodes.insert(id.to_owned(), node)
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<NodeId> {
        self.nodes.remove(id)
    }

    pub(crate) fn get(&self, id: &str) -> Option<NodeId> {
        self.nodes.get(id).copied()
    }

    /// Id under which `node` is registered.
    pub(crate) fn key_of(&self, node: NodeId) -> Option<String> {
        self.nodes
            .iter()
            .find(|(_, n)| **n == node)
            .map(|(id, _)| id.clone())
    }

    pub(crate) fn watch(&mut self, id: &str, receipt: Receipt, listener: RegistryListener) {
        self.watchers
            .entry(id.to_owned())
            .or_default()
            .push((receipt, listener));
    }

    pub(crate) fn unwatch(&mut self, receipt: &Receipt) -> bool {
        let mut removed = false;
        self.watchers.retain(|_, list| {
            let before = list.len();
            list.retain(|(r, _)| r != receipt);
            removed |= before != list.len();
            !list.is_empty()
        });
        removed
    }

    pub(crate) fn watchers(&self, id: &str) -> Vec<RegistryListener> {
        self.watchers
            .get(id)
            .map(|list| list.iter().map(|(_, l)| Rc::clone(l)).collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("nodes", &self.nodes)
            .field("watched", &self.watchers.len())
            .finish()
    }
}
