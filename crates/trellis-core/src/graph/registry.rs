// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph-scoped id registry.
use std::rc::Rc;

use tracing::debug;

use super::Graph;
use crate::error::GraphResult;
use crate::ident::{NodeId, Receipt};

impl Graph {
    /// Index `node` under `id`, notifying watchers of that id.
    pub fn register(&mut self, node: NodeId, id: &str) -> GraphResult<()> {
        self.ctx(node)?;
        if self.registry.insert(id, node) == Some(node) {
            return Ok(());
        }
        debug!(node = %node, id, "registered");
        self.notify_registry(id, Some(node));
        Ok(())
    }

    /// Drop `node` from the registry. Returns whether it was indexed.
    pub fn deregister(&mut self, node: NodeId) -> GraphResult<bool> {
        let Some(id) = self.registry.key_of(node) else {
            return Ok(false);
        };
        self.registry.remove(&id);
        debug!(node = %node, id = %id, "deregistered");
        self.notify_registry(&id, None);
        Ok(true)
    }

    fn notify_registry(&mut self, id: &str, node: Option<NodeId>) {
        for watcher in self.registry.watchers(id) {
            watcher(self, id, node);
        }
    }

    /// Node registered under `id`.
    pub fn get_node(&self, id: &str) -> Option<NodeId> {
        self.registry.get(id)
    }

    /// Watch registrations of `id`.
    pub fn watch_registry<F>(&mut self, id: &str, listener: F) -> Receipt
    where
        F: Fn(&mut Self, &str, Option<NodeId>) + 'static,
    {
        let receipt = self.next_receipt();
        self.registry.watch(id, receipt.clone(), Rc::new(listener));
        receipt
    }

    /// Stop a registry watch.
    pub fn unwatch_registry(&mut self, receipt: &Receipt) -> bool {
        self.registry.unwatch(receipt)
    }
}
