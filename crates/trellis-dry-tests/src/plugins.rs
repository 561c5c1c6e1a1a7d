// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fixture plugins.
use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use trellis_core::{NodeId, Plugin, PluginOutcome};

/// Nodes a [`counting_plugin`] ran on, in order.
#[derive(Debug, Clone, Default)]
pub struct PluginCounter(Rc<RefCell<Vec<NodeId>>>);

impl PluginCounter {
    /// Number of runs.
    pub fn runs(&self) -> usize {
        self.0.borrow().len()
    }

    /// Times the plugin ran on `node`.
    pub fn runs_on(&self, node: NodeId) -> usize {
        self.0.borrow().iter().filter(|n| **n == node).count()
    }

    /// Every node in run order.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.0.borrow().clone()
    }
}

/// Plugin that only records which nodes it ran on.
pub fn counting_plugin(name: &str) -> (Plugin, PluginCounter) {
    let counter = PluginCounter::default();
    let seen = Rc::clone(&counter.0);
    let plugin = Plugin::new(name, move |_graph, node| {
        seen.borrow_mut().push(node);
        Ok(PluginOutcome::Continue)
    });
    (plugin, counter)
}

/// Plugin that upper-cases string values on the commit hook.
pub fn uppercase_commit_plugin() -> Plugin {
    Plugin::new("uppercase", |graph, node| {
        graph.hooks_mut(node)?.commit.use_fn(|value, next| {
            let value = match value {
                Value::String(s) => Value::String(s.to_uppercase()),
                other => other,
            };
            next.call(value)
        });
        Ok(PluginOutcome::Continue)
    })
}

/// Plugin that records the node and then declines to propagate.
pub fn stop_plugin() -> (Plugin, PluginCounter) {
    let counter = PluginCounter::default();
    let seen = Rc::clone(&counter.0);
    let plugin = Plugin::new("stop", move |_graph, node| {
        seen.borrow_mut().push(node);
        Ok(PluginOutcome::Stop)
    });
    (plugin, counter)
}
