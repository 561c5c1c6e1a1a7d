// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Plugin application and inheritance.
use tracing::trace;

use super::Graph;
use crate::error::GraphResult;
use crate::ident::NodeId;
use crate::plugin::{Plugin, PluginOutcome};

impl Graph {
    /// Apply `plugin` to `node` and then to each of its children.
    ///
    /// A node never runs the same plugin twice. A plugin returning
    /// [`PluginOutcome::Stop`] is neither recorded nor propagated.
    pub fn use_plugin(&mut self, node: NodeId, plugin: &Plugin) -> GraphResult<()> {
        if self.ctx(node)?.plugins.iter().any(|p| p.ptr_eq(plugin)) {
            return Ok(());
        }
        if plugin.run(self, node)? == PluginOutcome::Stop {
            trace!(node = %node, plugin = plugin.name(), "plugin stopped");
            return Ok(());
        }
        let ctx = self.ctx_mut(node)?;
        if ctx.plugins.iter().any(|p| p.ptr_eq(plugin)) {
            return Ok(());
        }
        ctx.plugins.push(plugin.clone());
        trace!(node = %node, plugin = plugin.name(), "plugin applied");
        for child in self.ctx(node)?.children.clone() {
            self.use_plugin(child, plugin)?;
        }
        Ok(())
    }

    /// Apply several plugins in order.
    pub fn use_plugins(&mut self, node: NodeId, plugins: &[Plugin]) -> GraphResult<()> {
        for plugin in plugins {
            self.use_plugin(node, plugin)?;
        }
        Ok(())
    }
}
