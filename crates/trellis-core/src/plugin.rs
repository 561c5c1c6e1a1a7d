// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Plugins: functions applied once to each node in a subtree.
use std::fmt;
use std::rc::Rc;

use crate::error::GraphResult;
use crate::graph::Graph;
use crate::ident::NodeId;

/// What a plugin asks the runner to do after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginOutcome {
    /// Record the plugin on the node and propagate it to descendants.
    Continue,
    /// Do not record or propagate.
    Stop,
}

type PluginFn = dyn Fn(&mut Graph, NodeId) -> GraphResult<PluginOutcome>;

struct PluginInner {
    name: String,
    run: Box<PluginFn>,
}

/// A named node extension. Two plugins are the same plugin only if they
/// share the allocation, so cloning a plugin keeps its identity.
#[derive(Clone)]
pub struct Plugin {
    inner: Rc<PluginInner>,
}

impl Plugin {
    /// Wrap a plugin function.
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&mut Graph, NodeId) -> GraphResult<PluginOutcome> + 'static,
    {
        Self {
            inner: Rc::new(PluginInner {
                name: name.into(),
                run: Box::new(run),
            }),
        }
    }

    /// Diagnostic name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn run(&self, graph: &mut Graph, node: NodeId) -> GraphResult<PluginOutcome> {
        (self.inner.run)(graph, node)
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Plugin").field(&self.inner.name).finish()
    }
}
