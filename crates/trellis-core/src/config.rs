// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared configuration objects.
//!
//! A shared config is owned by the graph and referenced by [`ConfigId`]
//! from every node in the subtree that uses it. Writes go through
//! `Graph::set_shared_config` so member nodes can be notified.
use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::ident::NodeId;

#[derive(Debug, Default)]
pub(crate) struct SharedConfig {
    pub(crate) values: Map<String, Value>,
    pub(crate) members: BTreeSet<NodeId>,
}

impl SharedConfig {
    pub(crate) fn new(values: Map<String, Value>) -> Self {
        Self {
            values,
            members: BTreeSet::new(),
        }
    }
}
