// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error type shared by every graph operation.
use thiserror::Error;

use crate::ident::{ConfigId, NodeId};

/// Configuration and usage failures raised synchronously at the call site.
///
/// Soft failures (validation, incomplete state) are never errors; they are
/// recorded as store messages instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The handle does not refer to a live node.
    #[error("{0} does not exist (destroyed or never created)")]
    UnknownNode(NodeId),
    /// Only groups and lists may hold children.
    #[error("only groups and lists can have children ({name})")]
    LeafWithChildren {
        /// Name of the offending input node.
        name: String,
    },
    /// The message store can only change through set/remove/filter.
    #[error("the message store cannot be mutated directly ({name})")]
    StoreMutation {
        /// Name of the node whose store was targeted.
        name: String,
    },
    /// Assignment through a property with no setter trap.
    #[error("cannot directly assign {property} on {name}")]
    ProtectedAssignment {
        /// Property key.
        property: String,
        /// Node name.
        name: String,
    },
    /// Insertion would make a node its own ancestor.
    #[error("{name} cannot be added beneath its own descendant")]
    Cycle {
        /// Name of the node being inserted.
        name: String,
    },
    /// A trap received an argument of the wrong shape.
    #[error("trap `{trap}` expected {expected}")]
    TrapArgument {
        /// Trap key.
        trap: String,
        /// Description of the expected argument.
        expected: &'static str,
    },
    /// The shared config handle is not known to this graph.
    #[error("{0} is not registered with this graph")]
    UnknownConfig(ConfigId),
    /// Manual clock driving was requested on a graph using a real clock.
    #[error("the graph clock is not virtual")]
    ClockNotVirtual,
    /// Any other misuse of the API.
    #[error("usage error: {0}")]
    Usage(String),
}

impl GraphError {
    /// Stable numeric code for the error kind.
    pub const fn code(&self) -> u16 {
        match self {
            Self::LeafWithChildren { .. } => 100,
            Self::StoreMutation { .. } => 101,
            Self::ProtectedAssignment { .. } => 102,
            Self::Cycle { .. } => 103,
            Self::TrapArgument { .. } => 104,
            Self::UnknownConfig(_) => 105,
            Self::ClockNotVirtual => 106,
            Self::Usage(_) => 107,
            Self::UnknownNode(_) => 108,
        }
    }
}

/// Result alias used across the crate.
pub type GraphResult<T> = Result<T, GraphError>;
