// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! trellis-core: reactive node-graph runtime.
//!
//! A [`Graph`] owns a forest of typed nodes (inputs, groups, lists). Values
//! flow up from inputs through debounced commits into their aggregate
//! ancestors; events bubble the same way; configuration cascades down.
//! Every pending commit keeps its subtree *disturbed* until it fires, and
//! [`Graph::settled`] hands out a [`Promise`] that resolves once the
//! subtree is quiet again.
//!
//! Timers run on a [`Clock`]. The default [`VirtualClock`] is advanced
//! explicitly (`advance`, `run_until_idle`, `run_until_settled`), which keeps
//! timing behaviour reproducible in tests; hosts with a real clock call
//! [`Graph::tick`] when [`Graph::next_deadline`] comes due.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod address;
mod arena;
mod classes;
mod clock;
mod config;
mod diagnostics;
mod dispatcher;
mod error;
mod event;
mod graph;
mod hooks;
mod ident;
mod ledger;
mod message;
mod node;
mod plugin;
mod promise;
mod props;
mod registry;
mod settings;
mod store;
mod traps;

/// Node addressing.
pub use address::{Address, Segment};
/// Class-list composition helpers.
pub use classes::{merge_class_lists, render_class_list};
/// Timer sources.
pub use clock::{Clock, SystemClock, TimerId, VirtualClock};
/// Developer-facing warnings.
pub use diagnostics::{
    Warning, WarningHandler, W_INDEX_WITHOUT_PARENT, W_NOT_CALLABLE, W_RESET_UNKNOWN_ID,
};
/// Hook middleware chains.
pub use dispatcher::{Dispatcher, Middleware, Next};
/// Error channel.
pub use error::{GraphError, GraphResult};
/// Events and listeners.
pub use event::{Event, ListenOptions, Listener, Payload, Placement};
/// The graph itself.
pub use graph::Graph;
/// Hook payloads.
pub use hooks::{ClassMap, ClassesPayload, ErrorsPayload, Hooks, PropChange, TextFragment};
/// Handles.
pub use ident::{ConfigId, NodeId, Receipt};
/// Subtree message counters.
pub use ledger::{Condition, Ledger};
/// Store messages.
pub use message::{slugify, Message, MessageType, Meta};
/// Node construction.
pub use node::{NodeOptions, NodeType, PartialChange};
/// Plugins.
pub use plugin::{Plugin, PluginOutcome};
/// Settlement promises.
pub use promise::{Promise, Resolver};
/// Prop declarations.
pub use props::{coerce_bool, PropDef, PropTransform};
/// Registry watchers.
pub use registry::RegistryListener;
/// Graph settings and their storage port.
pub use settings::{GraphSettings, SettingsError, SettingsService, SettingsStore, MAX_DELAY_MS};
/// Message store.
pub use store::{MessageStore, StoreChange};
/// Runtime-resolved node operations.
pub use traps::{
    BoundTrap, Trap, TrapArg, TrapFn, TrapGetter, TrapRegistry, TrapSetFn, TrapValue, Visitor,
};
