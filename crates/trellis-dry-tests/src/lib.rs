// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for Trellis crates.
#![forbid(unsafe_code)]
//!
//! This crate keeps the Trellis integration tests short: it builds the
//! usual node shapes, records emitted events and supplies small fixture
//! plugins and an in-memory settings store.
//!
//! # Modules
//!
//! - [`forms`] - Login form, list and group builders
//! - [`logging`] - Once-guarded `tracing-subscriber` bootstrap
//! - [`plugins`] - Fixture plugins (counting, upper-casing, stopping)
//! - [`recorder`] - Event recorder listening on a node
//! - [`settings`] - In-memory settings profiles with a simulated outage switch

pub mod forms;
pub mod logging;
pub mod plugins;
pub mod recorder;
pub mod settings;

// Re-export commonly used items at crate root for convenience
pub use forms::{group_of, list_of, login_form, LoginForm};
pub use logging::init_test_tracing;
pub use plugins::{counting_plugin, stop_plugin, uppercase_commit_plugin, PluginCounter};
pub use recorder::{EventRecorder, Recorded};
pub use settings::InMemorySettingsStore;
