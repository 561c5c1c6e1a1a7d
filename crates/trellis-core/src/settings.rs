// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph-wide settings and the storage port they are loaded through.
//!
//! Settings live in named profiles. A missing profile means "use the
//! defaults"; a present one is parsed as JSON and validated before any
//! graph is built from it.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::Graph;

/// Upper bound accepted for either debounce delay.
pub const MAX_DELAY_MS: u64 = 60_000;

/// Built-in fallbacks for the config cascade and debounce delays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// Debounce delay for inputs, in milliseconds.
    pub input_delay_ms: u64,
    /// Debounce delay for groups and lists, in milliseconds.
    pub aggregate_delay_ms: u64,
    /// Path delimiter used by `at` and error addresses.
    pub delimiter: String,
    /// Locale recorded on localized messages.
    pub locale: String,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            input_delay_ms: 20,
            aggregate_delay_ms: 0,
            delimiter: ".".to_owned(),
            locale: "en".to_owned(),
        }
    }
}

impl GraphSettings {
    /// Reject settings a graph cannot run with.
    ///
    /// The delimiter must be non-empty and must not start with `$`, which
    /// would collide with the `$root`/`$parent`/`$self` address tokens.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.delimiter.is_empty() || self.delimiter.starts_with('$') {
            return Err(SettingsError::Delimiter(self.delimiter.clone()));
        }
        if self.locale.trim().is_empty() {
            return Err(SettingsError::EmptyLocale);
        }
        for (field, ms) in [
            ("input_delay_ms", self.input_delay_ms),
            ("aggregate_delay_ms", self.aggregate_delay_ms),
        ] {
            if ms > MAX_DELAY_MS {
                return Err(SettingsError::DelayOutOfRange { field, ms });
            }
        }
        Ok(())
    }
}

/// Backing storage for settings profiles.
pub trait SettingsStore {
    /// Raw bytes of `profile`, or `None` when it was never written.
    fn read(&self, profile: &str) -> Result<Option<Vec<u8>>, SettingsError>;
    /// Replace the bytes of `profile`.
    fn write(&self, profile: &str, bytes: &[u8]) -> Result<(), SettingsError>;
}

/// Why a settings profile could not be loaded or saved.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The profile is not valid settings JSON.
    #[error("malformed settings: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Empty delimiter, or one that starts with `$`.
    #[error("unusable path delimiter {0:?}")]
    Delimiter(String),
    /// Blank locale.
    #[error("locale must not be empty")]
    EmptyLocale,
    /// A debounce delay above [`MAX_DELAY_MS`].
    #[error("{field} = {ms}ms exceeds {max}ms", max = MAX_DELAY_MS)]
    DelayOutOfRange {
        /// Offending field.
        field: &'static str,
        /// Value found.
        ms: u64,
    },
    /// The backing store failed.
    #[error("settings store: {0}")]
    Store(String),
}

/// Loads validated [`GraphSettings`] profiles from a [`SettingsStore`].
#[derive(Debug)]
pub struct SettingsService<S> {
    store: S,
}

impl<S: SettingsStore> SettingsService<S> {
    /// Service over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Settings of `profile`; defaults when the profile is missing or blank.
    pub fn load(&self, profile: &str) -> Result<GraphSettings, SettingsError> {
        let settings = match self.store.read(profile)? {
            Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => {
                serde_json::from_slice::<GraphSettings>(&bytes)?
            }
            _ => GraphSettings::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Validate and persist `settings` as `profile`.
    pub fn save(&self, profile: &str, settings: &GraphSettings) -> Result<(), SettingsError> {
        settings.validate()?;
        self.store.write(profile, &serde_json::to_vec(settings)?)
    }

    /// A graph configured from `profile`.
    pub fn graph(&self, profile: &str) -> Result<Graph, SettingsError> {
        Ok(Graph::with_settings(self.load(profile)?))
    }
}
