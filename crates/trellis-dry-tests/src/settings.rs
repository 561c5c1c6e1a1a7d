// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Settings profiles held in memory.
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use trellis_core::{GraphSettings, SettingsError, SettingsStore};

/// [`SettingsStore`] over an in-memory profile map.
///
/// Clones share the map, so a test can give one clone to a
/// [`SettingsService`](trellis_core::SettingsService) and inspect the other.
/// [`offline`](Self::offline) makes every read and write fail.
///
/// ```
/// use trellis_core::{GraphSettings, SettingsService};
/// use trellis_dry_tests::InMemorySettingsStore;
///
/// let store = InMemorySettingsStore::new();
/// let service = SettingsService::new(store.clone());
/// let settings = GraphSettings { locale: "fr".into(), ..GraphSettings::default() };
/// service.save("forms", &settings).unwrap();
/// assert_eq!(store.profile("forms"), Some(settings));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemorySettingsStore {
    state: Rc<RefCell<State>>,
}

#[derive(Debug, Default)]
struct State {
    profiles: BTreeMap<String, Vec<u8>>,
    offline: bool,
    reads: usize,
    writes: usize,
}

impl InMemorySettingsStore {
    /// No profiles.
    pub fn new() -> Self {
        Self::default()
    }

    /// One profile holding `settings`.
    pub fn with_profile(profile: &str, settings: &GraphSettings) -> Self {
        let bytes = serde_json::to_vec(settings).unwrap_or_default();
        Self::with_bytes(profile, bytes)
    }

    /// One profile holding arbitrary bytes, valid or not.
    pub fn with_bytes(profile: &str, bytes: impl Into<Vec<u8>>) -> Self {
        let store = Self::new();
        store
            .state
            .borrow_mut()
            .profiles
            .insert(profile.to_owned(), bytes.into());
        store
    }

    /// Toggle a simulated backend outage.
    pub fn offline(&self, offline: bool) {
        self.state.borrow_mut().offline = offline;
    }

    /// Decoded contents of `profile`, skipping validation.
    pub fn profile(&self, profile: &str) -> Option<GraphSettings> {
        let state = self.state.borrow();
        serde_json::from_slice(state.profiles.get(profile)?).ok()
    }

    /// Reads attempted so far.
    pub fn reads(&self) -> usize {
        self.state.borrow().reads
    }

    /// Writes attempted so far.
    pub fn writes(&self) -> usize {
        self.state.borrow().writes
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn read(&self, profile: &str) -> Result<Option<Vec<u8>>, SettingsError> {
        let mut state = self.state.borrow_mut();
        state.reads += 1;
        if state.offline {
            return Err(SettingsError::Store(format!("offline reading {profile}")));
        }
        Ok(state.profiles.get(profile).cloned())
    }

    fn write(&self, profile: &str, bytes: &[u8]) -> Result<(), SettingsError> {
        let mut state = self.state.borrow_mut();
        state.writes += 1;
        if state.offline {
            return Err(SettingsError::Store(format!("offline writing {profile}")));
        }
        state.profiles.insert(profile.to_owned(), bytes.to_vec());
        Ok(())
    }
}
