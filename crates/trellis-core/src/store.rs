// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-node keyed message bag.
//!
//! The store itself only records changes; the graph turns each
//! [`StoreChange`] into `message-*` events and ledger updates.
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::message::{Message, MessageType};

/// One mutation applied to a store.
#[derive(Debug, Clone)]
pub enum StoreChange {
    /// A new key was inserted.
    Added(Rc<Message>),
    /// An existing key was replaced.
    Updated {
        /// Message that was replaced.
        previous: Rc<Message>,
        /// Message now stored.
        current: Rc<Message>,
    },
    /// A key was removed.
    Removed(Rc<Message>),
}

/// Errors addressed to a descendant that did not exist yet.
#[derive(Debug, Clone)]
pub(crate) struct PendingErrors {
    pub(crate) source: String,
    pub(crate) messages: Vec<Rc<Message>>,
}

/// Keyed bag of immutable messages.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: BTreeMap<String, Rc<Message>>,
    supplied: BTreeMap<String, Rc<Message>>,
    pending: BTreeMap<String, PendingErrors>,
}

impl MessageStore {
    /// Insert or replace by key. Storing the identical message again is a no-op.
    pub(crate) fn set(&mut self, message: Rc<Message>) -> Option<StoreChange> {
        self.set_localized(Rc::clone(&message), message)
    }

    /// Store `localized` for the caller's `supplied` message.
    ///
    /// Supplying the same message again is a no-op even when localization
    /// produced a fresh copy the first time.
    pub(crate) fn set_localized(
        &mut self,
        supplied: Rc<Message>,
        localized: Rc<Message>,
    ) -> Option<StoreChange> {
        if self.holds(&supplied) {
            return None;
        }
        let key = supplied.key.clone();
        self.supplied.insert(key.clone(), supplied);
        match self.messages.insert(key, Rc::clone(&localized)) {
            Some(previous) => Some(StoreChange::Updated {
                previous,
                current: localized,
            }),
            None => Some(StoreChange::Added(localized)),
        }
    }

    /// Whether `message` is the one stored under its key, either as given
    /// by the caller or as stored after localization.
    pub(crate) fn holds(&self, message: &Rc<Message>) -> bool {
        let same = |slot: &BTreeMap<String, Rc<Message>>| {
            slot.get(&message.key)
                .is_some_and(|m| Rc::ptr_eq(m, message))
        };
        same(&self.messages) || same(&self.supplied)
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<StoreChange> {
        self.supplied.remove(key);
        self.messages.remove(key).map(StoreChange::Removed)
    }

    /// Remove every message (optionally of `kind`) for which `keep` is false.
    pub(crate) fn filter<F>(&mut self, keep: F, kind: Option<&MessageType>) -> Vec<StoreChange>
    where
        F: Fn(&Message) -> bool,
    {
        let doomed: Vec<String> = self
            .messages
            .values()
            .filter(|m| kind.is_none_or(|k| &m.kind == k) && !keep(m))
            .map(|m| m.key.clone())
            .collect();
        doomed.iter().filter_map(|key| self.remove(key)).collect()
    }

    pub(crate) fn take_all(&mut self) -> Vec<StoreChange> {
        self.supplied.clear();
        std::mem::take(&mut self.messages)
            .into_values()
            .map(StoreChange::Removed)
            .collect()
    }

    pub(crate) fn buffer(&mut self, address: String, pending: PendingErrors) {
        self.pending.insert(address, pending);
    }

    pub(crate) fn take_buffered(&mut self, address: &str) -> Option<PendingErrors> {
        self.pending.remove(address)
    }

    pub(crate) fn clear_buffered(&mut self) {
        self.pending.clear();
    }

    pub(crate) fn has_buffered(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Stored message for `key`.
    pub fn get(&self, key: &str) -> Option<&Rc<Message>> {
        self.messages.get(key)
    }

    /// Whether `key` is stored.
    pub fn has(&self, key: &str) -> bool {
        self.messages.contains_key(key)
    }

    /// Fold over every stored message in key order.
    pub fn reduce<A, F>(&self, seed: A, mut f: F) -> A
    where
        F: FnMut(A, &Message) -> A,
    {
        self.messages.values().fold(seed, |acc, m| f(acc, m))
    }

    /// Stored messages in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Message>> {
        self.messages.values()
    }

    /// Stored keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
