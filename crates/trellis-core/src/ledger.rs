// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Named counters over subtree messages.
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::message::{Message, MessageType};
use crate::promise::{Promise, Resolver};
use crate::store::StoreChange;

/// Predicate deciding which messages a counter tracks.
#[derive(Clone)]
pub struct Condition(Rc<dyn Fn(&Message) -> bool>);

impl Condition {
    /// Wrap a predicate.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Message) -> bool + 'static,
    {
        Self(Rc::new(f))
    }

    /// Match messages of one type.
    pub fn of_type(kind: impl Into<MessageType>) -> Self {
        let kind = kind.into();
        Self::new(move |m| m.kind == kind)
    }

    /// Evaluate the predicate.
    pub fn matches(&self, message: &Message) -> bool {
        (self.0)(message)
    }

    /// Signed contribution of a store change to a counter.
    pub(crate) fn delta(&self, change: &StoreChange) -> i64 {
        match change {
            StoreChange::Added(m) => i64::from(self.matches(m)),
            StoreChange::Removed(m) => -i64::from(self.matches(m)),
            StoreChange::Updated { previous, current } => {
                i64::from(self.matches(current)) - i64::from(self.matches(previous))
            }
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Condition({:p})", Rc::as_ptr(&self.0))
    }
}

/// Edge crossed by a counter adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    /// 0 → n
    Unsettled,
    /// n → 0
    Settled,
    Steady,
}

#[derive(Debug)]
struct Counter {
    condition: Condition,
    count: i64,
    promise: Promise<()>,
    resolver: Option<Resolver<()>>,
}

/// Per-node set of named counters.
#[derive(Debug, Default)]
pub struct Ledger {
    counters: BTreeMap<String, Counter>,
}

impl Ledger {
    /// Current count; 0 for unknown names.
    pub fn value(&self, name: &str) -> i64 {
        self.counters.get(name).map_or(0, |c| c.count)
    }

    /// Settlement promise for `name`; already resolved for unknown names.
    pub fn settled(&self, name: &str) -> Promise<()> {
        self.counters
            .get(name)
            .map_or_else(|| Promise::resolved(()), |c| c.promise.clone())
    }

    /// Whether a counter exists for `name`.
    pub fn has(&self, name: &str) -> bool {
        self.counters.contains_key(name)
    }

    pub(crate) fn insert(&mut self, name: &str, condition: Condition) {
        self.counters.entry(name.to_owned()).or_insert_with(|| Counter {
            condition,
            count: 0,
            promise: Promise::resolved(()),
            resolver: None,
        });
    }

    pub(crate) fn counters(&self) -> Vec<(String, Condition)> {
        self.counters
            .iter()
            .map(|(name, c)| (name.clone(), c.condition.clone()))
            .collect()
    }

    /// Per-counter deltas caused by `change`, zero deltas omitted.
    pub(crate) fn deltas(&self, change: &StoreChange) -> Vec<(String, i64)> {
        self.counters
            .iter()
            .filter_map(|(name, c)| {
                let delta = c.condition.delta(change);
                (delta != 0).then(|| (name.clone(), delta))
            })
            .collect()
    }

    pub(crate) fn adjust(&mut self, name: &str, delta: i64) -> Option<(i64, Transition)> {
        let counter = self.counters.get_mut(name)?;
        let before = counter.count;
        counter.count = (before + delta).max(0);
        let transition = match (before, counter.count) {
            (0, n) if n > 0 => {
                let (promise, resolver) = Promise::pending();
                counter.promise = promise;
                counter.resolver = Some(resolver);
                Transition::Unsettled
            }
            (b, 0) if b > 0 => {
                if let Some(resolver) = counter.resolver.take() {
                    resolver.resolve(());
                }
                Transition::Settled
            }
            _ => Transition::Steady,
        };
        Some((counter.count, transition))
    }

    pub(crate) fn release(&mut self) {
        for counter in self.counters.values_mut() {
            if let Some(resolver) = counter.resolver.take() {
                resolver.resolve(());
            }
        }
    }
}
