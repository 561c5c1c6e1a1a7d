// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Time sources and the debounce timer queue.
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::ident::NodeId;

/// Monotonic time source, measured from an arbitrary origin.
pub trait Clock {
    /// Current time since the clock's origin.
    fn now(&self) -> Duration;
}

/// Manually advanced clock for deterministic scheduling.
///
/// Clones share the same time, so a test can keep a handle while the graph
/// owns another.
#[derive(Clone, Default)]
pub struct VirtualClock {
    now: Rc<Cell<Duration>>,
}

impl VirtualClock {
    /// Clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Jump to `at` unless that is in the past.
    pub fn advance_to(&self, at: Duration) {
        if at > self.now.get() {
            self.now.set(at);
        }
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

impl fmt::Debug for VirtualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualClock")
            .field("now", &self.now.get())
            .finish()
    }
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Clock whose origin is the moment of construction.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Handle to one scheduled timer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TimerId {
    deadline: Duration,
    seq: u64,
}

impl TimerId {
    /// When the timer is due.
    pub const fn deadline(self) -> Duration {
        self.deadline
    }
}

/// Pending debounce timers ordered by deadline, then scheduling order.
#[derive(Debug, Default)]
pub(crate) struct TimerQueue {
    entries: BTreeMap<TimerId, NodeId>,
    next_seq: u64,
}

impl TimerQueue {
    pub(crate) fn schedule(&mut self, deadline: Duration, node: NodeId) -> TimerId {
        let id = TimerId {
            deadline,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.entries.insert(id, node);
        id
    }

    pub(crate) fn cancel(&mut self, id: TimerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Pop the earliest timer due at or before `now`.
    pub(crate) fn pop_due(&mut self, now: Duration) -> Option<(TimerId, NodeId)> {
        let (&id, _) = self.entries.first_key_value()?;
        if id.deadline > now {
            return None;
        }
        self.entries.pop_first()
    }

    pub(crate) fn next_deadline(&self) -> Option<Duration> {
        self.entries.keys().next().map(|id| id.deadline)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(i: u32) -> NodeId {
        NodeId::new(i, 0)
    }

    #[test]
    fn pops_in_deadline_then_schedule_order() {
        let mut q = TimerQueue::default();
        q.schedule(Duration::from_millis(20), node(1));
        q.schedule(Duration::from_millis(10), node(2));
        q.schedule(Duration::from_millis(10), node(3));
        let now = Duration::from_millis(20);
        let order: Vec<u32> = std::iter::from_fn(|| q.pop_due(now))
            .map(|(_, n)| n.index())
            .collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn not_due_stays_queued() {
        let mut q = TimerQueue::default();
        let t = q.schedule(Duration::from_millis(20), node(1));
        assert!(q.pop_due(Duration::from_millis(19)).is_none());
        assert_eq!(q.next_deadline(), Some(Duration::from_millis(20)));
        assert!(q.cancel(t));
        assert!(!q.cancel(t));
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn virtual_clock_is_shared_between_clones() {
        let clock = VirtualClock::new();
        let handle = clock.clone();
        handle.advance(Duration::from_millis(5));
        clock.advance_to(Duration::from_millis(3));
        assert_eq!(clock.now(), Duration::from_millis(5));
    }
}
