//! Transition scheduler: delayed callbacks keyed by slot.
//!
//! The scheduler owns a virtual clock. Time only moves when the owner advances
//! it, which keeps every simulator deterministic under test. The wall-clock
//! [`crate::runtime`] maps real elapsed time onto the same clock.
//!
//! Each slot holds at most one pending callback. Arming a slot that is already
//! armed replaces the earlier callback, so repeated user actions can never
//! stack two "revert" effects on the same channel.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::time::Duration;

/// A callback waiting in the queue.
#[derive(Debug)]
struct Pending<K, C> {
    slot: K,
    callback: C,
}

/// Delayed-callback primitive with last-write-wins slots.
///
/// `K` names the slot, `C` is the callback payload delivered when the slot
/// fires. Simulators use a plain enum for `C` and interpret it themselves; a
/// boxed closure works just as well.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use scenario_sim::TransitionScheduler;
///
/// let mut timers: TransitionScheduler<&str, u32> = TransitionScheduler::new();
/// timers.arm("flash", Duration::from_millis(100), 1);
/// timers.arm("flash", Duration::from_millis(100), 2);
///
/// let mut fired = Vec::new();
/// timers.advance(Duration::from_millis(100), |_, _, value| fired.push(value));
/// assert_eq!(fired, vec![2]);
/// ```
pub struct TransitionScheduler<K, C> {
    now_ms: u64,
    next_seq: u64,
    slots: HashMap<K, (u64, u64)>,
    queue: BTreeMap<(u64, u64), Pending<K, C>>,
}

impl<K, C> fmt::Debug for TransitionScheduler<K, C>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionScheduler")
            .field("now_ms", &self.now_ms)
            .field("pending", &self.queue.len())
            .field("slots", &self.slots.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<K, C> Default for TransitionScheduler<K, C>
where
    K: Copy + Eq + Hash + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, C> TransitionScheduler<K, C>
where
    K: Copy + Eq + Hash + fmt::Debug,
{
    /// Creates an empty scheduler with its clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_seq: 0,
            slots: HashMap::new(),
            queue: BTreeMap::new(),
        }
    }

    /// Current virtual time in milliseconds.
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Schedules `callback` to fire `delay` from now on `slot`.
    ///
    /// Any callback still pending on `slot` is cancelled first.
    pub fn arm(&mut self, slot: K, delay: Duration, callback: C) {
        let replaced = self.cancel(slot);
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let deadline = self.now_ms.saturating_add(delay_ms);
        let seq = self.next_seq;
        self.next_seq += 1;

        self.slots.insert(slot, (deadline, seq));
        self.queue.insert((deadline, seq), Pending { slot, callback });
        tracing::trace!(?slot, deadline, replaced, "timer armed");
    }

    /// Cancels the pending callback on `slot`. Returns true if one was pending.
    pub fn cancel(&mut self, slot: K) -> bool {
        match self.slots.remove(&slot) {
            Some(key) => {
                self.queue.remove(&key);
                true
            }
            None => false,
        }
    }

    /// Cancels every pending callback. Returns how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.queue.len();
        self.slots.clear();
        self.queue.clear();
        if dropped > 0 {
            tracing::trace!(dropped, "all timers cancelled");
        }
        dropped
    }

    /// Returns true if `slot` has a pending callback.
    #[must_use]
    pub fn is_armed(&self, slot: K) -> bool {
        self.slots.contains_key(&slot)
    }

    /// Deadline of the callback pending on `slot`, if any.
    #[must_use]
    pub fn deadline_of(&self, slot: K) -> Option<u64> {
        self.slots.get(&slot).map(|(deadline, _)| *deadline)
    }

    /// Number of pending callbacks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Removes and returns the earliest callback due at or before `until_ms`.
    ///
    /// The clock moves to that callback's deadline. Ties fire in arm order.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(K, C)> {
        let (&(deadline, _), _) = self.queue.first_key_value()?;
        if deadline > until_ms {
            return None;
        }
        let ((deadline, _), pending) = self.queue.pop_first()?;
        self.slots.remove(&pending.slot);
        self.now_ms = self.now_ms.max(deadline);
        Some((pending.slot, pending.callback))
    }

    /// Moves the clock forward to `target_ms` without firing anything.
    ///
    /// Callers drain [`Self::pop_due`] first; the clock never moves backwards.
    pub fn advance_to(&mut self, target_ms: u64) {
        self.now_ms = self.now_ms.max(target_ms);
    }

    /// Advances the clock by `elapsed`, firing every callback that comes due.
    ///
    /// `fire` receives the scheduler itself so a callback can arm follow-up
    /// timers; those fire too if their deadline lands inside the window.
    /// Returns the number of callbacks fired.
    pub fn advance<F>(&mut self, elapsed: Duration, mut fire: F) -> usize
    where
        F: FnMut(&mut Self, K, C),
    {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let target = self.now_ms.saturating_add(elapsed_ms);
        let mut fired = 0;
        while let Some((slot, callback)) = self.pop_due(target) {
            fire(self, slot, callback);
            fired += 1;
        }
        self.advance_to(target);
        fired
    }
}
