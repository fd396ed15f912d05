//! Observer broadcast: one publisher, a list of subscribers.
//!
//! A broadcast runs in two timed stages on a single slot:
//!
//! ```text
//! notify() ──► pulse (broadcasting = true) ──pulse_ms──► hold ──clear_ms──► idle
//!              notified = true for the                    notified flags
//!              subscribers present at call time           cleared
//! ```
//!
//! The broadcast is in progress from `notify()` until the clear fires; a
//! second `notify()` during that window is ignored. Subscribers that join
//! mid-broadcast stay unnotified.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::config::TimingConfig;
use crate::fsm::{Machine, Timers, Transition};

/// Unique identifier for a subscriber.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    /// Create a new random subscriber id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub label: String,
    pub notified: bool,
    /// Broadcasts this subscriber has received since it joined.
    pub received: u32,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverState {
    pub subscribers: Vec<Subscriber>,
    /// Pulse stage of the current broadcast.
    pub broadcasting: bool,
    /// True from `notify()` until the notified flags are cleared.
    pub in_progress: bool,
    pub broadcasts: u32,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ObserverAction {
    Subscribe { label: String },
    Unsubscribe { id: SubscriberId },
    Notify,
    Reset,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObserverSlot {
    Broadcast,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverTimer {
    EndPulse,
    ClearNotified,
}

/// Publisher with snapshot-at-call-time broadcast semantics.
#[derive(Debug)]
pub struct ObserverBroadcast {
    state: ObserverState,
    pulse: Duration,
    clear: Duration,
}

impl Default for ObserverBroadcast {
    fn default() -> Self {
        Self::new(&TimingConfig::default())
    }
}

impl ObserverBroadcast {
    #[must_use]
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            state: ObserverState::default(),
            pulse: TimingConfig::ms(timing.observer_pulse_ms),
            clear: TimingConfig::ms(timing.observer_clear_ms),
        }
    }

    /// Adds an unnotified subscriber and returns its id.
    pub fn subscribe(&mut self, label: impl Into<String>) -> SubscriberId {
        let id = SubscriberId::new();
        self.state.subscribers.push(Subscriber {
            id,
            label: label.into(),
            notified: false,
            received: 0,
        });
        id
    }

    /// Removes a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> Transition {
        let before = self.state.subscribers.len();
        self.state.subscribers.retain(|s| s.id != id);
        if self.state.subscribers.len() == before {
            Transition::ignored("unknown subscriber")
        } else {
            Transition::Applied
        }
    }

    /// Starts a broadcast unless one is already running.
    pub fn notify(&mut self, timers: &mut Timers<Self>) -> Transition {
        if self.state.in_progress {
            return Transition::ignored("broadcast in progress");
        }
        for sub in &mut self.state.subscribers {
            sub.notified = true;
            sub.received += 1;
        }
        self.state.broadcasting = true;
        self.state.in_progress = true;
        self.state.broadcasts += 1;
        timers.arm(ObserverSlot::Broadcast, self.pulse, ObserverTimer::EndPulse);
        Transition::Applied
    }

    #[must_use]
    pub fn notified_count(&self) -> usize {
        self.state.subscribers.iter().filter(|s| s.notified).count()
    }

    #[must_use]
    pub fn subscriber(&self, id: SubscriberId) -> Option<&Subscriber> {
        self.state.subscribers.iter().find(|s| s.id == id)
    }
}

impl Machine for ObserverBroadcast {
    const NAME: &'static str = "observer";

    type State = ObserverState;
    type Action = ObserverAction;
    type Slot = ObserverSlot;
    type Timer = ObserverTimer;

    fn state(&self) -> &ObserverState {
        &self.state
    }

    fn apply(&mut self, action: ObserverAction, timers: &mut Timers<Self>) -> Transition {
        match action {
            ObserverAction::Subscribe { label } => {
                self.subscribe(label);
                Transition::Applied
            }
            ObserverAction::Unsubscribe { id } => self.unsubscribe(id),
            ObserverAction::Notify => self.notify(timers),
            ObserverAction::Reset => {
                timers.cancel_all();
                self.reset();
                Transition::Applied
            }
        }
    }

    fn on_timer(&mut self, timer: ObserverTimer, timers: &mut Timers<Self>) {
        match timer {
            ObserverTimer::EndPulse => {
                self.state.broadcasting = false;
                timers.arm(ObserverSlot::Broadcast, self.clear, ObserverTimer::ClearNotified);
            }
            ObserverTimer::ClearNotified => {
                for sub in &mut self.state.subscribers {
                    sub.notified = false;
                }
                self.state.in_progress = false;
            }
        }
    }

    fn reset(&mut self) {
        self.state = ObserverState::default();
    }

    fn view(&self) -> serde_json::Value {
        json!({
            "state": self.state,
            "subscriber_count": self.state.subscribers.len(),
            "notified_count": self.notified_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::Simulator;

    fn sim() -> Simulator<ObserverBroadcast> {
        Simulator::new(ObserverBroadcast::new(&TimingConfig {
            observer_pulse_ms: 150,
            observer_clear_ms: 100,
            ..TimingConfig::default()
        }))
    }

    fn subscribe(sim: &mut Simulator<ObserverBroadcast>, label: &str) -> SubscriberId {
        sim.dispatch(ObserverAction::Subscribe { label: label.to_string() });
        sim.state().subscribers.last().unwrap().id
    }

    #[test]
    fn notify_marks_everyone_then_clears() {
        let mut sim = sim();
        subscribe(&mut sim, "A");
        subscribe(&mut sim, "B");

        assert!(sim.dispatch(ObserverAction::Notify).is_applied());
        assert_eq!(sim.machine().notified_count(), 2);
        assert!(sim.state().broadcasting);

        sim.advance_ms(150);
        assert!(!sim.state().broadcasting);
        assert!(sim.state().in_progress);
        assert_eq!(sim.machine().notified_count(), 2);

        sim.advance_ms(100);
        assert_eq!(sim.machine().notified_count(), 0);
        assert!(!sim.state().in_progress);
        assert_eq!(sim.pending_timers(), 0);
    }

    #[test]
    fn late_subscriber_is_not_notified() {
        let mut sim = sim();
        subscribe(&mut sim, "A");
        subscribe(&mut sim, "B");
        sim.dispatch(ObserverAction::Notify);
        let c = subscribe(&mut sim, "C");

        assert!(!sim.machine().subscriber(c).unwrap().notified);
        sim.advance_ms(120);
        assert!(!sim.machine().subscriber(c).unwrap().notified);
        assert_eq!(sim.machine().subscriber(c).unwrap().received, 0);
    }

    #[test]
    fn notify_is_guarded_while_in_progress() {
        let mut sim = sim();
        subscribe(&mut sim, "A");
        sim.dispatch(ObserverAction::Notify);
        sim.advance_ms(200);
        assert!(sim.dispatch(ObserverAction::Notify).is_ignored());
        assert_eq!(sim.state().broadcasts, 1);

        sim.advance_ms(50);
        assert!(sim.dispatch(ObserverAction::Notify).is_applied());
        assert_eq!(sim.state().subscribers[0].received, 2);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let mut sim = sim();
        let a = subscribe(&mut sim, "A");
        assert!(sim.dispatch(ObserverAction::Unsubscribe { id: a }).is_applied());
        assert!(sim.dispatch(ObserverAction::Unsubscribe { id: a }).is_ignored());
        assert!(sim.state().subscribers.is_empty());
    }

    #[test]
    fn reset_cancels_pending_clear() {
        let mut sim = sim();
        subscribe(&mut sim, "A");
        sim.dispatch(ObserverAction::Notify);
        sim.dispatch(ObserverAction::Reset);
        assert_eq!(sim.pending_timers(), 0);
        assert_eq!(sim.state(), &ObserverState::default());

        let b = subscribe(&mut sim, "B");
        sim.advance_ms(1000);
        assert!(!sim.machine().subscriber(b).unwrap().notified);
    }
}
