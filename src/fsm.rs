//! Finite state machine core.
//!
//! Every widget is a [`Machine`]: a state value, a closed set of actions, and
//! a set of timer callbacks. A [`Simulator`] hosts one machine together with
//! its own [`TransitionScheduler`] and is the only way to drive it:
//!
//! ```text
//! intent → Simulator::dispatch → Machine::apply → (state', timers armed)
//! clock  → Simulator::advance  → Machine::on_timer → (state', timers armed)
//! ```
//!
//! Machines are synchronous and perform no I/O. Invalid actions are guarded
//! no-ops reported as [`Transition::Ignored`], never errors.

use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DispatchError, SimError, SimResult};
use crate::scheduler::TransitionScheduler;

/// Outcome of delivering one action to a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transition {
    /// The action changed state (or armed a timer).
    Applied,
    /// A guard rejected the action; nothing changed.
    Ignored {
        /// Which guard rejected it.
        reason: &'static str,
    },
}

impl Transition {
    /// Shorthand for a guarded no-op.
    #[must_use]
    pub const fn ignored(reason: &'static str) -> Self {
        Self::Ignored { reason }
    }

    /// Returns true if the action took effect.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Returns true if a guard rejected the action.
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored { .. })
    }
}

/// Slot/timer type for machines that never schedule anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoTimer {}

/// Scheduler type owned by a machine's simulator.
pub type Timers<M> = TransitionScheduler<<M as Machine>::Slot, <M as Machine>::Timer>;

/// A concrete per-concept state machine.
pub trait Machine {
    /// Stable widget name used in logs and intent routing.
    const NAME: &'static str;

    /// The machine's discriminated state value.
    type State: fmt::Debug + Serialize;
    /// The user-triggered action set.
    type Action: fmt::Debug + DeserializeOwned;
    /// Named timer channels.
    type Slot: Copy + Eq + Hash + fmt::Debug;
    /// Payload delivered when a slot fires.
    type Timer: fmt::Debug;

    /// Current state.
    fn state(&self) -> &Self::State;

    /// Applies one user action.
    fn apply(&mut self, action: Self::Action, timers: &mut Timers<Self>) -> Transition;

    /// Handles a fired timer.
    fn on_timer(&mut self, timer: Self::Timer, timers: &mut Timers<Self>);

    /// Returns the machine to its initial state. Timers are cancelled by the host.
    fn reset(&mut self);

    /// State plus derived fields, for the rendering adapter.
    fn view(&self) -> serde_json::Value;
}

/// Hosts a machine and its scheduler.
///
/// The simulator owns both exclusively; there is no shared state between
/// simulators.
pub struct Simulator<M: Machine> {
    machine: M,
    timers: Timers<M>,
}

impl<M: Machine> fmt::Debug for Simulator<M>
where
    M: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("widget", &M::NAME)
            .field("machine", &self.machine)
            .field("timers", &self.timers)
            .finish()
    }
}

impl<M: Machine> Simulator<M> {
    /// Mounts a machine with an empty scheduler.
    pub fn new(machine: M) -> Self {
        Self {
            machine,
            timers: TransitionScheduler::new(),
        }
    }

    /// Widget name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        M::NAME
    }

    /// Delivers an action.
    pub fn dispatch(&mut self, action: M::Action) -> Transition {
        let label = format!("{action:?}");
        let transition = self.machine.apply(action, &mut self.timers);
        match transition {
            Transition::Applied => {
                tracing::debug!(widget = M::NAME, action = %label, now_ms = self.timers.now_ms(), "transition applied");
            }
            Transition::Ignored { reason } => {
                tracing::trace!(widget = M::NAME, action = %label, reason, "action ignored");
            }
        }
        transition
    }

    /// Decodes a JSON intent (`{"action": "..."}`) and delivers it.
    pub fn dispatch_json(&mut self, intent: &str) -> SimResult<Transition> {
        let action: M::Action = serde_json::from_str(intent).map_err(|e| malformed::<M>(&e))?;
        Ok(self.dispatch(action))
    }

    /// Same as [`Self::dispatch_json`] for an already-parsed value.
    pub fn dispatch_value(&mut self, intent: serde_json::Value) -> SimResult<Transition> {
        let action: M::Action = serde_json::from_value(intent).map_err(|e| malformed::<M>(&e))?;
        Ok(self.dispatch(action))
    }

    /// Advances the virtual clock, firing due timers. Returns how many fired.
    pub fn advance(&mut self, elapsed: Duration) -> usize {
        let machine = &mut self.machine;
        self.timers.advance(elapsed, |timers, slot, timer| {
            tracing::debug!(widget = M::NAME, ?slot, ?timer, now_ms = timers.now_ms(), "timer fired");
            machine.on_timer(timer, timers);
        })
    }

    /// Convenience wrapper over [`Self::advance`].
    pub fn advance_ms(&mut self, elapsed_ms: u64) -> usize {
        self.advance(Duration::from_millis(elapsed_ms))
    }

    /// Cancels all pending timers, then restores the initial state.
    pub fn reset(&mut self) {
        let cancelled = self.timers.cancel_all();
        self.machine.reset();
        tracing::debug!(widget = M::NAME, cancelled, "simulator reset");
    }

    /// Tears the widget down, cancelling every pending timer.
    ///
    /// Returns the machine in whatever state it reached.
    pub fn unmount(mut self) -> M {
        let cancelled = self.timers.cancel_all();
        tracing::debug!(widget = M::NAME, cancelled, "simulator unmounted");
        self.machine
    }

    /// Current state.
    pub fn state(&self) -> &M::State {
        self.machine.state()
    }

    /// The hosted machine, for derived accessors.
    pub fn machine(&self) -> &M {
        &self.machine
    }

    /// Rendering view: state plus derived fields.
    pub fn view(&self) -> serde_json::Value {
        self.machine.view()
    }

    /// Current virtual time.
    pub fn now_ms(&self) -> u64 {
        self.timers.now_ms()
    }

    /// Number of pending timers.
    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// Whether `slot` is armed.
    pub fn is_armed(&self, slot: M::Slot) -> bool {
        self.timers.is_armed(slot)
    }

    /// Earliest pending deadline on the virtual clock.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.timers.next_deadline()
    }
}

impl<M: Machine + Default> Default for Simulator<M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

fn malformed<M: Machine>(err: &serde_json::Error) -> SimError {
    SimError::Dispatch(DispatchError::MalformedIntent {
        widget: M::NAME,
        message: err.to_string(),
    })
}

/// Object-safe surface a host (runtime, replay tool) needs from any widget.
pub trait Widget: Send {
    /// Widget name.
    fn name(&self) -> &'static str;
    /// Decodes and delivers a JSON intent.
    fn dispatch_value(&mut self, intent: serde_json::Value) -> SimResult<Transition>;
    /// Advances the virtual clock.
    fn advance(&mut self, elapsed: Duration) -> usize;
    /// Cancels timers and restores the initial state.
    fn reset(&mut self);
    /// Cancels timers without touching state.
    fn cancel_timers(&mut self) -> usize;
    /// Rendering view.
    fn view(&self) -> serde_json::Value;
    /// Current virtual time.
    fn now_ms(&self) -> u64;
    /// Earliest pending deadline.
    fn next_deadline_ms(&self) -> Option<u64>;
}

impl<M> Widget for Simulator<M>
where
    M: Machine + Send,
    M::Slot: Send,
    M::Timer: Send,
{
    fn name(&self) -> &'static str {
        M::NAME
    }

    fn dispatch_value(&mut self, intent: serde_json::Value) -> SimResult<Transition> {
        Simulator::dispatch_value(self, intent)
    }

    fn advance(&mut self, elapsed: Duration) -> usize {
        Simulator::advance(self, elapsed)
    }

    fn reset(&mut self) {
        Simulator::reset(self);
    }

    fn cancel_timers(&mut self) -> usize {
        self.timers.cancel_all()
    }

    fn view(&self) -> serde_json::Value {
        Simulator::view(self)
    }

    fn now_ms(&self) -> u64 {
        Simulator::now_ms(self)
    }

    fn next_deadline_ms(&self) -> Option<u64> {
        Simulator::next_deadline_ms(self)
    }
}
