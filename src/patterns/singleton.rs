//! Singleton registry: a lazily created shared instance.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::fsm::{Machine, NoTimer, Timers, Transition};

/// Token identifying the one shared instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceToken(Uuid);

impl InstanceToken {
    /// Create a fresh random token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    Created,
    ReturnedExisting,
}

/// One `get_instance` call as seen by the registry.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub kind: HistoryKind,
    pub token: InstanceToken,
    pub at: DateTime<Utc>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingletonState {
    /// Set by the first `get_instance`; stable until reset.
    pub instance: Option<InstanceToken>,
    pub history: Vec<HistoryEntry>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SingletonAction {
    GetInstance,
    Reset,
}

/// Registry that hands out the same token until reset.
///
/// # Examples
///
/// ```
/// use scenario_sim::patterns::SingletonRegistry;
///
/// let mut registry = SingletonRegistry::default();
/// let first = registry.get_instance();
/// assert_eq!(registry.get_instance(), first);
/// assert_eq!(registry.history().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct SingletonRegistry {
    state: SingletonState,
}

impl SingletonRegistry {
    /// Returns the shared token, creating it on first use.
    pub fn get_instance(&mut self) -> InstanceToken {
        let (token, kind) = match self.state.instance {
            Some(token) => (token, HistoryKind::ReturnedExisting),
            None => {
                let token = InstanceToken::new();
                self.state.instance = Some(token);
                (token, HistoryKind::Created)
            }
        };
        self.state.history.push(HistoryEntry {
            kind,
            token,
            at: Utc::now(),
        });
        token
    }

    /// The shared token, if it has been created.
    #[must_use]
    pub const fn instance(&self) -> Option<InstanceToken> {
        self.state.instance
    }

    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.state.history
    }

    /// Always 0 or 1.
    #[must_use]
    pub const fn instance_count(&self) -> usize {
        if self.state.instance.is_some() {
            1
        } else {
            0
        }
    }
}

impl Machine for SingletonRegistry {
    const NAME: &'static str = "singleton";

    type State = SingletonState;
    type Action = SingletonAction;
    type Slot = NoTimer;
    type Timer = NoTimer;

    fn state(&self) -> &SingletonState {
        &self.state
    }

    fn apply(&mut self, action: SingletonAction, timers: &mut Timers<Self>) -> Transition {
        match action {
            SingletonAction::GetInstance => {
                self.get_instance();
            }
            SingletonAction::Reset => {
                timers.cancel_all();
                self.reset();
            }
        }
        Transition::Applied
    }

    fn on_timer(&mut self, timer: NoTimer, _timers: &mut Timers<Self>) {
        match timer {}
    }

    fn reset(&mut self) {
        self.state = SingletonState::default();
    }

    fn view(&self) -> serde_json::Value {
        json!({
            "state": self.state,
            "instance_count": self.instance_count(),
        })
    }
}
