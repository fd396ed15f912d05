//! Widget registry: host any simulator by name.
//!
//! The page shell decides which widgets are mounted; this module only maps a
//! name to a freshly constructed simulator.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::error::{DispatchError, SimError, SimResult};
use crate::fsm::{Simulator, Transition, Widget};
use crate::patterns::{BuilderAssembly, FactoryStore, ObserverBroadcast, SingletonRegistry, StrategyContext};
use crate::protocols::{CsrfSimulator, ExploitSimulator, OAuthStepper};

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    Singleton,
    Factory,
    Builder,
    Observer,
    Strategy,
    Csrf,
    Oauth,
    Exploit,
}

impl WidgetKind {
    /// All widgets in course order.
    pub const ALL: [Self; 8] = [
        Self::Singleton,
        Self::Factory,
        Self::Builder,
        Self::Observer,
        Self::Strategy,
        Self::Csrf,
        Self::Oauth,
        Self::Exploit,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Singleton => "singleton",
            Self::Factory => "factory",
            Self::Builder => "builder",
            Self::Observer => "observer",
            Self::Strategy => "strategy",
            Self::Csrf => "csrf",
            Self::Oauth => "oauth",
            Self::Exploit => "exploit",
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == name)
            .ok_or_else(|| SimError::Dispatch(DispatchError::UnknownWidget { name: s.to_string() }))
    }
}

/// Any of the eight simulators behind one type.
#[allow(missing_docs)]
#[derive(Debug)]
pub enum AnySimulator {
    Singleton(Simulator<SingletonRegistry>),
    Factory(Simulator<FactoryStore>),
    Builder(Simulator<BuilderAssembly>),
    Observer(Simulator<ObserverBroadcast>),
    Strategy(Simulator<StrategyContext>),
    Csrf(Simulator<CsrfSimulator>),
    Oauth(Simulator<OAuthStepper>),
    Exploit(Simulator<ExploitSimulator>),
}

macro_rules! each {
    ($this:expr, $sim:ident => $body:expr) => {
        match $this {
            AnySimulator::Singleton($sim) => $body,
            AnySimulator::Factory($sim) => $body,
            AnySimulator::Builder($sim) => $body,
            AnySimulator::Observer($sim) => $body,
            AnySimulator::Strategy($sim) => $body,
            AnySimulator::Csrf($sim) => $body,
            AnySimulator::Oauth($sim) => $body,
            AnySimulator::Exploit($sim) => $body,
        }
    };
}

impl AnySimulator {
    /// Mounts a fresh simulator of the given kind.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `config` is invalid.
    pub fn new(kind: WidgetKind, config: &SimConfig) -> SimResult<Self> {
        config.validate()?;
        let timing = &config.timing;
        Ok(match kind {
            WidgetKind::Singleton => Self::Singleton(Simulator::new(SingletonRegistry::default())),
            WidgetKind::Factory => Self::Factory(Simulator::new(FactoryStore::default())),
            WidgetKind::Builder => Self::Builder(Simulator::new(BuilderAssembly::default())),
            WidgetKind::Observer => Self::Observer(Simulator::new(ObserverBroadcast::new(timing))),
            WidgetKind::Strategy => Self::Strategy(Simulator::new(StrategyContext::new(config))),
            WidgetKind::Csrf => Self::Csrf(Simulator::new(CsrfSimulator::new(config))),
            WidgetKind::Oauth => Self::Oauth(Simulator::new(OAuthStepper::default())),
            WidgetKind::Exploit => Self::Exploit(Simulator::new(ExploitSimulator::new(config))),
        })
    }

    /// Parses the widget name and mounts it.
    pub fn from_name(name: &str, config: &SimConfig) -> SimResult<Self> {
        Self::new(name.parse()?, config)
    }

    #[must_use]
    pub const fn kind(&self) -> WidgetKind {
        match self {
            Self::Singleton(_) => WidgetKind::Singleton,
            Self::Factory(_) => WidgetKind::Factory,
            Self::Builder(_) => WidgetKind::Builder,
            Self::Observer(_) => WidgetKind::Observer,
            Self::Strategy(_) => WidgetKind::Strategy,
            Self::Csrf(_) => WidgetKind::Csrf,
            Self::Oauth(_) => WidgetKind::Oauth,
            Self::Exploit(_) => WidgetKind::Exploit,
        }
    }

    /// Decodes a JSON intent for whichever simulator this is.
    pub fn dispatch_json(&mut self, intent: &str) -> SimResult<Transition> {
        each!(self, sim => sim.dispatch_json(intent))
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        each!(self, sim => sim.pending_timers())
    }
}

impl Widget for AnySimulator {
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    fn dispatch_value(&mut self, intent: serde_json::Value) -> SimResult<Transition> {
        each!(self, sim => sim.dispatch_value(intent))
    }

    fn advance(&mut self, elapsed: Duration) -> usize {
        each!(self, sim => sim.advance(elapsed))
    }

    fn reset(&mut self) {
        each!(self, sim => sim.reset());
    }

    fn cancel_timers(&mut self) -> usize {
        each!(self, sim => Widget::cancel_timers(sim))
    }

    fn view(&self) -> serde_json::Value {
        each!(self, sim => sim.view())
    }

    fn now_ms(&self) -> u64 {
        each!(self, sim => sim.now_ms())
    }

    fn next_deadline_ms(&self) -> Option<u64> {
        each!(self, sim => sim.next_deadline_ms())
    }
}
