//! # scenario-sim - interactive teaching widgets as state machines
//!
//! Each widget on a course page (design patterns, web-security protocols)
//! is a small finite-state machine. A renderer sends it intents and renders
//! whatever state comes back. Timed visual phases run on a per-widget
//! transition scheduler, which is virtual-clocked and deterministic.
//!
//! ## Core Concepts
//!
//! - **Machine**: a widget's state, the actions it accepts and the timers it arms
//! - **Simulator**: hosts one machine plus its scheduler, one transition at a time
//! - **TransitionScheduler**: named slots, last write wins, cancelled on unmount
//! - **Transition**: an action either applies or is a guarded no-op
//!
//! ## Usage
//!
//! ```rust
//! use scenario_sim::patterns::{ObserverAction, ObserverBroadcast};
//! use scenario_sim::{Simulator, TimingConfig};
//!
//! let mut sim = Simulator::new(ObserverBroadcast::new(&TimingConfig::default()));
//! sim.dispatch(ObserverAction::Subscribe { label: "inbox".to_string() });
//! sim.dispatch(ObserverAction::Notify);
//! assert!(sim.state().broadcasting);
//!
//! sim.advance_ms(1500);
//! assert!(!sim.state().broadcasting);
//! sim.advance_ms(1000);
//! assert!(!sim.state().in_progress);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core
pub mod config;
pub mod error;
pub mod fsm;
pub mod scheduler;

// Simulators
pub mod patterns;
pub mod protocols;

// Hosting
pub mod runtime;
pub mod widget;

pub use config::{SimConfig, TimingConfig};
pub use error::{DispatchError, SimError, SimResult, ValidationError};
pub use fsm::{Machine, NoTimer, Simulator, Timers, Transition, Widget};
pub use runtime::{Intent, RuntimeConfig, SimulatorRuntime, UpdateCause, ViewUpdate};
pub use scheduler::TransitionScheduler;
pub use widget::{AnySimulator, WidgetKind};
