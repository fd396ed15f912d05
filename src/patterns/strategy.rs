//! Strategy payment context: pluggable payment algorithms.
//!
//! Phases cycle `idle → running → done → idle`; both forward steps are timed.
//! The simulated payment always succeeds.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::{SimConfig, TimingConfig};
use crate::error::ValidationError;
use crate::fsm::{Machine, Timers, Transition};

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStrategy {
    #[default]
    CreditCard,
    PayPal,
    Crypto,
}

impl PaymentStrategy {
    #[allow(missing_docs)]
    pub const ALL: [Self; 3] = [Self::CreditCard, Self::PayPal, Self::Crypto];

    /// Processing fee in percent of the amount.
    #[must_use]
    pub const fn fee_percent(self) -> u64 {
        match self {
            Self::CreditCard => 3,
            Self::PayPal => 4,
            Self::Crypto => 1,
        }
    }

    /// Runs the algorithm. Integer arithmetic; fees round down.
    #[must_use]
    pub fn pay(self, amount: u64) -> Receipt {
        let fee = amount.saturating_mul(self.fee_percent()) / 100;
        let total = amount.saturating_add(fee);
        let message = match self {
            Self::CreditCard => format!("Charged {total} to card ending 4242 (fee {fee})"),
            Self::PayPal => format!("Sent {total} via PayPal to merchant@example.com (fee {fee})"),
            Self::Crypto => format!("Broadcast transfer of {total} to wallet 0xA11CE (fee {fee})"),
        };
        Receipt {
            strategy: self,
            amount,
            fee,
            total,
            message,
        }
    }
}

impl fmt::Display for PaymentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreditCard => write!(f, "credit_card"),
            Self::PayPal => write!(f, "pay_pal"),
            Self::Crypto => write!(f, "crypto"),
        }
    }
}

impl FromStr for PaymentStrategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "credit_card" | "card" => Ok(Self::CreditCard),
            "pay_pal" | "paypal" => Ok(Self::PayPal),
            "crypto" => Ok(Self::Crypto),
            _ => Err(ValidationError::UnknownVariant {
                kind: "payment strategy",
                value: s.to_string(),
            }),
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Done,
}

/// Result of one completed run.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub strategy: PaymentStrategy,
    pub amount: u64,
    pub fee: u64,
    pub total: u64,
    pub message: String,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyState {
    pub selected_strategy: PaymentStrategy,
    pub phase: Phase,
    pub amount: u64,
    /// Last completed run; kept until the next run starts.
    pub receipt: Option<Receipt>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StrategyAction {
    SelectStrategy { strategy: PaymentStrategy },
    SetAmount { amount: u64 },
    Execute,
    Reset,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategySlot {
    Run,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyTimer {
    Complete,
    Settle,
}

/// Context that executes the selected payment strategy.
#[derive(Debug)]
pub struct StrategyContext {
    state: StrategyState,
    initial_amount: u64,
    run: Duration,
    settle: Duration,
}

impl Default for StrategyContext {
    fn default() -> Self {
        Self::new(&SimConfig::default())
    }
}

impl StrategyContext {
    #[must_use]
    pub fn new(config: &SimConfig) -> Self {
        Self {
            state: Self::initial_state(config.payment_amount),
            initial_amount: config.payment_amount,
            run: TimingConfig::ms(config.timing.strategy_run_ms),
            settle: TimingConfig::ms(config.timing.strategy_settle_ms),
        }
    }

    fn initial_state(amount: u64) -> StrategyState {
        StrategyState {
            selected_strategy: PaymentStrategy::default(),
            phase: Phase::Idle,
            amount,
            receipt: None,
        }
    }

    pub fn select_strategy(&mut self, strategy: PaymentStrategy) -> Transition {
        if self.state.phase != Phase::Idle {
            return Transition::ignored("payment in flight");
        }
        self.state.selected_strategy = strategy;
        Transition::Applied
    }

    pub fn set_amount(&mut self, amount: u64) -> Transition {
        if self.state.phase != Phase::Idle {
            return Transition::ignored("payment in flight");
        }
        if amount == 0 {
            return Transition::ignored("amount must be positive");
        }
        self.state.amount = amount;
        Transition::Applied
    }

    /// Starts a run. No-op unless idle, so runs never overlap.
    pub fn execute(&mut self, timers: &mut Timers<Self>) -> Transition {
        if self.state.phase != Phase::Idle {
            return Transition::ignored("payment in flight");
        }
        self.state.phase = Phase::Running;
        self.state.receipt = None;
        timers.arm(StrategySlot::Run, self.run, StrategyTimer::Complete);
        Transition::Applied
    }

    /// Whether the strategy picker and pay button are enabled.
    #[must_use]
    pub fn controls_enabled(&self) -> bool {
        self.state.phase == Phase::Idle
    }
}

impl Machine for StrategyContext {
    const NAME: &'static str = "strategy";

    type State = StrategyState;
    type Action = StrategyAction;
    type Slot = StrategySlot;
    type Timer = StrategyTimer;

    fn state(&self) -> &StrategyState {
        &self.state
    }

    fn apply(&mut self, action: StrategyAction, timers: &mut Timers<Self>) -> Transition {
        match action {
            StrategyAction::SelectStrategy { strategy } => self.select_strategy(strategy),
            StrategyAction::SetAmount { amount } => self.set_amount(amount),
            StrategyAction::Execute => self.execute(timers),
            StrategyAction::Reset => {
                timers.cancel_all();
                self.reset();
                Transition::Applied
            }
        }
    }

    fn on_timer(&mut self, timer: StrategyTimer, timers: &mut Timers<Self>) {
        match (timer, self.state.phase) {
            (StrategyTimer::Complete, Phase::Running) => {
                let receipt = self.state.selected_strategy.pay(self.state.amount);
                self.state.receipt = Some(receipt);
                self.state.phase = Phase::Done;
                timers.arm(StrategySlot::Run, self.settle, StrategyTimer::Settle);
            }
            (StrategyTimer::Settle, Phase::Done) => {
                self.state.phase = Phase::Idle;
            }
            (timer, phase) => {
                tracing::trace!(?timer, ?phase, "stale strategy timer ignored");
            }
        }
    }

    fn reset(&mut self) {
        self.state = Self::initial_state(self.initial_amount);
    }

    fn view(&self) -> serde_json::Value {
        json!({
            "state": self.state,
            "controls_enabled": self.controls_enabled(),
            "fee_percent": self.state.selected_strategy.fee_percent(),
        })
    }
}
