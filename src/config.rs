//! Simulator configuration.
//!
//! Delays are presentation tuning, not correctness requirements. Any positive
//! values are accepted: staged delays are armed one after the other, so
//! "processing" always precedes "compromised", which precedes the shell reveal.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult, ValidationError};

/// Every scheduler delay used by the simulators, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// How long a CSRF outcome message stays visible.
    pub csrf_outcome_clear_ms: u64,
    /// Length of the observer broadcast pulse.
    pub observer_pulse_ms: u64,
    /// Delay after the pulse before `notified` flags are cleared.
    pub observer_clear_ms: u64,
    /// Time a payment strategy spends in `running`.
    pub strategy_run_ms: u64,
    /// Time the strategy context stays in `done` before returning to idle.
    pub strategy_settle_ms: u64,
    /// Exploit stage one: "deserializing".
    pub exploit_deserialize_ms: u64,
    /// Exploit stage two: "executing".
    pub exploit_execute_ms: u64,
    /// Delay between reaching `compromised` and revealing the shell.
    pub exploit_shell_reveal_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            csrf_outcome_clear_ms: 2000,
            observer_pulse_ms: 1500,
            observer_clear_ms: 1000,
            strategy_run_ms: 1500,
            strategy_settle_ms: 2000,
            exploit_deserialize_ms: 800,
            exploit_execute_ms: 800,
            exploit_shell_reveal_ms: 500,
        }
    }
}

impl TimingConfig {
    /// Uniform timings, handy for tests that only care about ordering.
    #[must_use]
    pub const fn uniform(ms: u64) -> Self {
        Self {
            csrf_outcome_clear_ms: ms,
            observer_pulse_ms: ms,
            observer_clear_ms: ms,
            strategy_run_ms: ms,
            strategy_settle_ms: ms,
            exploit_deserialize_ms: ms,
            exploit_execute_ms: ms,
            exploit_shell_reveal_ms: ms,
        }
    }

    /// Validate timings. Every delay must be positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("csrf_outcome_clear_ms", self.csrf_outcome_clear_ms),
            ("observer_pulse_ms", self.observer_pulse_ms),
            ("observer_clear_ms", self.observer_clear_ms),
            ("strategy_run_ms", self.strategy_run_ms),
            ("strategy_settle_ms", self.strategy_settle_ms),
            ("exploit_deserialize_ms", self.exploit_deserialize_ms),
            ("exploit_execute_ms", self.exploit_execute_ms),
            ("exploit_shell_reveal_ms", self.exploit_shell_reveal_ms),
        ];
        for (field, value) in fields {
            if value == 0 {
                return Err(ValidationError::ZeroDelay {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    pub(crate) const fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }
}

/// Top-level configuration handed to simulator constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Scheduler delays.
    pub timing: TimingConfig,
    /// Starting balance of the simulated bank account in the CSRF widget.
    pub csrf_initial_balance: u64,
    /// Amount a successful forged request transfers out.
    pub csrf_attack_amount: u64,
    /// Maximum retained lines in the exploit server log.
    pub exploit_log_capacity: usize,
    /// Amount charged by the strategy payment demo.
    pub payment_amount: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            csrf_initial_balance: 1000,
            csrf_attack_amount: 100,
            exploit_log_capacity: 8,
            payment_amount: 100,
        }
    }
}

impl SimConfig {
    /// Validate the whole configuration.
    ///
    /// This must be called before handing the config to a simulator; the
    /// constructors assume it holds.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.timing.validate()?;
        if self.csrf_attack_amount == 0 {
            return Err(ValidationError::ZeroValue {
                field: "csrf_attack_amount".to_string(),
            });
        }
        if self.exploit_log_capacity == 0 {
            return Err(ValidationError::ZeroValue {
                field: "exploit_log_capacity".to_string(),
            });
        }
        if self.payment_amount == 0 {
            return Err(ValidationError::ZeroValue {
                field: "payment_amount".to_string(),
            });
        }
        Ok(())
    }

    /// Parse a JSON config, filling missing fields from defaults, and validate it.
    pub fn from_json_str(input: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(input).map_err(|e| {
            SimError::Validation(ValidationError::InvalidConfig {
                reason: e.to_string(),
            })
        })?;
        config.validate()?;
        Ok(config)
    }
}
