//! SameSite / CSRF policy simulator.
//!
//! A forged cross-site POST from an attacker page reaches the simulated bank.
//! The session cookie rides along only when the cookie's `SameSite` policy is
//! `None`, so that is the only configuration where the transfer succeeds. A
//! successful attack is an expected outcome here, not an error.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::{SimConfig, TimingConfig};
use crate::error::ValidationError;
use crate::fsm::{Machine, Timers, Transition};

/// `SameSite` cookie attribute values.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SameSitePolicy {
    Strict,
    /// Browser default when the attribute is omitted.
    #[default]
    Lax,
    None,
}

impl SameSitePolicy {
    /// Whether the session cookie is attached to a cross-site POST.
    #[must_use]
    pub const fn sends_cookie_cross_site(self) -> bool {
        matches!(self, Self::None)
    }

    /// The `Set-Cookie` header the simulated bank would emit.
    #[must_use]
    pub fn set_cookie_header(self) -> String {
        match self {
            Self::None => "Set-Cookie: session=abc123; SameSite=None; Secure".to_string(),
            other => format!("Set-Cookie: session=abc123; SameSite={other}"),
        }
    }
}

impl fmt::Display for SameSitePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "Strict"),
            Self::Lax => write!(f, "Lax"),
            Self::None => write!(f, "None"),
        }
    }
}

impl FromStr for SameSitePolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "none" => Ok(Self::None),
            _ => Err(ValidationError::UnknownVariant {
                kind: "policy",
                value: s.to_string(),
            }),
        }
    }
}

/// Transient result of the last forged request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsrfOutcome {
    /// The browser withheld the cookie; the bank rejected the request.
    Blocked,
    /// The cookie was sent and the forged transfer went through.
    Unauthorized,
}

impl CsrfOutcome {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Blocked => "Request blocked: session cookie was not sent cross-site",
            Self::Unauthorized => "Unauthorized transfer succeeded: cookie sent with cross-site request",
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfPolicyState {
    pub policy: SameSitePolicy,
    /// Simulated account balance.
    pub resource_value: u64,
    pub last_outcome: Option<CsrfOutcome>,
    pub attempts: u32,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CsrfAction {
    SetPolicy { policy: SameSitePolicy },
    SimulateCrossSiteRequest,
    Reset,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsrfSlot {
    Outcome,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfTimer {
    ClearOutcome,
}

/// CSRF attack simulator gated by the cookie's `SameSite` policy.
#[derive(Debug)]
pub struct CsrfSimulator {
    state: CsrfPolicyState,
    initial_balance: u64,
    attack_amount: u64,
    clear_after: Duration,
}

impl Default for CsrfSimulator {
    fn default() -> Self {
        Self::new(&SimConfig::default())
    }
}

impl CsrfSimulator {
    #[must_use]
    pub fn new(config: &SimConfig) -> Self {
        Self {
            state: Self::initial_state(config.csrf_initial_balance),
            initial_balance: config.csrf_initial_balance,
            attack_amount: config.csrf_attack_amount,
            clear_after: TimingConfig::ms(config.timing.csrf_outcome_clear_ms),
        }
    }

    fn initial_state(balance: u64) -> CsrfPolicyState {
        CsrfPolicyState {
            policy: SameSitePolicy::default(),
            resource_value: balance,
            last_outcome: None,
            attempts: 0,
        }
    }

    /// Changes the policy. Never touches the balance.
    pub fn set_policy(&mut self, policy: SameSitePolicy) {
        self.state.policy = policy;
    }

    /// Fires the forged request from the attacker's page.
    ///
    /// Re-arms the outcome slot every time, so rapid clicks extend the message
    /// instead of stacking clears.
    pub fn simulate_cross_site_request(&mut self, timers: &mut Timers<Self>) -> Transition {
        self.state.attempts += 1;
        let outcome = if self.state.policy.sends_cookie_cross_site() {
            self.state.resource_value = self.state.resource_value.saturating_sub(self.attack_amount);
            tracing::info!(
                policy = %self.state.policy,
                balance = self.state.resource_value,
                "forged cross-site request succeeded"
            );
            CsrfOutcome::Unauthorized
        } else {
            CsrfOutcome::Blocked
        };
        self.state.last_outcome = Some(outcome);
        timers.arm(CsrfSlot::Outcome, self.clear_after, CsrfTimer::ClearOutcome);
        Transition::Applied
    }

    /// Amount transferred away so far.
    #[must_use]
    pub const fn stolen(&self) -> u64 {
        self.initial_balance.saturating_sub(self.state.resource_value)
    }
}

impl Machine for CsrfSimulator {
    const NAME: &'static str = "csrf";

    type State = CsrfPolicyState;
    type Action = CsrfAction;
    type Slot = CsrfSlot;
    type Timer = CsrfTimer;

    fn state(&self) -> &CsrfPolicyState {
        &self.state
    }

    fn apply(&mut self, action: CsrfAction, timers: &mut Timers<Self>) -> Transition {
        match action {
            CsrfAction::SetPolicy { policy } => {
                self.set_policy(policy);
                Transition::Applied
            }
            CsrfAction::SimulateCrossSiteRequest => self.simulate_cross_site_request(timers),
            CsrfAction::Reset => {
                timers.cancel_all();
                self.reset();
                Transition::Applied
            }
        }
    }

    fn on_timer(&mut self, timer: CsrfTimer, _timers: &mut Timers<Self>) {
        match timer {
            CsrfTimer::ClearOutcome => self.state.last_outcome = None,
        }
    }

    fn reset(&mut self) {
        self.state = Self::initial_state(self.initial_balance);
    }

    fn view(&self) -> serde_json::Value {
        json!({
            "state": self.state,
            "message": self.state.last_outcome.map_or("", CsrfOutcome::message),
            "cookie_sent_cross_site": self.state.policy.sends_cookie_cross_site(),
            "set_cookie": self.state.policy.set_cookie_header(),
            "stolen": self.stolen(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::Simulator;

    fn sim() -> Simulator<CsrfSimulator> {
        Simulator::new(CsrfSimulator::default())
    }

    #[test]
    fn strict_and_lax_block_the_transfer() {
        for policy in [SameSitePolicy::Strict, SameSitePolicy::Lax] {
            let mut sim = sim();
            sim.dispatch(CsrfAction::SetPolicy { policy });
            sim.dispatch(CsrfAction::SimulateCrossSiteRequest);
            assert_eq!(sim.state().resource_value, 1000);
            assert_eq!(sim.state().last_outcome, Some(CsrfOutcome::Blocked));
        }
    }

    #[test]
    fn none_allows_the_transfer() {
        let mut sim = sim();
        sim.dispatch(CsrfAction::SetPolicy { policy: SameSitePolicy::None });
        sim.dispatch(CsrfAction::SimulateCrossSiteRequest);
        assert_eq!(sim.state().resource_value, 900);
        assert_eq!(sim.state().last_outcome, Some(CsrfOutcome::Unauthorized));
        assert_eq!(sim.machine().stolen(), 100);
    }

    #[test]
    fn outcome_clears_after_delay() {
        let mut sim = sim();
        sim.dispatch(CsrfAction::SimulateCrossSiteRequest);
        sim.advance_ms(1999);
        assert!(sim.state().last_outcome.is_some());
        sim.advance_ms(1);
        assert!(sim.state().last_outcome.is_none());
        assert_eq!(sim.view()["message"], "");
    }

    #[test]
    fn repeated_attacks_share_one_clear() {
        let mut sim = sim();
        sim.dispatch(CsrfAction::SetPolicy { policy: SameSitePolicy::None });
        sim.dispatch(CsrfAction::SimulateCrossSiteRequest);
        sim.advance_ms(1500);
        sim.dispatch(CsrfAction::SimulateCrossSiteRequest);
        assert_eq!(sim.pending_timers(), 1);

        // the first clear was superseded, so the message survives past 2000ms
        sim.advance_ms(600);
        assert_eq!(sim.state().last_outcome, Some(CsrfOutcome::Unauthorized));
        sim.advance_ms(1400);
        assert!(sim.state().last_outcome.is_none());
        assert_eq!(sim.state().resource_value, 800);
    }

    #[test]
    fn balance_saturates_at_zero() {
        let mut config = SimConfig::default();
        config.csrf_initial_balance = 150;
        let mut sim = Simulator::new(CsrfSimulator::new(&config));
        sim.dispatch(CsrfAction::SetPolicy { policy: SameSitePolicy::None });
        sim.dispatch(CsrfAction::SimulateCrossSiteRequest);
        sim.dispatch(CsrfAction::SimulateCrossSiteRequest);
        assert_eq!(sim.state().resource_value, 0);
        assert_eq!(sim.machine().stolen(), 150);
    }

    #[test]
    fn set_policy_does_not_touch_balance() {
        let mut sim = sim();
        sim.dispatch(CsrfAction::SetPolicy { policy: SameSitePolicy::None });
        sim.dispatch(CsrfAction::SetPolicy { policy: SameSitePolicy::Strict });
        assert_eq!(sim.state().resource_value, 1000);
        assert!(sim.state().last_outcome.is_none());
    }

    #[test]
    fn policy_names_parse_and_deserialize() {
        assert_eq!("none".parse::<SameSitePolicy>().unwrap(), SameSitePolicy::None);
        assert!("loose".parse::<SameSitePolicy>().is_err());

        let mut sim = sim();
        sim.dispatch_json(r#"{"action":"set_policy","policy":"None"}"#).unwrap();
        assert_eq!(sim.state().policy, SameSitePolicy::None);
        assert_eq!(sim.view()["cookie_sent_cross_site"], true);
    }

    #[test]
    fn reset_cancels_pending_clear() {
        let mut sim = sim();
        sim.dispatch(CsrfAction::SetPolicy { policy: SameSitePolicy::None });
        sim.dispatch(CsrfAction::SimulateCrossSiteRequest);
        sim.reset();
        assert_eq!(sim.pending_timers(), 0);
        assert_eq!(sim.state().resource_value, 1000);
        assert_eq!(sim.state().policy, SameSitePolicy::Lax);
    }
}
