//! Web-security protocol simulators.
//!
//! Nothing here touches a network or real cryptography. Servers, browsers and
//! attackers are modelled locally, and a successful attack is a valid outcome.

pub mod csrf;
pub mod exploit;
pub mod oauth;

pub use csrf::{CsrfAction, CsrfOutcome, CsrfPolicyState, CsrfSimulator, CsrfSlot, CsrfTimer, SameSitePolicy};
pub use exploit::{
	ExploitAction, ExploitSimState, ExploitSimulator, ExploitSlot, ExploitTimer, LogLevel, LogLine,
	PayloadKind, ServerStatus,
};
pub use oauth::{Actor, OAuthAction, OAuthFlowState, OAuthStep, OAuthStepper};
