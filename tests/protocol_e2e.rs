use scenario_sim::protocols::{
    Actor, CsrfAction, CsrfOutcome, CsrfSimulator, ExploitAction, ExploitSimulator, LogLevel, OAuthAction,
    OAuthStep, OAuthStepper, PayloadKind, SameSitePolicy, ServerStatus,
};
use scenario_sim::{SimConfig, Simulator};

fn csrf() -> Simulator<CsrfSimulator> {
    Simulator::new(CsrfSimulator::new(&SimConfig::default()))
}

#[test]
fn csrf_lax_and_strict_block_the_forged_request() {
    for policy in [SameSitePolicy::Lax, SameSitePolicy::Strict] {
        let mut sim = csrf();
        sim.dispatch(CsrfAction::SetPolicy { policy });
        sim.dispatch(CsrfAction::SimulateCrossSiteRequest);
        assert_eq!(sim.state().resource_value, 1000);
        assert_eq!(sim.state().last_outcome, Some(CsrfOutcome::Blocked));
        assert_eq!(sim.view()["cookie_sent_cross_site"], false);
    }
}

#[test]
fn csrf_samesite_none_drains_balance_to_zero() {
    let mut sim = csrf();
    sim.dispatch(CsrfAction::SetPolicy { policy: SameSitePolicy::None });

    for expected in (0..10).rev().map(|n| n * 100) {
        sim.dispatch(CsrfAction::SimulateCrossSiteRequest);
        assert_eq!(sim.state().resource_value, expected);
    }
    assert_eq!(sim.state().last_outcome, Some(CsrfOutcome::Unauthorized));

    // Saturates instead of underflowing.
    sim.dispatch(CsrfAction::SimulateCrossSiteRequest);
    assert_eq!(sim.state().resource_value, 0);
    assert_eq!(sim.machine().stolen(), 1000);
    assert_eq!(sim.state().attempts, 11);
}

#[test]
fn csrf_policy_change_keeps_balance() {
    let mut sim = csrf();
    sim.dispatch(CsrfAction::SetPolicy { policy: SameSitePolicy::None });
    sim.dispatch(CsrfAction::SimulateCrossSiteRequest);
    sim.dispatch(CsrfAction::SetPolicy { policy: SameSitePolicy::Strict });
    assert_eq!(sim.state().resource_value, 900);
    sim.dispatch(CsrfAction::SimulateCrossSiteRequest);
    assert_eq!(sim.state().resource_value, 900);
}

#[test]
fn csrf_rapid_clicks_extend_the_message() {
    let mut sim = csrf();
    sim.dispatch(CsrfAction::SimulateCrossSiteRequest);
    sim.advance_ms(1500);
    sim.dispatch(CsrfAction::SimulateCrossSiteRequest);
    assert_eq!(sim.pending_timers(), 1);

    // First clear would have fired at 2000; re-arm pushed it to 3500.
    sim.advance_ms(1000);
    assert_eq!(sim.state().last_outcome, Some(CsrfOutcome::Blocked));
    assert_eq!(sim.advance_ms(1000), 1);
    assert!(sim.state().last_outcome.is_none());
}

#[test]
fn csrf_json_policy_names() {
    let mut sim = csrf();
    sim.dispatch_json(r#"{"action":"set_policy","policy":"Strict"}"#).unwrap();
    assert_eq!(sim.state().policy, SameSitePolicy::Strict);
    assert_eq!(sim.view()["set_cookie"], "Set-Cookie: session=abc123; SameSite=Strict");
    assert!("Loose".parse::<SameSitePolicy>().is_err());
}

#[test]
fn oauth_walks_the_authorization_code_flow() {
    let mut sim = Simulator::new(OAuthStepper::default());
    assert!(sim.machine().is_first());
    assert!(sim.dispatch(OAuthAction::Previous).is_ignored());

    let mut seen = vec![sim.machine().current()];
    while sim.dispatch(OAuthAction::Next).is_applied() {
        seen.push(sim.machine().current());
    }
    assert_eq!(seen, OAuthStep::SEQUENCE.to_vec());
    assert!(sim.machine().is_last());
    assert_eq!(sim.state().step_index, OAuthStep::SEQUENCE.len() - 1);

    let consent = OAuthStep::SEQUENCE[1];
    assert_eq!(consent.from_actor(), Actor::User);
    assert_eq!(OAuthStep::SEQUENCE[0].from_actor(), Actor::Client);
    assert!(OAuthStep::SEQUENCE.iter().all(|s| !s.message().is_empty()));

    sim.dispatch(OAuthAction::Previous);
    assert_eq!(sim.state().step_index, OAuthStep::SEQUENCE.len() - 2);
    sim.dispatch(OAuthAction::Reset);
    assert_eq!(sim.state().step_index, 0);
}

fn exploit() -> Simulator<ExploitSimulator> {
    Simulator::new(ExploitSimulator::new(&SimConfig::default()))
}

#[test]
fn exploit_unpatched_server_is_compromised_then_shell_appears() {
    let mut sim = exploit();
    sim.dispatch(ExploitAction::SetPayloadKind { payload_kind: PayloadKind::Malicious });
    assert!(sim.dispatch(ExploitAction::Send).is_applied());
    assert_eq!(sim.view()["send_enabled"], false);

    sim.advance_ms(1600);
    assert_eq!(sim.state().server_status, ServerStatus::Compromised);
    assert!(!sim.state().shell_revealed);
    assert!(sim.state().log_lines.iter().any(|l| l.level == LogLevel::Critical));

    sim.advance_ms(500);
    assert!(sim.state().shell_revealed);
    assert_eq!(sim.pending_timers(), 0);
    assert_eq!(sim.view()["send_enabled"], true);
}

#[test]
fn exploit_settings_are_captured_at_send_time() {
    let mut sim = exploit();
    sim.dispatch(ExploitAction::SetPayloadKind { payload_kind: PayloadKind::Malicious });
    sim.dispatch(ExploitAction::Send);

    // Patching mid-flight does not save this request.
    sim.advance_ms(400);
    sim.dispatch(ExploitAction::SetPatched { patched: true });
    sim.advance_ms(1200);
    assert_eq!(sim.state().server_status, ServerStatus::Compromised);

    // The next request sees the patch.
    sim.dispatch(ExploitAction::Send);
    sim.advance_ms(5000);
    assert_eq!(sim.state().server_status, ServerStatus::Safe);
    assert!(!sim.state().shell_revealed);
}

#[test]
fn exploit_send_while_processing_is_ignored() {
    let mut sim = exploit();
    sim.dispatch(ExploitAction::Send);
    sim.advance_ms(100);
    assert!(sim.dispatch(ExploitAction::Send).is_ignored());
    assert_eq!(sim.pending_timers(), 1);
}

#[test]
fn exploit_resend_cancels_pending_reveal() {
    let mut sim = exploit();
    sim.dispatch(ExploitAction::SetPayloadKind { payload_kind: PayloadKind::Malicious });
    sim.dispatch(ExploitAction::Send);
    sim.advance_ms(1600);
    assert!(!sim.machine().is_busy());

    sim.dispatch(ExploitAction::SetPayloadKind { payload_kind: PayloadKind::Benign });
    sim.dispatch(ExploitAction::Send);
    sim.advance_ms(5000);
    assert_eq!(sim.state().server_status, ServerStatus::Safe);
    assert!(!sim.state().shell_revealed);
}

#[test]
fn exploit_log_is_bounded() {
    let mut config = SimConfig::default();
    config.exploit_log_capacity = 3;
    let mut sim = Simulator::new(ExploitSimulator::new(&config));
    sim.dispatch(ExploitAction::SetPayloadKind { payload_kind: PayloadKind::Malicious });
    sim.dispatch(ExploitAction::Send);
    sim.advance_ms(5000);
    assert_eq!(sim.state().log_lines.len(), 3);
    assert!(sim.state().shell_revealed);
}

#[test]
fn exploit_reset_mid_flight_returns_to_idle() {
    let mut sim = exploit();
    sim.dispatch(ExploitAction::SetPayloadKind { payload_kind: PayloadKind::Malicious });
    sim.dispatch(ExploitAction::Send);
    sim.advance_ms(900);
    sim.reset();
    assert_eq!(sim.advance_ms(10_000), 0);
    assert_eq!(sim.state().server_status, ServerStatus::Idle);
    assert!(sim.state().log_lines.is_empty());
}
