// Property-based tests for simulator invariants
//
// 1. Singleton hands out exactly one instance per lifetime
// 2. OAuth step index stays inside the flow
// 3. Builder never holds legs and wheels together, and finalize freezes it
// 4. Scheduler slots are last-write-wins
// 5. CSRF balance never grows and never underflows

use std::collections::HashMap;
use std::time::Duration;

use proptest::prelude::*;

use scenario_sim::patterns::{BuilderAction, BuilderAssembly, PartKind, SingletonAction, SingletonRegistry};
use scenario_sim::protocols::{CsrfAction, CsrfSimulator, OAuthAction, OAuthStep, OAuthStepper, SameSitePolicy};
use scenario_sim::{SimConfig, Simulator, TransitionScheduler};

fn part_strategy() -> impl Strategy<Value = PartKind> {
    prop::sample::select(PartKind::ALL.to_vec())
}

fn builder_action_strategy() -> impl Strategy<Value = BuilderAction> {
    prop_oneof![
        6 => part_strategy().prop_map(|part| BuilderAction::AddPart { part }),
        1 => Just(BuilderAction::Finalize),
    ]
}

fn oauth_action_strategy() -> impl Strategy<Value = OAuthAction> {
    prop_oneof![Just(OAuthAction::Next), Just(OAuthAction::Previous)]
}

fn csrf_action_strategy() -> impl Strategy<Value = CsrfAction> {
    prop_oneof![
        prop::sample::select(vec![SameSitePolicy::Strict, SameSitePolicy::Lax, SameSitePolicy::None])
            .prop_map(|policy| CsrfAction::SetPolicy { policy }),
        Just(CsrfAction::SimulateCrossSiteRequest),
    ]
}

proptest! {
    #[test]
    fn singleton_is_idempotent(calls in 1usize..50) {
        let mut sim = Simulator::new(SingletonRegistry::default());
        for _ in 0..calls {
            sim.dispatch(SingletonAction::GetInstance);
        }
        let token = sim.state().instance.unwrap();
        prop_assert_eq!(sim.state().history.len(), calls);
        prop_assert!(sim.state().history.iter().all(|e| e.token == token));
        prop_assert_eq!(sim.machine().instance_count(), 1);
    }

    #[test]
    fn oauth_index_stays_in_bounds(actions in prop::collection::vec(oauth_action_strategy(), 0..60)) {
        let mut sim = Simulator::new(OAuthStepper::default());
        let last = OAuthStep::SEQUENCE.len() - 1;
        let mut expected = 0usize;
        for action in actions {
            expected = match action {
                OAuthAction::Next => (expected + 1).min(last),
                OAuthAction::Previous => expected.saturating_sub(1),
                OAuthAction::Reset => 0,
            };
            sim.dispatch(action);
            prop_assert_eq!(sim.state().step_index, expected);
        }
    }

    #[test]
    fn builder_respects_exclusions(actions in prop::collection::vec(builder_action_strategy(), 0..40)) {
        let mut sim = Simulator::new(BuilderAssembly::default());
        for action in actions {
            let before = sim.state().clone();
            sim.dispatch(action);
            let parts = &sim.state().selected_parts;
            prop_assert!(!(parts.contains(&PartKind::Legs) && parts.contains(&PartKind::Wheels)));
            if before.is_finalized {
                prop_assert_eq!(&before, sim.state());
            }
        }
    }

    #[test]
    fn scheduler_slots_are_last_write_wins(
        arms in prop::collection::vec((0u8..4, 1u64..500, any::<u32>()), 1..40)
    ) {
        let mut timers: TransitionScheduler<u8, u32> = TransitionScheduler::new();
        let mut latest = HashMap::new();
        for (slot, delay, value) in arms {
            timers.arm(slot, Duration::from_millis(delay), value);
            latest.insert(slot, value);
        }
        prop_assert_eq!(timers.pending(), latest.len());

        let mut fired = HashMap::new();
        let count = timers.advance(Duration::from_millis(1_000), |_, slot, value| {
            fired.insert(slot, value);
        });
        prop_assert_eq!(count, latest.len());
        prop_assert_eq!(fired, latest);
        prop_assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn csrf_balance_is_monotonic(actions in prop::collection::vec(csrf_action_strategy(), 0..40)) {
        let config = SimConfig::default();
        let mut sim = Simulator::new(CsrfSimulator::new(&config));
        let mut previous = sim.state().resource_value;
        for action in actions {
            sim.dispatch(action);
            let balance = sim.state().resource_value;
            prop_assert!(balance <= previous);
            prop_assert_eq!(balance % config.csrf_attack_amount, 0);
            previous = balance;
        }
        prop_assert_eq!(sim.machine().stolen() + previous, config.csrf_initial_balance);
    }
}
