//! Builder assembly: a chair configured step by step, then frozen.
//!
//! Parts and finish can change only while the assembly is open. `Legs` and
//! `Wheels` are mutually exclusive: whichever is selected first disables the
//! other. Finalizing needs at least one part and makes the assembly immutable
//! until reset.
//!
//! The recipe shown next to the widget is derived from state on every call
//! and never stored.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::fsm::{Machine, NoTimer, Timers, Transition};

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartKind {
    Frame,
    Seat,
    Backrest,
    Legs,
    Wheels,
    Armrests,
}

impl PartKind {
    /// Every part, in recipe order.
    pub const ALL: [Self; 6] = [
        Self::Frame,
        Self::Seat,
        Self::Backrest,
        Self::Legs,
        Self::Wheels,
        Self::Armrests,
    ];

    /// The part that cannot coexist with this one.
    #[must_use]
    pub const fn conflicts_with(self) -> Option<Self> {
        match self {
            Self::Legs => Some(Self::Wheels),
            Self::Wheels => Some(Self::Legs),
            _ => None,
        }
    }

    const fn builder_method(self) -> &'static str {
        match self {
            Self::Frame => "with_frame()",
            Self::Seat => "with_seat()",
            Self::Backrest => "with_backrest()",
            Self::Legs => "with_legs(4)",
            Self::Wheels => "with_wheels(5)",
            Self::Armrests => "with_armrests()",
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Finish {
    #[default]
    Natural,
    Walnut,
    Ebony,
}

impl fmt::Display for Finish {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Natural => write!(f, "Natural"),
            Self::Walnut => write!(f, "Walnut"),
            Self::Ebony => write!(f, "Ebony"),
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderState {
    pub selected_parts: BTreeSet<PartKind>,
    pub finish: Finish,
    pub is_finalized: bool,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BuilderAction {
    AddPart { part: PartKind },
    SetFinish { finish: Finish },
    Finalize,
    Reset,
}

/// Multi-step assembly with mutually exclusive parts.
#[derive(Debug, Default)]
pub struct BuilderAssembly {
    state: BuilderState,
}

impl BuilderAssembly {
    /// Adds a part unless finalized, already present, or in conflict.
    pub fn add_part(&mut self, part: PartKind) -> Transition {
        if self.state.is_finalized {
            return Transition::ignored("assembly is finalized");
        }
        if self.state.selected_parts.contains(&part) {
            return Transition::ignored("part already selected");
        }
        if part
            .conflicts_with()
            .is_some_and(|other| self.state.selected_parts.contains(&other))
        {
            return Transition::ignored("conflicting part selected");
        }
        self.state.selected_parts.insert(part);
        Transition::Applied
    }

    pub fn set_finish(&mut self, finish: Finish) -> Transition {
        if self.state.is_finalized {
            return Transition::ignored("assembly is finalized");
        }
        self.state.finish = finish;
        Transition::Applied
    }

    pub fn finalize(&mut self) -> Transition {
        if self.state.is_finalized {
            return Transition::ignored("assembly is finalized");
        }
        if self.state.selected_parts.is_empty() {
            return Transition::ignored("no parts selected");
        }
        self.state.is_finalized = true;
        Transition::Applied
    }

    /// Whether `add_part(part)` would currently succeed.
    #[must_use]
    pub fn is_part_available(&self, part: PartKind) -> bool {
        !self.state.is_finalized
            && !self.state.selected_parts.contains(&part)
            && !part
                .conflicts_with()
                .is_some_and(|other| self.state.selected_parts.contains(&other))
    }

    #[must_use]
    pub fn available_parts(&self) -> Vec<PartKind> {
        PartKind::ALL
            .into_iter()
            .filter(|p| self.is_part_available(*p))
            .collect()
    }

    /// Human-readable builder calls reproducing the current state.
    #[must_use]
    pub fn recipe(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.state.selected_parts.len() + 3);
        lines.push("let chair = ChairBuilder::new()".to_string());
        for part in &self.state.selected_parts {
            lines.push(format!("    .{}", part.builder_method()));
        }
        lines.push(format!("    .finish(Finish::{})", self.state.finish));
        if self.state.is_finalized {
            lines.push("    .build();".to_string());
        } else {
            lines.push("    // .build() not called yet".to_string());
        }
        lines
    }
}

impl Machine for BuilderAssembly {
    const NAME: &'static str = "builder";

    type State = BuilderState;
    type Action = BuilderAction;
    type Slot = NoTimer;
    type Timer = NoTimer;

    fn state(&self) -> &BuilderState {
        &self.state
    }

    fn apply(&mut self, action: BuilderAction, timers: &mut Timers<Self>) -> Transition {
        match action {
            BuilderAction::AddPart { part } => self.add_part(part),
            BuilderAction::SetFinish { finish } => self.set_finish(finish),
            BuilderAction::Finalize => self.finalize(),
            BuilderAction::Reset => {
                timers.cancel_all();
                self.reset();
                Transition::Applied
            }
        }
    }

    fn on_timer(&mut self, timer: NoTimer, _timers: &mut Timers<Self>) {
        match timer {}
    }

    fn reset(&mut self) {
        self.state = BuilderState::default();
    }

    fn view(&self) -> serde_json::Value {
        json!({
            "state": self.state,
            "available_parts": self.available_parts(),
            "recipe": self.recipe(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legs_and_wheels_are_exclusive() {
        let mut b = BuilderAssembly::default();
        assert!(b.add_part(PartKind::Wheels).is_applied());
        assert!(!b.is_part_available(PartKind::Legs));
        assert_eq!(
            b.add_part(PartKind::Legs),
            Transition::ignored("conflicting part selected")
        );
        assert!(!b.state.selected_parts.contains(&PartKind::Legs));

        let mut b = BuilderAssembly::default();
        b.add_part(PartKind::Legs);
        assert!(b.add_part(PartKind::Wheels).is_ignored());
    }

    #[test]
    fn duplicate_part_is_noop() {
        let mut b = BuilderAssembly::default();
        b.add_part(PartKind::Seat);
        assert!(b.add_part(PartKind::Seat).is_ignored());
        assert_eq!(b.state.selected_parts.len(), 1);
    }

    #[test]
    fn finalize_requires_a_part() {
        let mut b = BuilderAssembly::default();
        assert!(b.finalize().is_ignored());
        assert!(!b.state.is_finalized);

        b.add_part(PartKind::Frame);
        assert!(b.finalize().is_applied());
        assert!(b.state.is_finalized);
        assert!(b.finalize().is_ignored());
    }

    #[test]
    fn finalized_assembly_is_frozen() {
        let mut b = BuilderAssembly::default();
        b.add_part(PartKind::Frame);
        b.set_finish(Finish::Walnut);
        b.finalize();

        let frozen = b.state.clone();
        assert!(b.add_part(PartKind::Seat).is_ignored());
        assert!(b.set_finish(Finish::Ebony).is_ignored());
        assert_eq!(b.state, frozen);
        assert!(b.available_parts().is_empty());

        b.reset();
        assert_eq!(b.state, BuilderState::default());
    }

    #[test]
    fn recipe_tracks_state() {
        let mut b = BuilderAssembly::default();
        b.add_part(PartKind::Wheels);
        b.add_part(PartKind::Frame);
        b.set_finish(Finish::Ebony);

        let recipe = b.recipe();
        assert_eq!(recipe[0], "let chair = ChairBuilder::new()");
        assert_eq!(recipe[1], "    .with_frame()");
        assert_eq!(recipe[2], "    .with_wheels(5)");
        assert_eq!(recipe[3], "    .finish(Finish::Ebony)");
        assert!(recipe[4].contains("not called"));

        b.finalize();
        assert_eq!(b.recipe().last().unwrap(), "    .build();");
    }
}
