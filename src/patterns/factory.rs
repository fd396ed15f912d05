//! Factory store: a growing collection of produced shapes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::fsm::{Machine, NoTimer, Timers, Transition};

/// Unique identifier for a produced item.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Create a new random item id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kinds the factory knows how to produce.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Circle,
    Square,
    Triangle,
}

impl ShapeKind {
    /// Every supported kind, in display order.
    pub const ALL: [Self; 3] = [Self::Circle, Self::Square, Self::Triangle];

    /// Colour used when `create` is called without an attribute.
    #[must_use]
    pub const fn default_attribute(self) -> &'static str {
        match self {
            Self::Circle => "red",
            Self::Square => "blue",
            Self::Triangle => "green",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Circle => write!(f, "circle"),
            Self::Square => write!(f, "square"),
            Self::Triangle => write!(f, "triangle"),
        }
    }
}

impl FromStr for ShapeKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownVariant {
                kind: "shape",
                value: s.to_string(),
            })
    }
}

/// A produced item. Never mutated after creation.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ItemId,
    pub kind: ShapeKind,
    pub attribute: String,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryState {
    /// Creation order.
    pub items: Vec<Product>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FactoryAction {
    Create {
        kind: ShapeKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute: Option<String>,
    },
    Reset,
}

/// Append-only store of shapes produced by the factory.
#[derive(Debug, Default)]
pub struct FactoryStore {
    state: FactoryState,
}

impl FactoryStore {
    /// Produces a new item and returns its id.
    ///
    /// A missing or blank attribute falls back to the kind's default colour.
    pub fn create(&mut self, kind: ShapeKind, attribute: Option<String>) -> ItemId {
        let attribute = attribute
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| kind.default_attribute().to_string());
        let id = ItemId::new();
        self.state.items.push(Product { id, kind, attribute });
        id
    }

    /// Items in creation order.
    #[must_use]
    pub fn list(&self) -> &[Product] {
        &self.state.items
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.state.items.len()
    }

    /// Items of one kind, still in creation order.
    pub fn items_of(&self, kind: ShapeKind) -> impl Iterator<Item = &Product> + '_ {
        self.state.items.iter().filter(move |p| p.kind == kind)
    }
}

impl Machine for FactoryStore {
    const NAME: &'static str = "factory";

    type State = FactoryState;
    type Action = FactoryAction;
    type Slot = NoTimer;
    type Timer = NoTimer;

    fn state(&self) -> &FactoryState {
        &self.state
    }

    fn apply(&mut self, action: FactoryAction, timers: &mut Timers<Self>) -> Transition {
        match action {
            FactoryAction::Create { kind, attribute } => {
                self.create(kind, attribute);
            }
            FactoryAction::Reset => {
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
        self.state = FactoryState::default();
    }

    fn view(&self) -> serde_json::Value {
        let counts: serde_json::Map<String, serde_json::Value> = ShapeKind::ALL
            .into_iter()
            .map(|kind| (kind.to_string(), json!(self.items_of(kind).count())))
            .collect();
        json!({
            "state": self.state,
            "count": self.count(),
            "by_kind": counts,
        })
    }
}
