//! Design-pattern visualizers.
//!
//! Singleton, Factory and Builder are purely synchronous. Observer and
//! Strategy use the scheduler for their timed visual stages.

pub mod builder;
pub mod factory;
pub mod observer;
pub mod singleton;
pub mod strategy;

pub use builder::{BuilderAction, BuilderAssembly, BuilderState, Finish, PartKind};
pub use factory::{FactoryAction, FactoryState, FactoryStore, ItemId, Product, ShapeKind};
pub use observer::{
	ObserverAction, ObserverBroadcast, ObserverSlot, ObserverState, ObserverTimer, Subscriber,
	SubscriberId,
};
pub use singleton::{HistoryEntry, HistoryKind, InstanceToken, SingletonAction, SingletonRegistry, SingletonState};
pub use strategy::{
	Phase, PaymentStrategy, Receipt, StrategyAction, StrategyContext, StrategySlot, StrategyState,
	StrategyTimer,
};
