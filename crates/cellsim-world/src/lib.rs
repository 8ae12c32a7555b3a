//! Simulation engine.
//!
//! This module implements the bounded arena where cells forage, mate, age
//! and die, one deterministic tick at a time.

pub mod spatial;
pub mod cell;
pub mod behavior;
pub mod food;
pub mod mating;
pub mod events;
pub mod history;
pub mod simulation;

pub use spatial::SpatialIndex;
pub use cell::{Behavior, Cell, Traits};
pub use food::FoodEconomy;
pub use events::{DeathCause, SimEvent, TickReport};
pub use history::{HistorySample, PopulationHistory};
pub use simulation::{CellView, RunSummary, Simulation, WorldSnapshot};
