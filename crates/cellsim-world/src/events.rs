//! Structured event stream emitted by each tick.

use cellsim_core::{CellId, Position};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    /// hp drained to zero by hunger or resource depletion
    Starvation,
    /// Failed the per-tick mortality roll
    Age,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    CellBorn {
        id: CellId,
        parents: Option<(CellId, CellId)>,
        generation: u32,
        position: Position,
    },
    CellDied {
        id: CellId,
        cause: DeathCause,
        age: u32,
        generation: u32,
    },
    MatingStarted {
        first: CellId,
        second: CellId,
    },
    /// A pair fell apart before gestation finished
    MatingAbandoned {
        id: CellId,
    },
    MatingCompleted {
        first: CellId,
        second: CellId,
        offspring: usize,
    },
    /// An offspring found no free spot within its retry budget
    OffspringDropped {
        parent: CellId,
    },
    FoodSpawned {
        position: Position,
    },
    FoodEaten {
        by: CellId,
        position: Position,
    },
}

/// Everything that happened during one committed tick
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub births: usize,
    pub deaths: usize,
    pub events: Vec<SimEvent>,
}

impl TickReport {
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            ..Default::default()
        }
    }

    pub fn push(&mut self, event: SimEvent) {
        match event {
            SimEvent::CellBorn { .. } => self.births += 1,
            SimEvent::CellDied { .. } => self.deaths += 1,
            _ => {}
        }
        self.events.push(event);
    }

    pub fn mating_completed(&self) -> impl Iterator<Item = (CellId, CellId, usize)> + '_ {
        self.events.iter().filter_map(|e| match e {
            SimEvent::MatingCompleted {
                first,
                second,
                offspring,
            } => Some((*first, *second, *offspring)),
            _ => None,
        })
    }
}
