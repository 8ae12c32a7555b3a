//! Aggregate statistics over the live population.

use serde::{Deserialize, Serialize};

/// Read-only counters handed to the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub tick: u64,
    pub population: usize,
    pub food: usize,
    pub highest_generation: u32,
    pub mating_cells: usize,
    pub avg_hunger: f64,
    pub avg_stamina: f64,
    pub avg_hp: f64,
    pub avg_age: f64,
}

/// Running totals since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub births: u64,
    pub deaths: u64,
    pub matings_started: u64,
    pub matings_completed: u64,
    pub offspring_dropped: u64,
    pub food_spawned: u64,
    pub food_eaten: u64,
}

/// Incremental mean accumulator used to build [`PopulationStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsAccumulator {
    count: usize,
    mating: usize,
    highest_generation: u32,
    avg_hunger: f64,
    avg_stamina: f64,
    avg_hp: f64,
    avg_age: f64,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, hp: f32, hunger: f32, stamina: f32, age: u32, generation: u32, mating: bool) {
        let n = self.count as f64;
        let new_n = n + 1.0;

        self.avg_hp = (self.avg_hp * n + f64::from(hp)) / new_n;
        self.avg_hunger = (self.avg_hunger * n + f64::from(hunger)) / new_n;
        self.avg_stamina = (self.avg_stamina * n + f64::from(stamina)) / new_n;
        self.avg_age = (self.avg_age * n + f64::from(age)) / new_n;
        self.highest_generation = self.highest_generation.max(generation);
        if mating {
            self.mating += 1;
        }
        self.count += 1;
    }

    pub fn finish(self, tick: u64, food: usize) -> PopulationStats {
        PopulationStats {
            tick,
            population: self.count,
            food,
            highest_generation: self.highest_generation,
            mating_cells: self.mating,
            avg_hunger: self.avg_hunger,
            avg_stamina: self.avg_stamina,
            avg_hp: self.avg_hp,
            avg_age: self.avg_age,
        }
    }
}
