//! Configuration types for the simulation.

use crate::error::{Error, Result};
use crate::types::{Obstacle, Position};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Arena geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena {
    /// Width of the arena in units
    pub width: i32,
    /// Height of the arena in units
    pub height: i32,
    /// Edge length of one grid cell; every position is a multiple of it
    pub cell_size: i32,
    /// Edge length of one spatial index bucket
    pub bucket_size: i32,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: 1400,
            height: 900,
            cell_size: 10,
            bucket_size: 30,
        }
    }
}

impl Arena {
    /// Largest grid-aligned x coordinate a cell may occupy
    pub fn max_x(&self) -> i32 {
        ((self.width - self.cell_size) / self.cell_size) * self.cell_size
    }

    /// Largest grid-aligned y coordinate a cell may occupy
    pub fn max_y(&self) -> i32 {
        ((self.height - self.cell_size) / self.cell_size) * self.cell_size
    }

    /// Number of grid columns
    pub fn columns(&self) -> i32 {
        self.max_x() / self.cell_size + 1
    }

    /// Number of grid rows
    pub fn rows(&self) -> i32 {
        self.max_y() / self.cell_size + 1
    }

    pub fn contains(&self, pos: Position) -> bool {
        (0..=self.max_x()).contains(&pos.x) && (0..=self.max_y()).contains(&pos.y)
    }

    pub fn clamp(&self, pos: Position) -> Position {
        Position::new(pos.x.clamp(0, self.max_x()), pos.y.clamp(0, self.max_y()))
    }

    /// Snap down to the grid, then clamp into bounds.
    pub fn snap(&self, pos: Position) -> Position {
        let cs = self.cell_size;
        self.clamp(Position::new(
            pos.x.div_euclid(cs) * cs,
            pos.y.div_euclid(cs) * cs,
        ))
    }

    pub fn center(&self) -> (f64, f64) {
        (f64::from(self.width / 2), f64::from(self.height / 2))
    }

    /// Stamina cost multiplier at `pos`: 1 at the center, rising linearly to
    /// 3 at the corners.
    pub fn energy_multiplier(&self, pos: Position) -> f32 {
        let (cx, cy) = self.center();
        let distance = (f64::from(pos.x) - cx).hypot(f64::from(pos.y) - cy);
        let max_distance = cx.hypot(cy);
        if max_distance <= 0.0 {
            return 1.0;
        }
        (1.0 + 2.0 * distance / max_distance) as f32
    }

    /// Uniformly random grid-aligned position inside the arena
    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        let x = rng.gen_range(0..self.columns()) * self.cell_size;
        let y = rng.gen_range(0..self.rows()) * self.cell_size;
        Position::new(x, y)
    }
}

/// Initial population and randomness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Cells created at reset
    pub initial_cells: usize,
    /// Food items created at reset
    pub initial_food: usize,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Attempts to find a free spot for each reset-time cell
    pub placement_attempts: u32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial_cells: 50,
            initial_food: 200,
            seed: 0,
            placement_attempts: 100,
        }
    }
}

/// Vital stat caps and per-tick resource flows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalsConfig {
    pub max_hp: f32,
    pub max_stamina: f32,
    pub max_hunger: f32,
    pub initial_hp: f32,
    pub initial_stamina: f32,
    pub initial_hunger: f32,
    /// Base stamina paid for each movement attempt, before the energy multiplier
    pub stamina_per_step: f32,
    /// Stamina regenerated per tick while resting or below the cap
    pub idle_stamina_gain: f32,
    /// Hunger drained by every `move_towards` call, blocked or not
    pub idle_hunger_consumption: f32,
    /// Hunger drained by each status update
    pub hunger_per_tick: f32,
    pub max_age: u32,
    pub initial_mortality_chance: f64,
    /// Added to the mortality chance every tick past the aging threshold
    pub mortality_increment: f64,
    /// Fraction of `max_age` after which mortality starts rising
    pub aging_threshold: f64,
    /// At or below this hunger a cell forages
    pub forage_threshold: f32,
    /// Minimum hp for a cell to go looking for a mate
    pub mate_hp_threshold: f32,
    /// hp lost per status update while hunger is at or below zero
    pub starvation_penalty: f32,
    /// hp gained per status update while hunger is at or above `recovery_threshold`
    pub recovery_bonus: f32,
    pub recovery_threshold: f32,
    /// Also apply the (smaller) pre-movement hp adjustment inside behavior
    pub legacy_behavior_hp_adjustment: bool,
    pub behavior_starvation_penalty: f32,
    pub behavior_recovery_threshold: f32,
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            max_hp: 100.0,
            max_stamina: 150.0,
            max_hunger: 150.0,
            initial_hp: 100.0,
            initial_stamina: 150.0,
            initial_hunger: 120.0,
            stamina_per_step: 0.25,
            idle_stamina_gain: 0.5,
            idle_hunger_consumption: 0.1,
            hunger_per_tick: 1.0,
            max_age: 1400,
            initial_mortality_chance: 0.0,
            mortality_increment: 0.0001,
            aging_threshold: 0.7,
            forage_threshold: 90.0,
            mate_hp_threshold: 90.0,
            starvation_penalty: 1.0,
            recovery_bonus: 1.0,
            recovery_threshold: 100.0,
            legacy_behavior_hp_adjustment: false,
            behavior_starvation_penalty: 0.5,
            behavior_recovery_threshold: 90.0,
        }
    }
}

/// Mating protocol costs, timings and inheritance rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatingConfig {
    pub stamina_cost: f32,
    pub hunger_cost: f32,
    /// Refractory period for both parents after a completed mating
    pub cooldown: u32,
    /// Gestation length in ticks
    pub duration: u32,
    /// Refractory period for newborns and reset-time cells
    pub newborn_cooldown: u32,
    pub min_offspring: u32,
    pub max_offspring: u32,
    /// Placement attempts per offspring before it is dropped
    pub placement_retries: u32,
    pub speed_floor: i32,
    pub modifier_floor: i32,
    /// Speed mutation is drawn from `-speed_mutation..=speed_mutation`
    pub speed_mutation: i32,
    /// Stat modifier mutation is drawn from `-modifier_mutation..=modifier_mutation`
    pub modifier_mutation: i32,
}

impl Default for MatingConfig {
    fn default() -> Self {
        Self {
            stamina_cost: 90.0,
            hunger_cost: 30.0,
            cooldown: 400,
            duration: 240,
            newborn_cooldown: 160,
            min_offspring: 1,
            max_offspring: 3,
            placement_retries: 10,
            speed_floor: 1,
            modifier_floor: 10,
            speed_mutation: 1,
            modifier_mutation: 2,
        }
    }
}

/// Food economy tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodConfig {
    /// Base respawn probability per tick above the floor
    pub respawn_rate: f64,
    /// At or below this count a spawn is guaranteed every tick
    pub min_food: usize,
    /// Hard ceiling on the food collection
    pub max_food: usize,
    /// Hunger restored by one food item
    pub food_gain: f32,
    /// Stamina granted when a full cell touches food
    pub stamina_gain: f32,
    /// Attempts to find an obstacle-free spot before giving up for the tick
    pub placement_retries: u32,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            respawn_rate: 0.3,
            min_food: 50,
            max_food: 300,
            food_gain: 45.0,
            stamina_gain: 45.0,
            placement_retries: 32,
        }
    }
}

/// Random obstacle layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleConfig {
    pub count: usize,
    pub min_side: i32,
    pub max_width: i32,
    pub max_height: i32,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            count: 10,
            min_side: 20,
            max_width: 100,
            max_height: 100,
        }
    }
}

impl ObstacleConfig {
    /// Generate a random layout of rectangles fully inside the arena
    pub fn generate<R: Rng + ?Sized>(&self, arena: &Arena, rng: &mut R) -> Vec<Obstacle> {
        let mut obstacles = Vec::with_capacity(self.count);
        for _ in 0..self.count {
            let width = rng.gen_range(self.min_side..=self.max_width.max(self.min_side));
            let height = rng.gen_range(self.min_side..=self.max_height.max(self.min_side));
            let width = width.min(arena.width);
            let height = height.min(arena.height);
            let x = rng.gen_range(0..=arena.width - width);
            let y = rng.gen_range(0..=arena.height - height);
            obstacles.push(Obstacle::new(x, y, width, height));
        }
        obstacles
    }
}

/// Complete simulation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub arena: Arena,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub vitals: VitalsConfig,
    #[serde(default)]
    pub mating: MatingConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub obstacles: ObstacleConfig,
}

impl SimConfig {
    /// Parse a configuration from JSON, filling absent sections with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let arena = &self.arena;
        if arena.cell_size <= 0 {
            return Err(Error::InvalidConfig("cell_size must be positive".into()));
        }
        if arena.bucket_size <= 0 {
            return Err(Error::InvalidConfig("bucket_size must be positive".into()));
        }
        if arena.width < arena.cell_size || arena.height < arena.cell_size {
            return Err(Error::InvalidConfig(format!(
                "arena {}x{} is smaller than one cell of size {}",
                arena.width, arena.height, arena.cell_size
            )));
        }
        if self.food.min_food > self.food.max_food {
            return Err(Error::InvalidConfig(format!(
                "min_food {} exceeds max_food {}",
                self.food.min_food, self.food.max_food
            )));
        }
        if self.population.initial_food > self.food.max_food {
            return Err(Error::InvalidConfig(format!(
                "initial_food {} exceeds max_food {}",
                self.population.initial_food, self.food.max_food
            )));
        }
        if self.mating.min_offspring > self.mating.max_offspring {
            return Err(Error::InvalidConfig(
                "min_offspring exceeds max_offspring".into(),
            ));
        }
        if self.vitals.max_hp <= 0.0 || self.vitals.max_stamina <= 0.0 || self.vitals.max_hunger <= 0.0 {
            return Err(Error::InvalidConfig("stat caps must be positive".into()));
        }
        if self.obstacles.min_side <= 0 {
            return Err(Error::InvalidConfig("obstacle min_side must be positive".into()));
        }
        Ok(())
    }
}
