//! Simulation engine: owns the population, food and index, and advances
//! them one committed tick at a time.

use crate::behavior::{self, WorldView};
use crate::cell::{Behavior, Cell, Terrain, Traits};
use crate::events::{DeathCause, SimEvent, TickReport};
use crate::food::FoodEconomy;
use crate::history::{HistorySample, PopulationHistory};
use crate::mating::{self, Progress};
use crate::spatial::SpatialIndex;
use cellsim_core::{
    blocked_by_obstacle, CellId, Obstacle, Parameter, PopulationStats, Position, Result,
    SimConfig, StatsAccumulator, Totals,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, trace, warn};

const METRICS_INTERVAL: u64 = 1000;

pub struct Simulation {
    config: SimConfig,
    rng: ChaCha8Rng,
    tick: u64,
    next_id: u64,
    cells: BTreeMap<CellId, Cell>,
    index: SpatialIndex,
    food: FoodEconomy,
    obstacles: Vec<Obstacle>,
    history: PopulationHistory,
    totals: Totals,
}

impl Simulation {
    /// Build a world from `config` with a fixed obstacle layout, then place
    /// the initial population and food.
    pub fn new(config: SimConfig, obstacles: Vec<Obstacle>) -> Result<Self> {
        config.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.population.seed);
        Ok(Self::build(config, obstacles, rng))
    }

    /// Like [`Simulation::new`], with obstacles drawn from the seeded stream.
    pub fn with_random_obstacles(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.population.seed);
        let obstacles = config.obstacles.generate(&config.arena, &mut rng);
        Ok(Self::build(config, obstacles, rng))
    }

    fn build(config: SimConfig, obstacles: Vec<Obstacle>, rng: ChaCha8Rng) -> Self {
        let index = SpatialIndex::new(&config.arena);
        let (cells, food) = (config.population.initial_cells, config.population.initial_food);

        let mut sim = Self {
            config,
            rng,
            tick: 0,
            next_id: 0,
            cells: BTreeMap::new(),
            index,
            food: FoodEconomy::new(),
            obstacles,
            history: PopulationHistory::default(),
            totals: Totals::default(),
        };
        sim.populate(cells, food);
        info!(
            event = "simulation_created",
            seed = sim.config.population.seed,
            cells = sim.cells.len(),
            food = sim.food.len(),
            obstacles = sim.obstacles.len(),
            "Simulation created"
        );
        sim
    }

    /// Throw away every cell and food item and start over on new obstacles.
    /// The random stream carries on; it is not reseeded.
    pub fn reset(&mut self, population_size: usize, food_count: usize, obstacles: Vec<Obstacle>) {
        self.obstacles = obstacles;
        self.clear();
        self.populate(population_size, food_count);
        info!(
            event = "simulation_reset",
            cells = self.cells.len(),
            food = self.food.len(),
            obstacles = self.obstacles.len(),
            "Simulation reset"
        );
    }

    pub fn reset_with_random_obstacles(&mut self, population_size: usize, food_count: usize) {
        let obstacles = self.config.obstacles.generate(&self.config.arena, &mut self.rng);
        self.reset(population_size, food_count, obstacles);
    }

    fn clear(&mut self) {
        self.cells.clear();
        self.index.clear();
        self.food.clear();
        self.history.clear();
        self.totals = Totals::default();
        self.tick = 0;
        self.next_id = 0;
    }

    fn populate(&mut self, population_size: usize, food_count: usize) {
        let attempts = self.config.population.placement_attempts.max(1);
        for _ in 0..population_size {
            let mut spot = None;
            for _ in 0..attempts {
                let pos = self.config.arena.random_position(&mut self.rng);
                if self.is_free(pos) {
                    spot = Some(pos);
                    break;
                }
            }
            match spot {
                Some(pos) => {
                    let traits = Traits::random(&mut self.rng);
                    self.insert_cell(pos, traits);
                }
                None => warn!(
                    event = "placement_failed",
                    attempts = attempts,
                    "Could not find a free spot for an initial cell"
                ),
            }
        }
        self.food
            .populate(food_count, &self.config.food, &self.config.arena, &self.obstacles, &mut self.rng);
    }

    fn allocate_id(&mut self) -> CellId {
        let id = CellId(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert_cell(&mut self, pos: Position, traits: Traits) -> CellId {
        let id = self.allocate_id();
        let cell = Cell::new(id, pos, 0, traits, &self.config.vitals, &self.config.mating);
        self.index.insert(id, pos);
        self.cells.insert(id, cell);
        id
    }

    fn is_free(&self, pos: Position) -> bool {
        !blocked_by_obstacle(&self.obstacles, pos) && self.index.occupant_at(pos, None).is_none()
    }

    /// Advance exactly one tick: every cell moves, ages, eats and mates in
    /// id order against the live state; deaths and births are applied only
    /// after the pass; then food respawns once.
    pub fn step(&mut self) -> TickReport {
        self.tick += 1;
        let mut report = TickReport::new(self.tick);
        let mut newborns: Vec<Cell> = Vec::new();
        let mut dead: Vec<CellId> = Vec::new();

        let order: Vec<CellId> = self.cells.keys().copied().collect();
        for id in order {
            let Some(mut cell) = self.cells.remove(&id) else {
                continue;
            };
            if !cell.is_dead() {
                self.process_cell(&mut cell, &mut newborns, &mut report);
                if cell.hp <= 0.0 {
                    cell.mark_dead(DeathCause::Starvation);
                    dead.push(id);
                }
            }
            self.cells.insert(id, cell);
        }

        self.commit(dead, newborns, &mut report);

        if let Some(position) = self.food.respawn(
            &self.config.food,
            &self.config.arena,
            &self.obstacles,
            &mut self.rng,
        ) {
            self.totals.food_spawned += 1;
            report.push(SimEvent::FoodSpawned { position });
        }

        self.history.record(HistorySample {
            tick: self.tick,
            live_cells: self.cells.len(),
            food: self.food.len(),
            highest_generation: self.highest_generation(),
        });

        if self.tick % METRICS_INTERVAL == 0 {
            self.emit_population_metrics();
        }

        report
    }

    /// Move, status, eat, mate-check for one checked-out cell.
    fn process_cell(&mut self, cell: &mut Cell, newborns: &mut Vec<Cell>, report: &mut TickReport) {
        if cell.is_mating() {
            cell.behavior = Behavior::Mating;
        } else {
            let view = WorldView {
                config: &self.config,
                terrain: Terrain {
                    arena: &self.config.arena,
                    obstacles: &self.obstacles,
                    index: &self.index,
                },
                cells: &self.cells,
                food: &self.food,
            };
            if let Some(step) = behavior::run(cell, &view, &mut self.rng) {
                self.index.relocate(cell.id(), step.from, step.to);
            }
        }

        if cell.update_status(&self.config.vitals, &mut self.rng).is_some() {
            return;
        }

        let eaten = self.food.feed(cell, &self.config.food, &self.config.vitals);
        for _ in 0..eaten {
            report.push(SimEvent::FoodEaten {
                by: cell.id(),
                position: cell.position(),
            });
        }
        self.totals.food_eaten += eaten as u64;

        self.mate_check(cell, newborns, report);
    }

    fn mate_check(&mut self, cell: &mut Cell, newborns: &mut Vec<Cell>, report: &mut TickReport) {
        let reach = self.config.arena.cell_size;

        if !cell.is_mating() {
            if !cell.can_mate() {
                return;
            }
            let found = self
                .index
                .neighbors(cell.position())
                .filter_map(|(id, _)| self.cells.get(&id))
                .find(|other| mating::can_pair(cell, other, &self.config.arena))
                .map(|other| other.id());

            if let Some(partner) = found.and_then(|id| self.cells.get_mut(&id)) {
                mating::start(cell, partner, &self.config.mating);
                self.totals.matings_started += 1;
                trace!(
                    event = "mating_started",
                    first = %cell.id(),
                    second = %partner.id(),
                    tick = self.tick,
                    "Cells started mating"
                );
                report.push(SimEvent::MatingStarted {
                    first: cell.id(),
                    second: partner.id(),
                });
            }
            return;
        }

        let id = cell.id();
        let pair_intact = cell.partner().and_then(|pid| self.cells.get(&pid)).map_or(false, |p| {
            p.is_alive()
                && p.is_mating()
                && p.partner() == Some(id)
                && p.position().is_adjacent(&cell.position(), reach)
        });
        if !pair_intact {
            mating::release(cell);
            report.push(SimEvent::MatingAbandoned { id });
            return;
        }

        let Some(partner_id) = cell.partner() else {
            return;
        };
        // The lower id drives the pair.
        if id > partner_id {
            return;
        }
        let Some(partner) = self.cells.get_mut(&partner_id) else {
            return;
        };
        if let Progress::Due = mating::advance(cell, partner) {
            self.consummate(cell, partner_id, newborns, report);
        }
    }

    fn consummate(
        &mut self,
        cell: &mut Cell,
        partner_id: CellId,
        newborns: &mut Vec<Cell>,
        report: &mut TickReport,
    ) {
        let count = mating::offspring_count(&self.config.mating, &mut self.rng);
        let mut born = 0;

        for _ in 0..count {
            let taken: Vec<Position> = newborns.iter().map(|c| c.position()).collect();
            let index = &self.index;
            let spot = mating::place_offspring(
                cell.position(),
                &self.config.arena,
                &self.obstacles,
                self.config.mating.placement_retries,
                &taken,
                |p| index.occupant_at(p, None).is_some(),
                &mut self.rng,
            );

            let Some(pos) = spot else {
                self.totals.offspring_dropped += 1;
                debug!(
                    event = "offspring_dropped",
                    parent = %cell.id(),
                    tick = self.tick,
                    "No free spot for offspring"
                );
                report.push(SimEvent::OffspringDropped { parent: cell.id() });
                continue;
            };

            let child_id = self.allocate_id();
            let Some(partner) = self.cells.get(&partner_id) else {
                break;
            };
            let child = mating::conceive(child_id, pos, cell, partner, &self.config, &mut self.rng);
            newborns.push(child);
            born += 1;
        }

        mating::finish(cell, &self.config.mating);
        if let Some(partner) = self.cells.get_mut(&partner_id) {
            mating::finish(partner, &self.config.mating);
        }

        self.totals.matings_completed += 1;
        debug!(
            event = "mating_completed",
            first = %cell.id(),
            second = %partner_id,
            offspring = born,
            tick = self.tick,
            "Mating completed"
        );
        report.push(SimEvent::MatingCompleted {
            first: cell.id(),
            second: partner_id,
            offspring: born,
        });
    }

    /// Apply the deferred removals, then the deferred births.
    fn commit(&mut self, dead: Vec<CellId>, newborns: Vec<Cell>, report: &mut TickReport) {
        for id in dead {
            let Some(cell) = self.cells.remove(&id) else {
                continue;
            };
            self.index.remove(id, cell.position());
            let cause = cell.death_cause().unwrap_or(DeathCause::Starvation);
            self.totals.deaths += 1;
            debug!(
                event = "cell_death",
                cell = %id,
                cause = ?cause,
                age = cell.age,
                generation = cell.generation,
                tick = self.tick,
                "Cell died"
            );
            report.push(SimEvent::CellDied {
                id,
                cause,
                age: cell.age,
                generation: cell.generation,
            });
        }

        for child in newborns {
            let pos = child.position();
            // A cell may have walked onto the spot after it was claimed.
            if self.index.occupant_at(pos, None).is_some() {
                if let Some((parent, _)) = child.parents() {
                    self.totals.offspring_dropped += 1;
                    report.push(SimEvent::OffspringDropped { parent });
                }
                continue;
            }
            let id = child.id();
            self.index.insert(id, pos);
            self.totals.births += 1;
            debug!(
                event = "cell_born",
                cell = %id,
                generation = child.generation,
                x = pos.x,
                y = pos.y,
                tick = self.tick,
                "Cell born"
            );
            report.push(SimEvent::CellBorn {
                id,
                parents: child.parents(),
                generation: child.generation,
                position: pos,
            });
            self.cells.insert(id, child);
        }
    }

    /// Step `ticks` times, handing each report to `observer`.
    #[instrument(skip(self, observer), fields(seed = self.config.population.seed))]
    pub fn run_with<F>(&mut self, ticks: u64, mut observer: F) -> RunSummary
    where
        F: FnMut(&TickReport),
    {
        info!("Starting simulation for {} ticks", ticks);
        for _ in 0..ticks {
            let report = self.step();
            observer(&report);
        }
        let summary = self.summary(ticks);
        info!(
            event = "run_summary",
            ticks = ticks,
            final_tick = self.tick,
            population = summary.stats.population,
            food = summary.stats.food,
            highest_generation = summary.stats.highest_generation,
            births = summary.totals.births,
            deaths = summary.totals.deaths,
            matings_completed = summary.totals.matings_completed,
            peak_population = summary.peak_population,
            "Simulation run complete"
        );
        summary
    }

    pub fn run(&mut self, ticks: u64) -> RunSummary {
        self.run_with(ticks, |_| {})
    }

    fn summary(&self, ticks_run: u64) -> RunSummary {
        RunSummary {
            ticks_run,
            stats: self.stats(),
            totals: self.totals,
            peak_population: self.history.peak_population(),
        }
    }

    fn emit_population_metrics(&self) {
        let stats = self.stats();
        info!(
            event = "population_metrics",
            tick = self.tick,
            population = stats.population,
            food = stats.food,
            highest_generation = stats.highest_generation,
            mating = stats.mating_cells,
            avg_hunger = stats.avg_hunger,
            avg_stamina = stats.avg_stamina,
            avg_age = stats.avg_age,
            births = self.totals.births,
            deaths = self.totals.deaths,
            "Population metrics snapshot"
        );
    }

    /// Drop a fresh generation-0 cell at `pos` (snapped to the grid and
    /// clamped into bounds). Returns `None` if the spot is taken or blocked.
    pub fn spawn_cell(&mut self, pos: Position) -> Option<CellId> {
        let pos = self.config.arena.snap(pos);
        if !self.is_free(pos) {
            debug!(x = pos.x, y = pos.y, "Spawn cell skipped: spot not free");
            return None;
        }
        let traits = Traits::random(&mut self.rng);
        Some(self.insert_cell(pos, traits))
    }

    /// Place a food item at `pos` (snapped and clamped). Skipped on
    /// obstacles and when the collection is at its ceiling.
    pub fn spawn_food(&mut self, pos: Position) -> bool {
        let pos = self.config.arena.snap(pos);
        if blocked_by_obstacle(&self.obstacles, pos) {
            return false;
        }
        self.food.add(pos, &self.config.food)
    }

    /// Change a tunable; the value is clamped into range and the applied
    /// value returned. Lowering the food ceiling below the current count
    /// discards the newest items.
    pub fn set_parameter(&mut self, parameter: Parameter, value: f64) -> f64 {
        let applied = self.config.set_parameter(parameter, value);
        if parameter == Parameter::MaxFood {
            let removed = self.food.truncate(self.config.food.max_food);
            if removed > 0 {
                debug!(
                    event = "food_trimmed",
                    removed = removed,
                    max_food = self.config.food.max_food,
                    "Food collection trimmed to the new ceiling"
                );
            }
        }
        info!(
            event = "parameter_changed",
            parameter = %parameter,
            requested = value,
            applied = applied,
            "Parameter updated"
        );
        applied
    }

    pub fn set_parameter_by_name(&mut self, name: &str, value: f64) -> Result<f64> {
        let parameter: Parameter = name.parse()?;
        Ok(self.set_parameter(parameter, value))
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.values()
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(&id)
    }

    /// Mutable access to a cell's stats. Position and mating state stay
    /// private to the engine, so the index cannot drift.
    pub fn cell_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.cells.get_mut(&id)
    }

    pub fn population(&self) -> usize {
        self.cells.len()
    }

    pub fn food(&self) -> &[cellsim_core::Food] {
        self.food.items()
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn history(&self) -> &PopulationHistory {
        &self.history
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn highest_generation(&self) -> u32 {
        self.cells.values().map(|c| c.generation).max().unwrap_or(0)
    }

    pub fn stats(&self) -> PopulationStats {
        let mut acc = StatsAccumulator::new();
        for cell in self.cells.values() {
            acc.add(
                cell.hp,
                cell.hunger,
                cell.stamina,
                cell.age,
                cell.generation,
                cell.is_mating(),
            );
        }
        acc.finish(self.tick, self.food.len())
    }

    /// Read-only copy of everything a renderer needs
    pub fn snapshot(&self) -> WorldSnapshot {
        let arena = &self.config.arena;
        WorldSnapshot {
            tick: self.tick,
            width: arena.width,
            height: arena.height,
            cell_size: arena.cell_size,
            cells: self
                .cells
                .values()
                .map(|c| CellView::new(c, arena.energy_multiplier(c.position())))
                .collect(),
            food: self.food.items().iter().map(|f| f.position).collect(),
            obstacles: self.obstacles.clone(),
            stats: self.stats(),
        }
    }
}

/// Read-only per-cell view for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellView {
    pub id: CellId,
    pub position: Position,
    pub hp: f32,
    pub hunger: f32,
    pub stamina: f32,
    pub age: u32,
    pub generation: u32,
    pub is_mating: bool,
    pub mating_cooldown: u32,
    pub behavior: Behavior,
    pub traits: Traits,
    pub energy_multiplier: f32,
}

impl CellView {
    fn new(cell: &Cell, energy_multiplier: f32) -> Self {
        Self {
            id: cell.id(),
            position: cell.position(),
            hp: cell.hp,
            hunger: cell.hunger,
            stamina: cell.stamina,
            age: cell.age,
            generation: cell.generation,
            is_mating: cell.is_mating(),
            mating_cooldown: cell.mating_cooldown,
            behavior: cell.behavior(),
            traits: cell.traits,
            energy_multiplier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub width: i32,
    pub height: i32,
    pub cell_size: i32,
    pub cells: Vec<CellView>,
    pub food: Vec<Position>,
    pub obstacles: Vec<Obstacle>,
    pub stats: PopulationStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks_run: u64,
    pub stats: PopulationStats,
    pub totals: Totals,
    pub peak_population: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config(seed: u64) -> SimConfig {
        let mut config = SimConfig::default();
        config.population.seed = seed;
        config.population.initial_cells = 0;
        config.population.initial_food = 0;
        config.food.min_food = 0;
        config.food.respawn_rate = 0.0;
        config
    }

    #[test]
    fn test_simulation_creation() {
        let sim = Simulation::with_random_obstacles(SimConfig::default()).unwrap();
        assert_eq!(sim.population(), 50);
        assert_eq!(sim.food().len(), 200);
        assert_eq!(sim.obstacles().len(), 10);
        assert_eq!(sim.index().len(), 50);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = SimConfig::default();
        config.arena.bucket_size = 0;
        assert!(Simulation::new(config, Vec::new()).is_err());
    }

    #[test]
    fn test_initial_cells_do_not_overlap() {
        let sim = Simulation::with_random_obstacles(SimConfig::default()).unwrap();
        let mut seen = std::collections::HashSet::new();
        for cell in sim.cells() {
            assert!(seen.insert(cell.position()));
            assert!(!blocked_by_obstacle(sim.obstacles(), cell.position()));
        }
    }

    #[test]
    fn test_spawn_cell_rejects_occupied_spot() {
        let mut sim = Simulation::new(quiet_config(1), Vec::new()).unwrap();
        let first = sim.spawn_cell(Position::new(103, 207));
        assert!(first.is_some());
        assert_eq!(sim.cell(first.unwrap()).unwrap().position(), Position::new(100, 200));
        assert!(sim.spawn_cell(Position::new(100, 200)).is_none());
    }

    #[test]
    fn test_spawn_food_on_obstacle_is_skipped() {
        let obstacles = vec![Obstacle::new(0, 0, 50, 50)];
        let mut sim = Simulation::new(quiet_config(1), obstacles).unwrap();
        assert!(!sim.spawn_food(Position::new(10, 10)));
        assert!(sim.spawn_food(Position::new(60, 60)));
        assert_eq!(sim.food().len(), 1);
    }

    #[test]
    fn test_set_parameter_by_name() {
        let mut sim = Simulation::new(quiet_config(1), Vec::new()).unwrap();
        assert_eq!(sim.set_parameter_by_name("food_respawn_rate", 99.0).unwrap(), 10.0);
        assert!(sim.set_parameter_by_name("warp_speed", 1.0).is_err());
    }

    #[test]
    fn test_lowering_max_food_trims_collection() {
        let mut config = quiet_config(1);
        config.population.initial_food = 200;
        let mut sim = Simulation::new(config, Vec::new()).unwrap();
        assert_eq!(sim.food().len(), 200);

        assert_eq!(sim.set_parameter(Parameter::MaxFood, 60.0), 60.0);
        assert_eq!(sim.food().len(), 60);
        sim.step();
        assert!(sim.food().len() <= 60);
    }

    #[test]
    fn test_reset_never_places_food_past_ceiling() {
        let mut sim = Simulation::new(quiet_config(1), Vec::new()).unwrap();
        sim.reset(0, 400, Vec::new());
        assert_eq!(sim.food().len(), sim.config().food.max_food);
        sim.step();
        assert!(sim.food().len() <= sim.config().food.max_food);
    }

    #[test]
    fn test_old_fed_cell_dies_of_age_in_step() {
        let mut sim = Simulation::new(quiet_config(1), Vec::new()).unwrap();
        let id = sim.spawn_cell(Position::new(200, 200)).unwrap();
        {
            let cell = sim.cell_mut(id).unwrap();
            cell.age = 1_300;
            cell.hunger = 150.0;
            cell.mortality_chance = 1.0;
        }

        let report = sim.step();
        assert!(sim.cell(id).is_none());
        assert!(sim.index().is_empty());
        assert!(report.events.iter().any(|e| matches!(
            e,
            SimEvent::CellDied { id: dead, cause: DeathCause::Age, .. } if *dead == id
        )));
    }

    #[test]
    fn test_reset_clears_state() {
        let mut sim = Simulation::with_random_obstacles(SimConfig::default()).unwrap();
        sim.run(20);
        sim.reset(5, 10, Vec::new());
        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.population(), 5);
        assert_eq!(sim.index().len(), 5);
        assert_eq!(sim.food().len(), 10);
        assert!(sim.obstacles().is_empty());
        assert!(sim.history().is_empty());
    }

    #[test]
    fn test_history_grows_per_tick() {
        let mut sim = Simulation::with_random_obstacles(SimConfig::default()).unwrap();
        sim.run(5);
        assert_eq!(sim.history().len(), 5);
        assert_eq!(sim.history().last().unwrap().tick, 5);
    }
}
