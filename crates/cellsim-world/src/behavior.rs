//! Per-tick decision making for a single free (non-mating) cell.

use crate::cell::{Behavior, Cell, Move, Terrain};
use crate::food::FoodEconomy;
use cellsim_core::{CellId, Position, SimConfig};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// What a behavior pass may read while the acting cell is checked out of the
/// population map.
pub struct WorldView<'a> {
    pub config: &'a SimConfig,
    pub terrain: Terrain<'a>,
    pub cells: &'a BTreeMap<CellId, Cell>,
    pub food: &'a FoodEconomy,
}

impl WorldView<'_> {
    /// Nearest eligible mate among the spatial neighbors of `cell`.
    pub fn nearest_mate(&self, cell: &Cell) -> Option<Position> {
        let mut best: Option<(f64, Position)> = None;
        for (id, pos) in self.terrain.index.neighbors(cell.position()) {
            if id == cell.id() {
                continue;
            }
            let Some(other) = self.cells.get(&id) else {
                continue;
            };
            if !other.is_eligible_mate(&self.config.vitals) {
                continue;
            }
            let d = cell.position().distance(&pos);
            if best.map_or(true, |(min, _)| d < min) {
                best = Some((d, pos));
            }
        }
        best.map(|(_, pos)| pos)
    }
}

/// Pick a branch, maybe move, and pay for it. Returns the move so the caller
/// can relocate the spatial index entry.
pub fn run(cell: &mut Cell, view: &WorldView<'_>, rng: &mut ChaCha8Rng) -> Option<Move> {
    let vitals = &view.config.vitals;

    if vitals.legacy_behavior_hp_adjustment {
        cell.apply_behavior_hp_adjustment(vitals);
    }

    if cell.stamina <= 0.0 {
        cell.behavior = Behavior::Resting;
        cell.stamina = (cell.stamina + vitals.idle_stamina_gain).min(vitals.max_stamina);
        return None;
    }

    let multiplier = view.terrain.arena.energy_multiplier(cell.position());
    let mut attempted = true;

    let moved = if cell.hunger <= vitals.forage_threshold {
        cell.behavior = Behavior::SeekingFood;
        view.food
            .nearest(cell.position())
            .and_then(|target| cell.move_towards(target, &view.terrain, vitals))
    } else if cell.hp >= vitals.mate_hp_threshold && cell.mating_cooldown == 0 {
        cell.behavior = Behavior::SeekingMate;
        view.nearest_mate(cell)
            .and_then(|target| cell.move_towards(target, &view.terrain, vitals))
    } else {
        cell.behavior = Behavior::Wandering;
        if rng.gen_bool(0.5) {
            attempted = false;
            None
        } else {
            cell.wander(&view.terrain, rng)
        }
    };

    if attempted {
        cell.stamina -= vitals.stamina_per_step * multiplier;
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Traits;
    use crate::spatial::SpatialIndex;
    use rand::SeedableRng;

    fn make_cell(id: u64, pos: Position, config: &SimConfig) -> Cell {
        let traits = Traits { speed: 1, max_hp: 0, max_stamina: 0, max_hunger: 0 };
        Cell::new(CellId(id), pos, 0, traits, &config.vitals, &config.mating)
    }

    #[test]
    fn test_hungry_cell_walks_to_food() {
        let config = SimConfig::default();
        let index = SpatialIndex::new(&config.arena);
        let cells = BTreeMap::new();
        let mut food = FoodEconomy::new();
        food.add(Position::new(700, 480), &config.food);
        let view = WorldView {
            config: &config,
            terrain: Terrain { arena: &config.arena, obstacles: &[], index: &index },
            cells: &cells,
            food: &food,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut cell = make_cell(1, Position::new(700, 450), &config);
        cell.hunger = 50.0;

        let moved = run(&mut cell, &view, &mut rng);
        assert_eq!(moved.map(|m| m.to), Some(Position::new(700, 460)));
        assert_eq!(cell.behavior(), Behavior::SeekingFood);
        // at the exact center the multiplier is 1
        assert!((cell.stamina - 149.75).abs() < 1e-4);
    }

    #[test]
    fn test_exhausted_cell_rests() {
        let config = SimConfig::default();
        let index = SpatialIndex::new(&config.arena);
        let cells = BTreeMap::new();
        let food = FoodEconomy::new();
        let view = WorldView {
            config: &config,
            terrain: Terrain { arena: &config.arena, obstacles: &[], index: &index },
            cells: &cells,
            food: &food,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut cell = make_cell(1, Position::new(100, 100), &config);
        cell.stamina = 0.0;

        assert!(run(&mut cell, &view, &mut rng).is_none());
        assert_eq!(cell.behavior(), Behavior::Resting);
        assert_eq!(cell.stamina, 0.5);
        assert_eq!(cell.position(), Position::new(100, 100));
    }

    #[test]
    fn test_sated_cell_seeks_eligible_mate() {
        let config = SimConfig::default();
        let mut index = SpatialIndex::new(&config.arena);
        let mut cells = BTreeMap::new();

        let mut mate = make_cell(2, Position::new(130, 100), &config);
        mate.mating_cooldown = 0;
        index.insert(mate.id(), mate.position());
        cells.insert(mate.id(), mate);

        let mut seeker = make_cell(1, Position::new(100, 100), &config);
        seeker.mating_cooldown = 0;
        index.insert(seeker.id(), seeker.position());

        let food = FoodEconomy::new();
        let view = WorldView {
            config: &config,
            terrain: Terrain { arena: &config.arena, obstacles: &[], index: &index },
            cells: &cells,
            food: &food,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let moved = run(&mut seeker, &view, &mut rng);
        assert_eq!(seeker.behavior(), Behavior::SeekingMate);
        assert_eq!(moved.map(|m| m.to), Some(Position::new(110, 100)));
    }

    #[test]
    fn test_ineligible_neighbors_are_ignored() {
        let config = SimConfig::default();
        let mut index = SpatialIndex::new(&config.arena);
        let mut cells = BTreeMap::new();

        let hungry = make_cell(2, Position::new(130, 100), &config); // cooldown 160
        index.insert(hungry.id(), hungry.position());
        cells.insert(hungry.id(), hungry);

        let seeker = make_cell(1, Position::new(100, 100), &config);
        let food = FoodEconomy::new();
        let view = WorldView {
            config: &config,
            terrain: Terrain { arena: &config.arena, obstacles: &[], index: &index },
            cells: &cells,
            food: &food,
        };
        assert_eq!(view.nearest_mate(&seeker), None);
    }
}
