//! Mating protocol: handshake, gestation, and offspring generation.
//!
//! A pair is bound by explicit partner ids. Gestation advances once per tick,
//! driven by whichever partner has the lower id, so the timer speed does not
//! depend on how many times the pair is visited.

use crate::cell::{Behavior, Cell, Traits};
use cellsim_core::{blocked_by_obstacle, Arena, CellId, MatingConfig, Obstacle, Position};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Where a mating pair stands after this tick's check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Still counting down
    Gestating { remaining: u32 },
    /// Timer has run out; the pair should produce offspring now
    Due,
}

/// Handshake: both cells enter gestation together.
pub fn start(a: &mut Cell, b: &mut Cell, config: &MatingConfig) {
    let (a_id, b_id) = (a.id(), b.id());
    for (cell, partner) in [(a, b_id), (b, a_id)] {
        cell.is_mating = true;
        cell.mating_timer = config.duration;
        cell.partner = Some(partner);
        cell.behavior = Behavior::Mating;
    }
}

/// True if `a` and `b` may start mating with each other right now.
pub fn can_pair(a: &Cell, b: &Cell, arena: &Arena) -> bool {
    a.id() != b.id()
        && a.can_mate()
        && b.can_mate()
        && a.position().is_adjacent(&b.position(), arena.cell_size)
}

/// Count one tick of gestation for the pair.
pub fn advance(a: &mut Cell, b: &mut Cell) -> Progress {
    if a.mating_timer == 0 {
        return Progress::Due;
    }
    a.mating_timer -= 1;
    b.mating_timer = b.mating_timer.saturating_sub(1);
    Progress::Gestating {
        remaining: a.mating_timer,
    }
}

/// Drop out of a pair without paying anything.
pub fn release(cell: &mut Cell) {
    cell.is_mating = false;
    cell.mating_timer = 0;
    cell.partner = None;
    if cell.behavior == Behavior::Mating {
        cell.behavior = Behavior::Wandering;
    }
}

/// Charge the one-off mating cost and start the adult refractory period.
pub fn finish(cell: &mut Cell, config: &MatingConfig) {
    cell.stamina = (cell.stamina - config.stamina_cost).max(0.0);
    cell.hunger -= config.hunger_cost;
    release(cell);
    cell.mating_cooldown = config.cooldown;
}

pub fn offspring_count(config: &MatingConfig, rng: &mut ChaCha8Rng) -> u32 {
    rng.gen_range(config.min_offspring..=config.max_offspring)
}

const OFFSETS: [i32; 3] = [-1, 0, 1];

/// Pick a free, in-bounds spot one arena cell away from `origin`.
/// `taken` lists positions already claimed this tick by other newborns.
pub fn place_offspring<F>(
    origin: Position,
    arena: &Arena,
    obstacles: &[Obstacle],
    retries: u32,
    taken: &[Position],
    is_occupied: F,
    rng: &mut ChaCha8Rng,
) -> Option<Position>
where
    F: Fn(Position) -> bool,
{
    for _ in 0..retries {
        let dx = *OFFSETS.choose(rng)? * arena.cell_size;
        let dy = *OFFSETS.choose(rng)? * arena.cell_size;
        let candidate = origin.add(dx, dy);
        if arena.contains(candidate)
            && !blocked_by_obstacle(obstacles, candidate)
            && !taken.contains(&candidate)
            && !is_occupied(candidate)
        {
            return Some(candidate);
        }
    }
    None
}

/// Build one newborn from two parents. Generation is one past the older
/// lineage of the two.
pub fn conceive(
    id: CellId,
    position: Position,
    first: &Cell,
    second: &Cell,
    config: &cellsim_core::SimConfig,
    rng: &mut ChaCha8Rng,
) -> Cell {
    let traits = Traits::inherit(&first.traits, &second.traits, &config.mating, rng);
    let generation = first.generation.max(second.generation) + 1;
    let mut child = Cell::new(id, position, generation, traits, &config.vitals, &config.mating);
    child.mating_cooldown = config.mating.newborn_cooldown;
    child.parents = Some((first.id(), second.id()));
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellsim_core::{SimConfig, VitalsConfig};
    use rand::SeedableRng;

    fn make_cell(id: u64, x: i32, y: i32) -> Cell {
        let traits = Traits { speed: 1, max_hp: 0, max_stamina: 0, max_hunger: 0 };
        let mut cell = Cell::new(
            CellId(id),
            Position::new(x, y),
            0,
            traits,
            &VitalsConfig::default(),
            &MatingConfig::default(),
        );
        cell.mating_cooldown = 0;
        cell
    }

    #[test]
    fn test_handshake() {
        let config = MatingConfig::default();
        let mut a = make_cell(1, 100, 100);
        let mut b = make_cell(2, 110, 110);
        assert!(can_pair(&a, &b, &Arena::default()));

        start(&mut a, &mut b, &config);
        assert!(a.is_mating() && b.is_mating());
        assert_eq!(a.partner(), Some(CellId(2)));
        assert_eq!(b.partner(), Some(CellId(1)));
        assert_eq!(a.mating_timer(), 240);
        assert!(!can_pair(&a, &b, &Arena::default()));
    }

    #[test]
    fn test_not_adjacent_cannot_pair() {
        let a = make_cell(1, 100, 100);
        let b = make_cell(2, 120, 100);
        assert!(!can_pair(&a, &b, &Arena::default()));
    }

    #[test]
    fn test_cooldown_blocks_pairing() {
        let a = make_cell(1, 100, 100);
        let mut b = make_cell(2, 110, 100);
        b.mating_cooldown = 1;
        assert!(!can_pair(&a, &b, &Arena::default()));
    }

    #[test]
    fn test_gestation_counts_down_then_due() {
        let config = MatingConfig {
            duration: 3,
            ..Default::default()
        };
        let mut a = make_cell(1, 100, 100);
        let mut b = make_cell(2, 110, 100);
        start(&mut a, &mut b, &config);

        assert_eq!(advance(&mut a, &mut b), Progress::Gestating { remaining: 2 });
        assert_eq!(advance(&mut a, &mut b), Progress::Gestating { remaining: 1 });
        assert_eq!(advance(&mut a, &mut b), Progress::Gestating { remaining: 0 });
        assert_eq!(b.mating_timer(), 0);
        assert_eq!(advance(&mut a, &mut b), Progress::Due);
    }

    #[test]
    fn test_finish_charges_once_and_sets_cooldown() {
        let config = MatingConfig::default();
        let mut a = make_cell(1, 100, 100);
        a.hunger = 120.0;
        a.stamina = 150.0;

        finish(&mut a, &config);
        assert_eq!(a.stamina, 60.0);
        assert_eq!(a.hunger, 90.0);
        assert_eq!(a.mating_cooldown, 400);
        assert!(!a.is_mating());
        assert_eq!(a.partner(), None);
    }

    #[test]
    fn test_finish_never_leaves_negative_stamina() {
        let config = MatingConfig::default();
        let mut a = make_cell(1, 100, 100);
        a.stamina = 20.0;
        finish(&mut a, &config);
        assert_eq!(a.stamina, 0.0);
    }

    #[test]
    fn test_offspring_count_range() {
        let config = MatingConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..200 {
            let n = offspring_count(&config, &mut rng);
            assert!((1..=3).contains(&n));
        }
    }

    #[test]
    fn test_placement_is_adjacent_and_free() {
        let arena = Arena::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let origin = Position::new(100, 100);
        let partner = Position::new(110, 100);
        for _ in 0..50 {
            if let Some(pos) = place_offspring(origin, &arena, &[], 10, &[], |p| p == origin || p == partner, &mut rng) {
                assert!(pos.is_adjacent(&origin, arena.cell_size));
                assert_ne!(pos, origin);
                assert_ne!(pos, partner);
            }
        }
    }

    #[test]
    fn test_placement_fails_when_surrounded() {
        let arena = Arena::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let origin = Position::new(100, 100);
        assert_eq!(
            place_offspring(origin, &arena, &[], 10, &[], |_| true, &mut rng),
            None
        );
    }

    #[test]
    fn test_conceive() {
        let config = SimConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut a = make_cell(1, 100, 100);
        a.generation = 2;
        let b = make_cell(2, 110, 100);

        let child = conceive(CellId(9), Position::new(90, 100), &a, &b, &config, &mut rng);
        assert_eq!(child.generation, 3);
        assert_eq!(child.mating_cooldown, 160);
        assert_eq!(child.parents(), Some((CellId(1), CellId(2))));
        assert!(child.traits.speed >= 1);
        assert!(child.traits.max_hp >= 10);
    }
}
