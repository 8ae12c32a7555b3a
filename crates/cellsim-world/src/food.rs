//! Food collection and its stochastic respawn policy.

use crate::cell::Cell;
use cellsim_core::{blocked_by_obstacle, Arena, Food, FoodConfig, Obstacle, Position, VitalsConfig};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct FoodEconomy {
    items: Vec<Food>,
}

impl FoodEconomy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Food] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Scatter up to `count` items uniformly over free grid positions, never
    /// past the ceiling. Gives up after a bounded number of obstacle hits.
    pub fn populate(
        &mut self,
        count: usize,
        config: &FoodConfig,
        arena: &Arena,
        obstacles: &[Obstacle],
        rng: &mut ChaCha8Rng,
    ) {
        let count = count.min(config.max_food);
        let mut budget = count.saturating_mul(100).max(100);
        while self.items.len() < count && budget > 0 {
            budget -= 1;
            let pos = arena.random_position(rng);
            if !blocked_by_obstacle(obstacles, pos) {
                self.items.push(Food::new(pos));
            }
        }
    }

    /// Add an item at an already validated position, respecting the ceiling.
    pub fn add(&mut self, pos: Position, config: &FoodConfig) -> bool {
        if self.items.len() >= config.max_food {
            return false;
        }
        self.items.push(Food::new(pos));
        true
    }

    /// Drop the newest items until at most `max` remain. Returns how many
    /// were removed.
    pub fn truncate(&mut self, max: usize) -> usize {
        let removed = self.items.len().saturating_sub(max);
        self.items.truncate(max);
        removed
    }

    /// Nearest item by straight-line distance; ties go to the earlier item.
    pub fn nearest(&self, from: Position) -> Option<Position> {
        let mut best: Option<(f64, Position)> = None;
        for food in &self.items {
            let d = from.distance(&food.position);
            if best.map_or(true, |(min, _)| d < min) {
                best = Some((d, food.position));
            }
        }
        best.map(|(_, pos)| pos)
    }

    /// Let `cell` eat every item on its exact position, in collection order.
    /// Returns how many items were removed.
    pub fn feed(&mut self, cell: &mut Cell, config: &FoodConfig, vitals: &VitalsConfig) -> usize {
        let pos = cell.position();
        let mut eaten = 0;
        let mut i = 0;
        while i < self.items.len() {
            if self.items[i].position == pos && cell.eat(config, vitals) {
                self.items.remove(i);
                eaten += 1;
            } else {
                i += 1;
            }
        }
        eaten
    }

    /// Chance of spawning one item this tick.
    pub fn spawn_probability(&self, config: &FoodConfig) -> f64 {
        let count = self.items.len();
        if count <= config.min_food {
            return 1.0;
        }
        if count >= config.max_food {
            return 0.0;
        }
        let range = (config.max_food - config.min_food) as f64;
        let headroom = (config.max_food - count) as f64;
        (config.respawn_rate * headroom / range).clamp(0.0, 1.0)
    }

    /// Draw from a Gaussian around the arena center (sigma a quarter of the
    /// short side), retrying on obstacles up to the configured budget.
    pub fn sample_position(
        arena: &Arena,
        obstacles: &[Obstacle],
        retries: u32,
        rng: &mut ChaCha8Rng,
    ) -> Option<Position> {
        let (cx, cy) = arena.center();
        let sigma = f64::from(arena.width.min(arena.height)) / 4.0;
        let x_dist = Normal::new(cx, sigma).ok()?;
        let y_dist = Normal::new(cy, sigma).ok()?;

        for _ in 0..retries.max(1) {
            let x = x_dist.sample(rng) as i32;
            let y = y_dist.sample(rng) as i32;
            let pos = arena.snap(Position::new(x, y));
            if !blocked_by_obstacle(obstacles, pos) {
                return Some(pos);
            }
        }
        None
    }

    /// Run the respawn policy once. Returns the spawned position, if any.
    pub fn respawn(
        &mut self,
        config: &FoodConfig,
        arena: &Arena,
        obstacles: &[Obstacle],
        rng: &mut ChaCha8Rng,
    ) -> Option<Position> {
        if self.items.len() >= config.max_food {
            return None;
        }
        let probability = self.spawn_probability(config);
        if rng.gen::<f64>() >= probability {
            return None;
        }

        match Self::sample_position(arena, obstacles, config.placement_retries, rng) {
            Some(pos) => {
                self.items.push(Food::new(pos));
                Some(pos)
            }
            None => {
                trace!(
                    event = "food_spawn_skipped",
                    retries = config.placement_retries,
                    "No obstacle-free food position found this tick"
                );
                None
            }
        }
    }
}
