//! Cell state and the per-cell mechanics: movement, aging, eating.

use crate::events::DeathCause;
use crate::spatial::SpatialIndex;
use cellsim_core::{
    blocked_by_obstacle, Arena, CellId, Direction, FoodConfig, MatingConfig, Obstacle, Position,
    VitalsConfig,
};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// What a cell did on its last behavior pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Behavior {
    SeekingFood,
    SeekingMate,
    Wandering,
    /// Out of stamina; regenerating instead of moving
    Resting,
    Mating,
    Dead,
}

/// Heritable modifiers. Only `speed` feeds back into behavior; the stat
/// modifiers are carried and inherited but do not move the stat caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traits {
    pub speed: i32,
    pub max_hp: i32,
    pub max_stamina: i32,
    pub max_hunger: i32,
}

impl Traits {
    /// Founder traits, each drawn from `-1..=1`
    pub fn random(rng: &mut ChaCha8Rng) -> Self {
        Self {
            speed: rng.gen_range(-1..=1),
            max_hp: rng.gen_range(-1..=1),
            max_stamina: rng.gen_range(-1..=1),
            max_hunger: rng.gen_range(-1..=1),
        }
    }

    /// Floor-average both parents, then add an independent mutation to each
    /// trait, then apply the viability floor.
    pub fn inherit(a: &Traits, b: &Traits, config: &MatingConfig, rng: &mut ChaCha8Rng) -> Self {
        let speed_spread = config.speed_mutation.abs();
        let modifier_spread = config.modifier_mutation.abs();
        let mut blend = |x: i32, y: i32, spread: i32, floor: i32| {
            ((x + y).div_euclid(2) + rng.gen_range(-spread..=spread)).max(floor)
        };

        Self {
            speed: blend(a.speed, b.speed, speed_spread, config.speed_floor),
            max_hp: blend(a.max_hp, b.max_hp, modifier_spread, config.modifier_floor),
            max_stamina: blend(a.max_stamina, b.max_stamina, modifier_spread, config.modifier_floor),
            max_hunger: blend(a.max_hunger, b.max_hunger, modifier_spread, config.modifier_floor),
        }
    }
}

/// Read-only view of the world a moving cell collides against
pub struct Terrain<'a> {
    pub arena: &'a Arena,
    pub obstacles: &'a [Obstacle],
    pub index: &'a SpatialIndex,
}

impl Terrain<'_> {
    /// An obstacle or another indexed cell sits on `pos`.
    pub fn is_blocked(&self, pos: Position, mover: CellId) -> bool {
        blocked_by_obstacle(self.obstacles, pos) || self.index.occupant_at(pos, Some(mover)).is_some()
    }
}

/// A committed position change; the caller must relocate the index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Position,
    pub to: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub(crate) id: CellId,
    pub(crate) position: Position,
    pub hp: f32,
    pub hunger: f32,
    pub stamina: f32,
    pub age: u32,
    pub generation: u32,
    pub mortality_chance: f64,
    pub traits: Traits,
    pub mating_cooldown: u32,
    pub(crate) is_mating: bool,
    pub(crate) mating_timer: u32,
    pub(crate) partner: Option<CellId>,
    pub(crate) is_dead: bool,
    pub(crate) death_cause: Option<DeathCause>,
    pub(crate) behavior: Behavior,
    pub(crate) parents: Option<(CellId, CellId)>,
}

impl Cell {
    pub fn new(
        id: CellId,
        position: Position,
        generation: u32,
        traits: Traits,
        vitals: &VitalsConfig,
        mating: &MatingConfig,
    ) -> Self {
        Self {
            id,
            position,
            hp: vitals.initial_hp.min(vitals.max_hp),
            hunger: vitals.initial_hunger.min(vitals.max_hunger),
            stamina: vitals.initial_stamina.min(vitals.max_stamina),
            age: 0,
            generation,
            mortality_chance: vitals.initial_mortality_chance,
            traits,
            mating_cooldown: mating.newborn_cooldown,
            is_mating: false,
            mating_timer: 0,
            partner: None,
            is_dead: false,
            death_cause: None,
            behavior: Behavior::Wandering,
            parents: None,
        }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead && self.hp > 0.0
    }

    pub fn is_dead(&self) -> bool {
        self.is_dead
    }

    pub fn is_mating(&self) -> bool {
        self.is_mating
    }

    pub fn mating_timer(&self) -> u32 {
        self.mating_timer
    }

    pub fn partner(&self) -> Option<CellId> {
        self.partner
    }

    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    pub fn death_cause(&self) -> Option<DeathCause> {
        self.death_cause
    }

    pub fn parents(&self) -> Option<(CellId, CellId)> {
        self.parents
    }

    /// Free to start a new mating: alive, unpaired, out of cooldown.
    pub fn can_mate(&self) -> bool {
        self.is_alive() && !self.is_mating && self.mating_cooldown == 0
    }

    /// Attractive to a mate-seeking neighbor: `can_mate` and at least at the
    /// reset values for hunger and hp.
    pub fn is_eligible_mate(&self, vitals: &VitalsConfig) -> bool {
        self.can_mate() && self.hunger >= vitals.initial_hunger && self.hp >= vitals.initial_hp
    }

    /// Distance covered by one step, in arena units
    pub fn step_size(&self, arena: &Arena) -> i32 {
        arena.cell_size * self.traits.speed.max(1)
    }

    /// Step toward `target`. Each axis of the step is rounded to whole arena
    /// cells so positions stay grid-aligned; the step never overshoots.
    /// Hunger drains whether or not the step succeeds.
    pub fn move_towards(
        &mut self,
        target: Position,
        terrain: &Terrain<'_>,
        vitals: &VitalsConfig,
    ) -> Option<Move> {
        self.hunger -= vitals.idle_hunger_consumption;

        let arena = terrain.arena;
        let dx = f64::from(target.x - self.position.x);
        let dy = f64::from(target.y - self.position.y);
        let distance = dx.hypot(dy);
        if distance <= 0.0 {
            return None;
        }

        let step = f64::from(self.step_size(arena)).min(distance);
        let cs = f64::from(arena.cell_size);
        let sx = ((dx / distance * step) / cs).round() as i32 * arena.cell_size;
        let sy = ((dy / distance * step) / cs).round() as i32 * arena.cell_size;

        let destination = arena.clamp(self.position.add(sx, sy));
        if destination == self.position || terrain.is_blocked(destination, self.id) {
            return None;
        }

        let from = self.position;
        self.position = destination;
        Some(Move { from, to: destination })
    }

    /// Try the four cardinal directions in random order and take the first
    /// one that stays in bounds and is free.
    pub fn wander(&mut self, terrain: &Terrain<'_>, rng: &mut ChaCha8Rng) -> Option<Move> {
        let mut directions = Direction::all();
        directions.shuffle(rng);
        let step = self.step_size(terrain.arena);

        for direction in directions {
            let (dx, dy) = direction.to_delta();
            let candidate = self.position.add(dx * step, dy * step);
            if terrain.arena.contains(candidate) && !terrain.is_blocked(candidate, self.id) {
                let from = self.position;
                self.position = candidate;
                return Some(Move { from, to: candidate });
            }
        }
        None
    }

    /// The pre-movement hp adjustment, only applied when
    /// `legacy_behavior_hp_adjustment` is set.
    pub(crate) fn apply_behavior_hp_adjustment(&mut self, vitals: &VitalsConfig) {
        if self.hunger <= 0.0 {
            self.hp -= vitals.behavior_starvation_penalty;
        }
        if self.hunger >= vitals.behavior_recovery_threshold {
            self.hp += vitals.recovery_bonus;
        }
    }

    /// Once-per-tick aging and resource bookkeeping. Returns the death cause
    /// if hp has hit zero.
    pub fn update_status(&mut self, vitals: &VitalsConfig, rng: &mut ChaCha8Rng) -> Option<DeathCause> {
        self.age += 1;
        if f64::from(self.age) > vitals.aging_threshold * f64::from(vitals.max_age) {
            self.mortality_chance = (self.mortality_chance + vitals.mortality_increment).min(1.0);
        }
        if rng.gen::<f64>() < self.mortality_chance {
            // Age mortality is final.
            self.hp = 0.0;
            self.mark_dead(DeathCause::Age);
            return Some(DeathCause::Age);
        }

        // Gestating cells pay nothing for their upkeep.
        if !self.is_mating {
            self.hunger -= vitals.hunger_per_tick;
        }
        if self.hunger <= 0.0 {
            self.hp -= vitals.starvation_penalty;
        }
        if self.hunger >= vitals.recovery_threshold {
            self.hp += vitals.recovery_bonus;
        }
        self.hp = self.hp.clamp(0.0, vitals.max_hp);
        self.hunger = self.hunger.clamp(0.0, vitals.max_hunger);

        if self.mating_cooldown > 0 {
            self.mating_cooldown -= 1;
        }

        if self.stamina < vitals.max_stamina {
            self.stamina += vitals.idle_stamina_gain;
        }
        self.stamina = self.stamina.clamp(0.0, vitals.max_stamina);

        if self.hp <= 0.0 {
            self.mark_dead(DeathCause::Starvation);
            return Some(DeathCause::Starvation);
        }
        None
    }

    /// Touch one food item. Below max hunger the item is eaten (returns
    /// true). At exactly max hunger the cell converts it into stamina and
    /// leaves it lying where it is.
    pub fn eat(&mut self, food: &FoodConfig, vitals: &VitalsConfig) -> bool {
        if self.hunger < vitals.max_hunger {
            self.hunger = (self.hunger + food.food_gain).min(vitals.max_hunger);
            true
        } else {
            self.stamina = (self.stamina + food.stamina_gain).min(vitals.max_stamina);
            false
        }
    }

    pub(crate) fn mark_dead(&mut self, cause: DeathCause) {
        self.is_dead = true;
        self.behavior = Behavior::Dead;
        self.death_cause.get_or_insert(cause);
    }
}
