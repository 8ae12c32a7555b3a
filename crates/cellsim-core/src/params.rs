//! Runtime-tunable parameters.
//!
//! The configuration is a plain value; the only sanctioned way to change it
//! while a simulation runs is [`SimConfig::set_parameter`], which clamps the
//! requested value into the parameter's valid range.

use crate::config::SimConfig;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    FoodRespawnRate,
    MinFood,
    MaxFood,
    FoodGain,
    StaminaGainFromFood,
    StaminaPerStep,
    IdleStaminaGain,
    MatingCooldown,
    MatingDuration,
    MortalityIncrement,
}

const MAX_COUNT: f64 = 100_000.0;

impl Parameter {
    pub fn all() -> [Parameter; 10] {
        [
            Parameter::FoodRespawnRate,
            Parameter::MinFood,
            Parameter::MaxFood,
            Parameter::FoodGain,
            Parameter::StaminaGainFromFood,
            Parameter::StaminaPerStep,
            Parameter::IdleStaminaGain,
            Parameter::MatingCooldown,
            Parameter::MatingDuration,
            Parameter::MortalityIncrement,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Parameter::FoodRespawnRate => "food_respawn_rate",
            Parameter::MinFood => "min_food",
            Parameter::MaxFood => "max_food",
            Parameter::FoodGain => "food_gain",
            Parameter::StaminaGainFromFood => "stamina_gain_from_food",
            Parameter::StaminaPerStep => "stamina_per_step",
            Parameter::IdleStaminaGain => "idle_stamina_gain",
            Parameter::MatingCooldown => "mating_cooldown",
            Parameter::MatingDuration => "mating_duration",
            Parameter::MortalityIncrement => "mortality_increment",
        }
    }

    /// Inclusive valid range given the rest of the configuration.
    pub fn range(&self, config: &SimConfig) -> (f64, f64) {
        let vitals = &config.vitals;
        match self {
            Parameter::FoodRespawnRate => (0.0, 10.0),
            Parameter::MinFood => (0.0, config.food.max_food as f64),
            Parameter::MaxFood => (config.food.min_food as f64, MAX_COUNT),
            Parameter::FoodGain => (0.0, f64::from(vitals.max_hunger)),
            Parameter::StaminaGainFromFood => (0.0, f64::from(vitals.max_stamina)),
            Parameter::StaminaPerStep => (0.0, f64::from(vitals.max_stamina)),
            Parameter::IdleStaminaGain => (0.0, f64::from(vitals.max_stamina)),
            Parameter::MatingCooldown => (0.0, MAX_COUNT),
            Parameter::MatingDuration => (0.0, MAX_COUNT),
            Parameter::MortalityIncrement => (0.0, 1.0),
        }
    }

    pub fn get(&self, config: &SimConfig) -> f64 {
        match self {
            Parameter::FoodRespawnRate => config.food.respawn_rate,
            Parameter::MinFood => config.food.min_food as f64,
            Parameter::MaxFood => config.food.max_food as f64,
            Parameter::FoodGain => f64::from(config.food.food_gain),
            Parameter::StaminaGainFromFood => f64::from(config.food.stamina_gain),
            Parameter::StaminaPerStep => f64::from(config.vitals.stamina_per_step),
            Parameter::IdleStaminaGain => f64::from(config.vitals.idle_stamina_gain),
            Parameter::MatingCooldown => f64::from(config.mating.cooldown),
            Parameter::MatingDuration => f64::from(config.mating.duration),
            Parameter::MortalityIncrement => config.vitals.mortality_increment,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Parameter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Parameter::all()
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| Error::UnknownParameter(s.to_string()))
    }
}

impl SimConfig {
    /// Set a tunable, clamping into its valid range. Returns the applied value.
    pub fn set_parameter(&mut self, parameter: Parameter, value: f64) -> f64 {
        let (lo, hi) = parameter.range(self);
        let value = if value.is_nan() { lo } else { value.clamp(lo, hi) };

        match parameter {
            Parameter::FoodRespawnRate => self.food.respawn_rate = value,
            Parameter::MinFood => self.food.min_food = value.round() as usize,
            Parameter::MaxFood => self.food.max_food = value.round() as usize,
            Parameter::FoodGain => self.food.food_gain = value as f32,
            Parameter::StaminaGainFromFood => self.food.stamina_gain = value as f32,
            Parameter::StaminaPerStep => self.vitals.stamina_per_step = value as f32,
            Parameter::IdleStaminaGain => self.vitals.idle_stamina_gain = value as f32,
            Parameter::MatingCooldown => self.mating.cooldown = value.round() as u32,
            Parameter::MatingDuration => self.mating.duration = value.round() as u32,
            Parameter::MortalityIncrement => self.vitals.mortality_increment = value,
        }

        parameter.get(self)
    }
}
