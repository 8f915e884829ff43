//! Engine tuning values.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::data::EnemyTier;
use crate::error::ConfigError;

/// How spent cards are accounted for between combats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpendingPolicy {
    /// Spent cards are gone for good.
    Absolute,
    /// Cards spent during a combat come back on victory.
    #[default]
    PerInstance,
    /// Unlocks look at the most cards ever held.
    Relative,
}

impl SpendingPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Absolute => "absolute",
            Self::PerInstance => "per-instance",
            Self::Relative => "relative",
        }
    }
}

impl fmt::Display for SpendingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpendingPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absolute" => Ok(Self::Absolute),
            "per-instance" | "per_instance" | "instance" => Ok(Self::PerInstance),
            "relative" => Ok(Self::Relative),
            _ => Err(()),
        }
    }
}

const fn default_tier1_weight() -> f32 {
    60.0
}

const fn default_tier2_weight() -> f32 {
    30.0
}

const fn default_tier3_weight() -> f32 {
    10.0
}

/// Relative odds of each tier; normalized by their sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierWeights {
    #[serde(default = "default_tier1_weight")]
    pub tier1: f32,
    #[serde(default = "default_tier2_weight")]
    pub tier2: f32,
    #[serde(default = "default_tier3_weight")]
    pub tier3: f32,
}

impl Default for TierWeights {
    fn default() -> Self {
        Self {
            tier1: default_tier1_weight(),
            tier2: default_tier2_weight(),
            tier3: default_tier3_weight(),
        }
    }
}

impl TierWeights {
    #[must_use]
    pub const fn weight(&self, tier: EnemyTier) -> f32 {
        match tier {
            EnemyTier::Tier1 => self.tier1,
            EnemyTier::Tier2 => self.tier2,
            EnemyTier::Tier3 => self.tier3,
        }
    }

    #[must_use]
    pub fn total(&self) -> f32 {
        self.tier1 + self.tier2 + self.tier3
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let weights = [self.tier1, self.tier2, self.tier3];
        let usable = weights.iter().all(|w| w.is_finite() && *w >= 0.0) && self.total() > 0.0;
        if usable {
            Ok(())
        } else {
            Err(ConfigError::InvalidTierWeights {
                tier1: self.tier1,
                tier2: self.tier2,
                tier3: self.tier3,
            })
        }
    }
}

const fn default_max_life() -> i32 {
    100
}

const fn default_starter_cards() -> u32 {
    5
}

const fn default_random_card_chance() -> f32 {
    30.0
}

const fn default_base_curse_chance() -> f32 {
    5.0
}

const fn default_curse_chance_per_turn() -> f32 {
    5.0
}

const fn default_spirit_curse_chance() -> f32 {
    80.0
}

const fn default_dice_max() -> u32 {
    12
}

const fn default_curse_choice_count() -> usize {
    3
}

/// Tunables shared by every run of a coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_max_life")]
    pub max_life: i32,
    #[serde(default = "default_starter_cards")]
    pub starter_cards: u32,
    /// Percent chance of a card after a victory without a weakness exploit.
    #[serde(default = "default_random_card_chance")]
    pub random_card_chance: f32,
    #[serde(default = "default_base_curse_chance")]
    pub base_curse_chance: f32,
    #[serde(default = "default_curse_chance_per_turn")]
    pub curse_chance_per_turn: f32,
    #[serde(default = "default_spirit_curse_chance")]
    pub spirit_curse_chance: f32,
    #[serde(default)]
    pub tier_weights: TierWeights,
    #[serde(default)]
    pub spending_policy: SpendingPolicy,
    #[serde(default = "default_dice_max")]
    pub default_dice_max: u32,
    #[serde(default = "default_curse_choice_count")]
    pub curse_choice_count: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_life: default_max_life(),
            starter_cards: default_starter_cards(),
            random_card_chance: default_random_card_chance(),
            base_curse_chance: default_base_curse_chance(),
            curse_chance_per_turn: default_curse_chance_per_turn(),
            spirit_curse_chance: default_spirit_curse_chance(),
            tier_weights: TierWeights::default(),
            spending_policy: SpendingPolicy::default(),
            default_dice_max: default_dice_max(),
            curse_choice_count: default_curse_choice_count(),
        }
    }
}

impl EngineConfig {
    /// Parse a config document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Returns the first out-of-range value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_life <= 0 {
            return Err(ConfigError::NonPositiveMaxLife(self.max_life));
        }
        if self.default_dice_max == 0 {
            return Err(ConfigError::InvalidDiceMax);
        }
        for (field, value) in [
            ("random_card_chance", self.random_card_chance),
            ("base_curse_chance", self.base_curse_chance),
            ("curse_chance_per_turn", self.curse_chance_per_turn),
            ("spirit_curse_chance", self.spirit_curse_chance),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::ChanceOutOfRange { field, value });
            }
        }
        self.tier_weights.validate()
    }
}
