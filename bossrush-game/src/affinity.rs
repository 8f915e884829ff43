//! Elemental affinities, resistance multipliers and per-affinity storage.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Multiplier at or above which a victory counts as a weakness exploit.
pub const WEAKNESS_MULTIPLIER: f32 = 1.5;

/// The three attack categories shared by cards, abilities and enemy resistances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AffinityType {
    Force,
    Agility,
    Skill,
}

impl AffinityType {
    pub const ALL: [Self; 3] = [Self::Force, Self::Agility, Self::Skill];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Force => "force",
            Self::Agility => "agility",
            Self::Skill => "skill",
        }
    }

    /// Uniform draw over the three affinities.
    pub fn random<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for AffinityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AffinityType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "force" => Ok(Self::Force),
            "agility" => Ok(Self::Agility),
            "skill" => Ok(Self::Skill),
            _ => Err(()),
        }
    }
}

/// An enemy's resistance profile against one affinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AffinityMultiplier {
    Immune,
    Strong,
    #[default]
    Neutral,
    Weak,
}

impl AffinityMultiplier {
    #[must_use]
    pub const fn factor(self) -> f32 {
        match self {
            Self::Immune => 0.0,
            Self::Strong => 0.5,
            Self::Neutral => 1.0,
            Self::Weak => 1.5,
        }
    }
}

/// Fixed storage with one slot per affinity.
///
/// Lookups are exhaustive at compile time, so there is no "missing key" case
/// to handle at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AffinityTable<T> {
    #[serde(default)]
    pub force: T,
    #[serde(default)]
    pub agility: T,
    #[serde(default)]
    pub skill: T,
}

impl<T> AffinityTable<T> {
    pub const fn new(force: T, agility: T, skill: T) -> Self {
        Self {
            force,
            agility,
            skill,
        }
    }

    pub const fn get(&self, affinity: AffinityType) -> &T {
        match affinity {
            AffinityType::Force => &self.force,
            AffinityType::Agility => &self.agility,
            AffinityType::Skill => &self.skill,
        }
    }

    pub const fn get_mut(&mut self, affinity: AffinityType) -> &mut T {
        match affinity {
            AffinityType::Force => &mut self.force,
            AffinityType::Agility => &mut self.agility,
            AffinityType::Skill => &mut self.skill,
        }
    }

    /// Iterate `(affinity, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (AffinityType, &T)> {
        AffinityType::ALL
            .into_iter()
            .map(move |affinity| (affinity, self.get(affinity)))
    }

    pub fn map<U>(&self, mut f: impl FnMut(AffinityType, &T) -> U) -> AffinityTable<U> {
        AffinityTable {
            force: f(AffinityType::Force, &self.force),
            agility: f(AffinityType::Agility, &self.agility),
            skill: f(AffinityType::Skill, &self.skill),
        }
    }
}

impl<T: Copy> AffinityTable<T> {
    pub const fn splat(value: T) -> Self {
        Self::new(value, value, value)
    }
}

impl AffinityTable<u32> {
    #[must_use]
    pub fn total(&self) -> u32 {
        self.force
            .saturating_add(self.agility)
            .saturating_add(self.skill)
    }
}
