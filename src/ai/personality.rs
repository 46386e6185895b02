//! AI personalities and their scoring weights
//!
//! Personalities weight candidate scoring; they never unlock different
//! information or bypass validation. Weights can be overridden from a
//! TOML file for tuning without a rebuild.

use serde::{Deserialize, Serialize};

/// Temperament assigned to an AI-controlled unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiPersonality {
    Aggressive,    // damage dealt above all
    Defensive,     // survival above all
    Opportunistic, // hunts kill shots
    Balanced,
}

/// Candidate scoring weights, in centipoints per unit of each signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Value per point of expected damage dealt
    pub damage: i64,
    /// Penalty per point of expected counter damage taken
    pub exposure: i64,
    /// Flat bonus when the strike is a guaranteed kill
    pub kill_bonus: i64,
    /// Penalty per 100 ticks of action weight
    pub tempo: i64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self { damage: 100, exposure: 60, kill_bonus: 500, tempo: 40 }
    }
}

impl ScoringWeights {
    pub fn for_personality(personality: AiPersonality) -> Self {
        match personality {
            AiPersonality::Aggressive => Self { damage: 160, exposure: 20, kill_bonus: 500, tempo: 30 },
            AiPersonality::Defensive => Self { damage: 70, exposure: 150, kill_bonus: 400, tempo: 60 },
            AiPersonality::Opportunistic => {
                Self { damage: 90, exposure: 60, kill_bonus: 1200, tempo: 40 }
            }
            AiPersonality::Balanced => Self::default(),
        }
    }
}

/// Weight table for every personality, loadable from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalityConfig {
    #[serde(default)]
    pub aggressive: Option<ScoringWeights>,
    #[serde(default)]
    pub defensive: Option<ScoringWeights>,
    #[serde(default)]
    pub opportunistic: Option<ScoringWeights>,
    #[serde(default)]
    pub balanced: Option<ScoringWeights>,
}

impl PersonalityConfig {
    /// Parse a TOML weight table; sections are optional and fall back
    /// to the built-in values.
    pub fn from_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("bad personality config: {}", e))
    }

    pub fn weights(&self, personality: AiPersonality) -> ScoringWeights {
        let overridden = match personality {
            AiPersonality::Aggressive => &self.aggressive,
            AiPersonality::Defensive => &self.defensive,
            AiPersonality::Opportunistic => &self.opportunistic,
            AiPersonality::Balanced => &self.balanced,
        };
        overridden
            .clone()
            .unwrap_or_else(|| ScoringWeights::for_personality(personality))
    }
}
