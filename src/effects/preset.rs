use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::EngineConfig;

/// Named listening presets that set the two user knobs together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Chill,
    Party,
    Focus,
    Hype,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresetParameters {
    pub sensitivity: f32,
    pub smoothing: f32,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Preset::Chill, Preset::Party, Preset::Focus, Preset::Hype];

    pub fn parameters(self) -> PresetParameters {
        match self {
            Preset::Chill => PresetParameters {
                sensitivity: 0.6,
                smoothing: 0.95,
            },
            Preset::Party => PresetParameters {
                sensitivity: 1.4,
                smoothing: 0.8,
            },
            Preset::Focus => PresetParameters {
                sensitivity: 1.0,
                smoothing: 0.9,
            },
            Preset::Hype => PresetParameters {
                sensitivity: 1.8,
                smoothing: 0.7,
            },
        }
    }

    /// Write this preset's knobs into a config.
    pub fn apply_to(self, config: &mut EngineConfig) {
        let params = self.parameters();
        config.sensitivity = params.sensitivity;
        config.smoothing = params.smoothing;
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Preset::Chill => "chill",
            Preset::Party => "party",
            Preset::Focus => "focus",
            Preset::Hype => "hype",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_lowercase();
        match Preset::ALL.iter().find(|p| p.as_str() == name) {
            Some(&preset) => Ok(preset),
            None => bail!(
                "unknown preset '{}', expected one of: chill, party, focus, hype",
                s
            ),
        }
    }
}
