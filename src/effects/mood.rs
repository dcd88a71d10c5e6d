use serde::{Deserialize, Serialize};

use crate::audio::bands::{BandAggregator, BandName};
use crate::config::MoodConfig;

/// Discrete mood, ordered from least to most intense.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    #[default]
    Calm,
    Elevated,
    High,
    Peak,
}

impl Mood {
    pub const ALL: [Mood; 4] = [Mood::Calm, Mood::Elevated, Mood::High, Mood::Peak];

    /// Map an intensity onto a mood using ascending lower bounds for
    /// Elevated, High and Peak. Anything below the first bound is Calm.
    pub fn from_intensity(intensity: f32, thresholds: &[f32; 3]) -> Mood {
        let tier = thresholds.iter().filter(|&&t| intensity >= t).count();
        Mood::ALL[tier]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Calm => "calm",
            Mood::Elevated => "elevated",
            Mood::High => "high",
            Mood::Peak => "peak",
        }
    }
}

/// Turns band levels into a smoothed intensity and a debounced mood.
///
/// The intensity target is a weighted sum of bass, mid and high-mid levels,
/// clamped to `[0, 1]`, and the smoothed intensity closes `morph_rate` of the
/// gap each frame. A new mood is only applied once the cooldown has run out,
/// and applying one restarts it, so intensity hovering on a threshold cannot
/// make the mood flicker.
pub struct MoodStateMachine {
    config: MoodConfig,

    raw_intensity: f32,
    intensity: f32,
    mood: Mood,
    cooldown: u32,
}

impl MoodStateMachine {
    pub fn new(config: &MoodConfig) -> Self {
        Self {
            config: config.clone(),
            raw_intensity: 0.0,
            intensity: 0.0,
            mood: Mood::Calm,
            cooldown: 0,
        }
    }

    /// Weighted, clamped intensity target for the current band levels.
    pub fn weighted_intensity(&self, bands: &BandAggregator) -> f32 {
        let weighted = bands.level(BandName::Bass) * self.config.bass_weight
            + bands.level(BandName::Mid) * self.config.mid_weight
            + bands.level(BandName::HighMid) * self.config.high_mid_weight;
        weighted.clamp(0.0, 1.0)
    }

    /// Advance one frame from band levels. Returns true when the mood changed.
    pub fn update(&mut self, bands: &BandAggregator) -> bool {
        let target = self.weighted_intensity(bands);
        self.update_intensity(target)
    }

    /// Advance one frame toward an intensity target. Returns true when the mood changed.
    pub fn update_intensity(&mut self, target: f32) -> bool {
        assert!(target.is_finite(), "non-finite intensity target {}", target);

        self.raw_intensity = target.clamp(0.0, 1.0);
        self.intensity += (self.raw_intensity - self.intensity) * self.config.morph_rate;

        if self.cooldown > 0 {
            self.cooldown -= 1;
        }

        let target_mood = Mood::from_intensity(self.intensity, &self.config.thresholds);
        if target_mood == self.mood || self.cooldown > 0 {
            return false;
        }

        self.mood = target_mood;
        self.cooldown = self.config.cooldown_frames;
        true
    }

    pub fn mood(&self) -> Mood {
        self.mood
    }

    /// Smoothed intensity in `[0, 1]`.
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// This frame's unsmoothed target.
    pub fn raw_intensity(&self) -> f32 {
        self.raw_intensity
    }

    /// Frames left before another transition is allowed.
    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    pub fn reset(&mut self) {
        self.raw_intensity = 0.0;
        self.intensity = 0.0;
        self.mood = Mood::Calm;
        self.cooldown = 0;
    }
}
