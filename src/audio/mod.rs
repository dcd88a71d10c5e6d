pub mod analyzer;
pub mod bands;
pub mod beat_detector;
pub mod engine;
pub mod scan;
pub mod smoother;
pub mod tempo;

pub use analyzer::SpectrumAnalyzer;
pub use bands::{Band, BandAggregator, BandName};
pub use beat_detector::BeatDetector;
pub use engine::SignalEngine;
pub use scan::{ScanProcessor, ScanReport};
pub use smoother::SpectrumSmoother;
pub use tempo::TempoEstimator;

use serde::{Deserialize, Serialize};

use crate::effects::Mood;

/// Everything a renderer reads after one engine step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalFrame {
    pub timestamp_ms: f64,
    pub bands: [BandReading; 7],
    pub beat_detected: bool,
    pub beat_strength: f32,
    /// Tempo estimate, 0 until enough beats have been seen.
    pub bpm: u32,
    pub mood: Mood,
    /// True only on the frame the mood switched.
    pub mood_changed: bool,
    /// Smoothed intensity (0.0-1.0)
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BandReading {
    pub name: BandName,
    pub level: f32,
    pub peak: f32,
}

impl SignalFrame {
    pub fn band(&self, name: BandName) -> &BandReading {
        &self.bands[name.index()]
    }
}

impl Default for SignalFrame {
    fn default() -> Self {
        Self {
            timestamp_ms: 0.0,
            bands: BandName::ALL.map(|name| BandReading {
                name,
                level: 0.0,
                peak: 0.0,
            }),
            beat_detected: false,
            beat_strength: 0.0,
            bpm: 0,
            mood: Mood::Calm,
            mood_changed: false,
            intensity: 0.0,
        }
    }
}
