use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::audio::bands::BandName;

/// Tuning for the whole signal pipeline.
///
/// Every constant the engine uses lives here so that the different
/// visualizer flavours (calmer smoothing, longer mood dwell, other band
/// splits) are configuration rather than code. The defaults reproduce the
/// browser visualizer the engine was built for: a 2048-point analyser at
/// 48 kHz delivering byte-scale magnitudes.
///
/// Configs round-trip through JSON, and any field missing from a file falls
/// back to its default:
///
/// ```rust,no_run
/// use reactive_signal_engine::EngineConfig;
///
/// let mut config = EngineConfig::load("engine.json")?;
/// config.sensitivity = 1.4;
/// config.save("engine.json")?;
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Transform size of the upstream analyser. The spectrum holds `fft_size / 2` bins.
    pub fft_size: usize,
    pub sample_rate: f32,
    /// Full-scale value of an incoming bin (255 for byte frequency data).
    pub input_scale: f32,

    // User knobs, clamped by the caller
    pub sensitivity: f32,
    pub smoothing: f32,

    pub bands: BandConfig,
    pub beat: BeatConfig,
    pub mood: MoodConfig,
    pub analyzer: AnalyzerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            sample_rate: 48000.0,
            input_scale: 255.0,
            sensitivity: 1.0,
            smoothing: 0.9,
            bands: BandConfig::default(),
            beat: BeatConfig::default(),
            mood: MoodConfig::default(),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
    /// `(low_hz, high_hz)` per band, in `BandName::ALL` order.
    pub ranges: [(f32, f32); 7],
    /// Second-stage smoothing applied to each band average.
    pub smoothing_rate: f32,
    /// Per-frame multiplier applied to a peak that was not exceeded.
    pub peak_decay: f32,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            ranges: BandName::ALL.map(BandName::default_range),
            smoothing_rate: 0.1,
            peak_decay: 0.995,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatConfig {
    /// Energy history length in frames (43 frames is ~0.7s at 60 fps).
    pub history_len: usize,
    /// A beat needs energy above `threshold_ratio` times the rolling average.
    pub threshold_ratio: f32,
    /// Absolute energy a beat must exceed, so near-silence never triggers.
    pub energy_floor: f32,
    pub min_interval_ms: f64,
    pub max_intervals: usize,
    /// Intervals required before a BPM estimate is reported.
    pub min_intervals_for_bpm: usize,
}

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            history_len: 43,
            threshold_ratio: 1.3,
            energy_floor: 0.3,
            min_interval_ms: 150.0,
            max_intervals: 10,
            min_intervals_for_bpm: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodConfig {
    pub bass_weight: f32,
    pub mid_weight: f32,
    pub high_mid_weight: f32,
    /// Fraction of the gap to the target intensity closed each frame.
    pub morph_rate: f32,
    pub cooldown_frames: u32,
    /// Ascending lower bounds of Elevated, High and Peak.
    pub thresholds: [f32; 3],
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            bass_weight: 0.4,
            mid_weight: 0.3,
            high_mid_weight: 0.3,
            morph_rate: 0.08,
            cooldown_frames: 60,
            thresholds: [0.3, 0.5, 0.7],
        }
    }
}

/// Byte-spectrum front end settings, matching a browser analyser node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub min_decibels: f32,
    pub max_decibels: f32,
    /// Blend factor between the previous and current magnitude (0 = none).
    pub time_smoothing: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_decibels: -100.0,
            max_decibels: -30.0,
            time_smoothing: 0.85,
        }
    }
}

impl EngineConfig {
    /// Number of bins in every spectrum fed to the engine.
    pub fn spectrum_len(&self) -> usize {
        self.fft_size / 2
    }

    /// Width of one bin in Hz, based on the Nyquist frequency.
    pub fn bin_width(&self) -> f32 {
        (self.sample_rate / 2.0) / self.spectrum_len() as f32
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.fft_size >= 32 && self.fft_size.is_power_of_two(),
            "fft_size must be a power of two >= 32, got {}",
            self.fft_size
        );
        ensure!(
            self.sample_rate.is_finite() && self.sample_rate > 0.0,
            "sample_rate must be positive, got {}",
            self.sample_rate
        );
        ensure!(
            self.input_scale.is_finite() && self.input_scale > 0.0,
            "input_scale must be positive, got {}",
            self.input_scale
        );
        ensure!(self.sensitivity.is_finite(), "sensitivity must be finite");
        ensure!(self.smoothing.is_finite(), "smoothing must be finite");

        for (name, &(low, high)) in BandName::ALL.iter().zip(self.bands.ranges.iter()) {
            ensure!(
                low.is_finite() && high.is_finite() && low >= 0.0,
                "band {} has an invalid range ({}, {})",
                name.as_str(),
                low,
                high
            );
        }
        ensure_rate("bands.smoothing_rate", self.bands.smoothing_rate)?;
        ensure_rate("bands.peak_decay", self.bands.peak_decay)?;

        ensure!(self.beat.history_len > 0, "beat.history_len must be non-zero");
        ensure!(
            self.beat.threshold_ratio.is_finite() && self.beat.energy_floor.is_finite(),
            "beat thresholds must be finite"
        );
        ensure!(
            self.beat.min_interval_ms.is_finite() && self.beat.min_interval_ms >= 0.0,
            "beat.min_interval_ms must be non-negative"
        );
        ensure!(
            self.beat.min_intervals_for_bpm > 0
                && self.beat.max_intervals >= self.beat.min_intervals_for_bpm,
            "beat.max_intervals ({}) must be at least beat.min_intervals_for_bpm ({})",
            self.beat.max_intervals,
            self.beat.min_intervals_for_bpm
        );

        ensure_rate("mood.morph_rate", self.mood.morph_rate)?;
        ensure!(
            [self.mood.bass_weight, self.mood.mid_weight, self.mood.high_mid_weight]
                .iter()
                .all(|w| w.is_finite()),
            "mood weights must be finite"
        );
        let t = self.mood.thresholds;
        ensure!(
            t[0] > 0.0 && t[0] < t[1] && t[1] < t[2] && t[2] <= 1.0,
            "mood.thresholds must ascend strictly inside (0, 1], got {:?}",
            t
        );

        ensure!(
            self.analyzer.min_decibels < self.analyzer.max_decibels,
            "analyzer.min_decibels must be below analyzer.max_decibels"
        );
        ensure!(
            (0.0..1.0).contains(&self.analyzer.time_smoothing),
            "analyzer.time_smoothing must be in [0, 1)"
        );

        Ok(())
    }

    /// Load a config from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&json)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save the config to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }
}

fn ensure_rate(name: &str, value: f32) -> Result<()> {
    ensure!(
        value > 0.0 && value <= 1.0,
        "{} must be in (0, 1], got {}",
        name,
        value
    );
    Ok(())
}
