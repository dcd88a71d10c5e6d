use anyhow::Result;
use log::{debug, info, trace};

use super::bands::{BandAggregator, BandName};
use super::beat_detector::BeatDetector;
use super::smoother::SpectrumSmoother;
use super::{BandReading, SignalFrame};
use crate::config::EngineConfig;
use crate::effects::{MoodStateMachine, Preset};

const SUMMARY_INTERVAL_FRAMES: u64 = 120;

/// The audio reactive signal engine.
///
/// Owns every piece of per-track state and is advanced once per render
/// frame with the newest spectrum and a monotonic timestamp:
///
/// ```text
/// raw spectrum -> SpectrumSmoother -> BandAggregator -> BeatDetector
///                                                    -> MoodStateMachine
/// ```
///
/// All work is synchronous and bounded by the spectrum length. Nothing is
/// shared between instances, so visualizing several tracks at once means
/// one engine per track.
///
/// ```rust
/// use reactive_signal_engine::{EngineConfig, SignalEngine};
///
/// let config = EngineConfig::default();
/// let mut engine = SignalEngine::new(config.clone())?;
/// let spectrum = vec![0.0; config.spectrum_len()];
/// let frame = engine.process_frame(&spectrum, 0.0);
/// assert!(!frame.beat_detected);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct SignalEngine {
    config: EngineConfig,
    sensitivity: f32,
    smoothing: f32,

    smoother: SpectrumSmoother,
    bands: BandAggregator,
    beat_detector: BeatDetector,
    mood: MoodStateMachine,

    frame_count: u64,
}

impl SignalEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let spectrum_len = config.spectrum_len();
        info!(
            "Signal engine: {} bins at {} Hz ({:.2} Hz per bin)",
            spectrum_len,
            config.sample_rate,
            config.bin_width()
        );

        let bands = BandAggregator::new(&config.bands, config.sample_rate, spectrum_len);
        for band in bands.bands() {
            if band.bin_range().is_none() {
                info!("Band {} covers no bins and will stay at 0", band.name().as_str());
            }
        }

        Ok(Self {
            sensitivity: config.sensitivity,
            smoothing: config.smoothing,
            smoother: SpectrumSmoother::new(spectrum_len, config.input_scale),
            bands,
            beat_detector: BeatDetector::new(&config.beat),
            mood: MoodStateMachine::new(&config.mood),
            frame_count: 0,
            config,
        })
    }

    /// Advance the engine by one frame.
    ///
    /// # Panics
    /// If the spectrum length differs from `config.spectrum_len()`, or the
    /// spectrum or timestamp holds a non-finite value.
    pub fn process_frame(&mut self, spectrum: &[f32], timestamp_ms: f64) -> SignalFrame {
        let normalized = self.smoother.process(spectrum, self.smoothing);
        self.bands.process(normalized, self.sensitivity);

        let energy = self.bands.low_frequency_energy();
        let (beat_detected, beat_strength) = self.beat_detector.detect_beat(energy, timestamp_ms);
        if beat_detected {
            trace!(
                "Beat at {:.1}ms: energy {:.3}, strength {:.2}, {} BPM",
                timestamp_ms,
                energy,
                beat_strength,
                self.beat_detector.bpm()
            );
        }

        let mood_changed = self.mood.update(&self.bands);
        if mood_changed {
            debug!(
                "Mood -> {} (intensity {:.3}) at {:.1}ms",
                self.mood.mood().as_str(),
                self.mood.intensity(),
                timestamp_ms
            );
        }

        self.frame_count += 1;
        if self.frame_count % SUMMARY_INTERVAL_FRAMES == 0 {
            debug!(
                "Frame {}: bass={:.3} mid={:.3} high_mid={:.3} avg_energy={:.3} bpm={} mood={}",
                self.frame_count,
                self.bands.level(BandName::Bass),
                self.bands.level(BandName::Mid),
                self.bands.level(BandName::HighMid),
                self.beat_detector.average_energy(),
                self.beat_detector.bpm(),
                self.mood.mood().as_str()
            );
        }

        SignalFrame {
            timestamp_ms,
            bands: self.band_readings(),
            beat_detected,
            beat_strength,
            bpm: self.beat_detector.bpm(),
            mood: self.mood.mood(),
            mood_changed,
            intensity: self.mood.intensity(),
        }
    }

    fn band_readings(&self) -> [BandReading; 7] {
        BandName::ALL.map(|name| {
            let band = self.bands.band(name);
            BandReading {
                name,
                level: band.level(),
                peak: band.peak(),
            }
        })
    }

    /// Drop all signal state, as when playback stops. Configuration and knobs are kept.
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.bands.reset();
        self.beat_detector.reset();
        self.mood.reset();
        self.frame_count = 0;
        info!("Signal engine reset");
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        assert!(sensitivity.is_finite(), "non-finite sensitivity {}", sensitivity);
        self.sensitivity = sensitivity;
    }

    pub fn set_smoothing(&mut self, smoothing: f32) {
        assert!(smoothing.is_finite(), "non-finite smoothing {}", smoothing);
        self.smoothing = smoothing;
    }

    /// Switch both knobs to a preset without touching signal state.
    pub fn apply_preset(&mut self, preset: Preset) {
        let params = preset.parameters();
        self.set_sensitivity(params.sensitivity);
        self.set_smoothing(params.smoothing);
        info!(
            "Preset {}: sensitivity {}, smoothing {}",
            preset, params.sensitivity, params.smoothing
        );
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn spectrum_len(&self) -> usize {
        self.smoother.len()
    }

    /// Normalized smoothed spectrum from the last frame.
    pub fn smoothed_spectrum(&self) -> &[f32] {
        self.smoother.normalized()
    }

    pub fn bands(&self) -> &BandAggregator {
        &self.bands
    }

    pub fn beat_detector(&self) -> &BeatDetector {
        &self.beat_detector
    }

    pub fn mood_state(&self) -> &MoodStateMachine {
        &self.mood
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
