use anyhow::{bail, ensure, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::{BandName, SignalEngine, SignalFrame, SpectrumAnalyzer};
use crate::config::EngineConfig;
use crate::effects::Mood;

/// Result of running the engine over a whole recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub file_info: FileInfo,

    /// Per-frame engine output, empty unless frames were requested
    pub frames: Vec<SignalFrame>,

    pub statistics: ScanStatistics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    pub duration_seconds: f32,
    pub sample_rate: u32,
    pub total_samples: usize,
    pub frame_rate: f32,
    pub frame_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanStatistics {
    pub total_beats: u32,
    /// Tempo estimate at the end of the recording (0 = none)
    pub final_bpm: u32,
    /// Lowest and highest estimate over frames that had one
    pub bpm_range: Option<(u32, u32)>,

    /// Highest level reached per band
    pub peak_levels: HashMap<String, f32>,

    pub mood_frames: HashMap<String, u64>,
    pub mood_transitions: u32,
    pub dominant_mood: Mood,
}

impl Default for ScanStatistics {
    fn default() -> Self {
        Self {
            total_beats: 0,
            final_bpm: 0,
            bpm_range: None,
            peak_levels: BandName::ALL
                .iter()
                .map(|name| (name.as_str().to_string(), 0.0))
                .collect(),
            mood_frames: Mood::ALL
                .iter()
                .map(|mood| (mood.as_str().to_string(), 0))
                .collect(),
            mood_transitions: 0,
            dominant_mood: Mood::Calm,
        }
    }
}

impl ScanStatistics {
    fn record(&mut self, frame: &SignalFrame) {
        for band in frame.bands.iter() {
            let peak = self
                .peak_levels
                .entry(band.name.as_str().to_string())
                .or_insert(0.0);
            *peak = peak.max(band.level);
        }

        if frame.beat_detected {
            self.total_beats += 1;
        }
        if frame.bpm > 0 {
            self.bpm_range = Some(match self.bpm_range {
                Some((low, high)) => (low.min(frame.bpm), high.max(frame.bpm)),
                None => (frame.bpm, frame.bpm),
            });
        }
        self.final_bpm = frame.bpm;

        *self
            .mood_frames
            .entry(frame.mood.as_str().to_string())
            .or_insert(0) += 1;
        if frame.mood_changed {
            self.mood_transitions += 1;
        }
    }

    fn finish(&mut self) {
        self.dominant_mood = Mood::ALL
            .iter()
            .copied()
            .max_by_key(|mood| self.mood_frames.get(mood.as_str()).copied().unwrap_or(0))
            .unwrap_or(Mood::Calm);
    }
}

/// Drives the analyzer and engine over a recording at a fixed render cadence.
///
/// With the default config the analyzer blends each frame with 85% of the
/// previous one, like a browser analyser node. The decibel mapping then keeps
/// low-frequency energy near its ceiling between kicks, so after the energy
/// history fills (43 frames) the threshold is rarely crossed. Beats then
/// cluster in the first second while the zero-filled history warms up, and
/// `final_bpm` reflects those closely spaced early beats. Set
/// `analyzer.time_smoothing` to 0 to track beats in offline PCM.
pub struct ScanProcessor {
    config: EngineConfig,
    frame_rate: f32,
    keep_frames: bool,
}

impl ScanProcessor {
    pub fn new(config: EngineConfig, frame_rate: f32) -> Self {
        Self {
            config,
            frame_rate,
            keep_frames: false,
        }
    }

    /// Keep every `SignalFrame` in the report.
    pub fn with_frames(mut self, keep_frames: bool) -> Self {
        self.keep_frames = keep_frames;
        self
    }

    pub fn scan_file<P: AsRef<Path>>(&self, path: P) -> Result<ScanReport> {
        let path = path.as_ref();
        info!("Scanning audio file: {}", path.display());

        let (samples, sample_rate) = load_wav(path)?;
        self.scan_samples(&samples, sample_rate, &path.to_string_lossy())
    }

    /// Scan mono samples. Frame `n` analyzes the `fft_size` samples starting
    /// at `n * sample_rate / frame_rate` and is stamped with that position.
    pub fn scan_samples(&self, samples: &[f32], sample_rate: u32, filename: &str) -> Result<ScanReport> {
        ensure!(
            self.frame_rate.is_finite() && self.frame_rate > 0.0,
            "frame rate must be positive, got {}",
            self.frame_rate
        );
        ensure!(sample_rate > 0, "sample rate must be positive");
        if let Some(index) = first_non_finite(samples) {
            bail!("{}: non-finite sample at index {}", filename, index);
        }

        let mut config = self.config.clone();
        if config.sample_rate != sample_rate as f32 {
            info!(
                "Building engine for the file's {} Hz instead of the configured {} Hz",
                sample_rate, config.sample_rate
            );
            config.sample_rate = sample_rate as f32;
        }

        let mut analyzer = SpectrumAnalyzer::new(config.fft_size, &config.analyzer);
        let mut engine = SignalEngine::new(config)?;

        let total_samples = samples.len();
        let duration_seconds = total_samples as f32 / sample_rate as f32;
        let hop = sample_rate as f64 / self.frame_rate as f64;

        let mut frames = Vec::new();
        let mut statistics = ScanStatistics::default();
        let mut frame_count = 0usize;

        loop {
            let position = (frame_count as f64 * hop).round() as usize;
            if position >= total_samples {
                break;
            }

            let end = (position + analyzer.fft_size()).min(total_samples);
            let spectrum = analyzer.analyze(&samples[position..end]);
            let timestamp_ms = position as f64 / sample_rate as f64 * 1000.0;

            let frame = engine.process_frame(spectrum, timestamp_ms);
            statistics.record(&frame);
            if self.keep_frames {
                frames.push(frame);
            }

            frame_count += 1;
            if frame_count % 1000 == 0 {
                info!(
                    "Scanned {} frames ({:.1}s of {:.1}s)",
                    frame_count,
                    timestamp_ms / 1000.0,
                    duration_seconds
                );
            }
        }

        statistics.finish();

        info!(
            "Scan complete: {} frames, {} beats, {} BPM, mostly {}",
            frame_count,
            statistics.total_beats,
            statistics.final_bpm,
            statistics.dominant_mood.as_str()
        );

        Ok(ScanReport {
            file_info: FileInfo {
                filename: filename.to_string(),
                duration_seconds,
                sample_rate,
                total_samples,
                frame_rate: self.frame_rate,
                frame_count,
            },
            frames,
            statistics,
        })
    }

    pub fn save_report<P: AsRef<Path>>(report: &ScanReport, output_path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(output_path, json)?;
        Ok(())
    }

    pub fn load_report<P: AsRef<Path>>(input_path: P) -> Result<ScanReport> {
        let json = std::fs::read_to_string(input_path)?;
        let report: ScanReport = serde_json::from_str(&json)?;
        Ok(report)
    }
}

/// Read a WAV file as mono `f32` samples, returning them with the sample rate.
pub fn load_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u32)> {
    let path = path.as_ref();
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("opening WAV file {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let full_scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    if let Some(index) = first_non_finite(&interleaved) {
        bail!("{}: non-finite sample at index {}", path.display(), index);
    }

    // Mix down to mono
    let mono = interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    Ok((mono, spec.sample_rate))
}

fn first_non_finite(samples: &[f32]) -> Option<usize> {
    samples.iter().position(|s| !s.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 48000;

    /// A 70 Hz kick lasting 120ms every 500ms, silence in between.
    fn kick_track(seconds: f32) -> Vec<f32> {
        let total = (SAMPLE_RATE as f32 * seconds) as usize;
        (0..total)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                if (t * 1000.0) % 500.0 < 120.0 {
                    0.8 * (2.0 * std::f32::consts::PI * 70.0 * t).sin()
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn scan_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.analyzer.time_smoothing = 0.0;
        config
    }

    #[test]
    fn test_scan_finds_the_pulse() {
        let samples = kick_track(6.0);
        let report = ScanProcessor::new(scan_config(), 60.0)
            .scan_samples(&samples, SAMPLE_RATE, "kick")
            .unwrap();

        assert_eq!(report.file_info.frame_count, 360);
        assert!(report.frames.is_empty());
        assert!(report.statistics.total_beats >= 8, "{:?}", report.statistics);
        assert!(
            (110..=130).contains(&report.statistics.final_bpm),
            "{:?}",
            report.statistics
        );
        assert!(report.statistics.peak_levels["bass"] > report.statistics.peak_levels["brilliance"]);

        let mood_total: u64 = report.statistics.mood_frames.values().sum();
        assert_eq!(mood_total, 360);
    }

    #[test]
    fn test_default_time_smoothing_only_catches_warm_up_beats() {
        let samples = kick_track(6.0);

        let blended = ScanProcessor::new(EngineConfig::default(), 60.0)
            .with_frames(true)
            .scan_samples(&samples, SAMPLE_RATE, "kick")
            .unwrap();
        assert!(blended.statistics.total_beats > 0);
        assert!(blended
            .frames
            .iter()
            .filter(|f| f.beat_detected)
            .all(|f| f.timestamp_ms < 1000.0));

        let unblended = ScanProcessor::new(scan_config(), 60.0)
            .with_frames(true)
            .scan_samples(&samples, SAMPLE_RATE, "kick")
            .unwrap();
        assert!(unblended
            .frames
            .iter()
            .any(|f| f.beat_detected && f.timestamp_ms > 3000.0));
    }

    #[test]
    fn test_silence_scan() {
        let samples = vec![0.0; SAMPLE_RATE as usize];
        let report = ScanProcessor::new(EngineConfig::default(), 60.0)
            .with_frames(true)
            .scan_samples(&samples, SAMPLE_RATE, "silence")
            .unwrap();

        assert_eq!(report.frames.len(), 60);
        assert_eq!(report.statistics.total_beats, 0);
        assert_eq!(report.statistics.final_bpm, 0);
        assert_eq!(report.statistics.bpm_range, None);
        assert_eq!(report.statistics.dominant_mood, Mood::Calm);
        assert_eq!(report.statistics.mood_transitions, 0);
    }

    #[test]
    fn test_engine_follows_file_sample_rate() {
        let samples = vec![0.0; 44100];
        let report = ScanProcessor::new(EngineConfig::default(), 30.0)
            .scan_samples(&samples, 44100, "cd")
            .unwrap();
        assert_eq!(report.file_info.sample_rate, 44100);
        assert_eq!(report.file_info.frame_count, 30);
    }

    #[test]
    fn test_rejects_zero_frame_rate() {
        let result = ScanProcessor::new(EngineConfig::default(), 0.0).scan_samples(&[0.0; 16], SAMPLE_RATE, "x");
        assert!(result.is_err());
    }

    #[test]
    fn test_non_finite_samples_are_rejected() {
        let mut samples = kick_track(1.0);
        samples[1000] = f32::NAN;
        let err = ScanProcessor::new(scan_config(), 60.0)
            .scan_samples(&samples, SAMPLE_RATE, "nan")
            .unwrap_err();
        assert!(err.to_string().contains("index 1000"), "{}", err);
    }

    #[test]
    fn test_float_wav_with_nan_fails_to_scan() {
        let path = std::env::temp_dir().join("reactive_signal_engine_nan_test.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for (i, sample) in kick_track(1.0).into_iter().enumerate() {
            let value = if i == 1000 { f32::NAN } else { sample };
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();

        let result = ScanProcessor::new(scan_config(), 60.0).scan_file(&path);
        let _ = std::fs::remove_file(&path);

        let err = result.unwrap_err();
        assert!(err.to_string().contains("non-finite sample at index 1000"), "{}", err);
    }

    #[test]
    fn test_wav_file_scan_and_report_file() {
        let dir = std::env::temp_dir();
        let wav_path = dir.join("reactive_signal_engine_scan_test.wav");
        let report_path = dir.join("reactive_signal_engine_scan_test.json");

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&wav_path, spec).unwrap();
        for sample in kick_track(6.0) {
            let value = (sample * i16::MAX as f32) as i16;
            writer.write_sample(value).unwrap();
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();

        let (mono, rate) = load_wav(&wav_path).unwrap();
        assert_eq!(rate, SAMPLE_RATE);
        assert_eq!(mono.len(), SAMPLE_RATE as usize * 6);

        let report = ScanProcessor::new(scan_config(), 60.0).scan_file(&wav_path).unwrap();
        assert!(report.statistics.total_beats >= 8);

        ScanProcessor::save_report(&report, &report_path).unwrap();
        let loaded = ScanProcessor::load_report(&report_path).unwrap();
        assert_eq!(loaded.statistics.total_beats, report.statistics.total_beats);
        assert_eq!(loaded.file_info.frame_count, 360);

        let _ = std::fs::remove_file(&wav_path);
        let _ = std::fs::remove_file(&report_path);
    }
}
