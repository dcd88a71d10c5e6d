use serde::{Deserialize, Serialize};

use crate::config::BandConfig;

/// The seven perceptual bands, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandName {
    SubBass,
    Bass,
    LowMid,
    Mid,
    HighMid,
    Presence,
    Brilliance,
}

impl BandName {
    pub const ALL: [BandName; 7] = [
        BandName::SubBass,
        BandName::Bass,
        BandName::LowMid,
        BandName::Mid,
        BandName::HighMid,
        BandName::Presence,
        BandName::Brilliance,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BandName::SubBass => "sub_bass",
            BandName::Bass => "bass",
            BandName::LowMid => "low_mid",
            BandName::Mid => "mid",
            BandName::HighMid => "high_mid",
            BandName::Presence => "presence",
            BandName::Brilliance => "brilliance",
        }
    }

    /// Default `(low_hz, high_hz)` range, together spanning 20 Hz - 20 kHz.
    pub fn default_range(self) -> (f32, f32) {
        match self {
            BandName::SubBass => (20.0, 60.0),
            BandName::Bass => (60.0, 250.0),
            BandName::LowMid => (250.0, 500.0),
            BandName::Mid => (500.0, 2000.0),
            BandName::HighMid => (2000.0, 4000.0),
            BandName::Presence => (4000.0, 6000.0),
            BandName::Brilliance => (6000.0, 20000.0),
        }
    }
}

/// One perceptual band and its per-frame state.
#[derive(Debug, Clone)]
pub struct Band {
    name: BandName,
    low_hz: f32,
    high_hz: f32,
    /// Inclusive bin range, `None` when the band covers no valid bin.
    bins: Option<(usize, usize)>,

    smooth: f32,
    level: f32,
    peak: f32,
}

impl Band {
    pub fn name(&self) -> BandName {
        self.name
    }

    pub fn range_hz(&self) -> (f32, f32) {
        (self.low_hz, self.high_hz)
    }

    pub fn bin_range(&self) -> Option<(usize, usize)> {
        self.bins
    }

    /// Smoothed, sensitivity-scaled energy.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Slowly decaying recent maximum of `level`.
    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Smoothed energy before the sensitivity multiplier.
    pub fn smooth(&self) -> f32 {
        self.smooth
    }

    fn reset(&mut self) {
        self.smooth = 0.0;
        self.level = 0.0;
        self.peak = 0.0;
    }
}

/// Collapses the normalized spectrum into the seven band levels.
///
/// Each band averages its bins, runs the average through a second
/// exponential smoother and scales it by the user sensitivity. Peaks snap up
/// to the level and otherwise decay geometrically, so `peak` reads as a
/// recent maximum rather than an instantaneous value.
pub struct BandAggregator {
    bands: [Band; 7],
    smoothing_rate: f32,
    peak_decay: f32,
}

impl BandAggregator {
    /// Resolve the configured Hz ranges against a spectrum of `spectrum_len` bins.
    pub fn new(config: &BandConfig, sample_rate: f32, spectrum_len: usize) -> Self {
        let bin_width = (sample_rate / 2.0) / spectrum_len as f32;

        let bands = BandName::ALL.map(|name| {
            let (low_hz, high_hz) = config.ranges[name.index()];
            Band {
                name,
                low_hz,
                high_hz,
                bins: bin_range(low_hz, high_hz, bin_width, spectrum_len),
                smooth: 0.0,
                level: 0.0,
                peak: 0.0,
            }
        });

        Self {
            bands,
            smoothing_rate: config.smoothing_rate,
            peak_decay: config.peak_decay,
        }
    }

    /// Recompute every band from this frame's normalized spectrum.
    pub fn process(&mut self, normalized: &[f32], sensitivity: f32) {
        for band in self.bands.iter_mut() {
            let average = match band.bins {
                Some((start, end)) => average_range(normalized, start, end),
                None => 0.0,
            };

            band.smooth += (average - band.smooth) * self.smoothing_rate;
            band.level = band.smooth * sensitivity;

            if band.level > band.peak {
                band.peak = band.level;
            } else {
                band.peak *= self.peak_decay;
            }
        }
    }

    pub fn bands(&self) -> &[Band; 7] {
        &self.bands
    }

    pub fn band(&self, name: BandName) -> &Band {
        &self.bands[name.index()]
    }

    pub fn level(&self, name: BandName) -> f32 {
        self.band(name).level
    }

    /// Sub-bass plus bass level, the signal the beat detector listens to.
    pub fn low_frequency_energy(&self) -> f32 {
        self.level(BandName::SubBass) + self.level(BandName::Bass)
    }

    pub fn reset(&mut self) {
        for band in self.bands.iter_mut() {
            band.reset();
        }
    }
}

/// Map a Hz range onto an inclusive bin range clipped to the spectrum.
fn bin_range(low_hz: f32, high_hz: f32, bin_width: f32, spectrum_len: usize) -> Option<(usize, usize)> {
    if high_hz <= low_hz || spectrum_len == 0 {
        return None;
    }

    let start = (low_hz / bin_width).floor() as usize;
    let end = ((high_hz / bin_width).floor() as usize).min(spectrum_len - 1);

    if start > end {
        return None;
    }
    Some((start, end))
}

fn average_range(data: &[f32], start: usize, end: usize) -> f32 {
    let slice = &data[start..=end];
    slice.iter().sum::<f32>() / slice.len() as f32
}
