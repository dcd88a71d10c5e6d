use super::tempo::TempoEstimator;
use crate::config::BeatConfig;

/// Fixed-capacity ring of recent energies. Starts zero-filled and always
/// averages over its full capacity.
struct EnergyHistory {
    values: Vec<f32>,
    write: usize,
}

impl EnergyHistory {
    fn new(capacity: usize) -> Self {
        Self {
            values: vec![0.0; capacity],
            write: 0,
        }
    }

    fn push(&mut self, value: f32) {
        self.values[self.write] = value;
        self.write = (self.write + 1) % self.values.len();
    }

    fn mean(&self) -> f32 {
        self.values.iter().sum::<f32>() / self.values.len() as f32
    }

    fn clear(&mut self) {
        self.values.fill(0.0);
        self.write = 0;
    }
}

/// Adaptive-threshold beat detector over low-frequency energy.
///
/// Each frame's energy is compared with the rolling mean of the last few
/// frames. A beat needs energy above `threshold_ratio` times that mean and
/// above an absolute floor, and must come at least `min_interval_ms` after
/// the previous accepted beat. Accepted beats feed the tempo estimator.
///
/// Silence needs no special handling: the history decays toward zero by
/// itself, so the first transient after a pause is still detected.
pub struct BeatDetector {
    history: EnergyHistory,
    threshold_ratio: f32,
    energy_floor: f32,
    min_interval_ms: f64,

    last_beat_ms: Option<f64>,
    average_energy: f32,
    beat_detected: bool,
    tempo: TempoEstimator,
}

impl BeatDetector {
    pub fn new(config: &BeatConfig) -> Self {
        Self {
            history: EnergyHistory::new(config.history_len),
            threshold_ratio: config.threshold_ratio,
            energy_floor: config.energy_floor,
            min_interval_ms: config.min_interval_ms,
            last_beat_ms: None,
            average_energy: 0.0,
            beat_detected: false,
            tempo: TempoEstimator::new(config.max_intervals, config.min_intervals_for_bpm),
        }
    }

    /// Decide whether `now_ms` is a beat. Returns `(beat_detected, beat_strength)`.
    ///
    /// # Panics
    /// If `energy` or `now_ms` is not finite.
    pub fn detect_beat(&mut self, energy: f32, now_ms: f64) -> (bool, f32) {
        assert!(energy.is_finite(), "non-finite beat energy {}", energy);
        assert!(now_ms.is_finite(), "non-finite timestamp {}", now_ms);

        self.history.push(energy);
        self.average_energy = self.history.mean();

        let threshold = self.average_energy * self.threshold_ratio;
        let candidate = energy > threshold && energy > self.energy_floor;

        let can_beat = match self.last_beat_ms {
            Some(last) => now_ms - last >= self.min_interval_ms,
            None => true,
        };

        self.beat_detected = candidate && can_beat;
        if !self.beat_detected {
            return (false, 0.0);
        }

        if let Some(last) = self.last_beat_ms {
            self.tempo.push_interval(now_ms - last);
        }
        self.last_beat_ms = Some(now_ms);

        let beat_strength = energy / self.average_energy.max(0.001);
        (true, beat_strength.min(5.0))
    }

    /// True only on the frame a beat was accepted.
    pub fn beat_detected(&self) -> bool {
        self.beat_detected
    }

    /// Current tempo estimate, 0 while undetermined.
    pub fn bpm(&self) -> u32 {
        self.tempo.bpm()
    }

    pub fn tempo(&self) -> &TempoEstimator {
        &self.tempo
    }

    pub fn average_energy(&self) -> f32 {
        self.average_energy
    }

    pub fn last_beat_ms(&self) -> Option<f64> {
        self.last_beat_ms
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.last_beat_ms = None;
        self.average_energy = 0.0;
        self.beat_detected = false;
        self.tempo.reset();
    }
}
