use std::collections::VecDeque;

/// Tempo estimate from the spacing of recent beats.
///
/// Keeps the last `max_intervals` inter-beat intervals (oldest evicted) and
/// reports `60000 / mean interval`, rounded. Until `min_intervals` have been
/// recorded the estimate is 0, meaning "no tempo yet".
pub struct TempoEstimator {
    intervals: VecDeque<f64>,
    max_intervals: usize,
    min_intervals: usize,
    bpm: u32,
}

impl TempoEstimator {
    pub fn new(max_intervals: usize, min_intervals: usize) -> Self {
        Self {
            intervals: VecDeque::with_capacity(max_intervals + 1),
            max_intervals,
            min_intervals,
            bpm: 0,
        }
    }

    /// Record the time between two accepted beats, in milliseconds.
    pub fn push_interval(&mut self, interval_ms: f64) {
        self.intervals.push_back(interval_ms);
        if self.intervals.len() > self.max_intervals {
            self.intervals.pop_front();
        }
        self.bpm = self.estimate();
    }

    fn estimate(&self) -> u32 {
        if self.intervals.len() < self.min_intervals {
            return 0;
        }

        let avg_interval = self.intervals.iter().sum::<f64>() / self.intervals.len() as f64;
        if avg_interval <= 0.0 {
            return 0;
        }
        (60000.0 / avg_interval).round() as u32
    }

    /// Current estimate, 0 when undetermined.
    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    pub fn intervals(&self) -> impl Iterator<Item = f64> + '_ {
        self.intervals.iter().copied()
    }

    pub fn reset(&mut self) {
        self.intervals.clear();
        self.bpm = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_estimate_before_three_intervals() {
        let mut tempo = TempoEstimator::new(10, 3);
        tempo.push_interval(500.0);
        tempo.push_interval(500.0);
        assert_eq!(tempo.bpm(), 0);

        tempo.push_interval(500.0);
        assert_eq!(tempo.bpm(), 120);
    }

    #[test]
    fn test_rounds_to_nearest_bpm() {
        let mut tempo = TempoEstimator::new(10, 3);
        // 60000 / 470 = 127.66
        for _ in 0..3 {
            tempo.push_interval(470.0);
        }
        assert_eq!(tempo.bpm(), 128);
    }

    #[test]
    fn test_oldest_intervals_are_evicted() {
        let mut tempo = TempoEstimator::new(4, 3);
        for _ in 0..4 {
            tempo.push_interval(1000.0);
        }
        assert_eq!(tempo.bpm(), 60);

        for _ in 0..4 {
            tempo.push_interval(400.0);
        }
        assert_eq!(tempo.interval_count(), 4);
        assert!(tempo.intervals().all(|i| i == 400.0));
        assert_eq!(tempo.bpm(), 150);
    }

    #[test]
    fn test_reset_forgets_intervals() {
        let mut tempo = TempoEstimator::new(10, 3);
        for _ in 0..5 {
            tempo.push_interval(500.0);
        }
        tempo.reset();
        assert_eq!(tempo.bpm(), 0);
        assert_eq!(tempo.interval_count(), 0);
    }
}
