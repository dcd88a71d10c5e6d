/// Frame-over-frame low-pass filter for the raw magnitude spectrum.
///
/// Rising bins follow the input faster than falling ones, so onsets stay
/// crisp while decays fade out smoothly. With a smoothing setting `s` the
/// attack coefficient is `1 - s * 0.5` and the release coefficient `1 - s`.
///
/// Downstream stages only ever read the normalized copy, which divides the
/// smoothed values by the input scale (255 for byte spectra).
pub struct SpectrumSmoother {
    input_scale: f32,
    smoothed: Vec<f32>,
    normalized: Vec<f32>,
}

impl SpectrumSmoother {
    pub fn new(spectrum_len: usize, input_scale: f32) -> Self {
        Self {
            input_scale,
            smoothed: vec![0.0; spectrum_len],
            normalized: vec![0.0; spectrum_len],
        }
    }

    pub fn len(&self) -> usize {
        self.smoothed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.smoothed.is_empty()
    }

    /// Fold a new raw spectrum into the smoothed state and return the normalized copy.
    ///
    /// # Panics
    /// If `raw` does not have the configured length or contains a non-finite value.
    pub fn process(&mut self, raw: &[f32], smoothing: f32) -> &[f32] {
        assert_eq!(
            raw.len(),
            self.smoothed.len(),
            "spectrum length {} does not match the configured length {}",
            raw.len(),
            self.smoothed.len()
        );

        let (attack, release) = Self::coefficients(smoothing);

        for (i, &value) in raw.iter().enumerate() {
            assert!(value.is_finite(), "non-finite spectrum value {} at bin {}", value, i);
            let target = value.clamp(0.0, self.input_scale);

            let diff = target - self.smoothed[i];
            let coefficient = if diff > 0.0 { attack } else { release };
            self.smoothed[i] += diff * coefficient;
            self.normalized[i] = self.smoothed[i] / self.input_scale;
        }

        &self.normalized
    }

    /// `(attack, release)` coefficients for a smoothing setting.
    pub fn coefficients(smoothing: f32) -> (f32, f32) {
        (1.0 - smoothing * 0.5, 1.0 - smoothing)
    }

    /// Smoothed values in input scale.
    pub fn smoothed(&self) -> &[f32] {
        &self.smoothed
    }

    /// Smoothed values divided by the input scale.
    pub fn normalized(&self) -> &[f32] {
        &self.normalized
    }

    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
        self.normalized.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_attack_is_faster_than_release() {
        let (attack, release) = SpectrumSmoother::coefficients(0.9);
        assert_relative_eq!(attack, 0.55, epsilon = 1e-6);
        assert_relative_eq!(release, 0.1, epsilon = 1e-6);

        let mut smoother = SpectrumSmoother::new(1, 255.0);
        smoother.process(&[255.0], 0.9);
        assert_relative_eq!(smoother.smoothed()[0], 140.25, epsilon = 1e-3);

        // Falling back to silence only releases 10% of the way
        smoother.process(&[0.0], 0.9);
        assert_relative_eq!(smoother.smoothed()[0], 126.225, epsilon = 1e-3);
    }

    #[test]
    fn test_normalized_copy_uses_input_scale() {
        let mut smoother = SpectrumSmoother::new(3, 255.0);
        let normalized = smoother.process(&[255.0, 51.0, 0.0], 0.0).to_vec();
        assert_relative_eq!(normalized[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(normalized[1], 0.2, epsilon = 1e-6);
        assert_eq!(normalized[2], 0.0);
    }

    #[test]
    fn test_constant_input_converges_monotonically() {
        let mut smoother = SpectrumSmoother::new(4, 255.0);
        let raw = [200.0; 4];
        let mut previous = 0.0;
        for _ in 0..200 {
            let value = smoother.process(&raw, 0.9)[0];
            assert!(value >= previous);
            assert!(value <= 200.0 / 255.0 + 1e-6);
            previous = value;
        }
        assert_relative_eq!(previous, 200.0 / 255.0, epsilon = 1e-4);

        let mut previous = previous;
        for _ in 0..400 {
            let value = smoother.process(&[0.0; 4], 0.9)[0];
            assert!(value <= previous);
            previous = value;
        }
        assert!(previous < 1e-4);
    }

    #[test]
    fn test_out_of_range_bins_are_clamped() {
        let mut smoother = SpectrumSmoother::new(2, 255.0);
        let normalized = smoother.process(&[1000.0, -5.0], 0.0).to_vec();
        assert_eq!(normalized, vec![1.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "does not match the configured length")]
    fn test_length_mismatch_panics() {
        let mut smoother = SpectrumSmoother::new(8, 255.0);
        smoother.process(&[0.0; 4], 0.5);
    }

    #[test]
    #[should_panic(expected = "non-finite")]
    fn test_nan_input_panics() {
        let mut smoother = SpectrumSmoother::new(2, 255.0);
        smoother.process(&[0.0, f32::NAN], 0.5);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut smoother = SpectrumSmoother::new(2, 255.0);
        smoother.process(&[100.0, 100.0], 0.5);
        smoother.reset();
        assert!(smoother.smoothed().iter().all(|&v| v == 0.0));
        assert!(smoother.normalized().iter().all(|&v| v == 0.0));
    }
}
