use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::config::AnalyzerConfig;

/// PCM to byte-scale magnitude spectrum, the input format the engine expects.
///
/// Mirrors what a browser analyser node hands out: a Hann-windowed FFT,
/// magnitudes scaled by `1 / fft_size`, blended with the previous frame,
/// converted to decibels and mapped linearly from `[min_decibels,
/// max_decibels]` onto `[0, 255]`.
pub struct SpectrumAnalyzer {
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,

    magnitudes: Vec<f32>,
    spectrum: Vec<f32>,

    min_decibels: f32,
    max_decibels: f32,
    time_smoothing: f32,
}

impl SpectrumAnalyzer {
    pub fn new(fft_size: usize, config: &AnalyzerConfig) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            fft_size,
            fft,
            window: Self::hann_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            magnitudes: vec![0.0; fft_size / 2],
            spectrum: vec![0.0; fft_size / 2],
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
            time_smoothing: config.time_smoothing,
        }
    }

    fn hann_window(size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect()
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Analyze up to `fft_size` samples (zero-padded when shorter) and return
    /// `fft_size / 2` byte-scale magnitudes.
    ///
    /// # Panics
    /// If a sample is NaN or infinite. It would spread through the FFT and
    /// stay in the blended magnitudes for every later frame.
    pub fn analyze(&mut self, samples: &[f32]) -> &[f32] {
        let len = self.fft_size.min(samples.len());
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < len {
                assert!(samples[i].is_finite(), "non-finite sample at {}", i);
                samples[i] * self.window[i]
            } else {
                0.0
            };
            *slot = Complex::new(sample, 0.0);
        }

        self.fft.process(&mut self.buffer);

        let scale = 1.0 / self.fft_size as f32;
        let range = self.max_decibels - self.min_decibels;
        for (k, bin) in self.buffer[..self.fft_size / 2].iter().enumerate() {
            let magnitude = bin.norm() * scale;
            let blended =
                self.time_smoothing * self.magnitudes[k] + (1.0 - self.time_smoothing) * magnitude;
            self.magnitudes[k] = blended;

            self.spectrum[k] = if blended > 0.0 {
                let db = 20.0 * blended.log10();
                (255.0 * (db - self.min_decibels) / range).floor().clamp(0.0, 255.0)
            } else {
                0.0
            };
        }

        &self.spectrum
    }

    /// Forget the blended magnitudes from previous frames.
    pub fn reset(&mut self) {
        self.magnitudes.fill(0.0);
        self.spectrum.fill(0.0);
    }
}
