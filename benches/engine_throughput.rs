//! Per-frame cost of the engine and the PCM front end.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reactive_signal_engine::config::AnalyzerConfig;
use reactive_signal_engine::{EngineConfig, SignalEngine, SpectrumAnalyzer};

const FFT_SIZES: &[usize] = &[512, 1024, 2048, 4096];

fn test_spectrum(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (255.0 * (1.0 - i as f32 / len as f32)).max(0.0))
        .collect()
}

fn test_audio(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f32 / 48000.0;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5
        })
        .collect()
}

fn bench_process_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("SignalEngine::process_frame");

    for &fft_size in FFT_SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(fft_size), &fft_size, |b, &size| {
            let config = EngineConfig {
                fft_size: size,
                ..Default::default()
            };
            let mut engine = SignalEngine::new(config).expect("valid config");
            let spectrum = test_spectrum(size / 2);
            let mut now = 0.0;

            b.iter(|| {
                now += 16.0;
                black_box(engine.process_frame(black_box(&spectrum), now))
            });
        });
    }

    group.finish();
}

fn bench_analyzer(c: &mut Criterion) {
    let mut group = c.benchmark_group("SpectrumAnalyzer::analyze");

    for &fft_size in FFT_SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(fft_size), &fft_size, |b, &size| {
            let mut analyzer = SpectrumAnalyzer::new(size, &AnalyzerConfig::default());
            let audio = test_audio(size);

            b.iter(|| {
                let spectrum = analyzer.analyze(black_box(&audio));
                black_box(spectrum[0])
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_process_frame, bench_analyzer);
criterion_main!(benches);
