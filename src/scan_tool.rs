use anyhow::Result;
use clap::Parser;
use log::info;

use reactive_signal_engine::{BandName, EngineConfig, Preset, ScanProcessor};

#[derive(Parser)]
#[command(name = "signal-scan")]
#[command(about = "Run the reactive signal engine over a WAV file and report what it saw")]
struct Args {
    /// WAV file to scan
    #[arg()]
    input_file: String,

    /// Output file for the JSON report
    #[arg(short, long, default_value = "scan_report.json")]
    output: String,

    /// Engine configuration (JSON). Defaults are used when omitted. The default
    /// analyzer time smoothing (0.85) only lets the first second's beats through
    /// on offline PCM; set "analyzer": { "time_smoothing": 0.0 } to track a whole file
    #[arg(short, long)]
    config: Option<String>,

    /// Preset to apply on top of the configuration: chill, party, focus or hype
    #[arg(short, long)]
    preset: Option<String>,

    /// Render cadence the engine is driven at
    #[arg(long, default_value = "60")]
    fps: f32,

    /// Include every frame in the report
    #[arg(long)]
    frame_by_frame: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Signal scan");
    info!("Input file: {}", args.input_file);
    info!("Output file: {}", args.output);

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading engine config from {}", path);
            EngineConfig::load(path)?
        }
        None => EngineConfig::default(),
    };

    if let Some(name) = &args.preset {
        let preset: Preset = name.parse()?;
        preset.apply_to(&mut config);
        info!("Applied preset: {}", preset);
    }

    let report = ScanProcessor::new(config, args.fps)
        .with_frames(args.frame_by_frame)
        .scan_file(&args.input_file)?;

    let stats = &report.statistics;
    info!("=== SCAN RESULTS ===");
    info!("Duration: {:.2} seconds", report.file_info.duration_seconds);
    info!("Frames: {} at {:.1} fps", report.file_info.frame_count, report.file_info.frame_rate);
    info!("Total beats detected: {}", stats.total_beats);
    info!("Final BPM: {}", stats.final_bpm);
    if let Some((low, high)) = stats.bpm_range {
        info!("BPM range: {} - {}", low, high);
    }
    info!("Dominant mood: {} ({} transitions)", stats.dominant_mood.as_str(), stats.mood_transitions);

    info!("=== PEAK LEVELS ===");
    for name in BandName::ALL {
        let peak = stats.peak_levels.get(name.as_str()).copied().unwrap_or(0.0);
        info!("{:>10}: {:.3}", name.as_str(), peak);
    }

    ScanProcessor::save_report(&report, &args.output)?;
    let file_size = std::fs::metadata(&args.output)?.len();
    info!("Report saved to {} ({:.1} KB)", args.output, file_size as f64 / 1024.0);

    Ok(())
}
