//! Audio-reactive signal engine.
//!
//! Turns a byte-scale magnitude spectrum into band levels, beats, a tempo
//! estimate and a debounced mood, one frame at a time.

pub mod audio;
pub mod config;
pub mod effects;

pub use audio::{
    BandName, BandReading, ScanProcessor, ScanReport, SignalEngine, SignalFrame, SpectrumAnalyzer,
};
pub use config::EngineConfig;
pub use effects::{Mood, Preset};
