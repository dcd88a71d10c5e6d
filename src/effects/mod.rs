pub mod mood;
pub mod preset;

pub use mood::{Mood, MoodStateMachine};
pub use preset::{Preset, PresetParameters};
