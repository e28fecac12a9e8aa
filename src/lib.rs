//! keegan — an ambient "vibe radio" engine.
//!
//! A realtime audio process renders a stereo soundscape from looping stems,
//! a procedural fallback, spoken-word inserts and binaural carriers, shaped
//! by a mood state machine, activity heuristics and wall-clock time. The
//! control plane publishes a snapshot for local UIs and accepts mood and
//! playback commands.

pub mod audio;
pub mod cli;
pub mod config;
pub mod control;
pub mod heuristics;
pub mod mood;
pub mod story;
pub mod telemetry;
pub mod util;

pub use audio::engine::Engine;
pub use control::PublicState;
pub use mood::{MoodPack, MoodRecipe, default_pack};
