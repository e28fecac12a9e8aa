//! Block-rate density scheduler.
//!
//! Each mood derives a tempo from its energy and a base density from the
//! tail of its density curve; a slow LFO wobbles around that base. Every
//! mood keeps its own LFO phase, so interleaved queries for the current and
//! target mood inside one render block do not disturb each other.

use std::f32::consts::TAU;

use crate::mood::MoodRecipe;

const DENSITY_MIN: f32 = 0.05;
const DENSITY_MAX: f32 = 1.0;
const WOBBLE_DEPTH: f32 = 0.05;
const FALLBACK_DENSITY: f32 = 0.4;

pub struct Scheduler {
    sample_rate: f32,
    phases: Vec<f32>,
}

impl Scheduler {
    pub fn new(sample_rate: f32, mood_count: usize) -> Self {
        Self {
            sample_rate: sample_rate.max(1.0),
            phases: vec![0.0; mood_count],
        }
    }

    /// Advance the mood's LFO by one block and return its density scalar.
    pub fn next(&mut self, mood_index: usize, recipe: &MoodRecipe, block_frames: usize) -> f32 {
        let bpm = 40.0 + recipe.energy * 80.0;
        let tempo_hz = (bpm / 60.0).clamp(0.5, 4.0);
        let base = recipe
            .density_curve
            .last()
            .map(|&d| d.clamp(DENSITY_MIN, DENSITY_MAX))
            .unwrap_or(FALLBACK_DENSITY);

        let Some(phase) = self.phases.get_mut(mood_index) else {
            return base;
        };
        let dt = block_frames as f32 / self.sample_rate;
        *phase = (*phase + dt * tempo_hz).fract();
        let wobble = WOBBLE_DEPTH * (TAU * *phase).sin();
        (base + wobble).clamp(DENSITY_MIN, DENSITY_MAX)
    }
}
