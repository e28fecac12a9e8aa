//! Mood recipes: declarative descriptions of a sonic atmosphere and the
//! transitions allowed out of it.

mod machine;

pub use machine::MoodStateMachine;

use serde::{Deserialize, Serialize};

/// One stem layer inside a mood.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StemConfig {
    pub file: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub gain_db: f32,
    #[serde(rename = "loop", default = "default_true")]
    pub looping: bool,
    #[serde(default = "default_probability")]
    pub probability: f32,
}

fn default_true() -> bool {
    true
}

fn default_probability() -> f32 {
    1.0
}

/// Procedural fallback settings used when a mood has no playable stems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthPreset {
    #[serde(default = "SynthPreset::default_preset")]
    pub preset: String,
    #[serde(default)]
    pub seed: i32,
    #[serde(default = "SynthPreset::default_pattern_density")]
    pub pattern_density: f32,
}

impl SynthPreset {
    fn default_preset() -> String {
        "default".to_string()
    }

    fn default_pattern_density() -> f32 {
        0.3
    }
}

impl Default for SynthPreset {
    fn default() -> Self {
        Self {
            preset: Self::default_preset(),
            seed: 0,
            pattern_density: Self::default_pattern_density(),
        }
    }
}

/// Immutable once published. Scalar fields live in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodRecipe {
    pub id: String,
    pub display_name: String,
    #[serde(default = "default_half")]
    pub energy: f32,
    #[serde(default = "default_tension")]
    pub tension: f32,
    #[serde(default = "default_half")]
    pub warmth: f32,
    #[serde(default = "default_half")]
    pub color: f32,
    #[serde(default)]
    pub density_curve: Vec<f32>,
    /// Mood ids reachable from this mood; empty means any.
    #[serde(default)]
    pub allowed_transitions: Vec<String>,
    /// Per-second probability scale for spoken-word inserts.
    #[serde(default = "default_narrative_frequency")]
    pub narrative_frequency: f32,
    #[serde(default)]
    pub stems: Vec<StemConfig>,
    #[serde(default)]
    pub synth: SynthPreset,
}

fn default_half() -> f32 {
    0.5
}

fn default_tension() -> f32 {
    0.3
}

fn default_narrative_frequency() -> f32 {
    0.05
}

impl MoodRecipe {
    /// Bare recipe with neutral parameters; the config loader and the
    /// default pack fill in the rest.
    pub fn named(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            energy: 0.5,
            tension: 0.3,
            warmth: 0.5,
            color: 0.5,
            density_curve: Vec::new(),
            allowed_transitions: Vec::new(),
            narrative_frequency: 0.05,
            stems: Vec::new(),
            synth: SynthPreset::default(),
        }
    }

    /// Clamp all unit-interval fields after deserialization.
    pub fn sanitize(&mut self) {
        self.energy = self.energy.clamp(0.0, 1.0);
        self.tension = self.tension.clamp(0.0, 1.0);
        self.warmth = self.warmth.clamp(0.0, 1.0);
        self.color = self.color.clamp(0.0, 1.0);
        self.narrative_frequency = self.narrative_frequency.clamp(0.0, 1.0);
        for d in &mut self.density_curve {
            *d = d.clamp(0.0, 1.0);
        }
        for stem in &mut self.stems {
            stem.probability = stem.probability.clamp(0.0, 1.0);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoodPack {
    pub moods: Vec<MoodRecipe>,
}

impl MoodPack {
    pub fn find(&self, id: &str) -> Option<usize> {
        self.moods.iter().position(|m| m.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.moods.is_empty()
    }

    pub fn len(&self) -> usize {
        self.moods.len()
    }
}

fn make_mood(
    id: &str,
    display: &str,
    energy: f32,
    tension: f32,
    warmth: f32,
    color: f32,
    density: &[f32],
    transitions: &[&str],
) -> MoodRecipe {
    let mut m = MoodRecipe::named(id, display);
    m.energy = energy;
    m.tension = tension;
    m.warmth = warmth;
    m.color = color;
    m.density_curve = density.to_vec();
    m.allowed_transitions = transitions.iter().map(|s| s.to_string()).collect();
    m
}

/// The embedded baseline pack: four moods with fixed semantic roles.
pub fn default_pack() -> MoodPack {
    MoodPack {
        moods: vec![
            make_mood(
                "focus_room",
                "Focus Room",
                0.55,
                0.35,
                0.55,
                0.6,
                &[0.35, 0.55],
                &["rain_cave", "arcade_night"],
            ),
            make_mood(
                "rain_cave",
                "Rain Cave",
                0.35,
                0.25,
                0.45,
                0.3,
                &[0.25, 0.4, 0.25],
                &["focus_room", "sleep_ship"],
            ),
            make_mood(
                "arcade_night",
                "Arcade Night",
                0.7,
                0.5,
                0.35,
                0.8,
                &[0.4, 0.75],
                &["focus_room", "rain_cave"],
            ),
            make_mood(
                "sleep_ship",
                "Sleep Ship",
                0.2,
                0.2,
                0.6,
                0.1,
                &[0.15, 0.25, 0.35, 0.2],
                &["rain_cave"],
            ),
        ],
    }
}
