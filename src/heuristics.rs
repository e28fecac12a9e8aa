//! Maps what the user is doing onto mood pressure: process-name rules bias
//! the target mood, input idleness drives a smoothed activity scalar.

use regex::{Regex, RegexBuilder};
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct MoodBias {
    pub mood_id: String,
    pub energy_bias: f32,
}

struct HeuristicRule {
    pattern: Regex,
    mood_id: String,
    energy_bias: f32,
}

/// Ordered rule list; insertion order is authoritative and the first
/// matching rule wins.
pub struct AppHeuristics {
    rules: Vec<HeuristicRule>,
}

impl AppHeuristics {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_defaults() -> Self {
        let mut h = Self::new();
        h.add_rule("code|devenv|idea", "focus_room", -0.05);
        h.add_rule("notepad|word|excel|chrome", "focus_room", 0.0);
        h.add_rule("unreal|unity|game|steam", "arcade_night", 0.15);
        h.add_rule("vlc|spotify|netflix|video", "sleep_ship", -0.1);
        h.add_rule("zoom|teams|meet", "rain_cave", -0.05);
        h
    }

    /// A malformed pattern is skipped with a warning, not fatal.
    pub fn add_rule(&mut self, pattern: &str, mood_id: &str, energy_bias: f32) {
        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(re) => self.rules.push(HeuristicRule {
                pattern: re,
                mood_id: mood_id.to_string(),
                energy_bias,
            }),
            Err(err) => warn!("heuristic rule {pattern:?} skipped: {err}"),
        }
    }

    /// Bias for a foreground process name; `focus_room` with no energy bias
    /// when nothing matches.
    pub fn bias_for(&self, process_name: &str) -> MoodBias {
        for rule in &self.rules {
            if rule.pattern.is_match(process_name) {
                return MoodBias {
                    mood_id: rule.mood_id.clone(),
                    energy_bias: rule.energy_bias,
                };
            }
        }
        MoodBias {
            mood_id: "focus_room".to_string(),
            energy_bias: 0.0,
        }
    }
}

impl Default for AppHeuristics {
    fn default() -> Self {
        Self::with_defaults()
    }
}

const IDLE_FULL_SECS: f32 = 30.0;
const SMOOTHING: f32 = 0.1;

/// Turns seconds-since-last-input into a smoothed activity level in [0, 1].
#[derive(Debug, Default)]
pub struct ActivityMonitor {
    smoothed: f32,
    idle_seconds: f32,
}

impl ActivityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fresh input tick (keyboard/mouse observed).
    pub fn note_input(&mut self) {
        self.idle_seconds = 0.0;
    }

    /// Override idle time with an externally measured value.
    pub fn set_idle_seconds(&mut self, seconds: f32) {
        self.idle_seconds = seconds.max(0.0);
    }

    /// Advance by one control tick.
    pub fn update(&mut self, dt_seconds: f32) {
        let target = (1.0 - self.idle_seconds / IDLE_FULL_SECS).max(0.0);
        self.smoothed += (target - self.smoothed) * SMOOTHING;
        self.smoothed = self.smoothed.clamp(0.0, 1.0);
        self.idle_seconds += dt_seconds.max(0.0);
    }

    pub fn activity(&self) -> f32 {
        self.smoothed
    }

    pub fn idle_seconds(&self) -> f32 {
        self.idle_seconds
    }
}
