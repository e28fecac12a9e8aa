use std::sync::Arc;

use super::{MoodPack, MoodRecipe};

const DEFAULT_FADE_SECS: f32 = 8.0;

/// Tracks the current and target mood and the linear crossfade between them.
///
/// Invariants: `fade ∈ [0, 1]`; `current == target` implies `fade == 1`;
/// once `update` drives the fade to 1 the current index adopts the target.
pub struct MoodStateMachine {
    pack: Arc<MoodPack>,
    current: usize,
    target: usize,
    fade: f32,
    fade_duration: f32,
}

impl MoodStateMachine {
    /// The pack must contain at least one mood.
    pub fn new(pack: Arc<MoodPack>) -> Self {
        assert!(!pack.is_empty(), "mood pack must not be empty");
        Self {
            pack,
            current: 0,
            target: 0,
            fade: 1.0,
            fade_duration: DEFAULT_FADE_SECS,
        }
    }

    pub fn set_fade_duration(&mut self, seconds: f32) {
        self.fade_duration = seconds.max(0.01);
    }

    /// Request a transition. Unknown ids, the current target, and ids not in
    /// the current mood's allowed list (when non-empty) are silent no-ops.
    pub fn set_target_mood(&mut self, mood_id: &str) {
        let Some(idx) = self.pack.find(mood_id) else {
            return;
        };
        if idx == self.target {
            return;
        }
        let allowed = &self.pack.moods[self.current].allowed_transitions;
        if !allowed.is_empty() && !allowed.iter().any(|t| t == mood_id) {
            return;
        }
        self.target = idx;
        self.fade = 0.0;
    }

    pub fn update(&mut self, dt_seconds: f32) {
        if self.current == self.target {
            self.fade = 1.0;
            return;
        }
        self.fade += dt_seconds / self.fade_duration;
        if self.fade >= 1.0 {
            self.current = self.target;
            self.fade = 1.0;
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn target_index(&self) -> usize {
        self.target
    }

    pub fn crossfade(&self) -> f32 {
        self.fade
    }

    pub fn current_recipe(&self) -> &MoodRecipe {
        &self.pack.moods[self.current]
    }

    pub fn target_recipe(&self) -> &MoodRecipe {
        &self.pack.moods[self.target]
    }

    pub fn pack(&self) -> &Arc<MoodPack> {
        &self.pack
    }
}
