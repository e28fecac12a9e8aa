//! Spoken-word inserts ("stories") and the shared bank they live in.

pub mod generator;

use std::sync::{Arc, Mutex};

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::audio::wav::{self, DecodedAudio};
use crate::util::AtomicF32;

/// Mood wildcard: a story tagged `any` fits every mood.
pub const ANY_MOOD: &str = "any";

/// Never-played sentinel; far enough in the past to clear any cooldown.
const NEVER_PLAYED: f32 = -9_999.0;

pub struct Story {
    pub id: String,
    pub text: String,
    pub audio_file: String,
    pub mood_id: String,
    pub audio: Arc<DecodedAudio>,
    last_played: AtomicF32,
}

impl Story {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        audio_file: impl Into<String>,
        mood_id: impl Into<String>,
        audio: Arc<DecodedAudio>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            audio_file: audio_file.into(),
            mood_id: mood_id.into(),
            audio,
            last_played: AtomicF32::new(NEVER_PLAYED),
        }
    }

    pub fn last_played(&self) -> f32 {
        self.last_played.get()
    }

    fn fits_mood(&self, mood_id: &str) -> bool {
        self.mood_id == ANY_MOOD || self.mood_id == mood_id
    }
}

/// Multi-producer story set. The engine consumes for playback; loaders and
/// the generator insert.
pub struct StoryBank {
    stories: Mutex<Vec<Arc<Story>>>,
    rng: Mutex<StdRng>,
}

impl Default for StoryBank {
    fn default() -> Self {
        Self::new()
    }
}

impl StoryBank {
    pub fn new() -> Self {
        Self {
            stories: Mutex::new(Vec::new()),
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            stories: Mutex::new(Vec::new()),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Insert a story. An existing story with the same id is replaced.
    pub fn add_story(&self, story: Arc<Story>) {
        let mut stories = self.stories.lock().unwrap();
        if let Some(slot) = stories.iter_mut().find(|s| s.id == story.id) {
            *slot = story;
        } else {
            info!("story bank: added {}", story.id);
            stories.push(story);
        }
    }

    pub fn clear(&self) {
        self.stories.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.stories.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Uniform-random story that fits the mood and is off cooldown.
    pub fn pick_story(&self, mood_id: &str, now: f32, cooldown: f32) -> Option<Arc<Story>> {
        let stories = self.stories.lock().unwrap();
        let candidates: Vec<&Arc<Story>> = stories
            .iter()
            .filter(|s| s.fits_mood(mood_id) && now - s.last_played() >= cooldown)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let idx = self.rng.lock().unwrap().random_range(0..candidates.len());
        Some(candidates[idx].clone())
    }

    pub fn mark_played(&self, story: &Story, now: f32) {
        story.last_played.set(now);
    }

    /// Stories usable in a mood: tagged with it or with the wildcard.
    pub fn count_for_mood(&self, mood_id: &str) -> usize {
        self.stories
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.fits_mood(mood_id))
            .count()
    }
}

/// One row of the stories config file (a JSON array of these).
#[derive(Debug, Clone, serde::Deserialize)]
pub struct StoryConfig {
    pub id: String,
    #[serde(default)]
    pub text: String,
    pub audio_file: String,
    #[serde(default = "default_mood")]
    pub mood: String,
}

fn default_mood() -> String {
    ANY_MOOD.to_string()
}

/// Decode the configured stories into the bank. Rows with missing text or
/// undecodable audio are skipped with a warning; returns how many loaded.
pub fn load_stories(bank: &StoryBank, configs: &[StoryConfig]) -> usize {
    let mut loaded = 0;
    for cfg in configs {
        if cfg.text.is_empty() || cfg.audio_file.is_empty() {
            continue;
        }
        match wav::decode_wav_file(&cfg.audio_file) {
            Ok(audio) => {
                bank.add_story(Arc::new(Story::new(
                    cfg.id.clone(),
                    cfg.text.clone(),
                    cfg.audio_file.clone(),
                    cfg.mood.clone(),
                    audio,
                )));
                loaded += 1;
            }
            Err(err) => warn!("story {} skipped: {err}", cfg.id),
        }
    }
    info!("story bank: loaded {loaded} of {} stories", configs.len());
    loaded
}

#[cfg(test)]
pub(crate) fn test_story(id: &str, mood: &str) -> Arc<Story> {
    let audio = Arc::new(DecodedAudio {
        samples: vec![0.1; 64],
        channels: 1,
        sample_rate: 48_000,
    });
    Arc::new(Story::new(id, "text", "mem.wav", mood, audio))
}
