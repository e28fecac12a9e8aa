//! Stem playback: a cursor over a decoded clip, plus the per-mood bank that
//! mixes stems according to the block density.

use std::sync::Arc;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{info, warn};

use crate::audio::wav::{self, DecodedAudio};
use crate::mood::StemConfig;
use crate::util::db_to_linear;

/// Plays one decoded clip, folding multi-channel sources down to mono.
/// The read cursor is the only mutable state; the buffer is shared.
#[derive(Debug, Clone)]
pub struct StemPlayer {
    audio: Arc<DecodedAudio>,
    pos: usize,
    looping: bool,
}

impl StemPlayer {
    pub fn new(audio: Arc<DecodedAudio>, looping: bool) -> Self {
        Self {
            audio,
            pos: 0,
            looping,
        }
    }

    pub fn reset(&mut self) {
        self.pos = 0;
    }

    pub fn is_loaded(&self) -> bool {
        !self.audio.samples.is_empty()
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Finished only makes sense for one-shot playback.
    pub fn is_finished(&self) -> bool {
        !self.looping && self.pos >= self.audio.samples.len()
    }

    /// Overwrite `out` with the next `out.len()` mono samples.
    pub fn render(&mut self, out: &mut [f32], gain: f32) {
        if !self.is_loaded() {
            out.fill(0.0);
            return;
        }
        for slot in out.iter_mut() {
            match self.next_sample() {
                Some(v) => *slot = v * gain,
                None => *slot = 0.0,
            }
        }
    }

    /// Accumulate the next `out.len()` mono samples into `out`.
    pub fn render_mix(&mut self, out: &mut [f32], gain: f32) {
        if !self.is_loaded() {
            return;
        }
        for slot in out.iter_mut() {
            match self.next_sample() {
                Some(v) => *slot += v * gain,
                None => break,
            }
        }
    }

    /// One mono sample at the cursor; folds interleaved channels by average.
    /// Returns `None` once a non-looping clip is exhausted.
    #[inline]
    fn next_sample(&mut self) -> Option<f32> {
        let len = self.audio.samples.len();
        if self.pos >= len {
            if self.looping {
                self.pos = 0;
            } else {
                return None;
            }
        }
        let ch = self.audio.channels.max(1) as usize;
        if ch == 1 {
            let v = self.audio.samples[self.pos];
            self.pos += 1;
            return Some(v);
        }
        let end = (self.pos + ch).min(len);
        let span = &self.audio.samples[self.pos..end];
        let v = span.iter().sum::<f32>() / span.len() as f32;
        self.pos = end;
        Some(v)
    }
}

pub struct StemEntry {
    pub player: StemPlayer,
    pub role: String,
    pub gain_db: f32,
    pub probability: f32,
}

/// All stems of one mood. Owned by the render side; loaded off-thread and
/// shipped over the command queue.
pub struct StemBank {
    entries: Vec<StemEntry>,
    rng: SmallRng,
}

impl Default for StemBank {
    fn default() -> Self {
        Self::empty()
    }
}

impl StemBank {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Decode and collect the stems of a mood. A stem that fails to decode
    /// is skipped with a warning; the rest of the bank still loads.
    pub fn load_from_configs(configs: &[StemConfig]) -> Self {
        let mut bank = Self::empty();
        for cfg in configs {
            match wav::decode_wav_file(&cfg.file) {
                Ok(audio) => {
                    bank.entries.push(StemEntry {
                        player: StemPlayer::new(audio, cfg.looping),
                        role: cfg.role.clone(),
                        gain_db: cfg.gain_db,
                        probability: cfg.probability,
                    });
                }
                Err(err) => {
                    warn!("stem {} skipped: {err}", cfg.file);
                }
            }
        }
        if !configs.is_empty() {
            info!("stem bank loaded: {} of {} stems", bank.entries.len(), configs.len());
        }
        bank
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Mix all admitted stems into `out` (mono, overwritten). `density`
    /// bounds how many stems play this block; each stem below probability
    /// 1.0 additionally rolls for admission.
    pub fn render_mixed(&mut self, out: &mut [f32], density: f32) {
        out.fill(0.0);
        if self.entries.is_empty() {
            return;
        }

        let max_active = ((self.entries.len() as f32 * density).ceil() as usize).max(1);
        let mut active = 0usize;
        for entry in &mut self.entries {
            if active >= max_active {
                break;
            }
            if !entry.player.is_loaded() {
                continue;
            }
            if entry.probability < 1.0 {
                let roll: f32 = self.rng.random_range(0.0..1.0);
                if roll > entry.probability {
                    continue;
                }
            }
            entry.player.render_mix(out, db_to_linear(entry.gain_db));
            active += 1;
        }
    }
}
