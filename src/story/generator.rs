//! Engine-side contract for remote story generation.
//!
//! The engine fires a request when a mood is running low on stories; an
//! external client (HTTP, local TTS, a test) consumes requests from the
//! paired [`GeneratorClient`] and pushes finished stories back. Requests are
//! single-flight: while one is outstanding no further requests are sent.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use tracing::{debug, info, warn};

use super::{Story, StoryBank};

#[derive(Debug, Clone)]
pub struct StoryRequest {
    pub mood_id: String,
    pub context: String,
}

/// Outcome delivered by the external generator.
pub type GenerationResult = Result<Story, String>;

pub struct StoryGenerator {
    in_flight: Arc<AtomicBool>,
    req_tx: Sender<StoryRequest>,
    done_rx: Receiver<GenerationResult>,
}

/// Handed to the external story-producing collaborator.
pub struct GeneratorClient {
    pub requests: Receiver<StoryRequest>,
    pub completions: Sender<GenerationResult>,
}

impl StoryGenerator {
    pub fn new() -> (Self, GeneratorClient) {
        let (req_tx, req_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(4);
        (
            Self {
                in_flight: Arc::new(AtomicBool::new(false)),
                req_tx,
                done_rx,
            },
            GeneratorClient {
                requests: req_rx,
                completions: done_tx,
            },
        )
    }

    /// Fire-and-forget request; deduplicated while one is in flight. With no
    /// client attached the request is dropped and the flight flag released.
    pub fn request(&self, mood_id: &str, context: &str) {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return;
        }
        let req = StoryRequest {
            mood_id: mood_id.to_string(),
            context: context.to_string(),
        };
        info!("story generation requested for {mood_id}");
        if self.req_tx.try_send(req).is_err() {
            debug!("no story generator attached; request dropped");
            self.in_flight.store(false, Ordering::Release);
        }
    }

    /// Drain completions into the bank. Failures are logged and only reset
    /// the in-flight flag.
    pub fn poll(&self, bank: &StoryBank) {
        for result in self.done_rx.try_iter() {
            self.in_flight.store(false, Ordering::Release);
            match result {
                Ok(story) => {
                    info!("generated story {} for {}", story.id, story.mood_id);
                    bank.add_story(Arc::new(story));
                }
                Err(err) => warn!("remote story generation failed: {err}"),
            }
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}
