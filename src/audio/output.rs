//! CPAL output: binds the engine into the device's realtime data callback.
//!
//! The callback dispatches straight into `Engine::render_block`; it takes no
//! lock the control plane contends on, allocates nothing, and logs nothing.
//! Optionally mirrors every rendered sample into a lock-free ring for the
//! WAV capture thread.

use std::sync::Arc;

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::HeapProd;
use ringbuf::traits::*;
use tracing::{debug, info};

use crate::audio::engine::Engine;

pub const OUTPUT_CHANNELS: u16 = 2;

pub struct AudioOutput {
    stream: Option<cpal::Stream>,
    pub config: cpal::StreamConfig,
}

impl AudioOutput {
    /// Open the default output device and start rendering. Any failure here
    /// is `AudioInitFailed` territory: the caller exits with code 1.
    pub fn start(
        engine: Arc<Engine>,
        sample_rate: u32,
        block_frames: u32,
        mut capture: Option<HeapProd<f32>>,
    ) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("no default output device")?;

        let config = cpal::StreamConfig {
            channels: OUTPUT_CHANNELS,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Fixed(block_frames),
        };
        info!(
            "audio output: {} @ {sample_rate} Hz, {block_frames} frames/period",
            device.name().unwrap_or_else(|_| "<unnamed>".into())
        );

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / OUTPUT_CHANNELS as usize;
                    engine.render_block(data, frames);
                    if let Some(prod) = capture.as_mut() {
                        // Lossy on overrun: the writer thread missing samples
                        // must never stall playback.
                        let _ = prod.push_slice(data);
                    }
                },
                |err| eprintln!("stream error: {err:?}"),
                None,
            )
            .context("failed to build output stream")?;
        stream.play().context("failed to start output stream")?;

        Ok(Self {
            stream: Some(stream),
            config,
        })
    }

    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            debug!("audio output stopped");
        }
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stream.take();
    }
}
