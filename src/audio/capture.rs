//! Debug WAV capture: drains the callback's sample ring into a 16-bit
//! stereo file on a plain thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};
use ringbuf::HeapCons;
use ringbuf::traits::*;
use tracing::{info, warn};

pub struct WavCapture;

impl WavCapture {
    pub fn run(
        mut cons: HeapCons<f32>,
        path: String,
        sample_rate: u32,
        stop: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        std::thread::spawn(move || {
            let spec = WavSpec {
                channels: 2,
                sample_rate,
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            };
            let mut writer = match WavWriter::create(&path, spec) {
                Ok(w) => w,
                Err(err) => {
                    warn!("wav capture disabled, create {path} failed: {err}");
                    return;
                }
            };

            let mut scratch = vec![0.0f32; 8_192];
            loop {
                let n = cons.pop_slice(&mut scratch);
                for &s in &scratch[..n] {
                    let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                    if writer.write_sample(v).is_err() {
                        return;
                    }
                }
                if n == 0 {
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
            }

            match writer.finalize() {
                Ok(()) => info!("wav capture written to {path}"),
                Err(err) => warn!("wav capture finalize failed: {err}"),
            }
        })
    }
}
