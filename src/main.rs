use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use ringbuf::HeapRb;
use ringbuf::traits::Split;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use keegan::Engine;
use keegan::audio::capture::WavCapture;
use keegan::audio::output::AudioOutput;
use keegan::cli::Args;
use keegan::config::{AppConfig, EnvSettings, load_mood_pack_or_default, load_story_configs};
use keegan::story::{StoryBank, load_stories};
use keegan::telemetry::Telemetry;

fn main() -> ExitCode {
    // Honors RUST_LOG; defaults to info.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .try_init();

    let args = Args::parse();
    let config = AppConfig::load_or_default(&args.config);
    let env = EnvSettings::from_env();
    let telemetry = Telemetry::from_env("exe");
    info!("keegan starting up");
    if env.bridge_key.is_some() {
        info!("bridge API key configured; external UIs must authenticate");
    }

    // Mood pack; any failure falls back to the embedded defaults.
    let moods_path = args.moods.as_deref().unwrap_or(&config.paths.moods);
    let (pack, from_file) = load_mood_pack_or_default(moods_path);
    info!(
        "{}",
        if from_file {
            format!("loaded mood pack from {moods_path}")
        } else {
            "using default embedded mood pack".to_string()
        }
    );

    // Stories are optional; a missing file just means no narration yet.
    let stories = Arc::new(StoryBank::new());
    let stories_path = args.stories.as_deref().unwrap_or(&config.paths.stories);
    match load_story_configs(stories_path) {
        Ok(configs) => {
            load_stories(&stories, &configs);
        }
        Err(err) => info!("{err}; starting without stories"),
    }

    let sample_rate = config.audio.sample_rate;
    let engine = Arc::new(Engine::with_options(
        sample_rate as f32,
        config.audio.block_frames,
        pack,
        stories,
        telemetry.clone(),
    ));
    engine.set_intensity(args.intensity.unwrap_or(config.engine.intensity));
    engine.set_playing(!args.paused);
    telemetry.record("engine_start", &[("mood", &engine.current_mood_id())]);

    let stop_flag = Arc::new(AtomicBool::new(false));
    {
        let stop_flag = stop_flag.clone();
        if let Err(err) = ctrlc::set_handler(move || {
            stop_flag.store(true, Ordering::SeqCst);
        }) {
            warn!("ctrl-c handler not installed: {err}");
        }
    }

    // Optional WAV capture rides a lock-free ring fed by the callback.
    let mut capture_handle = None;
    let capture_prod = args.wav.as_ref().map(|path| {
        let rb = HeapRb::<f32>::new(sample_rate as usize * 4);
        let (prod, cons) = rb.split();
        capture_handle = Some(WavCapture::run(
            cons,
            path.clone(),
            sample_rate,
            stop_flag.clone(),
        ));
        prod
    });

    let mut output = None;
    if args.play {
        match AudioOutput::start(
            engine.clone(),
            sample_rate,
            config.audio.block_frames as u32,
            capture_prod,
        ) {
            Ok(out) => output = Some(out),
            Err(err) => {
                error!("audio init failed: {err:#}");
                return ExitCode::from(1);
            }
        }
    }

    // Control tick loop. Foreground-process and idle detection are external
    // collaborators; without them the heuristics see an empty process name.
    let tick_thread = {
        let engine = engine.clone();
        let stop_flag = stop_flag.clone();
        let tick = Duration::from_millis(config.engine.tick_ms.max(10));
        let dt = tick.as_secs_f32();
        std::thread::spawn(move || {
            while !stop_flag.load(Ordering::SeqCst) {
                engine.tick("", dt);
                std::thread::sleep(tick);
            }
        })
    };

    info!(
        "keegan running (mood {}); press ctrl-c to quit",
        engine.current_mood_id()
    );
    while !stop_flag.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    if let Some(mut out) = output {
        out.stop();
    }
    let _ = tick_thread.join();
    if let Some(handle) = capture_handle {
        let _ = handle.join();
    }
    telemetry.record("engine_shutdown", &[]);
    info!("keegan shutdown complete");
    ExitCode::SUCCESS
}
