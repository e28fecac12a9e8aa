//! The engine: one render pipeline on the audio thread, one control loop on
//! the tick thread, and the shared state that lets them cooperate.
//!
//! Locking discipline: the audio callback owns `render` (no control-plane
//! thread ever takes it), touches `machine` twice per block for index/float
//! copies, and takes the voice lock once for an `Option::take`. Everything
//! heavier (stem decoding, story selection, snapshot publishing) happens on
//! the tick thread; loaded stem banks travel to the render side over a
//! bounded command queue drained at block start, and displaced banks travel
//! back to be dropped off the audio thread.

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender, bounded};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::audio::crossfade::equal_power_crossfade;
use crate::audio::ducking::DuckingCompressor;
use crate::audio::filter::{Biquad, FilterKind};
use crate::audio::limiter::SoftLimiter;
use crate::audio::osc::SineOsc;
use crate::audio::reverb::PlateReverb;
use crate::audio::scheduler::Scheduler;
use crate::audio::stem::{StemBank, StemPlayer};
use crate::control::{PublicState, local_hour, now_ms};
use crate::heuristics::{ActivityMonitor, AppHeuristics};
use crate::mood::{MoodPack, MoodRecipe, MoodStateMachine, default_pack};
use crate::story::StoryBank;
use crate::story::generator::{GeneratorClient, StoryGenerator};
use crate::telemetry::Telemetry;
use crate::util::{AtomicF32, clamp01, rms};

/// Sub-bass hum level of the binaural carriers (~-30 dBFS per channel).
pub const BINAURAL_GAIN: f32 = 0.03;
/// Scales `narrative_frequency * dt` into a per-tick trigger probability.
pub const NARRATIVE_RATE_SCALE: f32 = 0.1;
/// Quiet time required before the narrative trigger starts drawing.
pub const STORY_MIN_INTERVAL_SECS: f32 = 60.0;
/// Per-story replay cooldown.
pub const STORY_COOLDOWN_SECS: f32 = 60.0;

const ACTIVITY_INTENSITY_BOOST: f32 = 0.3;
const LOW_STORY_WATERMARK: usize = 5;
const LIMITER_CEILING_DB: f32 = -1.0;
const LIMITER_SOFTNESS: f32 = 0.05;
const REVERB_DAMPING: f32 = 0.25;
const FILTER_Q: f32 = 0.707;
const MELATONIN_SHELF_HZ: f32 = 6_000.0;
const DEFAULT_INTENSITY: f32 = 0.7;

/// Reverb and tone parameters keyed by mood.
#[derive(Debug, Clone, Copy)]
pub struct MoodDspParams {
    pub reverb_wet: f32,
    pub reverb_decay: f32,
    pub reverb_pre_delay_ms: f32,
    /// Ceiling for the breathing low-pass; darker moods cap the cutoff.
    pub master_lp_hz: f32,
}

pub fn dsp_params_for(mood_id: &str) -> MoodDspParams {
    match mood_id {
        "focus_room" => MoodDspParams {
            reverb_wet: 0.20,
            reverb_decay: 0.4,
            reverb_pre_delay_ms: 15.0,
            master_lp_hz: 12_000.0,
        },
        "rain_cave" => MoodDspParams {
            reverb_wet: 0.50,
            reverb_decay: 0.7,
            reverb_pre_delay_ms: 40.0,
            master_lp_hz: 16_000.0,
        },
        "arcade_night" => MoodDspParams {
            reverb_wet: 0.25,
            reverb_decay: 0.3,
            reverb_pre_delay_ms: 10.0,
            master_lp_hz: 18_000.0,
        },
        "sleep_ship" => MoodDspParams {
            reverb_wet: 0.35,
            reverb_decay: 0.6,
            reverb_pre_delay_ms: 30.0,
            master_lp_hz: 6_000.0,
        },
        _ => MoodDspParams {
            reverb_wet: 0.30,
            reverb_decay: 0.5,
            reverb_pre_delay_ms: 20.0,
            master_lp_hz: 18_000.0,
        },
    }
}

/// Binaural carrier frequencies (left, right) per mood; the difference is
/// the beat: gamma for focus, theta for rain, delta for sleep, beta for the
/// arcade.
pub fn binaural_targets_for(mood_id: &str) -> (f32, f32) {
    match mood_id {
        "rain_cave" => (120.0, 126.0),
        "sleep_ship" => (80.0, 82.0),
        "arcade_night" => (150.0, 175.0),
        _ => (200.0, 240.0),
    }
}

/// High-shelf gain schedule: full cut late night, half cut in the evening
/// wind-down, flat otherwise.
pub fn melatonin_gain_for_hour(hour: u32) -> f32 {
    match hour {
        23 | 0..=5 => -12.0,
        21 | 22 => -6.0,
        _ => 0.0,
    }
}

/// Control-rate values the audio callback reads without locking.
struct Setpoints {
    binaural_left_hz: AtomicF32,
    binaural_right_hz: AtomicF32,
    breathing_hz: AtomicF32,
    shelf_gain_db: AtomicF32,
}

impl Setpoints {
    fn new() -> Self {
        let (l, r) = binaural_targets_for("focus_room");
        Self {
            binaural_left_hz: AtomicF32::new(l),
            binaural_right_hz: AtomicF32::new(r),
            breathing_hz: AtomicF32::new(20_000.0),
            shelf_gain_db: AtomicF32::new(0.0),
        }
    }
}

enum RenderCommand {
    /// A freshly decoded bank for the machine's target mood.
    BindTargetStems { mood_index: usize, bank: StemBank },
    /// The pack was replaced: new current bank (mood 0) and scheduler.
    ResetPack { bank: StemBank, scheduler: Scheduler },
}

/// Everything the audio callback mutates. Control threads never lock this.
struct RenderState {
    scheduler: Scheduler,
    reverb: PlateReverb,
    limiter: SoftLimiter,
    ducker: DuckingCompressor,
    binaural_left: SineOsc,
    binaural_right: SineOsc,
    breathing_lp: Biquad,
    melatonin_shelf: Biquad,
    current_stems: StemBank,
    current_mood: usize,
    /// Bank for the target mood, present only while a crossfade runs.
    target_stems: Option<(usize, StemBank)>,
    voice: Option<StemPlayer>,
    music_phase: f32,
    music_a: Vec<f32>,
    music_b: Vec<f32>,
    voice_buf: Vec<f32>,
    mixed: Vec<f32>,
    cmd_rx: Receiver<RenderCommand>,
    retired_tx: Sender<StemBank>,
}

impl RenderState {
    fn ensure_block(&mut self, frames: usize) {
        self.music_a.resize(frames, 0.0);
        self.music_b.resize(frames, 0.0);
        self.voice_buf.resize(frames, 0.0);
        self.mixed.resize(frames, 0.0);
    }

    fn retire(&mut self, bank: StemBank) {
        // Prefer shipping the bank back for off-thread drop; if the return
        // channel is full it drops here, which only happens under a command
        // flood that realtime playback has already lost anyway.
        let _ = self.retired_tx.try_send(bank);
    }

    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.cmd_rx.try_recv() {
            match cmd {
                RenderCommand::BindTargetStems { mood_index, bank } => {
                    if let Some((_, old)) = self.target_stems.take() {
                        self.retire(old);
                    }
                    self.target_stems = Some((mood_index, bank));
                }
                RenderCommand::ResetPack { bank, scheduler } => {
                    let old = std::mem::replace(&mut self.current_stems, bank);
                    self.retire(old);
                    if let Some((_, old)) = self.target_stems.take() {
                        self.retire(old);
                    }
                    self.scheduler = scheduler;
                    self.current_mood = 0;
                    self.voice = None;
                }
            }
        }
    }

    /// Adopt the target bank once the state machine has merged onto it.
    fn promote_if_faded(&mut self, current_index: usize) {
        if self.current_mood == current_index {
            return;
        }
        let ready = matches!(self.target_stems, Some((mood, _)) if mood == current_index);
        if !ready {
            return;
        }
        if let Some((mood, bank)) = self.target_stems.take() {
            let old = std::mem::replace(&mut self.current_stems, bank);
            self.retire(old);
            self.current_mood = mood;
        }
    }
}

/// Procedural fallback used when a mood has no playable stems: a base tone
/// sited by energy and intensity plus a tension-scaled octave partial.
fn sine_music(
    recipe: &MoodRecipe,
    density: f32,
    intensity: f32,
    out: &mut [f32],
    phase: &mut f32,
    sample_rate: f32,
) {
    let freq = 110.0 + 220.0 * recipe.energy * intensity;
    let amp = 0.2 + 0.3 * density;
    let delta = TAU * freq / sample_rate;
    for slot in out.iter_mut() {
        let mut v = phase.sin() * amp;
        v += (*phase * 2.0).sin() * recipe.tension * 0.1;
        *slot = v;
        *phase += delta;
        if *phase > TAU {
            *phase -= TAU;
        }
    }
}

/// Tick-thread bookkeeping.
struct ControlState {
    activity: ActivityMonitor,
    clock_secs: f64,
    time_since_last_story: f32,
    sent_target_mood: Option<usize>,
    last_mood: usize,
    rng: StdRng,
}

pub struct Engine {
    sample_rate: f32,
    playing: AtomicBool,
    intensity: AtomicF32,
    machine: Mutex<MoodStateMachine>,
    setpoints: Setpoints,
    voice_next: Mutex<Option<StemPlayer>>,
    voice_active: AtomicBool,
    snapshot: Mutex<PublicState>,
    stories: Arc<StoryBank>,
    heuristics: AppHeuristics,
    generator: StoryGenerator,
    generator_client: Mutex<Option<GeneratorClient>>,
    control: Mutex<ControlState>,
    render: Mutex<RenderState>,
    cmd_tx: Sender<RenderCommand>,
    retired_rx: Receiver<StemBank>,
    telemetry: Telemetry,
    last_rms: AtomicF32,
}

impl Engine {
    /// Engine over the embedded default pack with no telemetry; what tests
    /// and simple embedders want.
    pub fn new(sample_rate: f32, block_frames: usize) -> Self {
        Self::with_options(
            sample_rate,
            block_frames,
            default_pack(),
            Arc::new(StoryBank::new()),
            Telemetry::disabled(),
        )
    }

    pub fn with_options(
        sample_rate: f32,
        block_frames: usize,
        pack: MoodPack,
        stories: Arc<StoryBank>,
        telemetry: Telemetry,
    ) -> Self {
        let pack = if pack.is_empty() {
            warn!("empty mood pack; using defaults");
            Arc::new(default_pack())
        } else {
            Arc::new(pack)
        };
        let sample_rate = sample_rate.max(1.0);

        let (cmd_tx, cmd_rx) = bounded(16);
        let (retired_tx, retired_rx) = bounded(16);
        let (generator, generator_client) = StoryGenerator::new();

        let current_stems = StemBank::load_from_configs(&pack.moods[0].stems);
        let render = RenderState {
            scheduler: Scheduler::new(sample_rate, pack.len()),
            reverb: PlateReverb::new(sample_rate),
            limiter: SoftLimiter::new(LIMITER_CEILING_DB, LIMITER_SOFTNESS),
            ducker: DuckingCompressor::default(),
            binaural_left: SineOsc::new(sample_rate),
            binaural_right: SineOsc::new(sample_rate),
            breathing_lp: Biquad::new(sample_rate),
            melatonin_shelf: Biquad::new(sample_rate),
            current_stems,
            current_mood: 0,
            target_stems: None,
            voice: None,
            music_phase: 0.0,
            music_a: Vec::with_capacity(block_frames),
            music_b: Vec::with_capacity(block_frames),
            voice_buf: Vec::with_capacity(block_frames),
            mixed: Vec::with_capacity(block_frames),
            cmd_rx,
            retired_tx,
        };

        let snapshot = PublicState {
            mood_id: pack.moods[0].id.clone(),
            target_mood_id: pack.moods[0].id.clone(),
            intensity: DEFAULT_INTENSITY,
            energy: DEFAULT_INTENSITY,
            updated_at_ms: now_ms(),
            ..PublicState::default()
        };

        Self {
            sample_rate,
            playing: AtomicBool::new(false),
            intensity: AtomicF32::new(DEFAULT_INTENSITY),
            machine: Mutex::new(MoodStateMachine::new(pack)),
            setpoints: Setpoints::new(),
            voice_next: Mutex::new(None),
            voice_active: AtomicBool::new(false),
            snapshot: Mutex::new(snapshot),
            stories,
            heuristics: AppHeuristics::with_defaults(),
            generator,
            generator_client: Mutex::new(Some(generator_client)),
            control: Mutex::new(ControlState {
                activity: ActivityMonitor::new(),
                clock_secs: 0.0,
                time_since_last_story: 0.0,
                sent_target_mood: None,
                last_mood: 0,
                rng: StdRng::from_os_rng(),
            }),
            render: Mutex::new(render),
            cmd_tx,
            retired_rx,
            telemetry,
            last_rms: AtomicF32::new(0.0),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn story_bank(&self) -> Arc<StoryBank> {
        self.stories.clone()
    }

    /// Endpoint pair for an external story generator; `None` after the
    /// first call.
    pub fn take_generator_client(&self) -> Option<GeneratorClient> {
        self.generator_client.lock().unwrap().take()
    }

    /// RMS of the last rendered block, for telemetry and meters.
    pub fn last_block_rms(&self) -> f32 {
        self.last_rms.get()
    }

    // ---- command surface -------------------------------------------------

    /// Request a mood change; silently ignored when the transition gate
    /// rejects it.
    pub fn set_mood(&self, mood_id: &str) {
        self.machine.lock().unwrap().set_target_mood(mood_id);
    }

    pub fn set_intensity(&self, value: f32) {
        self.intensity.set(clamp01(value));
    }

    pub fn intensity(&self) -> f32 {
        self.intensity.get()
    }

    pub fn set_playing(&self, playing: bool) {
        let was = self.playing.swap(playing, Ordering::Relaxed);
        if was != playing {
            self.telemetry
                .record(if playing { "playback_start" } else { "playback_stop" }, &[]);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    pub fn current_mood_id(&self) -> String {
        self.machine.lock().unwrap().current_recipe().id.clone()
    }

    pub fn target_mood_id(&self) -> String {
        self.machine.lock().unwrap().target_recipe().id.clone()
    }

    /// Crossfade progress between current and target mood, [0, 1].
    pub fn crossfade(&self) -> f32 {
        self.machine.lock().unwrap().crossfade()
    }

    /// Replace the mood pack: resets the state machine and reloads the
    /// stems of its first mood. An empty pack is rejected.
    pub fn set_mood_pack(&self, pack: MoodPack) {
        if pack.is_empty() {
            warn!("set_mood_pack ignored: empty pack");
            return;
        }
        let pack = Arc::new(pack);
        let mut ctl = self.control.lock().unwrap();
        let bank = StemBank::load_from_configs(&pack.moods[0].stems);
        let scheduler = Scheduler::new(self.sample_rate, pack.len());
        *self.machine.lock().unwrap() = MoodStateMachine::new(pack);
        if self
            .cmd_tx
            .try_send(RenderCommand::ResetPack { bank, scheduler })
            .is_err()
        {
            warn!("render command queue full; pack reset delayed to next send");
        }
        ctl.sent_target_mood = None;
        ctl.last_mood = 0;
    }

    /// Report a fresh user-input observation (resets idle time).
    pub fn notify_input(&self) {
        self.control.lock().unwrap().activity.note_input();
    }

    pub fn snapshot(&self) -> PublicState {
        self.snapshot.lock().unwrap().clone()
    }

    // ---- control tick ---------------------------------------------------

    /// The ~100 ms control heartbeat. Never called on the audio thread.
    pub fn tick(&self, active_process: &str, dt_seconds: f32) {
        let mut ctl = self.control.lock().unwrap();
        let ctl = &mut *ctl;
        ctl.clock_secs += dt_seconds as f64;

        let bias = self.heuristics.bias_for(active_process);
        ctl.activity.update(dt_seconds);
        let activity = ctl.activity.activity();
        let idle_seconds = ctl.activity.idle_seconds();

        let effective_intensity =
            clamp01(self.intensity.get() + ACTIVITY_INTENSITY_BOOST * activity);

        let (pack, cur_idx, tgt_idx) = {
            let mut machine = self.machine.lock().unwrap();
            machine.set_target_mood(&bias.mood_id);
            machine.update(dt_seconds);
            (
                machine.pack().clone(),
                machine.current_index(),
                machine.target_index(),
            )
        };
        let cur_id = pack.moods[cur_idx].id.clone();

        // Keep the target bank bound to the machine's target mood. While
        // settled there is nothing to bind; the render side promotes the
        // bank it already has.
        if cur_idx != tgt_idx {
            if ctl.sent_target_mood != Some(tgt_idx) {
                let bank = StemBank::load_from_configs(&pack.moods[tgt_idx].stems);
                if self
                    .cmd_tx
                    .try_send(RenderCommand::BindTargetStems {
                        mood_index: tgt_idx,
                        bank,
                    })
                    .is_ok()
                {
                    ctl.sent_target_mood = Some(tgt_idx);
                }
            }
        } else {
            ctl.sent_target_mood = None;
        }

        if ctl.last_mood != cur_idx {
            ctl.last_mood = cur_idx;
            info!("mood settled: {cur_id}");
            self.telemetry.record("mood_change", &[("mood", &cur_id)]);
        }

        // Keep the bank topped up for the mood we are in.
        if self.stories.count_for_mood(&cur_id) < LOW_STORY_WATERMARK {
            let context = format!("User is in {active_process}. Energy: {effective_intensity:.2}");
            self.generator.request(&cur_id, &context);
        }
        self.generator.poll(&self.stories);

        self.update_narrative(ctl, &pack.moods[cur_idx], dt_seconds);

        // Bio-reactive setpoints.
        let (left_hz, right_hz) = binaural_targets_for(&cur_id);
        self.setpoints.binaural_left_hz.set(left_hz);
        self.setpoints.binaural_right_hz.set(right_hz);
        let params = dsp_params_for(&cur_id);
        let cutoff = (500.0 + 19_500.0 * activity * activity).min(params.master_lp_hz);
        self.setpoints.breathing_hz.set(cutoff);
        self.setpoints
            .shelf_gain_db
            .set(melatonin_gain_for_hour(local_hour()));

        // Banks displaced on the audio thread get dropped here.
        for _ in self.retired_rx.try_iter() {}

        {
            let mut snap = self.snapshot.lock().unwrap();
            snap.mood_id = cur_id;
            snap.target_mood_id = pack.moods[tgt_idx].id.clone();
            snap.active_process = active_process.to_string();
            snap.energy = effective_intensity;
            snap.intensity = self.intensity.get();
            snap.activity = activity;
            snap.idle_seconds = idle_seconds;
            snap.playing = self.is_playing();
            snap.updated_at_ms = now_ms();
        }
    }

    fn update_narrative(&self, ctl: &mut ControlState, recipe: &MoodRecipe, dt: f32) {
        ctl.time_since_last_story += dt;
        if self.voice_active.load(Ordering::Relaxed) || self.voice_next.lock().unwrap().is_some() {
            return;
        }
        if ctl.time_since_last_story < STORY_MIN_INTERVAL_SECS {
            return;
        }
        let p = recipe.narrative_frequency * dt * NARRATIVE_RATE_SCALE;
        if ctl.rng.random_range(0.0..1.0f32) >= p {
            return;
        }
        let now = ctl.clock_secs as f32;
        let Some(story) = self.stories.pick_story(&recipe.id, now, STORY_COOLDOWN_SECS) else {
            return; // nothing off cooldown for this mood; not an error
        };
        info!("triggering story {}", story.id);
        self.telemetry
            .record("story_triggered", &[("story", &story.id), ("mood", &recipe.id)]);
        self.stories.mark_played(&story, now);
        ctl.time_since_last_story = 0.0;
        *self.voice_next.lock().unwrap() = Some(StemPlayer::new(story.audio.clone(), false));
    }

    // ---- audio thread ---------------------------------------------------

    /// Render `frames` stereo frames into `out` (interleaved). Returns the
    /// RMS of the mono mix for telemetry. Degenerate calls write silence.
    pub fn render_block(&self, out: &mut [f32], frames: usize) -> f32 {
        if frames == 0 || out.len() < frames * 2 {
            out.fill(0.0);
            return 0.0;
        }
        let out = &mut out[..frames * 2];
        if !self.is_playing() {
            out.fill(0.0);
            return 0.0;
        }

        // Uncontended by construction: only this callback locks it.
        let mut render = self.render.lock().unwrap();
        let rs = &mut *render;

        rs.drain_commands();
        rs.ensure_block(frames);

        let (pack, cur_idx, tgt_idx, fade) = {
            let machine = self.machine.lock().unwrap();
            (
                machine.pack().clone(),
                machine.current_index(),
                machine.target_index(),
                machine.crossfade(),
            )
        };
        rs.promote_if_faded(cur_idx);
        let cur = &pack.moods[cur_idx];
        let tgt = &pack.moods[tgt_idx];

        // Control-rate setpoints into the DSP instances.
        rs.binaural_left.set_frequency(self.setpoints.binaural_left_hz.get());
        rs.binaural_right.set_frequency(self.setpoints.binaural_right_hz.get());
        rs.breathing_lp.set_params(
            FilterKind::LowPass,
            self.setpoints.breathing_hz.get(),
            FILTER_Q,
            0.0,
        );
        rs.melatonin_shelf.set_params(
            FilterKind::HighShelf,
            MELATONIN_SHELF_HZ,
            FILTER_Q,
            self.setpoints.shelf_gain_db.get(),
        );

        let density_cur = rs.scheduler.next(cur_idx, cur, frames);
        let density_tgt = rs.scheduler.next(tgt_idx, tgt, frames);

        let intensity = self.intensity.get();
        if fade < 1.0 {
            if rs.current_stems.count() > 0 {
                rs.current_stems.render_mixed(&mut rs.music_a, density_cur);
            } else {
                sine_music(
                    cur,
                    density_cur,
                    intensity,
                    &mut rs.music_a,
                    &mut rs.music_phase,
                    self.sample_rate,
                );
            }
            match rs.target_stems.as_mut() {
                Some((_, bank)) if bank.count() > 0 => {
                    bank.render_mixed(&mut rs.music_b, density_tgt);
                }
                _ => sine_music(
                    tgt,
                    density_tgt,
                    intensity,
                    &mut rs.music_b,
                    &mut rs.music_phase,
                    self.sample_rate,
                ),
            }
        } else {
            // Settled: the equal-power law weights side A by cos(π/2) = 0,
            // so only side B renders; running both would double-step the
            // shared bank's cursors.
            rs.music_a.fill(0.0);
            if rs.current_stems.count() > 0 {
                rs.current_stems.render_mixed(&mut rs.music_b, density_tgt);
            } else {
                sine_music(
                    tgt,
                    density_tgt,
                    intensity,
                    &mut rs.music_b,
                    &mut rs.music_phase,
                    self.sample_rate,
                );
            }
        }

        equal_power_crossfade(&rs.music_a, &rs.music_b, fade, &mut rs.mixed);

        // Voice: promote the queued story (the one short voice-lock hold),
        // render one-shot, duck the music under it, then mix it in.
        {
            let mut next = self.voice_next.lock().unwrap();
            if let Some(player) = next.take() {
                rs.voice = Some(player);
            }
        }
        if let Some(player) = rs.voice.as_mut() {
            player.render(&mut rs.voice_buf, 1.0);
            if player.is_finished() {
                rs.voice = None;
            }
        } else {
            rs.voice_buf.fill(0.0);
        }
        self.voice_active.store(rs.voice.is_some(), Ordering::Relaxed);

        rs.ducker.process(&rs.voice_buf, &mut rs.mixed, self.sample_rate);
        for (m, v) in rs.mixed.iter_mut().zip(rs.voice_buf.iter()) {
            *m += v;
        }

        let dsp = dsp_params_for(&cur.id);
        rs.reverb
            .set_params(dsp.reverb_pre_delay_ms, dsp.reverb_decay, REVERB_DAMPING);
        rs.reverb.process(&mut rs.mixed, dsp.reverb_wet);

        rs.breathing_lp.process_block(&mut rs.mixed);
        rs.melatonin_shelf.process_block(&mut rs.mixed);
        rs.limiter.process(&mut rs.mixed);

        for i in 0..frames {
            let mono = rs.mixed[i];
            out[2 * i] = mono + rs.binaural_left.tick() * BINAURAL_GAIN;
            out[2 * i + 1] = mono + rs.binaural_right.tick() * BINAURAL_GAIN;
        }

        self.machine
            .lock()
            .unwrap()
            .update(frames as f32 / self.sample_rate);

        let block_rms = rms(&rs.mixed);
        self.last_rms.set(block_rms);
        block_rms
    }
}
