use std::f32::consts::TAU;
use std::path::PathBuf;

use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

use keegan::audio::stem::StemPlayer;
use keegan::audio::wav::decode_wav_file;

fn unique_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!(
        "keegan_wav_test_{}_{}",
        name,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    p
}

// Synthesize a 440 Hz tone as 16-bit PCM, decode it with the engine's own
// decoder, play it through a stem player and confirm the spectral peak and
// amplitude survive the trip.
#[test]
fn sine_survives_wav_decode_and_playback() {
    let sample_rate = 48_000u32;
    let freq = 440.0f32;
    let amp = 0.5f32;
    let path = unique_path("sine440.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
    for i in 0..sample_rate {
        let v = (TAU * freq * i as f32 / sample_rate as f32).sin() * amp;
        writer
            .write_sample((v * i16::MAX as f32) as i16)
            .expect("write sample");
    }
    writer.finalize().expect("finalize wav");

    let audio = decode_wav_file(&path).expect("decode");
    assert_eq!(audio.sample_rate, sample_rate);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.frames(), sample_rate as usize);

    let mut player = StemPlayer::new(audio, true);
    let mut rendered = vec![0.0f32; sample_rate as usize];
    player.render(&mut rendered, 1.0);

    // 440 cycles fit the 1 s window exactly, so the peak is leakage-free.
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(rendered.len());
    let mut spectrum: Vec<Complex<f32>> = rendered
        .iter()
        .map(|&v| Complex { re: v, im: 0.0 })
        .collect();
    fft.process(&mut spectrum);

    let (peak_bin, peak_mag) = spectrum[1..rendered.len() / 2]
        .iter()
        .enumerate()
        .map(|(i, c)| (i + 1, c.norm()))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .unwrap();

    let bin_hz = sample_rate as f32 / rendered.len() as f32;
    let peak_hz = peak_bin as f32 * bin_hz;
    assert!(
        (peak_hz - freq).abs() <= bin_hz,
        "peak at {peak_hz} Hz, expected {freq} ± {bin_hz}"
    );

    let estimated_amp = 2.0 * peak_mag / rendered.len() as f32;
    assert!(
        (estimated_amp - amp).abs() <= amp * 0.05,
        "amplitude {estimated_amp}, expected {amp} ± 5%"
    );

    let _ = std::fs::remove_file(&path);
}
