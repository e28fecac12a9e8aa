use std::f32::consts::FRAC_PI_2;

/// Equal-power crossfade of two mono buffers into `out`.
///
/// `t` is clamped to [0, 1]; 0 yields `a`, 1 yields `b`, and the two gains
/// satisfy cos² + sin² = 1 at every point in between. `out` is resized to
/// the shorter input length.
pub fn equal_power_crossfade(a: &[f32], b: &[f32], t: f32, out: &mut Vec<f32>) {
    let t = t.clamp(0.0, 1.0);
    let gain_a = (FRAC_PI_2 * t).cos();
    let gain_b = (FRAC_PI_2 * t).sin();
    let frames = a.len().min(b.len());
    out.resize(frames, 0.0);
    for i in 0..frames {
        out[i] = a[i] * gain_a + b[i] * gain_b;
    }
}
