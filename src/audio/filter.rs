//! Direct Form I biquad with Audio-EQ cookbook coefficients.

use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    HighPass,
    HighShelf,
}

#[derive(Debug, Clone)]
pub struct Biquad {
    sample_rate: f32,
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Starts as an identity filter until `set_params` is called.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1.0),
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Recompute coefficients. Filter state is preserved so cutoff can be
    /// swept while audio runs. Frequency is kept below 0.45·sample_rate;
    /// requesting more would put ω past the usable range near Nyquist.
    pub fn set_params(&mut self, kind: FilterKind, freq: f32, q: f32, gain_db: f32) {
        let freq = freq.clamp(1.0, 0.45 * self.sample_rate);
        let q = q.max(1e-3);
        let omega = TAU * freq / self.sample_rate;
        let sn = omega.sin();
        let cs = omega.cos();
        let alpha = sn / (2.0 * q);
        let a = 10.0f32.powf(gain_db / 40.0); // shelving only
        let sqrt_a = a.sqrt();

        let a0;
        match kind {
            FilterKind::LowPass => {
                self.b0 = (1.0 - cs) / 2.0;
                self.b1 = 1.0 - cs;
                self.b2 = (1.0 - cs) / 2.0;
                a0 = 1.0 + alpha;
                self.a1 = -2.0 * cs;
                self.a2 = 1.0 - alpha;
            }
            FilterKind::HighPass => {
                self.b0 = (1.0 + cs) / 2.0;
                self.b1 = -(1.0 + cs);
                self.b2 = (1.0 + cs) / 2.0;
                a0 = 1.0 + alpha;
                self.a1 = -2.0 * cs;
                self.a2 = 1.0 - alpha;
            }
            FilterKind::HighShelf => {
                self.b0 = a * ((a + 1.0) + (a - 1.0) * cs + 2.0 * sqrt_a * alpha);
                self.b1 = -2.0 * a * ((a - 1.0) + (a + 1.0) * cs);
                self.b2 = a * ((a + 1.0) + (a - 1.0) * cs - 2.0 * sqrt_a * alpha);
                a0 = (a + 1.0) - (a - 1.0) * cs + 2.0 * sqrt_a * alpha;
                self.a1 = 2.0 * ((a - 1.0) - (a + 1.0) * cs);
                self.a2 = (a + 1.0) - (a - 1.0) * cs - 2.0 * sqrt_a * alpha;
            }
        }

        self.b0 /= a0;
        self.b1 /= a0;
        self.b2 /= a0;
        self.a1 /= a0;
        self.a2 /= a0;
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    pub fn process_block(&mut self, buf: &mut [f32]) {
        for s in buf.iter_mut() {
            let x = *s;
            let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
                - self.a1 * self.y1
                - self.a2 * self.y2;
            self.x2 = self.x1;
            self.x1 = x;
            self.y2 = self.y1;
            self.y1 = y;
            *s = y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (TAU * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    fn rms_tail(buf: &[f32]) -> f32 {
        let tail = &buf[buf.len() / 2..];
        (tail.iter().map(|v| v * v).sum::<f32>() / tail.len() as f32).sqrt()
    }

    #[test]
    fn lowpass_attenuates_above_cutoff() {
        let fs = 48_000.0;
        let mut f = Biquad::new(fs);
        f.set_params(FilterKind::LowPass, 1_000.0, 0.707, 0.0);
        let mut low = sine(100.0, fs, 9_600);
        let mut high = sine(10_000.0, fs, 9_600);
        f.process_block(&mut low);
        f.reset();
        f.process_block(&mut high);
        let low_rms = rms_tail(&low);
        let high_rms = rms_tail(&high);
        assert!(low_rms > 0.6, "passband rms {low_rms}");
        assert!(high_rms < 0.05, "stopband rms {high_rms}");
    }

    #[test]
    fn highpass_attenuates_below_cutoff() {
        let fs = 48_000.0;
        let mut f = Biquad::new(fs);
        f.set_params(FilterKind::HighPass, 2_000.0, 0.707, 0.0);
        let mut low = sine(100.0, fs, 9_600);
        f.process_block(&mut low);
        assert!(rms_tail(&low) < 0.05);
    }

    #[test]
    fn high_shelf_cuts_highs_by_gain() {
        let fs = 48_000.0;
        let mut f = Biquad::new(fs);
        f.set_params(FilterKind::HighShelf, 6_000.0, 0.707, -12.0);
        let mut high = sine(16_000.0, fs, 9_600);
        f.process_block(&mut high);
        // -12 dB shelf: expect roughly quarter amplitude well above the corner
        let amp = rms_tail(&high) * (2.0f32).sqrt();
        assert!((0.15..0.40).contains(&amp), "shelf output amp {amp}");
    }

    #[test]
    fn set_params_keeps_state() {
        let fs = 48_000.0;
        let mut f = Biquad::new(fs);
        f.set_params(FilterKind::LowPass, 500.0, 0.707, 0.0);
        let mut buf = vec![1.0f32; 64];
        f.process_block(&mut buf);
        let before = (f.x1, f.y1);
        f.set_params(FilterKind::LowPass, 800.0, 0.707, 0.0);
        assert_eq!(before, (f.x1, f.y1));
    }

    #[test]
    fn cutoff_clamped_below_nyquist() {
        let fs = 48_000.0;
        let mut f = Biquad::new(fs);
        // Request past Nyquist; output must stay finite.
        f.set_params(FilterKind::LowPass, 24_000.0, 0.707, 0.0);
        let mut buf = sine(1_000.0, fs, 4_800);
        f.process_block(&mut buf);
        assert!(buf.iter().all(|v| v.is_finite()));
        assert!(rms_tail(&buf) > 0.5, "1 kHz should pass a ~21.6 kHz lowpass");
    }
}
