use std::f32::consts::TAU;

/// Phase-accumulating sine oscillator.
#[derive(Debug, Clone)]
pub struct SineOsc {
    sample_rate: f32,
    phase: f32,
    freq: f32,
}

impl SineOsc {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1.0),
            phase: 0.0,
            freq: 440.0,
        }
    }

    pub fn set_frequency(&mut self, freq: f32) {
        self.freq = freq;
    }

    pub fn frequency(&self) -> f32 {
        self.freq
    }

    /// One sample; phase wraps into [0, 2π).
    #[inline]
    pub fn tick(&mut self) -> f32 {
        let v = self.phase.sin();
        self.phase += TAU * self.freq / self.sample_rate;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        v
    }

    /// Accumulate `gain * sin(phase)` into `out`.
    pub fn mix_block(&mut self, out: &mut [f32], gain: f32) {
        let delta = TAU * self.freq / self.sample_rate;
        for slot in out.iter_mut() {
            *slot += self.phase.sin() * gain;
            self.phase += delta;
            if self.phase >= TAU {
                self.phase -= TAU;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_stays_wrapped() {
        let mut osc = SineOsc::new(48_000.0);
        osc.set_frequency(19_000.0);
        for _ in 0..10_000 {
            osc.tick();
        }
        assert!((0.0..TAU).contains(&osc.phase));
    }

    #[test]
    fn tick_and_mix_block_agree() {
        let mut a = SineOsc::new(48_000.0);
        let mut b = SineOsc::new(48_000.0);
        a.set_frequency(200.0);
        b.set_frequency(200.0);

        let mut block = vec![0.0f32; 64];
        b.mix_block(&mut block, 0.5);
        for (i, &v) in block.iter().enumerate() {
            let expect = a.tick() * 0.5;
            assert!((v - expect).abs() < 1e-6, "sample {i}: {v} vs {expect}");
        }
    }

    #[test]
    fn quarter_period_peaks() {
        // 1 Hz at 4 Hz sample rate: 0, 1, 0, -1
        let mut osc = SineOsc::new(4.0);
        osc.set_frequency(1.0);
        let got: Vec<f32> = (0..4).map(|_| osc.tick()).collect();
        for (g, e) in got.iter().zip([0.0f32, 1.0, 0.0, -1.0]) {
            assert!((g - e).abs() < 1e-6);
        }
    }
}
