use crate::util::db_to_linear;

/// Sidechain ducking compressor with an RMS detector. The sidechain (voice)
/// drives a gain reduction applied in place to the target (music) buffer.
pub struct DuckingCompressor {
    attack_ms: f32,
    release_ms: f32,
    ratio: f32,
    threshold_db: f32,
    envelope: f32,
}

impl Default for DuckingCompressor {
    fn default() -> Self {
        Self::new(15.0, 350.0, 2.5, -18.0)
    }
}

impl DuckingCompressor {
    pub fn new(attack_ms: f32, release_ms: f32, ratio: f32, threshold_db: f32) -> Self {
        Self {
            attack_ms,
            release_ms,
            ratio,
            threshold_db,
            envelope: 0.0,
        }
    }

    pub fn set_params(&mut self, attack_ms: f32, release_ms: f32, ratio: f32, threshold_db: f32) {
        self.attack_ms = attack_ms;
        self.release_ms = release_ms;
        self.ratio = ratio;
        self.threshold_db = threshold_db;
    }

    pub fn process(&mut self, sidechain: &[f32], target: &mut [f32], sample_rate: f32) {
        if target.is_empty() {
            return;
        }
        let attack = (-1.0 / (0.001 * self.attack_ms * sample_rate)).exp();
        let release = (-1.0 / (0.001 * self.release_ms * sample_rate)).exp();
        let threshold = db_to_linear(self.threshold_db);

        for (i, out) in target.iter_mut().enumerate() {
            let sc = sidechain.get(i).copied().unwrap_or(0.0);
            let sc_sq = sc * sc;
            let coeff = if sc_sq > self.envelope { attack } else { release };
            self.envelope = coeff * (self.envelope - sc_sq) + sc_sq;
            let rms = self.envelope.max(0.0).sqrt();

            let mut gain = 1.0;
            if rms > threshold {
                let over = rms / threshold;
                let gain_db = -(over - 1.0) * (self.ratio - 1.0) * 6.0;
                gain = db_to_linear(gain_db);
            }
            *out *= gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_sidechain_is_transparent() {
        let mut duck = DuckingCompressor::default();
        let sidechain = vec![0.0f32; 512];
        let mut target = vec![0.4f32; 512];
        duck.process(&sidechain, &mut target, 48_000.0);
        assert!(target.iter().all(|&v| (v - 0.4).abs() < 1e-6));
    }

    #[test]
    fn loud_sidechain_ducks_target() {
        let mut duck = DuckingCompressor::new(15.0, 350.0, 2.5, -18.0);
        let sidechain = vec![0.8f32; 48_000];
        let mut target = vec![0.5f32; 48_000];
        duck.process(&sidechain, &mut target, 48_000.0);
        // Past the attack window every sample must be pushed well below input.
        for (i, &v) in target.iter().enumerate().skip(5_000) {
            assert!(v.abs() < 0.5, "sample {i} not ducked: {v}");
        }
        // Deep reduction: at 0.8 RMS over a -18 dB threshold this compressor
        // applies tens of dB of attenuation.
        assert!(target[40_000].abs() < 0.05);
    }

    #[test]
    fn gain_recovers_after_release() {
        let mut duck = DuckingCompressor::new(5.0, 50.0, 2.5, -18.0);
        let mut sidechain = vec![0.8f32; 4_800];
        sidechain.extend(std::iter::repeat(0.0).take(43_200));
        let mut target = vec![0.5f32; 48_000];
        duck.process(&sidechain, &mut target, 48_000.0);
        let ducked = target[4_000].abs();
        let recovered = target[47_000].abs();
        assert!(ducked < 0.1, "voice region not ducked: {ducked}");
        assert!(recovered > 0.45, "gain did not recover: {recovered}");
    }

    #[test]
    fn short_sidechain_treated_as_silence() {
        let mut duck = DuckingCompressor::default();
        let sidechain = vec![0.8f32; 10];
        let mut target = vec![0.5f32; 100];
        duck.process(&sidechain, &mut target, 48_000.0);
        // Beyond the sidechain the envelope releases toward zero; nothing blows up.
        assert!(target.iter().all(|v| v.is_finite() && v.abs() <= 0.5));
    }
}
