//! Plate-inspired reverb: pre-delay into two parallel combs with one-pole
//! damping, then two serial all-pass diffusers.

struct DelayLine {
    data: Vec<f32>,
    idx: usize,
}

impl DelayLine {
    fn new(len: usize) -> Self {
        Self {
            data: vec![0.0; len.max(1)],
            idx: 0,
        }
    }

    #[inline]
    fn read(&self) -> f32 {
        self.data[self.idx]
    }

    #[inline]
    fn write_advance(&mut self, v: f32) {
        self.data[self.idx] = v;
        self.idx += 1;
        if self.idx >= self.data.len() {
            self.idx = 0;
        }
    }
}

pub struct PlateReverb {
    sample_rate: f32,
    decay: f32,
    damping: f32,
    pre_delay: DelayLine,
    combs: [DelayLine; 2],
    allpasses: [DelayLine; 2],
    wet_scratch: Vec<f32>,
}

// Native delay times; comb lengths are mutually detuned to keep the tail
// from ringing on a single period.
const COMB_SECS: [f32; 2] = [0.0297, 0.0371];
const ALLPASS_SECS: [f32; 2] = [0.005, 0.0017];
const ALLPASS_COEFF: f32 = 0.5;

impl PlateReverb {
    pub fn new(sample_rate: f32) -> Self {
        let sample_rate = sample_rate.max(1.0);
        let delay = |secs: f32| DelayLine::new((secs * sample_rate) as usize);
        Self {
            sample_rate,
            decay: 0.5,
            damping: 0.25,
            pre_delay: delay(0.02),
            combs: [delay(COMB_SECS[0]), delay(COMB_SECS[1])],
            allpasses: [delay(ALLPASS_SECS[0]), delay(ALLPASS_SECS[1])],
            wet_scratch: Vec::new(),
        }
    }

    /// Update decay/damping and resize the pre-delay. The pre-delay ring is
    /// only reallocated when its length actually changes, so per-block calls
    /// with unchanged parameters stay allocation free.
    pub fn set_params(&mut self, pre_delay_ms: f32, decay: f32, damping: f32) {
        self.decay = decay.clamp(0.05, 0.95);
        self.damping = damping.clamp(0.0, 0.9);
        let len = ((pre_delay_ms / 1000.0) * self.sample_rate) as usize;
        let len = len.max(1);
        if len != self.pre_delay.data.len() {
            self.pre_delay = DelayLine::new(len);
        }
    }

    /// In-place wet/dry mix over a mono buffer.
    pub fn process(&mut self, buffer: &mut [f32], wet: f32) {
        if buffer.is_empty() {
            return;
        }
        let wet = wet.clamp(0.0, 1.0);

        self.wet_scratch.resize(buffer.len(), 0.0);
        for (n, &x) in buffer.iter().enumerate() {
            let pre_out = self.pre_delay.read();
            self.pre_delay.write_advance(x);

            let mut comb_sum = 0.0;
            for comb in self.combs.iter_mut() {
                let mut delayed = comb.read();
                let feedback = pre_out + delayed * self.decay;
                comb.write_advance(feedback);
                delayed = delayed * (1.0 - self.damping) + feedback * self.damping;
                comb_sum += delayed;
            }
            comb_sum *= 0.5;

            let mut ap_out = comb_sum;
            for ap in self.allpasses.iter_mut() {
                let buf_out = ap.read();
                let input = ap_out - ALLPASS_COEFF * buf_out;
                ap.write_advance(input);
                ap_out = buf_out + ALLPASS_COEFF * input;
            }

            self.wet_scratch[n] = ap_out;
        }

        let dry = 1.0 - wet;
        for (s, &w) in buffer.iter_mut().zip(self.wet_scratch.iter()) {
            *s = *s * dry + w * wet;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_mix_is_identity() {
        let mut rv = PlateReverb::new(48_000.0);
        rv.set_params(20.0, 0.5, 0.25);
        let mut buf: Vec<f32> = (0..256).map(|i| (i as f32 * 0.01).sin()).collect();
        let original = buf.clone();
        rv.process(&mut buf, 0.0);
        for (a, b) in buf.iter().zip(original.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn impulse_produces_a_tail() {
        let mut rv = PlateReverb::new(48_000.0);
        rv.set_params(5.0, 0.7, 0.2);
        let mut buf = vec![0.0f32; 48_000];
        buf[0] = 1.0;
        rv.process(&mut buf, 1.0);
        // Energy must appear after the pre-delay plus first comb delay.
        let tail: f32 = buf[4_000..].iter().map(|v| v.abs()).sum();
        assert!(tail > 0.01, "no reverb tail, sum {tail}");
    }

    #[test]
    fn tail_decays_with_bounded_energy() {
        let mut rv = PlateReverb::new(48_000.0);
        rv.set_params(10.0, 0.9, 0.1);
        let mut buf = vec![0.0f32; 96_000];
        buf[0] = 1.0;
        rv.process(&mut buf, 1.0);
        assert!(buf.iter().all(|v| v.is_finite()));
        let early: f32 = buf[..48_000].iter().map(|v| v * v).sum();
        let late: f32 = buf[48_000..].iter().map(|v| v * v).sum();
        assert!(late < early, "tail must decay: early {early}, late {late}");
    }

    #[test]
    fn params_are_clamped() {
        let mut rv = PlateReverb::new(48_000.0);
        rv.set_params(0.0, 5.0, 5.0);
        assert_eq!(rv.decay, 0.95);
        assert_eq!(rv.damping, 0.9);
        assert_eq!(rv.pre_delay.data.len(), 1);
    }

    #[test]
    fn unchanged_pre_delay_is_not_reallocated() {
        let mut rv = PlateReverb::new(48_000.0);
        rv.set_params(15.0, 0.4, 0.25);
        let ptr = rv.pre_delay.data.as_ptr();
        rv.set_params(15.0, 0.6, 0.3);
        assert_eq!(ptr, rv.pre_delay.data.as_ptr());
    }
}
