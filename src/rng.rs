//! Cheap xorshift randomness for cosmetic jitter (not crypto secure).

pub struct EffectRng {
    state: u64,
}

impl EffectRng {
    pub fn new(seed: u64) -> Self {
        // xorshift must never sit at zero
        let state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self { state }
    }

    /// Seed from browser crypto when available, else from the page clock.
    pub fn from_entropy() -> Self {
        #[cfg(feature = "rng")]
        {
            let mut buf = [0u8; 8];
            if getrandom::getrandom(&mut buf).is_ok() {
                return Self::new(u64::from_le_bytes(buf));
            }
        }
        let now = crate::dom::now_ms();
        Self::new((now * 1000.0) as u64 ^ 0xA076_1D64_78BD_642F)
    }

    pub fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        // 53 high bits give an exact f64 mantissa
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in [lo, lo + span).
    pub fn span(&mut self, lo: f64, span: f64) -> f64 {
        lo + self.next_f64() * span
    }

    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        ((self.next_f64() * len as f64) as usize).min(len - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_interval_and_deterministic() {
        let mut a = EffectRng::new(42);
        let mut b = EffectRng::new(42);
        for _ in 0..1000 {
            let x = a.next_f64();
            assert!((0.0..1.0).contains(&x));
            assert_eq!(x, b.next_f64());
        }
    }

    #[test]
    fn zero_seed_still_produces_values() {
        let mut r = EffectRng::new(0);
        assert_ne!(r.next_u64(), 0);
    }

    #[test]
    fn index_stays_in_bounds() {
        let mut r = EffectRng::new(7);
        for _ in 0..500 {
            assert!(r.index(4) < 4);
        }
        assert_eq!(r.index(0), 0);
    }
}
