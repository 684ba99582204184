use std::ops::Range;

use faebot_core::SamplingParams;
use rand::Rng;

pub const TEMPERATURE: Range<f64> = 0.75..1.5;
pub const TOP_P: Range<f64> = 0.5..1.1;
pub const TOP_K: Range<u32> = 1..1024;
pub const SEED: Range<u32> = 1..1024;

/// Draw a fresh set of sampling knobs for one generation.
pub fn roll_params<R: Rng + ?Sized>(rng: &mut R, max_new_tokens: u32) -> SamplingParams {
    SamplingParams {
        temperature: rng.gen_range(TEMPERATURE),
        top_p: rng.gen_range(TOP_P),
        top_k: rng.gen_range(TOP_K),
        seed: rng.gen_range(SEED),
        max_new_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn rolls_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let p = roll_params(&mut rng, 250);
            assert!(TEMPERATURE.contains(&p.temperature), "{p:?}");
            assert!(TOP_P.contains(&p.top_p), "{p:?}");
            assert!(TOP_K.contains(&p.top_k), "{p:?}");
            assert!(SEED.contains(&p.seed), "{p:?}");
            assert_eq!(p.max_new_tokens, 250);
        }
    }

    #[test]
    fn successive_rolls_differ() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = roll_params(&mut rng, 100);
        let b = roll_params(&mut rng, 100);
        assert_ne!(a, b);
    }
}
