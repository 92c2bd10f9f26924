//! Uniform draws used by every randomized rule.
//!
//! All game randomness goes through these two helpers so a scripted source
//! can reproduce exact sequences in tests.

use rand::Rng;

/// Uniform float in `[0, 1)`.
pub fn ran(rng: &mut impl Rng) -> f64 {
    rng.gen::<f64>()
}

/// Uniform integer in `[0, n)`. Returns 0 when `n` is 0.
pub fn iran(rng: &mut impl Rng, n: u32) -> u32 {
    if n == 0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pick = (ran(rng) * f64::from(n)).floor() as u32;
    pick.min(n - 1)
}

/// Uniform integer in `[low, high]`.
pub fn between(rng: &mut impl Rng, low: i32, high: i32) -> i32 {
    if high <= low {
        return low;
    }
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    let span = (high - low + 1) as u32;
    #[allow(clippy::cast_possible_wrap)]
    let pick = iran(rng, span) as i32;
    low + pick
}
