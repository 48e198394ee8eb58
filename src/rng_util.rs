/// Uniform `f64` in `[low, high)`.
#[inline]
pub(crate) fn f64_range(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    low + rng.f64() * (high - low)
}

/// Standard normal draw via the Box-Muller transform.
pub(crate) fn standard_normal<R: rand::Rng>(rng: &mut R) -> f64 {
    // `random::<f64>()` is in [0, 1); shift to (0, 1] so `ln` stays finite.
    let u1 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * core::f64::consts::PI * u2).cos()
}
