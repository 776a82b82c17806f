//! Probability helpers shared by the simulated collaborators.

/// Clamp a probability into `[0, 1]`, mapping NaN to 0.
pub const fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}
