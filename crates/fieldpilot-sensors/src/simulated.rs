//! Randomised sensor simulations.
//!
//! Each simulation owns its own seeded [`SmallRng`] so a run is reproducible
//! for a given seed. Ranges are half-open `[min, max)`; a degenerate range
//! (max not above min) always yields `min`.

use fieldpilot_types::{CameraFrame, SoilReading, clamp_probability};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::SensorError;
use crate::source::SensorSource;

/// Draw from `[min, max)`, or return `min` for an empty range.
fn sample_range(rng: &mut SmallRng, min: f64, max: f64) -> f64 {
    if max > min {
        rng.random_range(min..max)
    } else {
        min
    }
}

/// Simulated forward-facing range finder reporting metres to the nearest return.
#[derive(Debug, Clone)]
pub struct SimulatedRangeFinder {
    rng: SmallRng,
    min_m: f64,
    max_m: f64,
}

impl SimulatedRangeFinder {
    /// Create a range finder reporting uniformly in `[min_m, max_m)`.
    pub fn new(seed: u64, min_m: f64, max_m: f64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            min_m,
            max_m,
        }
    }
}

impl SensorSource<f64> for SimulatedRangeFinder {
    fn read(&mut self) -> Result<f64, SensorError> {
        Ok(sample_range(&mut self.rng, self.min_m, self.max_m))
    }
}

/// Simulated soil probe.
#[derive(Debug, Clone)]
pub struct SimulatedSoilProbe {
    rng: SmallRng,
}

impl SimulatedSoilProbe {
    /// Moisture range in percent.
    const MOISTURE_PCT: (f64, f64) = (10.0, 45.0);
    /// Temperature range in degrees Celsius.
    const TEMPERATURE_C: (f64, f64) = (4.0, 26.0);

    /// Create a soil probe with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl SensorSource<SoilReading> for SimulatedSoilProbe {
    fn read(&mut self) -> Result<SoilReading, SensorError> {
        let (moisture_min, moisture_max) = Self::MOISTURE_PCT;
        let (temp_min, temp_max) = Self::TEMPERATURE_C;
        Ok(SoilReading {
            moisture_pct: sample_range(&mut self.rng, moisture_min, moisture_max),
            temperature_c: sample_range(&mut self.rng, temp_min, temp_max),
        })
    }
}

/// Simulated forward camera that occasionally drops frames.
#[derive(Debug, Clone)]
pub struct SimulatedCamera {
    rng: SmallRng,
    sequence: u64,
    width: u32,
    height: u32,
    dropout_probability: f64,
}

impl SimulatedCamera {
    /// Create a camera producing `width` x `height` frames.
    ///
    /// `dropout_probability` is clamped to `[0, 1]`; a dropped frame is
    /// reported as [`SensorError::SourceUnavailable`].
    pub fn new(seed: u64, width: u32, height: u32, dropout_probability: f64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            sequence: 0,
            width,
            height,
            dropout_probability: clamp_probability(dropout_probability),
        }
    }
}

impl SensorSource<CameraFrame> for SimulatedCamera {
    fn read(&mut self) -> Result<CameraFrame, SensorError> {
        if self.rng.random_bool(self.dropout_probability) {
            return Err(SensorError::unavailable("camera", "frame dropped"));
        }
        self.sequence = self.sequence.saturating_add(1);
        Ok(CameraFrame {
            sequence: self.sequence,
            width: self.width,
            height: self.height,
        })
    }
}
