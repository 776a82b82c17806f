//! Attached implement state and operating parameters.
//!
//! One implement is attached at a time, and each type has exactly one
//! operating parameter that is only meaningful while that type is attached:
//!
//! | Implement | Parameter | Accepted range |
//! |-----------|-----------|----------------|
//! | plough    | working depth, cm | `>= 0` |
//! | seeder    | seed rate, kg/ha  | `>= 0` |
//! | sprayer   | intensity, %      | `0..=100` |
//!
//! Rejected requests leave the state unchanged, log a warning, and return
//! an [`ImplementError`] the caller is free to ignore.

use fieldpilot_types::ImplementType;
use serde::Serialize;
use tracing::{info, warn};

/// Upper bound for sprayer intensity, percent.
const MAX_SPRAYER_INTENSITY: f64 = 100.0;

/// Reasons an implement request was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImplementError {
    /// Re-attaching while the current implement is working.
    #[error("cannot attach {requested} while {attached} is active")]
    AttachWhileActive {
        /// Implement currently attached and working.
        attached: ImplementType,
        /// Implement that was requested.
        requested: ImplementType,
    },

    /// A parameter was set for an implement that is not attached.
    #[error("{parameter} requires {required}, but {attached} is attached")]
    WrongImplement {
        /// Parameter being set.
        parameter: &'static str,
        /// Implement the parameter belongs to.
        required: ImplementType,
        /// Implement actually attached.
        attached: ImplementType,
    },

    /// Activation was requested with nothing attached.
    #[error("no implement attached")]
    NothingAttached,

    /// The supplied value is NaN or infinite.
    #[error("{parameter} must be finite, got {value}")]
    NonFinite {
        /// Parameter being set.
        parameter: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// Tracks the attached implement, its parameters, and whether it is working.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImplementController {
    attached: ImplementType,
    plough_depth_cm: f64,
    seed_rate_kg_per_ha: f64,
    sprayer_intensity_pct: f64,
    active: bool,
}

impl ImplementController {
    /// A controller with nothing attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `implement`, resetting all parameters to zero.
    ///
    /// Attaching [`ImplementType::None`] detaches the current implement.
    pub fn attach(&mut self, implement: ImplementType) -> Result<(), ImplementError> {
        if self.active {
            let error = ImplementError::AttachWhileActive {
                attached: self.attached,
                requested: implement,
            };
            warn!(error = %error, "attach rejected");
            return Err(error);
        }
        self.attached = implement;
        self.plough_depth_cm = 0.0;
        self.seed_rate_kg_per_ha = 0.0;
        self.sprayer_intensity_pct = 0.0;
        info!(implement = %implement, "implement attached");
        Ok(())
    }

    /// Set plough working depth; negative values clamp to zero.
    pub fn set_plough_depth(&mut self, depth_cm: f64) -> Result<(), ImplementError> {
        let value = self.check("plough depth", ImplementType::Plough, depth_cm)?;
        self.plough_depth_cm = value.max(0.0);
        Ok(())
    }

    /// Set seed rate; negative values clamp to zero.
    pub fn set_seed_rate(&mut self, rate_kg_per_ha: f64) -> Result<(), ImplementError> {
        let value = self.check("seed rate", ImplementType::Seeder, rate_kg_per_ha)?;
        self.seed_rate_kg_per_ha = value.max(0.0);
        Ok(())
    }

    /// Set sprayer intensity, clamped to `0..=100` percent.
    pub fn set_sprayer_intensity(&mut self, intensity_pct: f64) -> Result<(), ImplementError> {
        let value = self.check("sprayer intensity", ImplementType::Sprayer, intensity_pct)?;
        self.sprayer_intensity_pct = value.clamp(0.0, MAX_SPRAYER_INTENSITY);
        Ok(())
    }

    /// Start working. Already active is a success.
    pub fn activate(&mut self) -> Result<(), ImplementError> {
        if self.attached == ImplementType::None {
            warn!("activate rejected: no implement attached");
            return Err(ImplementError::NothingAttached);
        }
        if !self.active {
            self.active = true;
            info!(implement = %self.attached, "implement activated");
        }
        Ok(())
    }

    /// Stop working. Idempotent.
    pub fn deactivate(&mut self) {
        if self.active {
            info!(implement = %self.attached, "implement deactivated");
        }
        self.active = false;
    }

    /// The attached implement.
    pub const fn attached(&self) -> ImplementType {
        self.attached
    }

    /// Whether the implement is working.
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Plough working depth in centimetres.
    pub const fn plough_depth(&self) -> f64 {
        self.plough_depth_cm
    }

    /// Seed rate in kilograms per hectare.
    pub const fn seed_rate(&self) -> f64 {
        self.seed_rate_kg_per_ha
    }

    /// Sprayer intensity in percent.
    pub const fn sprayer_intensity(&self) -> f64 {
        self.sprayer_intensity_pct
    }

    fn check(
        &self,
        parameter: &'static str,
        required: ImplementType,
        value: f64,
    ) -> Result<f64, ImplementError> {
        let error = if self.attached != required {
            ImplementError::WrongImplement {
                parameter,
                required,
                attached: self.attached,
            }
        } else if !value.is_finite() {
            ImplementError::NonFinite { parameter, value }
        } else {
            return Ok(value);
        };
        warn!(error = %error, "implement parameter rejected");
        Err(error)
    }
}
