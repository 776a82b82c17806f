//! Geodetic points and planar geometry helpers.
//!
//! Positions are latitude/longitude pairs in degrees, but all arithmetic is
//! a flat-earth approximation: distances are Euclidean in degree space and
//! metre offsets are converted with the fixed [`METERS_TO_DEGREES`] factor.
//! This is adequate for the few hundred metres a single field spans.

use serde::{Deserialize, Serialize};

/// Approximate number of degrees per metre used for all metre offsets.
pub const METERS_TO_DEGREES: f64 = 9e-6;

/// A geodetic point in degrees.
///
/// Equality is exact floating-point equality. Code that needs "same place"
/// semantics must use [`Coordinates::is_within`] with an explicit tolerance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees (north positive).
    pub latitude: f64,
    /// Longitude in degrees (east positive).
    pub longitude: f64,
}

impl Coordinates {
    /// Create a point from latitude and longitude in degrees.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both axes are finite numbers.
    pub const fn is_finite(self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Planar distance to `other`, in degrees.
    pub fn distance_to(self, other: Self) -> f64 {
        (other.latitude - self.latitude).hypot(other.longitude - self.longitude)
    }

    /// Whether both axes differ from `other` by less than `tolerance` degrees.
    pub fn is_within(self, other: Self, tolerance: f64) -> bool {
        (self.latitude - other.latitude).abs() < tolerance
            && (self.longitude - other.longitude).abs() < tolerance
    }

    /// Linear interpolation towards `other`; `fraction` 0 is `self`, 1 is `other`.
    pub fn lerp(self, other: Self, fraction: f64) -> Self {
        Self {
            latitude: (other.latitude - self.latitude).mul_add(fraction, self.latitude),
            longitude: (other.longitude - self.longitude).mul_add(fraction, self.longitude),
        }
    }

    /// Move at most `step` degrees along the straight line towards `target`.
    ///
    /// Never overshoots: if the target is closer than `step`, the target
    /// itself is returned.
    pub fn step_toward(self, target: Self, step: f64) -> Self {
        let distance = self.distance_to(target);
        if distance <= step || distance <= f64::EPSILON {
            return target;
        }
        self.lerp(target, step / distance)
    }

    /// Offset by metres north and east using the planar approximation.
    pub fn offset_meters(self, north_m: f64, east_m: f64) -> Self {
        Self {
            latitude: north_m.mul_add(METERS_TO_DEGREES, self.latitude),
            longitude: east_m.mul_add(METERS_TO_DEGREES, self.longitude),
        }
    }

    /// Offset by `distance_m` metres along `bearing_rad` (0 = north, clockwise).
    pub fn offset_polar(self, bearing_rad: f64, distance_m: f64) -> Self {
        self.offset_meters(distance_m * bearing_rad.cos(), distance_m * bearing_rad.sin())
    }

    /// Shift each axis by the given number of degrees.
    pub fn translated(self, d_latitude: f64, d_longitude: f64) -> Self {
        Self {
            latitude: self.latitude + d_latitude,
            longitude: self.longitude + d_longitude,
        }
    }
}

impl core::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}
