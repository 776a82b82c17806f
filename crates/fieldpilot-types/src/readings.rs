//! Payloads returned by auxiliary sensor sources.

use serde::{Deserialize, Serialize};

/// A soil probe reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilReading {
    /// Volumetric moisture, percent.
    pub moisture_pct: f64,
    /// Soil temperature, degrees Celsius.
    pub temperature_c: f64,
}

/// Metadata for one raster frame captured by the forward camera.
///
/// Pixel data is not modelled; the frame only proves that the camera
/// delivered something for the detector to work on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraFrame {
    /// Monotonic frame counter from the camera.
    pub sequence: u64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}
