//! Detection records produced by the perception layer.
//!
//! These are ephemeral: each detection call builds fresh values and callers
//! receive owned copies.

use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;

/// An obstacle reported near the vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleData {
    /// Estimated obstacle position.
    pub position: Coordinates,
    /// Free-text description from the detecting sensor.
    pub description: String,
}

impl ObstacleData {
    /// Create an obstacle record.
    pub fn new(position: Coordinates, description: impl Into<String>) -> Self {
        Self {
            position,
            description: description.into(),
        }
    }

    /// Whether the description mentions a rock-like object.
    ///
    /// Matches `rock`, `stone`, or `boulder`, case-insensitively.
    pub fn is_rock_like(&self) -> bool {
        let lowered = self.description.to_lowercase();
        ["rock", "stone", "boulder"]
            .iter()
            .any(|keyword| lowered.contains(keyword))
    }
}

/// Category of an agronomic field feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldFeatureType {
    /// Not classified.
    #[default]
    Unknown,
    /// A weed species that needs treatment.
    DangerousWeed,
    /// Standing water or saturated soil.
    WaterLogging,
    /// Visible pest damage.
    PestInfestation,
}

impl FieldFeatureType {
    /// The categories a detector may emit (everything except `Unknown`).
    pub const DETECTABLE: [Self; 3] = [
        Self::DangerousWeed,
        Self::WaterLogging,
        Self::PestInfestation,
    ];
}

/// A field feature observed by a perception system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFeatureData {
    /// Estimated feature position.
    pub position: Coordinates,
    /// Feature category.
    pub feature_type: FieldFeatureType,
    /// Free-text details from the detecting sensor.
    pub details: String,
}
