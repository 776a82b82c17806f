//! Attachable field implements.

use serde::{Deserialize, Serialize};

/// The tool attached to the vehicle. At most one is attached at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementType {
    /// Nothing attached.
    #[default]
    None,
    /// Soil plough, parameterised by working depth.
    Plough,
    /// Seed drill, parameterised by seed rate.
    Seeder,
    /// Crop sprayer, parameterised by intensity (0--100).
    Sprayer,
}

impl ImplementType {
    /// Parse an operator-supplied name (`plough`/`plow`, `seeder`, `sprayer`, `none`).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "plough" | "plow" => Some(Self::Plough),
            "seeder" => Some(Self::Seeder),
            "sprayer" => Some(Self::Sprayer),
            _ => None,
        }
    }

    /// Lower-case display name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Plough => "plough",
            Self::Seeder => "seeder",
            Self::Sprayer => "sprayer",
        }
    }
}

impl core::fmt::Display for ImplementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
