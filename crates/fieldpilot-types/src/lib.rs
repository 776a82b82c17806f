//! Shared value types for the FieldPilot guidance loop.
//!
//! Everything in this crate is a plain value: it can be cloned, compared,
//! and serialized, and owns no behaviour beyond simple planar geometry.
//! Higher crates (sensors, navigation, perception, core) exchange data
//! exclusively through these types.
//!
//! # Modules
//!
//! - [`geo`] -- [`Coordinates`] and the planar degree/metre approximation.
//! - [`route`] -- [`Route`] waypoint sequences and [`FieldBoundaries`].
//! - [`detection`] -- [`ObstacleData`] and [`FieldFeatureData`] produced by
//!   perception.
//! - [`implement`] -- [`ImplementType`] for attachable field tools.
//! - [`readings`] -- Auxiliary sensor payloads ([`SoilReading`], [`CameraFrame`]).
//! - [`ids`] -- Strongly-typed identifiers ([`OperationId`]).
//! - [`probability`] -- [`clamp_probability`] for simulated fault rates.

pub mod detection;
pub mod geo;
pub mod ids;
pub mod implement;
pub mod probability;
pub mod readings;
pub mod route;

pub use detection::{FieldFeatureData, FieldFeatureType, ObstacleData};
pub use geo::{Coordinates, METERS_TO_DEGREES};
pub use ids::OperationId;
pub use implement::ImplementType;
pub use probability::clamp_probability;
pub use readings::{CameraFrame, SoilReading};
pub use route::{FieldBoundaries, Route};
