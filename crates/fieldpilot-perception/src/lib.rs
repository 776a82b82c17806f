//! Obstacle and field-feature detection for the FieldPilot guidance loop.
//!
//! Two interchangeable detectors implement [`PerceptionSystem`]:
//!
//! - [`CameraPerception`] -- frame-driven; reports occasional obstacles a
//!   few metres ahead and classifies agronomic field features.
//! - [`LidarPerception`] -- ranging only; reports returns at any bearing and
//!   has no field-feature capability.
//!
//! The control unit talks to a [`PerceptionRouter`], which caches results by
//! query position and fails over between a primary and a lazily built
//! backup detector.
//!
//! # Modules
//!
//! - [`camera`] -- [`CameraPerception`] and [`CameraParams`].
//! - [`error`] -- [`PerceptionError`].
//! - [`lidar`] -- [`LidarPerception`] and [`LidarParams`].
//! - [`router`] -- [`PerceptionRouter`], its position-keyed cache, and failover.
//! - [`scripted`] -- [`ScriptedPerception`], a deterministic detector for tests
//!   and replay.
//! - [`system`] -- The [`PerceptionSystem`] trait and [`PerceptionKind`].

pub mod camera;
pub mod error;
pub mod lidar;
pub mod router;
pub mod scripted;
pub mod system;

pub use camera::{CameraParams, CameraPerception};
pub use error::PerceptionError;
pub use lidar::{LidarParams, LidarPerception};
pub use router::{BackupFactory, PerceptionRouter, RouterParams, RouterVariant};
pub use scripted::ScriptedPerception;
pub use system::{PerceptionKind, PerceptionSystem};
