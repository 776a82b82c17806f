//! Sensor sources and time-boxed caching for the FieldPilot guidance loop.
//!
//! The control unit never talks to hardware directly. Every auxiliary
//! reading (forward distance, soil state, camera frames) comes from a
//! [`SensorSource`], usually wrapped in a [`TimedCache`] so that a burst of
//! reads within one step hits the device only once.
//!
//! # Modules
//!
//! - [`cache`] -- [`TimedCache`]: lazily constructed source plus TTL cache,
//!   and the [`Stamped`] freshness rule it is built on.
//! - [`error`] -- [`SensorError`].
//! - [`simulated`] -- Randomised stand-ins for the range finder, soil probe,
//!   and forward camera.
//! - [`source`] -- The [`SensorSource`] trait and fixed/failing test doubles.

pub mod cache;
pub mod error;
pub mod simulated;
pub mod source;

pub use cache::{Stamped, TimedCache};
pub use error::SensorError;
pub use simulated::{SimulatedCamera, SimulatedRangeFinder, SimulatedSoilProbe};
pub use source::{FailingSource, FixedSource, FnSource, SensorSource};
