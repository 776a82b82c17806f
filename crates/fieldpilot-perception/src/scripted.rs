//! A deterministic detector that replays fixed results.
//!
//! Useful wherever randomised detection gets in the way: integration tests,
//! replaying a recorded field, or bench runs with a known obstacle layout.
//! Query counts are shared through an [`Arc`] so they stay observable after
//! the detector is boxed and handed to a router.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use fieldpilot_types::{Coordinates, FieldFeatureData, ObstacleData};

use crate::error::PerceptionError;
use crate::system::PerceptionSystem;

/// A [`PerceptionSystem`] returning the same configured results on every query.
#[derive(Debug, Clone)]
pub struct ScriptedPerception {
    name: &'static str,
    obstacles: Vec<ObstacleData>,
    features: Vec<FieldFeatureData>,
    failing: bool,
    active: bool,
    queries: Arc<AtomicU64>,
}

impl ScriptedPerception {
    /// An inactive detector that finds nothing.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            obstacles: Vec::new(),
            features: Vec::new(),
            failing: false,
            active: false,
            queries: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Report `obstacles` on every obstacle query.
    #[must_use]
    pub fn with_obstacles(mut self, obstacles: Vec<ObstacleData>) -> Self {
        self.obstacles = obstacles;
        self
    }

    /// Report `features` on every feature query.
    #[must_use]
    pub fn with_features(mut self, features: Vec<FieldFeatureData>) -> Self {
        self.features = features;
        self
    }

    /// Fail every active query with [`PerceptionError::Fault`].
    #[must_use]
    pub const fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Shared counter of queries that reached this detector while active.
    pub fn query_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.queries)
    }

    fn answer<T: Clone>(&self, results: &[T]) -> Result<Vec<T>, PerceptionError> {
        if !self.active {
            return Ok(Vec::new());
        }
        self.queries.fetch_add(1, Ordering::Relaxed);
        if self.failing {
            return Err(PerceptionError::Fault {
                system: self.name,
                reason: "scripted failure".to_owned(),
            });
        }
        Ok(results.to_vec())
    }
}

impl PerceptionSystem for ScriptedPerception {
    fn name(&self) -> &'static str {
        self.name
    }

    fn activate(&mut self) {
        self.active = true;
    }

    fn deactivate(&mut self) {
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn detect_obstacles(
        &mut self,
        _position: Coordinates,
    ) -> Result<Vec<ObstacleData>, PerceptionError> {
        self.answer(&self.obstacles)
    }

    fn analyze_field_features(
        &mut self,
        _position: Coordinates,
    ) -> Result<Vec<FieldFeatureData>, PerceptionError> {
        self.answer(&self.features)
    }
}
