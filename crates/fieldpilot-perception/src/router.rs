//! Caching, fail-over front end for the perception variants.
//!
//! The router holds a primary detector and, optionally, a factory for a
//! backup that is only built the first time it is needed. Obstacle and
//! feature queries each have their own single-entry cache keyed by query
//! position: a cached result is reused only while it is younger than the
//! TTL *and* the new query lies within the position tolerance of the cached
//! one.
//!
//! # Failure policy
//!
//! When the selected detector fails, the router switches to the other one
//! (building the backup if necessary) and retries once. If that also fails
//! the query yields an empty result. Failure-induced empties are never
//! cached, so the next query tries again.

use std::time::Duration;

use fieldpilot_sensors::Stamped;
use fieldpilot_types::{Coordinates, FieldFeatureData, ObstacleData};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::PerceptionError;
use crate::system::PerceptionSystem;

/// Builds the backup detector on first use.
pub type BackupFactory = Box<dyn FnOnce() -> Box<dyn PerceptionSystem> + Send>;

/// Which detector the router currently queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterVariant {
    /// The primary detector.
    Primary,
    /// The lazily built backup detector.
    Backup,
}

impl RouterVariant {
    const fn other(self) -> Self {
        match self {
            Self::Primary => Self::Backup,
            Self::Backup => Self::Primary,
        }
    }

    /// Lower-case display name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Backup => "backup",
        }
    }
}

/// Tunables for [`PerceptionRouter`].
#[derive(Debug, Clone, PartialEq)]
pub struct RouterParams {
    /// How long a cached result stays valid. Zero disables caching.
    pub cache_ttl: Duration,
    /// Per-axis distance within which a query reuses the cached result, degrees.
    pub position_tolerance_deg: f64,
}

impl Default for RouterParams {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_millis(500),
            position_tolerance_deg: 1e-5,
        }
    }
}

// ---------------------------------------------------------------------------
// Position-keyed cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CachedQuery<T> {
    position: Coordinates,
    results: Vec<T>,
}

/// Single-entry cache of the last successful query.
///
/// Freshness follows the same [`Stamped`] rule as the sensor caches; the
/// position check is added on top.
#[derive(Debug, Clone)]
struct QueryCache<T> {
    ttl: Duration,
    tolerance: f64,
    entry: Option<Stamped<CachedQuery<T>>>,
}

impl<T: Clone> QueryCache<T> {
    const fn new(ttl: Duration, tolerance: f64) -> Self {
        Self {
            ttl,
            tolerance,
            entry: None,
        }
    }

    fn lookup(&self, position: Coordinates) -> Option<Vec<T>> {
        self.entry
            .as_ref()
            .and_then(|stamped| stamped.fresh_within(self.ttl))
            .filter(|cached| cached.position.is_within(position, self.tolerance))
            .map(|cached| cached.results.clone())
    }

    fn store(&mut self, position: Coordinates, results: Vec<T>) {
        self.entry = Some(Stamped::now(CachedQuery { position, results }));
    }

    fn clear(&mut self) {
        self.entry = None;
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// A [`PerceptionSystem`] that caches results and fails over between detectors.
pub struct PerceptionRouter {
    primary: Box<dyn PerceptionSystem>,
    backup: Option<Box<dyn PerceptionSystem>>,
    backup_factory: Option<BackupFactory>,
    selected: RouterVariant,
    obstacles: QueryCache<ObstacleData>,
    features: QueryCache<FieldFeatureData>,
}

impl PerceptionRouter {
    /// Wrap `primary` (activated here) with an optional backup factory.
    pub fn new(
        mut primary: Box<dyn PerceptionSystem>,
        backup_factory: Option<BackupFactory>,
        params: &RouterParams,
    ) -> Self {
        primary.activate();
        Self {
            primary,
            backup: None,
            backup_factory,
            selected: RouterVariant::Primary,
            obstacles: QueryCache::new(params.cache_ttl, params.position_tolerance_deg),
            features: QueryCache::new(params.cache_ttl, params.position_tolerance_deg),
        }
    }

    /// The detector currently being queried.
    pub const fn active_variant(&self) -> RouterVariant {
        self.selected
    }

    /// Whether the backup detector has been built.
    pub const fn backup_initialized(&self) -> bool {
        self.backup.is_some()
    }

    /// Select the backup detector, building it if needed.
    ///
    /// Returns `false` (and keeps the current selection) when no backup is
    /// configured. Cached results are dropped on a successful switch.
    pub fn switch_to_backup(&mut self) -> bool {
        if !self.ensure_backup() {
            warn!("no backup perception configured");
            return false;
        }
        self.select(RouterVariant::Backup);
        true
    }

    /// Select the primary detector. Cached results are dropped.
    pub fn switch_to_primary(&mut self) {
        self.select(RouterVariant::Primary);
    }

    /// Drop all cached results.
    pub fn clear_cache(&mut self) {
        self.obstacles.clear();
        self.features.clear();
    }

    fn select(&mut self, variant: RouterVariant) {
        if self.selected != variant {
            info!(
                from = self.selected.as_str(),
                to = variant.as_str(),
                "perception variant switched"
            );
        }
        self.selected = variant;
        self.clear_cache();
    }

    /// Build and activate the backup if it does not exist yet.
    fn ensure_backup(&mut self) -> bool {
        if self.backup.is_some() {
            return true;
        }
        let Some(factory) = self.backup_factory.take() else {
            return false;
        };
        let mut backup = factory();
        backup.activate();
        info!(system = backup.name(), "backup perception initialised");
        self.backup = Some(backup);
        true
    }

    fn system_mut(&mut self, variant: RouterVariant) -> Option<&mut Box<dyn PerceptionSystem>> {
        match variant {
            RouterVariant::Primary => Some(&mut self.primary),
            RouterVariant::Backup => self.backup.as_mut(),
        }
    }

    /// Query the selected detector, failing over once on error.
    ///
    /// Returns `None` when both attempts failed.
    fn query_with_failover<T>(
        &mut self,
        query: &'static str,
        position: Coordinates,
        mut run: impl FnMut(
            &mut Box<dyn PerceptionSystem>,
            Coordinates,
        ) -> Result<Vec<T>, PerceptionError>,
    ) -> Option<Vec<T>> {
        let first = self.selected;
        if let Some(system) = self.system_mut(first) {
            match run(system, position) {
                Ok(results) => return Some(results),
                Err(e) => {
                    warn!(query, variant = first.as_str(), error = %e, "perception query failed");
                }
            }
        }

        let fallback = first.other();
        if fallback == RouterVariant::Backup && !self.ensure_backup() {
            warn!(query, "no backup perception to fail over to");
            return None;
        }
        info!(from = first.as_str(), to = fallback.as_str(), "perception failover");
        self.selected = fallback;

        let system = self.system_mut(fallback)?;
        match run(system, position) {
            Ok(results) => Some(results),
            Err(e) => {
                warn!(query, variant = fallback.as_str(), error = %e, "perception retry failed");
                None
            }
        }
    }
}

impl core::fmt::Debug for PerceptionRouter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PerceptionRouter")
            .field("primary", &self.primary.name())
            .field("backup", &self.backup.as_ref().map(|backup| backup.name()))
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

impl PerceptionSystem for PerceptionRouter {
    fn name(&self) -> &'static str {
        "router"
    }

    fn activate(&mut self) {
        self.primary.activate();
        if let Some(backup) = self.backup.as_mut() {
            backup.activate();
        }
    }

    fn deactivate(&mut self) {
        self.primary.deactivate();
        if let Some(backup) = self.backup.as_mut() {
            backup.deactivate();
        }
        self.clear_cache();
    }

    fn is_active(&self) -> bool {
        match self.selected {
            RouterVariant::Primary => self.primary.is_active(),
            RouterVariant::Backup => self.backup.as_ref().is_some_and(|backup| backup.is_active()),
        }
    }

    fn detect_obstacles(
        &mut self,
        position: Coordinates,
    ) -> Result<Vec<ObstacleData>, PerceptionError> {
        if let Some(hit) = self.obstacles.lookup(position) {
            debug!(query = "obstacles", %position, "perception cache hit");
            return Ok(hit);
        }
        let Some(found) = self.query_with_failover("obstacles", position, |system, at| {
            system.detect_obstacles(at)
        }) else {
            return Ok(Vec::new());
        };
        self.obstacles.store(position, found.clone());
        Ok(found)
    }

    fn analyze_field_features(
        &mut self,
        position: Coordinates,
    ) -> Result<Vec<FieldFeatureData>, PerceptionError> {
        if let Some(hit) = self.features.lookup(position) {
            debug!(query = "features", %position, "perception cache hit");
            return Ok(hit);
        }
        let Some(found) = self.query_with_failover("features", position, |system, at| {
            system.analyze_field_features(at)
        }) else {
            return Ok(Vec::new());
        };
        self.features.store(position, found.clone());
        Ok(found)
    }
}
