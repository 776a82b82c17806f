//! Routes (ordered waypoint sequences) and field boundaries.

use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;

/// An ordered sequence of waypoints.
///
/// The first waypoint is the vehicle position at planning time and the last
/// is the requested target. A route handed out by a planner is never empty;
/// an empty route only exists transiently (e.g. after an operation stops).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route {
    waypoints: Vec<Coordinates>,
}

impl Route {
    /// Create a route from an ordered list of waypoints.
    pub const fn new(waypoints: Vec<Coordinates>) -> Self {
        Self { waypoints }
    }

    /// Borrow the waypoints in order.
    pub fn waypoints(&self) -> &[Coordinates] {
        &self.waypoints
    }

    /// Number of waypoints.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Whether the route has no waypoints.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// The waypoint at `index`, if any.
    pub fn get(&self, index: usize) -> Option<Coordinates> {
        self.waypoints.get(index).copied()
    }

    /// The first waypoint, if any.
    pub fn first(&self) -> Option<Coordinates> {
        self.waypoints.first().copied()
    }

    /// The last waypoint (the target), if any.
    pub fn last(&self) -> Option<Coordinates> {
        self.waypoints.last().copied()
    }

    /// A new route holding the waypoints from `index` onwards.
    ///
    /// Returns an empty route when `index` is past the end.
    pub fn remaining_from(&self, index: usize) -> Self {
        Self {
            waypoints: self.waypoints.get(index..).map(<[_]>::to_vec).unwrap_or_default(),
        }
    }

    /// Iterate over the waypoints in order.
    pub fn iter(&self) -> core::slice::Iter<'_, Coordinates> {
        self.waypoints.iter()
    }

    /// Remove every waypoint.
    pub fn clear(&mut self) {
        self.waypoints.clear();
    }

    /// Consume the route, returning the waypoint list.
    pub fn into_waypoints(self) -> Vec<Coordinates> {
        self.waypoints
    }
}

impl From<Vec<Coordinates>> for Route {
    fn from(waypoints: Vec<Coordinates>) -> Self {
        Self::new(waypoints)
    }
}

impl FromIterator<Coordinates> for Route {
    fn from_iter<I: IntoIterator<Item = Coordinates>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Route {
    type Item = &'a Coordinates;
    type IntoIter = core::slice::Iter<'a, Coordinates>;

    fn into_iter(self) -> Self::IntoIter {
        self.waypoints.iter()
    }
}

/// Polygon vertices describing the worked field.
///
/// Advisory only: planners accept it but do not test routes against it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldBoundaries {
    /// Polygon vertices in order.
    pub vertices: Vec<Coordinates>,
}

impl FieldBoundaries {
    /// Create boundaries from polygon vertices.
    pub const fn new(vertices: Vec<Coordinates>) -> Self {
        Self { vertices }
    }
}
