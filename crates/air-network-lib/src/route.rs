//! Route model
//!
//! A route is a named, ordered path through waypoints. The path is stored as
//! [`RouteWaypoint`] entries which reference waypoints by id, so the same waypoint may
//! appear any number of times (including as both start and end).

use crate::{EntityId, generate_id};

/// Minimum number of entries a route needs before it can be exported
pub const MIN_EXPORTABLE_WAYPOINTS: usize = 2;

/// A positioned reference linking a route to a waypoint
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteWaypoint {
    pub route_id: EntityId,
    pub waypoint_id: EntityId,
    /// Position within the route, unique within it and used as the sort key
    pub sequence: u32,
}

/// A planned path between an origin and destination
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    id: EntityId,
    /// By convention `{NN}_{START}_TO_{END}`, e.g. `01_ALPHA_TO_BRAVO`
    pub name: String,
    waypoints: Vec<RouteWaypoint>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Route {
    /// Create an empty route with a freshly generated id
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(generate_id(), name)
    }

    /// Create an empty route with a known id, e.g. when loading from a store
    pub fn with_id(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            waypoints: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Append a waypoint reference after the current last entry
    ///
    /// Sequences start at 1 and increase by insertion order.
    pub fn push_waypoint(&mut self, waypoint_id: EntityId) -> RouteWaypoint {
        let sequence = self.waypoints.last().map_or(1, |last| last.sequence + 1);
        let route_waypoint = RouteWaypoint {
            route_id: self.id,
            waypoint_id,
            sequence,
        };
        self.waypoints.push(route_waypoint);
        route_waypoint
    }

    /// Replace the path with pre-sequenced entries, ordering them by `sequence`
    ///
    /// Entries are re-owned by this route (their `route_id` is overwritten). Returns the
    /// sequence numbers that occurred more than once, which the caller may report.
    pub fn attach_waypoints(&mut self, mut route_waypoints: Vec<RouteWaypoint>) -> Vec<u32> {
        route_waypoints.sort_by_key(|rw| rw.sequence);
        for route_waypoint in &mut route_waypoints {
            route_waypoint.route_id = self.id;
        }

        let mut duplicates: Vec<u32> = route_waypoints
            .windows(2)
            .filter(|pair| pair[0].sequence == pair[1].sequence)
            .map(|pair| pair[0].sequence)
            .collect();
        duplicates.dedup();

        self.waypoints = route_waypoints;
        duplicates
    }

    /// Ordered path entries
    #[inline]
    pub fn waypoints(&self) -> &[RouteWaypoint] {
        &self.waypoints
    }

    #[inline]
    pub fn first_waypoint(&self) -> Option<&RouteWaypoint> {
        self.waypoints.first()
    }

    #[inline]
    pub fn last_waypoint(&self) -> Option<&RouteWaypoint> {
        self.waypoints.last()
    }

    #[inline]
    pub fn waypoints_count(&self) -> usize {
        self.waypoints.len()
    }

    /// Whether the route has enough entries to be written to an output format
    #[inline]
    pub fn is_exportable(&self) -> bool {
        self.waypoints.len() >= MIN_EXPORTABLE_WAYPOINTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_increasing_sequences() {
        let mut route = Route::new("01_ALPHA_TO_BRAVO");
        let a = generate_id();
        let b = generate_id();

        route.push_waypoint(a);
        route.push_waypoint(b);
        route.push_waypoint(a);

        let sequences: Vec<u32> = route.waypoints().iter().map(|rw| rw.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert_eq!(route.first_waypoint().unwrap().waypoint_id, a);
        assert_eq!(route.last_waypoint().unwrap().waypoint_id, a);
        assert!(route.waypoints().iter().all(|rw| rw.route_id == route.id()));
    }

    #[test]
    fn test_attach_sorts_by_sequence() {
        let mut route = Route::new("02_BRAVO_TO_ALPHA");
        let other_route = generate_id();
        let a = generate_id();
        let b = generate_id();

        let duplicates = route.attach_waypoints(vec![
            RouteWaypoint {
                route_id: other_route,
                waypoint_id: b,
                sequence: 2,
            },
            RouteWaypoint {
                route_id: other_route,
                waypoint_id: a,
                sequence: 1,
            },
        ]);

        assert!(duplicates.is_empty());
        assert_eq!(route.first_waypoint().unwrap().waypoint_id, a);
        assert_eq!(route.last_waypoint().unwrap().waypoint_id, b);
        assert!(route.waypoints().iter().all(|rw| rw.route_id == route.id()));
    }

    #[test]
    fn test_attach_reports_duplicate_sequences() {
        let mut route = Route::new("03_A_TO_B");
        let id = route.id();
        let entry = |sequence| RouteWaypoint {
            route_id: id,
            waypoint_id: generate_id(),
            sequence,
        };

        let duplicates = route.attach_waypoints(vec![entry(1), entry(2), entry(2), entry(2)]);
        assert_eq!(duplicates, vec![2]);
    }

    #[test]
    fn test_exportable_needs_two_entries() {
        let mut route = Route::new("04_A_TO_A");
        assert!(!route.is_exportable());
        let a = generate_id();
        route.push_waypoint(a);
        assert!(!route.is_exportable());
        route.push_waypoint(a);
        assert!(route.is_exportable());
    }
}
