//! The network aggregate
//!
//! A [`Network`] owns every waypoint and route. It is passed explicitly to each operation;
//! there is no process-wide current network.

use crate::constraint::{check_route, check_waypoint};
use crate::formats::exchange;
use crate::{
    ConstraintWarning, EntityId, NetworkError, Result, Route, RouteCollection, RouteWaypoint,
    Waypoint, WaypointCollection,
};
use std::path::Path;

/// All waypoints and routes
#[derive(Clone, Debug, Default)]
pub struct Network {
    waypoints: WaypointCollection,
    routes: RouteCollection,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Network {
    /// Create an empty network
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn waypoints(&self) -> &WaypointCollection {
        &self.waypoints
    }

    #[inline]
    pub fn routes(&self) -> &RouteCollection {
        &self.routes
    }

    /// Add a waypoint, returning any rule it breaks
    ///
    /// A duplicate identifier is reported, not rejected.
    pub fn add_waypoint(&mut self, waypoint: Waypoint) -> Vec<ConstraintWarning> {
        let mut warnings = check_waypoint(&waypoint);
        warnings.extend(self.waypoints.insert(waypoint));
        log_warnings(&warnings);
        warnings
    }

    /// Apply an explicit update to a waypoint
    ///
    /// Returns `None` if there is no waypoint with this id.
    pub fn update_waypoint<F>(&mut self, id: EntityId, update: F) -> Option<Vec<ConstraintWarning>>
    where
        F: FnOnce(&mut Waypoint),
    {
        let duplicate = self.waypoints.update(id, update)?;
        let mut warnings = self.waypoints.get(id).map(check_waypoint).unwrap_or_default();
        warnings.extend(duplicate);
        log_warnings(&warnings);
        Some(warnings)
    }

    /// Remove a waypoint
    ///
    /// Routes still referencing it are left as they are and fail to resolve afterwards.
    pub fn remove_waypoint(&mut self, id: EntityId) -> Option<Waypoint> {
        let waypoint = self.waypoints.remove(id)?;
        let referencing = self
            .routes
            .iter()
            .filter(|route| route.waypoints().iter().any(|rw| rw.waypoint_id == id))
            .count();
        if referencing > 0 {
            tracing::warn!(
                "Removed waypoint {} is still referenced by {referencing} route(s)",
                waypoint.identifier
            );
        }
        Some(waypoint)
    }

    /// Add a route, returning any rule it breaks
    pub fn add_route(&mut self, route: Route) -> Vec<ConstraintWarning> {
        let mut warnings = self.route_warnings(&route);
        warnings.extend(self.routes.insert(route));
        log_warnings(&warnings);
        warnings
    }

    /// Remove a route together with its route waypoints
    pub fn remove_route(&mut self, id: EntityId) -> Option<Route> {
        self.routes.remove(id)
    }

    /// Append a waypoint to a route's path
    ///
    /// Returns `None` if there is no route with this id.
    pub fn extend_route(&mut self, route_id: EntityId, waypoint_id: EntityId) -> Option<RouteWaypoint> {
        let route = self.routes.get_mut(route_id)?;
        Some(route.push_waypoint(waypoint_id))
    }

    /// Pair each entry of a route with its waypoint, in sequence order
    ///
    /// Fails with [`NetworkError::ReferentialGap`] on the first entry whose waypoint is not in
    /// this network.
    pub fn resolve_route<'a>(&'a self, route: &'a Route) -> Result<Vec<(&'a RouteWaypoint, &'a Waypoint)>> {
        route
            .waypoints()
            .iter()
            .map(|route_waypoint| {
                self.waypoints
                    .get(route_waypoint.waypoint_id)
                    .map(|waypoint| (route_waypoint, waypoint))
                    .ok_or_else(|| NetworkError::ReferentialGap {
                        route: route.name.clone(),
                        waypoint_id: route_waypoint.waypoint_id,
                    })
            })
            .collect()
    }

    /// Check every content rule over the whole network
    pub fn validate(&self) -> Vec<ConstraintWarning> {
        let mut warnings: Vec<ConstraintWarning> =
            self.waypoints.iter().flat_map(check_waypoint).collect();

        warnings.extend(
            self.waypoints
                .duplicate_identifiers()
                .into_iter()
                .map(|identifier| ConstraintWarning::DuplicateIdentifier {
                    identifier: identifier.to_string(),
                }),
        );

        for route in self.routes.iter() {
            warnings.extend(self.route_warnings(route));
        }

        warnings.extend(
            self.routes
                .duplicate_names()
                .into_iter()
                .map(|name| ConstraintWarning::DuplicateRouteName {
                    name: name.to_string(),
                }),
        );

        warnings
    }

    /// Replace all content with another network's
    pub fn replace_with(&mut self, other: Network) {
        *self = other;
    }

    /// Replace all content with the waypoints and routes of a GPX document
    ///
    /// This is a full replace, not a merge: every existing waypoint and route is discarded.
    /// Decoding happens into a separate network, so on error this network is left untouched.
    pub fn import_gpx(&mut self, source_name: &str, data: &[u8]) -> Result<Vec<ConstraintWarning>> {
        let (network, warnings) = exchange::decode(source_name, data)?;
        tracing::info!(
            "Imported {} waypoint(s) and {} route(s) from {source_name}, replacing {} waypoint(s) and {} route(s)",
            network.waypoints.len(),
            network.routes.len(),
            self.waypoints.len(),
            self.routes.len()
        );
        self.replace_with(network);
        Ok(warnings)
    }

    /// [`Network::import_gpx`] reading from a file
    pub fn import_gpx_file(&mut self, path: &Path) -> Result<Vec<ConstraintWarning>> {
        let data = std::fs::read(path)?;
        let source_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
        self.import_gpx(&source_name, &data)
    }

    fn route_warnings(&self, route: &Route) -> Vec<ConstraintWarning> {
        let mut warnings = Vec::new();

        for route_waypoint in route.waypoints() {
            if self.waypoints.get(route_waypoint.waypoint_id).is_none() {
                warnings.push(ConstraintWarning::ReferentialGap {
                    route: route.name.clone(),
                    waypoint_id: route_waypoint.waypoint_id,
                });
            }
        }

        let identifier_of = |route_waypoint: Option<&RouteWaypoint>| {
            route_waypoint
                .and_then(|rw| self.waypoints.get(rw.waypoint_id))
                .map(|waypoint| waypoint.identifier.as_str())
        };
        let endpoints = identifier_of(route.first_waypoint()).zip(identifier_of(route.last_waypoint()));

        warnings.extend(check_route(route, endpoints));
        warnings
    }
}

fn log_warnings(warnings: &[ConstraintWarning]) {
    for warning in warnings {
        tracing::warn!("{warning}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_network() -> (Network, EntityId, EntityId) {
        let mut network = Network::new();
        let alpha = Waypoint::new("ALPHA", -68.1, -67.5).named("ALPHA STATION");
        let bravo = Waypoint::new("BRAVO", -69.2, -68.4);
        let (alpha_id, bravo_id) = (alpha.id(), bravo.id());
        network.add_waypoint(alpha);
        network.add_waypoint(bravo);
        (network, alpha_id, bravo_id)
    }

    #[test]
    fn test_network_creation() {
        let network = Network::new();
        assert!(network.waypoints().is_empty());
        assert!(network.routes().is_empty());
        assert!(network.validate().is_empty());
    }

    #[test]
    fn test_resolve_route() {
        let (mut network, alpha, bravo) = sample_network();
        let mut route = Route::new("01_ALPHA_TO_BRAVO");
        route.push_waypoint(alpha);
        route.push_waypoint(bravo);
        let route_id = route.id();
        assert!(network.add_route(route).is_empty());

        let route = network.routes().get(route_id).unwrap();
        let resolved = network.resolve_route(route).unwrap();
        let identifiers: Vec<&str> = resolved.iter().map(|(_, w)| w.identifier.as_str()).collect();
        assert_eq!(identifiers, vec!["ALPHA", "BRAVO"]);
        assert_eq!(resolved[1].0.sequence, 2);
    }

    #[test]
    fn test_removed_waypoint_leaves_referential_gap() {
        let (mut network, alpha, bravo) = sample_network();
        let mut route = Route::new("01_ALPHA_TO_BRAVO");
        route.push_waypoint(alpha);
        route.push_waypoint(bravo);
        let route_id = route.id();
        network.add_route(route);

        assert!(network.remove_waypoint(bravo).is_some());

        let route = network.routes().get(route_id).unwrap();
        match network.resolve_route(route) {
            Err(NetworkError::ReferentialGap { waypoint_id, .. }) => assert_eq!(waypoint_id, bravo),
            other => panic!("expected a referential gap, got {other:?}"),
        }
        assert!(network
            .validate()
            .iter()
            .any(|w| matches!(w, ConstraintWarning::ReferentialGap { .. })));
    }

    #[test]
    fn test_duplicates_are_reported() {
        let (mut network, _, _) = sample_network();
        let warnings = network.add_waypoint(Waypoint::new("ALPHA", 0.0, 0.0));
        assert_eq!(
            warnings,
            vec![ConstraintWarning::DuplicateIdentifier {
                identifier: "ALPHA".to_string()
            }]
        );
        assert_eq!(network.waypoints().len(), 3);
        assert!(network
            .validate()
            .contains(&ConstraintWarning::DuplicateIdentifier {
                identifier: "ALPHA".to_string()
            }));
    }

    #[test]
    fn test_update_waypoint() {
        let (mut network, alpha, _) = sample_network();
        let warnings = network
            .update_waypoint(alpha, |w| w.identifier = "BRAVO".to_string())
            .unwrap();
        assert!(warnings.contains(&ConstraintWarning::DuplicateIdentifier {
            identifier: "BRAVO".to_string()
        }));
        // The earlier waypoint wins the lookup
        assert_eq!(network.waypoints().lookup("BRAVO").unwrap().id(), alpha);
    }

    #[test]
    fn test_extend_route_and_endpoint_warning() {
        let (mut network, alpha, bravo) = sample_network();
        let route = Route::new("01_ALPHA_TO_BRAVO");
        let route_id = route.id();
        network.add_route(route);

        network.extend_route(route_id, bravo).unwrap();
        network.extend_route(route_id, alpha).unwrap();
        assert!(network.validate().iter().any(|w| matches!(
            w,
            ConstraintWarning::RouteEndpointMismatch { start, end, .. } if start == "BRAVO" && end == "ALPHA"
        )));
        assert!(network.extend_route(alpha, bravo).is_none());
    }

    #[test]
    fn test_failed_import_keeps_network() {
        let (mut network, _, _) = sample_network();
        assert!(network.import_gpx("broken.gpx", b"<gpx").is_err());
        assert_eq!(network.waypoints().len(), 2);
    }
}
