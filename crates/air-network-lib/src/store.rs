//! Persisted store contract
//!
//! The library does not own persistence. A store only has to load and save a whole
//! [`Network`]; how it lays out its tables or files is up to the implementation.
//!
//! With the `serde` feature, [`NetworkSnapshot`] gives the flat three-table form
//! (`waypoints`, `routes`, `route_waypoints`) that file and database stores persist.

use crate::{Network, Result};

/// Loads and saves a complete network
pub trait NetworkStore {
    fn load(&self) -> Result<Network>;

    fn save(&self, network: &Network) -> Result<()>;
}

#[cfg(feature = "serde")]
pub use snapshot::{NetworkSnapshot, RouteRow};

#[cfg(feature = "serde")]
mod snapshot {
    use crate::{ConstraintWarning, EntityId, Network, Route, RouteWaypoint, Waypoint};
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RouteRow {
        pub id: EntityId,
        pub name: String,
    }

    /// A network as flat rows
    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    pub struct NetworkSnapshot {
        pub waypoints: Vec<Waypoint>,
        pub routes: Vec<RouteRow>,
        pub route_waypoints: Vec<RouteWaypoint>,
    }

    impl From<&Network> for NetworkSnapshot {
        fn from(network: &Network) -> Self {
            let routes = network.routes();
            Self {
                waypoints: network.waypoints().iter().cloned().collect(),
                routes: routes
                    .iter()
                    .map(|route| RouteRow {
                        id: route.id(),
                        name: route.name.clone(),
                    })
                    .collect(),
                route_waypoints: routes
                    .iter()
                    .flat_map(|route| route.waypoints().iter().copied())
                    .collect(),
            }
        }
    }

    impl NetworkSnapshot {
        /// Rebuild the network, route entries regrouped by route and ordered by sequence
        ///
        /// Entries referencing a missing waypoint are kept and reported as referential gaps.
        /// Entries whose route is missing have nowhere to go and are dropped with a warning.
        pub fn into_network(self) -> (Network, Vec<ConstraintWarning>) {
            let mut network = Network::new();
            let mut warnings = Vec::new();

            for waypoint in self.waypoints {
                warnings.extend(network.add_waypoint(waypoint));
            }

            let mut entries: HashMap<EntityId, Vec<RouteWaypoint>> = HashMap::new();
            for route_waypoint in self.route_waypoints {
                entries
                    .entry(route_waypoint.route_id)
                    .or_default()
                    .push(route_waypoint);
            }

            for row in self.routes {
                let mut route = Route::with_id(row.id, row.name);
                // Repeated sequences are reported by add_route
                route.attach_waypoints(entries.remove(&row.id).unwrap_or_default());
                warnings.extend(network.add_route(route));
            }

            let orphans: usize = entries.values().map(Vec::len).sum();
            if orphans > 0 {
                tracing::warn!("Dropped {orphans} route waypoint row(s) of unknown routes");
            }

            (network, warnings)
        }
    }
}
