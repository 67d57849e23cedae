//! Typed waypoint and route collections
//!
//! Both collections are ordered maps keyed by [`EntityId`] (so iteration follows creation
//! order) with a secondary index on the public key: `identifier` for waypoints, `name` for
//! routes. The secondary index is updated on every mutation instead of being recomputed by
//! scanning.
//!
//! Uniqueness of the secondary key is a caller responsibility: duplicates are accepted and
//! reported as [`ConstraintWarning`]s. Lookups by key return the earliest registered entity.

use crate::{ConstraintWarning, EntityId, Route, Waypoint};
use std::collections::{BTreeMap, HashMap};

/// Secondary index mapping a key to every id registered under it, oldest first
#[derive(Clone, Debug, Default)]
struct KeyIndex {
    ids: HashMap<String, Vec<EntityId>>,
}

impl KeyIndex {
    /// Returns true when the key was already taken
    fn add(&mut self, key: &str, id: EntityId) -> bool {
        let ids = self.ids.entry(key.to_string()).or_default();
        let taken = !ids.is_empty();
        // Keep ids sorted so the oldest wins lookups regardless of insertion order
        let position = ids.partition_point(|existing| *existing < id);
        ids.insert(position, id);
        taken
    }

    fn remove(&mut self, key: &str, id: EntityId) {
        if let Some(ids) = self.ids.get_mut(key) {
            ids.retain(|existing| *existing != id);
            if ids.is_empty() {
                self.ids.remove(key);
            }
        }
    }

    fn first(&self, key: &str) -> Option<EntityId> {
        self.ids.get(key).and_then(|ids| ids.first().copied())
    }

    fn count(&self, key: &str) -> usize {
        self.ids.get(key).map_or(0, Vec::len)
    }

    /// Keys registered more than once, sorted
    fn duplicated_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .ids
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(key, _)| key.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }
}

/// All waypoints of a network
#[derive(Clone, Debug, Default)]
pub struct WaypointCollection {
    waypoints: BTreeMap<EntityId, Waypoint>,
    by_identifier: KeyIndex,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl WaypointCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a waypoint, replacing any waypoint with the same id
    ///
    /// Returns a warning when another waypoint already uses the same identifier.
    pub fn insert(&mut self, waypoint: Waypoint) -> Option<ConstraintWarning> {
        if let Some(previous) = self.waypoints.remove(&waypoint.id()) {
            self.by_identifier.remove(&previous.identifier, previous.id());
        }

        let taken = self.by_identifier.add(&waypoint.identifier, waypoint.id());
        let warning = taken.then(|| ConstraintWarning::DuplicateIdentifier {
            identifier: waypoint.identifier.clone(),
        });
        self.waypoints.insert(waypoint.id(), waypoint);
        warning
    }

    /// Apply an explicit update to a stored waypoint, keeping the identifier index in step
    ///
    /// Returns `None` if no waypoint has this id, otherwise any duplicate identifier warning.
    pub fn update<F>(&mut self, id: EntityId, update: F) -> Option<Option<ConstraintWarning>>
    where
        F: FnOnce(&mut Waypoint),
    {
        let waypoint = self.waypoints.get_mut(&id)?;
        let old_identifier = waypoint.identifier.clone();
        update(waypoint);

        if waypoint.identifier == old_identifier {
            return Some(None);
        }

        self.by_identifier.remove(&old_identifier, id);
        let taken = self.by_identifier.add(&waypoint.identifier, id);
        Some(taken.then(|| ConstraintWarning::DuplicateIdentifier {
            identifier: waypoint.identifier.clone(),
        }))
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Waypoint> {
        let waypoint = self.waypoints.remove(&id)?;
        self.by_identifier.remove(&waypoint.identifier, id);
        Some(waypoint)
    }

    #[inline]
    pub fn get(&self, id: EntityId) -> Option<&Waypoint> {
        self.waypoints.get(&id)
    }

    /// Find a waypoint by its public identifier
    #[inline]
    pub fn lookup(&self, identifier: &str) -> Option<&Waypoint> {
        self.by_identifier
            .first(identifier)
            .and_then(|id| self.waypoints.get(&id))
    }

    /// Number of waypoints registered under an identifier
    #[inline]
    pub fn identifier_count(&self, identifier: &str) -> usize {
        self.by_identifier.count(identifier)
    }

    /// Identifiers used by more than one waypoint, sorted
    pub fn duplicate_identifiers(&self) -> Vec<&str> {
        self.by_identifier.duplicated_keys()
    }

    /// Waypoints in id (creation) order
    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.values()
    }

    /// Waypoints sorted alphabetically by identifier (ties broken by id)
    pub fn sorted_by_identifier(&self) -> Vec<&Waypoint> {
        let mut waypoints: Vec<&Waypoint> = self.waypoints.values().collect();
        waypoints.sort_by(|a, b| {
            a.identifier
                .cmp(&b.identifier)
                .then_with(|| a.id().cmp(&b.id()))
        });
        waypoints
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

/// All routes of a network
#[derive(Clone, Debug, Default)]
pub struct RouteCollection {
    routes: BTreeMap<EntityId, Route>,
    by_name: KeyIndex,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RouteCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route, replacing any route with the same id
    ///
    /// Returns a warning when another route already uses the same name.
    pub fn insert(&mut self, route: Route) -> Option<ConstraintWarning> {
        if let Some(previous) = self.routes.remove(&route.id()) {
            self.by_name.remove(&previous.name, previous.id());
        }

        let taken = self.by_name.add(&route.name, route.id());
        let warning = taken.then(|| ConstraintWarning::DuplicateRouteName {
            name: route.name.clone(),
        });
        self.routes.insert(route.id(), route);
        warning
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Route> {
        let route = self.routes.remove(&id)?;
        self.by_name.remove(&route.name, id);
        Some(route)
    }

    #[inline]
    pub fn get(&self, id: EntityId) -> Option<&Route> {
        self.routes.get(&id)
    }

    /// Mutable access for path edits
    ///
    /// Renaming must go through [`RouteCollection::rename`] to keep the name index valid.
    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Route> {
        self.routes.get_mut(&id)
    }

    pub fn rename(&mut self, id: EntityId, name: impl Into<String>) -> Option<Option<ConstraintWarning>> {
        let route = self.routes.get_mut(&id)?;
        let name = name.into();
        self.by_name.remove(&route.name, id);
        let taken = self.by_name.add(&name, id);
        route.name = name;
        Some(taken.then(|| ConstraintWarning::DuplicateRouteName {
            name: route.name.clone(),
        }))
    }

    /// Find a route by name
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<&Route> {
        self.by_name.first(name).and_then(|id| self.routes.get(&id))
    }

    /// Route names used by more than one route, sorted
    pub fn duplicate_names(&self) -> Vec<&str> {
        self.by_name.duplicated_keys()
    }

    /// Routes in id (creation) order
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
