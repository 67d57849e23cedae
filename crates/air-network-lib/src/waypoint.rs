//! Waypoint model
//!
//! A waypoint is a single named point of interest. Its `identifier` is the short public
//! reference used by every output format; its `id` is the internal, stable key.

use crate::{EntityId, generate_id};
use chrono::NaiveDate;
use geo::Point;

/// Maximum identifier length shared by all output formats
pub const IDENTIFIER_MAX_LENGTH: usize = 6;

/// Maximum name length, the number of characters GPS units list for a waypoint
pub const NAME_MAX_LENGTH: usize = 17;

/// A known location with an identifier
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Waypoint {
    id: EntityId,
    /// 1-6 upper case alphanumeric characters, unique within a network
    pub identifier: String,
    /// WGS84 position, x = longitude, y = latitude
    pub position: Point<f64>,
    /// Longer, less formal name (up to 17 upper case alphanumeric or space characters)
    pub name: Option<String>,
    /// Things near the waypoint, or other names it is known as
    pub colocated_with: Option<String>,
    pub last_accessed_at: Option<NaiveDate>,
    pub last_accessed_by: Option<String>,
    pub comment: Option<String>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Waypoint {
    /// Create a waypoint with a freshly generated id
    pub fn new(identifier: impl Into<String>, longitude: f64, latitude: f64) -> Self {
        Self::with_id(generate_id(), identifier, longitude, latitude)
    }

    /// Create a waypoint with a known id, e.g. when loading from a store
    pub fn with_id(id: EntityId, identifier: impl Into<String>, longitude: f64, latitude: f64) -> Self {
        Self {
            id,
            identifier: identifier.into(),
            position: Point::new(longitude, latitude),
            name: None,
            colocated_with: None,
            last_accessed_at: None,
            last_accessed_by: None,
            comment: None,
        }
    }

    /// Set the name (builder style)
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    #[inline]
    pub fn longitude(&self) -> f64 {
        self.position.x()
    }

    #[inline]
    pub fn latitude(&self) -> f64 {
        self.position.y()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waypoint_creation() {
        let waypoint = Waypoint::new("ALPHA", -75.014648, -69.915214).named("ALPHA STATION");

        assert_eq!(waypoint.identifier, "ALPHA");
        assert_eq!(waypoint.longitude(), -75.014648);
        assert_eq!(waypoint.latitude(), -69.915214);
        assert_eq!(waypoint.name.as_deref(), Some("ALPHA STATION"));
        assert!(waypoint.comment.is_none());
    }

    #[test]
    fn test_ids_are_not_derived_from_content() {
        let a = Waypoint::new("ALPHA", 0.0, 0.0);
        let b = Waypoint::new("ALPHA", 0.0, 0.0);
        assert_ne!(a.id(), b.id());
        assert!(a.id() < b.id());
    }
}
