//! Sortable unique identifiers for network entities
//!
//! Identifiers are ULIDs: a millisecond timestamp followed by random bits, rendered as
//! 26 Crockford base32 characters. A process-wide monotonic generator keeps identifiers
//! generated in sequence strictly increasing, even within the same millisecond.

use std::fmt;
use std::str::FromStr;
use std::sync::{LazyLock, Mutex};
use ulid::{Generator, Ulid};

static GENERATOR: LazyLock<Mutex<Generator>> = LazyLock::new(|| Mutex::new(Generator::new()));

/// Opaque identifier of a waypoint or route
///
/// Assigned at creation and never derived from content. Ordering follows creation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EntityId(Ulid);

impl EntityId {
    /// Milliseconds since the Unix epoch encoded in the identifier
    #[inline]
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// Generate a new identifier using the global monotonic generator.
pub fn generate_id() -> EntityId {
    // Generator state is always a valid previous ULID, even after a panic elsewhere
    let mut generator = GENERATOR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    match generator.generate() {
        Ok(ulid) => EntityId(ulid),
        Err(err) => {
            // 2^80 identifiers within one millisecond
            tracing::warn!("Monotonic identifier generator overflowed ({err}), using a random ULID");
            EntityId(Ulid::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_generation() {
        let ids: Vec<EntityId> = (0..1000).map(|_| generate_id()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_string_form_sorts_like_id() {
        let a = generate_id();
        let b = generate_id();
        assert!(a.to_string() < b.to_string());
        assert_eq!(a.to_string().len(), 26);
    }

    #[test]
    fn test_parse_roundtrip() {
        let id = generate_id();
        let parsed: EntityId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-ulid".parse::<EntityId>().is_err());
    }
}
