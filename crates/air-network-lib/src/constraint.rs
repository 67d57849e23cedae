//! Content-level rules that are detected but not enforced
//!
//! The model accepts data that breaks these rules (permissive source files rely on it) and
//! reports each violation as a [`ConstraintWarning`] instead of failing.

use crate::utils::is_upper_alphanumeric;
use crate::waypoint::{IDENTIFIER_MAX_LENGTH, NAME_MAX_LENGTH};
use crate::{EntityId, Route, Waypoint};

/// A violated content rule, reported alongside a successful result
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintWarning {
    #[error("Waypoint identifier {identifier:?} is used by more than one waypoint")]
    DuplicateIdentifier { identifier: String },

    #[error("Route name {name:?} is used by more than one route")]
    DuplicateRouteName { name: String },

    #[error("Waypoint identifier {identifier:?} is not 1-6 upper case alphanumeric characters")]
    IdentifierFormat { identifier: String },

    #[error("Waypoint {identifier:?} name {name:?} is not up to 17 upper case alphanumeric or space characters")]
    NameFormat { identifier: String, name: String },

    #[error("Route name {name:?} does not follow the NN_START_TO_END convention")]
    RouteNamePattern { name: String },

    #[error("Route {name:?} runs from {start:?} to {end:?}, which its name does not match")]
    RouteEndpointMismatch {
        name: String,
        start: String,
        end: String,
    },

    #[error("Route {name:?} has {count} waypoint(s), at least two are needed to export it")]
    RouteTooShort { name: String, count: usize },

    #[error("Waypoint {identifier:?} has only one of last accessed at / last accessed by")]
    LastAccessIncomplete { identifier: String },

    #[error("Waypoint {identifier:?} has an unreadable last accessed date {value:?}")]
    InvalidAccessDate { identifier: String, value: String },

    #[error("Waypoint {identifier:?} comment is not structured, kept as a plain comment")]
    UnstructuredComment { identifier: String },

    #[error("Route {route:?} uses sequence {sequence} more than once")]
    DuplicateSequence { route: String, sequence: u32 },

    #[error("Route {route:?} references waypoint {waypoint_id} which is not in the network")]
    ReferentialGap { route: String, waypoint_id: EntityId },
}

/// Split a conventional route name into its start and end identifiers
///
/// `01_ALPHA_TO_BRAVO` gives `("ALPHA", "BRAVO")`.
pub fn parse_route_name(name: &str) -> Option<(&str, &str)> {
    let (sequence, rest) = name.split_once('_')?;
    if sequence.len() != 2 || !sequence.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let (start, end) = rest.split_once("_TO_")?;
    let valid = |identifier: &str| !identifier.is_empty() && is_upper_alphanumeric(identifier);
    (valid(start) && valid(end)).then_some((start, end))
}

/// Rules that only need the waypoint itself
pub fn check_waypoint(waypoint: &Waypoint) -> Vec<ConstraintWarning> {
    let mut warnings = Vec::new();
    let identifier = &waypoint.identifier;

    if identifier.is_empty()
        || identifier.chars().count() > IDENTIFIER_MAX_LENGTH
        || !is_upper_alphanumeric(identifier)
    {
        warnings.push(ConstraintWarning::IdentifierFormat {
            identifier: identifier.clone(),
        });
    }

    if let Some(name) = &waypoint.name {
        let allowed = name
            .chars()
            .all(|c| c == ' ' || c.is_ascii_uppercase() || c.is_ascii_digit());
        if !allowed || name.chars().count() > NAME_MAX_LENGTH {
            warnings.push(ConstraintWarning::NameFormat {
                identifier: identifier.clone(),
                name: name.clone(),
            });
        }
    }

    if waypoint.last_accessed_at.is_some() != waypoint.last_accessed_by.is_some() {
        warnings.push(ConstraintWarning::LastAccessIncomplete {
            identifier: identifier.clone(),
        });
    }

    warnings
}

/// Rules on a route given the identifiers of its resolved first and last waypoints
pub fn check_route(route: &Route, endpoints: Option<(&str, &str)>) -> Vec<ConstraintWarning> {
    let mut warnings = Vec::new();

    if !route.is_exportable() {
        warnings.push(ConstraintWarning::RouteTooShort {
            name: route.name.clone(),
            count: route.waypoints_count(),
        });
    }

    let mut sequences: Vec<u32> = route.waypoints().iter().map(|rw| rw.sequence).collect();
    sequences.sort_unstable();
    let mut duplicates: Vec<u32> = sequences
        .windows(2)
        .filter(|pair| pair[0] == pair[1])
        .map(|pair| pair[0])
        .collect();
    duplicates.dedup();
    warnings.extend(duplicates.into_iter().map(|sequence| {
        ConstraintWarning::DuplicateSequence {
            route: route.name.clone(),
            sequence,
        }
    }));

    match parse_route_name(&route.name) {
        None => warnings.push(ConstraintWarning::RouteNamePattern {
            name: route.name.clone(),
        }),
        Some((start, end)) => {
            if let Some((first, last)) = endpoints
                && (first != start || last != end)
            {
                warnings.push(ConstraintWarning::RouteEndpointMismatch {
                    name: route.name.clone(),
                    start: first.to_string(),
                    end: last.to_string(),
                });
            }
        }
    }

    warnings
}
