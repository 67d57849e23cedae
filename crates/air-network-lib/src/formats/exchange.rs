//! Exchange (GPX 1.1) encoder and decoder
//!
//! GPX has no fields for most waypoint metadata. Desktop GPS editors keep it in the point
//! description as five `|` separated parts:
//!
//! ```text
//! name | colocated with | last accessed at | last accessed by | comment
//! ```
//!
//! with `N/A` for anything absent. The decoder reads that convention leniently: a description
//! that does not split into exactly five parts is kept whole as the waypoint comment.
//!
//! The encoder writes the waypoint name, and nothing else, into the point comment. A point
//! without a description is therefore read back with its plain comment as the name.
//!
//! Decoding always builds a new [`Network`]; replacing an existing one is up to the caller
//! (see [`Network::import_gpx`]).

use super::{Encoded, Format, NetworkEncoder};
use crate::utils::{aggregate_file_stem, strip_bom};
use crate::{ConstraintWarning, FormatError, Network, Result, Route, Waypoint, schema};
use chrono::NaiveDate;
use gpx::{Gpx, GpxVersion};

/// Value of the GPX `creator` attribute
pub const CREATOR: &str = "air-network";

/// Placeholder for an absent part of a structured description
const NOT_AVAILABLE: &str = "N/A";

const STRUCTURED_PARTS: usize = 5;

/// A point description, read with the five-part convention where possible
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StructuredComment {
    Parsed {
        name: Option<String>,
        colocated_with: Option<String>,
        last_accessed_at: Option<String>,
        last_accessed_by: Option<String>,
        comment: Option<String>,
    },
    Unstructured {
        raw: String,
    },
}

impl StructuredComment {
    /// Parse a description, `None` when it carries no information
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "-" || raw == NOT_AVAILABLE {
            return None;
        }

        let parts: Vec<&str> = raw.split('|').map(str::trim).collect();
        if parts.len() != STRUCTURED_PARTS {
            return Some(StructuredComment::Unstructured {
                raw: raw.to_string(),
            });
        }

        let part = |index: usize| {
            let value = parts[index];
            (!value.is_empty() && value != NOT_AVAILABLE).then(|| value.to_string())
        };
        Some(StructuredComment::Parsed {
            name: part(0),
            colocated_with: part(1),
            last_accessed_at: part(2),
            last_accessed_by: part(3),
            comment: part(4),
        })
    }

    /// Copy the fields onto a waypoint, reporting anything that could not be kept as is
    fn apply(self, waypoint: &mut Waypoint) -> Vec<ConstraintWarning> {
        let mut warnings = Vec::new();
        match self {
            StructuredComment::Parsed {
                name,
                colocated_with,
                last_accessed_at,
                last_accessed_by,
                comment,
            } => {
                waypoint.name = name;
                waypoint.colocated_with = colocated_with;
                waypoint.last_accessed_by = last_accessed_by;
                waypoint.comment = comment;
                if let Some(value) = last_accessed_at {
                    match NaiveDate::parse_from_str(&value, "%Y-%m-%d") {
                        Ok(date) => waypoint.last_accessed_at = Some(date),
                        Err(_) => warnings.push(ConstraintWarning::InvalidAccessDate {
                            identifier: waypoint.identifier.clone(),
                            value,
                        }),
                    }
                }
            }
            StructuredComment::Unstructured { raw } => {
                waypoint.comment = Some(raw);
                warnings.push(ConstraintWarning::UnstructuredComment {
                    identifier: waypoint.identifier.clone(),
                });
            }
        }
        warnings
    }
}

/// GPX encoder, one file with every waypoint and route
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExchangeEncoder;

impl NetworkEncoder for ExchangeEncoder {
    fn format(&self) -> Format {
        Format::Exchange
    }

    fn encode(&self, network: &Network, date: NaiveDate) -> Vec<Encoded> {
        let file_name = format!("{}.gpx", aggregate_file_stem("NETWORK", date));
        let result = encode_network(network).and_then(|data| {
            schema::gpx_11()?.validate(&file_name, &data)?;
            Ok(data)
        });
        vec![Encoded::new(file_name, result)]
    }
}

/// Render every waypoint (sorted by identifier) and every exportable route as GPX
///
/// The output is not validated here, see [`ExchangeEncoder`].
pub fn encode_network(network: &Network) -> Result<Vec<u8>> {
    #[cfg(feature = "profiling")]
    profiling::scope!("exchange::encode");

    let mut gpx = Gpx::default();
    gpx.version = GpxVersion::Gpx11;
    gpx.creator = Some(CREATOR.to_string());

    gpx.waypoints = network
        .waypoints()
        .sorted_by_identifier()
        .into_iter()
        .map(route_point)
        .collect();

    for route in network.routes().iter() {
        if !route.is_exportable() {
            tracing::warn!("Route {} has fewer than two waypoints, left out of GPX", route.name);
            continue;
        }

        let mut rte = gpx::Route::default();
        rte.name = Some(route.name.clone());
        rte.points = network
            .resolve_route(route)?
            .into_iter()
            .map(|(_, waypoint)| route_point(waypoint))
            .collect();
        gpx.routes.push(rte);
    }

    let mut data = Vec::new();
    gpx::write(&gpx, &mut data)?;
    Ok(data)
}

/// A GPX point with the identifier as name and the waypoint name as comment
fn route_point(waypoint: &Waypoint) -> gpx::Waypoint {
    let mut point = gpx::Waypoint::new(waypoint.position);
    point.name = Some(waypoint.identifier.clone());
    point.comment = waypoint.name.clone();
    point
}

/// Build a network from a GPX document
///
/// Every `wpt` becomes a waypoint and every `rte` a route. Route points are matched to
/// waypoints by identifier; a route point with no matching waypoint adds one.
///
/// Fails with a [`FormatError`] if the document is not well-formed or not valid GPX 1.1.
/// Problems with the content are returned as warnings.
pub fn decode(source_name: &str, data: &[u8]) -> Result<(Network, Vec<ConstraintWarning>)> {
    #[cfg(feature = "profiling")]
    profiling::scope!("exchange::decode");

    let data = strip_bom(data);
    schema::gpx_11()?.validate(source_name, data)?;
    let gpx = gpx::read(data)?;

    let mut network = Network::new();
    let mut warnings = Vec::new();

    for (index, point) in gpx.waypoints.iter().enumerate() {
        let (waypoint, point_warnings) =
            decode_waypoint(source_name, point, || format!("wpt {}", index + 1))?;
        warnings.extend(point_warnings);
        warnings.extend(network.add_waypoint(waypoint));
    }

    for (route_index, rte) in gpx.routes.iter().enumerate() {
        let name = rte.name.clone().ok_or_else(|| {
            FormatError::new(source_name, format!("rte {} has no name", route_index + 1))
        })?;
        let mut route = Route::new(name);

        for (point_index, point) in rte.points.iter().enumerate() {
            let label = || format!("rte {:?} rtept {}", route.name, point_index + 1);
            let identifier = point
                .name
                .as_deref()
                .ok_or_else(|| FormatError::new(source_name, format!("{} has no name", label())))?;

            let waypoint_id = match network.waypoints().lookup(identifier) {
                Some(waypoint) => waypoint.id(),
                None => {
                    let (waypoint, point_warnings) = decode_waypoint(source_name, point, label)?;
                    tracing::debug!("Route {} adds waypoint {identifier}", route.name);
                    let id = waypoint.id();
                    warnings.extend(point_warnings);
                    warnings.extend(network.add_waypoint(waypoint));
                    id
                }
            };
            route.push_waypoint(waypoint_id);
        }

        warnings.extend(network.add_route(route));
    }

    tracing::debug!(
        "Decoded {} waypoint(s) and {} route(s) from {source_name} with {} warning(s)",
        network.waypoints().len(),
        network.routes().len(),
        warnings.len()
    );
    Ok((network, warnings))
}

fn decode_waypoint(
    source_name: &str,
    point: &gpx::Waypoint,
    label: impl Fn() -> String,
) -> Result<(Waypoint, Vec<ConstraintWarning>)> {
    let identifier = point
        .name
        .clone()
        .ok_or_else(|| FormatError::new(source_name, format!("{} has no name", label())))?;

    let position = point.point();
    let mut waypoint = Waypoint::new(identifier, position.x(), position.y());

    let described = point.description.as_deref().and_then(StructuredComment::parse);
    let warnings = match (described, point.comment.as_deref()) {
        (Some(structured), _) => structured.apply(&mut waypoint),
        (None, Some(comment)) => match StructuredComment::parse(comment) {
            Some(StructuredComment::Unstructured { raw }) => {
                waypoint.name = Some(raw);
                Vec::new()
            }
            Some(structured) => structured.apply(&mut waypoint),
            None => Vec::new(),
        },
        (None, None) => Vec::new(),
    };

    Ok((waypoint, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GPX_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1" creator="test">"#;

    fn gpx(body: &str) -> Vec<u8> {
        format!("{GPX_HEADER}{body}</gpx>").into_bytes()
    }

    #[test]
    fn test_parse_structured_comment() {
        let parsed = StructuredComment::parse("ALPHA STATION | N/A | 2023-01-15 | CONWAY | Fuel depot");
        assert_eq!(
            parsed,
            Some(StructuredComment::Parsed {
                name: Some("ALPHA STATION".to_string()),
                colocated_with: None,
                last_accessed_at: Some("2023-01-15".to_string()),
                last_accessed_by: Some("CONWAY".to_string()),
                comment: Some("Fuel depot".to_string()),
            })
        );
    }

    #[test]
    fn test_parse_unstructured_comment() {
        assert_eq!(
            StructuredComment::parse("Near the old hut | east side"),
            Some(StructuredComment::Unstructured {
                raw: "Near the old hut | east side".to_string()
            })
        );
        assert_eq!(StructuredComment::parse("  "), None);
        assert_eq!(StructuredComment::parse("-"), None);
    }

    #[test]
    fn test_decode_plain_point_comment_is_name() {
        let (network, warnings) = decode(
            "cmt.gpx",
            &gpx(r#"<wpt lat="-67.5" lon="-68.1"><name>ALPHA</name><cmt>ALPHA STATION</cmt></wpt>"#),
        )
        .unwrap();
        let alpha = network.waypoints().lookup("ALPHA").unwrap();
        assert_eq!(alpha.name.as_deref(), Some("ALPHA STATION"));
        assert!(alpha.comment.is_none());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_decode_waypoints_and_routes() {
        let data = gpx(
            r#"<wpt lat="-67.5" lon="-68.1"><name>ALPHA</name>
                <desc>ALPHA STATION | N/A | 2023-01-15 | CONWAY | N/A</desc></wpt>
            <wpt lat="-68.4" lon="-69.2"><name>BRAVO</name></wpt>
            <rte><name>01_ALPHA_TO_CHARLI</name>
                <rtept lat="-67.5" lon="-68.1"><name>ALPHA</name></rtept>
                <rtept lat="-68.4" lon="-69.2"><name>BRAVO</name></rtept>
                <rtept lat="-69.0" lon="-70.0"><name>CHARLI</name></rtept>
            </rte>"#,
        );

        let (network, warnings) = decode("test.gpx", &data).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(network.waypoints().len(), 3);

        let alpha = network.waypoints().lookup("ALPHA").unwrap();
        assert_eq!(alpha.name.as_deref(), Some("ALPHA STATION"));
        assert_eq!(alpha.last_accessed_at, NaiveDate::from_ymd_opt(2023, 1, 15));
        assert!(alpha.colocated_with.is_none());

        let charli = network.waypoints().lookup("CHARLI").unwrap();
        assert_eq!(charli.latitude(), -69.0);

        let route = network.routes().lookup("01_ALPHA_TO_CHARLI").unwrap();
        let identifiers: Vec<&str> = network
            .resolve_route(route)
            .unwrap()
            .iter()
            .map(|(_, w)| w.identifier.as_str())
            .collect();
        assert_eq!(identifiers, vec!["ALPHA", "BRAVO", "CHARLI"]);
    }

    #[test]
    fn test_decode_lenient_comment_and_bom() {
        let mut data = crate::utils::UTF8_BOM.to_vec();
        data.extend(gpx(
            r#"<wpt lat="-67.5" lon="-68.1"><name>ALPHA</name><desc>Just a note</desc></wpt>"#,
        ));

        let (network, warnings) = decode("bom.gpx", &data).unwrap();
        let alpha = network.waypoints().lookup("ALPHA").unwrap();
        assert_eq!(alpha.comment.as_deref(), Some("Just a note"));
        assert!(alpha.name.is_none());
        assert_eq!(
            warnings,
            vec![ConstraintWarning::UnstructuredComment {
                identifier: "ALPHA".to_string()
            }]
        );
    }

    #[test]
    fn test_decode_rejects_invalid_documents() {
        let err = decode("bad.gpx", b"<gpx version=\"1.1\"").unwrap_err();
        assert!(matches!(err, crate::NetworkError::Format(_)));

        // Latitude out of range
        let err = decode("range.gpx", &gpx(r#"<wpt lat="-91" lon="0"><name>A</name></wpt>"#)).unwrap_err();
        match err {
            crate::NetworkError::Format(format_error) => {
                assert_eq!(format_error.source_name, "range.gpx");
                assert!(format_error.diagnostics[0].contains("/gpx/wpt"));
            }
            other => panic!("expected a format error, got {other:?}"),
        }

        // Unnamed waypoint
        assert!(decode("unnamed.gpx", &gpx(r#"<wpt lat="0" lon="0"/>"#)).is_err());

        // Malformed time with a multibyte character
        let err = decode(
            "time.gpx",
            &gpx(r#"<wpt lat="0" lon="0"><time>€aaaaa</time><name>A</name></wpt>"#),
        )
        .unwrap_err();
        match err {
            crate::NetworkError::Format(format_error) => {
                assert!(format_error.diagnostics.iter().any(|d| d.contains("/time") && d.contains("DateTime")));
            }
            other => panic!("expected a format error, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_is_valid_and_decodes_back() {
        let mut network = Network::new();
        let mut bravo = Waypoint::new("BRAVO", -69.2, -68.4).named("BRAVO CAMP");
        bravo.colocated_with = Some("Old hut".to_string());
        let alpha = Waypoint::new("ALPHA", -68.1, -67.5);
        let (alpha_id, bravo_id) = (alpha.id(), bravo.id());
        network.add_waypoint(bravo);
        network.add_waypoint(alpha);
        let mut route = Route::new("01_BRAVO_TO_ALPHA");
        route.push_waypoint(bravo_id);
        route.push_waypoint(alpha_id);
        network.add_route(route);

        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let mut files = ExchangeEncoder.encode(&network, date);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "00_NETWORK_2024_03_07.gpx");
        let data = files.remove(0).result.unwrap();

        let text = String::from_utf8(data.clone()).unwrap();
        assert!(text.find("<name>ALPHA</name>").unwrap() < text.find("<name>BRAVO</name>").unwrap());
        assert!(text.contains("<cmt>BRAVO CAMP</cmt>"));
        // Only the name is carried, never the other metadata
        assert!(!text.contains("<desc>"));
        assert!(!text.contains("Old hut"));

        let (decoded, warnings) = decode("roundtrip.gpx", &data).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        let bravo = decoded.waypoints().lookup("BRAVO").unwrap();
        assert_eq!(bravo.name.as_deref(), Some("BRAVO CAMP"));
        assert!(bravo.colocated_with.is_none());
        let route = decoded.routes().lookup("01_BRAVO_TO_ALPHA").unwrap();
        assert_eq!(route.waypoints_count(), 2);
    }
}
