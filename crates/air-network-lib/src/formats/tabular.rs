//! Tabular (CSV) encoder
//!
//! Files start with a UTF-8 byte order mark so spreadsheet software picks the right encoding.
//! Every value is plain text and absent values are written as `-`. This format is not
//! validated against any schema.
//!
//! The default export writes only the all-waypoints files, per-route and combined route
//! files are available but switched off by policy.

use super::{Encoded, Format, NetworkEncoder};
use crate::utils::{UTF8_BOM, aggregate_file_stem, ddm_pair};
use crate::{Network, NetworkError, Result, Route, Waypoint};
use chrono::NaiveDate;

const MISSING: &str = "-";

/// Which coordinate notations to include as columns
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinateColumns {
    pub decimal_degrees: bool,
    pub degrees_decimal_minutes: bool,
}

impl CoordinateColumns {
    pub const DECIMAL_DEGREES: Self = Self {
        decimal_degrees: true,
        degrees_decimal_minutes: false,
    };
    pub const DEGREES_DECIMAL_MINUTES: Self = Self {
        decimal_degrees: false,
        degrees_decimal_minutes: true,
    };
    pub const BOTH: Self = Self {
        decimal_degrees: true,
        degrees_decimal_minutes: true,
    };

    fn headers(self) -> Vec<&'static str> {
        let mut headers = Vec::with_capacity(4);
        if self.decimal_degrees {
            headers.extend(["latitude_dd", "longitude_dd"]);
        }
        if self.degrees_decimal_minutes {
            headers.extend(["latitude_ddm", "longitude_ddm"]);
        }
        headers
    }

    fn values(self, waypoint: &Waypoint) -> Vec<String> {
        let mut values = Vec::with_capacity(4);
        if self.decimal_degrees {
            values.push(waypoint.latitude().to_string());
            values.push(waypoint.longitude().to_string());
        }
        if self.degrees_decimal_minutes {
            let (latitude, longitude) = ddm_pair(waypoint.latitude(), waypoint.longitude());
            values.push(latitude);
            values.push(longitude);
        }
        values
    }
}

/// CSV encoder, which files it writes is set per instance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TabularEncoder {
    /// `00_WAYPOINTS_{date}.csv` with degrees decimal minutes
    pub waypoints_ddm: bool,
    /// `00_WAYPOINTS_{date}_DD.csv` with decimal degrees
    pub waypoints_dd: bool,
    /// `{route name}.csv` for each route
    pub per_route: bool,
    /// `00_ROUTES_{date}.csv` with every route, one route name column
    pub combined_routes: bool,
}

impl Default for TabularEncoder {
    fn default() -> Self {
        Self {
            waypoints_ddm: true,
            waypoints_dd: true,
            per_route: false,
            combined_routes: false,
        }
    }
}

impl NetworkEncoder for TabularEncoder {
    fn format(&self) -> Format {
        Format::Tabular
    }

    fn encode(&self, network: &Network, date: NaiveDate) -> Vec<Encoded> {
        #[cfg(feature = "profiling")]
        profiling::scope!("tabular::encode");

        let mut files = Vec::new();
        let waypoints_stem = aggregate_file_stem("WAYPOINTS", date);
        let waypoints = network.waypoints().sorted_by_identifier();

        if self.waypoints_ddm {
            files.push(Encoded::new(
                format!("{waypoints_stem}.csv"),
                encode_waypoints(waypoints.iter().copied(), CoordinateColumns::DEGREES_DECIMAL_MINUTES),
            ));
        }
        if self.waypoints_dd {
            files.push(Encoded::new(
                format!("{waypoints_stem}_DD.csv"),
                encode_waypoints(waypoints.iter().copied(), CoordinateColumns::DECIMAL_DEGREES),
            ));
        }

        if self.per_route {
            for route in network.routes().iter() {
                let result = if route.is_exportable() {
                    encode_route(network, route, CoordinateColumns::BOTH)
                } else {
                    Err(NetworkError::EmptyRoute(route.name.clone()))
                };
                files.push(Encoded::new(format!("{}.csv", route.name), result));
            }
        }

        if self.combined_routes {
            let routes: Vec<&Route> = network.routes().iter().filter(|r| r.is_exportable()).collect();
            files.push(Encoded::new(
                format!("{}.csv", aggregate_file_stem("ROUTES", date)),
                encode_routes(network, &routes, CoordinateColumns::BOTH),
            ));
        }

        tracing::debug!("Encoded {} CSV file(s)", files.len());
        files
    }
}

/// One row per waypoint, in the order given
pub fn encode_waypoints<'a>(
    waypoints: impl IntoIterator<Item = &'a Waypoint>,
    columns: CoordinateColumns,
) -> Result<Vec<u8>> {
    let mut writer = bom_writer();

    let mut headers = vec!["identifier", "name", "colocated_with"];
    headers.extend(columns.headers());
    headers.extend(["last_accessed_at", "last_accessed_by", "comment"]);
    writer.write_record(&headers)?;

    for waypoint in waypoints {
        let mut row = vec![
            waypoint.identifier.clone(),
            text(&waypoint.name),
            text(&waypoint.colocated_with),
        ];
        row.extend(columns.values(waypoint));
        row.push(
            waypoint
                .last_accessed_at
                .map_or_else(|| MISSING.to_string(), |date| date.to_string()),
        );
        row.push(text(&waypoint.last_accessed_by));
        row.push(text(&waypoint.comment));
        writer.write_record(&row)?;
    }

    finish(writer)
}

/// One row per route entry, in sequence order
pub fn encode_route(network: &Network, route: &Route, columns: CoordinateColumns) -> Result<Vec<u8>> {
    let mut writer = bom_writer();
    writer.write_record(&route_headers(false, columns))?;
    write_route_rows(&mut writer, network, route, false, columns)?;
    finish(writer)
}

/// Every route in one file, each row starting with the route name
pub fn encode_routes(network: &Network, routes: &[&Route], columns: CoordinateColumns) -> Result<Vec<u8>> {
    let mut writer = bom_writer();
    writer.write_record(&route_headers(true, columns))?;
    for route in routes {
        write_route_rows(&mut writer, network, route, true, columns)?;
    }
    finish(writer)
}

fn route_headers(route_column: bool, columns: CoordinateColumns) -> Vec<&'static str> {
    let mut headers = Vec::new();
    if route_column {
        headers.push("route_name");
    }
    headers.extend(["sequence", "identifier", "name", "colocated_with"]);
    headers.extend(columns.headers());
    headers
}

fn write_route_rows(
    writer: &mut csv::Writer<Vec<u8>>,
    network: &Network,
    route: &Route,
    route_column: bool,
    columns: CoordinateColumns,
) -> Result<()> {
    for (route_waypoint, waypoint) in network.resolve_route(route)? {
        let mut row = Vec::new();
        if route_column {
            row.push(route.name.clone());
        }
        row.extend([
            route_waypoint.sequence.to_string(),
            waypoint.identifier.clone(),
            text(&waypoint.name),
            text(&waypoint.colocated_with),
        ]);
        row.extend(columns.values(waypoint));
        writer.write_record(&row)?;
    }
    Ok(())
}

#[inline]
fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| MISSING.to_string())
}

fn bom_writer() -> csv::Writer<Vec<u8>> {
    csv::Writer::from_writer(UTF8_BOM.to_vec())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| NetworkError::Io(e.into_error()))
}
