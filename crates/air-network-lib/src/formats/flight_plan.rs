//! Flight plan (Garmin FPL) encoder
//!
//! The most constrained output. Identifiers, comments and route names are reduced to the
//! characters and lengths the devices accept, and only the waypoint name survives as a
//! comment: colocation, access details and free text comments have no place in this format.
//!
//! Every file is validated against [`schema::flight_plan`], the locally modified vendor
//! schema, before it is handed back.

use super::{Encoded, Format, NetworkEncoder};
use crate::schema::{self, XSI_NAMESPACE};
use crate::utils::{aggregate_file_stem, filter_upper};
use crate::waypoint::NAME_MAX_LENGTH;
use crate::{EntityId, Network, NetworkError, Result, Route, Waypoint};
use chrono::NaiveDate;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::collections::HashSet;

pub const NAMESPACE: &str = "http://www8.garmin.com/xmlschemas/FlightPlan/v1";
const SCHEMA_LOCATION: &str =
    "http://www8.garmin.com/xmlschemas/FlightPlan/v1 http://www8.garmin.com/xmlschemas/FlightPlanv1.xsd";

pub const IDENTIFIER_MAX_CHARS: usize = 12;
pub const ROUTE_NAME_MAX_CHARS: usize = 25;
pub const COMMENT_MAX_CHARS: usize = NAME_MAX_LENGTH;

const WAYPOINT_TYPE: &str = "USER WAYPOINT";
const COUNTRY_CODE: &str = "__";

// Schema bounds are exclusive
const LATITUDE_INSIDE: f64 = 89.999999;
const LONGITUDE_INSIDE: f64 = 179.999999;

/// FPL encoder, one file per route plus one with every waypoint
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlightPlanEncoder {
    /// Embed the waypoints a route uses in its own file
    pub route_waypoint_table: bool,
}

impl Default for FlightPlanEncoder {
    fn default() -> Self {
        Self {
            route_waypoint_table: true,
        }
    }
}

impl NetworkEncoder for FlightPlanEncoder {
    fn format(&self) -> Format {
        Format::FlightPlan
    }

    fn encode(&self, network: &Network, date: NaiveDate) -> Vec<Encoded> {
        #[cfg(feature = "profiling")]
        profiling::scope!("flight_plan::encode");

        let mut files = Vec::with_capacity(network.routes().len() + 1);

        let file_name = format!("{}.fpl", aggregate_file_stem("WAYPOINTS", date));
        let result = encode_waypoints(network.waypoints().sorted_by_identifier())
            .and_then(|data| validated(&file_name, data));
        files.push(Encoded::new(file_name, result));

        for (position, route) in network.routes().iter().enumerate() {
            let file_name = format!("{}.fpl", route.name);
            let result = if route.is_exportable() {
                encode_route(network, route, position + 1, self.route_waypoint_table)
                    .and_then(|data| validated(&file_name, data))
            } else {
                Err(NetworkError::EmptyRoute(route.name.clone()))
            };
            files.push(Encoded::new(file_name, result));
        }

        tracing::debug!("Encoded {} FPL file(s)", files.len());
        files
    }
}

fn validated(file_name: &str, data: Vec<u8>) -> Result<Vec<u8>> {
    schema::flight_plan()?.validate(file_name, &data)?;
    Ok(data)
}

/// A waypoint table with the given waypoints, in the order given, and no route
pub fn encode_waypoints<'a>(waypoints: impl IntoIterator<Item = &'a Waypoint>) -> Result<Vec<u8>> {
    let waypoints: Vec<&Waypoint> = waypoints.into_iter().collect();
    write_plan(&waypoints, None)
}

/// A single route as a flight plan
///
/// `flight_plan_index` is the route's 1-based position, devices use it to tell plans apart.
/// With `waypoint_table` the file also lists each waypoint the route passes through, once,
/// in order of first appearance.
pub fn encode_route(
    network: &Network,
    route: &Route,
    flight_plan_index: usize,
    waypoint_table: bool,
) -> Result<Vec<u8>> {
    let points: Vec<&Waypoint> = network
        .resolve_route(route)?
        .into_iter()
        .map(|(_, waypoint)| waypoint)
        .collect();

    let table = if waypoint_table {
        let mut seen: HashSet<EntityId> = HashSet::new();
        points
            .iter()
            .copied()
            .filter(|waypoint| seen.insert(waypoint.id()))
            .collect()
    } else {
        Vec::new()
    };

    let plan = RoutePlan {
        name: route_name(&route.name),
        index: flight_plan_index,
        points,
    };
    write_plan(&table, Some(&plan))
}

/// Route name as written inside a flight plan, `01_ALPHA_TO_BRAVO` becomes `01 ALPHA TO BRAVO`
pub fn route_name(name: &str) -> String {
    filter_upper(
        &name.replace('_', " "),
        |c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == ' ' || c == '/',
        ROUTE_NAME_MAX_CHARS,
    )
}

pub fn identifier(identifier: &str) -> String {
    filter_upper(
        identifier,
        |c| c.is_ascii_uppercase() || c.is_ascii_digit(),
        IDENTIFIER_MAX_CHARS,
    )
}

/// Waypoint comment, the name only, empty when there is none
pub fn comment(name: Option<&str>) -> String {
    name.map(|name| {
        filter_upper(
            name,
            |c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == ' ',
            COMMENT_MAX_CHARS,
        )
    })
    .unwrap_or_default()
}

fn coordinate(value: f64, inside: f64) -> String {
    let rounded = (value * 1e7).round() / 1e7;
    if rounded >= inside.ceil() {
        inside.to_string()
    } else if rounded <= -inside.ceil() {
        (-inside).to_string()
    } else {
        rounded.to_string()
    }
}

struct RoutePlan<'a> {
    name: String,
    index: usize,
    points: Vec<&'a Waypoint>,
}

fn write_plan(table: &[&Waypoint], route: Option<&RoutePlan<'_>>) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("flight-plan").with_attributes([
        ("xmlns", NAMESPACE),
        ("xmlns:xsi", XSI_NAMESPACE),
        ("xsi:schemaLocation", SCHEMA_LOCATION),
    ])))?;

    // An empty table is left out, the schema requires at least one waypoint in it
    if !table.is_empty() {
        start(&mut writer, "waypoint-table")?;
        for waypoint in table {
            start(&mut writer, "waypoint")?;
            text_element(&mut writer, "identifier", &identifier(&waypoint.identifier))?;
            text_element(&mut writer, "type", WAYPOINT_TYPE)?;
            text_element(&mut writer, "country-code", COUNTRY_CODE)?;
            text_element(&mut writer, "lat", &coordinate(waypoint.latitude(), LATITUDE_INSIDE))?;
            text_element(&mut writer, "lon", &coordinate(waypoint.longitude(), LONGITUDE_INSIDE))?;
            text_element(&mut writer, "comment", &comment(waypoint.name.as_deref()))?;
            end(&mut writer, "waypoint")?;
        }
        end(&mut writer, "waypoint-table")?;
    }

    if let Some(route) = route {
        start(&mut writer, "route")?;
        text_element(&mut writer, "route-name", &route.name)?;
        text_element(&mut writer, "flight-plan-index", &route.index.to_string())?;
        for waypoint in &route.points {
            start(&mut writer, "route-point")?;
            text_element(&mut writer, "waypoint-identifier", &identifier(&waypoint.identifier))?;
            text_element(&mut writer, "waypoint-type", WAYPOINT_TYPE)?;
            text_element(&mut writer, "waypoint-country-code", COUNTRY_CODE)?;
            end(&mut writer, "route-point")?;
        }
        end(&mut writer, "route")?;
    }

    end(&mut writer, "flight-plan")?;
    Ok(writer.into_inner())
}

#[inline]
fn start(writer: &mut Writer<Vec<u8>>, name: &str) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))
}

#[inline]
fn end(writer: &mut Writer<Vec<u8>>, name: &str) -> quick_xml::Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name)))
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> quick_xml::Result<()> {
    if value.is_empty() {
        return writer.write_event(Event::Empty(BytesStart::new(name)));
    }
    start(writer, name)?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    end(writer, name)
}
