//! Import and export of the 12 waypoint / 3 route reference network

use air_network_lib::formats::{ExchangeEncoder, Format, NetworkEncoder, exchange};
use air_network_lib::utils::UTF8_BOM;
use air_network_lib::{ExportOptions, Network, export_network};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/test-network.gpx")
}

fn load() -> Network {
    let mut network = Network::new();
    let warnings = network.import_gpx_file(&fixture()).unwrap();
    assert!(warnings.is_empty(), "{warnings:?}");
    network
}

fn options() -> ExportOptions {
    ExportOptions::new(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap())
}

fn route_identifiers(network: &Network, name: &str) -> Vec<String> {
    let route = network.routes().lookup(name).unwrap();
    network
        .resolve_route(route)
        .unwrap()
        .into_iter()
        .map(|(_, waypoint)| waypoint.identifier.clone())
        .collect()
}

fn files_in(directory: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(directory)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    files.sort();
    files
}

#[test]
fn test_import_reference_network() {
    let network = load();
    assert_eq!(network.waypoints().len(), 12);
    assert_eq!(network.routes().len(), 3);

    let counts: Vec<usize> = ["01_ALPHA_TO_BRAVO", "02_ALPHA_TO_ALPHA", "03_BRAVO_TO_LIMA"]
        .iter()
        .map(|name| network.routes().lookup(name).unwrap().waypoints_count())
        .collect();
    assert_eq!(counts, vec![2, 9, 8]);

    // Only referenced by a route, added from the route point
    let lima = network.waypoints().lookup("LIMA").unwrap();
    assert!(lima.name.is_none());

    let bravo = network.waypoints().lookup("BRAVO").unwrap();
    assert_eq!(bravo.name.as_deref(), Some("BRAVO CAMP"));
    assert_eq!(bravo.colocated_with.as_deref(), Some("Fuel cache"));
    assert_eq!(bravo.last_accessed_at, NaiveDate::from_ymd_opt(2023, 1, 15));
    assert_eq!(bravo.last_accessed_by.as_deref(), Some("HALL"));
    assert_eq!(bravo.comment.as_deref(), Some("Marked with flags"));

    assert!(network.validate().is_empty());
}

#[test]
fn test_import_replaces_existing_content() {
    let mut network = Network::new();
    network.add_waypoint(air_network_lib::Waypoint::new("ZULU", 0.0, 0.0));

    network.import_gpx_file(&fixture()).unwrap();
    assert!(network.waypoints().lookup("ZULU").is_none());
    assert_eq!(network.waypoints().len(), 12);
}

#[test]
fn test_end_to_end_export() {
    let network = load();
    let output = tempfile::tempdir().unwrap();
    let report = export_network(&network, output.path(), &options());
    assert!(report.is_success(), "{:?}", report.failures);

    // CSV: every waypoint once, sorted by identifier
    let data = std::fs::read(output.path().join("CSV/00_WAYPOINTS_2024_03_07_DD.csv")).unwrap();
    assert!(data.starts_with(UTF8_BOM));
    let mut reader = csv::Reader::from_reader(&data[UTF8_BOM.len()..]);
    let identifiers: Vec<String> = reader
        .records()
        .map(|record| record.unwrap()[0].to_string())
        .collect();
    assert_eq!(
        identifiers,
        vec![
            "ALPHA", "BRAVO", "CHARLI", "DELTA", "ECHO", "FOXTRT", "GOLF", "HOTEL", "INDIA",
            "JULIET", "KILO", "LIMA"
        ]
    );

    // GPX: one file with everything
    assert_eq!(report.files(Format::Exchange).len(), 1);

    // FPL: the waypoints file plus one file per route
    let names: Vec<String> = files_in(&output.path().join("FPL"))
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "00_WAYPOINTS_2024_03_07.fpl",
            "01_ALPHA_TO_BRAVO.fpl",
            "02_ALPHA_TO_ALPHA.fpl",
            "03_BRAVO_TO_LIMA.fpl"
        ]
    );

    let plan = std::fs::read_to_string(output.path().join("FPL/03_BRAVO_TO_LIMA.fpl")).unwrap();
    assert!(plan.contains("<route-name>03 BRAVO TO LIMA</route-name>"));
    assert!(plan.contains("<flight-plan-index>3</flight-plan-index>"));
    assert_eq!(plan.matches("<route-point>").count(), 8);

    // ALPHA starts and ends the loop but is listed once
    let plan = std::fs::read_to_string(output.path().join("FPL/02_ALPHA_TO_ALPHA.fpl")).unwrap();
    assert_eq!(plan.matches("<route-point>").count(), 9);
    assert_eq!(plan.matches("<waypoint>").count(), 8);
}

#[test]
fn test_exchange_round_trip() {
    let network = load();
    let data = exchange::encode_network(&network).unwrap();
    let (decoded, _) = exchange::decode("round-trip.gpx", &data).unwrap();

    let identifiers = |network: &Network| -> Vec<String> {
        network
            .waypoints()
            .sorted_by_identifier()
            .into_iter()
            .map(|waypoint| waypoint.identifier.clone())
            .collect()
    };
    assert_eq!(identifiers(&decoded), identifiers(&network));

    for route in network.routes().iter() {
        assert_eq!(
            route_identifiers(&decoded, &route.name),
            route_identifiers(&network, &route.name)
        );
    }

    let delta = decoded.waypoints().lookup("DELTA").unwrap();
    assert_eq!(delta.name.as_deref(), Some("DELTA DEPOT"));
    assert!(delta.colocated_with.is_none());
}

#[test]
fn test_reimport_reproduces_exchange_file() {
    let network = load();
    let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
    let first = ExchangeEncoder.encode(&network, date).remove(0).result.unwrap();

    let mut reimported = Network::new();
    reimported.import_gpx("first.gpx", &first).unwrap();
    let second = ExchangeEncoder.encode(&reimported, date).remove(0).result.unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_export_is_idempotent() {
    let network = load();
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    assert!(export_network(&network, first.path(), &options()).is_success());
    assert!(export_network(&network, second.path(), &options()).is_success());

    for format in Format::ALL {
        let left = files_in(&first.path().join(format.directory_name()));
        let right = files_in(&second.path().join(format.directory_name()));
        assert_eq!(left.len(), right.len());
        for (left, right) in left.iter().zip(&right) {
            assert_eq!(left.file_name(), right.file_name());
            assert_eq!(
                std::fs::read(left).unwrap(),
                std::fs::read(right).unwrap(),
                "{} differs",
                left.display()
            );
        }
    }
}
