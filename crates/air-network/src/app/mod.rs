//! Application module
//!
//! Each command loads what it needs from the dataset, runs one library operation and saves
//! the result back when the network changed. Import needs nothing, it overwrites:
//!
//! - `init`: create an empty dataset
//! - `import`: replace the dataset content with a GPX file (there is no merge)
//! - `export`: write CSV, GPX and FPL files for the current network
//! - `inspect`: print a summary and every rule violation

pub mod settings;
pub mod storage;

pub use settings::{Command, Settings};

use air_network_lib::{ExportOptions, Network, NetworkError, NetworkStore, export_network};
use settings::export_policy;
use storage::{FileStore, StorageError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Export finished with {0} failed file(s)")]
    Export(usize),
}

pub type AppResult<T> = Result<T, AppError>;

/// Install the `tracing` subscriber, filtered by `RUST_LOG` (default `info`)
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_filter(filter);
    // A subscriber may already be installed, e.g. by a test harness
    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}

/// Run the selected command
pub fn run(settings: &Settings) -> AppResult<()> {
    let store = FileStore::new(&settings.dataset);

    match &settings.command {
        Command::Init { force } => store.init(*force)?,
        Command::Import { input } => import(&store, input)?,
        Command::Export {
            output,
            date,
            csv_per_route,
            csv_combined_routes,
            fpl_without_waypoint_table,
        } => {
            let network = store.load()?;
            let options = ExportOptions {
                date: date.unwrap_or_else(|| chrono::Utc::now().date_naive()),
                policy: export_policy(*csv_per_route, *csv_combined_routes, *fpl_without_waypoint_table),
            };
            let report = export_network(&network, output, &options);
            for failure in &report.failures {
                tracing::error!("{}/{}: {}", failure.format, failure.file_name, failure.error);
            }
            if !report.is_success() {
                return Err(AppError::Export(report.failures.len()));
            }
        }
        Command::Inspect => inspect(&store.load()?),
    }

    Ok(())
}

fn import(store: &FileStore, input: &std::path::Path) -> AppResult<()> {
    let mut network = Network::new();
    let warnings = network.import_gpx_file(input)?;
    store.save(&network)?;
    tracing::info!(
        "Dataset {} now holds {} waypoint(s) and {} route(s), {} warning(s)",
        store.path().display(),
        network.waypoints().len(),
        network.routes().len(),
        warnings.len()
    );
    Ok(())
}

fn inspect(network: &Network) {
    println!("Waypoints: {}", network.waypoints().len());
    println!("Routes: {}", network.routes().len());
    for route in network.routes().iter() {
        println!("  {} ({} waypoints)", route.name, route.waypoints_count());
    }

    let warnings = network.validate();
    if warnings.is_empty() {
        println!("No rule violations");
    } else {
        println!("Rule violations: {}", warnings.len());
        for warning in warnings {
            println!("  {warning}");
        }
    }
}
