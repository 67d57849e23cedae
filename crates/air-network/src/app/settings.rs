use air_network_lib::ExportPolicy;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Air Network - manage a waypoint and route network and export it for aircraft GPS units
pub struct Settings {
    /// JSON dataset holding the network
    #[clap(
        short,
        long,
        global = true,
        env = "AIRNET_DATASET_PATH",
        value_name = "FILE",
        default_value = "air-network.json"
    )]
    pub dataset: PathBuf,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create an empty dataset
    Init {
        /// Overwrite an existing dataset
        #[clap(long, default_value = "false")]
        force: bool,
    },

    /// Replace the dataset content with the waypoints and routes of a GPX file
    Import {
        /// GPX 1.1 file to import
        #[clap(short, long, env = "AIRNET_INPUT_PATH", value_name = "FILE")]
        input: PathBuf,
    },

    /// Write the network as CSV, GPX and FPL files
    Export {
        /// Directory receiving the CSV, GPX and FPL sub-directories
        #[clap(short, long, env = "AIRNET_OUTPUT_PATH", value_name = "DIR")]
        output: PathBuf,

        /// Date used in aggregate file names (YYYY-MM-DD, defaults to today in UTC)
        #[clap(long)]
        date: Option<NaiveDate>,

        /// Also write one CSV file per route
        #[clap(long, default_value = "false")]
        csv_per_route: bool,

        /// Also write one CSV file with every route
        #[clap(long, default_value = "false")]
        csv_combined_routes: bool,

        /// Leave the waypoint table out of per-route flight plans
        #[clap(long, default_value = "false")]
        fpl_without_waypoint_table: bool,
    },

    /// Summarise the dataset and list rule violations
    Inspect,
}

impl Settings {
    /// Parse the command line, exiting with usage on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }
}

/// The export policy selected by the `export` flags
pub fn export_policy(csv_per_route: bool, csv_combined_routes: bool, fpl_without_waypoint_table: bool) -> ExportPolicy {
    ExportPolicy {
        csv_per_route,
        csv_combined_routes,
        fpl_route_waypoint_table: !fpl_without_waypoint_table,
        ..ExportPolicy::default()
    }
}
