//! Export pipeline
//!
//! Writes a network into an output directory with one sub-directory per format:
//!
//! ```text
//! output/
//! ├── CSV/  00_WAYPOINTS_{date}.csv, 00_WAYPOINTS_{date}_DD.csv
//! ├── GPX/  00_NETWORK_{date}.gpx
//! └── FPL/  00_WAYPOINTS_{date}.fpl, {route name}.fpl ...
//! ```
//!
//! Formats and files are independent: a file that fails to encode or validate is recorded in
//! the [`ExportReport`] and everything else is still written. Files are written to a temporary
//! name in the target directory and renamed into place, so a failed write never leaves a
//! validly named partial file.
//!
//! File names are taken from route names, so each one must be a single path component and
//! unique within its format directory. Names that fail either check are reported as failures.

use crate::formats::{
    Encoded, ExchangeEncoder, FlightPlanEncoder, Format, NetworkEncoder, TabularEncoder,
};
use crate::{Network, NetworkError, Result};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Product policy on which files are produced
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportPolicy {
    /// All waypoints CSV in degrees decimal minutes
    pub csv_ddm: bool,
    /// All waypoints CSV in decimal degrees
    pub csv_dd: bool,
    pub csv_per_route: bool,
    pub csv_combined_routes: bool,
    /// Embed the used waypoints in each per-route flight plan
    pub fpl_route_waypoint_table: bool,
}

impl Default for ExportPolicy {
    fn default() -> Self {
        Self {
            csv_ddm: true,
            csv_dd: true,
            csv_per_route: false,
            csv_combined_routes: false,
            fpl_route_waypoint_table: true,
        }
    }
}

impl ExportPolicy {
    /// One encoder per format, configured by this policy
    pub fn encoders(&self) -> Vec<Box<dyn NetworkEncoder>> {
        vec![
            Box::new(TabularEncoder {
                waypoints_ddm: self.csv_ddm,
                waypoints_dd: self.csv_dd,
                per_route: self.csv_per_route,
                combined_routes: self.csv_combined_routes,
            }),
            Box::new(ExchangeEncoder),
            Box::new(FlightPlanEncoder {
                route_waypoint_table: self.fpl_route_waypoint_table,
            }),
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    /// Used in aggregate file names only
    pub date: NaiveDate,
    pub policy: ExportPolicy,
}

impl ExportOptions {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            policy: ExportPolicy::default(),
        }
    }
}

/// A file that was not written
#[derive(Debug)]
pub struct ExportFailure {
    pub format: Format,
    pub file_name: String,
    pub error: NetworkError,
}

/// What an export wrote and what it could not
#[derive(Debug, Default)]
pub struct ExportReport {
    pub written: BTreeMap<Format, Vec<PathBuf>>,
    pub failures: Vec<ExportFailure>,
}

impl ExportReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Paths written for one format
    pub fn files(&self, format: Format) -> &[PathBuf] {
        self.written.get(&format).map_or(&[], Vec::as_slice)
    }

    pub fn written_count(&self) -> usize {
        self.written.values().map(Vec::len).sum()
    }
}

/// Encode the network in every format and write the files under `output_dir`
///
/// Never fails as a whole, see [`ExportReport::failures`].
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn export_network(network: &Network, output_dir: &Path, options: &ExportOptions) -> ExportReport {
    let mut report = ExportReport::default();

    for encoder in options.policy.encoders() {
        let format = encoder.format();
        let directory = output_dir.join(format.directory_name());

        if let Err(error) = std::fs::create_dir_all(&directory) {
            tracing::error!("Cannot create {}: {error}", directory.display());
            report.failures.push(ExportFailure {
                format,
                file_name: format.directory_name().to_string(),
                error: error.into(),
            });
            continue;
        }

        let mut seen = HashSet::new();
        for Encoded { file_name, result } in encoder.encode(network, options.date) {
            let result = if !is_plain_file_name(&file_name) {
                Err(NetworkError::InvalidFileName(file_name.clone()))
            } else if !seen.insert(file_name.clone()) {
                Err(NetworkError::DuplicateFileName(file_name.clone()))
            } else {
                result
            };
            match result.and_then(|data| write_atomic(&directory, &file_name, &data)) {
                Ok(path) => {
                    tracing::debug!("Wrote {}", path.display());
                    report.written.entry(format).or_default().push(path);
                }
                Err(error) => {
                    tracing::warn!("Skipped {format}/{file_name}: {error}");
                    report.failures.push(ExportFailure {
                        format,
                        file_name,
                        error,
                    });
                }
            }
        }
    }

    tracing::info!(
        "Exported {} file(s) to {} with {} failure(s)",
        report.written_count(),
        output_dir.display(),
        report.failures.len()
    );
    report
}

/// Write `data` to `directory/file_name` through a temporary file in the same directory
pub fn write_atomic(directory: &Path, file_name: &str, data: &[u8]) -> Result<PathBuf> {
    if !is_plain_file_name(file_name) {
        return Err(NetworkError::InvalidFileName(file_name.to_string()));
    }
    let path = directory.join(file_name);
    let mut file = tempfile::NamedTempFile::new_in(directory)?;
    file.write_all(data)?;
    file.as_file().sync_all()?;
    file.persist(&path).map_err(|e| NetworkError::Io(e.error))?;
    Ok(path)
}

/// A single normal path component, with no separator of any platform
fn is_plain_file_name(file_name: &str) -> bool {
    let mut components = Path::new(file_name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !file_name.contains(['/', '\\'])
}
