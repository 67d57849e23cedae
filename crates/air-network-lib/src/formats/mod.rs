//! Output formats
//!
//! Each format encodes the same [`Network`] independently through [`NetworkEncoder`]:
//!
//! - [`tabular`]: CSV for spreadsheets and printing, no schema
//! - [`exchange`]: GPX 1.1 for GPS editors, validated against the public schema; also the
//!   only format that can be decoded
//! - [`flight_plan`]: Garmin FPL for aircraft GPS units, validated against the local schema
//!
//! Encoders are pure: the same network and date always give byte-identical output.

pub mod exchange;
pub mod flight_plan;
pub mod tabular;

use crate::{Network, Result};
use chrono::NaiveDate;

pub use exchange::ExchangeEncoder;
pub use flight_plan::FlightPlanEncoder;
pub use tabular::TabularEncoder;

/// The supported output formats
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Format {
    Tabular,
    Exchange,
    FlightPlan,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Tabular, Format::Exchange, Format::FlightPlan];

    /// Sub-directory of the output directory holding this format's files
    pub fn directory_name(self) -> &'static str {
        match self {
            Format::Tabular => "CSV",
            Format::Exchange => "GPX",
            Format::FlightPlan => "FPL",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Tabular => "csv",
            Format::Exchange => "gpx",
            Format::FlightPlan => "fpl",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.directory_name())
    }
}

/// One output file, or the reason it could not be produced
#[derive(Debug)]
pub struct Encoded {
    pub file_name: String,
    pub result: Result<Vec<u8>>,
}

impl Encoded {
    pub fn new(file_name: impl Into<String>, result: Result<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            result,
        }
    }
}

/// Encodes a network into the files of one format
///
/// A failure encoding or validating one file is reported in that file's [`Encoded`] and does
/// not stop the other files.
pub trait NetworkEncoder {
    fn format(&self) -> Format;

    /// Produce every file of this format, `date` is only used in aggregate file names
    fn encode(&self, network: &Network, date: NaiveDate) -> Vec<Encoded>;
}
