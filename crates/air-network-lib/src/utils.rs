//! Utility functions for coordinate notation, character filtering and file naming

use chrono::NaiveDate;

/// UTF-8 byte order mark, written at the start of tabular files for spreadsheet software
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Placeholder date token in aggregate file names
const DATE_TOKEN: &str = "{{date}}";

/// Coordinate axis, deciding the hemisphere letters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    #[inline]
    fn hemisphere(self, negative: bool) -> char {
        match (self, negative) {
            (Axis::Latitude, false) => 'N',
            (Axis::Latitude, true) => 'S',
            (Axis::Longitude, false) => 'E',
            (Axis::Longitude, true) => 'W',
        }
    }
}

/// A coordinate in degrees decimal minutes
///
/// Degrees and minutes are always positive, the sign lives only in `hemisphere`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DegreesDecimalMinutes {
    pub degrees: u32,
    pub minutes: f64,
    pub hemisphere: char,
}

impl DegreesDecimalMinutes {
    /// Convert a decimal degree value on an axis
    pub fn from_decimal_degrees(value: f64, axis: Axis) -> Self {
        let absolute = value.abs();
        let degrees = absolute.trunc();
        Self {
            degrees: degrees as u32,
            minutes: (absolute - degrees) * 60.0,
            hemisphere: axis.hemisphere(value.is_sign_negative() && value != 0.0),
        }
    }
}

impl std::fmt::Display for DegreesDecimalMinutes {
    /// e.g. `69° 54.912840' S`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}° {:.6}' {}", self.degrees, self.minutes, self.hemisphere)
    }
}

/// Format a (latitude, longitude) pair as DDM strings
#[inline]
pub fn ddm_pair(latitude: f64, longitude: f64) -> (String, String) {
    (
        DegreesDecimalMinutes::from_decimal_degrees(latitude, Axis::Latitude).to_string(),
        DegreesDecimalMinutes::from_decimal_degrees(longitude, Axis::Longitude).to_string(),
    )
}

/// Whether every character is an ASCII upper case letter or digit
#[inline]
pub fn is_upper_alphanumeric(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Upper case a value and keep only characters accepted by `keep`, up to `max_chars`
pub fn filter_upper(value: &str, keep: impl Fn(char) -> bool, max_chars: usize) -> String {
    value
        .chars()
        .flat_map(char::to_uppercase)
        .filter(|c| keep(*c))
        .take(max_chars)
        .collect()
}

/// Substitute the date into a `{{date}}` template using the `YYYY_MM_DD` form
pub fn file_name_with_date(template: &str, date: NaiveDate) -> String {
    template.replace(DATE_TOKEN, &date.format("%Y_%m_%d").to_string())
}

/// Name of an aggregate file, `00_{KIND}_{YYYY_MM_DD}` (no extension)
#[inline]
pub fn aggregate_file_stem(kind: &str, date: NaiveDate) -> String {
    file_name_with_date(&format!("00_{kind}_{DATE_TOKEN}"), date)
}

/// Drop a leading UTF-8 byte order mark if present
#[inline]
pub fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ddm_latitude() {
        let ddm = DegreesDecimalMinutes::from_decimal_degrees(-69.915214, Axis::Latitude);
        assert_eq!(ddm.degrees, 69);
        assert!((ddm.minutes - 54.91284).abs() < 1e-6);
        assert_eq!(ddm.hemisphere, 'S');
        assert_eq!(ddm.to_string(), "69° 54.912840' S");
    }

    #[test]
    fn test_ddm_longitude_sign_applied_once() {
        let text = DegreesDecimalMinutes::from_decimal_degrees(-75.014648, Axis::Longitude).to_string();
        assert_eq!(text, "75° 0.878880' W");
        assert!(!text.contains('-'));
        assert_eq!(text.matches('W').count(), 1);
    }

    #[test]
    fn test_ddm_positive_and_zero() {
        let (lat, lon) = ddm_pair(0.0, 12.5);
        assert_eq!(lat, "0° 0.000000' N");
        assert_eq!(lon, "12° 30.000000' E");
    }

    #[test]
    fn test_filter_upper() {
        assert_eq!(filter_upper("Rothera_Point 2", |c| c.is_ascii_alphanumeric(), 12), "ROTHERAPOINT");
        assert_eq!(filter_upper("abc", |c| c.is_ascii_alphanumeric(), 2), "AB");
    }

    #[test]
    fn test_is_upper_alphanumeric() {
        assert!(is_upper_alphanumeric("ALPHA1"));
        assert!(!is_upper_alphanumeric("Alpha"));
        assert!(!is_upper_alphanumeric("AL PHA"));
    }

    #[test]
    fn test_file_names() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(aggregate_file_stem("WAYPOINTS", date), "00_WAYPOINTS_2024_03_07");
        assert_eq!(file_name_with_date("X_{{date}}.csv", date), "X_2024_03_07.csv");
    }

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom(b"\xEF\xBB\xBF<gpx/>"), b"<gpx/>");
        assert_eq!(strip_bom(b"<gpx/>"), b"<gpx/>");
    }
}
