//! XML Schema validation
//!
//! Encoded XML is only considered exported once it validates against its format's schema.
//! This module interprets the subset of XML Schema 1.0 used by the bundled schemas:
//!
//! - global elements and named or inline complex/simple types
//! - `sequence` content of `element` and `any` particles with `minOccurs` / `maxOccurs`
//! - attributes with `use="required"` and `fixed` values, plus `anyAttribute`
//! - simple type restriction by `pattern`, `enumeration`, numeric bounds and lengths
//!
//! Constructs outside the subset are refused when a schema is loaded. Patterns that are not
//! valid schema regular expressions are skipped and listed in [`Schema::warnings`], so a
//! published schema with broken patterns can still be loaded and compared against.
//!
//! Validation reports every problem found, each prefixed with the path of the element it
//! concerns.
//!
//! # Example
//!
//! ```
//! use air_network_lib::schema;
//!
//! let schema = schema::gpx_11()?;
//! let gpx = br#"<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1" creator="test"/>"#;
//! assert!(schema.validate("example.gpx", gpx).is_ok());
//! # Ok::<(), air_network_lib::SchemaError>(())
//! ```

mod document;
mod pattern;
mod validate;
mod xsd;

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Namespace of XML Schema definitions
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Namespace of instance attributes such as `xsi:schemaLocation`
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

static GPX_11: LazyLock<Result<Schema, SchemaError>> = LazyLock::new(|| {
    Schema::parse("gpx-1.1.xsd", include_str!("../../schemas/gpx/gpx-1.1.xsd"))
});

static FLIGHT_PLAN_LOCAL: LazyLock<Result<Schema, SchemaError>> = LazyLock::new(|| {
    Schema::parse(
        "FlightPlanv1-local.xsd",
        include_str!("../../schemas/garmin/FlightPlanv1-local.xsd"),
    )
});

static FLIGHT_PLAN_VENDOR: LazyLock<Result<Schema, SchemaError>> = LazyLock::new(|| {
    Schema::parse(
        "FlightPlanv1.xsd",
        include_str!("../../schemas/garmin/FlightPlanv1.xsd"),
    )
});

/// The public GPX 1.1 schema
pub fn gpx_11() -> Result<&'static Schema, SchemaError> {
    GPX_11.as_ref().map_err(Clone::clone)
}

/// The flight plan schema used to validate exported flight plans
///
/// A modified copy of the vendor schema: broken pattern escapes fixed, the waypoint table
/// made optional and `_` allowed in country codes.
pub fn flight_plan() -> Result<&'static Schema, SchemaError> {
    FLIGHT_PLAN_LOCAL.as_ref().map_err(Clone::clone)
}

/// The flight plan schema exactly as published by the vendor
pub fn flight_plan_vendor() -> Result<&'static Schema, SchemaError> {
    FLIGHT_PLAN_VENDOR.as_ref().map_err(Clone::clone)
}

/// A schema that could not be loaded
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("Schema {schema} is not well-formed XML: {message}")]
    Malformed { schema: String, message: String },

    #[error("Schema {schema} uses unsupported construct <{construct}>")]
    Unsupported { schema: String, construct: String },

    #[error("Schema {schema} references unknown type {type_name:?}")]
    UnknownType { schema: String, type_name: String },

    #[error("Schema {schema} is invalid: {message}")]
    Invalid { schema: String, message: String },
}

/// A decoded or encoded file that is not structurally valid
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{source_name} is not valid: {}", .diagnostics.join("; "))]
pub struct FormatError {
    /// File name or other label of the offending document
    pub source_name: String,
    /// Every problem found, one per entry
    pub diagnostics: Vec<String>,
}

impl FormatError {
    pub fn new(source_name: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            diagnostics: vec![diagnostic.into()],
        }
    }
}

/// Built-in simple types understood by the validator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Builtin {
    AnyType,
    String,
    NormalizedString,
    Token,
    Decimal,
    Integer,
    NonNegativeInteger,
    PositiveInteger,
    Double,
    Float,
    Boolean,
    DateTime,
    Date,
    GYear,
    AnyUri,
}

impl Builtin {
    fn from_local_name(name: &str) -> Option<Self> {
        Some(match name {
            "anyType" | "anySimpleType" => Builtin::AnyType,
            "string" => Builtin::String,
            "normalizedString" => Builtin::NormalizedString,
            "token" => Builtin::Token,
            "decimal" => Builtin::Decimal,
            "integer" | "int" | "long" => Builtin::Integer,
            "nonNegativeInteger" => Builtin::NonNegativeInteger,
            "positiveInteger" => Builtin::PositiveInteger,
            "double" => Builtin::Double,
            "float" => Builtin::Float,
            "boolean" => Builtin::Boolean,
            "dateTime" => Builtin::DateTime,
            "date" => Builtin::Date,
            "gYear" => Builtin::GYear,
            "anyURI" => Builtin::AnyUri,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum TypeRef {
    Builtin(Builtin),
    Named(String),
}

#[derive(Debug)]
pub(crate) enum Term {
    Element { name: String, type_ref: TypeRef },
    /// Wildcard, `other_only` for `##other`
    Any { other_only: bool, lax: bool },
}

#[derive(Debug)]
pub(crate) struct Particle {
    pub term: Term,
    pub min_occurs: u32,
    /// `None` when unbounded
    pub max_occurs: Option<u32>,
}

#[derive(Debug)]
pub(crate) struct AttributeDecl {
    pub name: String,
    pub type_ref: TypeRef,
    pub required: bool,
    pub fixed: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct ComplexType {
    pub particles: Vec<Particle>,
    pub attributes: Vec<AttributeDecl>,
    pub any_attribute: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Facets {
    /// Alternatives, a value must match one of them
    pub patterns: Vec<Regex>,
    pub enumeration: Vec<String>,
    pub min_inclusive: Option<f64>,
    pub max_inclusive: Option<f64>,
    pub min_exclusive: Option<f64>,
    pub max_exclusive: Option<f64>,
    pub length: Option<usize>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

#[derive(Debug)]
pub(crate) struct SimpleType {
    pub base: TypeRef,
    pub facets: Facets,
}

/// A loaded schema, ready to validate documents
#[derive(Debug)]
pub struct Schema {
    name: String,
    target_namespace: Option<String>,
    elements: HashMap<String, TypeRef>,
    complex_types: HashMap<String, ComplexType>,
    simple_types: HashMap<String, SimpleType>,
    warnings: Vec<String>,
}

impl Schema {
    /// Load a schema from its XSD text
    pub fn parse(name: &str, xsd: &str) -> Result<Self, SchemaError> {
        xsd::load(name, xsd)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn target_namespace(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    /// Problems found while loading that did not prevent it, e.g. skipped patterns
    #[inline]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Validate a document, collecting every problem into one [`FormatError`]
    pub fn validate(&self, source_name: &str, xml: &[u8]) -> Result<(), FormatError> {
        #[cfg(feature = "profiling")]
        profiling::scope!("schema::validate");

        let diagnostics = self.diagnostics(xml);
        if diagnostics.is_empty() {
            tracing::debug!("{source_name} is valid against {}", self.name);
            Ok(())
        } else {
            Err(FormatError {
                source_name: source_name.to_string(),
                diagnostics,
            })
        }
    }

    /// Every validation problem in a document, empty when it is valid
    pub fn diagnostics(&self, xml: &[u8]) -> Vec<String> {
        match document::parse(xml) {
            Ok(root) => validate::validate_document(self, &root),
            Err(message) => vec![format!("not well-formed XML: {message}")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_schemas_load() {
        let gpx = gpx_11().unwrap();
        assert_eq!(gpx.target_namespace(), Some("http://www.topografix.com/GPX/1/1"));
        assert!(gpx.warnings().is_empty());

        let local = flight_plan().unwrap();
        assert!(local.warnings().is_empty());
    }

    #[test]
    fn test_vendor_schema_loads_with_pattern_warning() {
        let vendor = flight_plan_vendor().unwrap();
        assert_eq!(vendor.warnings().len(), 1);
        assert!(vendor.warnings()[0].contains("\\@"));
    }

    #[test]
    fn test_format_error_lists_diagnostics() {
        let err = FormatError {
            source_name: "a.fpl".to_string(),
            diagnostics: vec!["first".to_string(), "second".to_string()],
        };
        assert_eq!(err.to_string(), "a.fpl is not valid: first; second");
    }
}
