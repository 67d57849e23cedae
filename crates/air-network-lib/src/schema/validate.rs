//! Checking a document tree against a loaded [`Schema`]

use super::document::Element;
use super::{
    AttributeDecl, Builtin, ComplexType, Facets, Particle, Schema, SimpleType, Term, TypeRef,
    XSI_NAMESPACE,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

enum Resolved<'s> {
    Builtin(Builtin),
    Simple(&'s SimpleType),
    Complex(&'s ComplexType),
}

struct Validator<'s> {
    schema: &'s Schema,
    diagnostics: Vec<String>,
}

pub(super) fn validate_document(schema: &Schema, root: &Element) -> Vec<String> {
    let mut validator = Validator {
        schema,
        diagnostics: Vec::new(),
    };
    let path = format!("/{}", root.local_name);

    if root.namespace.as_deref() != schema.target_namespace() {
        validator.report(
            &path,
            format!(
                "document element is in namespace {:?}, expected {:?}",
                root.namespace.as_deref().unwrap_or(""),
                schema.target_namespace().unwrap_or("")
            ),
        );
    } else {
        match schema.elements.get(&root.local_name) {
            Some(type_ref) => validator.element(root, type_ref, &path),
            None => validator.report(&path, "is not a document element of this schema"),
        }
    }

    validator.diagnostics
}

impl<'s> Validator<'s> {
    fn report(&mut self, path: &str, message: impl AsRef<str>) {
        self.diagnostics.push(format!("{path}: {}", message.as_ref()));
    }

    fn resolve(&self, type_ref: &TypeRef) -> Option<Resolved<'s>> {
        match type_ref {
            TypeRef::Builtin(builtin) => Some(Resolved::Builtin(*builtin)),
            TypeRef::Named(name) => self
                .schema
                .complex_types
                .get(name)
                .map(Resolved::Complex)
                .or_else(|| self.schema.simple_types.get(name).map(Resolved::Simple)),
        }
    }

    fn element(&mut self, element: &Element, type_ref: &TypeRef, path: &str) {
        match self.resolve(type_ref) {
            Some(Resolved::Builtin(Builtin::AnyType)) => {}
            Some(Resolved::Complex(complex_type)) => self.complex_element(element, complex_type, path),
            Some(Resolved::Builtin(_) | Resolved::Simple(_)) => {
                self.attributes(element, &[], false, path);
                if let Some(child) = element.children.first() {
                    self.report(path, format!("unexpected element <{}> in text content", child.local_name));
                }
                if let Some(message) = self.simple_value(type_ref, &element.text) {
                    self.report(path, message);
                }
            }
            // Unresolved references are rejected when the schema is loaded
            None => self.report(path, "has an unknown type"),
        }
    }

    fn complex_element(&mut self, element: &Element, complex_type: &ComplexType, path: &str) {
        self.attributes(element, &complex_type.attributes, complex_type.any_attribute, path);

        if !element.text.trim().is_empty() {
            self.report(path, "text is not allowed in element-only content");
        }

        self.sequence(element, &complex_type.particles, path);
    }

    fn attributes(
        &mut self,
        element: &Element,
        declarations: &[AttributeDecl],
        any_attribute: bool,
        path: &str,
    ) {
        for attribute in &element.attributes {
            if attribute.is_namespace_declaration()
                || attribute.namespace.as_deref() == Some(XSI_NAMESPACE)
            {
                continue;
            }

            let declaration = declarations
                .iter()
                .find(|d| attribute.namespace.is_none() && d.name == attribute.local_name);
            match declaration {
                Some(declaration) => {
                    if let Some(fixed) = &declaration.fixed
                        && attribute.value.trim() != fixed
                    {
                        self.report(
                            path,
                            format!("attribute {} must be {fixed:?}, found {:?}", attribute.name, attribute.value),
                        );
                    } else if let Some(message) = self.simple_value(&declaration.type_ref, &attribute.value) {
                        self.report(path, format!("attribute {}: {message}", attribute.name));
                    }
                }
                None if any_attribute => {}
                None => self.report(path, format!("attribute {} is not allowed", attribute.name)),
            }
        }

        for declaration in declarations.iter().filter(|d| d.required) {
            let present = element
                .attributes
                .iter()
                .any(|a| a.namespace.is_none() && a.local_name == declaration.name);
            if !present {
                self.report(path, format!("missing required attribute {}", declaration.name));
            }
        }
    }

    fn particle_matches(&self, particle: &Particle, child: &Element) -> bool {
        match &particle.term {
            Term::Element { name, .. } => {
                child.local_name == *name
                    && child.namespace.as_deref() == self.schema.target_namespace()
            }
            Term::Any { other_only, .. } => {
                !other_only
                    || (child.namespace.is_some()
                        && child.namespace.as_deref() != self.schema.target_namespace())
            }
        }
    }

    fn sequence(&mut self, element: &Element, particles: &[Particle], path: &str) {
        let children = &element.children;
        let mut index = 0;

        for particle in particles {
            let mut count = 0;
            while index < children.len() && self.particle_matches(particle, &children[index]) {
                let child = &children[index];
                if let Term::Element { type_ref, .. } = &particle.term {
                    let child_path = child_path(path, children, index);
                    self.element(child, type_ref, &child_path);
                }
                // Wildcard content is not checked (lax or skip)
                count += 1;
                index += 1;
            }

            let label = match &particle.term {
                Term::Element { name, .. } => format!("<{name}>"),
                Term::Any { .. } => "extension element".to_string(),
            };
            if count < particle.min_occurs {
                if particle.min_occurs == 1 {
                    self.report(path, format!("missing required element {label}"));
                } else {
                    self.report(
                        path,
                        format!("expected at least {} {label}, found {count}", particle.min_occurs),
                    );
                }
            }
            if let Some(max) = particle.max_occurs
                && count > max
            {
                self.report(path, format!("expected at most {max} {label}, found {count}"));
            }
        }

        for child in &children[index..] {
            self.report(path, format!("unexpected element <{}>", child.local_name));
        }
    }

    /// Check a text value against a simple type, `None` when valid
    fn simple_value(&self, type_ref: &TypeRef, raw: &str) -> Option<String> {
        match self.resolve(type_ref)? {
            Resolved::Builtin(builtin) => check_builtin(builtin, &normalize(builtin, raw)),
            Resolved::Complex(_) => Some("complex type used for a text value".to_string()),
            Resolved::Simple(simple_type) => {
                if let Some(message) = self.simple_value(&simple_type.base, raw) {
                    return Some(message);
                }
                let value = normalize(self.primitive(&simple_type.base), raw);
                check_facets(&simple_type.facets, &value)
            }
        }
    }

    /// The built-in type a simple type is ultimately derived from
    fn primitive(&self, type_ref: &TypeRef) -> Builtin {
        let mut current = type_ref;
        loop {
            match self.resolve(current) {
                Some(Resolved::Builtin(builtin)) => return builtin,
                Some(Resolved::Simple(simple_type)) => current = &simple_type.base,
                Some(Resolved::Complex(_)) | None => return Builtin::AnyType,
            }
        }
    }
}

fn child_path(path: &str, siblings: &[Element], index: usize) -> String {
    let name = &siblings[index].local_name;
    let same_name = siblings.iter().filter(|s| s.local_name == *name).count();
    if same_name > 1 {
        let position = siblings[..=index]
            .iter()
            .filter(|s| s.local_name == *name)
            .count();
        format!("{path}/{name}[{position}]")
    } else {
        format!("{path}/{name}")
    }
}

/// Apply the whitespace rule of a built-in type
fn normalize(builtin: Builtin, raw: &str) -> String {
    match builtin {
        Builtin::String | Builtin::AnyType => raw.to_string(),
        Builtin::NormalizedString => raw.replace(['\t', '\n', '\r'], " "),
        _ => raw.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

fn is_decimal(value: &str) -> bool {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    (!whole.is_empty() || !fraction.is_empty())
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit())
}

fn is_integer(value: &str) -> bool {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_double(value: &str) -> bool {
    if matches!(value, "INF" | "-INF" | "NaN") {
        return true;
    }
    let (mantissa, exponent) = value
        .split_once(['e', 'E'])
        .map_or((value, None), |(m, e)| (m, Some(e)));
    is_decimal(mantissa) && exponent.is_none_or(is_integer)
}

/// Split an optional `Z` / `+hh:mm` suffix off a date or time value
fn strip_timezone(value: &str) -> &str {
    if let Some(stripped) = value.strip_suffix('Z') {
        return stripped;
    }
    let Some(split) = value.len().checked_sub(6).filter(|&i| i > 0 && value.is_char_boundary(i)) else {
        return value;
    };
    let (head, tail) = value.split_at(split);
    let bytes = tail.as_bytes();
    if matches!(bytes[0], b'+' | b'-') && bytes[3] == b':' {
        return head;
    }
    value
}

fn check_builtin(builtin: Builtin, value: &str) -> Option<String> {
    let valid = match builtin {
        Builtin::AnyType | Builtin::String | Builtin::NormalizedString | Builtin::Token => true,
        Builtin::AnyUri => true,
        Builtin::Decimal => is_decimal(value),
        Builtin::Integer => is_integer(value),
        Builtin::NonNegativeInteger => {
            is_integer(value) && (!value.starts_with('-') || value[1..].bytes().all(|b| b == b'0'))
        }
        Builtin::PositiveInteger => {
            is_integer(value)
                && !value.starts_with('-')
                && value.bytes().any(|b| matches!(b, b'1'..=b'9'))
        }
        Builtin::Double | Builtin::Float => is_double(value),
        Builtin::Boolean => matches!(value, "true" | "false" | "1" | "0"),
        Builtin::DateTime => {
            DateTime::parse_from_rfc3339(value).is_ok()
                || NaiveDateTime::parse_from_str(strip_timezone(value), "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        }
        Builtin::Date => NaiveDate::parse_from_str(strip_timezone(value), "%Y-%m-%d").is_ok(),
        Builtin::GYear => {
            let year = strip_timezone(value);
            let digits = year.strip_prefix('-').unwrap_or(year);
            digits.len() >= 4 && digits.bytes().all(|b| b.is_ascii_digit())
        }
    };

    (!valid).then(|| format!("{value:?} is not a valid {builtin:?}"))
}

fn check_facets(facets: &Facets, value: &str) -> Option<String> {
    if !facets.patterns.is_empty() && !facets.patterns.iter().any(|p| p.is_match(value)) {
        return Some(format!("{value:?} does not match the required pattern"));
    }

    if !facets.enumeration.is_empty() && !facets.enumeration.iter().any(|e| e == value) {
        return Some(format!(
            "{value:?} is not one of {}",
            facets.enumeration.join(", ")
        ));
    }

    let length = value.chars().count();
    if let Some(expected) = facets.length
        && length != expected
    {
        return Some(format!("{value:?} must be exactly {expected} characters"));
    }
    if let Some(min) = facets.min_length
        && length < min
    {
        return Some(format!("{value:?} is shorter than {min} characters"));
    }
    if let Some(max) = facets.max_length
        && length > max
    {
        return Some(format!("{value:?} is longer than {max} characters"));
    }

    let bounded = facets.min_inclusive.is_some()
        || facets.max_inclusive.is_some()
        || facets.min_exclusive.is_some()
        || facets.max_exclusive.is_some();
    if bounded {
        let Ok(number) = value.parse::<f64>() else {
            return Some(format!("{value:?} is not a number"));
        };
        let out_of_range = facets.min_inclusive.is_some_and(|min| number < min)
            || facets.max_inclusive.is_some_and(|max| number > max)
            || facets.min_exclusive.is_some_and(|min| number <= min)
            || facets.max_exclusive.is_some_and(|max| number >= max);
        if out_of_range {
            return Some(format!("{value:?} is out of range"));
        }
    }

    None
}
