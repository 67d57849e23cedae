//! Loading XSD text into a [`Schema`]

use super::document::{self, Element};
use super::{
    AttributeDecl, Builtin, ComplexType, Facets, Particle, Schema, SchemaError, SimpleType, Term,
    TypeRef, XSD_NAMESPACE, pattern,
};
use std::collections::HashMap;

struct Loader<'a> {
    schema: &'a str,
    complex_types: HashMap<String, ComplexType>,
    simple_types: HashMap<String, SimpleType>,
    warnings: Vec<String>,
    anonymous: usize,
}

pub(super) fn load(name: &str, xsd: &str) -> Result<Schema, SchemaError> {
    let root = document::parse(xsd.as_bytes()).map_err(|message| SchemaError::Malformed {
        schema: name.to_string(),
        message,
    })?;

    let mut loader = Loader {
        schema: name,
        complex_types: HashMap::new(),
        simple_types: HashMap::new(),
        warnings: Vec::new(),
        anonymous: 0,
    };

    if !loader.is_xsd(&root, "schema") {
        return Err(loader.invalid("document element is not xsd:schema"));
    }

    let mut elements = HashMap::new();
    for child in xsd_children(&root) {
        match child.local_name.as_str() {
            "annotation" => {}
            "element" => {
                let element_name = loader.required_attribute(child, "name")?.to_string();
                let type_ref = loader.element_type(child, &element_name)?;
                elements.insert(element_name, type_ref);
            }
            "complexType" => {
                let type_name = loader.required_attribute(child, "name")?.to_string();
                let complex_type = loader.complex_type(child, &type_name)?;
                loader.complex_types.insert(type_name, complex_type);
            }
            "simpleType" => {
                let type_name = loader.required_attribute(child, "name")?.to_string();
                let simple_type = loader.simple_type(child, &type_name)?;
                loader.simple_types.insert(type_name, simple_type);
            }
            other => return Err(loader.unsupported(other)),
        }
    }

    loader.check_references(&elements)?;

    for warning in &loader.warnings {
        tracing::warn!("Schema {name}: {warning}");
    }

    Ok(Schema {
        name: name.to_string(),
        target_namespace: root.attribute("targetNamespace").map(str::to_string),
        elements,
        complex_types: loader.complex_types,
        simple_types: loader.simple_types,
        warnings: loader.warnings,
    })
}

/// Schema-namespace children, skipping foreign elements
fn xsd_children(element: &Element) -> impl Iterator<Item = &Element> {
    element
        .children
        .iter()
        .filter(|child| child.namespace.as_deref() == Some(XSD_NAMESPACE))
}

impl Loader<'_> {
    fn is_xsd(&self, element: &Element, local_name: &str) -> bool {
        element.namespace.as_deref() == Some(XSD_NAMESPACE) && element.local_name == local_name
    }

    fn invalid(&self, message: impl Into<String>) -> SchemaError {
        SchemaError::Invalid {
            schema: self.schema.to_string(),
            message: message.into(),
        }
    }

    fn unsupported(&self, construct: &str) -> SchemaError {
        SchemaError::Unsupported {
            schema: self.schema.to_string(),
            construct: construct.to_string(),
        }
    }

    fn required_attribute<'e>(&self, element: &'e Element, name: &str) -> Result<&'e str, SchemaError> {
        element.attribute(name).ok_or_else(|| {
            self.invalid(format!(
                "<{}> is missing the {name:?} attribute",
                element.local_name
            ))
        })
    }

    fn anonymous_name(&mut self, owner: &str) -> String {
        self.anonymous += 1;
        format!("{owner}#{}", self.anonymous)
    }

    fn type_ref(&self, element: &Element, qname: &str) -> Result<TypeRef, SchemaError> {
        let (namespace, local) = element
            .resolve_qname(qname)
            .map_err(|message| self.invalid(message))?;

        if namespace == Some(XSD_NAMESPACE) {
            Builtin::from_local_name(local)
                .map(TypeRef::Builtin)
                .ok_or_else(|| SchemaError::UnknownType {
                    schema: self.schema.to_string(),
                    type_name: qname.to_string(),
                })
        } else {
            Ok(TypeRef::Named(local.to_string()))
        }
    }

    /// Type of an element or attribute declaration: `type` attribute, inline type or anyType
    fn element_type(&mut self, element: &Element, owner: &str) -> Result<TypeRef, SchemaError> {
        if let Some(qname) = element.attribute("type") {
            return self.type_ref(element, qname);
        }

        for child in xsd_children(element) {
            match child.local_name.as_str() {
                "complexType" => {
                    let name = self.anonymous_name(owner);
                    let complex_type = self.complex_type(child, &name)?;
                    self.complex_types.insert(name.clone(), complex_type);
                    return Ok(TypeRef::Named(name));
                }
                "simpleType" => {
                    let name = self.anonymous_name(owner);
                    let simple_type = self.simple_type(child, &name)?;
                    self.simple_types.insert(name.clone(), simple_type);
                    return Ok(TypeRef::Named(name));
                }
                _ => {}
            }
        }
        Ok(TypeRef::Builtin(Builtin::AnyType))
    }

    fn complex_type(&mut self, element: &Element, name: &str) -> Result<ComplexType, SchemaError> {
        let mut complex_type = ComplexType::default();

        for child in xsd_children(element) {
            match child.local_name.as_str() {
                "annotation" => {}
                "sequence" => {
                    if !complex_type.particles.is_empty() {
                        return Err(self.invalid(format!("type {name} has more than one sequence")));
                    }
                    complex_type.particles = self.sequence(child, name)?;
                }
                "attribute" => {
                    let attribute = self.attribute(child, name)?;
                    complex_type.attributes.push(attribute);
                }
                "anyAttribute" => complex_type.any_attribute = true,
                other => return Err(self.unsupported(other)),
            }
        }
        Ok(complex_type)
    }

    fn sequence(&mut self, element: &Element, owner: &str) -> Result<Vec<Particle>, SchemaError> {
        if element.attribute("minOccurs").is_some() || element.attribute("maxOccurs").is_some() {
            return Err(self.unsupported("sequence with occurrence bounds"));
        }

        let mut particles = Vec::new();
        for child in xsd_children(element) {
            let term = match child.local_name.as_str() {
                "annotation" => continue,
                "element" => {
                    if child.attribute("ref").is_some() {
                        return Err(self.unsupported("element ref"));
                    }
                    let name = self.required_attribute(child, "name")?.to_string();
                    let type_ref = self.element_type(child, &format!("{owner}/{name}"))?;
                    Term::Element { name, type_ref }
                }
                "any" => {
                    let namespace = child.attribute("namespace").unwrap_or("##any");
                    let other_only = match namespace {
                        "##any" => false,
                        "##other" => true,
                        _ => return Err(self.unsupported("any with a namespace list")),
                    };
                    let lax = child.attribute("processContents") != Some("strict");
                    Term::Any { other_only, lax }
                }
                other => return Err(self.unsupported(other)),
            };

            let (min_occurs, max_occurs) = self.occurs(child)?;
            particles.push(Particle {
                term,
                min_occurs,
                max_occurs,
            });
        }
        Ok(particles)
    }

    fn occurs(&self, element: &Element) -> Result<(u32, Option<u32>), SchemaError> {
        let min = match element.attribute("minOccurs") {
            Some(value) => value
                .parse()
                .map_err(|_| self.invalid(format!("minOccurs {value:?} is not a number")))?,
            None => 1,
        };
        let max = match element.attribute("maxOccurs") {
            Some("unbounded") => None,
            Some(value) => Some(
                value
                    .parse()
                    .map_err(|_| self.invalid(format!("maxOccurs {value:?} is not a number")))?,
            ),
            None => Some(1),
        };
        if max.is_some_and(|max| max < min) {
            return Err(self.invalid("maxOccurs is lower than minOccurs"));
        }
        Ok((min, max))
    }

    fn attribute(&mut self, element: &Element, owner: &str) -> Result<AttributeDecl, SchemaError> {
        let name = self.required_attribute(element, "name")?.to_string();
        let type_ref = match self.element_type(element, &format!("{owner}@{name}"))? {
            // Attributes without a type take any simple value
            TypeRef::Builtin(Builtin::AnyType) => TypeRef::Builtin(Builtin::String),
            type_ref => type_ref,
        };

        Ok(AttributeDecl {
            required: element.attribute("use") == Some("required"),
            fixed: element.attribute("fixed").map(str::to_string),
            name,
            type_ref,
        })
    }

    fn simple_type(&mut self, element: &Element, name: &str) -> Result<SimpleType, SchemaError> {
        let mut restriction = None;
        for child in xsd_children(element) {
            match child.local_name.as_str() {
                "annotation" => {}
                "restriction" => restriction = Some(child),
                other => return Err(self.unsupported(other)),
            }
        }
        let restriction =
            restriction.ok_or_else(|| self.invalid(format!("type {name} has no restriction")))?;

        let base = self.required_attribute(restriction, "base")?;
        let base = self.type_ref(restriction, base)?;

        let mut facets = Facets::default();
        let mut patterns = Vec::new();
        for facet in xsd_children(restriction) {
            let facet_name = facet.local_name.as_str();
            if facet_name == "annotation" {
                continue;
            }
            let value = self.required_attribute(facet, "value")?;

            match facet_name {
                "pattern" => patterns.push(value),
                "enumeration" => facets.enumeration.push(value.to_string()),
                "minInclusive" => facets.min_inclusive = Some(self.number(name, facet_name, value)?),
                "maxInclusive" => facets.max_inclusive = Some(self.number(name, facet_name, value)?),
                "minExclusive" => facets.min_exclusive = Some(self.number(name, facet_name, value)?),
                "maxExclusive" => facets.max_exclusive = Some(self.number(name, facet_name, value)?),
                "length" => facets.length = Some(self.length(name, facet_name, value)?),
                "minLength" => facets.min_length = Some(self.length(name, facet_name, value)?),
                "maxLength" => facets.max_length = Some(self.length(name, facet_name, value)?),
                // Lexical details the validator does not check
                "whiteSpace" | "fractionDigits" | "totalDigits" => {}
                other => return Err(self.unsupported(other)),
            }
        }

        for value in patterns {
            match pattern::compile(value) {
                Ok(regex) => facets.patterns.push(regex),
                Err(reason) => self
                    .warnings
                    .push(format!("pattern {value:?} of type {name} ignored: {reason}")),
            }
        }

        Ok(SimpleType { base, facets })
    }

    fn number(&self, type_name: &str, facet: &str, value: &str) -> Result<f64, SchemaError> {
        value
            .trim()
            .parse()
            .map_err(|_| self.invalid(format!("{facet} {value:?} of type {type_name} is not a number")))
    }

    fn length(&self, type_name: &str, facet: &str, value: &str) -> Result<usize, SchemaError> {
        value
            .trim()
            .parse()
            .map_err(|_| self.invalid(format!("{facet} {value:?} of type {type_name} is not a length")))
    }

    /// Every named type reference must resolve, simple type bases to simple types
    fn check_references(&self, elements: &HashMap<String, TypeRef>) -> Result<(), SchemaError> {
        let unknown = |type_name: &str| SchemaError::UnknownType {
            schema: self.schema.to_string(),
            type_name: type_name.to_string(),
        };
        let is_type = |type_ref: &TypeRef| match type_ref {
            TypeRef::Builtin(_) => true,
            TypeRef::Named(name) => {
                self.complex_types.contains_key(name) || self.simple_types.contains_key(name)
            }
        };
        let is_simple = |type_ref: &TypeRef| match type_ref {
            TypeRef::Builtin(_) => true,
            TypeRef::Named(name) => self.simple_types.contains_key(name),
        };
        let name_of = |type_ref: &TypeRef| match type_ref {
            TypeRef::Builtin(builtin) => format!("{builtin:?}"),
            TypeRef::Named(name) => name.clone(),
        };

        for type_ref in elements.values() {
            if !is_type(type_ref) {
                return Err(unknown(&name_of(type_ref)));
            }
        }

        for complex_type in self.complex_types.values() {
            for particle in &complex_type.particles {
                if let Term::Element { type_ref, .. } = &particle.term
                    && !is_type(type_ref)
                {
                    return Err(unknown(&name_of(type_ref)));
                }
            }
            for attribute in &complex_type.attributes {
                if !is_simple(&attribute.type_ref) {
                    return Err(unknown(&name_of(&attribute.type_ref)));
                }
            }
        }

        for simple_type in self.simple_types.values() {
            if !is_simple(&simple_type.base) {
                return Err(unknown(&name_of(&simple_type.base)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema"
        xmlns="urn:test" targetNamespace="urn:test" elementFormDefault="qualified">"#;

    fn schema(body: &str) -> Result<Schema, SchemaError> {
        load("test.xsd", &format!("{HEADER}{body}</xsd:schema>"))
    }

    #[test]
    fn test_load_types() {
        let schema = schema(
            r#"<xsd:element name="root" type="Root_t"/>
            <xsd:complexType name="Root_t">
                <xsd:sequence>
                    <xsd:element name="code" type="Code_t" maxOccurs="unbounded"/>
                    <xsd:element name="note" type="xsd:string" minOccurs="0"/>
                </xsd:sequence>
                <xsd:attribute name="version" type="xsd:string" use="required" fixed="1"/>
            </xsd:complexType>
            <xsd:simpleType name="Code_t">
                <xsd:restriction base="xsd:string">
                    <xsd:maxLength value="3"/>
                    <xsd:pattern value="[A-Z]+"/>
                </xsd:restriction>
            </xsd:simpleType>"#,
        )
        .unwrap();

        assert_eq!(schema.target_namespace(), Some("urn:test"));
        assert!(schema.warnings().is_empty());
        let root = &schema.complex_types["Root_t"];
        assert_eq!(root.particles.len(), 2);
        assert_eq!(root.particles[0].max_occurs, None);
        assert_eq!(root.particles[1].min_occurs, 0);
        assert!(root.attributes[0].required);
        assert_eq!(schema.simple_types["Code_t"].facets.max_length, Some(3));
    }

    #[test]
    fn test_invalid_pattern_becomes_warning() {
        let schema = schema(
            r#"<xsd:simpleType name="Email_t">
                <xsd:restriction base="xsd:string">
                    <xsd:pattern value="[a-z]+\@[a-z]+"/>
                </xsd:restriction>
            </xsd:simpleType>"#,
        )
        .unwrap();

        assert_eq!(schema.warnings().len(), 1);
        assert!(schema.warnings()[0].contains("Email_t"));
        assert!(schema.simple_types["Email_t"].facets.patterns.is_empty());
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let err = schema(r#"<xsd:element name="root" type="Missing_t"/>"#).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType { .. }));
    }

    #[test]
    fn test_unsupported_construct_is_an_error() {
        let err = schema(
            r#"<xsd:complexType name="Choice_t">
                <xsd:choice><xsd:element name="a"/></xsd:choice>
            </xsd:complexType>"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::Unsupported {
                schema: "test.xsd".to_string(),
                construct: "choice".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_schema() {
        assert!(matches!(
            load("bad.xsd", "<xsd:schema"),
            Err(SchemaError::Malformed { .. })
        ));
    }
}
