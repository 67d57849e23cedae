//! Namespace-aware XML element tree
//!
//! Both schema files and the documents validated against them are read into this tree. It
//! keeps only what validation needs: resolved names, attributes, element children and
//! concatenated text.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::rc::Rc;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Prefix to namespace bindings in scope for an element, `""` is the default namespace
pub(crate) type Scope = Rc<HashMap<String, String>>;

#[derive(Debug, Clone)]
pub(crate) struct Attribute {
    /// Lexical name as written, e.g. `xsi:schemaLocation`
    pub name: String,
    pub namespace: Option<String>,
    pub local_name: String,
    pub value: String,
}

impl Attribute {
    /// Namespace declarations (`xmlns`, `xmlns:*`)
    pub fn is_namespace_declaration(&self) -> bool {
        self.name == "xmlns" || self.name.starts_with("xmlns:")
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub namespace: Option<String>,
    pub local_name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Element>,
    pub text: String,
    pub scope: Scope,
}

impl Element {
    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.local_name == local_name)
            .map(|a| a.value.as_str())
    }

    /// Resolve a `prefix:local` value (e.g. a `type` attribute) against this element's scope
    pub fn resolve_qname<'a>(&self, qname: &'a str) -> Result<(Option<&str>, &'a str), String> {
        let (prefix, local) = qname.split_once(':').unwrap_or(("", qname));
        match self.scope.get(prefix) {
            Some(namespace) => Ok((Some(namespace.as_str()), local)),
            None if prefix.is_empty() => Ok((None, local)),
            None => Err(format!("prefix {prefix:?} in {qname:?} is not bound")),
        }
    }
}

/// Read a whole document into a tree, failing on anything that is not well-formed
pub(crate) fn parse(xml: &[u8]) -> Result<Element, String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    let root_scope: Scope = Rc::new(HashMap::from([(
        "xml".to_string(),
        XML_NAMESPACE.to_string(),
    )]));

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| format!("at byte {}: {e}", reader.buffer_position()))?;

        match event {
            Event::Start(start) => {
                let scope = stack.last().map_or(&root_scope, |parent| &parent.scope);
                let element = open_element(&start, scope)?;
                if root.is_some() && stack.is_empty() {
                    return Err("content after the document element".to_string());
                }
                stack.push(element);
            }
            Event::Empty(start) => {
                let scope = stack.last().map_or(&root_scope, |parent| &parent.scope);
                let element = open_element(&start, scope)?;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                // Tag name matching is checked by the reader
                let element = stack
                    .pop()
                    .ok_or_else(|| "closing tag without an open element".to_string())?;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| e.to_string())?;
                match stack.last_mut() {
                    Some(element) => element.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err("text outside the document element".to_string()),
                }
            }
            Event::CData(data) => {
                let data = data.into_inner();
                let text = std::str::from_utf8(&data).map_err(|e| e.to_string())?;
                match stack.last_mut() {
                    Some(element) => element.text.push_str(text),
                    None => return Err("CDATA outside the document element".to_string()),
                }
            }
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(format!("element <{}> is not closed", open.local_name));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn close_element(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err("more than one document element".to_string()),
    }
    Ok(())
}

fn open_element(start: &BytesStart<'_>, parent_scope: &Scope) -> Result<Element, String> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| e.to_string())?
        .to_string();

    let mut raw_attributes = Vec::new();
    let mut declarations = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|e| e.to_string())?
            .to_string();
        let value = attribute
            .unescape_value()
            .map_err(|e| e.to_string())?
            .into_owned();

        if key == "xmlns" {
            declarations.push((String::new(), value.clone()));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            declarations.push((prefix.to_string(), value.clone()));
        }
        raw_attributes.push((key, value));
    }

    let scope = if declarations.is_empty() {
        Rc::clone(parent_scope)
    } else {
        let mut bindings = HashMap::clone(parent_scope);
        bindings.extend(declarations);
        Rc::new(bindings)
    };

    let (namespace, local_name) = resolve_element_name(&name, &scope)?;
    let mut attributes = Vec::with_capacity(raw_attributes.len());
    for (key, value) in raw_attributes {
        // Unprefixed attributes are in no namespace
        let (namespace, local_name) = match key.split_once(':') {
            Some((prefix, local)) if prefix != "xmlns" => {
                let namespace = scope
                    .get(prefix)
                    .ok_or_else(|| format!("attribute prefix {prefix:?} is not bound"))?;
                (Some(namespace.clone()), local.to_string())
            }
            _ => (None, key.clone()),
        };
        attributes.push(Attribute {
            name: key,
            namespace,
            local_name,
            value,
        });
    }

    Ok(Element {
        namespace,
        local_name,
        attributes,
        children: Vec::new(),
        text: String::new(),
        scope,
    })
}

fn resolve_element_name(name: &str, scope: &Scope) -> Result<(Option<String>, String), String> {
    match name.split_once(':') {
        Some((prefix, local)) => {
            let namespace = scope
                .get(prefix)
                .ok_or_else(|| format!("element prefix {prefix:?} is not bound"))?;
            Ok((Some(namespace.clone()), local.to_string()))
        }
        None => Ok((
            scope.get("").filter(|ns| !ns.is_empty()).cloned(),
            name.to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolves_namespaces() {
        let xml = br#"<?xml version="1.0"?>
            <a:root xmlns:a="urn:a" xmlns="urn:default" b="1">
                <child>text &amp; more</child>
                <a:other/>
            </a:root>"#;

        let root = parse(xml).unwrap();
        assert_eq!(root.namespace.as_deref(), Some("urn:a"));
        assert_eq!(root.local_name, "root");
        assert_eq!(root.attribute("b"), Some("1"));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].namespace.as_deref(), Some("urn:default"));
        assert_eq!(root.children[0].text, "text & more");
        assert_eq!(root.children[1].namespace.as_deref(), Some("urn:a"));
    }

    #[test]
    fn test_resolve_qname() {
        let root = parse(br#"<s xmlns:xsd="urn:xsd" xmlns="urn:t"/>"#).unwrap();
        assert_eq!(root.resolve_qname("xsd:string").unwrap(), (Some("urn:xsd"), "string"));
        assert_eq!(root.resolve_qname("local").unwrap(), (Some("urn:t"), "local"));
        assert!(root.resolve_qname("nope:x").is_err());
    }

    #[test]
    fn test_malformed_documents_fail() {
        assert!(parse(b"<a><b></a>").is_err());
        assert!(parse(b"<a>").is_err());
        assert!(parse(b"").is_err());
        assert!(parse(b"<a/><b/>").is_err());
        assert!(parse(b"<p:a/>").is_err());
    }
}
