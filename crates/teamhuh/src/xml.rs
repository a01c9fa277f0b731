//! Attributed XML tree that the resolver searches.
//!
//! Only the parts of XML the navigator needs are kept: local element names,
//! ordered attributes, ordered child elements and text. Namespace prefixes,
//! comments, processing instructions and DOCTYPE declarations are dropped
//! while parsing.

use crate::error::{NavError, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;
use std::str::FromStr;

/// A single `name="value"` pair on an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// An XML element with its attributes, children and text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attributes: Vec<Attribute>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<Element>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children<I: IntoIterator<Item = Element>>(mut self, children: I) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Local (prefix-free) element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Case-insensitive attribute lookup.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| names_match(&a.name, name))
            .map(|a| a.value.as_str())
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Element> {
        &mut self.children
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    pub fn is_childless(&self) -> bool {
        self.children.is_empty()
    }

    /// This element followed by every element beneath it, in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    fn push_text(&mut self, text: &str) {
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }
}

/// Pre-order walk over an element subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        self.stack.extend(element.children.iter().rev());
        Some(element)
    }
}

/// A parsed XML document. An empty document has no root element; it stands
/// in for a resource that could not be fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    root: Option<Element>,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root: Some(root) }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }

    pub fn root_mut(&mut self) -> Option<&mut Element> {
        self.root.as_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Every element in the document, root included, in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.root.iter().flat_map(Element::descendants)
    }

    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut open: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => open.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut open, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = open
                        .pop()
                        .ok_or_else(|| NavError::MalformedXml("unbalanced closing tag".into()))?;
                    attach(&mut open, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(current) = open.last_mut() {
                        current.push_text(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = open.last_mut() {
                        current.push_text(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                // Declarations, comments, PIs and DOCTYPE carry nothing we search.
                _ => {}
            }
        }

        if !open.is_empty() {
            return Err(NavError::MalformedXml(format!(
                "unclosed element <{}>",
                open[open.len() - 1].name
            )));
        }

        Ok(Self { root })
    }

    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        if let Some(root) = &self.root {
            write_element(&mut writer, root)?;
        }
        String::from_utf8(writer.into_inner()).map_err(|e| NavError::MalformedXml(e.to_string()))
    }
}

impl FromStr for Document {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Case-insensitive name comparison used for both element and attribute names.
pub(crate) fn names_match(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.local_name().as_ref()));
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push(Attribute { name, value });
    }
    Ok(element)
}

fn attach(open: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = open.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(NavError::MalformedXml(format!(
            "second root element <{}>",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for attr in &element.attributes {
        start.push_attribute((attr.name.as_str(), attr.value.as_str()));
    }

    let text = element.text.as_deref().filter(|t| !t.is_empty());
    if element.children.is_empty() && text.is_none() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    if let Some(text) = text {
        emit(writer, Event::Text(BytesText::new(text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| NavError::MalformedXml(format!("failed to write XML: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements() {
        let doc = Document::parse(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <project id="p1" name="Main">
              <buildTypes count="2">
                <buildType id="bt1"/>
                <buildType id="bt2"/>
              </buildTypes>
            </project>"#,
        )
        .unwrap();

        let root = doc.root().unwrap();
        assert_eq!(root.name(), "project");
        assert_eq!(root.attribute("name"), Some("Main"));
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.children()[0].children().len(), 2);
        assert_eq!(root.children()[0].children()[1].attribute("id"), Some("bt2"));
    }

    #[test]
    fn test_parse_strips_namespace_prefixes() {
        let doc = Document::parse(
            r#"<tc:build xmlns:tc="urn:tc" tc:id="7"><tc:status>OK</tc:status></tc:build>"#,
        )
        .unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.name(), "build");
        assert_eq!(root.attributes().len(), 1);
        assert_eq!(root.attribute("id"), Some("7"));
        assert_eq!(root.children()[0].name(), "status");
    }

    #[test]
    fn test_parse_text_and_cdata() {
        let doc =
            Document::parse("<comment><text>fix &amp; ship</text><raw><![CDATA[<b>]]></raw></comment>")
                .unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.children()[0].text(), Some("fix & ship"));
        assert_eq!(root.children()[1].text(), Some("<b>"));
    }

    #[test]
    fn test_parse_ignores_comments_and_doctype() {
        let doc = Document::parse("<!DOCTYPE x><!-- hi --><x><!-- inner --><y/></x>").unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.children().len(), 1);
        assert!(root.text().is_none());
    }

    #[test]
    fn test_parse_rejects_unclosed_element() {
        assert!(Document::parse("<a><b></b>").is_err());
    }

    #[test]
    fn test_parse_rejects_mismatched_tags() {
        assert!(Document::parse("<a><b></a></b>").is_err());
    }

    #[test]
    fn test_parse_empty_input() {
        let doc = Document::parse("").unwrap();
        assert!(doc.is_empty());
        assert_eq!(doc.elements().count(), 0);
    }

    #[test]
    fn test_attribute_lookup_is_case_insensitive() {
        let el = Element::new("build").with_attribute("buildTypeId", "bt1");
        assert_eq!(el.attribute("buildtypeid"), Some("bt1"));
        assert_eq!(el.attribute("BUILDTYPEID"), Some("bt1"));
        assert_eq!(el.attribute("missing"), None);
    }

    #[test]
    fn test_descendants_pre_order() {
        let doc = Document::parse("<a><b><c/></b><d/></a>").unwrap();
        let names: Vec<&str> = doc.elements().map(Element::name).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_to_xml_string_reparses() {
        let doc = Document::new(
            Element::new("builds")
                .with_attribute("count", "1")
                .with_child(Element::new("build").with_attribute("id", "1"))
                .with_child(Element::new("note").with_text("a < b")),
        );
        let xml = doc.to_xml_string().unwrap();
        assert!(xml.contains(r#"<builds count="1">"#));
        assert!(xml.contains("a &lt; b"));
        assert_eq!(Document::parse(&xml).unwrap(), doc);
    }

    #[test]
    fn test_from_str() {
        let doc: Document = "<x a=\"1\"/>".parse().unwrap();
        assert_eq!(doc.root().unwrap().attribute("a"), Some("1"));
    }

    #[test]
    fn test_names_match_unicode() {
        assert!(names_match("Ärger", "ärger"));
        assert!(!names_match("build", "builds"));
    }
}
