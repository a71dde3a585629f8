// Minimal owned XML element tree.
//
// The XML API speaks small documents: a `<response>` envelope around a
// configuration subtree. An owned tree is enough for both directions and
// keeps quick-xml's event API out of every other module.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::Error;

/// An XML element with attributes, child elements, and text content.
///
/// Mixed content is not preserved: all text directly under an element is
/// concatenated into [`text`](Self::text). Whitespace around text is trimmed
/// on parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
    text: Option<String>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn push_child(&mut self, child: XmlNode) {
        self.children.push(child);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// First direct child with the given element name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given element name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Walk a `/`-separated path of child names, e.g. `"result/job/id"`.
    pub fn find(&self, path: &str) -> Option<&XmlNode> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Text directly under this element.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// All text in this element and its descendants, depth-first.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(ref text) = self.text {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// `true` when the element has no child elements.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    // ── Parsing ──────────────────────────────────────────────────────

    /// Parse a document (or fragment with a single root element).
    pub fn parse(xml: &str) -> Result<Self, Error> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                Error::Xml(format!("at byte {}: {e}", reader.buffer_position()))
            })?;
            match event {
                Event::Start(start) => stack.push(node_from_start(&start)?),
                Event::Empty(start) => {
                    let node = node_from_start(&start)?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::End(_) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| Error::Xml("unbalanced closing tag".into()))?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| Error::Xml(e.to_string()))?;
                    append_text(&mut stack, &text);
                }
                Event::CData(data) => {
                    let raw = data.into_inner();
                    append_text(&mut stack, &String::from_utf8_lossy(&raw));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::Xml(format!(
                "unclosed element <{}>",
                stack.last().map_or("", |n| n.name.as_str())
            )));
        }
        root.ok_or_else(|| Error::Xml("document has no root element".into()))
    }

    // ── Writing ──────────────────────────────────────────────────────

    /// Serialize to a compact XML string (no declaration, no indentation).
    pub fn to_xml(&self) -> Result<String, Error> {
        let mut writer = Writer::new(Vec::new());
        self.write_to(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
    }

    fn write_to(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), Error> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_none() {
            return writer.write_event(Event::Empty(start)).map_err(write_error);
        }

        writer.write_event(Event::Start(start)).map_err(write_error)?;
        if let Some(ref text) = self.text {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(write_error)?;
        }
        for child in &self.children {
            child.write_to(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(write_error)
    }
}

fn write_error(err: impl std::fmt::Display) -> Error {
    Error::Xml(format!("failed to write XML: {err}"))
}

fn node_from_start(start: &BytesStart<'_>) -> Result<XmlNode, Error> {
    let mut node = XmlNode::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(e.to_string()))?
            .into_owned();
        node.attributes.push((key, value));
    }
    Ok(node)
}

fn attach(
    stack: &mut [XmlNode],
    root: &mut Option<XmlNode>,
    node: XmlNode,
) -> Result<(), Error> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        Ok(())
    } else if root.is_none() {
        *root = Some(node);
        Ok(())
    } else {
        Err(Error::Xml("document has more than one root element".into()))
    }
}

fn append_text(stack: &mut [XmlNode], text: &str) {
    // Text outside the root element is ignored.
    let Some(node) = stack.last_mut() else {
        return;
    };
    if text.is_empty() {
        return;
    }
    match node.text {
        Some(ref mut existing) => existing.push_str(text),
        None => node.text = Some(text.to_owned()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_envelope_with_nested_members() {
        let xml = r#"<?xml version="1.0"?>
            <response status="success" code="19">
              <result total-count="1" count="1">
                <entry name="web" admin="admin">
                  <tag><member>prod</member><member>dmz</member></tag>
                </entry>
              </result>
            </response>"#;

        let root = XmlNode::parse(xml).unwrap();
        assert_eq!(root.name(), "response");
        assert_eq!(root.attribute("status"), Some("success"));

        let entry = root.find("result/entry").unwrap();
        assert_eq!(entry.attribute("name"), Some("web"));
        let members: Vec<_> = entry
            .find("tag")
            .unwrap()
            .children_named("member")
            .filter_map(XmlNode::text)
            .collect();
        assert_eq!(members, ["prod", "dmz"]);
    }

    #[test]
    fn parse_unescapes_text_and_attributes() {
        let root = XmlNode::parse(r#"<entry name="a&amp;b"><d>x &lt; y</d></entry>"#).unwrap();
        assert_eq!(root.attribute("name"), Some("a&b"));
        assert_eq!(root.child("d").unwrap().text(), Some("x < y"));
    }

    #[test]
    fn parse_cdata() {
        let root = XmlNode::parse("<msg><line><![CDATA[commit failed]]></line></msg>").unwrap();
        assert_eq!(root.text_content(), "commit failed");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(XmlNode::parse("").is_err());
        assert!(XmlNode::parse("<a><b></a>").is_err());
        assert!(XmlNode::parse("<a/><b/>").is_err());
    }

    #[test]
    fn write_escapes_and_collapses_empty_elements() {
        let node = XmlNode::new("entry")
            .with_attribute("name", "it's <x>")
            .with_child(XmlNode::new("description").with_text("a & b"))
            .with_child(XmlNode::new("tag"));
        let xml = node.to_xml().unwrap();
        assert_eq!(
            xml,
            r#"<entry name="it&apos;s &lt;x&gt;"><description>a &amp; b</description><tag/></entry>"#
        );
        assert_eq!(XmlNode::parse(&xml).unwrap(), node);
    }
}
