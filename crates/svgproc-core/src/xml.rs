//! XML text to [`Document`] and back
//!
//! Whitespace and comments are kept as nodes, so a document that is parsed
//! and written without modification keeps its layout. Empty elements are
//! always written self-closing and attribute values always double-quoted.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::io::{self, Read, Write};

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::tree::{Document, Element, NodeId, NodeKind};

/// Errors that can occur while reading a document
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read document: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed attribute: {0}")]
    Attr(#[from] AttrError),

    #[error("Element <{0}> is never closed")]
    UnclosedElement(String),

    #[error("Closing tag </{0}> has no matching opening tag")]
    UnexpectedClose(String),

    #[error("Document has no root element")]
    NoRootElement,
}

/// Parse XML source text into a document
pub fn parse(source: &str) -> Result<Document, ParseError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(false);

    let mut doc = Document::new();
    let mut open: Vec<NodeId> = vec![doc.root()];

    loop {
        let parent = open[open.len() - 1];
        match reader.read_event()? {
            Event::Start(e) => {
                let element = read_element(&e)?;
                let id = doc.append_child(parent, NodeKind::Element(element));
                open.push(id);
            }
            Event::Empty(e) => {
                let element = read_element(&e)?;
                doc.append_child(parent, NodeKind::Element(element));
            }
            Event::End(e) => {
                if open.len() == 1 {
                    return Err(ParseError::UnexpectedClose(lossy(e.name().as_ref()).into_owned()));
                }
                open.pop();
            }
            Event::Text(e) => {
                let text = e.unescape()?.into_owned();
                doc.append_child(parent, NodeKind::Text(text));
            }
            Event::CData(e) => {
                doc.append_child(parent, NodeKind::CData(lossy(&e).into_owned()));
            }
            Event::Comment(e) => {
                doc.append_child(parent, NodeKind::Comment(lossy(&e).into_owned()));
            }
            Event::Decl(e) => {
                doc.append_child(parent, NodeKind::Declaration(lossy(&e).into_owned()));
            }
            Event::PI(e) => {
                doc.append_child(parent, NodeKind::ProcessingInstruction(lossy(&e).into_owned()));
            }
            Event::DocType(e) => {
                let raw = lossy(&e).trim_start().to_string();
                doc.append_child(parent, NodeKind::DocType(raw));
            }
            Event::Eof => break,
        }
    }

    if open.len() > 1 {
        let name = doc
            .element(open[open.len() - 1])
            .map(|e| e.name().to_string())
            .unwrap_or_default();
        return Err(ParseError::UnclosedElement(name));
    }

    if doc.document_element().is_none() {
        return Err(ParseError::NoRootElement);
    }

    Ok(doc)
}

/// Read and parse a whole XML stream
pub fn parse_reader<R: Read>(mut reader: R) -> Result<Document, ParseError> {
    let mut source = String::new();
    reader.read_to_string(&mut source)?;
    parse(&source)
}

fn read_element(start: &BytesStart<'_>) -> Result<Element, ParseError> {
    let mut element = Element::new(lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        element.set_attribute(lossy(attr.key.as_ref()), value.into_owned());
    }
    Ok(element)
}

fn lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

impl Document {
    /// Parse XML source text into a document
    pub fn parse(source: &str) -> Result<Document, ParseError> {
        parse(source)
    }

    /// Serialize the nodes reachable from the document node
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_node(self.root(), &mut out);
        out
    }

    /// Serialize a single subtree
    pub fn subtree_to_xml(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    /// Serialize the document into a byte sink
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(self.to_xml().as_bytes())
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Document => {
                for &child in self.children(id) {
                    self.write_node(child, out);
                }
            }
            NodeKind::Element(element) => {
                out.push('<');
                out.push_str(element.name());
                for attr in element.attributes() {
                    let _ = write!(out, " {}=\"{}\"", attr.name, escape(attr.value.as_str()));
                }
                let children = self.children(id);
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for &child in children {
                    self.write_node(child, out);
                }
                let _ = write!(out, "</{}>", element.name());
            }
            NodeKind::Text(text) => out.push_str(&partial_escape(text.as_str())),
            NodeKind::CData(text) => {
                let _ = write!(out, "<![CDATA[{}]]>", text);
            }
            NodeKind::Comment(text) => {
                let _ = write!(out, "<!--{}-->", text);
            }
            NodeKind::ProcessingInstruction(raw) | NodeKind::Declaration(raw) => {
                let _ = write!(out, "<?{}?>", raw);
            }
            NodeKind::DocType(raw) => {
                let _ = write!(out, "<!DOCTYPE {}>", raw);
            }
        }
    }
}
