//! svgproc-core: Markup tree and document services
//!
//! This crate provides:
//! - `Document`: An arena-backed mutable tree addressed by `NodeId`
//! - `NodeRef`: A read-only view of a node with capability queries
//! - `parse()`: XML text to `Document`, via quick-xml
//! - `Document::to_xml()`: Serialization that preserves untouched layout

pub mod style;
mod tree;
mod xml;

pub use tree::{
    Attribute, Document, Element, NodeId, NodeKind, NodeRef, NodeType, SVG_NAMESPACE,
    XLINK_NAMESPACE,
};
pub use xml::{parse, parse_reader, ParseError};
