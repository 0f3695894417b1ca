//! Arena-backed markup tree
//!
//! Every node lives in a [`Document`] and is addressed by a [`NodeId`].
//! Detaching a node only unlinks it from its parent; it stays in the arena
//! and can be re-attached or inspected afterwards.

use crate::style;

/// Namespace of SVG elements
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Namespace of `xlink:*` attributes
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

/// SVG elements that carry no presentation and therefore no `style`
const NON_STYLABLE_TAGS: &[&str] = &[
    "metadata",
    "script",
    "style",
    "animate",
    "animateMotion",
    "animateTransform",
    "set",
    "mpath",
    "view",
    "cursor",
];

/// Handle of a node inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in its document's arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// The closed set of node kinds, without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Document,
    Element,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
    Declaration,
    DocType,
}

impl NodeType {
    /// Short human-readable name of the kind
    pub fn name(self) -> &'static str {
        match self {
            NodeType::Document => "Document",
            NodeType::Element => "Element",
            NodeType::Text => "Text",
            NodeType::CData => "CData",
            NodeType::Comment => "Comment",
            NodeType::ProcessingInstruction => "ProcessingInstruction",
            NodeType::Declaration => "Declaration",
            NodeType::DocType => "DocType",
        }
    }

    /// Parse a kind from its name, ignoring case
    pub fn from_name(name: &str) -> Option<NodeType> {
        match name.to_ascii_lowercase().as_str() {
            "document" => Some(NodeType::Document),
            "element" => Some(NodeType::Element),
            "text" => Some(NodeType::Text),
            "cdata" => Some(NodeType::CData),
            "comment" => Some(NodeType::Comment),
            "processinginstruction" | "pi" => Some(NodeType::ProcessingInstruction),
            "declaration" => Some(NodeType::Declaration),
            "doctype" => Some(NodeType::DocType),
            _ => None,
        }
    }

    /// Whether nodes of this kind only make sense while attached to a tree.
    ///
    /// Only the document node stands on its own.
    pub fn is_attached_kind(self) -> bool {
        self != NodeType::Document
    }
}

/// A single `name="value"` pair on an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Tag name and ordered attributes of an element node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<Attribute>,
}

impl Element {
    /// Create an element with no attributes
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// The qualified tag name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The attributes in document order
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Set an attribute, keeping its position if it already exists
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    /// Remove an attribute, returning its old value
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(pos).value)
    }

    /// The `id` attribute
    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    /// Members of the whitespace-separated `class` attribute
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attribute("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes().any(|c| c == name)
    }

    /// Look up a declaration in the `style` attribute
    pub fn style_property(&self, name: &str) -> Option<String> {
        let declarations = style::parse(self.attribute("style").unwrap_or(""));
        declarations
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Set a declaration in the `style` attribute, replacing an existing one in place
    pub fn set_style_property(&mut self, name: &str, value: &str) {
        let mut declarations = style::parse(self.attribute("style").unwrap_or(""));
        match declarations.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = value.to_string(),
            None => declarations.push((name.to_string(), value.to_string())),
        }
        self.set_attribute("style", style::serialize(&declarations));
    }

    /// Whether this element can carry presentation styles.
    ///
    /// Prefixed elements from foreign vocabularies (`sodipodi:namedview`,
    /// `cc:Work`, ...) never can.
    pub fn is_stylable(&self) -> bool {
        self.is_svg_element() && !NON_STYLABLE_TAGS.contains(&self.local_name())
    }

    /// Whether this element references an external raster or vector image
    pub fn is_image(&self) -> bool {
        self.is_svg_element() && self.local_name() == "image"
    }

    /// Unprefixed or `svg:`-prefixed
    pub fn is_svg_element(&self) -> bool {
        match self.name.split_once(':') {
            Some((prefix, _)) => prefix == "svg",
            None => true,
        }
    }

    /// Tag name without namespace prefix
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }
}

/// A node and its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    /// Raw content between `<?` and `?>`
    ProcessingInstruction(String),
    /// Raw content between `<?` and `?>` of the XML declaration
    Declaration(String),
    /// Raw content after `<!DOCTYPE `
    DocType(String),
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Document => NodeType::Document,
            NodeKind::Element(_) => NodeType::Element,
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::CData(_) => NodeType::CData,
            NodeKind::Comment(_) => NodeType::Comment,
            NodeKind::ProcessingInstruction(_) => NodeType::ProcessingInstruction,
            NodeKind::Declaration(_) => NodeType::Declaration,
            NodeKind::DocType(_) => NodeType::DocType,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Character payload of text-like nodes
    pub fn text(&self) -> Option<&str> {
        match self {
            NodeKind::Text(t) | NodeKind::CData(t) | NodeKind::Comment(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A mutable markup tree
///
/// Cloning a document deep-copies every node, detached ones included.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    /// Create a document holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Create a document with an empty `<svg>` document element
    pub fn new_svg() -> Self {
        let mut doc = Self::new();
        let root = doc.root();
        doc.append_child(
            root,
            NodeKind::Element(Element::new("svg").with_attribute("xmlns", SVG_NAMESPACE)),
        );
        doc
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The first element child of the document node
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&c| self.kind(c).as_element().is_some())
    }

    /// Read-only view of a node
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { doc: self, id }
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.kind(id).as_element()
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.kind_mut(id).as_element_mut()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Number of nodes in the arena, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].children.is_empty()
    }

    /// Create a detached node
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a node and append it as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.create(kind);
        self.append(parent, id);
        id
    }

    /// Move `child` to the end of `parent`'s children
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Unlink a node from its parent. Returns `false` if it had none.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.nodes[id.0].parent.take() else {
            return false;
        };
        self.nodes[parent.0].children.retain(|&c| c != id);
        true
    }

    /// Detach every child of a node
    pub fn remove_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Set an attribute on an element. Returns `false` for other node kinds.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> bool {
        match self.element_mut(id) {
            Some(element) => {
                element.set_attribute(name, value);
                true
            }
            None => false,
        }
    }

    /// Remove an attribute from an element, returning its old value
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id)?.remove_attribute(name)
    }

    /// Set a style declaration on a stylable element. Returns `false` otherwise.
    pub fn set_style_property(&mut self, id: NodeId, name: &str, value: &str) -> bool {
        match self.element_mut(id) {
            Some(element) if element.is_stylable() => {
                element.set_style_property(name, value);
                true
            }
            _ => false,
        }
    }

    /// Replace the text content of a node.
    ///
    /// Elements lose all their children and receive a single text node
    /// (none if `text` is empty). Text, CDATA and comment nodes get their
    /// payload replaced. Other kinds are left untouched.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        match self.kind_mut(id) {
            NodeKind::Element(_) => {
                self.remove_children(id);
                if !text.is_empty() {
                    self.append_child(id, NodeKind::Text(text.to_string()));
                }
            }
            NodeKind::Text(t) | NodeKind::CData(t) | NodeKind::Comment(t) => {
                *t = text.to_string();
            }
            _ => {}
        }
    }

    /// Deep-copy a subtree of another document and append it to `parent`
    pub fn import_subtree(&mut self, parent: NodeId, source: &Document, node: NodeId) -> NodeId {
        let copy = self.append_child(parent, source.kind(node).clone());
        for &child in source.children(node) {
            self.import_subtree(copy, source, child);
        }
        copy
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of one node of a [`Document`]
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn kind(&self) -> &'a NodeKind {
        self.doc.kind(self.id)
    }

    pub fn node_type(&self) -> NodeType {
        self.kind().node_type()
    }

    pub fn element(&self) -> Option<&'a Element> {
        self.kind().as_element()
    }

    /// Tag name, for element nodes
    pub fn tag_name(&self) -> Option<&'a str> {
        self.element().map(Element::name)
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.element()?.attribute(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.element().is_some_and(|e| e.has_attribute(name))
    }

    /// The `id` attribute, for element nodes
    pub fn id_attribute(&self) -> Option<&'a str> {
        self.element()?.id()
    }

    pub fn is_stylable(&self) -> bool {
        self.element().is_some_and(Element::is_stylable)
    }

    pub fn is_image(&self) -> bool {
        self.element().is_some_and(Element::is_image)
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.doc.parent(self.id).map(|id| self.doc.node(id))
    }

    /// Whether the node currently hangs off a parent
    pub fn is_attached(&self) -> bool {
        self.doc.parent(self.id).is_some()
    }

    /// Parent, grandparent, and so on up to the root
    pub fn ancestors(&self) -> impl Iterator<Item = NodeRef<'a>> {
        std::iter::successors(self.parent(), |n| n.parent())
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let doc = self.doc;
        doc.children(self.id).iter().map(move |&c| doc.node(c))
    }

    /// Concatenated text of all descendant text and CDATA nodes
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(*self, &mut out);
        out
    }
}

fn collect_text(node: NodeRef<'_>, out: &mut String) {
    match node.kind() {
        NodeKind::Text(t) | NodeKind::CData(t) => out.push_str(t),
        NodeKind::Element(_) | NodeKind::Document => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
        _ => {}
    }
}
