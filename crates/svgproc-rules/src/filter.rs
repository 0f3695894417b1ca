//! Structural predicates over a single node
//!
//! Filters only see the shape of the tree around a node. They have no
//! access to properties; use a [`Condition`](crate::Condition) for that.

use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::sync::Arc;

use svgproc_core::{NodeRef, NodeType};

/// A pure predicate over a node
#[derive(Clone)]
pub struct Filter(Arc<dyn Fn(NodeRef<'_>) -> bool + Send + Sync>);

impl Filter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(NodeRef<'_>) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn applies_to(&self, node: NodeRef<'_>) -> bool {
        (self.0)(node)
    }

    /// Passes only if both filters pass. `other` is not consulted if `self` fails.
    pub fn and(&self, other: &Filter) -> Filter {
        let (left, right) = (self.clone(), other.clone());
        Filter::new(move |n| left.applies_to(n) && right.applies_to(n))
    }

    /// Passes if either filter passes. `other` is not consulted if `self` passes.
    pub fn or(&self, other: &Filter) -> Filter {
        let (left, right) = (self.clone(), other.clone());
        Filter::new(move |n| left.applies_to(n) || right.applies_to(n))
    }
}

impl BitAnd for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Filter) -> Filter {
        self.and(&rhs)
    }
}

impl BitOr for Filter {
    type Output = Filter;

    fn bitor(self, rhs: Filter) -> Filter {
        self.or(&rhs)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Filter(..)")
    }
}

/// Matches every node
pub fn any() -> Filter {
    Filter::new(|_| true)
}

/// Matches nodes of the given kind
pub fn type_is(node_type: NodeType) -> Filter {
    Filter::new(move |n| n.node_type() == node_type)
}

/// Matches elements that can carry presentation styles
pub fn stylable() -> Filter {
    Filter::new(|n| n.is_stylable())
}

/// Matches `<image>` elements
pub fn image() -> Filter {
    Filter::new(|n| n.is_image())
}

/// Matches elements with the given tag name
pub fn tag_is(name: impl Into<String>) -> Filter {
    let name = name.into();
    Filter::new(move |n| n.tag_name() == Some(name.as_str()))
}

/// Matches elements whose `id` attribute equals `id`
pub fn id_is(id: impl Into<String>) -> Filter {
    let id = id.into();
    Filter::new(move |n| n.id_attribute() == Some(id.as_str()))
}

/// Matches elements that have the attribute, with any value
pub fn has_attr(name: impl Into<String>) -> Filter {
    let name = name.into();
    Filter::new(move |n| n.has_attribute(&name))
}

/// Matches elements that have the attribute with exactly this value
pub fn has_attr_value(name: impl Into<String>, value: impl Into<String>) -> Filter {
    let (name, value) = (name.into(), value.into());
    Filter::new(move |n| n.attribute(&name) == Some(value.as_str()))
}

/// Matches stylable elements listing `class` in their `class` attribute
pub fn has_class(class: impl Into<String>) -> Filter {
    let class = class.into();
    Filter::new(move |n| {
        n.element()
            .is_some_and(|e| e.is_stylable() && e.has_class(&class))
    })
}

/// Matches nodes whose direct parent matches `filter`.
///
/// A node without a parent never matches.
pub fn parent_matches(filter: Filter) -> Filter {
    Filter::new(move |n| n.parent().is_some_and(|p| filter.applies_to(p)))
}

/// Matches nodes with at least one ancestor matching `filter`
pub fn any_parent_matches(filter: Filter) -> Filter {
    Filter::new(move |n| n.ancestors().any(|a| filter.applies_to(a)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use svgproc_core::{parse, Document, NodeId};

    const SOURCE: &str = r#"<svg id="root"><g id="layer" class="a b"><text id="t" data-x="1">hi</text></g><title class="a">t</title><metadata class="a"/><sodipodi:namedview class="a"/></svg>"#;

    fn find(doc: &Document, id: &str) -> NodeId {
        fn walk(doc: &Document, node: NodeId, id: &str) -> Option<NodeId> {
            if doc.node(node).id_attribute() == Some(id) {
                return Some(node);
            }
            doc.children(node).iter().find_map(|&c| walk(doc, c, id))
        }
        walk(doc, doc.root(), id).unwrap()
    }

    #[test]
    fn test_tag_and_id() {
        let doc = parse(SOURCE).unwrap();
        let text = doc.node(find(&doc, "t"));
        assert!(tag_is("text").applies_to(text));
        assert!(!tag_is("g").applies_to(text));
        assert!(id_is("t").applies_to(text));
        assert!(!id_is("t").applies_to(doc.node(doc.root())));
    }

    #[test]
    fn test_type_is() {
        let doc = parse(SOURCE).unwrap();
        let text = find(&doc, "t");
        let leaf = doc.node(doc.children(text)[0]);
        assert!(type_is(NodeType::Text).applies_to(leaf));
        assert!(type_is(NodeType::Document).applies_to(doc.node(doc.root())));
        assert!(!tag_is("text").applies_to(leaf));
    }

    #[test]
    fn test_attributes() {
        let doc = parse(SOURCE).unwrap();
        let text = doc.node(find(&doc, "t"));
        assert!(has_attr("data-x").applies_to(text));
        assert!(has_attr_value("data-x", "1").applies_to(text));
        assert!(!has_attr_value("data-x", "2").applies_to(text));
        assert!(!has_attr("data-y").applies_to(text));
    }

    #[test]
    fn test_class_requires_stylable() {
        let doc = parse(SOURCE).unwrap();
        let layer = doc.node(find(&doc, "layer"));
        assert!(has_class("a").applies_to(layer));
        assert!(has_class("b").applies_to(layer));
        assert!(!has_class("a b").applies_to(layer));

        let svg = doc.document_element().unwrap();
        let children = doc.children(svg);
        assert!(has_class("a").applies_to(doc.node(children[1])));
        assert!(!has_class("a").applies_to(doc.node(children[2])));
        assert!(!has_class("a").applies_to(doc.node(children[3])));
    }

    #[test]
    fn test_parent_and_ancestor() {
        let doc = parse(SOURCE).unwrap();
        let text = doc.node(find(&doc, "t"));
        assert!(parent_matches(id_is("layer")).applies_to(text));
        assert!(!parent_matches(id_is("root")).applies_to(text));
        assert!(any_parent_matches(id_is("root")).applies_to(text));
        assert!(any_parent_matches(type_is(NodeType::Document)).applies_to(text));
        assert!(!parent_matches(any()).applies_to(doc.node(doc.root())));
    }

    #[test]
    fn test_and_or_short_circuit() {
        let doc = parse(SOURCE).unwrap();
        let node = doc.node(doc.root());
        let calls = Arc::new(AtomicUsize::new(0));
        let counting = {
            let calls = calls.clone();
            Filter::new(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                true
            })
        };

        let never = type_is(NodeType::Text);
        assert!(!(never.clone() & counting.clone()).applies_to(node));
        assert!((any() | counting.clone()).applies_to(node));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!((never | counting).applies_to(node));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
