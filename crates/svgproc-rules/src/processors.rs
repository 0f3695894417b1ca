//! Leaf rules
//!
//! Ready-made transformations registered straight on a [`RuleBuilder`].
//! Each one quietly does nothing on node kinds it does not apply to.

use std::sync::Arc;

use tracing::{debug, info};

use svgproc_core::{Document, NodeId, XLINK_NAMESPACE};

use crate::builder::{Flow, RuleBuilder};
use crate::embed::{to_data_url, FsLoader, ResourceLoader};
use crate::error::ProcessError;
use crate::property::Property;

/// Media type used by [`RuleBuilder::embed_image`]
pub const DEFAULT_IMAGE_MEDIA: &str = "image/png";

impl<'p> RuleBuilder<'p> {
    /// Replace the text content of visited nodes.
    ///
    /// The former children are gone, so this also stops traversal below
    /// the nodes it rewrites.
    pub fn set_text_content(&mut self, text: impl Into<Property>) -> &mut Self {
        let text = text.into();
        self.process(move |cx, doc, node| {
            doc.set_text_content(node, &text.resolve(cx));
            Ok(Flow::Continue)
        });
        self.stop_traverse()
    }

    /// Set an attribute on visited elements
    pub fn set_attr(&mut self, name: impl Into<Property>, value: impl Into<Property>) -> &mut Self {
        let (name, value) = (name.into(), value.into());
        self.process(move |cx, doc, node| {
            let name = name.resolve(cx);
            if !name.is_empty() {
                doc.set_attribute(node, &name, &value.resolve(cx));
            }
            Ok(Flow::Continue)
        })
    }

    /// Remove an attribute from visited elements
    pub fn remove_attr(&mut self, name: impl Into<Property>) -> &mut Self {
        let name = name.into();
        self.process(move |cx, doc, node| {
            doc.remove_attribute(node, &name.resolve(cx));
            Ok(Flow::Continue)
        })
    }

    /// Set a style declaration on visited stylable elements
    pub fn set_css(&mut self, name: impl Into<Property>, value: impl Into<Property>) -> &mut Self {
        let (name, value) = (name.into(), value.into());
        self.process(move |cx, doc, node| {
            let name = name.resolve(cx);
            if !name.is_empty() {
                doc.set_style_property(node, &name, &value.resolve(cx));
            }
            Ok(Flow::Continue)
        })
    }

    /// Detach visited nodes from their parent. Their children are not visited.
    pub fn remove_node(&mut self) -> &mut Self {
        self.process(|_, doc, node| {
            if doc.detach(node) {
                debug!(node = node.index(), "node removed");
            }
            Ok(Flow::Continue)
        })
    }

    /// Replace the link of visited `<image>` elements with the content of
    /// `filename`, inlined as a base64 data URL of type `media`
    pub fn embed_image_href(
        &mut self,
        filename: impl Into<Property>,
        media: impl Into<Property>,
        loader: Arc<dyn ResourceLoader>,
    ) -> &mut Self {
        let (filename, media) = (filename.into(), media.into());
        self.process(move |cx, doc, node| {
            if !doc.node(node).is_image() {
                return Ok(Flow::Continue);
            }

            let name = filename.resolve(cx);
            let href = loader
                .open(&name)
                .and_then(|stream| to_data_url(stream, &media.resolve(cx)))
                .map_err(|source| ProcessError::Resource {
                    name: name.clone(),
                    source,
                })?;

            set_image_href(doc, node, &href);
            debug!(node = node.index(), resource = %name, bytes = href.len(), "image embedded");
            Ok(Flow::Continue)
        })
    }

    /// [`embed_image_href`](RuleBuilder::embed_image_href) as PNG, read from
    /// the local file system
    pub fn embed_image(&mut self, filename: impl Into<Property>) -> &mut Self {
        self.embed_image_href(filename, DEFAULT_IMAGE_MEDIA, Arc::new(FsLoader::new()))
    }

    /// Log the type of every visited node
    pub fn print_node_type(&mut self) -> &mut Self {
        self.process(|_, doc, node| {
            info!(node = node.index(), node_type = doc.node(node).node_type().name(), "visited");
            Ok(Flow::Continue)
        })
    }
}

fn set_image_href(doc: &mut Document, node: NodeId, href: &str) {
    let plain = doc
        .element(node)
        .is_some_and(|e| e.has_attribute("href") && !e.has_attribute("xlink:href"));
    if plain {
        doc.set_attribute(node, "href", href);
        return;
    }

    doc.set_attribute(node, "xlink:href", href);
    declare_xlink(doc, node);
}

/// Make sure `xmlns:xlink` is in scope at `node`, declaring it on the
/// outermost element when no ancestor does
fn declare_xlink(doc: &mut Document, node: NodeId) {
    let current = doc.node(node);
    let in_scope = std::iter::once(current)
        .chain(current.ancestors())
        .any(|n| n.has_attribute("xmlns:xlink"));
    if in_scope {
        return;
    }

    let outermost = std::iter::once(current)
        .chain(current.ancestors())
        .filter(|n| n.element().is_some())
        .last()
        .map(|n| n.id())
        .unwrap_or(node);
    doc.set_attribute(outermost, "xmlns:xlink", XLINK_NAMESPACE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Read};

    use crate::plan::{compile, process_document};
    use crate::property::{literally, property};
    use crate::provider::Provider;
    use crate::filter::{id_is, tag_is};
    use svgproc_core::parse;

    fn run(source: &str, rules: &RuleBuilder<'_>, properties: Provider) -> String {
        let mut doc = parse(source).unwrap();
        process_document(rules, &mut doc, properties).unwrap();
        doc.to_xml()
    }

    fn memory_loader(
        content: &'static [u8],
    ) -> Arc<dyn ResourceLoader> {
        Arc::new(move |_: &str| -> io::Result<Box<dyn Read>> { Ok(Box::new(content)) })
    }

    #[test]
    fn test_set_text_content_from_property() {
        let rules = compile(|r| {
            r.when(id_is("name"), |r| {
                r.set_text_content(property("name"));
            });
        });
        let out = run(
            r#"<svg><text id="name">Old <tspan>value</tspan></text></svg>"#,
            &rules,
            Provider::from_pairs([("name", "Reffurence")]),
        );
        assert_eq!(out, r#"<svg><text id="name">Reffurence</text></svg>"#);
    }

    #[test]
    fn test_set_text_content_stops_traverse() {
        let mut rules = RuleBuilder::new();
        rules.set_text_content("x");
        assert!(!rules.traverses());
    }

    #[test]
    fn test_set_attr_ignores_non_elements_and_empty_names() {
        let rules = compile(|r| {
            r.set_attr("data-a", literally("1"));
            r.set_attr(property("missing"), "2");
        });
        let out = run("<svg>text<!--c--></svg>", &rules, Provider::empty());
        assert_eq!(out, r#"<svg data-a="1">text<!--c--></svg>"#);
    }

    #[test]
    fn test_remove_attr() {
        let rules = compile(|r| {
            r.remove_attr("fill");
        });
        let out = run(r#"<svg><rect fill="red" x="1"/></svg>"#, &rules, Provider::empty());
        assert_eq!(out, r#"<svg><rect x="1"/></svg>"#);
    }

    #[test]
    fn test_set_css_only_on_stylable() {
        let rules = compile(|r| {
            r.set_css("fill", property("color"));
        });
        let out = run(
            r#"<svg><title>t</title><desc>d</desc><metadata/><sodipodi:namedview id="n"/><rect style="stroke:none"/></svg>"#,
            &rules,
            Provider::from_pairs([("color", "#fff")]),
        );
        assert_eq!(
            out,
            concat!(
                r#"<svg style="fill:#fff"><title style="fill:#fff">t</title><desc style="fill:#fff">d</desc>"#,
                r#"<metadata/><sodipodi:namedview id="n"/><rect style="stroke:none;fill:#fff"/></svg>"#
            )
        );
    }

    #[test]
    fn test_remove_node() {
        let rules = compile(|r| {
            r.when(tag_is("g"), |r| {
                r.remove_node();
            });
        });
        let out = run(r#"<svg><g><rect/></g><circle/></svg>"#, &rules, Provider::empty());
        assert_eq!(out, "<svg><circle/></svg>");
    }

    #[test]
    fn test_remove_node_at_root_is_noop() {
        let rules = compile(|r| {
            r.remove_node();
            r.stop_traverse();
        });
        let out = run("<svg/>", &rules, Provider::empty());
        assert_eq!(out, "<svg/>");
    }

    #[test]
    fn test_embed_image_uses_xlink_and_declares_namespace() {
        let loader = memory_loader(b"hi!");
        let rules = compile(move |r| {
            r.when(tag_is("image"), move |r| {
                r.embed_image_href("logo.png", DEFAULT_IMAGE_MEDIA, loader.clone());
            });
        });
        let out = run(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><g><image xlink:href="logo.png"/></g></svg>"#,
            &rules,
            Provider::empty(),
        );
        assert_eq!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><g><image xlink:href="data:image/png;base64,aGkh"/></g></svg>"#
        );
    }

    #[test]
    fn test_embed_image_keeps_plain_href() {
        let loader = memory_loader(b"hi!");
        let rules = compile(move |r| {
            r.embed_image_href("x.jpg", "image/jpeg", loader.clone());
        });
        let out = run(r#"<svg><image href="x.jpg"/></svg>"#, &rules, Provider::empty());
        assert_eq!(out, r#"<svg><image href="data:image/jpeg;base64,aGkh"/></svg>"#);
    }

    #[test]
    fn test_embed_image_resource_error_aborts() {
        let loader: Arc<dyn ResourceLoader> = Arc::new(|name: &str| -> io::Result<Box<dyn Read>> {
            Err(io::Error::new(io::ErrorKind::NotFound, name.to_string()))
        });
        let rules = compile(move |r| {
            r.embed_image_href(property("file"), DEFAULT_IMAGE_MEDIA, loader.clone());
        });
        let mut doc = parse("<svg><image/></svg>").unwrap();
        let err = process_document(&rules, &mut doc, Provider::from_pairs([("file", "a.png")]))
            .unwrap_err();
        let ProcessError::Resource { name, .. } = err;
        assert_eq!(name, "a.png");
    }

    #[test]
    fn test_print_node_type_has_no_effect() {
        let rules = compile(|r| {
            r.print_node_type();
        });
        let source = "<svg><g>t</g></svg>";
        assert_eq!(run(source, &rules, Provider::empty()), source);
    }
}
