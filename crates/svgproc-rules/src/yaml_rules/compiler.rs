//! Translation of parsed rule files into builder configuration
//!
//! Patterns and expressions are compiled once, up front, so that a branch
//! configuration only replays ready-made values each time it is taken.

use std::sync::Arc;

use svgproc_core::NodeType;

use super::loader::LoadError;
use super::schema::{Action, Comparison, ConditionPattern, FilterPattern, NodePattern, PropertyExpr, RuleSpec};
use crate::builder::{Guard, RuleBuilder};
use crate::embed::ResourceLoader;
use crate::filter::{self, Filter};
use crate::processors::DEFAULT_IMAGE_MEDIA;
use crate::property::{flag_of, literally, property, Condition, Property};

/// A compiled leaf rule
#[derive(Clone)]
enum CompiledAction {
    SetText(Property),
    SetAttr(Property, Property),
    RemoveAttr(Property),
    SetCss(Property, Property),
    RemoveNode,
    EmbedImage(Property, Property),
    PrintNodeType,
}

/// A compiled rule block, ready to configure a builder
#[derive(Clone)]
pub struct CompiledBlock {
    inherit: bool,
    stop_traverse: bool,
    actions: Vec<CompiledAction>,
    branches: Vec<(Guard, Arc<CompiledBlock>)>,
    loader: Arc<dyn ResourceLoader>,
}

impl CompiledBlock {
    /// Compile the top level of a rule file
    pub fn top_level(
        actions: &[Action],
        rules: &[RuleSpec],
        stop_traverse: bool,
        loader: Arc<dyn ResourceLoader>,
    ) -> Result<Self, LoadError> {
        Ok(Self {
            inherit: false,
            stop_traverse,
            actions: actions.iter().map(compile_action).collect(),
            branches: compile_branches(rules, &loader)?,
            loader,
        })
    }

    fn nested(spec: &RuleSpec, loader: &Arc<dyn ResourceLoader>) -> Result<Self, LoadError> {
        Ok(Self {
            inherit: spec.inherit,
            stop_traverse: spec.stop_traverse,
            actions: spec.actions.iter().map(compile_action).collect(),
            branches: compile_branches(&spec.rules, loader)?,
            loader: loader.clone(),
        })
    }

    /// Replay this block onto `builder`: inherited processors first, then
    /// the block's own actions and nested branches
    pub fn configure(&self, builder: &mut RuleBuilder<'_>) {
        if self.inherit {
            builder.inherit();
        }
        for action in &self.actions {
            self.apply_action(builder, action);
        }
        for (guard, block) in &self.branches {
            let block = block.clone();
            builder.when(guard.clone(), move |r| block.configure(r));
        }
        if self.stop_traverse {
            builder.stop_traverse();
        }
    }

    fn apply_action(&self, builder: &mut RuleBuilder<'_>, action: &CompiledAction) {
        match action {
            CompiledAction::SetText(text) => {
                builder.set_text_content(text);
            }
            CompiledAction::SetAttr(name, value) => {
                builder.set_attr(name, value);
            }
            CompiledAction::RemoveAttr(name) => {
                builder.remove_attr(name);
            }
            CompiledAction::SetCss(name, value) => {
                builder.set_css(name, value);
            }
            CompiledAction::RemoveNode => {
                builder.remove_node();
            }
            CompiledAction::EmbedImage(file, media) => {
                builder.embed_image_href(file, media, self.loader.clone());
            }
            CompiledAction::PrintNodeType => {
                builder.print_node_type();
            }
        }
    }
}

fn compile_branches(
    rules: &[RuleSpec],
    loader: &Arc<dyn ResourceLoader>,
) -> Result<Vec<(Guard, Arc<CompiledBlock>)>, LoadError> {
    rules
        .iter()
        .map(|spec| {
            let guard = compile_guard(spec)?;
            let block = CompiledBlock::nested(spec, loader)?;
            Ok((guard, Arc::new(block)))
        })
        .collect()
}

fn compile_guard(spec: &RuleSpec) -> Result<Guard, LoadError> {
    match (&spec.match_pattern, &spec.when, spec.otherwise) {
        (Some(pattern), None, false) => Ok(Guard::Filter(compile_filter(pattern)?)),
        (None, Some(condition), false) => Ok(Guard::Condition(compile_condition(condition)?)),
        (None, None, true) => Ok(Guard::Filter(filter::any())),
        _ => Err(LoadError::Validation(
            "exactly one of 'match', 'when' or 'otherwise' is required".to_string(),
        )),
    }
}

fn compile_action(action: &Action) -> CompiledAction {
    match action {
        Action::SetText(text) => CompiledAction::SetText(compile_property(text)),
        Action::SetAttr { name, value } => {
            CompiledAction::SetAttr(compile_property(name), compile_property(value))
        }
        Action::RemoveAttr(name) => CompiledAction::RemoveAttr(compile_property(name)),
        Action::SetCss { name, value } => {
            CompiledAction::SetCss(compile_property(name), compile_property(value))
        }
        Action::RemoveNode => CompiledAction::RemoveNode,
        Action::EmbedImage { file, media } => CompiledAction::EmbedImage(
            compile_property(file),
            media
                .as_ref()
                .map(compile_property)
                .unwrap_or_else(|| literally(DEFAULT_IMAGE_MEDIA)),
        ),
        Action::PrintNodeType => CompiledAction::PrintNodeType,
    }
}

/// Compile a structural pattern into a filter
pub fn compile_filter(pattern: &FilterPattern) -> Result<Filter, LoadError> {
    match pattern {
        FilterPattern::Any { any } => {
            let filters = any.iter().map(compile_filter).collect::<Result<Vec<_>, _>>()?;
            // An empty alternative list matches nothing
            Ok(filters
                .into_iter()
                .reduce(|acc, f| acc | f)
                .unwrap_or_else(|| Filter::new(|_| false)))
        }
        FilterPattern::All { all } => {
            let filters = all.iter().map(compile_filter).collect::<Result<Vec<_>, _>>()?;
            Ok(filters.into_iter().fold(filter::any(), |acc, f| acc & f))
        }
        FilterPattern::Node(node) => compile_node(node),
    }
}

fn compile_node(node: &NodePattern) -> Result<Filter, LoadError> {
    let mut parts = Vec::new();

    if let Some(kind) = &node.kind {
        let node_type = NodeType::from_name(kind)
            .ok_or_else(|| LoadError::Validation(format!("unknown node kind '{}'", kind)))?;
        parts.push(filter::type_is(node_type));
    }
    if let Some(tag) = &node.tag {
        parts.push(filter::tag_is(tag.as_str()));
    }
    if let Some(id) = &node.id {
        parts.push(filter::id_is(id.as_str()));
    }
    match (&node.attr, &node.value) {
        (Some(attr), Some(value)) => parts.push(filter::has_attr_value(attr.as_str(), value.as_str())),
        (Some(attr), None) => parts.push(filter::has_attr(attr.as_str())),
        (None, Some(_)) => return Err(LoadError::Validation("'value' requires 'attr'".to_string())),
        (None, None) => {}
    }
    if let Some(class) = &node.class {
        parts.push(filter::has_class(class.as_str()));
    }
    if let Some(parent) = &node.parent {
        parts.push(filter::parent_matches(compile_filter(parent)?));
    }
    if let Some(ancestor) = &node.ancestor {
        parts.push(filter::any_parent_matches(compile_filter(ancestor)?));
    }

    Ok(parts.into_iter().reduce(|acc, f| acc & f).unwrap_or_else(filter::any))
}

/// Compile a property pattern into a condition
pub fn compile_condition(pattern: &ConditionPattern) -> Result<Condition, LoadError> {
    match pattern {
        ConditionPattern::All { all } => {
            let conditions = all.iter().map(compile_condition).collect::<Result<Vec<_>, _>>()?;
            Ok(conditions.into_iter().fold(Condition::always(), |acc, c| acc & c))
        }
        ConditionPattern::Any { any } => {
            let conditions = any.iter().map(compile_condition).collect::<Result<Vec<_>, _>>()?;
            Ok(conditions.into_iter().fold(!Condition::always(), |acc, c| acc | c))
        }
        ConditionPattern::Not { not } => Ok(!compile_condition(not)?),
        ConditionPattern::Compare(comparison) => compile_comparison(comparison),
    }
}

fn compile_comparison(cmp: &Comparison) -> Result<Condition, LoadError> {
    let value = compile_property(&cmp.value);

    if let Some(other) = &cmp.equals {
        return Ok(value.equals(compile_property(other)));
    }
    if let Some(other) = &cmp.not_equals {
        return Ok(value.not_equals(compile_property(other)));
    }
    if let Some(other) = &cmp.equals_ignore_case {
        return Ok(value.equals_ignore_case(compile_property(other)));
    }
    if let Some(other) = &cmp.not_equals_ignore_case {
        return Ok(value.not_equals_ignore_case(compile_property(other)));
    }
    if let Some(pattern) = &cmp.matches {
        return Ok(value.matches(pattern)?);
    }
    if let Some(expected) = cmp.is {
        return Ok(flag_of(expected, &value));
    }
    Err(LoadError::Validation("comparison needs an operator".to_string()))
}

/// Compile a string expression into a property
pub fn compile_property(expr: &PropertyExpr) -> Property {
    match expr {
        PropertyExpr::Literal(text) => literally(text.as_str()),
        PropertyExpr::Property { property: name } => property(name.as_str()),
        PropertyExpr::Concat { concat } => concat
            .iter()
            .map(compile_property)
            .fold(literally(""), |acc, p| acc + p),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Context;
    use crate::provider::Provider;
    use svgproc_core::parse;

    fn filter_from(yaml: &str) -> Filter {
        let pattern: FilterPattern = serde_yaml::from_str(yaml).unwrap();
        compile_filter(&pattern).unwrap()
    }

    fn condition_from(yaml: &str) -> Result<Condition, LoadError> {
        let pattern: ConditionPattern = serde_yaml::from_str(yaml).unwrap();
        compile_condition(&pattern)
    }

    #[test]
    fn test_node_pattern_keys_are_anded() {
        let doc = parse(r#"<svg><g id="icons"><rect id="a" class="x"/><rect id="b"/></g></svg>"#).unwrap();
        let svg = doc.document_element().unwrap();
        let g = doc.children(svg)[0];
        let (a, b) = (doc.children(g)[0], doc.children(g)[1]);

        let filter = filter_from("{ tag: rect, class: x, parent: { id: icons } }");
        assert!(filter.applies_to(doc.node(a)));
        assert!(!filter.applies_to(doc.node(b)));

        let anywhere = filter_from("{ ancestor: { tag: svg } }");
        assert!(anywhere.applies_to(doc.node(b)));
        assert!(!anywhere.applies_to(doc.node(svg)));
    }

    #[test]
    fn test_empty_pattern_matches_anything() {
        let doc = parse("<svg/>").unwrap();
        assert!(filter_from("{}").applies_to(doc.node(doc.root())));
        assert!(!filter_from("{ any: [] }").applies_to(doc.node(doc.root())));
        assert!(filter_from("{ all: [] }").applies_to(doc.node(doc.root())));
    }

    #[test]
    fn test_kind_and_attr_value() {
        let doc = parse(r#"<svg fill="red">t</svg>"#).unwrap();
        let svg = doc.document_element().unwrap();
        let text = doc.children(svg)[0];
        assert!(filter_from("{ kind: text }").applies_to(doc.node(text)));
        assert!(filter_from("{ attr: fill, value: red }").applies_to(doc.node(svg)));
        assert!(!filter_from("{ attr: fill, value: blue }").applies_to(doc.node(svg)));
    }

    #[test]
    fn test_conditions() {
        let p = Provider::from_pairs([("dark", "True"), ("mode", "screen"), ("n", "#4")]);
        let cx = Context::new(&p);

        let dark = condition_from("{ value: { property: dark }, is: true }").unwrap();
        assert!(cx.check(&dark));

        let combined = condition_from(
            "{ all: [ { value: { property: n }, matches: '#\\d+' }, { not: { value: { property: mode }, equals: print } } ] }",
        )
        .unwrap();
        assert!(cx.check(&combined));

        let none = condition_from("{ any: [] }").unwrap();
        assert!(!cx.check(&none));
    }

    #[test]
    fn test_bad_regex_is_a_pattern_error() {
        let err = condition_from("{ value: x, matches: '(' }").err().unwrap();
        assert!(matches!(err, LoadError::Pattern(_)));
    }

    #[test]
    fn test_concat_property() {
        let expr: PropertyExpr =
            serde_yaml::from_str(r#"{ concat: [{ property: first }, " ", { property: last }] }"#).unwrap();
        let p = Provider::from_pairs([("first", "Ada"), ("last", "Lovelace")]);
        assert_eq!(Context::new(&p).eval(&compile_property(&expr)), "Ada Lovelace");
    }
}
