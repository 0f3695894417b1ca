//! YAML rule schema definitions
//!
//! Defines the structure of YAML rule files using serde for deserialization.
//! Every construct maps onto one builder call or combinator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use svgproc_core::NodeType;

/// A complete rule file: the top-level rule block plus metadata
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleFile {
    /// Rule set identifier (e.g., "badge")
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Default property values, stacked below the ones supplied at apply time
    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    /// Actions run on every node the top-level block visits
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub actions: Vec<Action>,

    /// Guarded rule blocks, tried in order
    #[serde(default)]
    pub rules: Vec<RuleSpec>,

    /// Visit only the node the rules are applied to
    #[serde(default)]
    pub stop_traverse: bool,
}

/// A guarded rule block
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    /// Structural guard tested on the visited node
    #[serde(default, rename = "match")]
    pub match_pattern: Option<FilterPattern>,

    /// Guard tested against the active properties
    #[serde(default)]
    pub when: Option<ConditionPattern>,

    /// Always taken
    #[serde(default)]
    pub otherwise: bool,

    /// Run the enclosing block's actions too
    #[serde(default)]
    pub inherit: bool,

    /// Do not descend below the nodes this block visits
    #[serde(default)]
    pub stop_traverse: bool,

    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub actions: Vec<Action>,

    /// Nested blocks, tried before this block's actions
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// Structural pattern over a node
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FilterPattern {
    /// Match any of multiple patterns (OR)
    Any { any: Vec<FilterPattern> },

    /// Match all patterns (AND)
    All { all: Vec<FilterPattern> },

    /// Match a single node. All given keys must hold; no keys matches anything.
    Node(NodePattern),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NodePattern {
    /// Tag name, prefix included (e.g., "text", "svg:g")
    #[serde(default)]
    pub tag: Option<String>,

    #[serde(default)]
    pub id: Option<String>,

    /// Attribute that must be present
    #[serde(default)]
    pub attr: Option<String>,

    /// Required value of `attr`
    #[serde(default)]
    pub value: Option<String>,

    /// Member of the class list
    #[serde(default)]
    pub class: Option<String>,

    /// Node type name (element, text, cdata, comment, ...)
    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub parent: Option<Box<FilterPattern>>,

    #[serde(default)]
    pub ancestor: Option<Box<FilterPattern>>,
}

/// Boolean pattern over properties
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ConditionPattern {
    All { all: Vec<ConditionPattern> },
    Any { any: Vec<ConditionPattern> },
    Not { not: Box<ConditionPattern> },
    Compare(Comparison),
}

/// A property compared with exactly one operator
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Comparison {
    pub value: PropertyExpr,

    #[serde(default)]
    pub equals: Option<PropertyExpr>,

    #[serde(default)]
    pub not_equals: Option<PropertyExpr>,

    #[serde(default)]
    pub equals_ignore_case: Option<PropertyExpr>,

    #[serde(default)]
    pub not_equals_ignore_case: Option<PropertyExpr>,

    /// Regular expression the whole value must match
    #[serde(default)]
    pub matches: Option<String>,

    /// Compare against "true"/"false", ignoring case
    #[serde(default)]
    pub is: Option<bool>,
}

/// String-valued expression
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PropertyExpr {
    /// Literal string value
    Literal(String),
    /// Named property (e.g., `{ property: role }`)
    Property { property: String },
    /// Concatenation of expressions
    Concat { concat: Vec<PropertyExpr> },
}

/// A leaf rule
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SetText(PropertyExpr),
    SetAttr {
        name: PropertyExpr,
        value: PropertyExpr,
    },
    RemoveAttr(PropertyExpr),
    SetCss {
        name: PropertyExpr,
        value: PropertyExpr,
    },
    RemoveNode,
    EmbedImage {
        file: PropertyExpr,
        #[serde(default)]
        media: Option<PropertyExpr>,
    },
    PrintNodeType,
}

impl RuleFile {
    /// Validate the rule file structure
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Rule name is required".to_string());
        }
        for (index, rule) in self.rules.iter().enumerate() {
            rule.validate()
                .map_err(|e| format!("rules[{}]: {}", index, e))?;
        }
        Ok(())
    }
}

impl RuleSpec {
    pub fn validate(&self) -> Result<(), String> {
        let guards = [self.match_pattern.is_some(), self.when.is_some(), self.otherwise]
            .iter()
            .filter(|g| **g)
            .count();
        match guards {
            0 => return Err("one of 'match', 'when' or 'otherwise' is required".to_string()),
            1 => {}
            _ => return Err("only one of 'match', 'when' or 'otherwise' may be given".to_string()),
        }

        if let Some(pattern) = &self.match_pattern {
            pattern.validate()?;
        }
        if let Some(condition) = &self.when {
            condition.validate()?;
        }
        for (index, rule) in self.rules.iter().enumerate() {
            rule.validate()
                .map_err(|e| format!("rules[{}]: {}", index, e))?;
        }
        Ok(())
    }
}

impl FilterPattern {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            FilterPattern::Any { any: patterns } | FilterPattern::All { all: patterns } => {
                patterns.iter().try_for_each(FilterPattern::validate)
            }
            FilterPattern::Node(node) => node.validate(),
        }
    }
}

impl NodePattern {
    pub fn validate(&self) -> Result<(), String> {
        if self.value.is_some() && self.attr.is_none() {
            return Err("'value' requires 'attr'".to_string());
        }
        if let Some(kind) = &self.kind {
            if NodeType::from_name(kind).is_none() {
                return Err(format!("unknown node kind '{}'", kind));
            }
        }
        if let Some(parent) = &self.parent {
            parent.validate()?;
        }
        if let Some(ancestor) = &self.ancestor {
            ancestor.validate()?;
        }
        Ok(())
    }
}

impl ConditionPattern {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ConditionPattern::All { all: patterns } | ConditionPattern::Any { any: patterns } => {
                patterns.iter().try_for_each(ConditionPattern::validate)
            }
            ConditionPattern::Not { not } => not.validate(),
            ConditionPattern::Compare(comparison) => comparison.validate(),
        }
    }
}

impl Comparison {
    pub fn validate(&self) -> Result<(), String> {
        let operators = [
            self.equals.is_some(),
            self.not_equals.is_some(),
            self.equals_ignore_case.is_some(),
            self.not_equals_ignore_case.is_some(),
            self.matches.is_some(),
            self.is.is_some(),
        ];
        match operators.iter().filter(|o| **o).count() {
            1 => Ok(()),
            0 => Err("comparison needs an operator".to_string()),
            _ => Err("comparison takes exactly one operator".to_string()),
        }
    }
}
