//! YAML-based rule files
//!
//! Rule sets can be written as YAML instead of Rust. Each construct maps
//! directly onto the builder API:
//! - `match` is a filter, `when` a condition, `otherwise: true` an
//!   always-taken branch
//! - `actions` are leaf rules, run in order
//! - `inherit` and `stop_traverse` behave as their builder counterparts
//!
//! # Example YAML Rule File
//!
//! ```yaml
//! name: badge
//! description: Fill in a convention badge
//! properties:
//!   role: Convention
//!
//! rules:
//!   - match: { tag: text, id: role }
//!     actions:
//!       - set_text: { property: role }
//!   - when: { value: { property: dark }, is: true }
//!     rules:
//!       - match: { class: bg }
//!         actions:
//!           - set_css: { name: fill, value: "#000" }
//! ```
//!
//! Literal values should be quoted when YAML would read them as a number or
//! a boolean.

pub mod compiler;
pub mod loader;
pub mod schema;

pub use compiler::{compile_condition, compile_filter, compile_property, CompiledBlock};
pub use loader::{
    load_rules_from_file, load_rules_from_string, load_rules_from_string_with_loader,
    validate_rule_string, LoadError, LoadedRules,
};
pub use schema::{Action, Comparison, ConditionPattern, FilterPattern, NodePattern, PropertyExpr, RuleFile, RuleSpec};
