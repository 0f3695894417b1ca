//! svgproc-rules: declarative rewriting of SVG trees
//!
//! Building blocks:
//! - filter: structural predicates over a node (`tag_is`, `id_is`, `has_class`, ...)
//! - property: string and boolean expressions over named values
//! - provider: layered name/value lookup (`Provider::above`)
//! - builder: rule accumulation (`when`, `otherwise`, `inherit`, `stop_traverse`)
//! - plan: compiled rule sets and the traversal that applies them
//! - processors: leaf rules (`set_text_content`, `set_attr`, `set_css`, ...)
//! - yaml_rules: the same rules written as YAML files

pub mod builder;
pub mod embed;
pub mod error;
pub mod filter;
pub mod plan;
pub mod processors;
pub mod property;
pub mod provider;
pub mod svg;
pub mod yaml_rules;

pub use builder::{Branch, Configure, Flow, Guard, NodeProcessor, Processor, RuleBuilder};
pub use embed::{to_data_url, FsLoader, ResourceLoader};
pub use error::ProcessError;
pub use filter::{
    any, any_parent_matches, has_attr, has_attr_value, has_class, id_is, image, parent_matches,
    stylable, tag_is, type_is, Filter,
};
pub use plan::{apply, compile, process_document, ExecutionPlan};
pub use processors::DEFAULT_IMAGE_MEDIA;
pub use property::{flag, flag_of, literally, property, Condition, Context, Property};
pub use provider::{PropertyProvider, Provider};
pub use yaml_rules::{load_rules_from_file, load_rules_from_string, LoadError, LoadedRules};
