//! YAML rule loader
//!
//! Load rule files from disk or strings into a ready-to-apply rule set.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use svgproc_core::{Document, NodeId};

use super::compiler::CompiledBlock;
use super::schema::RuleFile;
use crate::builder::RuleBuilder;
use crate::embed::{FsLoader, ResourceLoader};
use crate::error::ProcessError;
use crate::plan::{apply, process_document};
use crate::provider::Provider;

/// Errors that can occur when loading YAML rules
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid rule: {0}")]
    Validation(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A compiled rule file together with its default properties
pub struct LoadedRules {
    name: String,
    description: String,
    rules: RuleBuilder<'static>,
    defaults: Provider,
}

impl LoadedRules {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The top-level builder
    pub fn rules(&self) -> &RuleBuilder<'static> {
        &self.rules
    }

    /// Properties declared by the rule file itself
    pub fn defaults(&self) -> &Provider {
        &self.defaults
    }

    /// Apply to a whole document. `properties` override the file's defaults.
    pub fn apply(&self, doc: &mut Document, properties: &Provider) -> Result<(), ProcessError> {
        process_document(&self.rules, doc, properties.above(&self.defaults))
    }

    /// Apply to the subtree rooted at `root` only
    pub fn apply_at(
        &self,
        doc: &mut Document,
        root: NodeId,
        properties: &Provider,
    ) -> Result<(), ProcessError> {
        apply(&self.rules, doc, root, properties.above(&self.defaults))
    }
}

impl std::fmt::Debug for LoadedRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedRules")
            .field("name", &self.name)
            .field("rules", &self.rules)
            .finish()
    }
}

/// Load a rule file from a string. Embedded images are read relative to
/// the working directory.
pub fn load_rules_from_string(yaml: &str) -> Result<LoadedRules, LoadError> {
    load_rules_from_string_with_loader(yaml, Arc::new(FsLoader::new()))
}

/// Load a rule file from a string, reading embedded images through `loader`
pub fn load_rules_from_string_with_loader(
    yaml: &str,
    loader: Arc<dyn ResourceLoader>,
) -> Result<LoadedRules, LoadError> {
    let file: RuleFile = serde_yaml::from_str(yaml)?;
    file.validate().map_err(LoadError::Validation)?;

    let block = CompiledBlock::top_level(&file.actions, &file.rules, file.stop_traverse, loader)?;
    let mut rules = RuleBuilder::new();
    block.configure(&mut rules);

    Ok(LoadedRules {
        name: file.name,
        description: file.description,
        rules,
        defaults: Provider::new(file.properties),
    })
}

/// Load a rule file. Embedded images are read relative to the file's directory.
pub fn load_rules_from_file(path: &Path) -> Result<LoadedRules, LoadError> {
    let content = fs::read_to_string(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    load_rules_from_string_with_loader(&content, Arc::new(FsLoader::with_base(base)))
}

/// Validate a rule file without loading it
pub fn validate_rule_string(yaml: &str) -> Result<(), LoadError> {
    let file: RuleFile = serde_yaml::from_str(yaml)?;
    file.validate().map_err(LoadError::Validation)?;
    CompiledBlock::top_level(&file.actions, &file.rules, file.stop_traverse, Arc::new(FsLoader::new()))?;
    Ok(())
}
