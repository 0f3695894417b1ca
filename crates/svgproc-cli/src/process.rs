//! File processing logic for svgproc

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use svgproc_core::parse;
use svgproc_rules::{LoadedRules, Provider};

use crate::output::EditInfo;

/// Result of processing a single file
pub struct ProcessResult {
    /// Rule files that changed the document
    pub edits: Vec<EditInfo>,
    /// Input as re-serialized before any rule ran
    pub old_source: String,
    /// Rewritten content (only if some rule file changed it)
    pub new_source: Option<String>,
}

/// Apply every rule file, in order, to a single SVG file
pub fn process_file(path: &Path, rule_sets: &[LoadedRules], properties: &Provider) -> Result<ProcessResult> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    process_source(&source, rule_sets, properties)
        .with_context(|| format!("Failed to process {}", path.display()))
}

/// Apply every rule file, in order, to SVG source text
pub fn process_source(source: &str, rule_sets: &[LoadedRules], properties: &Provider) -> Result<ProcessResult> {
    let mut doc = parse(source).context("Invalid SVG")?;

    let mut edits = Vec::new();
    // Baseline is the re-serialized input, not the raw text
    let baseline = doc.to_xml();
    let mut current = baseline.clone();
    for rules in rule_sets {
        rules
            .apply(&mut doc, properties)
            .with_context(|| format!("Rule file '{}' failed", rules.name()))?;

        let rendered = doc.to_xml();
        if rendered != current {
            edits.push(EditInfo {
                rule: rules.name().to_string(),
                line: first_changed_line(&current, &rendered),
                message: if rules.description().is_empty() {
                    format!("Applied {}", rules.name())
                } else {
                    rules.description().to_string()
                },
            });
            current = rendered;
        }
    }

    let new_source = (!edits.is_empty()).then_some(current);
    Ok(ProcessResult {
        edits,
        old_source: baseline,
        new_source,
    })
}

/// Where the processed content of `path` is written.
///
/// Without an output directory files are rewritten in place. Otherwise the
/// file lands in `output_dir` under its path relative to `input_root`.
pub fn destination(path: &Path, input_root: &Path, output_dir: Option<&Path>) -> PathBuf {
    match output_dir {
        None => path.to_path_buf(),
        Some(out) => {
            let relative = path
                .strip_prefix(input_root)
                .ok()
                .filter(|r| !r.as_os_str().is_empty())
                .or_else(|| path.file_name().map(Path::new))
                .unwrap_or(path);
            out.join(relative)
        }
    }
}

/// Write the processed result to the file
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write file: {}", path.display()))
}

/// First line (1-based) where the two texts differ
fn first_changed_line(old: &str, new: &str) -> usize {
    let mut old_lines = old.lines();
    let mut new_lines = new.lines();
    let mut line = 1;
    loop {
        match (old_lines.next(), new_lines.next()) {
            (Some(a), Some(b)) if a == b => line += 1,
            _ => return line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use svgproc_rules::load_rules_from_string;
    use tempfile::TempDir;

    const RULES: &str = r#"
name: role
description: Set the role text
rules:
  - match: { id: role }
    actions:
      - set_text: { property: role }
"#;

    const SOURCE: &str = "<svg>\n  <text id=\"role\">Role</text>\n</svg>\n";

    #[test]
    fn test_first_changed_line() {
        assert_eq!(first_changed_line("a\nb\nc", "a\nx\nc"), 2);
        assert_eq!(first_changed_line("a", "x"), 1);
        assert_eq!(first_changed_line("a\nb", "a\nb\nc"), 3);
    }

    #[test]
    fn test_process_source_reports_changes() {
        let rules = vec![load_rules_from_string(RULES).unwrap()];
        let properties = Provider::from_pairs([("role", "Speaker")]);

        let result = process_source(SOURCE, &rules, &properties).unwrap();
        assert_eq!(result.edits.len(), 1);
        assert_eq!(result.edits[0].rule, "role");
        assert_eq!(result.edits[0].line, 2);
        assert_eq!(result.edits[0].message, "Set the role text");
        assert_eq!(
            result.new_source.as_deref(),
            Some("<svg>\n  <text id=\"role\">Speaker</text>\n</svg>\n")
        );
    }

    #[test]
    fn test_process_source_without_changes() {
        let rules = vec![load_rules_from_string(RULES).unwrap()];
        let properties = Provider::from_pairs([("role", "Role")]);

        let result = process_source(SOURCE, &rules, &properties).unwrap();
        assert!(result.edits.is_empty());
        assert!(result.new_source.is_none());
    }

    #[test]
    fn test_old_source_is_normalized() {
        let rules = vec![load_rules_from_string(RULES).unwrap()];
        let source = "<svg>\n  <g></g>\n  <text id='role'>Role</text>\n</svg>\n";

        let result = process_source(source, &rules, &Provider::from_pairs([("role", "Crew")])).unwrap();
        assert_eq!(
            result.old_source,
            "<svg>\n  <g/>\n  <text id=\"role\">Role</text>\n</svg>\n"
        );
        assert_eq!(
            result.new_source.as_deref(),
            Some("<svg>\n  <g/>\n  <text id=\"role\">Crew</text>\n</svg>\n")
        );
        assert_eq!(result.edits[0].line, 3);
    }

    #[test]
    fn test_invalid_svg_is_an_error() {
        let rules = vec![load_rules_from_string(RULES).unwrap()];
        let err = process_source("<svg><g></svg>", &rules, &Provider::empty()).err().unwrap();
        assert!(format!("{:#}", err).contains("Invalid SVG"));
    }

    #[test]
    fn test_process_file_and_write() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in").join("badge.svg");
        fs::create_dir_all(input.parent().unwrap()).unwrap();
        fs::write(&input, SOURCE).unwrap();

        let rules = vec![load_rules_from_string(RULES).unwrap()];
        let result = process_file(&input, &rules, &Provider::from_pairs([("role", "Crew")])).unwrap();

        let out_dir = temp.path().join("out");
        let target = destination(&input, &temp.path().join("in"), Some(&out_dir));
        assert_eq!(target, out_dir.join("badge.svg"));

        write_file(&target, result.new_source.as_deref().unwrap()).unwrap();
        assert!(fs::read_to_string(&target).unwrap().contains(">Crew</text>"));
        assert_eq!(fs::read_to_string(&input).unwrap(), SOURCE);
    }

    #[test]
    fn test_destination() {
        let file = Path::new("icons/a/logo.svg");
        assert_eq!(destination(file, Path::new("icons"), None), file);
        assert_eq!(
            destination(file, Path::new("icons"), Some(Path::new("dist"))),
            PathBuf::from("dist/a/logo.svg")
        );
        // A single file given directly keeps only its name
        assert_eq!(
            destination(file, file, Some(Path::new("dist"))),
            PathBuf::from("dist/logo.svg")
        );
    }
}
