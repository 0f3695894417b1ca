//! Report rendering for svgproc
//!
//! Text output lists, per SVG file, which rule files changed it and where.
//! JSON collects the same per-file records plus per-rule-file tallies.
//! Diff output is a plain unified diff and nothing else.

use anyhow::Result;
use colored::*;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeMap;
use std::path::Path;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Diff,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<OutputFormat> {
        match s.to_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            "diff" => Some(OutputFormat::Diff),
            _ => None,
        }
    }
}

/// A rule file that changed a document
#[derive(Debug, Clone, Serialize)]
pub struct EditInfo {
    pub rule: String,
    /// First changed line of the output
    pub line: usize,
    pub message: String,
}

/// What happened to one SVG file
#[derive(Debug, Clone, Serialize)]
pub struct SvgReport {
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub edits: Vec<EditInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SvgReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.display().to_string(),
            edits: Vec::new(),
            written_to: None,
            error: None,
        }
    }
}

/// Totals over one rule file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleTally {
    /// SVG files this rule file changed
    pub files_changed: usize,
}

/// Summary statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub files_processed: usize,
    pub files_with_changes: usize,
    pub total_edits: usize,
    pub errors: usize,
    /// Keyed by rule file name
    pub rules: BTreeMap<String, RuleTally>,
}

/// Full JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput {
    pub version: String,
    pub summary: Summary,
    pub files: Vec<SvgReport>,
}

/// Accumulates per-file results and prints them in the selected format
pub struct Reporter {
    format: OutputFormat,
    verbose: bool,
    reports: Vec<SvgReport>,
    summary: Summary,
}

impl Reporter {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self {
            format,
            verbose,
            reports: Vec::new(),
            summary: Summary::default(),
        }
    }

    /// Register the rule files up front so unused ones still show a zero tally
    pub fn expect_rules<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            self.summary.rules.entry(name.to_string()).or_default();
        }
    }

    /// Report a file that would change (check mode)
    pub fn report_check(&mut self, path: &Path, edits: Vec<EditInfo>, old_source: &str, new_source: &str) {
        self.summary.files_processed += 1;
        if edits.is_empty() {
            self.report_unchanged(path);
            return;
        }
        self.count_edits(&edits);

        match self.format {
            OutputFormat::Text => {
                println!("{}", path.display().to_string().bold());
                print_edits(&edits);
                print_diff(old_source, new_source);
                println!();
            }
            OutputFormat::Diff => print!("{}", unified_diff(path, old_source, new_source)),
            OutputFormat::Json => {}
        }

        let mut report = SvgReport::new(path);
        report.edits = edits;
        self.reports.push(report);
    }

    /// Report a file after its rewritten content went to `target`
    pub fn report_fix(&mut self, path: &Path, target: &Path, edits: Vec<EditInfo>) {
        self.summary.files_processed += 1;
        if edits.is_empty() {
            self.report_unchanged(path);
            return;
        }
        self.count_edits(&edits);

        if self.format == OutputFormat::Text {
            println!("{}", path.display().to_string().bold());
            print_edits(&edits);
            if target != path {
                println!("  {} {}", "written to".dimmed(), target.display());
            }
            println!();
        }

        let mut report = SvgReport::new(path);
        report.edits = edits;
        report.written_to = Some(target.display().to_string());
        self.reports.push(report);
    }

    /// Report a file that no rule file changed
    pub fn report_skipped(&mut self, path: &Path) {
        self.summary.files_processed += 1;
        self.report_unchanged(path);
    }

    /// Report a file that could not be read, parsed or rewritten
    pub fn report_error(&mut self, path: &Path, error: &str) {
        self.summary.files_processed += 1;
        self.summary.errors += 1;

        if self.format == OutputFormat::Text {
            eprintln!("{}: {} - {}", "Warning".yellow(), path.display(), error);
        }

        let mut report = SvgReport::new(path);
        report.error = Some(error.to_string());
        self.reports.push(report);
    }

    fn report_unchanged(&mut self, path: &Path) {
        if self.verbose && self.format == OutputFormat::Text {
            println!("{}: No changes needed", path.display());
        }
        self.reports.push(SvgReport::new(path));
    }

    fn count_edits(&mut self, edits: &[EditInfo]) {
        self.summary.files_with_changes += 1;
        self.summary.total_edits += edits.len();
        for edit in edits {
            self.summary.rules.entry(edit.rule.clone()).or_default().files_changed += 1;
        }
    }

    /// Print the closing summary, or the whole JSON document
    pub fn finish(self, check_mode: bool) -> Result<()> {
        match self.format {
            OutputFormat::Text => {
                let s = &self.summary;
                println!();
                println!("{}", "Summary".bold().underline());
                println!("  Files processed: {}", s.files_processed);
                println!("  Files with changes: {}", s.files_with_changes);
                if s.errors > 0 {
                    println!("  Errors: {}", s.errors.to_string().red());
                }
                if !s.rules.is_empty() {
                    println!("  Rule files:");
                    for (name, tally) in &s.rules {
                        let verb = if check_mode { "would change" } else { "changed" };
                        println!("    {:<24} {} {} file(s)", name.green(), verb, tally.files_changed);
                    }
                }

                if check_mode && s.files_with_changes > 0 {
                    println!();
                    println!("{}", "Run with --fix to apply changes".yellow());
                }
            }
            OutputFormat::Json => {
                let output = JsonOutput {
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    summary: self.summary,
                    files: self.reports,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            // Patch-compatible: nothing after the last hunk
            OutputFormat::Diff => {}
        }
        Ok(())
    }

    /// Get summary for exit code determination
    pub fn summary(&self) -> &Summary {
        &self.summary
    }
}

fn print_edits(edits: &[EditInfo]) {
    for edit in edits {
        println!(
            "  {} {} {}",
            "->".green(),
            format!("{} (line {}):", edit.rule, edit.line).cyan(),
            edit.message
        );
    }
}

/// Print only the changed lines, colored
fn print_diff(old: &str, new: &str) {
    let diff = TextDiff::from_lines(old, new);
    for change in diff.iter_all_changes() {
        let line = change.value().trim_end_matches('\n');
        match change.tag() {
            ChangeTag::Delete => println!("     {}", format!("- {}", line).red()),
            ChangeTag::Insert => println!("     {}", format!("+ {}", line).green()),
            ChangeTag::Equal => {}
        }
    }
}

/// Unified diff (standard diff -u compatible)
fn unified_diff(path: &Path, old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let path_str = path.display().to_string();

    let mut out = format!("--- a/{}\n+++ b/{}\n", path_str, path_str);
    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        out.push_str(&format!("{}\n", hunk.header()));
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            out.push_str(&format!("{}{}", sign, change));
            if change.missing_newline() {
                out.push('\n');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(rule: &str, line: usize) -> EditInfo {
        EditInfo {
            rule: rule.to_string(),
            line,
            message: format!("Applied {}", rule),
        }
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("text"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("diff"), Some(OutputFormat::Diff));
        assert_eq!(OutputFormat::from_str("xml"), None);
    }

    #[test]
    fn test_unified_diff() {
        let diff = unified_diff(
            Path::new("badge.svg"),
            "<svg>\n<text>Role</text>\n</svg>\n",
            "<svg>\n<text>Speaker</text>\n</svg>\n",
        );
        assert!(diff.starts_with("--- a/badge.svg\n+++ b/badge.svg\n"));
        assert!(diff.contains("-<text>Role</text>\n"));
        assert!(diff.contains("+<text>Speaker</text>\n"));
        assert!(diff.contains(" <svg>\n"));
    }

    #[test]
    fn test_reporter_counts() {
        let mut reporter = Reporter::new(OutputFormat::Json, false);
        reporter.report_check(Path::new("a.svg"), vec![edit("badge", 2)], "a\n", "b\n");
        reporter.report_skipped(Path::new("b.svg"));
        reporter.report_error(Path::new("c.svg"), "broken");

        let summary = reporter.summary();
        assert_eq!(summary.files_processed, 3);
        assert_eq!(summary.files_with_changes, 1);
        assert_eq!(summary.total_edits, 1);
        assert_eq!(summary.errors, 1);
    }

    #[test]
    fn test_rule_tallies() {
        let mut reporter = Reporter::new(OutputFormat::Json, false);
        reporter.expect_rules(["badge", "theme", "unused"]);
        reporter.report_fix(
            Path::new("a.svg"),
            Path::new("out/a.svg"),
            vec![edit("badge", 2), edit("theme", 5)],
        );
        reporter.report_fix(Path::new("b.svg"), Path::new("b.svg"), vec![edit("theme", 1)]);

        let rules = &reporter.summary().rules;
        assert_eq!(rules["badge"].files_changed, 1);
        assert_eq!(rules["theme"].files_changed, 2);
        assert_eq!(rules["unused"], RuleTally::default());
        assert_eq!(reporter.summary().total_edits, 3);
        assert_eq!(reporter.reports[0].written_to.as_deref(), Some("out/a.svg"));
    }

    #[test]
    fn test_json_serialization() {
        let mut fixed = SvgReport::new(Path::new("badge.svg"));
        fixed.edits = vec![edit("badge", 3)];
        fixed.written_to = Some("dist/badge.svg".to_string());

        let mut summary = Summary {
            files_processed: 4,
            files_with_changes: 1,
            total_edits: 1,
            ..Default::default()
        };
        summary.rules.insert("badge".to_string(), RuleTally { files_changed: 1 });

        let output = JsonOutput {
            version: "0.1.0".to_string(),
            summary,
            files: vec![fixed, SvgReport::new(Path::new("plain.svg"))],
        };

        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"version\":\"0.1.0\""));
        assert!(json.contains("\"files_processed\":4"));
        assert!(json.contains("\"rules\":{\"badge\":{\"files_changed\":1}}"));
        assert!(json.contains("\"rule\":\"badge\""));
        assert!(json.contains("\"written_to\":\"dist/badge.svg\""));
        assert!(!json.contains("\"error\""));
    }
}
