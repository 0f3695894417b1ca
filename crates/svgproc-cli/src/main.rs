//! svgproc CLI - rule-based SVG rewriting
//!
//! Applies YAML rule files to SVG files or directories of SVG files:
//! - check mode (default) shows what would change
//! - fix mode writes the result in place, or under `--output DIR`

mod config;
mod output;
mod process;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::{parse_key_val, Config};
use output::{EditInfo, OutputFormat, Reporter};
use process::{destination, process_file, write_file};
use svgproc_rules::{load_rules_from_file, LoadedRules, Provider};

#[derive(Parser)]
#[command(name = "svgproc")]
#[command(version)]
#[command(about = "Rewrite SVG files with declarative rules")]
#[command(author = "svgproc contributors")]
struct Cli {
    /// Files or directories to process
    #[arg(required_unless_present = "list_rules")]
    paths: Vec<PathBuf>,

    /// Show changes without writing them (default mode)
    #[arg(long, conflicts_with = "fix")]
    check: bool,

    /// Write the rewritten files
    #[arg(long, conflicts_with = "check")]
    fix: bool,

    /// Show verbose output and debug logs
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Rule files to apply, in order (can be given multiple times). Overrides config file.
    #[arg(long = "rules", short = 'r', value_name = "FILE")]
    rules: Vec<PathBuf>,

    /// Set a property (can be given multiple times)
    #[arg(long = "set", short = 's', value_name = "KEY=VALUE", value_parser = parse_key_val)]
    set: Vec<(String, String)>,

    /// Output format: text, json, diff
    #[arg(long, value_name = "FORMAT")]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(long, conflicts_with = "format")]
    json: bool,

    /// Directory to write fixed files to instead of rewriting them in place
    #[arg(long, short = 'o', value_name = "DIR", requires = "fix")]
    output: Option<PathBuf>,

    /// Path to config file (default: auto-detect .svgproc.toml)
    #[arg(long, value_name = "PATH", conflicts_with = "no_config")]
    config: Option<PathBuf>,

    /// Ignore config files
    #[arg(long)]
    no_config: bool,

    /// List the loaded rule files and exit
    #[arg(long)]
    list_rules: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Load config file
    let (config, config_path) = if cli.no_config {
        (Config::default(), None)
    } else if let Some(config_path) = &cli.config {
        (Config::load_path(config_path)?, Some(config_path.clone()))
    } else {
        match Config::load()? {
            Some((cfg, path)) => (cfg, Some(path)),
            None => (Config::default(), None),
        }
    };

    // Determine output format: flags, then config, then text
    let output_format = if cli.json {
        OutputFormat::Json
    } else {
        let requested = cli.format.as_deref().or(config.output.format.as_deref()).unwrap_or("text");
        OutputFormat::from_str(requested).ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid output format '{}'. Valid options: text, json, diff",
                requested
            )
        })?
    };

    if let Some(path) = &config_path {
        debug!(config = %path.display(), "using config");
        if cli.verbose && output_format == OutputFormat::Text {
            println!("{}: {}", "Using config".bold(), path.display());
        }
    }

    let config_dir = config_path.as_deref().and_then(Path::parent);
    let rule_files = config.effective_rule_files(config_dir, &cli.rules);
    if rule_files.is_empty() {
        eprintln!(
            "{}: No rule files given. Use --rules or [rules] files in {}",
            "Error".red(),
            config::CONFIG_FILE_NAME
        );
        return Ok(ExitCode::from(1));
    }

    let rule_sets = rule_files
        .iter()
        .map(|path| {
            load_rules_from_file(path)
                .with_context(|| format!("Failed to load rule file {}", path.display()))
        })
        .collect::<Result<Vec<LoadedRules>>>()?;

    // Handle --list-rules
    if cli.list_rules {
        println!("{}", "Loaded rule files:".bold());
        for (rules, path) in rule_sets.iter().zip(&rule_files) {
            println!("  {} - {} ({})", rules.name().green(), rules.description(), path.display());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let properties = Provider::from_iter(config.effective_properties(&cli.set)?);

    // Determine mode: fix or check (check is default)
    let fix_mode = cli.fix;
    let check_mode = !fix_mode;

    if cli.verbose && output_format == OutputFormat::Text {
        println!("{}: {}", "Mode".bold(), if fix_mode { "fix" } else { "check" });
        println!(
            "{}: {}",
            "Rules".bold(),
            rule_sets.iter().map(LoadedRules::name).collect::<Vec<_>>().join(", ")
        );
        println!();
    }

    // Collect all file paths first, each with the input root it came from
    let mut file_paths: Vec<(PathBuf, PathBuf)> = Vec::new();
    let mut missing_paths: Vec<PathBuf> = Vec::new();

    for path in &cli.paths {
        if path.is_file() {
            file_paths.push((path.clone(), path.clone()));
        } else if path.is_dir() {
            for entry in walkdir::WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "svg"))
            {
                let file_path = entry.path();
                if config.should_exclude(file_path) {
                    debug!(path = %file_path.display(), "excluded");
                } else {
                    file_paths.push((file_path.to_path_buf(), path.clone()));
                }
            }
        } else {
            missing_paths.push(path.clone());
        }
    }

    // Process files in parallel
    let results: Vec<FileResult> = file_paths
        .par_iter()
        .map(|(path, _)| process_file_to_result(path, &rule_sets, &properties))
        .collect();

    // Sort results by path for deterministic output
    let mut sorted_results: Vec<_> = results.into_iter().zip(file_paths.iter()).collect();
    sorted_results.sort_by(|a, b| a.1 .0.cmp(&b.1 .0));

    let mut reporter = Reporter::new(output_format, cli.verbose);
    reporter.expect_rules(rule_sets.iter().map(LoadedRules::name));

    for path in &missing_paths {
        if output_format == OutputFormat::Text {
            eprintln!("{}: Path does not exist: {}", "Warning".yellow(), path.display());
        }
    }

    for (result, (path, root)) in sorted_results {
        let target = destination(path, root, cli.output.as_deref());
        report_result(path, &target, result, fix_mode, &mut reporter)?;
    }

    // Determine exit code
    let summary = reporter.summary();
    let exit_code = if summary.errors > 0 || !missing_paths.is_empty() {
        ExitCode::from(1)
    } else if check_mode && summary.files_with_changes > 0 {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    };

    reporter.finish(check_mode)?;

    Ok(exit_code)
}

/// Result of processing a single file (for parallel processing)
enum FileResult {
    /// No rule file changed the file
    NoChanges,
    /// File has changes to report/apply
    HasChanges {
        edits: Vec<EditInfo>,
        old_source: String,
        new_source: String,
    },
    /// Reading, parsing or applying rules failed
    Error(String),
}

/// Process a file and return a result (no output, suitable for parallel execution)
fn process_file_to_result(path: &Path, rule_sets: &[LoadedRules], properties: &Provider) -> FileResult {
    match process_file(path, rule_sets, properties) {
        Ok(result) => match result.new_source {
            Some(new_source) if !result.edits.is_empty() => FileResult::HasChanges {
                edits: result.edits,
                old_source: result.old_source,
                new_source,
            },
            _ => FileResult::NoChanges,
        },
        Err(e) => FileResult::Error(format!("{:#}", e)),
    }
}

/// Report a file result and optionally write the fixed content
fn report_result(
    path: &Path,
    target: &Path,
    result: FileResult,
    fix_mode: bool,
    reporter: &mut Reporter,
) -> Result<()> {
    match result {
        FileResult::NoChanges => {
            reporter.report_skipped(path);
        }
        FileResult::HasChanges {
            edits,
            old_source,
            new_source,
        } => {
            if fix_mode {
                write_file(target, &new_source)?;
                reporter.report_fix(path, target, edits);
            } else {
                reporter.report_check(path, edits, &old_source, &new_source);
            }
        }
        FileResult::Error(msg) => {
            reporter.report_error(path, &msg);
        }
    }
    Ok(())
}
