//! Configuration file support for svgproc
//!
//! Loads `.svgproc.toml` from current directory or parent directories.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".svgproc.toml";

/// Configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rules: RulesConfig,
    /// Property values handed to every rule file
    pub properties: BTreeMap<String, toml::Value>,
    pub paths: PathsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Rule files to apply, in order, relative to the config file
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Glob patterns to exclude from processing
    pub exclude: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "text", "json" or "diff"
    pub format: Option<String>,
}

impl Config {
    /// Load config from `.svgproc.toml` searching from current directory upward
    pub fn load() -> Result<Option<(Config, PathBuf)>> {
        Self::load_from(std::env::current_dir()?)
    }

    /// Load config searching from the given directory upward
    pub fn load_from(start_dir: PathBuf) -> Result<Option<(Config, PathBuf)>> {
        let mut current = Some(start_dir.as_path());

        while let Some(dir) = current {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                let config = Self::load_path(&config_path)?;
                return Ok(Some((config, config_path)));
            }
            current = dir.parent();
        }

        Ok(None)
    }

    /// Load config from a specific path
    pub fn load_path(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Rule files to load. Files given on the command line replace the
    /// configured ones; configured files are resolved against `config_dir`.
    pub fn effective_rule_files(&self, config_dir: Option<&Path>, cli_files: &[PathBuf]) -> Vec<PathBuf> {
        if !cli_files.is_empty() {
            return cli_files.to_vec();
        }

        self.rules
            .files
            .iter()
            .map(|file| match config_dir {
                Some(dir) if file.is_relative() => dir.join(file),
                _ => file.clone(),
            })
            .collect()
    }

    /// Configured properties, with `--set` values taking precedence
    pub fn effective_properties(&self, cli_set: &[(String, String)]) -> Result<BTreeMap<String, String>> {
        let mut properties = BTreeMap::new();

        for (name, value) in &self.properties {
            let text = match value {
                toml::Value::String(s) => s.clone(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => bail!(
                    "Property '{}' must be a string, number or boolean, found {}",
                    name,
                    other.type_str()
                ),
            };
            properties.insert(name.clone(), text);
        }

        for (name, value) in cli_set {
            properties.insert(name.clone(), value.clone());
        }

        Ok(properties)
    }

    /// Check if a path should be excluded based on config patterns
    pub fn should_exclude(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        for pattern in &self.paths.exclude {
            if let Ok(glob_pattern) = glob::Pattern::new(pattern) {
                if glob_pattern.matches(&path_str) {
                    return true;
                }
                // Also try matching against just the file/dir name
                if let Some(file_name) = path.file_name() {
                    if glob_pattern.matches(&file_name.to_string_lossy()) {
                        return true;
                    }
                }
            }

            if pattern.ends_with('/') {
                let dir_pattern = pattern.trim_end_matches('/');
                if path_str.contains(&format!("/{}/", dir_pattern))
                    || path_str.starts_with(&format!("{}/", dir_pattern))
                {
                    return true;
                }
            }
        }

        false
    }
}

/// Parse a `KEY=VALUE` command line argument
pub fn parse_key_val(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("invalid KEY=VALUE: no `=` or empty key in `{}`", arg)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_config(dir: &Path, content: &str) {
        fs::write(dir.join(CONFIG_FILE_NAME), content).unwrap();
    }

    #[test]
    fn test_load_basic_config() {
        let temp = TempDir::new().unwrap();
        create_config(
            temp.path(),
            r#"
[rules]
files = ["rules/badge.yaml"]

[properties]
role = "Speaker"
dark = true
year = 2024

[paths]
exclude = ["build/", "*.min.svg"]

[output]
format = "json"
"#,
        );

        let (config, path) = Config::load_from(temp.path().to_path_buf())
            .unwrap()
            .unwrap();

        assert_eq!(path, temp.path().join(CONFIG_FILE_NAME));
        assert_eq!(config.rules.files, vec![PathBuf::from("rules/badge.yaml")]);
        assert_eq!(
            config.paths.exclude,
            vec!["build/".to_string(), "*.min.svg".to_string()]
        );
        assert_eq!(config.output.format, Some("json".to_string()));

        let properties = config.effective_properties(&[]).unwrap();
        assert_eq!(properties["role"], "Speaker");
        assert_eq!(properties["dark"], "true");
        assert_eq!(properties["year"], "2024");
    }

    #[test]
    fn test_load_from_parent_directory() {
        let temp = TempDir::new().unwrap();
        create_config(temp.path(), "[output]\nformat = \"diff\"\n");
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let (config, path) = Config::load_from(nested).unwrap().unwrap();
        assert_eq!(path, temp.path().join(CONFIG_FILE_NAME));
        assert_eq!(config.output.format.as_deref(), Some("diff"));
    }

    #[test]
    fn test_load_empty_config() {
        let temp = TempDir::new().unwrap();
        create_config(temp.path(), "");

        let (config, _) = Config::load_from(temp.path().to_path_buf())
            .unwrap()
            .unwrap();

        assert!(config.rules.files.is_empty());
        assert!(config.properties.is_empty());
        assert!(config.paths.exclude.is_empty());
        assert!(config.output.format.is_none());
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        create_config(temp.path(), "[rules]\nfiles = 3\n");
        assert!(Config::load_from(temp.path().to_path_buf()).is_err());
    }

    #[test]
    fn test_no_config_found() {
        let temp = TempDir::new().unwrap();
        let result = Config::load_from(temp.path().to_path_buf()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_rule_files_cli_override() {
        let config = Config {
            rules: RulesConfig {
                files: vec![PathBuf::from("badge.yaml"), PathBuf::from("/abs/theme.yaml")],
            },
            ..Default::default()
        };

        let from_config = config.effective_rule_files(Some(Path::new("/project")), &[]);
        assert_eq!(
            from_config,
            vec![PathBuf::from("/project/badge.yaml"), PathBuf::from("/abs/theme.yaml")]
        );

        let cli = vec![PathBuf::from("other.yaml")];
        assert_eq!(config.effective_rule_files(Some(Path::new("/project")), &cli), cli);
    }

    #[test]
    fn test_set_overrides_config_properties() {
        let mut config = Config::default();
        config
            .properties
            .insert("role".to_string(), toml::Value::String("Speaker".to_string()));
        config
            .properties
            .insert("theme".to_string(), toml::Value::String("light".to_string()));

        let cli = vec![("role".to_string(), "Volunteer".to_string())];
        let properties = config.effective_properties(&cli).unwrap();
        assert_eq!(properties["role"], "Volunteer");
        assert_eq!(properties["theme"], "light");
    }

    #[test]
    fn test_non_scalar_property_rejected() {
        let mut config = Config::default();
        config
            .properties
            .insert("list".to_string(), toml::Value::Array(vec![]));
        assert!(config.effective_properties(&[]).is_err());
    }

    #[test]
    fn test_should_exclude_glob() {
        let config = Config {
            paths: PathsConfig {
                exclude: vec!["*.min.svg".to_string()],
            },
            ..Default::default()
        };

        assert!(config.should_exclude(Path::new("icons/logo.min.svg")));
        assert!(!config.should_exclude(Path::new("icons/logo.svg")));
    }

    #[test]
    fn test_should_exclude_directory() {
        let config = Config {
            paths: PathsConfig {
                exclude: vec!["build/".to_string()],
            },
            ..Default::default()
        };

        assert!(config.should_exclude(Path::new("project/build/badge.svg")));
        assert!(config.should_exclude(Path::new("build/out/badge.svg")));
        assert!(!config.should_exclude(Path::new("src/build.svg")));
    }

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("role=Speaker").unwrap(),
            ("role".to_string(), "Speaker".to_string())
        );
        assert_eq!(
            parse_key_val("label=a=b").unwrap(),
            ("label".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_key_val("empty=").unwrap().1, "");
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }
}
