//! Configuration file support for cargo-importgraph
//!
//! Settings come from `.importgraph.toml` (or `importgraph.toml`), found by
//! searching from the analysed path upwards. Relative paths inside the file
//! are resolved against the directory holding it.
//!
//! ## Configuration File Format
//!
//! ```toml
//! # .importgraph.toml
//!
//! [analysis]
//! # Crate root to start from (default: found through cargo metadata)
//! entry = "src/lib.rs"
//!
//! # Files whose imports are not followed, relative to the project root
//! exclude = ["src/generated/*"]
//!
//! # Drop #[cfg(test)] items before scoring and import extraction
//! exclude_tests = false
//!
//! # "flat" keeps every node at the starting depth, "nested" descends
//! depth_mode = "flat"
//!
//! [history]
//! enabled = true
//! # Only count commits from the last N months (0 = whole history)
//! months = 0
//! bug_pattern = "(?i)bug"
//!
//! [coverage]
//! # istanbul coverage-summary.json or llvm-cov export JSON
//! report = "coverage/coverage-summary.json"
//! ```

use glob::Pattern;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::complexity::DepthMode;
use crate::history::DEFAULT_BUG_PATTERN;

const CONFIG_NAMES: [&str; 2] = [".importgraph.toml", "importgraph.toml"];

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid glob pattern: {0}")]
    PatternError(String),
}

/// Analysis configuration section
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub entry: Option<PathBuf>,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub exclude_tests: bool,

    #[serde(default)]
    pub depth_mode: DepthMode,
}

/// Commit history section
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub months: usize,

    #[serde(default = "default_bug_pattern")]
    pub bug_pattern: String,
}

fn default_history_enabled() -> bool {
    true
}

fn default_bug_pattern() -> String {
    DEFAULT_BUG_PATTERN.to_string()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_history_enabled(),
            months: 0,
            bug_pattern: default_bug_pattern(),
        }
    }
}

/// Coverage section
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CoverageConfig {
    #[serde(default)]
    pub report: Option<PathBuf>,
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ImportGraphConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub coverage: CoverageConfig,
}

/// Configuration with patterns compiled and paths made absolute
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    pub entry: Option<PathBuf>,
    pub exclude: Vec<Pattern>,
    pub exclude_tests: bool,
    pub depth_mode: DepthMode,
    pub history: HistoryConfig,
    pub coverage_report: Option<PathBuf>,
}

impl CompiledConfig {
    /// Compile `config`; relative paths are joined onto `base_dir`
    pub fn from_config(config: ImportGraphConfig, base_dir: &Path) -> Result<Self, ConfigError> {
        let exclude = config
            .analysis
            .exclude
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| ConfigError::PatternError(format!("{}: {}", p, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            entry: config.analysis.entry.map(|p| base_dir.join(p)),
            exclude,
            exclude_tests: config.analysis.exclude_tests,
            depth_mode: config.analysis.depth_mode,
            history: config.history,
            coverage_report: config.coverage.report.map(|p| base_dir.join(p)),
        })
    }

    /// Create an empty config (defaults only)
    pub fn empty() -> Self {
        Self {
            entry: None,
            exclude: Vec::new(),
            exclude_tests: false,
            depth_mode: DepthMode::default(),
            history: HistoryConfig::default(),
            coverage_report: None,
        }
    }
}

/// Read and parse one config file
pub fn load_config_file(path: &Path) -> Result<ImportGraphConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load configuration for a project path
///
/// Searches the path and its ancestors; missing config means defaults.
pub fn load_config(project_path: &Path) -> Result<ImportGraphConfig, ConfigError> {
    match find_config_file(project_path) {
        Some(path) => load_config_file(&path),
        None => Ok(ImportGraphConfig::default()),
    }
}

/// Find the config file by searching up the directory tree
pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
    let mut current = if start_path.is_file() {
        start_path.parent()?.to_path_buf()
    } else {
        start_path.to_path_buf()
    };

    loop {
        for name in CONFIG_NAMES {
            let config_path = current.join(name);
            if config_path.is_file() {
                debug!("Using config {}", config_path.display());
                return Some(config_path);
            }
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return None,
        }
    }
}

/// Load and compile configuration
///
/// `explicit` is a config file named on the command line; otherwise the
/// search starts at `project_path`.
pub fn load_compiled_config(
    project_path: &Path,
    explicit: Option<&Path>,
) -> Result<CompiledConfig, ConfigError> {
    let config_path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(project_path),
    };

    match config_path {
        Some(path) => {
            let base_dir = path.parent().unwrap_or(Path::new("."));
            CompiledConfig::from_config(load_config_file(&path)?, base_dir)
        }
        None => Ok(CompiledConfig::empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ImportGraphConfig::default();
        assert!(config.analysis.entry.is_none());
        assert!(config.analysis.exclude.is_empty());
        assert_eq!(config.analysis.depth_mode, DepthMode::Flat);
        assert!(config.history.enabled);
        assert_eq!(config.history.bug_pattern, DEFAULT_BUG_PATTERN);
        assert!(config.coverage.report.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [analysis]
            entry = "src/main.rs"
            exclude = ["src/generated/*"]
            exclude_tests = true
            depth_mode = "nested"

            [history]
            enabled = false
            months = 6

            [coverage]
            report = "target/llvm-cov.json"
        "#;

        let config: ImportGraphConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.analysis.entry, Some(PathBuf::from("src/main.rs")));
        assert!(config.analysis.exclude_tests);
        assert_eq!(config.analysis.depth_mode, DepthMode::Nested);
        assert!(!config.history.enabled);
        assert_eq!(config.history.months, 6);
        assert_eq!(config.history.bug_pattern, DEFAULT_BUG_PATTERN);

        let compiled = CompiledConfig::from_config(config, Path::new("/work")).unwrap();
        assert_eq!(compiled.entry, Some(PathBuf::from("/work/src/main.rs")));
        assert_eq!(
            compiled.coverage_report,
            Some(PathBuf::from("/work/target/llvm-cov.json"))
        );
        assert!(compiled.exclude[0].matches("src/generated/schema.rs"));
    }

    #[test]
    fn test_invalid_pattern() {
        let toml = r#"
            [analysis]
            exclude = ["src/[oops"]
        "#;
        let config: ImportGraphConfig = toml::from_str(toml).unwrap();
        assert!(matches!(
            CompiledConfig::from_config(config, Path::new(".")),
            Err(ConfigError::PatternError(_))
        ));
    }

    #[test]
    fn test_unknown_depth_mode() {
        let toml = r#"
            [analysis]
            depth_mode = "sideways"
        "#;
        assert!(toml::from_str::<ImportGraphConfig>(toml).is_err());
    }

    #[test]
    fn test_find_config_in_parent() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("src/api");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            dir.path().join(".importgraph.toml"),
            "[analysis]\nexclude_tests = true\n",
        )
        .unwrap();

        assert_eq!(
            find_config_file(&nested),
            Some(dir.path().join(".importgraph.toml"))
        );
        let compiled = load_compiled_config(&nested, None).unwrap();
        assert!(compiled.exclude_tests);
    }
}
