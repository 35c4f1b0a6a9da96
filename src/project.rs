//! End-to-end analysis of one crate
//!
//! Resolves configuration and the entry file, builds the import graph, runs
//! the walker and cycle detector, then merges coverage data.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::aggregate::aggregate;
use crate::analyzer::RustSourceParser;
use crate::complexity::{ComplexityScorer, DepthMode};
use crate::config::{ConfigError, load_compiled_config};
use crate::coverage::load_coverage;
use crate::cycles::find_cycles;
use crate::graph::{ENTRY, GraphBuilder, GraphError};
use crate::history::{GitHistory, HistoryError};
use crate::metrics::{AnalysisData, AnalysisWarning, ExternalMetric};
use crate::resolver::RustModuleResolver;
use crate::walker::walk_imports;
use crate::workspace::{ProjectLayout, WorkspaceError};

/// Errors that abort an analysis run
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),
}

/// Command-line level overrides; `None` and `false` defer to the config file
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub entry: Option<PathBuf>,
    pub manifest_path: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub coverage: Option<PathBuf>,
    pub no_history: bool,
    pub history_months: Option<usize>,
    pub exclude_tests: bool,
    pub depth_mode: Option<DepthMode>,
    pub sequential: bool,
    /// List `.rs` files the graph never reached
    pub list_unreached: bool,
}

/// Analyze the crate at `path` (a package directory or a `.rs` entry file)
pub fn analyze_project(
    path: &Path,
    options: &AnalysisOptions,
) -> Result<AnalysisData, AnalyzerError> {
    if !path.exists() {
        return Err(AnalyzerError::InvalidPath(path.display().to_string()));
    }
    let config = load_compiled_config(path, options.config_path.as_deref())?;

    let explicit_entry = options
        .entry
        .clone()
        .or(config.entry.clone())
        .or_else(|| is_rust_file(path).then(|| path.to_path_buf()));

    let layout = match ProjectLayout::discover(path, options.manifest_path.as_deref()) {
        Ok(layout) => Some(layout),
        Err(e) if explicit_entry.is_some() => {
            warn!("Could not load workspace metadata: {}", e);
            None
        }
        Err(e) => return Err(e.into()),
    };

    let entry = explicit_entry
        .or_else(|| layout.as_ref().map(|l| l.entry.clone()))
        .ok_or_else(|| AnalyzerError::InvalidPath(path.display().to_string()))?;
    let entry = canonical(&entry);

    let mut resolver = RustModuleResolver::new(&entry).with_exclude(config.exclude.clone());
    if let Some(layout) = &layout {
        resolver = resolver
            .with_project_dir(canonical(&layout.project_dir))
            .with_extern_crates(&layout.extern_crates);
    }

    let parser = RustSourceParser::new(options.exclude_tests || config.exclude_tests);
    let scorer = ComplexityScorer::new(options.depth_mode.unwrap_or(config.depth_mode));

    let history = if config.history.enabled && !options.no_history {
        let months = options.history_months.unwrap_or(config.history.months);
        Some(GitHistory::new(&config.history.bug_pattern, Some(months))?)
    } else {
        None
    };

    info!("Building import graph from {}", entry.display());
    let build_start = Instant::now();
    let mut builder = GraphBuilder::new(&parser, &resolver)
        .with_scorer(scorer)
        .sequential(options.sequential);
    if let Some(history) = &history {
        builder = builder.with_history(history);
    }
    let output = builder.build(&entry)?;
    info!("Graph built in {:.2?}", build_start.elapsed());

    let metrics = walk_imports(&output.graph, ENTRY);
    let cycles = find_cycles(&output.graph, ENTRY);
    info!("Found {} import cycle(s)", cycles.len());

    let mut warnings = output.warnings;
    let coverage_base = layout
        .as_ref()
        .map(|l| canonical(&l.project_dir))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    let coverage = options
        .coverage
        .clone()
        .or(config.coverage_report.clone())
        .and_then(|report| match load_coverage(&report, &coverage_base) {
            Ok(coverage) => Some(coverage),
            Err(e) => {
                let warning = AnalysisWarning::ExternalMetricUnavailable {
                    path: None,
                    metric: ExternalMetric::Coverage,
                    message: e.to_string(),
                };
                warn!("{}", warning);
                warnings.push(warning);
                None
            }
        });

    let mut data = aggregate(output.graph, &metrics, cycles, coverage.as_ref(), warnings);

    if options.list_unreached
        && let Some(src_dir) = entry.parent()
    {
        let unreached = unreached_files(src_dir, &data);
        data.unreached = (!unreached.is_empty()).then_some(unreached);
    }

    Ok(data)
}

/// `.rs` files below `dir` that are not part of `data`
///
/// `target/` and hidden directories are skipped.
pub fn unreached_files(dir: &Path, data: &AnalysisData) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = rs_files(dir)
        .map(|p| canonical(&p))
        .filter(|p| data.index_of(p).is_none())
        .collect();
    files.sort();
    files
}

fn rs_files(dir: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(move |entry| {
            let file_path = entry.path();
            let file_path = file_path.strip_prefix(dir).unwrap_or(file_path);

            !file_path.components().any(|c| {
                let s = c.as_os_str().to_string_lossy();
                s == "target" || s.starts_with('.')
            }) && file_path.extension() == Some(OsStr::new("rs"))
        })
        .map(|e| e.path().to_path_buf())
}

fn is_rust_file(path: &Path) -> bool {
    path.is_file() && path.extension() == Some(OsStr::new("rs"))
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
