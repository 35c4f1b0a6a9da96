//! Test coverage reports
//!
//! Two JSON layouts are understood:
//!
//! - `llvm-cov export` (cargo-llvm-cov, grcov): line coverage per file
//! - istanbul `coverage-summary.json`: statement coverage per file
//!
//! Both are reduced to a map from file path to a percentage (0-100).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Coverage percentage by file path
pub type CoverageMap = HashMap<PathBuf, f64>;

/// Errors that can occur while loading a coverage report
#[derive(Error, Debug)]
pub enum CoverageError {
    #[error("Failed to read coverage report {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unrecognized coverage report: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CoverageReport {
    LlvmCov(LlvmExport),
    Istanbul(HashMap<String, IstanbulEntry>),
}

#[derive(Deserialize)]
struct LlvmExport {
    data: Vec<LlvmExportData>,
}

#[derive(Deserialize)]
struct LlvmExportData {
    #[serde(default)]
    files: Vec<LlvmFile>,
}

#[derive(Deserialize)]
struct LlvmFile {
    filename: String,
    summary: LlvmSummary,
}

#[derive(Deserialize)]
struct LlvmSummary {
    lines: LlvmCounts,
}

#[derive(Deserialize)]
struct LlvmCounts {
    percent: f64,
}

#[derive(Deserialize)]
struct IstanbulEntry {
    statements: IstanbulCounts,
}

#[derive(Deserialize)]
struct IstanbulCounts {
    /// A number, or `"Unknown"` for files without statements
    pct: serde_json::Value,
}

/// Load a coverage report; relative file names are resolved against `base_dir`
pub fn load_coverage(path: &Path, base_dir: &Path) -> Result<CoverageMap, CoverageError> {
    let content = fs::read_to_string(path).map_err(|source| CoverageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let coverage = parse_coverage(&content, base_dir)?;
    debug!(
        "Loaded coverage for {} files from {}",
        coverage.len(),
        path.display()
    );
    Ok(coverage)
}

pub fn parse_coverage(json: &str, base_dir: &Path) -> Result<CoverageMap, CoverageError> {
    let report: CoverageReport = serde_json::from_str(json)?;

    let entries: Vec<(String, f64)> = match report {
        CoverageReport::LlvmCov(export) => export
            .data
            .into_iter()
            .flat_map(|data| data.files)
            .map(|file| (file.filename, file.summary.lines.percent))
            .collect(),
        CoverageReport::Istanbul(files) => files
            .into_iter()
            .filter(|(name, _)| name != "total")
            .filter_map(|(name, entry)| entry.statements.pct.as_f64().map(|pct| (name, pct)))
            .collect(),
    };

    Ok(entries
        .into_iter()
        .map(|(name, pct)| (normalize(base_dir, &name), pct))
        .collect())
}

fn normalize(base_dir: &Path, name: &str) -> PathBuf {
    let path = base_dir.join(name);
    fs::canonicalize(&path).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_istanbul_summary() {
        let json = r#"{
            "total": {"statements": {"total": 10, "covered": 5, "pct": 50}},
            "/project/src/a.ts": {"statements": {"total": 4, "covered": 4, "pct": 100}},
            "/project/src/b.ts": {"statements": {"total": 6, "covered": 0, "pct": 0}},
            "/project/src/types.ts": {"statements": {"total": 0, "covered": 0, "pct": "Unknown"}}
        }"#;

        let coverage = parse_coverage(json, Path::new("/")).unwrap();
        assert_eq!(coverage.len(), 2);
        assert_eq!(coverage[Path::new("/project/src/a.ts")], 100.0);
        assert_eq!(coverage[Path::new("/project/src/b.ts")], 0.0);
    }

    #[test]
    fn test_llvm_cov_export() {
        let json = r#"{
            "type": "llvm.coverage.json.export",
            "version": "2.0.1",
            "data": [{
                "files": [
                    {"filename": "src/lib.rs", "summary": {"lines": {"count": 40, "covered": 30, "percent": 75.0}}},
                    {"filename": "/abs/src/graph.rs", "summary": {"lines": {"count": 10, "covered": 0, "percent": 0.0}}}
                ],
                "totals": {}
            }]
        }"#;

        let coverage = parse_coverage(json, Path::new("/work/project")).unwrap();
        assert_eq!(coverage[Path::new("/work/project/src/lib.rs")], 75.0);
        assert_eq!(coverage[Path::new("/abs/src/graph.rs")], 0.0);
    }

    #[test]
    fn test_unrecognized_report() {
        assert!(matches!(
            parse_coverage(r#"{"files": 3}"#, Path::new("/")),
            Err(CoverageError::Parse(_))
        ));
        assert!(matches!(
            parse_coverage("not json", Path::new("/")),
            Err(CoverageError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_report() {
        let err =
            load_coverage(Path::new("/nonexistent/coverage.json"), Path::new("/")).unwrap_err();
        assert!(matches!(err, CoverageError::Io { .. }));
    }
}
