//! Import graph metrics data structures
//!
//! [`AnalysisData`] is the single result handed to downstream consumers
//! (text reports, JSON files, viewers). Optional fields distinguish "no data"
//! from zero: a missing coverage value is omitted from the JSON, a 0% value
//! is written as `0.0`.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Commit counts for one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommitHistory {
    pub commits: usize,
    /// Commits whose message matches the bug pattern
    pub bug_commits: usize,
}

/// External metric sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalMetric {
    Coverage,
    History,
}

impl fmt::Display for ExternalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalMetric::Coverage => write!(f, "coverage"),
            ExternalMetric::History => write!(f, "history"),
        }
    }
}

/// A recoverable problem met while building the result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisWarning {
    /// The file could not be parsed; its metrics are absent
    ParseError { path: PathBuf, message: String },
    /// A module specifier could not be mapped to a file; the edge is skipped
    ResolutionFailure { path: PathBuf, specifier: String },
    /// A coverage or history provider failed; the metric is absent
    ExternalMetricUnavailable {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
        metric: ExternalMetric,
        message: String,
    },
}

impl fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisWarning::ParseError { path, message } => {
                write!(f, "parse error in {}: {}", path.display(), message)
            }
            AnalysisWarning::ResolutionFailure { path, specifier } => {
                write!(f, "unresolved import `{}` in {}", specifier, path.display())
            }
            AnalysisWarning::ExternalMetricUnavailable {
                path: Some(path),
                metric,
                message,
            } => write!(f, "{} unavailable for {}: {}", metric, path.display(), message),
            AnalysisWarning::ExternalMetricUnavailable {
                path: None,
                metric,
                message,
            } => write!(f, "{} unavailable: {}", metric, message),
        }
    }
}

/// Per-file attributes in the final result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path with the common prefix of all files stripped
    pub name: String,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_count: Option<usize>,
    /// Indices of imported files, duplicates preserved
    pub imports: Vec<usize>,
    /// Raw specifiers that resolved outside the project
    pub imports_external: Vec<String>,
    /// Non-cyclic incoming edges
    pub imports_direct: usize,
    /// Deepest non-cyclic discovery depth from the entry point
    pub imports_depth: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    /// Statement coverage percentage (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<CommitHistory>,
}

impl FileRecord {
    /// Whether parsing succeeded for this file
    pub fn is_analyzed(&self) -> bool {
        self.complexity.is_some()
    }
}

/// Result of one analysis run
///
/// `files[0]` is the entry point; indices are discovery order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisData {
    pub files: Vec<FileRecord>,
    /// Import cycles as node index walks (`[a, b, c, a]`); absent when none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycles: Option<Vec<Vec<usize>>>,
    /// Source files never reached from the entry point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unreached: Option<Vec<PathBuf>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<AnalysisWarning>,
}

impl AnalysisData {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn has_cycles(&self) -> bool {
        self.cycles.is_some()
    }

    pub fn cycle_count(&self) -> usize {
        self.cycles.as_ref().map_or(0, Vec::len)
    }

    /// Whether any file carries coverage data
    pub fn has_coverage(&self) -> bool {
        self.files.iter().any(|f| f.coverage.is_some())
    }

    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.files.iter().position(|f| f.path == path)
    }

    pub fn file_by_name(&self, name: &str) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Display names along a cycle, e.g. `a.rs -> b.rs -> a.rs`
    pub fn describe_cycle(&self, cycle: &[usize]) -> String {
        cycle
            .iter()
            .map(|&i| self.files.get(i).map_or("?", |f| f.name.as_str()))
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub fn total_lines(&self) -> usize {
        self.files.iter().filter_map(|f| f.line_count).sum()
    }

    pub fn total_complexity(&self) -> u64 {
        self.files.iter().filter_map(|f| f.complexity).sum()
    }

    pub fn write_json<W: Write>(&self, writer: W) -> io::Result<()> {
        serde_json::to_writer_pretty(writer, self).map_err(io::Error::other)
    }

    pub fn read_json<R: Read>(reader: R) -> io::Result<Self> {
        serde_json::from_reader(reader).map_err(io::Error::other)
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)?;
        writeln!(writer)?;
        writer.flush()
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        Self::read_json(BufReader::new(File::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, coverage: Option<f64>) -> FileRecord {
        FileRecord {
            name: name.to_string(),
            path: PathBuf::from(format!("/project/src/{}", name)),
            line_count: Some(10),
            imports: Vec::new(),
            imports_external: Vec::new(),
            imports_direct: 0,
            imports_depth: 0,
            complexity: Some(20),
            max_depth: Some(0),
            coverage,
            history: None,
        }
    }

    fn sample() -> AnalysisData {
        let mut lib = record("lib.rs", Some(0.0));
        lib.imports = vec![1, 2, 2];
        lib.imports_external = vec!["serde::Serialize".to_string()];
        lib.history = Some(CommitHistory {
            commits: 4,
            bug_commits: 1,
        });

        let mut a = record("a.rs", None);
        a.imports = vec![0];
        a.imports_direct = 1;
        a.imports_depth = 1;

        let mut b = record("b.rs", Some(87.5));
        b.line_count = None;
        b.complexity = None;
        b.max_depth = None;
        b.imports_direct = 2;
        b.imports_depth = 1;

        AnalysisData {
            files: vec![lib, a, b],
            cycles: Some(vec![vec![0, 1, 0]]),
            unreached: None,
            warnings: vec![AnalysisWarning::ParseError {
                path: PathBuf::from("/project/src/b.rs"),
                message: "expected item".to_string(),
            }],
        }
    }

    #[test]
    fn test_round_trip_preserves_presence() {
        let data = sample();
        let mut buffer = Vec::new();
        data.write_json(&mut buffer).unwrap();

        let restored = AnalysisData::read_json(buffer.as_slice()).unwrap();
        assert_eq!(restored, data);
        assert_eq!(restored.files[0].imports, vec![1, 2, 2]);
        assert_eq!(restored.files[0].coverage, Some(0.0));
        assert_eq!(restored.files[1].coverage, None);
        assert_eq!(restored.files[2].line_count, None);
    }

    #[test]
    fn test_absent_coverage_differs_from_zero() {
        let data = sample();
        let json = serde_json::to_value(&data).unwrap();

        assert_eq!(json["files"][0]["coverage"], serde_json::json!(0.0));
        assert!(json["files"][1].get("coverage").is_none());
    }

    #[test]
    fn test_empty_cycles_are_omitted() {
        let data = AnalysisData {
            files: vec![record("lib.rs", None)],
            ..Default::default()
        };
        let json = serde_json::to_value(&data).unwrap();
        assert!(json.get("cycles").is_none());
        assert!(json.get("warnings").is_none());
        assert!(!data.has_cycles());
        assert!(!data.has_coverage());
    }

    #[test]
    fn test_describe_cycle() {
        let data = sample();
        assert_eq!(data.describe_cycle(&[0, 1, 0]), "lib.rs -> a.rs -> lib.rs");
        assert_eq!(data.cycle_count(), 1);
        assert_eq!(data.total_lines(), 20);
        assert_eq!(data.total_complexity(), 40);
    }

    #[test]
    fn test_warning_display() {
        let warning = AnalysisWarning::ResolutionFailure {
            path: PathBuf::from("src/lib.rs"),
            specifier: "mystery::Thing".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "unresolved import `mystery::Thing` in src/lib.rs"
        );

        let warning = AnalysisWarning::ExternalMetricUnavailable {
            path: None,
            metric: ExternalMetric::Coverage,
            message: "file not found".to_string(),
        };
        assert_eq!(warning.to_string(), "coverage unavailable: file not found");
    }
}
