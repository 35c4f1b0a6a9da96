//! Final result assembly
//!
//! Merges graph metrics with optional coverage data and shortens paths to
//! display names.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::coverage::CoverageMap;
use crate::graph::ModuleGraph;
use crate::metrics::{AnalysisData, AnalysisWarning, FileRecord};
use crate::walker::ImportMetrics;

/// Longest component-wise prefix shared by all `paths`
pub fn common_prefix<'a, I>(paths: I) -> PathBuf
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut paths = paths.into_iter();
    let Some(first) = paths.next() else {
        return PathBuf::new();
    };

    let mut prefix: Vec<Component<'a>> = first.components().collect();
    for path in paths {
        let shared = prefix
            .iter()
            .zip(path.components())
            .take_while(|(a, b)| *a == b)
            .count();
        prefix.truncate(shared);
    }
    prefix.iter().collect()
}

/// `path` relative to `prefix`, or its file name when nothing is left
pub fn display_name(path: &Path, prefix: &Path) -> String {
    let relative = path.strip_prefix(prefix).unwrap_or(path);
    if relative.as_os_str().is_empty() {
        return path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
    }
    relative.to_string_lossy().replace('\\', "/")
}

/// Combine a built graph and its derived metrics into [`AnalysisData`]
///
/// Files missing from `coverage` get no coverage value rather than 0%. An
/// empty cycle list is stored as absent.
pub fn aggregate(
    graph: ModuleGraph,
    metrics: &ImportMetrics,
    cycles: Vec<Vec<usize>>,
    coverage: Option<&CoverageMap>,
    warnings: Vec<AnalysisWarning>,
) -> AnalysisData {
    let prefix = common_prefix(graph.nodes().iter().map(|n| n.path.as_path()));
    debug!("Common path prefix: {}", prefix.display());

    let files = graph
        .into_nodes()
        .into_iter()
        .enumerate()
        .map(|(index, node)| FileRecord {
            name: display_name(&node.path, &prefix),
            coverage: coverage.and_then(|c| c.get(&node.path).copied()),
            imports_direct: metrics.direct.get(index).copied().unwrap_or(0),
            imports_depth: metrics.depth.get(index).copied().unwrap_or(0),
            line_count: node.line_count,
            imports: node.imports,
            imports_external: node.external_imports,
            complexity: node.complexity,
            max_depth: node.max_depth,
            history: node.history,
            path: node.path,
        })
        .collect();

    AnalysisData {
        files,
        cycles: (!cycles.is_empty()).then_some(cycles),
        unreached: None,
        warnings,
    }
}
