//! # cargo-importgraph - Import Graph Analysis
//!
//! Follows the module imports of a Rust crate from its root file and
//! measures every file it reaches.
//!
//! ## Overview
//!
//! For each file cargo-importgraph records:
//!
//! 1. **Complexity** - a weighted sum over the file's syntax tree
//! 2. **Fan-in** (`imports_direct`) - non-cyclic edges pointing at the file
//! 3. **Import depth** (`imports_depth`) - deepest non-cyclic path from the entry
//!
//! and it lists every import cycle found from the entry point. Test coverage
//! reports and git history can be merged into the result.
//!
//! ## Usage
//!
//! ```bash
//! # Analyze the current crate and write importgraph.json
//! cargo importgraph analyze
//!
//! # Start from a specific file, with coverage data
//! cargo importgraph analyze --entry src/main.rs --coverage target/llvm-cov.json
//!
//! # Inspect a previous run
//! cargo importgraph show cycles --data importgraph.json
//! ```
//!
//! ## Complexity Score
//!
//! ```text
//! complexity(node) = weight(kind) * (depth + 10) + sum(complexity(child))
//! ```

pub mod aggregate;
pub mod analyzer;
pub mod complexity;
pub mod config;
pub mod coverage;
pub mod cycles;
pub mod graph;
pub mod history;
pub mod metrics;
pub mod project;
pub mod report;
pub mod resolver;
pub mod syntax;
pub mod walker;
pub mod workspace;

pub use aggregate::{aggregate, common_prefix, display_name};
pub use analyzer::{ParseError, ParsedSource, RustSourceParser, SourceParser, extract_use_paths};
pub use complexity::{
    ComplexityScore, ComplexityScorer, DEPTH_OFFSET, DepthMode, complexity_and_depth,
};
pub use config::{
    AnalysisConfig, CompiledConfig, ConfigError, CoverageConfig, HistoryConfig,
    ImportGraphConfig, load_compiled_config, load_config,
};
pub use coverage::{CoverageError, CoverageMap, load_coverage, parse_coverage};
pub use cycles::find_cycles;
pub use graph::{
    BuildOutput, ENTRY, FileNode, GraphBuilder, GraphError, ImportGraph, ModuleGraph,
    NodeAllocator,
};
pub use history::{GitHistory, HistoryError, HistoryProvider, count_commits};
pub use metrics::{AnalysisData, AnalysisWarning, CommitHistory, ExternalMetric, FileRecord};
pub use project::{AnalysisOptions, AnalyzerError, analyze_project, unreached_files};
pub use report::{
    CoverageStats, generate_summary, write_cycles, write_files, write_tests,
    write_top_complexity, write_warnings,
};
pub use resolver::{ModuleResolver, Resolution, RustModuleResolver};
pub use syntax::{SyntaxKind, SyntaxNode};
pub use walker::{ImportMetrics, walk_imports};
pub use workspace::{ProjectLayout, WorkspaceError};
