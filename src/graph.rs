//! Import graph construction
//!
//! Starting from an entry file, every transitively imported project file is
//! discovered, parsed and scored exactly once. Files are stored in a flat
//! arena indexed by discovery order; edges are plain indices into it, so
//! import cycles need no ownership cycles.
//!
//! Sibling imports are processed in parallel with Rayon. The path → index
//! table and the processed set live behind a single [`NodeAllocator`] so
//! concurrent discovery of the same path yields one index.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analyzer::{ParseError, SourceParser};
use crate::complexity::ComplexityScorer;
use crate::history::{HistoryError, HistoryProvider};
use crate::metrics::{AnalysisWarning, CommitHistory, ExternalMetric};
use crate::resolver::{ModuleResolver, Resolution};

/// Index of the entry file in every built graph
pub const ENTRY: usize = 0;

/// Read-only view of import edges by node index
pub trait ImportGraph {
    fn node_count(&self) -> usize;
    fn imports_of(&self, node: usize) -> &[usize];
}

impl ImportGraph for [Vec<usize>] {
    fn node_count(&self) -> usize {
        self.len()
    }

    fn imports_of(&self, node: usize) -> &[usize] {
        self.get(node).map_or(&[], Vec::as_slice)
    }
}

impl ImportGraph for Vec<Vec<usize>> {
    fn node_count(&self) -> usize {
        self.len()
    }

    fn imports_of(&self, node: usize) -> &[usize] {
        self.as_slice().imports_of(node)
    }
}

/// Errors that abort a build
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Cannot read entry file {}: {source}", .path.display())]
    EntryUnreadable {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// One project file in the graph
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileNode {
    pub path: PathBuf,
    /// `None` until parsed, and for files that failed to parse
    pub line_count: Option<usize>,
    pub complexity: Option<u64>,
    pub max_depth: Option<usize>,
    /// Imported nodes in source order, duplicates preserved
    pub imports: Vec<usize>,
    /// Specifiers that resolved outside the project
    pub external_imports: Vec<String>,
    pub history: Option<CommitHistory>,
}

impl FileNode {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }
}

/// Frozen import graph; [`ENTRY`] is the root
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModuleGraph {
    nodes: Vec<FileNode>,
}

impl ModuleGraph {
    pub fn from_nodes(nodes: Vec<FileNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[FileNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&FileNode> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.nodes.iter().position(|n| n.path == path)
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.imports.len()).sum()
    }

    pub fn into_nodes(self) -> Vec<FileNode> {
        self.nodes
    }
}

impl ImportGraph for ModuleGraph {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn imports_of(&self, node: usize) -> &[usize] {
        self.nodes.get(node).map_or(&[], |n| n.imports.as_slice())
    }
}

/// A built graph plus the recoverable problems met on the way
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub graph: ModuleGraph,
    pub warnings: Vec<AnalysisWarning>,
}

#[derive(Debug, Default)]
struct NodeTable {
    lookup: HashMap<PathBuf, usize>,
    nodes: Vec<FileNode>,
    processed: HashSet<usize>,
}

/// Single point of index assignment for concurrent discovery
#[derive(Debug, Default)]
pub struct NodeAllocator {
    table: Mutex<NodeTable>,
}

impl NodeAllocator {
    /// Index of `path`, creating the node on first sight
    pub fn intern(&self, path: &Path) -> usize {
        let mut table = self.table.lock();
        if let Some(&index) = table.lookup.get(path) {
            return index;
        }
        let index = table.nodes.len();
        table.nodes.push(FileNode::new(path.to_path_buf()));
        table.lookup.insert(path.to_path_buf(), index);
        index
    }

    /// Mark `index` as processed; `true` only for the first caller
    pub fn claim(&self, index: usize) -> bool {
        self.table.lock().processed.insert(index)
    }

    pub fn path_of(&self, index: usize) -> Option<PathBuf> {
        self.table.lock().nodes.get(index).map(|n| n.path.clone())
    }

    pub fn len(&self) -> usize {
        self.table.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update(&self, index: usize, apply: impl FnOnce(&mut FileNode)) {
        if let Some(node) = self.table.lock().nodes.get_mut(index) {
            apply(node);
        }
    }

    fn into_nodes(self) -> Vec<FileNode> {
        self.table.into_inner().nodes
    }
}

#[derive(Debug, Default)]
struct BuildState {
    allocator: NodeAllocator,
    warnings: Mutex<Vec<AnalysisWarning>>,
}

impl BuildState {
    fn warn(&self, warning: AnalysisWarning) {
        warn!("{}", warning);
        self.warnings.lock().push(warning);
    }
}

/// Discovers and scores the files reachable from an entry point
pub struct GraphBuilder<'a> {
    parser: &'a dyn SourceParser,
    resolver: &'a dyn ModuleResolver,
    history: Option<&'a dyn HistoryProvider>,
    scorer: ComplexityScorer,
    parallel: bool,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(parser: &'a dyn SourceParser, resolver: &'a dyn ModuleResolver) -> Self {
        Self {
            parser,
            resolver,
            history: None,
            scorer: ComplexityScorer::default(),
            parallel: true,
        }
    }

    /// Fetch commit history for every discovered file
    pub fn with_history(mut self, history: &'a dyn HistoryProvider) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_scorer(mut self, scorer: ComplexityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Process files one at a time, in discovery order
    pub fn sequential(mut self, sequential: bool) -> Self {
        self.parallel = !sequential;
        self
    }

    /// Build the graph rooted at `entry`
    ///
    /// Only an unreadable entry file fails the build. Every other problem is
    /// reported in [`BuildOutput::warnings`].
    pub fn build(&self, entry: &Path) -> Result<BuildOutput, GraphError> {
        let state = BuildState::default();
        let entry_index = state.allocator.intern(entry);
        state.allocator.claim(entry_index);

        match self.process(&state, entry_index, entry) {
            Err(source) if source.is_unreadable() => {
                return Err(GraphError::EntryUnreadable {
                    path: entry.to_path_buf(),
                    source,
                });
            }
            Err(err) => state.warn(AnalysisWarning::ParseError {
                path: entry.to_path_buf(),
                message: err.to_string(),
            }),
            Ok(()) => {}
        }

        let warnings = state.warnings.into_inner();
        let graph = ModuleGraph::from_nodes(state.allocator.into_nodes());
        info!(
            "Import graph built: {} files, {} edges, {} warnings",
            graph.len(),
            graph.edge_count(),
            warnings.len()
        );

        Ok(BuildOutput { graph, warnings })
    }

    /// Parse one file and recurse into its imports, fetching history alongside
    fn process(&self, state: &BuildState, index: usize, path: &Path) -> Result<(), ParseError> {
        let (history, result) = self.join(
            || self.history.map(|provider| provider.commit_history(path)),
            || -> Result<(), ParseError> {
                let imports = self.analyze_file(state, index, path)?;
                self.visit_all(state, &imports);
                Ok(())
            },
        );

        if let Some(history) = history {
            self.record_history(state, index, path, history);
        }
        result
    }

    fn visit_all(&self, state: &BuildState, imports: &[usize]) {
        let visit = |&child: &usize| {
            if !state.allocator.claim(child) {
                return;
            }
            let Some(path) = state.allocator.path_of(child) else {
                return;
            };
            if let Err(err) = self.process(state, child, &path) {
                state.warn(AnalysisWarning::ParseError {
                    path,
                    message: err.to_string(),
                });
            }
        };

        if self.parallel {
            imports.par_iter().for_each(visit);
        } else {
            imports.iter().for_each(visit);
        }
    }

    /// Parse, score and extract the edges of one file
    ///
    /// Returns the imported node indices.
    fn analyze_file(
        &self,
        state: &BuildState,
        index: usize,
        path: &Path,
    ) -> Result<Vec<usize>, ParseError> {
        debug!("Analyzing {}", path.display());
        let parsed = self.parser.parse(path)?;
        let score = self.scorer.score_file(&parsed.root);

        let mut imports = Vec::new();
        let mut external_imports = Vec::new();

        if parsed.declaration_only {
            debug!("{} is declaration-only, imports skipped", path.display());
        } else {
            for specifier in parsed.root.top_level_specifiers() {
                match self.resolver.resolve(specifier, path) {
                    Resolution::Internal(target) if target == path => {
                        debug!("{}: `{}` refers to itself", path.display(), specifier);
                    }
                    Resolution::Internal(target) => {
                        imports.push(state.allocator.intern(&target));
                    }
                    Resolution::External(raw) => external_imports.push(raw),
                    Resolution::Excluded(target) => {
                        debug!("{}: skipping excluded {}", path.display(), target.display());
                    }
                    Resolution::Unresolved => state.warn(AnalysisWarning::ResolutionFailure {
                        path: path.to_path_buf(),
                        specifier: specifier.to_string(),
                    }),
                }
            }
        }

        let edges = imports.clone();
        state.allocator.update(index, |node| {
            node.line_count = Some(parsed.line_count);
            node.complexity = Some(score.complexity);
            node.max_depth = Some(score.max_depth);
            node.imports = edges;
            node.external_imports = external_imports;
        });

        Ok(imports)
    }

    fn record_history(
        &self,
        state: &BuildState,
        index: usize,
        path: &Path,
        history: Result<CommitHistory, HistoryError>,
    ) {
        match history {
            Ok(history) => state.allocator.update(index, |node| {
                node.history = Some(history);
            }),
            Err(err) => state.warn(AnalysisWarning::ExternalMetricUnavailable {
                path: Some(path.to_path_buf()),
                metric: ExternalMetric::History,
                message: err.to_string(),
            }),
        }
    }

    fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        if self.parallel {
            rayon::join(a, b)
        } else {
            (a(), b())
        }
    }
}
