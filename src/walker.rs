//! Fan-in and import depth over a frozen graph
//!
//! A depth-first walk from the entry counts, for every node, the non-cyclic
//! edges pointing at it and the deepest level it is reached at. Edges into a
//! node on the current path are back-edges and are ignored.

use crate::graph::ImportGraph;

/// Per-node traversal metrics, indexed like the graph
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportMetrics {
    /// Non-cyclic incoming edges, each occurrence counted
    pub direct: Vec<usize>,
    /// Deepest non-cyclic arrival depth from the entry
    pub depth: Vec<usize>,
}

impl ImportMetrics {
    fn new(len: usize) -> Self {
        Self {
            direct: vec![0; len],
            depth: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.direct.len()
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty()
    }
}

struct Walk<'g, G: ?Sized> {
    graph: &'g G,
    on_path: Vec<bool>,
    explored: Vec<bool>,
    metrics: ImportMetrics,
}

impl<G: ImportGraph + ?Sized> Walk<'_, G> {
    fn visit(&mut self, node: usize, depth: usize) {
        self.on_path[node] = true;
        self.explored[node] = true;

        for &target in self.graph.imports_of(node) {
            if target >= self.on_path.len() || self.on_path[target] {
                continue;
            }

            let arrival = depth + 1;
            self.metrics.direct[target] += 1;

            if !self.explored[target] {
                self.metrics.depth[target] = arrival;
                self.visit(target, arrival);
            } else if self.metrics.depth[target] < arrival {
                self.metrics.depth[target] = arrival;
                self.deepen(target, arrival);
            }
        }

        self.on_path[node] = false;
    }

    /// Push a greater depth through an already explored subtree
    fn deepen(&mut self, node: usize, depth: usize) {
        self.on_path[node] = true;

        for &target in self.graph.imports_of(node) {
            if target >= self.on_path.len() || self.on_path[target] {
                continue;
            }
            let arrival = depth + 1;
            if self.metrics.depth[target] < arrival {
                self.metrics.depth[target] = arrival;
                self.deepen(target, arrival);
            }
        }

        self.on_path[node] = false;
    }
}

/// Compute `imports_direct` and `imports_depth` for every node
///
/// Nodes unreachable from `entry` keep zero for both values. A node that is
/// reached again after its first exploration is counted again but not
/// re-explored; when the new arrival is deeper, only the depth is pushed down
/// through its imports.
pub fn walk_imports<G: ImportGraph + ?Sized>(graph: &G, entry: usize) -> ImportMetrics {
    let len = graph.node_count();
    let mut walk = Walk {
        graph,
        on_path: vec![false; len],
        explored: vec![false; len],
        metrics: ImportMetrics::new(len),
    };

    if entry < len {
        walk.visit(entry, 0);
    }
    walk.metrics
}
