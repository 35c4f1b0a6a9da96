//! Import cycle enumeration

use crate::graph::ImportGraph;

struct CycleSearch<'g, G: ?Sized> {
    graph: &'g G,
    visited: Vec<bool>,
    stack: Vec<usize>,
    cycles: Vec<Vec<usize>>,
}

impl<G: ImportGraph + ?Sized> CycleSearch<'_, G> {
    fn visit(&mut self, node: usize) {
        self.visited[node] = true;
        self.stack.push(node);

        for &target in self.graph.imports_of(node) {
            if target >= self.visited.len() {
                continue;
            }
            if !self.visited[target] {
                self.visit(target);
            } else if let Some(start) = self.stack.iter().position(|&n| n == target) {
                let mut cycle = self.stack[start..].to_vec();
                cycle.push(target);
                self.cycles.push(cycle);
            }
        }

        self.stack.pop();
    }
}

/// Every cycle met by a depth-first search from `entry`
///
/// Each cycle is a closed walk such as `[a, b, c, a]`, listed in the order it
/// was found. Rotations of the same cycle are not merged, and each node is
/// expanded once, so a cycle only reachable through an already explored node
/// is not reported.
pub fn find_cycles<G: ImportGraph + ?Sized>(graph: &G, entry: usize) -> Vec<Vec<usize>> {
    let len = graph.node_count();
    let mut search = CycleSearch {
        graph,
        visited: vec![false; len],
        stack: Vec::new(),
        cycles: Vec::new(),
    };

    if entry < len {
        search.visit(entry);
    }
    search.cycles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_cycle() {
        let graph = vec![vec![1], vec![2], vec![0]];
        assert_eq!(find_cycles(&graph, 0), vec![vec![0, 1, 2, 0]]);
    }

    #[test]
    fn test_acyclic_graph() {
        let graph = vec![vec![1, 2], vec![2], vec![]];
        assert!(find_cycles(&graph, 0).is_empty());
    }

    #[test]
    fn test_cycles_sharing_nodes() {
        // 0 -> 1 -> 2 -> 0 and 1 -> 3 -> 1
        let graph = vec![vec![1], vec![2, 3], vec![0], vec![1]];
        assert_eq!(
            find_cycles(&graph, 0),
            vec![vec![0, 1, 2, 0], vec![1, 3, 1]]
        );
    }

    #[test]
    fn test_self_import() {
        let graph = vec![vec![0]];
        assert_eq!(find_cycles(&graph, 0), vec![vec![0, 0]]);
    }

    #[test]
    fn test_duplicate_back_edges_reported_each_time() {
        let graph = vec![vec![1], vec![0, 0]];
        assert_eq!(find_cycles(&graph, 0), vec![vec![0, 1, 0], vec![0, 1, 0]]);
    }

    #[test]
    fn test_unreachable_cycle_ignored() {
        let graph = vec![vec![], vec![2], vec![1]];
        assert!(find_cycles(&graph, 0).is_empty());
    }
}
