//! Weighted complexity scoring over a [`SyntaxNode`] tree
//!
//! Each node contributes `weight(kind) * (depth + 10)`. The offset gives
//! root-level constructs a non-zero baseline while keeping growth linear in
//! depth.

use serde::{Deserialize, Serialize};

use crate::syntax::SyntaxNode;

/// Offset added to the depth before multiplying by a node's weight
pub const DEPTH_OFFSET: u64 = 10;

/// How depth evolves while descending the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthMode {
    /// Every node is scored at the depth the walk started with.
    ///
    /// This keeps the historical scores stable: `max_depth` always equals
    /// the starting depth and the depth factor is constant per file.
    #[default]
    Flat,
    /// Children of scope-opening kinds are scored one level deeper.
    Nested,
}

/// Result of scoring one subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComplexityScore {
    pub complexity: u64,
    pub max_depth: usize,
}

/// Scores syntax trees with a fixed [`DepthMode`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplexityScorer {
    mode: DepthMode,
}

impl ComplexityScorer {
    pub fn new(mode: DepthMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> DepthMode {
        self.mode
    }

    /// Score a whole file, starting at depth 0
    pub fn score_file(&self, root: &SyntaxNode) -> ComplexityScore {
        self.score(root, 0)
    }

    /// Score `node` and its subtree, starting at `depth`
    pub fn score(&self, node: &SyntaxNode, depth: usize) -> ComplexityScore {
        let mut complexity = node.kind.weight() * (depth as u64 + DEPTH_OFFSET);
        let mut max_depth = depth;

        let child_depth = match self.mode {
            DepthMode::Flat => depth,
            DepthMode::Nested if node.kind.opens_scope() => depth + 1,
            DepthMode::Nested => depth,
        };

        for child in &node.children {
            let child_score = self.score(child, child_depth);
            complexity += child_score.complexity;
            max_depth = max_depth.max(child_score.max_depth);
        }

        ComplexityScore {
            complexity,
            max_depth,
        }
    }
}

/// Score `node` with the flat depth mode
pub fn complexity_and_depth(node: &SyntaxNode, depth: usize) -> (u64, usize) {
    let score = ComplexityScorer::new(DepthMode::Flat).score(node, depth);
    (score.complexity, score.max_depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::SyntaxKind;

    fn leaf(kind: SyntaxKind) -> SyntaxNode {
        SyntaxNode::new(kind)
    }

    #[test]
    fn test_top_level_if_and_for() {
        let root = SyntaxNode::with_children(
            SyntaxKind::File,
            vec![leaf(SyntaxKind::If), leaf(SyntaxKind::For)],
        );

        let (complexity, max_depth) = complexity_and_depth(&root, 0);
        assert_eq!(
            complexity,
            SyntaxKind::If.weight() * 10 + SyntaxKind::For.weight() * 10
        );
        assert_eq!(complexity, 80);
        assert_eq!(max_depth, 0);
    }

    #[test]
    fn test_flat_mode_ignores_nesting() {
        // if { for { while {} } } scores the same as three siblings
        let nested = SyntaxNode::with_children(
            SyntaxKind::File,
            vec![SyntaxNode::with_children(
                SyntaxKind::If,
                vec![SyntaxNode::with_children(
                    SyntaxKind::For,
                    vec![leaf(SyntaxKind::While)],
                )],
            )],
        );
        let flat = SyntaxNode::with_children(
            SyntaxKind::File,
            vec![
                leaf(SyntaxKind::If),
                leaf(SyntaxKind::For),
                leaf(SyntaxKind::While),
            ],
        );

        assert_eq!(
            complexity_and_depth(&nested, 0),
            complexity_and_depth(&flat, 0)
        );
        assert_eq!(complexity_and_depth(&nested, 0).1, 0);
    }

    #[test]
    fn test_starting_depth_scales_every_node() {
        let root = SyntaxNode::with_children(SyntaxKind::File, vec![leaf(SyntaxKind::If)]);
        let (complexity, max_depth) = complexity_and_depth(&root, 2);
        assert_eq!(complexity, 3 * 12);
        assert_eq!(max_depth, 2);
    }

    #[test]
    fn test_nested_mode_increments_depth() {
        let root = SyntaxNode::with_children(
            SyntaxKind::File,
            vec![SyntaxNode::with_children(
                SyntaxKind::Fn,
                vec![SyntaxNode::with_children(
                    SyntaxKind::If,
                    vec![leaf(SyntaxKind::Let)],
                )],
            )],
        );

        let score = ComplexityScorer::new(DepthMode::Nested).score_file(&root);
        // Fn at 0, If at 1, Let at 2
        assert_eq!(score.complexity, 2 * 10 + 3 * 11 + 2 * 12);
        assert_eq!(score.max_depth, 2);
    }

    #[test]
    fn test_unlisted_kinds_contribute_nothing() {
        let root = SyntaxNode::with_children(
            SyntaxKind::File,
            vec![leaf(SyntaxKind::Block), leaf(SyntaxKind::Macro)],
        );
        assert_eq!(complexity_and_depth(&root, 0), (0, 0));
    }
}
