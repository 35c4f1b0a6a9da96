//! Language-neutral syntax tree used by the complexity scorer
//!
//! Front ends (see [`crate::analyzer`]) lower their native AST into this
//! closed set of node kinds. Every kind carries a fixed weight; kinds that
//! do not contribute to complexity weigh 0.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a syntax node
///
/// The weight table lives in [`SyntaxKind::weight`]. Control flow is
/// moderate, constructs that bypass the type system or the borrow checker
/// are expensive, declarations are cheap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyntaxKind {
    /// Root of a parsed file
    File,
    /// `use` item (also `pub use` re-exports)
    Use,
    /// Out-of-line `mod name;` or inline `mod name { .. }`
    Mod,
    /// A module reference inside a `use`/`mod` statement
    ModuleSpecifier,
    /// `extern { .. }` block
    ForeignMod,
    Fn,
    Closure,
    Struct,
    Enum,
    Trait,
    /// Inherent `impl Type`
    Impl,
    /// `impl Trait for Type`
    ImplTrait,
    Const,
    Static,
    Let,
    Block,
    If,
    Else,
    For,
    While,
    Loop,
    Match,
    MatchArm,
    Break,
    Continue,
    Return,
    /// `?` operator, a conditional early return
    Try,
    Async,
    Await,
    Yield,
    /// `unsafe` block, fn or impl
    Unsafe,
    /// `as` conversion
    Cast,
    /// `dyn Any` type annotation
    AnyType,
    /// `self` receiver or value
    SelfValue,
    Macro,
}

impl SyntaxKind {
    /// Complexity weight of one node of this kind
    pub const fn weight(self) -> u64 {
        match self {
            SyntaxKind::Unsafe => 20,
            SyntaxKind::Cast | SyntaxKind::AnyType => 10,
            SyntaxKind::ImplTrait => 7,
            SyntaxKind::For | SyntaxKind::While | SyntaxKind::Loop => 5,
            SyntaxKind::Match => 4,
            SyntaxKind::If | SyntaxKind::Try => 3,
            SyntaxKind::Else
            | SyntaxKind::Fn
            | SyntaxKind::Closure
            | SyntaxKind::Struct
            | SyntaxKind::Enum
            | SyntaxKind::Trait
            | SyntaxKind::Impl
            | SyntaxKind::Static
            | SyntaxKind::Let
            | SyntaxKind::Use
            | SyntaxKind::Mod
            | SyntaxKind::Yield => 2,
            SyntaxKind::Const
            | SyntaxKind::MatchArm
            | SyntaxKind::Continue
            | SyntaxKind::SelfValue => 1,
            SyntaxKind::File
            | SyntaxKind::ModuleSpecifier
            | SyntaxKind::ForeignMod
            | SyntaxKind::Block
            | SyntaxKind::Break
            | SyntaxKind::Return
            | SyntaxKind::Async
            | SyntaxKind::Await
            | SyntaxKind::Macro => 0,
        }
    }

    /// Whether children of this kind sit one nesting level deeper
    pub const fn opens_scope(self) -> bool {
        matches!(
            self,
            SyntaxKind::Fn
                | SyntaxKind::Closure
                | SyntaxKind::Trait
                | SyntaxKind::Impl
                | SyntaxKind::ImplTrait
                | SyntaxKind::Mod
                | SyntaxKind::Block
                | SyntaxKind::If
                | SyntaxKind::Else
                | SyntaxKind::For
                | SyntaxKind::While
                | SyntaxKind::Loop
                | SyntaxKind::Match
                | SyntaxKind::Async
                | SyntaxKind::Unsafe
        )
    }

    /// Statements that can carry module specifiers
    pub const fn is_import(self) -> bool {
        matches!(self, SyntaxKind::Use | SyntaxKind::Mod)
    }
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A node of the lowered syntax tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    /// Module reference text, only set on [`SyntaxKind::ModuleSpecifier`]
    pub text: Option<String>,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn new(kind: SyntaxKind) -> Self {
        Self {
            kind,
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_children(kind: SyntaxKind, children: Vec<SyntaxNode>) -> Self {
        Self {
            kind,
            text: None,
            children,
        }
    }

    pub fn specifier(text: impl Into<String>) -> Self {
        Self {
            kind: SyntaxKind::ModuleSpecifier,
            text: Some(text.into()),
            children: Vec::new(),
        }
    }

    /// Module specifiers of the top-level import statements, in source order
    pub fn top_level_specifiers(&self) -> impl Iterator<Item = &str> {
        self.children
            .iter()
            .filter(|stmt| stmt.kind.is_import())
            .flat_map(|stmt| stmt.children.iter())
            .filter(|child| child.kind == SyntaxKind::ModuleSpecifier)
            .filter_map(|child| child.text.as_deref())
    }

    /// Total number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(SyntaxNode::node_count)
            .sum::<usize>()
    }
}
