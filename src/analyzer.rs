//! Source parsing for import graph analysis
//!
//! Uses `syn` to parse Rust source code and lowers it into the crate's
//! [`SyntaxNode`] tree. Top-level `use` items and out-of-line `mod`
//! declarations become module specifiers for the graph builder.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use syn::visit::{self, Visit};
use syn::{
    Arm, Attribute, ExprAsync, ExprAwait, ExprBlock, ExprBreak, ExprCast, ExprClosure,
    ExprContinue, ExprForLoop, ExprIf, ExprLoop, ExprMacro, ExprMatch, ExprReturn, ExprTry,
    ExprUnsafe, ExprWhile, ExprYield, File, ImplItemFn, Item, ItemConst, ItemEnum, ItemFn,
    ItemForeignMod, ItemImpl, ItemMacro, ItemMod, ItemStatic, ItemStruct, ItemTrait, ItemUse,
    Local, Receiver, StmtMacro, TraitItemFn, TypeParamBound, TypeTraitObject, UseTree,
};
use thiserror::Error;

use crate::syntax::{SyntaxKind, SyntaxNode};

/// Errors that can occur while parsing a single file
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {message}", .path.display())]
    Syntax { path: PathBuf, message: String },
}

impl ParseError {
    pub fn path(&self) -> &Path {
        match self {
            ParseError::Io { path, .. } | ParseError::Syntax { path, .. } => path,
        }
    }

    /// The file could not be read at all (as opposed to read but rejected)
    pub fn is_unreadable(&self) -> bool {
        matches!(self, ParseError::Io { .. })
    }
}

/// A parsed source file
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub root: SyntaxNode,
    pub line_count: usize,
    /// Declaration-only files carry no executable content; their imports
    /// are not followed.
    pub declaration_only: bool,
}

/// Turns a file on disk into a [`ParsedSource`]
pub trait SourceParser: Send + Sync {
    fn parse(&self, path: &Path) -> Result<ParsedSource, ParseError>;
}

/// [`SourceParser`] for Rust files
#[derive(Debug, Clone, Default)]
pub struct RustSourceParser {
    /// Drop top-level `#[cfg(test)]` items
    pub exclude_tests: bool,
}

impl RustSourceParser {
    pub fn new(exclude_tests: bool) -> Self {
        Self { exclude_tests }
    }

    /// Parse already loaded source text
    pub fn parse_str(&self, path: &Path, content: &str) -> Result<ParsedSource, ParseError> {
        let file: File = syn::parse_file(content).map_err(|e| ParseError::Syntax {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(ParsedSource {
            root: self.lower_file(&file),
            line_count: content.lines().count(),
            declaration_only: is_declaration_only(&file),
        })
    }

    fn lower_file(&self, file: &File) -> SyntaxNode {
        let mut lowering = TreeLowering::default();
        for item in &file.items {
            if self.exclude_tests && is_test_only(item_attrs(item)) {
                continue;
            }
            lowering.visit_item(item);
        }
        SyntaxNode::with_children(SyntaxKind::File, lowering.current)
    }
}

impl SourceParser for RustSourceParser {
    fn parse(&self, path: &Path) -> Result<ParsedSource, ParseError> {
        let content = fs::read_to_string(path).map_err(|source| match source.kind() {
            // Readable, but not UTF-8 source text
            ErrorKind::InvalidData => ParseError::Syntax {
                path: path.to_path_buf(),
                message: source.to_string(),
            },
            _ => ParseError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        self.parse_str(path, &content)
    }
}

/// FFI binding files: nothing but `extern` blocks and `use` items
fn is_declaration_only(file: &File) -> bool {
    file.items.iter().any(|item| matches!(item, Item::ForeignMod(_)))
        && file
            .items
            .iter()
            .all(|item| matches!(item, Item::ForeignMod(_) | Item::Use(_)))
}

fn item_attrs(item: &Item) -> &[Attribute] {
    match item {
        Item::Const(i) => &i.attrs,
        Item::Enum(i) => &i.attrs,
        Item::ExternCrate(i) => &i.attrs,
        Item::Fn(i) => &i.attrs,
        Item::ForeignMod(i) => &i.attrs,
        Item::Impl(i) => &i.attrs,
        Item::Macro(i) => &i.attrs,
        Item::Mod(i) => &i.attrs,
        Item::Static(i) => &i.attrs,
        Item::Struct(i) => &i.attrs,
        Item::Trait(i) => &i.attrs,
        Item::TraitAlias(i) => &i.attrs,
        Item::Type(i) => &i.attrs,
        Item::Union(i) => &i.attrs,
        Item::Use(i) => &i.attrs,
        _ => &[],
    }
}

/// `#[cfg(test)]`
fn is_test_only(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| {
        attr.path().is_ident("cfg")
            && matches!(&attr.meta, syn::Meta::List(list) if list.tokens.to_string() == "test")
    })
}

/// Flatten a use tree into full paths
///
/// `crate::models::{User, Post}` yields `crate::models::User` and
/// `crate::models::Post`. Globs and `self` imports yield the module path.
pub fn extract_use_paths(tree: &UseTree, prefix: &str) -> Vec<String> {
    let join = |ident: &syn::Ident| {
        if prefix.is_empty() {
            ident.to_string()
        } else {
            format!("{}::{}", prefix, ident)
        }
    };

    match tree {
        UseTree::Path(path) => extract_use_paths(&path.tree, &join(&path.ident)),
        UseTree::Name(name) if name.ident == "self" => vec![prefix.to_string()],
        UseTree::Name(name) => vec![join(&name.ident)],
        UseTree::Rename(rename) if rename.ident == "self" => vec![prefix.to_string()],
        UseTree::Rename(rename) => vec![join(&rename.ident)],
        UseTree::Glob(_) => vec![prefix.to_string()],
        UseTree::Group(group) => group
            .items
            .iter()
            .flat_map(|item| extract_use_paths(item, prefix))
            .filter(|path| !path.is_empty())
            .collect(),
    }
}

/// Builds a [`SyntaxNode`] tree while walking the `syn` AST
#[derive(Debug, Default)]
struct TreeLowering {
    /// Children collected for the node currently being built
    current: Vec<SyntaxNode>,
}

impl TreeLowering {
    fn leaf(&mut self, kind: SyntaxKind) {
        self.current.push(SyntaxNode::new(kind));
    }

    fn node(&mut self, kind: SyntaxKind, walk: impl FnOnce(&mut Self)) {
        let parent = std::mem::take(&mut self.current);
        walk(self);
        let children = std::mem::replace(&mut self.current, parent);
        self.current.push(SyntaxNode::with_children(kind, children));
    }
}

impl<'ast> Visit<'ast> for TreeLowering {
    fn visit_item_use(&mut self, node: &'ast ItemUse) {
        self.node(SyntaxKind::Use, |v| {
            for path in extract_use_paths(&node.tree, "") {
                if !path.is_empty() {
                    v.current.push(SyntaxNode::specifier(path));
                }
            }
        });
    }

    fn visit_item_mod(&mut self, node: &'ast ItemMod) {
        self.node(SyntaxKind::Mod, |v| {
            if node.content.is_none() {
                v.current.push(SyntaxNode::specifier(format!("self::{}", node.ident)));
            }
            visit::visit_item_mod(v, node);
        });
    }

    fn visit_item_foreign_mod(&mut self, node: &'ast ItemForeignMod) {
        self.node(SyntaxKind::ForeignMod, |v| visit::visit_item_foreign_mod(v, node));
    }

    fn visit_item_fn(&mut self, node: &'ast ItemFn) {
        self.node(SyntaxKind::Fn, |v| {
            if node.sig.unsafety.is_some() {
                v.leaf(SyntaxKind::Unsafe);
            }
            visit::visit_item_fn(v, node);
        });
    }

    fn visit_impl_item_fn(&mut self, node: &'ast ImplItemFn) {
        self.node(SyntaxKind::Fn, |v| {
            if node.sig.unsafety.is_some() {
                v.leaf(SyntaxKind::Unsafe);
            }
            visit::visit_impl_item_fn(v, node);
        });
    }

    fn visit_trait_item_fn(&mut self, node: &'ast TraitItemFn) {
        self.node(SyntaxKind::Fn, |v| visit::visit_trait_item_fn(v, node));
    }

    fn visit_item_impl(&mut self, node: &'ast ItemImpl) {
        let kind = if node.trait_.is_some() {
            SyntaxKind::ImplTrait
        } else {
            SyntaxKind::Impl
        };
        self.node(kind, |v| {
            if node.unsafety.is_some() {
                v.leaf(SyntaxKind::Unsafe);
            }
            visit::visit_item_impl(v, node);
        });
    }

    fn visit_item_trait(&mut self, node: &'ast ItemTrait) {
        self.node(SyntaxKind::Trait, |v| visit::visit_item_trait(v, node));
    }

    fn visit_item_struct(&mut self, node: &'ast ItemStruct) {
        self.node(SyntaxKind::Struct, |v| visit::visit_item_struct(v, node));
    }

    fn visit_item_enum(&mut self, node: &'ast ItemEnum) {
        self.node(SyntaxKind::Enum, |v| visit::visit_item_enum(v, node));
    }

    fn visit_item_const(&mut self, node: &'ast ItemConst) {
        self.node(SyntaxKind::Const, |v| visit::visit_item_const(v, node));
    }

    fn visit_item_static(&mut self, node: &'ast ItemStatic) {
        self.node(SyntaxKind::Static, |v| visit::visit_item_static(v, node));
    }

    fn visit_item_macro(&mut self, node: &'ast ItemMacro) {
        self.node(SyntaxKind::Macro, |v| visit::visit_item_macro(v, node));
    }

    fn visit_local(&mut self, node: &'ast Local) {
        self.node(SyntaxKind::Let, |v| visit::visit_local(v, node));
    }

    fn visit_expr_if(&mut self, node: &'ast ExprIf) {
        self.node(SyntaxKind::If, |v| {
            v.visit_expr(&node.cond);
            v.visit_block(&node.then_branch);
            if let Some((_, else_branch)) = &node.else_branch {
                v.node(SyntaxKind::Else, |v| v.visit_expr(else_branch));
            }
        });
    }

    fn visit_expr_for_loop(&mut self, node: &'ast ExprForLoop) {
        self.node(SyntaxKind::For, |v| visit::visit_expr_for_loop(v, node));
    }

    fn visit_expr_while(&mut self, node: &'ast ExprWhile) {
        self.node(SyntaxKind::While, |v| visit::visit_expr_while(v, node));
    }

    fn visit_expr_loop(&mut self, node: &'ast ExprLoop) {
        self.node(SyntaxKind::Loop, |v| visit::visit_expr_loop(v, node));
    }

    fn visit_expr_match(&mut self, node: &'ast ExprMatch) {
        self.node(SyntaxKind::Match, |v| visit::visit_expr_match(v, node));
    }

    fn visit_arm(&mut self, node: &'ast Arm) {
        self.node(SyntaxKind::MatchArm, |v| visit::visit_arm(v, node));
    }

    fn visit_expr_break(&mut self, node: &'ast ExprBreak) {
        self.node(SyntaxKind::Break, |v| visit::visit_expr_break(v, node));
    }

    fn visit_expr_continue(&mut self, node: &'ast ExprContinue) {
        self.node(SyntaxKind::Continue, |v| visit::visit_expr_continue(v, node));
    }

    fn visit_expr_return(&mut self, node: &'ast ExprReturn) {
        self.node(SyntaxKind::Return, |v| visit::visit_expr_return(v, node));
    }

    fn visit_expr_try(&mut self, node: &'ast ExprTry) {
        self.node(SyntaxKind::Try, |v| visit::visit_expr_try(v, node));
    }

    fn visit_expr_async(&mut self, node: &'ast ExprAsync) {
        self.node(SyntaxKind::Async, |v| visit::visit_expr_async(v, node));
    }

    fn visit_expr_await(&mut self, node: &'ast ExprAwait) {
        self.node(SyntaxKind::Await, |v| visit::visit_expr_await(v, node));
    }

    fn visit_expr_yield(&mut self, node: &'ast ExprYield) {
        self.node(SyntaxKind::Yield, |v| visit::visit_expr_yield(v, node));
    }

    fn visit_expr_unsafe(&mut self, node: &'ast ExprUnsafe) {
        self.node(SyntaxKind::Unsafe, |v| visit::visit_expr_unsafe(v, node));
    }

    fn visit_expr_cast(&mut self, node: &'ast ExprCast) {
        self.node(SyntaxKind::Cast, |v| visit::visit_expr_cast(v, node));
    }

    fn visit_expr_closure(&mut self, node: &'ast ExprClosure) {
        self.node(SyntaxKind::Closure, |v| visit::visit_expr_closure(v, node));
    }

    fn visit_expr_block(&mut self, node: &'ast ExprBlock) {
        self.node(SyntaxKind::Block, |v| visit::visit_expr_block(v, node));
    }

    fn visit_expr_macro(&mut self, node: &'ast ExprMacro) {
        self.node(SyntaxKind::Macro, |v| visit::visit_expr_macro(v, node));
    }

    fn visit_stmt_macro(&mut self, node: &'ast StmtMacro) {
        self.node(SyntaxKind::Macro, |v| visit::visit_stmt_macro(v, node));
    }

    fn visit_receiver(&mut self, node: &'ast Receiver) {
        self.leaf(SyntaxKind::SelfValue);
        visit::visit_receiver(self, node);
    }

    fn visit_type_trait_object(&mut self, node: &'ast TypeTraitObject) {
        let is_any = node.bounds.iter().any(|bound| match bound {
            TypeParamBound::Trait(trait_bound) => trait_bound
                .path
                .segments
                .last()
                .is_some_and(|segment| segment.ident == "Any"),
            _ => false,
        });
        if is_any {
            self.leaf(SyntaxKind::AnyType);
        }
        visit::visit_type_trait_object(self, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(code: &str) -> ParsedSource {
        RustSourceParser::default()
            .parse_str(Path::new("test.rs"), code)
            .unwrap()
    }

    fn count_kind(node: &SyntaxNode, kind: SyntaxKind) -> usize {
        usize::from(node.kind == kind)
            + node
                .children
                .iter()
                .map(|c| count_kind(c, kind))
                .sum::<usize>()
    }

    #[test]
    fn test_extract_use_paths() {
        let tree: UseTree = syn::parse_quote!(std::collections::HashMap);
        assert_eq!(extract_use_paths(&tree, ""), vec!["std::collections::HashMap"]);

        let tree: UseTree = syn::parse_quote!(crate::models::{User, Post});
        assert_eq!(
            extract_use_paths(&tree, ""),
            vec!["crate::models::User", "crate::models::Post"]
        );

        let tree: UseTree = syn::parse_quote!(crate::models::{self, user::*});
        assert_eq!(
            extract_use_paths(&tree, ""),
            vec!["crate::models", "crate::models::user"]
        );

        let tree: UseTree = syn::parse_quote!(super::Config as Cfg);
        assert_eq!(extract_use_paths(&tree, ""), vec!["super::Config"]);
    }

    #[test]
    fn test_top_level_specifiers() {
        let parsed = parse(
            r#"
            use std::collections::HashMap;
            use crate::models::{User, Post};
            pub use self::util::helper;
            mod util;
            mod inline {
                use crate::ignored;
            }

            fn run() {
                use crate::also_ignored;
            }
        "#,
        );

        let specs: Vec<_> = parsed.root.top_level_specifiers().collect();
        assert_eq!(
            specs,
            vec![
                "std::collections::HashMap",
                "crate::models::User",
                "crate::models::Post",
                "self::util::helper",
                "self::util",
            ]
        );
        assert!(!parsed.declaration_only);
    }

    #[test]
    fn test_control_flow_lowering() {
        let parsed = parse(
            r#"
            fn process(items: &[u32]) -> Result<u32, String> {
                let mut total = 0;
                for item in items {
                    if *item > 10 {
                        total += *item as u32;
                    } else if *item == 0 {
                        continue;
                    } else {
                        break;
                    }
                }
                match total {
                    0 => Err("empty".to_string()),
                    n => Ok(n),
                }
            }
        "#,
        );

        let root = &parsed.root;
        assert_eq!(count_kind(root, SyntaxKind::Fn), 1);
        assert_eq!(count_kind(root, SyntaxKind::For), 1);
        assert_eq!(count_kind(root, SyntaxKind::If), 2);
        assert_eq!(count_kind(root, SyntaxKind::Else), 2);
        assert_eq!(count_kind(root, SyntaxKind::Cast), 1);
        assert_eq!(count_kind(root, SyntaxKind::Match), 1);
        assert_eq!(count_kind(root, SyntaxKind::MatchArm), 2);
        assert_eq!(count_kind(root, SyntaxKind::Let), 1);
        assert_eq!(count_kind(root, SyntaxKind::Continue), 1);
    }

    #[test]
    fn test_risky_constructs() {
        let parsed = parse(
            r#"
            use std::any::Any;
            unsafe impl Send for Handle {}
            fn raw(value: Box<dyn Any>) -> usize {
                unsafe { std::mem::transmute::<_, usize>(value) }
            }
        "#,
        );

        assert_eq!(count_kind(&parsed.root, SyntaxKind::Unsafe), 2);
        assert_eq!(count_kind(&parsed.root, SyntaxKind::AnyType), 1);
        assert_eq!(count_kind(&parsed.root, SyntaxKind::ImplTrait), 1);
    }

    #[test]
    fn test_exclude_tests() {
        let code = r#"
            fn real() {}

            #[cfg(test)]
            mod tests;
        "#;

        let with_tests = parse(code);
        assert_eq!(with_tests.root.top_level_specifiers().count(), 1);

        let without_tests = RustSourceParser::new(true)
            .parse_str(Path::new("lib.rs"), code)
            .unwrap();
        assert_eq!(without_tests.root.top_level_specifiers().count(), 0);
        assert_eq!(without_tests.root.children.len(), 1);
    }

    #[test]
    fn test_declaration_only() {
        let parsed = parse(
            r#"
            use std::os::raw::c_int;
            extern "C" {
                fn abs(x: c_int) -> c_int;
            }
        "#,
        );
        assert!(parsed.declaration_only);
    }

    #[test]
    fn test_line_count_and_syntax_error() {
        let parsed = parse("fn a() {}\nfn b() {}\n");
        assert_eq!(parsed.line_count, 2);

        let err = RustSourceParser::default()
            .parse_str(Path::new("broken.rs"), "fn broken( {")
            .unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
        assert!(!err.is_unreadable());
        assert_eq!(err.path(), Path::new("broken.rs"));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let err = RustSourceParser::default()
            .parse(Path::new("/nonexistent/importgraph/missing.rs"))
            .unwrap_err();
        assert!(err.is_unreadable());
    }

    #[test]
    fn test_non_utf8_file_is_a_syntax_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("latin1.rs");
        std::fs::write(&path, b"// caf\xe9\nfn main() {}\n").unwrap();

        let err = RustSourceParser::default().parse(&path).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
        assert!(!err.is_unreadable());
    }
}
