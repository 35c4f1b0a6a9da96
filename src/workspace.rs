//! Package discovery through `cargo metadata`
//!
//! Finds the crate root file to start from and the dependency names that
//! count as external crates.

use std::path::{Path, PathBuf};

use cargo_metadata::{Dependency, MetadataCommand, Package};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while reading workspace metadata
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Failed to run cargo metadata: {0}")]
    Metadata(#[from] cargo_metadata::Error),

    #[error("No package found for {}", .0.display())]
    NoPackage(PathBuf),

    #[error("Package `{0}` has no library or binary target")]
    NoTarget(String),
}

/// What the analysis needs to know about one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub package: String,
    /// Crate root: the library target, else the first binary
    pub entry: PathBuf,
    /// Directory holding the package manifest
    pub project_dir: PathBuf,
    /// Dependency names as written in paths
    pub extern_crates: Vec<String>,
}

impl ProjectLayout {
    /// Locate the package containing `path`
    ///
    /// In a workspace, the member whose directory is the closest ancestor of
    /// `path` wins; otherwise the root package, otherwise the first member.
    pub fn discover(path: &Path, manifest_path: Option<&Path>) -> Result<Self, WorkspaceError> {
        let mut command = MetadataCommand::new();
        command.no_deps();
        match manifest_path {
            Some(manifest) => {
                command.manifest_path(manifest);
            }
            None => {
                let dir = if path.is_file() {
                    path.parent().unwrap_or(path)
                } else {
                    path
                };
                command.current_dir(dir);
            }
        }

        let metadata = command.exec()?;
        let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let package = metadata
            .workspace_packages()
            .into_iter()
            .filter(|p| {
                p.manifest_path
                    .parent()
                    .is_some_and(|dir| absolute.starts_with(dir.as_std_path()))
            })
            .max_by_key(|p| p.manifest_path.components().count())
            .or_else(|| metadata.root_package())
            .or_else(|| metadata.packages.first())
            .ok_or_else(|| WorkspaceError::NoPackage(path.to_path_buf()))?;

        Self::from_package(package)
    }

    fn from_package(package: &Package) -> Result<Self, WorkspaceError> {
        let target = package
            .targets
            .iter()
            .find(|t| t.is_lib() || t.is_proc_macro())
            .or_else(|| package.targets.iter().find(|t| t.is_bin()))
            .ok_or_else(|| WorkspaceError::NoTarget(package.name.clone()))?;

        let project_dir = package
            .manifest_path
            .parent()
            .map(|dir| dir.as_std_path().to_path_buf())
            .unwrap_or_default();

        let mut extern_crates: Vec<String> =
            package.dependencies.iter().map(dependency_name).collect();
        // Binaries refer to their own library by its crate name
        if let Some(lib) = package.targets.iter().find(|t| t.is_lib()) {
            extern_crates.push(lib.name.replace('-', "_"));
        }

        let layout = Self {
            package: package.name.clone(),
            entry: target.src_path.clone().into_std_path_buf(),
            project_dir,
            extern_crates,
        };
        debug!(
            "Package {} entry {} ({} dependencies)",
            layout.package,
            layout.entry.display(),
            layout.extern_crates.len()
        );
        Ok(layout)
    }
}

/// Name a dependency is referred to by in source paths
fn dependency_name(dependency: &Dependency) -> String {
    dependency
        .rename
        .as_deref()
        .unwrap_or(&dependency.name)
        .replace('-', "_")
}
