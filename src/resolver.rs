//! Module specifier resolution
//!
//! Maps a specifier such as `crate::models::User` to the file that defines
//! the module, or classifies it as an external crate reference.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::Pattern;

/// Crates that are always available without a manifest entry
const BUILTIN_CRATES: &[&str] = &["std", "core", "alloc", "proc_macro", "test"];

/// Outcome of resolving one module specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A file inside the analysed project
    Internal(PathBuf),
    /// A package outside the project, keeps the raw specifier
    External(String),
    /// Matched an exclude pattern; the edge is dropped without a warning
    Excluded(PathBuf),
    /// The specifier does not name anything we can locate
    Unresolved,
}

/// Resolves specifiers relative to the importing file
pub trait ModuleResolver: Send + Sync {
    fn resolve(&self, specifier: &str, importer: &Path) -> Resolution;
}

/// [`ModuleResolver`] for the 2018+ Rust module system
///
/// Modules map to `name.rs` or `name/mod.rs` below the directory of the
/// crate root. `#[path]` attributes are not followed.
#[derive(Debug, Clone)]
pub struct RustModuleResolver {
    /// Crate root file (`src/lib.rs`, `src/main.rs`, ...)
    root_file: PathBuf,
    /// Directory holding the crate root
    src_dir: PathBuf,
    /// Project directory that exclude patterns are relative to
    project_dir: PathBuf,
    /// Dependency names as they appear in paths (`-` replaced by `_`)
    extern_crates: HashSet<String>,
    /// Whether `extern_crates` came from a manifest
    has_manifest: bool,
    exclude: Vec<Pattern>,
}

impl RustModuleResolver {
    pub fn new(root_file: impl Into<PathBuf>) -> Self {
        let root_file = root_file.into();
        let src_dir = root_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let project_dir = if src_dir.file_name().is_some_and(|n| n == "src") {
            src_dir.parent().map(Path::to_path_buf).unwrap_or_default()
        } else {
            src_dir.clone()
        };

        Self {
            root_file,
            src_dir,
            project_dir,
            extern_crates: HashSet::new(),
            has_manifest: false,
            exclude: Vec::new(),
        }
    }

    /// Declare the crates listed in the manifest
    pub fn with_extern_crates<I, S>(mut self, crates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extern_crates = crates
            .into_iter()
            .map(|name| name.as_ref().replace('-', "_"))
            .collect();
        self.has_manifest = true;
        self
    }

    pub fn with_project_dir(mut self, project_dir: impl Into<PathBuf>) -> Self {
        self.project_dir = project_dir.into();
        self
    }

    pub fn with_exclude(mut self, exclude: Vec<Pattern>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn root_file(&self) -> &Path {
        &self.root_file
    }

    /// Module path of a file, e.g. `src/a/b.rs` -> `["a", "b"]`
    ///
    /// Returns `None` for files outside the crate's source directory.
    pub fn module_path(&self, file: &Path) -> Option<Vec<String>> {
        if file == self.root_file {
            return Some(Vec::new());
        }

        let relative = file.strip_prefix(&self.src_dir).ok()?;
        let mut segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        let file_name = segments.pop()?;
        let stem = file_name.strip_suffix(".rs")?;
        if stem != "mod" {
            segments.push(stem.to_string());
        }
        Some(segments)
    }

    /// File defining the module at `segments`, if any
    fn module_file(&self, segments: &[String]) -> Option<PathBuf> {
        if segments.is_empty() {
            return Some(self.root_file.clone());
        }

        let mut dir = self.src_dir.clone();
        for segment in &segments[..segments.len() - 1] {
            dir.push(segment);
        }
        let name = &segments[segments.len() - 1];

        let flat = dir.join(format!("{}.rs", name));
        if flat.is_file() {
            return Some(flat);
        }
        let nested = dir.join(name).join("mod.rs");
        nested.is_file().then_some(nested)
    }

    /// Deepest prefix of `segments` that has a file of its own
    fn deepest_module_file(&self, segments: &[String]) -> PathBuf {
        (1..=segments.len())
            .rev()
            .find_map(|len| self.module_file(&segments[..len]))
            .unwrap_or_else(|| self.root_file.clone())
    }

    fn is_extern_crate(&self, name: &str) -> bool {
        BUILTIN_CRATES.contains(&name) || self.extern_crates.contains(name)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        if self.exclude.is_empty() {
            return false;
        }
        let relative = path.strip_prefix(&self.project_dir).unwrap_or(path);
        let relative = relative.to_string_lossy().replace('\\', "/");
        self.exclude.iter().any(|p| p.matches(&relative))
    }

    fn internal(&self, path: PathBuf) -> Resolution {
        if self.is_excluded(&path) {
            Resolution::Excluded(path)
        } else {
            Resolution::Internal(path)
        }
    }
}

impl ModuleResolver for RustModuleResolver {
    fn resolve(&self, specifier: &str, importer: &Path) -> Resolution {
        let segments: Vec<&str> = specifier
            .trim_start_matches("::")
            .split("::")
            .filter(|s| !s.is_empty())
            .collect();

        let Some(&first) = segments.first() else {
            return Resolution::Unresolved;
        };

        let Some(importer_path) = self.module_path(importer) else {
            return Resolution::Unresolved;
        };

        let absolute: Vec<String> = match first {
            "crate" => segments[1..].iter().map(|s| s.to_string()).collect(),
            "self" => importer_path
                .iter()
                .cloned()
                .chain(segments[1..].iter().map(|s| s.to_string()))
                .collect(),
            "super" => {
                let supers = segments.iter().take_while(|s| **s == "super").count();
                if supers > importer_path.len() {
                    return Resolution::Unresolved;
                }
                importer_path[..importer_path.len() - supers]
                    .iter()
                    .cloned()
                    .chain(segments[supers..].iter().map(|s| s.to_string()))
                    .collect()
            }
            name => {
                let mut child = importer_path.clone();
                child.push(name.to_string());
                if self.module_file(&child).is_some() {
                    child
                        .into_iter()
                        .chain(segments[1..].iter().map(|s| s.to_string()))
                        .collect()
                } else if self.is_extern_crate(name) || !self.has_manifest {
                    return Resolution::External(specifier.to_string());
                } else {
                    return Resolution::Unresolved;
                }
            }
        };

        self.internal(self.deepest_module_file(&absolute))
    }
}
