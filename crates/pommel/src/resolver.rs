/*
 * resolver.rs
 * Copyright (c) 2025 the pommel authors
 */

//! Template file lookup and the compiled-template store.
//!
//! The engine is agnostic to how template names map to real storage: the
//! [`FileSystem`] trait is the lookup collaborator, with disk and in-memory
//! implementations provided. Name resolution follows a fixed convention: a
//! name with an extension is used as-is; without one it first takes the
//! referencing template's extension, then falls back to `.hbs`.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::compile::CompiledTemplate;

/// File-lookup collaborator consumed by the partial/layout resolver.
///
/// Implementations may serve templates from disk, memory, or any bundle;
/// paths are opaque to the engine beyond [`combine`](FileSystem::combine).
pub trait FileSystem: Send + Sync {
    /// Whether a file exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Read the file contents at `path`.
    fn read(&self, path: &Path) -> io::Result<String>;

    /// Join a relative template name onto a base directory.
    fn combine(&self, base: &Path, name: &str) -> PathBuf {
        base.join(name)
    }
}

/// Lookup against the real filesystem, rooted at a base directory.
#[derive(Debug, Clone)]
pub struct DiskFileSystem {
    root: PathBuf,
}

impl DiskFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn full(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_owned()
        } else {
            self.root.join(path)
        }
    }
}

impl Default for DiskFileSystem {
    fn default() -> Self {
        Self::new(".")
    }
}

impl FileSystem for DiskFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.full(path).is_file()
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(self.full(path))
    }
}

/// Lookup against an in-memory map, for tests and bundled template sets.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: HashMap<PathBuf, String>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template under the given path.
    pub fn add(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> &mut Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Create a file system from `(path, content)` pairs.
    pub fn with_files(
        files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<String>)>,
    ) -> Self {
        let mut fs = Self::new();
        for (path, content) in files {
            fs.add(path, content);
        }
        fs
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }
}

/// Candidate paths for a referenced template name, in probe order.
///
/// `referrer` is the template doing the referencing; candidates are combined
/// against its directory. A name with an extension is used as-is; otherwise
/// the referrer's extension applies, then the `.hbs` default.
pub(crate) fn candidate_paths(
    fs: &dyn FileSystem,
    name: &str,
    referrer: Option<&Path>,
) -> Vec<PathBuf> {
    let base = referrer
        .and_then(Path::parent)
        .map_or_else(PathBuf::new, Path::to_owned);

    let named = Path::new(name);
    if named.extension().is_some() {
        return vec![fs.combine(&base, name)];
    }

    let mut candidates = Vec::new();
    if let Some(ext) = referrer
        .and_then(Path::extension)
        .and_then(|e| e.to_str())
    {
        candidates.push(fs.combine(&base, &format!("{name}.{ext}")));
    }
    let default = fs.combine(&base, &format!("{name}.hbs"));
    if !candidates.contains(&default) {
        candidates.push(default);
    }
    candidates.push(fs.combine(&base, name));
    candidates
}

/// Remove the final newline from partial content, so composing templates
/// does not introduce blank lines.
pub(crate) fn remove_final_newline(content: &str) -> &str {
    let content = content.strip_suffix('\n').unwrap_or(content);
    content.strip_suffix('\r').unwrap_or(content)
}

/// Shared cache of compiled templates, keyed by resolved file path.
///
/// Reads proceed unblocked under the read lock; a first-time compile takes
/// the write lock only to publish a finished `Arc`, so readers never observe
/// a partially-constructed template. Two threads racing the same first
/// compile may both compile; the duplicate work is benign.
#[derive(Debug, Default)]
pub(crate) struct TemplateStore {
    cache: RwLock<HashMap<PathBuf, Arc<CompiledTemplate>>>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Arc<CompiledTemplate>> {
        self.cache
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    pub fn insert(&self, path: PathBuf, template: Arc<CompiledTemplate>) {
        self.cache
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(path, template);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_with_extension_is_used_as_is() {
        let fs = MemoryFileSystem::new();
        let referrer = PathBuf::from("views/post.hbs");
        let candidates = candidate_paths(&fs, "header.html", Some(&referrer));
        assert_eq!(candidates, vec![PathBuf::from("views/header.html")]);
    }

    #[test]
    fn bare_name_takes_referrer_extension_then_default() {
        let fs = MemoryFileSystem::new();
        let referrer = PathBuf::from("views/post.html");
        let candidates = candidate_paths(&fs, "header", Some(&referrer));
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("views/header.html"),
                PathBuf::from("views/header.hbs"),
                PathBuf::from("views/header"),
            ]
        );
    }

    #[test]
    fn no_referrer_resolves_from_the_root() {
        let fs = MemoryFileSystem::new();
        let candidates = candidate_paths(&fs, "index", None);
        assert_eq!(
            candidates,
            vec![PathBuf::from("index.hbs"), PathBuf::from("index")]
        );
    }

    #[test]
    fn subdirectory_names_stay_relative_to_referrer() {
        let fs = MemoryFileSystem::new();
        let referrer = PathBuf::from("views/post.hbs");
        let candidates = candidate_paths(&fs, "partials/header", Some(&referrer));
        assert_eq!(candidates[0], PathBuf::from("views/partials/header.hbs"));
    }

    #[test]
    fn memory_file_system_round_trip() {
        let fs = MemoryFileSystem::with_files([("a.hbs", "A"), ("b.hbs", "B")]);
        assert!(fs.exists(Path::new("a.hbs")));
        assert!(!fs.exists(Path::new("c.hbs")));
        assert_eq!(fs.read(Path::new("b.hbs")).unwrap(), "B");
        assert!(fs.read(Path::new("c.hbs")).is_err());
    }

    #[test]
    fn final_newline_removal() {
        assert_eq!(remove_final_newline("hello\n"), "hello");
        assert_eq!(remove_final_newline("hello\r\n"), "hello");
        assert_eq!(remove_final_newline("hello"), "hello");
        assert_eq!(remove_final_newline("hello\n\n"), "hello\n");
        assert_eq!(remove_final_newline(""), "");
    }
}
