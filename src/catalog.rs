//! File Catalog
//!
//! Walks a root directory, selects files by supported extension, applies
//! exclusion rules, and produces a deterministic sorted list of catalog
//! entries with size metrics.
//!
//! Exclusion rules run before size/token estimation so excluded trees are
//! never read. Individual unreadable files are skipped and reported; only a
//! missing or unreadable root is fatal.

use ignore::WalkBuilder;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::ai::TokenCounter;
use crate::config::Config;
use crate::error::{DocError, Result};

/// A discovered source file with its path and size metrics.
///
/// Identity is the normalized root-relative path. Entries are immutable
/// after discovery and owned by the catalog for the run's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Root-relative path with forward slashes
    pub path: String,
    /// Extension tag (lowercase, without dot)
    pub extension: String,
    /// File size in bytes
    pub byte_size: u64,
    /// Estimated token count of the file content
    pub token_estimate: usize,
}

/// A file skipped during discovery, with the reason
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Deterministic catalog of discovered source files
#[derive(Debug)]
pub struct FileCatalog {
    root: PathBuf,
    /// Keyed by relative path: iteration order is the sorted catalog order
    entries: BTreeMap<String, CatalogEntry>,
    skipped: Vec<SkippedFile>,
}

impl FileCatalog {
    /// Discover source files under `root` according to `config`.
    ///
    /// Fails with `DocError::Discovery` if the root does not exist or is
    /// not a readable directory.
    pub fn discover(root: &Path, config: &Config) -> Result<Self> {
        if !root.exists() {
            return Err(DocError::Discovery(format!(
                "Root path does not exist: {}",
                root.display()
            )));
        }
        if !root.is_dir() {
            return Err(DocError::Discovery(format!(
                "Root path is not a directory: {}",
                root.display()
            )));
        }

        let root = root
            .canonicalize()
            .map_err(|e| DocError::Discovery(format!("Cannot resolve root path: {}", e)))?;

        let counter = TokenCounter::default();
        let mut entries = BTreeMap::new();
        let mut skipped = Vec::new();

        let walker = WalkBuilder::new(&root)
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false) // prevent symlink traversal loops
            .filter_entry({
                let exclude = config.exclude_dirs.clone();
                move |entry| {
                    let name = entry.file_name().to_string_lossy();
                    !(entry.file_type().is_some_and(|t| t.is_dir())
                        && exclude.iter().any(|d| d == name.as_ref()))
                }
            })
            .build();

        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(extension) = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
            else {
                continue;
            };
            if !config.extensions.contains(&extension) {
                continue;
            }

            let rel = relative_path(&root, path);

            let metadata = match path.metadata() {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %rel, "Skipping unreadable file: {}", e);
                    skipped.push(SkippedFile {
                        path: rel,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if metadata.len() > config.max_file_size {
                debug!(path = %rel, size = metadata.len(), "Skipping oversized file");
                skipped.push(SkippedFile {
                    path: rel,
                    reason: format!("exceeds max file size ({} bytes)", metadata.len()),
                });
                continue;
            }

            let content = match std::fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) => {
                    warn!(path = %rel, "Skipping unreadable file: {}", e);
                    skipped.push(SkippedFile {
                        path: rel,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            entries.insert(
                rel.clone(),
                CatalogEntry {
                    path: rel,
                    extension,
                    byte_size: metadata.len(),
                    token_estimate: counter.count(&content),
                },
            );
        }

        Ok(Self {
            root,
            entries,
            skipped,
        })
    }

    /// Canonicalized root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stable identity for this root: hex sha256 of the canonical path.
    /// Namespaces the checkpoint store per (root, budget).
    pub fn root_identity(&self) -> String {
        root_identity_for(&self.root)
    }

    /// Entries in sorted path order
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by relative path
    pub fn get(&self, path: &str) -> Option<&CatalogEntry> {
        self.entries.get(path)
    }

    /// Whether a relative path exists in the catalog
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Files skipped during discovery
    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// Read the content of a cataloged entry
    pub fn read_content(&self, entry: &CatalogEntry) -> Result<String> {
        Ok(std::fs::read_to_string(self.root.join(&entry.path))?)
    }
}

/// Identity of an already canonicalized root path
pub fn root_identity_for(root: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(root.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
