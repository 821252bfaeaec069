//! Import Resolution
//!
//! Maps raw import specifiers to catalog paths using language-specific
//! rules. Resolution only ever targets files present in the catalog;
//! anything else (third-party packages, standard library, files outside
//! the root) is classified as external and kept as metadata.

use crate::analyzer::parser::Language;
use crate::catalog::FileCatalog;

/// Outcome of resolving one import specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Resolved to a catalog entry (root-relative path)
    Internal(String),
    /// Package, standard library, or otherwise outside the catalog
    External,
}

/// Resolve `spec` as written in `importer` against the catalog
pub fn resolve(
    spec: &str,
    importer: &str,
    language: Language,
    catalog: &FileCatalog,
) -> Resolution {
    match language {
        Language::TypeScript | Language::Tsx | Language::JavaScript | Language::Jsx => {
            resolve_js(spec, importer, catalog)
        }
        Language::Python => resolve_python(spec, importer, catalog),
        Language::Rust => resolve_rust(spec, importer, catalog),
    }
}

// =============================================================================
// TypeScript / JavaScript
// =============================================================================

const JS_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

fn resolve_js(spec: &str, importer: &str, catalog: &FileCatalog) -> Resolution {
    // Bare specifiers are package imports
    if !spec.starts_with("./") && !spec.starts_with("../") && spec != "." && spec != ".." {
        return Resolution::External;
    }

    let base = parent_dir(importer);
    let Some(joined) = join_normalized(base, spec) else {
        return Resolution::External;
    };

    if catalog.contains(&joined) {
        return Resolution::Internal(joined);
    }
    for ext in JS_EXTENSIONS {
        let candidate = format!("{}.{}", joined, ext);
        if catalog.contains(&candidate) {
            return Resolution::Internal(candidate);
        }
    }
    // Directory import falls back to its index file
    for ext in JS_EXTENSIONS {
        let candidate = if joined.is_empty() {
            format!("index.{}", ext)
        } else {
            format!("{}/index.{}", joined, ext)
        };
        if catalog.contains(&candidate) {
            return Resolution::Internal(candidate);
        }
    }

    Resolution::External
}

// =============================================================================
// Python
// =============================================================================

fn resolve_python(spec: &str, importer: &str, catalog: &FileCatalog) -> Resolution {
    let dots = spec.chars().take_while(|&c| c == '.').count();
    let rest = &spec[dots..];

    let candidates: Vec<String> = if dots > 0 {
        // One leading dot anchors at the importer's package; each further
        // dot climbs one package level.
        let mut base = parent_dir(importer).to_string();
        for _ in 1..dots {
            base = parent_dir(&base).to_string();
        }
        let tail = rest.replace('.', "/");
        let joined = if tail.is_empty() {
            base
        } else if base.is_empty() {
            tail
        } else {
            format!("{}/{}", base, tail)
        };
        module_candidates(&joined)
    } else {
        // Absolute imports resolve against the root, with progressively
        // shorter prefixes so `pkg.mod.name` finds pkg/mod.py.
        let segments: Vec<&str> = rest.split('.').collect();
        let mut out = Vec::new();
        for end in (1..=segments.len()).rev() {
            out.extend(module_candidates(&segments[..end].join("/")));
        }
        out
    };

    for candidate in candidates {
        if catalog.contains(&candidate) {
            return Resolution::Internal(candidate);
        }
    }
    Resolution::External
}

fn module_candidates(path: &str) -> Vec<String> {
    if path.is_empty() {
        return vec!["__init__.py".to_string()];
    }
    vec![format!("{}.py", path), format!("{}/__init__.py", path)]
}

// =============================================================================
// Rust
// =============================================================================

fn resolve_rust(spec: &str, importer: &str, catalog: &FileCatalog) -> Resolution {
    // `mod child;` declarations target a sibling file or directory module
    if let Some(name) = spec.strip_prefix("mod ") {
        let base = parent_dir(importer);
        for candidate in rust_module_candidates(base, name) {
            if catalog.contains(&candidate) {
                return Resolution::Internal(candidate);
            }
        }
        return Resolution::External;
    }

    let (anchor, rest) = if let Some(rest) = spec.strip_prefix("crate::") {
        (crate_root_dir(importer, catalog), rest)
    } else if let Some(rest) = spec.strip_prefix("self::") {
        (parent_dir(importer).to_string(), rest)
    } else if let Some(rest) = spec.strip_prefix("super::") {
        (parent_dir(parent_dir(importer)).to_string(), rest)
    } else {
        // std, core, or an external crate
        return Resolution::External;
    };

    // A use path names a module plus items inside it; drop trailing
    // segments until a module file matches.
    let segments: Vec<&str> = rest.split("::").map(str::trim).collect();
    for end in (1..=segments.len()).rev() {
        let tail = segments[..end].join("/");
        for candidate in rust_module_candidates(&anchor, &tail) {
            if catalog.contains(&candidate) {
                return Resolution::Internal(candidate);
            }
        }
    }
    Resolution::External
}

fn rust_module_candidates(base: &str, name: &str) -> Vec<String> {
    let joined = if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base, name)
    };
    vec![format!("{}.rs", joined), format!("{}/mod.rs", joined)]
}

/// Directory a `crate::` path resolves against: the nearest ancestor
/// directory of the importer containing lib.rs or main.rs, else the
/// nearest named `src`, else the catalog root.
fn crate_root_dir(importer: &str, catalog: &FileCatalog) -> String {
    let mut dir = parent_dir(importer).to_string();
    loop {
        if dir.is_empty() || is_crate_root(&dir, catalog) {
            return dir;
        }
        dir = parent_dir(&dir).to_string();
    }
}

fn is_crate_root(dir: &str, catalog: &FileCatalog) -> bool {
    let probe = |name: &str| catalog.contains(&format!("{}/{}", dir, name));
    probe("lib.rs") || probe("main.rs") || dir == "src" || dir.ends_with("/src")
}

// =============================================================================
// Path helpers
// =============================================================================

fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

/// Join a relative specifier onto a base directory, normalizing `.` and
/// `..` segments. Returns None if the path escapes the root.
fn join_normalized(base: &str, spec: &str) -> Option<String> {
    let mut parts: Vec<&str> = if base.is_empty() {
        Vec::new()
    } else {
        base.split('/').collect()
    };

    for segment in spec.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn catalog_with(files: &[&str]) -> (TempDir, FileCatalog) {
        let dir = TempDir::new().unwrap();
        for f in files {
            write(dir.path(), f, "// content");
        }
        let catalog = FileCatalog::discover(dir.path(), &Config::default()).unwrap();
        (dir, catalog)
    }

    #[test]
    fn test_js_relative_with_extension_inference() {
        let (_dir, catalog) = catalog_with(&["src/app.ts", "src/util.ts"]);
        assert_eq!(
            resolve("./util", "src/app.ts", Language::TypeScript, &catalog),
            Resolution::Internal("src/util.ts".to_string())
        );
    }

    #[test]
    fn test_js_directory_import_finds_index() {
        let (_dir, catalog) = catalog_with(&["src/app.ts", "src/lib/index.ts"]);
        assert_eq!(
            resolve("./lib", "src/app.ts", Language::TypeScript, &catalog),
            Resolution::Internal("src/lib/index.ts".to_string())
        );
    }

    #[test]
    fn test_js_bare_specifier_is_external() {
        let (_dir, catalog) = catalog_with(&["src/app.ts"]);
        assert_eq!(
            resolve("axios", "src/app.ts", Language::TypeScript, &catalog),
            Resolution::External
        );
    }

    #[test]
    fn test_js_escaping_root_is_external() {
        let (_dir, catalog) = catalog_with(&["app.ts"]);
        assert_eq!(
            resolve("../outside", "app.ts", Language::TypeScript, &catalog),
            Resolution::External
        );
    }

    #[test]
    fn test_python_relative_import() {
        let (_dir, catalog) = catalog_with(&["pkg/a.py", "pkg/sibling.py"]);
        assert_eq!(
            resolve(".sibling", "pkg/a.py", Language::Python, &catalog),
            Resolution::Internal("pkg/sibling.py".to_string())
        );
    }

    #[test]
    fn test_python_absolute_import_with_trailing_symbol() {
        let (_dir, catalog) = catalog_with(&["pkg/mod.py", "main.py"]);
        assert_eq!(
            resolve("pkg.mod", "main.py", Language::Python, &catalog),
            Resolution::Internal("pkg/mod.py".to_string())
        );
    }

    #[test]
    fn test_python_package_init() {
        let (_dir, catalog) = catalog_with(&["pkg/__init__.py", "main.py"]);
        assert_eq!(
            resolve("pkg", "main.py", Language::Python, &catalog),
            Resolution::Internal("pkg/__init__.py".to_string())
        );
    }

    #[test]
    fn test_python_stdlib_is_external() {
        let (_dir, catalog) = catalog_with(&["main.py"]);
        assert_eq!(
            resolve("os", "main.py", Language::Python, &catalog),
            Resolution::External
        );
    }

    #[test]
    fn test_rust_crate_path() {
        let (_dir, catalog) = catalog_with(&["src/main.rs", "src/util.rs"]);
        assert_eq!(
            resolve(
                "crate::util::helper",
                "src/main.rs",
                Language::Rust,
                &catalog
            ),
            Resolution::Internal("src/util.rs".to_string())
        );
    }

    #[test]
    fn test_rust_crate_path_without_src_dir() {
        let (_dir, catalog) = catalog_with(&["main.rs", "util.rs"]);
        assert_eq!(
            resolve("crate::util::helper", "main.rs", Language::Rust, &catalog),
            Resolution::Internal("util.rs".to_string())
        );
    }

    #[test]
    fn test_rust_crate_path_anchors_at_nested_crate_root() {
        let (_dir, catalog) = catalog_with(&["backend/main.rs", "backend/util.rs"]);
        assert_eq!(
            resolve(
                "crate::util::helper",
                "backend/main.rs",
                Language::Rust,
                &catalog
            ),
            Resolution::Internal("backend/util.rs".to_string())
        );
    }

    #[test]
    fn test_rust_mod_declaration() {
        let (_dir, catalog) = catalog_with(&["src/main.rs", "src/child/mod.rs"]);
        assert_eq!(
            resolve("mod child", "src/main.rs", Language::Rust, &catalog),
            Resolution::Internal("src/child/mod.rs".to_string())
        );
    }

    #[test]
    fn test_rust_std_is_external() {
        let (_dir, catalog) = catalog_with(&["src/main.rs"]);
        assert_eq!(
            resolve("std::fmt", "src/main.rs", Language::Rust, &catalog),
            Resolution::External
        );
    }
}
