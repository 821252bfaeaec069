//! Language Parser Module
//!
//! Tree-sitter based structural extraction. Each parser produces the raw
//! facts of one file: declared symbols, import specifiers, and exported
//! names, all in source order so repeated runs over unchanged content
//! yield structurally identical output.

pub mod python;
pub mod rust_lang;
pub mod typescript;

pub use python::PythonParser;
pub use rust_lang::RustParser;
pub use typescript::TypeScriptParser;

use crate::error::{DocError, Result};

// =============================================================================
// Language Detection
// =============================================================================

/// Supported source languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    TypeScript,
    Tsx,
    JavaScript,
    Jsx,
    Python,
    Rust,
}

impl Language {
    /// Detect language from a file extension (lowercase, without dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "ts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            "js" | "mjs" | "cjs" => Some(Self::JavaScript),
            "jsx" => Some(Self::Jsx),
            "py" => Some(Self::Python),
            "rs" => Some(Self::Rust),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::JavaScript => "javascript",
            Self::Jsx => "jsx",
            Self::Python => "python",
            Self::Rust => "rust",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Extraction Output
// =============================================================================

/// Kind of a declared symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Class,
    Interface,
    Struct,
    Enum,
    Trait,
    Constant,
}

impl SymbolKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Trait => "trait",
            Self::Constant => "constant",
        }
    }
}

/// A symbol declared in a file, with its source line for ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub line: u32,
}

/// A raw import specifier as written in the source, before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImport {
    /// Import specifier text (module path or file reference)
    pub spec: String,
    pub line: u32,
}

/// Raw structural facts extracted from one file
#[derive(Debug, Clone, Default)]
pub struct RawModule {
    pub symbols: Vec<Symbol>,
    pub imports: Vec<RawImport>,
    pub exports: Vec<String>,
}

impl RawModule {
    /// Collapse duplicate imports/exports while preserving first-seen order
    pub fn dedup(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        self.imports.retain(|i| seen.insert(i.spec.clone()));
        let mut seen = std::collections::HashSet::new();
        self.exports.retain(|e| seen.insert(e.clone()));
        self
    }
}

// =============================================================================
// Parser Trait
// =============================================================================

/// Per-language structural extractor.
///
/// Implementations must be deterministic: symbols and imports come out in
/// source order, so unchanged content produces identical output.
pub trait Parser: Send + Sync {
    /// Extract raw structural facts from one file.
    ///
    /// A failure is per-file: the caller records it and excludes the file
    /// from the graph without aborting the run.
    fn extract(&self, path: &str, content: &str) -> Result<RawModule>;

    fn language(&self) -> Language;
}

/// Create a parser for the given language
pub fn create_parser(language: Language) -> Result<Box<dyn Parser>> {
    match language {
        Language::TypeScript | Language::JavaScript | Language::Tsx | Language::Jsx => {
            Ok(Box::new(TypeScriptParser::new(language)))
        }
        Language::Python => Ok(Box::new(PythonParser)),
        Language::Rust => Ok(Box::new(RustParser)),
    }
}

/// Shared helper for parser implementations: run a tree-sitter parse,
/// mapping grammar errors to a per-file parse error.
pub(crate) fn parse_tree(
    grammar: &tree_sitter::Language,
    path: &str,
    content: &str,
) -> Result<tree_sitter::Tree> {
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(grammar).map_err(|e| DocError::Parse {
        message: format!("Failed to set grammar: {}", e),
        path: path.to_string(),
    })?;

    parser.parse(content, None).ok_or_else(|| DocError::Parse {
        message: "tree-sitter returned no tree".to_string(),
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_detection() {
        assert_eq!(Language::from_extension("ts"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("rs"), Some(Language::Rust));
        assert_eq!(Language::from_extension("md"), None);
    }

    #[test]
    fn test_dedup_preserves_order() {
        let module = RawModule {
            symbols: vec![],
            imports: vec![
                RawImport {
                    spec: "./a".into(),
                    line: 1,
                },
                RawImport {
                    spec: "./b".into(),
                    line: 2,
                },
                RawImport {
                    spec: "./a".into(),
                    line: 3,
                },
            ],
            exports: vec!["x".into(), "x".into(), "y".into()],
        }
        .dedup();

        let specs: Vec<_> = module.imports.iter().map(|i| i.spec.as_str()).collect();
        assert_eq!(specs, vec!["./a", "./b"]);
        assert_eq!(module.exports, vec!["x", "y"]);
    }
}
