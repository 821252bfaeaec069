use tree_sitter::{Query, QueryCursor, StreamingIterator};

use super::{Language, Parser, RawImport, RawModule, Symbol, SymbolKind, parse_tree};
use crate::error::Result;

/// TypeScript/JavaScript parser. The TypeScript grammar parses plain
/// JavaScript as well; TSX files use the TSX grammar variant.
pub struct TypeScriptParser {
    language: Language,
}

impl TypeScriptParser {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    fn grammar(&self) -> tree_sitter::Language {
        match self.language {
            Language::Tsx | Language::Jsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            _ => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        }
    }
}

impl Parser for TypeScriptParser {
    fn extract(&self, path: &str, content: &str) -> Result<RawModule> {
        let grammar = self.grammar();
        let tree = parse_tree(&grammar, path, content)?;
        let root = tree.root_node();

        let mut module = RawModule::default();
        extract_imports(&grammar, root, content, &mut module);
        extract_symbols(&grammar, root, content, &mut module);
        extract_exports(&grammar, root, content, &mut module);

        module.symbols.sort_by_key(|s| s.line);
        Ok(module.dedup())
    }

    fn language(&self) -> Language {
        self.language
    }
}

fn extract_imports(
    grammar: &tree_sitter::Language,
    root: tree_sitter::Node,
    content: &str,
    module: &mut RawModule,
) {
    let query_str = r#"
        [
            (import_statement source: (string) @source)
            (export_statement source: (string) @source)
        ]
    "#;

    if let Ok(query) = Query::new(grammar, query_str) {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, content.as_bytes());

        while let Some(m) = matches.next() {
            for cap in m.captures.iter() {
                let node = cap.node;
                let text = node.utf8_text(content.as_bytes()).unwrap_or("");
                let spec = text.trim_matches(|c| c == '"' || c == '\'');
                if spec.is_empty() {
                    continue;
                }
                module.imports.push(RawImport {
                    spec: spec.to_string(),
                    line: node.start_position().row as u32 + 1,
                });
            }
        }
    }
}

fn extract_symbols(
    grammar: &tree_sitter::Language,
    root: tree_sitter::Node,
    content: &str,
    module: &mut RawModule,
) {
    let query_str = r#"
        [
            (function_declaration name: (identifier) @function)
            (class_declaration name: (type_identifier) @class)
            (interface_declaration name: (type_identifier) @interface)
            (enum_declaration name: (identifier) @enum)
        ]
    "#;

    if let Ok(query) = Query::new(grammar, query_str) {
        let capture_names = query.capture_names().to_vec();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, content.as_bytes());

        while let Some(m) = matches.next() {
            for cap in m.captures.iter() {
                let node = cap.node;
                let name = node.utf8_text(content.as_bytes()).unwrap_or("");
                if name.is_empty() {
                    continue;
                }
                let kind = match capture_names.get(cap.index as usize).copied() {
                    Some("class") => SymbolKind::Class,
                    Some("interface") => SymbolKind::Interface,
                    Some("enum") => SymbolKind::Enum,
                    _ => SymbolKind::Function,
                };
                module.symbols.push(Symbol {
                    name: name.to_string(),
                    kind,
                    line: node.start_position().row as u32 + 1,
                });
            }
        }
    }
}

fn extract_exports(
    grammar: &tree_sitter::Language,
    root: tree_sitter::Node,
    content: &str,
    module: &mut RawModule,
) {
    let query_str = r#"
        (export_statement
            declaration: [
                (function_declaration name: (identifier) @name)
                (class_declaration name: (type_identifier) @name)
                (interface_declaration name: (type_identifier) @name)
                (enum_declaration name: (identifier) @name)
                (lexical_declaration (variable_declarator name: (identifier) @name))
            ]
        )
    "#;

    if let Ok(query) = Query::new(grammar, query_str) {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, content.as_bytes());

        while let Some(m) = matches.next() {
            for cap in m.captures.iter() {
                let name = cap.node.utf8_text(content.as_bytes()).unwrap_or("");
                if !name.is_empty() {
                    module.exports.push(name.to_string());
                }
            }
        }
    }
}
