use tree_sitter::{Query, QueryCursor, StreamingIterator};

use super::{Language, Parser, RawImport, RawModule, Symbol, SymbolKind, parse_tree};
use crate::error::Result;

/// Python parser. Import specifiers keep their dotted/relative form
/// (`pkg.mod`, `.sibling`); the resolver maps them to catalog paths.
pub struct PythonParser;

impl Parser for PythonParser {
    fn extract(&self, path: &str, content: &str) -> Result<RawModule> {
        let grammar: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        let tree = parse_tree(&grammar, path, content)?;
        let root = tree.root_node();

        let mut module = RawModule::default();
        extract_imports(&grammar, root, content, &mut module);
        extract_symbols(&grammar, root, content, &mut module);

        module.symbols.sort_by_key(|s| s.line);
        // Top-level definitions are the module's public surface unless
        // underscore-prefixed; Python has no explicit export statement.
        module.exports = module
            .symbols
            .iter()
            .filter(|s| !s.name.starts_with('_'))
            .map(|s| s.name.clone())
            .collect();

        Ok(module.dedup())
    }

    fn language(&self) -> Language {
        Language::Python
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
            (import_statement name: (dotted_name) @module)
            (import_statement name: (aliased_import name: (dotted_name) @module))
            (import_from_statement module_name: (dotted_name) @module)
            (import_from_statement module_name: (relative_import) @module)
        ]
    "#;

    if let Ok(query) = Query::new(grammar, query_str) {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, content.as_bytes());

        while let Some(m) = matches.next() {
            for cap in m.captures.iter() {
                let node = cap.node;
                let spec = node.utf8_text(content.as_bytes()).unwrap_or("");
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
    // Top-level definitions only: methods belong to their class for
    // module-level graph purposes.
    let query_str = r#"
        (module
            [
                (function_definition name: (identifier) @function)
                (class_definition name: (identifier) @class)
                (decorated_definition
                    definition: [
                        (function_definition name: (identifier) @function)
                        (class_definition name: (identifier) @class)
                    ])
            ])
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
