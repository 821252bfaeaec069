use tree_sitter::{Query, QueryCursor, StreamingIterator};

use super::{Language, Parser, RawImport, RawModule, Symbol, SymbolKind, parse_tree};
use crate::error::Result;

/// Rust parser. Two kinds of import specifiers are recorded: `use` path
/// arguments (`crate::foo::Bar`, `std::fmt`) and bodyless `mod child;`
/// declarations, which the resolver maps to child module files.
pub struct RustParser;

impl Parser for RustParser {
    fn extract(&self, path: &str, content: &str) -> Result<RawModule> {
        let grammar: tree_sitter::Language = tree_sitter_rust::LANGUAGE.into();
        let tree = parse_tree(&grammar, path, content)?;
        let root = tree.root_node();

        let mut module = RawModule::default();
        extract_imports(&grammar, root, content, &mut module);
        extract_symbols(&grammar, root, content, &mut module);

        module.symbols.sort_by_key(|s| s.line);
        Ok(module.dedup())
    }

    fn language(&self) -> Language {
        Language::Rust
    }
}

fn extract_imports(
    grammar: &tree_sitter::Language,
    root: tree_sitter::Node,
    content: &str,
    module: &mut RawModule,
) {
    let query_str = r#"
        (use_declaration argument: (_) @use_path)
    "#;

    if let Ok(query) = Query::new(grammar, query_str) {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, content.as_bytes());

        while let Some(m) = matches.next() {
            for cap in m.captures.iter() {
                let node = cap.node;
                let spec = node.utf8_text(content.as_bytes()).unwrap_or("").trim();
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

    // Bodyless `mod child;` pulls in a sibling file
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() != "mod_item" {
            continue;
        }
        // mod_item with a declaration_list body is inline, not a file
        if child.child_by_field_name("body").is_some() {
            continue;
        }
        if let Some(name_node) = child.child_by_field_name("name") {
            let name = name_node.utf8_text(content.as_bytes()).unwrap_or("");
            if !name.is_empty() {
                module.imports.push(RawImport {
                    spec: format!("mod {}", name),
                    line: child.start_position().row as u32 + 1,
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
        (source_file
            [
                (function_item name: (identifier) @function)
                (struct_item name: (type_identifier) @struct)
                (enum_item name: (type_identifier) @enum)
                (trait_item name: (type_identifier) @trait)
                (const_item name: (identifier) @constant)
                (static_item name: (identifier) @constant)
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
                    Some("struct") => SymbolKind::Struct,
                    Some("enum") => SymbolKind::Enum,
                    Some("trait") => SymbolKind::Trait,
                    Some("constant") => SymbolKind::Constant,
                    _ => SymbolKind::Function,
                };
                module.symbols.push(Symbol {
                    name: name.to_string(),
                    kind,
                    line: node.start_position().row as u32 + 1,
                });

                // Items with a visibility modifier form the public surface
                if let Some(item) = node.parent()
                    && has_visibility(item, content)
                {
                    module.exports.push(name.to_string());
                }
            }
        }
    }
}

fn has_visibility(item: tree_sitter::Node, content: &str) -> bool {
    let mut cursor = item.walk();
    item.children(&mut cursor).any(|c| {
        c.kind() == "visibility_modifier"
            && c.utf8_text(content.as_bytes())
                .is_ok_and(|t| t.starts_with("pub"))
    })
}
