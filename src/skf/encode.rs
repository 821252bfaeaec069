//! SKF Encoding
//!
//! Layout, in order:
//! - format header and run metadata lines
//! - `PATH_INDEX` section: `P<n> <path>` per cataloged file
//! - `EDGES` section: `E<n> P<a> -> P<b> <kind>`
//! - `UNITS` section: one block per unit delimited by `# UNIT:` /
//!   `# END_UNIT`, text lines escaped so they cannot be read as
//!   directives
//! - end-of-manifest marker
//!
//! Paths are referenced by index everywhere after the path index, which
//! is where most of the size reduction comes from.

use std::collections::HashMap;

use crate::constants::skf::{END_OF_MANIFEST, FORMAT_HEADER};

use super::SkfDocument;

/// Render a manifest document to its text form
pub fn encode(doc: &SkfDocument) -> String {
    let mut out = String::with_capacity(8 * 1024);

    out.push_str(FORMAT_HEADER);
    out.push('\n');
    out.push_str(&format!("# Root: {}\n", doc.root));
    out.push_str(&format!("# Budget: {}\n", doc.budget));
    out.push_str(&format!(
        "# GenerationTimestamp: {}\n",
        doc.generated_at
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    ));

    let path_ids: HashMap<&str, usize> = doc
        .paths
        .iter()
        .enumerate()
        .map(|(i, p)| (p.as_str(), i + 1))
        .collect();

    out.push_str("# SECTION: PATH_INDEX\n");
    for (i, path) in doc.paths.iter().enumerate() {
        out.push_str(&format!("P{} {}\n", i + 1, path));
    }

    out.push_str("# SECTION: EDGES\n");
    for (i, edge) in doc.edges.iter().enumerate() {
        let (Some(&source), Some(&target)) = (
            path_ids.get(edge.source.as_str()),
            path_ids.get(edge.target.as_str()),
        ) else {
            continue;
        };
        out.push_str(&format!(
            "E{} P{} -> P{} {}\n",
            i + 1,
            source,
            target,
            edge.kind.as_str()
        ));
    }

    out.push_str("# SECTION: UNITS\n");
    for unit in &doc.units {
        let members: Vec<String> = unit
            .members
            .iter()
            .filter_map(|m| path_ids.get(m.as_str()).map(|id| format!("P{}", id)))
            .collect();
        out.push_str(&format!(
            "# UNIT: {} members={} status={}\n",
            unit.id,
            members.join(","),
            unit.status.as_str()
        ));
        if let Some(text) = &unit.text {
            for line in text.lines() {
                out.push_str(&escape_line(line));
                out.push('\n');
            }
        }
        out.push_str("# END_UNIT\n");
    }

    out.push_str(END_OF_MANIFEST);
    out.push('\n');
    out
}

/// Text lines starting with `#` or `\` get a backslash prefix so the
/// decoder never mistakes them for directives
fn escape_line(line: &str) -> String {
    if line.starts_with('#') || line.starts_with('\\') {
        format!("\\{}", line)
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::UnitStatus;
    use crate::skf::{EdgeKind, SkfEdge, SkfUnit};

    #[test]
    fn test_header_and_sections_present() {
        let doc = SkfDocument {
            root: "/repo".to_string(),
            budget: 40_000,
            generated_at: chrono::Utc::now(),
            paths: vec!["a.py".to_string(), "b.py".to_string()],
            edges: vec![SkfEdge {
                source: "a.py".to_string(),
                target: "b.py".to_string(),
                kind: EdgeKind::Hard,
            }],
            units: vec![SkfUnit {
                id: "u1".to_string(),
                members: vec!["b.py".to_string()],
                status: UnitStatus::Completed,
                text: Some("docs".to_string()),
            }],
        };

        let encoded = encode(&doc);
        assert!(encoded.starts_with(FORMAT_HEADER));
        assert!(encoded.contains("P1 a.py\n"));
        assert!(encoded.contains("E1 P1 -> P2 hard\n"));
        assert!(encoded.contains("# UNIT: u1 members=P2 status=completed\n"));
        assert!(encoded.trim_end().ends_with(END_OF_MANIFEST));
    }

    #[test]
    fn test_escape_line() {
        assert_eq!(escape_line("# heading"), "\\# heading");
        assert_eq!(escape_line("\\raw"), "\\\\raw");
        assert_eq!(escape_line("plain"), "plain");
    }
}
