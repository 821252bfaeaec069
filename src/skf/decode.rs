//! SKF Decoding
//!
//! Reconstructs an [`SkfDocument`] from manifest text. Decoding is
//! strict: a missing header, an unknown path id, or a malformed
//! directive is an encoding error, since a manifest is machine-written
//! and any damage means it cannot be trusted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::checkpoint::UnitStatus;
use crate::constants::skf::{END_OF_MANIFEST, FORMAT_HEADER};
use crate::error::{DocError, Result};

use super::{EdgeKind, SkfDocument, SkfEdge, SkfUnit};

enum Section {
    Preamble,
    PathIndex,
    Edges,
    Units,
}

/// Parse manifest text back into its document form
pub fn decode(input: &str) -> Result<SkfDocument> {
    let mut lines = input.lines();
    if lines.next() != Some(FORMAT_HEADER) {
        return Err(malformed("missing or unrecognized format header"));
    }

    let mut root = None;
    let mut budget = None;
    let mut generated_at: Option<DateTime<Utc>> = None;
    let mut paths: Vec<String> = Vec::new();
    let mut path_by_id: HashMap<usize, String> = HashMap::new();
    let mut edges = Vec::new();
    let mut units = Vec::new();
    let mut finished = false;

    let mut section = Section::Preamble;
    // In-progress unit: (id, members, status, text lines)
    let mut current: Option<(String, Vec<String>, UnitStatus, Vec<String>)> = None;

    for line in lines {
        if line == END_OF_MANIFEST {
            if current.is_some() {
                return Err(malformed("unterminated unit before end of manifest"));
            }
            finished = true;
            break;
        }

        if let Some(rest) = line.strip_prefix("# SECTION: ") {
            section = match rest {
                "PATH_INDEX" => Section::PathIndex,
                "EDGES" => Section::Edges,
                "UNITS" => Section::Units,
                other => return Err(malformed(format!("unknown section: {}", other))),
            };
            continue;
        }

        match section {
            Section::Preamble => {
                if let Some(rest) = line.strip_prefix("# Root: ") {
                    root = Some(rest.to_string());
                } else if let Some(rest) = line.strip_prefix("# Budget: ") {
                    budget = Some(
                        rest.parse::<usize>()
                            .map_err(|_| malformed(format!("bad budget: {}", rest)))?,
                    );
                } else if let Some(rest) = line.strip_prefix("# GenerationTimestamp: ") {
                    generated_at = Some(
                        rest.parse()
                            .map_err(|_| malformed(format!("bad timestamp: {}", rest)))?,
                    );
                }
            }
            Section::PathIndex => {
                let (id_part, path) = line
                    .split_once(' ')
                    .ok_or_else(|| malformed(format!("bad path index line: {}", line)))?;
                let id = parse_path_id(id_part)?;
                paths.push(path.to_string());
                path_by_id.insert(id, path.to_string());
            }
            Section::Edges => {
                edges.push(parse_edge(line, &path_by_id)?);
            }
            Section::Units => {
                if let Some(rest) = line.strip_prefix("# UNIT: ") {
                    if current.is_some() {
                        return Err(malformed("nested unit directive"));
                    }
                    current = Some(parse_unit_header(rest, &path_by_id)?);
                } else if line == "# END_UNIT" {
                    let (id, members, status, text_lines) = current
                        .take()
                        .ok_or_else(|| malformed("end of unit without a unit"))?;
                    let text = match status {
                        UnitStatus::Completed => Some(text_lines.join("\n")),
                        UnitStatus::Failed => None,
                    };
                    units.push(SkfUnit {
                        id,
                        members,
                        status,
                        text,
                    });
                } else if let Some((_, _, _, text_lines)) = current.as_mut() {
                    text_lines.push(unescape_line(line));
                } else {
                    return Err(malformed(format!("text outside a unit: {}", line)));
                }
            }
        }
    }

    if !finished {
        return Err(malformed("missing end-of-manifest marker"));
    }

    Ok(SkfDocument {
        root: root.ok_or_else(|| malformed("missing root line"))?,
        budget: budget.ok_or_else(|| malformed("missing budget line"))?,
        generated_at: generated_at.ok_or_else(|| malformed("missing timestamp line"))?,
        paths,
        edges,
        units,
    })
}

fn malformed(msg: impl Into<String>) -> DocError {
    DocError::Encoding(msg.into())
}

fn parse_path_id(token: &str) -> Result<usize> {
    token
        .strip_prefix('P')
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| malformed(format!("bad path id: {}", token)))
}

fn lookup<'a>(id: usize, path_by_id: &'a HashMap<usize, String>) -> Result<&'a str> {
    path_by_id
        .get(&id)
        .map(String::as_str)
        .ok_or_else(|| malformed(format!("unknown path id: P{}", id)))
}

/// `E<n> P<a> -> P<b> <kind>`
fn parse_edge(line: &str, path_by_id: &HashMap<usize, String>) -> Result<SkfEdge> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let [_e, source, arrow, target, kind] = parts.as_slice() else {
        return Err(malformed(format!("bad edge line: {}", line)));
    };
    if *arrow != "->" {
        return Err(malformed(format!("bad edge line: {}", line)));
    }

    let kind = match *kind {
        "hard" => EdgeKind::Hard,
        "soft" => EdgeKind::Soft,
        other => return Err(malformed(format!("bad edge kind: {}", other))),
    };

    Ok(SkfEdge {
        source: lookup(parse_path_id(source)?, path_by_id)?.to_string(),
        target: lookup(parse_path_id(target)?, path_by_id)?.to_string(),
        kind,
    })
}

/// `<id> members=P1,P2 status=completed`
fn parse_unit_header(
    rest: &str,
    path_by_id: &HashMap<usize, String>,
) -> Result<(String, Vec<String>, UnitStatus, Vec<String>)> {
    let parts: Vec<&str> = rest.split_whitespace().collect();
    let [id, members_part, status_part] = parts.as_slice() else {
        return Err(malformed(format!("bad unit header: {}", rest)));
    };

    let members_csv = members_part
        .strip_prefix("members=")
        .ok_or_else(|| malformed(format!("bad unit header: {}", rest)))?;
    let mut members = Vec::new();
    for token in members_csv.split(',').filter(|t| !t.is_empty()) {
        members.push(lookup(parse_path_id(token)?, path_by_id)?.to_string());
    }

    let status = match status_part.strip_prefix("status=") {
        Some("completed") => UnitStatus::Completed,
        Some("failed") => UnitStatus::Failed,
        _ => return Err(malformed(format!("bad unit status: {}", rest))),
    };

    Ok((id.to_string(), members, status, Vec::new()))
}

fn unescape_line(line: &str) -> String {
    line.strip_prefix('\\').unwrap_or(line).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_header_rejected() {
        let err = decode("not a manifest\n");
        assert!(matches!(err, Err(DocError::Encoding(_))));
    }

    #[test]
    fn test_missing_end_marker_rejected() {
        let input = format!("{}\n# Root: /r\n# Budget: 10\n", FORMAT_HEADER);
        assert!(matches!(decode(&input), Err(DocError::Encoding(_))));
    }

    #[test]
    fn test_unknown_path_id_rejected() {
        let input = format!(
            "{}\n# Root: /r\n# Budget: 10\n# GenerationTimestamp: 2026-08-27T12:00:00Z\n\
             # SECTION: PATH_INDEX\nP1 a.py\n# SECTION: EDGES\nE1 P1 -> P9 hard\n{}\n",
            FORMAT_HEADER, END_OF_MANIFEST
        );
        assert!(matches!(decode(&input), Err(DocError::Encoding(_))));
    }

    #[test]
    fn test_minimal_manifest_decodes() {
        let input = format!(
            "{}\n# Root: /r\n# Budget: 10\n# GenerationTimestamp: 2026-08-27T12:00:00Z\n\
             # SECTION: PATH_INDEX\nP1 a.py\n# SECTION: EDGES\n# SECTION: UNITS\n\
             # UNIT: u1 members=P1 status=completed\nhello\n# END_UNIT\n{}\n",
            FORMAT_HEADER, END_OF_MANIFEST
        );
        let doc = decode(&input).unwrap();
        assert_eq!(doc.paths, vec!["a.py"]);
        assert_eq!(doc.units.len(), 1);
        assert_eq!(doc.units[0].text.as_deref(), Some("hello"));
    }
}
