//! SKF Manifest Codec
//!
//! Encodes a finished documentation run as a compact, line-oriented
//! manifest: a path index assigning short ids to files, an edge table
//! over those ids (hard dependencies and cycle-broken soft references),
//! and one text section per generation unit. The decoder reconstructs
//! the same structure, so a manifest can be expanded back without the
//! original run.

pub mod decode;
pub mod encode;

pub use decode::decode;
pub use encode::encode;

use chrono::{DateTime, Utc};

use crate::checkpoint::UnitStatus;

/// Dependency edge kind in the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Hard,
    Soft,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
        }
    }
}

/// One dependency edge between catalog paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkfEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

/// One generation unit section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkfUnit {
    pub id: String,
    /// Member paths, manifest order
    pub members: Vec<String>,
    pub status: UnitStatus,
    /// Unit documentation; absent for failed units
    pub text: Option<String>,
}

/// Complete manifest content
#[derive(Debug, Clone, PartialEq)]
pub struct SkfDocument {
    /// Display name of the documented root
    pub root: String,
    pub budget: usize,
    pub generated_at: DateTime<Utc>,
    /// All cataloged paths, sorted; the encoder indexes into this list
    pub paths: Vec<String>,
    pub edges: Vec<SkfEdge>,
    /// Units in generation order
    pub units: Vec<SkfUnit>,
}

impl SkfDocument {
    /// Expand the manifest back into a readable Markdown document
    pub fn to_markdown(&self) -> String {
        let mut out = String::with_capacity(8 * 1024);
        out.push_str("# Code Documentation (expanded from manifest)\n\n");
        out.push_str(&format!("- Root: `{}`\n", self.root));
        out.push_str(&format!(
            "- Generated: {}\n",
            self.generated_at
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        ));
        out.push_str(&format!("- Files: {}\n\n", self.paths.len()));

        for unit in &self.units {
            out.push_str(&format!("## {}\n\n", unit.members.join(", ")));
            match &unit.text {
                Some(text) => {
                    out.push_str(text.trim());
                    out.push_str("\n\n");
                }
                None => out.push_str(&format!(
                    "{}\n\n",
                    crate::constants::output::UNAVAILABLE_PLACEHOLDER
                )),
            }
        }
        out
    }
}

/// Size comparison between the Markdown document and its manifest
#[derive(Debug, Clone, Copy)]
pub struct CompressionStats {
    pub markdown_bytes: usize,
    pub skf_bytes: usize,
}

impl CompressionStats {
    pub fn measure(markdown: &str, skf: &str) -> Self {
        Self {
            markdown_bytes: markdown.len(),
            skf_bytes: skf.len(),
        }
    }

    /// Manifest size as a fraction of the Markdown size
    pub fn ratio(&self) -> f64 {
        if self.markdown_bytes == 0 {
            return 0.0;
        }
        self.skf_bytes as f64 / self.markdown_bytes as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SkfDocument {
        SkfDocument {
            root: "/repo".to_string(),
            budget: 40_000,
            generated_at: "2026-08-27T12:00:00Z".parse().unwrap(),
            paths: vec!["src/app.py".to_string(), "src/util.py".to_string()],
            edges: vec![
                SkfEdge {
                    source: "src/app.py".to_string(),
                    target: "src/util.py".to_string(),
                    kind: EdgeKind::Hard,
                },
                SkfEdge {
                    source: "src/util.py".to_string(),
                    target: "src/app.py".to_string(),
                    kind: EdgeKind::Soft,
                },
            ],
            units: vec![
                SkfUnit {
                    id: "aaaa111122223333".to_string(),
                    members: vec!["src/util.py".to_string()],
                    status: UnitStatus::Completed,
                    text: Some("## Utilities\n\nHelper functions.\n\n# A heading-like line".to_string()),
                },
                SkfUnit {
                    id: "bbbb444455556666".to_string(),
                    members: vec!["src/app.py".to_string()],
                    status: UnitStatus::Failed,
                    text: None,
                },
            ],
        }
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let doc = sample();
        let encoded = encode(&doc);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_escaped_text_survives() {
        let mut doc = sample();
        doc.units[0].text = Some("# looks like a directive\n\\already escaped\nplain".to_string());
        let decoded = decode(&encode(&doc)).unwrap();
        assert_eq!(decoded.units[0].text, doc.units[0].text);
    }

    #[test]
    fn test_compression_stats_ratio() {
        let stats = CompressionStats::measure("x".repeat(100).as_str(), "y".repeat(25).as_str());
        assert!((stats.ratio() - 0.25).abs() < f64::EPSILON);
    }
}
