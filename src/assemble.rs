//! Documentation Assembly
//!
//! Renders synthesis outcomes into a single Markdown document in unit
//! order: header with run statistics, table of contents, then one
//! section per unit. Failed units get a placeholder so the document
//! structure is complete even on partial runs.

use chrono::{DateTime, Utc};

use crate::checkpoint::UnitStatus;
use crate::constants::output::UNAVAILABLE_PLACEHOLDER;
use crate::graph::GraphStats;
use crate::synth::UnitOutcome;

/// Inputs for rendering the final document
#[derive(Debug)]
pub struct DocumentContext<'a> {
    /// Display name of the documented root
    pub root: &'a str,
    pub stats: GraphStats,
    pub outcomes: &'a [UnitOutcome],
    pub generated_at: DateTime<Utc>,
}

/// Render the full Markdown document
pub fn render(ctx: &DocumentContext) -> String {
    let mut doc = String::with_capacity(16 * 1024);

    doc.push_str("# Code Documentation\n\n");
    doc.push_str(&format!("- Root: `{}`\n", ctx.root));
    doc.push_str(&format!(
        "- Generated: {}\n",
        ctx.generated_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    ));
    doc.push_str(&format!("- Files documented: {}\n", ctx.stats.nodes));
    doc.push_str(&format!("- Generation units: {}\n", ctx.outcomes.len()));
    doc.push_str(&format!("- Dependency layers: {}\n", ctx.stats.layers));
    if ctx.stats.soft_edges > 0 {
        doc.push_str(&format!(
            "- Circular references broken: {}\n",
            ctx.stats.soft_edges
        ));
    }
    doc.push('\n');

    doc.push_str("## Contents\n\n");
    for outcome in ctx.outcomes {
        let title = section_title(&outcome.members);
        doc.push_str(&format!("- [{}](#{})\n", title, slug(&title)));
    }
    doc.push('\n');

    for outcome in ctx.outcomes {
        doc.push_str(&format!("## {}\n\n", section_title(&outcome.members)));
        match (&outcome.status, &outcome.doc_text) {
            (UnitStatus::Completed, Some(text)) => {
                doc.push_str(text.trim());
                doc.push_str("\n\n");
            }
            _ => {
                doc.push_str(UNAVAILABLE_PLACEHOLDER);
                doc.push_str("\n\n");
            }
        }
    }

    doc
}

fn section_title(members: &[String]) -> String {
    members.join(", ")
}

/// GitHub-style heading anchor: lowercase, alphanumerics kept, spaces
/// become dashes, everything else dropped
fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if c == ' ' || c == '-' {
            out.push('-');
        }
    }
    out
}
