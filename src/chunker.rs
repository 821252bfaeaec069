//! Generation Units
//!
//! Partitions the generation order into token-budgeted units. Grouping is
//! greedy: walk the order, accumulate files while the unit stays within
//! budget, close the unit when the next file would overflow it. A single
//! file larger than the whole budget becomes its own unit, flagged
//! oversized so synthesis can truncate its source.
//!
//! Unit identity is content-addressed from member paths, so the same
//! catalog and budget always produce the same unit ids and checkpoint
//! resume keys stay valid across runs.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::catalog::FileCatalog;
use crate::error::{DocError, Result};
use crate::graph::DependencyGraph;

/// A group of files documented by one LLM call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationUnit {
    /// First 16 hex chars of sha256 over the ordered member paths
    pub id: String,
    /// Position in generation order
    pub index: usize,
    /// Member paths in generation order
    pub members: Vec<String>,
    /// Combined token estimate of member contents
    pub token_estimate: usize,
    /// Single member exceeding the whole budget by itself
    pub oversized: bool,
}

/// Units plus the unit-level dependency relation derived from hard edges
#[derive(Debug)]
pub struct UnitPlan {
    pub units: Vec<GenerationUnit>,
    /// For each unit, indices of units it depends on; always earlier in
    /// the plan because units are contiguous slices of a topological order
    pub dependencies: Vec<Vec<usize>>,
}

/// Partition the graph's generation order into budgeted units
pub fn plan_units(
    graph: &DependencyGraph,
    catalog: &FileCatalog,
    budget: usize,
) -> Result<UnitPlan> {
    if budget == 0 {
        return Err(DocError::Config(
            "Unit token budget must be positive".to_string(),
        ));
    }

    let order = graph.generation_order();

    let mut units: Vec<GenerationUnit> = Vec::new();
    let mut members: Vec<String> = Vec::new();
    let mut tokens = 0usize;

    let mut close = |members: &mut Vec<String>, tokens: &mut usize, oversized: bool| {
        if members.is_empty() {
            return;
        }
        let drained = std::mem::take(members);
        units.push(GenerationUnit {
            id: unit_id(&drained),
            index: units.len(),
            members: drained,
            token_estimate: *tokens,
            oversized,
        });
        *tokens = 0;
    };

    for path in &order {
        let estimate = catalog.get(path).map(|e| e.token_estimate).unwrap_or(0);

        if estimate > budget {
            // Oversized file stands alone
            close(&mut members, &mut tokens, false);
            members.push(path.to_string());
            tokens = estimate;
            close(&mut members, &mut tokens, true);
            continue;
        }

        if !members.is_empty() && tokens + estimate > budget {
            close(&mut members, &mut tokens, false);
        }
        members.push(path.to_string());
        tokens += estimate;
    }
    close(&mut members, &mut tokens, false);

    let dependencies = unit_dependencies(&units, graph);
    debug!(units = units.len(), budget, "Planned generation units");

    Ok(UnitPlan {
        units,
        dependencies,
    })
}

fn unit_id(members: &[String]) -> String {
    let mut hasher = Sha256::new();
    for member in members {
        hasher.update(member.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())[..16].to_string()
}

fn unit_dependencies(units: &[GenerationUnit], graph: &DependencyGraph) -> Vec<Vec<usize>> {
    let unit_of: std::collections::HashMap<&str, usize> = units
        .iter()
        .enumerate()
        .flat_map(|(i, u)| u.members.iter().map(move |m| (m.as_str(), i)))
        .collect();

    units
        .iter()
        .enumerate()
        .map(|(i, unit)| {
            let mut deps: Vec<usize> = unit
                .members
                .iter()
                .flat_map(|m| graph.dependencies(m))
                .filter_map(|dep| unit_of.get(dep).copied())
                .filter(|&d| d != i)
                .collect();
            deps.sort();
            deps.dedup();
            deps
        })
        .collect()
}
