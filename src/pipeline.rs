//! Documentation Pipeline
//!
//! Runs the full sequence: discovery, structural analysis, dependency
//! graph, unit planning, checkpointed synthesis, Markdown assembly, and
//! SKF encoding. Partial success is first-class: failed units appear as
//! placeholders in the output and as failed checkpoints for the next
//! resume, but they never abort the run.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::ai::{SharedProvider, UsageSnapshot};
use crate::assemble::{self, DocumentContext};
use crate::catalog::FileCatalog;
use crate::checkpoint::{CheckpointStore, UnitStatus};
use crate::chunker;
use crate::config::Config;
use crate::constants::output::CHECKPOINT_DB;
use crate::error::Result;
use crate::graph::{DependencyGraph, GraphStats};
use crate::skf::{self, EdgeKind, SkfDocument, SkfEdge, SkfUnit};
use crate::synth::SynthesisDriver;
use crate::analyzer;

/// Outcome of one full pipeline run
#[derive(Debug)]
pub struct RunSummary {
    pub files: usize,
    pub files_skipped: usize,
    pub parse_failures: usize,
    pub graph: GraphStats,
    pub units_total: usize,
    pub units_completed: usize,
    pub units_failed: usize,
    pub units_resumed: usize,
    pub usage: UsageSnapshot,
    pub doc_path: PathBuf,
    pub skf_path: PathBuf,
    pub compression: skf::CompressionStats,
}

/// End-to-end documentation pipeline
pub struct Pipeline {
    config: Config,
    provider: SharedProvider,
}

impl Pipeline {
    pub fn new(config: Config, provider: SharedProvider) -> Self {
        Self { config, provider }
    }

    /// Document the codebase rooted at `root`
    pub async fn run(&self, root: &Path) -> Result<RunSummary> {
        let catalog = FileCatalog::discover(root, &self.config)?;
        info!(
            files = catalog.len(),
            skipped = catalog.skipped().len(),
            "Catalog built"
        );

        let report = analyzer::analyze(&catalog).await?;
        for failure in &report.failures {
            warn!(path = %failure.path, "Excluded from graph: {}", failure.message);
        }

        let graph = DependencyGraph::build(&report.modules)?;
        let plan = chunker::plan_units(&graph, &catalog, self.config.unit_budget)?;

        let store = CheckpointStore::open(&catalog.root().join(CHECKPOINT_DB))?;
        let driver = SynthesisDriver::new(self.provider.clone(), store, &self.config);
        let root_identity = catalog.root_identity();
        let synthesis = driver
            .run(&plan, &catalog, &report.modules, &root_identity)
            .await?;

        let generated_at = chrono::Utc::now();
        let root_display = catalog.root().display().to_string();

        let markdown = assemble::render(&DocumentContext {
            root: &root_display,
            stats: graph.stats(),
            outcomes: &synthesis.outcomes,
            generated_at,
        });
        let doc_path = catalog.root().join(&self.config.doc_output);
        write_artifact(&doc_path, &markdown)?;

        let manifest = build_manifest(
            &root_display,
            self.config.unit_budget,
            generated_at,
            &graph,
            &synthesis.outcomes,
        );
        let encoded = skf::encode(&manifest);
        let skf_path = catalog.root().join(self.config.skf_output_path());
        write_artifact(&skf_path, &encoded)?;

        let compression = skf::CompressionStats::measure(&markdown, &encoded);
        info!(
            doc = %doc_path.display(),
            skf = %skf_path.display(),
            ratio = format!("{:.2}", compression.ratio()),
            "Artifacts written"
        );

        Ok(RunSummary {
            files: catalog.len(),
            files_skipped: catalog.skipped().len(),
            parse_failures: report.failures.len(),
            graph: graph.stats(),
            units_total: synthesis.outcomes.len(),
            units_completed: synthesis.completed(),
            units_failed: synthesis.failed(),
            units_resumed: synthesis.outcomes.iter().filter(|o| o.resumed).count(),
            usage: synthesis.usage,
            doc_path,
            skf_path,
            compression,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Assemble the manifest from the graph and unit outcomes
fn build_manifest(
    root: &str,
    budget: usize,
    generated_at: chrono::DateTime<chrono::Utc>,
    graph: &DependencyGraph,
    outcomes: &[crate::synth::UnitOutcome],
) -> SkfDocument {
    let mut edges: Vec<SkfEdge> = graph
        .hard_edges()
        .into_iter()
        .map(|(s, t)| SkfEdge {
            source: s.to_string(),
            target: t.to_string(),
            kind: EdgeKind::Hard,
        })
        .collect();
    edges.extend(graph.soft_edges().iter().map(|e| SkfEdge {
        source: e.source.clone(),
        target: e.target.clone(),
        kind: EdgeKind::Soft,
    }));

    SkfDocument {
        root: root.to_string(),
        budget,
        generated_at,
        paths: graph.nodes().to_vec(),
        edges,
        units: outcomes
            .iter()
            .map(|o| SkfUnit {
                id: o.unit_id.clone(),
                members: o.members.clone(),
                status: o.status,
                text: match o.status {
                    UnitStatus::Completed => o.doc_text.clone(),
                    UnitStatus::Failed => None,
                },
            })
            .collect(),
    }
}

fn write_artifact(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Open the checkpoint store for a root without running the pipeline.
/// Used by the status and clean subcommands.
pub fn open_store(root: &Path) -> Result<(CheckpointStore, String)> {
    let catalog_root = root
        .canonicalize()
        .map_err(|e| crate::error::DocError::Discovery(format!("Cannot resolve root: {}", e)))?;
    let store = CheckpointStore::open(&catalog_root.join(CHECKPOINT_DB))?;
    Ok((store, crate::catalog::root_identity_for(&catalog_root)))
}
