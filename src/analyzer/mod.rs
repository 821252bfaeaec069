//! Module Analysis
//!
//! Runs tree-sitter extraction across the catalog and resolves imports,
//! producing one [`ModuleSummary`] per parseable file. Parsing happens on
//! a bounded pool of blocking tasks; results are re-sorted by path so
//! output order never depends on completion order.
//!
//! Per-file parse failures are recorded and excluded from the result
//! without aborting the run.

pub mod parser;
pub mod resolver;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::catalog::FileCatalog;
use crate::constants::synthesis::EXTRACT_WORKERS;
use crate::error::Result;
use parser::{Language, Symbol, create_parser};
use resolver::Resolution;

/// Structural summary of one source file after import resolution
#[derive(Debug, Clone)]
pub struct ModuleSummary {
    /// Root-relative catalog path
    pub path: String,
    pub language: Language,
    pub symbols: Vec<Symbol>,
    /// Imports resolved to catalog paths, first-seen order, deduplicated
    pub internal_deps: Vec<String>,
    /// Import specifiers that resolved outside the catalog
    pub external_deps: Vec<String>,
    pub exports: Vec<String>,
}

/// A file that failed structural extraction
#[derive(Debug, Clone)]
pub struct ExtractionFailure {
    pub path: String,
    pub message: String,
}

/// Result of analyzing a whole catalog
#[derive(Debug, Default)]
pub struct ExtractionReport {
    /// Summaries sorted by path
    pub modules: Vec<ModuleSummary>,
    pub failures: Vec<ExtractionFailure>,
}

/// Extract and resolve every supported file in the catalog.
///
/// Files whose extension has no registered language are skipped silently;
/// files that fail to parse are reported in `failures`.
pub async fn analyze(catalog: &FileCatalog) -> Result<ExtractionReport> {
    // Read contents up front so parse tasks own their input
    let mut inputs = Vec::new();
    for entry in catalog.entries() {
        let Some(language) = Language::from_extension(&entry.extension) else {
            debug!(path = %entry.path, "No parser for extension, skipping");
            continue;
        };
        match catalog.read_content(entry) {
            Ok(content) => inputs.push((entry.path.clone(), language, content)),
            Err(e) => warn!(path = %entry.path, "Failed to read cataloged file: {}", e),
        }
    }

    let mut report = ExtractionReport::default();

    let mut results = stream::iter(inputs)
        .map(|(path, language, content)| {
            tokio::task::spawn_blocking(move || {
                let raw = create_parser(language)?.extract(&path, &content)?;
                Ok::<_, crate::error::DocError>((path, language, raw))
            })
        })
        .buffer_unordered(EXTRACT_WORKERS);

    while let Some(joined) = results.next().await {
        let outcome = joined.map_err(|e| {
            crate::error::DocError::Discovery(format!("Extraction task panicked: {}", e))
        })?;
        match outcome {
            Ok((path, language, raw)) => {
                let mut internal_deps = Vec::new();
                let mut external_deps = Vec::new();
                for import in &raw.imports {
                    match resolver::resolve(&import.spec, &path, language, catalog) {
                        // Self-imports carry no graph information
                        Resolution::Internal(target) if target != path => {
                            if !internal_deps.contains(&target) {
                                internal_deps.push(target);
                            }
                        }
                        Resolution::Internal(_) => {}
                        Resolution::External => {
                            if !external_deps.contains(&import.spec) {
                                external_deps.push(import.spec.clone());
                            }
                        }
                    }
                }
                report.modules.push(ModuleSummary {
                    path,
                    language,
                    symbols: raw.symbols,
                    internal_deps,
                    external_deps,
                    exports: raw.exports,
                });
            }
            Err(crate::error::DocError::Parse { message, path }) => {
                warn!(path = %path, "Parse failed: {}", message);
                report.failures.push(ExtractionFailure { path, message });
            }
            Err(other) => return Err(other),
        }
    }

    report.modules.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(report)
}
