//! autodoc - LLM documentation synthesis for codebases
//!
//! Turns a source tree into reference documentation in dependency order:
//!
//! - **catalog**: deterministic file discovery with exclusion rules
//! - **analyzer**: tree-sitter symbol and import extraction, import
//!   resolution against the catalog
//! - **graph**: dependency graph with cycle breaking and layering
//! - **chunker**: token-budgeted generation units over the topological
//!   order
//! - **synth**: LLM synthesis with retries, concurrency, and
//!   checkpointed resume
//! - **assemble**: Markdown document assembly
//! - **skf**: compact manifest encoding with full decode support

pub mod ai;
pub mod analyzer;
pub mod assemble;
pub mod catalog;
pub mod checkpoint;
pub mod chunker;
pub mod config;
pub mod constants;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod skf;
pub mod synth;

pub use ai::{LlmProvider, SharedProvider, create_provider};
pub use catalog::FileCatalog;
pub use checkpoint::{CheckpointStore, UnitStatus};
pub use config::Config;
pub use error::{DocError, Result};
pub use graph::DependencyGraph;
pub use pipeline::{Pipeline, RunSummary};
