//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// File discovery constants
pub mod discovery {
    /// Maximum file size to catalog (1MB)
    pub const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Directories excluded before size/token estimation
    pub const DEFAULT_SKIP_DIRS: &[&str] = &[
        "node_modules",
        "target",
        ".git",
        "build",
        "dist",
        "__pycache__",
        "vendor",
        ".venv",
        "coverage",
        ".next",
        ".nuxt",
        "bower_components",
    ];

    /// Extensions recognized by default
    pub const DEFAULT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "py", "rs"];
}

/// Generation retry constants
pub mod retry {
    /// Default maximum attempts per unit (initial call + retries)
    pub const MAX_ATTEMPTS: usize = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 1_000;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 60;

    /// Per-call LLM timeout (seconds)
    pub const LLM_TIMEOUT_SECS: u64 = 300;
}

/// Token budget constants
pub mod budget {
    /// Default per-unit token budget
    pub const DEFAULT_UNIT_BUDGET: usize = 40_000;

    /// Fraction of the budget reserved for prompt scaffolding and
    /// dependency context when building a unit prompt
    pub const CONTEXT_FRACTION: f64 = 0.25;
}

/// Synthesis scheduling constants
pub mod synthesis {
    /// Default number of units generated concurrently. 1 preserves strict
    /// topological order; higher values still respect dependency release.
    pub const DEFAULT_CONCURRENCY: usize = 1;

    /// Upper bound on concurrent unit synthesis
    pub const MAX_CONCURRENCY: usize = 8;

    /// Bounded worker pool for parallel file extraction
    pub const EXTRACT_WORKERS: usize = 8;
}

/// SKF format constants
pub mod skf {
    /// Format identifier emitted in the manifest header
    pub const FORMAT_HEADER: &str = "# IntegratedKnowledgeManifest_SKF/1.4 LA";

    /// Manifest terminator line
    pub const END_OF_MANIFEST: &str = "# END_OF_MANIFEST";

    /// Default output suffix for SKF files
    pub const DEFAULT_SUFFIX: &str = ".skf.txt";
}

/// Output constants
pub mod output {
    /// Default Markdown artifact filename
    pub const DEFAULT_DOC_FILE: &str = "documentation.md";

    /// Checkpoint database path, relative to the documented root
    pub const CHECKPOINT_DB: &str = ".autodoc/checkpoints.db";

    /// Placeholder rendered for units whose generation permanently failed
    pub const UNAVAILABLE_PLACEHOLDER: &str =
        "*Documentation unavailable: generation failed for this unit.*";
}
