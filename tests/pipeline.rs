//! End-to-end pipeline tests against a scripted in-process provider.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tempfile::TempDir;

use autodoc::ai::{GenerateOptions, LlmProvider, LlmResponse, TokenUsage};
use autodoc::checkpoint::UnitStatus;
use autodoc::config::{Config, RetrySettings};
use autodoc::error::{DocError, ErrorCategory, LlmError, Result};
use autodoc::pipeline::{self, Pipeline};
use autodoc::skf;

/// Provider that records prompts and fails the first `fail_first` calls
/// with a retryable error (or every call when `fail_always`)
struct MockProvider {
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    fail_first: usize,
    fail_always: bool,
}

impl MockProvider {
    fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail_first: 0,
            fail_always: false,
        })
    }

    fn failing_first(n: usize) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail_first: n,
            fail_always: false,
        })
    }

    fn always_failing() -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail_first: 0,
            fail_always: true,
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<LlmResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        if self.fail_always || call < self.fail_first {
            return Err(DocError::Generation(LlmError::new(
                ErrorCategory::Network,
                "mock network down",
            )));
        }
        Ok(LlmResponse {
            text: format!("Generated documentation (call {}).", call),
            usage: TokenUsage::new(100, 20),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

/// Provider that takes a write lock on the checkpoint database while
/// generating its `lock_on_call`-th response, so every checkpoint write
/// from that point on fails with a busy database
struct LockHoldingProvider {
    db_path: PathBuf,
    lock_on_call: usize,
    calls: AtomicUsize,
    held: Mutex<Option<rusqlite::Connection>>,
}

#[async_trait]
impl LlmProvider for LockHoldingProvider {
    async fn generate(&self, _prompt: &str, _options: &GenerateOptions) -> Result<LlmResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == self.lock_on_call {
            let conn = rusqlite::Connection::open(&self.db_path).unwrap();
            conn.execute_batch("BEGIN IMMEDIATE").unwrap();
            *self.held.lock().unwrap() = Some(conn);
        }
        Ok(LlmResponse {
            text: format!("Generated documentation (call {}).", call),
            usage: TokenUsage::new(100, 20),
        })
    }

    fn name(&self) -> &str {
        "locking"
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

/// Provider that rate-limits its first call with an explicit wait hint
struct RateLimitedProvider {
    calls: AtomicUsize,
    hint: Duration,
}

#[async_trait]
impl LlmProvider for RateLimitedProvider {
    async fn generate(&self, _prompt: &str, _options: &GenerateOptions) -> Result<LlmResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            return Err(DocError::Generation(
                LlmError::new(ErrorCategory::RateLimit, "slow down").retry_after(self.hint),
            ));
        }
        Ok(LlmResponse {
            text: "Generated documentation.".to_string(),
            usage: TokenUsage::new(100, 20),
        })
    }

    fn name(&self) -> &str {
        "rate-limited"
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn test_config(unit_budget: usize) -> Config {
    Config {
        unit_budget,
        retry: RetrySettings {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_secs: 1,
        },
        ..Config::default()
    }
}

/// First member path named in a unit prompt
fn first_member(prompt: &str) -> &str {
    let start = prompt.find("### ").unwrap() + 4;
    let rest = &prompt[start..];
    let end = rest.find(" (").unwrap();
    &rest[..end]
}

#[tokio::test]
async fn chain_generates_dependencies_first() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.py", "from b import run\n\ndef top(): run()\n");
    write(dir.path(), "b.py", "from c import base\n\ndef run(): base()\n");
    write(dir.path(), "c.py", "def base(): pass\n");

    let provider = MockProvider::succeeding();
    // Budget of 1 token forces one unit per file
    let summary = Pipeline::new(test_config(1), provider.clone())
        .run(dir.path())
        .await
        .unwrap();

    assert_eq!(summary.units_total, 3);
    assert_eq!(summary.units_completed, 3);

    let order: Vec<String> = provider
        .prompts()
        .iter()
        .map(|p| first_member(p).to_string())
        .collect();
    assert_eq!(order, vec!["c.py", "b.py", "a.py"]);
}

#[tokio::test]
async fn dependency_docs_flow_into_later_prompts() {
    let dir = TempDir::new().unwrap();
    // Files sized so each exceeds half the budget: two units, with enough
    // context allowance left for the dependency docs to pass through intact
    let filler: String = (0..10)
        .map(|i| format!("def helper_function_number_{}(): pass\n", i))
        .collect();
    write(
        dir.path(),
        "app.py",
        &format!("from util import x\n\n{}", filler),
    );
    write(dir.path(), "util.py", &format!("def x(): pass\n\n{}", filler));

    let provider = MockProvider::succeeding();
    let summary = Pipeline::new(test_config(160), provider.clone())
        .run(dir.path())
        .await
        .unwrap();
    assert_eq!(summary.units_total, 2);

    let prompts = provider.prompts();
    // Second prompt (app.py) must carry the generated util.py docs
    assert_eq!(first_member(&prompts[1]), "app.py");
    assert!(prompts[1].contains("Generated documentation (call 0)."));
}

#[tokio::test]
async fn cycle_is_broken_and_recorded_as_soft_edge() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.py", "from b import g\n\ndef f(): g()\n");
    write(dir.path(), "b.py", "from a import f\n\ndef g(): f()\n");

    let provider = MockProvider::succeeding();
    let summary = Pipeline::new(test_config(40_000), provider)
        .run(dir.path())
        .await
        .unwrap();

    assert_eq!(summary.graph.soft_edges, 1);

    let manifest = skf::decode(&fs::read_to_string(&summary.skf_path).unwrap()).unwrap();
    let soft: Vec<_> = manifest
        .edges
        .iter()
        .filter(|e| e.kind == skf::EdgeKind::Soft)
        .collect();
    assert_eq!(soft.len(), 1);
    assert_eq!(soft[0].source, "b.py");
    assert_eq!(soft[0].target, "a.py");
}

#[tokio::test]
async fn transient_failures_are_retried_to_success() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.py", "def f(): pass\n");

    let provider = MockProvider::failing_first(2);
    let summary = Pipeline::new(test_config(40_000), provider.clone())
        .run(dir.path())
        .await
        .unwrap();

    assert_eq!(summary.units_completed, 1);
    assert_eq!(summary.units_failed, 0);
    // Two failures plus the success
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn exhausted_retries_yield_placeholder_not_abort() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.py", "def f(): pass\n");

    let provider = MockProvider::always_failing();
    let summary = Pipeline::new(test_config(40_000), provider.clone())
        .run(dir.path())
        .await
        .unwrap();

    assert_eq!(summary.units_failed, 1);
    assert_eq!(provider.call_count(), 3); // max_attempts

    let markdown = fs::read_to_string(&summary.doc_path).unwrap();
    assert!(markdown.contains("Documentation unavailable"));
}

#[tokio::test]
async fn failed_dependency_does_not_block_dependents() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app.py", "from util import x\n\ndef main(): x()\n");
    write(dir.path(), "util.py", "def x(): pass\n");

    // util.py generates first and burns all 3 attempts; app.py succeeds
    let provider = MockProvider::failing_first(3);
    let summary = Pipeline::new(test_config(1), provider.clone())
        .run(dir.path())
        .await
        .unwrap();

    assert_eq!(summary.units_completed, 1);
    assert_eq!(summary.units_failed, 1);

    let prompts = provider.prompts();
    let app_prompt = prompts.last().unwrap();
    assert_eq!(first_member(app_prompt), "app.py");
    assert!(app_prompt.contains("could not be generated"));
}

#[tokio::test]
async fn resume_skips_completed_units() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.py", "def f(): pass\n");
    write(dir.path(), "b.py", "def g(): pass\n");

    let first = MockProvider::succeeding();
    let summary = Pipeline::new(test_config(1), first.clone())
        .run(dir.path())
        .await
        .unwrap();
    assert_eq!(summary.units_completed, 2);
    assert_eq!(first.call_count(), 2);

    let second = MockProvider::succeeding();
    let resumed = Pipeline::new(test_config(1), second.clone())
        .run(dir.path())
        .await
        .unwrap();

    assert_eq!(second.call_count(), 0);
    assert_eq!(resumed.units_resumed, 2);
    assert_eq!(resumed.units_completed, 2);
}

#[tokio::test]
async fn changed_budget_invalidates_checkpoints() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.py", "def f(): pass\n");

    let first = MockProvider::succeeding();
    Pipeline::new(test_config(40_000), first)
        .run(dir.path())
        .await
        .unwrap();

    let second = MockProvider::succeeding();
    let summary = Pipeline::new(test_config(20_000), second.clone())
        .run(dir.path())
        .await
        .unwrap();

    assert_eq!(second.call_count(), 1);
    assert_eq!(summary.units_resumed, 0);
}

#[tokio::test]
async fn manifest_round_trips_through_decode() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app.py", "from util import x\n\ndef main(): x()\n");
    write(dir.path(), "util.py", "def x(): pass\n");

    let provider = MockProvider::succeeding();
    let summary = Pipeline::new(test_config(1), provider)
        .run(dir.path())
        .await
        .unwrap();

    let encoded = fs::read_to_string(&summary.skf_path).unwrap();
    let manifest = skf::decode(&encoded).unwrap();

    assert_eq!(manifest.budget, 1);
    assert_eq!(manifest.paths, vec!["app.py", "util.py"]);
    assert_eq!(manifest.units.len(), 2);
    assert!(manifest
        .units
        .iter()
        .all(|u| u.status == UnitStatus::Completed && u.text.is_some()));

    // Re-encoding the decoded document is stable
    assert_eq!(skf::encode(&manifest), encoded);
}

#[tokio::test]
async fn checkpoint_write_failure_does_not_lose_artifacts() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app.py", "from util import x\n\ndef main(): x()\n");
    write(dir.path(), "util.py", "def x(): pass\n");

    // The db lock lands during the second unit's generation, so the
    // first checkpoint write succeeds and the second fails
    let provider = Arc::new(LockHoldingProvider {
        db_path: dir.path().join(".autodoc/checkpoints.db"),
        lock_on_call: 1,
        calls: AtomicUsize::new(0),
        held: Mutex::new(None),
    });
    let summary = Pipeline::new(test_config(1), provider.clone())
        .run(dir.path())
        .await
        .unwrap();

    assert_eq!(summary.units_completed, 2);
    assert_eq!(summary.units_failed, 0);

    // Both artifacts still reflect every completed unit
    let markdown = fs::read_to_string(&summary.doc_path).unwrap();
    assert!(markdown.contains("Generated documentation (call 0)."));
    assert!(markdown.contains("Generated documentation (call 1)."));
    let manifest = skf::decode(&fs::read_to_string(&summary.skf_path).unwrap()).unwrap();
    assert!(manifest.units.iter().all(|u| u.status == UnitStatus::Completed));

    // The record written before the lock survived; the one after is absent
    provider.held.lock().unwrap().take();
    let (store, identity) = pipeline::open_store(dir.path()).unwrap();
    let records = store.load(&identity, 1).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records.values().all(|r| r.status == UnitStatus::Completed));
}

#[tokio::test]
async fn rate_limit_hint_extends_retry_delay() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.py", "def f(): pass\n");

    let provider = Arc::new(RateLimitedProvider {
        calls: AtomicUsize::new(0),
        hint: Duration::from_millis(250),
    });
    let started = Instant::now();
    let summary = Pipeline::new(test_config(40_000), provider.clone())
        .run(dir.path())
        .await
        .unwrap();

    assert_eq!(summary.units_completed, 1);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    // The retry waited at least the hinted duration, not the 1ms base delay
    assert!(started.elapsed() >= Duration::from_millis(250));
}

#[tokio::test]
async fn concurrent_synthesis_preserves_dependency_context() {
    let dir = TempDir::new().unwrap();
    // Each file exceeds half the budget, so every file gets its own unit
    // while dependency docs still fit the context allowance untruncated
    let filler: String = (0..20)
        .map(|i| format!("def helper_function_number_{}(): pass\n", i))
        .collect();
    for leaf in ["l1.py", "l2.py", "l3.py", "l4.py"] {
        write(dir.path(), leaf, &filler);
    }
    write(
        dir.path(),
        "app.py",
        &format!("import l1\nimport l2\nimport l3\nimport l4\n\n{}", filler),
    );

    let provider = MockProvider::succeeding();
    let config = Config {
        max_concurrent_units: 4,
        ..test_config(400)
    };
    let summary = Pipeline::new(config.clone(), provider.clone())
        .run(dir.path())
        .await
        .unwrap();

    assert_eq!(summary.units_total, 5);
    assert_eq!(summary.units_completed, 5);
    assert_eq!(provider.call_count(), 5);

    // app.py spawns only after all four leaves settle, with their docs
    let prompts = provider.prompts();
    let app_prompt = prompts
        .iter()
        .find(|p| first_member(p.as_str()) == "app.py")
        .unwrap();
    assert_eq!(
        app_prompt.matches("Generated documentation (call").count(),
        4
    );

    // Checkpoints written from concurrent tasks resume cleanly
    let second = MockProvider::succeeding();
    let resumed = Pipeline::new(config, second.clone())
        .run(dir.path())
        .await
        .unwrap();
    assert_eq!(second.call_count(), 0);
    assert_eq!(resumed.units_resumed, 5);
}
