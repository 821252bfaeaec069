//! Synthesis Driver
//!
//! Orders LLM generation over the unit plan, respecting unit
//! dependencies: a unit starts only after every unit it depends on has
//! settled. Units with no mutual ordering constraint may run
//! concurrently up to the configured limit.
//!
//! Resume semantics: units with a completed checkpoint under the same
//! (root, budget) are reused without a provider call. A unit whose
//! dependency failed still generates, with the missing context noted in
//! its prompt. Retries use exponential backoff with jitter and only
//! fire for retryable classifications; rate-limit responses that carry
//! an explicit wait hint extend the backoff delay.
//!
//! Checkpoint store trouble never aborts a pass: a failed load
//! regenerates everything, and a failed write stops further checkpoint
//! updates while units keep settling in memory.

pub mod prompt;

use backon::{ExponentialBuilder, Retryable};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::ai::{GenerateOptions, SharedProvider, UsageSnapshot, UsageTracker};
use crate::analyzer::ModuleSummary;
use crate::catalog::FileCatalog;
use crate::checkpoint::{CheckpointRecord, CheckpointStore, UnitStatus};
use crate::chunker::UnitPlan;
use crate::config::{Config, RetrySettings};
use crate::error::{DocError, ErrorCategory, LlmError, Result};
use prompt::{DependencyContext, MemberContext, PromptBuilder};

/// Terminal outcome of one unit
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub unit_id: String,
    pub index: usize,
    pub members: Vec<String>,
    pub status: UnitStatus,
    /// Present for completed units
    pub doc_text: Option<String>,
    pub retry_count: u32,
    /// True when the text came from a checkpoint, not a provider call
    pub resumed: bool,
}

/// Results of a full synthesis pass, in unit order
#[derive(Debug)]
pub struct SynthesisReport {
    pub outcomes: Vec<UnitOutcome>,
    pub usage: UsageSnapshot,
}

impl SynthesisReport {
    pub fn completed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == UnitStatus::Completed)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.completed()
    }
}

/// Drives unit synthesis against a provider with checkpointed resume
pub struct SynthesisDriver {
    provider: SharedProvider,
    store: CheckpointStore,
    budget: usize,
    retry: RetrySettings,
    options: GenerateOptions,
    request_timeout: Duration,
    max_concurrent: usize,
    usage: Arc<UsageTracker>,
}

impl SynthesisDriver {
    pub fn new(provider: SharedProvider, store: CheckpointStore, config: &Config) -> Self {
        Self {
            provider,
            store,
            budget: config.unit_budget,
            retry: config.retry.clone(),
            options: GenerateOptions {
                temperature: config.provider.temperature,
                max_tokens: config.provider.max_tokens,
            },
            request_timeout: Duration::from_secs(config.provider.timeout_secs),
            max_concurrent: config.max_concurrent_units,
            usage: Arc::new(UsageTracker::new()),
        }
    }

    /// Synthesize every unit in the plan, reusing completed checkpoints
    pub async fn run(
        &self,
        plan: &UnitPlan,
        catalog: &FileCatalog,
        modules: &[ModuleSummary],
        root_identity: &str,
    ) -> Result<SynthesisReport> {
        let module_by_path: HashMap<&str, &ModuleSummary> =
            modules.iter().map(|m| (m.path.as_str(), m)).collect();
        let checkpoints = match self.store.load(root_identity, self.budget) {
            Ok(records) => records,
            Err(err) => {
                warn!("Checkpoint load failed; regenerating all units: {}", err);
                HashMap::new()
            }
        };

        let n = plan.units.len();
        let mut settled: Vec<Option<UnitOutcome>> = vec![None; n];
        let mut spawned = vec![false; n];

        // Completed checkpoints settle immediately; failed ones retry
        for unit in &plan.units {
            if let Some(record) = checkpoints.get(&unit.id)
                && record.status == UnitStatus::Completed
            {
                info!(unit = %unit.id, "Reusing checkpointed unit");
                settled[unit.index] = Some(UnitOutcome {
                    unit_id: unit.id.clone(),
                    index: unit.index,
                    members: unit.members.clone(),
                    status: UnitStatus::Completed,
                    doc_text: record.doc_text.clone(),
                    retry_count: record.retry_count,
                    resumed: true,
                });
                spawned[unit.index] = true;
            }
        }

        let builder = PromptBuilder::new(self.budget);
        let mut tasks: JoinSet<UnitOutcome> = JoinSet::new();
        let mut checkpointing = true;

        loop {
            // Launch every unit whose dependencies have settled, up to
            // the concurrency limit
            for unit in &plan.units {
                if spawned[unit.index] || tasks.len() >= self.max_concurrent {
                    continue;
                }
                let ready = plan.dependencies[unit.index]
                    .iter()
                    .all(|&d| settled[d].is_some());
                if !ready {
                    continue;
                }

                let prompt = self.build_prompt(&builder, plan, unit.index, catalog, &module_by_path, &settled)?;
                spawned[unit.index] = true;
                tasks.spawn(self.unit_task(
                    unit.id.clone(),
                    unit.index,
                    unit.members.clone(),
                    prompt,
                ));
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            let outcome = joined.map_err(|e| {
                DocError::Generation(LlmError::new(
                    ErrorCategory::Unknown,
                    format!("Synthesis task panicked: {}", e),
                ))
            })?;

            if checkpointing {
                let record = CheckpointRecord {
                    unit_id: outcome.unit_id.clone(),
                    status: outcome.status,
                    doc_text: outcome.doc_text.clone(),
                    retry_count: outcome.retry_count,
                };
                if let Err(err) = self.store.record(root_identity, self.budget, &record) {
                    warn!(
                        unit = %outcome.unit_id,
                        "Checkpoint write failed; continuing without further checkpoint updates: {}",
                        err
                    );
                    checkpointing = false;
                }
            }
            let index = outcome.index;
            settled[index] = Some(outcome);
        }

        let outcomes: Vec<UnitOutcome> = settled.into_iter().flatten().collect();
        if outcomes.len() != n {
            // Partition invariant: every planned unit must settle exactly once
            return Err(DocError::Generation(LlmError::new(
                ErrorCategory::Unknown,
                format!("Scheduler settled {} of {} units", outcomes.len(), n),
            )));
        }

        info!(
            completed = outcomes.iter().filter(|o| o.status == UnitStatus::Completed).count(),
            total = n,
            "Synthesis pass finished"
        );
        Ok(SynthesisReport {
            outcomes,
            usage: self.usage.snapshot(),
        })
    }

    fn build_prompt(
        &self,
        builder: &PromptBuilder,
        plan: &UnitPlan,
        index: usize,
        catalog: &FileCatalog,
        module_by_path: &HashMap<&str, &ModuleSummary>,
        settled: &[Option<UnitOutcome>],
    ) -> Result<String> {
        let unit = &plan.units[index];

        let mut members = Vec::with_capacity(unit.members.len());
        for path in &unit.members {
            let Some(module) = module_by_path.get(path.as_str()) else {
                continue;
            };
            let Some(entry) = catalog.get(path) else {
                continue;
            };
            members.push(MemberContext {
                path: path.clone(),
                language: module.language,
                symbols: module.symbols.clone(),
                content: catalog.read_content(entry)?,
            });
        }

        let dependencies: Vec<DependencyContext> = plan.dependencies[index]
            .iter()
            .filter_map(|&d| settled[d].as_ref())
            .map(|outcome| DependencyContext {
                members: outcome.members.clone(),
                doc_text: outcome.doc_text.clone(),
            })
            .collect();

        Ok(builder.build(&members, &dependencies, unit.oversized))
    }

    /// Spawnable future generating one unit with retry and timeout.
    /// Captures only owned clones, so it outlives the driver borrow.
    fn unit_task(
        &self,
        unit_id: String,
        index: usize,
        members: Vec<String>,
        prompt: String,
    ) -> impl Future<Output = UnitOutcome> + Send + use<> {
        let provider = self.provider.clone();
        let options = self.options.clone();
        let usage = self.usage.clone();
        let retry = self.retry.clone();
        let request_timeout = self.request_timeout;

        async move {
            let attempts = AtomicU32::new(0);
            let backoff = ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(retry.base_delay_ms))
                .with_max_delay(Duration::from_secs(retry.max_delay_secs))
                .with_max_times(retry.max_attempts.saturating_sub(1))
                .with_jitter();

            let call = || {
                let provider = provider.clone();
                let prompt = prompt.clone();
                let options = options.clone();
                attempts.fetch_add(1, Ordering::Relaxed);
                async move {
                    match tokio::time::timeout(request_timeout, provider.generate(&prompt, &options))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(DocError::Timeout {
                            operation: "llm generation".to_string(),
                            duration: request_timeout,
                        }),
                    }
                }
            };

            let result = call
                .retry(backoff)
                .when(|e: &DocError| e.is_retryable())
                .adjust(|err: &DocError, delay| match err {
                    // Rate-limit responses carry an explicit wait hint;
                    // never retry sooner than it asks
                    DocError::Generation(llm) => match (llm.retry_after, delay) {
                        (Some(hint), Some(planned)) => Some(planned.max(hint)),
                        _ => delay,
                    },
                    _ => delay,
                })
                .notify(|err, delay| {
                    warn!(unit = %unit_id, delay = ?delay, "Retrying unit generation: {}", err)
                })
                .await;

            let retry_count = attempts.load(Ordering::Relaxed).saturating_sub(1);
            match result {
                Ok(response) => {
                    usage.record(response.usage);
                    UnitOutcome {
                        unit_id,
                        index,
                        members,
                        status: UnitStatus::Completed,
                        doc_text: Some(response.text),
                        retry_count,
                        resumed: false,
                    }
                }
                Err(err) => {
                    warn!(unit = %unit_id, "Unit generation failed permanently: {}", err);
                    UnitOutcome {
                        unit_id,
                        index,
                        members,
                        status: UnitStatus::Failed,
                        doc_text: None,
                        retry_count,
                        resumed: false,
                    }
                }
            }
        }
    }
}
