use std::sync::Arc;

use autometrics::autometrics;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::interval;
use tokio::time::timeout;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::ExpressionContext;
use super::ExpressionRegistry;
use super::RuleTag;
use crate::cache::EntityCache;
use crate::now_millis;
use crate::ExpressionSource;
use crate::Quality;
use crate::Result;
use crate::SchedulerConfig;
use crate::SchedulerError;
use crate::API_SLO;

struct RunState {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// Periodic, parallel recomputation of expression-backed rule values.
///
/// This is the poll path: bounded staleness equal to the evaluation cycle,
/// deliberately distinct from the alarm engine's push path. The two only
/// interact through the shared rule cache and its per-key locks, so a rule
/// being pushed and polled concurrently still resolves deterministically
/// (last writer under the lock wins).
pub struct DerivedValueScheduler {
    rules: Arc<EntityCache<RuleTag>>,
    registry: Arc<ExpressionRegistry>,
    context: Arc<dyn ExpressionContext>,
    /// Optional audit write-through of computed values
    audit: Option<Arc<dyn ExpressionSource>>,
    config: SchedulerConfig,
    run_state: Mutex<Option<RunState>>,
}

impl DerivedValueScheduler {
    pub fn new(
        rules: Arc<EntityCache<RuleTag>>,
        registry: Arc<ExpressionRegistry>,
        context: Arc<dyn ExpressionContext>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            rules,
            registry,
            context,
            audit: None,
            config,
            run_state: Mutex::new(None),
        }
    }

    /// Enables audit write-through of computed values to the expression
    /// source. Happens after the cache put, outside any shard lock; a
    /// failure is logged and never fails the cycle.
    pub fn with_audit(
        mut self,
        audit: Arc<dyn ExpressionSource>,
    ) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn is_running(&self) -> bool {
        self.run_state.lock().is_some()
    }

    /// Schedules the repeating evaluation cycle.
    ///
    /// Ticks arriving while the previous cycle is still running are skipped
    /// entirely; there is never more than one cycle in flight per scheduler.
    pub fn start(&self) -> Result<()> {
        let mut run_state = self.run_state.lock();
        if run_state.is_some() {
            return Err(SchedulerError::AlreadyRunning.into());
        }

        let cancel = CancellationToken::new();
        let child = cancel.clone();
        let rules = self.rules.clone();
        let registry = self.registry.clone();
        let context = self.context.clone();
        let audit = self.audit.clone();
        let config = self.config.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(config.cycle());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        run_cycle(&rules, &registry, &context, &audit, config.pool_size).await;
                    }
                }
            }
            debug!("scheduler loop exited");
        });

        *run_state = Some(RunState { cancel, handle });
        info!("derived-value scheduler started, cycle {:?}", self.config.cycle());
        Ok(())
    }

    /// Cancels the timer and waits a bounded grace period for the in-flight
    /// cycle before abandoning it. Never deadlocks on worker tasks.
    pub async fn stop(&self) -> Result<()> {
        let state = self
            .run_state
            .lock()
            .take()
            .ok_or(SchedulerError::NotRunning)?;

        state.cancel.cancel();
        let mut handle = state.handle;
        match timeout(self.config.shutdown_grace(), &mut handle).await {
            Ok(Ok(())) => info!("derived-value scheduler stopped"),
            Ok(Err(e)) => error!("scheduler task failed during shutdown: {:?}", e),
            Err(_) => {
                warn!(
                    "scheduler did not finish within {:?}, abandoning in-flight cycle",
                    self.config.shutdown_grace()
                );
                handle.abort();
            }
        }
        Ok(())
    }
}

/// One evaluation cycle: fan out every compiled expression over a bounded
/// worker pool, write each result back under that rule's per-key lock.
///
/// A single expression's runtime failure is logged and skipped; the rule
/// keeps its previous cached value and sibling evaluations are unaffected.
#[autometrics(objective = API_SLO)]
pub(crate) async fn run_cycle(
    rules: &Arc<EntityCache<RuleTag>>,
    registry: &Arc<ExpressionRegistry>,
    context: &Arc<dyn ExpressionContext>,
    audit: &Option<Arc<dyn ExpressionSource>>,
    pool_size: usize,
) {
    let snapshot = registry.snapshot();
    if snapshot.is_empty() {
        return;
    }
    debug!("evaluation cycle over {} rules", snapshot.len());

    let semaphore = Arc::new(Semaphore::new(pool_size));
    let mut join_set = JoinSet::new();

    for (rule_id, expr) in snapshot {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let rules = rules.clone();
        let context = context.clone();
        let audit = audit.clone();

        join_set.spawn(async move {
            let _permit = permit;
            // Evaluation is synchronous and possibly CPU-heavy; it runs on
            // the blocking pool so a slow expression cannot starve the
            // runtime workers or the scheduler's own tick.
            let evaluated =
                tokio::task::spawn_blocking(move || expr.evaluate(context.as_ref())).await;
            let result = match evaluated {
                Ok(result) => result,
                Err(e) => {
                    error!("rule {} evaluation task failed: {:?}", rule_id, e);
                    return;
                }
            };
            match result {
                Ok(value) => {
                    let mut rule = match rules.get(rule_id) {
                        Ok(rule) => rule,
                        Err(e) => {
                            warn!("rule {} not cached, dropping computed value: {:?}", rule_id, e);
                            return;
                        }
                    };
                    rule.value = Some(value.clone());
                    rule.quality = Quality::valid();
                    rule.cache_timestamp = now_millis();
                    // A cache mutation like any other: fires UpdateAccepted.
                    rules.put(rule);

                    if let Some(audit) = audit {
                        if let Err(e) = audit.update_config(rule_id, &value) {
                            warn!("audit write-through for rule {} failed: {:?}", rule_id, e);
                        }
                    }
                }
                Err(e) => {
                    warn!("rule {} evaluation failed, keeping previous value: {:?}", rule_id, e);
                }
            }
        });
    }

    while let Some(joined) = join_set.join_next().await {
        if let Err(e) = joined {
            error!("rule evaluation task failed: {:?}", e);
        }
    }
}
