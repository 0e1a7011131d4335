//! Query Performance Monitor.
//!
//! Wraps query execution, classifies each run against the slow threshold
//! and keeps a bounded FIFO history of [`QueryMetric`]s. Writers take the
//! history lock only to push; readers clone the `Arc`s under the lock and
//! reduce outside it, so a summary never blocks appends for a full scan.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use common::config::AppConfig;
use common::models::{
    EndpointSummary, PlanDiagnostics, QueryMetric, QueryOutcome, QueryPerformanceSummary,
};
use common::utils::SqlInspector;

use crate::search::Statement;
use crate::store::{ListingStore, StoreError};

/// Number of entries in the slowest-queries list.
const SLOWEST_LIMIT: usize = 10;

/// Longest a caller waits for a slow query's plan estimate.
const DEFAULT_EXPLAIN_BUDGET: Duration = Duration::from_millis(200);

pub struct QueryMonitor {
    threshold_ms: f64,
    capacity: usize,
    explain_budget: Duration,
    retention: chrono::Duration,
    history: Mutex<VecDeque<Arc<QueryMetric>>>,
}

impl QueryMonitor {
    pub fn new(threshold_ms: f64, capacity: usize, retention_hours: i64) -> Self {
        let capacity = capacity.max(1);
        Self {
            threshold_ms,
            capacity,
            explain_budget: DEFAULT_EXPLAIN_BUDGET,
            retention: chrono::Duration::hours(retention_hours.max(1)),
            history: Mutex::new(VecDeque::with_capacity(capacity.min(8192))),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.slow_query_threshold_ms,
            config.metric_history_capacity,
            config.metrics_retention_hours,
        )
        .with_explain_budget(Duration::from_millis(config.explain_timeout_ms))
    }

    /// Caps how long a slow query's caller waits on the plan estimate.
    pub fn with_explain_budget(mut self, budget: Duration) -> Self {
        self.explain_budget = budget;
        self
    }

    /// Runs `exec` and records exactly one metric for it, whatever the outcome.
    ///
    /// Slow runs are explained through `store` without re-executing, within
    /// the explain budget; if the engine cannot explain in time, the metric
    /// carries elapsed time only. The metric is stamped when execution
    /// completes, not when diagnostics do. Dropping the returned future
    /// mid-flight records a `cancelled` metric.
    pub async fn observe<T, F>(
        &self,
        endpoint: &str,
        statement: &Statement,
        store: &dyn ListingStore,
        exec: F,
        rows_of: impl Fn(&T) -> u64,
    ) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let mut guard = InFlight {
            monitor: self,
            signature: statement.signature(),
            endpoint,
            started: Instant::now(),
            stage: Stage::Running,
        };

        let result = exec.await;
        let elapsed_ms = guard.started.elapsed().as_secs_f64() * 1000.0;
        let finished_at = Utc::now();
        let is_slow = elapsed_ms > self.threshold_ms;

        match result {
            Ok(value) => {
                let rows = rows_of(&value);
                let plan = if is_slow {
                    guard.stage = Stage::Explaining {
                        elapsed_ms,
                        rows,
                        finished_at,
                    };
                    let explained =
                        tokio::time::timeout(self.explain_budget, store.explain(statement));
                    match explained.await {
                        Ok(Ok(plan)) => Some(plan),
                        Ok(Err(e)) => {
                            tracing::debug!(
                                signature = %guard.signature,
                                error = %e,
                                "Plan diagnostics unavailable"
                            );
                            None
                        }
                        Err(_) => {
                            tracing::debug!(
                                signature = %guard.signature,
                                budget_ms = self.explain_budget.as_millis() as u64,
                                "Plan diagnostics timed out"
                            );
                            None
                        }
                    }
                } else {
                    None
                };

                if is_slow {
                    log_slow(
                        &guard.signature,
                        endpoint,
                        elapsed_ms,
                        self.threshold_ms,
                        plan.as_ref(),
                    );
                }
                guard.finish(elapsed_ms, rows, QueryOutcome::Ok, plan, finished_at);
                Ok(value)
            }
            Err(e) => {
                tracing::error!(
                    signature = %guard.signature,
                    endpoint = %endpoint,
                    elapsed_ms,
                    error = %e,
                    "Query execution failed"
                );
                guard.finish(elapsed_ms, 0, QueryOutcome::Error, None, finished_at);
                Err(e)
            }
        }
    }

    /// Appends a metric, evicting the oldest entry at capacity.
    pub(crate) fn record(&self, metric: QueryMetric) {
        let metric = Arc::new(metric);
        let mut history = self.history.lock();
        while history.len() >= self.capacity {
            history.pop_front();
        }
        history.push_back(metric);
    }

    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    /// Consistent copy of the history at call time, oldest first.
    pub fn snapshot(&self) -> Vec<Arc<QueryMetric>> {
        self.history.lock().iter().cloned().collect()
    }

    /// Drops metrics older than the retention window. Returns how many went.
    pub fn prune_expired(&self) -> usize {
        let cutoff = Utc::now() - self.retention;
        let mut history = self.history.lock();
        let before = history.len();
        history.retain(|m| m.timestamp >= cutoff);
        before - history.len()
    }

    /// Spawns a task that prunes expired metrics every `every`.
    pub fn spawn_pruner(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = monitor.prune_expired();
                if removed > 0 {
                    tracing::info!(
                        removed,
                        retained = monitor.len(),
                        "Pruned expired query metrics"
                    );
                }
            }
        })
    }

    /// Reduces the retained metrics, optionally for one endpoint.
    pub fn summary(&self, endpoint: Option<&str>) -> QueryPerformanceSummary {
        let cutoff = Utc::now() - self.retention;
        let metrics: Vec<Arc<QueryMetric>> = self
            .snapshot()
            .into_iter()
            .filter(|m| m.timestamp >= cutoff)
            .filter(|m| endpoint.map_or(true, |e| m.endpoint == e))
            .collect();

        let stats = TimingStats::of(metrics.iter().map(|m| m.execution_time_ms));
        let slow_queries = metrics.iter().filter(|m| m.is_slow).count() as u64;
        let failed_queries = metrics
            .iter()
            .filter(|m| m.outcome != QueryOutcome::Ok)
            .count() as u64;
        let slow_query_percentage = percentage(slow_queries, stats.count);

        let mut grouped: BTreeMap<&str, Vec<&QueryMetric>> = BTreeMap::new();
        for m in &metrics {
            grouped.entry(m.endpoint.as_str()).or_default().push(m.as_ref());
        }
        let by_endpoint = grouped
            .into_iter()
            .map(|(endpoint, group)| {
                let s = TimingStats::of(group.iter().map(|m| m.execution_time_ms));
                EndpointSummary {
                    endpoint: endpoint.to_string(),
                    total_queries: s.count,
                    slow_queries: group.iter().filter(|m| m.is_slow).count() as u64,
                    average_ms: s.average,
                    p95_ms: s.p95,
                    max_ms: s.max,
                }
            })
            .collect();

        let mut slowest: Vec<&Arc<QueryMetric>> = metrics.iter().collect();
        slowest.sort_by(|a, b| b.execution_time_ms.total_cmp(&a.execution_time_ms));
        let slowest = slowest
            .into_iter()
            .take(SLOWEST_LIMIT)
            .map(|m| QueryMetric::clone(m))
            .collect();

        let recommendations = recommend(&metrics, slow_query_percentage, stats.average);

        QueryPerformanceSummary {
            total_queries: stats.count,
            slow_queries,
            slow_query_percentage,
            average_ms: stats.average,
            median_ms: stats.median,
            p95_ms: stats.p95,
            p99_ms: stats.p99,
            max_ms: stats.max,
            total_ms: stats.total,
            failed_queries,
            slow_query_threshold_ms: self.threshold_ms,
            by_endpoint,
            slowest,
            recommendations,
        }
    }
}

enum Stage {
    Running,
    /// Execution finished; waiting on the planner estimate.
    Explaining {
        elapsed_ms: f64,
        rows: u64,
        finished_at: DateTime<Utc>,
    },
    Done,
}

/// Records a metric for a query whose caller went away.
struct InFlight<'a> {
    monitor: &'a QueryMonitor,
    signature: String,
    endpoint: &'a str,
    started: Instant,
    stage: Stage,
}

impl InFlight<'_> {
    fn finish(
        &mut self,
        elapsed_ms: f64,
        rows: u64,
        outcome: QueryOutcome,
        plan: Option<PlanDiagnostics>,
        finished_at: DateTime<Utc>,
    ) {
        self.stage = Stage::Done;
        self.monitor.record(QueryMetric {
            query_signature: std::mem::take(&mut self.signature),
            endpoint: self.endpoint.to_string(),
            execution_time_ms: elapsed_ms,
            rows_returned: rows,
            is_slow: elapsed_ms > self.monitor.threshold_ms,
            outcome,
            timestamp: finished_at,
            plan,
        });
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        match std::mem::replace(&mut self.stage, Stage::Done) {
            Stage::Done => {}
            Stage::Running => {
                let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
                tracing::warn!(
                    signature = %self.signature,
                    endpoint = %self.endpoint,
                    elapsed_ms,
                    "Query cancelled before completion"
                );
                self.finish(elapsed_ms, 0, QueryOutcome::Cancelled, None, Utc::now());
            }
            // The query itself completed; only the diagnostics were lost.
            Stage::Explaining {
                elapsed_ms,
                rows,
                finished_at,
            } => {
                self.finish(elapsed_ms, rows, QueryOutcome::Ok, None, finished_at);
            }
        }
    }
}

fn log_slow(
    signature: &str,
    endpoint: &str,
    elapsed_ms: f64,
    threshold_ms: f64,
    plan: Option<&PlanDiagnostics>,
) {
    match plan {
        Some(plan) => tracing::warn!(
            signature = %signature,
            endpoint = %endpoint,
            elapsed_ms,
            threshold_ms,
            plan_root = %plan.root_node,
            estimated_cost = plan.estimated_cost,
            estimated_rows = plan.estimated_rows,
            uses_index = plan.uses_index,
            "Slow query detected"
        ),
        None => tracing::warn!(
            signature = %signature,
            endpoint = %endpoint,
            elapsed_ms,
            threshold_ms,
            "Slow query detected"
        ),
    }
}

#[derive(Debug, Default, PartialEq)]
struct TimingStats {
    count: u64,
    total: f64,
    average: f64,
    median: f64,
    p95: f64,
    p99: f64,
    max: f64,
}

impl TimingStats {
    fn of(times: impl Iterator<Item = f64>) -> Self {
        let mut sorted: Vec<f64> = times.collect();
        if sorted.is_empty() {
            return Self::default();
        }
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let total: f64 = sorted.iter().sum();
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        Self {
            count: n as u64,
            total,
            average: total / n as f64,
            median,
            p95: percentile(&sorted, 0.95),
            p99: percentile(&sorted, 0.99),
            max: sorted[n - 1],
        }
    }
}

/// Percentile over an ascending slice, taking the element at `floor(n * p)`
/// (clamped to the last index).
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64) * p) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn recommend(metrics: &[Arc<QueryMetric>], slow_pct: f64, average_ms: f64) -> Vec<String> {
    let mut out = Vec::new();
    if slow_pct > 10.0 {
        out.push(format!(
            "High percentage of slow queries ({:.1}%). Consider adding indexes or narrowing filters.",
            slow_pct
        ));
    }
    if average_ms > 500.0 {
        out.push(format!(
            "Average query time is high ({:.1}ms). Review query complexity and indexes.",
            average_ms
        ));
    }

    let slow_sql: HashSet<&str> = metrics
        .iter()
        .filter(|m| m.is_slow)
        .map(|m| m.query_signature.as_str())
        .collect();
    if slow_sql.iter().any(|sql| SqlInspector::lacks_where(sql)) {
        out.push("Slow queries without a WHERE clause scan whole tables. Add filters.".to_string());
    }
    if slow_sql.iter().any(|sql| SqlInspector::selects_star(sql)) {
        out.push("Slow queries use SELECT *. Select only the columns you need.".to_string());
    }
    if slow_sql.iter().any(|sql| SqlInspector::orders_without_limit(sql)) {
        out.push("Slow queries use ORDER BY without LIMIT. Paginate the result.".to_string());
    }

    if out.is_empty() {
        out.push("Query performance looks good".to_string());
    }
    out
}
