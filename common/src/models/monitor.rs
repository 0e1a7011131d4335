//! Monitoring and performance metrics models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// How an observed query ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QueryOutcome {
    Ok,
    Error,
    /// The caller went away while the query was in flight.
    Cancelled,
}

/// Planner estimate for a statement, obtained without executing it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct PlanDiagnostics {
    /// Node type at the root of the plan (e.g. "Limit", "Seq Scan").
    pub root_node: String,
    /// Planner total cost estimate.
    pub estimated_cost: f64,
    /// Planner row estimate at the root.
    pub estimated_rows: f64,
    /// Whether any node in the plan reads through an index.
    pub uses_index: bool,
}

/// One executed query. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct QueryMetric {
    /// Canonical statement text with bind placeholders.
    pub query_signature: String,
    /// Endpoint that issued the query.
    pub endpoint: String,
    /// Wall time spent executing, in milliseconds.
    pub execution_time_ms: f64,
    pub rows_returned: u64,
    pub is_slow: bool,
    pub outcome: QueryOutcome,
    /// When execution finished.
    pub timestamp: DateTime<Utc>,
    /// Present only for slow queries the engine could explain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanDiagnostics>,
}

/// Aggregates for a single endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct EndpointSummary {
    pub endpoint: String,
    pub total_queries: u64,
    pub slow_queries: u64,
    pub average_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
}

/// Reduction over the retained query metrics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct QueryPerformanceSummary {
    pub total_queries: u64,
    pub slow_queries: u64,
    pub slow_query_percentage: f64,
    pub average_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
    pub total_ms: f64,
    pub failed_queries: u64,
    pub slow_query_threshold_ms: f64,
    /// Per-endpoint breakdown, sorted by endpoint.
    pub by_endpoint: Vec<EndpointSummary>,
    /// Slowest retained metrics, slowest first.
    pub slowest: Vec<QueryMetric>,
    pub recommendations: Vec<String>,
}

/// Index declared on a table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct DeclaredIndex {
    pub index_name: String,
    pub table_name: String,
    /// Indexed columns in key order.
    pub columns: Vec<String>,
    pub is_primary: bool,
}

/// Usage counters the engine keeps for an index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct IndexStat {
    pub index_name: String,
    pub table_name: String,
    pub scan_count: u64,
    pub last_used: Option<DateTime<Utc>>,
}

/// One advisory finding. Nothing acts on these automatically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexFinding {
    /// A filtered or sorted column with no index leading on it.
    MissingIndex {
        table_name: String,
        column: String,
        message: String,
    },
    /// An index with zero recorded scans at sampling time.
    UnusedIndex {
        table_name: String,
        index_name: String,
        message: String,
    },
}

/// Result of one Index Advisor run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct IndexReport {
    pub findings: Vec<IndexFinding>,
    pub total_indexes: usize,
    /// Usage counters, most scanned first.
    pub index_stats: Vec<IndexStat>,
    /// True when part of the engine's statistics could not be read.
    pub degraded: bool,
    /// Why the report is degraded, if it is.
    pub notes: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Write and maintenance counters for one table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct TableStat {
    pub table_name: String,
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
    pub live_tuples: u64,
    pub dead_tuples: u64,
    /// Dead tuples per live tuple; 0 when there are no dead tuples.
    pub dead_tuple_ratio: f64,
    pub last_vacuum: Option<DateTime<Utc>>,
    pub last_autovacuum: Option<DateTime<Utc>>,
    pub last_analyze: Option<DateTime<Utc>>,
    pub last_autoanalyze: Option<DateTime<Utc>>,
}

/// Per-table statistics, largest tables first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct TableReport {
    pub tables: Vec<TableStat>,
    /// True when the engine's table statistics could not be read.
    pub degraded: bool,
    pub notes: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Connection pool state sampled at read time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct PoolSnapshot {
    pub active_connections: u32,
    pub idle_connections: u32,
    /// Open connections above the configured base size.
    pub overflow_connections: u32,
    pub pool_size: u32,
    /// Base size plus maximum overflow.
    pub max_capacity: u32,
    pub utilization_pct: f64,
    pub cache_hit_ratio: f64,
    /// False when the engine's cache counters could not be read.
    pub cache_stats_available: bool,
    pub sampled_at: DateTime<Utc>,
}

/// Overall health classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SystemHealth {
    Healthy,
    Warning,
    Critical,
}

/// Payload of `GET /monitoring/performance-summary`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct PerformanceSummary {
    pub system_health: SystemHealth,
    pub query_performance: QueryPerformanceSummary,
    pub connection_pool: PoolSnapshot,
    pub index_report: IndexReport,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Payload of `GET /monitoring/database`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct DatabaseMetrics {
    #[serde(flatten)]
    pub pool: PoolSnapshot,
    pub index_usage: IndexReport,
    pub table_statistics: TableReport,
}

/// Database connectivity as seen by the liveness check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct DatabaseLiveness {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Payload of `GET /monitoring/health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct LivenessReport {
    /// "healthy" or "unhealthy".
    pub status: String,
    pub database: DatabaseLiveness,
    pub timestamp: DateTime<Utc>,
}
