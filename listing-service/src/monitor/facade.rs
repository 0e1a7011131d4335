//! Monitoring Façade: one entry point for the operator endpoints.
//!
//! Holds no state of its own and performs no access checks; callers gate it.

use std::sync::Arc;

use chrono::Utc;

use common::models::{
    DatabaseLiveness, DatabaseMetrics, IndexReport, LivenessReport, PerformanceSummary,
    PoolSnapshot, QueryPerformanceSummary, SystemHealth,
};

use super::{IndexAdvisor, PoolMonitor, QueryMonitor, TableAnalyzer};
use crate::store::EngineStats;

pub struct MonitoringFacade {
    queries: Arc<QueryMonitor>,
    indexes: IndexAdvisor,
    tables: TableAnalyzer,
    pool: PoolMonitor,
    stats: Arc<dyn EngineStats>,
}

impl MonitoringFacade {
    pub fn new(
        queries: Arc<QueryMonitor>,
        indexes: IndexAdvisor,
        tables: TableAnalyzer,
        pool: PoolMonitor,
        stats: Arc<dyn EngineStats>,
    ) -> Self {
        Self {
            queries,
            indexes,
            tables,
            pool,
            stats,
        }
    }

    pub fn query_performance(&self, endpoint: Option<&str>) -> QueryPerformanceSummary {
        self.queries.summary(endpoint)
    }

    pub async fn database_metrics(&self) -> DatabaseMetrics {
        let (pool, index_usage, table_statistics) = tokio::join!(
            self.pool.snapshot(),
            self.indexes.report(),
            self.tables.report()
        );
        DatabaseMetrics {
            pool,
            index_usage,
            table_statistics,
        }
    }

    pub async fn performance_summary(&self) -> PerformanceSummary {
        let query_performance = self.queries.summary(None);
        let (connection_pool, index_report) =
            tokio::join!(self.pool.snapshot(), self.indexes.report());

        PerformanceSummary {
            system_health: classify_health(
                query_performance.average_ms,
                connection_pool.utilization_pct,
            ),
            recommendations: system_recommendations(
                &query_performance,
                &connection_pool,
                &index_report,
            ),
            query_performance,
            connection_pool,
            index_report,
            generated_at: Utc::now(),
        }
    }

    pub async fn liveness(&self) -> LivenessReport {
        let database = match self.stats.server_version().await {
            Ok(version) => DatabaseLiveness {
                connected: true,
                version: Some(version),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Database liveness check failed");
                DatabaseLiveness {
                    connected: false,
                    version: None,
                }
            }
        };

        LivenessReport {
            status: if database.connected { "healthy" } else { "unhealthy" }.to_string(),
            database,
            timestamp: Utc::now(),
        }
    }
}

/// Critical above 3s average or 90% pool use, warning above 1s or 75%.
pub fn classify_health(average_ms: f64, utilization_pct: f64) -> SystemHealth {
    if average_ms > 3000.0 || utilization_pct > 90.0 {
        SystemHealth::Critical
    } else if average_ms > 1000.0 || utilization_pct > 75.0 {
        SystemHealth::Warning
    } else {
        SystemHealth::Healthy
    }
}

fn system_recommendations(
    queries: &QueryPerformanceSummary,
    pool: &PoolSnapshot,
    indexes: &IndexReport,
) -> Vec<String> {
    let mut out = Vec::new();

    if pool.utilization_pct > 80.0 {
        out.push(format!(
            "Connection pool is {:.1}% utilized; consider raising the pool size",
            pool.utilization_pct
        ));
    } else if pool.utilization_pct < 20.0 {
        out.push(format!(
            "Connection pool is only {:.1}% utilized; it may be over-provisioned",
            pool.utilization_pct
        ));
    }

    if pool.cache_stats_available && pool.cache_hit_ratio < 90.0 {
        out.push(format!(
            "Cache hit ratio is {:.1}%; consider more shared buffers or better indexes",
            pool.cache_hit_ratio
        ));
    }

    if queries.average_ms > 500.0 {
        out.push(format!(
            "Average query time is {:.1}ms; review slow queries and their plans",
            queries.average_ms
        ));
    }

    if !indexes.findings.is_empty() {
        out.push(format!(
            "Index advisor reported {} finding(s); review the index report",
            indexes.findings.len()
        ));
    }

    if out.is_empty() {
        out.push("System performance is optimal".to_string());
    }
    out
}
