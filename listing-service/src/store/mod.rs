//! Storage engine seam.
//!
//! `ListingStore` executes compiled plans; `EngineStats` exposes the
//! engine's own bookkeeping for the monitors. Both are object-safe so the
//! service can run against Postgres in production and an in-memory store
//! in tests.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use common::errors::{AppError, DiagnosticsUnavailable};
use common::models::{DeclaredIndex, IndexStat, PlanDiagnostics, PropertySummary};

use crate::search::{CountPlan, QueryPlan, Statement};

pub use postgres::PgListingStore;

/// Failure while executing a query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("query failed: {0}")]
    Query(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => StoreError::Timeout(e.to_string()),
            sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                StoreError::Connection(e.to_string())
            }
            other => StoreError::Query(other.to_string()),
        }
    }
}

impl StoreError {
    /// Converts into the caller-facing error, keeping the signature for logs.
    pub fn into_app_error(self, signature: &str) -> AppError {
        match self {
            StoreError::Connection(message) | StoreError::Timeout(message) => {
                AppError::DatabaseConnection(message)
            }
            StoreError::Query(message) => AppError::QueryExecution {
                signature: signature.to_string(),
                message,
            },
        }
    }
}

/// Pool bookkeeping at sampling time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolState {
    /// Open connections, idle or not.
    pub size: u32,
    pub idle: u32,
}

impl PoolState {
    pub fn in_use(&self) -> u32 {
        self.size.saturating_sub(self.idle)
    }
}

/// Buffer cache counters for the current database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheCounters {
    /// Blocks found in the buffer cache.
    pub hits: u64,
    /// Blocks read from disk.
    pub reads: u64,
}

/// Raw per-table counters as the engine reports them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableCounters {
    pub table_name: String,
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
    pub live_tuples: u64,
    pub dead_tuples: u64,
    pub last_vacuum: Option<DateTime<Utc>>,
    pub last_autovacuum: Option<DateTime<Utc>>,
    pub last_analyze: Option<DateTime<Utc>>,
    pub last_autoanalyze: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Runs the page query and returns the summaries in plan order.
    async fn fetch_page(&self, plan: &QueryPlan) -> Result<Vec<PropertySummary>, StoreError>;

    /// Runs the count query.
    async fn count(&self, plan: &CountPlan) -> Result<u64, StoreError>;

    /// Planner estimate for a statement. Must not execute it.
    async fn explain(&self, statement: &Statement)
        -> Result<PlanDiagnostics, DiagnosticsUnavailable>;
}

#[async_trait]
pub trait EngineStats: Send + Sync {
    /// Indexes declared on the given tables.
    async fn declared_indexes(
        &self,
        tables: &[&str],
    ) -> Result<Vec<DeclaredIndex>, DiagnosticsUnavailable>;

    /// Usage counters for indexes on the given tables.
    async fn index_usage(&self, tables: &[&str]) -> Result<Vec<IndexStat>, DiagnosticsUnavailable>;

    async fn cache_counters(&self) -> Result<CacheCounters, DiagnosticsUnavailable>;

    /// Write and vacuum counters for the tables of the current schema.
    async fn table_counters(&self) -> Result<Vec<TableCounters>, DiagnosticsUnavailable>;

    /// Pool bookkeeping. Reads only; never opens or closes connections.
    fn pool_state(&self) -> PoolState;

    /// Round-trips the database and returns its version string.
    async fn server_version(&self) -> Result<String, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_maps_to_timeout() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Timeout(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Query(_)
        ));
    }

    #[test]
    fn test_query_error_keeps_signature() {
        let err = StoreError::Query("syntax error".into()).into_app_error("SELECT 1");
        match err {
            AppError::QueryExecution { signature, message } => {
                assert_eq!(signature, "SELECT 1");
                assert_eq!(message, "syntax error");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            StoreError::Timeout("t".into()).into_app_error("SELECT 1"),
            AppError::DatabaseConnection(_)
        ));
    }

    #[test]
    fn test_in_use_never_underflows() {
        let state = PoolState { size: 2, idle: 5 };
        assert_eq!(state.in_use(), 0);
    }
}
