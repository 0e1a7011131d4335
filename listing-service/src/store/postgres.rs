//! PostgreSQL implementation of the storage seam.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use uuid::Uuid;

use common::config::AppConfig;
use common::errors::DiagnosticsUnavailable;
use common::models::{DeclaredIndex, IndexStat, PlanDiagnostics, PropertySummary, PropertyType};

use super::{CacheCounters, EngineStats, ListingStore, PoolState, StoreError, TableCounters};
use crate::search::{BindValue, CountPlan, QueryPlan, Statement};

/// Listing store backed by a `PgPool`.
#[derive(Clone)]
pub struct PgListingStore {
    pool: PgPool,
}

impl PgListingStore {
    /// Opens a pool sized to the configured base size plus overflow.
    pub async fn connect(config: &AppConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_capacity())
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self { pool })
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    binds: &'q [BindValue],
) -> Query<'q, Postgres, PgArguments> {
    for value in binds {
        query = match value {
            BindValue::Text(v) => query.bind(v.as_str()),
            BindValue::Decimal(v) => query.bind(*v),
            BindValue::Int(v) => query.bind(*v),
            BindValue::BigInt(v) => query.bind(*v),
            BindValue::Bool(v) => query.bind(*v),
        };
    }
    query
}

fn summary_from_row(row: &PgRow) -> Result<PropertySummary, StoreError> {
    let property_type: String = row.try_get("property_type")?;
    let property_type = property_type
        .parse::<PropertyType>()
        .map_err(StoreError::Query)?;

    Ok(PropertySummary {
        id: row.try_get::<Uuid, _>("id")?,
        title: row.try_get("title")?,
        property_type,
        price: row.try_get::<Decimal, _>("price")?,
        bedrooms: row.try_get("bedrooms")?,
        bathrooms: row.try_get("bathrooms")?,
        area_sqft: row.try_get("area_sqft")?,
        location: row.try_get("location")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        primary_image_url: row.try_get("primary_image_url")?,
    })
}

/// Reads the root of an `EXPLAIN (FORMAT JSON)` document.
pub(crate) fn plan_from_json(doc: &JsonValue) -> Result<PlanDiagnostics, DiagnosticsUnavailable> {
    let root = doc
        .get(0)
        .and_then(|entry| entry.get("Plan"))
        .ok_or_else(|| DiagnosticsUnavailable("plan document has no root node".into()))?;

    let root_node = root
        .get("Node Type")
        .and_then(JsonValue::as_str)
        .unwrap_or("Unknown")
        .to_string();

    Ok(PlanDiagnostics {
        root_node,
        estimated_cost: root.get("Total Cost").and_then(JsonValue::as_f64).unwrap_or(0.0),
        estimated_rows: root.get("Plan Rows").and_then(JsonValue::as_f64).unwrap_or(0.0),
        uses_index: reads_index(root),
    })
}

fn reads_index(node: &JsonValue) -> bool {
    let here = node
        .get("Node Type")
        .and_then(JsonValue::as_str)
        .is_some_and(|t| t.contains("Index"));
    here || node
        .get("Plans")
        .and_then(JsonValue::as_array)
        .is_some_and(|children| children.iter().any(reads_index))
}

fn table_list(tables: &[&str]) -> Vec<String> {
    tables.iter().map(|t| t.to_string()).collect()
}

#[async_trait]
impl ListingStore for PgListingStore {
    async fn fetch_page(&self, plan: &QueryPlan) -> Result<Vec<PropertySummary>, StoreError> {
        let statement = plan.to_statement();
        let rows = bind_all(sqlx::query(&statement.sql), &statement.binds)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(summary_from_row).collect()
    }

    async fn count(&self, plan: &CountPlan) -> Result<u64, StoreError> {
        let statement = plan.to_statement();
        let row = bind_all(sqlx::query(&statement.sql), &statement.binds)
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = row.try_get(0)?;
        Ok(total.max(0) as u64)
    }

    async fn explain(
        &self,
        statement: &Statement,
    ) -> Result<PlanDiagnostics, DiagnosticsUnavailable> {
        let sql = format!("EXPLAIN (FORMAT JSON) {}", statement.sql);
        let row = bind_all(sqlx::query(&sql), &statement.binds)
            .fetch_one(&self.pool)
            .await?;
        let doc: JsonValue = row.try_get(0)?;
        plan_from_json(&doc)
    }
}

#[async_trait]
impl EngineStats for PgListingStore {
    async fn declared_indexes(
        &self,
        tables: &[&str],
    ) -> Result<Vec<DeclaredIndex>, DiagnosticsUnavailable> {
        let rows = sqlx::query(
            "SELECT i.relname::text AS index_name,
                    t.relname::text AS table_name,
                    ix.indisprimary AS is_primary,
                    array_agg(a.attname::text ORDER BY k.ord) AS columns
             FROM pg_index ix
             JOIN pg_class i ON i.oid = ix.indexrelid
             JOIN pg_class t ON t.oid = ix.indrelid
             JOIN pg_namespace n ON n.oid = t.relnamespace
             CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
             JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
             WHERE n.nspname = current_schema() AND t.relname = ANY($1)
             GROUP BY i.relname, t.relname, ix.indisprimary
             ORDER BY t.relname, i.relname",
        )
        .bind(table_list(tables))
        .fetch_all(&self.pool)
        .await?;

        let mut indexes = Vec::with_capacity(rows.len());
        for row in &rows {
            indexes.push(DeclaredIndex {
                index_name: row.try_get("index_name")?,
                table_name: row.try_get("table_name")?,
                columns: row.try_get("columns")?,
                is_primary: row.try_get("is_primary")?,
            });
        }
        Ok(indexes)
    }

    async fn index_usage(&self, tables: &[&str]) -> Result<Vec<IndexStat>, DiagnosticsUnavailable> {
        // last_idx_scan only exists on newer servers; reading it through
        // to_jsonb yields NULL elsewhere instead of failing.
        let rows = sqlx::query(
            "SELECT s.indexrelname::text AS index_name,
                    s.relname::text AS table_name,
                    s.idx_scan AS scan_count,
                    (to_jsonb(s) ->> 'last_idx_scan')::timestamptz AS last_used
             FROM pg_stat_user_indexes s
             WHERE s.relname = ANY($1)
             ORDER BY s.idx_scan DESC, s.indexrelname",
        )
        .bind(table_list(tables))
        .fetch_all(&self.pool)
        .await?;

        let mut stats = Vec::with_capacity(rows.len());
        for row in &rows {
            stats.push(IndexStat {
                index_name: row.try_get("index_name")?,
                table_name: row.try_get("table_name")?,
                scan_count: row.try_get::<i64, _>("scan_count")?.max(0) as u64,
                last_used: row.try_get("last_used")?,
            });
        }
        Ok(stats)
    }

    async fn cache_counters(&self) -> Result<CacheCounters, DiagnosticsUnavailable> {
        let row = sqlx::query(
            "SELECT COALESCE(blks_hit, 0)::bigint AS hits,
                    COALESCE(blks_read, 0)::bigint AS reads
             FROM pg_stat_database
             WHERE datname = current_database()",
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DiagnosticsUnavailable("no statistics row for current database".into()))?;

        Ok(CacheCounters {
            hits: row.try_get::<i64, _>("hits")?.max(0) as u64,
            reads: row.try_get::<i64, _>("reads")?.max(0) as u64,
        })
    }

    async fn table_counters(&self) -> Result<Vec<TableCounters>, DiagnosticsUnavailable> {
        let rows = sqlx::query(
            "SELECT relname::text AS table_name,
                    n_tup_ins AS inserts,
                    n_tup_upd AS updates,
                    n_tup_del AS deletes,
                    n_live_tup AS live_tuples,
                    n_dead_tup AS dead_tuples,
                    last_vacuum,
                    last_autovacuum,
                    last_analyze,
                    last_autoanalyze
             FROM pg_stat_user_tables
             WHERE schemaname = current_schema()
             ORDER BY n_live_tup DESC, relname",
        )
        .fetch_all(&self.pool)
        .await?;

        let count = |row: &PgRow, column: &str| -> Result<u64, sqlx::Error> {
            Ok(row.try_get::<Option<i64>, _>(column)?.unwrap_or(0).max(0) as u64)
        };
        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            tables.push(TableCounters {
                table_name: row.try_get("table_name")?,
                inserts: count(row, "inserts")?,
                updates: count(row, "updates")?,
                deletes: count(row, "deletes")?,
                live_tuples: count(row, "live_tuples")?,
                dead_tuples: count(row, "dead_tuples")?,
                last_vacuum: row.try_get("last_vacuum")?,
                last_autovacuum: row.try_get("last_autovacuum")?,
                last_analyze: row.try_get("last_analyze")?,
                last_autoanalyze: row.try_get("last_autoanalyze")?,
            });
        }
        Ok(tables)
    }

    fn pool_state(&self) -> PoolState {
        PoolState {
            size: self.pool.size(),
            idle: self.pool.num_idle() as u32,
        }
    }

    async fn server_version(&self) -> Result<String, StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        let row = sqlx::query("SELECT version()").fetch_one(&self.pool).await?;
        Ok(row.try_get(0)?)
    }
}
