//! In-memory store for tests. Evaluates plans the way the SQL lowering does.

use std::cmp::Ordering;
use std::time::Duration;

use async_trait::async_trait;

use common::errors::DiagnosticsUnavailable;
use common::models::{DeclaredIndex, IndexStat, PlanDiagnostics, PropertySummary, SortOrder};

use super::{CacheCounters, EngineStats, ListingStore, PoolState, StoreError, TableCounters};
use crate::search::query_builder::{
    BindValue, Column, CountPlan, Predicate, QueryPlan, Statement,
};

#[derive(Default)]
pub struct MemoryStore {
    pub rows: Vec<PropertySummary>,
    /// Added to every page and count execution.
    pub delay: Option<Duration>,
    pub fail_with: Option<StoreError>,
    /// `None` makes `explain` unavailable.
    pub plan: Option<PlanDiagnostics>,
    /// Added to every `explain` call.
    pub explain_delay: Option<Duration>,
    /// `None` makes index introspection unavailable.
    pub indexes: Option<Vec<DeclaredIndex>>,
    pub usage: Option<Vec<IndexStat>>,
    pub cache: Option<CacheCounters>,
    pub tables: Option<Vec<TableCounters>>,
    pub pool: PoolState,
    pub version: Option<String>,
}

impl MemoryStore {
    pub fn with_rows(rows: Vec<PropertySummary>) -> Self {
        Self {
            rows,
            version: Some("PostgreSQL 16.2 (memory)".into()),
            ..Default::default()
        }
    }

    async fn execute(&self) -> Result<(), StoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn matching(&self, predicates: &[Predicate]) -> Vec<&PropertySummary> {
        self.rows
            .iter()
            .filter(|row| predicates.iter().all(|p| matches(row, p)))
            .collect()
    }
}

fn value_of(row: &PropertySummary, column: Column) -> Option<BindValue> {
    match column {
        Column::Location => Some(BindValue::Text(row.location.clone())),
        Column::Price => Some(BindValue::Decimal(row.price)),
        Column::Bedrooms => Some(BindValue::Int(row.bedrooms)),
        Column::AreaSqft => Some(BindValue::Int(row.area_sqft)),
        Column::PropertyType => Some(BindValue::Text(row.property_type.as_db_str().to_string())),
        Column::IsActive => Some(BindValue::Bool(row.is_active)),
        Column::CreatedAt | Column::Id => None,
    }
}

fn compare(a: &BindValue, b: &BindValue) -> Option<Ordering> {
    match (a, b) {
        (BindValue::Text(a), BindValue::Text(b)) => Some(a.cmp(b)),
        (BindValue::Decimal(a), BindValue::Decimal(b)) => Some(a.cmp(b)),
        (BindValue::Int(a), BindValue::Int(b)) => Some(a.cmp(b)),
        (BindValue::BigInt(a), BindValue::BigInt(b)) => Some(a.cmp(b)),
        (BindValue::Bool(a), BindValue::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn matches(row: &PropertySummary, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Equals { column, value } => value_of(row, *column)
            .and_then(|v| compare(&v, value))
            .is_some_and(|o| o == Ordering::Equal),
        Predicate::Range { column, min, max } => {
            let Some(v) = value_of(row, *column) else {
                return false;
            };
            let above = min
                .as_ref()
                .map_or(true, |m| compare(&v, m).is_some_and(|o| o != Ordering::Less));
            let below = max
                .as_ref()
                .map_or(true, |m| compare(&v, m).is_some_and(|o| o != Ordering::Greater));
            above && below
        }
        Predicate::In { column, values } => value_of(row, *column).is_some_and(|v| {
            values
                .iter()
                .any(|candidate| compare(&v, candidate) == Some(Ordering::Equal))
        }),
        Predicate::Contains { column, needle } => match value_of(row, *column) {
            Some(BindValue::Text(text)) => text.to_lowercase().contains(&needle.to_lowercase()),
            _ => false,
        },
    }
}

fn order_by(a: &PropertySummary, b: &PropertySummary, column: Column) -> Ordering {
    match column {
        Column::CreatedAt => a.created_at.cmp(&b.created_at),
        Column::Id => a.id.cmp(&b.id),
        other => match (value_of(a, other), value_of(b, other)) {
            (Some(x), Some(y)) => compare(&x, &y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn fetch_page(&self, plan: &QueryPlan) -> Result<Vec<PropertySummary>, StoreError> {
        self.execute().await?;
        let mut rows = self.matching(&plan.predicates);
        rows.sort_by(|a, b| {
            plan.sort.iter().fold(Ordering::Equal, |acc, key| {
                acc.then_with(|| {
                    let o = order_by(a, b, key.column);
                    match key.order {
                        SortOrder::Asc => o,
                        SortOrder::Desc => o.reverse(),
                    }
                })
            })
        });
        Ok(rows
            .into_iter()
            .skip(plan.offset.max(0) as usize)
            .take(plan.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, plan: &CountPlan) -> Result<u64, StoreError> {
        self.execute().await?;
        Ok(self.matching(&plan.predicates).len() as u64)
    }

    async fn explain(
        &self,
        _statement: &Statement,
    ) -> Result<PlanDiagnostics, DiagnosticsUnavailable> {
        if let Some(delay) = self.explain_delay {
            tokio::time::sleep(delay).await;
        }
        self.plan
            .clone()
            .ok_or_else(|| DiagnosticsUnavailable("explain not supported".into()))
    }
}

#[async_trait]
impl EngineStats for MemoryStore {
    async fn declared_indexes(
        &self,
        tables: &[&str],
    ) -> Result<Vec<DeclaredIndex>, DiagnosticsUnavailable> {
        let indexes = self
            .indexes
            .as_ref()
            .ok_or_else(|| DiagnosticsUnavailable("catalog not readable".into()))?;
        Ok(indexes
            .iter()
            .filter(|i| tables.contains(&i.table_name.as_str()))
            .cloned()
            .collect())
    }

    async fn index_usage(&self, tables: &[&str]) -> Result<Vec<IndexStat>, DiagnosticsUnavailable> {
        let usage = self
            .usage
            .as_ref()
            .ok_or_else(|| DiagnosticsUnavailable("statistics views not readable".into()))?;
        Ok(usage
            .iter()
            .filter(|s| tables.contains(&s.table_name.as_str()))
            .cloned()
            .collect())
    }

    async fn cache_counters(&self) -> Result<CacheCounters, DiagnosticsUnavailable> {
        self.cache
            .ok_or_else(|| DiagnosticsUnavailable("cache counters not readable".into()))
    }

    async fn table_counters(&self) -> Result<Vec<TableCounters>, DiagnosticsUnavailable> {
        self.tables
            .clone()
            .ok_or_else(|| DiagnosticsUnavailable("table statistics not readable".into()))
    }

    fn pool_state(&self) -> PoolState {
        self.pool
    }

    async fn server_version(&self) -> Result<String, StoreError> {
        self.version
            .clone()
            .ok_or_else(|| StoreError::Connection("connection refused".into()))
    }
}

/// Test fixtures shared across modules.
pub mod fixtures {
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use common::models::{PropertySummary, PropertyType};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    /// `n` active rentals in Dubai, one minute apart, prices 1000, 1100, ...
    pub fn listings(n: usize) -> Vec<PropertySummary> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| PropertySummary {
                id: Uuid::from_u128(i as u128 + 1),
                title: format!("Listing {}", i + 1),
                property_type: PropertyType::Rental,
                price: Decimal::new(1000 + 100 * i as i64, 0),
                bedrooms: (i % 4) as i32,
                bathrooms: 1,
                area_sqft: 500 + 50 * i as i32,
                location: "Dubai Marina".into(),
                is_active: true,
                created_at: base + ChronoDuration::minutes(i as i64),
                primary_image_url: None,
            })
            .collect()
    }
}
