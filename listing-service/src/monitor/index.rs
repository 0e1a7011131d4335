//! Index Advisor: cross-references declared indexes with usage counters.
//!
//! Advisory only. The report is a snapshot: a zero scan count on a freshly
//! created index, or after a statistics reset, is not evidence that the
//! index is useless.

use std::sync::Arc;

use chrono::Utc;

use common::models::{DeclaredIndex, IndexFinding, IndexReport, IndexStat};

use crate::search::{ACCESS_COLUMNS, LISTING_TABLE};
use crate::store::EngineStats;

/// Tables the advisor inspects.
const ADVISED_TABLES: [&str; 2] = [LISTING_TABLE, "property_images"];

pub struct IndexAdvisor {
    stats: Arc<dyn EngineStats>,
}

impl IndexAdvisor {
    pub fn new(stats: Arc<dyn EngineStats>) -> Self {
        Self { stats }
    }

    /// Builds a fresh report. Missing statistics degrade the report instead of failing it.
    pub async fn report(&self) -> IndexReport {
        let mut notes = Vec::new();

        let declared = match self.stats.declared_indexes(&ADVISED_TABLES).await {
            Ok(declared) => Some(declared),
            Err(e) => {
                tracing::warn!(error = %e, "Index catalog unavailable");
                notes.push(format!("Declared indexes unavailable: {}", e.0));
                None
            }
        };
        let usage = match self.stats.index_usage(&ADVISED_TABLES).await {
            Ok(usage) => Some(usage),
            Err(e) => {
                tracing::warn!(error = %e, "Index usage statistics unavailable");
                notes.push(format!("Index usage statistics unavailable: {}", e.0));
                None
            }
        };

        let mut findings = Vec::new();
        if let Some(declared) = &declared {
            findings.extend(missing_indexes(declared));
        }
        if let Some(usage) = &usage {
            findings.extend(unused_indexes(usage, declared.as_deref().unwrap_or_default()));
        }

        let total_indexes = match (&declared, &usage) {
            (Some(declared), _) => declared.len(),
            (None, Some(usage)) => usage.len(),
            (None, None) => 0,
        };

        let mut index_stats = usage.unwrap_or_default();
        index_stats.sort_by(|a, b| {
            b.scan_count
                .cmp(&a.scan_count)
                .then_with(|| a.index_name.cmp(&b.index_name))
        });

        IndexReport {
            findings,
            total_indexes,
            index_stats,
            degraded: !notes.is_empty(),
            notes,
            generated_at: Utc::now(),
        }
    }
}

/// Filtered or sorted columns with no index on the listing table leading on them.
fn missing_indexes(declared: &[DeclaredIndex]) -> Vec<IndexFinding> {
    ACCESS_COLUMNS
        .iter()
        .map(|c| c.name())
        .filter(|column| {
            !declared.iter().any(|index| {
                index.table_name == LISTING_TABLE
                    && index.columns.first().map(String::as_str) == Some(*column)
            })
        })
        .map(|column| IndexFinding::MissingIndex {
            table_name: LISTING_TABLE.to_string(),
            column: column.to_string(),
            message: format!(
                "Searches filter or sort on {}.{} but no index leads with it; consider CREATE INDEX ON {} ({})",
                LISTING_TABLE, column, LISTING_TABLE, column
            ),
        })
        .collect()
}

/// Indexes with zero scans, never counting primary keys.
fn unused_indexes(usage: &[IndexStat], declared: &[DeclaredIndex]) -> Vec<IndexFinding> {
    let is_primary = |stat: &IndexStat| {
        stat.index_name.ends_with("_pkey")
            || declared
                .iter()
                .any(|d| d.index_name == stat.index_name && d.is_primary)
    };

    let mut unused: Vec<&IndexStat> = usage
        .iter()
        .filter(|s| s.scan_count == 0 && !is_primary(*s))
        .collect();
    unused.sort_by(|a, b| {
        a.table_name
            .cmp(&b.table_name)
            .then_with(|| a.index_name.cmp(&b.index_name))
    });

    unused
        .into_iter()
        .map(|s| IndexFinding::UnusedIndex {
            table_name: s.table_name.clone(),
            index_name: s.index_name.clone(),
            message: format!(
                "Index {} has not been scanned since statistics were last reset; review before dropping",
                s.index_name
            ),
        })
        .collect()
}
