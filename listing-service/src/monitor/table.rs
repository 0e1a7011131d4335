//! Table statistics: write volume, dead tuples and maintenance times.

use std::sync::Arc;

use chrono::Utc;

use common::models::{TableReport, TableStat};

use crate::store::{EngineStats, TableCounters};

pub struct TableAnalyzer {
    stats: Arc<dyn EngineStats>,
}

impl TableAnalyzer {
    pub fn new(stats: Arc<dyn EngineStats>) -> Self {
        Self { stats }
    }

    /// Reads the engine's table counters now. Unreadable statistics give an
    /// empty, degraded report.
    pub async fn report(&self) -> TableReport {
        let mut notes = Vec::new();
        let mut tables: Vec<TableStat> = match self.stats.table_counters().await {
            Ok(counters) => counters.into_iter().map(table_stat).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Table statistics unavailable");
                notes.push(format!("Table statistics unavailable: {}", e.0));
                Vec::new()
            }
        };
        tables.sort_by(|a, b| {
            b.live_tuples
                .cmp(&a.live_tuples)
                .then_with(|| a.table_name.cmp(&b.table_name))
        });

        TableReport {
            tables,
            degraded: !notes.is_empty(),
            notes,
            generated_at: Utc::now(),
        }
    }
}

fn table_stat(c: TableCounters) -> TableStat {
    TableStat {
        dead_tuple_ratio: dead_tuple_ratio(c.live_tuples, c.dead_tuples),
        table_name: c.table_name,
        inserts: c.inserts,
        updates: c.updates,
        deletes: c.deletes,
        live_tuples: c.live_tuples,
        dead_tuples: c.dead_tuples,
        last_vacuum: c.last_vacuum,
        last_autovacuum: c.last_autovacuum,
        last_analyze: c.last_analyze,
        last_autoanalyze: c.last_autoanalyze,
    }
}

/// Dead tuples per live tuple, counting an empty table as one live tuple.
fn dead_tuple_ratio(live: u64, dead: u64) -> f64 {
    if dead == 0 {
        0.0
    } else {
        dead as f64 / live.max(1) as f64
    }
}
