//! Connection Pool Monitor.

use std::sync::Arc;

use chrono::Utc;

use common::config::AppConfig;
use common::models::PoolSnapshot;

use crate::store::{CacheCounters, EngineStats, PoolState};

pub struct PoolMonitor {
    stats: Arc<dyn EngineStats>,
    base_size: u32,
    max_overflow: u32,
}

impl PoolMonitor {
    pub fn new(stats: Arc<dyn EngineStats>, base_size: u32, max_overflow: u32) -> Self {
        Self {
            stats,
            base_size,
            max_overflow,
        }
    }

    pub fn from_config(stats: Arc<dyn EngineStats>, config: &AppConfig) -> Self {
        Self::new(stats, config.pool_base_size, config.pool_max_overflow)
    }

    /// Samples the pool and cache counters now. Never touches the pool itself.
    pub async fn snapshot(&self) -> PoolSnapshot {
        let state = self.stats.pool_state();
        let cache = match self.stats.cache_counters().await {
            Ok(counters) => Some(counters),
            Err(e) => {
                tracing::warn!(error = %e, "Cache counters unavailable");
                None
            }
        };
        compute(state, cache, self.base_size, self.max_overflow)
    }
}

fn compute(
    state: PoolState,
    cache: Option<CacheCounters>,
    base_size: u32,
    max_overflow: u32,
) -> PoolSnapshot {
    let max_capacity = base_size.saturating_add(max_overflow);
    let in_use = state.in_use();
    let utilization_pct = if max_capacity == 0 {
        0.0
    } else {
        (f64::from(in_use) / f64::from(max_capacity) * 100.0).clamp(0.0, 100.0)
    };

    PoolSnapshot {
        active_connections: in_use,
        idle_connections: state.idle.min(state.size),
        overflow_connections: state.size.saturating_sub(base_size),
        pool_size: base_size,
        max_capacity,
        utilization_pct,
        cache_hit_ratio: cache.map(hit_ratio).unwrap_or(0.0),
        cache_stats_available: cache.is_some(),
        sampled_at: Utc::now(),
    }
}

/// Share of block reads served from cache. A database that has read nothing
/// yet has missed nothing.
fn hit_ratio(counters: CacheCounters) -> f64 {
    let total = counters.hits.saturating_add(counters.reads);
    if total == 0 {
        100.0
    } else {
        counters.hits as f64 / total as f64 * 100.0
    }
}
