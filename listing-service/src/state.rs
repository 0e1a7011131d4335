//! Application state for the listing service.

use std::sync::Arc;

use common::config::AppConfig;
use common::middleware::auth::StaticTokenResolver;
use common::middleware::PrincipalResolver;

use crate::monitor::{IndexAdvisor, MonitoringFacade, PoolMonitor, QueryMonitor, TableAnalyzer};
use crate::search::PageLimits;
use crate::service::SearchService;
use crate::store::{EngineStats, ListingStore};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn ListingStore>,
    pub query_monitor: Arc<QueryMonitor>,
    pub monitoring: Arc<MonitoringFacade>,
    pub resolver: Arc<dyn PrincipalResolver>,
}

impl AppState {
    /// Wires the monitors around one storage engine.
    pub fn new<S>(config: AppConfig, store: Arc<S>) -> Self
    where
        S: ListingStore + EngineStats + 'static,
    {
        let stats: Arc<dyn EngineStats> = store.clone();
        let query_monitor = Arc::new(QueryMonitor::from_config(&config));
        let monitoring = MonitoringFacade::new(
            query_monitor.clone(),
            IndexAdvisor::new(stats.clone()),
            TableAnalyzer::new(stats.clone()),
            PoolMonitor::from_config(stats.clone(), &config),
            stats,
        );

        Self {
            resolver: Arc::new(StaticTokenResolver::from_entries(&config.api_tokens)),
            store,
            query_monitor,
            monitoring: Arc::new(monitoring),
            config,
        }
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_page_size: self.config.default_page_size,
            max_page_size: self.config.max_page_size,
        }
    }

    pub fn search_service(&self) -> SearchService {
        SearchService::new(
            self.store.clone(),
            self.query_monitor.clone(),
            self.page_limits(),
        )
    }
}
