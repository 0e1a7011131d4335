//! Search orchestration: filter, plan, observed execution, page assembly.

use std::sync::Arc;

use async_trait::async_trait;

use common::errors::AppResult;
use common::models::{PropertySummary, SearchParams};
use common::response::PaginatedData;

use crate::monitor::QueryMonitor;
use crate::search::{FilterModel, PageLimits, Paginator, QueryBuilder};
use crate::store::ListingStore;

/// Endpoint label recorded on search metrics.
pub const SEARCH_ENDPOINT: &str = "GET /properties";

#[async_trait]
pub trait SearchServiceTrait: Send + Sync {
    /// Validates the raw parameters and returns one page of matching listings.
    async fn search(&self, params: &SearchParams) -> AppResult<PaginatedData<PropertySummary>>;
}

pub struct SearchService {
    store: Arc<dyn ListingStore>,
    monitor: Arc<QueryMonitor>,
    limits: PageLimits,
}

impl SearchService {
    pub fn new(
        store: Arc<dyn ListingStore>,
        monitor: Arc<QueryMonitor>,
        limits: PageLimits,
    ) -> Self {
        Self {
            store,
            monitor,
            limits,
        }
    }
}

#[async_trait]
impl SearchServiceTrait for SearchService {
    async fn search(&self, params: &SearchParams) -> AppResult<PaginatedData<PropertySummary>> {
        let filter = FilterModel::from_params(params, self.limits)?;
        let plan = QueryBuilder::build(&filter);
        let store = self.store.as_ref();

        let count_statement = plan.count.to_statement();
        let total = self
            .monitor
            .observe(
                SEARCH_ENDPOINT,
                &count_statement,
                store,
                store.count(&plan.count),
                |_| 1,
            )
            .await
            .map_err(|e| e.into_app_error(&count_statement.signature()))?;

        // Nothing can match past the last row; skip the page query.
        let items = if plan.page.offset >= 0 && (plan.page.offset as u64) < total {
            let page_statement = plan.page.to_statement();
            self.monitor
                .observe(
                    SEARCH_ENDPOINT,
                    &page_statement,
                    store,
                    store.fetch_page(&plan.page),
                    |items: &Vec<PropertySummary>| items.len() as u64,
                )
                .await
                .map_err(|e| e.into_app_error(&page_statement.signature()))?
        } else {
            Vec::new()
        };

        tracing::debug!(
            total,
            page = filter.page(),
            page_size = filter.page_size(),
            returned = items.len(),
            "Search completed"
        );

        Ok(Paginator::assemble(&filter, total, items))
    }
}
