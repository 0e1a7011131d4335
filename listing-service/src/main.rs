//! Property listing search service
//!
//! Serves paginated listing searches and the operator monitoring endpoints:
//! - filtered, sorted, paginated search over active listings
//! - per-query timing with slow-query detection
//! - index usage advice and connection pool health

mod handlers;
mod monitor;
mod routes;
mod search;
mod service;
mod state;
mod store;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::config::{AppConfig, LogFormat};
use state::AppState;
use store::PgListingStore;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "listing-service";

/// How often expired query metrics are pruned.
const METRIC_PRUNE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Listing Service API",
        version = "0.1.0",
        description = "Property search with query performance monitoring"
    ),
    paths(
        handlers::search_properties,
        handlers::health_check,
        handlers::monitoring_health,
        handlers::database_metrics,
        handlers::query_performance,
        handlers::performance_summary,
    ),
    components(schemas(
        common::models::PropertySummary,
        common::models::PropertyType,
        common::models::QueryMetric,
        common::models::QueryOutcome,
        common::models::PlanDiagnostics,
        common::models::QueryPerformanceSummary,
        common::models::EndpointSummary,
        common::models::IndexReport,
        common::models::IndexFinding,
        common::models::IndexStat,
        common::models::TableReport,
        common::models::TableStat,
        common::models::PoolSnapshot,
        common::models::DatabaseMetrics,
        common::models::PerformanceSummary,
        common::models::SystemHealth,
        common::models::LivenessReport,
        common::models::DatabaseLiveness,
        common::errors::FieldError,
        common::response::Pagination,
        handlers::HealthResponse,
    )),
    tags(
        (name = "properties", description = "Listing search"),
        (name = "monitoring", description = "Operator endpoints (admin role)"),
        (name = "health", description = "Health check endpoints")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_with_service(SERVICE_NAME);
    init_tracing(config.log_format);
    config.log_warnings();

    let store = PgListingStore::connect(&config)
        .await
        .context("Failed to connect to the listing database (check DATABASE_URL)")?;
    info!(
        pool_size = config.pool_base_size,
        max_overflow = config.pool_max_overflow,
        slow_query_threshold_ms = config.slow_query_threshold_ms,
        "Database pool ready"
    );

    let state = AppState::new(config.clone(), Arc::new(store));
    let _pruner = state.query_monitor.spawn_pruner(METRIC_PRUNE_INTERVAL);

    let app = routes::create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!(service = SERVICE_NAME, address = %addr, "Starting service");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Text => registry.with(fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, starting graceful shutdown");
}
