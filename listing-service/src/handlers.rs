//! Handler module

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use common::errors::AppError;
use common::middleware::{Authenticated, Role};
use common::models::{
    DatabaseMetrics, LivenessReport, PerformanceSummary, PropertySummary, QueryPerformanceSummary,
    SearchParams,
};
use common::response::PaginatedData;

use crate::service::SearchServiceTrait;
use crate::state::AppState;

/// Search active listings
#[utoipa::path(
    get,
    path = "/properties",
    tag = "properties",
    params(SearchParams),
    responses(
        (status = 200, description = "One page of matching listings", body = PaginatedData<PropertySummary>),
        (status = 422, description = "Invalid filter or pagination parameters"),
        (status = 500, description = "Query execution failed")
    )
)]
pub async fn search_properties(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<PaginatedData<PropertySummary>>, AppError> {
    let page = state.search_service().search(&params).await?;
    Ok(Json(page))
}

/// Process liveness
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// Database connectivity and server version
#[utoipa::path(
    get,
    path = "/monitoring/health",
    tag = "monitoring",
    responses(
        (status = 200, description = "Database reachable", body = LivenessReport),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required"),
        (status = 503, description = "Database unreachable", body = LivenessReport)
    )
)]
pub async fn monitoring_health(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<(StatusCode, Json<LivenessReport>), AppError> {
    principal.require_role(Role::Admin)?;

    let report = state.monitoring.liveness().await;
    let status = if report.database.connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok((status, Json(report)))
}

/// Connection pool snapshot, index usage and table statistics
#[utoipa::path(
    get,
    path = "/monitoring/database",
    tag = "monitoring",
    responses(
        (status = 200, description = "Pool snapshot with index and table statistics", body = DatabaseMetrics),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn database_metrics(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<DatabaseMetrics>, AppError> {
    principal.require_role(Role::Admin)?;
    Ok(Json(state.monitoring.database_metrics().await))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QueryPerformanceParams {
    /// Restrict the summary to one endpoint label, e.g. `GET /properties`.
    pub endpoint: Option<String>,
}

/// Query timing summary
#[utoipa::path(
    get,
    path = "/monitoring/query-performance",
    tag = "monitoring",
    params(QueryPerformanceParams),
    responses(
        (status = 200, description = "Aggregated query metrics", body = QueryPerformanceSummary),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn query_performance(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Query(params): Query<QueryPerformanceParams>,
) -> Result<Json<QueryPerformanceSummary>, AppError> {
    principal.require_role(Role::Admin)?;
    let endpoint = params.endpoint.as_deref().filter(|e| !e.trim().is_empty());
    Ok(Json(state.monitoring.query_performance(endpoint)))
}

/// Combined performance summary with health classification
#[utoipa::path(
    get,
    path = "/monitoring/performance-summary",
    tag = "monitoring",
    responses(
        (status = 200, description = "System health and recommendations", body = PerformanceSummary),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn performance_summary(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<PerformanceSummary>, AppError> {
    principal.require_role(Role::Admin)?;
    Ok(Json(state.monitoring.performance_summary().await))
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}
