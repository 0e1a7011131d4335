//! Routing module

use axum::{middleware, routing::get, Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use common::middleware::{auth_middleware, request_id_middleware};

use crate::handlers;
use crate::state::AppState;
use crate::ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/properties", get(handlers::search_properties))
        .route("/api/health", get(handlers::health_check))
        .route("/monitoring/health", get(handlers::monitoring_health))
        .route("/monitoring/database", get(handlers::database_metrics))
        .route("/monitoring/query-performance", get(handlers::query_performance))
        .route(
            "/monitoring/performance-summary",
            get(handlers::performance_summary),
        )
}

/// Full application: routes, principal resolution, request ids, tracing and CORS.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn_with_state(
            state.resolver.clone(),
            auth_middleware,
        ))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::store::memory::{fixtures, MemoryStore};
    use crate::store::{CacheCounters, PoolState};
    use common::config::AppConfig;

    const ADMIN: &str = "admin-token";
    const AGENT: &str = "agent-token";

    fn app() -> Router {
        let config = AppConfig::from_lookup("listing-service", |key| match key {
            "API_TOKENS" => Some(format!("{}:ops:admin,{}:alice:agent", ADMIN, AGENT)),
            _ => None,
        });
        let store = MemoryStore {
            pool: PoolState { size: 4, idle: 2 },
            cache: Some(CacheCounters {
                hits: 990,
                reads: 10,
            }),
            indexes: Some(Vec::new()),
            usage: Some(Vec::new()),
            ..MemoryStore::with_rows(fixtures::listings(25))
        };
        create_router(AppState::new(config, Arc::new(store)))
    }

    async fn call(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let response = app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_second_page_of_twenty_five() {
        let app = app();
        let (status, body) = call(&app, "/properties?page=2&page_size=10", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 10);
        assert_eq!(body["total"], 25);
        assert_eq!(body["page"], 2);
        assert_eq!(body["page_size"], 10);
        assert_eq!(body["total_pages"], 3);
        assert_eq!(body["has_next"], true);
        assert_eq!(body["has_prev"], true);
    }

    #[tokio::test]
    async fn test_inverted_price_range_is_rejected_with_field_detail() {
        let (status, body) = call(&app(), "/properties?min_price=5000&max_price=1000", None).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"][0]["field"], "price");
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[tokio::test]
    async fn test_public_health_needs_no_token() {
        let (status, body) = call(&app(), "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "listing-service");
    }

    #[tokio::test]
    async fn test_monitoring_requires_admin() {
        let app = app();
        for uri in [
            "/monitoring/health",
            "/monitoring/database",
            "/monitoring/query-performance",
            "/monitoring/performance-summary",
        ] {
            let (status, body) = call(&app, uri, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
            assert_eq!(body["error"]["code"], "UNAUTHORIZED");

            let (status, body) = call(&app, uri, Some(AGENT)).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
            assert_eq!(body["error"]["code"], "FORBIDDEN");

            let (status, _) = call(&app, uri, Some("unknown")).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_query_performance_reflects_searches() {
        let app = app();
        call(&app, "/properties", None).await;
        call(&app, "/properties?page=9", None).await;

        let (status, body) = call(
            &app,
            "/monitoring/query-performance?endpoint=GET%20/properties",
            Some(ADMIN),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        // Two counts and one page query; page 9 is past the end.
        assert_eq!(body["total_queries"], 3);
        assert_eq!(body["slow_queries"], 0);
        assert_eq!(body["by_endpoint"][0]["endpoint"], "GET /properties");

        let (_, other) = call(
            &app,
            "/monitoring/query-performance?endpoint=GET%20/elsewhere",
            Some(ADMIN),
        )
        .await;
        assert_eq!(other["total_queries"], 0);
    }

    #[tokio::test]
    async fn test_database_metrics_flatten_pool_fields() {
        let (status, body) = call(&app(), "/monitoring/database", Some(ADMIN)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active_connections"], 2);
        assert_eq!(body["max_capacity"], 30);
        assert_eq!(body["cache_hit_ratio"], 99.0);
        assert!(body["index_usage"]["findings"].is_array());
        assert!(body["table_statistics"]["tables"].is_array());
    }

    #[tokio::test]
    async fn test_performance_summary_and_liveness() {
        let app = app();
        let (status, body) = call(&app, "/monitoring/performance-summary", Some(ADMIN)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["system_health"], "healthy");
        assert!(body["recommendations"].is_array());

        let (status, body) = call(&app, "/monitoring/health", Some(ADMIN)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"]["connected"], true);
    }

    #[tokio::test]
    async fn test_openapi_document_lists_search() {
        let (status, body) = call(&app(), "/api-docs/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/properties"].is_object());
    }
}
