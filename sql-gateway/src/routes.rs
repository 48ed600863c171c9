//! Admin HTTP routes.

use axum::{routing::get, Router};

use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/connections", get(handlers::list_connections))
        .route("/api/connections/{db_kind}", get(handlers::get_connection))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
    };
    use common::middleware::request_id_middleware;
    use common::config::AppConfig;
    use common::models::DbType;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::database::DatabasePool;

    async fn get_json(state: AppState, uri: &str) -> (StatusCode, serde_json::Value) {
        let res = router()
            .with_state(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_counts_connections() {
        let state = AppState::new(AppConfig::default());
        let (status, body) = get_json(state.clone(), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["connections"], 0);

        let pool = DatabasePool::connect(DbType::SQLite, ":memory:", &state.config)
            .await
            .unwrap();
        state.registry.register(DbType::SQLite, pool).await;
        let (_, body) = get_json(state, "/api/health").await;
        assert_eq!(body["connections"], 1);
    }

    #[tokio::test]
    async fn test_list_and_get_connection() {
        let state = AppState::new(AppConfig::default());
        let pool = DatabasePool::connect(DbType::SQLite, ":memory:", &state.config)
            .await
            .unwrap();
        state.registry.register(DbType::SQLite, pool).await;

        let (status, body) = get_json(state.clone(), "/api/connections").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["db_kind"], "sqlite3");

        let (status, body) = get_json(state, "/api/connections/sqlite3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pool"]["max_size"], 1);
    }

    #[tokio::test]
    async fn test_get_connection_errors() {
        let state = AppState::new(AppConfig::default());

        let (status, body) = get_json(state.clone(), "/api/connections/mysql").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NO_CONNECTION");

        let (status, body) = get_json(state, "/api/connections/oracle").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "UNSUPPORTED_DATABASE_TYPE");
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let state = AppState::new(AppConfig::default());
        let res = router()
            .layer(middleware::from_fn(request_id_middleware))
            .with_state(state)
            .oneshot(
                Request::builder()
                    .uri("/api/connections")
                    .header("x-request-id", "admin-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["meta"]["request_id"], "admin-42");
    }
}
