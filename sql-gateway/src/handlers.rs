//! Admin HTTP handlers.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::AppError;
use common::middleware::RequestId;
use common::models::{ConnectionItem, DbType};
use common::response::ApiResponse;
use crate::state::AppState;

/// Lists registered connections
#[utoipa::path(
    get,
    path = "/api/connections",
    tag = "connections",
    responses(
        (status = 200, description = "Registered connections", body = ApiResponse<Vec<ConnectionItem>>)
    )
)]
pub async fn list_connections(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
) -> Json<ApiResponse<Vec<ConnectionItem>>> {
    let data = state.registry.list().await;
    Json(
        ApiResponse::ok_with_service(data, state.config.service_name.clone())
            .with_request_id(request_id.map(|Extension(id)| id.0)),
    )
}

/// Gets the registered connection of one database kind
#[utoipa::path(
    get,
    path = "/api/connections/{db_kind}",
    tag = "connections",
    params(
        ("db_kind" = String, Path, description = "Database kind, e.g. sqlite3")
    ),
    responses(
        (status = 200, description = "Connection details", body = ApiResponse<ConnectionItem>),
        (status = 400, description = "Unsupported database kind"),
        (status = 404, description = "No connection registered")
    )
)]
pub async fn get_connection(
    State(state): State<AppState>,
    Path(db_kind): Path<String>,
    request_id: Option<Extension<RequestId>>,
) -> Result<Json<ApiResponse<ConnectionItem>>, AppError> {
    let db_type: DbType = db_kind.parse()?;
    let data = state.registry.item(db_type).await?;
    Ok(Json(
        ApiResponse::ok_with_service(data, state.config.service_name.clone())
            .with_request_id(request_id.map(|Extension(id)| id.0)),
    ))
}

/// Health check
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
        connections: state.registry.len().await,
    })
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub connections: usize,
}
