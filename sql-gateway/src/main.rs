//! SQL 网关服务
//!
//! Accepts line-protocol requests over TCP and runs them against named
//! database connections:
//! - `connection`: open and register a handle for a database kind
//! - `exec`: run a statement
//! - `query`: run a query and return its rows as JSON
//!
//! An optional admin HTTP surface reports health and registered connections.

mod database;
mod dispatcher;
mod handlers;
mod registry;
mod routes;
mod server;
mod service;
mod session;
mod state;

use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use common::config::AppConfig;
use common::middleware::request_id::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "sql-gateway";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SQL 网关管理 API",
        version = "0.1.0",
        description = "SQL 网关的健康检查与连接查看"
    ),
    paths(
        handlers::list_connections,
        handlers::get_connection,
        handlers::health_check,
    ),
    components(schemas(
        common::models::ConnectionItem,
        common::models::DbType,
        common::models::PoolStats,
        handlers::HealthResponse,
    )),
    tags(
        (name = "connections", description = "已注册连接"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (if present) before anything else
    load_dotenv();

    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME);
    let state = AppState::new(config.clone());

    // 管理端 HTTP
    if let Some(admin_addr) = config.admin_addr() {
        let listener = TcpListener::bind(&admin_addr)
            .await
            .with_context(|| format!("failed to bind admin address {}", admin_addr))?;
        info!(address = %admin_addr, "admin API listening");
        let app = create_router(state.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "admin API stopped");
            }
        });
    }

    // 启动服务
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(service = SERVICE_NAME, address = %addr, "start sql server");

    server::serve(state, listener, shutdown_signal())
        .await
        .context("accept loop failed")?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

/// Load .env file from the working directory (best-effort, no error if missing).
fn load_dotenv() {
    let env_path = std::path::Path::new(".env");
    if env_path.exists() {
        if let Ok(content) = std::fs::read_to_string(env_path) {
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim();
                    // Only set if not already set by the environment
                    if std::env::var(key).is_err() {
                        std::env::set_var(key, value);
                    }
                }
            }
        }
    }
}
