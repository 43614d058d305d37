use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use admin_crud::auth::CookieAuthResolver;
use admin_crud::config::AppConfig;
use admin_crud::render::ShellRenderer;
use admin_crud::storage::PgStore;
use admin_crud::views::{admin_router, AppState};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, ADMIN_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    tracing::info!("Starting admin backend in {:?} mode", config.environment);

    let store = PgStore::connect(
        &config.database.url,
        config.database.max_connections,
        config.database.connection_timeout,
    )
    .await
    .unwrap_or_else(|e| panic!("failed to connect to {}: {}", config.database.url, e));

    let state = AppState {
        store: Arc::new(store),
        renderer: Arc::new(ShellRenderer),
        resolver: Arc::new(CookieAuthResolver::new(
            config.auth.cookie_name.clone(),
            &config.auth.secret,
        )),
    };

    let app = app(state);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("admin backend listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state.clone())
        .merge(admin_router(state))
        .layer(TraceLayer::new_for_http())
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "timestamp": now,
                "error": e.to_string(),
            })),
        ),
    }
}
