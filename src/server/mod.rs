use axum::{
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::storage::SqliteStore;

pub mod routes;

/// Server state
pub struct AppState {
    /// Single connection; each request holds it for one operation
    pub store: Mutex<SqliteStore>,
    pub database_path: PathBuf,
}

impl AppState {
    pub fn new(store: SqliteStore, database_path: PathBuf) -> Self {
        Self {
            store: Mutex::new(store),
            database_path,
        }
    }
}

/// All API routes over the shared state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/students", get(routes::list_students).post(routes::create_student))
        .route(
            "/api/students/{rollno}",
            get(routes::get_student)
                .put(routes::update_student)
                .delete(routes::delete_student),
        )
        .route("/api/marks", get(routes::list_marks).post(routes::upsert_marks))
        .route("/api/messages", get(routes::list_messages).post(routes::send_message))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(port: u16, store: SqliteStore, database_path: PathBuf) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(store, database_path));
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);
    crate::ui::success(&format!("Server listening on http://{}", addr));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
