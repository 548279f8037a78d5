pub mod handlers;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;

/// Build the gateway router: every participant-facing operation plus a
/// status view, all under `/api`.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/status", get(handlers::handle_status))
        .route("/nodes", get(handlers::handle_nodes))
        .route("/nodes", post(handlers::handle_register))
        .route("/nodes/{node_id}", delete(handlers::handle_deregister))
        .route("/nodes/{node_id}/tasks/pull", post(handlers::handle_pull))
        .route("/tasks/{task_id}", get(handlers::handle_get_task))
        .route("/tasks/{task_id}/reply", post(handlers::handle_reply))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(cors)
}

pub async fn serve(state: ApiState, port: u16) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "gateway API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Bind an OS-assigned port, serve in the background, and return the bound
/// address. For embedding and tests.
pub async fn spawn(state: ApiState) -> anyhow::Result<std::net::SocketAddr> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "gateway API listening");
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(error = %err, "gateway API exited");
        }
    });
    Ok(addr)
}
