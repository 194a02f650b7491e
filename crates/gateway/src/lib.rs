//! HTTP API gateway for Statecraft.
//!
//! Endpoints:
//!
//! - `POST   /chat`                       — run one conversational turn
//! - `POST   /learn`                      — insert feedback exemplars
//! - `GET    /feedbacks`                  — paginated feedback listing
//! - `DELETE /feedbacks`                  — clear an agent's feedbacks
//! - `DELETE /collections/{agent_name}`   — drop the agent's collection
//! - `GET    /health`                     — liveness probe
//!
//! Built on Axum. Handlers talk to a [`ChatBackend`] trait object, so tests
//! drive the router against a stub without any network.

pub mod routes;
pub mod service;

use std::sync::Arc;

use tracing::info;

pub use routes::build_router;
pub use service::{ChatBackend, RuntimeBackend};

/// Bind and serve until the process is stopped.
pub async fn serve(
    addr: std::net::SocketAddr,
    backend: Arc<dyn ChatBackend>,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Gateway listening");
    axum::serve(listener, build_router(backend)).await
}
