//! Local HTTP server that goes away for a while, for watching alerts.
//!
//! Serves `200` on port 8000 for 60s, is unreachable for the next 60s, then
//! serves again for 600s. Point a target file at `http://localhost:8000`
//! with a short interval to see one down and one recovered alert.

use axum::{response::Html, routing::get, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PORT: u16 = 8000;

async fn handle_index() -> Html<&'static str> {
    Html("<html><body><h1>TEST</h1></body></html>")
}

async fn serve_for(
    addr: SocketAddr,
    period: Duration,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let router = Router::new().route("/", get(handle_index));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Server running on {} for {:?}", addr, period);
    axum::serve(listener, router)
        .with_graceful_shutdown(tokio::time::sleep(period))
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("flapping_server=info".parse()?))
        .init();

    let addr = SocketAddr::from(([0, 0, 0, 0], PORT));

    serve_for(addr, Duration::from_secs(60)).await?;
    tokio::time::sleep(Duration::from_secs(60)).await;
    serve_for(addr, Duration::from_secs(600)).await?;

    Ok(())
}
