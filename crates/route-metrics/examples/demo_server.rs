//! Demo server
//!
//! Serves a few instrumented routes plus `/metrics`.
//!
//! ```text
//! CHI_METRICS_REQUESTS=true CHI_METRICS_LATENCY=true \
//! CHI_METRICS_CUSTOM_LABELS=X-Tenant \
//!     cargo run -p route-metrics --example demo_server
//!
//! curl -H 'X-Tenant: acme' localhost:8080/users/42
//! curl localhost:8080/metrics
//! ```

use axum::{extract::Path, http::StatusCode, middleware, routing::get, Router};
use route_metrics::{metrics_handler, track_metrics, Instrumentor, InstrumentorConfig};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn get_user(Path(id): Path<u64>) -> String {
    format!("user {}", id)
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "demo_server=debug,route_metrics=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = InstrumentorConfig::from_env().map_err(|e| {
        error!("Failed to load metrics configuration: {}", e);
        e
    })?;
    if config.is_disabled() {
        info!("No metric kinds configured, enabling all");
        config = InstrumentorConfig::all_enabled();
    }

    let service = std::env::var("SERVICE_NAME").unwrap_or_else(|_| "demo".to_string());
    let instrumentor = Instrumentor::new(service, config)?;
    let handle = instrumentor.must_register_default();

    let app = Router::new()
        .route("/users/:id", get(get_user))
        .route("/broken", get(broken))
        .layer(middleware::from_fn_with_state(instrumentor, track_metrics))
        .route("/metrics", get(metrics_handler).with_state(handle))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = std::env::var("BIND_ADDRESS")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()?;

    info!("Demo server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
