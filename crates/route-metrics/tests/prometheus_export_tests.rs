//! Exposition tests against a non-installed Prometheus recorder.
//!
//! These check what a scrape would see: family types, help texts, bucket
//! boundaries and label values.

use axum::body::Body;
use axum::http::{Method, StatusCode};
use axum::routing::get;
use route_metrics::{metrics_handler, InstrumentorConfig};
use route_metrics_test_utils::{
    body_bytes, prometheus_instrumentor, send, send_with_body, test_router,
};

const SERVICE: &str = "test_service";

fn lines_starting_with<'a>(text: &'a str, prefix: &str) -> Vec<&'a str> {
    text.lines().filter(|line| line.starts_with(prefix)).collect()
}

#[tokio::test]
async fn test_exposition_types_and_help() -> Result<(), anyhow::Error> {
    let (instrumentor, handle) =
        prometheus_instrumentor(SERVICE, InstrumentorConfig::all_enabled())?;
    let app = test_router(instrumentor);

    send_with_body(&app, Method::GET, "/", &[], Body::from("test request body")).await?;
    send(&app, Method::GET, "/client_error", &[]).await?;

    let text = handle.render();

    assert!(text.contains("# TYPE chi_requests_total counter"));
    assert!(text.contains("# TYPE chi_detailed_errors_total counter"));
    assert!(text.contains("# TYPE chi_request_duration_seconds histogram"));
    assert!(text.contains("# TYPE chi_request_size_bytes summary"));
    assert!(text.contains("# TYPE chi_response_size_bytes summary"));

    assert!(text.contains(
        "# HELP chi_requests_total Number of HTTP requests partitioned by status code, method and HTTP path."
    ));
    assert!(text.contains("# HELP chi_response_size_bytes Size of HTTP responses in bytes."));

    Ok(())
}

#[tokio::test]
async fn test_exposition_request_counter_labels() -> Result<(), anyhow::Error> {
    let (instrumentor, handle) =
        prometheus_instrumentor(SERVICE, InstrumentorConfig::all_enabled())?;
    let app = test_router(instrumentor);

    send(&app, Method::GET, "/", &[]).await?;

    let text = handle.render();
    let counters = lines_starting_with(&text, "chi_requests_total{");
    assert_eq!(counters.len(), 1, "exposition:\n{}", text);

    let line = counters.first().copied().unwrap_or_default();
    assert!(line.contains("service=\"test_service\""));
    assert!(line.contains("code=\"200\""));
    assert!(line.contains("method=\"GET\""));
    assert!(line.contains("path=\"/\""));
    assert!(line.ends_with(" 1"));

    Ok(())
}

#[tokio::test]
async fn test_exposition_default_buckets() -> Result<(), anyhow::Error> {
    let config = InstrumentorConfig {
        latency: true,
        ..InstrumentorConfig::default()
    };
    let (instrumentor, handle) = prometheus_instrumentor(SERVICE, config)?;
    let app = test_router(instrumentor);

    send(&app, Method::GET, "/", &[]).await?;

    let text = handle.render();
    let buckets = lines_starting_with(&text, "chi_request_duration_seconds_bucket{");

    // Three configured boundaries plus +Inf.
    assert_eq!(buckets.len(), 4, "exposition:\n{}", text);
    assert!(buckets.iter().any(|l| l.contains("le=\"0.3\"")));
    assert!(buckets.iter().any(|l| l.contains("le=\"1.2\"")));
    assert!(buckets.iter().any(|l| l.contains("le=\"+Inf\"")));
    assert!(buckets.iter().all(|l| l.ends_with(" 1")));

    let counts = lines_starting_with(&text, "chi_request_duration_seconds_count{");
    assert_eq!(counts.len(), 1);
    assert!(counts.iter().all(|l| l.ends_with(" 1")));

    Ok(())
}

#[tokio::test]
async fn test_exposition_custom_buckets() -> Result<(), anyhow::Error> {
    let config = InstrumentorConfig {
        latency: true,
        latency_buckets: vec![0.2, 1.0, 4.0],
        ..InstrumentorConfig::default()
    };
    let (instrumentor, handle) = prometheus_instrumentor(SERVICE, config)?;
    let app = test_router(instrumentor);

    send(&app, Method::GET, "/", &[]).await?;

    let text = handle.render();
    let buckets = lines_starting_with(&text, "chi_request_duration_seconds_bucket{");

    assert_eq!(buckets.len(), 4, "exposition:\n{}", text);
    assert!(buckets.iter().any(|l| l.contains("le=\"0.2\"")));
    assert!(!buckets.iter().any(|l| l.contains("le=\"0.3\"")));
    assert!(!buckets.iter().any(|l| l.contains("le=\"1.2\"")));

    Ok(())
}

#[tokio::test]
async fn test_exposition_size_summaries() -> Result<(), anyhow::Error> {
    let config = InstrumentorConfig {
        request_size: true,
        response_size: true,
        ..InstrumentorConfig::default()
    };
    let (instrumentor, handle) = prometheus_instrumentor(SERVICE, config)?;
    let app = test_router(instrumentor);

    send_with_body(&app, Method::POST, "/echo", &[], Body::from("0123456789")).await?;

    let text = handle.render();

    let request_counts = lines_starting_with(&text, "chi_request_size_bytes_count{");
    assert_eq!(request_counts.len(), 1, "exposition:\n{}", text);
    assert!(request_counts.iter().all(|l| l.ends_with(" 1")));

    let response_counts = lines_starting_with(&text, "chi_response_size_bytes_count{");
    assert_eq!(response_counts.len(), 1);

    // Summaries carry no buckets.
    assert!(lines_starting_with(&text, "chi_request_size_bytes_bucket").is_empty());

    Ok(())
}

#[tokio::test]
async fn test_scrape_endpoint_serves_exposition() -> Result<(), anyhow::Error> {
    let (instrumentor, handle) =
        prometheus_instrumentor(SERVICE, InstrumentorConfig::all_enabled())?;
    let app = test_router(instrumentor).route("/metrics", get(metrics_handler).with_state(handle));

    send(&app, Method::GET, "/users/7", &[]).await?;

    let response = send(&app, Method::GET, "/metrics", &[]).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_bytes(response).await?;
    let text = String::from_utf8(body.to_vec())?;
    assert!(text.contains("path=\"/users/:id\""), "exposition:\n{}", text);
    // The scrape route is added outside the middleware layer.
    assert!(!text.contains("path=\"/metrics\""));

    Ok(())
}
