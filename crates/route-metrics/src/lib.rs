//! Route Metrics
//!
//! Prometheus request metrics for axum routers. Every request that matches a
//! route is counted, timed and sized, labelled by status code, method, the
//! matched route pattern and any custom header-derived labels.
//!
//! # Metric families
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `chi_requests_total` | Counter | service, code, method, path, custom... |
//! | `chi_request_duration_seconds` | Histogram | service, code, method, path, custom... |
//! | `chi_detailed_errors_total` | Counter | service, type, code, method, path |
//! | `chi_request_size_bytes` | Summary | service, code, method, path, custom... |
//! | `chi_response_size_bytes` | Summary | service, code, method, path, custom... |
//!
//! Families are created only for the kinds enabled in [`InstrumentorConfig`];
//! `chi_detailed_errors_total` follows `requests`.
//!
//! # Usage
//!
//! ```ignore
//! use axum::{middleware, routing::get, Router};
//! use route_metrics::{metrics_handler, track_metrics, Instrumentor, InstrumentorConfig};
//!
//! let instrumentor = Instrumentor::new("my-service", InstrumentorConfig::all_enabled())?;
//! let handle = instrumentor.must_register_default();
//!
//! let app = Router::new()
//!     .route("/users/:id", get(get_user))
//!     .layer(middleware::from_fn_with_state(instrumentor, track_metrics))
//!     .route("/metrics", get(metrics_handler).with_state(handle));
//! ```
//!
//! # Modules
//!
//! - `config` - Instrumentor configuration (code, serde or environment)
//! - `errors` - Registration error types
//! - `instrument` - Metric family names, help texts and schemas
//! - `instrumentor` - Construction, recording and registration
//! - `labels` - Label schema and per-request observations
//! - `middleware` - axum middleware
//! - `handlers` - `/metrics` scrape handler

pub mod config;
pub mod errors;
pub mod handlers;
pub mod instrument;
pub mod instrumentor;
pub mod labels;
pub mod middleware;

pub use config::{ConfigError, InstrumentorConfig, DEFAULT_LATENCY_BUCKETS};
pub use errors::InstrumentorError;
pub use handlers::metrics_handler;
pub use instrument::{Family, Instrument, InstrumentKind};
pub use instrumentor::Instrumentor;
pub use labels::{CustomValues, ErrorClass, LabelSchema, Observation};
pub use middleware::track_metrics;
