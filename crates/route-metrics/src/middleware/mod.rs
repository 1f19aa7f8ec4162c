//! HTTP middleware.
//!
//! # Components
//!
//! - `http_metrics` - records request metrics for every matched route

pub mod http_metrics;

pub use http_metrics::track_metrics;
