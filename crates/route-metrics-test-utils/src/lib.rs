//! # Route Metrics Test Utilities
//!
//! Shared test utilities for the `route-metrics` crate.
//!
//! This crate provides:
//! - Recorder fixtures (`debugging_instrumentor`, `prometheus_instrumentor`)
//! - Snapshot lookups (`MetricSnapshot`)
//! - Router harness (`test_router`, `send`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use route_metrics_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let (instrumentor, snapshotter) =
//!         debugging_instrumentor("test_service", InstrumentorConfig::all_enabled())?;
//!     let app = test_router(instrumentor);
//!
//!     send(&app, Method::GET, "/", &[]).await?;
//!
//!     let snapshot = MetricSnapshot::take(&snapshotter);
//!     assert_eq!(
//!         snapshot.counter("chi_requests_total", &[("code", "200"), ("path", "/")]),
//!         Some(1)
//!     );
//!     Ok(())
//! }
//! ```

pub mod fixtures;
pub mod harness;
pub mod snapshot;

// Re-export commonly used items
pub use fixtures::*;
pub use harness::*;
pub use snapshot::*;
