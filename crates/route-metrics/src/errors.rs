//! Instrumentor error types.

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while building or registering an instrumentor.
///
/// None of these are recoverable at request time; a host that sees one should
/// refuse to start serving traffic.
#[derive(Debug, Error)]
pub enum InstrumentorError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("No instruments created: enable at least one metric kind")]
    NoInstruments,

    #[error("Prometheus exporter error: {0}")]
    Exporter(#[from] BuildError),
}
