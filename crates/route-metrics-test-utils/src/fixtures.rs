//! Instrumentor fixtures backed by in-memory recorders.

use metrics_exporter_prometheus::PrometheusHandle;
use metrics_util::debugging::{DebuggingRecorder, Snapshotter};
use route_metrics::{Instrumentor, InstrumentorConfig};
use std::sync::Arc;

/// Instrumentor recording into a fresh `DebuggingRecorder`.
///
/// Instruments are already described, so help texts show up in snapshots.
pub fn debugging_instrumentor(
    service: &str,
    config: InstrumentorConfig,
) -> Result<(Instrumentor, Snapshotter), anyhow::Error> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let instrumentor = Instrumentor::new(service, config)?.with_recorder(Arc::new(recorder));
    instrumentor.describe();
    Ok((instrumentor, snapshotter))
}

/// Instrumentor recording into a Prometheus recorder that is not installed
/// globally, so every test gets its own exposition.
pub fn prometheus_instrumentor(
    service: &str,
    config: InstrumentorConfig,
) -> Result<(Instrumentor, PrometheusHandle), anyhow::Error> {
    let instrumentor = Instrumentor::new(service, config)?;
    let recorder = instrumentor.prometheus_builder()?.build_recorder();
    let handle = recorder.handle();
    let instrumentor = instrumentor.with_recorder(Arc::new(recorder));
    instrumentor.describe();
    Ok((instrumentor, handle))
}
