//! The instrumentor: metric families, label schema and recording.
//!
//! An [`Instrumentor`] is built once at startup from a service name and an
//! [`InstrumentorConfig`]. It decides which families exist, derives the label
//! schema once, and turns each [`Observation`] into recorder calls.
//!
//! # Sinks
//!
//! Observations go to a `metrics::Recorder`. By default that is whatever
//! `metrics::with_recorder` resolves (the process-wide recorder, or a
//! thread-local one in tests). [`Instrumentor::with_recorder`] pins an explicit
//! recorder instead, which keeps the core logic registry-agnostic.

use metrics::{Key, Label, Level, Metadata, Recorder};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::{ConfigError, InstrumentorConfig};
use crate::errors::InstrumentorError;
use crate::instrument::{Family, Instrument, InstrumentKind, DETAILED_ERROR_LABELS};
use crate::labels::{LabelSchema, Observation};

static METADATA: Metadata<'static> =
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()));

/// Where observations are recorded.
#[derive(Clone)]
enum Sink {
    Global,
    Recorder(Arc<dyn Recorder + Send + Sync>),
}

impl Sink {
    fn with<T>(&self, f: impl FnOnce(&dyn Recorder) -> T) -> T {
        match self {
            Sink::Global => metrics::with_recorder(f),
            Sink::Recorder(recorder) => f(recorder.as_ref()),
        }
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::Global => f.write_str("Global"),
            Sink::Recorder(_) => f.write_str("Recorder(..)"),
        }
    }
}

#[derive(Debug)]
struct Inner {
    service: String,
    config: InstrumentorConfig,
    schema: LabelSchema,
    buckets: Vec<f64>,
    instruments: Vec<Instrument>,
    /// Enabled families sharing the general label set, in instrument order.
    families: Vec<Family>,
}

/// Request instrumentation for one service.
///
/// Cheap to clone; clones share the same families and sink. Nothing is
/// mutated after construction, so concurrent requests need no locking here.
#[derive(Debug, Clone)]
pub struct Instrumentor {
    inner: Arc<Inner>,
    sink: Sink,
}

impl Instrumentor {
    /// Build an instrumentor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an empty service name, reserved, duplicate
    /// or malformed custom labels, or invalid latency buckets.
    pub fn new(
        service: impl Into<String>,
        config: InstrumentorConfig,
    ) -> Result<Self, ConfigError> {
        let service = service.into();
        if service.trim().is_empty() {
            return Err(ConfigError::EmptyServiceName);
        }

        config.validate()?;
        let schema = LabelSchema::new(&config.custom_labels)?;
        let buckets = config.effective_buckets();
        let instruments = build_instruments(&service, &config, &schema, &buckets);
        let families = instruments
            .iter()
            .map(Instrument::family)
            .filter(|family| *family != Family::DetailedErrors)
            .collect();

        info!(
            target: "route_metrics",
            service = %service,
            instruments = ?instruments.iter().map(Instrument::name).collect::<Vec<_>>(),
            labels = ?schema.names(),
            "Instrumentor created"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                service,
                config,
                schema,
                buckets,
                instruments,
                families,
            }),
            sink: Sink::Global,
        })
    }

    /// Record into `recorder` instead of the process-wide recorder.
    pub fn with_recorder(mut self, recorder: Arc<dyn Recorder + Send + Sync>) -> Self {
        self.sink = Sink::Recorder(recorder);
        self
    }

    pub fn service(&self) -> &str {
        &self.inner.service
    }

    pub fn config(&self) -> &InstrumentorConfig {
        &self.inner.config
    }

    pub fn schema(&self) -> &LabelSchema {
        &self.inner.schema
    }

    /// Latency bucket boundaries in effect.
    pub fn buckets(&self) -> &[f64] {
        &self.inner.buckets
    }

    /// Created instruments in registration order: requests, detailed errors,
    /// latency, request size, response size. Disabled kinds are absent.
    pub fn instruments(&self) -> &[Instrument] {
        &self.inner.instruments
    }

    pub fn is_enabled(&self, family: Family) -> bool {
        self.inner
            .instruments
            .iter()
            .any(|instrument| instrument.family() == family)
    }

    /// Record one completed request against every enabled family.
    pub fn record(&self, observation: &Observation) {
        let labels = self.inner.schema.bind(&self.inner.service, observation);

        self.sink.with(|recorder| {
            emit(recorder, &self.inner.families, labels, observation);
            self.record_error(recorder, observation);
        });
    }

    /// Like [`Instrumentor::record`], but holds the response size back so it
    /// can be recorded once the body has actually been written.
    ///
    /// Returns `None` when the response size family is disabled.
    pub(crate) fn record_deferred(
        &self,
        observation: &Observation,
    ) -> Option<PendingResponseSize> {
        let labels = self.inner.schema.bind(&self.inner.service, observation);

        let (families, pending) = match self.inner.families.split_last() {
            Some((Family::ResponseSize, rest)) => (
                rest,
                Some(PendingResponseSize {
                    sink: self.sink.clone(),
                    labels: labels.clone(),
                }),
            ),
            _ => (self.inner.families.as_slice(), None),
        };

        self.sink.with(|recorder| {
            emit(recorder, families, labels, observation);
            self.record_error(recorder, observation);
        });

        pending
    }

    fn record_error(&self, recorder: &dyn Recorder, observation: &Observation) {
        if !self.inner.config.requests {
            return;
        }
        if let Some(class) = observation.error_class() {
            let labels = observation.error_labels(&self.inner.service, class);
            let key = Key::from_parts(Family::DetailedErrors.name(), labels);
            recorder.register_counter(&key, &METADATA).increment(1);
        }
    }

    /// Register name, unit and help text of every instrument with the sink.
    pub fn describe(&self) {
        self.sink.with(|recorder| describe_to(recorder, self.instruments()));
    }

    /// Apply latency buckets to an exporter builder.
    ///
    /// Families without buckets (the size families) render as summaries.
    pub fn configure_exporter(
        &self,
        builder: PrometheusBuilder,
    ) -> Result<PrometheusBuilder, InstrumentorError> {
        if !self.inner.config.latency {
            return Ok(builder);
        }

        Ok(builder.set_buckets_for_metric(
            Matcher::Full(Family::Latency.name().to_string()),
            &self.inner.buckets,
        )?)
    }

    /// A fresh exporter builder carrying this instrumentor's buckets.
    pub fn prometheus_builder(&self) -> Result<PrometheusBuilder, InstrumentorError> {
        self.configure_exporter(PrometheusBuilder::new())
    }

    /// Install a process-wide Prometheus recorder and describe every
    /// instrument against it.
    ///
    /// Intended for instrumentors using the default sink.
    ///
    /// # Errors
    ///
    /// Returns [`InstrumentorError::NoInstruments`] if every kind is disabled,
    /// or an exporter error if a recorder is already installed.
    pub fn register_default(&self) -> Result<PrometheusHandle, InstrumentorError> {
        if self.instruments().is_empty() {
            return Err(InstrumentorError::NoInstruments);
        }

        let handle = self.prometheus_builder()?.install_recorder()?;
        metrics::with_recorder(|recorder| describe_to(recorder, self.instruments()));

        info!(
            target: "route_metrics",
            service = %self.inner.service,
            count = self.instruments().len(),
            "Registered instruments with the default Prometheus recorder"
        );

        Ok(handle)
    }

    /// Like [`Instrumentor::register_default`], but aborts the process on
    /// failure so disabled metrics surface at startup.
    pub fn must_register_default(&self) -> PrometheusHandle {
        match self.register_default() {
            Ok(handle) => handle,
            Err(e) => {
                error!(
                    target: "route_metrics",
                    service = %self.inner.service,
                    error = %e,
                    "Metrics registration failed, aborting"
                );
                std::process::abort()
            }
        }
    }
}

fn build_instruments(
    service: &str,
    config: &InstrumentorConfig,
    schema: &LabelSchema,
    buckets: &[f64],
) -> Vec<Instrument> {
    let mut instruments = Vec::with_capacity(5);

    if config.requests {
        instruments.push(Instrument::new(
            Family::Requests,
            service,
            schema.names(),
            None,
        ));
        instruments.push(Instrument::new(
            Family::DetailedErrors,
            service,
            DETAILED_ERROR_LABELS.iter().map(|l| l.to_string()).collect(),
            None,
        ));
    }

    if config.latency {
        instruments.push(Instrument::new(
            Family::Latency,
            service,
            schema.names(),
            Some(buckets.to_vec()),
        ));
    }

    if config.request_size {
        instruments.push(Instrument::new(
            Family::RequestSize,
            service,
            schema.names(),
            None,
        ));
    }

    if config.response_size {
        instruments.push(Instrument::new(
            Family::ResponseSize,
            service,
            schema.names(),
            None,
        ));
    }

    instruments
}

/// Response size observation waiting for the body to finish.
#[derive(Debug)]
pub(crate) struct PendingResponseSize {
    sink: Sink,
    labels: Vec<Label>,
}

impl PendingResponseSize {
    pub(crate) fn record(self, bytes: u64) {
        let key = Key::from_parts(Family::ResponseSize.name(), self.labels);
        self.sink.with(|recorder| {
            recorder
                .register_histogram(&key, &METADATA)
                .record(bytes as f64);
        });
    }
}

/// Record `observation` into each of `families`. The label vector is cloned
/// for all but the last key, which takes ownership.
fn emit(
    recorder: &dyn Recorder,
    families: &[Family],
    labels: Vec<Label>,
    observation: &Observation,
) {
    let Some((last, rest)) = families.split_last() else {
        return;
    };
    for &family in rest {
        emit_one(recorder, family, labels.clone(), observation);
    }
    emit_one(recorder, *last, labels, observation);
}

fn emit_one(
    recorder: &dyn Recorder,
    family: Family,
    labels: Vec<Label>,
    observation: &Observation,
) {
    let key = Key::from_parts(family.name(), labels);
    match family {
        Family::Requests => recorder.register_counter(&key, &METADATA).increment(1),
        Family::Latency => recorder
            .register_histogram(&key, &METADATA)
            .record(observation.elapsed.as_secs_f64()),
        Family::RequestSize => recorder
            .register_histogram(&key, &METADATA)
            .record(observation.request_size as f64),
        Family::ResponseSize => recorder
            .register_histogram(&key, &METADATA)
            .record(observation.response_size as f64),
        // Carries its own label set, see `record_error`.
        Family::DetailedErrors => {}
    }
}

fn describe_to(recorder: &dyn Recorder, instruments: &[Instrument]) {
    for instrument in instruments {
        let family = instrument.family();
        match instrument.kind() {
            InstrumentKind::Counter => recorder.describe_counter(
                family.name().into(),
                family.unit(),
                family.help().into(),
            ),
            InstrumentKind::Histogram | InstrumentKind::Summary => recorder.describe_histogram(
                family.name().into(),
                family.unit(),
                family.help().into(),
            ),
        }
    }
}
