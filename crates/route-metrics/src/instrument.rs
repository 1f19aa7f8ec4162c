//! Metric family definitions.
//!
//! Names and help texts are fixed so existing dashboards keep working:
//! - `chi_` prefix for every family
//! - `_total` suffix for counters
//! - `_seconds` / `_bytes` unit suffixes for distributions

use metrics::Unit;

/// Counter: requests partitioned by status code, method and route pattern.
pub const REQUESTS_TOTAL: &str = "chi_requests_total";

/// Histogram: request latency in seconds.
pub const REQUEST_DURATION_SECONDS: &str = "chi_request_duration_seconds";

/// Counter: 4xx/5xx responses partitioned by error class.
pub const DETAILED_ERRORS_TOTAL: &str = "chi_detailed_errors_total";

/// Summary: request body size in bytes.
pub const REQUEST_SIZE_BYTES: &str = "chi_request_size_bytes";

/// Summary: response body size in bytes.
pub const RESPONSE_SIZE_BYTES: &str = "chi_response_size_bytes";

/// Constant label carrying the service name on every series.
pub const SERVICE_LABEL: &str = "service";

/// Label names leading every general label tuple, in tuple order.
pub const BASE_LABELS: [&str; 3] = ["code", "method", "path"];

/// Label names of the detailed-error family, in tuple order.
pub const DETAILED_ERROR_LABELS: [&str; 4] = ["type", "code", "method", "path"];

/// The five metric families the instrumentor can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Requests,
    DetailedErrors,
    Latency,
    RequestSize,
    ResponseSize,
}

/// Storage shape an instrument asks the sink for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    Counter,
    /// Distribution with explicit bucket boundaries.
    Histogram,
    /// Distribution exported as quantiles, without buckets.
    Summary,
}

impl Family {
    /// Exported series name.
    pub fn name(self) -> &'static str {
        match self {
            Family::Requests => REQUESTS_TOTAL,
            Family::DetailedErrors => DETAILED_ERRORS_TOTAL,
            Family::Latency => REQUEST_DURATION_SECONDS,
            Family::RequestSize => REQUEST_SIZE_BYTES,
            Family::ResponseSize => RESPONSE_SIZE_BYTES,
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Family::Requests => {
                "Number of HTTP requests partitioned by status code, method and HTTP path."
            }
            Family::DetailedErrors => {
                "Detailed error counts partitioned by type, status code, method and HTTP path."
            }
            Family::Latency => {
                "Time spent on the request partitioned by status code, method and HTTP path."
            }
            Family::RequestSize => "Size of HTTP requests in bytes.",
            Family::ResponseSize => "Size of HTTP responses in bytes.",
        }
    }

    pub fn kind(self) -> InstrumentKind {
        match self {
            Family::Requests | Family::DetailedErrors => InstrumentKind::Counter,
            Family::Latency => InstrumentKind::Histogram,
            Family::RequestSize | Family::ResponseSize => InstrumentKind::Summary,
        }
    }

    pub fn unit(self) -> Option<Unit> {
        match self {
            Family::Requests | Family::DetailedErrors => None,
            Family::Latency => Some(Unit::Seconds),
            Family::RequestSize | Family::ResponseSize => Some(Unit::Bytes),
        }
    }
}

/// A created metric family, as handed to a registration sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    family: Family,
    service: String,
    label_names: Vec<String>,
    buckets: Option<Vec<f64>>,
}

impl Instrument {
    pub(crate) fn new(
        family: Family,
        service: &str,
        label_names: Vec<String>,
        buckets: Option<Vec<f64>>,
    ) -> Self {
        Self {
            family,
            service: service.to_string(),
            label_names,
            buckets,
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn name(&self) -> &'static str {
        self.family.name()
    }

    pub fn help(&self) -> &'static str {
        self.family.help()
    }

    pub fn kind(&self) -> InstrumentKind {
        self.family.kind()
    }

    /// Constant labels attached to every series of this instrument.
    pub fn const_labels(&self) -> [(&'static str, &str); 1] {
        [(SERVICE_LABEL, self.service.as_str())]
    }

    /// Variable label names, in the order observations supply values.
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Bucket boundaries; only histograms carry them.
    pub fn buckets(&self) -> Option<&[f64]> {
        self.buckets.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_names_are_stable() {
        assert_eq!(Family::Requests.name(), "chi_requests_total");
        assert_eq!(Family::DetailedErrors.name(), "chi_detailed_errors_total");
        assert_eq!(Family::Latency.name(), "chi_request_duration_seconds");
        assert_eq!(Family::RequestSize.name(), "chi_request_size_bytes");
        assert_eq!(Family::ResponseSize.name(), "chi_response_size_bytes");
    }

    #[test]
    fn test_family_kinds() {
        assert_eq!(Family::Requests.kind(), InstrumentKind::Counter);
        assert_eq!(Family::DetailedErrors.kind(), InstrumentKind::Counter);
        assert_eq!(Family::Latency.kind(), InstrumentKind::Histogram);
        assert_eq!(Family::RequestSize.kind(), InstrumentKind::Summary);
        assert_eq!(Family::ResponseSize.kind(), InstrumentKind::Summary);
    }

    #[test]
    fn test_family_units() {
        assert_eq!(Family::Requests.unit(), None);
        assert_eq!(Family::Latency.unit(), Some(Unit::Seconds));
        assert_eq!(Family::ResponseSize.unit(), Some(Unit::Bytes));
    }

    #[test]
    fn test_instrument_accessors() {
        let instrument = Instrument::new(
            Family::Latency,
            "svc",
            vec!["code".to_string(), "method".to_string(), "path".to_string()],
            Some(vec![0.3, 1.2, 5.0]),
        );

        assert_eq!(instrument.name(), REQUEST_DURATION_SECONDS);
        assert_eq!(instrument.const_labels(), [("service", "svc")]);
        assert_eq!(instrument.label_names(), ["code", "method", "path"]);
        assert_eq!(instrument.buckets(), Some(&[0.3, 1.2, 5.0][..]));
    }
}
