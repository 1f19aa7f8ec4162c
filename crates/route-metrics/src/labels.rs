//! Label schema and per-request observations.
//!
//! The schema is derived once when the instrumentor is built and is the only
//! place label tuples are produced. Custom values are captured by iterating
//! the schema itself, so a tuple can never disagree with the instrument it
//! feeds.

use axum::http::{HeaderMap, HeaderName, Method, StatusCode};
use metrics::Label;
use std::time::Duration;

use crate::config::ConfigError;
use crate::instrument::{BASE_LABELS, SERVICE_LABEL};

/// Error class for the detailed-error family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    ClientError,
    ServerError,
}

impl ErrorClass {
    /// Classify a status code. Anything below 400 is not an error.
    pub fn from_status(status: StatusCode) -> Option<Self> {
        match status.as_u16() {
            400..=499 => Some(ErrorClass::ClientError),
            500..=u16::MAX => Some(ErrorClass::ServerError),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::ClientError => "client_error",
            ErrorClass::ServerError => "server_error",
        }
    }
}

#[derive(Debug, Clone)]
struct CustomLabel {
    name: String,
    header: HeaderName,
}

/// Ordered label names shared by every general instrument:
/// `code`, `method`, `path`, then the custom labels.
#[derive(Debug, Clone)]
pub struct LabelSchema {
    custom: Vec<CustomLabel>,
}

impl LabelSchema {
    /// Build the schema from custom label names, parsing each as a header name.
    pub(crate) fn new(custom_labels: &[String]) -> Result<Self, ConfigError> {
        let custom = custom_labels
            .iter()
            .map(|name| {
                HeaderName::from_bytes(name.as_bytes())
                    .map(|header| CustomLabel {
                        name: name.clone(),
                        header,
                    })
                    .map_err(|_| ConfigError::InvalidLabel(name.clone()))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { custom })
    }

    /// Full label-name list, in tuple order.
    pub fn names(&self) -> Vec<String> {
        BASE_LABELS
            .iter()
            .map(|name| name.to_string())
            .chain(self.custom.iter().map(|label| label.name.clone()))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        BASE_LABELS.len() + self.custom.len()
    }

    /// Read one value per custom label from request headers, in schema order.
    ///
    /// Missing headers yield an empty string rather than dropping the label.
    pub fn capture(&self, headers: &HeaderMap) -> CustomValues {
        CustomValues(
            self.custom
                .iter()
                .map(|label| {
                    headers
                        .get(&label.header)
                        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                        .unwrap_or_default()
                })
                .collect(),
        )
    }

    /// Bind an observation to label names: `service`, `code`, `method`,
    /// `path`, then custom labels.
    ///
    /// The tuple always has one entry per schema name; a value missing from
    /// `observation.custom` is bound as an empty string.
    pub(crate) fn bind(&self, service: &str, observation: &Observation) -> Vec<Label> {
        let mut labels = Vec::with_capacity(1 + self.len());
        labels.push(Label::new(SERVICE_LABEL, service.to_string()));
        labels.push(Label::new("code", observation.code()));
        labels.push(Label::new("method", observation.method.as_str().to_string()));
        labels.push(Label::new("path", observation.route.clone()));
        let mut values = observation.custom.0.iter();
        labels.extend(self.custom.iter().map(|label| {
            let value = values.next().cloned().unwrap_or_default();
            Label::new(label.name.clone(), value)
        }));
        labels
    }
}

/// Custom label values captured by [`LabelSchema::capture`].
///
/// Only the schema can produce these, which keeps their length and order
/// tied to the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomValues(Vec<String>);

impl CustomValues {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Everything recorded about one completed request.
#[derive(Debug, Clone)]
pub struct Observation {
    pub status: StatusCode,
    pub method: Method,
    /// Matched route pattern, e.g. `/users/:id`.
    pub route: String,
    pub custom: CustomValues,
    /// Request body size in bytes.
    pub request_size: u64,
    /// Response body size in bytes.
    pub response_size: u64,
    pub elapsed: Duration,
}

impl Observation {
    /// Status code as a decimal string.
    pub fn code(&self) -> String {
        self.status.as_u16().to_string()
    }

    pub fn error_class(&self) -> Option<ErrorClass> {
        ErrorClass::from_status(self.status)
    }

    /// Labels for the detailed-error family: `service`, `type`, `code`,
    /// `method`, `path`. Custom labels are never included.
    pub(crate) fn error_labels(&self, service: &str, class: ErrorClass) -> Vec<Label> {
        vec![
            Label::new(SERVICE_LABEL, service.to_string()),
            Label::new("type", class.as_str()),
            Label::new("code", self.code()),
            Label::new("method", self.method.as_str().to_string()),
            Label::new("path", self.route.clone()),
        ]
    }
}
