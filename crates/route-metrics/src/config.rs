//! Instrumentor configuration.
//!
//! Configuration is an explicit value object: every recognised option is a
//! field. It can be built in code, deserialized from a host's own config file,
//! or loaded from environment variables.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Default latency histogram boundaries in seconds.
pub const DEFAULT_LATENCY_BUCKETS: [f64; 3] = [0.3, 1.2, 5.0];

/// Label names owned by the instrumentor or by the exposition format
/// (`le` on histogram buckets, `quantile` on summaries). Custom labels may not
/// reuse them.
pub const RESERVED_LABELS: [&str; 6] = ["code", "method", "path", "service", "le", "quantile"];

/// Environment variable names read by [`InstrumentorConfig::from_env`].
pub const ENV_REQUESTS: &str = "CHI_METRICS_REQUESTS";
pub const ENV_LATENCY: &str = "CHI_METRICS_LATENCY";
pub const ENV_REQUEST_SIZE: &str = "CHI_METRICS_REQUEST_SIZE";
pub const ENV_RESPONSE_SIZE: &str = "CHI_METRICS_RESPONSE_SIZE";
pub const ENV_CUSTOM_LABELS: &str = "CHI_METRICS_CUSTOM_LABELS";
pub const ENV_LATENCY_BUCKETS: &str = "CHI_METRICS_LATENCY_BUCKETS";

/// Which metric families to create, and how to label them.
///
/// All kinds are disabled by default. Leaving `latency_buckets` empty selects
/// [`DEFAULT_LATENCY_BUCKETS`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentorConfig {
    /// Track `chi_requests_total` (and `chi_detailed_errors_total`).
    pub requests: bool,

    /// Track `chi_request_duration_seconds`.
    pub latency: bool,

    /// Track `chi_request_size_bytes`.
    pub request_size: bool,

    /// Track `chi_response_size_bytes`.
    pub response_size: bool,

    /// Extra label names, each read from the request header of the same name.
    /// Order is preserved in every label tuple.
    pub custom_labels: Vec<String>,

    /// Latency histogram boundaries in seconds, strictly ascending.
    pub latency_buckets: Vec<f64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Service name must not be empty")]
    EmptyServiceName,

    #[error("Custom label '{0}' collides with a reserved label name")]
    ReservedLabel(String),

    #[error("Custom label '{0}' is configured more than once")]
    DuplicateLabel(String),

    #[error("Custom label '{0}' is not a valid HTTP header name")]
    InvalidLabel(String),

    #[error("Invalid latency buckets: {0}")]
    InvalidBuckets(String),

    #[error("Invalid value for environment variable {name}: {reason}")]
    InvalidEnvVar { name: String, reason: String },
}

impl InstrumentorConfig {
    /// Configuration with every metric kind enabled and default buckets.
    pub fn all_enabled() -> Self {
        Self {
            requests: true,
            latency: true,
            request_size: true,
            response_size: true,
            ..Self::default()
        }
    }

    /// Returns true if no metric kind is enabled.
    pub fn is_disabled(&self) -> bool {
        !(self.requests || self.latency || self.request_size || self.response_size)
    }

    /// Latency boundaries after substituting the default for an empty list.
    pub fn effective_buckets(&self) -> Vec<f64> {
        if self.latency_buckets.is_empty() {
            DEFAULT_LATENCY_BUCKETS.to_vec()
        } else {
            self.latency_buckets.clone()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    ///
    /// Missing variables keep their defaults. Values are not validated beyond
    /// parsing; label and bucket checks happen when the instrumentor is built.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = vars.get(ENV_REQUESTS) {
            config.requests = parse_bool(ENV_REQUESTS, value)?;
        }
        if let Some(value) = vars.get(ENV_LATENCY) {
            config.latency = parse_bool(ENV_LATENCY, value)?;
        }
        if let Some(value) = vars.get(ENV_REQUEST_SIZE) {
            config.request_size = parse_bool(ENV_REQUEST_SIZE, value)?;
        }
        if let Some(value) = vars.get(ENV_RESPONSE_SIZE) {
            config.response_size = parse_bool(ENV_RESPONSE_SIZE, value)?;
        }

        if let Some(value) = vars.get(ENV_CUSTOM_LABELS) {
            config.custom_labels = split_list(value).map(str::to_string).collect();
        }

        if let Some(value) = vars.get(ENV_LATENCY_BUCKETS) {
            config.latency_buckets = split_list(value)
                .map(|item| {
                    item.parse::<f64>().map_err(|e| ConfigError::InvalidEnvVar {
                        name: ENV_LATENCY_BUCKETS.to_string(),
                        reason: format!("'{}' is not a number: {}", item, e),
                    })
                })
                .collect::<Result<_, _>>()?;
        }

        Ok(config)
    }

    /// Check custom label names and bucket boundaries.
    ///
    /// Names are compared in their exported form, so `X-Tenant` and `x_tenant`
    /// count as the same label.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: Vec<String> = Vec::with_capacity(self.custom_labels.len());
        for label in &self.custom_labels {
            let folded = exported_label_key(label);
            if RESERVED_LABELS.contains(&folded.as_str()) {
                return Err(ConfigError::ReservedLabel(label.clone()));
            }
            if seen.contains(&folded) {
                return Err(ConfigError::DuplicateLabel(label.clone()));
            }
            seen.push(folded);
        }

        validate_buckets(&self.latency_buckets)
    }
}

/// Label key as the exporter writes it, case-folded: every character outside
/// `[A-Za-z0-9_]`, and a leading digit, becomes `_`.
fn exported_label_key(label: &str) -> String {
    label
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let valid = c.is_ascii_alphabetic() || c == '_' || (i > 0 && c.is_ascii_digit());
            if valid {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn validate_buckets(buckets: &[f64]) -> Result<(), ConfigError> {
    let mut previous: Option<f64> = None;
    for &bound in buckets {
        if !bound.is_finite() || bound <= 0.0 {
            return Err(ConfigError::InvalidBuckets(format!(
                "boundary {} must be a positive finite number",
                bound
            )));
        }
        if let Some(prev) = previous {
            if bound <= prev {
                return Err(ConfigError::InvalidBuckets(format!(
                    "boundaries must be strictly ascending, got {} after {}",
                    bound, prev
                )));
            }
        }
        previous = Some(bound);
    }
    Ok(())
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            name: name.to_string(),
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_disables_everything() {
        let config = InstrumentorConfig::default();
        assert!(config.is_disabled());
        assert!(config.custom_labels.is_empty());
        assert!(config.latency_buckets.is_empty());
    }

    #[test]
    fn test_all_enabled() {
        let config = InstrumentorConfig::all_enabled();
        assert!(config.requests);
        assert!(config.latency);
        assert!(config.request_size);
        assert!(config.response_size);
        assert!(!config.is_disabled());
    }

    #[test]
    fn test_effective_buckets_default() {
        let config = InstrumentorConfig::default();
        assert_eq!(config.effective_buckets(), vec![0.3, 1.2, 5.0]);
    }

    #[test]
    fn test_effective_buckets_replaced() {
        let config = InstrumentorConfig {
            latency_buckets: vec![0.2, 1.0, 4.0],
            ..InstrumentorConfig::default()
        };
        assert_eq!(config.effective_buckets(), vec![0.2, 1.0, 4.0]);
    }

    #[test]
    fn test_validate_accepts_custom_labels() {
        let config = InstrumentorConfig {
            custom_labels: vec!["X-Custom-Header".to_string(), "tenant".to_string()],
            ..InstrumentorConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_reserved_labels() {
        for reserved in [
            "code", "method", "path", "service", "Method", "PATH", "le", "quantile", "LE",
        ] {
            let config = InstrumentorConfig {
                custom_labels: vec![reserved.to_string()],
                ..InstrumentorConfig::default()
            };
            assert_eq!(
                config.validate(),
                Err(ConfigError::ReservedLabel(reserved.to_string())),
                "label {} should be rejected",
                reserved
            );
        }
    }

    #[test]
    fn test_validate_rejects_duplicate_labels() {
        let config = InstrumentorConfig {
            custom_labels: vec!["X-Tenant".to_string(), "x-tenant".to_string()],
            ..InstrumentorConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateLabel("x-tenant".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_labels_equal_after_sanitizing() {
        for (first, second) in [("X-A", "X_A"), ("x.region", "X-Region"), ("tenant", "Tenant")] {
            let config = InstrumentorConfig {
                custom_labels: vec![first.to_string(), second.to_string()],
                ..InstrumentorConfig::default()
            };
            assert_eq!(
                config.validate(),
                Err(ConfigError::DuplicateLabel(second.to_string())),
                "{} and {} should collide",
                first,
                second
            );
        }
    }

    #[test]
    fn test_exported_label_key() {
        assert_eq!(exported_label_key("X-Custom-Header"), "x_custom_header");
        assert_eq!(exported_label_key("x.region"), "x_region");
        assert_eq!(exported_label_key("tenant_id"), "tenant_id");
        assert_eq!(exported_label_key("9lives"), "_lives");
    }

    #[test]
    fn test_validate_rejects_bad_buckets() {
        for buckets in [
            vec![0.0, 1.0],
            vec![-1.0],
            vec![f64::NAN],
            vec![f64::INFINITY],
            vec![1.0, 1.0],
            vec![2.0, 1.0],
        ] {
            let config = InstrumentorConfig {
                latency_buckets: buckets.clone(),
                ..InstrumentorConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidBuckets(_))),
                "buckets {:?} should be rejected",
                buckets
            );
        }
    }

    #[test]
    fn test_from_vars_empty_uses_defaults() {
        let config = InstrumentorConfig::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config, InstrumentorConfig::default());
    }

    #[test]
    fn test_from_vars_custom_values() {
        let vars = HashMap::from([
            (ENV_REQUESTS.to_string(), "true".to_string()),
            (ENV_LATENCY.to_string(), "1".to_string()),
            (ENV_REQUEST_SIZE.to_string(), "no".to_string()),
            (ENV_RESPONSE_SIZE.to_string(), "YES".to_string()),
            (
                ENV_CUSTOM_LABELS.to_string(),
                "X-Tenant, X-Region,".to_string(),
            ),
            (ENV_LATENCY_BUCKETS.to_string(), "0.2, 1.0,4".to_string()),
        ]);

        let config = InstrumentorConfig::from_vars(&vars).expect("config should load");

        assert!(config.requests);
        assert!(config.latency);
        assert!(!config.request_size);
        assert!(config.response_size);
        assert_eq!(config.custom_labels, vec!["X-Tenant", "X-Region"]);
        assert_eq!(config.latency_buckets, vec![0.2, 1.0, 4.0]);
    }

    #[test]
    fn test_from_vars_rejects_bad_bool() {
        let vars = HashMap::from([(ENV_LATENCY.to_string(), "maybe".to_string())]);
        let result = InstrumentorConfig::from_vars(&vars);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnvVar { name, .. }) if name == ENV_LATENCY
        ));
    }

    #[test]
    fn test_from_vars_rejects_bad_bucket() {
        let vars = HashMap::from([(ENV_LATENCY_BUCKETS.to_string(), "0.1,fast".to_string())]);
        let result = InstrumentorConfig::from_vars(&vars);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnvVar { name, .. }) if name == ENV_LATENCY_BUCKETS
        ));
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: InstrumentorConfig =
            serde_json::from_str(r#"{"requests": true, "custom_labels": ["X-Tenant"]}"#)
                .unwrap();
        assert!(config.requests);
        assert!(!config.latency);
        assert_eq!(config.custom_labels, vec!["X-Tenant"]);
        assert!(config.latency_buckets.is_empty());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ConfigError::ReservedLabel("path".to_string()).to_string(),
            "Custom label 'path' collides with a reserved label name"
        );
        assert_eq!(
            ConfigError::EmptyServiceName.to_string(),
            "Service name must not be empty"
        );
    }
}
