//! Lookups over a `DebuggingRecorder` snapshot.

use metrics::SharedString;
use metrics_util::debugging::{DebugValue, Snapshotter};
use metrics_util::{CompositeKey, MetricKind};

type Entry = (
    CompositeKey,
    Option<metrics::Unit>,
    Option<SharedString>,
    DebugValue,
);

/// A point-in-time copy of everything a `DebuggingRecorder` holds.
///
/// Label lookups match the full label set of a series, ignoring order and
/// the constant `service` label unless it is given explicitly.
pub struct MetricSnapshot {
    entries: Vec<Entry>,
}

impl MetricSnapshot {
    /// Take a snapshot. Take one per assertion block; histogram samples are
    /// not guaranteed to survive a second snapshot.
    pub fn take(snapshotter: &Snapshotter) -> Self {
        Self {
            entries: snapshotter.snapshot().into_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counter value for the series with exactly these labels.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        self.find(MetricKind::Counter, name, labels)
            .and_then(|value| match value {
                DebugValue::Counter(count) => Some(*count),
                _ => None,
            })
    }

    /// Samples of the histogram series with exactly these labels.
    pub fn histogram(&self, name: &str, labels: &[(&str, &str)]) -> Option<Vec<f64>> {
        self.find(MetricKind::Histogram, name, labels)
            .and_then(|value| match value {
                DebugValue::Histogram(samples) => {
                    Some(samples.iter().map(|s| s.into_inner()).collect())
                }
                _ => None,
            })
    }

    /// Number of distinct series recorded under `name`.
    pub fn series_count(&self, name: &str) -> usize {
        self.entries
            .iter()
            .filter(|(key, ..)| key.key().name() == name)
            .count()
    }

    /// Label sets of every series under `name`, each sorted by label name.
    pub fn label_sets(&self, name: &str) -> Vec<Vec<(String, String)>> {
        self.entries
            .iter()
            .filter(|(key, ..)| key.key().name() == name)
            .map(|(key, ..)| {
                let mut labels: Vec<(String, String)> = key
                    .key()
                    .labels()
                    .map(|l| (l.key().to_string(), l.value().to_string()))
                    .collect();
                labels.sort();
                labels
            })
            .collect()
    }

    /// Help text registered for `name`, if any series under it exists.
    pub fn description(&self, name: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|(key, ..)| key.key().name() == name)
            .and_then(|(_, _, description, _)| description.as_ref().map(|d| d.to_string()))
    }

    fn find(&self, kind: MetricKind, name: &str, labels: &[(&str, &str)]) -> Option<&DebugValue> {
        let mut wanted: Vec<(&str, &str)> = labels.to_vec();
        wanted.sort();
        let keep_service = wanted.iter().any(|(k, _)| *k == "service");

        self.entries
            .iter()
            .find(|(key, ..)| {
                if key.kind() != kind || key.key().name() != name {
                    return false;
                }
                let mut actual: Vec<(&str, &str)> = key
                    .key()
                    .labels()
                    .map(|l| (l.key(), l.value()))
                    .filter(|(k, _)| keep_service || *k != "service")
                    .collect();
                actual.sort();
                actual == wanted
            })
            .map(|(.., value)| value)
    }
}
