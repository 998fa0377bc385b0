//! Variant-tagged metric events
//!
//! Every event carries the variant that served it so the two client
//! constructions can be compared offline. Sinks may fail; callers swallow
//! the failure.

use crate::error::MetricError;
use apimig_core::ClientVariant;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// One recorded event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricEvent {
    /// Event name
    pub name: String,
    /// Variant that served the call
    pub variant: ClientVariant,
    /// Free-form tags
    pub metadata: BTreeMap<String, String>,
    /// When the event was recorded
    pub recorded_at: DateTime<Utc>,
}

impl MetricEvent {
    /// Event stamped now
    #[must_use]
    pub fn new(name: impl Into<String>, variant: ClientVariant) -> Self {
        Self {
            name: name.into(),
            variant,
            metadata: BTreeMap::new(),
            recorded_at: Utc::now(),
        }
    }

    /// With one more tag
    #[inline]
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Destination for [`MetricEvent`]s
#[cfg_attr(test, mockall::automock)]
pub trait MetricSink: Send + Sync {
    /// Record one event
    fn record(&self, event: &MetricEvent) -> Result<(), MetricError>;
}

/// Forwards events to the `metrics` facade as a labelled counter
///
/// Only tags named in [`COUNTER_LABEL_KEYS`] become labels; request paths and
/// other open-ended tags stay in the event for [`TracingSink`]. Without an
/// installed recorder every call is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterSink;

/// Counter name used by [`CounterSink`]
pub const CLIENT_EVENTS_COUNTER: &str = "apimig_client_events_total";

/// Tags with a closed value set, safe to use as counter labels
pub const COUNTER_LABEL_KEYS: &[&str] = &["preset"];

impl CounterSink {
    /// Labels attached to the counter for `event`
    #[must_use]
    pub fn labels(&self, event: &MetricEvent) -> Vec<::metrics::Label> {
        let mut labels = vec![
            ::metrics::Label::new("event", event.name.clone()),
            ::metrics::Label::new("variant", event.variant.as_str()),
        ];
        labels.extend(
            event
                .metadata
                .iter()
                .filter(|(k, _)| COUNTER_LABEL_KEYS.contains(&k.as_str()))
                .map(|(k, v)| ::metrics::Label::new(k.clone(), v.clone())),
        );
        labels
    }
}

impl MetricSink for CounterSink {
    fn record(&self, event: &MetricEvent) -> Result<(), MetricError> {
        ::metrics::counter!(CLIENT_EVENTS_COUNTER, self.labels(event)).increment(1);
        Ok(())
    }
}

/// Writes each event as a JSON `info` log line
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl MetricSink for TracingSink {
    fn record(&self, event: &MetricEvent) -> Result<(), MetricError> {
        let json = serde_json::to_string(event).map_err(|e| MetricError::Rejected {
            event: event.name.clone(),
            reason: e.to_string(),
        })?;
        tracing::info!(target: "apimig::metrics", "{}", json);
        Ok(())
    }
}
