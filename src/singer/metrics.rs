use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

pub type Tags<'a> = BTreeMap<&'static str, &'a str>;

/// Observability hook for the tap. Nothing recorded here affects the output stream.
pub trait MetricsSink {
    fn counter(&self, metric: &str, value: u64, tags: &Tags<'_>);
    fn timer(&self, metric: &str, elapsed: Duration, tags: &Tags<'_>);
}

/// Discards every metric.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn counter(&self, _metric: &str, _value: u64, _tags: &Tags<'_>) {}
    fn timer(&self, _metric: &str, _elapsed: Duration, _tags: &Tags<'_>) {}
}

#[derive(Debug, Serialize)]
struct MetricLine<'a, V: Serialize> {
    #[serde(rename = "type")]
    kind: &'static str,
    metric: &'a str,
    value: V,
    tags: &'a Tags<'a>,
}

/// Emits Singer-style `METRIC: {...}` lines through `tracing`, which writes to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMetrics;

impl LogMetrics {
    fn emit<V: Serialize>(&self, line: &MetricLine<'_, V>) {
        match serde_json::to_string(line) {
            Ok(json) => info!("METRIC: {}", json),
            Err(e) => tracing::warn!(metric = line.metric, error = %e, "could not encode metric"),
        }
    }
}

impl MetricsSink for LogMetrics {
    fn counter(&self, metric: &str, value: u64, tags: &Tags<'_>) {
        self.emit(&MetricLine {
            kind: "counter",
            metric,
            value,
            tags,
        });
    }

    fn timer(&self, metric: &str, elapsed: Duration, tags: &Tags<'_>) {
        self.emit(&MetricLine {
            kind: "timer",
            metric,
            value: elapsed.as_secs_f64(),
            tags,
        });
    }
}
