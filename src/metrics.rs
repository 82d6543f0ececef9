//! Latency instruments and the deferred metric recorder.

use std::time::Instant;

use opentelemetry::metrics::{Histogram, Meter};
use opentelemetry::KeyValue;

use crate::method::Method;

/// Attribute key carrying the method name.
pub const METHOD_KEY: &str = "method";
/// Attribute key carrying `ok` or `error`.
pub const STATUS_KEY: &str = "status";

/// Metric instruments shared by every instrumented call.
#[derive(Clone)]
pub struct Instruments {
    /// Call latency in milliseconds.
    pub latency: Histogram<f64>,
}

impl Instruments {
    /// Build the instruments from a meter.
    pub fn new(meter: &Meter) -> Self {
        let latency = meter
            .f64_histogram("db.sql.latency")
            .with_description("The latency of calls in milliseconds")
            .with_unit("ms")
            .build();

        Self { latency }
    }
}

impl std::fmt::Debug for Instruments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instruments")
            .field("latency", &"db.sql.latency")
            .finish()
    }
}

/// Start timing a call. The returned recorder must be finished with the
/// outcome; dropping it unfinished records the call as failed.
pub fn record_metric<'a>(
    instruments: &'a Instruments,
    attributes: &'a [KeyValue],
    method: Method,
) -> MetricRecorder<'a> {
    MetricRecorder {
        instruments,
        attributes,
        method,
        start: Instant::now(),
        done: false,
    }
}

/// Records one latency measurement on every exit path.
pub struct MetricRecorder<'a> {
    instruments: &'a Instruments,
    attributes: &'a [KeyValue],
    method: Method,
    start: Instant,
    done: bool,
}

impl MetricRecorder<'_> {
    /// Record the measurement with the given outcome.
    pub fn finish(mut self, ok: bool) {
        self.record(ok);
    }

    fn record(&mut self, ok: bool) {
        if self.done {
            return;
        }
        self.done = true;

        let duration_ms = self.start.elapsed().as_nanos() as f64 / 1e6;
        let mut attributes = Vec::with_capacity(self.attributes.len() + 2);
        attributes.extend_from_slice(self.attributes);
        attributes.push(KeyValue::new(METHOD_KEY, self.method.as_str()));
        attributes.push(KeyValue::new(
            STATUS_KEY,
            if ok { "ok" } else { "error" },
        ));

        self.instruments.latency.record(duration_ms, &attributes);
    }
}

impl Drop for MetricRecorder<'_> {
    fn drop(&mut self) {
        // Cancelled before an outcome was known.
        self.record(false);
    }
}
