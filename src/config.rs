//! Configuration for tracing and metrics behavior.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::metrics::Meter;
use opentelemetry::{global, KeyValue};

use crate::method::{DefaultSpanNameFormatter, SpanNameFormatter};
use crate::metrics::Instruments;

/// Instrumentation scope name used for the default meter.
pub const INSTRUMENTATION_NAME: &str = "sea-orm-otel";

/// Predicate deciding whether an error marks its span as errored.
pub type RecordErrorFn = Arc<dyn Fn(&(dyn Error + 'static)) -> bool + Send + Sync>;

/// Controls when spans are created and how errors are recorded on them.
#[derive(Clone, Default)]
pub struct SpanOptions {
    /// Create spans even when there is no parent span.
    /// Default: `false`
    pub allow_root: bool,

    /// Create spans for `ping`.
    /// Default: `false`
    pub ping: bool,

    /// Never create a span for `sql.connector.connect`. The latency metric
    /// is still recorded.
    /// Default: `false`
    pub omit_connector_connect: bool,

    /// Mark spans as errored for the driver's retry signal too.
    /// Default: `false`
    pub disable_err_skip: bool,

    /// When set, decides alone whether a driver error marks its span as
    /// errored. Errors returned by a transaction callback are not driver
    /// errors and always mark the transaction span.
    /// Default: `None`
    pub record_error: Option<RecordErrorFn>,
}

impl SpanOptions {
    pub fn with_allow_root(mut self, enabled: bool) -> Self {
        self.allow_root = enabled;
        self
    }

    pub fn with_ping(mut self, enabled: bool) -> Self {
        self.ping = enabled;
        self
    }

    pub fn with_omit_connector_connect(mut self, enabled: bool) -> Self {
        self.omit_connector_connect = enabled;
        self
    }

    pub fn with_disable_err_skip(mut self, enabled: bool) -> Self {
        self.disable_err_skip = enabled;
        self
    }

    /// Set the error-recording predicate.
    ///
    /// It overrides every other rule, including the retry signal rule.
    pub fn with_record_error<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&(dyn Error + 'static)) -> bool + Send + Sync + 'static,
    {
        self.record_error = Some(Arc::new(predicate));
        self
    }
}

impl std::fmt::Debug for SpanOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpanOptions")
            .field("allow_root", &self.allow_root)
            .field("ping", &self.ping)
            .field("omit_connector_connect", &self.omit_connector_connect)
            .field("disable_err_skip", &self.disable_err_skip)
            .field("record_error", &self.record_error.is_some())
            .finish()
    }
}

/// Configuration options for database instrumentation.
///
/// Built once and shared by the connector and every connection it opens.
///
/// # Example
///
/// ```rust
/// use opentelemetry::KeyValue;
/// use sea_orm_otel::{SpanOptions, TracingConfig};
/// use std::time::Duration;
///
/// let config = TracingConfig::default()
///     .with_attribute(KeyValue::new("db.system", "postgresql"))
///     .with_span_options(SpanOptions::default().with_allow_root(true))
///     .with_slow_query_threshold(Duration::from_millis(100));
/// ```
#[derive(Clone)]
pub struct TracingConfig {
    /// Meter the instruments were built from.
    pub meter: Meter,

    /// Metric instruments.
    pub instruments: Instruments,

    /// Attributes put on every span and every measurement.
    /// Default: empty
    pub attributes: Vec<KeyValue>,

    /// Names spans.
    /// Default: [`DefaultSpanNameFormatter`]
    pub span_name_formatter: Arc<dyn SpanNameFormatter>,

    /// Span creation and error recording policy.
    pub span_options: SpanOptions,

    /// Whether to include the SQL statement in spans.
    /// Default: `false` (for security - prevents accidental credential logging)
    pub log_statements: bool,

    /// Whether to record the number of rows affected/returned.
    /// Default: `true`
    pub record_row_counts: bool,

    /// Threshold for logging slow queries at WARN level.
    /// Default: 500ms
    pub slow_query_threshold: Duration,

    /// Custom database name to include in spans (useful for multi-database setups).
    /// Default: `None`
    pub database_name: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        let meter = global::meter(INSTRUMENTATION_NAME);
        let instruments = Instruments::new(&meter);
        Self {
            meter,
            instruments,
            attributes: Vec::new(),
            span_name_formatter: Arc::new(DefaultSpanNameFormatter),
            span_options: SpanOptions::default(),
            log_statements: false,
            record_row_counts: true,
            slow_query_threshold: Duration::from_millis(500),
            database_name: None,
        }
    }
}

impl TracingConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific meter and rebuild the instruments from it.
    pub fn with_meter(mut self, meter: Meter) -> Self {
        self.instruments = Instruments::new(&meter);
        self.meter = meter;
        self
    }

    /// Append one static attribute.
    pub fn with_attribute(mut self, attribute: KeyValue) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Append static attributes.
    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = KeyValue>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// Set the span naming function.
    pub fn with_span_name_formatter(mut self, formatter: impl SpanNameFormatter + 'static) -> Self {
        self.span_name_formatter = Arc::new(formatter);
        self
    }

    pub fn with_span_options(mut self, options: SpanOptions) -> Self {
        self.span_options = options;
        self
    }

    /// Enable or disable SQL statement logging in spans.
    ///
    /// **Security Warning**: Enabling this may expose sensitive data in your traces
    /// if your queries contain credentials or PII in the SQL text itself.
    pub fn with_statement_logging(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Enable or disable row count recording.
    pub fn with_row_count_recording(mut self, enabled: bool) -> Self {
        self.record_row_counts = enabled;
        self
    }

    /// Set the threshold for slow query warnings.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    /// Set a database name to include in spans.
    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = Some(name.into());
        self
    }

    /// Create a development-friendly configuration: statements logged and
    /// root spans allowed.
    ///
    /// **Warning**: Do not use in production as it logs all SQL.
    pub fn development() -> Self {
        Self::default()
            .with_statement_logging(true)
            .with_slow_query_threshold(Duration::from_millis(100))
            .with_span_options(SpanOptions::default().with_allow_root(true))
    }

    /// Create a production-safe configuration with minimal overhead.
    pub fn production() -> Self {
        Self::default()
            .with_statement_logging(false)
            .with_slow_query_threshold(Duration::from_secs(1))
    }
}

impl std::fmt::Debug for TracingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracingConfig")
            .field("instruments", &self.instruments)
            .field("attributes", &self.attributes)
            .field("span_options", &self.span_options)
            .field("log_statements", &self.log_statements)
            .field("record_row_counts", &self.record_row_counts)
            .field("slow_query_threshold", &self.slow_query_threshold)
            .field("database_name", &self.database_name)
            .finish_non_exhaustive()
    }
}
