//! Span creation and error recording.

use tracing::{field, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::{SpanOptions, TracingConfig};
use crate::error::DriverError;
use crate::method::Method;

/// Whether a span may be started here: either root spans are allowed or the
/// caller is inside a live span.
pub fn should_start_span(options: &SpanOptions) -> bool {
    options.allow_root || !Span::current().is_none()
}

/// Start a client span for `method`, or return `None` when there is no parent
/// span and root spans are not allowed.
///
/// `statement` is recorded as `db.statement` only when statement logging is
/// enabled.
pub fn start_span(
    config: &TracingConfig,
    method: Method,
    statement: Option<&str>,
) -> Option<Span> {
    if !should_start_span(&config.span_options) {
        return None;
    }

    let span_name = config
        .span_name_formatter
        .format(method, statement.unwrap_or_default());

    let span = tracing::info_span!(
        "db.client",
        otel.name = %span_name,
        otel.kind = "client",
        db.method = %method,
        db.system = field::Empty,
        db.name = field::Empty,
        db.statement = field::Empty,
        db.rows_affected = field::Empty,
        db.duration_ms = field::Empty,
        otel.status_code = field::Empty,
        otel.status_message = field::Empty,
        error.message = field::Empty,
        error.type = field::Empty,
        slow_query = field::Empty,
    );

    for attribute in &config.attributes {
        span.set_attribute(attribute.key.clone(), attribute.value.clone());
    }

    if let Some(db_name) = &config.database_name {
        span.record("db.name", db_name.as_str());
    }

    if config.log_statements {
        if let Some(sql) = statement {
            span.record("db.statement", sql);
        }
    }

    Some(span)
}

/// Decide whether `err` marks its span as errored.
///
/// A configured [`SpanOptions::record_error`] predicate decides alone.
/// Otherwise every error counts except the driver's retry signal, which only
/// counts with [`SpanOptions::disable_err_skip`].
pub fn should_record_error<E: DriverError>(options: &SpanOptions, err: Option<&E>) -> bool {
    let Some(err) = err else {
        return false;
    };

    if let Some(record_error) = &options.record_error {
        let err: &(dyn std::error::Error + 'static) = err;
        return record_error(err);
    }

    !(err.is_retry_signal() && !options.disable_err_skip)
}

/// Record `err` on `span` according to `options`.
///
/// A missing span or a missing error is a no-op.
pub fn record_span_error<E: DriverError>(
    span: Option<&Span>,
    options: &SpanOptions,
    err: Option<&E>,
) {
    let (Some(span), Some(e)) = (span, err) else {
        return;
    };

    if should_record_error(options, err) {
        mark_span_error(span, &e.to_string(), std::any::type_name::<E>());
    } else {
        tracing::debug!(parent: span, error = %e, "Error not recorded on span");
    }
}

/// Set error status, message and kind on `span` unconditionally.
///
/// Used directly for errors that bypass the policy, such as a transaction
/// callback's own error.
pub fn mark_span_error(span: &Span, message: &str, kind: &str) {
    span.record("otel.status_code", "ERROR");
    span.record("otel.status_message", message);
    span.record("error.message", message);
    span.record("error.type", kind);
    tracing::error!(parent: span, error = %message, "Database call failed");
}

/// Set OK status on `span`.
pub fn mark_span_ok(span: &Span) {
    span.record("otel.status_code", "OK");
}
