//! # sea-orm-otel
//!
//! OpenTelemetry-compatible tracing and metrics for SeaORM connection establishment
//! and database operations.
//!
//! Every attempt to open a new physical connection is observable: it runs inside a
//! client span (when a parent span exists, or root spans are allowed) and records a
//! `db.sql.latency` measurement tagged with the method name and your static attributes.
//! Connections opened this way are themselves instrumented, so every statement gets
//! the same treatment.
//!
//! ## Features
//!
//! - **Connector instrumentation**: wrap any [`Connector`] with [`TracedConnector`]
//! - **Retry-aware error policy**: the driver's retry signal is not reported as a failure
//!   unless you ask for it, and a custom predicate can override the policy entirely
//! - **Proper Span Nesting**: database spans appear as children of HTTP request spans
//! - **Metrics**: one latency measurement per call on every exit path, cancellation included
//! - **Errors untouched**: whatever the driver returned is what you get back
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use opentelemetry::KeyValue;
//! use sea_orm_otel::TracingConfig;
//!
//! let config = TracingConfig::default()
//!     .with_attribute(KeyValue::new("db.system", "postgresql"));
//!
//! // Traced connect, traced connection
//! let db = sea_orm_otel::connect("postgres://localhost/mydb", config).await?;
//!
//! let users = Users::find().all(&db).await?;
//! ```
//!
//! ## Error policy
//!
//! ```rust
//! use sea_orm_otel::{ConnectError, SpanOptions};
//!
//! // Report everything, the retry signal included.
//! let strict = SpanOptions::default().with_disable_err_skip(true);
//!
//! // Or decide per error.
//! let custom = SpanOptions::default().with_record_error(|err| {
//!     !matches!(err.downcast_ref::<ConnectError>(), Some(ConnectError::Skip))
//! });
//! ```
//!
//! ## Span Attributes
//!
//! | Attribute | Description |
//! |-----------|-------------|
//! | `db.method` | Method name, e.g. `sql.connector.connect` |
//! | `db.system` | "postgresql", "mysql", or "sqlite" (statement spans) |
//! | `db.name` | Database name (when configured) |
//! | `db.statement` | Full SQL query (when enabled) |
//! | `db.rows_affected` | Number of rows returned/affected |
//! | `otel.status_code` | "OK" or "ERROR" |
//! | `error.message` | Error details (on failure) |
//! | `error.type` | Error type name (on failure) |
//!
//! Attributes from [`TracingConfig::attributes`] are added through
//! `tracing-opentelemetry`.

mod config;
mod connection;
mod connector;
mod database;
mod driver;
mod error;
mod method;
mod metrics;
mod span;

#[cfg(test)]
mod test_support;

pub use config::{RecordErrorFn, SpanOptions, TracingConfig, INSTRUMENTATION_NAME};
pub use connection::{TracedConnection, TracingExt};
pub use connector::{Connector, ConnectorExt, TracedConnector, WrapConnection};
pub use database::{connect, SeaOrmConnector};
pub use driver::TracedDriver;
pub use error::{ConnectError, DriverError};
pub use method::{DefaultSpanNameFormatter, Method, SpanNameFormatter};
pub use metrics::{record_metric, Instruments, MetricRecorder, METHOD_KEY, STATUS_KEY};
pub use span::{record_span_error, should_record_error};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ConnectError, Connector, ConnectorExt, SpanOptions, TracedConnection, TracedConnector,
        TracingConfig, TracingExt,
    };
}
