//! The connector contract and its traced decorator.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{Instrument, Span};

use crate::config::TracingConfig;
use crate::driver::TracedDriver;
use crate::error::DriverError;
use crate::method::Method;
use crate::metrics::record_metric;
use crate::span::{record_span_error, start_span};

/// Opens new physical connections to a database.
///
/// Cancelling a connect attempt is dropping its future.
#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: Send;
    type Error: DriverError;
    type Driver: Clone + Send + Sync;

    /// Open a new connection.
    async fn connect(&self) -> Result<Self::Connection, Self::Error>;

    /// The driver this connector belongs to.
    fn driver(&self) -> &Self::Driver;
}

/// Instruments a freshly opened connection with the connector's configuration.
pub trait WrapConnection {
    type Wrapped: Send;

    fn wrap_connection(self, config: Arc<TracingConfig>) -> Self::Wrapped;
}

/// A [`Connector`] that traces and measures every connect attempt of the
/// connector it wraps.
///
/// Each call to [`connect`](Connector::connect):
///
/// - records one `db.sql.latency` measurement with `method=sql.connector.connect`,
///   on every exit path including cancellation;
/// - starts a client span when there is a parent span or root spans are allowed,
///   and [`SpanOptions::omit_connector_connect`](crate::SpanOptions::omit_connector_connect)
///   is not set;
/// - marks the span as errored according to the configured error policy;
/// - returns the inner connector's error unchanged.
///
/// # Example
///
/// ```rust,ignore
/// use sea_orm::ConnectOptions;
/// use sea_orm_otel::{Connector, ConnectorExt, SeaOrmConnector, TracingConfig};
///
/// let connector = SeaOrmConnector::new(ConnectOptions::new("postgres://localhost/mydb"))
///     .traced(TracingConfig::default());
/// let db = connector.connect().await?;
/// ```
pub struct TracedConnector<C: Connector> {
    inner: C,
    driver: TracedDriver<C::Driver>,
}

impl<C: Connector + std::fmt::Debug> std::fmt::Debug for TracedConnector<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedConnector")
            .field("inner", &self.inner)
            .field("config", self.driver.config())
            .finish()
    }
}

impl<C: Connector> TracedConnector<C> {
    /// Wrap a connector with the given configuration.
    pub fn new(inner: C, config: TracingConfig) -> Self {
        Self::with_shared_config(inner, Arc::new(config))
    }

    /// Wrap a connector with a configuration shared with other wrappers.
    pub fn with_shared_config(inner: C, config: Arc<TracingConfig>) -> Self {
        let driver = TracedDriver::new(inner.driver().clone(), config);
        Self { inner, driver }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn config(&self) -> &TracingConfig {
        self.driver.config()
    }

    /// Consume the wrapper and return the inner connector.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

#[async_trait]
impl<C> Connector for TracedConnector<C>
where
    C: Connector,
    C::Connection: WrapConnection,
{
    type Connection = <C::Connection as WrapConnection>::Wrapped;
    type Error = C::Error;
    type Driver = TracedDriver<C::Driver>;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let config = self.driver.shared_config();
        let method = Method::ConnectorConnect;
        let metric = record_metric(&config.instruments, &config.attributes, method);

        let span = if config.span_options.omit_connector_connect {
            None
        } else {
            start_span(config, method, None)
        };

        let result = self
            .inner
            .connect()
            .instrument(span.clone().unwrap_or_else(Span::none))
            .await;

        match result {
            Ok(connection) => {
                metric.finish(true);
                Ok(connection.wrap_connection(config.clone()))
            }
            Err(err) => {
                record_span_error(span.as_ref(), &config.span_options, Some(&err));
                metric.finish(false);
                Err(err)
            }
        }
    }

    fn driver(&self) -> &Self::Driver {
        &self.driver
    }
}

/// Extension trait for wrapping any connector.
pub trait ConnectorExt: Connector + Sized {
    /// Trace and measure every connect attempt of this connector.
    fn traced(self, config: TracingConfig) -> TracedConnector<Self> {
        TracedConnector::new(self, config)
    }
}

impl<C: Connector> ConnectorExt for C {}
