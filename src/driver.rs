//! The driver side of a traced connector.

use std::sync::Arc;

use crate::config::TracingConfig;

/// A driver paired with the instrumentation configuration.
///
/// [`TracedConnector::driver`](crate::Connector::driver) hands this out as the
/// back-reference to the owning driver, so code holding only the connector
/// still reaches both the original driver and the shared configuration.
#[derive(Debug, Clone)]
pub struct TracedDriver<D> {
    inner: D,
    config: Arc<TracingConfig>,
}

impl<D> TracedDriver<D> {
    pub fn new(inner: D, config: Arc<TracingConfig>) -> Self {
        Self { inner, config }
    }

    /// The wrapped driver.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn config(&self) -> &TracingConfig {
        &self.config
    }

    pub(crate) fn shared_config(&self) -> &Arc<TracingConfig> {
        &self.config
    }
}
