//! The SeaORM connector.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbBackend, DbErr};

use crate::config::TracingConfig;
use crate::connection::TracedConnection;
use crate::connector::{Connector, TracedConnector, WrapConnection};

/// Opens SeaORM connections from a set of [`ConnectOptions`].
#[derive(Debug, Clone)]
pub struct SeaOrmConnector {
    options: ConnectOptions,
    backend: DbBackend,
}

impl SeaOrmConnector {
    pub fn new(options: impl Into<ConnectOptions>) -> Self {
        let options = options.into();
        let backend = backend_for_url(options.get_url());
        Self { options, backend }
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }
}

/// Infer the backend from the URL scheme.
///
/// Unknown schemes fall back to Postgres; connecting will fail for them anyway.
fn backend_for_url(url: &str) -> DbBackend {
    let scheme = url.split(':').next().unwrap_or_default().to_ascii_lowercase();
    match scheme.as_str() {
        "mysql" | "mariadb" => DbBackend::MySql,
        "sqlite" => DbBackend::Sqlite,
        _ => DbBackend::Postgres,
    }
}

#[async_trait]
impl Connector for SeaOrmConnector {
    type Connection = DatabaseConnection;
    type Error = DbErr;
    type Driver = DbBackend;

    async fn connect(&self) -> Result<DatabaseConnection, DbErr> {
        Database::connect(self.options.clone()).await
    }

    fn driver(&self) -> &DbBackend {
        &self.backend
    }
}

impl WrapConnection for DatabaseConnection {
    type Wrapped = TracedConnection;

    fn wrap_connection(self, config: Arc<TracingConfig>) -> TracedConnection {
        TracedConnection::with_shared_config(self, config)
    }
}

/// Open an instrumented database connection.
///
/// The connect attempt itself is traced and measured, and so is every
/// statement run on the returned connection.
///
/// ```rust,ignore
/// use sea_orm_otel::{connect, TracingConfig};
///
/// let db = connect("postgres://localhost/mydb", TracingConfig::default()).await?;
/// ```
pub async fn connect(
    options: impl Into<ConnectOptions>,
    config: TracingConfig,
) -> Result<TracedConnection, DbErr> {
    TracedConnector::new(SeaOrmConnector::new(options), config)
        .connect()
        .await
}
