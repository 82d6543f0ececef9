//! Traced database connection wrapper.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr,
    ExecResult, IsolationLevel, QueryResult, Statement, StreamTrait, TransactionError,
    TransactionTrait,
};
use tracing::{Instrument, Span};

use crate::config::TracingConfig;
use crate::method::Method;
use crate::metrics::record_metric;
use crate::span::{mark_span_error, mark_span_ok, record_span_error, start_span};

/// A traced wrapper around SeaORM's `DatabaseConnection`.
///
/// This wrapper implements `ConnectionTrait`, `StreamTrait`, and `TransactionTrait`,
/// making it a drop-in replacement for `DatabaseConnection`. Every operation records
/// a `db.sql.latency` measurement and, when a parent span exists (or root spans are
/// allowed), runs inside a client span.
///
/// # Span Nesting
///
/// Spans created by `TracedConnection` become children of the current tracing span.
/// If you're using tracing middleware in your web framework (e.g., `tower-http`'s
/// `TraceLayer`), database spans will appear nested under HTTP request spans.
///
/// # Example
///
/// ```rust,ignore
/// use sea_orm::Database;
/// use sea_orm_otel::TracedConnection;
///
/// let db = Database::connect("postgres://localhost/mydb").await?;
/// let traced = TracedConnection::from(db);
///
/// let users = Users::find().all(&traced).await?;
/// ```
///
/// Clones share the same underlying connection.
#[derive(Debug, Clone)]
pub struct TracedConnection {
    inner: Arc<DatabaseConnection>,
    config: Arc<TracingConfig>,
}

impl TracedConnection {
    /// Create a new traced connection with the given configuration.
    pub fn new(connection: DatabaseConnection, config: TracingConfig) -> Self {
        Self::with_shared_config(connection, Arc::new(config))
    }

    /// Create a traced connection sharing an existing configuration.
    pub fn with_shared_config(connection: DatabaseConnection, config: Arc<TracingConfig>) -> Self {
        Self {
            inner: Arc::new(connection),
            config,
        }
    }

    /// Create a new traced connection with default configuration.
    pub fn wrap(connection: DatabaseConnection) -> Self {
        Self::new(connection, TracingConfig::default())
    }

    /// Get a reference to the underlying `DatabaseConnection`.
    pub fn inner(&self) -> &DatabaseConnection {
        &self.inner
    }

    /// Get the tracing configuration.
    pub fn config(&self) -> &TracingConfig {
        &self.config
    }

    /// Consume the wrapper and return the inner `DatabaseConnection`.
    ///
    /// Fails, handing the wrapper back, while clones of it are still alive.
    pub fn into_inner(self) -> Result<DatabaseConnection, Self> {
        let Self { inner, config } = self;
        Arc::try_unwrap(inner).map_err(|inner| Self { inner, config })
    }

    /// Check that the database is reachable.
    ///
    /// Spans are only created for pings when `SpanOptions::ping` is set.
    pub async fn ping(&self) -> Result<(), DbErr> {
        let metric = record_metric(
            &self.config.instruments,
            &self.config.attributes,
            Method::ConnPing,
        );
        let span = if self.config.span_options.ping {
            self.create_span(Method::ConnPing, None)
        } else {
            None
        };

        let result = self.inner.ping().instrument(or_none(&span)).await;

        if let Err(e) = &result {
            record_span_error(span.as_ref(), &self.config.span_options, Some(e));
        }
        metric.finish(result.is_ok());
        result
    }

    /// Get the database backend name for span attributes.
    fn db_system(&self) -> &'static str {
        match self.inner.get_database_backend() {
            DbBackend::Postgres => "postgresql",
            DbBackend::MySql => "mysql",
            DbBackend::Sqlite => "sqlite",
        }
    }

    fn create_span(&self, method: Method, sql: Option<&str>) -> Option<Span> {
        let span = start_span(&self.config, method, sql)?;
        span.record("db.system", self.db_system());
        Some(span)
    }

    /// Run one statement-level operation inside its span and measurement.
    async fn traced<T, F>(
        &self,
        method: Method,
        sql: Option<&str>,
        operation: F,
        row_count: impl FnOnce(&T) -> Option<u64>,
    ) -> Result<T, DbErr>
    where
        F: Future<Output = Result<T, DbErr>>,
    {
        let metric = record_metric(&self.config.instruments, &self.config.attributes, method);
        let span = self.create_span(method, sql);
        let start = Instant::now();

        let result = operation.instrument(or_none(&span)).await;

        if let Some(span) = &span {
            let rows = result.as_ref().ok().and_then(row_count);
            self.record_result(span, &result, start, rows);
        }
        metric.finish(result.is_ok());

        result
    }

    /// Record the result of a database operation in the span.
    fn record_result<T>(
        &self,
        span: &Span,
        result: &Result<T, DbErr>,
        start: Instant,
        row_count: Option<u64>,
    ) {
        let duration_ms = start.elapsed().as_millis() as i64;
        span.record("db.duration_ms", duration_ms);

        if self.config.record_row_counts {
            if let Some(count) = row_count {
                span.record("db.rows_affected", count);
            }
        }

        if start.elapsed() > self.config.slow_query_threshold {
            span.record("slow_query", true);
            let threshold_ms = self.config.slow_query_threshold.as_millis() as i64;
            tracing::warn!(
                parent: span,
                duration_ms = duration_ms,
                threshold_ms = threshold_ms,
                "Slow query detected"
            );
        }

        match result {
            Ok(_) => mark_span_ok(span),
            Err(e) => record_span_error(Some(span), &self.config.span_options, Some(e)),
        }
    }

    fn record_transaction_result<T, E: Display>(
        &self,
        span: Option<&Span>,
        result: &Result<T, TransactionError<E>>,
    ) {
        let Some(span) = span else {
            return;
        };
        match result {
            Ok(_) => mark_span_ok(span),
            Err(TransactionError::Connection(e)) => {
                record_span_error(Some(span), &self.config.span_options, Some(e))
            }
            Err(TransactionError::Transaction(e)) => {
                mark_span_error(span, &e.to_string(), std::any::type_name::<E>())
            }
        }
    }
}

fn or_none(span: &Option<Span>) -> Span {
    span.clone().unwrap_or_else(Span::none)
}

impl From<DatabaseConnection> for TracedConnection {
    fn from(connection: DatabaseConnection) -> Self {
        Self::wrap(connection)
    }
}

impl AsRef<DatabaseConnection> for TracedConnection {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.inner
    }
}

#[async_trait]
impl ConnectionTrait for TracedConnection {
    fn get_database_backend(&self) -> DbBackend {
        self.inner.get_database_backend()
    }

    async fn execute(&self, stmt: Statement) -> Result<ExecResult, DbErr> {
        let sql = stmt.sql.clone();
        self.traced(
            Method::ConnExec,
            Some(&sql),
            self.inner.execute(stmt),
            |r| Some(r.rows_affected()),
        )
        .await
    }

    async fn execute_unprepared(&self, sql: &str) -> Result<ExecResult, DbErr> {
        self.traced(
            Method::ConnExec,
            Some(sql),
            self.inner.execute_unprepared(sql),
            |r| Some(r.rows_affected()),
        )
        .await
    }

    async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, DbErr> {
        let sql = stmt.sql.clone();
        self.traced(
            Method::ConnQuery,
            Some(&sql),
            self.inner.query_one(stmt),
            |row| Some(row.is_some() as u64),
        )
        .await
    }

    async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, DbErr> {
        let sql = stmt.sql.clone();
        self.traced(
            Method::ConnQuery,
            Some(&sql),
            self.inner.query_all(stmt),
            |rows| Some(rows.len() as u64),
        )
        .await
    }

    fn support_returning(&self) -> bool {
        self.inner.support_returning()
    }

    fn is_mock_connection(&self) -> bool {
        self.inner.is_mock_connection()
    }
}

impl StreamTrait for TracedConnection {
    type Stream<'a> = <DatabaseConnection as StreamTrait>::Stream<'a>;

    fn stream<'a>(
        &'a self,
        stmt: Statement,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Stream<'a>, DbErr>> + 'a + Send>> {
        Box::pin(async move {
            let sql = stmt.sql.clone();
            // Row counts are unknown until the stream is drained.
            self.traced(Method::ConnQuery, Some(&sql), self.inner.stream(stmt), |_| None)
                .await
        })
    }
}

#[async_trait]
impl TransactionTrait for TracedConnection {
    async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        self.traced(Method::ConnBeginTx, None, self.inner.begin(), |_| None)
            .await
    }

    async fn begin_with_config(
        &self,
        isolation_level: Option<IsolationLevel>,
        access_mode: Option<AccessMode>,
    ) -> Result<DatabaseTransaction, DbErr> {
        self.traced(
            Method::ConnBeginTx,
            None,
            self.inner.begin_with_config(isolation_level, access_mode),
            |_| None,
        )
        .await
    }

    async fn transaction<F, T, E>(&self, callback: F) -> Result<T, TransactionError<E>>
    where
        F: for<'c> FnOnce(
                &'c DatabaseTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
        T: Send,
        E: std::fmt::Display + std::fmt::Debug + Send,
    {
        let metric = record_metric(
            &self.config.instruments,
            &self.config.attributes,
            Method::ConnTransaction,
        );
        let span = self.create_span(Method::ConnTransaction, None);

        let result = self
            .inner
            .transaction(callback)
            .instrument(or_none(&span))
            .await;

        self.record_transaction_result(span.as_ref(), &result);
        metric.finish(result.is_ok());
        result
    }

    async fn transaction_with_config<F, T, E>(
        &self,
        callback: F,
        isolation_level: Option<IsolationLevel>,
        access_mode: Option<AccessMode>,
    ) -> Result<T, TransactionError<E>>
    where
        F: for<'c> FnOnce(
                &'c DatabaseTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
        T: Send,
        E: std::fmt::Display + std::fmt::Debug + Send,
    {
        let metric = record_metric(
            &self.config.instruments,
            &self.config.attributes,
            Method::ConnTransaction,
        );
        let span = self.create_span(Method::ConnTransaction, None);

        let result = self
            .inner
            .transaction_with_config(callback, isolation_level, access_mode)
            .instrument(or_none(&span))
            .await;

        self.record_transaction_result(span.as_ref(), &result);
        metric.finish(result.is_ok());
        result
    }
}

/// Extension trait for easy wrapping of database connections.
pub trait TracingExt {
    /// Wrap this connection with tracing instrumentation.
    fn with_tracing(self) -> TracedConnection;

    /// Wrap this connection with custom tracing configuration.
    fn with_tracing_config(self, config: TracingConfig) -> TracedConnection;
}

impl TracingExt for DatabaseConnection {
    fn with_tracing(self) -> TracedConnection {
        TracedConnection::wrap(self)
    }

    fn with_tracing_config(self, config: TracingConfig) -> TracedConnection {
        TracedConnection::new(self, config)
    }
}
