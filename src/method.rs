//! Logical method names and span naming.

/// The instrumented operation, used as the `method` metric attribute and as
/// the default span name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    ConnectorConnect,
    ConnPing,
    ConnExec,
    ConnQuery,
    ConnBeginTx,
    ConnTransaction,
}

impl Method {
    /// Returns the stable name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::ConnectorConnect => "sql.connector.connect",
            Method::ConnPing => "sql.conn.ping",
            Method::ConnExec => "sql.conn.exec",
            Method::ConnQuery => "sql.conn.query",
            Method::ConnBeginTx => "sql.conn.begin_tx",
            Method::ConnTransaction => "sql.conn.transaction",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Names spans.
///
/// `statement` is empty for operations that carry no SQL, such as
/// [`Method::ConnectorConnect`].
pub trait SpanNameFormatter: Send + Sync {
    fn format(&self, method: Method, statement: &str) -> String;
}

/// Uses the method name as the span name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSpanNameFormatter;

impl SpanNameFormatter for DefaultSpanNameFormatter {
    fn format(&self, method: Method, _statement: &str) -> String {
        method.as_str().to_string()
    }
}

impl<F> SpanNameFormatter for F
where
    F: Fn(Method, &str) -> String + Send + Sync,
{
    fn format(&self, method: Method, statement: &str) -> String {
        self(method, statement)
    }
}
