//! Driver errors and the retry signal.

use sea_orm::DbErr;
use thiserror::Error;

/// An error a [`Connector`](crate::Connector) can fail with.
///
/// Drivers have one well-known value that tells the calling pool to discard
/// the attempt and retry with a fresh connection. It is expected control flow
/// rather than a fault, so spans are not marked as errored for it unless
/// [`SpanOptions::disable_err_skip`](crate::SpanOptions::disable_err_skip) is
/// set.
pub trait DriverError: std::error::Error + Send + Sync + 'static {
    /// Whether this value is the driver's retry signal.
    fn is_retry_signal(&self) -> bool {
        false
    }
}

impl DriverError for DbErr {}

/// Errors returned by hand-written connectors.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The retry signal.
    #[error("driver: skip fast-path; continue as if unimplemented")]
    Skip,
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl DriverError for ConnectError {
    fn is_retry_signal(&self) -> bool {
        matches!(self, ConnectError::Skip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_skip_is_retry_signal() {
        assert!(ConnectError::Skip.is_retry_signal());
        assert!(!ConnectError::Db(DbErr::Custom("boom".into())).is_retry_signal());
        assert!(!DbErr::Custom("boom".into()).is_retry_signal());
    }

    #[test]
    fn test_db_errors_pass_through_display() {
        let err: ConnectError = DbErr::Custom("boom".into()).into();
        assert_eq!(err.to_string(), DbErr::Custom("boom".into()).to_string());
    }
}
