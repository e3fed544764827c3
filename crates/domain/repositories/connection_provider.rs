use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinError;

/// Failures raised by the store itself, independent of what the unit of work was doing.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to acquire a pooled connection")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("query failed")]
    Query(#[source] diesel::result::Error),
    #[error("statement was cancelled")]
    Cancelled,
    #[error("connection provider is closed")]
    Closed,
}

impl StoreError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StoreError::Cancelled)
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(value: diesel::result::Error) -> Self {
        // Postgres reports statement_timeout and pg_cancel_backend as 57014 query_canceled,
        // which diesel does not classify. The pool pins lc_messages to 'C' so the text is
        // stable.
        if let diesel::result::Error::DatabaseError(_, info) = &value {
            if info.message().starts_with("canceling statement") {
                return StoreError::Cancelled;
            }
        }
        StoreError::Query(value)
    }
}

impl From<JoinError> for StoreError {
    fn from(value: JoinError) -> Self {
        if value.is_panic() {
            std::panic::resume_unwind(value.into_panic());
        }
        StoreError::Cancelled
    }
}

/// Runs units of work against pooled connections.
///
/// A unit receives exclusive use of one connection for its whole duration. Errors returned
/// by the unit are handed back unchanged; failures of the provider itself (pool exhaustion,
/// commit errors, a closed provider) are converted through `From<StoreError>`. Nothing is
/// retried.
#[async_trait]
pub trait ConnectionProvider: Send + Sync + 'static {
    type Connection: 'static;

    /// Runs `unit` outside of an explicit transaction; each statement commits on its own.
    async fn execute<T, E, F>(&self, unit: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
        F: FnOnce(&mut Self::Connection) -> Result<T, E> + Send + 'static;

    /// Runs `unit` inside a transaction that commits only when the unit returns `Ok`.
    async fn execute_tx<T, E, F>(&self, unit: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
        F: FnOnce(&mut Self::Connection) -> Result<T, E> + Send + 'static;

    /// Releases the pool. Calling it again is a no-op.
    fn close(&self);
}
