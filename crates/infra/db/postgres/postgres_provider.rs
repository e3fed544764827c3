use std::sync::RwLock;

use async_trait::async_trait;
use diesel::{Connection, PgConnection};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::repositories::connection_provider::{ConnectionProvider, StoreError};
use crate::infra::db::postgres::postgres_connection::PgPoolSquad;

/// Separates failures of the unit from failures of the transaction itself.
enum TxError<E> {
    Unit(E),
    Store(diesel::result::Error),
    Cancelled,
}

impl<E> From<diesel::result::Error> for TxError<E> {
    fn from(value: diesel::result::Error) -> Self {
        TxError::Store(value)
    }
}

pub struct PostgresProvider {
    db_pool: RwLock<Option<PgPoolSquad>>,
}

impl PostgresProvider {
    pub fn new(db_pool: PgPoolSquad) -> Self {
        Self {
            db_pool: RwLock::new(Some(db_pool)),
        }
    }

    fn pool(&self) -> Result<PgPoolSquad, StoreError> {
        let guard = self.db_pool.read().map_err(|_| StoreError::Closed)?;
        guard.as_ref().cloned().ok_or(StoreError::Closed)
    }
}

/// Runs `work` on the blocking pool. The token handed to `work` is cancelled as soon as the
/// caller drops the returned future, so the unit can stop before it writes or commits.
async fn run_blocking<T, E, F>(work: F) -> Result<T, E>
where
    T: Send + 'static,
    E: From<StoreError> + Send + 'static,
    F: FnOnce(&CancellationToken) -> Result<T, E> + Send + 'static,
{
    let token = CancellationToken::new();
    let _cancel_on_drop = token.clone().drop_guard();

    tokio::task::spawn_blocking(move || work(&token))
        .await
        .map_err(|err| E::from(StoreError::from(err)))?
}

fn ensure_live(token: &CancellationToken) -> Result<(), StoreError> {
    if token.is_cancelled() {
        debug!("postgres: caller went away, abandoning unit of work");
        return Err(StoreError::Cancelled);
    }
    Ok(())
}

#[async_trait]
impl ConnectionProvider for PostgresProvider {
    type Connection = PgConnection;

    async fn execute<T, E, F>(&self, unit: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
        F: FnOnce(&mut Self::Connection) -> Result<T, E> + Send + 'static,
    {
        let db_pool = self.pool()?;

        run_blocking(move |token| {
            let mut pooled = db_pool.get().map_err(StoreError::from)?;
            ensure_live(token)?;
            debug!("postgres: running unit of work");
            unit(&mut pooled)
        })
        .await
    }

    async fn execute_tx<T, E, F>(&self, unit: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
        F: FnOnce(&mut Self::Connection) -> Result<T, E> + Send + 'static,
    {
        let db_pool = self.pool()?;

        run_blocking(move |token| {
            let mut pooled = db_pool.get().map_err(StoreError::from)?;
            ensure_live(token)?;
            let conn: &mut PgConnection = &mut pooled;

            debug!("postgres: beginning transaction");
            let result = conn.transaction::<T, TxError<E>, _>(|tx| {
                let value = unit(tx).map_err(TxError::Unit)?;
                // Nothing may commit once the caller stopped waiting for the outcome.
                ensure_live(token).map_err(|_| TxError::Cancelled)?;
                Ok(value)
            });

            match result {
                Ok(value) => {
                    debug!("postgres: transaction committed");
                    Ok(value)
                }
                Err(TxError::Unit(err)) => {
                    debug!("postgres: transaction rolled back");
                    Err(err)
                }
                Err(TxError::Store(err)) => {
                    warn!(db_error = ?err, "postgres: transaction failed");
                    Err(E::from(StoreError::from(err)))
                }
                Err(TxError::Cancelled) => {
                    warn!("postgres: transaction rolled back, caller was cancelled");
                    Err(E::from(StoreError::Cancelled))
                }
            }
        })
        .await
    }

    fn close(&self) {
        let mut guard = match self.db_pool.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if guard.take().is_some() {
            info!("postgres: connection pool released");
        } else {
            debug!("postgres: connection pool already released");
        }
    }
}
