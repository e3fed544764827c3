use std::time::Duration;

use anyhow::Result;
use diesel::{
    Connection, PgConnection, RunQueryDsl,
    connection::CacheSize,
    r2d2::{ConnectionManager, CustomizeConnection, Error as R2d2Error, Pool},
};
use tracing::warn;

pub type PgPoolSquad = Pool<ConnectionManager<PgConnection>>;

#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub statement_timeout: Option<Duration>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            statement_timeout: None,
        }
    }
}

#[derive(Debug, Default)]
struct SessionSetup {
    statement_timeout: Option<Duration>,
}

impl CustomizeConnection<PgConnection, R2d2Error> for SessionSetup {
    fn on_acquire(&self, conn: &mut PgConnection) -> std::result::Result<(), R2d2Error> {
        conn.set_prepared_statement_cache_size(CacheSize::Disabled);

        // Cancellation is recognised by the English server message. Changing lc_messages
        // needs the SET privilege, so a refusal is only logged.
        if let Err(err) = diesel::sql_query("SET lc_messages = 'C'").execute(conn) {
            warn!(
                db_error = %err,
                "postgres: could not pin lc_messages; cancellations may surface as query errors"
            );
        }

        if let Some(timeout) = self.statement_timeout {
            diesel::sql_query(format!("SET statement_timeout = {}", timeout.as_millis()))
                .execute(conn)
                .map_err(R2d2Error::QueryError)?;
        }
        Ok(())
    }
}

pub fn establish_connection(database_url: &str, settings: PoolSettings) -> Result<PgPoolSquad> {
    let pool = Pool::builder()
        .max_size(settings.max_connections)
        .connection_customizer(Box::new(SessionSetup {
            statement_timeout: settings.statement_timeout,
        }))
        .build(pool_manager(database_url))?;
    Ok(pool)
}

/// Builds the pool without opening a connection up front.
pub fn lazy_connection(database_url: &str, settings: PoolSettings) -> PgPoolSquad {
    Pool::builder()
        .max_size(settings.max_connections)
        .min_idle(Some(0))
        .connection_customizer(Box::new(SessionSetup {
            statement_timeout: settings.statement_timeout,
        }))
        .build_unchecked(pool_manager(database_url))
}

fn pool_manager(database_url: &str) -> ConnectionManager<PgConnection> {
    ConnectionManager::<PgConnection>::new(database_url)
}
