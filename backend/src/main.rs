use anyhow::Result;
use std::sync::Arc;
use subscription_api::{
    axum_http::http_serve, config::config_loader, usecases::subscriptions::SubscriptionUseCase,
};
use subscription_core::infra::db::{
    postgres::{
        postgres_connection::{self, PoolSettings},
        postgres_provider::PostgresProvider,
    },
    repositories::subscriptions::SubscriptionPostgres,
};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        // Startup can fail before a subscriber is installed.
        if tracing::dispatcher::has_been_set() {
            error!("Backend exited with error: {:#}", error);
        } else {
            eprintln!("Backend exited with error: {:#}", error);
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    subscription_core::observability::init_observability("backend")?;

    let dotenvy_env = config_loader::load()?;
    info!(stage = %dotenvy_env.stage, "ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        PoolSettings {
            max_connections: dotenvy_env.database.max_connections,
            statement_timeout: dotenvy_env.database.statement_timeout,
        },
    )?;
    info!(
        max_connections = dotenvy_env.database.max_connections,
        "Postgres connection has been established"
    );

    let subscription_usecase = Arc::new(SubscriptionUseCase::new(
        Arc::new(PostgresProvider::new(postgres_pool)),
        Arc::new(SubscriptionPostgres::new()),
    ));

    let served = http_serve::start(Arc::new(dotenvy_env), Arc::clone(&subscription_usecase)).await;
    subscription_usecase.close();

    served
}
