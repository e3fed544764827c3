use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use subscription_core::{
    domain::{
        repositories::{
            connection_provider::ConnectionProvider, subscriptions::SubscriptionRepository,
        },
        value_objects::{
            billing_month::parse_billing_month,
            subscriptions::{
                CostWindow, InsertSubscriptionModel, SubscriptionDto, SubscriptionLineQuery,
                TotalCostDto, TotalCostQuery, UserQuery,
            },
        },
    },
    infra::db::{
        postgres::postgres_provider::PostgresProvider,
        repositories::subscriptions::SubscriptionPostgres,
    },
};
use tracing::info;

use crate::{axum_http::error_responses::AppError, usecases::subscriptions::SubscriptionUseCase};

type PgSubscriptionUseCase = SubscriptionUseCase<PostgresProvider, SubscriptionPostgres>;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

pub fn routes(subscription_usecase: Arc<PgSubscriptionUseCase>) -> Router {
    Router::new()
        .route(
            "/",
            get(read_all::<PostgresProvider, SubscriptionPostgres>)
                .post(create::<PostgresProvider, SubscriptionPostgres>)
                .put(update::<PostgresProvider, SubscriptionPostgres>)
                .delete(delete::<PostgresProvider, SubscriptionPostgres>),
        )
        .route(
            "/latest",
            get(get_latest::<PostgresProvider, SubscriptionPostgres>),
        )
        .route(
            "/total-cost",
            get(total_cost::<PostgresProvider, SubscriptionPostgres>),
        )
        .with_state(subscription_usecase)
}

pub async fn create<P, R>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<P, R>>>,
    Json(insert_subscription_model): Json<InsertSubscriptionModel>,
) -> Result<impl IntoResponse, AppError>
where
    P: ConnectionProvider,
    R: SubscriptionRepository<P::Connection> + Send + Sync + 'static,
{
    info!(
        user_id = %insert_subscription_model.user_id,
        service_name = %insert_subscription_model.name,
        "subscriptions router: create received"
    );

    let subscription = insert_subscription_model.into_model()?;
    subscription_usecase.create(subscription).await?;

    Ok((StatusCode::CREATED, MessageResponse::new("Subscription created")))
}

pub async fn update<P, R>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<P, R>>>,
    Json(insert_subscription_model): Json<InsertSubscriptionModel>,
) -> Result<impl IntoResponse, AppError>
where
    P: ConnectionProvider,
    R: SubscriptionRepository<P::Connection> + Send + Sync + 'static,
{
    info!(
        user_id = %insert_subscription_model.user_id,
        service_name = %insert_subscription_model.name,
        "subscriptions router: update received"
    );

    let subscription = insert_subscription_model.into_model()?;
    subscription_usecase.update(subscription).await?;

    Ok((StatusCode::OK, MessageResponse::new("Subscription updated")))
}

pub async fn delete<P, R>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<P, R>>>,
    Query(line): Query<SubscriptionLineQuery>,
) -> Result<impl IntoResponse, AppError>
where
    P: ConnectionProvider,
    R: SubscriptionRepository<P::Connection> + Send + Sync + 'static,
{
    info!(user_id = %line.id, service_name = %line.name, "subscriptions router: delete received");

    subscription_usecase.delete(line.id, &line.name).await?;

    Ok((StatusCode::OK, MessageResponse::new("Subscription deleted")))
}

pub async fn read_all<P, R>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<P, R>>>,
    Query(user): Query<UserQuery>,
) -> Result<impl IntoResponse, AppError>
where
    P: ConnectionProvider,
    R: SubscriptionRepository<P::Connection> + Send + Sync + 'static,
{
    let subscriptions = subscription_usecase.read_all_by_user_id(user.id).await?;
    let body: Vec<SubscriptionDto> = subscriptions.into_iter().map(SubscriptionDto::from).collect();

    Ok((StatusCode::OK, Json(body)))
}

pub async fn get_latest<P, R>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<P, R>>>,
    Query(user): Query<UserQuery>,
) -> Result<impl IntoResponse, AppError>
where
    P: ConnectionProvider,
    R: SubscriptionRepository<P::Connection> + Send + Sync + 'static,
{
    let latest = subscription_usecase.get_latest(user.id).await?;

    Ok((StatusCode::OK, Json(SubscriptionDto::from(latest))))
}

pub async fn total_cost<P, R>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<P, R>>>,
    Query(query): Query<TotalCostQuery>,
) -> Result<impl IntoResponse, AppError>
where
    P: ConnectionProvider,
    R: SubscriptionRepository<P::Connection> + Send + Sync + 'static,
{
    let window_start = parse_billing_month(&query.start_date)?;
    let window_end = query
        .end_date
        .as_deref()
        .map(parse_billing_month)
        .transpose()?;
    let window = CostWindow::new(window_start, window_end)?;

    let total_cost = subscription_usecase
        .total_subscriptions_cost(query.id, &query.name, window)
        .await?;

    Ok((StatusCode::OK, Json(TotalCostDto { total_cost })))
}
