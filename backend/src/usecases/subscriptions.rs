use std::sync::Arc;

use subscription_core::domain::{
    entities::subscriptions::SubscriptionEntity,
    repositories::{
        connection_provider::{ConnectionProvider, StoreError},
        subscriptions::{RepositoryError, SubscriptionRepository},
    },
    value_objects::subscriptions::{CostWindow, PeriodError, SubscriptionModel},
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;


/// Coarse classification of a [`SubscriptionError`] for callers that only need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    OverlapRejected,
    InvalidInput,
    NotFound,
    NothingToDelete,
    Cancelled,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("previous subscription has not ended")]
    OverlapRejected,
    #[error("invalid subscription period: {0}")]
    InvalidPeriod(#[from] PeriodError),
    #[error("no active subscription")]
    NoActiveSubscription,
    #[error("no subscription found to delete")]
    NothingToDelete,
    #[error("subscription storage failed")]
    Infrastructure(#[source] RepositoryError),
}

impl SubscriptionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubscriptionError::OverlapRejected => ErrorKind::OverlapRejected,
            SubscriptionError::InvalidPeriod(_) => ErrorKind::InvalidInput,
            SubscriptionError::NoActiveSubscription => ErrorKind::NotFound,
            SubscriptionError::NothingToDelete => ErrorKind::NothingToDelete,
            SubscriptionError::Infrastructure(err) => {
                if err.store_error().is_some_and(StoreError::is_cancelled) {
                    ErrorKind::Cancelled
                } else {
                    ErrorKind::Infrastructure
                }
            }
        }
    }

    pub fn is_infrastructure(&self) -> bool {
        matches!(self, SubscriptionError::Infrastructure(_))
    }
}

impl From<RepositoryError> for SubscriptionError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::OverlapRejected => SubscriptionError::OverlapRejected,
            RepositoryError::NoActiveSubscription | RepositoryError::NothingToUpdate => {
                SubscriptionError::NoActiveSubscription
            }
            RepositoryError::NothingToDelete => SubscriptionError::NothingToDelete,
            other => SubscriptionError::Infrastructure(other),
        }
    }
}

impl From<StoreError> for SubscriptionError {
    fn from(value: StoreError) -> Self {
        SubscriptionError::Infrastructure(RepositoryError::Store(value))
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

/// Business rules for subscription lines. Every store access goes through the provider; no
/// state is kept between calls.
pub struct SubscriptionUseCase<P, R>
where
    P: ConnectionProvider,
    R: SubscriptionRepository<P::Connection> + Send + Sync + 'static,
{
    provider: Arc<P>,
    subscription_repo: Arc<R>,
}

impl<P, R> SubscriptionUseCase<P, R>
where
    P: ConnectionProvider,
    R: SubscriptionRepository<P::Connection> + Send + Sync + 'static,
{
    pub fn new(provider: Arc<P>, subscription_repo: Arc<R>) -> Self {
        Self {
            provider,
            subscription_repo,
        }
    }

    /// Opens a new period on the line. Rejected while the current period is open or ends
    /// after the new start date.
    pub async fn create(&self, subscription: SubscriptionModel) -> UseCaseResult<()> {
        let user_id = subscription.user_id;
        info!(
            %user_id,
            service_name = %subscription.service_name,
            start_date = %subscription.start_date,
            end_date = ?subscription.end_date,
            "subscriptions: create requested"
        );

        subscription
            .validate()
            .map_err(|err| self.report("create", user_id, err.into()))?;

        let subscription_repo = Arc::clone(&self.subscription_repo);
        let entity = SubscriptionEntity::from(subscription);

        self.provider
            .execute_tx(move |conn| -> UseCaseResult<()> {
                let latest_end = subscription_repo.get_latest_subscription_date(
                    conn,
                    entity.user_id,
                    &entity.service_name,
                )?;

                if latest_end.blocks(entity.subs_start_date) {
                    debug!(
                        user_id = %entity.user_id,
                        latest_end = ?latest_end,
                        "subscriptions: previous period has not ended"
                    );
                    return Err(SubscriptionError::OverlapRejected);
                }

                subscription_repo.create(conn, &entity)?;
                Ok(())
            })
            .await
            .map_err(|err| self.report("create", user_id, err))?;

        info!(%user_id, "subscriptions: period created");
        Ok(())
    }

    /// Changes cost and end date of the current period of the line.
    pub async fn update(&self, subscription: SubscriptionModel) -> UseCaseResult<()> {
        let user_id = subscription.user_id;
        info!(
            %user_id,
            service_name = %subscription.service_name,
            end_date = ?subscription.end_date,
            "subscriptions: update requested"
        );

        if subscription.cost < 0 {
            let err = PeriodError::NegativeCost(subscription.cost).into();
            return Err(self.report("update", user_id, err));
        }

        let subscription_repo = Arc::clone(&self.subscription_repo);
        let entity = SubscriptionEntity::from(subscription);

        self.provider
            .execute_tx(move |conn| -> UseCaseResult<()> {
                let current = subscription_repo
                    .current_period(conn, entity.user_id, &entity.service_name)?
                    .ok_or(SubscriptionError::NoActiveSubscription)?;

                if let Some(end) = entity.subs_end_date {
                    if end < current.subs_start_date {
                        return Err(PeriodError::EndBeforeStart {
                            start: current.subs_start_date,
                            end,
                        }
                        .into());
                    }
                }

                subscription_repo.update(conn, &entity)?;
                Ok(())
            })
            .await
            .map_err(|err| self.report("update", user_id, err))?;

        info!(%user_id, "subscriptions: current period updated");
        Ok(())
    }

    /// Removes the current period of the line.
    pub async fn delete(&self, user_id: Uuid, service_name: &str) -> UseCaseResult<()> {
        info!(%user_id, service_name, "subscriptions: delete requested");

        let subscription_repo = Arc::clone(&self.subscription_repo);
        let service_name = service_name.to_string();

        self.provider
            .execute_tx(move |conn| -> UseCaseResult<()> {
                subscription_repo.delete(conn, user_id, &service_name)?;
                Ok(())
            })
            .await
            .map_err(|err| self.report("delete", user_id, err))?;

        info!(%user_id, "subscriptions: current period deleted");
        Ok(())
    }

    pub async fn read_all_by_user_id(&self, user_id: Uuid) -> UseCaseResult<Vec<SubscriptionModel>> {
        info!(%user_id, "subscriptions: listing periods for user");

        let subscription_repo = Arc::clone(&self.subscription_repo);
        let subscriptions = self
            .provider
            .execute(move |conn| -> UseCaseResult<Vec<SubscriptionEntity>> {
                Ok(subscription_repo.read_all_by_user_id(conn, user_id)?)
            })
            .await
            .map_err(|err| self.report("read_all_by_user_id", user_id, err))?;

        let period_count = subscriptions.len();
        debug!(%user_id, period_count, "subscriptions: periods loaded");
        Ok(subscriptions.into_iter().map(SubscriptionModel::from).collect())
    }

    /// Most recent period across all of the user's lines.
    pub async fn get_latest(&self, user_id: Uuid) -> UseCaseResult<SubscriptionModel> {
        info!(%user_id, "subscriptions: loading latest period");

        let subscription_repo = Arc::clone(&self.subscription_repo);
        let latest = self
            .provider
            .execute(move |conn| -> UseCaseResult<SubscriptionEntity> {
                Ok(subscription_repo.get_latest(conn, user_id)?)
            })
            .await
            .map_err(|err| self.report("get_latest", user_id, err))?;

        Ok(SubscriptionModel::from(latest))
    }

    /// Sums the monthly cost of every period on the line that intersects `window`.
    pub async fn total_subscriptions_cost(
        &self,
        user_id: Uuid,
        service_name: &str,
        window: CostWindow,
    ) -> UseCaseResult<i64> {
        info!(
            %user_id,
            service_name,
            window_start = %window.start(),
            window_end = ?window.end(),
            "subscriptions: total cost requested"
        );

        let subscription_repo = Arc::clone(&self.subscription_repo);
        let service_name = service_name.to_string();

        let costs = self
            .provider
            .execute(move |conn| -> UseCaseResult<Vec<i32>> {
                Ok(subscription_repo.all_matching_subscriptions_for_period(
                    conn,
                    user_id,
                    &service_name,
                    window,
                )?)
            })
            .await
            .map_err(|err| self.report("total_subscriptions_cost", user_id, err))?;

        let total_cost: i64 = costs.iter().copied().map(i64::from).sum();
        info!(
            %user_id,
            matched_periods = costs.len(),
            total_cost,
            "subscriptions: total cost computed"
        );
        Ok(total_cost)
    }

    pub fn close(&self) {
        info!("subscriptions: closing connection provider");
        self.provider.close();
    }

    fn report(&self, operation: &'static str, user_id: Uuid, err: SubscriptionError) -> SubscriptionError {
        if err.is_infrastructure() {
            error!(
                %user_id,
                operation,
                kind = ?err.kind(),
                db_error = ?err,
                "subscriptions: storage failure"
            );
        } else {
            warn!(
                %user_id,
                operation,
                kind = ?err.kind(),
                error = %err,
                "subscriptions: request rejected"
            );
        }
        err
    }
}
