use mockall::automock;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::subscriptions::SubscriptionEntity;
use crate::domain::repositories::connection_provider::StoreError;
use crate::domain::value_objects::subscriptions::{CostWindow, LatestPeriodEnd};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("subscription repository: create failed")]
    CreateFailed(#[source] StoreError),
    #[error("subscription repository: period overlaps the current one")]
    OverlapRejected,
    #[error("subscription repository: read failed")]
    ReadFailed(#[source] StoreError),
    #[error("subscription repository: get latest failed")]
    GetLatestFailed(#[source] StoreError),
    #[error("subscription repository: no active subscription")]
    NoActiveSubscription,
    #[error("subscription repository: update failed")]
    UpdateFailed(#[source] StoreError),
    #[error("subscription repository: no subscription found to update")]
    NothingToUpdate,
    #[error("subscription repository: delete failed")]
    DeleteFailed(#[source] StoreError),
    #[error("subscription repository: no subscription found to delete")]
    NothingToDelete,
    #[error("subscription repository: total cost failed")]
    TotalCostFailed(#[source] StoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RepositoryError {
    /// The store failure behind this error, if it was caused by one.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            RepositoryError::CreateFailed(err)
            | RepositoryError::ReadFailed(err)
            | RepositoryError::GetLatestFailed(err)
            | RepositoryError::UpdateFailed(err)
            | RepositoryError::DeleteFailed(err)
            | RepositoryError::TotalCostFailed(err)
            | RepositoryError::Store(err) => Some(err),
            RepositoryError::OverlapRejected
            | RepositoryError::NoActiveSubscription
            | RepositoryError::NothingToUpdate
            | RepositoryError::NothingToDelete => None,
        }
    }
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Subscription periods keyed by `(user_id, service_name, subs_start_date)`.
///
/// Every operation runs on a connection handed out by a
/// [`ConnectionProvider`](crate::domain::repositories::connection_provider::ConnectionProvider),
/// so several calls can share one transaction. The current period of a line is always the
/// row with the greatest start date.
#[automock]
pub trait SubscriptionRepository<C: 'static> {
    /// Inserts a period unless the line already has an open or overlapping one.
    fn create(&self, conn: &mut C, subscription: &SubscriptionEntity) -> RepositoryResult<()>;

    fn read_all_by_user_id(
        &self,
        conn: &mut C,
        user_id: Uuid,
    ) -> RepositoryResult<Vec<SubscriptionEntity>>;

    /// Most recent period across every line of the user.
    fn get_latest(&self, conn: &mut C, user_id: Uuid) -> RepositoryResult<SubscriptionEntity>;

    fn get_latest_subscription_date(
        &self,
        conn: &mut C,
        user_id: Uuid,
        service_name: &str,
    ) -> RepositoryResult<LatestPeriodEnd>;

    fn current_period(
        &self,
        conn: &mut C,
        user_id: Uuid,
        service_name: &str,
    ) -> RepositoryResult<Option<SubscriptionEntity>>;

    /// Sets cost and end date on the current period of the line. The start date of
    /// `subscription` is not used for selection.
    fn update(&self, conn: &mut C, subscription: &SubscriptionEntity) -> RepositoryResult<()>;

    fn delete(&self, conn: &mut C, user_id: Uuid, service_name: &str) -> RepositoryResult<()>;

    /// Costs of every period on the line that intersects `window`.
    fn all_matching_subscriptions_for_period(
        &self,
        conn: &mut C,
        user_id: Uuid,
        service_name: &str,
        window: CostWindow,
    ) -> RepositoryResult<Vec<i32>>;
}

