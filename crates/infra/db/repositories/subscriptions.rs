use diesel::{
    OptionalExtension, PgConnection,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    sql_query,
    sql_types::{Date, Int4, Nullable, Text, Uuid as SqlUuid},
};
use tracing::debug;
use uuid::Uuid;

use crate::domain;
use crate::infra::db::postgres::schema::subscriptions;
use domain::{
    entities::subscriptions::SubscriptionEntity,
    repositories::subscriptions::{RepositoryError, RepositoryResult, SubscriptionRepository},
    value_objects::subscriptions::{CostWindow, LatestPeriodEnd},
};

/// Exclusion constraint that keeps periods of one line from overlapping.
pub const NO_OVERLAP_CONSTRAINT: &str = "subscriptions_no_overlap";

// The existence check and the insert are one statement; the exclusion constraint covers
// concurrent inserts that both pass the check. A new period may start on the previous end.
const INSERT_IF_NO_OVERLAP: &str = "
    INSERT INTO subscriptions (user_id, service_name, month_cost, subs_start_date, subs_end_date)
    SELECT $1, $2, $3, $4, $5
    WHERE NOT EXISTS (
        SELECT 1 FROM subscriptions
        WHERE user_id = $1
          AND service_name = $2
          AND (subs_end_date IS NULL OR subs_end_date > $4)
    )";

const UPDATE_CURRENT_PERIOD: &str = "
    UPDATE subscriptions
    SET month_cost = $3, subs_end_date = $4
    WHERE user_id = $1
      AND service_name = $2
      AND subs_start_date = (
          SELECT max(subs_start_date) FROM subscriptions
          WHERE user_id = $1 AND service_name = $2
      )";

const DELETE_CURRENT_PERIOD: &str = "
    DELETE FROM subscriptions
    WHERE user_id = $1
      AND service_name = $2
      AND subs_start_date = (
          SELECT max(subs_start_date) FROM subscriptions
          WHERE user_id = $1 AND service_name = $2
      )";

#[derive(Debug, Default, Clone, Copy)]
pub struct SubscriptionPostgres;

impl SubscriptionPostgres {
    pub fn new() -> Self {
        Self
    }
}

fn is_overlap_violation(err: &DieselError) -> bool {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => true,
        DieselError::DatabaseError(_, info) => info.constraint_name() == Some(NO_OVERLAP_CONSTRAINT),
        _ => false,
    }
}

impl SubscriptionRepository<PgConnection> for SubscriptionPostgres {
    fn create(
        &self,
        conn: &mut PgConnection,
        subscription: &SubscriptionEntity,
    ) -> RepositoryResult<()> {
        debug!(
            user_id = %subscription.user_id,
            service_name = %subscription.service_name,
            "subscription repository: creating period"
        );

        let inserted = sql_query(INSERT_IF_NO_OVERLAP)
            .bind::<SqlUuid, _>(subscription.user_id)
            .bind::<Text, _>(subscription.service_name.as_str())
            .bind::<Int4, _>(subscription.month_cost)
            .bind::<Date, _>(subscription.subs_start_date)
            .bind::<Nullable<Date>, _>(subscription.subs_end_date)
            .execute(conn)
            .map_err(|err| {
                if is_overlap_violation(&err) {
                    RepositoryError::OverlapRejected
                } else {
                    RepositoryError::CreateFailed(err.into())
                }
            })?;

        if inserted == 0 {
            return Err(RepositoryError::OverlapRejected);
        }
        Ok(())
    }

    fn read_all_by_user_id(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> RepositoryResult<Vec<SubscriptionEntity>> {
        debug!(%user_id, "subscription repository: reading by user id");

        subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .order((
                subscriptions::service_name.asc(),
                subscriptions::subs_start_date.asc(),
            ))
            .select(SubscriptionEntity::as_select())
            .load::<SubscriptionEntity>(conn)
            .map_err(|err| RepositoryError::ReadFailed(err.into()))
    }

    fn get_latest(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> RepositoryResult<SubscriptionEntity> {
        debug!(%user_id, "subscription repository: getting latest period");

        subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .order(subscriptions::subs_start_date.desc())
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(conn)
            .optional()
            .map_err(|err| RepositoryError::GetLatestFailed(err.into()))?
            .ok_or(RepositoryError::NoActiveSubscription)
    }

    fn get_latest_subscription_date(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        service_name: &str,
    ) -> RepositoryResult<LatestPeriodEnd> {
        debug!(
            %user_id,
            service_name,
            "subscription repository: getting latest period end"
        );

        let latest_end = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .filter(subscriptions::service_name.eq(service_name))
            .order(subscriptions::subs_start_date.desc())
            .select(subscriptions::subs_end_date)
            .first::<Option<chrono::NaiveDate>>(conn)
            .optional()
            .map_err(|err| RepositoryError::GetLatestFailed(err.into()))?;

        Ok(LatestPeriodEnd::from(latest_end))
    }

    fn current_period(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        service_name: &str,
    ) -> RepositoryResult<Option<SubscriptionEntity>> {
        debug!(
            %user_id,
            service_name,
            "subscription repository: getting current period"
        );

        subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .filter(subscriptions::service_name.eq(service_name))
            .order(subscriptions::subs_start_date.desc())
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(conn)
            .optional()
            .map_err(|err| RepositoryError::ReadFailed(err.into()))
    }

    fn update(
        &self,
        conn: &mut PgConnection,
        subscription: &SubscriptionEntity,
    ) -> RepositoryResult<()> {
        debug!(
            user_id = %subscription.user_id,
            service_name = %subscription.service_name,
            "subscription repository: updating current period"
        );

        let updated = sql_query(UPDATE_CURRENT_PERIOD)
            .bind::<SqlUuid, _>(subscription.user_id)
            .bind::<Text, _>(subscription.service_name.as_str())
            .bind::<Int4, _>(subscription.month_cost)
            .bind::<Nullable<Date>, _>(subscription.subs_end_date)
            .execute(conn)
            .map_err(|err| RepositoryError::UpdateFailed(err.into()))?;

        if updated == 0 {
            return Err(RepositoryError::NothingToUpdate);
        }
        Ok(())
    }

    fn delete(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        service_name: &str,
    ) -> RepositoryResult<()> {
        debug!(
            %user_id,
            service_name,
            "subscription repository: deleting current period"
        );

        let deleted = sql_query(DELETE_CURRENT_PERIOD)
            .bind::<SqlUuid, _>(user_id)
            .bind::<Text, _>(service_name)
            .execute(conn)
            .map_err(|err| RepositoryError::DeleteFailed(err.into()))?;

        if deleted == 0 {
            return Err(RepositoryError::NothingToDelete);
        }
        Ok(())
    }

    fn all_matching_subscriptions_for_period(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        service_name: &str,
        window: CostWindow,
    ) -> RepositoryResult<Vec<i32>> {
        debug!(
            %user_id,
            service_name,
            window_start = %window.start(),
            window_end = ?window.end(),
            "subscription repository: getting all matching periods"
        );

        // An open end date means the period is still running, so it always reaches the window.
        let mut query = subscriptions::table
            .select(subscriptions::month_cost)
            .filter(subscriptions::user_id.eq(user_id))
            .filter(subscriptions::service_name.eq(service_name))
            .filter(
                subscriptions::subs_end_date
                    .is_null()
                    .or(subscriptions::subs_end_date.ge(window.start())),
            )
            .into_boxed();

        if let Some(window_end) = window.end() {
            query = query.filter(subscriptions::subs_start_date.lt(window_end));
        }

        query
            .load::<i32>(conn)
            .map_err(|err| RepositoryError::TotalCostFailed(err.into()))
    }
}
