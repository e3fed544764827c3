use chrono::NaiveDate;
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::subscriptions;

/// One billing period of one service for one user.
#[derive(Debug, Clone, PartialEq, Eq, Selectable, Queryable, Insertable)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubscriptionEntity {
    pub user_id: Uuid,
    pub service_name: String,
    pub month_cost: i32,
    pub subs_start_date: NaiveDate,
    pub subs_end_date: Option<NaiveDate>,
}
