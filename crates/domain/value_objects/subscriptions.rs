use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::subscriptions::SubscriptionEntity;
use crate::domain::value_objects::billing_month::{
    BillingMonthError, first_day_of_month, format_billing_month, parse_billing_month,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("cost must not be negative (got {0})")]
    NegativeCost(i32),
    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
    #[error("window end {end} is not after window start {start}")]
    EmptyWindow { start: NaiveDate, end: NaiveDate },
}

/// A subscription period as seen by the service layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionModel {
    pub user_id: Uuid,
    pub service_name: String,
    pub cost: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl SubscriptionModel {
    pub fn validate(&self) -> Result<(), PeriodError> {
        if self.cost < 0 {
            return Err(PeriodError::NegativeCost(self.cost));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(PeriodError::EndBeforeStart {
                    start: self.start_date,
                    end,
                });
            }
        }
        Ok(())
    }
}

impl From<SubscriptionEntity> for SubscriptionModel {
    fn from(value: SubscriptionEntity) -> Self {
        Self {
            user_id: value.user_id,
            service_name: value.service_name,
            cost: value.month_cost,
            start_date: value.subs_start_date,
            end_date: value.subs_end_date,
        }
    }
}

impl From<SubscriptionModel> for SubscriptionEntity {
    fn from(value: SubscriptionModel) -> Self {
        Self {
            user_id: value.user_id,
            service_name: value.service_name,
            month_cost: value.cost,
            subs_start_date: value.start_date,
            subs_end_date: value.end_date,
        }
    }
}

/// End of the most recent period on a subscription line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatestPeriodEnd {
    NoHistory,
    Open,
    ClosedOn(NaiveDate),
}

impl LatestPeriodEnd {
    /// Whether a new period starting at `start` would overlap the latest one.
    /// A closed period blocks only starts before its end; a new period may begin in the
    /// month the previous one ends.
    pub fn blocks(&self, start: NaiveDate) -> bool {
        match self {
            LatestPeriodEnd::NoHistory => false,
            LatestPeriodEnd::Open => true,
            LatestPeriodEnd::ClosedOn(end) => *end > start,
        }
    }
}

impl From<Option<Option<NaiveDate>>> for LatestPeriodEnd {
    fn from(value: Option<Option<NaiveDate>>) -> Self {
        match value {
            None => LatestPeriodEnd::NoHistory,
            Some(None) => LatestPeriodEnd::Open,
            Some(Some(end)) => LatestPeriodEnd::ClosedOn(end),
        }
    }
}

/// Half-open `[start, end)` query window. A missing end leaves the window unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostWindow {
    start: NaiveDate,
    end: Option<NaiveDate>,
}

impl CostWindow {
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Result<Self, PeriodError> {
        if let Some(end) = end {
            if end <= start {
                return Err(PeriodError::EmptyWindow { start, end });
            }
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }
}

// ─────────────────────────────────────────────
// Transport shapes
// ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertSubscriptionModel {
    #[serde(rename = "id")]
    pub user_id: Uuid,
    pub name: String,
    pub cost: i32,
    pub date_start: String,
    #[serde(default)]
    pub date_end: Option<String>,
}

impl InsertSubscriptionModel {
    pub fn into_model(self) -> Result<SubscriptionModel, BillingMonthError> {
        let start_date = parse_billing_month(&self.date_start)?;
        let end_date = self
            .date_end
            .as_deref()
            .map(parse_billing_month)
            .transpose()?;

        Ok(SubscriptionModel {
            user_id: self.user_id,
            service_name: self.name,
            cost: self.cost,
            start_date,
            end_date,
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubscriptionDto {
    pub id: Uuid,
    pub name: String,
    pub cost: i32,
    pub date_start: String,
    pub date_end: Option<String>,
}

impl From<SubscriptionModel> for SubscriptionDto {
    fn from(value: SubscriptionModel) -> Self {
        Self {
            id: value.user_id,
            name: value.service_name,
            cost: value.cost,
            date_start: format_billing_month(first_day_of_month(value.start_date)),
            date_end: value
                .end_date
                .map(|end| format_billing_month(first_day_of_month(end))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserQuery {
    pub id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionLineQuery {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TotalCostQuery {
    pub id: Uuid,
    pub name: String,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TotalCostDto {
    pub total_cost: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 1).unwrap()
    }

    fn model(start: NaiveDate, end: Option<NaiveDate>, cost: i32) -> SubscriptionModel {
        SubscriptionModel {
            user_id: Uuid::new_v4(),
            service_name: "svc".to_string(),
            cost,
            start_date: start,
            end_date: end,
        }
    }

    #[test]
    fn open_latest_period_blocks_any_start() {
        assert!(LatestPeriodEnd::Open.blocks(month(1999, 1)));
        assert!(LatestPeriodEnd::Open.blocks(month(2100, 12)));
    }

    #[test]
    fn closed_latest_period_blocks_only_before_its_end() {
        let latest = LatestPeriodEnd::ClosedOn(month(2024, 6));
        assert!(latest.blocks(month(2024, 1)));
        assert!(latest.blocks(month(2024, 5)));
        assert!(!latest.blocks(month(2024, 6)));
        assert!(!latest.blocks(month(2024, 7)));
    }

    #[test]
    fn no_history_never_blocks() {
        assert!(!LatestPeriodEnd::NoHistory.blocks(month(2024, 1)));
    }

    #[test]
    fn latest_period_end_from_nested_option() {
        assert_eq!(LatestPeriodEnd::from(None), LatestPeriodEnd::NoHistory);
        assert_eq!(LatestPeriodEnd::from(Some(None)), LatestPeriodEnd::Open);
        assert_eq!(
            LatestPeriodEnd::from(Some(Some(month(2024, 6)))),
            LatestPeriodEnd::ClosedOn(month(2024, 6))
        );
    }

    #[test]
    fn validation_rejects_negative_cost_and_inverted_range() {
        assert_eq!(
            model(month(2024, 1), None, -1).validate(),
            Err(PeriodError::NegativeCost(-1))
        );
        assert_eq!(
            model(month(2024, 5), Some(month(2024, 4)), 100).validate(),
            Err(PeriodError::EndBeforeStart {
                start: month(2024, 5),
                end: month(2024, 4),
            })
        );
        assert!(model(month(2024, 5), Some(month(2024, 5)), 0).validate().is_ok());
        assert!(model(month(2024, 5), None, 0).validate().is_ok());
    }

    #[test]
    fn cost_window_requires_end_after_start() {
        assert!(CostWindow::new(month(2024, 3), Some(month(2024, 8))).is_ok());
        assert!(CostWindow::new(month(2024, 3), None).is_ok());
        assert_eq!(
            CostWindow::new(month(2024, 3), Some(month(2024, 3))),
            Err(PeriodError::EmptyWindow {
                start: month(2024, 3),
                end: month(2024, 3),
            })
        );
    }

    #[test]
    fn insert_model_parses_wire_dates() {
        let user_id = Uuid::new_v4();
        let insert = InsertSubscriptionModel {
            user_id,
            name: "Yandex Plus".to_string(),
            cost: 400,
            date_start: "07-2025".to_string(),
            date_end: None,
        };

        let model = insert.into_model().unwrap();
        assert_eq!(model.user_id, user_id);
        assert_eq!(model.start_date, month(2025, 7));
        assert_eq!(model.end_date, None);
    }

    #[test]
    fn insert_model_rejects_bad_end_date() {
        let insert = InsertSubscriptionModel {
            user_id: Uuid::new_v4(),
            name: "svc".to_string(),
            cost: 1,
            date_start: "07-2025".to_string(),
            date_end: Some("2025-08".to_string()),
        };

        assert!(matches!(
            insert.into_model(),
            Err(BillingMonthError::Malformed(_))
        ));
    }

    #[test]
    fn dto_formats_open_and_closed_periods() {
        let open = SubscriptionDto::from(model(month(2024, 7), None, 10));
        assert_eq!(open.date_start, "07-2024");
        assert_eq!(open.date_end, None);

        let closed = SubscriptionDto::from(model(month(2024, 1), Some(month(2024, 6)), 10));
        assert_eq!(closed.date_end.as_deref(), Some("06-2024"));
    }
}
