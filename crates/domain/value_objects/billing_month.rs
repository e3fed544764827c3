use chrono::{Datelike, NaiveDate};
use thiserror::Error;

/// Billing months travel as `MM-YYYY` and are stored as the first day of that month.
pub const BILLING_MONTH_FORMAT: &str = "MM-YYYY";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingMonthError {
    #[error("invalid billing month `{0}`: expected {BILLING_MONTH_FORMAT}")]
    Malformed(String),
    #[error("invalid billing month `{0}`: month must be between 01 and 12")]
    MonthOutOfRange(String),
}

pub fn parse_billing_month(raw: &str) -> Result<NaiveDate, BillingMonthError> {
    let trimmed = raw.trim();
    let malformed = || BillingMonthError::Malformed(raw.to_string());

    let (month, year) = trimmed.split_once('-').ok_or_else(malformed)?;
    if month.len() != 2 || year.len() != 4 {
        return Err(malformed());
    }
    if !month.chars().chain(year.chars()).all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }

    let month: u32 = month.parse().map_err(|_| malformed())?;
    let year: i32 = year.parse().map_err(|_| malformed())?;

    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| BillingMonthError::MonthOutOfRange(raw.to_string()))
}

pub fn format_billing_month(date: NaiveDate) -> String {
    format!("{:02}-{:04}", date.month(), date.year())
}

/// Truncates a date to month granularity.
pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
