use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use subscription_core::domain::value_objects::{
    billing_month::BillingMonthError, subscriptions::PeriodError,
};
use thiserror::Error;

use crate::usecases::subscriptions::{ErrorKind, SubscriptionError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(#[source] SubscriptionError),
}

impl From<SubscriptionError> for AppError {
    fn from(value: SubscriptionError) -> Self {
        match value.kind() {
            ErrorKind::OverlapRejected => AppError::Conflict(value.to_string()),
            ErrorKind::InvalidInput => AppError::BadRequest(value.to_string()),
            ErrorKind::NotFound | ErrorKind::NothingToDelete => AppError::NotFound(value.to_string()),
            ErrorKind::Cancelled | ErrorKind::Infrastructure => AppError::Internal(value),
        }
    }
}

impl From<BillingMonthError> for AppError {
    fn from(value: BillingMonthError) -> Self {
        AppError::BadRequest(value.to_string())
    }
}

impl From<PeriodError> for AppError {
    fn from(value: PeriodError) -> Self {
        AppError::BadRequest(value.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(_) => {
                // Don't leak internal error detail to client
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use subscription_core::domain::repositories::{
        connection_provider::StoreError, subscriptions::RepositoryError,
    };

    use super::*;

    fn status_of(err: SubscriptionError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn maps_business_errors_to_client_statuses() {
        assert_eq!(status_of(SubscriptionError::OverlapRejected), StatusCode::CONFLICT);
        assert_eq!(
            status_of(SubscriptionError::InvalidPeriod(PeriodError::NegativeCost(-1))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(SubscriptionError::NoActiveSubscription), StatusCode::NOT_FOUND);
        assert_eq!(status_of(SubscriptionError::NothingToDelete), StatusCode::NOT_FOUND);
    }

    #[test]
    fn infrastructure_errors_hide_details() {
        let err = SubscriptionError::Infrastructure(RepositoryError::ReadFailed(StoreError::Closed));
        let app_error = AppError::from(err);

        assert!(matches!(app_error, AppError::Internal(_)));
        assert_eq!(app_error.to_string(), "Internal server error");
        assert_eq!(
            app_error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn cancelled_units_are_server_errors() {
        let err = SubscriptionError::from(StoreError::Cancelled);
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn malformed_months_are_bad_requests() {
        let app_error = AppError::from(BillingMonthError::Malformed("2024/01".to_string()));
        assert_eq!(app_error.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
