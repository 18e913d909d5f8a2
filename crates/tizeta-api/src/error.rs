//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tizeta_core::Error as CoreError;
use tracing::{error, warn};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  #[error("unauthorized: {0}")]
  Unauthorized(&'static str),

  #[error("bad request: {0}")]
  BadRequest(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Core(e) => match e {
        CoreError::SeatUnavailable { .. }
        | CoreError::ScheduleClosed(_)
        | CoreError::ScheduleFull(_)
        | CoreError::AlreadyFinalized(_) => StatusCode::CONFLICT,
        CoreError::ScheduleNotFound(_)
        | CoreError::HoldNotFound(_)
        | CoreError::UnknownPaymentRef(_)
        | CoreError::RefundNotFound(_) => StatusCode::NOT_FOUND,
        CoreError::NotOwner(_) => StatusCode::FORBIDDEN,
        CoreError::GatewayRejected(_) => StatusCode::PAYMENT_REQUIRED,
        CoreError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::MalformedCallback(_) => StatusCode::UNAUTHORIZED,
        // The refund is on record; the gateway must stop retrying.
        CoreError::ExpiredHold(_) => StatusCode::OK,
        CoreError::InvalidSchedule(_) | CoreError::InvalidRequest(_) => {
          StatusCode::UNPROCESSABLE_ENTITY
        }
        CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match &self {
      ApiError::Core(CoreError::ExpiredHold(obligation)) => {
        json!({ "settlement": "refund_owed", "refund": obligation })
      }
      ApiError::Core(CoreError::Storage(e)) => {
        error!(error = %e, "storage failure");
        json!({ "error": "internal error" })
      }
      ApiError::Core(e) if e.is_infrastructure() => {
        warn!(error = %e, "dependency unavailable");
        json!({ "error": e.to_string() })
      }
      other => json!({ "error": other.to_string() }),
    };
    (status, Json(body)).into_response()
  }
}
