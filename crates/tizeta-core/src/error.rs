//! Error taxonomy for the booking core.
//!
//! Every user-visible failure is one of these variants. Storage and transport
//! failures are boxed into [`Error::Storage`] and never surfaced verbatim.

use thiserror::Error;
use uuid::Uuid;

use crate::payment::RefundObligation;

#[derive(Debug, Error)]
pub enum Error {
  #[error("seat {seat_id:?} on schedule {schedule_id} is unavailable")]
  SeatUnavailable { schedule_id: i64, seat_id: String },

  #[error("schedule not found: {0}")]
  ScheduleNotFound(i64),

  #[error("schedule {0} is closed for booking")]
  ScheduleClosed(i64),

  #[error("schedule {0} has no seats left")]
  ScheduleFull(i64),

  #[error("hold not found: {0}")]
  HoldNotFound(Uuid),

  #[error("hold {0} belongs to another holder")]
  NotOwner(Uuid),

  #[error("hold {0} is already finalized")]
  AlreadyFinalized(Uuid),

  #[error("unknown payment reference: {0:?}")]
  UnknownPaymentRef(String),

  /// A payment succeeded for a hold that could not be confirmed. The refund
  /// obligation has already been recorded when this is returned.
  #[error("hold {} expired before payment {:?} settled", .0.hold_id, .0.payment_ref)]
  ExpiredHold(Box<RefundObligation>),

  #[error("refund obligation not found: {0:?}")]
  RefundNotFound(String),

  #[error("payment gateway unavailable: {0}")]
  GatewayUnavailable(String),

  #[error("payment gateway rejected the charge: {0}")]
  GatewayRejected(String),

  #[error("malformed payment callback: {0}")]
  MalformedCallback(String),

  #[error("invalid schedule: {0}")]
  InvalidSchedule(String),

  #[error("invalid request: {0}")]
  InvalidRequest(String),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// `true` for failures of an external dependency rather than of the request.
  pub fn is_infrastructure(&self) -> bool {
    matches!(self, Self::Storage(_) | Self::GatewayUnavailable(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
