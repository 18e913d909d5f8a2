//! Payment attempts and refund obligations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::money::Money;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
  Initiated,
  Succeeded,
  Failed,
}

impl PaymentStatus {
  pub fn as_str(self) -> &'static str { self.into() }
}

/// The disposition a gateway reports for a payment reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackOutcome {
  Succeeded,
  Failed,
}

impl From<CallbackOutcome> for PaymentStatus {
  fn from(outcome: CallbackOutcome) -> Self {
    match outcome {
      CallbackOutcome::Succeeded => PaymentStatus::Succeeded,
      CallbackOutcome::Failed => PaymentStatus::Failed,
    }
  }
}

/// One outbound charge initiation and its eventual disposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAttempt {
  pub payment_ref:       String,
  pub amount:            Money,
  pub currency:          String,
  pub status:            PaymentStatus,
  /// Hosted checkout page returned by the gateway.
  pub checkout_url:      Option<String>,
  /// The gateway's own identifier for the transaction.
  pub gateway_reference: Option<String>,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

// ─── Refunds ─────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RefundReason {
  /// The seat went to another holder before the payment arrived.
  SeatReassigned,
  /// The screening had already started when the payment arrived.
  ScheduleClosed,
  /// The seat is free but the schedule's capacity went to other holders.
  SoldOut,
}

impl RefundReason {
  pub fn as_str(self) -> &'static str { self.into() }
}

/// Money was collected for a hold that cannot be honoured.
///
/// At most one obligation exists per payment reference. The refunds
/// collaborator reads pending obligations and marks them resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundObligation {
  pub payment_ref: String,
  pub hold_id:     Uuid,
  pub holder_id:   String,
  pub amount:      Money,
  pub currency:    String,
  pub reason:      RefundReason,
  pub recorded_at: DateTime<Utc>,
  pub resolved_at: Option<DateTime<Utc>>,
}
