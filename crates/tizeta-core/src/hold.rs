//! Seat holds: one customer's claim on one seat of one schedule.
//!
//! A hold is created `PENDING` and moves to `CONFIRMED` or `CANCELLED` exactly
//! once. Terminal holds are never written again; a late payment for a
//! cancelled hold produces a *new* hold that records which one it reinstates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::money::Money;

// ─── Status ──────────────────────────────────────────────────────────────────

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
pub enum HoldStatus {
  Pending,
  Confirmed,
  Cancelled,
}

impl HoldStatus {
  pub fn is_terminal(self) -> bool { !matches!(self, Self::Pending) }

  pub fn as_str(self) -> &'static str { self.into() }
}

/// Why a hold ended up `CANCELLED`.
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
pub enum CancelReason {
  Expired,
  CancelledByHolder,
  PaymentFailed,
  GatewayRejected,
}

impl CancelReason {
  pub fn as_str(self) -> &'static str { self.into() }
}

/// The terminal state a `PENDING` hold is driven to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum FinalOutcome {
  Confirmed,
  Cancelled(CancelReason),
}

impl FinalOutcome {
  pub fn status(self) -> HoldStatus {
    match self {
      Self::Confirmed => HoldStatus::Confirmed,
      Self::Cancelled(_) => HoldStatus::Cancelled,
    }
  }

  pub fn cancel_reason(self) -> Option<CancelReason> {
    match self {
      Self::Confirmed => None,
      Self::Cancelled(reason) => Some(reason),
    }
  }
}

// ─── Hold ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatHold {
  pub hold_id:       Uuid,
  pub schedule_id:   i64,
  pub seat_id:       String,
  pub holder_id:     String,
  pub price:         Money,
  pub payment_ref:   String,
  pub status:        HoldStatus,
  pub cancel_reason: Option<CancelReason>,
  pub created_at:    DateTime<Utc>,
  pub expires_at:    DateTime<Utc>,
  pub finalized_at:  Option<DateTime<Utc>>,
  /// Set on a hold created by a late payment; names the cancelled original.
  pub reinstates:    Option<Uuid>,
}

impl SeatHold {
  /// A `PENDING` hold whose window has closed. Terminal holds never expire.
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.status == HoldStatus::Pending && self.expires_at <= now
  }
}

/// Input to [`InventoryStore::try_acquire`](crate::store::InventoryStore::try_acquire).
///
/// The payment reference and expiry are fixed by the caller before the hold
/// exists, so they are part of the acquisition rather than set afterwards.
#[derive(Debug, Clone)]
pub struct NewHold {
  pub hold_id:     Uuid,
  pub schedule_id: i64,
  pub seat_id:     String,
  pub holder_id:   String,
  pub price:       Money,
  pub currency:    String,
  pub payment_ref: String,
  pub created_at:  DateTime<Utc>,
  pub expires_at:  DateTime<Utc>,
}

/// Result of a state-changing call that is idempotent on replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
  /// This call performed the change.
  Applied(SeatHold),
  /// The change had already happened; nothing was written.
  Replayed(SeatHold),
}

impl Transition {
  pub fn hold(&self) -> &SeatHold {
    match self {
      Self::Applied(h) | Self::Replayed(h) => h,
    }
  }

  pub fn into_hold(self) -> SeatHold {
    match self {
      Self::Applied(h) | Self::Replayed(h) => h,
    }
  }

  pub fn was_applied(&self) -> bool { matches!(self, Self::Applied(_)) }
}
