//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`
//! suffix) so that string comparison in SQL orders them chronologically.
//! UUIDs are stored as hyphenated lowercase strings. Status enums use their
//! `strum` string forms.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use tizeta_core::{
  hold::{CancelReason, HoldStatus, SeatHold},
  money::Money,
  payment::{PaymentAttempt, PaymentStatus, RefundObligation, RefundReason},
  schedule::Schedule,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums
// ────────────────────────────────────────────────────────────────────

fn decode_enum<T: FromStr>(column: &str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::Decode(format!("{column}: {s:?}")))
}

fn decode_count(column: &str, n: i64) -> Result<u32> {
  u32::try_from(n).map_err(|_| Error::Decode(format!("{column}: {n}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawHold::from_row`].
pub const HOLD_COLUMNS: &str = "hold_id, schedule_id, seat_id, holder_id, price, \
   payment_ref, status, cancel_reason, created_at, expires_at, finalized_at, reinstates";

/// Raw values read directly from a `holds` row.
pub struct RawHold {
  pub hold_id:       String,
  pub schedule_id:   i64,
  pub seat_id:       String,
  pub holder_id:     String,
  pub price:         i64,
  pub payment_ref:   String,
  pub status:        String,
  pub cancel_reason: Option<String>,
  pub created_at:    String,
  pub expires_at:    String,
  pub finalized_at:  Option<String>,
  pub reinstates:    Option<String>,
}

impl RawHold {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      hold_id:       row.get(0)?,
      schedule_id:   row.get(1)?,
      seat_id:       row.get(2)?,
      holder_id:     row.get(3)?,
      price:         row.get(4)?,
      payment_ref:   row.get(5)?,
      status:        row.get(6)?,
      cancel_reason: row.get(7)?,
      created_at:    row.get(8)?,
      expires_at:    row.get(9)?,
      finalized_at:  row.get(10)?,
      reinstates:    row.get(11)?,
    })
  }

  pub fn into_hold(self) -> Result<SeatHold> {
    Ok(SeatHold {
      hold_id:       decode_uuid(&self.hold_id)?,
      schedule_id:   self.schedule_id,
      seat_id:       self.seat_id,
      holder_id:     self.holder_id,
      price:         Money::from_minor(self.price),
      payment_ref:   self.payment_ref,
      status:        decode_enum::<HoldStatus>("holds.status", &self.status)?,
      cancel_reason: self
        .cancel_reason
        .as_deref()
        .map(|s| decode_enum::<CancelReason>("holds.cancel_reason", s))
        .transpose()?,
      created_at:    decode_dt(&self.created_at)?,
      expires_at:    decode_dt(&self.expires_at)?,
      finalized_at:  self.finalized_at.as_deref().map(decode_dt).transpose()?,
      reinstates:    self.reinstates.as_deref().map(decode_uuid).transpose()?,
    })
  }
}

pub const SCHEDULE_COLUMNS: &str =
  "schedule_id, capacity, price, starts_at, ends_at, available_seats, updated_at";

/// Raw values read directly from a `schedules` row.
pub struct RawSchedule {
  pub schedule_id:     i64,
  pub capacity:        i64,
  pub price:           i64,
  pub starts_at:       String,
  pub ends_at:         String,
  pub available_seats: i64,
  pub updated_at:      String,
}

impl RawSchedule {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      schedule_id:     row.get(0)?,
      capacity:        row.get(1)?,
      price:           row.get(2)?,
      starts_at:       row.get(3)?,
      ends_at:         row.get(4)?,
      available_seats: row.get(5)?,
      updated_at:      row.get(6)?,
    })
  }

  pub fn into_schedule(self) -> Result<Schedule> {
    Ok(Schedule {
      schedule_id:     self.schedule_id,
      capacity:        decode_count("schedules.capacity", self.capacity)?,
      price:           Money::from_minor(self.price),
      starts_at:       decode_dt(&self.starts_at)?,
      ends_at:         decode_dt(&self.ends_at)?,
      available_seats: decode_count("schedules.available_seats", self.available_seats)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub const PAYMENT_COLUMNS: &str = "payment_ref, amount, currency, status, checkout_url, \
   gateway_reference, created_at, updated_at";

/// Raw values read directly from a `payment_attempts` row.
pub struct RawPayment {
  pub payment_ref:       String,
  pub amount:            i64,
  pub currency:          String,
  pub status:            String,
  pub checkout_url:      Option<String>,
  pub gateway_reference: Option<String>,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawPayment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      payment_ref:       row.get(0)?,
      amount:            row.get(1)?,
      currency:          row.get(2)?,
      status:            row.get(3)?,
      checkout_url:      row.get(4)?,
      gateway_reference: row.get(5)?,
      created_at:        row.get(6)?,
      updated_at:        row.get(7)?,
    })
  }

  pub fn into_payment(self) -> Result<PaymentAttempt> {
    Ok(PaymentAttempt {
      payment_ref:       self.payment_ref,
      amount:            Money::from_minor(self.amount),
      currency:          self.currency,
      status:            decode_enum::<PaymentStatus>(
        "payment_attempts.status",
        &self.status,
      )?,
      checkout_url:      self.checkout_url,
      gateway_reference: self.gateway_reference,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

pub const REFUND_COLUMNS: &str = "payment_ref, hold_id, holder_id, amount, currency, reason, \
   recorded_at, resolved_at";

/// Raw values read directly from a `refund_obligations` row.
pub struct RawRefund {
  pub payment_ref: String,
  pub hold_id:     String,
  pub holder_id:   String,
  pub amount:      i64,
  pub currency:    String,
  pub reason:      String,
  pub recorded_at: String,
  pub resolved_at: Option<String>,
}

impl RawRefund {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      payment_ref: row.get(0)?,
      hold_id:     row.get(1)?,
      holder_id:   row.get(2)?,
      amount:      row.get(3)?,
      currency:    row.get(4)?,
      reason:      row.get(5)?,
      recorded_at: row.get(6)?,
      resolved_at: row.get(7)?,
    })
  }

  pub fn into_refund(self) -> Result<RefundObligation> {
    Ok(RefundObligation {
      payment_ref: self.payment_ref,
      hold_id:     decode_uuid(&self.hold_id)?,
      holder_id:   self.holder_id,
      amount:      Money::from_minor(self.amount),
      currency:    self.currency,
      reason:      decode_enum::<RefundReason>("refund_obligations.reason", &self.reason)?,
      recorded_at: decode_dt(&self.recorded_at)?,
      resolved_at: self.resolved_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
