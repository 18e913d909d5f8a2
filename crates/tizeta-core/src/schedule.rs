//! Schedules: catalog reference data plus the seat counter the core owns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A screening of a movie in a hall.
///
/// `available_seats` is maintained by the inventory store in the same
/// transaction as every hold status change; everything else comes from the
/// catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
  pub schedule_id:     i64,
  pub capacity:        u32,
  pub price:           Money,
  pub starts_at:       DateTime<Utc>,
  pub ends_at:         DateTime<Utc>,
  pub available_seats: u32,
  pub updated_at:      DateTime<Utc>,
}

impl Schedule {
  /// Bookable while the screening has not started.
  pub fn is_open(&self, now: DateTime<Utc>) -> bool { self.starts_at > now }
}

/// Catalog-supplied schedule data, as pushed by the catalog collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleUpsert {
  pub schedule_id: i64,
  pub capacity:    u32,
  pub price:       Money,
  pub starts_at:   DateTime<Utc>,
  pub ends_at:     DateTime<Utc>,
}

impl ScheduleUpsert {
  /// Checks that do not need the store.
  pub fn validate(&self) -> crate::Result<()> {
    if self.ends_at <= self.starts_at {
      return Err(crate::Error::InvalidSchedule(format!(
        "schedule {} ends before it starts",
        self.schedule_id
      )));
    }
    if self.price.is_negative() {
      return Err(crate::Error::InvalidSchedule(format!(
        "schedule {} has a negative price",
        self.schedule_id
      )));
    }
    Ok(())
  }
}

/// Seat accounting for one schedule, as stored and as derived from holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
  pub capacity:  u32,
  pub available: u32,
  pub pending:   u32,
  pub confirmed: u32,
}

impl Occupancy {
  /// `available + pending + confirmed == capacity`.
  pub fn is_conserved(&self) -> bool {
    u64::from(self.available) + u64::from(self.pending) + u64::from(self.confirmed)
      == u64::from(self.capacity)
  }
}
