//! [`ReservationEngine`]: hold creation, cancellation and lookup.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use tizeta_core::{
  clock::Clock,
  hold::{CancelReason, FinalOutcome, NewHold, SeatHold, Transition},
  money::Money,
  payment::PaymentAttempt,
  schedule::{Schedule, ScheduleUpsert},
  store::InventoryStore,
  Error, Result,
};

use crate::core;

/// Seat ids are hall labels such as `A1` or `K12`.
const MAX_SEAT_ID_LEN: usize = 10;

/// Fixed per-deployment hold settings.
#[derive(Debug, Clone)]
pub struct HoldPolicy {
  /// How long a hold stays `PENDING` before the sweeper reclaims it. Not
  /// renewable.
  pub hold_window: Duration,
  /// ISO 4217 code that every hold is charged in.
  pub currency:    String,
}

impl Default for HoldPolicy {
  fn default() -> Self {
    Self { hold_window: Duration::minutes(15), currency: "ETB".to_owned() }
  }
}

#[derive(Debug, Clone)]
pub struct HoldRequest {
  pub schedule_id: i64,
  pub seat_id:     String,
  pub holder_id:   String,
  /// The price the client believes it is paying. The catalog price always
  /// wins.
  pub price:       Option<Money>,
}

/// A hold as its owner sees it.
#[derive(Debug, Clone, Serialize)]
pub struct HoldView {
  #[serde(flatten)]
  pub hold:    SeatHold,
  pub payment: Option<PaymentAttempt>,
}

/// A fresh gateway correlation key.
pub fn new_payment_ref() -> String { format!("tzb-{}", Uuid::new_v4().simple()) }

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct ReservationEngine<S> {
  store:  Arc<S>,
  clock:  Arc<dyn Clock>,
  policy: HoldPolicy,
}

impl<S: InventoryStore> ReservationEngine<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, policy: HoldPolicy) -> Self {
    Self { store, clock, policy }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn clock(&self) -> &Arc<dyn Clock> { &self.clock }

  pub fn policy(&self) -> &HoldPolicy { &self.policy }

  /// Claim a seat for `holder_id` until the hold window closes.
  pub async fn request_hold(&self, request: HoldRequest) -> Result<SeatHold> {
    let seat_id = request.seat_id.trim();
    if seat_id.is_empty() || seat_id.chars().count() > MAX_SEAT_ID_LEN {
      return Err(Error::InvalidRequest(format!("invalid seat id {:?}", request.seat_id)));
    }
    if request.holder_id.is_empty() {
      return Err(Error::InvalidRequest("missing holder id".to_owned()));
    }

    let now = self.clock.now();
    let schedule = self
      .store
      .get_schedule(request.schedule_id)
      .await
      .map_err(core)?
      .ok_or(Error::ScheduleNotFound(request.schedule_id))?;
    if !schedule.is_open(now) {
      return Err(Error::ScheduleClosed(schedule.schedule_id));
    }

    if let Some(intended) = request.price.filter(|p| *p != schedule.price) {
      warn!(
        schedule_id = schedule.schedule_id,
        intended = %intended,
        catalog = %schedule.price,
        "client price differs from catalog price; using catalog price"
      );
    }

    let hold = self
      .store
      .try_acquire(NewHold {
        hold_id:     Uuid::new_v4(),
        schedule_id: schedule.schedule_id,
        seat_id:     seat_id.to_owned(),
        holder_id:   request.holder_id,
        price:       schedule.price,
        currency:    self.policy.currency.clone(),
        payment_ref: new_payment_ref(),
        created_at:  now,
        expires_at:  now + self.policy.hold_window,
      })
      .await
      .map_err(core)?;

    info!(
      hold_id = %hold.hold_id,
      payment_ref = %hold.payment_ref,
      schedule_id = hold.schedule_id,
      seat_id = %hold.seat_id,
      expires_at = %hold.expires_at,
      "hold created"
    );
    Ok(hold)
  }

  /// Voluntary cancel by the hold's owner, only while it is `PENDING`.
  pub async fn cancel_hold(&self, hold_id: Uuid, requested_by: &str) -> Result<SeatHold> {
    let hold = self.owned_hold(hold_id, requested_by).await?;
    if hold.status.is_terminal() {
      return Err(Error::AlreadyFinalized(hold_id));
    }

    let transition = self
      .store
      .finalize(
        hold.hold_id,
        FinalOutcome::Cancelled(CancelReason::CancelledByHolder),
        self.clock.now(),
      )
      .await
      .map_err(core)?;

    match transition {
      Transition::Applied(hold) => {
        info!(hold_id = %hold.hold_id, "hold cancelled by holder");
        Ok(hold)
      }
      Transition::Replayed(_) => Err(Error::AlreadyFinalized(hold_id)),
    }
  }

  pub async fn get_hold(&self, hold_id: Uuid, requested_by: &str) -> Result<HoldView> {
    let hold = self.owned_hold(hold_id, requested_by).await?;
    let payment = self
      .store
      .get_payment(&hold.payment_ref)
      .await
      .map_err(core)?;
    Ok(HoldView { hold, payment })
  }

  /// Booking history, newest first.
  pub async fn list_holds(&self, holder_id: &str) -> Result<Vec<SeatHold>> {
    self.store.holds_for_holder(holder_id).await.map_err(core)
  }

  // ── Catalog ───────────────────────────────────────────────────────────────

  pub async fn upsert_schedule(&self, schedule: ScheduleUpsert) -> Result<Schedule> {
    let stored = self
      .store
      .upsert_schedule(schedule, self.clock.now())
      .await
      .map_err(core)?;
    info!(
      schedule_id = stored.schedule_id,
      capacity = stored.capacity,
      available = stored.available_seats,
      "schedule upserted"
    );
    Ok(stored)
  }

  pub async fn get_schedule(&self, schedule_id: i64) -> Result<Schedule> {
    self
      .store
      .get_schedule(schedule_id)
      .await
      .map_err(core)?
      .ok_or(Error::ScheduleNotFound(schedule_id))
  }

  async fn owned_hold(&self, hold_id: Uuid, requested_by: &str) -> Result<SeatHold> {
    let hold = self
      .store
      .get_hold(hold_id)
      .await
      .map_err(core)?
      .ok_or(Error::HoldNotFound(hold_id))?;
    if hold.holder_id != requested_by {
      return Err(Error::NotOwner(hold_id));
    }
    Ok(hold)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn payment_refs_are_prefixed_and_unique() {
    let a = new_payment_ref();
    let b = new_payment_ref();
    assert!(a.starts_with("tzb-"));
    assert_eq!(a.len(), 4 + 32);
    assert_ne!(a, b);
  }
}
