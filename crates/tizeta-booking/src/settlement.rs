//! [`SettlementCoordinator`]: turns payment callbacks into final hold states.
//!
//! Each step of [`SettlementCoordinator::handle_callback`] is a conditional,
//! idempotent store write, so duplicate or concurrent deliveries of the same
//! callback converge on one outcome.
//!
//! The interesting case is a successful payment for a hold that can no longer
//! simply be confirmed, because its window closed or it was cancelled. The
//! seat is re-acquired for the payer if it is still free. Otherwise the money
//! is owed back and a [`RefundObligation`] is recorded.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use tizeta_core::{
  clock::Clock,
  hold::{CancelReason, FinalOutcome, HoldStatus, SeatHold, Transition},
  payment::{CallbackOutcome, PaymentAttempt, PaymentStatus, RefundObligation, RefundReason},
  store::InventoryStore,
  Error, Result,
};

use crate::core;

/// What a callback did to its hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "settlement", content = "hold", rename_all = "snake_case")]
pub enum Settlement {
  Confirmed(SeatHold),
  Cancelled(SeatHold),
  /// A late payment won the seat back on a new hold.
  Reinstated { original: Uuid, hold: SeatHold },
  /// The callback had already been applied.
  Replayed(SeatHold),
}

impl Settlement {
  pub fn hold(&self) -> &SeatHold {
    match self {
      Self::Confirmed(h) | Self::Cancelled(h) | Self::Replayed(h) => h,
      Self::Reinstated { hold, .. } => hold,
    }
  }
}

pub struct SettlementCoordinator<S> {
  store: Arc<S>,
  clock: Arc<dyn Clock>,
}

impl<S: InventoryStore> SettlementCoordinator<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self { Self { store, clock } }

  /// Apply a verified gateway callback.
  ///
  /// Returns [`Error::ExpiredHold`] once a refund obligation has been
  /// recorded for a payment that could not be honoured; the callback itself
  /// has still been fully processed.
  pub async fn handle_callback(
    &self,
    payment_ref: &str,
    outcome: CallbackOutcome,
  ) -> Result<Settlement> {
    let now = self.clock.now();

    let hold = self
      .store
      .get_by_payment_ref(payment_ref)
      .await
      .map_err(core)?
      .ok_or_else(|| Error::UnknownPaymentRef(payment_ref.to_owned()))?;

    let reported = PaymentStatus::from(outcome);
    let attempt = self
      .store
      .record_payment_outcome(payment_ref, reported, now)
      .await
      .map_err(core)?;
    if attempt.status != reported {
      error!(
        hold_id = %hold.hold_id,
        payment_ref,
        recorded = %attempt.status,
        reported = %reported,
        "callback contradicts the recorded payment outcome"
      );
      return Err(Error::AlreadyFinalized(hold.hold_id));
    }

    match (outcome, hold.status) {
      (CallbackOutcome::Failed, HoldStatus::Pending) => {
        let transition = self
          .store
          .finalize(hold.hold_id, FinalOutcome::Cancelled(CancelReason::PaymentFailed), now)
          .await
          .map_err(core)?;
        Ok(match transition {
          Transition::Applied(hold) => {
            info!(hold_id = %hold.hold_id, payment_ref, "payment failed; hold cancelled");
            Settlement::Cancelled(hold)
          }
          Transition::Replayed(hold) => Settlement::Replayed(hold),
        })
      }
      (CallbackOutcome::Failed, HoldStatus::Cancelled) => Ok(Settlement::Replayed(hold)),
      (CallbackOutcome::Failed, HoldStatus::Confirmed) => {
        error!(
          hold_id = %hold.hold_id,
          payment_ref,
          "failure reported for a confirmed hold"
        );
        Err(Error::AlreadyFinalized(hold.hold_id))
      }

      (CallbackOutcome::Succeeded, HoldStatus::Confirmed) => Ok(Settlement::Replayed(hold)),
      (CallbackOutcome::Succeeded, HoldStatus::Pending) if !hold.is_expired(now) => {
        match self
          .store
          .finalize(hold.hold_id, FinalOutcome::Confirmed, now)
          .await
          .map_err(core)
        {
          Ok(Transition::Applied(hold)) => {
            info!(hold_id = %hold.hold_id, payment_ref, "payment succeeded; hold confirmed");
            Ok(Settlement::Confirmed(hold))
          }
          Ok(Transition::Replayed(hold)) => Ok(Settlement::Replayed(hold)),
          // Cancelled between our read and this write.
          Err(Error::AlreadyFinalized(_)) => self.settle_late(hold, attempt, now).await,
          Err(e) => Err(e),
        }
      }
      (CallbackOutcome::Succeeded, _) => self.settle_late(hold, attempt, now).await,
    }
  }

  /// A successful payment for a hold whose window closed or that was
  /// cancelled.
  async fn settle_late(
    &self,
    hold: SeatHold,
    attempt: PaymentAttempt,
    now: DateTime<Utc>,
  ) -> Result<Settlement> {
    if let Some(existing) = self
      .store
      .get_refund(&hold.payment_ref)
      .await
      .map_err(core)?
    {
      return Err(Error::ExpiredHold(Box::new(existing)));
    }

    if hold.status == HoldStatus::Cancelled {
      let schedule = self
        .store
        .get_schedule(hold.schedule_id)
        .await
        .map_err(core)?
        .ok_or(Error::ScheduleNotFound(hold.schedule_id))?;
      if !schedule.is_open(now) {
        return self.owe_refund(hold, attempt, RefundReason::ScheduleClosed, now).await;
      }
    }

    match self.store.reacquire(hold.hold_id, now).await.map_err(core) {
      Ok(Transition::Applied(confirmed)) if confirmed.hold_id == hold.hold_id => {
        info!(
          hold_id = %confirmed.hold_id,
          payment_ref = %confirmed.payment_ref,
          "late payment confirmed hold"
        );
        Ok(Settlement::Confirmed(confirmed))
      }
      Ok(Transition::Applied(reinstated)) => {
        info!(
          hold_id = %reinstated.hold_id,
          original = %hold.hold_id,
          payment_ref = %reinstated.payment_ref,
          "late payment reinstated seat"
        );
        Ok(Settlement::Reinstated { original: hold.hold_id, hold: reinstated })
      }
      Ok(Transition::Replayed(existing)) => Ok(Settlement::Replayed(existing)),
      Err(Error::SeatUnavailable { .. }) => {
        self.owe_refund(hold, attempt, RefundReason::SeatReassigned, now).await
      }
      Err(Error::ScheduleFull(_)) => {
        self.owe_refund(hold, attempt, RefundReason::SoldOut, now).await
      }
      Err(e) => Err(e),
    }
  }

  async fn owe_refund(
    &self,
    hold: SeatHold,
    attempt: PaymentAttempt,
    reason: RefundReason,
    now: DateTime<Utc>,
  ) -> Result<Settlement> {
    let obligation = self
      .store
      .record_refund(RefundObligation {
        payment_ref: hold.payment_ref,
        hold_id:     hold.hold_id,
        holder_id:   hold.holder_id,
        amount:      attempt.amount,
        currency:    attempt.currency,
        reason,
        recorded_at: now,
        resolved_at: None,
      })
      .await
      .map_err(core)?;

    warn!(
      hold_id = %obligation.hold_id,
      payment_ref = %obligation.payment_ref,
      amount = %obligation.amount,
      reason = %obligation.reason,
      "payment cannot be honoured; refund owed"
    );
    Err(Error::ExpiredHold(Box::new(obligation)))
  }

  // ── Refunds collaborator ──────────────────────────────────────────────────

  pub async fn list_refunds(&self, pending_only: bool) -> Result<Vec<RefundObligation>> {
    self.store.list_refunds(pending_only).await.map_err(core)
  }

  pub async fn resolve_refund(&self, payment_ref: &str) -> Result<RefundObligation> {
    let obligation = self
      .store
      .resolve_refund(payment_ref, self.clock.now())
      .await
      .map_err(core)?;
    info!(payment_ref, "refund resolved");
    Ok(obligation)
  }
}
