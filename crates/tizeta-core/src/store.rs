//! The `InventoryStore` trait: single source of truth for seat occupancy.
//!
//! The trait is implemented by storage backends (e.g. `tizeta-store-sqlite`).
//! The booking layer depends on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  hold::{FinalOutcome, NewHold, SeatHold, Transition},
  payment::{PaymentAttempt, PaymentStatus, RefundObligation},
  gateway::CheckoutHandle,
  schedule::{Occupancy, Schedule, ScheduleUpsert},
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a durable seat-inventory backend.
///
/// Every method is a single atomic unit: a hold's status and its schedule's
/// available-seat counter are never observed out of step, and a call that
/// returns `Ok` has been made durable.
///
/// Domain failures (seat taken, hold already final, ...) are reported through
/// `Self::Error` and convert into the matching [`crate::Error`] variant; any
/// other failure converts into [`crate::Error::Storage`].
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait InventoryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  // ── Schedules ─────────────────────────────────────────────────────────

  /// Insert or update catalog data for a schedule.
  ///
  /// A capacity change moves `available_seats` by the same delta. Fails with
  /// `InvalidSchedule` if the new capacity is below the seats already held.
  fn upsert_schedule(
    &self,
    schedule: ScheduleUpsert,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Schedule, Self::Error>> + Send + '_;

  /// Returns `None` if the schedule is unknown.
  fn get_schedule(
    &self,
    schedule_id: i64,
  ) -> impl Future<Output = Result<Option<Schedule>, Self::Error>> + Send + '_;

  /// Stored counter alongside counts derived from holds.
  fn occupancy(
    &self,
    schedule_id: i64,
  ) -> impl Future<Output = Result<Option<Occupancy>, Self::Error>> + Send + '_;

  // ── Seat acquisition ──────────────────────────────────────────────────

  /// Claim a seat: insert a `PENDING` hold and its `INITIATED` payment
  /// attempt, and decrement the schedule's counter.
  ///
  /// Fails with `SeatUnavailable` if any `PENDING` or `CONFIRMED` hold exists
  /// for the seat (including one owned by the same holder) or the schedule has
  /// no seats left, and with `ScheduleNotFound` for an unknown schedule. Of
  /// any number of concurrent calls for one seat, exactly one succeeds.
  fn try_acquire(
    &self,
    hold: NewHold,
  ) -> impl Future<Output = Result<SeatHold, Self::Error>> + Send + '_;

  /// Move a `PENDING` hold to a terminal state.
  ///
  /// A hold already in the requested status yields
  /// [`Transition::Replayed`] without writing; a hold in the other terminal
  /// status fails with `AlreadyFinalized`. Cancelling returns the seat to the
  /// schedule's counter.
  fn finalize(
    &self,
    hold_id: Uuid,
    outcome: FinalOutcome,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Transition, Self::Error>> + Send + '_;

  /// Confirm a hold whose payment arrived late.
  ///
  /// - `PENDING`: confirmed in place (the seat is still its own).
  /// - `CONFIRMED`, or `CANCELLED` with an existing reinstatement: replayed.
  /// - `CANCELLED`: if the seat is free, a new `CONFIRMED` hold is created
  ///   for the same holder, price and payment reference, with `reinstates`
  ///   pointing at the original, and the counter is decremented. If the seat
  ///   is taken, fails with `SeatUnavailable`; if the seat is free but no
  ///   seats are left, fails with `ScheduleFull`. Neither failure writes.
  fn reacquire(
    &self,
    hold_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Transition, Self::Error>> + Send + '_;

  // ── Hold reads ────────────────────────────────────────────────────────

  fn get_hold(
    &self,
    hold_id: Uuid,
  ) -> impl Future<Output = Result<Option<SeatHold>, Self::Error>> + Send + '_;

  /// The hold currently carrying `payment_ref`: a reinstatement wins over the
  /// hold it replaced.
  fn get_by_payment_ref<'a>(
    &'a self,
    payment_ref: &'a str,
  ) -> impl Future<Output = Result<Option<SeatHold>, Self::Error>> + Send + 'a;

  /// `PENDING` holds with `expires_at <= now`, oldest first.
  fn list_expired(
    &self,
    now: DateTime<Utc>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<SeatHold>, Self::Error>> + Send + '_;

  /// All holds of a holder, newest first.
  fn holds_for_holder<'a>(
    &'a self,
    holder_id: &'a str,
  ) -> impl Future<Output = Result<Vec<SeatHold>, Self::Error>> + Send + 'a;

  // ── Payment attempts ──────────────────────────────────────────────────

  fn get_payment<'a>(
    &'a self,
    payment_ref: &'a str,
  ) -> impl Future<Output = Result<Option<PaymentAttempt>, Self::Error>> + Send + 'a;

  /// Attach the gateway's checkout handle to an attempt.
  fn record_checkout<'a>(
    &'a self,
    payment_ref: &'a str,
    handle: &'a CheckoutHandle,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<PaymentAttempt, Self::Error>> + Send + 'a;

  /// Move an `INITIATED` attempt to `status`. The first terminal status wins:
  /// later calls leave the attempt unchanged and return it as stored.
  fn record_payment_outcome<'a>(
    &'a self,
    payment_ref: &'a str,
    status: PaymentStatus,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<PaymentAttempt, Self::Error>> + Send + 'a;

  // ── Refund obligations ────────────────────────────────────────────────

  /// Record an obligation, or return the one already recorded for its
  /// payment reference.
  fn record_refund(
    &self,
    obligation: RefundObligation,
  ) -> impl Future<Output = Result<RefundObligation, Self::Error>> + Send + '_;

  fn get_refund<'a>(
    &'a self,
    payment_ref: &'a str,
  ) -> impl Future<Output = Result<Option<RefundObligation>, Self::Error>> + Send + 'a;

  fn list_refunds(
    &self,
    pending_only: bool,
  ) -> impl Future<Output = Result<Vec<RefundObligation>, Self::Error>> + Send + '_;

  /// Mark an obligation as handled. Resolving twice keeps the first
  /// timestamp.
  fn resolve_refund<'a>(
    &'a self,
    payment_ref: &'a str,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<RefundObligation, Self::Error>> + Send + 'a;
}
