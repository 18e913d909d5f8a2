//! [`SqliteStore`]: the SQLite implementation of [`InventoryStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use tizeta_core::{
  gateway::CheckoutHandle,
  hold::{FinalOutcome, HoldStatus, NewHold, SeatHold, Transition},
  payment::{PaymentAttempt, PaymentStatus, RefundObligation},
  schedule::{Occupancy, Schedule, ScheduleUpsert},
  store::InventoryStore,
};

use crate::{
  encode::{
    encode_dt, encode_uuid, RawHold, RawPayment, RawRefund, RawSchedule, HOLD_COLUMNS,
    PAYMENT_COLUMNS, REFUND_COLUMNS, SCHEDULE_COLUMNS,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tizeta inventory store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted, and all
/// clones funnel into the same connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────
//
// These run on the connection thread, inside whatever transaction the caller
// holds (`Transaction` derefs to `Connection`).

fn select_hold(
  conn: &rusqlite::Connection,
  hold_id: &str,
) -> rusqlite::Result<Option<RawHold>> {
  conn
    .query_row(
      &format!("SELECT {HOLD_COLUMNS} FROM holds WHERE hold_id = ?1"),
      rusqlite::params![hold_id],
      RawHold::from_row,
    )
    .optional()
}

fn fetch_hold(conn: &rusqlite::Connection, hold_id: &str) -> rusqlite::Result<RawHold> {
  conn.query_row(
    &format!("SELECT {HOLD_COLUMNS} FROM holds WHERE hold_id = ?1"),
    rusqlite::params![hold_id],
    RawHold::from_row,
  )
}

fn select_reinstatement(
  conn: &rusqlite::Connection,
  original_id: &str,
) -> rusqlite::Result<Option<RawHold>> {
  conn
    .query_row(
      &format!("SELECT {HOLD_COLUMNS} FROM holds WHERE reinstates = ?1"),
      rusqlite::params![original_id],
      RawHold::from_row,
    )
    .optional()
}

fn select_schedule(
  conn: &rusqlite::Connection,
  schedule_id: i64,
) -> rusqlite::Result<Option<RawSchedule>> {
  conn
    .query_row(
      &format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE schedule_id = ?1"),
      rusqlite::params![schedule_id],
      RawSchedule::from_row,
    )
    .optional()
}

fn select_payment(
  conn: &rusqlite::Connection,
  payment_ref: &str,
) -> rusqlite::Result<Option<RawPayment>> {
  conn
    .query_row(
      &format!("SELECT {PAYMENT_COLUMNS} FROM payment_attempts WHERE payment_ref = ?1"),
      rusqlite::params![payment_ref],
      RawPayment::from_row,
    )
    .optional()
}

fn select_refund(
  conn: &rusqlite::Connection,
  payment_ref: &str,
) -> rusqlite::Result<Option<RawRefund>> {
  conn
    .query_row(
      &format!("SELECT {REFUND_COLUMNS} FROM refund_obligations WHERE payment_ref = ?1"),
      rusqlite::params![payment_ref],
      RawRefund::from_row,
    )
    .optional()
}

/// Seats of a schedule currently held or sold.
fn occupied_count(conn: &rusqlite::Connection, schedule_id: i64) -> rusqlite::Result<i64> {
  conn.query_row(
    "SELECT COUNT(*) FROM holds
     WHERE schedule_id = ?1 AND status IN ('PENDING', 'CONFIRMED')",
    rusqlite::params![schedule_id],
    |r| r.get(0),
  )
}

fn seat_taken(
  conn: &rusqlite::Connection,
  schedule_id: i64,
  seat_id: &str,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM holds
         WHERE schedule_id = ?1 AND seat_id = ?2 AND status IN ('PENDING', 'CONFIRMED')",
        rusqlite::params![schedule_id, seat_id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

/// Take one seat off the counter; `false` if none are left.
fn claim_seat(conn: &rusqlite::Connection, schedule_id: i64) -> rusqlite::Result<bool> {
  let changed = conn.execute(
    "UPDATE schedules SET available_seats = available_seats - 1
     WHERE schedule_id = ?1 AND available_seats > 0",
    rusqlite::params![schedule_id],
  )?;
  Ok(changed == 1)
}

fn release_seat(conn: &rusqlite::Connection, schedule_id: i64) -> rusqlite::Result<()> {
  conn.execute(
    "UPDATE schedules SET available_seats = available_seats + 1 WHERE schedule_id = ?1",
    rusqlite::params![schedule_id],
  )?;
  Ok(())
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

fn decode_holds(raws: Vec<RawHold>) -> Result<Vec<SeatHold>> {
  raws.into_iter().map(RawHold::into_hold).collect()
}

// ─── Transaction outcomes ────────────────────────────────────────────────────
//
// Closures passed to `Connection::call` can only fail with a database error,
// so domain outcomes travel back as values and are mapped to errors here.

enum Acquire {
  Acquired(RawHold),
  NoSchedule,
  SeatTaken,
}

enum Finalize {
  Applied(RawHold),
  Replayed(RawHold),
  Conflict,
  Missing,
}

enum Reacquire {
  Applied(RawHold),
  Replayed(RawHold),
  SeatTaken { schedule_id: i64, seat_id: String },
  SoldOut(i64),
  Missing,
}

enum Upsert {
  Stored(RawSchedule),
  BelowOccupied(i64),
}

// ─── InventoryStore impl ─────────────────────────────────────────────────────

impl InventoryStore for SqliteStore {
  type Error = Error;

  // ── Schedules ─────────────────────────────────────────────────────────────

  async fn upsert_schedule(
    &self,
    schedule: ScheduleUpsert,
    at: DateTime<Utc>,
  ) -> Result<Schedule> {
    schedule.validate()?;

    let schedule_id = schedule.schedule_id;
    let capacity    = i64::from(schedule.capacity);
    let price       = schedule.price.minor();
    let starts_str  = encode_dt(schedule.starts_at);
    let ends_str    = encode_dt(schedule.ends_at);
    let at_str      = encode_dt(at);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let occupied = occupied_count(&tx, schedule_id)?;
        if capacity < occupied {
          return Ok(Upsert::BelowOccupied(occupied));
        }

        tx.execute(
          "INSERT INTO schedules (
             schedule_id, capacity, price, starts_at, ends_at, available_seats, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT (schedule_id) DO UPDATE SET
             capacity        = excluded.capacity,
             price           = excluded.price,
             starts_at       = excluded.starts_at,
             ends_at         = excluded.ends_at,
             available_seats = excluded.available_seats,
             updated_at      = excluded.updated_at",
          rusqlite::params![
            schedule_id,
            capacity,
            price,
            starts_str,
            ends_str,
            capacity - occupied,
            at_str,
          ],
        )?;

        let raw = tx.query_row(
          &format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE schedule_id = ?1"),
          rusqlite::params![schedule_id],
          RawSchedule::from_row,
        )?;
        tx.commit()?;
        Ok(Upsert::Stored(raw))
      })
      .await?;

    match outcome {
      Upsert::Stored(raw) => raw.into_schedule(),
      Upsert::BelowOccupied(occupied) => Err(
        tizeta_core::Error::InvalidSchedule(format!(
          "schedule {schedule_id}: capacity {capacity} is below the {occupied} seats \
           already held"
        ))
        .into(),
      ),
    }
  }

  async fn get_schedule(&self, schedule_id: i64) -> Result<Option<Schedule>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_schedule(conn, schedule_id)?))
      .await?;
    raw.map(RawSchedule::into_schedule).transpose()
  }

  async fn occupancy(&self, schedule_id: i64) -> Result<Option<Occupancy>> {
    let counts: Option<(i64, i64, i64, i64)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(schedule) = select_schedule(&tx, schedule_id)? else {
          return Ok(None);
        };
        let (pending, confirmed): (i64, i64) = tx.query_row(
          "SELECT
             COALESCE(SUM(status = 'PENDING'), 0),
             COALESCE(SUM(status = 'CONFIRMED'), 0)
           FROM holds WHERE schedule_id = ?1",
          rusqlite::params![schedule_id],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        Ok(Some((schedule.capacity, schedule.available_seats, pending, confirmed)))
      })
      .await?;

    let to_u32 = |n: i64| {
      u32::try_from(n).map_err(|_| Error::Decode(format!("seat count out of range: {n}")))
    };

    counts
      .map(|(capacity, available, pending, confirmed)| {
        Ok(Occupancy {
          capacity:  to_u32(capacity)?,
          available: to_u32(available)?,
          pending:   to_u32(pending)?,
          confirmed: to_u32(confirmed)?,
        })
      })
      .transpose()
  }

  // ── Seat acquisition ──────────────────────────────────────────────────────

  async fn try_acquire(&self, hold: NewHold) -> Result<SeatHold> {
    let hold_id_str  = encode_uuid(hold.hold_id);
    let schedule_id  = hold.schedule_id;
    let seat_id      = hold.seat_id.clone();
    let holder_id    = hold.holder_id;
    let price        = hold.price.minor();
    let currency     = hold.currency;
    let payment_ref  = hold.payment_ref;
    let created_str  = encode_dt(hold.created_at);
    let expires_str  = encode_dt(hold.expires_at);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if select_schedule(&tx, schedule_id)?.is_none() {
          return Ok(Acquire::NoSchedule);
        }
        if seat_taken(&tx, schedule_id, &seat_id)? || !claim_seat(&tx, schedule_id)? {
          return Ok(Acquire::SeatTaken);
        }

        tx.execute(
          "INSERT INTO payment_attempts (
             payment_ref, amount, currency, status, created_at, updated_at
           ) VALUES (?1, ?2, ?3, 'INITIATED', ?4, ?4)",
          rusqlite::params![payment_ref, price, currency, created_str],
        )?;

        let inserted = tx.execute(
          "INSERT INTO holds (
             hold_id, schedule_id, seat_id, holder_id, price, payment_ref,
             status, created_at, expires_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'PENDING', ?7, ?8)",
          rusqlite::params![
            hold_id_str,
            schedule_id,
            seat_id,
            holder_id,
            price,
            payment_ref,
            created_str,
            expires_str,
          ],
        );
        match inserted {
          Ok(_) => {}
          // Another writer on the same file got there first.
          Err(e) if is_unique_violation(&e) => return Ok(Acquire::SeatTaken),
          Err(e) => return Err(e.into()),
        }

        let raw = fetch_hold(&tx, &hold_id_str)?;
        tx.commit()?;
        Ok(Acquire::Acquired(raw))
      })
      .await?;

    match outcome {
      Acquire::Acquired(raw) => raw.into_hold(),
      Acquire::NoSchedule => Err(tizeta_core::Error::ScheduleNotFound(schedule_id).into()),
      Acquire::SeatTaken => Err(
        tizeta_core::Error::SeatUnavailable { schedule_id, seat_id: hold.seat_id }.into(),
      ),
    }
  }

  async fn finalize(
    &self,
    hold_id: Uuid,
    outcome: FinalOutcome,
    at: DateTime<Utc>,
  ) -> Result<Transition> {
    let id_str     = encode_uuid(hold_id);
    let target     = outcome.status().as_str();
    let reason_str = outcome.cancel_reason().map(|r| r.as_str());
    let at_str     = encode_dt(at);

    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(raw) = select_hold(&tx, &id_str)? else {
          return Ok(Finalize::Missing);
        };
        if raw.status == target {
          return Ok(Finalize::Replayed(raw));
        }
        if raw.status != HoldStatus::Pending.as_str() {
          return Ok(Finalize::Conflict);
        }

        tx.execute(
          "UPDATE holds SET status = ?1, cancel_reason = ?2, finalized_at = ?3
           WHERE hold_id = ?4 AND status = 'PENDING'",
          rusqlite::params![target, reason_str, at_str, id_str],
        )?;
        if target == HoldStatus::Cancelled.as_str() {
          release_seat(&tx, raw.schedule_id)?;
        }

        let updated = fetch_hold(&tx, &id_str)?;
        tx.commit()?;
        Ok(Finalize::Applied(updated))
      })
      .await?;

    match result {
      Finalize::Applied(raw) => Ok(Transition::Applied(raw.into_hold()?)),
      Finalize::Replayed(raw) => Ok(Transition::Replayed(raw.into_hold()?)),
      Finalize::Conflict => Err(tizeta_core::Error::AlreadyFinalized(hold_id).into()),
      Finalize::Missing => Err(tizeta_core::Error::HoldNotFound(hold_id).into()),
    }
  }

  async fn reacquire(&self, hold_id: Uuid, at: DateTime<Utc>) -> Result<Transition> {
    let id_str     = encode_uuid(hold_id);
    let new_id_str = encode_uuid(Uuid::new_v4());
    let at_str     = encode_dt(at);

    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(raw) = select_hold(&tx, &id_str)? else {
          return Ok(Reacquire::Missing);
        };

        if raw.status == HoldStatus::Confirmed.as_str() {
          return Ok(Reacquire::Replayed(raw));
        }

        if raw.status == HoldStatus::Pending.as_str() {
          tx.execute(
            "UPDATE holds SET status = 'CONFIRMED', finalized_at = ?1
             WHERE hold_id = ?2 AND status = 'PENDING'",
            rusqlite::params![at_str, id_str],
          )?;
          let updated = fetch_hold(&tx, &id_str)?;
          tx.commit()?;
          return Ok(Reacquire::Applied(updated));
        }

        if let Some(existing) = select_reinstatement(&tx, &id_str)? {
          return Ok(Reacquire::Replayed(existing));
        }

        if seat_taken(&tx, raw.schedule_id, &raw.seat_id)? {
          return Ok(Reacquire::SeatTaken {
            schedule_id: raw.schedule_id,
            seat_id:     raw.seat_id,
          });
        }
        if !claim_seat(&tx, raw.schedule_id)? {
          return Ok(Reacquire::SoldOut(raw.schedule_id));
        }

        tx.execute(
          "INSERT INTO holds (
             hold_id, schedule_id, seat_id, holder_id, price, payment_ref,
             status, created_at, expires_at, finalized_at, reinstates
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'CONFIRMED', ?7, ?8, ?7, ?9)",
          rusqlite::params![
            new_id_str,
            raw.schedule_id,
            raw.seat_id,
            raw.holder_id,
            raw.price,
            raw.payment_ref,
            at_str,
            raw.expires_at,
            id_str,
          ],
        )?;

        let created = fetch_hold(&tx, &new_id_str)?;
        tx.commit()?;
        Ok(Reacquire::Applied(created))
      })
      .await?;

    match result {
      Reacquire::Applied(raw) => Ok(Transition::Applied(raw.into_hold()?)),
      Reacquire::Replayed(raw) => Ok(Transition::Replayed(raw.into_hold()?)),
      Reacquire::SeatTaken { schedule_id, seat_id } => {
        Err(tizeta_core::Error::SeatUnavailable { schedule_id, seat_id }.into())
      }
      Reacquire::SoldOut(schedule_id) => {
        Err(tizeta_core::Error::ScheduleFull(schedule_id).into())
      }
      Reacquire::Missing => Err(tizeta_core::Error::HoldNotFound(hold_id).into()),
    }
  }

  // ── Hold reads ────────────────────────────────────────────────────────────

  async fn get_hold(&self, hold_id: Uuid) -> Result<Option<SeatHold>> {
    let id_str = encode_uuid(hold_id);
    let raw = self
      .conn
      .call(move |conn| Ok(select_hold(conn, &id_str)?))
      .await?;
    raw.map(RawHold::into_hold).transpose()
  }

  async fn get_by_payment_ref(&self, payment_ref: &str) -> Result<Option<SeatHold>> {
    let payment_ref = payment_ref.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {HOLD_COLUMNS} FROM holds WHERE payment_ref = ?1
                 ORDER BY reinstates IS NULL LIMIT 1"
              ),
              rusqlite::params![payment_ref],
              RawHold::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawHold::into_hold).transpose()
  }

  async fn list_expired(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<SeatHold>> {
    let now_str   = encode_dt(now);
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {HOLD_COLUMNS} FROM holds
           WHERE status = 'PENDING' AND expires_at <= ?1
           ORDER BY expires_at LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![now_str, limit_val], RawHold::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    decode_holds(raws)
  }

  async fn holds_for_holder(&self, holder_id: &str) -> Result<Vec<SeatHold>> {
    let holder_id = holder_id.to_owned();
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {HOLD_COLUMNS} FROM holds WHERE holder_id = ?1
           ORDER BY created_at DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![holder_id], RawHold::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    decode_holds(raws)
  }

  // ── Payment attempts ──────────────────────────────────────────────────────

  async fn get_payment(&self, payment_ref: &str) -> Result<Option<PaymentAttempt>> {
    let payment_ref = payment_ref.to_owned();
    let raw = self
      .conn
      .call(move |conn| Ok(select_payment(conn, &payment_ref)?))
      .await?;
    raw.map(RawPayment::into_payment).transpose()
  }

  async fn record_checkout(
    &self,
    payment_ref: &str,
    handle: &CheckoutHandle,
    at: DateTime<Utc>,
  ) -> Result<PaymentAttempt> {
    let ref_str      = payment_ref.to_owned();
    let checkout_url = handle.checkout_url.clone();
    let gateway_ref  = handle.gateway_reference.clone();
    let at_str       = encode_dt(at);

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE payment_attempts
           SET checkout_url = ?1,
               gateway_reference = COALESCE(?2, gateway_reference),
               updated_at = ?3
           WHERE payment_ref = ?4",
          rusqlite::params![checkout_url, gateway_ref, at_str, ref_str],
        )?;
        Ok(select_payment(conn, &ref_str)?)
      })
      .await?;

    raw
      .map(RawPayment::into_payment)
      .transpose()?
      .ok_or_else(|| tizeta_core::Error::UnknownPaymentRef(payment_ref.to_owned()).into())
  }

  async fn record_payment_outcome(
    &self,
    payment_ref: &str,
    status: PaymentStatus,
    at: DateTime<Utc>,
  ) -> Result<PaymentAttempt> {
    if status == PaymentStatus::Initiated {
      return Err(
        tizeta_core::Error::InvalidRequest(
          "a payment outcome must be SUCCEEDED or FAILED".to_owned(),
        )
        .into(),
      );
    }

    let ref_str    = payment_ref.to_owned();
    let status_str = status.as_str();
    let at_str     = encode_dt(at);

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE payment_attempts SET status = ?1, updated_at = ?2
           WHERE payment_ref = ?3 AND status = 'INITIATED'",
          rusqlite::params![status_str, at_str, ref_str],
        )?;
        Ok(select_payment(conn, &ref_str)?)
      })
      .await?;

    raw
      .map(RawPayment::into_payment)
      .transpose()?
      .ok_or_else(|| tizeta_core::Error::UnknownPaymentRef(payment_ref.to_owned()).into())
  }

  // ── Refund obligations ────────────────────────────────────────────────────

  async fn record_refund(&self, obligation: RefundObligation) -> Result<RefundObligation> {
    let ref_str      = obligation.payment_ref.clone();
    let hold_id_str  = encode_uuid(obligation.hold_id);
    let holder_id    = obligation.holder_id;
    let amount       = obligation.amount.minor();
    let currency     = obligation.currency;
    let reason_str   = obligation.reason.as_str();
    let recorded_str = encode_dt(obligation.recorded_at);
    let resolved_str = obligation.resolved_at.map(encode_dt);

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO refund_obligations (
             payment_ref, hold_id, holder_id, amount, currency, reason,
             recorded_at, resolved_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT (payment_ref) DO NOTHING",
          rusqlite::params![
            ref_str,
            hold_id_str,
            holder_id,
            amount,
            currency,
            reason_str,
            recorded_str,
            resolved_str,
          ],
        )?;
        Ok(conn.query_row(
          &format!("SELECT {REFUND_COLUMNS} FROM refund_obligations WHERE payment_ref = ?1"),
          rusqlite::params![ref_str],
          RawRefund::from_row,
        )?)
      })
      .await?;

    raw.into_refund()
  }

  async fn get_refund(&self, payment_ref: &str) -> Result<Option<RefundObligation>> {
    let payment_ref = payment_ref.to_owned();
    let raw = self
      .conn
      .call(move |conn| Ok(select_refund(conn, &payment_ref)?))
      .await?;
    raw.map(RawRefund::into_refund).transpose()
  }

  async fn list_refunds(&self, pending_only: bool) -> Result<Vec<RefundObligation>> {
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REFUND_COLUMNS} FROM refund_obligations
           WHERE ?1 = 0 OR resolved_at IS NULL
           ORDER BY recorded_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![pending_only], RawRefund::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRefund::into_refund).collect()
  }

  async fn resolve_refund(
    &self,
    payment_ref: &str,
    at: DateTime<Utc>,
  ) -> Result<RefundObligation> {
    let ref_str = payment_ref.to_owned();
    let at_str  = encode_dt(at);

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE refund_obligations SET resolved_at = COALESCE(resolved_at, ?1)
           WHERE payment_ref = ?2",
          rusqlite::params![at_str, ref_str],
        )?;
        Ok(select_refund(conn, &ref_str)?)
      })
      .await?;

    raw
      .map(RawRefund::into_refund)
      .transpose()?
      .ok_or_else(|| tizeta_core::Error::RefundNotFound(payment_ref.to_owned()).into())
  }
}
