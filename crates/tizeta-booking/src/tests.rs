//! Workflow tests for the booking layer against an in-memory `SqliteStore`.

use std::{
  sync::{Arc, Mutex},
  time::Duration as StdDuration,
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use tizeta_core::{
  clock::ManualClock,
  gateway::{CheckoutHandle, InitiateRequest, ParsedCallback, PaymentGateway, RawCallback},
  hold::{CancelReason, HoldStatus, SeatHold},
  money::Money,
  payment::{CallbackOutcome, PaymentStatus, RefundReason},
  schedule::ScheduleUpsert,
  store::InventoryStore,
  Error,
};
use tizeta_store_sqlite::SqliteStore;

use crate::{
  Checkout, CheckoutRequest, HoldPolicy, HoldRequest, ReservationEngine, Settlement,
  SettlementCoordinator, Sweeper,
};

// ─── Harness ─────────────────────────────────────────────────────────────────

fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() }

const PRICE: Money = Money::from_minor(15_050);

struct Harness {
  store:       Arc<SqliteStore>,
  clock:       ManualClock,
  engine:      Arc<ReservationEngine<SqliteStore>>,
  coordinator: SettlementCoordinator<SqliteStore>,
  sweeper:     Sweeper<SqliteStore>,
}

impl Harness {
  async fn new(capacity: u32) -> Self {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let clock = ManualClock::new(t0());
    let engine = Arc::new(ReservationEngine::new(
      store.clone(),
      Arc::new(clock.clone()),
      HoldPolicy::default(),
    ));
    let coordinator = SettlementCoordinator::new(store.clone(), Arc::new(clock.clone()));
    let sweeper =
      Sweeper::new(store.clone(), Arc::new(clock.clone()), StdDuration::from_millis(10), 2);

    engine
      .upsert_schedule(ScheduleUpsert {
        schedule_id: 1,
        capacity,
        price: PRICE,
        starts_at: t0() + Duration::days(1),
        ends_at: t0() + Duration::days(1) + Duration::hours(2),
      })
      .await
      .unwrap();

    Self { store, clock, engine, coordinator, sweeper }
  }

  async fn hold(&self, seat_id: &str, holder_id: &str) -> tizeta_core::Result<SeatHold> {
    self
      .engine
      .request_hold(HoldRequest {
        schedule_id: 1,
        seat_id:     seat_id.into(),
        holder_id:   holder_id.into(),
        price:       None,
      })
      .await
  }

  async fn status(&self, hold: &SeatHold) -> HoldStatus {
    self.store.get_hold(hold.hold_id).await.unwrap().unwrap().status
  }

  async fn assert_conserved(&self) {
    let occ = self.store.occupancy(1).await.unwrap().unwrap();
    assert!(occ.is_conserved(), "counter out of step: {occ:?}");
  }

  /// Expire `hold` and let the sweeper reclaim it.
  async fn expire(&self, hold: &SeatHold) {
    self.clock.set(hold.expires_at + Duration::seconds(1));
    self.sweeper.sweep_once().await.unwrap();
    assert_eq!(self.status(hold).await, HoldStatus::Cancelled);
  }
}

#[derive(Clone, Copy)]
enum Script {
  Accept,
  Reject,
  Unavailable,
  Hang,
}

struct ScriptedGateway {
  script: Script,
  calls:  Mutex<Vec<InitiateRequest>>,
}

impl ScriptedGateway {
  fn new(script: Script) -> Arc<Self> {
    Arc::new(Self { script, calls: Mutex::new(Vec::new()) })
  }
}

impl PaymentGateway for ScriptedGateway {
  async fn initiate(&self, request: &InitiateRequest) -> tizeta_core::Result<CheckoutHandle> {
    self.calls.lock().unwrap().push(request.clone());
    match self.script {
      Script::Accept => Ok(CheckoutHandle {
        checkout_url:      format!("https://checkout.test/{}", request.payment_ref),
        gateway_reference: Some("GW-42".into()),
      }),
      Script::Reject => Err(Error::GatewayRejected("card declined".into())),
      Script::Unavailable => Err(Error::GatewayUnavailable("connection refused".into())),
      Script::Hang => std::future::pending().await,
    }
  }

  fn parse_callback(&self, _raw: RawCallback<'_>) -> tizeta_core::Result<ParsedCallback> {
    Err(Error::MalformedCallback("scripted gateway sends no callbacks".into()))
  }
}

fn checkout_request(seat_id: &str, holder_id: &str) -> CheckoutRequest {
  CheckoutRequest {
    hold:        HoldRequest {
      schedule_id: 1,
      seat_id:     seat_id.into(),
      holder_id:   holder_id.into(),
      price:       Some(PRICE),
    },
    payer_email: format!("{holder_id}@example.com"),
    payer_name:  None,
  }
}

// ─── Scenario ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_seat_scenario() {
  let h = Harness::new(1).await;

  let a = h.hold("A1", "holder-a").await.unwrap();
  assert!(matches!(
    h.hold("A1", "holder-b").await,
    Err(Error::SeatUnavailable { .. })
  ));

  let settled = h
    .coordinator
    .handle_callback(&a.payment_ref, CallbackOutcome::Succeeded)
    .await
    .unwrap();
  assert!(matches!(&settled, Settlement::Confirmed(hold) if hold.hold_id == a.hold_id));

  assert!(matches!(
    h.hold("A1", "holder-c").await,
    Err(Error::SeatUnavailable { .. })
  ));

  // Still taken after the original window closes: the seat is sold.
  h.clock.advance(Duration::hours(1));
  assert_eq!(h.sweeper.sweep_once().await.unwrap().expired, 0);
  assert!(matches!(
    h.hold("A1", "holder-c").await,
    Err(Error::SeatUnavailable { .. })
  ));
  h.assert_conserved().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_never_double_book() {
  let h = Harness::new(30).await;

  let tasks: Vec<_> = (0..24)
    .map(|i| {
      let engine = h.engine.clone();
      tokio::spawn(async move {
        engine
          .request_hold(HoldRequest {
            schedule_id: 1,
            seat_id:     "D4".into(),
            holder_id:   format!("holder-{i}"),
            price:       None,
          })
          .await
      })
    })
    .collect();

  let mut won = 0;
  for task in tasks {
    match task.await.unwrap() {
      Ok(_) => won += 1,
      Err(Error::SeatUnavailable { .. }) => {}
      Err(e) => panic!("unexpected error: {e}"),
    }
  }
  assert_eq!(won, 1);
  h.assert_conserved().await;
}

// ─── Reservation engine ──────────────────────────────────────────────────────

#[tokio::test]
async fn hold_uses_catalog_price_and_policy_window() {
  let h = Harness::new(5).await;
  let hold = h
    .engine
    .request_hold(HoldRequest {
      schedule_id: 1,
      seat_id:     "A1".into(),
      holder_id:   "alice".into(),
      price:       Some(Money::from_minor(1)),
    })
    .await
    .unwrap();

  assert_eq!(hold.price, PRICE);
  assert_eq!(hold.expires_at, t0() + Duration::minutes(15));
  assert!(hold.payment_ref.starts_with("tzb-"));
}

#[tokio::test]
async fn rejects_bad_requests() {
  let h = Harness::new(5).await;

  assert!(matches!(h.hold("", "alice").await, Err(Error::InvalidRequest(_))));
  assert!(matches!(h.hold("A1234567890", "alice").await, Err(Error::InvalidRequest(_))));
  assert!(matches!(
    h.hold("ሀሁሂሃሄህሆሇለሉሊ", "alice").await,
    Err(Error::InvalidRequest(_))
  ));
  // Length counts characters: four Ethiopic letters are twelve bytes.
  assert_eq!(h.hold("ሀሁሂሃ", "alice").await.unwrap().seat_id, "ሀሁሂሃ");

  let missing = h
    .engine
    .request_hold(HoldRequest {
      schedule_id: 9,
      seat_id:     "A1".into(),
      holder_id:   "alice".into(),
      price:       None,
    })
    .await;
  assert!(matches!(missing, Err(Error::ScheduleNotFound(9))));

  h.clock.set(t0() + Duration::days(1));
  assert!(matches!(h.hold("A1", "alice").await, Err(Error::ScheduleClosed(1))));
}

#[tokio::test]
async fn only_the_owner_cancels_and_only_once() {
  let h = Harness::new(5).await;
  let hold = h.hold("A1", "alice").await.unwrap();

  assert!(matches!(
    h.engine.cancel_hold(hold.hold_id, "mallory").await,
    Err(Error::NotOwner(_))
  ));

  let cancelled = h.engine.cancel_hold(hold.hold_id, "alice").await.unwrap();
  assert_eq!(cancelled.cancel_reason, Some(CancelReason::CancelledByHolder));
  assert!(matches!(
    h.engine.cancel_hold(hold.hold_id, "alice").await,
    Err(Error::AlreadyFinalized(_))
  ));

  h.hold("A1", "bob").await.unwrap();
  h.assert_conserved().await;
}

#[tokio::test]
async fn confirmed_hold_cannot_be_cancelled() {
  let h = Harness::new(5).await;
  let hold = h.hold("A1", "alice").await.unwrap();
  h.coordinator
    .handle_callback(&hold.payment_ref, CallbackOutcome::Succeeded)
    .await
    .unwrap();

  assert!(matches!(
    h.engine.cancel_hold(hold.hold_id, "alice").await,
    Err(Error::AlreadyFinalized(_))
  ));
  assert_eq!(h.status(&hold).await, HoldStatus::Confirmed);
}

#[tokio::test]
async fn hold_view_is_owner_only() {
  let h = Harness::new(5).await;
  let hold = h.hold("A1", "alice").await.unwrap();

  let view = h.engine.get_hold(hold.hold_id, "alice").await.unwrap();
  assert_eq!(view.hold, hold);
  assert_eq!(view.payment.unwrap().status, PaymentStatus::Initiated);

  assert!(matches!(
    h.engine.get_hold(hold.hold_id, "bob").await,
    Err(Error::NotOwner(_))
  ));
  assert_eq!(h.engine.list_holds("alice").await.unwrap().len(), 1);
  assert!(h.engine.list_holds("bob").await.unwrap().is_empty());
}

// ─── Settlement ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_success_callbacks_converge() {
  let h = Harness::new(5).await;
  let hold = h.hold("A1", "alice").await.unwrap();

  let first = h
    .coordinator
    .handle_callback(&hold.payment_ref, CallbackOutcome::Succeeded)
    .await
    .unwrap();
  let second = h
    .coordinator
    .handle_callback(&hold.payment_ref, CallbackOutcome::Succeeded)
    .await
    .unwrap();

  assert!(matches!(first, Settlement::Confirmed(_)));
  assert!(matches!(second, Settlement::Replayed(_)));
  assert_eq!(first.hold(), second.hold());

  let occ = h.store.occupancy(1).await.unwrap().unwrap();
  assert_eq!((occ.confirmed, occ.available), (1, 4));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callbacks_and_sweep_confirm_exactly_once() {
  for _ in 0..10 {
    let h = Harness::new(3).await;
    let hold = h.hold("A1", "alice").await.unwrap();
    h.clock.set(hold.expires_at + Duration::seconds(1));

    let coordinator = Arc::new(SettlementCoordinator::new(
      h.store.clone(),
      Arc::new(h.clock.clone()),
    ));
    let sweeper = Sweeper::new(
      h.store.clone(),
      Arc::new(h.clock.clone()),
      StdDuration::from_millis(10),
      2,
    );

    let callbacks: Vec<_> = (0..6)
      .map(|_| {
        let coordinator = coordinator.clone();
        let payment_ref = hold.payment_ref.clone();
        tokio::spawn(async move {
          coordinator.handle_callback(&payment_ref, CallbackOutcome::Succeeded).await
        })
      })
      .collect();
    let sweep = tokio::spawn(async move { sweeper.sweep_once().await });

    let mut settled = Vec::new();
    for task in callbacks {
      settled.push(task.await.unwrap().unwrap());
    }
    let report = sweep.await.unwrap().unwrap();
    assert!(report.expired + report.raced <= 1, "{report:?}");

    // One callback did the work; every other one replayed it.
    let applied = settled
      .iter()
      .filter(|s| !matches!(s, Settlement::Replayed(_)))
      .count();
    assert_eq!(applied, 1, "{settled:?}");
    let winner = settled[0].hold().hold_id;
    assert!(settled.iter().all(|s| s.hold().hold_id == winner));

    let holds = h.store.holds_for_holder("alice").await.unwrap();
    let confirmed = holds.iter().filter(|x| x.status == HoldStatus::Confirmed).count();
    assert_eq!(confirmed, 1, "{holds:?}");

    let occ = h.store.occupancy(1).await.unwrap().unwrap();
    assert_eq!((occ.confirmed, occ.pending, occ.available), (1, 0, 2));
    h.assert_conserved().await;
    assert!(h.store.list_refunds(false).await.unwrap().is_empty());
  }
}

#[tokio::test]
async fn failed_payment_releases_seat() {
  let h = Harness::new(5).await;
  let hold = h.hold("A1", "alice").await.unwrap();

  let settled = h
    .coordinator
    .handle_callback(&hold.payment_ref, CallbackOutcome::Failed)
    .await
    .unwrap();
  assert!(matches!(settled, Settlement::Cancelled(_)));
  assert_eq!(settled.hold().cancel_reason, Some(CancelReason::PaymentFailed));

  let again = h
    .coordinator
    .handle_callback(&hold.payment_ref, CallbackOutcome::Failed)
    .await
    .unwrap();
  assert!(matches!(again, Settlement::Replayed(_)));

  h.hold("A1", "bob").await.unwrap();
  h.assert_conserved().await;
}

#[tokio::test]
async fn failure_after_confirmation_is_rejected() {
  let h = Harness::new(5).await;
  let hold = h.hold("A1", "alice").await.unwrap();
  h.coordinator
    .handle_callback(&hold.payment_ref, CallbackOutcome::Succeeded)
    .await
    .unwrap();

  let err = h
    .coordinator
    .handle_callback(&hold.payment_ref, CallbackOutcome::Failed)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::AlreadyFinalized(id) if id == hold.hold_id));
  assert_eq!(h.status(&hold).await, HoldStatus::Confirmed);

  let attempt = h.store.get_payment(&hold.payment_ref).await.unwrap().unwrap();
  assert_eq!(attempt.status, PaymentStatus::Succeeded);
}

#[tokio::test]
async fn unknown_payment_ref_is_reported() {
  let h = Harness::new(5).await;
  let err = h
    .coordinator
    .handle_callback("tzb-nope", CallbackOutcome::Succeeded)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UnknownPaymentRef(r) if r == "tzb-nope"));
}

#[tokio::test]
async fn late_payment_before_sweep_confirms_in_place() {
  let h = Harness::new(5).await;
  let hold = h.hold("A1", "alice").await.unwrap();
  h.clock.set(hold.expires_at + Duration::minutes(1));

  let settled = h
    .coordinator
    .handle_callback(&hold.payment_ref, CallbackOutcome::Succeeded)
    .await
    .unwrap();
  assert!(matches!(&settled, Settlement::Confirmed(c) if c.hold_id == hold.hold_id));

  // Nothing left for the sweeper.
  assert_eq!(h.sweeper.sweep_once().await.unwrap().expired, 0);
  h.assert_conserved().await;
}

#[tokio::test]
async fn late_payment_with_free_seat_reinstates() {
  let h = Harness::new(5).await;
  let hold = h.hold("A1", "alice").await.unwrap();
  h.expire(&hold).await;

  let settled = h
    .coordinator
    .handle_callback(&hold.payment_ref, CallbackOutcome::Succeeded)
    .await
    .unwrap();
  let Settlement::Reinstated { original, hold: reinstated } = settled else {
    panic!("expected reinstatement, got {settled:?}");
  };
  assert_eq!(original, hold.hold_id);
  assert_eq!(reinstated.status, HoldStatus::Confirmed);
  assert_eq!(reinstated.holder_id, "alice");
  assert_eq!(reinstated.reinstates, Some(hold.hold_id));

  // A duplicate delivery replays the reinstatement.
  let again = h
    .coordinator
    .handle_callback(&hold.payment_ref, CallbackOutcome::Succeeded)
    .await
    .unwrap();
  assert!(matches!(&again, Settlement::Replayed(r) if r.hold_id == reinstated.hold_id));

  assert!(h.store.list_refunds(false).await.unwrap().is_empty());
  h.assert_conserved().await;
}

#[tokio::test]
async fn late_payment_on_sold_out_schedule_owes_refund() {
  let h = Harness::new(1).await;
  let a = h.hold("A1", "holder-a").await.unwrap();
  h.expire(&a).await;
  let b = h.hold("B2", "holder-b").await.unwrap();

  let err = h
    .coordinator
    .handle_callback(&a.payment_ref, CallbackOutcome::Succeeded)
    .await
    .unwrap_err();
  let Error::ExpiredHold(obligation) = err else {
    panic!("expected refund obligation, got {err:?}");
  };
  assert_eq!(obligation.reason, RefundReason::SoldOut);
  assert_eq!(h.status(&a).await, HoldStatus::Cancelled);
  assert_eq!(h.status(&b).await, HoldStatus::Pending);
  h.assert_conserved().await;
}

#[tokio::test]
async fn late_payment_after_reassignment_owes_refund() {
  let h = Harness::new(1).await;
  let a = h.hold("A1", "holder-a").await.unwrap();
  h.expire(&a).await;

  let b = h.hold("A1", "holder-b").await.unwrap();

  let err = h
    .coordinator
    .handle_callback(&a.payment_ref, CallbackOutcome::Succeeded)
    .await
    .unwrap_err();
  let Error::ExpiredHold(obligation) = err else {
    panic!("expected refund obligation, got {err:?}");
  };
  assert_eq!(obligation.payment_ref, a.payment_ref);
  assert_eq!(obligation.hold_id, a.hold_id);
  assert_eq!(obligation.holder_id, "holder-a");
  assert_eq!(obligation.amount, PRICE);
  assert_eq!(obligation.reason, RefundReason::SeatReassigned);

  // Neither hold moved, and the payment stays collected.
  assert_eq!(h.status(&a).await, HoldStatus::Cancelled);
  assert_eq!(h.status(&b).await, HoldStatus::Pending);
  let attempt = h.store.get_payment(&a.payment_ref).await.unwrap().unwrap();
  assert_eq!(attempt.status, PaymentStatus::Succeeded);

  // Redelivery yields the same obligation, not a second one.
  let again = h
    .coordinator
    .handle_callback(&a.payment_ref, CallbackOutcome::Succeeded)
    .await
    .unwrap_err();
  assert!(matches!(again, Error::ExpiredHold(o) if *o == *obligation));
  assert_eq!(h.coordinator.list_refunds(true).await.unwrap().len(), 1);

  let resolved = h.coordinator.resolve_refund(&a.payment_ref).await.unwrap();
  assert!(resolved.resolved_at.is_some());
  assert!(h.coordinator.list_refunds(true).await.unwrap().is_empty());
  h.assert_conserved().await;
}

#[tokio::test]
async fn payment_after_voluntary_cancel_is_treated_as_late() {
  let h = Harness::new(5).await;
  let hold = h.hold("A1", "alice").await.unwrap();
  h.engine.cancel_hold(hold.hold_id, "alice").await.unwrap();

  let settled = h
    .coordinator
    .handle_callback(&hold.payment_ref, CallbackOutcome::Succeeded)
    .await
    .unwrap();
  assert!(matches!(settled, Settlement::Reinstated { original, .. } if original == hold.hold_id));
  h.assert_conserved().await;
}

#[tokio::test]
async fn payment_after_screening_started_owes_refund() {
  let h = Harness::new(5).await;
  let hold = h.hold("A1", "alice").await.unwrap();
  h.expire(&hold).await;
  h.clock.set(t0() + Duration::days(1) + Duration::minutes(5));

  let err = h
    .coordinator
    .handle_callback(&hold.payment_ref, CallbackOutcome::Succeeded)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ExpiredHold(o) if o.reason == RefundReason::ScheduleClosed));
  assert_eq!(h.store.occupancy(1).await.unwrap().unwrap().confirmed, 0);
}

// ─── Sweeper ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sweep_reclaims_only_expired_holds() {
  let h = Harness::new(10).await;
  let early = h.hold("A1", "alice").await.unwrap();
  let paid = h.hold("A2", "bob").await.unwrap();
  h.coordinator
    .handle_callback(&paid.payment_ref, CallbackOutcome::Succeeded)
    .await
    .unwrap();

  h.clock.advance(Duration::minutes(10));
  let late = h.hold("A3", "carol").await.unwrap();
  assert_eq!(h.sweeper.sweep_once().await.unwrap().expired, 0);

  h.clock.set(early.expires_at);
  let report = h.sweeper.sweep_once().await.unwrap();
  assert_eq!((report.expired, report.raced), (1, 0));
  assert_eq!(h.status(&early).await, HoldStatus::Cancelled);
  assert_eq!(h.status(&paid).await, HoldStatus::Confirmed);
  assert_eq!(h.status(&late).await, HoldStatus::Pending);

  // The seat can be held again.
  h.hold("A1", "dave").await.unwrap();
  h.assert_conserved().await;
}

#[tokio::test]
async fn sweep_drains_more_than_one_batch() {
  let h = Harness::new(10).await;
  for seat in ["B1", "B2", "B3", "B4", "B5"] {
    h.hold(seat, "alice").await.unwrap();
  }
  h.clock.advance(Duration::hours(1));

  let report = h.sweeper.sweep_once().await.unwrap();
  assert_eq!(report.expired, 5);
  assert_eq!(h.store.occupancy(1).await.unwrap().unwrap().available, 10);
}

#[tokio::test]
async fn sweeper_task_runs_until_shutdown() {
  let h = Harness::new(5).await;
  let hold = h.hold("A1", "alice").await.unwrap();
  h.clock.set(hold.expires_at + Duration::seconds(1));

  let Harness { store, sweeper, .. } = h;
  let (tx, rx) = tokio::sync::watch::channel(false);
  let task = tokio::spawn(sweeper.run(rx));

  let reclaimed = tokio::time::timeout(StdDuration::from_secs(5), async {
    loop {
      let status = store.get_hold(hold.hold_id).await.unwrap().unwrap().status;
      if status == HoldStatus::Cancelled {
        break;
      }
      tokio::time::sleep(StdDuration::from_millis(5)).await;
    }
  })
  .await;
  assert!(reclaimed.is_ok(), "sweeper never cancelled the hold");

  tx.send(true).unwrap();
  tokio::time::timeout(StdDuration::from_secs(5), task)
    .await
    .expect("sweeper did not stop")
    .unwrap();
}

// ─── Checkout ────────────────────────────────────────────────────────────────

fn checkout(h: &Harness, gateway: Arc<ScriptedGateway>) -> Checkout<SqliteStore, ScriptedGateway> {
  Checkout::new(h.engine.clone(), gateway, StdDuration::from_millis(100))
}

#[tokio::test]
async fn checkout_records_gateway_page() {
  let h = Harness::new(5).await;
  let gateway = ScriptedGateway::new(Script::Accept);
  let session = checkout(&h, gateway.clone())
    .begin(checkout_request("A1", "alice"))
    .await
    .unwrap();

  assert_eq!(session.hold.status, HoldStatus::Pending);
  assert_eq!(session.expires_at, session.hold.expires_at);
  assert!(session.checkout_url.ends_with(&session.hold.payment_ref));

  let calls = gateway.calls.lock().unwrap().clone();
  assert_eq!(calls.len(), 1);
  assert_eq!(calls[0].amount, PRICE);
  assert_eq!(calls[0].currency, "ETB");
  assert_eq!(calls[0].payer_email, "alice@example.com");

  let attempt = h.store.get_payment(&session.hold.payment_ref).await.unwrap().unwrap();
  assert_eq!(attempt.checkout_url.as_deref(), Some(session.checkout_url.as_str()));
  assert_eq!(attempt.gateway_reference.as_deref(), Some("GW-42"));
}

#[tokio::test]
async fn rejected_checkout_releases_seat() {
  let h = Harness::new(5).await;
  let err = checkout(&h, ScriptedGateway::new(Script::Reject))
    .begin(checkout_request("A1", "alice"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::GatewayRejected(_)));

  let holds = h.engine.list_holds("alice").await.unwrap();
  assert_eq!(holds.len(), 1);
  assert_eq!(holds[0].status, HoldStatus::Cancelled);
  assert_eq!(holds[0].cancel_reason, Some(CancelReason::GatewayRejected));
  let attempt = h.store.get_payment(&holds[0].payment_ref).await.unwrap().unwrap();
  assert_eq!(attempt.status, PaymentStatus::Failed);

  h.hold("A1", "bob").await.unwrap();
  h.assert_conserved().await;
}

#[tokio::test]
async fn unavailable_gateway_leaves_hold_pending() {
  let h = Harness::new(5).await;
  for script in [Script::Unavailable, Script::Hang] {
    h.clock.advance(Duration::hours(1));
    h.sweeper.sweep_once().await.unwrap();

    let err = checkout(&h, ScriptedGateway::new(script))
      .begin(checkout_request("A1", "alice"))
      .await
      .unwrap_err();
    let latest = h.engine.list_holds("alice").await.unwrap().remove(0);
    assert_eq!(latest.status, HoldStatus::Pending);
    let Error::GatewayUnavailable(message) = err else {
      panic!("expected gateway unavailable, got {err:?}");
    };
    assert!(message.contains(&latest.hold_id.to_string()), "{message}");
  }
  h.assert_conserved().await;
}
