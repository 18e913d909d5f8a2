//! [`Sweeper`]: background reclamation of expired holds.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info};

use tizeta_core::{
  clock::Clock,
  hold::{CancelReason, FinalOutcome},
  store::InventoryStore,
  Error, Result,
};

use crate::core;

/// Counts from one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
  /// Holds this pass cancelled.
  pub expired: usize,
  /// Holds finalized by someone else between listing and cancelling.
  pub raced:   usize,
}

pub struct Sweeper<S> {
  store:    Arc<S>,
  clock:    Arc<dyn Clock>,
  interval: Duration,
  batch:    usize,
}

impl<S: InventoryStore> Sweeper<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, interval: Duration, batch: usize) -> Self {
    Self { store, clock, interval, batch: batch.max(1) }
  }

  /// Cancel every hold that was already expired when the pass began.
  pub async fn sweep_once(&self) -> Result<SweepReport> {
    let now = self.clock.now();
    let mut report = SweepReport::default();

    loop {
      let expired = self
        .store
        .list_expired(now, self.batch)
        .await
        .map_err(core)?;
      let exhausted = expired.len() < self.batch;

      for hold in expired {
        match self
          .store
          .finalize(hold.hold_id, FinalOutcome::Cancelled(CancelReason::Expired), now)
          .await
          .map_err(core)
        {
          Ok(transition) if transition.was_applied() => report.expired += 1,
          Ok(transition) => {
            debug!(hold_id = %transition.hold().hold_id, "hold already cancelled");
            report.raced += 1;
          }
          Err(Error::AlreadyFinalized(_)) => report.raced += 1,
          Err(e) => return Err(e),
        }
      }

      if exhausted {
        return Ok(report);
      }
    }
  }

  /// Sweep on every tick until `shutdown` flips to `true` or its sender is
  /// dropped.
  pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(self.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!(interval = ?self.interval, batch = self.batch, "sweeper started");

    loop {
      tokio::select! {
        _ = ticker.tick() => match self.sweep_once().await {
          Ok(report) => info!(expired = report.expired, raced = report.raced, "sweep pass"),
          Err(e) => error!(error = %e, "sweep pass failed"),
        },
        changed = shutdown.changed() => {
          if changed.is_err() || *shutdown.borrow() {
            break;
          }
        }
      }
    }

    info!("sweeper stopped");
  }
}
