//! [`Checkout`]: a hold plus the gateway page the holder pays on.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use tizeta_core::{
  gateway::{InitiateRequest, PaymentGateway},
  hold::{CancelReason, FinalOutcome, SeatHold},
  payment::PaymentStatus,
  store::InventoryStore,
  Error, Result,
};

use crate::{core, HoldRequest, ReservationEngine};

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
  pub hold:        HoldRequest,
  pub payer_email: String,
  pub payer_name:  Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
  pub hold:         SeatHold,
  pub checkout_url: String,
  pub expires_at:   DateTime<Utc>,
}

pub struct Checkout<S, G> {
  engine:           Arc<ReservationEngine<S>>,
  gateway:          Arc<G>,
  initiate_timeout: Duration,
}

impl<S: InventoryStore, G: PaymentGateway> Checkout<S, G> {
  pub fn new(
    engine: Arc<ReservationEngine<S>>,
    gateway: Arc<G>,
    initiate_timeout: Duration,
  ) -> Self {
    Self { engine, gateway, initiate_timeout }
  }

  /// Hold the seat, then start the charge.
  ///
  /// A rejected charge cancels the hold straight away. An unreachable gateway
  /// leaves it `PENDING`: the provider may still have started the charge, and
  /// the hold is reclaimed by the sweeper if no callback arrives.
  pub async fn begin(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
    let hold = self.engine.request_hold(request.hold).await?;

    let initiate = InitiateRequest {
      payment_ref: hold.payment_ref.clone(),
      amount:      hold.price,
      currency:    self.engine.policy().currency.clone(),
      payer_email: request.payer_email,
      payer_name:  request.payer_name,
    };

    let outcome =
      match tokio::time::timeout(self.initiate_timeout, self.gateway.initiate(&initiate)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(Error::GatewayUnavailable(format!(
          "no response within {:?}",
          self.initiate_timeout
        ))),
      };

    let store = self.engine.store();
    let now = self.engine.clock().now();

    match outcome {
      Ok(handle) => {
        store
          .record_checkout(&hold.payment_ref, &handle, now)
          .await
          .map_err(core)?;
        info!(
          hold_id = %hold.hold_id,
          payment_ref = %hold.payment_ref,
          "checkout started"
        );
        Ok(CheckoutSession {
          expires_at: hold.expires_at,
          checkout_url: handle.checkout_url,
          hold,
        })
      }
      Err(Error::GatewayRejected(message)) => {
        warn!(
          hold_id = %hold.hold_id,
          payment_ref = %hold.payment_ref,
          %message,
          "gateway rejected charge; releasing seat"
        );
        store
          .record_payment_outcome(&hold.payment_ref, PaymentStatus::Failed, now)
          .await
          .map_err(core)?;
        store
          .finalize(
            hold.hold_id,
            FinalOutcome::Cancelled(CancelReason::GatewayRejected),
            now,
          )
          .await
          .map_err(core)?;
        Err(Error::GatewayRejected(message))
      }
      Err(Error::GatewayUnavailable(message)) => {
        warn!(
          hold_id = %hold.hold_id,
          payment_ref = %hold.payment_ref,
          expires_at = %hold.expires_at,
          %message,
          "could not start checkout; hold left to expire"
        );
        Err(Error::GatewayUnavailable(format!(
          "{message}; hold {} stays pending until {} and can be cancelled",
          hold.hold_id,
          hold.expires_at.to_rfc3339(),
        )))
      }
      Err(e) => Err(e),
    }
  }
}
