//! JSON HTTP API for Tizeta.
//!
//! Exposes an axum [`Router`] over the booking workflows, generic over any
//! [`InventoryStore`] and [`PaymentGateway`]. The `tizeta-server` binary wires
//! it to SQLite and Chapa.

pub mod bookings;
pub mod collaborator;
pub mod error;
pub mod holder;
pub mod payments;
pub mod refunds;
pub mod schedules;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Json, Router,
  routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tizeta_booking::{Checkout, HoldPolicy, ReservationEngine, SettlementCoordinator};
use tizeta_core::{clock::Clock, gateway::PaymentGateway, store::InventoryStore};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `TIZETA_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  pub store_path:          PathBuf,
  #[serde(default = "default_hold_window_secs")]
  pub hold_window_secs:    u64,
  #[serde(default = "default_sweep_interval_secs")]
  pub sweep_interval_secs: u64,
  #[serde(default = "default_sweep_batch")]
  pub sweep_batch:         usize,
  #[serde(default = "default_currency")]
  pub currency:            String,
  /// Bearer token for the catalog and refunds endpoints.
  pub collaborator_token:  String,
  pub gateway:             GatewayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
  #[serde(default = "default_gateway_base_url")]
  pub base_url:       String,
  pub secret_key:     String,
  pub webhook_secret: String,
  pub callback_url:   String,
  pub return_url:     String,
  #[serde(default = "default_gateway_timeout_secs")]
  pub timeout_secs:   u64,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_hold_window_secs() -> u64 { 900 }
fn default_sweep_interval_secs() -> u64 { 30 }
fn default_sweep_batch() -> usize { 100 }
fn default_currency() -> String { "ETB".to_owned() }
fn default_gateway_base_url() -> String { "https://api.chapa.co".to_owned() }
fn default_gateway_timeout_secs() -> u64 { 10 }

impl ServerConfig {
  pub fn hold_policy(&self) -> HoldPolicy {
    HoldPolicy {
      hold_window: chrono::Duration::seconds(
        i64::try_from(self.hold_window_secs).unwrap_or(i64::MAX),
      ),
      currency:    self.currency.clone(),
    }
  }

  pub fn sweep_interval(&self) -> Duration { Duration::from_secs(self.sweep_interval_secs) }

  pub fn gateway_timeout(&self) -> Duration { Duration::from_secs(self.gateway.timeout_secs) }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, G> {
  pub engine:             Arc<ReservationEngine<S>>,
  pub checkout:           Arc<Checkout<S, G>>,
  pub coordinator:        Arc<SettlementCoordinator<S>>,
  pub gateway:            Arc<G>,
  pub collaborator_token: Arc<str>,
}

// `S` and `G` need not be `Clone`.
impl<S, G> Clone for AppState<S, G> {
  fn clone(&self) -> Self {
    Self {
      engine:             self.engine.clone(),
      checkout:           self.checkout.clone(),
      coordinator:        self.coordinator.clone(),
      gateway:            self.gateway.clone(),
      collaborator_token: self.collaborator_token.clone(),
    }
  }
}

impl<S: InventoryStore, G: PaymentGateway> AppState<S, G> {
  /// `initiate_timeout` bounds each gateway call on top of the client's own
  /// timeout.
  pub fn new(
    store: Arc<S>,
    gateway: Arc<G>,
    clock: Arc<dyn Clock>,
    policy: HoldPolicy,
    initiate_timeout: Duration,
    collaborator_token: &str,
  ) -> Self {
    let engine = Arc::new(ReservationEngine::new(store.clone(), clock.clone(), policy));
    Self {
      checkout: Arc::new(Checkout::new(engine.clone(), gateway.clone(), initiate_timeout)),
      coordinator: Arc::new(SettlementCoordinator::new(store, clock)),
      engine,
      gateway,
      collaborator_token: Arc::from(collaborator_token),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S, G>(state: AppState<S, G>) -> Router
where
  S: InventoryStore + 'static,
  G: PaymentGateway + 'static,
{
  Router::new()
    .route("/health", get(health))
    // Bookings
    .route("/bookings", get(bookings::list::<S, G>).post(bookings::create::<S, G>))
    .route(
      "/bookings/{hold_id}",
      get(bookings::get_one::<S, G>).delete(bookings::cancel::<S, G>),
    )
    // Payments
    .route("/payments/callback", post(payments::callback::<S, G>))
    // Catalog (writes need the collaborator token)
    .route(
      "/schedules/{schedule_id}",
      get(schedules::get_one::<S, G>).put(schedules::upsert::<S, G>),
    )
    // Refunds (collaborator token)
    .route("/refunds", get(refunds::list::<S, G>))
    .route("/refunds/{payment_ref}/resolve", post(refunds::resolve::<S, G>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }
