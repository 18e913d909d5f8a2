//! Handlers for the refunds collaborator. Both require [`Collaborator`].

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use tizeta_core::{gateway::PaymentGateway, payment::RefundObligation, store::InventoryStore};

use crate::{AppState, collaborator::Collaborator, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub pending: bool,
}

/// `GET /refunds[?pending=true]`
pub async fn list<S, G>(
  State(state): State<AppState<S, G>>,
  _: Collaborator,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<RefundObligation>>, ApiError>
where
  S: InventoryStore,
  G: PaymentGateway,
{
  Ok(Json(state.coordinator.list_refunds(params.pending).await?))
}

/// `POST /refunds/:payment_ref/resolve`
pub async fn resolve<S, G>(
  State(state): State<AppState<S, G>>,
  _: Collaborator,
  Path(payment_ref): Path<String>,
) -> Result<Json<RefundObligation>, ApiError>
where
  S: InventoryStore,
  G: PaymentGateway,
{
  Ok(Json(state.coordinator.resolve_refund(&payment_ref).await?))
}
