//! `POST /payments/callback`: the gateway's webhook.
//!
//! The raw body is handed to the gateway for signature verification before
//! anything is parsed. A bad signature is `401` and never settles a hold.

use axum::{Json, extract::State, http::HeaderMap};
use bytes::Bytes;
use tizeta_booking::Settlement;
use tizeta_chapa::{LEGACY_SIGNATURE_HEADER, SIGNATURE_HEADER};
use tizeta_core::{
  gateway::{PaymentGateway, RawCallback},
  store::InventoryStore,
};
use tracing::warn;

use crate::{AppState, error::ApiError};

pub async fn callback<S, G>(
  State(state): State<AppState<S, G>>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Json<Settlement>, ApiError>
where
  S: InventoryStore,
  G: PaymentGateway,
{
  let signature = headers
    .get(SIGNATURE_HEADER)
    .or_else(|| headers.get(LEGACY_SIGNATURE_HEADER))
    .and_then(|v| v.to_str().ok());

  let parsed = state
    .gateway
    .parse_callback(RawCallback { body: &body, signature })
    .inspect_err(|e| warn!(error = %e, "rejected payment callback"))?;

  let settlement = state
    .coordinator
    .handle_callback(&parsed.payment_ref, parsed.outcome)
    .await?;
  Ok(Json(settlement))
}
