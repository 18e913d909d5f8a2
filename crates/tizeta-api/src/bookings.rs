//! Handlers for `/bookings` endpoints.
//!
//! | Method   | Path                 | Notes |
//! |----------|----------------------|-------|
//! | `POST`   | `/bookings`          | Hold a seat and start checkout; `201` |
//! | `GET`    | `/bookings`          | The caller's holds, newest first |
//! | `GET`    | `/bookings/:hold_id` | One hold with its payment attempt |
//! | `DELETE` | `/bookings/:hold_id` | Cancel while `PENDING` |
//!
//! All routes need the `x-holder-id` header; `POST` also needs
//! `x-holder-email` for the gateway.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tizeta_booking::{CheckoutRequest, HoldRequest, HoldView};
use tizeta_core::{
  gateway::PaymentGateway, hold::SeatHold, money::Money, store::InventoryStore,
};
use uuid::Uuid;

use crate::{AppState, error::ApiError, holder::Holder};

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub schedule_id: i64,
  pub seat_id:     String,
  /// Minor units. Informational only: the catalog price is charged.
  pub price:       Option<Money>,
  pub payer_name:  Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Created {
  pub hold_id:      Uuid,
  pub payment_ref:  String,
  pub checkout_url: String,
  pub expires_at:   DateTime<Utc>,
}

/// `POST /bookings`, body: `{"schedule_id":1,"seat_id":"A1"}`
pub async fn create<S, G>(
  State(state): State<AppState<S, G>>,
  holder: Holder,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: InventoryStore,
  G: PaymentGateway,
{
  let payer_email = holder
    .email
    .ok_or_else(|| ApiError::BadRequest("missing x-holder-email header".to_owned()))?;

  let session = state
    .checkout
    .begin(CheckoutRequest {
      hold: HoldRequest {
        schedule_id: body.schedule_id,
        seat_id:     body.seat_id,
        holder_id:   holder.id,
        price:       body.price,
      },
      payer_email,
      payer_name: body.payer_name,
    })
    .await?;

  Ok((
    StatusCode::CREATED,
    Json(Created {
      hold_id:      session.hold.hold_id,
      payment_ref:  session.hold.payment_ref,
      checkout_url: session.checkout_url,
      expires_at:   session.expires_at,
    }),
  ))
}

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /bookings`
pub async fn list<S, G>(
  State(state): State<AppState<S, G>>,
  holder: Holder,
) -> Result<Json<Vec<SeatHold>>, ApiError>
where
  S: InventoryStore,
  G: PaymentGateway,
{
  Ok(Json(state.engine.list_holds(&holder.id).await?))
}

/// `GET /bookings/:hold_id`
pub async fn get_one<S, G>(
  State(state): State<AppState<S, G>>,
  holder: Holder,
  Path(hold_id): Path<Uuid>,
) -> Result<Json<HoldView>, ApiError>
where
  S: InventoryStore,
  G: PaymentGateway,
{
  Ok(Json(state.engine.get_hold(hold_id, &holder.id).await?))
}

// ─── Cancel ───────────────────────────────────────────────────────────────────

/// `DELETE /bookings/:hold_id`
pub async fn cancel<S, G>(
  State(state): State<AppState<S, G>>,
  holder: Holder,
  Path(hold_id): Path<Uuid>,
) -> Result<Json<SeatHold>, ApiError>
where
  S: InventoryStore,
  G: PaymentGateway,
{
  Ok(Json(state.engine.cancel_hold(hold_id, &holder.id).await?))
}
