//! Handlers for `/schedules` endpoints.
//!
//! The catalog service owns schedules and pushes them here with `PUT`; the
//! store owns only the live seat counter.

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tizeta_core::{
  gateway::PaymentGateway,
  money::Money,
  schedule::{Schedule, ScheduleUpsert},
  store::InventoryStore,
};

use crate::{AppState, collaborator::Collaborator, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct UpsertBody {
  pub capacity:  u32,
  /// Minor units.
  pub price:     Money,
  pub starts_at: DateTime<Utc>,
  pub ends_at:   DateTime<Utc>,
}

/// `PUT /schedules/:schedule_id`
pub async fn upsert<S, G>(
  State(state): State<AppState<S, G>>,
  _: Collaborator,
  Path(schedule_id): Path<i64>,
  Json(body): Json<UpsertBody>,
) -> Result<Json<Schedule>, ApiError>
where
  S: InventoryStore,
  G: PaymentGateway,
{
  let schedule = state
    .engine
    .upsert_schedule(ScheduleUpsert {
      schedule_id,
      capacity: body.capacity,
      price: body.price,
      starts_at: body.starts_at,
      ends_at: body.ends_at,
    })
    .await?;
  Ok(Json(schedule))
}

/// `GET /schedules/:schedule_id`
pub async fn get_one<S, G>(
  State(state): State<AppState<S, G>>,
  Path(schedule_id): Path<i64>,
) -> Result<Json<Schedule>, ApiError>
where
  S: InventoryStore,
  G: PaymentGateway,
{
  Ok(Json(state.engine.get_schedule(schedule_id).await?))
}
