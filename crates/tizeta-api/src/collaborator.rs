//! Bearer-token extractor for the catalog and refunds collaborators.
//!
//! Schedule sync and refund handling are service-to-service calls. They carry
//! `Authorization: Bearer <collaborator_token>` instead of a holder identity.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use tizeta_core::{gateway::PaymentGateway, store::InventoryStore};

use crate::{AppState, error::ApiError};

/// Zero-size marker: present in the handler means the caller holds the
/// collaborator token.
pub struct Collaborator;

/// Check the bearer token in `headers` against `expected`.
///
/// An empty `expected` token matches nothing.
pub fn verify_token(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
  let presented = headers
    .get(AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .ok_or(ApiError::Unauthorized("missing collaborator token"))?;

  if expected.is_empty()
    || !constant_time_eq::constant_time_eq(presented.as_bytes(), expected.as_bytes())
  {
    return Err(ApiError::Unauthorized("invalid collaborator token"));
  }
  Ok(())
}

impl<S, G> FromRequestParts<AppState<S, G>> for Collaborator
where
  S: InventoryStore,
  G: PaymentGateway,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, G>,
  ) -> Result<Self, Self::Rejection> {
    verify_token(&parts.headers, &state.collaborator_token)?;
    Ok(Collaborator)
  }
}
