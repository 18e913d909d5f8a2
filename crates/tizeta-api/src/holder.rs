//! Holder identity extractor.
//!
//! Credentials are checked upstream; the auth proxy forwards the verified
//! identity in headers and this extractor only reads them.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

pub const HOLDER_ID_HEADER: &str = "x-holder-id";
pub const HOLDER_EMAIL_HEADER: &str = "x-holder-email";

/// The authenticated customer making the request.
#[derive(Debug, Clone)]
pub struct Holder {
  pub id:    String,
  pub email: Option<String>,
}

fn header(parts: &Parts, name: &str) -> Option<String> {
  parts
    .headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(str::to_owned)
}

impl<S: Send + Sync> FromRequestParts<S> for Holder {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let id = header(parts, HOLDER_ID_HEADER).ok_or(ApiError::Unauthorized("missing holder identity"))?;
    Ok(Holder { id, email: header(parts, HOLDER_EMAIL_HEADER) })
  }
}
