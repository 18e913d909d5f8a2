//! [`PaymentGateway`] implementation for the Chapa payment provider.
//!
//! Outbound: `POST {base_url}/v1/transaction/initialize` with the merchant's
//! bearer secret. Inbound: signed webhooks, verified with
//! [`signature::verify`] before any field is read.

mod error;
pub mod signature;
mod wire;

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};

use tizeta_core::{
  gateway::{CheckoutHandle, InitiateRequest, ParsedCallback, PaymentGateway, RawCallback},
  payment::CallbackOutcome,
};

pub use error::{Error, Result};

/// Webhook header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-chapa-signature";
/// Older header name some Chapa accounts still send.
pub const LEGACY_SIGNATURE_HEADER: &str = "chapa-signature";

#[derive(Debug, Clone)]
pub struct ChapaConfig {
  pub base_url:       String,
  pub secret_key:     String,
  pub webhook_secret: String,
  /// Where Chapa posts webhooks.
  pub callback_url:   String,
  /// Where the payer's browser lands after checkout.
  pub return_url:     String,
  pub timeout:        Duration,
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ChapaGateway {
  http:   reqwest::Client,
  config: ChapaConfig,
}

impl ChapaGateway {
  pub fn new(config: ChapaConfig) -> Result<Self> {
    let http = reqwest::Client::builder().timeout(config.timeout).build()?;
    Ok(Self { http, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  async fn initialize(&self, request: &InitiateRequest) -> Result<CheckoutHandle> {
    let (first_name, last_name) = split_name(request.payer_name.as_deref());
    let body = wire::InitializeRequest {
      amount: request.amount.to_decimal_string(),
      currency: &request.currency,
      email: &request.payer_email,
      first_name,
      last_name,
      tx_ref: &request.payment_ref,
      callback_url: &self.config.callback_url,
      return_url: &self.config.return_url,
    };

    let resp = self
      .http
      .post(self.url("/v1/transaction/initialize"))
      .bearer_auth(&self.config.secret_key)
      .json(&body)
      .send()
      .await?;
    let status = resp.status();
    let text = resp.text().await?;

    if status.is_server_error()
      || status == StatusCode::TOO_MANY_REQUESTS
      || status == StatusCode::REQUEST_TIMEOUT
    {
      return Err(Error::Unavailable { status: status.as_u16(), message: text });
    }

    let parsed: wire::InitializeResponse = match serde_json::from_str(&text) {
      Ok(parsed) => parsed,
      Err(_) if status.is_client_error() => {
        return Err(Error::Declined(format!("{status}: {text}")));
      }
      Err(e) => return Err(Error::Response(e.to_string())),
    };

    if !status.is_success() || parsed.status != "success" {
      return Err(Error::Declined(parsed.message_text()));
    }

    let data = parsed
      .data
      .ok_or_else(|| Error::Response("success without checkout data".to_owned()))?;
    debug!(payment_ref = %request.payment_ref, "chapa transaction initialized");
    Ok(CheckoutHandle { checkout_url: data.checkout_url, gateway_reference: data.reference })
  }
}

/// Chapa wants separate first and last names.
fn split_name(name: Option<&str>) -> (Option<&str>, Option<&str>) {
  match name.map(str::trim).filter(|n| !n.is_empty()) {
    None => (None, None),
    Some(full) => match full.split_once(char::is_whitespace) {
      Some((first, last)) => (Some(first), Some(last.trim())),
      None => (Some(full), None),
    },
  }
}

/// Verify and decode a Chapa webhook.
pub fn parse_callback(webhook_secret: &str, raw: RawCallback<'_>) -> Result<ParsedCallback> {
  let signature = raw.signature.ok_or(Error::Signature("missing"))?;
  signature::verify(webhook_secret, raw.body, signature)?;

  let event: wire::WebhookEvent =
    serde_json::from_slice(raw.body).map_err(|e| Error::Body(e.to_string()))?;
  let outcome = match event.status.to_ascii_lowercase().as_str() {
    "success" => CallbackOutcome::Succeeded,
    "failed" | "cancelled" => CallbackOutcome::Failed,
    other => return Err(Error::Body(format!("unknown status {other:?}"))),
  };

  Ok(ParsedCallback {
    payment_ref: event.tx_ref,
    outcome,
    signature: signature.to_owned(),
    gateway_reference: event.reference,
  })
}

impl PaymentGateway for ChapaGateway {
  async fn initiate(&self, request: &InitiateRequest) -> tizeta_core::Result<CheckoutHandle> {
    self.initialize(request).await.map_err(|e| {
      warn!(payment_ref = %request.payment_ref, error = %e, "chapa initialize failed");
      e.into()
    })
  }

  fn parse_callback(&self, raw: RawCallback<'_>) -> tizeta_core::Result<ParsedCallback> {
    Ok(parse_callback(&self.config.webhook_secret, raw)?)
  }
}
