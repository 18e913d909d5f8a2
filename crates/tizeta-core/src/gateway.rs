//! The `PaymentGateway` trait: the narrow contract with the external payment
//! provider.
//!
//! Implementations map every provider failure onto
//! [`Error::GatewayUnavailable`](crate::Error::GatewayUnavailable),
//! [`Error::GatewayRejected`](crate::Error::GatewayRejected) or
//! [`Error::MalformedCallback`](crate::Error::MalformedCallback).

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{money::Money, payment::CallbackOutcome};

/// Parameters for [`PaymentGateway::initiate`].
#[derive(Debug, Clone)]
pub struct InitiateRequest {
  pub payment_ref: String,
  pub amount:      Money,
  pub currency:    String,
  pub payer_email: String,
  pub payer_name:  Option<String>,
}

/// What the provider hands back for a started charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutHandle {
  pub checkout_url:      String,
  pub gateway_reference: Option<String>,
}

/// A callback exactly as received, before any verification.
#[derive(Debug, Clone, Copy)]
pub struct RawCallback<'a> {
  pub body:      &'a [u8],
  /// The provider's signature header value, if one was sent.
  pub signature: Option<&'a str>,
}

/// A callback whose signature has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCallback {
  pub payment_ref:       String,
  pub outcome:           CallbackOutcome,
  pub signature:         String,
  pub gateway_reference: Option<String>,
}

pub trait PaymentGateway: Send + Sync {
  /// Start a charge. Returns as soon as the provider has issued a checkout
  /// page; completion arrives later as a callback.
  fn initiate<'a>(
    &'a self,
    request: &'a InitiateRequest,
  ) -> impl Future<Output = crate::Result<CheckoutHandle>> + Send + 'a;

  /// Authenticate and decode a callback. A signature mismatch is always an
  /// error, never a failed outcome.
  fn parse_callback(&self, raw: RawCallback<'_>) -> crate::Result<ParsedCallback>;
}
