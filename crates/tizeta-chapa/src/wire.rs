//! Chapa's JSON shapes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct InitializeRequest<'a> {
  /// Decimal string in major units, e.g. `"150.50"`.
  pub amount:       String,
  pub currency:     &'a str,
  pub email:        &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub first_name:   Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_name:    Option<&'a str>,
  pub tx_ref:       &'a str,
  pub callback_url: &'a str,
  pub return_url:   &'a str,
}

#[derive(Debug, Deserialize)]
pub struct InitializeResponse {
  pub status:  String,
  /// A string on success, sometimes an object of field errors on failure.
  #[serde(default)]
  pub message: serde_json::Value,
  pub data:    Option<InitializeData>,
}

impl InitializeResponse {
  pub fn message_text(&self) -> String {
    match &self.message {
      serde_json::Value::String(s) => s.clone(),
      serde_json::Value::Null => self.status.clone(),
      other => other.to_string(),
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct InitializeData {
  pub checkout_url: String,
  pub reference:    Option<String>,
}

/// The part of a webhook body we act on; other fields are ignored.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
  pub tx_ref:    String,
  pub status:    String,
  #[serde(default)]
  pub reference: Option<String>,
}
