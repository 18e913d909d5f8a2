use thiserror::Error;

/// Failures talking to Chapa, before they are folded into the core taxonomy.
#[derive(Debug, Error)]
pub enum Error {
  #[error("http transport: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("chapa returned {status}: {message}")]
  Unavailable { status: u16, message: String },

  #[error("chapa declined the transaction: {0}")]
  Declined(String),

  #[error("unreadable chapa response: {0}")]
  Response(String),

  #[error("callback signature: {0}")]
  Signature(&'static str),

  #[error("callback body: {0}")]
  Body(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for tizeta_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Transport(_) | Error::Unavailable { .. } | Error::Response(_) => {
        tizeta_core::Error::GatewayUnavailable(e.to_string())
      }
      Error::Declined(message) => tizeta_core::Error::GatewayRejected(message),
      Error::Signature(_) | Error::Body(_) => tizeta_core::Error::MalformedCallback(e.to_string()),
    }
  }
}
