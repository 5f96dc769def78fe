//! Failure classification for requests against the inventory API.

use thiserror::Error;

/// A failed request, classified by where it broke.
///
/// `TransportFailure` covers everything up to and including the HTTP status
/// line; `DecodeFailure` means a successful response carried a body that did
/// not match the expected shape. The UI renders the two differently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
  /// The connection failed or the server answered with a non-success status.
  #[error("Failed to fetch data: {message}")]
  TransportFailure {
    status: Option<u16>,
    message: String,
  },
  /// The response arrived but its body could not be parsed.
  #[error("Failed to parse response: {message}")]
  DecodeFailure { message: String },
}

impl TransportError {
  pub fn transport(message: impl Into<String>) -> Self {
    Self::TransportFailure {
      status: None,
      message: message.into(),
    }
  }

  pub fn status(status: u16, message: impl Into<String>) -> Self {
    Self::TransportFailure {
      status: Some(status),
      message: message.into(),
    }
  }

  pub fn decode(message: impl Into<String>) -> Self {
    Self::DecodeFailure {
      message: message.into(),
    }
  }

  pub fn is_transport(&self) -> bool {
    matches!(self, Self::TransportFailure { .. })
  }

  pub fn is_decode(&self) -> bool {
    matches!(self, Self::DecodeFailure { .. })
  }

  /// HTTP status code, when the server got far enough to send one.
  pub fn http_status(&self) -> Option<u16> {
    match self {
      Self::TransportFailure { status, .. } => *status,
      Self::DecodeFailure { .. } => None,
    }
  }
}

impl From<reqwest::Error> for TransportError {
  fn from(err: reqwest::Error) -> Self {
    match err.status() {
      Some(status) => Self::status(status.as_u16(), err.to_string()),
      None => Self::transport(err.to_string()),
    }
  }
}

impl From<serde_json::Error> for TransportError {
  fn from(err: serde_json::Error) -> Self {
    Self::decode(err.to_string())
  }
}
