//! ---
//! cm_section: "02-chaos-client"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Error taxonomy and HTTP error decoding."
//! cm_version: "v0.4.0"
//! cm_owner: "tbd"
//! ---
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChaosError>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ChaosError {
    /// Connection, DNS or timeout failure before a response was received.
    #[error("request failed: {0}")]
    Transport(#[source] BoxError),
    /// The server answered with anything other than `200 OK`.
    #[error("{message}")]
    Server { status: StatusCode, message: String },
    /// A `200 OK` body did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ChaosError {
    pub fn transport(err: impl Into<BoxError>) -> Self {
        ChaosError::Transport(err.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        ChaosError::Config(message.into())
    }

    /// HTTP status carried by a server error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ChaosError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Classify a non-success response.
///
/// A JSON body of the form `{"message": "..."}` with a non-empty message wins;
/// anything else (plain text, HTML, empty body, wrong shape) falls back to the
/// status line, e.g. `404 Not Found`.
pub fn decode_error(status: StatusCode, body: &[u8]) -> ChaosError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|decoded| decoded.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| status.to_string());
    ChaosError::Server { status, message }
}
