use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Venue error code returned when the API token is rejected.
pub const CODE_INVALID_TOKEN: &str = "InvalidToken";

/// Venue error code returned when an authorized-only call is made on an unauthorized socket.
pub const CODE_AUTHORIZATION_REQUIRED: &str = "AuthorizationRequired";

/// All errors generated in `venue-socket`.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Error)]
pub enum ClientError {
    #[error("Invalid API token: {0}")]
    InvalidToken(String),

    #[error("authorization required: {0}")]
    AuthorizationRequired(String),

    #[error("{operation} timed out after {after:?} without a reply")]
    Timeout {
        operation: String,
        after: Duration,
    },

    #[error("TransportError: {0}")]
    Transport(String),

    #[error("venue error {code}: {message}")]
    Venue { code: String, message: String },

    #[error("Max reconnection attempts ({attempts}) reached")]
    ReconnectExhausted { attempts: u32 },

    #[error("unexpected reply to {operation}: received {received}")]
    UnexpectedResponse { operation: String, received: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Map a structured venue `error` payload to the typed taxonomy.
    pub fn from_venue(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let message = message.into();
        match code.as_str() {
            CODE_INVALID_TOKEN => Self::InvalidToken(message),
            CODE_AUTHORIZATION_REQUIRED => Self::AuthorizationRequired(message),
            _ => Self::Venue { code, message },
        }
    }

    /// Error returned when a privileged call is made before authorization completes.
    pub fn not_authorized(operation: &str) -> Self {
        Self::AuthorizationRequired(format!("{operation} requires an authorized connection"))
    }

    /// Determine if the error ends the client's connection attempts until `connect` is called again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClientError::ReconnectExhausted { .. })
    }

    /// Determine if the error originates from the socket rather than the venue.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::ReconnectExhausted { .. }
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        Self::Transport(format!("failed to encode or decode frame: {value}"))
    }
}
