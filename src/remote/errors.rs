use thiserror::Error;

/// Failures talking to the hosted data service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Request rejected by the data service: {0}")]
    Validation(String),
    #[error("{resource} not found")]
    NotFound { resource: String },
    #[error("Not authorized: {0}")]
    Unauthorized(String),
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Could not decode data service response: {0}")]
    Decode(String),
    #[error("Data service configuration error: {0}")]
    Config(String),
}

impl RemoteError {
    /// Map a non-success HTTP response onto the error taxonomy
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = extract_message(body);
        match status {
            400 | 409 | 422 => RemoteError::Validation(message),
            401 | 403 => RemoteError::Unauthorized(message),
            404 => RemoteError::NotFound { resource: message },
            _ => RemoteError::Http { status, message },
        }
    }

    /// Worth retrying for idempotent reads
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Network(_) => true,
            RemoteError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Short operator-facing suggestion
    pub fn hint(&self) -> &'static str {
        match self {
            RemoteError::Validation(_) => "Check the stage value and table constraints on the data service",
            RemoteError::NotFound { .. } => "The record may have been deleted; refresh the board",
            RemoteError::Unauthorized(_) => "Check PIPELINE_BOARD_API_KEY and the row-level security policies",
            RemoteError::Http { .. } => "The data service is having trouble; try the move again shortly",
            RemoteError::Network(_) => "Check connectivity to the data service and try again",
            RemoteError::Decode(_) => "The table columns may not match the expected client schema",
            RemoteError::Config(_) => "Set remote.base_url and remote.api_key in pipeline-board.toml",
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            RemoteError::from_status(status.as_u16(), &err.to_string())
        } else {
            RemoteError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Decode(err.to_string())
    }
}

// Error bodies look like {"message": "...", "code": "...", "details": ...}
fn extract_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
