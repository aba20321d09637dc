use thiserror::Error;

/// Errors returned by the marketing backend client.
#[derive(Debug, Error)]
pub enum PromoApiError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status. `body` holds the parsed
    /// JSON error payload when there was one.
    #[error("API returned HTTP {status}")]
    Api {
        status: u16,
        body: Option<serde_json::Value>,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The response was valid JSON but not in a shape this client understands.
    #[error("unexpected response from {context}: {reason}")]
    InvalidResponse { context: String, reason: String },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl PromoApiError {
    /// HTTP status of an API-level failure.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            PromoApiError::Api { status, .. } => Some(*status),
            PromoApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Parsed JSON error payload, if the backend sent one.
    #[must_use]
    pub fn body(&self) -> Option<&serde_json::Value> {
        match self {
            PromoApiError::Api { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}
