use promokit_client::PromoApiError;
use serde_json::Value;
use thiserror::Error;

use crate::session::SessionError;

/// Failures surfaced to whoever drives the pipeline.
///
/// Precondition variants (`NoImages`, `NotLoggedIn`, `NoPriorRequest`, ...)
/// are raised before any network call and leave session state untouched.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("at least one image is required")]
    NoImages,

    #[error("every image exceeds the {limit_bytes}-byte upload limit: {}", excluded.join(", "))]
    AllImagesTooLarge {
        excluded: Vec<String>,
        limit_bytes: u64,
    },

    #[error("image upload failed: {0}")]
    Upload(#[source] PromoApiError),

    #[error("generation request failed: {0}")]
    Generation(#[source] PromoApiError),

    #[error("generation result is empty")]
    EmptyGeneration,

    #[error("no prior generation request to replay")]
    NoPriorRequest,

    #[error("stored generation request is not a JSON object")]
    InvalidStoredRequest,

    #[error("please log in before publishing")]
    NotLoggedIn,

    #[error("idea '{idea_id}' has no server variant id; regenerate and pick again")]
    MissingVariantId { idea_id: String },

    #[error("no uploaded images found; upload images and try again")]
    NoUploadedImages,

    #[error("no idea with id '{0}'")]
    UnknownIdea(String),

    #[error("{0}")]
    PublishFailed(String),

    #[error("failed to encode generation request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl FlowError {
    /// Message suitable for showing to the user.
    ///
    /// Prefers the backend's own explanation for upload and generation
    /// failures.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            FlowError::Upload(e) | FlowError::Generation(e) => {
                server_message(e).unwrap_or_else(|| self.to_string())
            }
            other => other.to_string(),
        }
    }
}

/// Fallback publish failure text when the server explains nothing.
pub(crate) const GENERIC_PUBLISH_FAILURE: &str = "게시 요청에 실패했습니다.";
const GENERIC_DETAIL_FAILURE: &str = "요청 처리 중 오류가 발생했습니다.";

/// Extracts the human-readable explanation from a backend error body.
///
/// Checks, in order: the social platform's user-facing message, its
/// technical message, then the backend's `detail` (string or
/// `{ "message": ... }`).
pub(crate) fn server_message(err: &PromoApiError) -> Option<String> {
    let body = err.body()?;
    let platform_error = |field: &str| {
        [body.pointer("/error"), body.pointer("/data/error")]
            .into_iter()
            .flatten()
            .find_map(|e| e.get(field).and_then(non_empty_str))
    };

    if let Some(msg) = platform_error("error_user_msg") {
        return Some(msg);
    }
    if let Some(msg) = body.pointer("/error/message").and_then(non_empty_str) {
        return Some(msg);
    }
    match body.get("detail") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(detail @ (Value::Object(_) | Value::Array(_))) => Some(
            detail
                .get("message")
                .and_then(non_empty_str)
                .unwrap_or_else(|| GENERIC_DETAIL_FAILURE.to_string()),
        ),
        _ => None,
    }
}

fn non_empty_str(v: &Value) -> Option<String> {
    v.as_str().filter(|s| !s.is_empty()).map(str::to_owned)
}

/// Whether a publish failure is the social platform throttling the call.
///
/// The post usually goes out anyway in that case.
pub(crate) fn is_rate_limited(err: &PromoApiError) -> bool {
    const RATE_LIMIT_CODE: i64 = 4;
    const RATE_LIMIT_SUBCODE: i64 = 2_207_051;

    let mut messages = vec![err.to_string()];
    if let Some(body) = err.body() {
        for platform_error in [body.pointer("/error"), body.pointer("/data/error")]
            .into_iter()
            .flatten()
        {
            if platform_error.get("code").and_then(Value::as_i64) == Some(RATE_LIMIT_CODE) {
                return true;
            }
            if platform_error.get("error_subcode").and_then(Value::as_i64)
                == Some(RATE_LIMIT_SUBCODE)
            {
                return true;
            }
            if let Some(msg) = platform_error.get("message").and_then(Value::as_str) {
                messages.push(msg.to_string());
            }
        }
        if let Some(detail) = body.get("detail").and_then(Value::as_str) {
            messages.push(detail.to_string());
        }
    }

    let joined = messages.join(" | ").to_lowercase();
    joined.contains("application request limit") || joined.contains("rate limit")
}
