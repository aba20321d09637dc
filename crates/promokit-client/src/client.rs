//! HTTP client for the marketing backend.
//!
//! Wraps `reqwest` with bearer-token auth, per-endpoint timeouts, and typed
//! error mapping. Non-2xx responses become [`PromoApiError::Api`] carrying
//! the parsed JSON error body so callers can surface the server's message.

use std::time::Duration;

use promokit_core::{AppConfig, ImageFile, PublishRequest};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde_json::Value;

use crate::error::PromoApiError;
use crate::retry::retry_with_backoff;
use crate::types::{parse_upload_response, UploadedAsset};

const UPLOAD_PATH: &str = "api/files/upload";
const PRESIGNED_GET_PATH: &str = "api/files/presigned-get";
const GENERATE_PATH: &str = "api/generate";
const PUBLISH_PATH: &str = "api/choose-publish";

/// Tunables for [`PromoApiClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub access_token: Option<String>,
    pub request_timeout_secs: u64,
    pub generate_timeout_secs: u64,
    pub publish_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            access_token: None,
            request_timeout_secs: 60,
            generate_timeout_secs: 90,
            publish_timeout_secs: 120,
            user_agent: "promokit/0.1 (promotion-generator)".to_string(),
            max_retries: 3,
            retry_backoff_base_ms: 1_000,
        }
    }
}

impl From<&AppConfig> for ClientSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            access_token: config.access_token.clone(),
            request_timeout_secs: config.request_timeout_secs,
            generate_timeout_secs: config.generate_timeout_secs,
            publish_timeout_secs: config.publish_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            retry_backoff_base_ms: config.retry_backoff_base_ms,
        }
    }
}

/// Client for the upload, presign, generate and publish endpoints.
pub struct PromoApiClient {
    client: Client,
    base_url: Url,
    settings: ClientSettings,
}

impl PromoApiClient {
    /// Creates a client from application config.
    ///
    /// # Errors
    ///
    /// Returns [`PromoApiError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`PromoApiError::InvalidBaseUrl`] if the
    /// configured URL does not parse.
    pub fn from_config(config: &AppConfig) -> Result<Self, PromoApiError> {
        Self::with_base_url(&config.api_base_url, ClientSettings::from(config))
    }

    /// Creates a client against an explicit base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`PromoApiError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`PromoApiError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(base_url: &str, settings: ClientSettings) -> Result<Self, PromoApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(settings.user_agent.as_str())
            .build()?;

        // Exactly one trailing slash so `Url::join` appends instead of
        // replacing the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| PromoApiError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            settings,
        })
    }

    /// Whether a bearer token is configured.
    #[must_use]
    pub fn has_access_token(&self) -> bool {
        self.settings.access_token.is_some()
    }

    /// Uploads images as one multipart request.
    ///
    /// # Errors
    ///
    /// - [`PromoApiError::Api`] on a non-2xx response.
    /// - [`PromoApiError::Http`] on network failure or an invalid MIME type.
    /// - [`PromoApiError::InvalidResponse`] if the response lists no usable assets.
    pub async fn upload_files(
        &self,
        files: &[ImageFile],
        subdir: &str,
    ) -> Result<Vec<UploadedAsset>, PromoApiError> {
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.data.clone())
                .file_name(file.name.clone())
                .mime_str(&file.content_type)?;
            form = form.part("files", part);
        }
        if !subdir.is_empty() {
            form = form.text("subdir", subdir.to_string());
        }

        let url = self.endpoint(UPLOAD_PATH)?;
        tracing::debug!(count = files.len(), subdir, "uploading images");
        let request = self.authorized(self.client.post(url)).multipart(form);
        let body = Self::send_json(request, UPLOAD_PATH).await?;
        let assets = parse_upload_response(&body)?;
        tracing::info!(count = assets.len(), "images uploaded");
        Ok(assets)
    }

    /// Resolves a fetchable URL for a storage key.
    ///
    /// Retried with back-off on transient failures.
    ///
    /// # Errors
    ///
    /// - [`PromoApiError::Api`] on a non-2xx response after retries.
    /// - [`PromoApiError::InvalidResponse`] if the body has no `url` string.
    pub async fn presigned_url(&self, key: &str) -> Result<String, PromoApiError> {
        let mut url = self.endpoint(PRESIGNED_GET_PATH)?;
        url.query_pairs_mut().append_pair("key", key);

        let body = retry_with_backoff(
            self.settings.max_retries,
            self.settings.retry_backoff_base_ms,
            || {
                let request = self.authorized(self.client.get(url.clone()));
                Self::send_json(request, PRESIGNED_GET_PATH)
            },
        )
        .await?;

        body.get("url")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| PromoApiError::InvalidResponse {
                context: format!("presigned-get(key={key})"),
                reason: "missing `url` string".to_string(),
            })
    }

    /// Posts a generation request and returns the raw JSON response.
    ///
    /// The payload is a plain JSON value so that previously stored requests
    /// can be replayed verbatim.
    ///
    /// # Errors
    ///
    /// - [`PromoApiError::Api`] on a non-2xx response.
    /// - [`PromoApiError::Http`] on network failure or timeout.
    /// - [`PromoApiError::Deserialize`] if the body is not JSON.
    pub async fn generate(&self, payload: &Value) -> Result<Value, PromoApiError> {
        let url = self.endpoint(GENERATE_PATH)?;
        let request = self
            .authorized(self.client.post(url))
            .timeout(Duration::from_secs(self.settings.generate_timeout_secs))
            .json(payload);
        Self::send_json(request, GENERATE_PATH).await
    }

    /// Publishes the chosen variant. Any 2xx response counts as success.
    ///
    /// # Errors
    ///
    /// - [`PromoApiError::Api`] on a non-2xx response, with the error body.
    /// - [`PromoApiError::Http`] on network failure or timeout.
    pub async fn choose_publish(&self, request: &PublishRequest) -> Result<Value, PromoApiError> {
        let url = self.endpoint(PUBLISH_PATH)?;
        let builder = self
            .authorized(self.client.post(url))
            .timeout(Duration::from_secs(self.settings.publish_timeout_secs))
            .json(request);
        Self::send_json(builder, PUBLISH_PATH).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, PromoApiError> {
        self.base_url
            .join(path)
            .map_err(|e| PromoApiError::InvalidBaseUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.settings.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends the request and parses the body as JSON.
    ///
    /// An empty 2xx body is returned as `Value::Null`. Non-2xx responses are
    /// mapped to [`PromoApiError::Api`] with whatever JSON the body held.
    async fn send_json(request: RequestBuilder, context: &str) -> Result<Value, PromoApiError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body = serde_json::from_str::<Value>(&text).ok();
            tracing::warn!(status = status.as_u16(), context, "backend returned error status");
            return Err(PromoApiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| PromoApiError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }
}
