//! Collaborator traits the pipeline depends on, and their HTTP adapters.

use async_trait::async_trait;
use promokit_client::{PromoApiClient, PromoApiError, UploadedAsset};
use promokit_core::{ImageFile, PublishRequest};
use serde_json::Value;

// =============================================================================
// Ports
// =============================================================================

/// Object storage for user images.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn upload(
        &self,
        files: &[ImageFile],
        subdir: &str,
    ) -> Result<Vec<UploadedAsset>, PromoApiError>;

    async fn presigned_url(&self, key: &str) -> Result<String, PromoApiError>;
}

/// The copy generator. Responses are untyped; see [`crate::normalize_ideas`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationApi: Send + Sync {
    async fn generate(&self, payload: &Value) -> Result<Value, PromoApiError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PublishApi: Send + Sync {
    async fn publish(&self, request: &PublishRequest) -> Result<Value, PromoApiError>;
}

/// Read-only view of whether the user is signed in.
#[cfg_attr(test, mockall::automock)]
pub trait AuthTokens: Send + Sync {
    fn has_token(&self) -> bool;
}

/// Fixed answer for [`AuthTokens`], for callers that resolve auth up front.
#[derive(Debug, Clone, Copy)]
pub struct StaticToken(pub bool);

impl AuthTokens for StaticToken {
    fn has_token(&self) -> bool {
        self.0
    }
}

// =============================================================================
// HTTP adapters
// =============================================================================

#[async_trait]
impl FileStore for PromoApiClient {
    async fn upload(
        &self,
        files: &[ImageFile],
        subdir: &str,
    ) -> Result<Vec<UploadedAsset>, PromoApiError> {
        self.upload_files(files, subdir).await
    }

    async fn presigned_url(&self, key: &str) -> Result<String, PromoApiError> {
        PromoApiClient::presigned_url(self, key).await
    }
}

#[async_trait]
impl GenerationApi for PromoApiClient {
    async fn generate(&self, payload: &Value) -> Result<Value, PromoApiError> {
        PromoApiClient::generate(self, payload).await
    }
}

#[async_trait]
impl PublishApi for PromoApiClient {
    async fn publish(&self, request: &PublishRequest) -> Result<Value, PromoApiError> {
        self.choose_publish(request).await
    }
}

impl AuthTokens for PromoApiClient {
    fn has_token(&self) -> bool {
        self.has_access_token()
    }
}
