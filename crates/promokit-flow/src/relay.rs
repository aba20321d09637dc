//! Idea selection, publishing and regeneration over session state.

use std::sync::Arc;

use promokit_client::{PromoApiClient, PromoApiError};
use promokit_core::{strip_handle, GenerateAdRequest, PromotionIdea, PublishRequest};
use serde_json::Value;

use crate::error::{is_rate_limited, server_message, FlowError, GENERIC_PUBLISH_FAILURE};
use crate::ideas::{normalize_ideas, restore_ideas};
use crate::ports::{AuthTokens, GenerationApi, PublishApi};
use crate::recover;
use crate::session::{keys, SessionStore, SessionStoreExt};

/// How a publish request ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// The social platform throttled the call. The post normally goes out
    /// regardless, so this is reported as success.
    AcceptedDespiteRateLimit,
}

/// The generation page: current ideas, the pending selection, and the
/// operations that act on them.
///
/// Everything needed to publish or regenerate is read back from the
/// session store, so a session can be rebuilt at any point with
/// [`GenerationSession::restore`].
pub struct GenerationSession {
    store: Arc<dyn SessionStore>,
    generator: Arc<dyn GenerationApi>,
    publisher: Arc<dyn PublishApi>,
    auth: Arc<dyn AuthTokens>,
    ideas: Vec<PromotionIdea>,
    selected: Option<String>,
}

impl GenerationSession {
    pub fn new(
        store: Arc<dyn SessionStore>,
        generator: Arc<dyn GenerationApi>,
        publisher: Arc<dyn PublishApi>,
        auth: Arc<dyn AuthTokens>,
    ) -> Self {
        Self {
            store,
            generator,
            publisher,
            auth,
            ideas: Vec::new(),
            selected: None,
        }
    }

    /// Uses one HTTP client for generation, publishing and auth.
    pub fn from_client(store: Arc<dyn SessionStore>, client: Arc<PromoApiClient>) -> Self {
        Self::new(store, client.clone(), client.clone(), client)
    }

    #[must_use]
    pub fn ideas(&self) -> &[PromotionIdea] {
        &self.ideas
    }

    /// The idea picked most recently, until a publish succeeds.
    #[must_use]
    pub fn selected(&self) -> Option<&PromotionIdea> {
        let id = self.selected.as_deref()?;
        self.ideas.iter().find(|i| i.id == id)
    }

    /// Replaces the list with ideas obtained elsewhere.
    pub fn load_ideas(&mut self, ideas: Vec<PromotionIdea>) {
        self.ideas = ideas;
        self.selected = None;
    }

    /// Reloads the list from the cached generation result.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Session`] if the store cannot be read.
    pub fn restore(&mut self) -> Result<&[PromotionIdea], FlowError> {
        let ideas = restore_ideas(self.store.as_ref())?;
        self.load_ideas(ideas);
        Ok(&self.ideas)
    }

    /// Sends a freshly encoded request to the generator.
    ///
    /// # Errors
    ///
    /// - [`FlowError::Generation`] if the call fails.
    /// - [`FlowError::EmptyGeneration`] if the response holds no ideas.
    pub async fn generate(
        &mut self,
        request: &GenerateAdRequest,
    ) -> Result<Vec<PromotionIdea>, FlowError> {
        let payload = serde_json::to_value(request)?;
        self.run_generation(&payload).await
    }

    /// Replays the last stored request.
    ///
    /// The stored JSON is sent as-is, so requests written by older builds
    /// replay unchanged.
    ///
    /// # Errors
    ///
    /// - [`FlowError::NoPriorRequest`] if nothing was stored; no call is made.
    /// - [`FlowError::InvalidStoredRequest`] if the slot is not a JSON object.
    /// - [`FlowError::Generation`] / [`FlowError::EmptyGeneration`] as for
    ///   [`GenerationSession::generate`].
    pub async fn regenerate(&mut self) -> Result<Vec<PromotionIdea>, FlowError> {
        let raw = self
            .store
            .get(keys::LAST_GENERATE_PAYLOAD)?
            .ok_or(FlowError::NoPriorRequest)?;
        let payload = match serde_json::from_str::<Value>(&raw) {
            Ok(value @ Value::Object(_)) => value,
            _ => return Err(FlowError::InvalidStoredRequest),
        };
        tracing::info!("regenerating from stored request");
        self.run_generation(&payload).await
    }

    async fn run_generation(&mut self, payload: &Value) -> Result<Vec<PromotionIdea>, FlowError> {
        let response = self
            .generator
            .generate(payload)
            .await
            .map_err(FlowError::Generation)?;

        let ideas = normalize_ideas(&response);
        if ideas.is_empty() {
            tracing::warn!("generation response held no recognizable ideas");
            return Err(FlowError::EmptyGeneration);
        }

        self.store.set_json(keys::LAST_GENERATE_RESULT, &response)?;
        tracing::info!(count = ideas.len(), "ideas generated");
        self.ideas.clone_from(&ideas);
        self.selected = None;
        Ok(ideas)
    }

    /// Publishes the idea with the given id from the current list.
    ///
    /// # Errors
    ///
    /// [`FlowError::UnknownIdea`] if no such idea is loaded, otherwise as for
    /// [`GenerationSession::select`].
    pub async fn select_by_id(&mut self, id: &str) -> Result<PublishOutcome, FlowError> {
        let idea = self
            .ideas
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| FlowError::UnknownIdea(id.to_string()))?;
        self.select(&idea).await
    }

    /// Marks `idea` as selected and publishes it.
    ///
    /// Preconditions are checked in order (signed in, server variant id,
    /// uploaded images) and none of them issue a network call. On failure
    /// the idea list and selection are left as they were so the user can
    /// retry.
    ///
    /// # Errors
    ///
    /// - [`FlowError::NotLoggedIn`], [`FlowError::MissingVariantId`],
    ///   [`FlowError::NoUploadedImages`] for unmet preconditions.
    /// - [`FlowError::PublishFailed`] with the best available message.
    pub async fn select(&mut self, idea: &PromotionIdea) -> Result<PublishOutcome, FlowError> {
        self.selected = Some(idea.id.clone());

        if !self.auth.has_token() {
            return Err(FlowError::NotLoggedIn);
        }
        let variant_id = idea
            .variant_id
            .clone()
            .ok_or_else(|| FlowError::MissingVariantId {
                idea_id: idea.id.clone(),
            })?;

        let context = recover::publish_context(self.store.as_ref())?;
        let image_keys = recover::image_keys(self.store.as_ref())?;
        if image_keys.is_empty() {
            return Err(FlowError::NoUploadedImages);
        }

        let handle = strip_handle(&context.instagram_id);
        let request = PublishRequest {
            variant_id,
            content: idea.publish_content().to_string(),
            image_keys,
            collaborators: if handle.is_empty() {
                Vec::new()
            } else {
                vec![handle]
            },
            store_name: context.store_name,
            area_keywords: context.area_keywords,
            dry_run: false,
        };

        tracing::info!(
            idea = %idea.id,
            variant_id = %request.variant_id,
            images = request.image_keys.len(),
            "publishing idea"
        );
        match self.publisher.publish(&request).await {
            Ok(_) => {
                self.selected = None;
                Ok(PublishOutcome::Published)
            }
            Err(e) if is_rate_limited(&e) => {
                tracing::warn!(error = %e, "publish throttled by platform; treating as accepted");
                self.selected = None;
                Ok(PublishOutcome::AcceptedDespiteRateLimit)
            }
            Err(e) => {
                tracing::warn!(error = %e, "publish failed");
                Err(FlowError::PublishFailed(publish_failure_message(&e)))
            }
        }
    }
}

fn publish_failure_message(err: &PromoApiError) -> String {
    server_message(err).unwrap_or_else(|| match err {
        PromoApiError::Api { .. } => GENERIC_PUBLISH_FAILURE.to_string(),
        transport => transport.to_string(),
    })
}

#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;
