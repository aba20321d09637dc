//! Turns survey answers and local images into a generation request.

use std::collections::HashSet;
use std::sync::Arc;

use promokit_core::{
    extract_first_time_range, parse_time_range, strip_handle, to_list, GenerateAdRequest,
    ImageFile, PublishContext, SurveyFormValues,
};

use crate::error::FlowError;
use crate::ports::FileStore;
use crate::session::{keys, SessionStore, SessionStoreExt};

/// Per-file upload cap applied before anything is sent.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
/// Storage folder for ad images.
pub const DEFAULT_UPLOAD_SUBDIR: &str = "ads/images";

const HASHTAG_LIMIT_RANGE: (u32, u32) = (1, 30);
const NUM_VARIANTS_RANGE: (u32, u32) = (1, 5);

/// Result of a successful [`SubmissionEncoder::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSubmission {
    pub request: GenerateAdRequest,
    /// Names of files skipped for exceeding the size cap.
    pub excluded: Vec<String>,
    /// Storage keys persisted for the publish step.
    pub image_keys: Vec<String>,
}

/// Builds [`GenerateAdRequest`]s and commits the state later stages need.
pub struct SubmissionEncoder {
    store: Arc<dyn SessionStore>,
    files: Arc<dyn FileStore>,
    max_upload_bytes: u64,
    subdir: String,
}

impl SubmissionEncoder {
    pub fn new(store: Arc<dyn SessionStore>, files: Arc<dyn FileStore>) -> Self {
        Self {
            store,
            files,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            subdir: DEFAULT_UPLOAD_SUBDIR.to_string(),
        }
    }

    #[must_use]
    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    #[must_use]
    pub fn with_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.subdir = subdir.into();
        self
    }

    /// Uploads the images, builds the request and persists relay state.
    ///
    /// Session slots are written only after every upload and URL lookup has
    /// succeeded, in this order: image keys, publish context, request.
    ///
    /// # Errors
    ///
    /// - [`FlowError::NoImages`] if `files` is empty.
    /// - [`FlowError::AllImagesTooLarge`] if every file exceeds the cap.
    /// - [`FlowError::Upload`] if the upload or a presigned lookup fails.
    /// - [`FlowError::Session`] if state cannot be written.
    pub async fn encode(
        &self,
        values: &SurveyFormValues,
        files: Vec<ImageFile>,
    ) -> Result<EncodedSubmission, FlowError> {
        if files.is_empty() {
            return Err(FlowError::NoImages);
        }

        let (accepted, oversized): (Vec<ImageFile>, Vec<ImageFile>) = files
            .into_iter()
            .partition(|f| f.size() <= self.max_upload_bytes);
        let excluded: Vec<String> = oversized.into_iter().map(|f| f.name).collect();
        if !excluded.is_empty() {
            tracing::warn!(
                excluded = %excluded.join(", "),
                limit_bytes = self.max_upload_bytes,
                "skipping files over the upload limit"
            );
        }
        if accepted.is_empty() {
            return Err(FlowError::AllImagesTooLarge {
                excluded,
                limit_bytes: self.max_upload_bytes,
            });
        }

        let assets = self
            .files
            .upload(&accepted, &self.subdir)
            .await
            .map_err(FlowError::Upload)?;

        let mut image_urls = Vec::with_capacity(assets.len());
        for asset in &assets {
            if let Some(url) = asset.direct_url() {
                image_urls.push(url.to_string());
            } else if let Some(key) = asset.storage_key() {
                let url = self
                    .files
                    .presigned_url(&key)
                    .await
                    .map_err(FlowError::Upload)?;
                image_urls.push(url);
            }
        }
        let image_keys: Vec<String> = assets.iter().filter_map(|a| a.storage_key()).collect();

        let request = build_request(values, image_urls);
        let context = PublishContext {
            store_name: request.store_name.clone(),
            area_keywords: request.area_keywords.clone(),
            instagram_id: request.instagram_id.clone().unwrap_or_default(),
        };

        if image_keys.is_empty() {
            tracing::warn!(
                assets = assets.len(),
                "no storage key in upload response; publish will fall back to the stored request"
            );
        } else {
            self.store
                .set_json(keys::LAST_UPLOAD_IMAGE_KEYS, &image_keys)?;
        }
        self.store.set_json(keys::LAST_PUBLISH_CONTEXT, &context)?;
        self.store.set_json(keys::LAST_GENERATE_PAYLOAD, &request)?;

        tracing::info!(
            store = %request.store_name,
            images = request.image_urls.len(),
            excluded = excluded.len(),
            "submission encoded"
        );

        Ok(EncodedSubmission {
            request,
            excluded,
            image_keys,
        })
    }
}

/// Maps survey answers onto the generation request. Pure; no I/O.
#[must_use]
pub fn build_request(values: &SurveyFormValues, image_urls: Vec<String>) -> GenerateAdRequest {
    let hours = extract_first_time_range(&values.hours);
    let handle = values
        .instagram
        .as_deref()
        .map(strip_handle)
        .filter(|h| !h.is_empty());

    GenerateAdRequest {
        store_name: values.store_name.clone(),
        area_keywords: to_list(Some(values.region_keyword.as_str())).unwrap_or_default(),
        address: values.address.clone(),
        price: values.price_range.clone(),
        business_hours: parse_time_range(Some(hours.as_str())),
        category: values.category.clone(),
        store_intro: values.intro.clone(),
        image_urls,
        tone: Some(values.tone.unwrap_or_default()),
        reference_links: to_list(values.ref_link.as_deref()),
        product_service_keywords: to_list(values.service_keywords.as_deref()),
        target_customers: to_list(values.target.as_deref()),
        instagram_id: handle,
        promotions: to_list(values.promotion.as_deref()),
        hashtag_limit: values
            .hashtag_limit
            .map(|n| n.clamp(HASHTAG_LIMIT_RANGE.0, HASHTAG_LIMIT_RANGE.1)),
        num_variants: values
            .num_variants
            .map(|n| n.clamp(NUM_VARIANTS_RANGE.0, NUM_VARIANTS_RANGE.1)),
    }
}

/// Images picked for a submission.
///
/// Keeps only `image/*` content types and ignores a file already picked
/// with the same name and size.
#[derive(Debug, Default)]
pub struct ImageSelection {
    files: Vec<ImageFile>,
    seen: HashSet<(String, u64)>,
    rejected: Vec<String>,
}

impl ImageSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one file. Returns `false` if it was rejected or a duplicate.
    pub fn add(&mut self, file: ImageFile) -> bool {
        if !file.is_image() {
            tracing::warn!(name = %file.name, content_type = %file.content_type, "not an image");
            self.rejected.push(file.name);
            return false;
        }
        if !self.seen.insert((file.name.clone(), file.size())) {
            tracing::debug!(name = %file.name, "duplicate image ignored");
            return false;
        }
        self.files.push(file);
        true
    }

    pub fn extend(&mut self, files: impl IntoIterator<Item = ImageFile>) {
        for file in files {
            self.add(file);
        }
    }

    /// Removes the file at `index`, if any.
    pub fn remove(&mut self, index: usize) -> Option<ImageFile> {
        if index >= self.files.len() {
            return None;
        }
        let file = self.files.remove(index);
        self.seen.remove(&(file.name.clone(), file.size()));
        Some(file)
    }

    #[must_use]
    pub fn files(&self) -> &[ImageFile] {
        &self.files
    }

    /// Names of non-image files turned away so far.
    #[must_use]
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn into_files(self) -> Vec<ImageFile> {
        self.files
    }
}

#[cfg(test)]
#[path = "encoder_test.rs"]
mod tests;
