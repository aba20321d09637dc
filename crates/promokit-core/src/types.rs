use serde::{Deserialize, Serialize};

use crate::form::{DEFAULT_CLOSE, DEFAULT_OPEN};

/// Raw survey answers as entered by the store owner.
///
/// Required fields default to the empty string when missing; the field
/// aliases accept the camelCase names used by web form payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyFormValues {
    #[serde(alias = "storeName")]
    pub store_name: String,
    #[serde(alias = "regionKeyword")]
    pub region_keyword: String,
    pub address: String,
    #[serde(alias = "priceRange")]
    pub price_range: String,
    pub category: String,
    /// Free-text opening hours, e.g. `"09:00~18:00"`.
    pub hours: String,
    pub intro: String,
    #[serde(alias = "refLink")]
    pub ref_link: Option<String>,
    #[serde(alias = "serviceKeywords")]
    pub service_keywords: Option<String>,
    pub target: Option<String>,
    pub instagram: Option<String>,
    pub promotion: Option<String>,
    pub tone: Option<Tone>,
    #[serde(alias = "hashtagLimit")]
    pub hashtag_limit: Option<u32>,
    #[serde(alias = "numVariants")]
    pub num_variants: Option<u32>,
}

/// A local image picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    /// MIME type, e.g. `"image/jpeg"`.
    pub content_type: String,
    pub data: Vec<u8>,
}

impl ImageFile {
    #[must_use]
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Copywriting tone accepted by the generation backend.
///
/// Wire spellings are mixed-case on the backend side and kept verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    #[serde(rename = "Casual")]
    Casual,
    #[serde(rename = "professional")]
    Professional,
    #[serde(rename = "Witty")]
    Witty,
    #[serde(rename = "emotional")]
    Emotional,
    #[serde(rename = "urgent")]
    Urgent,
    #[serde(rename = "luxury")]
    Luxury,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    /// `HH:MM:SS`
    pub open: String,
    /// `HH:MM:SS`
    pub close: String,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open: DEFAULT_OPEN.to_string(),
            close: DEFAULT_CLOSE.to_string(),
        }
    }
}

/// Canonical request body for the generation endpoint.
///
/// Optional list fields are omitted from the JSON when absent; they are
/// never sent as empty arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateAdRequest {
    pub store_name: String,
    pub area_keywords: Vec<String>,
    pub address: String,
    pub price: String,
    pub business_hours: BusinessHours,
    pub category: String,
    pub store_intro: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_links: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_service_keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_customers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashtag_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_variants: Option<u32>,
}

/// Server-side identifier of a generated variant.
///
/// The backend uses both numeric and string ids; the original JSON type is
/// kept so the publish call echoes exactly what the server sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for VariantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariantId::Number(n) => write!(f, "{n}"),
            VariantId::Text(s) => f.write_str(s),
        }
    }
}

/// One normalized, user-selectable piece of generated copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionIdea {
    /// Unique within one generation response.
    pub id: String,
    pub title: String,
    pub summary: String,
    /// Every tag starts with `#`.
    pub tags: Vec<String>,
    /// Absent when the server returned bare strings without ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    /// Unmodified server text, preferred over `summary` when publishing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl PromotionIdea {
    /// Text sent to the publish endpoint.
    #[must_use]
    pub fn publish_content(&self) -> &str {
        self.raw.as_deref().unwrap_or(&self.summary)
    }
}

/// Store attribution needed to publish a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishContext {
    pub store_name: String,
    pub area_keywords: Vec<String>,
    /// Handle without the leading `@`; empty when the store has none.
    pub instagram_id: String,
}

/// Request body for the choose-and-publish endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub variant_id: VariantId,
    pub content: String,
    pub image_keys: Vec<String>,
    pub collaborators: Vec<String>,
    pub store_name: String,
    pub area_keywords: Vec<String>,
    pub dry_run: bool,
}
