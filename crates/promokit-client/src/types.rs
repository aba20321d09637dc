//! Upload-response types and their boundary parser.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PromoApiError;

/// A stored image as reported by the upload endpoint.
///
/// The backend reports the object-storage key as `rel` (older builds used
/// `key`) and/or a fetchable `url`. At least one must be present for the
/// asset to be usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl UploadedAsset {
    /// Object-storage key used by the publish endpoint.
    ///
    /// Prefers `rel`, then `key`, then a key derived from `url`.
    #[must_use]
    pub fn storage_key(&self) -> Option<String> {
        non_empty(self.rel.as_deref())
            .or_else(|| non_empty(self.key.as_deref()))
            .map(str::to_owned)
            .or_else(|| non_empty(self.url.as_deref()).and_then(storage_key_from_url))
    }

    #[must_use]
    pub fn direct_url(&self) -> Option<&str> {
        non_empty(self.url.as_deref())
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Derives an object-storage key from a bucket URL.
///
/// `https://cdn.example.com/bucket/ads/images/a.jpg` becomes
/// `ads/images/a.jpg`: the first path segment (the bucket) is dropped when
/// the path has at least two segments. Returns `None` for unparseable URLs
/// or an empty path.
#[must_use]
pub fn storage_key_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut parts: Vec<&str> = parsed.path().split('/').filter(|p| !p.is_empty()).collect();
    if parts.len() >= 2 {
        parts.remove(0);
    }
    let key = parts.join("/");
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Parses the upload endpoint's response into assets.
///
/// Accepts either `{"files": [...]}` or a bare array. Elements may be asset
/// objects or plain URL strings.
///
/// # Errors
///
/// Returns [`PromoApiError::InvalidResponse`] if neither shape matches or an
/// element carries neither a key nor a URL.
pub fn parse_upload_response(body: &Value) -> Result<Vec<UploadedAsset>, PromoApiError> {
    let invalid = |reason: String| PromoApiError::InvalidResponse {
        context: "upload".to_string(),
        reason,
    };

    let items = match body {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("files") {
            Some(Value::Array(items)) => items,
            _ => return Err(invalid("expected a `files` array".to_string())),
        },
        other => return Err(invalid(format!("expected an object or array, got {other}"))),
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let asset = match item {
                Value::String(url) => UploadedAsset {
                    url: Some(url.clone()),
                    ..UploadedAsset::default()
                },
                Value::Object(_) => serde_json::from_value::<UploadedAsset>(item.clone())
                    .map_err(|e| invalid(format!("file {idx}: {e}")))?,
                other => return Err(invalid(format!("file {idx}: unexpected value {other}"))),
            };
            if asset.storage_key().is_none() && asset.direct_url().is_none() {
                return Err(invalid(format!("file {idx} has neither a key nor a url")));
            }
            Ok(asset)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn storage_key_from_url_drops_bucket() {
        assert_eq!(
            storage_key_from_url("https://storage.example.com/promo-bucket/ads/images/a.jpg")
                .as_deref(),
            Some("ads/images/a.jpg")
        );
    }

    #[test]
    fn storage_key_from_url_keeps_single_segment() {
        assert_eq!(
            storage_key_from_url("https://cdn.example.com/a.jpg").as_deref(),
            Some("a.jpg")
        );
    }

    #[test]
    fn storage_key_from_url_rejects_garbage() {
        assert_eq!(storage_key_from_url("not a url"), None);
        assert_eq!(storage_key_from_url("https://cdn.example.com/"), None);
    }

    #[test]
    fn storage_key_prefers_rel_then_key_then_url() {
        let asset = UploadedAsset {
            rel: Some("ads/images/rel.jpg".into()),
            key: Some("ads/images/key.jpg".into()),
            url: Some("https://s.example.com/b/ads/images/url.jpg".into()),
        };
        assert_eq!(asset.storage_key().as_deref(), Some("ads/images/rel.jpg"));

        let asset = UploadedAsset {
            rel: Some(String::new()),
            key: Some("ads/images/key.jpg".into()),
            url: None,
        };
        assert_eq!(asset.storage_key().as_deref(), Some("ads/images/key.jpg"));

        let asset = UploadedAsset {
            url: Some("https://s.example.com/b/ads/images/url.jpg".into()),
            ..UploadedAsset::default()
        };
        assert_eq!(asset.storage_key().as_deref(), Some("ads/images/url.jpg"));
    }

    #[test]
    fn parse_upload_response_accepts_files_envelope() {
        let body = json!({
            "ok": true,
            "files": [
                { "rel": "ads/images/a.jpg", "url": "https://s.example.com/b/ads/images/a.jpg" },
                { "rel": "ads/images/b.jpg" }
            ]
        });
        let assets = parse_upload_response(&body).unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[1].direct_url(), None);
        assert_eq!(assets[1].storage_key().as_deref(), Some("ads/images/b.jpg"));
    }

    #[test]
    fn parse_upload_response_accepts_bare_array_of_urls() {
        let body = json!(["https://s.example.com/b/ads/images/a.jpg"]);
        let assets = parse_upload_response(&body).unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].storage_key().as_deref(), Some("ads/images/a.jpg"));
    }

    #[test]
    fn parse_upload_response_rejects_unknown_shapes() {
        assert!(matches!(
            parse_upload_response(&json!({ "ok": true })),
            Err(PromoApiError::InvalidResponse { .. })
        ));
        assert!(matches!(
            parse_upload_response(&json!("done")),
            Err(PromoApiError::InvalidResponse { .. })
        ));
        assert!(matches!(
            parse_upload_response(&json!([{ "size": 10 }])),
            Err(PromoApiError::InvalidResponse { .. })
        ));
    }
}
