//! Fallback chains that rebuild publish inputs from whatever session state
//! survived.
//!
//! Slots may have been written by older builds with other field names, or
//! not written at all. Malformed slots are logged and skipped.

use promokit_client::storage_key_from_url;
use promokit_core::{split_region_keywords, strip_handle, PublishContext};
use serde_json::{Map, Value};

use crate::session::{keys, SessionError, SessionStore};

/// Reads a slot as JSON, treating malformed content as absent.
fn read_slot<S: SessionStore + ?Sized>(store: &S, key: &str) -> Result<Option<Value>, SessionError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(key, error = %e, "ignoring malformed session slot");
            Ok(None)
        }
    }
}

fn str_field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|n| obj.get(*n).and_then(Value::as_str))
}

fn string_items(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Store attribution for the publish call.
///
/// Prefers the dedicated context slot, then derives it from the stored
/// request (current or legacy field names), else empty defaults.
pub(crate) fn publish_context<S: SessionStore + ?Sized>(
    store: &S,
) -> Result<PublishContext, SessionError> {
    if let Some(Value::Object(ctx)) = read_slot(store, keys::LAST_PUBLISH_CONTEXT)? {
        return Ok(PublishContext {
            store_name: str_field(&ctx, &["store_name"]).unwrap_or_default().to_string(),
            area_keywords: string_items(ctx.get("area_keywords")),
            instagram_id: strip_handle(str_field(&ctx, &["instagram_id"]).unwrap_or_default()),
        });
    }

    if let Some(Value::Object(payload)) = read_slot(store, keys::LAST_GENERATE_PAYLOAD)? {
        let mut area_keywords = string_items(payload.get("area_keywords"));
        if area_keywords.is_empty() {
            if let Some(region) = str_field(&payload, &["regionKeyword"]) {
                area_keywords = split_region_keywords(region);
            }
        }
        return Ok(PublishContext {
            store_name: str_field(&payload, &["store_name", "storeName"])
                .unwrap_or_default()
                .to_string(),
            area_keywords,
            instagram_id: strip_handle(
                str_field(&payload, &["instagram_id", "instagram"]).unwrap_or_default(),
            ),
        });
    }

    Ok(PublishContext::default())
}

/// Storage keys of the uploaded images.
///
/// Tries the keys slot, then image lists inside the stored request, then
/// the `images` list of the cached generation result.
pub(crate) fn image_keys<S: SessionStore + ?Sized>(store: &S) -> Result<Vec<String>, SessionError> {
    if let Some(Value::Array(items)) = read_slot(store, keys::LAST_UPLOAD_IMAGE_KEYS)? {
        let found: Vec<String> = items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|k| !k.is_empty())
            .collect();
        if !found.is_empty() {
            return Ok(found);
        }
    }

    if let Some(Value::Object(payload)) = read_slot(store, keys::LAST_GENERATE_PAYLOAD)? {
        let source = ["image_keys", "images", "uploaded", "image_urls"]
            .iter()
            .find_map(|name| payload.get(*name).filter(|v| !v.is_null()));
        let found = keys_from_list(source);
        if !found.is_empty() {
            return Ok(found);
        }
    }

    if let Some(Value::Object(result)) = read_slot(store, keys::LAST_GENERATE_RESULT)? {
        return Ok(keys_from_list(result.get("images")));
    }

    Ok(Vec::new())
}

/// Maps asset entries (`{rel|key|url}` objects or URL strings) to keys.
fn keys_from_list(list: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = list else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(obj) => str_field(obj, &["rel", "key"])
                .filter(|k| !k.is_empty())
                .map(str::to_owned)
                .or_else(|| str_field(obj, &["url"]).and_then(storage_key_from_url)),
            Value::String(s) if s.contains("://") => storage_key_from_url(s),
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
        .filter(|k| !k.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::session::{MemorySessionStore, SessionStoreExt};

    #[test]
    fn context_prefers_dedicated_slot() {
        let store = MemorySessionStore::new();
        store
            .set_json(
                keys::LAST_PUBLISH_CONTEXT,
                &json!({ "store_name": "달빛카페", "area_keywords": ["성수", 3], "instagram_id": "@moon" }),
            )
            .unwrap();
        store
            .set_json(keys::LAST_GENERATE_PAYLOAD, &json!({ "store_name": "other" }))
            .unwrap();

        let ctx = publish_context(&store).unwrap();
        assert_eq!(ctx.store_name, "달빛카페");
        assert_eq!(ctx.area_keywords, vec!["성수"]);
        assert_eq!(ctx.instagram_id, "moon");
    }

    #[test]
    fn context_falls_back_to_stored_request() {
        let store = MemorySessionStore::new();
        store
            .set_json(
                keys::LAST_GENERATE_PAYLOAD,
                &json!({ "store_name": "달빛카페", "area_keywords": ["성수", "뚝섬"], "instagram_id": "moon" }),
            )
            .unwrap();

        let ctx = publish_context(&store).unwrap();
        assert_eq!(ctx.store_name, "달빛카페");
        assert_eq!(ctx.area_keywords, vec!["성수", "뚝섬"]);
        assert_eq!(ctx.instagram_id, "moon");
    }

    #[test]
    fn context_reads_legacy_field_names() {
        let store = MemorySessionStore::new();
        store
            .set_json(
                keys::LAST_GENERATE_PAYLOAD,
                &json!({ "storeName": "옛가게", "regionKeyword": "성수, 뚝섬/서울숲", "instagram": "@old" }),
            )
            .unwrap();

        let ctx = publish_context(&store).unwrap();
        assert_eq!(ctx.store_name, "옛가게");
        assert_eq!(ctx.area_keywords, vec!["성수", "뚝섬", "서울숲"]);
        assert_eq!(ctx.instagram_id, "old");
    }

    #[test]
    fn context_defaults_when_nothing_usable() {
        let store = MemorySessionStore::new();
        store.set(keys::LAST_PUBLISH_CONTEXT, "{oops").unwrap();
        store.set(keys::LAST_GENERATE_PAYLOAD, "[1,2]").unwrap();
        assert_eq!(publish_context(&store).unwrap(), PublishContext::default());
    }

    #[test]
    fn image_keys_prefer_keys_slot() {
        let store = MemorySessionStore::new();
        store
            .set_json(keys::LAST_UPLOAD_IMAGE_KEYS, &json!(["ads/images/a.jpg", ""]))
            .unwrap();
        store
            .set_json(keys::LAST_GENERATE_PAYLOAD, &json!({ "image_keys": ["other"] }))
            .unwrap();
        assert_eq!(image_keys(&store).unwrap(), vec!["ads/images/a.jpg"]);
    }

    #[test]
    fn image_keys_from_request_entries() {
        let store = MemorySessionStore::new();
        store.set(keys::LAST_UPLOAD_IMAGE_KEYS, "not json").unwrap();
        store
            .set_json(
                keys::LAST_GENERATE_PAYLOAD,
                &json!({
                    "images": [
                        { "rel": "ads/images/a.jpg" },
                        { "key": "ads/images/b.jpg" },
                        { "url": "https://s.example.test/bucket/ads/images/c.jpg" },
                        "https://s.example.test/bucket/ads/images/d.jpg",
                        42
                    ]
                }),
            )
            .unwrap();

        assert_eq!(
            image_keys(&store).unwrap(),
            vec![
                "ads/images/a.jpg",
                "ads/images/b.jpg",
                "ads/images/c.jpg",
                "ads/images/d.jpg"
            ]
        );
    }

    #[test]
    fn image_keys_derived_from_request_image_urls() {
        let store = MemorySessionStore::new();
        store
            .set_json(
                keys::LAST_GENERATE_PAYLOAD,
                &json!({ "image_urls": ["https://s.example.test/bucket/ads/images/a.jpg"] }),
            )
            .unwrap();
        assert_eq!(image_keys(&store).unwrap(), vec!["ads/images/a.jpg"]);
    }

    #[test]
    fn image_keys_from_cached_result() {
        let store = MemorySessionStore::new();
        store
            .set_json(
                keys::LAST_GENERATE_RESULT,
                &json!({ "variants": [], "images": [{ "rel": "ads/images/r.jpg" }] }),
            )
            .unwrap();
        assert_eq!(image_keys(&store).unwrap(), vec!["ads/images/r.jpg"]);
    }

    #[test]
    fn image_keys_empty_when_nothing_stored() {
        assert!(image_keys(&MemorySessionStore::new()).unwrap().is_empty());
    }
}
