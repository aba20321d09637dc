//! Normalizes generation responses into selectable ideas.
//!
//! The generator has answered in several shapes over time: arrays of plain
//! strings (sometimes several captions glued into one string), a single
//! object holding a glued blob, or a proper array of variant objects. Each
//! shape is tried in a fixed order and the first one that matches wins. No
//! input is an error; an unrecognized shape yields an empty list.

use std::collections::HashSet;
use std::sync::LazyLock;

use promokit_core::{PromotionIdea, VariantId};
use regex::Regex;
use serde_json::{Map, Value};

use crate::session::{keys, SessionError, SessionStore};

/// Explicit end-of-variant markers emitted by the generator.
static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<<<VARIANT_END>>>|<<VARIANT_END>>|<VARIANT_END>").expect("valid marker regex")
});

/// `캡션 1` / `캡션 ②` style labels at the start of the text or a line.
static CAPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\n)캡션\s*[①②③123]\s*").expect("valid caption regex")
});

/// `1.` / `- 2.` / `# 3.` bullets at the start of the text or a line.
static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\n)[#\-*]?\s*(?:1\.|2\.|3\.)\s+").expect("valid bullet regex")
});

const ARRAY_PATHS: [&str; 5] = [
    "/variants",
    "/captions",
    "/ideas",
    "/data/variants",
    "/data/captions",
];
const TEXT_FIELDS: [&str; 5] = ["summary", "text", "content", "copy", "body"];
const TAG_FIELDS: [&str; 3] = ["tags", "hashtags", "hash_tags"];
const TITLE_FIELDS: [&str; 3] = ["title", "headline", "name"];
const ID_FIELDS: [&str; 4] = ["id", "variant_id", "uuid", "key"];
const SERVER_ID_FIELDS: [&str; 3] = ["variant_id", "id", "uuid"];

/// Splits a possibly-concatenated caption blob into its pieces.
///
/// Rules are tried in order: explicit `VARIANT_END` markers, `캡션 n`
/// labels, then numbered bullets. The first rule yielding more than one
/// non-empty piece wins; otherwise the trimmed text is the only piece.
#[must_use]
pub fn split_concatenated(raw: &str) -> Vec<String> {
    for re in [&*MARKER_RE, &*CAPTION_RE, &*BULLET_RE] {
        let parts: Vec<String> = re
            .split(raw)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_owned)
            .collect();
        if parts.len() > 1 {
            return parts;
        }
    }

    let whole = raw.trim();
    if whole.is_empty() {
        Vec::new()
    } else {
        vec![whole.to_string()]
    }
}

/// Turns a raw generation response into an ordered idea list.
///
/// Pure and deterministic: the same JSON always yields the same list.
#[must_use]
pub fn normalize_ideas(response: &Value) -> Vec<PromotionIdea> {
    let Some(items) = source_array(response) else {
        return Vec::new();
    };
    if items.is_empty() {
        return Vec::new();
    }

    if items[0].is_string() {
        return from_string_blobs(items);
    }
    if let [Value::Object(obj)] = items.as_slice() {
        if let Some(ideas) = from_single_blob(obj) {
            return ideas;
        }
    }
    from_variant_objects(items)
}

/// Re-derives the idea list from the cached generation result.
///
/// An empty or malformed cache yields an empty list.
///
/// # Errors
///
/// Returns [`SessionError`] only if the store itself cannot be read.
pub fn restore_ideas<S: SessionStore + ?Sized>(
    store: &S,
) -> Result<Vec<PromotionIdea>, SessionError> {
    let Some(raw) = store.get(keys::LAST_GENERATE_RESULT)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(value) => Ok(normalize_ideas(&value)),
        Err(e) => {
            tracing::warn!(error = %e, "cached generation result is not valid JSON");
            Ok(Vec::new())
        }
    }
}

fn source_array(response: &Value) -> Option<&Vec<Value>> {
    ARRAY_PATHS
        .iter()
        .find_map(|path| response.pointer(path).and_then(Value::as_array))
}

/// Shape 1: an array of strings, each possibly holding several captions.
fn from_string_blobs(items: &[Value]) -> Vec<PromotionIdea> {
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| item.as_str().map(|blob| (i, blob)))
        .flat_map(|(i, blob)| {
            split_concatenated(blob)
                .into_iter()
                .enumerate()
                .map(move |(j, piece)| PromotionIdea {
                    id: format!("{i}-{j}"),
                    title: default_title(j),
                    summary: piece,
                    tags: Vec::new(),
                    variant_id: None,
                    raw: Some(blob.to_string()),
                })
        })
        .collect()
}

/// Shape 2: exactly one object whose text holds several glued captions.
fn from_single_blob(obj: &Map<String, Value>) -> Option<Vec<PromotionIdea>> {
    let text = first_field(obj, &TEXT_FIELDS).map(stringify).unwrap_or_default();
    let parts = split_concatenated(&text);
    if parts.len() <= 1 {
        return None;
    }

    let base = first_field(obj, &ID_FIELDS[..3])
        .map(to_variant_id)
        .unwrap_or_else(|| VariantId::Text("v0".to_string()));
    let tags = normalize_tags(first_field(obj, &TAG_FIELDS));

    Some(
        parts
            .into_iter()
            .enumerate()
            .map(|(idx, piece)| PromotionIdea {
                id: format!("{base}-{idx}"),
                title: default_title(idx),
                summary: piece,
                tags: tags.clone(),
                variant_id: Some(base.clone()),
                raw: Some(text.clone()),
            })
            .collect(),
    )
}

/// Shape 3: one idea per element.
fn from_variant_objects(items: &[Value]) -> Vec<PromotionIdea> {
    let mut seen = HashSet::new();
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let mut idea = match item {
                Value::Object(obj) => from_object(i, obj),
                _ => PromotionIdea {
                    id: i.to_string(),
                    title: default_title(i),
                    summary: String::new(),
                    tags: Vec::new(),
                    variant_id: None,
                    raw: None,
                },
            };
            // Ids double as selection handles, so they must stay unique.
            let base = idea.id.clone();
            let mut n = i;
            while !seen.insert(idea.id.clone()) {
                idea.id = format!("{base}-{n}");
                n += 1;
            }
            idea
        })
        .collect()
}

fn from_object(i: usize, obj: &Map<String, Value>) -> PromotionIdea {
    let text = first_field(obj, &TEXT_FIELDS).map(stringify);
    PromotionIdea {
        id: first_field(obj, &ID_FIELDS).map_or_else(|| i.to_string(), stringify),
        title: first_field(obj, &TITLE_FIELDS).map_or_else(|| default_title(i), stringify),
        summary: text.clone().unwrap_or_default(),
        tags: normalize_tags(first_field(obj, &TAG_FIELDS)),
        variant_id: Some(
            first_field(obj, &SERVER_ID_FIELDS).map_or_else(|| index_variant_id(i), to_variant_id),
        ),
        raw: text,
    }
}

fn default_title(index: usize) -> String {
    format!("AI 제안 {}", index + 1)
}

/// First field that is present and not `null`.
fn first_field<'a>(obj: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .find_map(|f| obj.get(*f).filter(|v| !v.is_null()))
}

/// Strings verbatim, scalars in their JSON spelling, containers as compact JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_variant_id(value: &Value) -> VariantId {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map_or_else(|| VariantId::Text(n.to_string()), VariantId::Number),
        other => VariantId::Text(stringify(other)),
    }
}

fn index_variant_id(i: usize) -> VariantId {
    i64::try_from(i).map_or_else(|_| VariantId::Text(i.to_string()), VariantId::Number)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn normalize_tags(tags: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = tags else {
        return Vec::new();
    };
    items
        .iter()
        .filter(|t| is_truthy(t))
        .map(|t| {
            let tag = stringify(t);
            if tag.starts_with('#') {
                tag
            } else {
                format!("#{tag}")
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "ideas_test.rs"]
mod tests;
