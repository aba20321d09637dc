use std::sync::Arc;

use promokit_core::{PublishContext, VariantId};
use serde_json::json;

use super::*;
use crate::ports::{MockGenerationApi, MockPublishApi, StaticToken};
use crate::session::MemorySessionStore;

fn idea(id: &str, variant_id: Option<VariantId>) -> PromotionIdea {
    PromotionIdea {
        id: id.to_string(),
        title: "T".to_string(),
        summary: "보이는 부분".to_string(),
        tags: vec!["#카페".to_string()],
        variant_id,
        raw: Some("서버 원문 전체".to_string()),
    }
}

fn seeded_store() -> Arc<MemorySessionStore> {
    let store = Arc::new(MemorySessionStore::new());
    store
        .set_json(keys::LAST_UPLOAD_IMAGE_KEYS, &["ads/images/a.jpg"])
        .unwrap();
    store
        .set_json(
            keys::LAST_PUBLISH_CONTEXT,
            &PublishContext {
                store_name: "달빛카페".to_string(),
                area_keywords: vec!["성수".to_string()],
                instagram_id: "moon_cafe".to_string(),
            },
        )
        .unwrap();
    store
        .set_json(
            keys::LAST_GENERATE_PAYLOAD,
            &json!({ "store_name": "달빛카페", "area_keywords": ["성수"] }),
        )
        .unwrap();
    store
}

fn session(
    store: &Arc<MemorySessionStore>,
    generator: MockGenerationApi,
    publisher: MockPublishApi,
    logged_in: bool,
) -> GenerationSession {
    GenerationSession::new(
        store.clone(),
        Arc::new(generator),
        Arc::new(publisher),
        Arc::new(StaticToken(logged_in)),
    )
}

fn api_error(status: u16, body: Value) -> PromoApiError {
    PromoApiError::Api {
        status,
        body: Some(body),
    }
}

// =============================================================================
// select
// =============================================================================

#[tokio::test]
async fn select_without_token_makes_no_call() {
    let store = seeded_store();
    let mut publisher = MockPublishApi::new();
    publisher.expect_publish().times(0);

    let mut session = session(&store, MockGenerationApi::new(), publisher, false);
    let err = session
        .select(&idea("a", Some(VariantId::Number(1))))
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::NotLoggedIn));
}

#[tokio::test]
async fn select_without_variant_id_makes_no_call() {
    let store = seeded_store();
    let mut publisher = MockPublishApi::new();
    publisher.expect_publish().times(0);

    let mut session = session(&store, MockGenerationApi::new(), publisher, true);
    let err = session.select(&idea("0-1", None)).await.unwrap_err();

    assert!(matches!(err, FlowError::MissingVariantId { ref idea_id } if idea_id == "0-1"));
}

#[tokio::test]
async fn select_without_images_makes_no_call() {
    let store = Arc::new(MemorySessionStore::new());
    let mut publisher = MockPublishApi::new();
    publisher.expect_publish().times(0);

    let mut session = session(&store, MockGenerationApi::new(), publisher, true);
    let err = session
        .select(&idea("a", Some(VariantId::Number(1))))
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::NoUploadedImages));
}

#[tokio::test]
async fn select_publishes_with_recovered_context() {
    let store = seeded_store();
    let mut publisher = MockPublishApi::new();
    publisher
        .expect_publish()
        .withf(|request| {
            request.variant_id == VariantId::Text("v1".to_string())
                && request.content == "서버 원문 전체"
                && request.image_keys == ["ads/images/a.jpg"]
                && request.collaborators == ["moon_cafe"]
                && request.store_name == "달빛카페"
                && request.area_keywords == ["성수"]
                && !request.dry_run
        })
        .times(1)
        .returning(|_| Ok(json!({ "ok": true })));

    let mut session = session(&store, MockGenerationApi::new(), publisher, true);
    let chosen = idea("v1", Some(VariantId::Text("v1".to_string())));
    session.load_ideas(vec![chosen.clone()]);

    let outcome = session.select(&chosen).await.unwrap();
    assert_eq!(outcome, PublishOutcome::Published);
    assert!(session.selected().is_none());
}

#[tokio::test]
async fn select_sends_summary_when_raw_missing_and_no_collaborators() {
    let store = Arc::new(MemorySessionStore::new());
    store
        .set_json(keys::LAST_UPLOAD_IMAGE_KEYS, &["ads/images/a.jpg"])
        .unwrap();
    let mut publisher = MockPublishApi::new();
    publisher
        .expect_publish()
        .withf(|request| {
            request.content == "보이는 부분"
                && request.collaborators.is_empty()
                && request.store_name.is_empty()
        })
        .times(1)
        .returning(|_| Ok(Value::Null));

    let mut session = session(&store, MockGenerationApi::new(), publisher, true);
    let mut chosen = idea("a", Some(VariantId::Number(3)));
    chosen.raw = None;

    assert_eq!(
        session.select(&chosen).await.unwrap(),
        PublishOutcome::Published
    );
}

#[tokio::test]
async fn select_treats_rate_limit_as_accepted() {
    let store = seeded_store();
    let mut publisher = MockPublishApi::new();
    publisher.expect_publish().times(1).returning(|_| {
        Err(api_error(
            500,
            json!({ "error": { "code": 4, "message": "Application request limit reached" } }),
        ))
    });

    let mut session = session(&store, MockGenerationApi::new(), publisher, true);
    let outcome = session
        .select(&idea("a", Some(VariantId::Number(1))))
        .await
        .unwrap();
    assert_eq!(outcome, PublishOutcome::AcceptedDespiteRateLimit);
}

#[tokio::test]
async fn select_failure_surfaces_server_detail_and_keeps_state() {
    let store = seeded_store();
    let mut publisher = MockPublishApi::new();
    publisher
        .expect_publish()
        .times(1)
        .returning(|_| Err(api_error(400, json!({ "detail": "variant not found" }))));

    let mut session = session(&store, MockGenerationApi::new(), publisher, true);
    let chosen = idea("a", Some(VariantId::Number(1)));
    session.load_ideas(vec![chosen.clone(), idea("b", None)]);

    let err = session.select(&chosen).await.unwrap_err();
    assert!(matches!(err, FlowError::PublishFailed(ref m) if m == "variant not found"));
    assert_eq!(session.ideas().len(), 2);
    assert_eq!(session.selected().map(|i| i.id.as_str()), Some("a"));
}

#[tokio::test]
async fn select_failure_without_detail_uses_generic_message() {
    let store = seeded_store();
    let mut publisher = MockPublishApi::new();
    publisher.expect_publish().returning(|_| {
        Err(PromoApiError::Api {
            status: 502,
            body: None,
        })
    });

    let mut session = session(&store, MockGenerationApi::new(), publisher, true);
    let err = session
        .select(&idea("a", Some(VariantId::Number(1))))
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::PublishFailed(ref m) if m == "게시 요청에 실패했습니다."));
}

#[tokio::test]
async fn select_by_id_rejects_unknown_idea() {
    let store = seeded_store();
    let mut publisher = MockPublishApi::new();
    publisher.expect_publish().times(0);

    let mut session = session(&store, MockGenerationApi::new(), publisher, true);
    let err = session.select_by_id("missing").await.unwrap_err();
    assert!(matches!(err, FlowError::UnknownIdea(ref id) if id == "missing"));
}

// =============================================================================
// regenerate
// =============================================================================

#[tokio::test]
async fn regenerate_without_stored_request_makes_no_call() {
    let store = Arc::new(MemorySessionStore::new());
    let mut generator = MockGenerationApi::new();
    generator.expect_generate().times(0);

    let mut session = session(&store, generator, MockPublishApi::new(), true);
    let err = session.regenerate().await.unwrap_err();

    assert!(matches!(err, FlowError::NoPriorRequest));
    assert_eq!(err.to_string(), "no prior generation request to replay");
}

#[tokio::test]
async fn regenerate_rejects_non_object_request() {
    let store = Arc::new(MemorySessionStore::new());
    store.set(keys::LAST_GENERATE_PAYLOAD, "[1, 2]").unwrap();
    let mut generator = MockGenerationApi::new();
    generator.expect_generate().times(0);

    let mut session = session(&store, generator, MockPublishApi::new(), true);
    assert!(matches!(
        session.regenerate().await,
        Err(FlowError::InvalidStoredRequest)
    ));
}

#[tokio::test]
async fn regenerate_replays_request_and_replaces_list() {
    let store = seeded_store();
    let mut generator = MockGenerationApi::new();
    generator
        .expect_generate()
        .withf(|payload| payload["store_name"] == "달빛카페")
        .times(1)
        .returning(|_| {
            Ok(json!({
                "variants": [
                    { "id": "n1", "summary": "새 문안 1" },
                    { "id": "n2", "summary": "새 문안 2" }
                ]
            }))
        });

    let mut session = session(&store, generator, MockPublishApi::new(), true);
    session.load_ideas(vec![idea("old", None)]);
    session.selected = Some("old".to_string());

    let ideas = session.regenerate().await.unwrap();
    assert_eq!(ideas.len(), 2);
    assert_eq!(session.ideas(), ideas.as_slice());
    assert!(session.selected().is_none());

    let cached: Value = store.get_json(keys::LAST_GENERATE_RESULT).unwrap().unwrap();
    assert_eq!(cached["variants"][1]["id"], "n2");
}

#[tokio::test]
async fn regenerate_empty_result_leaves_state_untouched() {
    let store = seeded_store();
    store
        .set(keys::LAST_GENERATE_RESULT, r#"{"variants":["previous"]}"#)
        .unwrap();
    let mut generator = MockGenerationApi::new();
    generator
        .expect_generate()
        .times(1)
        .returning(|_| Ok(json!({ "variants": [] })));

    let mut session = session(&store, generator, MockPublishApi::new(), true);
    session.restore().unwrap();

    let err = session.regenerate().await.unwrap_err();
    assert!(matches!(err, FlowError::EmptyGeneration));
    assert_eq!(session.ideas()[0].summary, "previous");
    assert_eq!(
        store.get(keys::LAST_GENERATE_RESULT).unwrap().as_deref(),
        Some(r#"{"variants":["previous"]}"#)
    );
}

#[tokio::test]
async fn regenerate_network_failure_is_distinct_from_empty() {
    let store = seeded_store();
    let mut generator = MockGenerationApi::new();
    generator.expect_generate().returning(|_| {
        Err(PromoApiError::Api {
            status: 504,
            body: None,
        })
    });

    let mut session = session(&store, generator, MockPublishApi::new(), true);
    assert!(matches!(
        session.regenerate().await,
        Err(FlowError::Generation(_))
    ));
}

// =============================================================================
// generate / restore
// =============================================================================

#[tokio::test]
async fn generate_caches_result_for_restore() {
    let store = seeded_store();
    let mut generator = MockGenerationApi::new();
    generator
        .expect_generate()
        .times(1)
        .returning(|_| Ok(json!({ "captions": ["A<<<VARIANT_END>>>B"] })));

    let request = crate::encoder::build_request(&promokit_core::SurveyFormValues::default(), vec![]);
    let mut session = session(&store, generator, MockPublishApi::new(), true);
    let ideas = session.generate(&request).await.unwrap();
    assert_eq!(ideas.len(), 2);

    let mut reopened = GenerationSession::new(
        store.clone(),
        Arc::new(MockGenerationApi::new()),
        Arc::new(MockPublishApi::new()),
        Arc::new(StaticToken(true)),
    );
    let restored = reopened.restore().unwrap();
    assert_eq!(restored, ideas.as_slice());
}
