use entitygraph_client::mock::MockTransport;
use entitygraph_client::{Method, Response};
use entitygraph_sync::{
    Content, DetailContent, ErrorKind, PredicateContainer, PredicateKind, StoreContext, SyncError,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

fn setup() -> (Arc<MockTransport>, StoreContext) {
    let mock = Arc::new(MockTransport::new());
    let ctx = StoreContext::with_defaults(mock.clone());
    (mock, ctx)
}

fn stored_values(mock: &MockTransport, predicate: &str, values: &[&str]) {
    let records: Vec<_> = values.iter().map(|v| json!({"value": v})).collect();
    mock.on_query(
        Method::Get,
        "entities/e1/values",
        &[("property", predicate)],
        Response::json(200, &json!(records)),
    );
}

fn value_container(ctx: &StoreContext, id: Option<&str>, predicate: &str) -> PredicateContainer {
    PredicateContainer::new(
        ctx.clone(),
        id.map(str::to_string),
        ctx.resolve(predicate).unwrap(),
        PredicateKind::Value,
    )
}

// ── Unsaved containers ──────────────────────────────────────────

#[tokio::test]
async fn unsaved_container_never_fetches() {
    let (mock, ctx) = setup();
    let mut c = value_container(&ctx, None, "sdo.name");
    assert!(c.snapshot().await.unwrap().is_empty());
    c.add(["Ada", "Augusta"]).await.unwrap();
    assert_eq!(c.content().await.unwrap(), vec!["Ada", "Augusta"]);
    assert_eq!(c.new_content().await.unwrap(), vec!["Ada", "Augusta"]);
    assert!(c.removed_content().await.unwrap().is_empty());
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn add_marks_dirty() {
    let (_mock, ctx) = setup();
    let mut c = value_container(&ctx, None, "sdo.name");
    assert!(!c.is_dirty());
    c.add(["Ada"]).await.unwrap();
    assert!(c.is_dirty());
    assert!(c.has_changes());
}

// ── Validation ──────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_rejection_leaves_container_unmodified() {
    let (_mock, ctx) = setup();
    let mut c = value_container(&ctx, None, "sdo.keywords");
    c.add(["math"]).await.unwrap();

    let err = c.add(["physics", "math"]).await.unwrap_err();
    assert!(matches!(err, SyncError::DuplicateContent { .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(c.content().await.unwrap(), vec!["math"]);
}

#[tokio::test]
async fn duplicate_within_batch_is_rejected() {
    let (_mock, ctx) = setup();
    let mut c = value_container(&ctx, None, "sdo.keywords");
    let err = c.add(["math", "math"]).await.unwrap_err();
    assert!(matches!(err, SyncError::DuplicateContent { .. }));
    assert!(c.content().await.unwrap().is_empty());
    assert!(!c.is_dirty());
}

#[tokio::test]
async fn value_container_rejects_references() {
    let (_mock, ctx) = setup();
    let mut c = value_container(&ctx, None, "sdo.name");
    let err = c
        .add([Content::reference("https://example.org/entities/t1")])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::Types(entitygraph_types::Error::InvalidContentType { .. })
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn relation_container_accepts_both_kinds() {
    let (_mock, ctx) = setup();
    let mut c = PredicateContainer::new(
        ctx.clone(),
        None,
        ctx.resolve("sdo.knows").unwrap(),
        PredicateKind::Relation,
    );
    c.add([Content::reference("https://example.org/entities/t1"), Content::literal("t2")])
        .await
        .unwrap();
    assert_eq!(c.content().await.unwrap().len(), 2);
}

#[tokio::test]
async fn removing_missing_value_fails() {
    let (_mock, ctx) = setup();
    let mut c = value_container(&ctx, None, "sdo.keywords");
    c.add(["math"]).await.unwrap();
    let err = c.remove(["math", "physics"]).await.unwrap_err();
    assert!(matches!(err, SyncError::ContentNotFound { .. }));
    assert_eq!(c.content().await.unwrap(), vec!["math"]);
}

// ── Persisted containers ────────────────────────────────────────

#[tokio::test]
async fn snapshot_is_fetched_once() {
    let (mock, ctx) = setup();
    stored_values(&mock, "sdo.keywords", &["physics", "chemistry"]);
    let mut c = value_container(&ctx, Some("e1"), "sdo.keywords");

    assert_eq!(c.snapshot().await.unwrap(), vec!["physics", "chemistry"]);
    assert_eq!(c.content().await.unwrap(), vec!["physics", "chemistry"]);
    assert_eq!(mock.requests().len(), 1);
    assert_eq!(mock.requests()[0].query_value("property"), Some("sdo.keywords"));
}

#[tokio::test]
async fn remove_then_add_computes_both_diffs() {
    let (mock, ctx) = setup();
    stored_values(&mock, "sdo.keywords", &["physics", "chemistry"]);
    let mut c = value_container(&ctx, Some("e1"), "sdo.keywords");

    c.remove(["physics"]).await.unwrap();
    c.add(["math"]).await.unwrap();
    assert_eq!(c.content().await.unwrap(), vec!["chemistry", "math"]);
    assert_eq!(c.new_content().await.unwrap(), vec!["math"]);
    assert_eq!(c.removed_content().await.unwrap(), vec!["physics"]);
}

#[tokio::test]
async fn re_adding_a_removed_value_cancels_the_removal() {
    let (mock, ctx) = setup();
    stored_values(&mock, "sdo.keywords", &["physics"]);
    let mut c = value_container(&ctx, Some("e1"), "sdo.keywords");

    c.remove(["physics"]).await.unwrap();
    c.add(["physics"]).await.unwrap();
    assert!(c.is_dirty());
    assert!(!c.has_changes());
    assert!(c.new_content().await.unwrap().is_empty());
    assert!(c.removed_content().await.unwrap().is_empty());
}

#[tokio::test]
async fn removing_a_pending_addition_drops_it() {
    let (mock, ctx) = setup();
    stored_values(&mock, "sdo.keywords", &[]);
    let mut c = value_container(&ctx, Some("e1"), "sdo.keywords");

    c.add(["math", "logic"]).await.unwrap();
    c.remove(["math"]).await.unwrap();
    assert_eq!(c.new_content().await.unwrap(), vec!["logic"]);
    assert!(c.removed_content().await.unwrap().is_empty());
}

#[tokio::test]
async fn remove_all_and_replace() {
    let (mock, ctx) = setup();
    stored_values(&mock, "sdo.name", &["Ada", "Augusta"]);
    let mut c = value_container(&ctx, Some("e1"), "sdo.name");

    c.replace("Ada King").await.unwrap();
    assert_eq!(c.content().await.unwrap(), vec!["Ada King"]);
    assert_eq!(c.removed_content().await.unwrap(), vec!["Ada", "Augusta"]);

    c.remove_all().await.unwrap();
    assert!(c.content().await.unwrap().is_empty());
    assert!(c.new_content().await.unwrap().is_empty());
}

#[tokio::test]
async fn remove_all_on_empty_view_stays_clean() {
    let (mock, ctx) = setup();
    stored_values(&mock, "sdo.name", &[]);
    let mut c = value_container(&ctx, Some("e1"), "sdo.name");
    c.remove_all().await.unwrap();
    assert!(!c.is_dirty());
}

#[tokio::test]
async fn same_literal_in_two_languages_is_held_once() {
    let (mock, ctx) = setup();
    mock.on(
        Method::Get,
        "entities/e1/values",
        Response::json(
            200,
            &json!([
                {"value": "Ada", "language": "en"},
                {"value": "Ada", "language": "de"},
                {"value": "Augusta", "language": "en"}
            ]),
        ),
    );
    let mut c = value_container(&ctx, Some("e1"), "sdo.name");

    assert_eq!(c.snapshot().await.unwrap(), vec!["Ada", "Augusta"]);
    c.remove(["Ada"]).await.unwrap();
    assert_eq!(c.content().await.unwrap(), vec!["Augusta"]);
    assert_eq!(c.removed_content().await.unwrap(), vec!["Ada"]);
}

#[tokio::test]
async fn snapshot_load_error_propagates() {
    let (mock, ctx) = setup();
    mock.on(Method::Get, "entities/e1/values", Response::new(500, "down"));
    let mut c = value_container(&ctx, Some("e1"), "sdo.name");
    let err = c.add(["Ada"]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(err.status(), Some(500));
    assert!(!c.is_dirty());
}

// ── Lifecycle ───────────────────────────────────────────────────

#[tokio::test]
async fn mark_stale_refetches_and_rebases_pending_edits() {
    let (mock, ctx) = setup();
    stored_values(&mock, "sdo.keywords", &["physics", "chemistry"]);
    let mut c = value_container(&ctx, Some("e1"), "sdo.keywords");
    c.add(["math", "logic"]).await.unwrap();
    c.remove(["chemistry"]).await.unwrap();

    // Another writer stored "math" and dropped "chemistry" meanwhile.
    stored_values(&mock, "sdo.keywords", &["physics", "math"]);
    c.mark_stale();

    assert_eq!(c.content().await.unwrap(), vec!["physics", "math", "logic"]);
    assert_eq!(c.new_content().await.unwrap(), vec!["logic"]);
    assert!(c.removed_content().await.unwrap().is_empty());
    assert_eq!(mock.requests().len(), 2);
}

#[tokio::test]
async fn reset_drops_edits_and_snapshot() {
    let (mock, ctx) = setup();
    stored_values(&mock, "sdo.keywords", &["physics"]);
    let mut c = value_container(&ctx, Some("e1"), "sdo.keywords");
    c.add(["math"]).await.unwrap();

    c.reset();
    assert!(!c.is_dirty());
    assert_eq!(c.content().await.unwrap(), vec!["physics"]);
    assert_eq!(mock.requests().len(), 2);
}

#[tokio::test]
async fn mark_saved_adopts_working_view() {
    let (mock, ctx) = setup();
    stored_values(&mock, "sdo.keywords", &["physics"]);
    let mut c = value_container(&ctx, Some("e1"), "sdo.keywords");
    c.add(["math"]).await.unwrap();

    c.mark_saved();
    assert!(!c.is_dirty());
    assert_eq!(c.snapshot().await.unwrap(), vec!["physics", "math"]);
    assert!(c.new_content().await.unwrap().is_empty());
    assert_eq!(mock.requests().len(), 1);
}

// ── Details ─────────────────────────────────────────────────────

#[tokio::test]
async fn detail_requires_present_value_and_allowed_key() {
    let (_mock, ctx) = setup();
    let mut c = value_container(&ctx, None, "sdo.name");
    c.add(["Ada"]).await.unwrap();

    let err = c.detail("Grace", "confidence").await.err().unwrap();
    assert!(matches!(err, SyncError::ContentNotFound { .. }));

    let err = c.detail("Ada", "colour").await.err().unwrap();
    assert!(matches!(err, SyncError::InvalidDetailKey(_)));

    let detail = c.detail("Ada", "eav.confidence").await.unwrap();
    assert_eq!(detail.key().prefixed(), "eav.confidence");
    assert_eq!(detail.value(), "Ada");
}

#[tokio::test]
async fn detail_container_is_reused_per_key() {
    let (_mock, ctx) = setup();
    let mut c = value_container(&ctx, None, "sdo.name");
    c.add(["Ada"]).await.unwrap();

    c.detail("Ada", "confidence")
        .await
        .unwrap()
        .set_content("0.5".into())
        .await
        .unwrap();
    let again = c.detail("Ada", "https://w3id.org/entitygraph/eav#confidence").await.unwrap();
    assert!(again.is_dirty());
    assert_eq!(c.detail_keys("Ada"), vec!["eav.confidence"]);
}

#[tokio::test]
async fn removing_a_value_discards_its_details() {
    let (_mock, ctx) = setup();
    let mut c = value_container(&ctx, None, "sdo.name");
    c.add(["Ada"]).await.unwrap();
    c.detail("Ada", "model")
        .await
        .unwrap()
        .set_content("m1".into())
        .await
        .unwrap();
    assert!(c.has_detail_changes());

    c.remove(["Ada"]).await.unwrap();
    assert!(c.detail_keys("Ada").is_empty());
    assert!(!c.has_detail_changes());
}

#[tokio::test]
async fn load_details_instantiates_stored_keys() {
    let (mock, ctx) = setup();
    let identifier = ctx.value_identifier(&ctx.resolve("sdo.name").unwrap(), "Ada");
    mock.on_query(
        Method::Get,
        "entities/e1/values",
        &[("property", "sdo.name")],
        Response::json(
            200,
            &json!([{
                "value": "Ada",
                "metadata": {"hash": identifier.as_str()},
                "details": {"confidence": "0.9", "model": "m1", "unrelated": "x"}
            }]),
        ),
    );
    let mut c = value_container(&ctx, Some("e1"), "sdo.name");

    let keys: Vec<String> = c
        .load_details("Ada")
        .await
        .unwrap()
        .into_iter()
        .map(|k| k.prefixed().to_string())
        .collect();
    assert_eq!(keys, vec!["eav.confidence", "eav.model"]);

    let requests_before = mock.requests().len();
    let detail = c.detail("Ada", "model").await.unwrap();
    assert_eq!(detail.content().await.unwrap(), DetailContent::from("m1"));
    assert_eq!(mock.requests().len(), requests_before);
}

// ── Diff laws ───────────────────────────────────────────────────

fn alphabet(i: u8) -> String {
    format!("v{}", i % 8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn diffs_match_set_difference(
        stored in proptest::collection::btree_set(0u8..8, 0..6),
        ops in proptest::collection::vec((any::<bool>(), 0u8..8), 0..24),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let (mock, ctx) = setup();
            let stored: Vec<String> = stored.into_iter().map(alphabet).collect();
            let refs: Vec<&str> = stored.iter().map(String::as_str).collect();
            stored_values(&mock, "sdo.keywords", &refs);
            let mut c = value_container(&ctx, Some("e1"), "sdo.keywords");

            let mut model: BTreeSet<String> = stored.iter().cloned().collect();
            for (is_add, i) in ops {
                let v = alphabet(i);
                if is_add {
                    let result = c.add([v.as_str()]).await;
                    assert_eq!(result.is_ok(), model.insert(v));
                } else {
                    let result = c.remove([v.as_str()]).await;
                    assert_eq!(result.is_ok(), model.remove(&v));
                }
            }

            let s: BTreeSet<String> = stored.iter().cloned().collect();
            let w: BTreeSet<String> = c.content().await.unwrap().into_iter().collect();
            let added: BTreeSet<String> = c.new_content().await.unwrap().into_iter().collect();
            let removed: BTreeSet<String> = c.removed_content().await.unwrap().into_iter().collect();

            assert_eq!(&w, &model);
            assert_eq!(added, w.difference(&s).cloned().collect::<BTreeSet<_>>());
            assert_eq!(removed, s.difference(&w).cloned().collect::<BTreeSet<_>>());
        });
    }
}
