//! Detail and derived caches through the engine

use lookup_engine::{
    CacheStatus, DetailError, EngineEvent, GenerationError, ItemId, RequestOutcome,
    DERIVED_ERROR_TEXT,
};
use lookup_test_utils::{statute_engine, CountingDetailProvider, ScriptedGenerator};
use std::sync::Arc;
use std::time::Duration;

fn burglary() -> ItemId {
    ItemId::new("s810-02")
}

#[tokio::test(start_paused = true)]
async fn double_expand_while_pending_fetches_once() {
    let detail = Arc::new(CountingDetailProvider::statutes().with_delay(Duration::from_millis(300)));
    let engine = statute_engine(None, Arc::clone(&detail), None);

    assert!(engine.expand(burglary()).is_started());
    assert_eq!(engine.expand(burglary()), RequestOutcome::AlreadyLoading);
    assert_eq!(engine.detail(&burglary()).status(), CacheStatus::Loading);

    let key = burglary();
    let (a, b) = tokio::join!(engine.settled_detail(&key), engine.settled_detail(&key));
    assert!(Arc::ptr_eq(a.value().unwrap(), b.value().unwrap()));
    assert_eq!(a.value().unwrap().title(), "Burglary of a Dwelling");
    assert_eq!(detail.fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn ready_record_is_never_refetched() {
    let detail = Arc::new(CountingDetailProvider::statutes().with_delay(Duration::from_millis(300)));
    let engine = statute_engine(None, Arc::clone(&detail), None);

    engine.expand(burglary());
    engine.settled_detail(&burglary()).await;

    // collapse and re-expand, several times
    for _ in 0..3 {
        assert_eq!(engine.expand(burglary()), RequestOutcome::AlreadyReady);
    }
    assert_eq!(detail.fetches(), 1);
    assert_eq!(engine.stats().detail_fetches, 1);
}

#[tokio::test]
async fn failed_fetch_is_retried_on_next_expand() {
    let detail = Arc::new(CountingDetailProvider::statutes().fail_next(DetailError::failed("unavailable")));
    let engine = statute_engine(None, Arc::clone(&detail), None);

    engine.expand(burglary());
    let entry = engine.settled_detail(&burglary()).await;
    assert_eq!(entry.error(), Some("detail fetch failed: unavailable"));

    assert!(engine.expand(burglary()).is_started());
    assert!(engine.settled_detail(&burglary()).await.is_ready());
    assert_eq!(detail.fetches(), 2);
}

#[tokio::test]
async fn unknown_id_settles_to_not_found_error() {
    let engine = statute_engine(None, Arc::new(CountingDetailProvider::statutes()), None);
    let id = ItemId::new("s999-99");

    engine.expand(id.clone());
    let entry = engine.settled_detail(&id).await;
    assert_eq!(entry.status(), CacheStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn invalidation_discards_in_flight_fetch() {
    let detail = Arc::new(CountingDetailProvider::statutes().with_delay(Duration::from_millis(300)));
    let engine = statute_engine(None, Arc::clone(&detail), None);

    engine.expand(burglary());
    engine.dispatch(EngineEvent::InvalidateDetail(burglary()));
    assert_eq!(engine.detail(&burglary()).status(), CacheStatus::Absent);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(engine.detail(&burglary()).status(), CacheStatus::Absent);
    assert_eq!(engine.stats().detail_discards, 1);

    assert!(engine.expand(burglary()).is_started());
    assert!(engine.settled_detail(&burglary()).await.is_ready());
}

#[tokio::test]
async fn expand_never_generates_derived_field() {
    let generator = Arc::new(ScriptedGenerator::new("1. Entered a dwelling"));
    let engine = statute_engine(
        None,
        Arc::new(CountingDetailProvider::statutes()),
        Some(Arc::clone(&generator)),
    );

    engine.expand(burglary());
    engine.settled_detail(&burglary()).await;

    assert_eq!(generator.calls(), 0);
    assert_eq!(engine.derived(&burglary()).status(), CacheStatus::Absent);
}

#[tokio::test]
async fn derived_uses_full_record_context() {
    let generator = Arc::new(ScriptedGenerator::new("1. Entered a dwelling"));
    let engine = statute_engine(
        None,
        Arc::new(CountingDetailProvider::statutes()),
        Some(Arc::clone(&generator)),
    );

    engine.expand(burglary());
    engine.settled_detail(&burglary()).await;
    engine.dispatch(EngineEvent::GenerateDerived(burglary()));

    let entry = engine.settled_derived(&burglary()).await;
    assert_eq!(entry.value().map(|t| t.as_str()), Some("1. Entered a dwelling"));

    let (id, context) = generator.contexts().remove(0);
    assert_eq!(id, burglary());
    assert_eq!(context["code"], "F.S. § 810.02");
    assert_eq!(context["text"], "Full statutory text of Burglary of a Dwelling");
}

#[tokio::test(start_paused = true)]
async fn derived_requested_mid_fetch_waits_for_full_record() {
    let generator = Arc::new(ScriptedGenerator::new("1. Entered a dwelling"));
    let detail = Arc::new(CountingDetailProvider::statutes().with_delay(Duration::from_millis(300)));
    let engine = statute_engine(None, Arc::clone(&detail), Some(Arc::clone(&generator)));

    engine.expand(burglary());
    assert!(engine.generate_derived(burglary()).unwrap().is_started());
    assert_eq!(engine.derived(&burglary()).status(), CacheStatus::Loading);

    assert!(engine.settled_derived(&burglary()).await.is_ready());
    let (_, context) = generator.contexts().remove(0);
    assert_eq!(context["text"], "Full statutory text of Burglary of a Dwelling");
    assert_eq!(detail.fetches(), 1);
}

#[tokio::test]
async fn derived_without_expand_uses_index_fields() {
    let generator = Arc::new(ScriptedGenerator::new("1. Touched or struck"));
    let engine = statute_engine(
        None,
        Arc::new(CountingDetailProvider::statutes()),
        Some(Arc::clone(&generator)),
    );
    let battery = ItemId::new("s784-03");

    assert!(engine.generate_derived(battery.clone()).unwrap().is_started());
    engine.settled_derived(&battery).await;

    let (_, context) = generator.contexts().remove(0);
    assert_eq!(context["title"], "Battery");
    assert_eq!(context["text"], "No description provided.");
}

#[tokio::test]
async fn derived_failure_shows_error_text_and_can_retry() {
    let generator = Arc::new(
        ScriptedGenerator::new("1. Entered a dwelling")
            .then(Err(GenerationError::failed("model overloaded"))),
    );
    let engine = statute_engine(
        None,
        Arc::new(CountingDetailProvider::statutes()),
        Some(Arc::clone(&generator)),
    );

    engine.generate_derived(burglary());
    let entry = engine.settled_derived(&burglary()).await;
    assert_eq!(entry.status(), CacheStatus::Error);
    assert_eq!(engine.derived_text(&burglary()).as_deref(), Some(DERIVED_ERROR_TEXT));

    engine.generate_derived(burglary());
    engine.settled_derived(&burglary()).await;
    assert_eq!(
        engine.derived_text(&burglary()).as_deref(),
        Some("1. Entered a dwelling")
    );
    assert_eq!(engine.stats().derived_generations, 2);
}

#[tokio::test(start_paused = true)]
async fn derived_and_detail_lifecycles_are_independent() {
    let generator = Arc::new(ScriptedGenerator::new("1. Element").with_delay(Duration::from_millis(500)));
    let detail = Arc::new(CountingDetailProvider::statutes().with_delay(Duration::from_millis(300)));
    let engine = statute_engine(None, Arc::clone(&detail), Some(Arc::clone(&generator)));

    engine.expand(burglary());
    engine.generate_derived(burglary());

    engine.settled_detail(&burglary()).await;
    assert_eq!(engine.derived(&burglary()).status(), CacheStatus::Loading);

    engine.invalidate_detail(&burglary());
    assert!(engine.settled_derived(&burglary()).await.is_ready());
    assert_eq!(engine.detail(&burglary()).status(), CacheStatus::Absent);
}
