//! Identification Flow Integration Tests
//!
//! Drives `WidgetSession` over real HTTP against the in-process mock
//! backend: request wire shape per backend, state transitions, the
//! in-flight guard and late-response handling.

mod helpers;

use aitax_common::events::{EventBus, WidgetEvent};
use aitax_widget::config::WidgetConfig;
use aitax_widget::models::BackendFormat;
use aitax_widget::services::{ReqwestTransport, Transport};
use aitax_widget::widget::{IdentifyState, WidgetSession};
use axum::http::StatusCode;
use helpers::{capture_logs, names, photos, MockBackend, MockReply};
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

const PLANTNET_SUCCESS: &str = r#"{
    "query": {"project": "all"},
    "results": [
        {
            "score": 0.92,
            "species": {
                "scientificNameWithoutAuthor": "Bellis perennis",
                "scientificNameAuthorship": "L.",
                "family": {"scientificName": "Asteraceae"},
                "commonNames": ["Daisy", "Common daisy"]
            },
            "gbif": {"id": "3117424"},
            "images": [
                {"citation": "Jane Doe / cc-by-sa", "date": {"string": "May 3, 2021"}, "url": {"o": "o1", "m": "https://bs.plantnet.org/image/m/1", "s": "s1"}},
                {"citation": "John Roe / cc-by-sa", "date": {"string": "June 1, 2020"}, "url": {"o": "o2", "m": "https://bs.plantnet.org/image/m/2", "s": "s2"}}
            ]
        },
        {
            "score": 0.04,
            "species": {"scientificNameWithoutAuthor": "Leucanthemum vulgare", "commonNames": []},
            "images": []
        }
    ]
}"#;

const C4C_QUERCUS: &str = r#"{"results":[{"name":"Quercus robur","score":0.8,"gbif_id":"123",
    "authorship":"L.","vernacularName":"Oak","genus":"Quercus","family":"Fagaceae","images":[]}]}"#;

fn transport() -> Arc<dyn Transport> {
    Arc::new(ReqwestTransport::new().unwrap())
}

fn session_for(api_url: Url, backend: BackendFormat) -> WidgetSession {
    let config = WidgetConfig::new(api_url)
        .with_backend(backend)
        .with_api_key("test-key")
        .with_lang("fr");
    WidgetSession::new(config, transport(), EventBus::new(32))
}

/// TC-E2E-001: Three images identified through PlantNet
#[tokio::test]
async fn tc_e2e_001_plantnet_pick_to_loaded() {
    // Given: idle widget and a PlantNet backend returning a 0.92 match
    let backend = MockBackend::start().await;
    backend.push_reply(MockReply::json(PLANTNET_SUCCESS));
    let session = session_for(backend.url("/v2/identify/all"), BackendFormat::Plantnet);
    assert!(session.state().await.is_idle());

    // When: user picks 3 images
    let state = session.pick_images(photos(3)).await;

    // Then: Loaded with the backend's ranking
    let batch = state.batch().expect("loaded state");
    assert_eq!(batch.results.len(), 2);
    assert_eq!(batch.results[0].score, 0.92);
    assert_eq!(batch.results[0].taxon_name.as_deref(), Some("Bellis perennis"));
    assert_eq!(batch.results[0].common_names, vec!["Daisy", "Common daisy"]);
    assert_eq!(
        batch.results[0].gbif_url.as_deref(),
        Some("https://www.gbif.org/species/3117424")
    );
    assert_eq!(batch.results[0].images[0].alt, "Jane Doe / cc-by-sa - May 3, 2021");

    // And: one submission with PlantNet's field names and query
    let posts = backend.posts();
    assert_eq!(posts.len(), 1);
    let request = &posts[0];
    assert_eq!(request.path, "/v2/identify/all");
    assert_eq!(request.query.get("include-related-images").map(String::as_str), Some("true"));
    assert_eq!(request.query.get("lang").map(String::as_str), Some("fr"));
    assert_eq!(request.query.get("api-key").map(String::as_str), Some("test-key"));
    assert_eq!(request.text_fields("organs"), vec!["auto", "auto", "auto"]);
    assert_eq!(
        request.file_fields("images"),
        vec!["photo_1.jpg", "photo_2.jpg", "photo_3.jpg"]
    );
}

/// TC-E2E-002: Remove one of two images, then the last one
#[tokio::test]
async fn tc_e2e_002_remove_then_remove_last() {
    let backend = MockBackend::start().await;
    backend.set_fallback(MockReply::json(PLANTNET_SUCCESS));
    let session = session_for(backend.url("/v2/identify/all"), BackendFormat::Plantnet);

    // Given: Loaded with 2 images
    assert!(session.pick_images(photos(2)).await.batch().is_some());

    // When: one image removed
    let state = session.remove_image(0).await;

    // Then: re-submitted with the remaining image
    assert!(state.batch().is_some());
    let posts = backend.posts();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[1].file_fields("images"), vec!["photo_2.jpg"]);

    // When: last image removed
    let state = session.remove_image(0).await;

    // Then: Idle, no images, no further request
    assert_eq!(state, IdentifyState::Idle);
    assert!(session.images().await.is_empty());
    assert_eq!(backend.posts().len(), 2);
}

/// TC-E2E-003: HTTP 500 surfaces the status text and keeps the selection
#[tokio::test]
async fn tc_e2e_003_http_500_keeps_images() {
    let backend = MockBackend::start().await;
    backend.push_reply(MockReply::status(
        StatusCode::INTERNAL_SERVER_ERROR,
        "<html>upstream crashed</html>",
    ));
    let session = session_for(backend.url("/v2/identify/all"), BackendFormat::Plantnet);

    let state = session.pick_images(photos(2)).await;

    let message = state.error().expect("error state");
    assert!(message.contains("Internal Server Error"), "message: {}", message);
    assert!(message.contains("500"));
    assert_eq!(names(&session.images().await), vec!["photo_1.jpg", "photo_2.jpg"]);
}

/// TC-E2E-004: C4C error status and Quercus record
#[tokio::test]
async fn tc_e2e_004_c4c_error_then_success() {
    let backend = MockBackend::start().await;
    backend.push_reply(MockReply::json(r#"{"status":"error"}"#));
    backend.push_reply(MockReply::json(C4C_QUERCUS));
    let session = session_for(backend.url("/ai-taxonomist"), BackendFormat::C4c);

    // Given: backend signals an error without message
    let state = session.pick_images(photos(1)).await;
    assert_eq!(state, IdentifyState::Error("error".to_string()));

    // When: user adds an image (Error → Loading → Loaded)
    let state = session.add_images(photos(1)).await;

    // Then: Quercus candidate mapped from C4C fields
    let result = &state.batch().expect("loaded state").results[0];
    assert_eq!(result.taxon_name.as_deref(), Some("Quercus robur"));
    assert_eq!(result.gbif_url.as_deref(), Some("https://www.gbif.org/species/123"));
    assert_eq!(result.family.as_deref(), Some("Fagaceae"));
    assert_eq!(result.primary_common_name(), Some("Oak"));

    // And: C4C wire shape, `info` flag before the images
    let posts = backend.posts();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[1].path, "/ai-taxonomist/identify");
    assert_eq!(posts[1].text_fields("info"), vec!["true"]);
    assert_eq!(posts[1].field_names(), vec!["info", "image", "image"]);
    assert_eq!(posts[1].query.get("api-key").map(String::as_str), Some("test-key"));
}

/// TC-E2E-005: Carpeso nutrition summary and relative image paths
#[tokio::test]
async fn tc_e2e_005_carpeso_resolves_image_origin() {
    let backend = MockBackend::start().await;
    backend.push_reply(MockReply::json(
        r#"{"results":{"nutrition":0.8567,"details":[
            {"name":"Lolium perenne","authorship":"L.","vernacularName":"Ray-grass anglais",
             "score":0.71,"nutrition":0.95,"url":"https://carpeso.example/lolium",
             "images":[{"url":"static/img/1.jpg"},{"url":"/static/img/2.jpg"},
                       {"url":"static/img/3.jpg"},{"url":"static/img/4.jpg"}]}]}}"#,
    ));
    let session = session_for(backend.url("/carpeso/classify"), BackendFormat::Carpeso);

    let state = session.pick_images(photos(1)).await;

    let batch = state.batch().expect("loaded state");
    assert_eq!(
        batch.overall_score.as_deref(),
        Some("Valeur nutritive estimée : 0.86 ufl/kg MS")
    );
    let result = &batch.results[0];
    assert_eq!(result.images.len(), 3);
    assert_eq!(
        result.images[0].url,
        backend.url("/carpeso/static/img/1.jpg").to_string()
    );
    assert_eq!(
        result.images[1].url,
        backend.url("/carpeso/static/img/2.jpg").to_string()
    );
    assert_eq!(result.additional_text.as_deref(), Some("Nutrition : 0.95 ufl/kg MS"));

    let posts = backend.posts();
    assert_eq!(posts[0].path, "/carpeso/classify");
    assert_eq!(posts[0].file_fields("image"), vec!["photo_1.jpg"]);
}

/// TC-GUARD-001: A second submission while Loading is rejected
#[tokio::test]
async fn tc_guard_001_add_while_loading_is_noop() {
    let (logs, _guard) = capture_logs();
    let backend = MockBackend::start().await;
    backend.push_reply(MockReply::json(PLANTNET_SUCCESS).delayed(Duration::from_millis(300)));
    backend.set_fallback(MockReply::json(r#"{"results":[]}"#));
    let session = session_for(backend.url("/v2/identify/all"), BackendFormat::Plantnet);

    // Given: first identification in flight
    // When: user adds images before it resolves
    let (first, second) = tokio::join!(session.pick_images(photos(2)), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.add_images(photos(1)).await
    });

    // Then: the add observed Loading and changed nothing
    assert_eq!(second, IdentifyState::Loading);
    assert_eq!(names(&session.images().await), vec!["photo_1.jpg", "photo_2.jpg"]);

    // And: the final state reflects the first (only) request
    assert_eq!(first.batch().unwrap().results[0].score, 0.92);
    assert_eq!(backend.posts().len(), 1);
    assert_eq!(
        logs.matching_at(Level::WARN, "already in progress").len(),
        1
    );
}

/// TC-GUARD-002: A response arriving after reset is ignored
#[tokio::test]
async fn tc_guard_002_reset_discards_late_response() {
    let backend = MockBackend::start().await;
    backend.push_reply(MockReply::json(PLANTNET_SUCCESS).delayed(Duration::from_millis(200)));
    let session = session_for(backend.url("/v2/identify/all"), BackendFormat::Plantnet);

    let (late, _) = tokio::join!(session.pick_images(photos(1)), async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        session.reset().await;
    });

    assert_eq!(late, IdentifyState::Idle);
    assert_eq!(session.state().await, IdentifyState::Idle);
    assert!(session.images().await.is_empty());
}

/// TC-RESET-001: Reset twice equals reset once
#[tokio::test]
async fn tc_reset_001_idempotent() {
    let backend = MockBackend::start().await;
    backend.push_reply(MockReply::json(PLANTNET_SUCCESS));
    let session = session_for(backend.url("/v2/identify/all"), BackendFormat::Plantnet);
    session.pick_images(photos(2)).await;

    session.reset().await;
    let once = (session.state().await, session.images().await.len());
    session.reset().await;
    let twice = (session.state().await, session.images().await.len());

    assert_eq!(once, twice);
    assert_eq!(once, (IdentifyState::Idle, 0));
}

/// TC-CLAMP-001: Adds beyond max_images keep the earliest images
#[tokio::test]
async fn tc_clamp_001_add_truncates_to_max() {
    let backend = MockBackend::start().await;
    backend.set_fallback(MockReply::json(r#"{"results":[]}"#));
    let config = WidgetConfig::new(backend.url("/v2/identify/all")).with_max_images(3);
    let session = WidgetSession::new(config, transport(), EventBus::new(8));

    session.pick_images(photos(2)).await;
    let state = session.add_images(photos(4)).await;

    // Zero results is a success, not an error
    assert!(state.batch().unwrap().is_empty());
    assert_eq!(
        names(&session.images().await),
        vec!["photo_1.jpg", "photo_2.jpg", "photo_1.jpg"]
    );
    assert_eq!(backend.posts()[1].file_fields("images").len(), 3);
}

/// TC-NET-001: Unreachable backend yields an "Error: ..." message
#[tokio::test]
async fn tc_net_001_connection_refused() {
    // Bind then drop a listener to get a closed port
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("http://{}/v2/identify/all", addr)).unwrap();
    let session = session_for(url, BackendFormat::Plantnet);

    let state = session.pick_images(photos(1)).await;

    let message = state.error().expect("error state");
    assert!(message.starts_with("Error: "), "message: {}", message);
    assert_eq!(session.images().await.len(), 1);
}

/// TC-EVT-001: Observers are notified when a submission begins
#[tokio::test]
async fn tc_evt_001_started_event() {
    let backend = MockBackend::start().await;
    backend.push_reply(MockReply::status(StatusCode::NOT_FOUND, r#"{"error":"Not Found","message":"Species not found"}"#));
    let events = EventBus::new(8);
    let mut rx = events.subscribe();
    let config = WidgetConfig::new(backend.url("/v2/identify/all"));
    let session = WidgetSession::new(config, transport(), events);

    let state = session.pick_images(photos(2)).await;
    assert_eq!(state.error(), Some("404 Not Found: Species not found"));

    match rx.recv().await.unwrap() {
        WidgetEvent::IdentificationStarted {
            instance_id,
            image_count,
            backend,
            ..
        } => {
            assert_eq!(instance_id, session.instance_id());
            assert_eq!(image_count, 2);
            assert_eq!(backend, "pn");
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(matches!(
        rx.recv().await.unwrap(),
        WidgetEvent::IdentificationFailed { .. }
    ));
}

/// TC-META-001: C4C provenance DOI over HTTP
#[tokio::test]
async fn tc_meta_001_c4c_provenance() {
    let backend = MockBackend::start().await;
    backend.on_get(
        "/status",
        MockReply::json(r#"{"status":"ok","gbif_doi":"10.15468/dl.xyz789","queries":7}"#),
    );
    let c4c = session_for(backend.url("/ai-taxonomist"), BackendFormat::C4c);
    let plantnet = session_for(backend.url("/ai-taxonomist"), BackendFormat::Plantnet);

    assert_eq!(
        c4c.load_provenance().await.as_deref(),
        Some("https://doi.org/10.15468/dl.xyz789")
    );
    assert!(plantnet.load_provenance().await.is_none());
    assert_eq!(backend.requests().len(), 1);
    assert_eq!(backend.requests()[0].path, "/ai-taxonomist/status");
}
