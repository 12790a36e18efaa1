//! End-to-end pipeline runs against mock catalog and streaming services

use arta_collector::models::AnalysisRequest;
use arta_collector::services::{
    AnalysisPipeline, MusicBrainzClient, PipelineError, PipelineOutcome, PopularityEnricher,
    SpotifyClient, SpotifyCredentials, SpotifyError,
};
use arta_common::events::{ArtaEvent, CollectingListener, NothingFoundReason, PipelinePhase};
use arta_common::time::{ManualClock, SharedClock};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn catalog_artist(id: &str, name: &str, score: i64, country: &str, begin: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "score": score,
        "area": { "name": country },
        "life-span": { "begin": begin }
    })
}

async fn mount_catalog(server: &MockServer, artists: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/artist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "artists": artists })))
        .mount(server)
        .await;
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "tok", "expires_in": 3600 })),
        )
        .mount(server)
        .await;
}

async fn mount_hit(server: &MockServer, name: &str, followers: u64, popularity: u32) {
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("q", name))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "artists": { "items": [{
                "name": name,
                "followers": { "total": followers },
                "popularity": popularity,
                "external_urls": { "spotify": format!("https://open.spotify.com/artist/{}", name) },
                "images": []
            }]}
        })))
        .mount(server)
        .await;
}

async fn mount_search_fallback(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "artists": { "items": [] } })))
        .mount(server)
        .await;
}

fn pipeline(server: &MockServer, export_dir: &std::path::Path) -> AnalysisPipeline {
    let clock: SharedClock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 5).unwrap(),
    ));
    let musicbrainz = MusicBrainzClient::with_base_url(server.uri(), Duration::ZERO).unwrap();
    let spotify = SpotifyClient::with_endpoints(
        SpotifyCredentials::new("id", "secret"),
        clock.clone(),
        server.uri(),
        server.uri(),
    )
    .unwrap();
    let enricher = PopularityEnricher::with_delay(Arc::new(spotify), Duration::ZERO);
    AnalysisPipeline::new(musicbrainz, enricher, export_dir.to_path_buf(), clock)
}

fn last_event_type(listener: &CollectingListener) -> &'static str {
    listener
        .events()
        .last()
        .map(ArtaEvent::event_type)
        .unwrap_or("none")
}

#[tokio::test]
async fn test_completed_run_cleans_enriches_and_exports() {
    let server = MockServer::start().await;
    mount_catalog(
        &server,
        vec![
            catalog_artist("a", "Nightwish", 90, "Finland", "1996"),
            catalog_artist("b", "Opeth", 100, "sweden", "1990"),
            catalog_artist("c", "Sólstafir", 80, "Iceland", "1995"),
            catalog_artist("d", "Lost Band", 70, "Atlantis", "2001"),
            catalog_artist("b", "Opeth", 10, "Sweden", "1990"),
        ],
    )
    .await;
    mount_token(&server).await;
    mount_hit(&server, "Opeth", 1_500_000, 61).await;
    mount_search_fallback(&server).await;

    let export_dir = tempfile::tempdir().unwrap();
    let listener = CollectingListener::new();
    let request = AnalysisRequest::new("progressive metal", 100).unwrap();

    let outcome = pipeline(&server, export_dir.path())
        .run(Uuid::new_v4(), &request, &listener)
        .await
        .unwrap();

    let PipelineOutcome::Completed(result) = outcome else {
        panic!("expected a completed run");
    };

    let names: Vec<&str> = result.table.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Opeth", "Nightwish"]);
    assert_eq!(result.table.rows()[0].country_name, "Sweden");
    assert_eq!(result.table.rows()[0].spotify_followers, Some(1_500_000));
    assert_eq!(result.table.rows()[1].spotify_followers, None);
    assert_eq!(result.stats.normalize.duplicates, 1);
    assert_eq!(result.stats.normalize.non_ascii_dropped, 1);
    assert_eq!(result.stats.normalize.unknown_country_dropped, 1);
    assert_eq!(result.stats.enrich.matched, 1);

    assert_eq!(
        result.export_path.file_name().unwrap().to_str().unwrap(),
        "artists_progressive_metal_100_20240309_143005.csv"
    );
    let csv = std::fs::read_to_string(&result.export_path).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("id,name,country_name,year_formed"));
    assert_eq!(lines.count(), 2);

    assert_eq!(
        listener.phases(),
        vec![
            PipelinePhase::Fetching,
            PipelinePhase::Normalizing,
            PipelinePhase::Enriching,
            PipelinePhase::Persisting,
            PipelinePhase::Done,
        ]
    );
    assert_eq!(listener.events()[0].event_type(), "AnalysisStarted");
    assert_eq!(last_event_type(&listener), "AnalysisCompleted");

    let summary = result.report().summary();
    assert!(summary.render_text().contains("PROGRESSIVE METAL ANALYSIS"));
}

#[tokio::test]
async fn test_empty_catalog_is_nothing_found() {
    let server = MockServer::start().await;
    mount_catalog(&server, vec![]).await;

    let export_dir = tempfile::tempdir().unwrap();
    let listener = CollectingListener::new();
    let request = AnalysisRequest::new("nonexistentgenre", 100).unwrap();

    let outcome = pipeline(&server, export_dir.path())
        .run(Uuid::new_v4(), &request, &listener)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        PipelineOutcome::NothingFound {
            reason: NothingFoundReason::NoRecords
        }
    ));
    assert_eq!(last_event_type(&listener), "AnalysisNothingFound");
    assert_eq!(
        listener.phases(),
        vec![PipelinePhase::Fetching, PipelinePhase::Normalizing, PipelinePhase::Done]
    );
    assert_eq!(std::fs::read_dir(export_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_everything_filtered_is_nothing_found() {
    let server = MockServer::start().await;
    mount_catalog(
        &server,
        vec![
            catalog_artist("a", "Björk", 90, "Iceland", "1977"),
            catalog_artist("b", "Nobody", 80, "Atlantis", "2000"),
        ],
    )
    .await;

    let export_dir = tempfile::tempdir().unwrap();
    let listener = CollectingListener::new();
    let request = AnalysisRequest::new("art pop", 100).unwrap();

    let outcome = pipeline(&server, export_dir.path())
        .run(Uuid::new_v4(), &request, &listener)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        PipelineOutcome::NothingFound {
            reason: NothingFoundReason::AllFiltered
        }
    ));
    assert!(!listener.phases().contains(&PipelinePhase::Enriching));
    assert_eq!(listener.phases().last(), Some(&PipelinePhase::Done));
}

#[tokio::test]
async fn test_rejected_credentials_fail_the_run_without_export() {
    let server = MockServer::start().await;
    mount_catalog(
        &server,
        vec![catalog_artist("a", "Opeth", 100, "Sweden", "1990")],
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let export_dir = tempfile::tempdir().unwrap();
    let listener = CollectingListener::new();
    let request = AnalysisRequest::new("metal", 100).unwrap();

    let err = pipeline(&server, export_dir.path())
        .run(Uuid::new_v4(), &request, &listener)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Spotify(SpotifyError::Auth(_))));
    assert_eq!(last_event_type(&listener), "AnalysisFailed");
    assert_eq!(std::fs::read_dir(export_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_failed_lookups_do_not_fail_the_run() {
    let server = MockServer::start().await;
    mount_catalog(
        &server,
        vec![
            catalog_artist("a", "Opeth", 100, "Sweden", "1990"),
            catalog_artist("b", "Amorphis", 90, "Finland", "1990"),
        ],
    )
    .await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("q", "Opeth"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_hit(&server, "Amorphis", 300_000, 52).await;

    let export_dir = tempfile::tempdir().unwrap();
    let listener = CollectingListener::new();
    let request = AnalysisRequest::new("metal", 100).unwrap();

    let outcome = pipeline(&server, export_dir.path())
        .run(Uuid::new_v4(), &request, &listener)
        .await
        .unwrap();

    let PipelineOutcome::Completed(result) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(result.stats.enrich.failed, 1);
    assert_eq!(result.stats.enrich.matched, 1);
    assert!(result.export_path.exists());
}
