//! MusicBrainz paging against a mock server

use arta_collector::services::musicbrainz_client::{MusicBrainzClient, PageOutcome, StopReason};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn artist(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "score": 100,
        "area": { "name": "Finland" },
        "life-span": { "begin": "1995", "ended": null }
    })
}

fn page(records: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "count": 1000, "artists": records }))
}

fn client(server: &MockServer) -> MusicBrainzClient {
    MusicBrainzClient::with_base_url(server.uri(), Duration::ZERO).unwrap()
}

#[tokio::test]
async fn test_pages_are_requested_with_tag_query_and_offsets() {
    let server = MockServer::start().await;
    for (offset, id) in [("2", "a"), ("102", "b"), ("202", "c")] {
        Mock::given(method("GET"))
            .and(path("/artist"))
            .and(query_param("query", "tag:metal"))
            .and(query_param("limit", "100"))
            .and(query_param("offset", offset))
            .and(query_param("fmt", "json"))
            .respond_with(page(vec![artist(id, id)]))
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut outcomes = Vec::new();
    let report = client(&server)
        .search_artists_by_tag("metal", 250, |o| outcomes.push(o.clone()))
        .await;

    assert_eq!(report.records.len(), 3);
    assert_eq!(report.pages_fetched, 3);
    assert!(report.stopped_early.is_none());
    assert_eq!(
        outcomes,
        vec![
            PageOutcome::Fetched { offset: 2, records: 1 },
            PageOutcome::Fetched { offset: 102, records: 1 },
            PageOutcome::Fetched { offset: 202, records: 1 },
        ]
    );
}

#[tokio::test]
async fn test_error_status_stops_paging_and_keeps_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("offset", "2"))
        .respond_with(page(vec![artist("a", "Alpha"), artist("b", "Beta")]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("offset", "102"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("offset", "202"))
        .respond_with(page(vec![artist("c", "Gamma")]))
        .expect(0)
        .mount(&server)
        .await;

    let report = client(&server).search_artists_by_tag("metal", 300, |_| {}).await;

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.stopped_early, Some(StopReason::Status(503)));
}

#[tokio::test]
async fn test_empty_body_stops_paging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let report = client(&server).search_artists_by_tag("metal", 200, |_| {}).await;

    assert!(report.records.is_empty());
    assert_eq!(report.stopped_early, Some(StopReason::EmptyBody));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_page_counts_as_empty_and_paging_continues() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("offset", "102"))
        .respond_with(page(vec![artist("b", "Beta")]))
        .mount(&server)
        .await;

    let report = client(&server).search_artists_by_tag("metal", 200, |_| {}).await;

    assert_eq!(report.malformed_pages, 1);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.records.len(), 1);
    assert!(report.stopped_early.is_none());
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_stop() {
    // Bound then released, so nothing listens on this port
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let client =
        MusicBrainzClient::with_base_url(format!("http://127.0.0.1:{}", port), Duration::ZERO)
            .unwrap();
    let report = client.search_artists_by_tag("metal", 100, |_| {}).await;

    assert!(report.records.is_empty());
    assert!(matches!(report.stopped_early, Some(StopReason::Transport(_))));
}
