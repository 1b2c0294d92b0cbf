use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::json;
use std::{sync::Arc, time::Duration};

use watchnext_api::{
    catalog::CatalogIndex,
    models::{Direction, Title, TitleType},
    routes::{create_router, AppState},
    services::providers::StubProvider,
};

fn title(raw: &str, name: &str, start_year: i32) -> Title {
    Title {
        id: raw.parse().unwrap(),
        name: name.to_string(),
        title_type: TitleType::Movie,
        start_year: Some(start_year),
        end_year: None,
        runtime_minutes: Some(124),
        num_votes: 1_300_000,
        average_rating: 8.7,
        score: 9.1,
    }
}

fn create_test_server() -> TestServer {
    let catalog = CatalogIndex::from_ranked(vec![
        title("tt0080684", "The Empire Strikes Back", 1980),
        title("tt0076759", "Star Wars", 1977),
        title("tt0086190", "Return of the Jedi", 1983),
        title("tt0133093", "The Matrix", 1999),
    ])
    .unwrap();
    let provider = StubProvider::default()
        .with_links("tt0080684", Direction::Forward, ["tt0076759"])
        .with_links("tt0080684", Direction::Backward, ["tt0086190"]);

    let state = Arc::new(AppState {
        catalog: Arc::new(catalog),
        provider: Arc::new(provider),
        resolve_timeout: Duration::from_secs(30),
    });
    TestServer::new(create_router(state)).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_get_title() {
    let server = create_test_server();

    let response = server.get("/api/v1/titles/tt0133093").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["name"], "The Matrix");
    assert_eq!(body["title_type"], "movie");
}

#[tokio::test]
async fn test_get_unknown_title_is_not_found() {
    let server = create_test_server();
    let response = server.get("/api/v1/titles/tt9999999").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_malformed_title_id_is_bad_request() {
    let server = create_test_server();
    let response = server.get("/api/v1/titles/matrix").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_watch_next_returns_chains_in_rank_order() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/watch-next")
        .json(&json!({
            "quota": 3,
            "consumed_ids": ["tt0076759"]
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let rows = body["rows"].as_array().unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["tt0080684", "tt0076759", "tt0086190", "tt0133093"]);
    assert_eq!(
        rows[1]["relation"],
        "Followed by The Empire Strikes Back (tt0080684)"
    );
    assert_eq!(rows[1]["consumed"], true);
    assert_eq!(rows[2]["relation"], "Follows The Empire Strikes Back (tt0080684)");
    assert_eq!(body["stats"]["unconsumed_found"], 3);
    assert_eq!(body["stats"]["quota_met"], true);
}

#[tokio::test]
async fn test_watch_next_sorted_by_year() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/watch-next")
        .json(&json!({ "quota": 1, "sort_by_year": true }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let ids: Vec<&str> = body["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["tt0076759", "tt0080684", "tt0086190"]);
}

#[tokio::test]
async fn test_watch_next_rejects_out_of_range_quota() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/watch-next")
        .json(&json!({ "quota": 0 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Quota"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("client-123"),
        )
        .await;

    let echoed = response.header(HeaderName::from_static("x-request-id"));
    assert_eq!(echoed.to_str().unwrap(), "client-123");
}
