use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ghgrip::event::EventKind;
use ghgrip::fetch::{ActivityFetcher, ActivityQuery};
use ghgrip::github::{FetchError, GithubClient};

fn push_event_with_commits(id: &str, date: &str) -> serde_json::Value {
    json!({
        "id": id,
        "type": "PushEvent",
        "repo": { "name": "user/repo" },
        "created_at": date,
        "payload": {
            "size": 1,
            "commits": [ { "message": "fix bug", "distinct": true, "sha": "aaa" } ]
        }
    })
}

fn pending_push_event(id: &str, date: &str) -> serde_json::Value {
    json!({
        "id": id,
        "type": "PushEvent",
        "repo": { "name": "user/repo" },
        "created_at": date,
        "payload": { "before": "abc", "head": "def" }
    })
}

fn watch_event(id: &str, date: &str) -> serde_json::Value {
    json!({
        "id": id,
        "type": "WatchEvent",
        "repo": { "name": "user/other" },
        "created_at": date,
        "payload": {}
    })
}

fn unrecognized_event(id: &str, date: &str) -> serde_json::Value {
    json!({
        "id": id,
        "type": "GollumEvent",
        "repo": { "name": "user/wiki" },
        "created_at": date,
        "payload": { "pages": [] }
    })
}

#[tokio::test]
async fn full_pipeline_normalizes_enriches_and_preserves_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/octocat/events/public"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            push_event_with_commits("1", "2026-02-15T10:00:00Z"),
            unrecognized_event("2", "2026-02-15T09:00:00Z"),
            pending_push_event("3", "2026-02-14T18:00:00Z"),
            watch_event("4", "2026-02-14T12:00:00Z"),
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/user/repo/compare/abc...def"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "commits": [
                { "commit": { "message": "a" } },
                { "commit": { "message": "b" } }
            ]
        })))
        .mount(&server)
        .await;

    let client = GithubClient::with_base_url(&server.uri(), None);
    let mut fetcher = ActivityFetcher::new(client);
    let events = fetcher.fetch(&ActivityQuery::new("octocat")).await.unwrap();

    // Unrecognized kind dropped, order otherwise preserved
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].id, "1");
    assert_eq!(events[1].id, "3");
    assert_eq!(events[2].id, "4");

    assert_eq!(events[0].title(), Some("Pushed 1 commit to user/repo"));
    assert_eq!(events[0].details(), &["fix bug".to_string()]);

    // The pending push was enriched via the compare endpoint
    assert!(!events[1].is_pending());
    assert_eq!(events[1].title(), Some("Pushed 2 commits to user/repo"));
    assert_eq!(events[1].details(), &["a".to_string(), "b".to_string()]);

    assert_eq!(events[2].title(), Some("Starred user/other"));
}

#[tokio::test]
async fn repeated_query_is_served_from_cache() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/octocat/events/public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            watch_event("1", "2026-02-15T10:00:00Z"),
        ])))
        .expect(1) // the second fetch must not hit the network
        .mount(&server)
        .await;

    let client = GithubClient::with_base_url(&server.uri(), None);
    let mut fetcher = ActivityFetcher::new(client);
    let query = ActivityQuery::new("octocat");

    let first = fetcher.fetch(&query).await.unwrap();
    let second = fetcher.fetch(&query).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn distinct_queries_are_cached_separately() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/octocat/events/public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            watch_event("1", "2026-02-15T10:00:00Z"),
            push_event_with_commits("2", "2026-02-15T09:00:00Z"),
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let client = GithubClient::with_base_url(&server.uri(), None);
    let mut fetcher = ActivityFetcher::new(client);

    let all = fetcher.fetch(&ActivityQuery::new("octocat")).await.unwrap();
    assert_eq!(all.len(), 2);

    let mut stars_only = ActivityQuery::new("octocat");
    stars_only.kinds = Some(vec![EventKind::Watch]);
    let stars = fetcher.fetch(&stars_only).await.unwrap();
    assert_eq!(stars.len(), 1);
    assert_eq!(stars[0].kind, EventKind::Watch);
}

#[tokio::test]
async fn limit_caps_events_before_enrichment() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/octocat/events/public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            watch_event("1", "2026-02-15T10:00:00Z"),
            watch_event("2", "2026-02-15T09:00:00Z"),
            pending_push_event("3", "2026-02-15T08:00:00Z"),
        ])))
        .mount(&server)
        .await;

    // The push event falls outside the cap, so its compare lookup must
    // never be issued.
    Mock::given(method("GET"))
        .and(path("/repos/user/repo/compare/abc...def"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "commits": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let client = GithubClient::with_base_url(&server.uri(), None);
    let mut fetcher = ActivityFetcher::new(client);

    let mut query = ActivityQuery::new("octocat");
    query.limit = 2;
    let events = fetcher.fetch(&query).await.unwrap();

    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| !e.is_pending()));
}

#[tokio::test]
async fn primary_fetch_error_surfaces_status_code() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/ghost/events/public"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = GithubClient::with_base_url(&server.uri(), None);
    let mut fetcher = ActivityFetcher::new(client);

    let err = fetcher
        .fetch(&ActivityQuery::new("ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404 }));
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn malformed_response_body_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/octocat/events/public"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .mount(&server)
        .await;

    let client = GithubClient::with_base_url(&server.uri(), None);
    let mut fetcher = ActivityFetcher::new(client);

    let err = fetcher
        .fetch(&ActivityQuery::new("octocat"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn failed_enrichment_downgrades_to_zero_commits() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/octocat/events/public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            pending_push_event("1", "2026-02-15T10:00:00Z"),
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/user/repo/compare/abc...def"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = GithubClient::with_base_url(&server.uri(), None);
    let mut fetcher = ActivityFetcher::new(client);
    let events = fetcher.fetch(&ActivityQuery::new("octocat")).await.unwrap();

    assert_eq!(events.len(), 1);
    assert!(!events[0].is_pending());
    assert_eq!(events[0].title(), Some("Pushed 0 commits to user/repo"));
    assert!(events[0].details().is_empty());
}

#[tokio::test]
async fn bearer_token_is_attached_to_primary_and_secondary_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/octocat/events/public"))
        .and(header("authorization", "Bearer sekrit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            pending_push_event("1", "2026-02-15T10:00:00Z"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/user/repo/compare/abc...def"))
        .and(header("authorization", "Bearer sekrit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "commits": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GithubClient::with_base_url(&server.uri(), Some("sekrit".to_string()));
    let mut fetcher = ActivityFetcher::new(client);
    let events = fetcher.fetch(&ActivityQuery::new("octocat")).await.unwrap();
    assert_eq!(events[0].title(), Some("Pushed 0 commits to user/repo"));
}
