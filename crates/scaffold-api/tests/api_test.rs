//! End-to-end tests for the remote store over real HTTP.

use std::path::Path;

use reqwest::StatusCode;
use serde_json::{json, Value};

use scaffold_api::{router, AppState, ServerConfig};
use scaffold_core::PROTOCOL_VERSION;

const MASTER: &str = "master-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start(data_dir: &Path, master: Option<&str>) -> Self {
        let mut config = ServerConfig::default().with_data_dir(data_dir);
        if let Some(master) = master {
            config = config.with_master_token(master);
        }
        let state = AppState::open(config).await.unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn post(&self, path: &str, auth: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut request = self.client.post(format!("{}{}", self.base_url, path)).json(&body);
        if let Some(auth) = auth {
            request = request.header("Authorization", auth);
        }
        let response = request.send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    async fn issue_token(&self, user: &str) -> String {
        let (status, body) = self
            .post("/token/new", Some(MASTER), json!({ "userID": user }))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["success"], true);
        body["token"].as_str().unwrap().to_string()
    }

    async fn insert(&self, token: &str, title: &str, tags: &[&str]) -> String {
        let (status, body) = self
            .post(
                "/insert",
                Some(token),
                json!({ "uri": "file:///a.jpg", "title": title, "tags": tags }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["cloudID"].as_str().unwrap().to_string()
    }

    fn stop(self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn test_tenant_isolation_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), Some(MASTER)).await;
    let alice = server.issue_token("alice").await;
    let bob = server.issue_token("bob").await;

    let cloud_id = server.insert(&alice, "bowl of penne", &["pasta"]).await;

    let (status, hits) = server.post("/query", Some(&alice), json!({ "query": "penne" })).await;
    assert_eq!(status, StatusCode::OK);
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["id"], cloud_id.as_str());
    assert_eq!(hits[0]["owner"], "alice");
    assert_eq!(hits[0]["tags"], json!(["pasta"]));

    let (_, hits) = server.post("/query", Some(&bob), json!({ "query": "penne" })).await;
    assert!(hits.as_array().unwrap().is_empty());

    let (status, body) = server.post("/remove", Some(&bob), json!({ "id": cloud_id })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Image not found" }));

    let (status, body) = server.post("/get", Some(&bob), json!({ "id": cloud_id })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Image not found");

    let (status, body) = server.post("/remove", Some(&alice), json!({ "id": cloud_id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, body) = server.post("/get", Some(&alice), json!({ "id": cloud_id })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Image not found");

    server.stop();
}

#[tokio::test]
async fn test_bearer_prefix_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), Some(MASTER)).await;
    let alice = server.issue_token("alice").await;
    server.insert(&alice, "red shoes", &["shoes"]).await;

    let (status, hits) = server
        .post("/query", Some(&format!("Bearer {}", alice)), json!({ "query": "shoes" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits.as_array().unwrap().len(), 1);

    server.stop();
}

#[tokio::test]
async fn test_every_tenant_route_requires_a_valid_token() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), Some(MASTER)).await;

    let routes = [
        ("/query", json!({ "query": "x" })),
        ("/insert", json!({ "title": "x", "tags": [] })),
        ("/update", json!({ "id": "x", "title": "x", "tags": [] })),
        ("/get", json!({ "id": "x" })),
        ("/remove", json!({ "id": "x" })),
    ];

    for (path, body) in routes {
        for auth in [None, Some("not-a-token"), Some(MASTER)] {
            let (status, response) = server.post(path, auth, body.clone()).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{path} with {auth:?}");
            assert_eq!(response, json!({ "error": "Unauthorized" }));
        }
    }

    server.stop();
}

#[tokio::test]
async fn test_revoked_token_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), Some(MASTER)).await;
    let alice = server.issue_token("alice").await;

    let (status, body) = server
        .post("/token/remove", Some(MASTER), json!({ "token": alice }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = server.post("/query", Some(&alice), json!({ "query": "x" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = server
        .post("/token/remove", Some(MASTER), json!({ "token": alice }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Token not found");

    server.stop();
}

#[tokio::test]
async fn test_token_routes_require_exact_master_secret() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), Some(MASTER)).await;

    for auth in [None, Some("wrong"), Some("Bearer master-secret")] {
        let (status, body) = server
            .post("/token/new", auth, json!({ "userID": "alice" }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{auth:?}");
        assert_eq!(body["error"], "Unauthorized");
    }

    let (status, body) = server.post("/token/new", Some(MASTER), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid data");

    let (status, body) = server.post("/token/remove", Some(MASTER), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid token data");

    server.stop();
}

#[tokio::test]
async fn test_token_routes_disabled_without_master_secret() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), None).await;

    for auth in [None, Some(""), Some("anything")] {
        let (status, _) = server
            .post("/token/new", auth, json!({ "userID": "alice" }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    server.stop();
}

#[tokio::test]
async fn test_invalid_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), Some(MASTER)).await;
    let alice = server.issue_token("alice").await;

    let cases = [
        ("/query", json!({}), "Invalid query"),
        ("/query", json!({ "query": "" }), "Invalid query"),
        ("/insert", json!({ "tags": ["a"] }), "Invalid image data"),
        ("/insert", json!({ "title": "", "tags": ["a"] }), "Invalid image data"),
        ("/insert", json!({ "title": "t" }), "Invalid image data"),
        ("/update", json!({ "title": "t", "tags": [] }), "Invalid image data"),
        ("/get", json!({}), "Invalid image data"),
        ("/remove", json!({}), "Invalid image data"),
    ];
    for (path, body, message) in cases {
        let (status, response) = server.post(path, Some(&alice), body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path} {body}");
        assert_eq!(response["error"], message, "{path} {body}");
    }

    // Not JSON at all.
    let response = server
        .client
        .post(format!("{}/insert", server.base_url))
        .header("Authorization", &alice)
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid image data");

    server.stop();
}

#[tokio::test]
async fn test_update_keeps_cloud_id_and_reindexes() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), Some(MASTER)).await;
    let alice = server.issue_token("alice").await;
    let bob = server.issue_token("bob").await;
    let cloud_id = server.insert(&alice, "bowl of penne", &["pasta"]).await;

    let (status, body) = server
        .post(
            "/update",
            Some(&alice),
            json!({ "id": cloud_id, "title": "plate of rigatoni", "tags": ["pasta", "dinner"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cloudID"], cloud_id.as_str());

    let (_, hits) = server.post("/query", Some(&alice), json!({ "query": "penne" })).await;
    assert!(hits.as_array().unwrap().is_empty());
    let (_, hits) = server.post("/query", Some(&alice), json!({ "query": "rigatoni" })).await;
    assert_eq!(hits[0]["id"], cloud_id.as_str());

    let (status, body) = server
        .post("/update", Some(&bob), json!({ "id": cloud_id, "title": "mine", "tags": [] }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Image not found");

    let (_, record) = server.post("/get", Some(&alice), json!({ "id": cloud_id })).await;
    assert_eq!(record["title"], "plate of rigatoni");

    server.stop();
}

#[tokio::test]
async fn test_acknowledged_insert_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let (alice, cloud_id) = {
        let server = TestServer::start(dir.path(), Some(MASTER)).await;
        let alice = server.issue_token("alice").await;
        let cloud_id = server.insert(&alice, "bowl of penne", &["pasta"]).await;
        // Abrupt stop: no flush.
        server.stop();
        (alice, cloud_id)
    };

    let server = TestServer::start(dir.path(), Some(MASTER)).await;
    let (status, hits) = server.post("/query", Some(&alice), json!({ "query": "pasta" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["id"], cloud_id.as_str());

    server.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_inserts_all_survive_restart() {
    let dir = tempfile::tempdir().unwrap();

    let (alice, cloud_ids) = {
        let server = TestServer::start(dir.path(), Some(MASTER)).await;
        let alice = server.issue_token("alice").await;
        let titles: Vec<String> = (0..20).map(|i| format!("photo number {i}")).collect();
        let cloud_ids = futures::future::join_all(
            titles.iter().map(|title| server.insert(&alice, title, &["batch"])),
        )
        .await;
        server.stop();
        (alice, cloud_ids)
    };

    let mut unique = cloud_ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 20);

    let server = TestServer::start(dir.path(), Some(MASTER)).await;
    for (i, cloud_id) in cloud_ids.iter().enumerate() {
        let (status, body) = server.post("/get", Some(&alice), json!({ "id": cloud_id })).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["title"], format!("photo number {i}"));
    }
    let (_, hits) = server.post("/query", Some(&alice), json!({ "query": "batch" })).await;
    assert_eq!(hits.as_array().unwrap().len(), 20);

    server.stop();
}

#[tokio::test]
async fn test_corrupt_snapshot_aborts_startup() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.json"), b"{ truncated").unwrap();

    let config = ServerConfig::default().with_data_dir(dir.path());
    assert!(AppState::open(config).await.is_err());
}

#[tokio::test]
async fn test_meta_routes() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), None).await;

    let version: Value = server
        .client
        .get(format!("{}/version", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(version["version"], PROTOCOL_VERSION);

    let health: Value = server
        .client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let response = server
        .client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert!(!response.text().await.unwrap().is_empty());

    server.stop();
}
