use actix_web::{dev::ServerHandle, middleware::NormalizePath, web, App, HttpServer};
use reqwest::Client;
use serde_json::json;
use std::net::TcpListener;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::time::{sleep, Duration};
use vecdocs::server::AppState;
use vecdocs::{EmbedderConfig, VecStore};

/// Find a free port by binding to port 0
fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Start a server over the store at `db_path` and return its base URL
async fn start_server(db_path: PathBuf) -> (String, ServerHandle) {
    let port = free_port();
    let store = VecStore::load_or_new(&db_path, EmbedderConfig::default()).unwrap();
    let state = web::Data::new(AppState::new(store, db_path));

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(NormalizePath::trim())
            .configure(vecdocs::server::config)
    })
    .bind(format!("127.0.0.1:{}", port))
    .unwrap()
    .run();
    let handle = server.handle();
    tokio::spawn(server);
    sleep(Duration::from_millis(200)).await;

    (format!("http://127.0.0.1:{}", port), handle)
}

async fn create_kb(client: &Client, base: &str) {
    let resp = client
        .post(format!("{}/collections/", base))
        .json(&json!({"name": "kb", "dimension": 384}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

async fn insert(client: &Client, base: &str, doc_name: &str, text: &str) -> reqwest::Response {
    client
        .post(format!("{}/collections/kb/documents/", base))
        .json(&json!({"doc_name": doc_name, "text": text}))
        .send()
        .await
        .unwrap()
}

#[actix_web::test]
async fn test_create_insert_and_search() {
    let temp_dir = TempDir::new().unwrap();
    let (base, handle) = start_server(temp_dir.path().join("test.bin")).await;
    let client = Client::new();

    create_kb(&client, &base).await;

    let resp = insert(&client, &base, "doc1", "This is the first sample document.").await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Document 'doc1' inserted into collection 'kb'.");
    insert(&client, &base, "doc2", "This is the second sample document.").await;

    // --- Search: "first" should find doc1 ---
    let resp = client
        .post(format!("{}/collections/kb/search/", base))
        .json(&json!({"query": "first", "top_n": 1}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["doc_name"], "doc1");
    assert_eq!(results[0]["text"], "This is the first sample document.");

    // --- Default top_n is 5, clamped to 2 documents ---
    let resp = client
        .post(format!("{}/collections/kb/search", base))
        .json(&json!({"query": "sample"}))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["results"].as_array().unwrap().len(), 2);

    handle.stop(true).await;
}

#[actix_web::test]
async fn test_duplicate_names_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let (base, handle) = start_server(temp_dir.path().join("test.bin")).await;
    let client = Client::new();

    create_kb(&client, &base).await;

    // Same collection again
    let resp = client
        .post(format!("{}/collections", base))
        .json(&json!({"name": "kb"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Collection 'kb' already exists");

    // Same document name in a different collection
    client
        .post(format!("{}/collections", base))
        .json(&json!({"name": "other"}))
        .send()
        .await
        .unwrap();
    insert(&client, &base, "doc1", "some text").await;

    let resp = client
        .post(format!("{}/collections/other/documents", base))
        .json(&json!({"doc_name": "doc1", "text": "other text"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Document 'doc1' already exists");

    // Listing shows both collections once
    let resp = client.get(format!("{}/count_collection", base)).send().await.unwrap();
    let names: Vec<String> = resp.json().await.unwrap();
    assert_eq!(names, vec!["kb".to_string(), "other".to_string()]);

    handle.stop(true).await;
}

#[actix_web::test]
async fn test_update_and_delete() {
    let temp_dir = TempDir::new().unwrap();
    let (base, handle) = start_server(temp_dir.path().join("test.bin")).await;
    let client = Client::new();

    create_kb(&client, &base).await;
    insert(&client, &base, "cats", "Cats purr and chase mice around the barn.").await;
    insert(&client, &base, "rust", "Rust compiles to fast native machine code.").await;
    insert(&client, &base, "ocean", "The ocean tides follow the moon.").await;

    // --- Update via query parameter ---
    let resp = client
        .put(format!("{}/collections/kb/documents/cats", base))
        .query(&[("new_text", "Quantum physics explains particles.")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client.get(format!("{}/documents/cats", base)).send().await.unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["text"], "Quantum physics explains particles.");

    let resp = client
        .post(format!("{}/collections/kb/search", base))
        .json(&json!({"query": "Quantum physics explains particles.", "top_n": 3}))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["results"][0]["doc_name"], "cats");

    // --- Update via JSON body ---
    let resp = client
        .put(format!("{}/collections/kb/documents/rust", base))
        .json(&json!({"new_text": "Rust has no garbage collector."}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // --- Delete, then the name is gone everywhere ---
    let resp = client
        .delete(format!("{}/collections/kb/documents/ocean", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client.get(format!("{}/documents/ocean", base)).send().await.unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .delete(format!("{}/collections/kb/documents/ocean", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Document 'ocean' does not exist");

    let resp = client.get(format!("{}/collections/kb/documents", base)).send().await.unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    let docs = body["documents"].as_array().unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["doc_name"], "cats");
    assert_eq!(docs[1]["text"], "Rust has no garbage collector.");

    handle.stop(true).await;
}

#[actix_web::test]
async fn test_search_empty_and_missing_collection() {
    let temp_dir = TempDir::new().unwrap();
    let (base, handle) = start_server(temp_dir.path().join("empty.bin")).await;
    let client = Client::new();

    create_kb(&client, &base).await;

    let resp = client
        .post(format!("{}/collections/kb/search", base))
        .json(&json!({"query": "anything", "top_n": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["results"].as_array().unwrap().is_empty());

    let resp = client
        .post(format!("{}/collections/nope/search", base))
        .json(&json!({"query": "anything"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    handle.stop(true).await;
}

#[actix_web::test]
async fn test_state_survives_restart_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("restart.bin");
    let client = Client::new();

    let (base, handle) = start_server(db_path.clone()).await;
    create_kb(&client, &base).await;
    insert(&client, &base, "doc1", "This is the first sample document.").await;
    handle.stop(true).await;

    // Mutations were saved, a new server sees them
    let (base, handle) = start_server(db_path.clone()).await;
    let resp = client.get(format!("{}/collections", base)).send().await.unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["collections"][0], "kb");

    // Drop the collection in memory only, then reload from disk
    let snapshot = VecStore::load(&db_path).unwrap();
    let resp = client.delete(format!("{}/collections/kb", base)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    snapshot.save(&db_path).unwrap();

    let resp = client.post(format!("{}/load", base)).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client.get(format!("{}/documents/doc1", base)).send().await.unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["text"], "This is the first sample document.");

    let resp = client.post(format!("{}/save", base)).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    handle.stop(true).await;
}
