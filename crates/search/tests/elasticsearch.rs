//! Exercises [`ElasticsearchIndex`] against a local axum stand-in.

use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use ddb_search::{ElasticsearchIndex, Index, SearchError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Doc {
    id: String,
    name: String,
}

type Recorded = Arc<Mutex<Vec<(String, String, String)>>>;

async fn record(State(seen): State<Recorded>, method: Method, uri: Uri, body: String) -> Response {
    let path = uri.path().to_string();
    seen.lock()
        .unwrap()
        .push((method.to_string(), path.clone(), body));

    if path.ends_with("/_search") {
        return Json(serde_json::json!({
            "hits": { "hits": [ { "_id": "1", "_source": { "id": "1", "name": "Soup" } } ] }
        }))
        .into_response();
    }
    if method == Method::DELETE && path.ends_with("/missing") {
        return StatusCode::NOT_FOUND.into_response();
    }
    if method == Method::PUT && path == "/existing" {
        return (
            StatusCode::BAD_REQUEST,
            r#"{"error":{"type":"resource_already_exists_exception"}}"#,
        )
            .into_response();
    }
    if path.starts_with("/broken") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    Json(serde_json::json!({ "result": "ok" })).into_response()
}

async fn start() -> (String, Recorded) {
    let seen: Recorded = Arc::default();
    let app = Router::new().fallback(record).with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/"), seen)
}

fn index(base: &str, name: &str) -> ElasticsearchIndex<Doc> {
    ElasticsearchIndex::new(reqwest::Client::new(), base, name)
}

#[tokio::test]
async fn index_puts_document_under_id() {
    let (base, seen) = start().await;
    let doc = Doc {
        id: "R1".into(),
        name: "Soup".into(),
    };
    index(&base, "recipes").index("R1", &doc).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "PUT");
    assert_eq!(seen[0].1, "/recipes/_doc/R1");
    let body: Doc = serde_json::from_str(&seen[0].2).unwrap();
    assert_eq!(body, doc);
}

#[tokio::test]
async fn delete_of_missing_document_succeeds() {
    let (base, seen) = start().await;
    index(&base, "recipes").delete("missing").await.unwrap();
    assert_eq!(seen.lock().unwrap()[0].1, "/recipes/_doc/missing");
}

#[tokio::test]
async fn search_returns_sources() {
    let (base, seen) = start().await;
    let hits = index(&base, "recipes").search("soup").await.unwrap();
    assert_eq!(
        hits,
        vec![Doc {
            id: "1".into(),
            name: "Soup".into()
        }]
    );
    assert!(seen.lock().unwrap()[0].2.contains("multi_match"));
}

#[tokio::test]
async fn wipe_deletes_by_match_all() {
    let (base, seen) = start().await;
    index(&base, "meals").wipe().await.unwrap();
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].0, "POST");
    assert_eq!(seen[0].1, "/meals/_delete_by_query");
    assert!(seen[0].2.contains("match_all"));
}

#[tokio::test]
async fn ensure_exists_tolerates_existing_index() {
    let (base, _seen) = start().await;
    index(&base, "existing").ensure_exists().await.unwrap();
    index(&base, "fresh").ensure_exists().await.unwrap();
}

#[tokio::test]
async fn server_errors_surface_status() {
    let (base, _seen) = start().await;
    let err = index(&base, "broken").delete("x").await.unwrap_err();
    assert_matches!(err, SearchError::HttpStatus { status: 500, .. });
}
