//! Webhook delivery against a local axum receiver.

mod common;

use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::Router;
use ddb_core::signing::{decode_secret, verify_signature, SIGNATURE_HEADER};
use ddb_core::EventType;
use ddb_db::models::webhook::{CONTENT_TYPE_JSON, CONTENT_TYPE_XML};
use ddb_events::delivery::webhook::WebhookError;
use ddb_events::{DataChangeMessage, WebhookExecutionRequest, WebhookExecutor, WebhookOutcome};
use ddb_messaging::MessageHandler;

use common::{household, recipe, webhook, FakeDataManager, SECRET_HEX};

#[derive(Debug, Clone)]
struct Received {
    method: Method,
    content_type: String,
    signature: String,
    body: Vec<u8>,
}

#[derive(Clone)]
struct Receiver {
    status: StatusCode,
    seen: Arc<Mutex<Vec<Received>>>,
}

async fn receive(State(rx): State<Receiver>, method: Method, headers: HeaderMap, body: axum::body::Bytes) -> StatusCode {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    rx.seen.lock().unwrap().push(Received {
        method,
        content_type: header("content-type"),
        signature: header(SIGNATURE_HEADER),
        body: body.to_vec(),
    });
    rx.status
}

/// Start a receiver answering `status` to everything. Returns its URL.
async fn start(status: StatusCode) -> (String, Arc<Mutex<Vec<Received>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().fallback(receive).with_state(Receiver {
        status,
        seen: seen.clone(),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/hooks/recipes"), seen)
}

fn request() -> WebhookExecutionRequest {
    let mut payload = DataChangeMessage::new(EventType::RecipeCreated).with_household_id("H1");
    payload.recipe = Some(recipe("R1"));
    WebhookExecutionRequest {
        webhook_id: "W1".into(),
        household_id: "H1".into(),
        payload,
    }
}

fn executor_for(url: &str, content_type: &str) -> (WebhookExecutor, Arc<FakeDataManager>) {
    let data = Arc::new(FakeDataManager::new());
    data.add_household(household("H1"), &[]);
    data.subscribe(EventType::RecipeCreated, webhook("W1", "H1", url, content_type));
    (WebhookExecutor::new(data.clone()), data)
}

#[tokio::test]
async fn non_success_response_is_swallowed_after_one_signed_call() {
    let (url, seen) = start(StatusCode::INTERNAL_SERVER_ERROR).await;
    let (executor, _) = executor_for(&url, CONTENT_TYPE_JSON);

    let body = serde_json::to_vec(&request()).unwrap();
    assert!(executor.handle(&body).await.is_ok());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let call = &seen[0];
    assert_eq!(call.method, Method::POST);
    assert_eq!(call.content_type, CONTENT_TYPE_JSON);

    let secret = decode_secret(SECRET_HEX).unwrap();
    assert!(verify_signature(&secret, &call.body, &call.signature));

    let delivered: DataChangeMessage = serde_json::from_slice(&call.body).unwrap();
    assert_eq!(delivered, request().payload);
}

#[tokio::test]
async fn reports_delivery_and_rejection_status() {
    let (ok_url, _) = start(StatusCode::ACCEPTED).await;
    let (executor, _) = executor_for(&ok_url, CONTENT_TYPE_JSON);
    assert_eq!(
        executor.execute(&request()).await.unwrap(),
        WebhookOutcome::Delivered { status: 202 }
    );

    let (bad_url, _) = start(StatusCode::NOT_FOUND).await;
    let (executor, _) = executor_for(&bad_url, CONTENT_TYPE_JSON);
    assert_eq!(
        executor.execute(&request()).await.unwrap(),
        WebhookOutcome::Rejected { status: 404 }
    );
}

#[tokio::test]
async fn xml_webhooks_receive_signed_xml() {
    let (url, seen) = start(StatusCode::OK).await;
    let (executor, _) = executor_for(&url, CONTENT_TYPE_XML);

    executor.execute(&request()).await.unwrap();

    let seen = seen.lock().unwrap();
    let body = String::from_utf8(seen[0].body.clone()).unwrap();
    assert!(body.starts_with("<DataChangeMessage>"));
    assert_eq!(seen[0].content_type, CONTENT_TYPE_XML);

    let secret = decode_secret(SECRET_HEX).unwrap();
    assert!(verify_signature(&secret, &seen[0].body, &seen[0].signature));
}

#[tokio::test]
async fn xml_webhooks_carry_free_form_context_keys() {
    let (url, seen) = start(StatusCode::OK).await;
    let (executor, _) = executor_for(&url, CONTENT_TYPE_XML);

    let mut req = request();
    req.payload
        .context
        .insert("request id".into(), serde_json::json!("abc-123"));
    assert_eq!(
        executor.execute(&req).await.unwrap(),
        WebhookOutcome::Delivered { status: 200 }
    );

    let seen = seen.lock().unwrap();
    let body = String::from_utf8(seen[0].body.clone()).unwrap();
    assert!(body.contains(r#"<entry key="request id">abc-123</entry>"#));
}

#[tokio::test]
async fn unrecognized_content_type_sends_empty_signed_body() {
    let (url, seen) = start(StatusCode::OK).await;
    let (executor, _) = executor_for(&url, "text/csv");

    executor.execute(&request()).await.unwrap();

    let seen = seen.lock().unwrap();
    assert!(seen[0].body.is_empty());
    let secret = decode_secret(SECRET_HEX).unwrap();
    assert!(verify_signature(&secret, b"", &seen[0].signature));
}

#[tokio::test]
async fn unreachable_endpoint_is_swallowed() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (executor, _) = executor_for(&format!("http://{addr}/"), CONTENT_TYPE_JSON);
    assert_eq!(executor.execute(&request()).await.unwrap(), WebhookOutcome::TransportFailed);
}

#[tokio::test]
async fn missing_webhook_is_acknowledged_without_a_call() {
    let (url, seen) = start(StatusCode::OK).await;
    let (executor, _) = executor_for(&url, CONTENT_TYPE_JSON);

    let mut req = request();
    req.webhook_id = "gone".into();
    assert_eq!(executor.execute(&req).await.unwrap(), WebhookOutcome::WebhookMissing);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_method_is_acknowledged_without_a_call() {
    let (url, seen) = start(StatusCode::OK).await;
    let data = Arc::new(FakeDataManager::new());
    data.add_household(household("H1"), &[]);
    let mut hook = webhook("W1", "H1", &url, CONTENT_TYPE_JSON);
    hook.method = "NOT A METHOD".into();
    data.subscribe(EventType::RecipeCreated, hook);

    let executor = WebhookExecutor::new(data);
    assert_eq!(executor.execute(&request()).await.unwrap(), WebhookOutcome::InvalidMethod);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_household_is_redelivered() {
    let data = Arc::new(FakeDataManager::new());
    let executor = WebhookExecutor::new(data);

    assert_matches!(executor.execute(&request()).await, Err(WebhookError::Household(_)));
    let body = serde_json::to_vec(&request()).unwrap();
    assert!(executor.handle(&body).await.is_err());
}

#[tokio::test]
async fn malformed_secret_is_redelivered() {
    let (url, seen) = start(StatusCode::OK).await;
    let (executor, data) = executor_for(&url, CONTENT_TYPE_JSON);
    data.households
        .lock()
        .unwrap()
        .get_mut("H1")
        .unwrap()
        .webhook_hmac_secret = "not-hex".into();

    assert_matches!(executor.execute(&request()).await, Err(WebhookError::Secret(_)));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_secret_wins_over_invalid_method() {
    let (url, seen) = start(StatusCode::OK).await;
    let data = Arc::new(FakeDataManager::new());
    let mut home = household("H1");
    home.webhook_hmac_secret = "not-hex".into();
    data.add_household(home, &[]);
    let mut hook = webhook("W1", "H1", &url, CONTENT_TYPE_JSON);
    hook.method = "NOT A METHOD".into();
    data.subscribe(EventType::RecipeCreated, hook);

    let executor = WebhookExecutor::new(data);
    assert_matches!(executor.execute(&request()).await, Err(WebhookError::Secret(_)));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn undecodable_request_is_rejected() {
    let (executor, _) = executor_for("http://127.0.0.1:1/", CONTENT_TYPE_JSON);
    assert!(executor.handle(b"{").await.is_err());
}
