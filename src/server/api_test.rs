use anyhow::Result;
use axum::body::Body;
use axum::http::{ header, Method, Request, StatusCode };
use axum::Router;
use serde_json::{ json, Value };
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use super::{ create_router, AppState };
use crate::error::{ GatewayError, INTERNAL_ERROR_MESSAGE, UPSTREAM_ERROR_MESSAGE };
use crate::forwarder::{ CompletionForwarder, DEFAULT_TEMPERATURE };
use crate::llm::chat::openai::OpenAIChatClient;
use crate::llm::LlmType;
use crate::models::conversation::ConversationSet;
use crate::store::{ ConversationStore, MemoryConversationStore };

const UNREACHABLE_UPSTREAM: &str = "http://127.0.0.1:9";

fn app_with_store(upstream_url: &str, store: Arc<dyn ConversationStore>) -> Router {
    let client = OpenAIChatClient::new(
        LlmType::OpenAI,
        Some("abc".to_string()),
        "gpt-4o-mini".to_string(),
        Some(upstream_url.to_string()),
    ).unwrap();
    let forwarder = CompletionForwarder::new(Arc::new(client), DEFAULT_TEMPERATURE, Some(Duration::from_secs(5)));

    create_router(AppState {
        forwarder: Arc::new(forwarder),
        store,
    })
}

fn app(upstream_url: &str) -> Router {
    app_with_store(upstream_url, Arc::new(MemoryConversationStore::default()))
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()));
    Ok((status, body))
}

struct PanickingStore;

impl ConversationStore for PanickingStore {
    fn get(&self, _user_id: &str) -> Result<ConversationSet, GatewayError> {
        panic!("store blew up");
    }

    fn sync(&self, _user_id: &str, _conversations: Value) -> Result<ConversationSet, GatewayError> {
        panic!("store blew up");
    }

    fn delete(&self, _user_id: &str) -> Result<(), GatewayError> {
        panic!("store blew up");
    }
}

#[tokio::test]
async fn it_reports_health() -> Result<()> {
    let app = app(UNREACHABLE_UPSTREAM);

    let (status, body) = send(&app, empty_request(Method::GET, "/")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "coach-proxy");

    let (status, body) = send(&app, empty_request(Method::GET, "/healthz")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("OK"));
    Ok(())
}

#[tokio::test]
async fn it_relays_a_chat_turn() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_body(mockito::Matcher::PartialJson(json!({
            "temperature": 0.6,
            "messages": [{ "role": "user", "content": "hi" }]
        })))
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Hey, ready to train?"}}]}"#)
        .create_async().await;

    let app = app(&server.url());
    let (status, body) = send(
        &app,
        json_request(Method::POST, "/chat", json!({"messages": [{"role": "user", "content": "hi"}]}))
    ).await?;
    mock.assert_async().await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"content": "Hey, ready to train?"}));
    Ok(())
}

#[tokio::test]
async fn it_rejects_chat_without_messages() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("POST", mockito::Matcher::Any).expect(0).create_async().await;
    let app = app(&server.url());

    let (status, body) = send(&app, json_request(Method::POST, "/chat", json!({"messages": []}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "messages[] is required"}));

    let (status, body) = send(&app, json_request(Method::POST, "/chat", json!({"messages": "hi"}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap_or_default().starts_with("Invalid JSON body"));

    let (status, body) = send(&app, empty_request(Method::POST, "/chat")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn it_maps_upstream_failures_to_a_500() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(429)
        .with_body(r#"{"error":{"message":"Rate limit reached"}}"#)
        .create_async().await;

    let app = app(&server.url());
    let (status, body) = send(
        &app,
        json_request(Method::POST, "/chat", json!({"messages": [{"role": "user", "content": "hi"}]}))
    ).await?;
    mock.assert_async().await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], UPSTREAM_ERROR_MESSAGE);
    assert_eq!(body["details"], json!({"error": {"message": "Rate limit reached"}}));
    Ok(())
}

#[tokio::test]
async fn it_maps_unreachable_upstreams_to_a_500() -> Result<()> {
    let app = app(UNREACHABLE_UPSTREAM);
    let (status, body) = send(
        &app,
        json_request(Method::POST, "/chat", json!({"messages": [{"role": "user", "content": "hi"}]}))
    ).await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], UPSTREAM_ERROR_MESSAGE);
    let details = body["details"].as_str().unwrap_or_default();
    assert!(details.starts_with("Request to http://127.0.0.1:9/v1/chat/completions failed"));
    Ok(())
}

#[tokio::test]
async fn it_syncs_and_reads_back_conversations() -> Result<()> {
    let app = app(UNREACHABLE_UPSTREAM);

    let (status, body) = send(&app, empty_request(Method::GET, "/conversations?userId=u1")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"conversations": []}));

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/conversations/sync",
            json!({"userId": "u1", "conversations": [{"id": 1, "title": "A"}]})
        )
    ).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"conversations": [{"id": 1, "title": "A"}]}));

    let (_, body) = send(&app, empty_request(Method::GET, "/conversations?userId=u1")).await?;
    assert_eq!(body, json!({"conversations": [{"id": 1, "title": "A"}]}));

    send(
        &app,
        json_request(Method::POST, "/conversations/sync", json!({"userId": "u1", "conversations": []}))
    ).await?;
    let (_, body) = send(&app, empty_request(Method::GET, "/conversations?userId=u1")).await?;
    assert_eq!(body, json!({"conversations": []}));
    Ok(())
}

#[tokio::test]
async fn it_rejects_bad_conversation_requests() -> Result<()> {
    let app = app(UNREACHABLE_UPSTREAM);

    let (status, body) = send(&app, empty_request(Method::GET, "/conversations")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "userId query param is required"}));

    for payload in [
        json!({"conversations": []}),
        json!({"userId": "", "conversations": []}),
        json!({"userId": "u1", "conversations": {"id": 1}}),
        json!({"userId": "u1"}),
    ] {
        let (status, body) = send(&app, json_request(Method::POST, "/conversations/sync", payload)).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid payload: { userId, conversations[] } required"}));
    }

    let (_, body) = send(&app, empty_request(Method::GET, "/conversations?userId=u1")).await?;
    assert_eq!(body, json!({"conversations": []}));
    Ok(())
}

#[tokio::test]
async fn it_deletes_accounts() -> Result<()> {
    let app = app(UNREACHABLE_UPSTREAM);
    send(
        &app,
        json_request(Method::POST, "/conversations/sync", json!({"userId": "u1", "conversations": [{"id": 1}]}))
    ).await?;

    let (status, body) = send(&app, empty_request(Method::DELETE, "/account?userId=u1")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (_, body) = send(&app, empty_request(Method::GET, "/conversations?userId=u1")).await?;
    assert_eq!(body, json!({"conversations": []}));

    let (status, _) = send(&app, empty_request(Method::DELETE, "/account?userId=ghost")).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, empty_request(Method::DELETE, "/account")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "userId query param is required"}));
    Ok(())
}

#[tokio::test]
async fn it_turns_handler_panics_into_internal_faults() -> Result<()> {
    let app = app_with_store(UNREACHABLE_UPSTREAM, Arc::new(PanickingStore));

    let (status, body) = send(&app, empty_request(Method::GET, "/conversations?userId=u1")).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": INTERNAL_ERROR_MESSAGE}));

    // the router keeps serving afterwards
    let (status, _) = send(&app, empty_request(Method::GET, "/healthz")).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn it_allows_cross_origin_requests() -> Result<()> {
    let app = app(UNREACHABLE_UPSTREAM);
    let request = Request::builder()
        .method(Method::GET)
        .uri("/")
        .header(header::ORIGIN, "https://coach.example")
        .body(Body::empty())?;

    let response = app.oneshot(request).await?;
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).and_then(|v| v.to_str().ok()),
        Some("*")
    );
    Ok(())
}
