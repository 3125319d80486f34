#[cfg(test)]
#[path = "api_test.rs"]
mod tests;

use crate::error::GatewayError;
use crate::forwarder::{ ChatRequest, ChatResponse, CompletionForwarder };
use crate::models::conversation::ConversationSet;
use crate::store::ConversationStore;
use std::any::Any;
use std::sync::Arc;
use axum::{
    routing::{ get, post, delete },
    Router,
    Json,
    extract::{ State, Query, rejection::{ JsonRejection, QueryRejection } },
    response::{ IntoResponse, Response },
};
use serde::{ Deserialize, Serialize };
use serde_json::{ json, Value };
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{ Any as AnyOrigin, CorsLayer };

pub const SERVICE_NAME: &str = "coach-proxy";

#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<CompletionForwarder>,
    pub store: Arc<dyn ConversationStore>,
}

#[derive(Deserialize)]
pub struct UserQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub conversations: Option<Value>,
}

#[derive(Serialize)]
struct ConversationsResponse {
    conversations: ConversationSet,
}

#[derive(Serialize)]
struct DeleteAccountResponse {
    success: bool,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        .route("/", get(root_handler))
        .route("/healthz", get(healthz_handler))
        .route("/chat", post(chat_handler))
        .route("/conversations", get(get_conversations_handler))
        .route("/conversations/sync", post(sync_conversations_handler))
        .route("/account", delete(delete_account_handler))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .with_state(state)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    GatewayError::Internal(format!("handler panicked: {}", detail)).into_response()
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn healthz_handler() -> &'static str {
    "OK"
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, GatewayError> {
    let Json(request) = payload?;
    let content = state.forwarder.complete(request).await?;
    Ok(Json(ChatResponse { content }))
}

async fn get_conversations_handler(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<ConversationsResponse>, GatewayError> {
    let Query(query) = query?;
    let conversations = state.store.get(query.user_id.as_deref().unwrap_or_default())?;
    Ok(Json(ConversationsResponse { conversations }))
}

async fn sync_conversations_handler(
    State(state): State<AppState>,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Json<ConversationsResponse>, GatewayError> {
    let Json(request) = payload?;
    let conversations = state.store.sync(
        request.user_id.as_deref().unwrap_or_default(),
        request.conversations.unwrap_or(Value::Null),
    )?;
    Ok(Json(ConversationsResponse { conversations }))
}

async fn delete_account_handler(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<DeleteAccountResponse>, GatewayError> {
    let Query(query) = query?;
    state.store.delete(query.user_id.as_deref().unwrap_or_default())?;
    Ok(Json(DeleteAccountResponse { success: true }))
}
