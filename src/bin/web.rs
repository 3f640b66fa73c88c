//! chatform Web API
//!
//! 对外暴露 REST 接口，前端轮询式对话：
//! - `POST /api/chat/message` 发送消息，返回回复与表单标记
//! - `POST /api/chat/form/submit` 提交表单数据（回显确认）
//! - `GET /api/chat/history/:session_id` 会话历史
//! - `DELETE /api/chat/session/:session_id` 清除会话
//!
//! 运行方式：
//! ```bash
//! cargo run --bin chatform-web --features web
//! ```

#![cfg(feature = "web")]

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::Html;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use chatform::config::load_config;
use chatform::{build_engine, ChatReply, DialogueEngine};

/// 入站消息体
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatMessage {
    message: String,
    session_id: Option<String>,
}

struct AppState {
    engine: DialogueEngine,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chatform::observability::init();

    let config = load_config(None).unwrap_or_default();
    let session_timeout = Duration::from_secs(config.app.session_timeout_secs);
    let state = Arc::new(AppState {
        engine: build_engine(&config),
    });

    // 后台过期会话清理
    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(session_timeout.max(Duration::from_secs(60)));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweeper.engine.cleanup_expired(session_timeout).await;
        }
    });

    let app = Router::new()
        .route("/", get(index))
        .route("/api/chat/message", post(send_message))
        .route("/api/chat/form/submit", post(submit_form))
        .route("/api/chat/history/:session_id", get(history))
        .route("/api/chat/session/:session_id", delete(clear_session))
        .with_state(state);

    let bind_addr =
        std::env::var("CHATFORM_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    tracing::info!("chatform-web listening on http://{bind_addr}");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(
        "<h1>chatform</h1>\
         <p>POST /api/chat/message {\"message\": \"我要订酒店\", \"sessionId\": \"s1\"}</p>",
    )
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatMessage>,
) -> Json<ChatReply> {
    let reply = state
        .engine
        .handle_message(body.session_id.as_deref(), &body.message)
        .await;
    Json(reply)
}

/// 表单提交只做回显确认，数据收集由上游系统消费
async fn submit_form(Json(data): Json<Value>) -> Json<Value> {
    tracing::info!("收到表单提交");
    Json(json!({
        "success": true,
        "message": "表单提交成功！",
        "data": data,
    }))
}

async fn history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<Vec<String>> {
    Json(state.engine.history(Some(&session_id)).await)
}

async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<Value> {
    state.engine.clear_session(Some(&session_id)).await;
    Json(json!({ "success": true, "message": "会话已清除" }))
}
