//! WebSocket Handler - 诊所房间实时通知
//!
//! 连接: GET /ws/clinics/:clinic_id?token=<access token>
//! 鉴权失败在升级前返回 401/403

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::application::Actor;
use crate::domain::Permission;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::extractors::{ApiPath, ApiQuery};
use crate::infrastructure::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: Option<String>,
}

/// 诊所 WebSocket 连接处理
pub async fn clinic_websocket_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(clinic_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<WsAuthQuery>,
    ws: Option<WebSocketUpgrade>,
) -> Result<Response, ApiError> {
    let token = query
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Missing token".to_string()))?;

    let claims = state
        .tokens
        .verify_access(token.trim())
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let actor = Actor::new(claims.user_id, clinic_id);
    state
        .policy
        .authorize(&actor, Permission::ViewClinic)
        .await?;

    let ws = ws.ok_or_else(|| {
        ApiError::BadRequest("Expected a WebSocket upgrade request".to_string())
    })?;

    Ok(ws
        .on_upgrade(move |socket| handle_clinic_socket(socket, actor, state))
        .into_response())
}

async fn handle_clinic_socket(socket: WebSocket, actor: Actor, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let clinic_id = actor.clinic_id;
    let user_id = actor.user_id;

    let mut event_rx = state.publisher.subscribe_clinic(clinic_id);
    // 客户端心跳的应答由转发任务统一发送
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Message>();

    tracing::info!(clinic_id = %clinic_id, user_id = %user_id, "WebSocket connected");

    // 事件转发任务
    let mut forward_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                event = event_rx.recv() => match event {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(json) => Message::Text(json),
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize event");
                            continue;
                        }
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(clinic_id = %clinic_id, skipped, "WebSocket client lagging, events dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(reply) => reply,
                    None => break,
                },
            };

            if let Err(e) = sender.send(msg).await {
                tracing::debug!(clinic_id = %clinic_id, error = %e, "Failed to send WebSocket message");
                break;
            }
        }
    });

    // 接收客户端消息（心跳）
    let mut receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) if text.trim().eq_ignore_ascii_case("ping") => {
                    if reply_tx.send(Message::Text("pong".to_string())).is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(clinic_id = %clinic_id, "WebSocket closed by client");
                    break;
                }
                Err(e) => {
                    tracing::debug!(clinic_id = %clinic_id, error = %e, "WebSocket error");
                    break;
                }
                // Ping 帧由 axum 自动应答
                _ => {}
            }
        }
    });

    // 等待任一任务完成
    tokio::select! {
        _ = &mut forward_task => receive_task.abort(),
        _ = &mut receive_task => forward_task.abort(),
    }

    tracing::info!(clinic_id = %clinic_id, user_id = %user_id, "WebSocket disconnected");
}
