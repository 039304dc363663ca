//! WebSocket endpoint and the LISTEN/NOTIFY → hub bridge.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use sqlx::postgres::PgListener;
use sqlx::PgPool;

use crate::api::AppState;
use crate::hub::Hub;
use sentistream_core::NOTIFY_CHANNEL;

/// The confirmation message sent to every subscriber on connect, before any
/// broadcast traffic.
#[must_use]
pub fn connected_message(now: DateTime<Utc>) -> String {
    serde_json::json!({
        "type": "connected",
        "message": "Connected to sentiment stream",
        "timestamp": now.to_rfc3339(),
    })
    .to_string()
}

/// `GET /ws/sentiment` — upgrade and attach to the hub.
pub async fn ws_sentiment(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let hub = Arc::clone(&state.hub);
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: Arc<Hub>) {
    let (mut sink, mut source) = socket.split();

    if sink
        .send(Message::Text(connected_message(Utc::now()).into()))
        .await
        .is_err()
    {
        return;
    }

    let (id, mut rx) = hub.subscribe();
    tracing::info!(subscriber_id = id, total = hub.subscriber_count(), "websocket connected");

    // Forward the hub queue to the socket until either side dies.
    let forward = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(Message::Text(message.into())).await.is_err() {
                break;
            }
        }
    });

    // Client payloads are not interpreted; this loop exists only to notice
    // the disconnect.
    while let Some(received) = source.next().await {
        match received {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    hub.unsubscribe(id);
    forward.abort();
    tracing::info!(subscriber_id = id, total = hub.subscriber_count(), "websocket disconnected");
}

/// Listen on the fan-out channel and forward every notification payload to
/// the hub. Runs until the task is aborted; transient listener errors are
/// logged and retried after a short backoff.
pub async fn run_notification_listener(pool: PgPool, hub: Arc<Hub>) {
    loop {
        let mut listener = match PgListener::connect_with(&pool).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, "failed to open notification listener; retrying");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };
        if let Err(e) = listener.listen(NOTIFY_CHANNEL).await {
            tracing::error!(error = %e, "failed to LISTEN on fan-out channel; retrying");
            tokio::time::sleep(Duration::from_secs(5)).await;
            continue;
        }
        tracing::info!(channel = NOTIFY_CHANNEL, "notification listener attached");

        loop {
            match listener.recv().await {
                Ok(notification) => {
                    hub.broadcast(notification.payload());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "notification listener dropped; reconnecting");
                    break;
                }
            }
        }
    }
}
