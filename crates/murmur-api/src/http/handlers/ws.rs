//! WebSocket transport for the realtime chat.
//!
//! `GET /ws` (and `GET /`) checks the `session_id` cookie before upgrading;
//! an invalid session gets a plain 401 and no socket is ever opened.
//!
//! Each upgraded socket is split in two:
//!
//! - **Writer task:** drains the connection's outbound queue (history
//!   replay, broadcasts, inline notices) into the sink.
//! - **Reader loop:** feeds every text frame to the lifecycle controller as
//!   a new chat message, until the client goes away or the connection is
//!   closed server-side (eviction or shutdown).

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use murmur_core::chat::{AuthenticatedConnection, OpenConnection};
use murmur_types::message::ErrorFrame;

use crate::http::error::{AppError, INVALID_SESSION};
use crate::http::handlers::auth::SESSION_COOKIE;
use crate::state::{AppState, ChatHub};

type WsSink = SplitSink<WebSocket, Message>;

/// Upgrade an authenticated HTTP request to a chat WebSocket.
pub async fn ws_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let session_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_owned());
    let authenticated = match state.hub.authenticate(session_id.as_deref()).await {
        Ok(authenticated) => authenticated,
        Err(_) => return AppError::Unauthorized(INVALID_SESSION).into_response(),
    };

    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let hub = Arc::clone(&state.hub);
    let shutdown = state.shutdown.clone();
    ws.max_message_size(state.config.max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, hub, authenticated, shutdown))
}

async fn handle_socket(
    socket: WebSocket,
    hub: Arc<ChatHub>,
    authenticated: AuthenticatedConnection,
    shutdown: CancellationToken,
) {
    let mut conn = hub.open(authenticated).await;
    let Some(outbound) = conn.take_outbound() else {
        hub.close(&mut conn).await;
        return;
    };

    let (sink, mut stream) = socket.split();
    let closed = conn.close_signal();
    let writer = tokio::spawn(write_outbound(sink, outbound, closed.clone()));

    let mut client_left = false;
    loop {
        tokio::select! {
            _ = closed.cancelled() => break,
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => receive(&hub, &conn, text.as_str()).await,
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => receive(&hub, &conn, text).await,
                    Err(_) => {
                        if let Err(err) = conn.notify(ErrorFrame::INVALID_UTF8) {
                            tracing::debug!(
                                conn_id = %conn.id(),
                                error = %err,
                                "utf-8 notice not delivered"
                            );
                        }
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    client_left = true;
                    break;
                }
                Some(Err(err)) => {
                    tracing::debug!(conn_id = %conn.id(), error = %err, "websocket receive error");
                    client_left = true;
                    break;
                }
                // Ping/pong are answered by the protocol layer.
                Some(Ok(_)) => {}
            }
        }
    }

    let server_initiated = !client_left;
    hub.close(&mut conn).await;

    let Ok(Some(mut sink)) = writer.await else {
        return;
    };
    if server_initiated {
        let frame = if shutdown.is_cancelled() {
            CloseFrame {
                code: close_code::AWAY,
                reason: "Server shutting down".into(),
            }
        } else {
            CloseFrame {
                code: close_code::POLICY,
                reason: "Outbound queue overflow".into(),
            }
        };
        if let Err(err) = sink.send(Message::Close(Some(frame))).await {
            tracing::debug!(conn_id = %conn.id(), error = %err, "close frame not delivered");
        }
    }
}

async fn receive(hub: &ChatHub, conn: &OpenConnection, body: &str) {
    // Failures are logged and reported to the sender by the controller.
    if let Err(err) = hub.handle_inbound(conn, body).await {
        tracing::debug!(conn_id = %conn.id(), error = %err, "inbound message dropped");
    }
}

/// Forward queued frames to the socket until the connection is closed.
///
/// Returns the sink for a final close frame, or `None` if the socket broke.
async fn write_outbound(
    mut sink: WsSink,
    mut outbound: mpsc::Receiver<Arc<String>>,
    closed: CancellationToken,
) -> Option<WsSink> {
    loop {
        tokio::select! {
            biased;
            _ = closed.cancelled() => return Some(sink),
            payload = outbound.recv() => {
                let payload = payload?;
                if let Err(err) = sink.send(Message::Text(payload.as_str().into())).await {
                    tracing::debug!(error = %err, "websocket send failed");
                    return None;
                }
            }
        }
    }
}
