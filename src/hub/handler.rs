//! WebSocket upgrade and per-connection lifecycle for the streaming hub
//! (§4.F), the browser-facing half of the quote fan-out pipeline.
//! Structured the same way the gateway codebase's `ws_handler` is: split
//! the socket, a send task fed by an mpsc channel, a recv task parsing
//! client frames, `select!` between them, clean up on exit.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use super::connection::Hub;
use super::messages::{ClientFrame, ServerFrame};

/// How long the hub waits for *any* frame from a socket before closing it
/// (§4.F "Heartbeat": idle sockets are closed on a configurable interval).
const HEARTBEAT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Arc<Hub>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: Arc<Hub>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    let client_id = hub.register(tx.clone());
    let _ = tx.send(ServerFrame::Connected { client_id });

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&frame)
                && sender.send(Message::Text(json.into())).await.is_err()
            {
                break;
            }
        }
    });

    let hub_for_recv = hub.clone();
    let tx_for_recv = tx.clone();
    let mut recv_task = tokio::spawn(async move {
        loop {
            let msg = match tokio::time::timeout(HEARTBEAT_IDLE_TIMEOUT, receiver.next()).await {
                Ok(Some(Ok(msg))) => msg,
                Ok(Some(Err(_))) | Ok(None) => break,
                Err(_elapsed) => {
                    tracing::debug!(client_id, "closing idle streaming socket");
                    break;
                }
            };
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(ClientFrame::Subscribe { symbol, simulation }) => {
                        match hub_for_recv.subscribe(client_id, symbol.clone(), simulation).await {
                            Ok(()) => {
                                let _ = tx_for_recv.send(ServerFrame::Subscribed { symbol });
                            }
                            Err(message) => {
                                let _ = tx_for_recv.send(ServerFrame::Error { symbol: Some(symbol), message });
                            }
                        }
                    }
                    Ok(ClientFrame::Unsubscribe { symbol, simulation }) => {
                        match hub_for_recv.unsubscribe(client_id, symbol.clone(), simulation).await {
                            Ok(()) => {
                                let _ = tx_for_recv.send(ServerFrame::Unsubscribed { symbol });
                            }
                            Err(message) => {
                                let _ = tx_for_recv.send(ServerFrame::Error { symbol: Some(symbol), message });
                            }
                        }
                    }
                    Ok(ClientFrame::Ping) => {
                        let _ = tx_for_recv.send(ServerFrame::Pong);
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "dropping unparseable client frame");
                        let _ = tx_for_recv.send(ServerFrame::Error { symbol: None, message: e.to_string() });
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    hub.remove(client_id);
}
