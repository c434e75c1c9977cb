//! WebSocket transport for live recognition
//!
//! Thin glue between the socket and the session engine: text frames parse
//! into protocol messages, binary frames into little-endian f32 mono PCM,
//! and server messages serialize back as JSON text. The socket closes right
//! after the terminal message.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use earmark_common::messages::ClientMessage;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::server::AppContext;
use crate::recognize::{run_session, SessionInput};

/// Upgrade handler for `GET /api/recognize/live`.
pub async fn recognize_live(State(ctx): State<AppContext>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn handle_socket(mut socket: WebSocket, ctx: AppContext) {
    let (in_tx, in_rx) = mpsc::channel::<SessionInput>(64);
    let (out_tx, mut out_rx) = mpsc::channel(32);

    tokio::spawn(run_session(
        Arc::clone(&ctx.engine),
        ctx.session_params,
        in_rx,
        out_tx,
    ));

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Config { sample_rate }) => {
                                if in_tx.send(SessionInput::Config { sample_rate }).await.is_err() {
                                    break;
                                }
                            }
                            Ok(ClientMessage::Stop) => {
                                let _ = in_tx.send(SessionInput::Stop).await;
                                break;
                            }
                            Err(e) => {
                                warn!("unparseable client frame: {e}");
                            }
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        let samples: Vec<f32> = bytes
                            .chunks_exact(4)
                            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                            .collect();
                        if in_tx.send(SessionInput::Pcm(samples)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                        debug!("websocket closed by client");
                        break;
                    }
                    Some(Ok(_)) => {} // ping/pong handled by axum
                }
            }

            outgoing = out_rx.recv() => {
                match outgoing {
                    Some(message) => {
                        let terminal = message.is_terminal();
                        let json = match serde_json::to_string(&message) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!("failed to serialize server message: {e}");
                                break;
                            }
                        };
                        if socket.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                        if terminal {
                            // terminal is always the last message
                            let _ = socket.send(Message::Close(None)).await;
                            break;
                        }
                    }
                    None => break, // session ended silently
                }
            }
        }
    }

    // dropping in_tx ends the session task if it is still running
}
