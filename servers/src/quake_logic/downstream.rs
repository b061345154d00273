use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::broadcast;

use lib_common::core::{FeedState, RequestHandler, ServerMessage};

use crate::quake_logic::config::Config;

const BANNER: &str = "Earthquake WebSocket Server";
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub fn router(state: FeedState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

pub async fn run(config: Config, state: FeedState, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port()));

    if let Some((cert_path, key_path)) = config.tls_paths() {
        let tls_config = RustlsConfig::from_pem_file(&cert_path, &key_path)
            .await
            .with_context(|| format!("Failed to load TLS configuration from {}", cert_path.display()))?;

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown.recv().await.ok();
            log::info!("Downstream server shutting down.");
            shutdown_handle.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        log::info!("Downstream server listening on wss://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(app.into_make_service())
            .await
            .context("TLS server failed")?;
    } else {
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        log::info!("Downstream server listening on ws://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.recv().await.ok();
                log::info!("Downstream server shutting down.");
            })
            .await
            .context("Server failed")?;
    }

    Ok(())
}

// Plain GETs without an upgrade get the banner instead of a 400.
async fn ws_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<FeedState>,
) -> Response {
    match ws {
        Ok(ws) => ws.on_upgrade(|socket| handle_socket(socket, state)),
        Err(_) => BANNER.into_response(),
    }
}

async fn health_handler() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "OK")
}

async fn handle_socket(socket: WebSocket, state: FeedState) {
    let (mut sender, mut receiver) = socket.split();
    let (client_id, mut outbound) = state.dispatcher().register();
    log::info!(
        "Client {} connected ({} connected)",
        client_id,
        state.dispatcher().client_count()
    );

    // Queued ahead of anything else, so it is always the first frame.
    let _ = state.dispatcher().send_to(client_id, ServerMessage::welcome());
    let handler = RequestHandler::new(state.clone());

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => text,
                        Err(_) => {
                            log::warn!("Client {} sent a non-UTF-8 binary frame; ignoring", client_id);
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        log::warn!("Client {} socket error: {}", client_id, e);
                        break;
                    }
                };
                // A slow upstream fetch must not stall this connection's broadcasts.
                let handler = handler.clone();
                tokio::spawn(async move { handler.handle_text(client_id, &text).await });
            }
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                match frame.to_json() {
                    Ok(json) => {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => log::error!("Failed to serialize frame for client {}: {}", client_id, e),
                }
            }
        }
    }

    state.dispatcher().unregister(client_id);
    log::info!(
        "Client {} disconnected ({} connected)",
        client_id,
        state.dispatcher().client_count()
    );
}
