//! WebSocket listener accepting the browser dispatcher.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::endpoint::RelayEndpoint;

/// Create the router: status on `/health`, WebSocket upgrade on any other path.
pub fn create_router(relay: Arc<RelayEndpoint>) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/health", get(health_check))
        .fallback(ws_handler)
        .with_state(relay)
}

/// Bound relay listener.
pub struct RelayServer {
    listener: TcpListener,
    relay: Arc<RelayEndpoint>,
}

impl RelayServer {
    /// Bind to the address from the relay configuration.
    pub async fn bind(relay: Arc<RelayEndpoint>) -> std::io::Result<Self> {
        let addr = relay.config().address();
        let listener = TcpListener::bind(&addr).await?;
        Ok(Self { listener, relay })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until the listener fails.
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.local_addr()?;
        info!("Relay listening on ws://{}", addr);
        axum::serve(self.listener, create_router(self.relay)).await
    }

    /// Serve on a background task.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run().await {
                error!("Relay server error: {}", e);
            }
        })
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(relay): State<Arc<RelayEndpoint>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, relay))
}

async fn health_check(State(relay): State<Arc<RelayEndpoint>>) -> impl IntoResponse {
    Json(relay.status())
}

/// Pump one dispatcher connection until it closes or is superseded.
async fn handle_socket(socket: WebSocket, relay: Arc<RelayEndpoint>) {
    let (session, mut outbound_rx) = relay.open_session();
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            _ = session.closed() => {
                debug!(generation = session.generation(), "Closing superseded connection");
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }

            Some(frame) = outbound_rx.recv() => {
                if let Err(e) = ws_tx.send(Message::Text(frame.into())).await {
                    warn!(generation = session.generation(), "Failed to send command: {}", e);
                    break;
                }
            }

            result = ws_rx.next() => {
                match result {
                    Some(Ok(Message::Text(text))) => relay.route_frame(&session, text.as_str()),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(generation = session.generation(), "WebSocket error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    relay.detach(&session);
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
