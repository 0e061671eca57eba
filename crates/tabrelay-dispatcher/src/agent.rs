//! Connection loop keeping the dispatcher attached to the relay.
//!
//! The agent connects to the relay's WebSocket, executes every inbound command
//! on its own task and sends a heartbeat at a fixed interval. When the
//! connection drops it waits for the reconnect delay and tries again until it
//! is stopped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tabrelay_config::DispatcherConfig;
use tabrelay_protocols::InboundFrame;

use crate::executor::CommandExecutor;
use crate::runtime::BrowserRuntime;

type RelaySocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Capacity of the queue of encoded responses awaiting the socket.
const REPLY_QUEUE: usize = 64;

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closed {
    Stopped,
    Lost,
}

/// Browser-side relay client.
pub struct BrowserAgent {
    config: DispatcherConfig,
    executor: Arc<CommandExecutor>,
    cancel: CancellationToken,
    connected: Arc<AtomicBool>,
    reply_tx: mpsc::Sender<String>,
    reply_rx: mpsc::Receiver<String>,
}

/// Handle to a running [`BrowserAgent`].
pub struct AgentHandle {
    cancel: CancellationToken,
    connected: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl AgentHandle {
    /// Whether the agent currently holds an open relay connection.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Stop the agent: no further reconnects, the socket is closed with a
    /// close frame, and the loop task is joined.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!("Dispatcher task ended abnormally: {}", e);
        }
    }

    /// Wait for the agent loop to end on its own.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

impl BrowserAgent {
    /// Spawn the agent loop.
    pub fn start(config: DispatcherConfig, runtime: Arc<dyn BrowserRuntime>) -> AgentHandle {
        let cancel = CancellationToken::new();
        let connected = Arc::new(AtomicBool::new(false));
        let (reply_tx, reply_rx) = mpsc::channel(REPLY_QUEUE);

        let agent = Self {
            config,
            executor: Arc::new(CommandExecutor::new(runtime)),
            cancel: cancel.clone(),
            connected: connected.clone(),
            reply_tx,
            reply_rx,
        };
        let task = tokio::spawn(agent.run());

        AgentHandle {
            cancel,
            connected,
            task,
        }
    }

    async fn run(mut self) {
        let url = self.config.relay_url.clone();
        // `interval` panics on a zero period.
        let period = self.config.heartbeat_interval().max(Duration::from_millis(1));
        let mut heartbeat = tokio::time::interval(period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        heartbeat.tick().await;

        loop {
            let attempt = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = tokio_tungstenite::connect_async(url.as_str()) => result,
            };

            match attempt {
                Ok((socket, _)) => {
                    info!("Connected to relay at {}", url);
                    self.connected.store(true, Ordering::SeqCst);
                    let closed = self.serve(socket, &mut heartbeat).await;
                    self.connected.store(false, Ordering::SeqCst);
                    if closed == Closed::Stopped {
                        break;
                    }
                    info!("Disconnected from relay");
                }
                Err(e) => {
                    debug!("Relay connection to {} failed: {}", url, e);
                }
            }

            let delay = self.config.reconnect_delay();
            info!("Retrying in {}ms...", delay.as_millis());
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("Dispatcher stopped");
    }

    /// Pump one relay connection until it closes or the agent is stopped.
    async fn serve(&mut self, socket: RelaySocket, heartbeat: &mut Interval) -> Closed {
        let (mut ws_tx, mut ws_rx) = socket.split();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("Closing relay connection");
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return Closed::Stopped;
                }

                _ = heartbeat.tick() => {
                    if let Err(e) = ws_tx.send(Message::Text(InboundFrame::heartbeat().into())).await {
                        warn!("Failed to send heartbeat: {}", e);
                        return Closed::Lost;
                    }
                    debug!("Heartbeat sent");
                }

                Some(reply) = self.reply_rx.recv() => {
                    if let Err(e) = ws_tx.send(Message::Text(reply.into())).await {
                        warn!("Failed to send response: {}", e);
                        return Closed::Lost;
                    }
                }

                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            dispatch(&self.executor, &self.reply_tx, text.as_str().to_string());
                        }
                        Some(Ok(Message::Close(_))) | None => return Closed::Lost,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Relay WebSocket error: {}", e);
                            return Closed::Lost;
                        }
                    }
                }
            }
        }
    }
}

/// Execute a command frame on its own task.
///
/// Replies go through the agent-wide queue, so a command that finishes after
/// a reconnect is answered on the new connection.
fn dispatch(executor: &Arc<CommandExecutor>, reply_tx: &mpsc::Sender<String>, frame: String) {
    let executor = executor.clone();
    let reply_tx = reply_tx.clone();
    tokio::spawn(async move {
        let Some(response) = executor.handle_frame(&frame).await else {
            return;
        };
        match response.encode() {
            Ok(encoded) => {
                let _ = reply_tx.send(encoded).await;
            }
            Err(e) => warn!(id = %response.id, "Failed to encode response: {}", e),
        }
    });
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
