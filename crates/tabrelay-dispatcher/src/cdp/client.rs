//! DevTools WebSocket client.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};
use url::Url;

use super::error::CdpError;
use super::protocol::{BrowserVersion, CdpRequest, CdpResponse, ExceptionDetails, RemoteObject, TargetInfo};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;
type PendingMap = Mutex<HashMap<u64, oneshot::Sender<Result<Value, CdpError>>>>;

/// Upper bound for a single DevTools command.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared write half and reply table of one browser connection.
struct Transport {
    ws_tx: tokio::sync::Mutex<WsSink>,
    request_id: AtomicU64,
    pending: PendingMap,
    closed: AtomicBool,
}

impl Transport {
    async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CdpError::SessionClosed);
        }
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(str::to_string),
        };
        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let sent = self.ws_tx.lock().await.send(Message::Text(json.into())).await;
        if let Err(e) = sent {
            self.pending.lock().remove(&id);
            return Err(e.into());
        }

        match tokio::time::timeout(CALL_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }

    /// Route replies until the socket ends, then fail everything in flight.
    async fn receive_loop(self: Arc<Self>, mut ws_rx: WsSource) {
        while let Some(msg) = ws_rx.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text.as_str());
                    match serde_json::from_str::<CdpResponse>(text.as_str()) {
                        Ok(resp) => self.settle(resp),
                        Err(e) => warn!("Failed to parse CDP message: {}", e),
                    }
                }
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    warn!("CDP WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        debug!("CDP connection closed");
        self.closed.store(true, Ordering::SeqCst);
        for (_, tx) in self.pending.lock().drain() {
            let _ = tx.send(Err(CdpError::SessionClosed));
        }
    }

    fn settle(&self, resp: CdpResponse) {
        // Events carry no id and are not consumed.
        let Some(id) = resp.id else {
            return;
        };
        let Some(tx) = self.pending.lock().remove(&id) else {
            return;
        };
        let result = match resp.error {
            Some(error) => Err(CdpError::Protocol {
                code: error.code,
                message: error.message,
            }),
            None => Ok(resp.result.unwrap_or(Value::Null)),
        };
        let _ = tx.send(result);
    }
}

/// Browser-level DevTools connection.
pub struct CdpClient {
    endpoint: String,
    transport: Arc<Transport>,
    recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to Chrome's remote debugging endpoint, e.g.
    /// `http://127.0.0.1:9222`.
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        let base = Url::parse(endpoint)?;
        let version_url = base.join("/json/version")?;
        debug!("Fetching browser version from {}", version_url);

        let version: BrowserVersion = reqwest::get(version_url.as_str())
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?;
        debug!("Connected to browser: {}", version.browser);

        let (ws_stream, _) = tokio_tungstenite::connect_async(version.web_socket_debugger_url.as_str())
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;
        let (ws_tx, ws_rx) = ws_stream.split();

        let transport = Arc::new(Transport {
            ws_tx: tokio::sync::Mutex::new(ws_tx),
            request_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        });
        let recv_task = tokio::spawn(transport.clone().receive_loop(ws_rx));

        Ok(Self {
            endpoint: endpoint.to_string(),
            transport,
            recv_task,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether the browser connection has gone away.
    pub fn is_closed(&self) -> bool {
        self.transport.closed.load(Ordering::SeqCst)
    }

    /// Browser-level command.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.transport.call(method, params, None).await
    }

    pub async fn get_targets(&self) -> Result<Vec<TargetInfo>, CdpError> {
        let result = self.call("Target.getTargets", None).await?;
        let targets = serde_json::from_value(result["targetInfos"].clone())?;
        Ok(targets)
    }

    /// Attach a flattened session to a target.
    pub async fn attach(&self, target_id: &str) -> Result<CdpSession, CdpError> {
        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({"targetId": target_id, "flatten": true})),
            )
            .await?;
        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing sessionId".to_string()))?
            .to_string();
        debug!(target_id, %session_id, "Attached to target");

        Ok(CdpSession {
            target_id: target_id.to_string(),
            session_id,
            transport: self.transport.clone(),
        })
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

/// Session attached to one page target.
pub struct CdpSession {
    target_id: String,
    session_id: String,
    transport: Arc<Transport>,
}

impl CdpSession {
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn is_closed(&self) -> bool {
        self.transport.closed.load(Ordering::SeqCst)
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<Value, CdpError> {
        self.transport
            .call(method, Some(params), Some(&self.session_id))
            .await
    }

    /// `Runtime.evaluate`, keeping the result as a remote object.
    pub async fn evaluate(&self, expression: &str) -> Result<RemoteObject, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                json!({"expression": expression, "returnByValue": false}),
            )
            .await?;
        remote_result(result)
    }

    /// `Runtime.evaluate`, returning the JSON value of the result.
    pub async fn evaluate_value(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                json!({"expression": expression, "returnByValue": true, "awaitPromise": true}),
            )
            .await?;
        Ok(remote_result(result)?.value.unwrap_or(Value::Null))
    }

    /// `Runtime.callFunctionOn` with `object_id` as `this`.
    ///
    /// `arguments` are `Runtime.CallArgument` objects.
    pub async fn call_function_on(
        &self,
        object_id: &str,
        function: &str,
        arguments: Vec<Value>,
        return_by_value: bool,
    ) -> Result<RemoteObject, CdpError> {
        let result = self
            .call(
                "Runtime.callFunctionOn",
                json!({
                    "objectId": object_id,
                    "functionDeclaration": function,
                    "arguments": arguments,
                    "returnByValue": return_by_value,
                }),
            )
            .await?;
        remote_result(result)
    }
}

/// Extract `result` from an evaluation reply, turning a thrown exception
/// into [`CdpError::JavaScript`].
fn remote_result(mut reply: Value) -> Result<RemoteObject, CdpError> {
    if let Some(details) = reply.get("exceptionDetails") {
        let details: ExceptionDetails = serde_json::from_value(details.clone())?;
        return Err(CdpError::JavaScript(details.message()));
    }
    Ok(serde_json::from_value(reply["result"].take())?)
}
