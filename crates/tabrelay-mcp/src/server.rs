//! Newline-delimited JSON-RPC server.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use tabrelay_config::ServerConfig;
use tabrelay_protocols::{CommandSink, RpcMethod, RpcRequest, RpcResponse};

use crate::catalog::tool_catalog;
use crate::error::McpServerError;
use crate::tools::ToolDispatcher;

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Serves `initialize`, `tools/list` and `tools/call` over a line stream.
///
/// Every request runs on its own task so a slow tool call never blocks the
/// ones behind it. Responses are written by a single writer, one JSON
/// object per line, in completion order.
pub struct McpServer {
    info: ServerConfig,
    tools: ToolDispatcher,
}

impl McpServer {
    pub fn new(info: ServerConfig, sink: Arc<dyn CommandSink>) -> Self {
        Self {
            info,
            tools: ToolDispatcher::new(sink),
        }
    }

    /// Serve on the process's stdin and stdout.
    pub async fn serve_stdio(self) -> Result<(), McpServerError> {
        self.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Read requests from `reader` until end of input.
    ///
    /// Malformed lines are skipped. On end of input the requests still in
    /// flight are finished and their responses flushed before returning.
    /// A read or write I/O error ends the loop with that error.
    pub async fn run<R, W>(self, reader: R, writer: W) -> Result<(), McpServerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let server = Arc::new(self);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut writer_task = tokio::spawn(write_responses(writer, rx));
        let mut in_flight = JoinSet::new();
        let mut lines = reader.lines();

        info!("Protocol server started");
        let result = loop {
            while in_flight.try_join_next().is_some() {}

            let read = tokio::select! {
                read = lines.next_line() => read,
                // The writer only stops early when the output side fails.
                written = &mut writer_task => {
                    in_flight.abort_all();
                    let err = writer_error(written);
                    warn!("Response writer failed: {}", err);
                    return Err(err);
                }
            };
            let line = match read {
                Ok(Some(line)) => line,
                Ok(None) => break Ok(()),
                Err(e) => break Err(McpServerError::Io(e)),
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let request: RpcRequest = match serde_json::from_str(line) {
                Ok(request) => request,
                Err(e) => {
                    debug!("Skipping malformed line: {}", e);
                    continue;
                }
            };
            if request.is_notification() {
                debug!(method = %request.method, "Notification");
                continue;
            }

            let server = server.clone();
            let tx = tx.clone();
            in_flight.spawn(async move {
                if let Some(response) = server.handle(request).await {
                    let _ = tx.send(response);
                }
            });
        };

        while in_flight.join_next().await.is_some() {}
        drop(tx);
        let flushed = match writer_task.await {
            Ok(Ok(())) => Ok(()),
            written => {
                let err = writer_error(written);
                warn!("Response writer failed: {}", err);
                Err(err)
            }
        };
        info!("Protocol server stopped");
        result.and(flushed)
    }

    /// Answer one request. Notifications get no response.
    pub async fn handle(&self, request: RpcRequest) -> Option<RpcResponse> {
        let id = request.id?;
        let response = match self.dispatch(&request.method, request.params).await {
            Ok(result) => RpcResponse::success(id, result),
            Err(e) => {
                debug!(%id, method = %request.method, "Request failed: {}", e);
                RpcResponse::error(id, e.to_rpc_error())
            }
        };
        Some(response)
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, McpServerError> {
        match RpcMethod::parse(method) {
            Some(RpcMethod::Initialize) => Ok(self.initialize_result()),
            Some(RpcMethod::Ping) => Ok(json!({})),
            Some(RpcMethod::ListTools) => Ok(json!({ "tools": tool_catalog() })),
            Some(RpcMethod::CallTool) => self.call_tool(params).await,
            Some(RpcMethod::Initialized) | None => {
                Err(McpServerError::MethodNotFound(method.to_string()))
            }
        }
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": self.info.protocol_version,
            "capabilities": {
                "tools": {"list": true, "call": true}
            },
            "serverInfo": {
                "name": self.info.name,
                "version": self.info.version
            }
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, McpServerError> {
        let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| McpServerError::InvalidParams(e.to_string()))?;
        let result = self.tools.call(&params.name, &params.arguments).await?;
        Ok(serde_json::to_value(result)?)
    }
}

fn writer_error(written: Result<std::io::Result<()>, JoinError>) -> McpServerError {
    let err = match written {
        Ok(Err(e)) => e,
        Ok(Ok(())) => std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "response writer stopped",
        ),
        Err(e) => std::io::Error::other(e),
    };
    McpServerError::Io(err)
}

async fn write_responses<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<RpcResponse>,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = match serde_json::to_string(&response) {
            Ok(line) => line,
            Err(e) => {
                warn!(id = %response.id, "Failed to encode response: {}", e);
                continue;
            }
        };
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
