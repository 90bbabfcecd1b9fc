//! RPC dispatcher: one WebSocket session, served strictly in order.
//!
//! Flow per session:
//! 1. Controller opens a WebSocket on the node's listener
//! 2. Controller sends an [`RpcRequest`] text frame
//! 3. Node checks `auth`, runs the call against the [`TaskRegistry`] and
//!    writes exactly one [`RpcResponse`]
//! 4. Only then is the next frame read; repeat until the peer leaves

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rn_protocol::{
    AddTaskResult, ErrorKind, HelloResult, RpcCall, RpcRequest, RpcResponse, MAX_REQUEST_BYTES,
    PROTOCOL_VERSION,
};
use rn_tools::{TaskError, TaskRegistry};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::{self, Message};

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("websocket handshake failed: {0}")]
    Handshake(#[source] tungstenite::Error),

    #[error("websocket: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("no request within {0:?}")]
    IdleTimeout(Duration),

    #[error("encoding response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Counters for one finished session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub requests: u64,
    pub failures: u64,
}

/// Serves RPC sessions against one shared [`TaskRegistry`].
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<TaskRegistry>,
    idle_timeout: Option<Duration>,
    max_request_bytes: usize,
}

impl Dispatcher {
    pub fn new(registry: Arc<TaskRegistry>) -> Self {
        Self {
            registry,
            idle_timeout: None,
            max_request_bytes: MAX_REQUEST_BYTES,
        }
    }

    /// End a session when no frame arrives for `timeout`. `None` waits
    /// forever.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Serve one connection until the peer closes it.
    ///
    /// The next frame is not read until the previous response has been
    /// written, so calls within a session are totally ordered.
    pub async fn serve_conn<S>(&self, stream: S) -> Result<SessionStats, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        // The idle deadline also covers a peer that never upgrades.
        let handshake = tokio_tungstenite::accept_async(stream);
        let mut ws = match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, handshake)
                .await
                .map_err(|_| SessionError::IdleTimeout(limit))?,
            None => handshake.await,
        }
        .map_err(SessionError::Handshake)?;
        let mut stats = SessionStats::default();

        loop {
            let next = match self.idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, ws.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        let _ = ws.close(None).await;
                        return Err(SessionError::IdleTimeout(limit));
                    }
                },
                None => ws.next().await,
            };

            let msg = match next {
                Some(msg) => msg?,
                None => break,
            };

            let response = match msg {
                Message::Text(text) => self.handle_frame(&text),
                Message::Binary(_) => RpcResponse::failure(
                    0,
                    ErrorKind::InvalidRequest,
                    "binary frames are not supported",
                ),
                // The stream ends once the close handshake completes.
                Message::Close(_) => continue,
                // tungstenite answers pings itself.
                _ => continue,
            };

            stats.requests += 1;
            if !response.ok {
                stats.failures += 1;
            }

            let json = serde_json::to_string(&response)?;
            ws.send(Message::Text(json)).await?;
        }

        Ok(stats)
    }

    /// Decode one text frame and answer it.
    pub fn handle_frame(&self, text: &str) -> RpcResponse {
        if text.len() > self.max_request_bytes {
            tracing::warn!(
                bytes = text.len(),
                max = self.max_request_bytes,
                "request exceeds max size, rejecting"
            );
            return RpcResponse::failure(
                0,
                ErrorKind::InvalidRequest,
                format!("request exceeds {} bytes", self.max_request_bytes),
            );
        }

        match serde_json::from_str::<RpcRequest>(text) {
            Ok(request) => self.handle(request),
            Err(e) => {
                tracing::debug!(error = %e, "failed to parse request");
                RpcResponse::failure(
                    salvage_id(text),
                    ErrorKind::InvalidRequest,
                    format!("malformed request: {e}"),
                )
            }
        }
    }

    /// Authorize and run one request.
    ///
    /// `add_task` spawns onto the current Tokio runtime.
    pub fn handle(&self, request: RpcRequest) -> RpcResponse {
        let RpcRequest { id, auth, call } = request;
        let method = call.method();

        if !self.registry.authorize(&auth) {
            tracing::warn!(id, method, "rejected request with bad auth token");
            return RpcResponse::failure(id, ErrorKind::Unauthorized, "invalid auth token");
        }
        tracing::debug!(id, method, "dispatching");

        let registry = &self.registry;
        match call {
            RpcCall::Hello => reply(
                id,
                Ok::<_, TaskError>(HelloResult {
                    node_version: env!("CARGO_PKG_VERSION").into(),
                    protocol_version: PROTOCOL_VERSION,
                    tools: registry.tools(),
                }),
            ),
            RpcCall::ListTools => reply(id, Ok::<_, TaskError>(registry.tools())),
            RpcCall::AddTask { tool, params } => reply(
                id,
                registry
                    .add_task(&tool, params)
                    .map(|task_id| AddTaskResult { task_id }),
            ),
            RpcCall::TaskStatus { task_id } => reply(id, registry.task_status(&task_id)),
            RpcCall::AllTaskStatus => reply(id, Ok::<_, TaskError>(registry.all_task_status())),
            RpcCall::TaskQuit { task_id } => reply(id, registry.task_quit(&task_id)),
            RpcCall::TaskDone { task_id } => reply(id, registry.task_done(&task_id)),
        }
    }
}

fn reply<T: Serialize>(id: u64, result: Result<T, TaskError>) -> RpcResponse {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(v) => RpcResponse::success(id, v),
            Err(e) => RpcResponse::failure(id, ErrorKind::Failed, format!("encoding result: {e}")),
        },
        Err(e) => {
            tracing::debug!(id, error = %e, "request failed");
            RpcResponse::failure(id, e.kind(), e.to_string())
        }
    }
}

/// Best-effort `id` from a frame that did not parse as a request.
fn salvage_id(text: &str) -> u64 {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| v.get("id").and_then(serde_json::Value::as_u64))
        .unwrap_or(0)
}
