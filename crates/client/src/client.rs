//! Connection and per-session request/response handling.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rn_protocol::{
    AddTaskResult, ErrorKind, HelloResult, RpcCall, RpcError, RpcRequest, RpcResponse, TaskStatus,
    ToolInfo,
};
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::builder::ClientBuilder;
use crate::types::ClientError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A configured controller. Create via [`ClientBuilder`].
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) url: String,
    pub(crate) token: String,
    pub(crate) connect_timeout: Duration,
    pub(crate) request_timeout: Duration,
}

impl Client {
    /// Start a new builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Open a session. Waits while the node is serving another controller.
    pub async fn connect(&self) -> Result<Session, ClientError> {
        tracing::debug!(url = %self.url, "connecting to node");

        let (ws, _response) = tokio::time::timeout(
            self.connect_timeout,
            tokio_tungstenite::connect_async(self.url.as_str()),
        )
        .await
        .map_err(|_| ClientError::ConnectTimeout(self.connect_timeout))?
        .map_err(ClientError::Connect)?;

        tracing::debug!(url = %self.url, "session opened");
        Ok(Session {
            ws,
            token: self.token.clone(),
            next_id: 1,
            request_timeout: self.request_timeout,
        })
    }
}

/// One open session with a node. Calls are strictly sequential: each
/// method sends a request and waits for its response.
pub struct Session {
    ws: WsStream,
    token: String,
    next_id: u64,
    request_timeout: Duration,
}

impl Session {
    pub async fn hello(&mut self) -> Result<HelloResult, ClientError> {
        self.call_as(RpcCall::Hello).await
    }

    pub async fn list_tools(&mut self) -> Result<Vec<ToolInfo>, ClientError> {
        self.call_as(RpcCall::ListTools).await
    }

    /// Queue a task and return its id.
    pub async fn add_task(
        &mut self,
        tool: &str,
        params: serde_json::Value,
    ) -> Result<String, ClientError> {
        let result: AddTaskResult = self
            .call_as(RpcCall::AddTask {
                tool: tool.to_owned(),
                params,
            })
            .await?;
        Ok(result.task_id)
    }

    pub async fn task_status(&mut self, task_id: &str) -> Result<TaskStatus, ClientError> {
        self.call_as(RpcCall::TaskStatus {
            task_id: task_id.to_owned(),
        })
        .await
    }

    pub async fn all_task_status(&mut self) -> Result<Vec<TaskStatus>, ClientError> {
        self.call_as(RpcCall::AllTaskStatus).await
    }

    pub async fn task_quit(&mut self, task_id: &str) -> Result<TaskStatus, ClientError> {
        self.call_as(RpcCall::TaskQuit {
            task_id: task_id.to_owned(),
        })
        .await
    }

    pub async fn task_done(&mut self, task_id: &str) -> Result<TaskStatus, ClientError> {
        self.call_as(RpcCall::TaskDone {
            task_id: task_id.to_owned(),
        })
        .await
    }

    /// Send `call` and return the raw `result` value.
    pub async fn call(&mut self, call: RpcCall) -> Result<serde_json::Value, ClientError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = RpcRequest {
            id,
            auth: self.token.clone(),
            call,
        };
        let response = self.call_raw(serde_json::to_string(&request)?).await?;

        if response.id != id {
            return Err(ClientError::Protocol(format!(
                "response id {} does not match request id {id}",
                response.id
            )));
        }
        if !response.ok {
            return Err(ClientError::Rpc(response.error.unwrap_or(RpcError {
                kind: ErrorKind::Failed,
                message: "node reported failure without detail".into(),
            })));
        }
        Ok(response.result.unwrap_or(serde_json::Value::Null))
    }

    /// Send an arbitrary text frame and read the next response.
    pub async fn call_raw(&mut self, frame: String) -> Result<RpcResponse, ClientError> {
        self.ws.send(Message::Text(frame)).await?;

        let timeout = self.request_timeout;
        tokio::time::timeout(timeout, self.read_response())
            .await
            .map_err(|_| ClientError::Timeout(timeout))?
    }

    /// Close the session, letting the node accept its next controller.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.ws.close(None).await?;
        // Drain until the node finishes the close handshake.
        while let Some(Ok(_)) = self.ws.next().await {}
        Ok(())
    }

    async fn call_as<T: DeserializeOwned>(&mut self, call: RpcCall) -> Result<T, ClientError> {
        let value = self.call(call).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn read_response(&mut self) -> Result<RpcResponse, ClientError> {
        while let Some(msg) = self.ws.next().await {
            match msg? {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(_) => return Err(ClientError::Closed),
                _ => {}
            }
        }
        Err(ClientError::Closed)
    }
}
