use std::time::Duration;

use rn_protocol::{ErrorKind, RpcError};
use tokio_tungstenite::tungstenite;

/// Errors returned by the controller client.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("config: {0}")]
    Config(String),

    #[error("connecting: {0}")]
    Connect(#[source] tungstenite::Error),

    #[error("no session within {0:?}")]
    ConnectTimeout(Duration),

    #[error("websocket: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("connection closed by node")]
    Closed,

    #[error("protocol: {0}")]
    Protocol(String),

    #[error("decoding response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The node answered with `ok: false`.
    #[error("rpc: {0}")]
    Rpc(RpcError),
}

impl ClientError {
    /// The node's error kind, when the failure came from the node.
    pub fn rpc_kind(&self) -> Option<ErrorKind> {
        match self {
            ClientError::Rpc(e) => Some(e.kind),
            _ => None,
        }
    }
}
