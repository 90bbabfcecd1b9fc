//! Node RPC protocol: request/response envelopes, error kinds, and the
//! payload types exchanged between a controller and a resource node.
//!
//! Frames are JSON text messages over a WebSocket. A controller sends one
//! [`RpcRequest`] at a time and the node answers each with exactly one
//! [`RpcResponse`] carrying the same `id`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bumped whenever a request or response shape changes incompatibly.
pub const PROTOCOL_VERSION: u32 = 1;

/// Inbound frames larger than this are rejected before parsing.
pub const MAX_REQUEST_BYTES: usize = 256 * 1024;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Requests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Controller → node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Correlation ID, echoed in the response.
    pub id: u64,
    /// Shared secret; checked on every request.
    pub auth: String,
    pub call: RpcCall,
}

/// The method surface of a resource node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum RpcCall {
    /// Returns a [`HelloResult`].
    Hello,
    /// Returns `Vec<ToolInfo>`.
    ListTools,
    /// Queue a task for `tool`. Returns an [`AddTaskResult`].
    AddTask {
        tool: String,
        #[serde(default)]
        params: serde_json::Value,
    },
    /// Returns a [`TaskStatus`].
    TaskStatus { task_id: String },
    /// Returns `Vec<TaskStatus>`, oldest first.
    AllTaskStatus,
    /// Cancel a queued or running task. Returns the resulting [`TaskStatus`].
    TaskQuit { task_id: String },
    /// Forget a finished task. Returns its final [`TaskStatus`].
    TaskDone { task_id: String },
}

impl RpcCall {
    pub fn method(&self) -> &'static str {
        match self {
            RpcCall::Hello => "hello",
            RpcCall::ListTools => "list_tools",
            RpcCall::AddTask { .. } => "add_task",
            RpcCall::TaskStatus { .. } => "task_status",
            RpcCall::AllTaskStatus => "all_task_status",
            RpcCall::TaskQuit { .. } => "task_quit",
            RpcCall::TaskDone { .. } => "task_done",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Responses
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Node → controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: u64,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: u64, result: serde_json::Value) -> Self {
        Self {
            id,
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            id,
            ok: false,
            result: None,
            error: Some(RpcError {
                kind,
                message: message.into(),
            }),
        }
    }
}

/// Structured error carried by a failed [`RpcResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request's `auth` did not match the node token.
    Unauthorized,
    /// The frame was oversized or not a valid request.
    InvalidRequest,
    InvalidArgs,
    NotFound,
    NotAllowed,
    Failed,
    Timeout,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::InvalidArgs => "invalid_args",
            ErrorKind::NotFound => "not_found",
            ErrorKind::NotAllowed => "not_allowed",
            ErrorKind::Failed => "failed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Payloads
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelloResult {
    pub node_version: String,
    pub protocol_version: u32,
    pub tools: Vec<ToolInfo>,
}

/// Description of a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Registry key, lowercase (e.g. `"hashcatdict"`).
    pub name: String,
    /// Broad class of work (e.g. `"cracker"`).
    pub kind: String,
    pub version: String,
    pub description: String,
    /// JSON Schema for the task parameters.
    #[serde(default)]
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTaskResult {
    pub task_id: String,
}

/// Task lifecycle: `Queued → Running → {Done, Failed, Quit}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Queued,
    Running,
    Done,
    Failed,
    Quit,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed | TaskState::Quit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub task_id: String,
    pub tool: String,
    pub state: TaskState,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_shape() {
        let req = RpcRequest {
            id: 7,
            auth: "abc123".into(),
            call: RpcCall::AddTask {
                tool: "hashcatdict".into(),
                params: json!({"hash_mode": 0}),
            },
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "id": 7,
                "auth": "abc123",
                "call": {"method": "add_task", "params": {"tool": "hashcatdict", "params": {"hash_mode": 0}}}
            })
        );
    }

    #[test]
    fn unit_methods_need_no_params() {
        let req: RpcRequest =
            serde_json::from_str(r#"{"id":1,"auth":"t","call":{"method":"list_tools"}}"#).unwrap();
        assert_eq!(req.call, RpcCall::ListTools);
        assert_eq!(req.call.method(), "list_tools");
    }

    #[test]
    fn add_task_params_default_to_null() {
        let req: RpcRequest = serde_json::from_str(
            r#"{"id":1,"auth":"t","call":{"method":"add_task","params":{"tool":"x"}}}"#,
        )
        .unwrap();
        assert_eq!(
            req.call,
            RpcCall::AddTask {
                tool: "x".into(),
                params: serde_json::Value::Null
            }
        );
    }

    #[test]
    fn unknown_method_is_rejected() {
        let parsed = serde_json::from_str::<RpcRequest>(
            r#"{"id":1,"auth":"t","call":{"method":"format_disk"}}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn failure_omits_result() {
        let resp = RpcResponse::failure(3, ErrorKind::Unauthorized, "bad token");
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"id": 3, "ok": false, "error": {"kind": "unauthorized", "message": "bad token"}})
        );
        assert_eq!(resp.error.unwrap().to_string(), "unauthorized: bad token");
    }

    #[test]
    fn terminal_states() {
        assert!(!TaskState::Queued.is_terminal());
        assert!(!TaskState::Running.is_terminal());
        assert!(TaskState::Done.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(TaskState::Quit.is_terminal());
    }
}
