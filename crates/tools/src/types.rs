//! Core types for task execution: context, results, and errors.

use rn_protocol::ErrorKind;
use tokio_util::sync::CancellationToken;

/// Context provided to every [`Tool::run`](crate::Tool::run) invocation.
#[derive(Clone, Debug)]
pub struct TaskContext {
    /// Registry-assigned task ID.
    pub task_id: String,
    /// Lowercase registry name of the tool running the task.
    pub tool_name: String,
    /// Cancelled when the controller quits the task.
    pub cancel: CancellationToken,
}

/// Result type for tool runs.
pub type ToolResult = Result<serde_json::Value, ToolError>;

/// Errors a tool can return.
///
/// The registry records these on the task as its failure reason. Each
/// variant maps 1:1 to an [`ErrorKind`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum ToolError {
    #[error("invalid_args: {0}")]
    InvalidArgs(String),
    #[error("not_allowed: {0}")]
    NotAllowed(String),
    #[error("failed: {0}")]
    Failed(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("cancelled: {0}")]
    Cancelled(String),
    #[error("not_found: {0}")]
    NotFound(String),
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::InvalidArgs(_) => ErrorKind::InvalidArgs,
            ToolError::NotAllowed(_) => ErrorKind::NotAllowed,
            ToolError::Failed(_) => ErrorKind::Failed,
            ToolError::Timeout(_) => ErrorKind::Timeout,
            ToolError::Cancelled(_) => ErrorKind::Cancelled,
            ToolError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// The message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            ToolError::InvalidArgs(m)
            | ToolError::NotAllowed(m)
            | ToolError::Failed(m)
            | ToolError::Timeout(m)
            | ToolError::Cancelled(m)
            | ToolError::NotFound(m) => m,
        }
    }
}

/// Errors from task-table operations on the [`TaskRegistry`](crate::TaskRegistry).
#[derive(thiserror::Error, Debug, Clone)]
pub enum TaskError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("unknown task: {0}")]
    UnknownTask(String),
    #[error("task {0} has not finished")]
    NotFinished(String),
    #[error("task rejected: {0}")]
    Rejected(#[from] ToolError),
}

impl TaskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaskError::UnknownTool(_) | TaskError::UnknownTask(_) => ErrorKind::NotFound,
            TaskError::NotFinished(_) => ErrorKind::NotAllowed,
            TaskError::Rejected(e) => e.kind(),
        }
    }
}
