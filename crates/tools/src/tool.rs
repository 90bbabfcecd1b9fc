//! The capability every execution plugin provides.

use rn_protocol::ToolInfo;

use crate::types::{TaskContext, ToolError, ToolResult};

/// Implement this trait to make a backend available for remote tasks.
///
/// Plugins construct a tool during setup; the registry keys it by
/// `info().name` and runs it once per queued task. Runs happen on the
/// Tokio runtime and may perform async I/O.
///
/// # Example
///
/// ```rust,no_run
/// use rn_tools::{TaskContext, Tool, ToolInfo, ToolResult};
///
/// struct Sleeper;
///
/// #[async_trait::async_trait]
/// impl Tool for Sleeper {
///     fn info(&self) -> ToolInfo {
///         ToolInfo {
///             name: "sleeper".into(),
///             kind: "demo".into(),
///             version: "1.0.0".into(),
///             description: "Waits a second".into(),
///             parameters: serde_json::json!({}),
///         }
///     }
///
///     async fn run(&self, _ctx: TaskContext, _params: serde_json::Value) -> ToolResult {
///         tokio::time::sleep(std::time::Duration::from_secs(1)).await;
///         Ok(serde_json::json!({ "slept": true }))
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Tool: Send + Sync + 'static {
    /// Static description, advertised to controllers.
    fn info(&self) -> ToolInfo;

    /// Check task parameters before the task is queued.
    ///
    /// Errors here reject `add_task` synchronously instead of producing a
    /// failed task.
    fn validate(&self, _params: &serde_json::Value) -> Result<(), ToolError> {
        Ok(())
    }

    /// Execute one task.
    ///
    /// * `ctx`: task context (ID, cancellation token)
    /// * `params`: JSON parameters from the controller
    ///
    /// The future is dropped if the task is quit, so any child process
    /// must be spawned with `kill_on_drop`.
    async fn run(&self, ctx: TaskContext, params: serde_json::Value) -> ToolResult;
}
