//! Task registry: maps tool names to handlers and tracks queued tasks.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures_util::FutureExt;
use parking_lot::Mutex;
use rn_protocol::{TaskState, TaskStatus, ToolInfo};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::auth::token_eq;
use crate::tool::Tool;
use crate::types::{TaskContext, TaskError, ToolError};

struct TaskEntry {
    status: TaskStatus,
    cancel: CancellationToken,
}

type TaskTable = Arc<Mutex<HashMap<String, TaskEntry>>>;

/// The node's catalog of tools plus its table of tasks.
///
/// Built once during startup. Tools are added through `&mut self` before
/// the registry is shared; task operations take `&self` and synchronize
/// on an internal lock because task runs finish in the background.
pub struct TaskRegistry {
    auth_token: String,
    tools: HashMap<String, Arc<dyn Tool>>,
    tasks: TaskTable,
    slots: Arc<Semaphore>,
    max_concurrent: usize,
}

impl TaskRegistry {
    /// Create an empty registry guarded by `auth_token`.
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            tools: HashMap::new(),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            slots: Arc::new(Semaphore::new(1)),
            max_concurrent: 1,
        }
    }

    /// Allow up to `n` tasks to run at once (minimum 1). Extra tasks wait
    /// in the `queued` state.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        let n = n.max(1);
        self.slots = Arc::new(Semaphore::new(n));
        self.max_concurrent = n;
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Check a presented secret against the node token.
    pub fn authorize(&self, presented: &str) -> bool {
        token_eq(presented, &self.auth_token)
    }

    // ── Tools ────────────────────────────────────────────────────────

    /// Register a tool under its lowercased `info().name`.
    ///
    /// Returns the handle it replaced, if a tool with that name was
    /// already registered.
    pub fn add_tool(&mut self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        let name = tool.info().name.to_ascii_lowercase();
        let replaced = self.tools.insert(name.clone(), tool);
        if replaced.is_some() {
            tracing::warn!(tool = %name, "tool registered twice, keeping the latest");
        } else {
            tracing::debug!(tool = %name, "tool registered");
        }
        replaced
    }

    /// Convenience wrapper around [`add_tool`](Self::add_tool).
    pub fn register<T: Tool>(&mut self, tool: T) -> &mut Self {
        self.add_tool(Arc::new(tool));
        self
    }

    /// Look up a tool by name (case-insensitive).
    pub fn tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(&name.to_ascii_lowercase()).cloned()
    }

    /// All registered tool names (sorted).
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Descriptions of all registered tools, sorted by name.
    pub fn tools(&self) -> Vec<ToolInfo> {
        let mut infos: Vec<ToolInfo> = self
            .tools
            .iter()
            .map(|(name, tool)| ToolInfo {
                name: name.clone(),
                ..tool.info()
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    // ── Tasks ────────────────────────────────────────────────────────

    /// Queue a task for `tool_name` and start it in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn add_task(
        &self,
        tool_name: &str,
        params: serde_json::Value,
    ) -> Result<String, TaskError> {
        let name = tool_name.to_ascii_lowercase();
        let tool = self
            .tools
            .get(&name)
            .cloned()
            .ok_or_else(|| TaskError::UnknownTool(tool_name.to_owned()))?;
        tool.validate(&params)?;

        let task_id = uuid::Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        self.tasks.lock().insert(
            task_id.clone(),
            TaskEntry {
                status: TaskStatus {
                    task_id: task_id.clone(),
                    tool: name.clone(),
                    state: TaskState::Queued,
                    created_at: Utc::now(),
                    started_at: None,
                    finished_at: None,
                    result: None,
                    error: None,
                },
                cancel: cancel.clone(),
            },
        );
        tracing::info!(task_id = %task_id, tool = %name, "task queued");

        let ctx = TaskContext {
            task_id: task_id.clone(),
            tool_name: name,
            cancel,
        };
        tokio::spawn(execute(
            self.tasks.clone(),
            self.slots.clone(),
            tool,
            ctx,
            params,
        ));

        Ok(task_id)
    }

    pub fn task_status(&self, task_id: &str) -> Result<TaskStatus, TaskError> {
        self.tasks
            .lock()
            .get(task_id)
            .map(|entry| entry.status.clone())
            .ok_or_else(|| TaskError::UnknownTask(task_id.to_owned()))
    }

    /// Every known task, oldest first.
    pub fn all_task_status(&self) -> Vec<TaskStatus> {
        let mut all: Vec<TaskStatus> = self
            .tasks
            .lock()
            .values()
            .map(|entry| entry.status.clone())
            .collect();
        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        all
    }

    /// Cancel a queued or running task. Finished tasks are returned as-is.
    pub fn task_quit(&self, task_id: &str) -> Result<TaskStatus, TaskError> {
        let mut tasks = self.tasks.lock();
        let entry = tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::UnknownTask(task_id.to_owned()))?;
        if !entry.status.state.is_terminal() {
            entry.status.state = TaskState::Quit;
            entry.status.finished_at = Some(Utc::now());
            entry.cancel.cancel();
            tracing::info!(task_id = %task_id, tool = %entry.status.tool, "task quit");
        }
        Ok(entry.status.clone())
    }

    /// Remove a finished task from the table and return its final status.
    pub fn task_done(&self, task_id: &str) -> Result<TaskStatus, TaskError> {
        let mut tasks = self.tasks.lock();
        let state = tasks
            .get(task_id)
            .map(|entry| entry.status.state)
            .ok_or_else(|| TaskError::UnknownTask(task_id.to_owned()))?;
        if !state.is_terminal() {
            return Err(TaskError::NotFinished(task_id.to_owned()));
        }
        let entry = tasks
            .remove(task_id)
            .ok_or_else(|| TaskError::UnknownTask(task_id.to_owned()))?;
        Ok(entry.status)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Background execution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn execute(
    tasks: TaskTable,
    slots: Arc<Semaphore>,
    tool: Arc<dyn Tool>,
    ctx: TaskContext,
    params: serde_json::Value,
) {
    let task_id = ctx.task_id.clone();
    let cancel = ctx.cancel.clone();

    // Wait for an execution slot unless the task is quit first.
    let _permit = tokio::select! {
        permit = slots.acquire_owned() => match permit {
            Ok(p) => p,
            Err(_) => {
                finish(&tasks, &task_id, Err(ToolError::Failed("task slots closed".into())));
                return;
            }
        },
        _ = cancel.cancelled() => return,
    };

    {
        let mut table = tasks.lock();
        match table.get_mut(&task_id) {
            Some(entry) if entry.status.state == TaskState::Queued => {
                entry.status.state = TaskState::Running;
                entry.status.started_at = Some(Utc::now());
            }
            _ => return,
        }
    }
    tracing::debug!(task_id = %task_id, tool = %ctx.tool_name, "task started");

    let tool_name = ctx.tool_name.clone();
    let outcome = tokio::select! {
        // catch_unwind: a panicking tool still ends its task.
        r = AssertUnwindSafe(tool.run(ctx, params)).catch_unwind() => r,
        _ = cancel.cancelled() => return,
    };

    match outcome {
        Ok(result) => finish(&tasks, &task_id, result),
        Err(_panic) => {
            tracing::error!(task_id = %task_id, tool = %tool_name, "tool panicked");
            finish(&tasks, &task_id, Err(ToolError::Failed("tool panicked".into())));
        }
    }
}

/// Record a task's outcome. Tasks already in a terminal state (quit while
/// the tool was finishing) are left untouched.
fn finish(tasks: &TaskTable, task_id: &str, result: Result<serde_json::Value, ToolError>) {
    let mut table = tasks.lock();
    let Some(entry) = table.get_mut(task_id) else {
        return;
    };
    if entry.status.state.is_terminal() {
        return;
    }
    entry.status.finished_at = Some(Utc::now());
    match result {
        Ok(value) => {
            entry.status.state = TaskState::Done;
            entry.status.result = Some(value);
            tracing::info!(task_id = %task_id, tool = %entry.status.tool, "task done");
        }
        Err(ToolError::Cancelled(message)) => {
            entry.status.state = TaskState::Quit;
            entry.status.error = Some(message);
        }
        Err(e) => {
            tracing::warn!(task_id = %task_id, tool = %entry.status.tool, error = %e, "task failed");
            entry.status.state = TaskState::Failed;
            entry.status.error = Some(e.to_string());
        }
    }
}
