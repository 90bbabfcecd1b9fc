//! `rn-tools`: the node's task registry and the [`Tool`] capability that
//! execution plugins implement.
//!
//! A [`TaskRegistry`] is built once at startup, seeded with the node's
//! shared secret, and filled with tools while plugins are set up. After
//! that it is only read (tool lookups) and its task table is updated as
//! controller requests queue, cancel and reap tasks.
//!
//! ```rust,no_run
//! # use rn_tools::TaskRegistry;
//! let registry = TaskRegistry::new("abc123").with_max_concurrent(2);
//! // registry.add_tool(Arc::new(HashcatDict::setup("/etc/dict.toml")?));
//! assert!(registry.authorize("abc123"));
//! ```
//!
//! Tool names are lowercase and unique; registering a second tool under an
//! existing name replaces the first.

pub mod auth;
pub mod registry;
pub mod tool;
pub mod types;

pub use registry::TaskRegistry;
pub use tool::Tool;
pub use types::{TaskContext, TaskError, ToolError, ToolResult};

pub use rn_protocol::{TaskState, TaskStatus, ToolInfo};
