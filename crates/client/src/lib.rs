//! `rn-client`: controller-side client for a resource node.
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), rn_client::ClientError> {
//! use rn_client::ClientBuilder;
//!
//! let client = ClientBuilder::new()
//!     .url("ws://10.0.0.5:9443")
//!     .token("abc123")
//!     .build()?;
//!
//! let mut session = client.connect().await?;
//! let hello = session.hello().await?;
//! println!("node {} offers {} tools", hello.node_version, hello.tools.len());
//! session.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! A node serves one controller at a time, so [`Client::connect`] does not
//! return until any other session on the node has ended (or the connect
//! timeout fires).

pub mod builder;
pub mod client;
pub mod types;

pub use builder::ClientBuilder;
pub use client::{Client, Session};
pub use types::ClientError;

pub use rn_protocol::{
    AddTaskResult, ErrorKind, HelloResult, RpcCall, RpcError, RpcResponse, TaskState, TaskStatus,
    ToolInfo,
};
