//! `rn-server`: the resource node service. Startup sequence, RPC
//! dispatcher and the single-session accept loop behind the
//! `resourceserver` binary.

pub mod acceptor;
pub mod bootstrap;
pub mod cli;
pub mod logging;
pub mod rpc;
