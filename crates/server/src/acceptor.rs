//! Single-session accept loop.
//!
//! `Listening → Serving → Listening → ... → Closed`. While a session is
//! being served the listener is not polled, so a second controller waits
//! in the kernel backlog until the first one leaves.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::rpc::{Dispatcher, SessionError};

/// Pause after a transient accept error before trying again.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptorState {
    Listening,
    Serving { peer: SocketAddr },
    Closed,
}

pub struct Acceptor {
    listener: TcpListener,
    dispatcher: Dispatcher,
    state: watch::Sender<AcceptorState>,
}

impl Acceptor {
    pub fn new(listener: TcpListener, dispatcher: Dispatcher) -> Self {
        let (state, _) = watch::channel(AcceptorState::Listening);
        Self {
            listener,
            dispatcher,
            state,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Follow state transitions while [`run`](Self::run) is going.
    pub fn subscribe(&self) -> watch::Receiver<AcceptorState> {
        self.state.subscribe()
    }

    /// Accept and serve connections one at a time until `shutdown` fires
    /// or accept fails with a non-transient error.
    ///
    /// Shutdown drops an in-flight session without draining it.
    pub async fn run(self, shutdown: CancellationToken) -> io::Result<()> {
        let result = self.accept_loop(&shutdown).await;
        self.state.send_replace(AcceptorState::Closed);
        result
    }

    async fn accept_loop(&self, shutdown: &CancellationToken) -> io::Result<()> {
        loop {
            self.state.send_replace(AcceptorState::Listening);

            let accepted = tokio::select! {
                r = self.listener.accept() => r,
                _ = shutdown.cancelled() => {
                    tracing::info!("shutdown requested, closing listener");
                    return Ok(());
                }
            };

            let (stream, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) if is_transient(&e) => {
                    tracing::warn!(error = %e, "transient accept error, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(ACCEPT_BACKOFF) => continue,
                        _ = shutdown.cancelled() => return Ok(()),
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed, stopping");
                    return Err(e);
                }
            };

            self.state.send_replace(AcceptorState::Serving { peer });
            tracing::info!(peer = %peer, "session opened");

            let served = tokio::select! {
                r = self.dispatcher.serve_conn(stream) => r,
                _ = shutdown.cancelled() => {
                    tracing::info!(peer = %peer, "shutdown requested, dropping session");
                    return Ok(());
                }
            };

            match served {
                Ok(stats) => tracing::info!(
                    peer = %peer,
                    requests = stats.requests,
                    failures = stats.failures,
                    "session closed"
                ),
                Err(SessionError::IdleTimeout(limit)) => tracing::info!(
                    peer = %peer,
                    idle_secs = limit.as_secs(),
                    "session idle, closed"
                ),
                Err(e) => tracing::warn!(peer = %peer, error = %e, "session ended with error"),
            }
        }
    }
}

/// Accept errors that say something about one connection or a passing
/// resource shortage rather than about the listener itself.
pub fn is_transient(e: &io::Error) -> bool {
    use io::ErrorKind::*;

    if matches!(
        e.kind(),
        ConnectionAborted | ConnectionReset | ConnectionRefused | Interrupted | WouldBlock | TimedOut
    ) {
        return true;
    }
    // ENFILE / EMFILE: out of file descriptors.
    cfg!(unix) && matches!(e.raw_os_error(), Some(23) | Some(24))
}
