//! Builder pattern for constructing a [`Client`].

use std::time::Duration;

use crate::client::Client;
use crate::types::ClientError;

/// Fluent builder for [`Client`].
///
/// # Example
///
/// ```rust,no_run
/// # use rn_client::ClientBuilder;
/// let client = ClientBuilder::new()
///     .url("ws://127.0.0.1:9443")
///     .token("abc123")
///     .connect_timeout(std::time::Duration::from_secs(5))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    pub(crate) url: String,
    pub(crate) token: Option<String>,
    pub(crate) connect_timeout: Duration,
    pub(crate) request_timeout: Duration,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            url: "ws://127.0.0.1:9443".into(),
            token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }

    // ── Required ─────────────────────────────────────────────────────

    /// Node URL (e.g. `ws://10.0.0.5:9443`).
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// The node's `AuthToken`, sent with every request.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    // ── Timeouts ─────────────────────────────────────────────────────

    /// How long [`Client::connect`] waits for the node to take the session
    /// (default 10s). Includes time spent queued behind another controller.
    pub fn connect_timeout(mut self, d: Duration) -> Self {
        self.connect_timeout = d;
        self
    }

    /// How long each call waits for its response (default 30s).
    pub fn request_timeout(mut self, d: Duration) -> Self {
        self.request_timeout = d;
        self
    }

    /// Build the [`Client`].
    pub fn build(self) -> Result<Client, ClientError> {
        if self.url.is_empty() {
            return Err(ClientError::Config("url is required".into()));
        }
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(ClientError::Config(format!(
                "url must start with ws:// or wss://, got {:?}",
                self.url
            )));
        }
        let token = self
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Config("token is required".into()))?;

        Ok(Client {
            url: self.url,
            token,
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
