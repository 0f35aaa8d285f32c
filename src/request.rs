//! The inbound request view the limiter operates on.

use std::net::SocketAddr;

/// The slice of an inbound request that admission control needs.
///
/// The serving layer builds one of these per request before asking a
/// [`Limiter`](crate::admission::Limiter) for a decision. Only the client
/// identity and a little metadata for audit logging are required; the
/// limiter never sees headers or bodies beyond what is captured here.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// The client's network address, if the transport knows it.
    pub remote_addr: Option<SocketAddr>,
    /// Request method (e.g. `GET`).
    pub method: String,
    /// Request path.
    pub path: String,
    /// The client's user agent, if sent.
    pub user_agent: Option<String>,
}

impl RequestMeta {
    /// Create a request view with a known client address.
    pub fn new(remote_addr: SocketAddr, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            remote_addr: Some(remote_addr),
            method: method.into(),
            path: path.into(),
            user_agent: None,
        }
    }

    /// Create a request view for a client whose address is unknown.
    pub fn anonymous(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            remote_addr: None,
            method: method.into(),
            path: path.into(),
            user_agent: None,
        }
    }

    /// Attach the client's user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}
