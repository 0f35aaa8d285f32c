//! Client key derivation.

use crate::request::RequestMeta;

/// Bucket shared by every request whose client address is unknown.
///
/// Collapsing such requests into one key is a documented approximation:
/// address-less traffic rate-limits itself as a single client rather than
/// escaping the limiter entirely.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Maps an inbound request to the key its window is counted under.
///
/// Implementations must be pure: same request view, same key, no side
/// effects. Policies override the default to group by something other than
/// source address (an authenticated user id, an API token, ...).
pub trait KeyDeriver: Send + Sync {
    /// Derive the counting key for a request.
    fn derive(&self, request: &RequestMeta) -> String;
}

/// Default deriver: one bucket per client IP.
///
/// The port is deliberately dropped so that every connection from a host
/// shares one window.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteAddrKey;

impl KeyDeriver for RemoteAddrKey {
    fn derive(&self, request: &RequestMeta) -> String {
        match request.remote_addr {
            Some(addr) => addr.ip().to_string(),
            None => UNKNOWN_CLIENT.to_string(),
        }
    }
}

impl<F> KeyDeriver for F
where
    F: Fn(&RequestMeta) -> String + Send + Sync,
{
    fn derive(&self, request: &RequestMeta) -> String {
        self(request)
    }
}
