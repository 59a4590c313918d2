use super::rejection::IngestError;
use axum::http::{HeaderMap, HeaderName};
use tracing::debug;

/// How the endpoint establishes that the caller is the user named in the path.
///
/// TLS termination happens in front of the daemon; the proxy forwards the
/// verified certificate subject in a header.
#[derive(Debug, Clone)]
pub enum IdentityPolicy {
    /// Local/debug mode: the path identity is taken as-is.
    Trusted,
    /// The header `name` must equal `prefix` followed by the path identity.
    Header { name: HeaderName, prefix: String },
}

impl IdentityPolicy {
    pub fn verify(&self, headers: &HeaderMap, identity: &str) -> Result<(), IngestError> {
        let IdentityPolicy::Header { name, prefix } = self else {
            return Ok(());
        };

        let value = headers.get(name).ok_or(IngestError::MissingIdentity)?;
        let received = String::from_utf8_lossy(value.as_bytes()).into_owned();
        debug!(client_identity = %received, "Client identity header");

        let expected = format!("{prefix}{identity}");
        if received != expected {
            return Err(IngestError::IdentityMismatch { received, expected });
        }
        Ok(())
    }
}
