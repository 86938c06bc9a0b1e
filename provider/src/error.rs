/// Errors returned by the identity and table clients.
///
/// `Api` carries the service's own message so callers can surface it to the
/// user verbatim; everything else is a client-side failure.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Session persistence failed: {0}")]
    SessionPersistence(String),
}
