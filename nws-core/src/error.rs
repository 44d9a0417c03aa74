use thiserror::Error;

/// Errors surfaced by [`crate::NwsClient`] and the parsing layer.
///
/// The set is deliberately flat: callers branch on the variant, and only
/// `Api` carries extra context (the HTTP status and response body, for
/// diagnostics). Failures are terminal for the call that produced them;
/// nothing in this crate retries.
#[derive(Debug, Error)]
pub enum NwsError {
    /// The requested resource does not exist upstream (HTTP 404).
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The API refused the request because of rate limiting (HTTP 429).
    #[error("rate limited by the NWS API")]
    RateLimited,

    /// No response arrived within the configured deadline.
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Caller input was rejected before any request was sent.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Any other failure: an unexpected HTTP status, a transport error,
    /// or a body that could not be decoded. `status` is 0 when no HTTP
    /// status was received.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
}

impl NwsError {
    /// Decode or transport failure with no usable HTTP status.
    pub(crate) fn decode(message: impl Into<String>) -> Self {
        NwsError::Api {
            status: 0,
            message: message.into(),
        }
    }
}
