//! Error types for dispatched requests.
//!
//! Every failure the client can produce lands in [`Error`]. Transport-class failures
//! (network, timeout, malformed responses) are resolved internally by failing over to the next
//! host and only reach the caller wrapped in [`Error::HostsExhausted`]. Well-formed error
//! responses from the service are surfaced as [`Error::Service`] and always carry the service's
//! numeric error code in an [`ErrorEnvelope`].

use http::StatusCode;
use std::fmt;

/// Numeric error codes reported by the service in the `errorNum` field.
///
/// Graceful lookups compare [`Error::error_num`] against these to turn a "not found" into an
/// absent result.
pub mod codes {
    /// The body was missing or could not be read as a service error document.
    pub const UNKNOWN: u32 = 0;
    /// The requested document does not exist.
    pub const DOCUMENT_NOT_FOUND: u32 = 1202;
    /// The requested collection does not exist.
    pub const COLLECTION_NOT_FOUND: u32 = 1203;
    /// The requested index does not exist.
    pub const INDEX_NOT_FOUND: u32 = 1212;
    /// The requested fabric does not exist.
    pub const FABRIC_NOT_FOUND: u32 = 1228;
    /// The requested graph does not exist.
    pub const GRAPH_NOT_FOUND: u32 = 1924;
}

/// The structured error reported by the service for a failed call.
///
/// Built only by the response translator, either from a well-formed error document or, with
/// [`codes::UNKNOWN`], from a response whose body could not be understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEnvelope {
    /// The HTTP status of the response.
    pub status: StatusCode,
    /// The service error code (`errorNum`), or [`codes::UNKNOWN`].
    pub error_num: u32,
    /// The service error message (`errorMessage`), or the status reason when absent.
    pub message: String,
    /// The raw response body.
    pub raw_response: String,
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (errorNum {}, status {})",
            self.message, self.error_num, self.status
        )
    }
}

/// The main error type for dispatched requests.
///
/// # Examples
///
/// ```no_run
/// use c8_client::{codes, Client, Error, Request};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder().url("https://gdn.example.com")?.build()?;
///
/// match client.send(Request::get("/_api/collection/orders")).await {
///     Ok(response) => println!("Collection: {}", response.data),
///     Err(Error::Service(envelope)) if envelope.error_num == codes::COLLECTION_NOT_FOUND => {
///         println!("no such collection");
///     }
///     Err(Error::HostsExhausted { attempts, last_error }) => {
///         eprintln!("no host answered after {} attempts: {}", attempts, last_error);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error from the HTTP backend (connection refused, DNS failure, reset).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A transport failure reported by a non-`reqwest` agent.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The host answered, but not with something the translator could read.
    ///
    /// The envelope carries [`codes::UNKNOWN`]. Treated like a transport failure: the next
    /// host is tried.
    ///
    /// A status of 400 or above with an empty body lands here too, because there is no error
    /// document to read. `HEAD` requests never carry a body, so a `HEAD` answered with 404 or
    /// 401 fails over to every host and reaches the caller as [`Error::HostsExhausted`]. The
    /// status is still available through [`Error::status`], which looks through to the last
    /// host's envelope.
    #[error("Malformed response (status {}): {detail}", envelope.status)]
    MalformedResponse {
        /// Status and raw body of the offending response.
        envelope: ErrorEnvelope,
        /// Why the body was rejected.
        detail: String,
    },

    /// A well-formed error response from the service. Never retried.
    #[error("Service error: {0}")]
    Service(ErrorEnvelope),

    /// Every candidate host failed with a transport-class error.
    #[error("No host reachable after {attempts} attempts: {last_error}")]
    HostsExhausted {
        /// The number of hosts contacted.
        attempts: usize,
        /// The failure reported by the last host.
        last_error: Box<Error>,
    },

    /// The client was closed before the request could be sent.
    #[error("Client is closed")]
    Closed,

    /// A successful response could not be shaped into the requested type.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// Invalid configuration was provided.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to serialize the request body or query options.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns `true` if the dispatcher fails over to the next host on this error.
    ///
    /// Anything that happened before a well-formed service response was received qualifies.
    ///
    /// ```
    /// use c8_client::{codes, Error, ErrorEnvelope};
    /// use http::StatusCode;
    ///
    /// let not_found = Error::Service(ErrorEnvelope {
    ///     status: StatusCode::NOT_FOUND,
    ///     error_num: codes::DOCUMENT_NOT_FOUND,
    ///     message: "document not found".to_string(),
    ///     raw_response: String::new(),
    /// });
    /// assert!(!not_found.is_retryable());
    /// assert!(Error::Timeout.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Connection(_) => true,
            Error::Timeout => true,
            Error::MalformedResponse { .. } => true,
            Error::Service(_) => false,
            Error::HostsExhausted { .. } => false,
            Error::Closed => false,
            Error::DeserializationFailed { .. } => false,
            Error::ConfigurationError(_) => false,
            Error::SerializationFailed(_) => false,
            Error::InvalidUrl(_) => false,
        }
    }

    /// Returns the service error code for service errors.
    pub fn error_num(&self) -> Option<u32> {
        match self {
            Error::Service(envelope) => Some(envelope.error_num),
            _ => None,
        }
    }

    /// Returns the error envelope, if the failure produced one.
    pub fn envelope(&self) -> Option<&ErrorEnvelope> {
        match self {
            Error::Service(envelope) => Some(envelope),
            Error::MalformedResponse { envelope, .. } => Some(envelope),
            Error::HostsExhausted { last_error, .. } => last_error.envelope(),
            _ => None,
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::DeserializationFailed { status, .. } => Some(*status),
            _ => self.envelope().map(|envelope| envelope.status),
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => self.envelope().map(|envelope| envelope.raw_response.as_str()),
        }
    }
}

/// Downgrades a specific service error into an absent result.
///
/// ```
/// use c8_client::{codes, Error, ErrorEnvelope, GracefulExt};
/// use http::StatusCode;
///
/// let missing: Result<u32, Error> = Err(Error::Service(ErrorEnvelope {
///     status: StatusCode::NOT_FOUND,
///     error_num: codes::DOCUMENT_NOT_FOUND,
///     message: "document not found".to_string(),
///     raw_response: String::new(),
/// }));
/// assert_eq!(missing.absent_on(codes::DOCUMENT_NOT_FOUND).unwrap(), None);
/// ```
pub trait GracefulExt<T> {
    /// Maps a service error carrying `code` to `Ok(None)`; every other outcome passes through.
    fn absent_on(self, code: u32) -> Result<Option<T>>;
}

impl<T> GracefulExt<T> for Result<T> {
    fn absent_on(self, code: u32) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.error_num() == Some(code) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// A specialized `Result` type for dispatched requests.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn service(code: u32) -> Error {
        Error::Service(ErrorEnvelope {
            status: StatusCode::NOT_FOUND,
            error_num: code,
            message: "not found".to_string(),
            raw_response: "{}".to_string(),
        })
    }

    #[test]
    fn test_graceful_absent_on_matching_code() {
        let result: Result<()> = Err(service(codes::DOCUMENT_NOT_FOUND));
        assert!(matches!(result.absent_on(codes::DOCUMENT_NOT_FOUND), Ok(None)));
    }

    #[test]
    fn test_graceful_propagates_other_codes() {
        let result: Result<()> = Err(service(codes::GRAPH_NOT_FOUND));
        let err = result.absent_on(codes::DOCUMENT_NOT_FOUND).unwrap_err();
        assert_eq!(err.error_num(), Some(codes::GRAPH_NOT_FOUND));
    }

    #[test]
    fn test_graceful_ignores_transport_errors() {
        let result: Result<()> = Err(Error::Timeout);
        assert!(matches!(
            result.absent_on(codes::DOCUMENT_NOT_FOUND),
            Err(Error::Timeout)
        ));
    }

    #[test]
    fn test_exhausted_exposes_last_envelope() {
        let malformed = Error::MalformedResponse {
            envelope: ErrorEnvelope {
                status: StatusCode::BAD_GATEWAY,
                error_num: codes::UNKNOWN,
                message: "Bad Gateway".to_string(),
                raw_response: "<html>".to_string(),
            },
            detail: "not a service error document".to_string(),
        };
        let err = Error::HostsExhausted {
            attempts: 2,
            last_error: Box::new(malformed),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(err.raw_response(), Some("<html>"));
        assert_eq!(err.error_num(), None);
    }
}
