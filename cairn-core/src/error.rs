//! Error taxonomy for the protocol engine.
//!
//! Every failure the connection loop has to react to is a variant here, so
//! the loop can decide between "convert to an error response" and "close
//! silently" with one match. Deploy-time wiring and handler bodies use
//! `anyhow` instead; a handler failure is carried into this taxonomy through
//! [`HttpError::HandlerFailed`].

use thiserror::Error;

/// Result type for protocol, routing and connection operations.
pub type HttpResult<T> = std::result::Result<T, HttpError>;

/// Errors raised by the HTTP engine.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request line did not split into exactly three space-separated tokens.
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    /// A non-blank header line without a `:` separator, or an unusable
    /// header value (for example a bad `Content-Length`).
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// Method token outside the supported set.
    #[error("unsupported method: {0:?}")]
    UnsupportedMethod(String),

    /// Anything other than HTTP/1.0 or HTTP/1.1.
    #[error("unsupported protocol version: {0:?}")]
    UnsupportedVersion(String),

    /// Missing or unparsable `Host` header on a request that requires one.
    #[error("invalid Host header: {0}")]
    InvalidHost(String),

    /// Declared `Content-Length` exceeds the configured limit.
    #[error("request body too large: {0} bytes")]
    BodyTooLarge(usize),

    /// `Content-Type` claims multipart but the body cannot be decoded as one.
    #[error("invalid multipart body: {0}")]
    InvalidMultipartBody(String),

    /// The receive timeout elapsed while waiting for request bytes.
    #[error("stream timed out waiting for request bytes")]
    StreamTimeout,

    /// The peer closed the connection before a full request arrived.
    #[error("connection closed by peer")]
    ConnectionClosedByPeer,

    /// No application pattern matched the host/path combination.
    #[error("no application deployed for {0:?}")]
    ApplicationNotFound(String),

    /// The resolved application has no servlet mapping for the path.
    #[error("no handler mapped for {0:?}")]
    HandlerNotFound(String),

    /// A handler ran and returned an error; converted to a 500 response.
    #[error("handler {name:?} failed: {source:#}")]
    HandlerFailed { name: String, source: anyhow::Error },

    /// TLS acceptance failed on an incoming connection.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Underlying socket error that does not fit a more specific variant.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HttpError {
    /// Translate a raw socket read/write error into the taxonomy.
    ///
    /// Timeouts become [`HttpError::StreamTimeout`]; the various flavors of
    /// "peer went away" collapse into [`HttpError::ConnectionClosedByPeer`].
    pub fn from_stream_error(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => HttpError::StreamTimeout,
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => HttpError::ConnectionClosedByPeer,
            _ => HttpError::Io(err),
        }
    }

    /// Transport errors are never converted into a response; the connection
    /// is closed silently and the event logged at debug level.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            HttpError::StreamTimeout
                | HttpError::ConnectionClosedByPeer
                | HttpError::Tls(_)
                | HttpError::Io(_)
        )
    }

    /// Status code of the error response this failure maps to, or `None`
    /// for transport errors (which never produce a response).
    pub fn response_status(&self) -> Option<u16> {
        match self {
            HttpError::MalformedRequestLine(_)
            | HttpError::MalformedHeader(_)
            | HttpError::UnsupportedMethod(_)
            | HttpError::UnsupportedVersion(_)
            | HttpError::InvalidHost(_)
            | HttpError::InvalidMultipartBody(_) => Some(400),
            HttpError::BodyTooLarge(_) => Some(413),
            HttpError::ApplicationNotFound(_) | HttpError::HandlerNotFound(_) => Some(404),
            HttpError::HandlerFailed { .. } => Some(500),
            HttpError::StreamTimeout
            | HttpError::ConnectionClosedByPeer
            | HttpError::Tls(_)
            | HttpError::Io(_) => None,
        }
    }
}
