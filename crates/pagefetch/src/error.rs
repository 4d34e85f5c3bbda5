//! Error types for pagefetch

use thiserror::Error;

/// Family an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Byte limit was hit
    Size,
    /// Retry, redirect or time budget ran out
    Connection,
    /// The URL (or a redirect target) must not be requested
    Uri,
    /// Options were rejected
    Argument,
    /// Any other transport or protocol failure
    Generic,
}

/// Errors that can occur while fetching a resource
#[derive(Debug, Error)]
pub enum FetchError {
    /// Declared Content-Length exceeds the byte limit
    #[error("content length ({declared}) is bigger than {limit} bytes")]
    ContentTooBig { declared: u64, limit: u64 },

    /// Data actually read exceeds the byte limit
    #[error("read data size exceeds {limit} bytes, aborting")]
    ContentOverflow { limit: u64 },

    /// Connection retry budget exhausted
    #[error("too many connection attempts: {0}")]
    TooManyConnections(String),

    /// Redirect budget exhausted
    #[error("too many redirects (limit {limit})")]
    TooManyRedirects { limit: u32 },

    /// A timeout elapsed
    #[error("timed out: {0}")]
    Timeout(String),

    /// URL is empty or cannot be parsed
    #[error("malformed URI: {0}")]
    MalformedUri(String),

    /// URL scheme is not http or https
    #[error("bad protocol: {0}")]
    BadProtocol(String),

    /// Port is not the standard one for the scheme
    #[error("strange port number: {0}")]
    BadPort(u16),

    /// Redirect would change the scheme
    #[error("redirect prohibited: {from} -> {to}")]
    RedirectProhibited { from: String, to: String },

    /// Options contain keys that are not recognized
    #[error("unknown options: {}", .0.join(", "))]
    UnknownOptions(Vec<String>),

    /// Options have the wrong shape or value types
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    /// Any other transport or protocol failure
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}

impl FetchError {
    /// Family this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::ContentTooBig { .. } | FetchError::ContentOverflow { .. } => {
                ErrorKind::Size
            }
            FetchError::TooManyConnections(_)
            | FetchError::TooManyRedirects { .. }
            | FetchError::Timeout(_) => ErrorKind::Connection,
            FetchError::MalformedUri(_)
            | FetchError::BadProtocol(_)
            | FetchError::BadPort(_)
            | FetchError::RedirectProhibited { .. } => ErrorKind::Uri,
            FetchError::UnknownOptions(_) | FetchError::InvalidOptions(_) => ErrorKind::Argument,
            FetchError::ClientBuild(_) | FetchError::ConnectionFailed(_) => ErrorKind::Generic,
        }
    }

    /// True for byte-limit failures
    pub fn is_size(&self) -> bool {
        self.kind() == ErrorKind::Size
    }

    /// True for errors that reject the URL itself
    pub fn is_uri(&self) -> bool {
        self.kind() == ErrorKind::Uri
    }
}
