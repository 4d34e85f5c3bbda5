//! Single request/response exchange with a byte limit
//!
//! Design: a [`Transport`] performs exactly one HTTP exchange and never
//! follows redirects itself. It reports the outcome as a closed set of
//! [`Exchange`] and [`ExchangeError`] values so the fetch loop can decide
//! between redirecting, retrying and failing by matching on them.

use crate::error::FetchError;
use crate::options::{ByteLimit, Options, OverflowPolicy};
use crate::types::Headers;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, LOCATION};
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

/// A successful (2xx) response
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Headers,
    /// Body, at most `limit` bytes long
    pub body: Bytes,
    /// True if bytes beyond the limit were dropped
    pub truncated: bool,
}

/// Outcome of one exchange
#[derive(Debug, Clone)]
pub enum Exchange {
    /// The server answered with content
    Complete(RawResponse),
    /// The server pointed somewhere else
    Redirect {
        /// Redirect status code
        status: u16,
        /// Raw `Location` header value, possibly relative
        location: String,
    },
}

/// Why one exchange failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// Connection-level failure worth another attempt
    Retriable(String),
    /// Connect or read timeout
    Timeout(String),
    /// Protocol failure or unwanted status
    Fatal(String),
    /// Declared Content-Length exceeds the limit
    ContentTooBig { declared: u64, limit: u64 },
    /// More bytes arrived than the limit allows
    ContentOverflow { limit: u64 },
}

impl ExchangeError {
    /// Classify a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else if err.is_connect() || err.is_body() || err.is_request() {
            ExchangeError::Retriable(err.to_string())
        } else {
            ExchangeError::Fatal(err.to_string())
        }
    }
}

/// Performs single HTTP exchanges
///
/// Implementations must not follow redirects and must honor `limit` and
/// `policy` as described on [`HttpTransport`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Request `url` once
    async fn exchange(
        &self,
        url: &Url,
        limit: ByteLimit,
        policy: OverflowPolicy,
    ) -> Result<Exchange, ExchangeError>;
}

/// reqwest-backed transport
///
/// - 3xx with `Location` becomes [`Exchange::Redirect`]
/// - 3xx without `Location` is retriable
/// - any other non-2xx status is fatal
/// - under [`OverflowPolicy::Abort`] an oversized declared length fails
///   before the body is read, and an oversized body fails once the limit is
///   crossed; under [`OverflowPolicy::Truncate`] the body is cut at the limit
///
/// The response is dropped on every return path, which releases the
/// connection.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport using the timeouts and TLS settings of `options`
    pub fn new(options: &Options) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(options.user_agent.as_str())
            .redirect(Policy::none());

        if let Some(timeout) = options.open_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = options.read_timeout {
            builder = builder.read_timeout(timeout);
        }
        if !options.verify_certificates {
            warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(FetchError::ClientBuild)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(
        &self,
        url: &Url,
        limit: ByteLimit,
        policy: OverflowPolicy,
    ) -> Result<Exchange, ExchangeError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(ExchangeError::from_reqwest)?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "Received response");

        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            return match location {
                Some(location) => Ok(Exchange::Redirect {
                    status: status.as_u16(),
                    location: location.to_string(),
                }),
                None => Err(ExchangeError::Retriable(format!(
                    "{} without Location header",
                    status
                ))),
            };
        }

        if !status.is_success() {
            return Err(ExchangeError::Fatal(status_message(status)));
        }

        let headers = Headers::from_header_map(response.headers());

        if policy == OverflowPolicy::Abort {
            if let Some(max) = limit.bytes() {
                let declared: Option<u64> = response
                    .headers()
                    .get(CONTENT_LENGTH)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse().ok());
                if let Some(declared) = declared.filter(|&d| d > max) {
                    return Err(ExchangeError::ContentTooBig {
                        declared,
                        limit: max,
                    });
                }
            }
        }

        let (body, truncated) = read_body_limited(response, limit, policy).await?;

        Ok(Exchange::Complete(RawResponse {
            status: status.as_u16(),
            headers,
            body,
            truncated,
        }))
    }
}

fn status_message(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

/// Stream the body, counting bytes against `limit`
async fn read_body_limited(
    response: reqwest::Response,
    limit: ByteLimit,
    policy: OverflowPolicy,
) -> Result<(Bytes, bool), ExchangeError> {
    let mut body = BytesMut::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ExchangeError::from_reqwest)?;

        if let Some(max) = limit.bytes() {
            let room = usize::try_from(max.saturating_sub(body.len() as u64)).unwrap_or(usize::MAX);
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                return match policy {
                    OverflowPolicy::Abort => Err(ExchangeError::ContentOverflow { limit: max }),
                    OverflowPolicy::Truncate => {
                        warn!(limit = max, "Body exceeds limit, truncating");
                        Ok((body.freeze(), true))
                    }
                };
            }
        }

        body.extend_from_slice(&chunk);
    }

    Ok((body.freeze(), false))
}
