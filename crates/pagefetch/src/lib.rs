//! PageFetch - lazy web resource fetching with metadata detection
//!
//! A [`Resource`] names a single http/https document. Nothing is fetched
//! until the body, headers or metadata are first asked for; after that the
//! response is kept until the target URL changes.
//!
//! ## Fetching
//!
//! Redirects and connection retries are driven by the crate itself so that
//! every hop is validated and counted:
//! - [`Options::redirect_budget`] limits redirect hops
//! - [`Options::retry_budget`] limits retries of failed connections
//! - [`Options::total_timeout`] bounds the whole fetch
//! - [`Options::max_length`] bounds the body, which is aborted or truncated
//!   depending on [`Options::overflow`]
//!
//! A redirect that changes the scheme is always rejected.
//!
//! ## Metadata
//!
//! Content type, charset and language are read from the markup first, then
//! from response headers, then from the top-level domain (language only),
//! and finally from configured defaults.
//!
//! ```no_run
//! # async fn demo() -> Result<(), pagefetch::FetchError> {
//! use pagefetch::{PlainText, ResourceFactory};
//!
//! let mut factory = ResourceFactory::new();
//! factory.configure_json(&serde_json::json!({"redir_retry": 3}))?;
//!
//! let mut page = factory.resource("https://example.com")?;
//! let content_type = page.content_type().await?.to_string();
//! println!("{} {}", content_type, page.language().await?);
//! println!("{}", page.clean_text(&PlainText).await?);
//! # Ok(())
//! # }
//! ```

mod domains;
mod error;
mod factory;
pub mod fetch;
pub mod metadata;
mod normalize;
mod options;
mod resource;
mod sniff;
pub mod transport;
mod types;
mod validate;

pub use domains::language_for_domain;
pub use error::{ErrorKind, FetchError};
pub use factory::ResourceFactory;
pub use normalize::{decode, PlainText, TextNormalizer};
pub use options::{Budget, ByteLimit, OptionOverrides, Options, OverflowPolicy, KNOWN_OPTIONS};
pub use resource::Resource;
pub use transport::{Exchange, ExchangeError, HttpTransport, RawResponse, Transport};
pub use types::{FetchResult, Headers, PageInfo};
pub use validate::{parse_target, validate_redirect, validate_url};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "pagefetch/0.1";
