//! Lazily fetched resource
//!
//! A [`Resource`] does no network I/O until one of its async accessors needs
//! the response. The response and every value derived from it are memoized
//! until the target URL changes.

use crate::error::FetchError;
use crate::fetch;
use crate::metadata;
use crate::normalize::{self, TextNormalizer};
use crate::options::Options;
use crate::transport::{HttpTransport, Transport};
use crate::types::{FetchResult, Headers, PageInfo};
use crate::validate::{parse_target, validate_url};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Lifecycle of a memoized value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum SlotState {
    /// Never computed
    #[default]
    Vacant,
    /// Computed for the current target
    Ready,
    /// Computed for a previous target and discarded
    Invalidated,
}

/// Memoized value; `value` is present exactly when `state` is `Ready`
#[derive(Debug, Clone)]
struct Slot<T> {
    state: SlotState,
    value: Option<T>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            state: SlotState::default(),
            value: None,
        }
    }
}

impl<T> Slot<T> {
    fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    fn is_ready(&self) -> bool {
        self.state == SlotState::Ready
    }

    fn insert(&mut self, value: T) -> &T {
        self.state = SlotState::Ready;
        self.value.insert(value)
    }

    /// Move the value out, leaving the slot vacant
    fn take(&mut self) -> Option<T> {
        let value = self.value.take()?;
        self.state = SlotState::Vacant;
        Some(value)
    }

    fn get_or_insert_with(&mut self, init: impl FnOnce() -> T) -> &T {
        self.state = SlotState::Ready;
        self.value.get_or_insert_with(init)
    }

    fn invalidate(&mut self) {
        if self.state != SlotState::Vacant {
            self.state = SlotState::Invalidated;
            self.value = None;
        }
    }
}

/// A single web resource fetched at most once per target
///
/// ```no_run
/// # async fn demo() -> Result<(), pagefetch::FetchError> {
/// let mut page = pagefetch::Resource::new("example.pl")?;
/// println!("{} {}", page.language().await?, page.charset().await?);
/// # Ok(())
/// # }
/// ```
pub struct Resource {
    url: Url,
    options: Options,
    transport: Arc<dyn Transport>,
    fetched: Slot<FetchResult>,
    page_info: Slot<PageInfo>,
    language: Slot<Option<String>>,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("url", &self.url.as_str())
            .field("options", &self.options)
            .field("fetched", &self.fetched.is_ready())
            .finish_non_exhaustive()
    }
}

impl Resource {
    /// Create a resource with built-in default options
    pub fn new(url: &str) -> Result<Self, FetchError> {
        Self::with_options(url, Options::default())
    }

    /// Create a resource with explicit options
    pub fn with_options(url: &str, options: Options) -> Result<Self, FetchError> {
        let transport = Arc::new(HttpTransport::new(&options)?);
        Self::with_transport(url, options, transport)
    }

    /// Create a resource from built-in defaults and JSON overrides
    ///
    /// Fails with [`FetchError::UnknownOptions`] if `overrides` has keys
    /// that are not recognized.
    pub fn with_overrides(url: &str, overrides: &serde_json::Value) -> Result<Self, FetchError> {
        Self::with_options(url, Options::from_value(overrides)?)
    }

    /// Create a resource that performs its requests through `transport`
    pub fn with_transport(
        url: &str,
        options: Options,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, FetchError> {
        let url = parse_target(url)?;
        validate_url(&url, &options)?;
        Ok(Self {
            url,
            options,
            transport,
            fetched: Slot::default(),
            page_info: Slot::default(),
            language: Slot::default(),
        })
    }

    /// Point the resource at a different URL
    ///
    /// Discards the response and all derived values; the next accessor
    /// fetches again. On error the current target is kept.
    pub fn set_url(&mut self, url: &str) -> Result<(), FetchError> {
        let url = parse_target(url)?;
        validate_url(&url, &self.options)?;
        debug!(from = %self.url, to = %url, "Target changed");
        self.url = url;
        self.fetched.invalidate();
        self.page_info.invalidate();
        self.language.invalidate();
        Ok(())
    }

    /// Target URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Options in effect
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Host of the target, lower-cased
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// Port of the target, defaulting to the scheme's standard port
    pub fn port(&self) -> Option<u16> {
        self.url.port_or_known_default()
    }

    /// Path of the target
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Scheme of the target, `http` or `https`
    pub fn protocol(&self) -> &str {
        self.url.scheme()
    }

    /// Top-level domain of the target host
    pub fn domain(&self) -> Option<String> {
        top_level_domain(&self.url)
    }

    /// True once a response is held for the current target
    pub fn is_fetched(&self) -> bool {
        self.fetched.is_ready()
    }

    /// Fetch the resource if that has not happened yet
    ///
    /// A failed fetch leaves the resource unfetched, so calling again
    /// starts over.
    pub async fn fetch(&mut self) -> Result<&FetchResult, FetchError> {
        let Resource {
            ref url,
            ref options,
            ref transport,
            ref mut fetched,
            ..
        } = *self;
        load(fetched, url, options, transport.as_ref()).await
    }

    /// Body bytes
    pub async fn body(&mut self) -> Result<&[u8], FetchError> {
        Ok(&self.fetch().await?.body)
    }

    /// Response headers
    pub async fn headers(&mut self) -> Result<&Headers, FetchError> {
        Ok(&self.fetch().await?.headers)
    }

    /// HTTP status of the final response
    pub async fn status(&mut self) -> Result<u16, FetchError> {
        Ok(self.fetch().await?.status)
    }

    /// URL the content was obtained from, after redirects
    pub async fn real_url(&mut self) -> Result<&Url, FetchError> {
        Ok(&self.fetch().await?.final_url)
    }

    /// Host of the final URL
    pub async fn real_host(&mut self) -> Result<Option<String>, FetchError> {
        Ok(self.real_url().await?.host_str().map(str::to_string))
    }

    /// Port of the final URL, defaulting to the scheme's standard port
    pub async fn real_port(&mut self) -> Result<Option<u16>, FetchError> {
        Ok(self.real_url().await?.port_or_known_default())
    }

    /// Path of the final URL
    pub async fn real_path(&mut self) -> Result<String, FetchError> {
        Ok(self.real_url().await?.path().to_string())
    }

    /// Scheme of the final URL; always equal to [`protocol`](Self::protocol)
    pub async fn real_protocol(&mut self) -> Result<String, FetchError> {
        Ok(self.real_url().await?.scheme().to_string())
    }

    /// Top-level domain of the final URL
    pub async fn real_domain(&mut self) -> Result<Option<String>, FetchError> {
        Ok(top_level_domain(&self.fetch().await?.final_url))
    }

    /// True if the body was cut at the byte limit
    pub async fn truncated(&mut self) -> Result<bool, FetchError> {
        Ok(self.fetch().await?.truncated)
    }

    async fn page_info(&mut self) -> Result<&PageInfo, FetchError> {
        let Resource {
            ref url,
            ref options,
            ref transport,
            ref mut fetched,
            ref mut page_info,
            ..
        } = *self;
        let result = load(fetched, url, options, transport.as_ref()).await?;
        Ok(page_info.get_or_insert_with(|| metadata::resolve_type_and_charset(result, options)))
    }

    /// Charset label, e.g. `utf-8`
    pub async fn charset(&mut self) -> Result<&str, FetchError> {
        Ok(&self.page_info().await?.charset)
    }

    /// Alias for [`charset`](Self::charset)
    pub async fn content_charset(&mut self) -> Result<&str, FetchError> {
        self.charset().await
    }

    /// MIME type, e.g. `text/html`
    pub async fn content_type(&mut self) -> Result<&str, FetchError> {
        Ok(&self.page_info().await?.content_type)
    }

    /// `text` for `text/html`
    pub async fn content_type_major(&mut self) -> Result<Option<&str>, FetchError> {
        Ok(self.page_info().await?.major())
    }

    /// `html` for `text/html`
    pub async fn content_type_minor(&mut self) -> Result<Option<&str>, FetchError> {
        Ok(self.page_info().await?.minor())
    }

    /// Language code, falling back to the configured default
    pub async fn language(&mut self) -> Result<String, FetchError> {
        let default = self.options.default_content_language.clone();
        self.language_or(&default).await
    }

    /// Alias for [`language`](Self::language)
    pub async fn content_language(&mut self) -> Result<String, FetchError> {
        self.language().await
    }

    /// Language code, falling back to `default`
    pub async fn language_or(&mut self, default: &str) -> Result<String, FetchError> {
        let Resource {
            ref url,
            ref options,
            ref transport,
            ref mut fetched,
            ref mut page_info,
            ref mut language,
        } = *self;
        let result = load(fetched, url, options, transport.as_ref()).await?;
        let info = page_info.get_or_insert_with(|| metadata::resolve_type_and_charset(result, options));
        let evidence =
            language.get_or_insert_with(|| metadata::resolve_language(result, &info.charset));
        Ok(evidence.clone().unwrap_or_else(|| default.to_string()))
    }

    /// Body decoded to UTF-8 using the resolved charset
    pub async fn text(&mut self) -> Result<String, FetchError> {
        let charset = self.charset().await?.to_string();
        let body = self.body().await?;
        Ok(normalize::decode(body, &charset))
    }

    /// Decoded body passed through `normalizer`
    pub async fn clean_text<N>(&mut self, normalizer: &N) -> Result<String, FetchError>
    where
        N: TextNormalizer + ?Sized,
    {
        let text = self.text().await?;
        Ok(normalizer.normalize(&text))
    }
}

/// Fill `slot` from the network unless it already holds a response
///
/// A failed fetch leaves the slot empty, so the next call starts over.
async fn load<'a>(
    slot: &'a mut Slot<FetchResult>,
    url: &Url,
    options: &Options,
    transport: &dyn Transport,
) -> Result<&'a FetchResult, FetchError> {
    let result = match slot.take() {
        Some(result) => result,
        None => {
            if slot.state == SlotState::Invalidated {
                debug!(url = %url, "Target changed, fetching again");
            } else {
                debug!(url = %url, "Fetching resource");
            }
            let result = fetch::resolve(url, options, transport).await?;
            debug!(
                final_url = %result.final_url,
                status = result.status,
                bytes = result.body.len(),
                truncated = result.truncated,
                "Fetched resource"
            );
            result
        }
    };
    Ok(slot.insert(result))
}

fn top_level_domain(url: &Url) -> Option<String> {
    url.domain()?
        .trim_end_matches('.')
        .rsplit('.')
        .next()
        .filter(|tld| !tld.is_empty())
        .map(str::to_ascii_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ByteLimit, OverflowPolicy};
    use crate::transport::{Exchange, ExchangeError, RawResponse};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves the same page for every request and counts requests
    struct Fixed {
        headers: Vec<(&'static str, &'static str)>,
        body: &'static str,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(headers: Vec<(&'static str, &'static str)>, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                headers,
                body,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for Fixed {
        async fn exchange(
            &self,
            _url: &Url,
            _limit: ByteLimit,
            _policy: OverflowPolicy,
        ) -> Result<Exchange, ExchangeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Exchange::Complete(RawResponse {
                status: 200,
                headers: self.headers.iter().copied().collect(),
                body: Bytes::from_static(self.body.as_bytes()),
                truncated: false,
            }))
        }
    }

    #[test]
    fn test_slot_states() {
        let mut slot: Slot<u8> = Slot::default();
        assert!(slot.get().is_none());
        slot.invalidate();
        assert_eq!(slot.state, SlotState::Vacant);

        assert_eq!(*slot.get_or_insert_with(|| 1), 1);
        assert_eq!(*slot.get_or_insert_with(|| 2), 1);
        slot.invalidate();
        assert_eq!(slot.state, SlotState::Invalidated);
        assert!(slot.get().is_none());
        assert_eq!(*slot.get_or_insert_with(|| 3), 3);
    }

    #[test]
    fn test_construction_validates() {
        let transport = Fixed::new(vec![], "");
        assert!(matches!(
            Resource::with_transport("", Options::default(), transport.clone()),
            Err(FetchError::MalformedUri(_))
        ));
        assert!(matches!(
            Resource::with_transport("ftp://example.com", Options::default(), transport.clone()),
            Err(FetchError::BadProtocol(_))
        ));
        assert!(matches!(
            Resource::with_transport("example.com:8080", Options::default(), transport.clone()),
            Err(FetchError::BadPort(8080))
        ));
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_unknown_override_keys() {
        let err = Resource::with_overrides(
            "example.com",
            &serde_json::json!({"max_lenght": 5, "redir_retry": 1}),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "unknown options: max_lenght");
    }

    #[test]
    fn test_url_accessors() {
        let page = Resource::with_transport(
            "https://www.Example.PL/a/b",
            Options::default(),
            Fixed::new(vec![], ""),
        )
        .unwrap();
        assert_eq!(page.host(), Some("www.example.pl"));
        assert_eq!(page.port(), Some(443));
        assert_eq!(page.path(), "/a/b");
        assert_eq!(page.protocol(), "https");
        assert_eq!(page.domain(), Some("pl".to_string()));
        assert!(!page.is_fetched());
    }

    #[tokio::test]
    async fn test_metadata_is_memoized() {
        let transport = Fixed::new(
            vec![("content-type", "text/html; charset=utf-8")],
            r#"<html lang="fr"><body>salut</body></html>"#,
        );
        let mut page =
            Resource::with_transport("example.com", Options::default(), transport.clone()).unwrap();

        assert_eq!(page.charset().await.unwrap(), "utf-8");
        assert_eq!(page.charset().await.unwrap(), "utf-8");
        assert_eq!(page.content_type().await.unwrap(), "text/html");
        assert_eq!(page.content_type_major().await.unwrap(), Some("text"));
        assert_eq!(page.content_type_minor().await.unwrap(), Some("html"));
        assert_eq!(page.language().await.unwrap(), "fr");
        assert_eq!(page.content_language().await.unwrap(), "fr");
        assert_eq!(page.status().await.unwrap(), 200);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_language_defaults() {
        let transport = Fixed::new(vec![("content-type", "text/plain")], "plain");
        let options = Options {
            default_content_language: "eo".to_string(),
            ..Default::default()
        };
        let mut page = Resource::with_transport("example.com", options, transport).unwrap();

        assert_eq!(page.language().await.unwrap(), "eo");
        assert_eq!(page.language_or("la").await.unwrap(), "la");
    }

    #[tokio::test]
    async fn test_set_url_resets_everything() {
        let transport = Fixed::new(vec![("content-type", "text/html")], "<p>x</p>");
        let mut page =
            Resource::with_transport("example.com", Options::default(), transport.clone()).unwrap();

        page.body().await.unwrap();
        page.charset().await.unwrap();
        page.language().await.unwrap();
        assert_eq!(transport.calls(), 1);

        page.set_url("example.org/other").unwrap();
        assert!(!page.is_fetched());
        assert_eq!(page.page_info.state, SlotState::Invalidated);
        assert_eq!(page.language.state, SlotState::Invalidated);

        assert_eq!(
            page.real_url().await.unwrap().as_str(),
            "http://example.org/other"
        );
        assert_eq!(page.real_host().await.unwrap().as_deref(), Some("example.org"));
        assert_eq!(page.real_port().await.unwrap(), Some(80));
        assert_eq!(page.real_path().await.unwrap(), "/other");
        assert_eq!(page.real_protocol().await.unwrap(), "http");
        assert_eq!(page.real_domain().await.unwrap().as_deref(), Some("org"));
        page.headers().await.unwrap();
        page.charset().await.unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_set_url_rejects_and_keeps_state() {
        let transport = Fixed::new(vec![], "body");
        let mut page =
            Resource::with_transport("example.com", Options::default(), transport.clone()).unwrap();
        page.body().await.unwrap();

        assert!(page.set_url("gopher://example.com").is_err());
        assert!(page.is_fetched());
        assert_eq!(page.url().as_str(), "http://example.com/");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_text_and_clean_text() {
        let transport = Fixed::new(
            vec![("content-type", "text/html; charset=utf-8")],
            "<html><body><h1>Za\u{17c}\u{f3}\u{142}\u{107}</h1><script>x()</script></body></html>",
        );
        let mut page = Resource::with_transport("example.pl", Options::default(), transport).unwrap();

        assert!(page.text().await.unwrap().contains("<h1>"));
        assert_eq!(
            page.clean_text(&normalize::PlainText).await.unwrap(),
            "Zażółć"
        );
    }
}
