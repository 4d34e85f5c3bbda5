//! Core types for pagefetch

use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde::Serialize;
use std::collections::BTreeMap;
use url::Url;

/// Response headers keyed by lower-cased name
///
/// Values are kept as raw strings; when a header repeats, the last value
/// wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    /// Create an empty header set
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect headers from a reqwest header map
    pub fn from_header_map(map: &HeaderMap) -> Self {
        let mut headers = Self::new();
        for (name, value) in map.iter() {
            headers.insert(name.as_str(), &String::from_utf8_lossy(value.as_bytes()));
        }
        headers
    }

    /// Insert a header, replacing any earlier value for the same name
    pub fn insert(&mut self, name: &str, value: &str) {
        self.0.insert(name.to_ascii_lowercase(), value.to_string());
    }

    /// Look up a header by name, case-insensitively
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of distinct header names
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no headers
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name.as_ref(), value.as_ref());
        }
        headers
    }
}

/// Outcome of a completed fetch
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URL the content was actually obtained from, after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Headers,
    /// Body bytes, never longer than the byte limit
    pub body: Bytes,
    /// True if the body was cut at the byte limit
    pub truncated: bool,
}

/// Content type and charset resolved for a fetched resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    /// MIME type, e.g. `text/html`
    pub content_type: String,
    /// Charset label, e.g. `utf-8`
    pub charset: String,
}

impl PageInfo {
    /// Major part of the content type (`text` for `text/html`)
    pub fn major(&self) -> Option<&str> {
        self.content_type
            .split('/')
            .next()
            .filter(|part| !part.is_empty())
    }

    /// Minor part of the content type (`html` for `text/html`)
    pub fn minor(&self) -> Option<&str> {
        self.content_type
            .split('/')
            .nth(1)
            .filter(|part| !part.is_empty())
    }
}
