//! Charset, content type and language heuristics
//!
//! Each value is resolved through a fixed cascade of evidence that stops at
//! the first non-empty answer:
//!
//! - content type and charset: `<meta http-equiv="content-type">` (textual
//!   responses only), then the `Content-Type` header, then defaults. The two
//!   fields are resolved independently.
//! - language: `<meta http-equiv="content-language">`, then `lang` /
//!   `xml:lang` on `<html>` and `<body>` (textual responses only), then the
//!   `Content-Language` header, with the top-level domain table preferred
//!   over a missing or English header, then the default.

use crate::domains::language_for_domain;
use crate::options::Options;
use crate::sniff::{self, Element};
use crate::types::{FetchResult, Headers, PageInfo};
use encoding_rs::Encoding;
use url::Url;

/// Charset prefixes that suggest a national rather than generic page
const NATIONAL_CHARSET_FAMILIES: &[&str] = &["iso", "win", "cp-", "koi", "utf"];

/// Labels `encoding_rs` folds into windows-1252 that name latin1 itself
const LATIN1_LABELS: &[&str] = &[
    "cp819",
    "csisolatin1",
    "ibm819",
    "iso-8859-1",
    "iso-ir-100",
    "iso8859-1",
    "iso88591",
    "iso_8859-1",
    "iso_8859-1:1987",
    "l1",
    "latin1",
];

/// Labels `encoding_rs` folds into windows-1252 that name plain ASCII
const ASCII_LABELS: &[&str] = &["ansi_x3.4-1968", "ascii", "us-ascii"];

/// Attributes consulted for the document language, in precedence order
const LANG_ATTRIBUTES: &[(Element, &str)] = &[
    (Element::Html, "lang"),
    (Element::Html, "xml:lang"),
    (Element::Body, "lang"),
    (Element::Body, "xml:lang"),
];

/// Resolve content type and charset, falling back to the defaults in
/// `options`
pub fn resolve_type_and_charset(fetched: &FetchResult, options: &Options) -> PageInfo {
    let mut content_type = None;
    let mut charset = None;

    if !fetched.body.is_empty() && is_textual(&fetched.headers) {
        if let Some(content) = sniff::meta_http_equiv(&fetched.body, "content-type") {
            content_type = extract_content_type(&content);
            charset = extract_charset(&content);
        }
    }

    let header = fetched.headers.get("content-type");
    if content_type.is_none() {
        content_type = header.and_then(extract_content_type);
    }
    if charset.is_none() {
        charset = header.and_then(extract_charset);
    }

    PageInfo {
        content_type: content_type.unwrap_or_else(|| options.default_content_type.clone()),
        charset: charset.unwrap_or_else(|| options.default_charset.clone()),
    }
}

/// Resolve the document language from markup, headers and domain
///
/// `charset` is the already resolved charset; it gates the domain table.
/// Returns `None` when there is no evidence, leaving the default to the
/// caller.
pub fn resolve_language(fetched: &FetchResult, charset: &str) -> Option<String> {
    let body = &fetched.body[..];

    if !body.is_empty() && is_textual(&fetched.headers) {
        let from_markup = sniff::meta_http_equiv(body, "content-language")
            .and_then(|v| extract_content_language(&v))
            .or_else(|| {
                LANG_ATTRIBUTES.iter().find_map(|(element, attr)| {
                    sniff::element_attribute(body, *element, attr)
                        .and_then(|v| extract_content_language(&v))
                })
            });
        if from_markup.is_some() {
            return from_markup;
        }
    }

    let declared = fetched
        .headers
        .get("content-language")
        .and_then(extract_content_language);

    match declared {
        Some(lang) if !lang.starts_with("en") => Some(lang),
        declared => domain_language(charset, &fetched.final_url)
            .map(str::to_string)
            .or(declared),
    }
}

/// Language implied by the top-level domain of `url`
///
/// Only consulted for national-looking charsets and two-letter domains.
pub fn domain_language(charset: &str, url: &Url) -> Option<&'static str> {
    let family = charset.get(..3)?.to_ascii_lowercase();
    if !NATIONAL_CHARSET_FAMILIES.contains(&family.as_str()) {
        return None;
    }

    let tld = url.domain()?.trim_end_matches('.').rsplit('.').next()?;
    if tld.len() != 2 {
        return None;
    }
    language_for_domain(tld)
}

/// True if the server declared a `text/*` content type
pub fn is_textual(headers: &Headers) -> bool {
    headers
        .get("content-type")
        .and_then(extract_content_type)
        .map_or(false, |ct| ct.split('/').next() == Some("text"))
}

/// MIME type from a `Content-Type`-style value (`text/html; charset=...`)
pub fn extract_content_type(value: &str) -> Option<String> {
    let ctype = value.split(';').next()?.trim().to_ascii_lowercase();
    if ctype.is_empty() || !ctype.contains('/') || ctype.contains('=') {
        return None;
    }
    Some(ctype)
}

/// Charset parameter from a `Content-Type`-style value
///
/// The label must be known to `encoding_rs` and is reported under its standard
/// name (`cp1251` becomes `windows-1251`); latin1 and ASCII labels keep their
/// own names instead of folding into windows-1252.
pub fn extract_charset(value: &str) -> Option<String> {
    value.split(';').find_map(|segment| {
        let (key, label) = segment.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        normalize_charset(label)
    })
}

/// First language tag from a `Content-Language`-style value
pub fn extract_content_language(value: &str) -> Option<String> {
    let lang = value
        .split(';')
        .next()?
        .split(',')
        .next()?
        .trim()
        .to_ascii_lowercase();
    if lang.is_empty() {
        None
    } else {
        Some(lang)
    }
}

fn normalize_charset(label: &str) -> Option<String> {
    let label = label
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_ascii_lowercase();
    if label.is_empty() {
        return None;
    }

    if LATIN1_LABELS.contains(&label.as_str()) {
        return Some("iso-8859-1".to_string());
    }
    if ASCII_LABELS.contains(&label.as_str()) {
        return Some("us-ascii".to_string());
    }
    let encoding = Encoding::for_label(label.as_bytes())?;
    Some(encoding.name().to_ascii_lowercase())
}
