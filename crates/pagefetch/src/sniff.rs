//! Bounded markup sniffing
//!
//! Finds a handful of tags and attributes in raw body bytes without building
//! a document. Patterns are compiled by the `regex` crate, so matching is
//! linear in the body length. Anything malformed simply yields `None`.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

static META_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i-u)<meta\s[^>]*>").expect("valid meta pattern"));

static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i-u)<x?html\s[^>]*>").expect("valid html pattern"));

static BODY_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i-u)<body\s[^>]*>").expect("valid body pattern"));

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i-u)([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid attribute pattern")
});

/// Root element whose `lang` attributes are inspected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Html,
    Body,
}

/// `content` of the first `<meta http-equiv="...">` whose http-equiv equals
/// `equiv` (case-insensitive)
pub fn meta_http_equiv(body: &[u8], equiv: &str) -> Option<String> {
    META_TAG.find_iter(body).find_map(|tag| {
        let tag = tag.as_bytes();
        let matches = attribute(tag, "http-equiv")
            .map(|v| v.trim().eq_ignore_ascii_case(equiv))
            .unwrap_or(false);
        if matches {
            attribute(tag, "content").filter(|v| !v.trim().is_empty())
        } else {
            None
        }
    })
}

/// Value of `name` on the first opening tag of `element`
pub fn element_attribute(body: &[u8], element: Element, name: &str) -> Option<String> {
    let pattern = match element {
        Element::Html => &*HTML_TAG,
        Element::Body => &*BODY_TAG,
    };
    let tag = pattern.find(body)?;
    attribute(tag.as_bytes(), name).filter(|v| !v.trim().is_empty())
}

/// Value of attribute `name` inside a single tag
fn attribute(tag: &[u8], name: &str) -> Option<String> {
    ATTRIBUTE.captures_iter(tag).find_map(|caps| {
        let key = caps.get(1)?.as_bytes();
        if !key.eq_ignore_ascii_case(name.as_bytes()) {
            return None;
        }
        let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4))?;
        let value = String::from_utf8_lossy(value.as_bytes());
        Some(value.trim_end_matches('/').trim().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_double_quoted() {
        let body = br#"<html><head><meta http-equiv="Content-Type" content="text/html; charset=ISO-8859-2"></head></html>"#;
        assert_eq!(
            meta_http_equiv(body, "content-type"),
            Some("text/html; charset=ISO-8859-2".to_string())
        );
    }

    #[test]
    fn test_meta_single_and_unquoted() {
        let body = b"<META HTTP-EQUIV='content-language' CONTENT='de'>";
        assert_eq!(meta_http_equiv(body, "content-language"), Some("de".to_string()));

        let body = b"<meta http-equiv=content-type content=text/html;charset=utf-8 />";
        assert_eq!(
            meta_http_equiv(body, "content-type"),
            Some("text/html;charset=utf-8".to_string())
        );
    }

    #[test]
    fn test_meta_attribute_order_does_not_matter() {
        let body = br#"<meta content="text/plain; charset=koi8-r" http-equiv="content-type">"#;
        assert_eq!(
            meta_http_equiv(body, "content-type"),
            Some("text/plain; charset=koi8-r".to_string())
        );
    }

    #[test]
    fn test_meta_skips_other_equivs() {
        let body = br#"<meta http-equiv="refresh" content="5"><meta http-equiv="content-language" content="pl">"#;
        assert_eq!(meta_http_equiv(body, "content-language"), Some("pl".to_string()));
        assert_eq!(meta_http_equiv(body, "content-type"), None);
    }

    #[test]
    fn test_meta_without_content_is_empty() {
        let body = br#"<meta http-equiv="content-type" content="">"#;
        assert_eq!(meta_http_equiv(body, "content-type"), None);
        let body = br#"<meta http-equiv="content-type" content="text/html"#;
        assert_eq!(meta_http_equiv(body, "content-type"), None);
    }

    #[test]
    fn test_html_lang_and_xml_lang_are_distinct() {
        let body = br#"<!DOCTYPE html><html xml:lang="de" lang="fr"><body>"#;
        assert_eq!(
            element_attribute(body, Element::Html, "lang"),
            Some("fr".to_string())
        );
        assert_eq!(
            element_attribute(body, Element::Html, "xml:lang"),
            Some("de".to_string())
        );

        let body = br#"<html xml:lang="de">"#;
        assert_eq!(element_attribute(body, Element::Html, "lang"), None);
    }

    #[test]
    fn test_body_lang() {
        let body = br#"<html><head></head><BODY class=x LANG=es>"#;
        assert_eq!(element_attribute(body, Element::Html, "lang"), None);
        assert_eq!(
            element_attribute(body, Element::Body, "lang"),
            Some("es".to_string())
        );
    }

    #[test]
    fn test_xhtml_root() {
        let body = br#"<xhtml lang='cs'>"#;
        assert_eq!(
            element_attribute(body, Element::Html, "lang"),
            Some("cs".to_string())
        );
    }

    #[test]
    fn test_non_utf8_bytes_tolerated() {
        let mut body = b"<html lang=\"pl\"><body>".to_vec();
        body.extend_from_slice(&[0xb1, 0xea, 0xff]);
        assert_eq!(
            element_attribute(&body, Element::Html, "lang"),
            Some("pl".to_string())
        );
    }
}
