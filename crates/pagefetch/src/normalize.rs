//! Text extraction hooks
//!
//! The crate does not try to be an HTML renderer. Decoded page text is handed
//! to a [`TextNormalizer`]; [`PlainText`] is a small tag stripper good enough
//! for tokenizing pages.

use encoding_rs::{Encoding, WINDOWS_1252};

/// Turns decoded page text into cleaned text
pub trait TextNormalizer {
    /// Normalize `text`, which is already decoded to UTF-8
    fn normalize(&self, text: &str) -> String;
}

impl<F> TextNormalizer for F
where
    F: Fn(&str) -> String,
{
    fn normalize(&self, text: &str) -> String {
        self(text)
    }
}

/// Decode `body` using the charset label `charset`
///
/// Unknown labels fall back to windows-1252. A byte order mark overrides the
/// label. Malformed sequences become U+FFFD.
pub fn decode(body: &[u8], charset: &str) -> String {
    let encoding = Encoding::for_label(charset.trim().as_bytes()).unwrap_or(WINDOWS_1252);
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}

/// Strips markup, drops script/style content, decodes common entities and
/// collapses whitespace
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

/// Elements whose content is never text
const SKIP_ELEMENTS: &[&str] = &["script", "style", "noscript", "iframe", "svg"];

/// Elements that start a new line
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "h1", "h2", "h3", "h4", "h5", "h6", "li", "tr", "title",
];

impl TextNormalizer for PlainText {
    fn normalize(&self, html: &str) -> String {
        let mut output = String::new();
        let mut skip_stack: Vec<String> = Vec::new();
        let mut chars = html.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '<' {
                if skip_stack.is_empty() {
                    output.push(decode_entity(c, &mut chars));
                }
                continue;
            }

            let mut tag = String::new();
            for next in chars.by_ref() {
                if next == '>' {
                    break;
                }
                tag.push(next);
            }

            if tag.starts_with("!--") {
                continue;
            }

            let tag_lower = tag.to_lowercase();
            let is_closing = tag_lower.starts_with('/');
            let tag_name = tag_lower
                .trim_start_matches('/')
                .split(|ch: char| ch.is_whitespace() || ch == '/')
                .next()
                .unwrap_or("");

            if SKIP_ELEMENTS.contains(&tag_name) {
                if is_closing {
                    if let Some(pos) = skip_stack.iter().rposition(|t| t == tag_name) {
                        skip_stack.truncate(pos);
                    }
                } else if !tag.ends_with('/') {
                    skip_stack.push(tag_name.to_string());
                }
                continue;
            }

            if skip_stack.is_empty() && BLOCK_ELEMENTS.contains(&tag_name) {
                output.push('\n');
            }
        }

        clean_whitespace(&output)
    }
}

/// Decode an HTML entity starting at `c`, or return `c` unchanged
fn decode_entity(c: char, chars: &mut std::iter::Peekable<std::str::Chars>) -> char {
    if c != '&' {
        return c;
    }

    let mut lookahead = chars.clone();
    let mut entity = String::new();
    loop {
        match lookahead.next() {
            Some(';') => break,
            Some(next) if !next.is_whitespace() && entity.len() < 10 => entity.push(next),
            _ => return '&',
        }
    }

    let decoded = match entity.as_str() {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => entity.strip_prefix('#').and_then(|num| {
            let hex = num.strip_prefix('x').or_else(|| num.strip_prefix('X'));
            let code = match hex {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }),
    };

    match decoded {
        Some(ch) => {
            *chars = lookahead;
            ch
        }
        None => '&',
    }
}

/// Collapse whitespace runs, keep at most one blank line, trim
fn clean_whitespace(s: &str) -> String {
    let mut result = String::new();
    let mut last_was_space = false;
    let mut newline_count = 0;

    for c in s.chars() {
        if c == '\n' {
            if last_was_space && result.ends_with(' ') {
                result.pop();
            }
            newline_count += 1;
            last_was_space = true;
            if newline_count <= 2 {
                result.push(c);
            }
        } else if c.is_whitespace() {
            newline_count = 0;
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
        } else {
            newline_count = 0;
            last_was_space = false;
            result.push(c);
        }
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_with_charset() {
        // "zażółć" in ISO-8859-2
        let bytes = [0x7a, 0x61, 0xbf, 0xf3, 0xb3, 0xe6];
        assert_eq!(decode(&bytes, "iso-8859-2"), "zażółć");
        assert_eq!(decode("zażółć".as_bytes(), "utf-8"), "zażółć");
    }

    #[test]
    fn test_decode_unknown_label_falls_back() {
        assert_eq!(decode(&[0x63, 0x61, 0x66, 0xe9], "bogus"), "café");
    }

    #[test]
    fn test_decode_bom_overrides_label() {
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice("ł".as_bytes());
        assert_eq!(decode(&bytes, "iso-8859-1"), "ł");
    }

    #[test]
    fn test_plain_text_strips_markup() {
        let html = "<html><head><title>T</title><style>p{}</style></head>\
                    <body><p>Hello</p><script>alert('x')</script><p>World</p></body></html>";
        let text = PlainText.normalize(html);
        assert!(text.contains("Hello"));
        assert!(text.contains("World"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("p{}"));
    }

    #[test]
    fn test_plain_text_entities() {
        let text = PlainText.normalize("<p>Tom &amp; Jerry &lt;3 &#65;&#x42; &bogus; a & b</p>");
        assert_eq!(text, "Tom & Jerry <3 AB &bogus; a & b");
    }

    #[test]
    fn test_plain_text_comments_and_whitespace() {
        let text = PlainText.normalize("a<!-- hidden -->   b\n\n\n\n<br/>c");
        assert_eq!(text, "a b\n\nc");
    }

    #[test]
    fn test_closure_normalizer() {
        let upper = |s: &str| s.to_uppercase();
        assert_eq!(upper.normalize("abc"), "ABC");
    }
}
