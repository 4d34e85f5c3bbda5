//! URL validation
//!
//! Runs on the target when it is set and again on every redirect hop.

use crate::error::FetchError;
use crate::options::Options;
use url::Url;

/// Parse user input into a fetch target
///
/// Input without a scheme separator is treated as a plain `http://` URL.
/// The path is never empty; `url` normalizes it to `/` for http(s).
pub fn parse_target(input: &str) -> Result<Url, FetchError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(FetchError::MalformedUri("empty URL".to_string()));
    }

    let candidate = if input.contains("://") {
        input.to_string()
    } else {
        format!("http://{}", input)
    };

    Url::parse(&candidate).map_err(|e| FetchError::MalformedUri(format!("{}: {}", input, e)))
}

/// Check that `url` may be requested under `options`
pub fn validate_url(url: &Url, options: &Options) -> Result<(), FetchError> {
    if url.as_str().is_empty() {
        return Err(FetchError::MalformedUri("empty URL".to_string()));
    }

    let standard_port = match url.scheme() {
        "http" => 80,
        "https" => 443,
        other => return Err(FetchError::BadProtocol(other.to_string())),
    };

    if url.host_str().map_or(true, str::is_empty) {
        return Err(FetchError::MalformedUri(format!("{}: missing host", url)));
    }

    if !options.allow_strange_ports {
        let port = url.port_or_known_default().unwrap_or(standard_port);
        if port != standard_port {
            return Err(FetchError::BadPort(port));
        }
    }

    Ok(())
}

/// Reject redirects that switch scheme (e.g. https -> http)
pub fn validate_redirect(from: &Url, to: &Url) -> Result<(), FetchError> {
    if !from.scheme().eq_ignore_ascii_case(to.scheme()) {
        return Err(FetchError::RedirectProhibited {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(())
}
