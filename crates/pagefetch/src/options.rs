//! Fetch options and limits
//!
//! [`Options`] is resolved once, when a [`Resource`](crate::Resource) is
//! built, and never changes afterwards. Partial updates arrive as
//! [`OptionOverrides`], usually deserialized from JSON, and are merged into a
//! base set of options with [`Options::merged`].

use crate::error::FetchError;
use crate::DEFAULT_USER_AGENT;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Option keys accepted by [`OptionOverrides::from_value`]
pub const KNOWN_OPTIONS: &[&str] = &[
    "redir_retry",
    "conn_retry",
    "open_timeout",
    "read_timeout",
    "total_timeout",
    "max_length",
    "allow_strange_ports",
    "ignore_content_overflows",
    "verify_certificates",
    "user_agent",
    "default_content_language",
    "default_content_type",
    "default_charset",
];

/// Number of redirects or connection retries allowed
///
/// Serialized as a number, or `null` for no limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Budget {
    /// At most this many
    Limited(u32),
    /// No limit
    Unbounded,
}

impl Budget {
    /// Consume one unit; returns false when nothing is left
    pub fn try_spend(&mut self) -> bool {
        match self {
            Budget::Limited(0) => false,
            Budget::Limited(left) => {
                *left -= 1;
                true
            }
            Budget::Unbounded => true,
        }
    }

    /// The configured limit, if any
    pub fn limit(&self) -> Option<u32> {
        match self {
            Budget::Limited(n) => Some(*n),
            Budget::Unbounded => None,
        }
    }
}

/// Maximum number of body bytes kept
///
/// Serialized as a number, or `null` for no limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ByteLimit {
    /// At most this many bytes
    Limited(u64),
    /// No limit
    Unbounded,
}

impl ByteLimit {
    /// The limit in bytes, if any
    pub fn bytes(&self) -> Option<u64> {
        match self {
            ByteLimit::Limited(n) => Some(*n),
            ByteLimit::Unbounded => None,
        }
    }
}

/// What happens when a response is larger than the byte limit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Fail with a size error
    #[default]
    Abort,
    /// Keep the first `limit` bytes and succeed
    Truncate,
}

/// Resolved fetch options
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Maximum number of redirect hops (`redir_retry`)
    pub redirect_budget: Budget,
    /// Maximum number of connection retries (`conn_retry`)
    pub retry_budget: Budget,
    /// Time allowed for opening a connection
    pub open_timeout: Option<Duration>,
    /// Time allowed for a single read
    pub read_timeout: Option<Duration>,
    /// Time allowed for the whole fetch, all redirects and retries included
    pub total_timeout: Option<Duration>,
    /// Body byte limit (`max_length`)
    pub max_length: ByteLimit,
    /// Abort or truncate on oversized content (`ignore_content_overflows`)
    pub overflow: OverflowPolicy,
    /// Permit ports other than 80/443
    pub allow_strange_ports: bool,
    /// Verify TLS certificates
    pub verify_certificates: bool,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Language used when no evidence is found
    pub default_content_language: String,
    /// Content type used when no evidence is found
    pub default_content_type: String,
    /// Charset used when no evidence is found
    pub default_charset: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            redirect_budget: Budget::Limited(8),
            retry_budget: Budget::Limited(3),
            open_timeout: Some(Duration::from_secs(15)),
            read_timeout: Some(Duration::from_secs(10)),
            total_timeout: Some(Duration::from_secs(30)),
            max_length: ByteLimit::Limited(512 * 1024),
            overflow: OverflowPolicy::Abort,
            allow_strange_ports: false,
            verify_certificates: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_content_language: "en".to_string(),
            default_content_type: "text/html".to_string(),
            default_charset: "iso-8859-1".to_string(),
        }
    }
}

impl Options {
    /// Build options from built-in defaults and a JSON object of overrides
    pub fn from_value(value: &serde_json::Value) -> Result<Self, FetchError> {
        Self::default().merged(&OptionOverrides::from_value(value)?)
    }

    /// Return a copy of these options with `overrides` applied
    pub fn merged(&self, overrides: &OptionOverrides) -> Result<Self, FetchError> {
        let mut merged = self.clone();

        if let Some(budget) = overrides.redir_retry {
            merged.redirect_budget = budget;
        }
        if let Some(budget) = overrides.conn_retry {
            merged.retry_budget = budget;
        }
        if let Some(secs) = overrides.open_timeout {
            merged.open_timeout = seconds("open_timeout", secs)?;
        }
        if let Some(secs) = overrides.read_timeout {
            merged.read_timeout = seconds("read_timeout", secs)?;
        }
        if let Some(secs) = overrides.total_timeout {
            merged.total_timeout = seconds("total_timeout", secs)?;
        }
        if let Some(limit) = overrides.max_length {
            merged.max_length = limit;
        }
        if let Some(ignore) = overrides.ignore_content_overflows {
            merged.overflow = if ignore {
                OverflowPolicy::Truncate
            } else {
                OverflowPolicy::Abort
            };
        }
        if let Some(allow) = overrides.allow_strange_ports {
            merged.allow_strange_ports = allow;
        }
        if let Some(verify) = overrides.verify_certificates {
            merged.verify_certificates = verify;
        }
        if let Some(ref ua) = overrides.user_agent {
            merged.user_agent = ua.clone();
        }
        if let Some(ref lang) = overrides.default_content_language {
            merged.default_content_language = non_empty("default_content_language", lang)?;
        }
        if let Some(ref ctype) = overrides.default_content_type {
            merged.default_content_type = non_empty("default_content_type", ctype)?;
        }
        if let Some(ref charset) = overrides.default_charset {
            merged.default_charset = non_empty("default_charset", charset)?;
        }

        Ok(merged)
    }
}

/// Partial options, as supplied by callers
///
/// Every field is optional; absent fields keep the base value. For
/// `redir_retry`, `conn_retry` and `max_length` an explicit `null` means
/// "no limit". Timeouts are in seconds and `0` disables them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct OptionOverrides {
    /// Maximum redirect hops, `null` for unlimited
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<Budget>")]
    pub redir_retry: Option<Budget>,

    /// Maximum connection retries, `null` for unlimited
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<Budget>")]
    pub conn_retry: Option<Budget>,

    /// Seconds to wait for a connection, 0 disables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_timeout: Option<f64>,

    /// Seconds to wait for a single read, 0 disables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout: Option<f64>,

    /// Seconds allowed for the whole fetch, 0 disables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_timeout: Option<f64>,

    /// Body byte limit, `null` for unlimited
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<ByteLimit>")]
    pub max_length: Option<ByteLimit>,

    /// Permit ports other than 80/443
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_strange_ports: Option<bool>,

    /// Truncate oversized content instead of failing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_content_overflows: Option<bool>,

    /// Verify TLS certificates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_certificates: Option<bool>,

    /// User-Agent header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Fallback language code
    #[serde(
        default,
        deserialize_with = "lowercase",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<String>")]
    pub default_content_language: Option<String>,

    /// Fallback content type
    #[serde(
        default,
        deserialize_with = "lowercase",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<String>")]
    pub default_content_type: Option<String>,

    /// Fallback charset
    #[serde(
        default,
        deserialize_with = "lowercase",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<String>")]
    pub default_charset: Option<String>,
}

impl OptionOverrides {
    /// Parse overrides from a JSON object
    ///
    /// Every unrecognized key is reported at once in
    /// [`FetchError::UnknownOptions`].
    pub fn from_value(value: &serde_json::Value) -> Result<Self, FetchError> {
        let map = value.as_object().ok_or_else(|| {
            FetchError::InvalidOptions("malformed options: expected a JSON object".to_string())
        })?;

        let unknown: Vec<String> = map
            .keys()
            .filter(|key| !KNOWN_OPTIONS.contains(&key.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(FetchError::UnknownOptions(unknown));
        }

        Self::deserialize(value).map_err(|e| FetchError::InvalidOptions(e.to_string()))
    }

    /// JSON schema describing the accepted overrides
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(OptionOverrides);
        serde_json::to_value(schema).unwrap_or_default()
    }
}

/// Deserialize a field that is present, so `null` reaches `T` instead of
/// collapsing into `None`
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn lowercase<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|s| s.trim().to_lowercase()))
}

fn seconds(name: &str, secs: f64) -> Result<Option<Duration>, FetchError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(FetchError::InvalidOptions(format!(
            "{name} must be a non-negative number of seconds"
        )));
    }
    if secs == 0.0 {
        return Ok(None);
    }
    Duration::try_from_secs_f64(secs)
        .map(Some)
        .map_err(|e| FetchError::InvalidOptions(format!("{name}: {e}")))
}

fn non_empty(name: &str, value: &str) -> Result<String, FetchError> {
    if value.is_empty() {
        return Err(FetchError::InvalidOptions(format!("{name} must not be empty")));
    }
    Ok(value.to_string())
}
