//! Redirect/retry loop under a single deadline
//!
//! [`resolve`] drives a [`Transport`] until it either produces content or a
//! budget runs out:
//!
//! ```text
//! Idle -> Attempting -> Succeeded
//!            ^   |----> RedirectPending --|
//!            |   |----> RetryPending -----|
//!            |   '----> Failed            |
//!            '----------------------------'
//! ```
//!
//! The whole loop, backoff sleeps included, runs under `total_timeout`.

use crate::error::FetchError;
use crate::options::Options;
use crate::transport::{Exchange, ExchangeError, Transport};
use crate::types::FetchResult;
use crate::validate::{validate_redirect, validate_url};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Pause between connection retries
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Fetch `target`, following redirects and retrying failed connections
pub async fn resolve(
    target: &Url,
    options: &Options,
    transport: &dyn Transport,
) -> Result<FetchResult, FetchError> {
    match options.total_timeout {
        Some(total) => tokio::time::timeout(total, attempt_loop(target, options, transport))
            .await
            .map_err(|_| {
                FetchError::Timeout(format!("no complete response within {:?}", total))
            })?,
        None => attempt_loop(target, options, transport).await,
    }
}

async fn attempt_loop(
    target: &Url,
    options: &Options,
    transport: &dyn Transport,
) -> Result<FetchResult, FetchError> {
    let mut url = target.clone();
    let mut redirects = options.redirect_budget;
    let mut retries = options.retry_budget;

    loop {
        debug!(url = %url, "Attempting fetch");

        match transport
            .exchange(&url, options.max_length, options.overflow)
            .await
        {
            Ok(Exchange::Complete(response)) => {
                return Ok(FetchResult {
                    final_url: url,
                    status: response.status,
                    headers: response.headers,
                    body: response.body,
                    truncated: response.truncated,
                });
            }
            Ok(Exchange::Redirect { status, location }) => {
                let next = url.join(&location).map_err(|e| {
                    FetchError::MalformedUri(format!("bad redirect location {:?}: {}", location, e))
                })?;
                validate_redirect(&url, &next)?;
                validate_url(&next, options)?;
                if !redirects.try_spend() {
                    return Err(FetchError::TooManyRedirects {
                        limit: options.redirect_budget.limit().unwrap_or_default(),
                    });
                }
                debug!(status, from = %url, to = %next, "Following redirect");
                url = next;
            }
            Err(ExchangeError::Retriable(message)) => {
                if !retries.try_spend() {
                    return Err(FetchError::TooManyConnections(message));
                }
                debug!(url = %url, error = %message, "Connection failed, retrying");
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            Err(ExchangeError::Timeout(message)) => return Err(FetchError::Timeout(message)),
            Err(ExchangeError::Fatal(message)) => {
                return Err(FetchError::ConnectionFailed(message))
            }
            Err(ExchangeError::ContentTooBig { declared, limit }) => {
                return Err(FetchError::ContentTooBig { declared, limit })
            }
            Err(ExchangeError::ContentOverflow { limit }) => {
                return Err(FetchError::ContentOverflow { limit })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Budget, ByteLimit, OverflowPolicy};
    use crate::transport::RawResponse;
    use crate::types::Headers;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed list of outcomes and records requested URLs
    struct Script {
        steps: Mutex<VecDeque<Result<Exchange, ExchangeError>>>,
        seen: Mutex<Vec<String>>,
    }

    impl Script {
        fn new(steps: Vec<Result<Exchange, ExchangeError>>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for Script {
        async fn exchange(
            &self,
            url: &Url,
            _limit: ByteLimit,
            _policy: OverflowPolicy,
        ) -> Result<Exchange, ExchangeError> {
            self.seen.lock().unwrap().push(url.to_string());
            self.steps
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ExchangeError::Fatal("script exhausted".into())))
        }
    }

    fn ok(body: &str) -> Result<Exchange, ExchangeError> {
        Ok(Exchange::Complete(RawResponse {
            status: 200,
            headers: Headers::new(),
            body: Bytes::from(body.to_string()),
            truncated: false,
        }))
    }

    fn redirect(location: &str) -> Result<Exchange, ExchangeError> {
        Ok(Exchange::Redirect {
            status: 302,
            location: location.to_string(),
        })
    }

    fn target(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let script = Script::new(vec![ok("hello")]);
        let result = resolve(&target("http://a.example/"), &Options::default(), &script)
            .await
            .unwrap();

        assert_eq!(result.final_url.as_str(), "http://a.example/");
        assert_eq!(result.body, Bytes::from("hello"));
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_redirects_within_budget() {
        let script = Script::new(vec![
            redirect("/one"),
            redirect("http://b.example/two"),
            ok("done"),
        ]);
        let options = Options {
            redirect_budget: Budget::Limited(2),
            ..Default::default()
        };
        let result = resolve(&target("http://a.example/"), &options, &script)
            .await
            .unwrap();

        assert_eq!(result.final_url.as_str(), "http://b.example/two");
        assert_eq!(
            script.seen(),
            vec![
                "http://a.example/",
                "http://a.example/one",
                "http://b.example/two"
            ]
        );
    }

    #[tokio::test]
    async fn test_redirect_budget_exceeded() {
        let script = Script::new(vec![redirect("/1"), redirect("/2"), redirect("/3")]);
        let options = Options {
            redirect_budget: Budget::Limited(2),
            ..Default::default()
        };
        let err = resolve(&target("http://a.example/"), &options, &script)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::TooManyRedirects { limit: 2 }));
        assert_eq!(script.seen().len(), 3);
    }

    #[tokio::test]
    async fn test_zero_redirect_budget() {
        let script = Script::new(vec![redirect("/elsewhere")]);
        let options = Options {
            redirect_budget: Budget::Limited(0),
            ..Default::default()
        };
        let err = resolve(&target("http://a.example/"), &options, &script)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TooManyRedirects { limit: 0 }));
    }

    #[tokio::test]
    async fn test_scheme_downgrade_prohibited_regardless_of_budget() {
        for budget in [Budget::Limited(0), Budget::Limited(5), Budget::Unbounded] {
            let script = Script::new(vec![redirect("http://a.example/plain")]);
            let options = Options {
                redirect_budget: budget,
                ..Default::default()
            };
            let err = resolve(&target("https://a.example/"), &options, &script)
                .await
                .unwrap_err();
            assert!(
                matches!(err, FetchError::RedirectProhibited { .. }),
                "budget {budget:?}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn test_redirect_to_strange_port_rejected() {
        let script = Script::new(vec![redirect("http://a.example:8080/")]);
        let err = resolve(&target("http://a.example/"), &Options::default(), &script)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::BadPort(8080)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_success() {
        let script = Script::new(vec![
            Err(ExchangeError::Retriable("connection refused".into())),
            Err(ExchangeError::Retriable("connection reset".into())),
            ok("finally"),
        ]);
        let options = Options {
            retry_budget: Budget::Limited(2),
            ..Default::default()
        };
        let result = resolve(&target("http://a.example/"), &options, &script)
            .await
            .unwrap();
        assert_eq!(result.body, Bytes::from("finally"));
        assert_eq!(script.seen().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_exceeded() {
        let script = Script::new(vec![
            Err(ExchangeError::Retriable("refused 1".into())),
            Err(ExchangeError::Retriable("refused 2".into())),
        ]);
        let options = Options {
            retry_budget: Budget::Limited(1),
            ..Default::default()
        };
        let err = resolve(&target("http://a.example/"), &options, &script)
            .await
            .unwrap_err();

        match err {
            FetchError::TooManyConnections(message) => assert_eq!(message, "refused 2"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_timeout_supersedes_retries() {
        let script = Script::new(
            (0..100)
                .map(|_| Err(ExchangeError::Retriable("down".into())))
                .collect(),
        );
        let options = Options {
            retry_budget: Budget::Unbounded,
            total_timeout: Some(Duration::from_millis(3500)),
            ..Default::default()
        };
        let err = resolve(&target("http://a.example/"), &options, &script)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout(_)));
        assert_eq!(script.seen().len(), 4);
    }

    #[tokio::test]
    async fn test_terminal_errors_map_to_fetch_errors() {
        let cases = vec![
            (
                Err(ExchangeError::Fatal("404 Not Found".into())),
                "connection failed: 404 Not Found",
            ),
            (
                Err(ExchangeError::Timeout("read".into())),
                "timed out: read",
            ),
            (
                Err(ExchangeError::ContentTooBig {
                    declared: 20,
                    limit: 10,
                }),
                "content length (20) is bigger than 10 bytes",
            ),
            (
                Err(ExchangeError::ContentOverflow { limit: 10 }),
                "read data size exceeds 10 bytes, aborting",
            ),
        ];

        for (step, expected) in cases {
            let script = Script::new(vec![step]);
            let err = resolve(&target("http://a.example/"), &Options::default(), &script)
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), expected);
            assert_eq!(script.seen().len(), 1);
        }
    }
}
