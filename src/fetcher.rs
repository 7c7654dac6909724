// src/fetcher.rs
//! Network retrieval with retry/backoff
//!
//! Transient transport errors are retried with an exponentially growing delay
//! until the configured sleep budget is spent, or `MAX_ATTEMPTS` requests
//! have been made. Any HTTP status other than 200 is terminal and never
//! retried.

use crate::config::{Config, RetrySettings};
use crate::error::FetchError;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::time::Duration;

/// Upper bound on requests per fetch, whatever the backoff settings allow
pub const MAX_ATTEMPTS: u32 = 30;

/// Raw response as seen by the extractors
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

/// A single GET, without any retry logic
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<Response, FetchError>;
}

/// `reqwest`-backed transport used by the CLI
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<Response, FetchError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        Ok(Response { status, body })
    }
}

/// Receives the user-facing "retrying" message
pub type NoticeFn = fn(&str);

fn print_notice(message: &str) {
    println!("   ⚠️  {}", message);
}

pub struct Fetcher<T: Transport> {
    transport: T,
    retry: RetrySettings,
    notice: NoticeFn,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, retry: RetrySettings) -> Self {
        Self {
            transport,
            retry: retry.validated(),
            notice: print_notice,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_notice(mut self, notice: NoticeFn) -> Self {
        self.notice = notice;
        self
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn fetch(&self, url: &str, query: &[(String, String)]) -> Result<Response, FetchError> {
        info!("Metadata URL for GET request: {}", url);

        let budget = self.retry.budget();
        let mut delay = self.retry.initial_delay();
        let mut slept = Duration::ZERO;
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            match self.transport.get(url, query).await {
                Ok(response) => {
                    info!("Status code: {}", response.status);
                    if response.status != 200 {
                        return Err(FetchError::BadStatus(response.status));
                    }
                    return Ok(response);
                }
                Err(e) if e.is_transient() => {
                    warn!("Request error (attempt {}): {}", attempts, e);

                    if slept >= budget || attempts >= MAX_ATTEMPTS {
                        return Err(FetchError::RetriesExhausted {
                            attempts,
                            last_error: e.to_string(),
                        });
                    }

                    if attempts == 1 {
                        (self.notice)(&format!(
                            "Bad response from webpage, retrying for up to {:.0} seconds...",
                            budget.as_secs_f64()
                        ));
                    }

                    debug!("Sleeping {:?} before retry", delay);
                    tokio::time::sleep(delay).await;
                    slept = slept.saturating_add(delay);
                    delay = Duration::try_from_secs_f64(delay.as_secs_f64() * self.retry.multiplier)
                        .unwrap_or(Duration::MAX);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays canned results, then repeats the last one forever
    pub(crate) struct ScriptedTransport {
        script: Mutex<VecDeque<Result<Response, FetchError>>>,
        last: Mutex<Option<Result<Response, FetchError>>>,
        pub calls: AtomicU32,
    }

    fn clone_result(r: &Result<Response, FetchError>) -> Result<Response, FetchError> {
        match r {
            Ok(resp) => Ok(resp.clone()),
            Err(FetchError::Transient(m)) => Err(FetchError::Transient(m.clone())),
            Err(FetchError::BadStatus(s)) => Err(FetchError::BadStatus(*s)),
            Err(other) => Err(FetchError::Transient(other.to_string())),
        }
    }

    impl ScriptedTransport {
        pub(crate) fn new(script: Vec<Result<Response, FetchError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                calls: AtomicU32::new(0),
            }
        }

        pub(crate) fn ok(body: &str) -> Self {
            Self::new(vec![Ok(Response { status: 200, body: body.to_string() })])
        }

        pub(crate) fn always_transient() -> Self {
            Self::new(vec![Err(FetchError::Transient("connection reset".into()))])
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, _url: &str, _query: &[(String, String)]) -> Result<Response, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            if let Some(next) = script.pop_front() {
                *last = Some(clone_result(&next));
                return next;
            }
            match last.as_ref() {
                Some(r) => clone_result(r),
                None => Err(FetchError::Transient("empty script".into())),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_transient_is_terminal_after_budget() {
        let fetcher = Fetcher::new(ScriptedTransport::always_transient(), RetrySettings::default());
        let start = tokio::time::Instant::now();

        let result = fetcher.fetch("https://example.invalid", &[]).await;

        assert!(start.elapsed() >= Duration::from_secs(10));
        match result {
            Err(FetchError::RetriesExhausted { attempts, .. }) => {
                // 2 + 3 + 4.5 + 6.75 seconds of sleep between five attempts
                assert_eq!(attempts, 5);
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
        assert_eq!(fetcher.transport.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_errors() {
        let transport = ScriptedTransport::new(vec![
            Err(FetchError::Transient("timeout".into())),
            Err(FetchError::Transient("timeout".into())),
            Ok(Response { status: 200, body: "{}".into() }),
        ]);
        let fetcher = Fetcher::new(transport, RetrySettings::default());
        let start = tokio::time::Instant::now();

        let response = fetcher.fetch("https://example.invalid", &[]).await.unwrap();

        assert_eq!(response.body, "{}");
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_notice_is_shown_once_per_fetch() {
        static NOTICES: AtomicU32 = AtomicU32::new(0);
        fn count(message: &str) {
            assert!(message.contains("retrying for up to 10 seconds"));
            NOTICES.fetch_add(1, Ordering::SeqCst);
        }

        let failing = Fetcher::new(ScriptedTransport::always_transient(), RetrySettings::default()).with_notice(count);
        assert!(failing.fetch("https://example.invalid", &[]).await.is_err());
        assert_eq!(NOTICES.load(Ordering::SeqCst), 1);

        let transport = ScriptedTransport::new(vec![
            Err(FetchError::Transient("timeout".into())),
            Err(FetchError::Transient("timeout".into())),
            Ok(Response { status: 200, body: "{}".into() }),
        ]);
        let recovering = Fetcher::new(transport, RetrySettings::default()).with_notice(count);
        assert!(recovering.fetch("https://example.invalid", &[]).await.is_ok());
        assert_eq!(NOTICES.load(Ordering::SeqCst), 2);

        let healthy = Fetcher::new(ScriptedTransport::ok("{}"), RetrySettings::default()).with_notice(count);
        assert!(healthy.fetch("https://example.invalid", &[]).await.is_ok());
        assert_eq!(NOTICES.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_growing_backoff_still_gives_up() {
        let stalled = RetrySettings {
            initial_delay_secs: 2.0,
            multiplier: 0.0,
            budget_secs: 10.0,
        };
        let fetcher = Fetcher::new(ScriptedTransport::always_transient(), stalled);

        let result = fetcher.fetch("https://example.invalid", &[]).await;

        assert!(matches!(result, Err(FetchError::RetriesExhausted { attempts: 5, .. })));

        let negative = RetrySettings {
            initial_delay_secs: 0.0,
            multiplier: -1.5,
            budget_secs: 10.0,
        };
        let fetcher = Fetcher::new(ScriptedTransport::always_transient(), negative);

        assert!(matches!(
            fetcher.fetch("https://example.invalid", &[]).await,
            Err(FetchError::RetriesExhausted { attempts: 5, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_capped() {
        let flat = RetrySettings {
            initial_delay_secs: 0.001,
            multiplier: 1.0,
            budget_secs: 10.0,
        };
        let fetcher = Fetcher::new(ScriptedTransport::always_transient(), flat);

        let result = fetcher.fetch("https://example.invalid", &[]).await;

        assert!(matches!(result, Err(FetchError::RetriesExhausted { attempts: MAX_ATTEMPTS, .. })));
        assert_eq!(fetcher.transport.calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_ok_status_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Ok(Response { status: 404, body: String::new() })]);
        let fetcher = Fetcher::new(transport, RetrySettings::default());

        let result = fetcher.fetch("https://example.invalid", &[]).await;

        assert!(matches!(result, Err(FetchError::BadStatus(404))));
        assert_eq!(fetcher.transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redirect_style_status_is_terminal() {
        let transport = ScriptedTransport::new(vec![Ok(Response { status: 204, body: String::new() })]);
        let fetcher = Fetcher::new(transport, RetrySettings::default());

        assert!(matches!(
            fetcher.fetch("https://example.invalid", &[]).await,
            Err(FetchError::BadStatus(204))
        ));
    }
}
