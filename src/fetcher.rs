use std::{future::Future, io::Write, num::NonZeroU32, time::Duration};

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use wreq::header::{COOKIE, REFERER};
use wreq_util::Emulation;

use crate::{
    config::Config,
    error::{AppError, AppResult},
};

/// Source of raw page markup.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// One-time session setup. May block on the operator.
    async fn authenticate(&mut self) -> AppResult<()>;

    async fn fetch(&self, url: &str) -> AppResult<String>;
}

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

pub enum Attempt {
    Transient(String),
    Fatal(AppError),
}

/// Runs `op` until it succeeds, fails fatally, or the attempt budget is spent.
pub async fn retry_transient<F, Fut>(url: &str, policy: RetryPolicy, mut op: F) -> AppResult<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, Attempt>>,
{
    let budget = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(body) => return Ok(body),
            Err(Attempt::Fatal(err)) => return Err(err),
            Err(Attempt::Transient(reason)) => {
                if attempt >= budget {
                    warn!(url = %url, attempts = attempt, reason = %reason, "giving up on page");
                    return Err(AppError::TransientFetch { url: url.to_string(), attempts: attempt });
                }
                debug!(url = %url, attempt = attempt, reason = %reason, "retrying page fetch");
                tokio::time::sleep(policy.backoff * attempt).await;
            },
        }
    }
}

pub struct WebFetcher {
    client: wreq::Client,
    base_url: String,
    signin_url: String,
    policy: RetryPolicy,
    session_cookie: Option<String>,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl WebFetcher {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = wreq::Client::builder()
            .emulation(Emulation::Chrome131)
            .cookie_store(true)
            .timeout(config.fetch_timeout)
            .build()?;

        let rps = NonZeroU32::new(config.fetch_rps.max(1)).unwrap_or(NonZeroU32::MIN);
        let limiter = RateLimiter::direct(Quota::per_second(rps));

        Ok(Self {
            client,
            base_url: config.source_base_url.trim_end_matches('/').to_string(),
            signin_url: config.signin_url(),
            policy: RetryPolicy { attempts: config.fetch_retries, backoff: Duration::from_secs(2) },
            session_cookie: None,
            limiter,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String, Attempt> {
        self.limiter.until_ready().await;

        let mut req = self.client.get(url).header(REFERER, format!("{}/", self.base_url));
        if let Some(cookie) = &self.session_cookie {
            req = req.header(COOKIE, cookie.as_str());
        }

        let result = async { req.send().await?.error_for_status()?.text().await }.await;
        result.map_err(|err| {
            if is_transient(&err) {
                Attempt::Transient(err.to_string())
            } else {
                Attempt::Fatal(err.into())
            }
        })
    }
}

fn is_transient(err: &wreq::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.status().is_some_and(|s| s.is_server_error())
}

#[async_trait]
impl PageFetcher for WebFetcher {
    async fn authenticate(&mut self) -> AppResult<()> {
        self.fetch(&self.signin_url).await?;

        print!(
            "Sign in at {} in a browser, complete any challenge, then paste the Cookie header \
             (leave empty to continue signed out): ",
            self.signin_url
        );
        std::io::stdout().flush()?;

        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        let cookie = line.trim();

        if cookie.is_empty() {
            info!("continuing without a session cookie");
        } else {
            info!("session cookie set");
            self.session_cookie = Some(cookie.to_string());
        }
        Ok(())
    }

    async fn fetch(&self, url: &str) -> AppResult<String> {
        debug!(url = %url, "fetching page");
        retry_transient(url, self.policy, || self.fetch_once(url)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    const NO_WAIT: RetryPolicy = RetryPolicy { attempts: 3, backoff: Duration::ZERO };

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let body = retry_transient("http://example.test/a", NO_WAIT, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Attempt::Transient("timeout".to_string()))
            } else {
                Ok("<html></html>".to_string())
            }
        })
        .await
        .unwrap();

        assert_eq!(body, "<html></html>");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_budget_surfaces_transient_error() {
        let calls = AtomicU32::new(0);
        let err = retry_transient("http://example.test/b", NO_WAIT, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Attempt::Transient("timeout".to_string()))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::TransientFetch { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let err = retry_transient("http://example.test/c", NO_WAIT, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Attempt::Fatal(anyhow::anyhow!("404").into()))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Other(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
