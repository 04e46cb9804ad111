use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Backoff policy for a single remote call.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Preset: resource reads (3 attempts, 250ms then 500ms).
    ///
    /// Used for the one-shot resource loads, which have no tick to retry on.
    pub fn resource_read() -> Self {
        Self::new(3, Duration::from_millis(250))
            .with_max_delay(Duration::from_secs(1))
            .with_backoff_multiplier(2.0)
    }

    /// Delay before the given 0-indexed attempt.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::resource_read()
    }
}

/// Run `operation` until it succeeds, the attempts run out, or it fails
/// with an error `should_retry` rejects.
///
/// Client errors such as 400 or 401 will not change on a second attempt;
/// rate limiting, 5xx and transport failures usually do.
///
/// # Panics
/// Panics if `config.max_attempts` is 0
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    assert!(
        config.max_attempts >= 1,
        "RetryConfig.max_attempts must be >= 1, got {}",
        config.max_attempts
    );

    let mut attempt = 0;
    loop {
        let delay = config.delay_for_attempt(attempt);
        if !delay.is_zero() {
            debug!(
                "{}: attempt {}/{} in {:?}",
                operation_name,
                attempt + 1,
                config.max_attempts,
                delay
            );
            sleep(delay).await;
        }

        let error = match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("{}: succeeded on attempt {}", operation_name, attempt + 1);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !should_retry(&error) {
            debug!("{}: not retryable: {}", operation_name, error);
            return Err(error);
        }

        attempt += 1;
        if attempt >= config.max_attempts {
            warn!(
                "{}: all {} attempts failed, last error: {}",
                operation_name, config.max_attempts, error
            );
            return Err(error);
        }

        warn!(
            "{}: attempt {}/{} failed ({}), retrying",
            operation_name, attempt, config.max_attempts, error
        );
    }
}

/// Retry policy for CMS calls: rate limits, 5xx and transport errors only.
///
/// Matches the status that `api::HttpCmsClient` embeds in its error messages,
/// e.g. `"CMS API error (503 Service Unavailable): ..."`.
pub fn is_retryable_error(error: &anyhow::Error) -> bool {
    let message = error.to_string();

    if let Some(rest) = message.strip_prefix("CMS API error (") {
        if let Some(status) = rest
            .split_whitespace()
            .next()
            .and_then(|code| code.trim_end_matches(')').parse::<u16>().ok())
        {
            return status == 429 || status >= 500;
        }
    }

    true
}
