//! Retry logic with exponential backoff, cancellable through a [`Context`].

use hostexec::Context;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// Backoff configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffOptions {
    /// Maximum number of attempts (at least one is always made)
    pub max_retries: u32,
    /// Base delay
    pub initial_delay: Duration,
    /// Upper bound for a single wait
    pub max_delay: Duration,
    /// Growth factor (values below 1 are treated as 1)
    pub factor: f64,
}

impl Default for BackoffOptions {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            factor: 3.0,
        }
    }
}

impl BackoffOptions {
    /// Wait before attempt `attempt` (1-indexed).
    ///
    /// `min(initial_delay * (factor^(attempt-1) - 1), max_delay)`, so the
    /// first attempt runs immediately.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.factor.max(1.0);
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay = self.initial_delay.as_secs_f64() * (factor.powi(exponent) - 1.0);
        let capped = delay.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }
}

/// Terminal retry failure.
#[derive(Debug, Error)]
pub enum RetryError {
    /// The context finished before an attempt succeeded
    #[error("{0}")]
    Cancelled(hostexec::Error),

    /// Every attempt failed
    #[error("operation failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

/// Run `operation` until it succeeds, at most `opts.max_retries` times.
///
/// Waits between attempts honour `ctx`; a done context aborts immediately
/// without further attempts.
pub async fn exponential_backoff<T, E, F, Fut>(
    ctx: &Context,
    opts: &BackoffOptions,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = opts.max_retries.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        if let Some(err) = ctx.err() {
            return Err(RetryError::Cancelled(err));
        }

        let delay = opts.delay_for_attempt(attempt);
        if !delay.is_zero() {
            ctx.sleep(delay).await.map_err(RetryError::Cancelled)?;
        }

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                log::debug!("Attempt {attempt}/{max_attempts} failed: {e}");
                last_error = e.to_string();
            }
        }
    }

    Err(RetryError::Exhausted {
        attempts: max_attempts,
        last: last_error,
    })
}

/// Spawn [`exponential_backoff`] and deliver its single result on a channel.
///
/// The receiver yields exactly one message; dropping it early is harmless.
pub fn async_exponential_backoff<T, E, F, Fut>(
    ctx: &Context,
    opts: BackoffOptions,
    operation: F,
) -> oneshot::Receiver<Result<T, RetryError>>
where
    T: Send + 'static,
    E: Display + Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let ctx = ctx.clone();
    tokio::spawn(async move {
        let result = exponential_backoff(&ctx, &opts, operation).await;
        let _ = tx.send(result);
    });
    rx
}
