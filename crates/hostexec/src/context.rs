//! Cancellation context passed to every suspension point.

use crate::error::Error;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation signal with an optional deadline.
///
/// Cloning is cheap; clones share the same signal. [`Context::child`] and
/// [`Context::with_timeout`] derive contexts that are cancelled together with
/// their parent but can also be cancelled on their own.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Create a fresh, never-cancelled context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the context has been cancelled or its deadline has passed.
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// The error describing why the context is done, if it is.
    pub fn err(&self) -> Option<Error> {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Some(Error::DeadlineExceeded);
            }
        }
        if self.token.is_cancelled() {
            return Some(Error::Cancelled);
        }
        None
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Derive a context cancelled together with this one.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derive a context that additionally expires after `timeout`.
    ///
    /// The earlier of the parent's deadline and the new one wins.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.token.cancelled() => {}
                    () = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Run `fut` unless the context finishes first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Error> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            out = fut => Ok(out),
            () = self.done() => Err(self.err().unwrap_or(Error::Cancelled)),
        }
    }

    /// Sleep for `duration` unless the context finishes first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Error> {
        self.run(tokio::time::sleep(duration)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_context_is_not_done() {
        let ctx = Context::new();
        assert!(!ctx.is_done());
        assert!(ctx.err().is_none());
    }

    #[tokio::test]
    async fn test_cancel_propagates_to_child() {
        let parent = Context::new();
        let child = parent.child();
        parent.cancel();
        assert!(child.is_done());
        assert!(matches!(child.err(), Some(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_child_cancel_does_not_affect_parent() {
        let parent = Context::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reports_deadline_exceeded() {
        let ctx = Context::new().with_timeout(Duration::from_secs(2));
        let res = ctx.sleep(Duration::from_secs(10)).await;
        assert!(matches!(res, Err(Error::DeadlineExceeded)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_completes_before_deadline() {
        let ctx = Context::new().with_timeout(Duration::from_secs(2));
        let res = ctx.run(async { 7 }).await;
        assert_eq!(res.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_run_on_cancelled_context_short_circuits() {
        let ctx = Context::new();
        ctx.cancel();
        let res = ctx.run(async { 1 }).await;
        assert!(matches!(res, Err(Error::Cancelled)));
    }
}
