//! Pieces shared by the sapcontrol-backed operators.

use hostexec::Context;
use operator::arguments::{get_optional_f64, get_string};
use operator::{Arguments, OperatorError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// `instance_number` plus the wait budget of VERIFY and ROLLBACK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SapArguments {
    pub instance_number: String,
    pub timeout: Duration,
}

impl SapArguments {
    pub fn parse(args: &Arguments, default_timeout: Duration) -> Result<Self> {
        let instance_number = get_string(args, "instance_number")?;
        let timeout = match get_optional_f64(args, "timeout")? {
            None => default_timeout,
            Some(secs) => Duration::try_from_secs_f64(secs).map_err(|_| {
                OperatorError::argument(format!(
                    "could not parse timeout argument as a non-negative number of seconds, argument provided: {secs}"
                ))
            })?,
        };
        Ok(Self {
            instance_number,
            timeout,
        })
    }
}

/// Map a sapcontrol failure, keeping cancellation distinct.
pub fn sap_error(context: &str, err: sapcontrol::Error) -> OperatorError {
    match err {
        sapcontrol::Error::Context(e) => OperatorError::from(e).context(context),
        other => OperatorError::execution(context, other),
    }
}

/// Probe every `interval` until `probe` answers `true` or `timeout` elapses.
///
/// The first probe runs one interval in; a zero timeout fails without
/// probing. Probe errors are logged and retried, only cancellation ends the
/// wait early.
pub async fn poll_until<F, Fut>(
    ctx: &Context,
    timeout: Duration,
    interval: Duration,
    what: &str,
    mut probe: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<bool, sapcontrol::Error>>,
{
    // Budgets past the clock's range never expire
    let deadline = Instant::now().checked_add(timeout);
    loop {
        let wait = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(OperatorError::verification(format!(
                        "error waiting until {what} is in desired state"
                    )));
                }
                interval.min(remaining)
            }
            None => interval,
        };
        ctx.sleep(wait).await?;

        match probe().await {
            Ok(true) => return Ok(()),
            Ok(false) => log::debug!("{what} not in desired state yet"),
            Err(sapcontrol::Error::Context(e)) => return Err(e.into()),
            Err(e) => log::warn!("Error polling {what} state: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::testing::args;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_timeout_defaults_and_fractions() {
        let parsed =
            SapArguments::parse(&args(json!({"instance_number": "00"})), Duration::from_secs(300))
                .unwrap();
        assert_eq!(parsed.timeout, Duration::from_secs(300));

        let parsed = SapArguments::parse(
            &args(json!({"instance_number": "10", "timeout": 1.5})),
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(parsed.timeout, Duration::from_millis(1500));

        assert!(
            SapArguments::parse(
                &args(json!({"instance_number": "10", "timeout": -1})),
                Duration::ZERO
            )
            .is_err()
        );
        assert!(SapArguments::parse(&args(json!({"timeout": 1})), Duration::ZERO).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_honours_interval() {
        let counter = AtomicU32::new(0);
        let probes = &counter;
        let started = Instant::now();
        poll_until(
            &Context::new(),
            Duration::from_secs(60),
            Duration::from_secs(10),
            "instance",
            move || async move { Ok(probes.fetch_add(1, Ordering::SeqCst) == 2) },
        )
        .await
        .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_poll_until_zero_timeout_never_probes() {
        let counter = AtomicU32::new(0);
        let probes = &counter;
        let err = poll_until(
            &Context::new(),
            Duration::ZERO,
            Duration::ZERO,
            "system",
            move || async move {
                probes.fetch_add(1, Ordering::SeqCst);
                Ok(false)
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "error waiting until system is in desired state");
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_poll_until_stops_on_cancellation() {
        let ctx = Context::new();
        ctx.cancel();
        let err = poll_until(
            &ctx,
            Duration::from_secs(60),
            Duration::from_secs(1),
            "instance",
            || async { Ok(false) },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "context canceled");
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_accepts_unbounded_timeout() {
        let counter = AtomicU32::new(0);
        let probes = &counter;
        poll_until(
            &Context::new(),
            Duration::MAX,
            Duration::from_secs(10),
            "instance",
            move || async move { Ok(probes.fetch_add(1, Ordering::SeqCst) == 1) },
        )
        .await
        .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
