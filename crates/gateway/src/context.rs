//! Per-call deadline and cancellation.
//!
//! Every gateway operation takes a [`CallContext`]. The gateway checks it
//! before sending a request and bounds the request's timeout by whatever is
//! left of the deadline, so an abandoned call is aborted instead of leaked.
//! Cancellation stops calls that have not started yet; see [`CancelToken`].

use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Shared cancellation flag.
///
/// Clones observe the same flag, so one handle can be given to worker
/// threads while the host keeps another.
///
/// The flag is only checked before a request is sent. Cancelling does not
/// abort a request already in flight; that request ends when it completes
/// or when its timeout, bounded by the deadline, expires.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Deadline and cancellation passed through from the caller.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: CancelToken,
}

impl CallContext {
    /// No deadline, never cancelled unless the token is triggered.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Abort once `timeout` has elapsed from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancel: CancelToken::new(),
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Fail fast if the call should not start.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }

    /// Timeout for the next request: the configured per-request timeout,
    /// shortened to the time left before the deadline.
    pub fn request_timeout(&self, configured: Duration) -> Result<Duration> {
        self.check()?;
        match self.deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(Error::DeadlineExceeded);
                }
                Ok(remaining.min(configured))
            }
            None => Ok(configured),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_uses_configured_timeout() {
        let ctx = CallContext::background();
        let timeout = ctx.request_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_deadline_shortens_timeout() {
        let ctx = CallContext::with_timeout(Duration::from_secs(2));
        let timeout = ctx.request_timeout(Duration::from_secs(10)).unwrap();
        assert!(timeout <= Duration::from_secs(2));
        assert!(timeout > Duration::ZERO);
    }

    #[test]
    fn test_expired_deadline() {
        let ctx = CallContext::background().with_deadline(Instant::now());
        assert!(matches!(ctx.check(), Err(Error::DeadlineExceeded)));
        assert!(matches!(
            ctx.request_timeout(Duration::from_secs(10)),
            Err(Error::DeadlineExceeded)
        ));
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let ctx = CallContext::background().with_cancel(token.clone());
        assert!(ctx.check().is_ok());

        token.cancel();
        assert!(ctx.cancel_token().is_cancelled());
        assert!(matches!(ctx.check(), Err(Error::Cancelled)));
    }
}
