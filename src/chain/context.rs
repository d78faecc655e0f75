//! Per-request cancellation and deadline.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, ServiceError};

/// Carried through every orchestrator call. Cloning shares the token.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that is never cancelled unless [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// `Cancelled` once the request was cancelled or ran past its deadline.
    pub fn check(&self) -> Result<()> {
        if self.is_done() {
            return Err(Self::cancelled());
        }
        Ok(())
    }

    /// Runs `fut` unless the request is cancelled or its deadline passes first.
    pub async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Self::cancelled()),
            _ = deadline => Err(ServiceError::Cancelled("deadline exceeded".into())),
            result = fut => result,
        }
    }

    fn cancelled() -> ServiceError {
        ServiceError::Cancelled("request cancelled".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_guard_passes_through() {
        let ctx = RequestContext::new();
        let value = assert_ok!(ctx.guard(async { Ok::<_, ServiceError>(5) }).await);
        assert_eq!(value, 5);
        assert!(!ctx.is_done());
    }

    #[tokio::test]
    async fn test_guard_after_cancel() {
        let ctx = RequestContext::new();
        ctx.cancel();
        let result = ctx.guard(async { Ok::<_, ServiceError>(()) }).await;
        assert!(matches!(result, Err(ServiceError::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_deadline_interrupts_slow_call() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(20));
        let result = ctx
            .guard(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, ServiceError>(())
            })
            .await;
        assert!(matches!(result, Err(ServiceError::Cancelled(_))));
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn test_clones_share_cancellation() {
        let ctx = RequestContext::with_timeout(Duration::from_secs(60));
        let clone = ctx.clone();
        clone.cancel();
        assert!(ctx.is_done());
    }
}
