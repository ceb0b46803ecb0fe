//! Cancellation and deadlines for registry operations.

use crate::error::{RegistryError, RegistryResult};
use pallet_core::config::RegistryConfig;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Caller-supplied cancellation signal and optional deadline.
///
/// Every storage call made on behalf of an operation runs through
/// [`OpContext::guard`], so a cancelled or expired context stops the
/// operation at its next suspension point. Cloning shares the token.
#[derive(Clone, Debug, Default)]
pub struct OpContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl OpContext {
    /// A context that is never cancelled and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context observing an existing token.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Apply the configured operation timeout, if any.
    pub fn with_configured_timeout(self, config: &RegistryConfig) -> Self {
        match config.operation_timeout() {
            Some(timeout) => self.with_timeout(timeout),
            None => self,
        }
    }

    /// Set the deadline to `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set an absolute deadline. An earlier existing deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel every operation observing this context.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Run `fut`, aborting with `Cancelled` or `DeadlineExceeded`.
    ///
    /// Cancellation is checked first, then the deadline, then the future, so
    /// an already-cancelled context never starts the storage call.
    pub async fn guard<F, T, E>(&self, operation: &'static str, fut: F) -> RegistryResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<RegistryError>,
    {
        if self.cancel.is_cancelled() {
            return Err(RegistryError::Cancelled { operation });
        }
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::debug!(operation, "Operation cancelled");
                Err(RegistryError::Cancelled { operation })
            }
            _ = deadline => {
                tracing::debug!(operation, "Operation deadline exceeded");
                Err(RegistryError::DeadlineExceeded { operation })
            }
            result = fut => result.map_err(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pallet_storage::StorageError;

    #[tokio::test]
    async fn test_guard_passes_result_through() {
        let ctx = OpContext::new();
        let value = ctx
            .guard("op", async { Ok::<_, StorageError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);

        let err = ctx
            .guard("op", async {
                Err::<(), _>(StorageError::PreconditionFailed("s/p/1".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_context_never_polls_future() {
        let ctx = OpContext::new();
        ctx.cancel();
        let polled = std::sync::atomic::AtomicBool::new(false);
        let err = ctx
            .guard("get_content", async {
                polled.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok::<_, StorageError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Cancelled {
                operation: "get_content"
            }
        ));
        assert!(!polled.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_interrupts_slow_future() {
        let ctx = OpContext::new().with_timeout(Duration::from_millis(50));
        let err = ctx
            .guard("list", async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, StorageError>(())
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "deadline_exceeded");
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_pending_future() {
        let ctx = OpContext::new();
        let token = ctx.cancellation_token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });
        let err = ctx
            .guard(
                "get_content",
                std::future::pending::<Result<(), StorageError>>(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "cancelled");
    }

    #[tokio::test]
    async fn test_external_token_cancels_guard() {
        let cancel = CancellationToken::new();
        let config = RegistryConfig {
            operation_timeout_secs: Some(30),
            ..Default::default()
        };
        let ctx = OpContext::with_cancellation(cancel.clone()).with_configured_timeout(&config);
        assert!(ctx.deadline().is_some());

        cancel.cancel();
        let err = ctx
            .guard("list", async { Ok::<_, StorageError>(()) })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "cancelled");
    }

    #[test]
    fn test_earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = OpContext::new()
            .with_deadline(now + Duration::from_secs(5))
            .with_deadline(now + Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(5)));
    }

    #[test]
    fn test_configured_timeout_sets_deadline() {
        let config = RegistryConfig {
            operation_timeout_secs: Some(3),
            ..Default::default()
        };
        assert!(
            OpContext::new()
                .with_configured_timeout(&config)
                .deadline()
                .is_some()
        );
        assert!(
            OpContext::new()
                .with_configured_timeout(&RegistryConfig::default())
                .deadline()
                .is_none()
        );
    }
}
