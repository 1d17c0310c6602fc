//! Bounded cache and store calls.
//!
//! Every cache and store call runs under the caller's cancellation token and
//! a deadline: the smaller of the caller's timeout and the configured default.
//! A timeout is a store error, never "not found".

use std::future::Future;
use std::time::Duration;

use gate_access_sdk::CallContext;

use super::error::DomainError;
use super::ports::CacheError;

/// Runs `fut` until it completes, the deadline passes or `ctx` is cancelled.
///
/// # Errors
///
/// `Cancelled` if the token fires first, `Timeout` if the deadline passes.
pub async fn bounded<F: Future>(
    ctx: &CallContext,
    default_timeout: Duration,
    operation: &'static str,
    fut: F,
) -> Result<F::Output, DomainError> {
    let limit = ctx
        .timeout()
        .map_or(default_timeout, |t| t.min(default_timeout));

    tokio::select! {
        biased;
        () = ctx.cancellation().cancelled() => Err(DomainError::Cancelled { operation }),
        res = tokio::time::timeout(limit, fut) => res.map_err(|_| DomainError::Timeout { operation }),
    }
}

/// Per-dependency default deadlines.
#[derive(Debug, Clone, Copy)]
pub struct Deadlines {
    pub cache: Duration,
    pub store: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            cache: Duration::from_millis(200),
            store: Duration::from_secs(2),
        }
    }
}

impl Deadlines {
    /// Bounded repository call; repository errors become `StoreUnavailable`.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable`, `Timeout` or `Cancelled`.
    pub async fn store<T>(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, DomainError> {
        bounded(ctx, self.store, operation, fut)
            .await?
            .map_err(DomainError::store(operation))
    }

    /// Bounded cache call. A timeout is reported as a [`CacheError`] so callers
    /// can treat it like any other cache outage; only cancellation escapes.
    ///
    /// # Errors
    ///
    /// `Cancelled` when the caller gave up.
    pub async fn cache<T>(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        fut: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<Result<T, CacheError>, DomainError> {
        match bounded(ctx, self.cache, operation, fut).await {
            Ok(inner) => Ok(inner),
            Err(DomainError::Timeout { operation }) => {
                Ok(Err(CacheError::new(operation, "timed out")))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timeout_is_an_error_not_a_value() {
        let deadlines = Deadlines {
            cache: Duration::from_millis(10),
            store: Duration::from_millis(10),
        };
        let ctx = CallContext::new();

        let res = deadlines
            .store(&ctx, "find vehicle", async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, anyhow::Error>(None::<u32>)
            })
            .await;
        assert!(matches!(res, Err(DomainError::Timeout { operation: "find vehicle" })));
    }

    #[tokio::test(start_paused = true)]
    async fn caller_timeout_tightens_default() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(5));
        let res = bounded(&ctx, Duration::from_secs(10), "op", async {
            tokio::time::sleep(Duration::from_millis(50)).await;
        })
        .await;
        assert!(matches!(res, Err(DomainError::Timeout { .. })));
    }

    #[tokio::test]
    async fn cancellation_wins() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = CallContext::new().with_cancellation(token);

        let res = Deadlines::default()
            .cache(&ctx, "cache get", async { Ok::<_, CacheError>(Some(1)) })
            .await;
        assert!(matches!(res, Err(DomainError::Cancelled { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn cache_timeout_becomes_cache_error() {
        let deadlines = Deadlines {
            cache: Duration::from_millis(1),
            store: Duration::from_secs(1),
        };
        let res = deadlines
            .cache(&CallContext::new(), "cache get", async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, CacheError>(())
            })
            .await;
        assert!(matches!(res, Ok(Err(_))));
    }

    #[tokio::test]
    async fn store_error_is_wrapped() {
        let res = Deadlines::default()
            .store(&CallContext::new(), "insert", async {
                Err::<(), _>(anyhow::anyhow!("disk full"))
            })
            .await;
        assert!(matches!(
            res,
            Err(DomainError::StoreUnavailable { operation: "insert", .. })
        ));
    }
}
