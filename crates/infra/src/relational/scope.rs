use super::AccessError;
use std::{future::Future, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation and deadline of a single caller request.
///
/// Cloning shares the same token, so cancelling any clone aborts every
/// statement running under it.
#[derive(Debug, Clone, Default)]
pub struct RequestScope {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope driven by a token owned by the caller
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Keeps the earliest deadline if one is already set
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drives `query` to completion unless the scope is cancelled or the
    /// deadline passes first. The query future is dropped in that case.
    pub async fn run<T, F>(&self, query: F) -> Result<T, AccessError>
    where
        F: Future<Output = Result<T, AccessError>>,
    {
        if self.token.is_cancelled() {
            return Err(AccessError::Cancelled);
        }
        let bounded = async {
            match self.deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, query).await {
                    Ok(res) => res,
                    Err(_) => Err(AccessError::DeadlineExceeded),
                },
                None => query.await,
            }
        };
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(AccessError::Cancelled),
            res = bounded => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn runs_query_when_not_cancelled() {
        let scope = RequestScope::new();
        let res = scope.run(async { Ok::<_, AccessError>(5) }).await;
        assert_eq!(res.unwrap(), 5);
    }

    #[tokio::test]
    async fn cancelled_scope_never_polls_the_query() {
        let scope = RequestScope::new();
        scope.cancel();
        let polled = AtomicBool::new(false);
        let res = scope
            .run(async {
                polled.store(true, Ordering::SeqCst);
                Ok::<(), AccessError>(())
            })
            .await;
        assert!(matches!(res, Err(AccessError::Cancelled)));
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancelling_aborts_in_flight_query() {
        let token = CancellationToken::new();
        let scope = RequestScope::from_token(token.clone());
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });
        let res = scope
            .run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<(), AccessError>(())
            })
            .await;
        canceller.await.unwrap();
        assert!(matches!(res, Err(AccessError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_aborts_slow_query() {
        let scope = RequestScope::new().with_timeout(Duration::from_millis(50));
        let res = scope
            .run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<(), AccessError>(())
            })
            .await;
        assert!(matches!(res, Err(AccessError::DeadlineExceeded)));
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_earliest_deadline() {
        let now = Instant::now();
        let scope = RequestScope::new()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(10));
        assert_eq!(scope.deadline(), Some(now + Duration::from_secs(1)));
    }
}
