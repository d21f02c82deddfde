use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Backoff for idempotent reads. Writes never go through here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Runs `operation` until it succeeds, fails permanently, or retries run out.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::rpc::RpcError;
    use crate::types::Chain;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> BridgeError {
        BridgeError::transport(Chain::L1, "eth_call", RpcError::transport("connection reset"))
    }

    #[test]
    fn delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(250));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_from_transient_failures() {
        let attempts = AtomicU32::new(0);
        let value = RetryPolicy::default()
            .run("eth_call", || async {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transient())
                } else {
                    Ok(5u64)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 5);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);
        let err = RetryPolicy::default()
            .run("eth_call", || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(transient())
            })
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let attempts = AtomicU32::new(0);
        let err = RetryPolicy::default()
            .run("eth_call", || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(BridgeError::transport(
                    Chain::L2,
                    "eth_call",
                    RpcError::rpc("execution reverted"),
                ))
            })
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
