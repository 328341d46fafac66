use std::future::Future;
use std::time::Duration;

/// Bounded retry with exponential backoff, shared by every outbound client.
///
/// The delay before retry `n` (counted from 0) is `min(2^n * base_delay, max_delay)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

/// Final result of a retried operation together with the attempts it took.
#[derive(Debug)]
pub struct Retried<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Preset for the text-generation provider.
    pub const fn upstream() -> Self {
        Self::new(3, Duration::from_millis(1000), Duration::from_millis(30_000))
    }

    /// Preset for callback targets, capped lower since they recover faster.
    pub const fn callback() -> Self {
        Self::new(3, Duration::from_millis(1000), Duration::from_millis(10_000))
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Runs `operation` until it succeeds, fails with an error `is_retryable`
    /// rejects, or the retry budget is spent. The operation receives the
    /// 1-based attempt number.
    pub async fn run<T, E, F, Fut, P>(&self, mut operation: F, is_retryable: P) -> Retried<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut retry = 0;
        loop {
            let attempts = retry + 1;
            match operation(attempts).await {
                Ok(value) => {
                    return Retried {
                        result: Ok(value),
                        attempts,
                    };
                }
                Err(err) if retry < self.max_retries && is_retryable(&err) => {
                    let delay = self.delay_for(retry);
                    tracing::info!(
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(err) => {
                    return Retried {
                        result: Err(err),
                        attempts,
                    };
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::upstream()
    }
}
