use std::future::Future;

use tokio::time::{sleep, Duration};
use tracing::{error, warn};

/// How a failed upstream call is re-issued. `None` fails on the first error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    #[default]
    None,
    Fixed {
        attempts: u32,
        base_delay_ms: u64,
        max_delay_ms: u64,
    },
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryPolicy::None => 1,
            RetryPolicy::Fixed { attempts, .. } => (*attempts).max(1),
        }
    }

    pub async fn run_with_retry<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let (attempts, mut delay, max_delay) = match self {
            RetryPolicy::None => return operation().await,
            RetryPolicy::Fixed { base_delay_ms, max_delay_ms, .. } => {
                (self.attempts(), *base_delay_ms, *max_delay_ms)
            }
        };

        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    warn!("Attempt {attempt}/{attempts} failed: {e}");
                    sleep(Duration::from_millis(delay)).await;
                    delay = next_delay(delay, max_delay);
                    attempt += 1;
                }
                Err(e) => {
                    error!("all {attempt} attempts failed: {e}");
                    return Err(e);
                }
            }
        }
    }
}

/// Doubled delay, capped at `max_delay`; saturates instead of overflowing.
fn next_delay(delay: u64, max_delay: u64) -> u64 {
    delay.saturating_mul(2).min(max_delay)
}
