use std::time::Duration;

/// A bounded retry schedule: how many tries, and how long to wait between them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    /// Multiplier applied to `interval` for each further retry. 1.0 keeps the pause fixed.
    pub backoff: f64,
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, interval: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            interval,
            backoff: 1.0,
        }
    }

    pub const fn immediate(max_attempts: u32) -> Self {
        Self::fixed(max_attempts, Duration::ZERO)
    }

    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            ..self
        }
    }

    /// Pause before retry number `retry` (zero-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        if self.backoff == 1.0 || retry == 0 {
            return self.interval;
        }
        let factor = self.backoff.max(0.0).powi(retry.min(i32::MAX as u32) as i32);
        Duration::try_from_secs_f64(self.interval.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }

    pub async fn wait(&self, retry: u32) {
        let delay = self.delay_for(retry);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
