use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Wait between tries of a remote request or status poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    Immediate,
    /// Waits a random time up to a bound that starts at `first` and doubles
    /// per failure until it reaches `ceiling`.
    Doubling { first: Duration, ceiling: Duration },
}

impl Pacing {
    pub const REMOTE: Pacing = Pacing::Doubling {
        first: Duration::from_millis(250),
        ceiling: Duration::from_secs(10),
    };

    /// Longest wait after `failures` failed tries.
    pub fn bound(&self, failures: u32) -> Duration {
        match *self {
            Pacing::Immediate => Duration::ZERO,
            Pacing::Doubling { first, ceiling } => first
                .checked_mul(2u32.saturating_pow(failures))
                .map_or(ceiling, |wait| wait.min(ceiling)),
        }
    }

    pub fn wait<R: Rng + ?Sized>(&self, failures: u32, rng: &mut R) -> Duration {
        let bound = self.bound(failures);
        if bound.is_zero() {
            return bound;
        }
        rng.gen_range(Duration::ZERO..=bound)
    }
}

/// Errors that may succeed when the same request is sent again.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for cloudshelf_api::ApiError {
    fn is_retryable(&self) -> bool {
        cloudshelf_api::ApiError::is_retryable(self)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total number of tries, including the first one.
    pub attempts: u32,
    pub pacing: Pacing,
}

impl RetryPolicy {
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
            pacing: Pacing::REMOTE,
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub async fn run<T, E, F, Fut>(&self, what: &str, mut operation: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt + 1 < self.attempts => {
                    let delay = self.pacing.wait(attempt, &mut rand::thread_rng());
                    warn!(what, attempt, ?delay, error = %err, "retrying after transient failure");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}
