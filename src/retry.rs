use std::{fmt, future::Future, time::Duration};

use log::warn;

/// Fixed-count, fixed-delay retry policy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` below one is raised to one
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} attempt(s), {}s apart",
            self.max_attempts,
            self.delay.as_secs_f64()
        )
    }
}

/// Error returned once every attempt has failed
#[derive(Debug)]
pub struct RetryError {
    pub attempts: u32,
    pub last: anyhow::Error,
}

impl fmt::Display for RetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gave up after {} attempt(s): {:#}", self.attempts, self.last)
    }
}

impl std::error::Error for RetryError {}

/// Run `operation` until it succeeds or the policy is exhausted.
/// The closure receives the 1-based attempt number. On success the value and
/// the number of attempts used are returned.
pub async fn retry<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<(T, u32), RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok((value, attempt)),
            Err(err) if attempt >= policy.max_attempts() => {
                return Err(RetryError {
                    attempts: attempt,
                    last: err,
                });
            }
            Err(err) => {
                warn!(
                    "Attempt {attempt}/{} failed, retrying in {:?}: {err:#}",
                    policy.max_attempts(),
                    policy.delay()
                );
                tokio::time::sleep(policy.delay()).await;
                attempt += 1;
            }
        }
    }
}
