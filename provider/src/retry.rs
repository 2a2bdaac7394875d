use log::warn;
use rhcs_model::clients::HttpStatusCode;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry an operation a fixed number of times, doubling the delay after each failed attempt.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Backoff {
    /// The total number of attempts, including the first one.
    pub attempts: u32,
    /// The delay after the first failed attempt.
    pub initial_delay: Duration,
}

impl Backoff {
    pub fn new(attempts: u32, initial_delay: Duration) -> Self {
        Self {
            attempts,
            initial_delay,
        }
    }

    /// Run `operation` until it succeeds or the attempts are exhausted, returning the last error.
    /// A 404 is returned right away since asking again will not make the object appear.
    pub async fn retry<T, E, F, Fut>(&self, what: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: HttpStatusCode + Display,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.attempts && !e.is_not_found() => {
                    warn!(
                        "Attempt {} of {} to {} failed, retrying in {:?}: {}",
                        attempt, self.attempts, what, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rhcs_model::clients::{ApiError, Error, StatusCode};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn unavailable() -> Error {
        Error::api(
            "get",
            "cluster 'abc'",
            StatusCode::SERVICE_UNAVAILABLE,
            ApiError::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn delay_doubles_between_attempts() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let result: Result<(), Error> = Backoff::new(3, Duration::from_secs(30))
            .retry("get cluster", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(unavailable()) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 30s after the first failure, 60s after the second, nothing after the last.
        assert_eq!(start.elapsed(), Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let result = Backoff::new(3, Duration::from_secs(1))
            .retry("get cluster", || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Err(unavailable())
                    } else {
                        Ok(call)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), Error> = Backoff::new(3, Duration::from_secs(1))
            .retry("get cluster", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(Error::api(
                        "get",
                        "cluster 'abc'",
                        StatusCode::NOT_FOUND,
                        ApiError::default(),
                    ))
                }
            })
            .await;
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
