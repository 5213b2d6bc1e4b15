//! Retry logic with exponential backoff for transient errors.

use crate::error::{Error, Result};
use std::thread;
use std::time::Duration;

/// Retry policy for remote calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff_factor: 2.0,
            max_delay,
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Delay before retrying after `error`, honouring a server-suggested wait.
    pub fn delay_for_error(&self, attempt: u32, error: &Error) -> Duration {
        match error {
            Error::RateLimited {
                retry_after: Some(wait),
            } => (*wait).min(self.max_delay),
            _ => self.delay_for_attempt(attempt),
        }
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

/// Callback trait for retry progress notifications.
pub trait RetryCallback {
    /// Called when an operation is being retried.
    ///
    /// # Arguments
    /// * `attempt` - Attempt that just failed (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    /// * `error` - The error that triggered the retry
    /// * `delay` - Wait before the next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration);
}

/// Callback that logs retries under an operation label.
pub struct LogCallback<'a>(pub &'a str);

impl RetryCallback for LogCallback<'_> {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration) {
        log::warn!(
            "{}: attempt {}/{} failed: {}. Retrying in {:.1}s",
            self.0,
            attempt,
            max_attempts,
            error,
            delay.as_secs_f64()
        );
    }
}

/// Execute an operation with retry logic.
///
/// Retries the operation while it returns a retryable error, using
/// exponential backoff between attempts. Non-retryable errors are returned
/// immediately.
///
/// # Returns
/// The result of the operation, or the last error if all attempts failed.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() || attempt + 1 >= max_attempts {
                    return Err(e);
                }

                let delay = config.delay_for_error(attempt, &e);
                if let Some(cb) = callback {
                    cb.on_retry(attempt + 1, max_attempts, &e, delay);
                }

                thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(10),
        }
    }

    fn network_error() -> Error {
        Error::TransientNetwork {
            message: "timeout".to_string(),
        }
    }

    #[test]
    fn test_with_retry_success_first_try() {
        let config = RetryConfig::no_retry();
        let result = with_retry(&config, None, || Ok::<_, Error>(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_with_retry_non_retryable_error() {
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<()> = with_retry(&fast_config(), None, || {
            attempts_clone.set(attempts_clone.get() + 1);
            Err(Error::Conflict {
                message: "name already exists".to_string(),
            })
        });

        assert!(result.is_err());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_with_retry_invalid_credential_not_retried() {
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<()> = with_retry(&fast_config(), None, || {
            attempts_clone.set(attempts_clone.get() + 1);
            Err(Error::InvalidCredential {
                message: "Bad credentials".to_string(),
            })
        });

        assert!(result.unwrap_err().is_invalid_credential());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_with_retry_eventual_success() {
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();

        let result = with_retry(&fast_config(), None, || {
            let current = attempts_clone.get();
            attempts_clone.set(current + 1);
            if current < 2 { Err(network_error()) } else { Ok(42) }
        });

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_with_retry_all_attempts_fail() {
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<()> = with_retry(&fast_config(), None, || {
            attempts_clone.set(attempts_clone.get() + 1);
            Err(Error::RateLimited { retry_after: None })
        });

        assert!(matches!(result, Err(Error::RateLimited { .. })));
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let config = RetryConfig {
            max_attempts: 0,
            ..fast_config()
        };
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();

        let _: Result<()> = with_retry(&config, None, || {
            attempts_clone.set(attempts_clone.get() + 1);
            Err(network_error())
        });

        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_callback_invoked() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU32, Ordering};

        struct CountingCallback(Arc<AtomicU32>);
        impl RetryCallback for CountingCallback {
            fn on_retry(&self, _: u32, _: u32, _: &Error, _: Duration) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let callback_count = Arc::new(AtomicU32::new(0));
        let callback = CountingCallback(callback_count.clone());

        let _: Result<()> = with_retry(&fast_config(), Some(&callback), || Err(network_error()));

        // Called for each retry, not for the final failure
        assert_eq!(callback_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_delay_for_attempt() {
        let config = RetryConfig::new(5, Duration::from_secs(1), Duration::from_secs(5));

        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(5));
    }

    #[test]
    fn test_delay_honours_retry_after_with_cap() {
        let config = RetryConfig::new(3, Duration::from_secs(1), Duration::from_secs(10));
        let short = Error::RateLimited {
            retry_after: Some(Duration::from_secs(3)),
        };
        let long = Error::RateLimited {
            retry_after: Some(Duration::from_secs(600)),
        };

        assert_eq!(config.delay_for_error(0, &short), Duration::from_secs(3));
        assert_eq!(config.delay_for_error(0, &long), Duration::from_secs(10));
        assert_eq!(
            config.delay_for_error(1, &network_error()),
            Duration::from_secs(2)
        );
    }
}
