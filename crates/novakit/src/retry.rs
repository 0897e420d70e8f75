//! Fixed-delay retry for transient CLI failures.

use crate::error::{Error, Result};
use crate::types::RetryConfig;
use std::time::Duration;

/// Callback trait for retry progress notifications.
pub trait RetryCallback {
    /// Called when an operation is being retried.
    ///
    /// # Arguments
    /// * `attempt` - Attempt that just failed (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    /// * `error` - The error that triggered the retry
    /// * `delay` - Time until the next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration);
}

/// Callback that reports retries through the `log` facade.
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration) {
        log::warn!(
            "Attempt {attempt}/{max_attempts} failed: {error}. Retrying in {}s...",
            delay.as_secs()
        );
    }
}

/// Blocking pause between attempts.
pub type Sleeper = dyn Fn(Duration) + Send + Sync;

/// Execute an operation, retrying retryable errors after a fixed delay.
///
/// Non-retryable errors and the error of the final attempt are returned
/// unchanged.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    sleep: &Sleeper,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() || attempt >= max_attempts => return Err(e),
            Err(e) => {
                if let Some(cb) = callback {
                    cb.on_retry(attempt, max_attempts, &e, config.delay);
                }
                sleep(config.delay);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::{Arc, Mutex};

    fn refused() -> Error {
        Error::Transient {
            message: "[Errno 111] Connection refused".to_string(),
        }
    }

    fn no_sleep(_: Duration) {}

    #[test]
    fn test_with_retry_success_first_try() {
        let config = RetryConfig::no_retry();
        let result = with_retry(&config, None, &no_sleep, || Ok::<_, Error>(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_with_retry_non_retryable_error() {
        let attempts = Cell::new(0);

        let result: Result<()> = with_retry(&RetryConfig::default(), None, &no_sleep, || {
            attempts.set(attempts.get() + 1);
            Err(Error::Other("boom".to_string()))
        });

        assert!(matches!(result, Err(Error::Other(_))));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_single_retry_after_fixed_delay() {
        let attempts = Cell::new(0);
        let slept = Arc::new(Mutex::new(Vec::new()));
        let slept_clone = slept.clone();
        let sleep = move |d: Duration| slept_clone.lock().unwrap().push(d);

        let result = with_retry(&RetryConfig::default(), None, &sleep, || {
            attempts.set(attempts.get() + 1);
            if attempts.get() == 1 { Err(refused()) } else { Ok("second") }
        });

        assert_eq!(result.unwrap(), "second");
        assert_eq!(attempts.get(), 2);
        assert_eq!(*slept.lock().unwrap(), vec![Duration::from_secs(10)]);
    }

    #[test]
    fn test_second_transient_failure_propagates() {
        let attempts = Cell::new(0);

        let result: Result<()> = with_retry(&RetryConfig::default(), None, &no_sleep, || {
            attempts.set(attempts.get() + 1);
            Err(refused())
        });

        assert!(matches!(result, Err(Error::Transient { .. })));
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn test_callback_invoked_once() {
        use std::sync::atomic::{AtomicU32, Ordering};

        struct CountingCallback(AtomicU32);
        impl RetryCallback for CountingCallback {
            fn on_retry(&self, attempt: u32, max: u32, _: &Error, delay: Duration) {
                assert_eq!((attempt, max), (1, 2));
                assert_eq!(delay, Duration::from_secs(10));
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let callback = CountingCallback(AtomicU32::new(0));
        let _: Result<()> =
            with_retry(&RetryConfig::default(), Some(&callback), &no_sleep, || Err(refused()));

        assert_eq!(callback.0.load(Ordering::SeqCst), 1);
    }
}
