use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::errors::AppError;

/// Bounded exponential backoff shared by the block-explorer and
/// price-oracle clients (spec §4.2): up to 5 attempts, sleeping
/// `0.2 * 2^k` seconds between them, retrying on any transport or
/// non-2xx response. On exhaustion the final error bubbles up as
/// `AppError::Connection`.
pub const RETRY_MAX: u32 = 5;
pub const RETRY_BACKOFF_SECS: f64 = 0.2;

pub async fn with_retry<T, E, F, Fut>(description: &str, mut attempt: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut retries = 0u32;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                debug!("{description} failed (attempt {retries}): {e}");
                if retries >= RETRY_MAX {
                    return Err(AppError::Connection(format!(
                        "could not fetch data for {description}: {e}"
                    )));
                }
                let backoff = RETRY_BACKOFF_SECS * 2f64.powi(retries as i32);
                tokio::time::sleep(Duration::from_secs_f64(backoff)).await;
                retries += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retrying_on_first_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, AppError> = with_retry("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(42)
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_retry_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, AppError> = with_retry("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<u32, _>("boom".to_string())
        })
        .await;

        assert!(matches!(result, Err(AppError::Connection(_))));
        assert_eq!(calls.load(Ordering::SeqCst), RETRY_MAX + 1);
    }
}
