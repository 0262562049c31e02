//! Retry utility with exponential backoff for operator-initiated fetches.
//!
//! Alert delivery never goes through here: a failed notification is logged
//! and dropped.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Longest pause between two attempts.
const MAX_DELAY: Duration = Duration::from_secs(30);

/// Retry an async operation with exponential backoff.
///
/// Runs at least once. Returns `Ok` on first success, or the last `Err` once
/// `max_attempts` are used up. Delays double from `initial_delay`, capped at 30s.
pub async fn retry_with_backoff<F, Fut, T, E>(
    operation_name: &str,
    max_attempts: u32,
    initial_delay: Duration,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = max_attempts.max(1);
    let mut delay = initial_delay;
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(val) => return Ok(val),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                warn!(
                    "{} failed (attempt {}/{}): {}",
                    operation_name, attempt, attempts, e
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                attempt += 1;
            }
        }
    }
}
