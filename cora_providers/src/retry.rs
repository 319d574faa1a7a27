use std::fmt::Display;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Retry an async operation, waiting `delays[i]` before retry `i + 1`.
///
/// # Arguments
/// * `operation` - The async operation to retry
/// * `delays` - Wait before each retry; an empty slice means a single attempt
/// * `should_retry` - Errors for which this returns `false` are returned immediately
///
/// # Returns
/// The result of the operation if successful, or the last error if all retries fail
pub async fn retry_with_backoff<F, Fut, T, E, R>(
    mut operation: F,
    delays: &[Duration],
    should_retry: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Display,
    R: Fn(&E) -> bool,
{
    let total = delays.len() + 1;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                let Some(delay) = delays.get(attempt - 1) else {
                    return Err(e);
                };
                if !should_retry(&e) {
                    return Err(e);
                }
                warn!(
                    "Request failed (attempt {}/{}): {e}. Retrying after {}ms...",
                    attempt,
                    total,
                    delay.as_millis()
                );
                sleep(*delay).await;
                attempt += 1;
            }
        }
    }
}
