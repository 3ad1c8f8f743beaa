use std::{future::Future, pin::Pin, time::Duration};

use tokio::time::sleep;

pub type BoxFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

/// Runs `operation` up to `max_retries + 1` times, doubling the pause after
/// each failure. The last error is returned when every attempt fails.
pub async fn retry_with_backoff<F, T, E>(
    label: &str,
    mut operation: F,
    max_retries: usize,
    initial_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> BoxFuture<T, E>,
    E: std::fmt::Display,
{
    let mut delay = initial_delay;
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_retries => {
                attempt += 1;
                tracing::warn!("{label}: attempt {attempt} failed: {e}. Retrying in {delay:?}...");
                sleep(delay).await;
                delay *= 2;
            }
            Err(e) => return Err(e),
        }
    }
}
