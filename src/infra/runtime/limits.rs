use std::time::Duration;

use crate::infra::config::BackendConfig;

/// Build a reqwest client with sane defaults (short connect timeout, bounded request time).
pub fn make_http_client() -> reqwest::Client {
    make_http_client_with(Duration::from_secs(6))
}

/// Like [`make_http_client`] with a caller-chosen request timeout. Model
/// completions can take far longer than a health probe.
pub fn make_http_client_with(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(2))
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default http client");
            reqwest::Client::new()
        })
}

pub fn client_for(cfg: &BackendConfig) -> reqwest::Client {
    make_http_client_with(cfg.timeout())
}

/// Exponential backoff for async ops; gives up at once on errors `retryable` rejects.
pub async fn retry_async_if<T, E, Fut, F, P>(attempts: u32, retryable: P, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut left = attempts;
    let mut try_num: u32 = 0;
    let mut delay_ms: u64 = 50;
    loop {
        match op(try_num).await {
            Ok(v) => return Ok(v),
            Err(e) if left == 0 || !retryable(&e) => return Err(e),
            Err(_) => {
                left -= 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = (delay_ms * 2).min(1_000);
                try_num += 1;
            }
        }
    }
}
