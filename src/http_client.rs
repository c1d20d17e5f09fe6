use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, redirect};
use std::time::Duration;

/// Shared client settings for Reddit and the completion endpoint.
///
/// Redirects are never followed: Reddit answers unknown communities with a
/// redirect to its search page, which must surface as a miss.
pub fn build_client(timeout_secs: u64, user_agent: &str) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .redirect(redirect::Policy::none())
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
}

/// `Retry-After` in whole seconds. Fractional values round up.
pub fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    let secs = raw.parse::<f64>().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(secs.ceil() as u64)
}
