//! Shared HTTP client for the model services.

use std::time::Duration;

/// HTTP client used by every model-service adapter.
///
/// 10s connect timeout, 120s request timeout (batched model calls are slow),
/// `geokb/{version}` user-agent.
#[must_use]
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(120))
        .user_agent(concat!("geokb/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("default HTTP client construction must not fail")
}

/// Strip trailing slashes so endpoint paths can be appended with `/`.
#[must_use]
pub fn normalize_base_url(mut base_url: String) -> String {
    while base_url.ends_with('/') {
        base_url.pop();
    }
    base_url
}
