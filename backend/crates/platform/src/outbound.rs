//! Outbound HTTP client for third-party APIs

use std::time::Duration;

const USER_AGENT: &str = concat!("jobboard-backend/", env!("CARGO_PKG_VERSION"));

/// Build the client shared by payment provider adapters
///
/// Provider calls sit on the request path, so the timeout is kept short.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_builds() {
        assert!(http_client(Duration::from_secs(10)).is_ok());
    }
}
