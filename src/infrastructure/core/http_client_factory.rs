use reqwest::Client;
use std::time::Duration;

/// User agent sent with every outbound request
pub const USER_AGENT: &str = concat!("skylog/", env!("CARGO_PKG_VERSION"));

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Creates the shared HTTP client.
    ///
    /// No retry middleware: a failed fetch is retried by the next poll tick.
    /// The connection pool is reused across ticks.
    pub fn create_client() -> Client {
        Self::create_client_with_timeout(REQUEST_TIMEOUT)
    }

    pub fn create_client_with_timeout(timeout: Duration) -> Client {
        Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(2)
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .unwrap_or_else(|_| Client::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_version() {
        assert!(USER_AGENT.starts_with("skylog/"));
        assert!(USER_AGENT.ends_with(env!("CARGO_PKG_VERSION")));
    }
}
