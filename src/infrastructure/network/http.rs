// HTTP client utilities
use crate::domain::error::OpenApiError;
use crate::infrastructure::config::NetworkConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;

/// Create the shared HTTP client for upstream calls
pub fn create_client(network: &NetworkConfig) -> Result<Client, OpenApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    Client::builder()
        .default_headers(headers)
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(std::time::Duration::from_secs(30))
        .connect_timeout(network.timeout())
        .timeout(network.timeout())
        .user_agent(network.user_agent.as_str())
        .danger_accept_invalid_certs(network.accept_invalid_certs)
        .build()
        .map_err(|e| OpenApiError::Config(format!("Failed to build HTTP client: {}", e)))
}
