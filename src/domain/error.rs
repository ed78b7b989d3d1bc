use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenApiError {
    #[error("Upstream request timed out after {0} seconds")]
    UpstreamTimeout(u64),

    #[error("Upstream transport error: {0}")]
    UpstreamTransport(String),

    #[error("Upstream response could not be parsed: {0}")]
    UpstreamParse(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("API client is not initialized. Set OPENAPI_KOREA_SERVICE_KEY or service_key in the config file.")]
    NotInitialized,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl OpenApiError {
    /// Classify a reqwest failure into the upstream taxonomy.
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            OpenApiError::UpstreamTimeout(timeout_secs)
        } else if err.is_decode() {
            OpenApiError::UpstreamParse(err.to_string())
        } else {
            OpenApiError::UpstreamTransport(err.to_string())
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            OpenApiError::UpstreamTimeout(_)
                | OpenApiError::UpstreamTransport(_)
                | OpenApiError::UpstreamParse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_classification() {
        assert!(OpenApiError::UpstreamTimeout(30).is_upstream());
        assert!(OpenApiError::UpstreamParse("eof".into()).is_upstream());
        assert!(!OpenApiError::NotInitialized.is_upstream());
        assert!(!OpenApiError::UnknownTool("x".into()).is_upstream());
    }

    #[test]
    fn test_timeout_message_names_duration() {
        let msg = OpenApiError::UpstreamTimeout(30).to_string();
        assert!(msg.contains("30 seconds"));
    }
}
