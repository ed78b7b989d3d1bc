use crate::domain::error::OpenApiError;
use crate::domain::model::UpstreamQuery;
use async_trait::async_trait;
use serde_json::Value;

/// One network round trip to the upstream open-data service.
///
/// Implementations URL-encode `params`, perform a GET against `endpoint`
/// and return the parsed JSON body. Any failure is reported as one of the
/// upstream error kinds (timeout, transport, parse).
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Value, OpenApiError>;
}

/// Source of single result pages for the pagination aggregator.
///
/// The production implementation answers from the signature cache and
/// falls back to [`Upstream`] on a miss.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, query: &UpstreamQuery) -> Result<Value, OpenApiError>;
}
