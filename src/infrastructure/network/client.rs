use crate::domain::error::OpenApiError;
use crate::domain::model::{envelope_items, UpstreamQuery};
use crate::domain::traits::{PageSource, Upstream};
use crate::infrastructure::storage::cache::SignatureCache;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;

/// [`Upstream`] over a native reqwest client.
pub struct HttpUpstream {
    client: Client,
    timeout_secs: u64,
}

impl HttpUpstream {
    pub fn new(client: Client, timeout_secs: u64) -> Self {
        Self {
            client,
            timeout_secs,
        }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Value, OpenApiError> {
        let classify = |e: reqwest::Error| OpenApiError::from_reqwest(e, self.timeout_secs);

        let response = self
            .client
            .get(endpoint)
            .query(params)
            .send()
            .await
            .map_err(classify)?
            .error_for_status()
            .map_err(classify)?;

        let bytes = response.bytes().await.map_err(classify)?;
        serde_json::from_slice(&bytes).map_err(|e| OpenApiError::UpstreamParse(e.to_string()))
    }
}

/// Dataset-aware client: turns an [`UpstreamQuery`] into an endpoint call and
/// keeps the per-signature cache in front of it.
pub struct OpenDataClient {
    upstream: Arc<dyn Upstream>,
    cache: Arc<SignatureCache>,
    base_url: String,
    service_key: String,
}

impl OpenDataClient {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        cache: Arc<SignatureCache>,
        base_url: impl Into<String>,
        service_key: impl Into<String>,
    ) -> Self {
        Self {
            upstream,
            cache,
            base_url: base_url.into(),
            service_key: service_key.into(),
        }
    }

    fn endpoint(&self, query: &UpstreamQuery) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            query.kind.endpoint_path()
        )
    }

    fn params(&self, query: &UpstreamQuery) -> Vec<(&'static str, String)> {
        vec![
            ("serviceKey", self.service_key.clone()),
            ("pageIndex", query.page_index.to_string()),
            ("pageUnit", query.page_size.to_string()),
            ("dataTy", "json".to_string()),
            ("searchCondition", query.search_condition.clone()),
            ("searchKeyword", query.search_keyword.clone()),
        ]
    }
}

#[async_trait]
impl PageSource for OpenDataClient {
    async fn fetch_page(&self, query: &UpstreamQuery) -> Result<Value, OpenApiError> {
        let sig = query.signature();

        if let Some(cached) = self.cache.lookup(&sig) {
            tracing::debug!(key = %sig, "signature cache hit");
            return Ok(cached);
        }

        tracing::debug!(key = %sig, "fetching from upstream");
        let payload = self
            .upstream
            .get_json(&self.endpoint(query), &self.params(query))
            .await?;

        // error envelopes (no body.items) must not pin a bad answer for a whole TTL
        if envelope_items(&payload).is_some() {
            self.cache.store(sig, payload.clone());
        }

        Ok(payload)
    }
}
