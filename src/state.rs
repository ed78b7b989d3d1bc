use crate::application::aggregate::PageLimits;
use crate::domain::error::OpenApiError;
use crate::domain::model::DatasetKind;
use crate::domain::traits::Upstream;
use crate::infrastructure::config::Config;
use crate::infrastructure::network::client::{HttpUpstream, OpenDataClient};
use crate::infrastructure::network::http::create_client;
use crate::infrastructure::storage::cache::SignatureCache;
use crate::infrastructure::storage::snapshots::ResourceCache;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a dispatch call may touch. Both caches live here rather than in
/// globals, so every instance is isolated.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub signature_cache: Arc<SignatureCache>,
    pub resource_cache: Arc<ResourceCache>,
    /// `None` when no service key is configured.
    pub client: Option<Arc<OpenDataClient>>,
    pub limits: PageLimits,
    pub resource_file: Option<PathBuf>,
}

impl AppState {
    /// Production state over HTTP. If the HTTP client cannot be built the
    /// state comes up uninitialized instead of failing.
    pub fn new(config: Config) -> Self {
        match create_client(&config.network) {
            Ok(client) => {
                let upstream: Arc<dyn Upstream> =
                    Arc::new(HttpUpstream::new(client, config.network.timeout_secs));
                let service_key = config.resolve_service_key();
                Self::with_upstream(config, upstream, service_key)
            }
            Err(e) => {
                tracing::error!(error = %e, "HTTP client unavailable, serving uninitialized");
                Self::offline(config)
            }
        }
    }

    fn offline(config: Config) -> Self {
        Self::with_upstream(config, Arc::new(Offline), None)
    }

    /// Build a state around any [`Upstream`]; the service key gates initialization.
    pub fn with_upstream(
        config: Config,
        upstream: Arc<dyn Upstream>,
        service_key: Option<String>,
    ) -> Self {
        let signature_cache = Arc::new(SignatureCache::with_ttl(config.cache.ttl()));
        let resource_cache = Arc::new(ResourceCache::new(config.cache.resource_ttl()));

        let client = service_key.map(|key| {
            Arc::new(OpenDataClient::new(
                upstream,
                signature_cache.clone(),
                config.network.base_url.clone(),
                key,
            ))
        });

        let limits = PageLimits {
            page_size: config.cache.page_size,
            max_pages: config.cache.max_pages,
        };
        let resource_file = config.resolve_resource_file();

        Self {
            config: Arc::new(config),
            signature_cache,
            resource_cache,
            client,
            limits,
            resource_file,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.client.is_some()
    }

    pub fn client(&self) -> Result<&Arc<OpenDataClient>, OpenApiError> {
        self.client.as_ref().ok_or(OpenApiError::NotInitialized)
    }

    /// Datasets served by this deployment.
    pub fn enabled_datasets(&self) -> Vec<DatasetKind> {
        DatasetKind::ALL
            .into_iter()
            .filter(|k| *k != DatasetKind::Cctv || self.config.datasets.cctv)
            .collect()
    }

    pub fn is_enabled(&self, kind: DatasetKind) -> bool {
        kind != DatasetKind::Cctv || self.config.datasets.cctv
    }
}

/// Placeholder upstream for a state without a client; never called.
struct Offline;

#[async_trait]
impl Upstream for Offline {
    async fn get_json(&self, _: &str, _: &[(&str, String)]) -> Result<Value, OpenApiError> {
        Err(OpenApiError::NotInitialized)
    }
}
