//! Shared fixtures: an in-process upstream that pages over canned records.

#![allow(dead_code)]

use async_trait::async_trait;
use openapi_korea::domain::error::OpenApiError;
use openapi_korea::domain::model::DatasetKind;
use openapi_korea::domain::traits::Upstream;
use openapi_korea::infrastructure::config::Config;
use openapi_korea::{AppState, Dispatcher};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct StubUpstream {
    records: Mutex<HashMap<DatasetKind, Vec<Value>>>,
    fail_pages: Mutex<HashMap<DatasetKind, u32>>,
    calls: AtomicUsize,
}

impl StubUpstream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_records(&self, kind: DatasetKind, records: Vec<Value>) {
        self.records.lock().unwrap().insert(kind, records);
    }

    /// Make `page` of `kind` fail with a timeout.
    pub fn fail_on(&self, kind: DatasetKind, page: u32) {
        self.fail_pages.lock().unwrap().insert(kind, page);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn kind_for(endpoint: &str) -> Option<DatasetKind> {
        DatasetKind::ALL
            .into_iter()
            .find(|k| endpoint.ends_with(k.endpoint_path()))
    }
}

#[async_trait]
impl Upstream for StubUpstream {
    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Value, OpenApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let param = |name: &str| {
            params
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };
        let page: usize = param("pageIndex").parse().unwrap_or(1);
        let size: usize = param("pageUnit").parse().unwrap_or(100);
        let keyword = param("searchKeyword");

        let kind = Self::kind_for(endpoint)
            .ok_or_else(|| OpenApiError::UpstreamTransport(format!("404 for {}", endpoint)))?;
        if self.fail_pages.lock().unwrap().get(&kind) == Some(&(page as u32)) {
            return Err(OpenApiError::UpstreamTimeout(30));
        }

        let all = self.records.lock().unwrap().get(&kind).cloned().unwrap_or_default();
        let filtered: Vec<Value> = all
            .into_iter()
            .filter(|r| keyword.is_empty() || r.to_string().contains(&keyword))
            .collect();
        let items: Vec<Value> = filtered
            .iter()
            .skip((page - 1) * size)
            .take(size)
            .cloned()
            .collect();

        Ok(json!({
            "header": {"resultCode": "00", "resultMsg": "NORMAL SERVICE"},
            "body": {"items": items, "totalCount": filtered.len(), "pageIndex": page}
        }))
    }
}

pub fn parking_records(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            json!({
                "prkplceNo": format!("P-{}", i),
                "prkplceNm": format!("Lot {}", i),
                "rdnmadr": format!("{} Hanuri-daero", i),
                "latitude": "36.48",
                "longitude": "127.28"
            })
        })
        .collect()
}

pub fn dispatcher_with(config: Config, upstream: Arc<StubUpstream>) -> Dispatcher {
    Dispatcher::new(AppState::with_upstream(
        config,
        upstream,
        Some("TEST-KEY".to_string()),
    ))
}

pub fn dispatcher(upstream: Arc<StubUpstream>) -> Dispatcher {
    dispatcher_with(Config::default(), upstream)
}

pub fn uninitialized() -> Dispatcher {
    Dispatcher::new(AppState::with_upstream(Config::default(), StubUpstream::new(), None))
}
