//! Resolution of the four inbound operations against the caches.
//!
//! Every operation answers with a payload of its expected shape; failures
//! become error documents or error text, never a propagated fault.

use crate::application::query::{read_snapshot, refresh};
use crate::domain::error::OpenApiError;
use crate::domain::model::{
    envelope_items, DatasetKind, ResourceContent, ResourceDescriptor, ResourceSelector,
    ResourceUri, ToolDescriptor, ToolName, ToolOutput, UpstreamQuery, GUIDE_FILE_URI,
};
use crate::domain::traits::PageSource;
use crate::presentation::format::{
    cached_entries_text, error_document, page_text, refresh_text, search_text, SnapshotDocument,
};
use crate::state::AppState;
use serde_json::{json, Value};

const JSON_MIME: &str = "application/json";
const TEXT_MIME: &str = "text/plain";
const MAX_QUERY_PAGE_SIZE: u64 = 1000;

#[derive(Clone)]
pub struct Dispatcher {
    state: AppState,
}

impl Dispatcher {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn list_resources(&self) -> Vec<ResourceDescriptor> {
        let mut out: Vec<ResourceDescriptor> = self
            .state
            .enabled_datasets()
            .into_iter()
            .map(|kind| ResourceDescriptor {
                uri: kind.uri().to_string(),
                name: kind.title().to_string(),
                description: kind.description().to_string(),
                mime_type: JSON_MIME.to_string(),
            })
            .collect();

        if self.state.resource_file.is_some() {
            out.push(ResourceDescriptor {
                uri: GUIDE_FILE_URI.to_string(),
                name: "Sejong guide document".to_string(),
                description: "Free-form reference document about the Sejong datasets".to_string(),
                mime_type: TEXT_MIME.to_string(),
            });
        }
        out
    }

    pub async fn read_resource(&self, uri: &str) -> ResourceContent {
        let as_json = |text: String| ResourceContent {
            uri: uri.to_string(),
            mime_type: JSON_MIME,
            text,
        };

        match ResourceUri::parse(uri) {
            ResourceUri::Dataset(kind) if self.state.is_enabled(kind) => {
                match read_snapshot(&self.state, kind).await {
                    Ok(body) => as_json(body.to_string()),
                    Err(e) => {
                        tracing::warn!(uri, error = %e, "resource read failed");
                        as_json(error_document(&e.to_string()))
                    }
                }
            }
            ResourceUri::GuideFile if self.state.resource_file.is_some() => ResourceContent {
                uri: uri.to_string(),
                mime_type: TEXT_MIME,
                text: self.read_guide_file().await,
            },
            ResourceUri::Dataset(_) | ResourceUri::GuideFile | ResourceUri::Unrecognized(_) => {
                as_json(error_document(&OpenApiError::UnknownResource(uri.to_string()).to_string()))
            }
        }
    }

    async fn read_guide_file(&self) -> String {
        let Some(path) = &self.state.resource_file else {
            return "Resource file is not configured.".to_string();
        };
        match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "guide file unreadable");
                "Resource file could not be found.".to_string()
            }
        }
    }

    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        let kinds: Vec<&str> = self
            .state
            .enabled_datasets()
            .into_iter()
            .map(DatasetKind::slug)
            .collect();
        let mut with_all = kinds.clone();
        with_all.push("all");

        vec![
            ToolDescriptor {
                name: "refresh_data".to_string(),
                description: "Drop cached data and fetch it again from the upstream service."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "resourceType": {
                            "type": "string",
                            "enum": with_all,
                            "description": "Dataset to refresh (all refreshes every dataset)",
                            "default": "all"
                        }
                    },
                    "required": []
                }),
            },
            ToolDescriptor {
                name: "search_data".to_string(),
                description: "Search a dataset by keyword in item names and addresses."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "resourceType": {
                            "type": "string",
                            "enum": kinds,
                            "description": "Dataset to search"
                        },
                        "keyword": {
                            "type": "string",
                            "description": "Case-insensitive substring matched against name and address"
                        }
                    },
                    "required": ["resourceType", "keyword"]
                }),
            },
            ToolDescriptor {
                name: "show_cached_data".to_string(),
                description: "Show the upstream responses currently held in the cache."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "resourceType": {
                            "type": "string",
                            "enum": with_all,
                            "description": "Dataset whose cache entries to show (all shows every entry)",
                            "default": "all"
                        }
                    },
                    "required": []
                }),
            },
            ToolDescriptor {
                name: "query_page".to_string(),
                description: "Fetch a single page of a dataset, optionally filtered by keyword."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "resourceType": {
                            "type": "string",
                            "enum": kinds,
                            "description": "Dataset to query"
                        },
                        "keyword": {
                            "type": "string",
                            "description": "Upstream search keyword (matched against the dataset's search field)"
                        },
                        "page": {
                            "type": "integer",
                            "minimum": 1,
                            "default": 1
                        },
                        "pageSize": {
                            "type": "integer",
                            "minimum": 1,
                            "maximum": MAX_QUERY_PAGE_SIZE,
                            "default": self.state.limits.page_size
                        }
                    },
                    "required": ["resourceType"]
                }),
            },
        ]
    }

    pub async fn call_tool(&self, name: &str, args: &Value) -> ToolOutput {
        let tool = ToolName::parse(name);
        let result = match tool {
            ToolName::RefreshData => self.refresh_data(args).await,
            ToolName::SearchData => self.search_data(args).await,
            ToolName::ShowCachedData => self.show_cached_data(args),
            ToolName::QueryPage => self.query_page(args).await,
            ToolName::Unrecognized(name) => Err(OpenApiError::UnknownTool(format!(
                "{} (available: {})",
                name,
                ToolName::KNOWN.join(", ")
            ))),
        };

        result.unwrap_or_else(|e| {
            if e.is_upstream() {
                tracing::warn!(tool = name, error = %e, "tool call failed upstream");
            } else {
                tracing::debug!(tool = name, error = %e, "tool call rejected");
            }
            ToolOutput::error(format!("❌ {}", e))
        })
    }

    async fn refresh_data(&self, args: &Value) -> Result<ToolOutput, OpenApiError> {
        let selector = self.selector(args, true)?;
        self.state.client()?;

        let mut refreshed = Vec::new();
        let mut failures = Vec::new();
        for kind in self.selected(selector) {
            match refresh(&self.state, kind).await {
                Ok(doc) => {
                    if doc.partial {
                        failures.push(format!(
                            "{}: upstream failed mid-way, only {} items fetched",
                            kind, doc.total_count
                        ));
                    }
                    refreshed.push((kind, doc.total_count));
                }
                Err(e) => failures.push(format!("{}: {}", kind, e)),
            }
        }
        tracing::info!(target_type = selector.label(), datasets = refreshed.len(), "refresh finished");

        if failures.is_empty() {
            return Ok(ToolOutput::ok(refresh_text(selector.label(), &refreshed)));
        }
        Ok(ToolOutput::error(format!(
            "❌ Data refresh incomplete:\n  - {}",
            failures.join("\n  - ")
        )))
    }

    async fn search_data(&self, args: &Value) -> Result<ToolOutput, OpenApiError> {
        let kind = match self.selector(args, false)? {
            ResourceSelector::One(kind) => kind,
            ResourceSelector::All => {
                return Err(OpenApiError::InvalidArgument(
                    "search_data needs a single resourceType, not 'all'".to_string(),
                ))
            }
        };
        let keyword = string_arg(args, &["keyword"])
            .ok_or_else(|| OpenApiError::InvalidArgument("keyword is required".to_string()))?;

        let body = read_snapshot(&self.state, kind).await?;
        let doc = SnapshotDocument::parse(&body)?;
        let matches = filter_items(&doc.data, keyword);
        Ok(ToolOutput::ok(search_text(keyword, &matches)?))
    }

    fn show_cached_data(&self, args: &Value) -> Result<ToolOutput, OpenApiError> {
        let selector = self.selector(args, true)?;
        let cache = &self.state.signature_cache;

        if cache.is_empty() {
            return Ok(ToolOutput::ok("ℹ️ Cache is empty."));
        }

        let entries: Vec<_> = cache
            .entries()
            .into_iter()
            .filter(|e| selector.matches(e.signature.kind))
            .collect();
        if entries.is_empty() {
            return Ok(ToolOutput::ok(format!(
                "ℹ️ No cached data for '{}'.",
                selector.label()
            )));
        }
        Ok(ToolOutput::ok(cached_entries_text(
            selector.label(),
            cache.ttl(),
            &entries,
        )))
    }

    async fn query_page(&self, args: &Value) -> Result<ToolOutput, OpenApiError> {
        let kind = match self.selector(args, false)? {
            ResourceSelector::One(kind) => kind,
            ResourceSelector::All => {
                return Err(OpenApiError::InvalidArgument(
                    "query_page needs a single resourceType, not 'all'".to_string(),
                ))
            }
        };
        let page = int_arg(args, &["page", "pageIndex"], 1, u64::from(u32::MAX))?.unwrap_or(1);
        let page_size = int_arg(args, &["pageSize", "page_size"], 1, MAX_QUERY_PAGE_SIZE)?
            .unwrap_or(self.state.limits.page_size);
        let keyword = string_arg(args, &["keyword"]).unwrap_or_default();

        let client = self.state.client()?;
        let query = UpstreamQuery::new(kind, page, page_size).with_keyword(keyword);
        let payload = client.fetch_page(&query).await?;

        let items = envelope_items(&payload).ok_or_else(|| {
            OpenApiError::UpstreamParse(format!("response has no body.items: {}", header_message(&payload)))
        })?;
        let total = payload
            .get("body")
            .and_then(|b| b.get("totalCount"))
            .and_then(|t| t.as_u64().or_else(|| t.as_str()?.parse().ok()));

        Ok(ToolOutput::ok(page_text(kind, page, total, items)?))
    }

    /// Parse `resourceType`; missing means "all" only where `default_all`.
    fn selector(&self, args: &Value, default_all: bool) -> Result<ResourceSelector, OpenApiError> {
        let raw = match string_arg(args, &["resourceType", "resource_type"]) {
            Some(raw) => raw,
            None if default_all => return Ok(ResourceSelector::All),
            None => {
                return Err(OpenApiError::InvalidArgument(
                    "resourceType is required".to_string(),
                ))
            }
        };

        match ResourceSelector::parse(raw) {
            Some(ResourceSelector::One(kind)) if !self.state.is_enabled(kind) => Err(
                OpenApiError::InvalidArgument(format!("resource type '{}' is not available", raw)),
            ),
            Some(selector) => Ok(selector),
            None => Err(OpenApiError::InvalidArgument(format!(
                "unknown resource type '{}'",
                raw
            ))),
        }
    }

    fn selected(&self, selector: ResourceSelector) -> Vec<DatasetKind> {
        self.state
            .enabled_datasets()
            .into_iter()
            .filter(|k| selector.matches(*k))
            .collect()
    }
}

fn string_arg<'a>(args: &'a Value, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|n| args.get(*n)?.as_str())
}

fn int_arg(args: &Value, names: &[&str], min: u64, max: u64) -> Result<Option<u32>, OpenApiError> {
    let Some((name, value)) = names.iter().find_map(|n| Some((*n, args.get(*n)?))) else {
        return Ok(None);
    };
    let parsed = value
        .as_u64()
        .or_else(|| value.as_str()?.trim().parse().ok())
        .filter(|v| (min..=max).contains(v))
        .ok_or_else(|| {
            OpenApiError::InvalidArgument(format!("{} must be an integer in {}..={}", name, min, max))
        })?;
    u32::try_from(parsed)
        .map(Some)
        .map_err(|_| OpenApiError::InvalidArgument(format!("{} is out of range", name)))
}

fn header_message(payload: &Value) -> String {
    payload
        .get("header")
        .and_then(|h| h.get("resultMsg"))
        .and_then(Value::as_str)
        .unwrap_or("unexpected envelope")
        .to_string()
}

fn text_of(item: &Value, key: &str) -> String {
    match item.get(key) {
        Some(Value::String(s)) => s.to_lowercase(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string().to_lowercase(),
    }
}

/// Case-insensitive substring match on `name` or `address`.
pub fn filter_items(items: &[Value], keyword: &str) -> Vec<Value> {
    let needle = keyword.to_lowercase();
    items
        .iter()
        .filter(|item| {
            text_of(item, "name").contains(&needle) || text_of(item, "address").contains(&needle)
        })
        .cloned()
        .collect()
}
