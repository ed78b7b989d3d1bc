use serde::{Deserialize, Serialize};
use std::fmt;

pub const GUIDE_FILE_URI: &str = "dataset://guide/file";

/// One of the upstream open-data datasets. The set is closed and known at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Parking,
    SmokingArea,
    Restaurant,
    Cctv,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 4] = [
        DatasetKind::Parking,
        DatasetKind::SmokingArea,
        DatasetKind::Restaurant,
        DatasetKind::Cctv,
    ];

    /// Name used in tool arguments (`resourceType`).
    pub fn slug(self) -> &'static str {
        match self {
            DatasetKind::Parking => "parking",
            DatasetKind::SmokingArea => "smoking_area",
            DatasetKind::Restaurant => "restaurant",
            DatasetKind::Cctv => "cctv",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        DatasetKind::ALL.into_iter().find(|k| k.slug() == slug)
    }

    pub fn uri(self) -> &'static str {
        match self {
            DatasetKind::Parking => "dataset://parking/list",
            DatasetKind::SmokingArea => "dataset://smoking-area/list",
            DatasetKind::Restaurant => "dataset://restaurant/list",
            DatasetKind::Cctv => "dataset://cctv/list",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            DatasetKind::Parking => "Sejong parking lots",
            DatasetKind::SmokingArea => "Sejong smoking areas",
            DatasetKind::Restaurant => "Sejong restaurants",
            DatasetKind::Cctv => "Sejong CCTV locations",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            DatasetKind::Parking => "All parking lots in Sejong City",
            DatasetKind::SmokingArea => "All designated smoking areas in Sejong City",
            DatasetKind::Restaurant => "All restaurants registered in Sejong City",
            DatasetKind::Cctv => "All public CCTV installations in Sejong City",
        }
    }

    /// Path of the dataset's endpoint below the upstream base URL.
    pub fn endpoint_path(self) -> &'static str {
        match self {
            DatasetKind::Parking => "sjParkingLotInformation1/sj_00000949",
            DatasetKind::SmokingArea => "sjSmokingAreaLocation/sj_00001180",
            DatasetKind::Restaurant => "sjRegularRestaurant/sj_00000760",
            DatasetKind::Cctv => "sjCCTV/sj_00000030",
        }
    }

    /// Upstream field the `searchKeyword` parameter is matched against.
    pub fn search_condition(self) -> &'static str {
        match self {
            DatasetKind::Parking | DatasetKind::SmokingArea => "nm",
            DatasetKind::Restaurant => "mtlty",
            DatasetKind::Cctv => "rdnmadr",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Immutable description of one upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamQuery {
    pub kind: DatasetKind,
    pub page_index: u32,
    pub page_size: u32,
    pub search_condition: String,
    pub search_keyword: String,
}

impl UpstreamQuery {
    pub fn new(kind: DatasetKind, page_index: u32, page_size: u32) -> Self {
        Self {
            kind,
            page_index,
            page_size,
            search_condition: kind.search_condition().to_string(),
            search_keyword: String::new(),
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.search_keyword = keyword.into();
        self
    }

    /// A new query for another page; `self` is left untouched.
    pub fn at_page(&self, page_index: u32) -> Self {
        Self {
            page_index,
            ..self.clone()
        }
    }

    pub fn signature(&self) -> CallSignature {
        CallSignature {
            kind: self.kind,
            page_index: self.page_index,
            page_size: self.page_size,
            search_condition: self.search_condition.clone(),
            search_keyword: self.search_keyword.clone(),
        }
    }
}

/// Cache key for one upstream call. Equality is field-wise, so the order in
/// which parameters were supplied never matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSignature {
    pub kind: DatasetKind,
    pub page_index: u32,
    pub page_size: u32,
    pub search_condition: String,
    pub search_keyword: String,
}

impl fmt::Display for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}_{}",
            self.kind, self.page_index, self.page_size, self.search_condition, self.search_keyword
        )
    }
}

/// Items of one upstream page (`body.items`), or `None` when the envelope
/// lacks the container.
pub fn envelope_items(payload: &serde_json::Value) -> Option<&[serde_json::Value]> {
    payload
        .get("body")?
        .get("items")?
        .as_array()
        .map(Vec::as_slice)
}

/// Resource identifiers accepted by `readResource`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceUri {
    Dataset(DatasetKind),
    GuideFile,
    Unrecognized(String),
}

impl ResourceUri {
    pub fn parse(uri: &str) -> Self {
        if uri == GUIDE_FILE_URI {
            return ResourceUri::GuideFile;
        }
        DatasetKind::ALL
            .into_iter()
            .find(|k| k.uri() == uri)
            .map(ResourceUri::Dataset)
            .unwrap_or_else(|| ResourceUri::Unrecognized(uri.to_string()))
    }
}

/// Tools accepted by `callTool`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolName {
    RefreshData,
    SearchData,
    ShowCachedData,
    QueryPage,
    Unrecognized(String),
}

impl ToolName {
    pub const KNOWN: [&'static str; 4] =
        ["refresh_data", "search_data", "show_cached_data", "query_page"];

    pub fn parse(name: &str) -> Self {
        match name {
            "refresh_data" => ToolName::RefreshData,
            "search_data" => ToolName::SearchData,
            "show_cached_data" => ToolName::ShowCachedData,
            "query_page" => ToolName::QueryPage,
            other => ToolName::Unrecognized(other.to_string()),
        }
    }
}

/// `resourceType` argument of the tools: one dataset or every dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceSelector {
    All,
    One(DatasetKind),
}

impl ResourceSelector {
    pub fn parse(value: &str) -> Option<Self> {
        if value == "all" {
            return Some(ResourceSelector::All);
        }
        DatasetKind::from_slug(value).map(ResourceSelector::One)
    }

    pub fn matches(self, kind: DatasetKind) -> bool {
        match self {
            ResourceSelector::All => true,
            ResourceSelector::One(k) => k == kind,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceSelector::All => "all",
            ResourceSelector::One(k) => k.slug(),
        }
    }
}

/// Entry of the `listResources` answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// Entry of the `listTools` answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// A document produced by `readResource`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceContent {
    pub uri: String,
    pub mime_type: &'static str,
    pub text: String,
}

/// Text answer of `callTool`; `is_error` marks structured failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_round_trip_for_every_dataset() {
        for kind in DatasetKind::ALL {
            assert_eq!(ResourceUri::parse(kind.uri()), ResourceUri::Dataset(kind));
        }
        assert_eq!(ResourceUri::parse(GUIDE_FILE_URI), ResourceUri::GuideFile);
        assert_eq!(
            ResourceUri::parse("dataset://nonexistent"),
            ResourceUri::Unrecognized("dataset://nonexistent".to_string())
        );
    }

    #[test]
    fn test_page_advance_builds_new_query() {
        let first = UpstreamQuery::new(DatasetKind::Restaurant, 1, 100);
        let second = first.at_page(2);
        assert_eq!(first.page_index, 1);
        assert_eq!(second.page_index, 2);
        assert_eq!(second.search_condition, "mtlty");
        assert_ne!(first.signature(), second.signature());
    }

    #[test]
    fn test_signature_distinguishes_kind_and_keyword() {
        let a = UpstreamQuery::new(DatasetKind::Parking, 1, 100).signature();
        let b = UpstreamQuery::new(DatasetKind::SmokingArea, 1, 100).signature();
        let c = UpstreamQuery::new(DatasetKind::Parking, 1, 100)
            .with_keyword("sejong")
            .signature();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, UpstreamQuery::new(DatasetKind::Parking, 1, 100).signature());
        assert_eq!(a.to_string(), "parking_1_100_nm_");
    }

    #[test]
    fn test_envelope_items() {
        let page = serde_json::json!({"body": {"items": [{"a": 1}], "totalCount": 1}});
        assert_eq!(envelope_items(&page).map(<[_]>::len), Some(1));
        assert!(envelope_items(&serde_json::json!({"header": {}})).is_none());
        assert!(envelope_items(&serde_json::json!({"body": {"items": ""}})).is_none());
        assert!(envelope_items(&serde_json::Value::Null).is_none());
    }

    #[test]
    fn test_selector_parsing() {
        assert_eq!(ResourceSelector::parse("all"), Some(ResourceSelector::All));
        assert_eq!(
            ResourceSelector::parse("smoking_area"),
            Some(ResourceSelector::One(DatasetKind::SmokingArea))
        );
        assert_eq!(ResourceSelector::parse("smoking-area"), None);
        assert!(ResourceSelector::All.matches(DatasetKind::Cctv));
        assert!(!ResourceSelector::One(DatasetKind::Parking).matches(DatasetKind::Cctv));
    }

    #[test]
    fn test_tool_name_fallthrough() {
        assert_eq!(ToolName::parse("search_data"), ToolName::SearchData);
        assert_eq!(
            ToolName::parse("not_a_tool"),
            ToolName::Unrecognized("not_a_tool".to_string())
        );
    }
}
