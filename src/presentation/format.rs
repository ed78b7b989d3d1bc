use crate::domain::error::OpenApiError;
use crate::domain::model::DatasetKind;
use crate::infrastructure::storage::cache::EntryInfo;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt::Write;
use std::time::Duration;

const PREVIEW_CHARS: usize = 200;

/// The JSON document stored in the resource cache for one dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(rename = "type")]
    pub kind: String,
    pub total_count: usize,
    pub last_updated: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
    pub data: Vec<Value>,
}

impl SnapshotDocument {
    pub fn parse(body: &str) -> Result<Self, OpenApiError> {
        Ok(serde_json::from_str(body)?)
    }
}

fn snapshot_type(kind: DatasetKind) -> &'static str {
    match kind {
        DatasetKind::Parking => "sejong_parking_lots",
        DatasetKind::SmokingArea => "sejong_smoking_areas",
        DatasetKind::Restaurant => "sejong_restaurants",
        DatasetKind::Cctv => "sejong_cctv_info",
    }
}

/// (output field, upstream field) pairs, coordinates excluded.
fn field_map(kind: DatasetKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        DatasetKind::Parking => &[
            ("id", "prkplceNo"),
            ("name", "prkplceNm"),
            ("address", "rdnmadr"),
            ("parking_spaces", "prkcmprt"),
            ("fee_info", "feedingSe"),
            ("phone", "phoneNumber"),
            ("open_time", "operOpenHm"),
            ("close_time", "operCloseHm"),
            ("operation_day", "operDay"),
            ("facility_type", "prkplceSe"),
        ],
        DatasetKind::SmokingArea => &[
            ("id", "smkngAreaNo"),
            ("name", "smkngAreaNm"),
            ("address", "rdnmadr"),
            ("management_org", "mngmtInsttNm"),
            ("management_phone", "mngmtInsttPhoneNumber"),
        ],
        DatasetKind::Restaurant => &[
            ("id", "restaurantId"),
            ("name", "mtlty"),
            ("address", "addr"),
            ("main_menu", "main_menu"),
            ("phone", "telno"),
            ("business_type", "bizestblSe"),
        ],
        DatasetKind::Cctv => &[
            ("id", "cctvId"),
            ("address", "rdnmadr"),
            ("installation_purpose", "instlPurpsSe"),
            ("camera_pixel", "cmeraPixel"),
            ("installation_year", "instlYear"),
            ("management_org", "mngmtInsttNm"),
            ("management_phone", "mngmtInsttPhoneNumber"),
        ],
    }
}

fn field(raw: &Value, key: &str) -> Value {
    match raw.get(key) {
        Some(Value::Null) | None => Value::String(String::new()),
        Some(v) => v.clone(),
    }
}

/// Map one raw upstream record to the normalized item shape.
pub fn normalize_item(kind: DatasetKind, raw: &Value) -> Value {
    let mut out = Map::new();
    for (to, from) in field_map(kind) {
        out.insert((*to).to_string(), field(raw, from));
    }
    out.insert(
        "coordinates".to_string(),
        json!({
            "latitude": field(raw, "latitude"),
            "longitude": field(raw, "longitude"),
        }),
    );
    Value::Object(out)
}

pub fn format_snapshot(kind: DatasetKind, items: &[Value], partial: bool) -> Result<String, OpenApiError> {
    let data: Vec<Value> = items.iter().map(|raw| normalize_item(kind, raw)).collect();
    let doc = SnapshotDocument {
        kind: snapshot_type(kind).to_string(),
        total_count: data.len(),
        last_updated: chrono::Local::now().to_rfc3339(),
        partial,
        data,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Error payload for resource reads: still a valid JSON document.
pub fn error_document(message: &str) -> String {
    serde_json::to_string_pretty(&json!({ "error": message }))
        .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", message.replace('"', "'")))
}

pub fn refresh_text(label: &str, refreshed: &[(DatasetKind, usize)]) -> String {
    let mut out = format!("✅ {} data refreshed successfully.", label);
    for (kind, count) in refreshed {
        write!(out, "\n  - {}: {} items", kind, count).ok();
    }
    out
}

pub fn search_text(keyword: &str, matches: &[Value]) -> Result<String, OpenApiError> {
    Ok(format!(
        "🔍 Search results for '{}': {} items found.\n{}",
        keyword,
        matches.len(),
        serde_json::to_string_pretty(matches)?
    ))
}

pub fn page_text(kind: DatasetKind, page: u32, total_count: Option<u64>, items: &[Value]) -> Result<String, OpenApiError> {
    let data: Vec<Value> = items.iter().map(|raw| normalize_item(kind, raw)).collect();
    let mut out = format!("📄 {} page {}: {} items", kind.title(), page, data.len());
    if let Some(total) = total_count {
        write!(out, " (total {})", total).ok();
    }
    write!(out, "\n{}", serde_json::to_string_pretty(&data)?).ok();
    Ok(out)
}

fn preview(value: &Value) -> String {
    let raw = value.to_string();
    if raw.chars().count() <= PREVIEW_CHARS {
        return raw;
    }
    let cut: String = raw.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", cut)
}

pub fn cached_entries_text(label: &str, ttl: Duration, entries: &[EntryInfo]) -> String {
    let mut out = format!("## 📦 Cached data ({}, TTL {}s)", label, ttl.as_secs());
    for entry in entries {
        write!(
            out,
            "\n- **Key:** `{}`\n  - **Cached at:** {}\n  - **Remaining TTL:** {}s\n  - **Preview:** `{}`",
            entry.signature,
            entry.stored_at.to_rfc3339(),
            entry.remaining.as_secs(),
            preview(&entry.value)
        )
        .ok();
    }
    out
}
