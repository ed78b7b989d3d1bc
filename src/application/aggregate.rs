//! Pagination aggregation over an upstream with loose page semantics.
//!
//! Pages are fetched strictly in order, one at a time, since whether another
//! page exists is only known once the current one has arrived.

use crate::domain::model::{envelope_items, DatasetKind, UpstreamQuery};
use crate::domain::traits::PageSource;
use serde_json::Value;

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_MAX_PAGES: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub page_size: u32,
    pub max_pages: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A page came back shorter than requested; it was kept.
    ShortPage,
    EmptyPage,
    /// Null payload or envelope without `body.items`.
    NoContainer,
    PageLimit,
    /// A fetch failed; everything before it was kept.
    Failed(String),
}

/// Result of one run. Items keep upstream order: page order, then item order.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub items: Vec<Value>,
    pub pages_fetched: u32,
    pub stop: StopReason,
}

impl Aggregation {
    pub fn is_partial(&self) -> bool {
        matches!(self.stop, StopReason::Failed(_))
    }
}

/// Fetch every page of `kind` and concatenate the items.
///
/// Never fails: a fetch error ends the run with whatever was accumulated.
pub async fn aggregate(kind: DatasetKind, source: &dyn PageSource, limits: PageLimits) -> Aggregation {
    let base = UpstreamQuery::new(kind, 1, limits.page_size);
    let mut items = Vec::new();
    let mut page = 1u32;

    let stop = loop {
        if page > limits.max_pages {
            tracing::warn!(dataset = %kind, max_pages = limits.max_pages, "page limit reached");
            break StopReason::PageLimit;
        }

        let query = base.at_page(page);
        let payload = match source.fetch_page(&query).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(dataset = %kind, page, error = %e, "page fetch failed, keeping partial result");
                break StopReason::Failed(e.to_string());
            }
        };

        let Some(page_items) = envelope_items(&payload) else {
            break StopReason::NoContainer;
        };
        if page_items.is_empty() {
            break StopReason::EmptyPage;
        }

        items.extend_from_slice(page_items);
        tracing::debug!(dataset = %kind, page, count = page_items.len(), "page aggregated");

        if page_items.len() < limits.page_size as usize {
            break StopReason::ShortPage;
        }
        page += 1;
    };

    // `page` is the last index attempted, except when the limit check stopped us
    let pages_fetched = if stop == StopReason::PageLimit {
        limits.max_pages
    } else {
        page
    };

    Aggregation {
        items,
        pages_fetched,
        stop,
    }
}
