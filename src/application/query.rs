use crate::application::aggregate::aggregate;
use crate::domain::error::OpenApiError;
use crate::domain::model::DatasetKind;
use crate::infrastructure::storage::snapshots::Computed;
use crate::presentation::format::{format_snapshot, SnapshotDocument};
use crate::state::AppState;
use std::sync::Arc;

/// Read one dataset snapshot.
///
/// 1. Resource cache
/// 2. Full pagination run, each page going through the signature cache
/// 3. Write back (complete runs only)
pub async fn read_snapshot(state: &AppState, kind: DatasetKind) -> Result<Arc<str>, OpenApiError> {
    let client = state.client()?.clone();
    let limits = state.limits;

    state
        .resource_cache
        .get_or_compute(kind, || async move {
            let run = aggregate(kind, &*client, limits).await;
            tracing::info!(
                dataset = %kind,
                items = run.items.len(),
                pages = run.pages_fetched,
                stop = ?run.stop,
                "dataset aggregated"
            );
            let partial = run.is_partial();
            let body = format_snapshot(kind, &run.items, partial)?;
            Ok::<_, OpenApiError>(Computed {
                body,
                cacheable: !partial,
            })
        })
        .await
}

/// Drop both cache tiers for `kind`: its signature entries, then its snapshot.
pub fn invalidate(state: &AppState, kind: DatasetKind) {
    let pages = state.signature_cache.clear_matching(|sig| sig.kind == kind);
    let had_snapshot = state.resource_cache.invalidate(kind);
    tracing::debug!(dataset = %kind, pages, had_snapshot, "dataset invalidated");
}

/// Invalidate then eagerly repopulate. On failure the dataset stays cold.
pub async fn refresh(state: &AppState, kind: DatasetKind) -> Result<SnapshotDocument, OpenApiError> {
    state.client()?;
    invalidate(state, kind);
    let body = read_snapshot(state, kind).await?;
    SnapshotDocument::parse(&body)
}
