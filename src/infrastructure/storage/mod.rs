pub mod cache;
pub mod snapshots;
