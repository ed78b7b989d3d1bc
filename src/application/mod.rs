pub mod aggregate;
pub mod dispatch;
pub mod query;
