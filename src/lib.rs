pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod presentation;
pub mod state;

pub use application::dispatch::Dispatcher;
pub use domain::error::OpenApiError;
pub use state::AppState;
