//! HTTP API module.
//!
//! Broadcaster announce/teardown, viewer registration and a liveness check.

mod error;
pub mod handlers;
mod routes;
mod state;
pub mod types;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;
