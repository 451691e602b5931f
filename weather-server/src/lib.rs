//! HTTP boundary for the weather fetch pipeline.
//!
//! Exposes the upload, bulk fetch and progress stages over JSON, with an
//! overall timeout on the bulk fetch route.

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;
pub mod timeout;

pub use error::ApiError;
pub use router::create_router;
pub use state::AppState;
