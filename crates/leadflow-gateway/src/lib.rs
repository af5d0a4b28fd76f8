//! # Leadflow Gateway
//! HTTP API over the lead board and the campaign controller.

pub mod error;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, build_router, start};
