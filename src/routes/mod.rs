pub mod api;
mod error;
pub mod health;

pub use api::*;
pub use error::{ApiError, ErrorResponse, UNAVAILABLE_MESSAGE};
