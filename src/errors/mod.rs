pub mod api_error;
pub mod core_error;

pub use api_error::{ApiError, ErrorResponse};
pub use core_error::CoreError;
