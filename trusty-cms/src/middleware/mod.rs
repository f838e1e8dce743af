//! Tower middleware applied by the server

pub mod error_detail;
pub mod request_tracking;

pub use error_detail::error_detail;
pub use request_tracking::{sensitive_headers_layer, RequestTracking, SENSITIVE_HEADERS};
