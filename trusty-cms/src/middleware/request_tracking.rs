//! Request tracking middleware
//!
//! Every request gets a TypeID request id (`req_01h455vb4pex5vsknk084sn02q`)
//! unless the client sent one, and the id is echoed on the response under
//! the same header. Credential-bearing headers are marked sensitive so the
//! trace layer never logs them.

use http::HeaderName;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
};

use crate::error::{Error, Result};
use crate::ids::MakeTypedRequestId;

/// Headers masked in logs
pub const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie", "x-api-key"];

/// Request id header and its layers
#[derive(Debug, Clone)]
pub struct RequestTracking {
    header: HeaderName,
}

impl RequestTracking {
    /// Tracking under `header` (normally `x-request-id`)
    pub fn new(header: &str) -> Result<Self> {
        let header = HeaderName::try_from(header.to_ascii_lowercase())
            .map_err(|e| Error::Internal(format!("Invalid request id header '{header}': {e}")))?;
        Ok(Self { header })
    }

    /// Header carrying the request id
    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Assigns an id to requests that arrive without one
    pub fn request_id_layer(&self) -> SetRequestIdLayer<MakeTypedRequestId> {
        SetRequestIdLayer::new(self.header.clone(), MakeTypedRequestId)
    }

    /// Copies the request id onto the response
    pub fn propagation_layer(&self) -> PropagateRequestIdLayer {
        PropagateRequestIdLayer::new(self.header.clone())
    }
}

/// Marks [`SENSITIVE_HEADERS`] as sensitive
pub fn sensitive_headers_layer() -> SetSensitiveRequestHeadersLayer {
    SetSensitiveRequestHeadersLayer::new(SENSITIVE_HEADERS.iter().map(|h| HeaderName::from_static(*h)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_name_is_normalised() {
        let tracking = RequestTracking::new("X-Request-Id").unwrap();
        assert_eq!(tracking.header().as_str(), "x-request-id");
    }

    #[test]
    fn test_invalid_header_rejected() {
        assert!(matches!(RequestTracking::new("bad header"), Err(Error::Internal(_))));
    }

    #[test]
    fn test_sensitive_headers() {
        assert!(SENSITIVE_HEADERS.contains(&"authorization"));
        for header in SENSITIVE_HEADERS {
            assert!(HeaderName::try_from(*header).is_ok());
        }
    }
}
