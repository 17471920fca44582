//! Standard error body (RFC 7807 problem details plus a stable `error` code).

use serde::{Deserialize, Serialize};

/// RFC 7807 Problem Details for HTTP APIs.
///
/// See: https://datatracker.ietf.org/doc/html/rfc7807
///
/// `error` carries a short machine-stable code clients can branch on;
/// `title` and `detail` are for humans and may change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-stable error code, e.g. `unauthenticated`.
    pub error: String,

    /// A URI reference that identifies the problem type.
    #[serde(rename = "type")]
    pub error_type: String,

    /// A short, human-readable summary of the problem type.
    pub title: String,

    /// The HTTP status code.
    pub status: u16,

    /// A human-readable explanation specific to this occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Request ID for debugging purposes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(status: u16, error: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_type: "about:blank".to_string(),
            title: title.into(),
            status,
            detail: None,
            request_id: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    // Common error constructors
    pub fn bad_request(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(400, error, "Bad Request").with_detail(detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(401, "unauthenticated", "Unauthorized").with_detail(detail)
    }

    pub fn forbidden() -> Self {
        Self::new(403, "forbidden", "Forbidden")
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(404, "not_found", "Not Found").with_detail(detail)
    }

    pub fn service_unavailable(error: impl Into<String>) -> Self {
        Self::new(503, error, "Service Unavailable")
            .with_detail("The store did not answer in time. Please retry.")
    }

    pub fn internal_error() -> Self {
        Self::new(500, "internal_error", "Internal Server Error")
    }
}
