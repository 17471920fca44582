//! Error handling - RFC 7807 responses with stable error codes.

use std::fmt;

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode, web};
use kadha_core::error::{DomainError, RepoError};
use kadha_core::ports::AuthError;
use kadha_shared::ErrorResponse;

/// Application-level error type that converts to RFC 7807 responses.
#[derive(Debug)]
pub enum AppError {
    /// 400 with a machine-stable code (`validation_failed`, `email_taken`, ...).
    BadRequest { code: &'static str, detail: String },
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    /// Store did not answer in time; the client may retry.
    Unavailable { retry_after_secs: u64 },
    Internal(String),
}

impl AppError {
    pub fn validation(detail: impl Into<String>) -> Self {
        AppError::BadRequest {
            code: "validation_failed",
            detail: detail.into(),
        }
    }

    /// Problem details body for this error.
    pub fn body(&self) -> ErrorResponse {
        match self {
            AppError::BadRequest { code, detail } => ErrorResponse::bad_request(*code, detail),
            AppError::Unauthorized(detail) => ErrorResponse::unauthorized(detail),
            AppError::Forbidden(detail) => ErrorResponse::forbidden().with_detail(detail),
            AppError::NotFound(detail) => ErrorResponse::not_found(detail),
            AppError::Unavailable { .. } => ErrorResponse::service_unavailable("store_timeout"),
            AppError::Internal(_) => ErrorResponse::internal_error(),
        }
    }

    /// Build the HTTP response, echoing `request_id` in the body when known.
    pub fn render(&self, request_id: Option<&str>) -> HttpResponse {
        let mut body = self.body();
        if let Some(id) = request_id {
            body = body.with_request_id(id);
        }

        let mut response = HttpResponse::build(self.status_code());
        if let AppError::Unavailable { retry_after_secs } = self {
            response.insert_header(("Retry-After", retry_after_secs.to_string()));
        }
        response.json(body)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest { code, detail } => write!(f, "Bad request ({}): {}", code, detail),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Unavailable { retry_after_secs } => {
                write!(f, "Store unavailable, retry after {}s", retry_after_secs)
            }
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.render(None)
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        let code = err.code();
        match err {
            DomainError::Validation(detail) => AppError::BadRequest { code, detail },
            DomainError::InvalidCredentials => AppError::BadRequest {
                code,
                detail: "Invalid email or password".to_string(),
            },
            DomainError::EmailTaken => AppError::BadRequest {
                code,
                detail: "Email already registered".to_string(),
            },
            DomainError::TagInUse { id, posts } => AppError::BadRequest {
                code,
                detail: format!("Tag {} is still attached to {} post(s)", id, posts),
            },
            DomainError::Unauthenticated => {
                AppError::Unauthorized("A valid bearer token is required".to_string())
            }
            DomainError::Forbidden { entity_type, id } => {
                AppError::Forbidden(format!("You do not own {} {}", entity_type, id))
            }
            DomainError::NotFound { entity_type, id } => {
                AppError::NotFound(format!("{} with id {} not found", entity_type, id))
            }
            DomainError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                AppError::Internal(msg)
            }
            DomainError::Store(repo) => repo.into(),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Timeout(limit) => {
                tracing::error!(timeout_ms = limit.as_millis() as u64, "Store operation timed out");
                AppError::Unavailable {
                    retry_after_secs: limit.as_secs().max(1),
                }
            }
            RepoError::NotFound => AppError::NotFound("Resource not found".to_string()),
            other => {
                tracing::error!("Database error: {}", other);
                AppError::Internal("Database error".to_string())
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let detail = match err {
            AuthError::MissingAuth => "Please provide a Bearer token in the Authorization header.",
            AuthError::TokenExpired => "Your token has expired. Please sign in again.",
            AuthError::InvalidToken(reason) => {
                tracing::debug!(reason = %reason, "Rejected bearer token");
                "The bearer token is invalid."
            }
            AuthError::HashingError(msg) => return DomainError::Internal(msg).into(),
        };
        AppError::Unauthorized(detail.to_string())
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

/// Malformed JSON bodies answer `validation_failed` instead of actix's plain text.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
            AppError::validation(err.to_string()).into()
        })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err: QueryPayloadError, _req: &HttpRequest| {
            AppError::validation(err.to_string()).into()
        })
}

/// Unparsable ids in the path are a validation failure, not a 404.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err: PathError, _req: &HttpRequest| {
        AppError::validation(err.to_string()).into()
    })
}
