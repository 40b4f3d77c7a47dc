use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::error;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Default error body for routes without a resource-specific envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("Hash error: {0}")]
    HashError(String),

    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<crate::auth::AuthError> for ServiceError {
    fn from(err: crate::auth::AuthError) -> Self {
        ServiceError::JwtError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::DatabaseError(_)
            | Self::HashError(_)
            | Self::JwtError(_)
            | Self::Io(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Message shown to the client. Client errors carry their own text,
    /// internal ones a generic line; the cause goes into `detail()`.
    pub fn response_message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::ValidationError(msg)
            | Self::Unauthorized(msg)
            | Self::UnsupportedMedia(msg) => msg.clone(),
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            _ => "Internal server error".to_string(),
        }
    }

    /// Underlying cause, only for 500-class failures.
    pub fn detail(&self) -> Option<String> {
        self.is_internal().then(|| self.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        ApiError::ServiceError(self).into_response()
    }
}

/// Body layout of error responses. Each resource keeps the shape its
/// clients already parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorEnvelope {
    /// `{success:false, message, error?}`
    Product,
    /// `{message, error?}` (categories, uploads)
    Plain,
    /// `{error:true, message, errorMessage?}`
    Account,
}

impl ErrorEnvelope {
    pub fn body(self, message: String, detail: Option<String>) -> Value {
        let mut body = Map::new();
        match self {
            Self::Product => {
                body.insert("success".into(), json!(false));
                body.insert("message".into(), json!(message));
                if let Some(detail) = detail {
                    body.insert("error".into(), json!(detail));
                }
            }
            Self::Plain => {
                body.insert("message".into(), json!(message));
                if let Some(detail) = detail {
                    body.insert("error".into(), json!(detail));
                }
            }
            Self::Account => {
                body.insert("error".into(), json!(true));
                body.insert("message".into(), json!(message));
                if let Some(detail) = detail {
                    body.insert("errorMessage".into(), json!(detail));
                }
            }
        }
        Value::Object(body)
    }
}

/// API Error type for HTTP responses
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("{error}")]
    Resource {
        envelope: ErrorEnvelope,
        error: ServiceError,
    },
}

impl ApiError {
    pub fn product(error: ServiceError) -> Self {
        Self::Resource {
            envelope: ErrorEnvelope::Product,
            error,
        }
    }

    pub fn plain(error: ServiceError) -> Self {
        Self::Resource {
            envelope: ErrorEnvelope::Plain,
            error,
        }
    }

    pub fn account(error: ServiceError) -> Self {
        Self::Resource {
            envelope: ErrorEnvelope::Account,
            error,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ServiceError(e) | ApiError::Resource { error: e, .. } => e.status_code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = current_request_id();

        if status.is_server_error() {
            error!(
                request_id = request_id.as_deref().unwrap_or("-"),
                error = %self,
                "request failed"
            );
        }

        match self {
            ApiError::Resource { envelope, error } => {
                let body = envelope.body(error.response_message(), error.detail());
                (status, Json(body)).into_response()
            }
            ApiError::ServiceError(error) => {
                let body = ErrorResponse {
                    error: status.canonical_reason().unwrap_or("Error").to_string(),
                    message: error.response_message(),
                    request_id,
                    timestamp: chrono::Utc::now().to_rfc3339(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}
