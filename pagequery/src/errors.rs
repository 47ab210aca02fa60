//! # Error Handling
//!
//! Two layers:
//! - [`QueryError`]: what went wrong while parsing, validating, translating or
//!   executing a paged query. Client-input variants always name the offending
//!   field or value.
//! - [`ApiError`]: the HTTP face of a `QueryError`. Sends sanitized messages and
//!   logs internal details through `tracing`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pagequery::{ApiError, PageQuery, PagedJson};
//!
//! async fn list_clusters(
//!     State(state): State<AppState>,
//!     PageQuery(request): PageQuery,
//! ) -> Result<PagedJson<serde_json::Value>, ApiError> {
//!     let page = pagequery::paginate(&state.clusters, &state.schema, &state.config, request).await?;
//!     Ok(PagedJson::new("clusters", page))
//! }
//! ```
//!
//! Persistence errors are never sent to clients. To see them, install a
//! subscriber in your application:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt().with_target(false).compact().init();
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;

/// Failure of a single paged query.
///
/// Everything except [`QueryError::Persistence`] is caused by the request
/// itself and is never worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Structural defect in the `search[..]` / `or[..]` / `sort[..]` parameters
    #[error("malformed filter parameter '{parameter}': {reason}")]
    MalformedFilter { parameter: String, reason: String },

    /// Offset or limit out of bounds, or not an integer
    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    /// Conflicting or unknown field selectors
    #[error("invalid projection: {0}")]
    InvalidProjection(String),

    /// Filter on a field the entity does not expose for searching
    #[error("unknown filter field '{field}'")]
    UnknownFilterField { field: String },

    /// Sort on a field the entity does not expose for sorting
    #[error("unknown sort field '{field}'")]
    UnknownSortField { field: String },

    /// Value cannot be coerced to the field type, or the operator does not apply to it
    #[error("cannot apply filter value '{value}' to field '{field}': {reason}")]
    FilterTypeMismatch {
        field: String,
        value: String,
        reason: String,
    },

    /// `limit=UNLIMITED` against an entity marked large
    #[error("unlimited queries are not allowed for '{entity}'")]
    UnlimitedRefused { entity: String },

    /// Backend failure from `count` or `fetch`, passed through unchanged
    #[error(transparent)]
    Persistence(#[from] DbErr),
}

impl QueryError {
    pub(crate) fn malformed(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedFilter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn mismatch(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::FilterTypeMismatch {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// True when the request itself is at fault
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Persistence(_))
    }
}

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - invalid query parameters
    BadRequest {
        /// User-facing error message
        message: String,
    },

    /// 422 Unprocessable Entity - well-formed but refused by policy
    Unprocessable {
        /// User-facing error message
        message: String,
    },

    /// 500 Internal Server Error - Database error (details logged, not exposed)
    Database {
        /// User-facing generic message
        message: String,
        /// Internal error (logged, not sent to user)
        internal: DbErr,
    },
}

impl ApiError {
    /// Create a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a 500 Internal Server Error from a database error
    ///
    /// The database error details are logged but NOT sent to the user.
    #[must_use]
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the user-facing error message (sanitized)
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::BadRequest { message }
            | Self::Unprocessable { message }
            | Self::Database { message, .. } => message,
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error during paged query");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "Rejected paged query"
                );
            }
        }
    }
}

/// Error response sent to users (sanitized)
#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.user_message())
    }
}

impl std::error::Error for ApiError {}

/// Client errors keep their message; backend errors are sanitized.
impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Persistence(db) => Self::database(db),
            refused @ QueryError::UnlimitedRefused { .. } => Self::Unprocessable {
                message: refused.to_string(),
            },
            other => Self::bad_request(other.to_string()),
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self::database(err)
    }
}
