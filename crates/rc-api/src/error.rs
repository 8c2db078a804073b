use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::{borrow::Cow, future::Future};
use thiserror::Error;
use tracing::error;

use rc_common::ats::AtsError;
use rc_common::db::{
    AtsScoreStorageError, DbPoolError, EngagementError, MigrationError, RequirementFetchError,
    ViewStorageError,
};
use rc_common::matching::engine::MatchError;

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Public error messages go out scrubbed: no control characters, no urls,
/// no filesystem paths, bounded length.
fn sanitize_message(message: &str) -> String {
    const MAX_LEN: usize = 240;

    let cleaned = message
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>();

    let mut cleaned = cleaned
        .split_whitespace()
        .map(redact_token)
        .collect::<Vec<_>>()
        .join(" ");

    if cleaned.len() > MAX_LEN {
        cleaned.truncate(MAX_LEN);
        cleaned.push_str("...");
    }

    if cleaned.trim().is_empty() {
        "unexpected error".to_string()
    } else {
        cleaned
    }
}

fn redact_token(token: &str) -> String {
    if token.contains("://") {
        return "[redacted-url]".to_string();
    }
    if let Some((base, _)) = token.split_once('?') {
        return if base.is_empty() {
            "[redacted-query]".to_string()
        } else {
            format!("{base}?[redacted]")
        };
    }
    if token.starts_with('/') || token.contains('\\') {
        return "[redacted-path]".to_string();
    }
    token.to_string()
}

pub async fn with_request_id<Fut, T>(request_id: Option<String>, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    if let Some(request_id) = request_id {
        REQUEST_ID.scope(request_id, fut).await
    } else {
        fut.await
    }
}

pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|value| value.clone()).ok()
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("database error: {0}")]
    Database(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("too many requests: {0}")]
    TooManyRequests(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
    request_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let code = self.code();
        let request_id = current_request_id();

        error!(
            code,
            status = %status,
            request_id = request_id.as_deref().unwrap_or(""),
            error = %self,
            "api_error"
        );

        let body = Json(ErrorResponse {
            code,
            message: self.public_message().into_owned(),
            request_id,
        });

        (status, body).into_response()
    }
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::TooManyRequests(_) => "too_many_requests",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
            ApiError::Database(_) => "database_error",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn public_message(&self) -> Cow<'static, str> {
        match self {
            ApiError::BadRequest(msg) => Cow::Owned(sanitize_message(msg)),
            ApiError::Unauthorized(_) => Cow::Borrowed("unauthorized"),
            ApiError::NotFound(msg) => Cow::Owned(sanitize_message(msg)),
            ApiError::TooManyRequests(_) => Cow::Borrowed("too many requests"),
            ApiError::ServiceUnavailable(_) => Cow::Borrowed("service unavailable"),
            ApiError::Database(_) | ApiError::Internal(_) => Cow::Borrowed("internal server error"),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MatchError> for ApiError {
    fn from(value: MatchError) -> Self {
        match value {
            // The list and stats handlers absorb this into an empty result;
            // only batch submission by page descriptor lets it reach here.
            MatchError::NoFiltersSpecified => ApiError::BadRequest(
                "requirement has no usable filters; add at least one positive criterion".into(),
            ),
            MatchError::CandidateStore(err) => ApiError::ServiceUnavailable(err.to_string()),
            MatchError::WorkHistoryStore(err) => ApiError::ServiceUnavailable(err.to_string()),
        }
    }
}

impl From<AtsError> for ApiError {
    fn from(value: AtsError) -> Self {
        match value {
            AtsError::RequirementNotFound(id) => {
                ApiError::NotFound(format!("requirement not found: {id}"))
            }
            AtsError::CandidateNotFound(id) => {
                ApiError::NotFound(format!("candidate not found: {id}"))
            }
            AtsError::Scorer(err) => ApiError::Internal(err.to_string()),
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<RequirementFetchError> for ApiError {
    fn from(value: RequirementFetchError) -> Self {
        ApiError::Database(value.to_string())
    }
}

impl From<ViewStorageError> for ApiError {
    fn from(value: ViewStorageError) -> Self {
        ApiError::Database(value.to_string())
    }
}

impl From<AtsScoreStorageError> for ApiError {
    fn from(value: AtsScoreStorageError) -> Self {
        ApiError::Database(value.to_string())
    }
}

impl From<EngagementError> for ApiError {
    fn from(value: EngagementError) -> Self {
        ApiError::Database(value.to_string())
    }
}

impl From<MigrationError> for ApiError {
    fn from(value: MigrationError) -> Self {
        ApiError::Database(value.to_string())
    }
}

impl From<DbPoolError> for ApiError {
    fn from(value: DbPoolError) -> Self {
        ApiError::Database(value.to_string())
    }
}
