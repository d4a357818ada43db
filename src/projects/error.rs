use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("invalid GitHub URL: URL must be in format: github.com/owner/repo")]
    InvalidUrlFormat,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("invalid request body: {0}")]
    MalformedBody(String),

    #[error("failed to fetch repository: {0}")]
    RemoteUnreachable(String),

    #[error("repo not found: status {status}, body: {body}")]
    RemoteLookupFailed { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    RemoteDecodeFailed(String),

    #[error("failed to add project: {0}")]
    RateLimited(#[source] Box<ProjectError>),

    #[error("failed to add project: {0}")]
    IngestionFailed(#[source] Box<ProjectError>),

    #[error("failed to get projects: {0}")]
    ListFailed(#[source] Box<ProjectError>),

    #[error("failed to persist project: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("failed to encode response: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type ProjectResult<T> = Result<T, ProjectError>;

impl ProjectError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProjectError::InvalidUrlFormat
            | ProjectError::MissingField(_)
            | ProjectError::PayloadTooLarge
            | ProjectError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ProjectError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ProjectError::RemoteUnreachable(_)
            | ProjectError::RemoteLookupFailed { .. }
            | ProjectError::RemoteDecodeFailed(_)
            | ProjectError::IngestionFailed(_)
            | ProjectError::ListFailed(_)
            | ProjectError::Persistence(_)
            | ProjectError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Upstream refusals that should reach the caller as 429.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            ProjectError::RemoteLookupFailed { status: 403 | 429, .. } => true,
            other => other.to_string().to_lowercase().contains("rate limit"),
        }
    }
}

impl IntoResponse for ProjectError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
