use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tracing::{debug, error, instrument, warn};

use super::dto::{AddProject, AddProjectRequest};
use super::error::{ProjectError, ProjectResult};
use super::services;
use crate::state::AppState;

pub const MAX_BODY_BYTES: usize = 100 * 1024;

pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects", get(list_projects).post(add_project))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

#[instrument(skip(state))]
pub async fn list_projects(State(state): State<AppState>) -> Result<Response, ProjectError> {
    let projects = services::list_projects(&state).await.map_err(|e| {
        error!(error = %e, "list_projects failed");
        e
    })?;
    json_response(StatusCode::OK, &projects)
}

#[instrument(skip(state, headers, body))]
pub async fn add_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ProjectError> {
    let body = body.map_err(|rejection| {
        warn!(error = %rejection, "add_project body rejected");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ProjectError::PayloadTooLarge
        } else {
            ProjectError::MalformedBody(rejection.body_text())
        }
    })?;

    debug!(
        user_agent = header_str(&headers, header::USER_AGENT),
        content_type = header_str(&headers, header::CONTENT_TYPE),
        bytes = body.len(),
        "add_project request"
    );

    let req: AddProjectRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "add_project invalid JSON");
        ProjectError::MalformedBody(e.to_string())
    })?;

    let cmd = AddProject::from_request(req).map_err(|e| {
        warn!(error = %e, "add_project rejected");
        e
    })?;
    let ingested = services::add_project(&state, cmd).await.map_err(|e| {
        error!(error = %e, status = %e.status(), "add_project failed");
        e
    })?;

    let status = if ingested.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    json_response(status, &ingested.project)
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> ProjectResult<Response> {
    let body = serde_json::to_vec(value)?;
    Ok((status, [(header::CONTENT_TYPE, "application/json")], body).into_response())
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> &str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
