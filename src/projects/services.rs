use time::{format_description::well_known::Rfc3339, OffsetDateTime, UtcOffset};
use tracing::{debug, info, warn};

use super::dto::{AddProject, ClientMetadata, Ingested};
use super::error::{ProjectError, ProjectResult};
use super::repo_types::{InsertOutcome, NewProject, Project};
use super::url::RepoRef;
use crate::github::RemoteRepoMetadata;
use crate::state::AppState;

const MAX_NAME_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 2000;
const MAX_LANGUAGE_CHARS: usize = 100;

pub async fn add_project(st: &AppState, cmd: AddProject) -> ProjectResult<Ingested> {
    match cmd {
        AddProject::FromMetadata(meta) => add_from_metadata(st, meta).await,
        AddProject::ByLookup(repo) => add_by_lookup(st, repo).await,
    }
}

pub async fn list_projects(st: &AppState) -> ProjectResult<Vec<Project>> {
    st.store
        .list_projects()
        .await
        .map_err(|e| ProjectError::ListFailed(Box::new(e)))
}

async fn add_from_metadata(st: &AppState, meta: ClientMetadata) -> ProjectResult<Ingested> {
    let project = sanitize(meta, OffsetDateTime::now_utc())?;

    if let Some(existing) = st.store.get_project_by_github_url(&project.github_url).await? {
        debug!(id = existing.id, github_url = %existing.github_url, "project already stored");
        return Ok(Ingested {
            project: existing,
            created: false,
        });
    }

    let ingested = persist(st, project).await?;
    info!(id = ingested.project.id, created = ingested.created, "project added from client metadata");
    Ok(ingested)
}

async fn add_by_lookup(st: &AppState, repo: RepoRef) -> ProjectResult<Ingested> {
    let remote = st
        .fetcher
        .fetch_repo(&repo.owner, &repo.repo)
        .await
        .map_err(upstream_failure)?;
    debug!(
        name = %remote.name,
        owner = %remote.owner_login,
        stars = remote.stars,
        remote_created_at = ?remote.created_at,
        "fetched repository metadata"
    );

    let existing = st
        .store
        .get_project_by_github_url(&remote.html_url)
        .await
        .map_err(upstream_failure)?;
    if let Some(existing) = existing {
        debug!(id = existing.id, github_url = %existing.github_url, "project already stored");
        return Ok(Ingested {
            project: existing,
            created: false,
        });
    }

    let ingested = persist(st, from_remote(remote, OffsetDateTime::now_utc()))
        .await
        .map_err(upstream_failure)?;
    info!(id = ingested.project.id, created = ingested.created, "project added from GitHub");
    Ok(ingested)
}

async fn persist(st: &AppState, project: NewProject) -> ProjectResult<Ingested> {
    Ok(match st.store.insert_project(project).await? {
        InsertOutcome::Created(project) => Ingested {
            project,
            created: true,
        },
        InsertOutcome::Existing(project) => Ingested {
            project,
            created: false,
        },
    })
}

/// Failures on the lookup path are either rate limiting (429) or a generic 500.
fn upstream_failure(err: ProjectError) -> ProjectError {
    if err.is_rate_limit() {
        warn!(error = %err, "GitHub rate limited the lookup");
        ProjectError::RateLimited(Box::new(err))
    } else {
        ProjectError::IngestionFailed(Box::new(err))
    }
}

fn sanitize(meta: ClientMetadata, now: OffsetDateTime) -> ProjectResult<NewProject> {
    let name = truncate(meta.name.trim(), MAX_NAME_CHARS);
    let owner_name = truncate(meta.owner_name.trim(), MAX_NAME_CHARS);
    if name.is_empty() {
        return Err(ProjectError::MissingField("name"));
    }
    if owner_name.is_empty() {
        return Err(ProjectError::MissingField("owner_name"));
    }

    let owner_avatar = meta.owner_avatar.trim();
    let owner_avatar = if owner_avatar.starts_with("https://") {
        owner_avatar.to_string()
    } else {
        String::new()
    };

    let created_at = parse_client_timestamp(&meta.created_at).unwrap_or(now);

    Ok(NewProject {
        name,
        description: truncate(meta.description.trim(), MAX_DESCRIPTION_CHARS),
        github_url: meta.github_url,
        owner_name,
        owner_avatar,
        language: truncate(meta.language.trim(), MAX_LANGUAGE_CHARS),
        stars: meta.stars.max(0),
        category: String::new(),
        created_at,
    })
}

/// RFC3339 timestamp normalized to UTC. Values whose UTC year falls outside
/// 0000..=9999 are refused: Postgres cannot store them or RFC3339 cannot render them.
fn parse_client_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let utc = OffsetDateTime::parse(raw, &Rfc3339)
        .ok()?
        .checked_to_offset(UtcOffset::UTC)?;
    (0..=9999).contains(&utc.year()).then_some(utc)
}

fn from_remote(remote: RemoteRepoMetadata, now: OffsetDateTime) -> NewProject {
    NewProject {
        name: remote.name,
        description: remote.description,
        github_url: remote.html_url,
        owner_name: remote.owner_login,
        owner_avatar: remote.owner_avatar,
        language: remote.language,
        stars: remote.stars.max(0),
        category: String::new(),
        created_at: now,
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
