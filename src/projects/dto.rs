use serde::Deserialize;

use super::error::{ProjectError, ProjectResult};
use super::repo_types::Project;
use super::url::{parse_github_url, RepoRef};

/// Body of `POST /api/projects`. Optional fields accept explicit `null`.
#[derive(Debug, Default, Deserialize)]
pub struct AddProjectRequest {
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub owner_avatar: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub stars: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Repository metadata supplied by the caller (usually from a client-side preview).
#[derive(Debug, Clone)]
pub struct ClientMetadata {
    pub github_url: String,
    pub name: String,
    pub owner_name: String,
    pub owner_avatar: String,
    pub description: String,
    pub language: String,
    pub stars: i64,
    pub created_at: String,
}

/// The two ways a project can be added.
#[derive(Debug, Clone)]
pub enum AddProject {
    /// Store the caller's metadata after sanitizing it.
    FromMetadata(ClientMetadata),
    /// Look the repository up on GitHub.
    ByLookup(RepoRef),
}

impl AddProject {
    /// Pick the ingestion path for a request. The URL must parse either way.
    pub fn from_request(req: AddProjectRequest) -> ProjectResult<Self> {
        let github_url = req.github_url.unwrap_or_default().trim().to_string();
        if github_url.is_empty() {
            return Err(ProjectError::MissingField("github_url"));
        }
        let repo = parse_github_url(&github_url)?;

        let name = req.name.unwrap_or_default();
        let owner_name = req.owner_name.unwrap_or_default();
        if name.is_empty() || owner_name.is_empty() {
            return Ok(AddProject::ByLookup(repo));
        }

        Ok(AddProject::FromMetadata(ClientMetadata {
            github_url,
            name,
            owner_name,
            owner_avatar: req.owner_avatar.unwrap_or_default(),
            description: req.description.unwrap_or_default(),
            language: req.language.unwrap_or_default(),
            stars: req.stars.unwrap_or_default(),
            created_at: req.created_at.unwrap_or_default(),
        }))
    }
}

#[derive(Debug)]
pub struct Ingested {
    pub project: Project,
    /// False when an existing row was returned instead of inserting.
    pub created: bool,
}
