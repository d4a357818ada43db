use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// A cataloged repository as stored in the `projects` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub github_url: String,
    pub owner_name: String,
    pub owner_avatar: String,
    pub language: String,
    pub stars: i64,
    pub category: String, // reserved for classification, always empty for now
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A project that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub github_url: String,
    pub owner_name: String,
    pub owner_avatar: String,
    pub language: String,
    pub stars: i64,
    pub category: String,
    pub created_at: OffsetDateTime,
}

/// Result of an insert against the unique `github_url` key.
#[derive(Debug)]
pub enum InsertOutcome {
    Created(Project),
    Existing(Project),
}
