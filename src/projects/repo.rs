use async_trait::async_trait;
use sqlx::PgPool;

use super::error::ProjectResult;
use super::repo_types::{InsertOutcome, NewProject, Project};

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Insert a project, or hand back the row already stored under its `github_url`.
    async fn insert_project(&self, project: NewProject) -> ProjectResult<InsertOutcome>;

    async fn get_project_by_github_url(&self, github_url: &str) -> ProjectResult<Option<Project>>;

    /// All projects, most starred first.
    async fn list_projects(&self) -> ProjectResult<Vec<Project>>;
}

#[derive(Clone)]
pub struct PgProjectStore {
    db: PgPool,
}

impl PgProjectStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProjectStore for PgProjectStore {
    async fn insert_project(&self, p: NewProject) -> ProjectResult<InsertOutcome> {
        let inserted = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, description, github_url, owner_name, owner_avatar,
                                  language, stars, category, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (github_url) DO NOTHING
            RETURNING id, name, description, github_url, owner_name, owner_avatar,
                      language, stars, category, created_at
            "#,
        )
        .bind(&p.name)
        .bind(&p.description)
        .bind(&p.github_url)
        .bind(&p.owner_name)
        .bind(&p.owner_avatar)
        .bind(&p.language)
        .bind(p.stars)
        .bind(&p.category)
        .bind(p.created_at)
        .fetch_optional(&self.db)
        .await?;

        if let Some(project) = inserted {
            return Ok(InsertOutcome::Created(project));
        }

        // Lost the race against another insert of the same URL.
        let existing = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, github_url, owner_name, owner_avatar,
                   language, stars, category, created_at
              FROM projects
             WHERE github_url = $1
            "#,
        )
        .bind(&p.github_url)
        .fetch_one(&self.db)
        .await?;
        Ok(InsertOutcome::Existing(existing))
    }

    async fn get_project_by_github_url(&self, github_url: &str) -> ProjectResult<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, github_url, owner_name, owner_avatar,
                   language, stars, category, created_at
              FROM projects
             WHERE github_url = $1
            "#,
        )
        .bind(github_url)
        .fetch_optional(&self.db)
        .await?;
        Ok(project)
    }

    async fn list_projects(&self) -> ProjectResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, github_url, owner_name, owner_avatar,
                   language, stars, category, created_at
              FROM projects
             ORDER BY stars DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
