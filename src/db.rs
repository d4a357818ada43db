use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

/// Create the `projects` table and its unique URL index if they are missing.
pub async fn init_schema(db: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id           BIGSERIAL PRIMARY KEY,
            name         TEXT        NOT NULL,
            description  TEXT        NOT NULL DEFAULT '',
            github_url   TEXT        NOT NULL,
            owner_name   TEXT        NOT NULL,
            owner_avatar TEXT        NOT NULL DEFAULT '',
            language     TEXT        NOT NULL DEFAULT '',
            stars        BIGINT      NOT NULL DEFAULT 0,
            category     TEXT        NOT NULL DEFAULT '',
            created_at   TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(db)
    .await
    .context("create projects table")?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS projects_github_url_key
            ON projects (github_url)
        "#,
    )
    .execute(db)
    .await
    .context("create projects github_url index")?;

    Ok(())
}
