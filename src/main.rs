mod app;
mod config;
mod db;
mod github;
mod projects;
mod state;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "repohub=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    if config.github.token.is_none() {
        tracing::warn!("GITHUB_TOKEN not set; GitHub lookups use the anonymous rate limit");
    }

    let app_state = AppState::init(config).await?;
    tracing::info!("database ready");

    let addr = app_state.config.bind_addr();
    app::serve(app::build_app(app_state), &addr).await
}
