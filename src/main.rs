use anyhow::{anyhow, Context};
use dotenvy::dotenv;
use log::{info, warn};
use std::sync::Arc;

use forumserver::core::config::AppConfig;
use forumserver::core::shared::state::AppState;
use forumserver::core::shared::utils::{create_conn, redact_database_url, run_migrations, seed_default_forums};
use forumserver::main_module::run_axum_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    info!(
        "Connecting to database {}",
        redact_database_url(&config.database.url)
    );
    let pool = create_conn(&config.database).context("Failed to create database pool")?;

    let setup_pool = pool.clone();
    let seed_defaults = config.forum.seed_defaults;
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        run_migrations(&setup_pool).map_err(|e| anyhow!("Failed to run migrations: {e}"))?;
        if seed_defaults {
            let mut conn = setup_pool.get().context("Failed to get connection for seeding")?;
            seed_default_forums(&mut conn).context("Failed to seed default forums")?;
        } else {
            warn!("Default forum seeding disabled");
        }
        Ok(())
    })
    .await
    .context("Database setup task failed")??;

    let state = Arc::new(AppState::new(pool, config).context("Failed to initialize identity verifier")?);
    run_axum_server(state).await.context("HTTP server failed")?;

    Ok(())
}
