use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use carwash::config::AppConfig;
use carwash::db;
use carwash::routes::build_router;
use carwash::services::accounts;
use carwash::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    if config.jwt_secret == "changeme" {
        tracing::warn!("JWT_SECRET is not set, using the insecure default");
    }

    let conn = db::init_db(&config.database_url)
        .with_context(|| format!("opening database {}", config.database_url))?;

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        let created = accounts::ensure_admin(&conn, email, password, config.bcrypt_cost)
            .context("seeding admin account")?;
        if created {
            tracing::info!(%email, "admin account created");
        }
    }

    let port = config.port;
    let state = Arc::new(AppState::new(conn, config));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
