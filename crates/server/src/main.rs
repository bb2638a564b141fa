use anyhow::Context;
use db::DBService;
use server::{DeploymentImpl, config::Config, routes, shutdown_signal};
use services::services::{database_validator::DatabaseValidator, entry_timeout::EntryTimeoutService};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, prelude::*};
use utils::sentry::sentry_layer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,server=info,services=info,db=info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer())
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    utils::sentry::init_once(config.sentry_dsn.as_deref());

    let db = DBService::new(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    let validation = DatabaseValidator::new(db.pool.clone()).validate().await?;
    if !validation.is_ok() {
        anyhow::bail!(validation.summary());
    }
    info!("{}", validation.summary());

    let timeout_service = EntryTimeoutService::spawn(db.clone(), config.entry_timeout_poll).await;

    let deployment = DeploymentImpl::new(db.clone(), &config);
    let app = routes::router(deployment);

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    info!("Server running on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    timeout_service.abort();
    db.pool.close().await;
    info!("Server stopped");
    Ok(())
}
