//! Server entry point.
//!
//! Resolves configuration (`server_config.json` > `NCD_*` environment variables >
//! defaults), opens the gateway, seeds a first admin account on an empty instance
//! and serves the REST API.

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use refer_core::account::{hash_password, NewUserRecord};
use refer_core::config::{AppConfig, ConfigFile, EnvOverrides, CONFIG_FILE_NAME};
use refer_core::session::Role;
use refer_core::store::{Gateway, MemoryGateway};

use ncd_refer::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ncd_refer=info".parse()?)
                .add_directive("refer_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::resolve(
        ConfigFile::load(Path::new(CONFIG_FILE_NAME))?,
        EnvOverrides::from_process_env()?,
    )?;

    let gateway: Arc<dyn Gateway> = match &config.data_file {
        Some(path) => {
            tracing::info!(data_file = %path.display(), "opening data file");
            Arc::new(MemoryGateway::with_data_file(path)?)
        }
        None => {
            tracing::warn!("no data file configured; running in memory only");
            Arc::new(MemoryGateway::new())
        }
    };

    seed_admin_if_empty(&gateway)?;

    let state = AppState::new(gateway, &config);
    let app = build_router(state, &config.cors_origins);

    tracing::info!("++ Starting NCD Refer on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the first admin account when the user table is empty, so a fresh
/// instance can be logged into at all.
fn seed_admin_if_empty(gateway: &Arc<dyn Gateway>) -> anyhow::Result<()> {
    if !gateway.list_users()?.is_empty() {
        return Ok(());
    }

    gateway.insert_user(NewUserRecord {
        username: "admin".into(),
        password_hash: hash_password("admin1234"),
        role: Role::Admin,
        location_name: None,
        name: Some("Administrator".into()),
        position: None,
    })?;
    tracing::warn!("seeded default admin account (admin/admin1234); change its password");

    Ok(())
}
