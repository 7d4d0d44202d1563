//! Upwatch API Server
//!
//! Main entry point for the Upwatch authentication service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use upwatch_api::{AppState, create_router};
use upwatch_core::auth::{
    AuthService, PasswordHashing, SessionManager, SessionPolicy, UserDirectory,
};
use upwatch_db::migration::{Migrator, MigratorTrait};
use upwatch_db::{SessionRepository, UserRepository, connect};
use upwatch_shared::config::{LogConfig, LogFormat};
use upwatch_shared::{AppConfig, TokenIssuer};

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("upwatch={0},tower_http=info", log.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Purges expired sessions on a fixed interval until the process exits.
fn spawn_session_cleanup(auth: Arc<AuthService>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = auth.purge_expired_sessions().await {
                error!(error = %e, "Expired session cleanup failed");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.log);

    // Connect to database
    let db = connect(&config.database).await?;
    if config.database.run_migrations {
        Migrator::up(&db, None).await?;
        info!("Migrations applied");
    }

    // Build the auth components, then compose them
    let tokens = TokenIssuer::new(config.jwt.token_config())?;
    let hashing = PasswordHashing::new(&config.password)?;
    let users = UserDirectory::new(Arc::new(UserRepository::new(db.clone())), hashing);
    let sessions = SessionManager::new(Arc::new(SessionRepository::new(db)));
    let auth = Arc::new(
        AuthService::new(users, sessions, Arc::new(tokens))
            .with_policy(SessionPolicy::from(&config.sessions)),
    );

    spawn_session_cleanup(
        auth.clone(),
        Duration::from_secs(config.sessions.cleanup_interval_secs.max(1)),
    );

    let app = create_router(
        AppState { auth },
        Duration::from_secs(config.server.request_timeout_secs),
    );

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
