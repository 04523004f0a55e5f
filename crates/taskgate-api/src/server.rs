//! Server assembly: shared state, user seeding and the serve loop.

use crate::config::{ApiConfig, SeedUser};
use crate::error::Result;
use crate::routes::router;
use std::sync::Arc;
use taskgate::error::Error as CoreError;
use taskgate::lifecycle::TaskService;
use taskgate::storage::{create_storage, seed_user, TaskStore};

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The task lifecycle service
    pub service: TaskService,

    /// Storage backend description, reported by the health check
    pub storage: String,
}

impl AppState {
    /// Wrap an existing service.
    pub fn new(service: TaskService, storage: impl Into<String>) -> Self {
        Self {
            service,
            storage: storage.into(),
        }
    }

    /// Open the configured store, register the seed users and build the
    /// service.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or a seed user cannot
    /// be written.
    pub async fn from_config(config: &ApiConfig) -> Result<Self> {
        let backend = config.storage.backend();
        let store: Arc<dyn TaskStore> = Arc::from(create_storage(&backend)?);
        seed_users(store.as_ref(), &config.users).await?;

        let service = TaskService::new(store).with_page_size(config.page_size);
        Ok(Self::new(service, backend.to_string()))
    }
}

/// Register seed users, skipping those whose email is already taken.
async fn seed_users(store: &dyn TaskStore, users: &[SeedUser]) -> Result<()> {
    for seed in users {
        match seed_user(store, seed.clone().into()).await {
            Ok(user) => tracing::info!(user = %user.id, email = %user.email, role = %user.role, "Seeded user"),
            Err(CoreError::Validation(reason)) => {
                tracing::debug!(email = %seed.email, %reason, "Skipped seed user");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Start the HTTP server and run until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the state cannot be built or the listener cannot be
/// bound.
pub async fn serve(config: ApiConfig) -> Result<()> {
    let addr = config.listen_addr()?;
    let state = Arc::new(AppState::from_config(&config).await?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, storage = %config.storage.backend(), "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
