//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that orchestrates server
//! startup, periodic health reporting, and graceful shutdown.

use crate::{
    config::AppConfig,
    logging::log_startup,
    signals::wait_for_signal,
};
use lobby_server::GameServer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How long the serving task gets to close every session after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(8);

/// How often the health line is logged.
const HEALTH_INTERVAL: Duration = Duration::from_secs(60);

/// Owns the validated configuration and the server built from it.
pub struct Application {
    config: AppConfig,
    server: Arc<GameServer>,
}

impl Application {
    /// Validates `config` (already merged with CLI overrides) and builds the server.
    pub fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        let server_config = config.to_server_config()?;
        let server = Arc::new(GameServer::new(server_config));

        Ok(Self { config, server })
    }

    /// Runs the server until a termination signal arrives or the server fails.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        log_startup(&self.config);

        let mut server_handle = {
            let server = self.server.clone();
            tokio::spawn(async move { server.start().await })
        };

        let monitoring_handle = {
            let registry = self.server.registry();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(HEALTH_INTERVAL);
                interval.tick().await;
                loop {
                    interval.tick().await;
                    info!("📊 System Health - {} player(s) connected", registry.player_count().await);
                }
            })
        };

        info!("🛑 Press Ctrl+C to gracefully shutdown");

        tokio::select! {
            result = &mut server_handle => {
                monitoring_handle.abort();
                return match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => {
                        error!("❌ Server error: {}", e);
                        Err(e.into())
                    }
                    Err(e) => Err(format!("Server task failed: {e}").into()),
                };
            }
            signal = wait_for_signal() => {
                info!("📡 Received {} signal, beginning graceful shutdown", signal?);
            }
        }

        // A second signal skips the graceful path.
        tokio::spawn(async move {
            match wait_for_signal().await {
                Ok(signal) => {
                    warn!("Second {} signal, exiting without waiting for sessions", signal);
                    std::process::exit(1);
                }
                Err(e) => error!("Failed to listen for a second shutdown signal: {e}"),
            }
        });

        monitoring_handle.abort();
        self.server.shutdown().await?;

        match tokio::time::timeout(SHUTDOWN_GRACE, &mut server_handle).await {
            Ok(Ok(Ok(()))) => info!("✅ Server task completed gracefully"),
            Ok(Ok(Err(e))) => error!("❌ Server error during shutdown: {}", e),
            Ok(Err(e)) => error!("❌ Server task failed: {}", e),
            Err(_) => {
                warn!("⏰ Server task did not complete within {:?}, aborting", SHUTDOWN_GRACE);
                server_handle.abort();
            }
        }

        info!("✅ Lobby Server shutdown complete");
        Ok(())
    }
}
