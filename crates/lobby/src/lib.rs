//! # Lobby Server - Main Entry Point
//!
//! Handles CLI parsing, configuration loading, logging setup and the
//! application lifecycle around the `lobby_server` library.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! lobby
//!
//! # Specify custom configuration
//! lobby --config production.toml
//!
//! # Override specific settings
//! lobby --bind 0.0.0.0:8080 --log-level debug
//!
//! # JSON logging for production
//! lobby --json-logs
//! ```
//!
//! ## Configuration
//!
//! The server loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! SIGINT (Ctrl+C) and SIGTERM start a graceful shutdown that closes every
//! player session. A second signal exits immediately.

use tracing::error;

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

pub use config::{LoggingSettings, ServerSettings, SessionSettings};

/// Runs the lobby server binary.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let loaded = AppConfig::load_from_file(&args.config_path).await;

    // Logging comes up first so configuration problems are reported through it.
    let mut logging_config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => AppConfig::default(),
    };
    args.apply_overrides(&mut logging_config);
    if let Err(e) = logging::setup_logging(&logging_config, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(
                "❌ Failed to load configuration from {}: {e}",
                args.config_path.display()
            );
            std::process::exit(1);
        }
    };
    args.apply_overrides(&mut config);

    match Application::new(config) {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}
