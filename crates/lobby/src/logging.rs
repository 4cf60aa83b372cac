//! Logging setup for the lobby binary.
//!
//! The subscriber is built from the `[logging]` section, and the startup
//! summary reports the `[server]` and `[session]` values in effect.

use crate::config::AppConfig;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose per-frame chatter is capped below `debug` unless tracing.
const WIRE_CRATES: [&str; 2] = ["tungstenite", "tokio_tungstenite"];

/// Filter used when `RUST_LOG` is not set.
///
/// Below `trace`, the WebSocket crates are held at `info` so one line per
/// frame does not drown out session events.
pub fn filter_directives(level: &str) -> String {
    if level == "trace" {
        return level.to_string();
    }
    let mut directives = level.to_string();
    for krate in WIRE_CRATES {
        directives.push_str(&format!(",{krate}=info"));
    }
    directives
}

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over the configured level. `json_override` forces JSON
/// output regardless of the file setting.
pub fn setup_logging(
    config: &AppConfig,
    json_override: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let level = config.logging.level.as_str();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(level)));

    let registry = tracing_subscriber::registry().with(filter);

    if json_override || config.logging.json_format {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(false).with_thread_ids(true))
            .try_init()?;
    }

    info!("🔧 Logging initialized with level: {}", level);
    Ok(())
}

/// Logs the version and the settings every session will run with.
pub fn log_startup(config: &AppConfig) {
    let session = &config.session;
    let ping_secs = session.pong_wait_secs as f64 * 0.9;
    info!("🎲 Lobby server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "  🌐 {} | up to {} player(s)",
        config.server.bind_address, config.server.max_connections
    );
    info!(
        "  💓 ping every {:.1}s | pong wait {}s | write wait {}s",
        ping_secs, session.pong_wait_secs, session.write_wait_secs
    );
    info!(
        "  📦 frames up to {} bytes | usernames up to {} chars | {} response(s) per message",
        session.max_message_size, session.max_username_len, session.max_coalesce
    );
}
