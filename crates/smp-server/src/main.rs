//! SMP server entry point.
//!
//! Loads configuration, initialises logging, and runs the network core until
//! Ctrl-C is pressed or the listener fails.  Each connection is served by the
//! line-echo handler.
//!
//! # Usage
//!
//! ```text
//! smp-server [OPTIONS]
//!
//! Options:
//!   --config    <PATH>  Config file [default: platform config dir]
//!   --bind      <ADDR>  IP address to listen on [default: 127.0.0.1]
//!   --port      <PORT>  TCP port to listen on [default: 5500]
//!   --grace-ms  <MS>    Per-client shutdown grace window [default: 1000]
//!   --log-level <LEVEL> Log filter when RUST_LOG is unset [default: info]
//! ```
//!
//! Precedence: command line (or `SMP_*` environment variable) over the config
//! file over built-in defaults.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ resolve AppConfig            -- file + CLI overrides
//!  └─ ServerNet::start(ctrl_c)
//!       ├─ accept loop             -- one Session task per connection
//!       └─ disconnect()            -- notify, drain, force if needed
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use smp_server::application::client_registry::ClientRegistry;
use smp_server::infrastructure::network::echo::LineEcho;
use smp_server::infrastructure::network::{ServerNet, SessionFactory};
use smp_server::infrastructure::storage::config::{self, AppConfig, ConfigError};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// SMP messaging server.
#[derive(Debug, Parser)]
#[command(name = "smp-server", about = "SMP messaging server", version)]
struct Cli {
    /// Path to the TOML config file.  Defaults to the platform config directory.
    #[arg(long, env = "SMP_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to listen on.
    #[arg(long, env = "SMP_BIND")]
    bind: Option<String>,

    /// TCP port to listen on.
    #[arg(long, env = "SMP_PORT")]
    port: Option<u16>,

    /// Milliseconds each client gets to disconnect on its own at shutdown.
    #[arg(long, env = "SMP_GRACE_MS")]
    grace_ms: Option<u64>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "SMP_LOG")]
    log_level: Option<String>,
}

impl Cli {
    /// Loads the config file and applies command-line overrides.
    ///
    /// A missing file, or a platform without a config directory, yields the
    /// defaults.
    fn resolve_config(&self) -> anyhow::Result<AppConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_config_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => match config::load_config() {
                Ok(cfg) => cfg,
                Err(ConfigError::NoPlatformConfigDir) => AppConfig::default(),
                Err(e) => return Err(e).context("failed to load config"),
            },
        };

        if let Some(bind) = &self.bind {
            cfg.network.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            cfg.network.port = port;
        }
        if let Some(grace_ms) = self.grace_ms {
            cfg.network.grace_period_ms = grace_ms;
        }
        if let Some(level) = &self.log_level {
            cfg.server.log_level = level.clone();
        }
        Ok(cfg)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let cfg = cli.resolve_config()?;

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.server.log_level)),
        )
        .init();

    let settings = cfg
        .network
        .to_settings()
        .context("invalid network configuration")?;

    info!("SMP server starting on {}", settings.bind_addr);

    let clients = Arc::new(ClientRegistry::new());
    let mut net = ServerNet::new(
        settings,
        Arc::new(LineEcho),
        Arc::clone(&clients),
        SessionFactory::<LineEcho>::new(),
    );

    let outcome = net
        .start(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                // Without a signal handler the server runs until the
                // listener fails.
                error!("failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("SMP server stopped");
    Ok(if outcome.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_config(path: PathBuf) -> Cli {
        Cli {
            config: Some(path),
            bind: None,
            port: None,
            grace_ms: None,
            log_level: None,
        }
    }

    #[test]
    fn test_cli_defaults_leave_overrides_unset() {
        let cli = Cli::parse_from(["smp-server"]);
        assert!(cli.bind.is_none());
        assert!(cli.port.is_none());
        assert!(cli.grace_ms.is_none());
    }

    #[test]
    fn test_cli_port_override() {
        let cli = Cli::parse_from(["smp-server", "--port", "7000"]);
        assert_eq!(cli.port, Some(7000));
    }

    #[test]
    fn test_cli_grace_override() {
        let cli = Cli::parse_from(["smp-server", "--grace-ms", "250"]);
        assert_eq!(cli.grace_ms, Some(250));
    }

    #[test]
    fn test_resolve_config_missing_file_yields_defaults() {
        let cli = cli_with_config(PathBuf::from("/nonexistent/smp/config.toml"));
        let cfg = cli.resolve_config().unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_resolve_config_cli_overrides_file() {
        // Arrange: a file that sets port 6000 and bind 0.0.0.0
        let dir = std::env::temp_dir().join(format!("smp_cli_{}", std::process::id()));
        let path = dir.join("config.toml");
        let mut file_cfg = AppConfig::default();
        file_cfg.network.port = 6000;
        file_cfg.network.bind_address = "0.0.0.0".to_string();
        config::save_config_to(&path, &file_cfg).unwrap();

        let mut cli = cli_with_config(path);
        cli.port = Some(7000);
        cli.log_level = Some("debug".to_string());

        // Act
        let cfg = cli.resolve_config().unwrap();

        // Assert: CLI port wins, file bind address survives
        assert_eq!(cfg.network.port, 7000);
        assert_eq!(cfg.network.bind_address, "0.0.0.0");
        assert_eq!(cfg.server.log_level, "debug");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_resolve_config_malformed_file_is_an_error() {
        let dir = std::env::temp_dir().join(format!("smp_cli_bad_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        assert!(cli_with_config(path).resolve_config().is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
