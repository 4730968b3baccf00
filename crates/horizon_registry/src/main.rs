//! Horizon instance registry process
//!
//! Loads configuration, installs logging and wires the pieces together:
//! in-memory indexed store, instance registry, stale-instance reaper and the
//! HTTP server. A termination signal cancels one shared token that stops the
//! reaper and drains the server.

mod cli;
mod config;
mod signals;

use cli::CliArgs;
use config::AppConfig;
use registry_core::{InstanceRegistry, MemoryStore, Reaper};
use registry_server::logging::setup_logging;
use registry_server::RegistryServer;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

struct Application {
    config: AppConfig,
    server: RegistryServer,
    reaper: Reaper,
}

impl Application {
    async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        config.apply_env_overrides();
        if let Some(bind) = args.bind_address {
            config.server.bind_address = bind;
        }
        if let Some(level) = args.log_level {
            config.logging.level = level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }
        config.validate()?;

        setup_logging(&config.logging.level, config.logging.json_format)?;

        let store = Arc::new(MemoryStore::with_prefix(config.registry.key_prefix.clone()));
        let registry = Arc::new(InstanceRegistry::new(store, config.to_registry_config()));
        let reaper = Reaper::new(registry.clone(), config.to_reaper_config());
        let server = RegistryServer::new(config.to_server_config()?, registry);

        info!(
            "🗂️ Horizon Instance Registry v{} | config: {}",
            env!("CARGO_PKG_VERSION"),
            args.config_path.display()
        );
        Ok(Self {
            config,
            server,
            reaper,
        })
    }

    async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let registry = &self.config.registry;
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!("  📄 Page size: {}", registry.page_size);
        info!("  ⏱️ Store timeout: {}ms", registry.store_timeout_ms);
        info!(
            "  🧹 Reaper: every {}s, stale after {}s",
            registry.reap_interval_secs, registry.stale_threshold_secs
        );

        let shutdown = CancellationToken::new();
        let listener = self.server.bind().await?;
        let reaper_handle = self.reaper.spawn(shutdown.clone());

        let server_handle = {
            let server = self.server;
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                let result = server.serve(listener, shutdown.clone()).await;
                if let Err(e) = &result {
                    error!("❌ Server error: {}", e);
                }
                // A server that stops on its own takes the process down with it.
                shutdown.cancel();
                result
            })
        };

        info!("✅ Registry is running, press Ctrl+C to shut down");
        if let Err(e) = signals::cancel_on_signal(shutdown.clone()).await {
            warn!("Signal handling failed, shutting down: {}", e);
            shutdown.cancel();
        }

        let served = server_handle.await?;
        reaper_handle.await?;
        served?;

        info!("👋 Registry shutdown complete");
        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to start registry: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
