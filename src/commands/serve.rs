use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;

use chargehub::config::Config;
use chargehub::gateway::GatewayServer;
use chargehub::metrics;
use chargehub::storage::{MemoryStore, MongoStore, SharedStore};

/// Command-line overrides for the `serve` command
#[derive(Debug, Default)]
pub struct ServeParams {
    pub bind: Option<SocketAddr>,
    pub mongo_uri: Option<String>,
    pub database: Option<String>,
    pub enable_cors: bool,
    pub in_memory: bool,
}

/// Connect to the store, then run the gateway until a shutdown signal
///
/// The store connection is established before the listener binds; if it
/// fails the command returns an error and nothing is served.
pub async fn serve(mut config: Config, params: ServeParams) -> Result<()> {
    let ServeParams {
        bind,
        mongo_uri,
        database,
        enable_cors,
        in_memory,
    } = params;

    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }
    if let Some(uri) = mongo_uri {
        config.database.uri = uri;
    }
    if let Some(name) = database {
        config.database.name = name;
    }
    if enable_cors {
        config.server.enable_cors = true;
    }

    config.validate().context("Invalid configuration")?;

    if let Err(e) = metrics::init_metrics() {
        tracing::warn!("Metrics initialization failed: {}", e);
    }

    let store: SharedStore = if in_memory {
        tracing::warn!("Using in-memory store; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        tracing::info!(
            database = %config.database.name,
            "Connecting to MongoDB"
        );
        let store = MongoStore::connect(&config.database)
            .await
            .context("Failed to connect to MongoDB")?;
        Arc::new(store)
    };

    let server = GatewayServer::new(config.gateway_config(), store);

    println!("{}", server.info().display());
    println!();
    println!("API Endpoints:");
    println!("  GET  /                                   - Greeting");
    println!("  GET  /data?id=                           - Echo id");
    println!("  POST /data                               - Insert data record");
    println!("  GET  /batteries                          - List batteries");
    println!("  GET  /stats                              - Charging stats");
    println!("  POST /batteries/{{id}}/pause               - Pause charging");
    println!("  POST /batteries/{{id}}/resume              - Resume charging");
    println!("  POST /batteries/{{id}}/chargeComplete      - Mark charged");
    println!("  POST /batteries/{{id}}/halt                - Mark halted");
    println!("  POST /batteries/{{id}}/updateChargingCount - Adjust charging count");
    println!("  GET  /health                             - Health check");
    println!("  GET  /metrics                            - Prometheus metrics");
    println!();
    println!("Press Ctrl+C to stop.\n");

    server.start_with_shutdown(shutdown_signal()).await?;

    println!("Gateway stopped.");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to wait for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
