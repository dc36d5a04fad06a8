use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chargehub::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "chargehub",
    version,
    about = "HTTP gateway for battery charging records backed by MongoDB",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configuration file
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// MongoDB connection string
        #[arg(long)]
        mongo_uri: Option<String>,

        /// Database name
        #[arg(short, long)]
        database: Option<String>,

        /// Enable permissive CORS headers
        #[arg(long, default_value = "false")]
        cors: bool,

        /// Serve from an in-memory store instead of MongoDB
        #[arg(long, default_value = "false")]
        in_memory: bool,
    },

    /// Verify the database connection and print a summary
    Check {
        /// MongoDB connection string
        #[arg(long)]
        mongo_uri: Option<String>,

        /// Database name
        #[arg(short, long)]
        database: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    // Initialize tracing/logging
    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "chargehub starting");

    let result = match cli.command {
        Commands::Serve {
            bind,
            mongo_uri,
            database,
            cors,
            in_memory,
        } => {
            tracing::info!(
                bind = ?bind,
                database = ?database,
                cors = %cors,
                in_memory = %in_memory,
                "Starting serve command"
            );
            commands::serve(
                config,
                commands::ServeParams {
                    bind,
                    mongo_uri,
                    database,
                    enable_cors: cors,
                    in_memory,
                },
            )
            .await
        }

        Commands::Check {
            mongo_uri,
            database,
        } => {
            tracing::info!(database = ?database, "Starting check command");
            commands::check(config, mongo_uri, database).await
        }
    };

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }
    result
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("chargehub=debug,tower_http=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(format!(
                "chargehub={level},tower_http={level},warn"
            ))
        })
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
    }

    Ok(())
}
