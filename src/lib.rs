//! chargehub - battery charging gateway
//!
//! A small HTTP service that records battery charging state and aggregate
//! charging counters in MongoDB.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration loading (defaults, TOML, environment)
//! - [`error`] - Unified error type and categories
//! - [`models`] - Battery, stats and request payload types
//! - [`storage`] - Document store trait with MongoDB and in-memory backends
//! - [`gateway`] - axum router, handlers and server lifecycle
//! - [`metrics`] - Prometheus counters
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chargehub::config::Config;
//! use chargehub::gateway::GatewayServer;
//! use chargehub::storage::MongoStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = MongoStore::connect(&config.database).await?;
//!     let server = GatewayServer::new(config.gateway_config(), Arc::new(store));
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod models;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::gateway::{GatewayConfig, GatewayServer};
    pub use crate::models::{Battery, BatteryId, BatteryUpdate, StatCounter, Stats};
    pub use crate::storage::{DocumentStore, MemoryStore, MongoStore, SharedStore};
}

// Direct re-exports for convenience
pub use models::{Battery, BatteryId, Stats};
