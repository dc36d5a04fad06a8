//! HTTP gateway for battery and stats records
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 GatewayServer                   │
//! │                                                 │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │                 REST API                  │  │
//! │  │  GET  /                                   │  │
//! │  │  GET  /data?id=                           │  │
//! │  │  POST /data                               │  │
//! │  │  GET  /batteries                          │  │
//! │  │  GET  /stats                              │  │
//! │  │  POST /batteries/{id}/pause               │  │
//! │  │  POST /batteries/{id}/resume              │  │
//! │  │  POST /batteries/{id}/chargeComplete      │  │
//! │  │  POST /batteries/{id}/halt                │  │
//! │  │  POST /batteries/{id}/updateChargingCount │  │
//! │  │  GET  /health, GET /metrics               │  │
//! │  └───────────────────────────────────────────┘  │
//! │                       │                         │
//! │                       ▼                         │
//! │          Arc<dyn DocumentStore> (shared)        │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use chargehub::gateway::{GatewayConfig, GatewayServer};
//! use chargehub::storage::MongoStore;
//!
//! let store = MongoStore::connect(&config.database).await?;
//! let server = GatewayServer::new(GatewayConfig::default(), Arc::new(store));
//! server.start().await?;
//! ```

pub mod api;
pub mod config;
pub mod server;

// Re-export main types
pub use api::{create_router, ApiError};
pub use config::GatewayConfig;
pub use server::{AppState, GatewayServer, ServerError, ServerInfo};
