//! Document store abstraction
//!
//! Handlers talk to the database only through the [`DocumentStore`] trait,
//! which keeps the gateway independent of the backing implementation:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Gateway handlers                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  DocumentStore (async trait)                │
//! └─────────────────────────────────────────────────────────────┘
//!                  │                             │
//!                  ▼                             ▼
//!        ┌─────────────────┐           ┌─────────────────┐
//!        │   MongoStore    │           │   MemoryStore   │
//!        │  (production)   │           │ (tests/offline) │
//!        └─────────────────┘           └─────────────────┘
//! ```
//!
//! Every operation touches exactly one document (or scans one collection).
//! Nothing here coordinates writes across collections.

pub mod memory;
pub mod mongo;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::error::Result;
use crate::models::{Battery, BatteryId, BatteryUpdate, StatCounter, Stats, UpdateOutcome};

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Store operations, used to label logs and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    InsertData,
    ListBatteries,
    FindStats,
    UpdateBattery,
    IncrementStat,
    Ping,
}

impl StoreOperation {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsertData => "insert_data",
            Self::ListBatteries => "list_batteries",
            Self::FindStats => "find_stats",
            Self::UpdateBattery => "update_battery",
            Self::IncrementStat => "increment_stat",
            Self::Ping => "ping",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persistence operations used by the gateway
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name, reported by the health endpoint
    fn name(&self) -> &'static str;

    /// Check that the store is reachable
    async fn ping(&self) -> Result<()>;

    /// Insert `{ data: value }` into the `data` collection
    async fn insert_data(&self, value: serde_json::Value) -> Result<ObjectId>;

    /// All documents in the `batteries` collection
    async fn list_batteries(&self) -> Result<Vec<Battery>>;

    /// The stats singleton, if it exists
    async fn find_stats(&self) -> Result<Option<Stats>>;

    /// `$set` the flags in `update` on the battery with `id`
    ///
    /// A missing battery is not an error: the outcome reports zero matches.
    async fn update_battery(&self, id: BatteryId, update: BatteryUpdate) -> Result<UpdateOutcome>;

    /// `$inc` a stats counter, creating the singleton when absent
    async fn increment_stat(&self, counter: StatCounter, by: i64) -> Result<UpdateOutcome>;
}

/// Thread-safe shared store handle
pub type SharedStore = Arc<dyn DocumentStore>;
