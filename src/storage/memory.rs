//! In-memory document store
//!
//! Mirrors the MongoDB semantics the gateway relies on without a database:
//! increments upsert and follow `$inc` typing and overflow rules, zero-match
//! updates are reported as success, and inserted values must be
//! representable as BSON. Used by the test suite and for running the gateway
//! offline.

use std::collections::HashSet;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::models::{Battery, BatteryId, BatteryUpdate, StatCounter, Stats, UpdateOutcome};

use super::{DocumentStore, StoreOperation};

/// A stored `{ data }` record
#[derive(Debug, Clone, PartialEq)]
pub struct DataRecord {
    pub id: ObjectId,
    pub data: serde_json::Value,
}

#[derive(Debug, Default)]
struct Collections {
    data: Vec<DataRecord>,
    batteries: Vec<Battery>,
    stats: Option<Stats>,
}

/// In-memory implementation of [`DocumentStore`]
///
/// Individual operations can be made to fail with
/// [`MemoryStore::fail_operation`] to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    failing: RwLock<HashSet<StoreOperation>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with batteries
    pub fn with_batteries(batteries: impl IntoIterator<Item = Battery>) -> Self {
        let mut store = Self::new();
        store.collections.get_mut().batteries.extend(batteries);
        store
    }

    /// Add a battery document
    pub async fn insert_battery(&self, battery: Battery) {
        self.collections.write().await.batteries.push(battery);
    }

    /// Look up a battery by id
    pub async fn battery(&self, id: BatteryId) -> Option<Battery> {
        self.collections
            .read()
            .await
            .batteries
            .iter()
            .find(|b| b.has_id(id))
            .cloned()
    }

    /// Replace the stats singleton
    pub async fn set_stats(&self, stats: Stats) {
        self.collections.write().await.stats = Some(stats);
    }

    /// All `{ data }` records in insertion order
    pub async fn data_records(&self) -> Vec<DataRecord> {
        self.collections.read().await.data.clone()
    }

    /// Make every subsequent call of `operation` fail
    pub async fn fail_operation(&self, operation: StoreOperation) {
        self.failing.write().await.insert(operation);
    }

    /// Stop failing `operation`
    pub async fn restore_operation(&self, operation: StoreOperation) {
        self.failing.write().await.remove(&operation);
    }

    async fn check(&self, operation: StoreOperation) -> Result<()> {
        if self.failing.read().await.contains(&operation) {
            return Err(Error::StoreUnavailable(format!(
                "{operation} failed (injected)"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        self.check(StoreOperation::Ping).await
    }

    async fn insert_data(&self, value: serde_json::Value) -> Result<ObjectId> {
        self.check(StoreOperation::InsertData).await?;
        // Reject values BSON cannot hold, as the driver would
        mongodb::bson::to_bson(&value)?;

        let id = ObjectId::new();
        self.collections
            .write()
            .await
            .data
            .push(DataRecord { id, data: value });
        Ok(id)
    }

    async fn list_batteries(&self) -> Result<Vec<Battery>> {
        self.check(StoreOperation::ListBatteries).await?;
        Ok(self.collections.read().await.batteries.clone())
    }

    async fn find_stats(&self) -> Result<Option<Stats>> {
        self.check(StoreOperation::FindStats).await?;
        Ok(self.collections.read().await.stats.clone())
    }

    async fn update_battery(&self, id: BatteryId, update: BatteryUpdate) -> Result<UpdateOutcome> {
        self.check(StoreOperation::UpdateBattery).await?;

        let mut collections = self.collections.write().await;
        let Some(battery) = collections
            .batteries
            .iter_mut()
            .find(|b| b.has_id(id))
        else {
            return Ok(UpdateOutcome::default());
        };

        let changed = battery.apply(&update);
        Ok(UpdateOutcome {
            matched: 1,
            modified: u64::from(changed),
            upserted: false,
        })
    }

    async fn increment_stat(&self, counter: StatCounter, by: i64) -> Result<UpdateOutcome> {
        self.check(StoreOperation::IncrementStat).await?;

        let mut collections = self.collections.write().await;
        match collections.stats.as_mut() {
            Some(stats) => {
                stats.increment(counter, by)?;
                Ok(UpdateOutcome {
                    matched: 1,
                    modified: 1,
                    upserted: false,
                })
            }
            None => {
                let mut stats = Stats::empty();
                stats.increment(counter, by)?;
                collections.stats = Some(stats);
                Ok(UpdateOutcome {
                    matched: 0,
                    modified: 0,
                    upserted: true,
                })
            }
        }
    }
}
