//! MongoDB-backed document store

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Document};
use mongodb::options::ClientOptions;
use mongodb::results::UpdateResult;
use mongodb::{Client, Collection, Database};

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::models::{
    Battery, BatteryId, BatteryUpdate, StatCounter, Stats, UpdateOutcome, BATTERIES_COLLECTION,
    DATA_COLLECTION, STATS_COLLECTION,
};

use super::DocumentStore;

/// Document store backed by a MongoDB database
///
/// The driver's `Client` pools connections internally, so one `MongoStore`
/// is shared by every request handler.
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Connect using `config` and verify the server answers a ping
    ///
    /// The driver connects lazily, so the ping is what makes an unreachable
    /// server fail here rather than on the first request.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        if let Some(app_name) = &config.app_name {
            options.app_name = Some(app_name.clone());
        }

        let client = Client::with_options(options)?;
        let store = Self::from_client(client, &config.name);

        store.ping().await?;
        tracing::info!(database = %config.name, "Connected to MongoDB");

        Ok(store)
    }

    /// Wrap an existing client without contacting the server
    pub fn from_client(client: Client, database: &str) -> Self {
        Self {
            db: client.database(database),
        }
    }

    /// The underlying database handle
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Estimated document count of each collection the gateway uses
    pub async fn collection_counts(&self) -> Result<Vec<(&'static str, u64)>> {
        let mut counts = Vec::new();
        for name in [DATA_COLLECTION, BATTERIES_COLLECTION, STATS_COLLECTION] {
            let count = self
                .documents(name)
                .estimated_document_count()
                .await?;
            counts.push((name, count));
        }
        Ok(counts)
    }

    fn documents(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }
}

fn outcome(result: UpdateResult) -> UpdateOutcome {
    UpdateOutcome {
        matched: result.matched_count,
        modified: result.modified_count,
        upserted: result.upserted_id.is_some(),
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn name(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn insert_data(&self, value: serde_json::Value) -> Result<ObjectId> {
        let data = mongodb::bson::to_bson(&value)?;
        let result = self
            .documents(DATA_COLLECTION)
            .insert_one(doc! { "data": data })
            .await?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| Error::other("Inserted document has no ObjectId"))
    }

    async fn list_batteries(&self) -> Result<Vec<Battery>> {
        let cursor = self.documents(BATTERIES_COLLECTION).find(doc! {}).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(Battery::from).collect())
    }

    async fn find_stats(&self) -> Result<Option<Stats>> {
        let document = self.documents(STATS_COLLECTION).find_one(doc! {}).await?;
        Ok(document.map(Stats::from))
    }

    async fn update_battery(&self, id: BatteryId, update: BatteryUpdate) -> Result<UpdateOutcome> {
        let set = update.to_set_document();
        // MongoDB rejects an empty $set
        if set.is_empty() {
            return Ok(UpdateOutcome::default());
        }

        let result = self
            .documents(BATTERIES_COLLECTION)
            .update_one(doc! { "_id": id.object_id() }, doc! { "$set": set })
            .await?;

        Ok(outcome(result))
    }

    async fn increment_stat(&self, counter: StatCounter, by: i64) -> Result<UpdateOutcome> {
        let mut inc = Document::new();
        inc.insert(counter.field_name(), by);

        let result = self
            .documents(STATS_COLLECTION)
            .update_one(doc! {}, doc! { "$inc": inc })
            .upsert(true)
            .await?;

        Ok(outcome(result))
    }
}
