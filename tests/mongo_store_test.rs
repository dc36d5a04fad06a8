//! MongoDB store tests
//!
//! These need a running server and are ignored by default:
//!
//! ```text
//! MONGODB_URI=mongodb://localhost:27017 cargo test --test mongo_store_test -- --ignored
//! ```
//!
//! Each test works in its own throwaway database, dropped at the end.

use chargehub::config::DatabaseConfig;
use chargehub::models::{
    BatteryId, BatteryUpdate, StatCounter, BATTERIES_COLLECTION, DATA_COLLECTION,
    STATS_COLLECTION,
};
use chargehub::storage::{DocumentStore, MongoStore};
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use serde_json::json;

async fn connect() -> MongoStore {
    let uri = std::env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let config = DatabaseConfig {
        uri,
        name: format!("chargehub_test_{}", ObjectId::new().to_hex()),
        app_name: Some("chargehub-tests".to_string()),
    };
    MongoStore::connect(&config).await.expect("MongoDB should be reachable")
}

async fn seed_battery(store: &MongoStore, id: BatteryId) {
    store
        .database()
        .collection::<Document>(BATTERIES_COLLECTION)
        .insert_one(doc! { "_id": id.object_id(), "charging": true, "label": "bay-1" })
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "Requires running MongoDB"]
async fn test_ping() {
    let store = connect().await;
    assert!(store.ping().await.is_ok());
    store.database().drop().await.unwrap();
}

#[tokio::test]
#[ignore = "Requires running MongoDB"]
async fn test_insert_data() {
    let store = connect().await;
    let id = store.insert_data(json!({ "cells": [1, 2] })).await.unwrap();

    let stored = store
        .database()
        .collection::<Document>(DATA_COLLECTION)
        .find_one(doc! { "_id": id })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        stored.get_document("data").unwrap().get_array("cells").unwrap().len(),
        2
    );

    store.database().drop().await.unwrap();
}

#[tokio::test]
#[ignore = "Requires running MongoDB"]
async fn test_battery_lifecycle() {
    let store = connect().await;
    let id = BatteryId::new();
    seed_battery(&store, id).await;

    let outcome = store.update_battery(id, BatteryUpdate::pause()).await.unwrap();
    assert_eq!(outcome.matched, 1);
    assert_eq!(outcome.modified, 1);

    store
        .update_battery(id, BatteryUpdate::charge_complete())
        .await
        .unwrap();

    let batteries = store.list_batteries().await.unwrap();
    assert_eq!(batteries.len(), 1);
    assert_eq!(batteries[0].is_charging(), Some(false));
    assert_eq!(batteries[0].charged(), Some(true));
    assert_eq!(batteries[0].document().get_str("label").unwrap(), "bay-1");

    let outcome = store
        .update_battery(BatteryId::new(), BatteryUpdate::halt())
        .await
        .unwrap();
    assert_eq!(outcome.matched, 0);

    store.database().drop().await.unwrap();
}

#[tokio::test]
#[ignore = "Requires running MongoDB"]
async fn test_increment_upserts_singleton() {
    let store = connect().await;
    assert!(store.find_stats().await.unwrap().is_none());

    let outcome = store.increment_stat(StatCounter::Charged, 1).await.unwrap();
    assert!(outcome.upserted);

    store.increment_stat(StatCounter::Charged, 1).await.unwrap();
    store
        .increment_stat(StatCounter::CurrentCharging, -3)
        .await
        .unwrap();

    let stats = store.find_stats().await.unwrap().unwrap();
    assert_eq!(stats.get(StatCounter::Charged), 2);
    assert_eq!(stats.get(StatCounter::CurrentCharging), -3);
    assert!(stats.counter(StatCounter::Halted).is_none());

    let counts = store.collection_counts().await.unwrap();
    assert!(counts.iter().any(|(name, count)| *name == "stats" && *count == 1));

    store.database().drop().await.unwrap();
}

#[tokio::test]
#[ignore = "Requires running MongoDB"]
async fn test_reads_documents_without_schema() {
    let store = connect().await;
    let db = store.database();
    db.collection::<Document>(BATTERIES_COLLECTION)
        .insert_many([
            doc! { "_id": "bay-9", "charging": null },
            doc! { "_id": ObjectId::new(), "label": "no flags" },
        ])
        .await
        .unwrap();
    db.collection::<Document>(STATS_COLLECTION)
        .insert_one(doc! { "chargedBatteries": 2.5 })
        .await
        .unwrap();

    assert_eq!(store.list_batteries().await.unwrap().len(), 2);

    store.increment_stat(StatCounter::Charged, 1).await.unwrap();
    let stats = store.find_stats().await.unwrap().unwrap();
    assert_eq!(stats.counter(StatCounter::Charged), Some(&Bson::Double(3.5)));

    db.drop().await.unwrap();
}

#[tokio::test]
#[ignore = "Requires running MongoDB"]
async fn test_insert_rejects_values_bson_cannot_hold() {
    let store = connect().await;
    let err = store.insert_data(json!(u64::MAX)).await.unwrap_err();
    assert!(err.is_client_error());
    store.database().drop().await.unwrap();
}
