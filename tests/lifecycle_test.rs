//! Battery lifecycle and stats counter tests

mod common;

use chargehub::models::{Battery, BatteryId, StatCounter, Stats};
use chargehub::storage::{DocumentStore, MemoryStore};
use mongodb::bson::doc;
use serde_json::json;

use common::{create_test_app_with, json_body, send, send_json, text_body};

fn labelled_battery(id: BatteryId) -> Battery {
    Battery::from(doc! {
        "_id": id.object_id(),
        "charging": true,
        "label": "bay-7",
        "capacityMah": 3000,
    })
}

#[tokio::test]
async fn test_pause_then_resume_only_touches_charging() {
    let id = BatteryId::new();
    let original = labelled_battery(id);
    let (app, store) = create_test_app_with(MemoryStore::with_batteries([original.clone()]));

    let response = send(&app, "POST", &format!("/batteries/{id}/pause")).await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        text_body(response).await,
        format!("Charging paused for battery ID: {id}")
    );
    assert_eq!(store.battery(id).await.unwrap().is_charging(), Some(false));

    let response = send(&app, "POST", &format!("/batteries/{id}/resume")).await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        text_body(response).await,
        format!("Charging resumed for battery ID: {id}")
    );

    let battery = store.battery(id).await.unwrap();
    assert_eq!(battery, original);
}

#[tokio::test]
async fn test_pause_unknown_battery_still_succeeds() {
    let (app, store) = create_test_app_with(MemoryStore::new());
    let id = BatteryId::new();

    let response = send(&app, "POST", &format!("/batteries/{id}/pause")).await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        text_body(response).await,
        format!("Charging paused for battery ID: {id}")
    );
    assert!(store.list_batteries().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_charge_complete_creates_stats() {
    let id = BatteryId::new();
    let (app, store) = create_test_app_with(MemoryStore::with_batteries([Battery::charging(id)]));

    let response = send(&app, "POST", &format!("/batteries/{id}/chargeComplete")).await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        text_body(response).await,
        format!("Battery ID: {id} marked as charged")
    );

    let battery = store.battery(id).await.unwrap();
    assert_eq!(battery.is_charging(), Some(false));
    assert_eq!(battery.charged(), Some(true));
    assert_eq!(battery.halted(), None);

    let stats = store.find_stats().await.unwrap().unwrap();
    assert_eq!(stats.get(StatCounter::Charged), 1);
    assert!(stats.counter(StatCounter::Halted).is_none());
}

#[tokio::test]
async fn test_charge_complete_increments_existing_stats_by_one() {
    let id = BatteryId::new();
    let (app, store) = create_test_app_with(MemoryStore::with_batteries([Battery::charging(id)]));
    let mut stats = Stats::empty();
    stats.increment(StatCounter::Charged, 9).unwrap();
    stats.increment(StatCounter::CurrentCharging, 4).unwrap();
    store.set_stats(stats).await;

    let response = send(&app, "POST", &format!("/batteries/{id}/chargeComplete")).await;
    assert_eq!(response.status(), 200);

    let stats = store.find_stats().await.unwrap().unwrap();
    assert_eq!(stats.get(StatCounter::Charged), 10);
    assert_eq!(stats.get(StatCounter::CurrentCharging), 4);
}

#[tokio::test]
async fn test_halt_sets_flag_and_counts() {
    let id = BatteryId::new();
    let (app, store) = create_test_app_with(MemoryStore::with_batteries([Battery::charging(id)]));

    let response = send(&app, "POST", &format!("/batteries/{id}/halt")).await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        text_body(response).await,
        format!("Battery ID: {id} marked as halted")
    );

    let battery = store.battery(id).await.unwrap();
    assert_eq!(battery.is_charging(), Some(false));
    assert_eq!(battery.halted(), Some(true));
    assert_eq!(battery.charged(), None);

    let response = send(&app, "GET", "/stats").await;
    let body = json_body(response).await;
    assert_eq!(body["haltedBatteries"], json!(1));
    assert!(body.get("chargedBatteries").is_none());
}

#[tokio::test]
async fn test_charged_and_halted_are_independent() {
    let id = BatteryId::new();
    let (app, store) = create_test_app_with(MemoryStore::with_batteries([Battery::charging(id)]));

    send(&app, "POST", &format!("/batteries/{id}/chargeComplete")).await;
    send(&app, "POST", &format!("/batteries/{id}/halt")).await;

    let battery = store.battery(id).await.unwrap();
    assert_eq!(battery.charged(), Some(true));
    assert_eq!(battery.halted(), Some(true));

    let stats = store.find_stats().await.unwrap().unwrap();
    assert_eq!(stats.get(StatCounter::Charged), 1);
    assert_eq!(stats.get(StatCounter::Halted), 1);
}

#[tokio::test]
async fn test_charge_complete_on_unknown_battery_still_counts() {
    let (app, store) = create_test_app_with(MemoryStore::new());
    let id = BatteryId::new();

    let response = send(&app, "POST", &format!("/batteries/{id}/chargeComplete")).await;
    assert_eq!(response.status(), 200);

    let stats = store.find_stats().await.unwrap().unwrap();
    assert_eq!(stats.get(StatCounter::Charged), 1);
}

#[tokio::test]
async fn test_update_charging_count_on_existing_stats() {
    let (app, store) = create_test_app_with(MemoryStore::new());
    let mut stats = Stats::empty();
    stats.increment(StatCounter::CurrentCharging, 5).unwrap();
    store.set_stats(stats).await;

    let id = BatteryId::new();
    let response = send_json(
        &app,
        "POST",
        &format!("/batteries/{id}/updateChargingCount"),
        json!({ "increment": -3 }),
    )
    .await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        text_body(response).await,
        format!("Updated charging count for battery ID: {id}")
    );

    let stats = store.find_stats().await.unwrap().unwrap();
    assert_eq!(stats.get(StatCounter::CurrentCharging), 2);
}

#[tokio::test]
async fn test_update_charging_count_creates_stats() {
    let (app, store) = create_test_app_with(MemoryStore::new());

    let response = send_json(
        &app,
        "POST",
        "/batteries/any-label/updateChargingCount",
        json!({ "increment": -3 }),
    )
    .await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        text_body(response).await,
        "Updated charging count for battery ID: any-label"
    );

    let stats = store.find_stats().await.unwrap().unwrap();
    assert_eq!(stats.get(StatCounter::CurrentCharging), -3);
    assert!(stats.counter(StatCounter::Charged).is_none());
}
