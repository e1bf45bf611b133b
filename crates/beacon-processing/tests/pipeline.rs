use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use beacon_parser::{encode_advertisement, DecodedBeacon};
use beacon_processing::{
    IngestError, IngestOutcome, IngestRequest, IngestionPipeline, ItemStatus, PipelineConfig,
};
use beacon_repository::{
    ActivityStore, AllowListStore, BeaconStore, Device, DeviceSighting, DeviceStore,
    ErrorLogEntry, ErrorLogStore, Gateway, GatewayStore, InMemoryRepository, NewActivity,
    RepositoryError,
};
use serde_json::{json, Value};
use uuid::Uuid;

const GATEWAY_MAC: &str = "AA:BB:CC:DD:EE:01";
const SERVICE_UUID: &str = "E2C56DB5-DFFB-48D2-B060-D0F5A71096E0";
const OTHER_UUID: &str = "FDA50693-A4E2-4FB1-AFCF-C6EB07647825";

fn frame(uuid: &str, major: u16, minor: u16) -> String {
    encode_advertisement(&DecodedBeacon {
        uuid: uuid.to_string(),
        major,
        minor,
        tx_power: -59,
        battery_level: None,
    })
}

fn gateway() -> Gateway {
    Gateway {
        id: "gw-lobby".into(),
        mac_address: "AABBCCDDEE01".into(),
        name: "Lobby".into(),
        gateway_type: "minew".into(),
        latitude: Some(13.7563),
        longitude: Some(100.5018),
        is_active: true,
    }
}

fn device(id: &str, minor: u16, is_active: bool) -> Device {
    Device {
        id: id.into(),
        uuid: SERVICE_UUID.to_ascii_lowercase(),
        major: 1,
        minor,
        is_active,
        last_seen: None,
        last_rssi: None,
        battery_level: None,
        updated_at: None,
    }
}

async fn seeded_store() -> InMemoryRepository {
    let store = InMemoryRepository::new();
    store.insert_gateway(gateway()).await;
    store.insert_device(device("dev-1", 2, true)).await;
    store.insert_device(device("dev-off", 3, false)).await;
    store.insert_allowed_uuid(SERVICE_UUID, true).await;
    store
}

fn pipeline(store: &InMemoryRepository) -> IngestionPipeline {
    let store: Arc<dyn BeaconStore> = Arc::new(store.clone());
    IngestionPipeline::new(store, PipelineConfig::default())
}

fn request(body: Value) -> IngestRequest {
    IngestRequest::new(body).with_header("X-Gateway-Mac", GATEWAY_MAC)
}

fn completed(outcome: IngestOutcome) -> beacon_processing::BatchSummary {
    match outcome {
        IngestOutcome::Completed(summary) => summary,
        other => panic!("expected a completed batch, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_gateway_is_rejected_without_side_effects() -> Result<()> {
    let store = InMemoryRepository::new();
    store.insert_allowed_uuid(SERVICE_UUID, true).await;
    store.insert_device(device("dev-1", 2, true)).await;

    let body = json!([{ "mac": "x", "rawData": frame(SERVICE_UUID, 1, 2), "rssi": -60 }]);
    let err = pipeline(&store).run(request(body)).await.unwrap_err();

    assert!(matches!(err, IngestError::GatewayNotFound(ref mac) if mac == "AABBCCDDEE01"));
    assert_eq!(store.write_count(), 0);
    assert_eq!(store.device_lookup_count(), 0);
    assert_eq!(store.activity_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn inactive_gateway_counts_as_unknown() -> Result<()> {
    let store = InMemoryRepository::new();
    store
        .insert_gateway(Gateway {
            is_active: false,
            ..gateway()
        })
        .await;

    let err = pipeline(&store).run(request(json!([]))).await.unwrap_err();
    assert!(matches!(err, IngestError::GatewayNotFound(_)));
    Ok(())
}

#[tokio::test]
async fn missing_gateway_id_is_a_request_error() -> Result<()> {
    let store = seeded_store().await;
    let err = pipeline(&store)
        .run(IngestRequest::new(json!([{ "rawData": frame(SERVICE_UUID, 1, 2) }])))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::MissingGatewayId));
    Ok(())
}

#[tokio::test]
async fn registered_beacon_updates_device_and_appends_activity() -> Result<()> {
    let store = seeded_store().await;
    let body = json!([{
        "mac": "C3:00:00:00:00:01",
        "rawData": frame(SERVICE_UUID, 1, 2),
        "rssi": -67,
        "timestamp": "2025-03-01T08:30:00Z",
    }]);

    let summary = completed(pipeline(&store).run(request(body)).await?);
    assert_eq!(summary.received, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.gateway.mac, "AABBCCDDEE01");
    assert_eq!(summary.gateway.name, "Lobby");
    assert_eq!(summary.gateway.gateway_type, "minew");
    assert_eq!(summary.results[0].device_id.as_deref(), Some("dev-1"));

    let device = store.device("dev-1").await.expect("device exists");
    assert_eq!(
        device.last_seen.map(|ts| ts.to_rfc3339()),
        Some("2025-03-01T08:30:00+00:00".to_string())
    );
    assert_eq!(device.last_rssi, Some(-67));
    assert!(device.updated_at.is_some());
    assert_eq!(device.battery_level, None);

    let activities = store.activities_for("dev-1").await;
    assert_eq!(activities.len(), 1);
    let activity = &activities[0].activity;
    assert_eq!(activity.gateway_id, "gw-lobby");
    assert_eq!(activity.gateway_name, "Lobby");
    assert_eq!(activity.gateway_type, "minew");
    assert_eq!(activity.latitude, 13.7563);
    assert_eq!(activity.longitude, 100.5018);
    assert_eq!(activity.rssi, -67);
    assert!(!activity.triggered_notification);
    assert!(activity.notification_type.is_none());
    assert_eq!(Some(activities[0].id), summary.results[0].activity_id);
    Ok(())
}

#[tokio::test]
async fn inactive_device_is_skipped_without_writes() -> Result<()> {
    let store = seeded_store().await;
    let body = json!([{ "mac": "x", "rawData": frame(SERVICE_UUID, 1, 3), "rssi": -50 }]);

    let summary = completed(pipeline(&store).run(request(body)).await?);
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(store.write_count(), 0);
    assert!(store.activities_for("dev-off").await.is_empty());
    assert_eq!(store.device("dev-off").await.and_then(|d| d.last_seen), None);
    Ok(())
}

#[tokio::test]
async fn empty_allow_list_short_circuits_before_device_lookups() -> Result<()> {
    let store = InMemoryRepository::new();
    store.insert_gateway(gateway()).await;
    store.insert_device(device("dev-1", 2, true)).await;
    store.insert_allowed_uuid(SERVICE_UUID, false).await;

    let body = json!([
        { "rawData": frame(SERVICE_UUID, 1, 2) },
        { "rawData": frame(SERVICE_UUID, 1, 2) },
    ]);
    let outcome = pipeline(&store).run(request(body)).await?;

    match outcome {
        IngestOutcome::NoAllowedUuids { gateway, received } => {
            assert_eq!(gateway.name, "Lobby");
            assert_eq!(received, 2);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(store.device_lookup_count(), 0);
    assert_eq!(store.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn empty_body_reports_no_reports() -> Result<()> {
    let store = seeded_store().await;
    for body in [json!([]), json!({ "data": [] }), Value::Null, json!({ "foo": 1 })] {
        let outcome = pipeline(&store).run(request(body)).await?;
        assert!(matches!(outcome, IngestOutcome::NoReports { .. }));
    }
    Ok(())
}

#[tokio::test]
async fn allow_list_match_ignores_letter_case() -> Result<()> {
    let store = InMemoryRepository::new();
    store.insert_gateway(gateway()).await;
    store.insert_device(device("dev-1", 2, true)).await;
    store
        .insert_allowed_uuid(SERVICE_UUID.to_ascii_lowercase(), true)
        .await;

    let raw = frame(SERVICE_UUID, 1, 2).to_ascii_lowercase();
    let summary = completed(pipeline(&store).run(request(json!([{ "rawData": raw }]))).await?);
    assert_eq!(summary.filtered_by_uuid, 0);
    assert_eq!(summary.processed, 1);
    Ok(())
}

#[tokio::test]
async fn accounting_holds_for_every_body_shape() -> Result<()> {
    let items = vec![
        json!({ "mac": "a", "rawData": frame(SERVICE_UUID, 1, 2), "rssi": -61 }),
        json!({ "mac": "b", "rawData": frame(OTHER_UUID, 9, 9) }),
        json!({ "mac": "c", "rawData": frame(SERVICE_UUID, 7, 7) }),
        json!({ "mac": "d" }),
        json!({ "mac": "e", "rawData": "0201061AFF4C00" }),
        json!("not-an-object"),
        json!({ "mac": "f", "rawData": 42 }),
    ];

    let shapes = vec![
        (json!(items.clone()), 7),
        (json!({ "gatewayMac": GATEWAY_MAC, "data": items.clone() }), 7),
        (items[0].clone(), 1),
    ];

    for (body, expected) in shapes {
        let store = seeded_store().await;
        let summary = completed(pipeline(&store).run(request(body)).await?);
        assert_eq!(summary.received, expected);
        assert_eq!(
            summary.processed + summary.skipped + summary.filtered_by_uuid + summary.errors,
            summary.received
        );
        assert_eq!(summary.results.len(), summary.received);
    }

    let store = seeded_store().await;
    let summary = completed(pipeline(&store).run(request(json!(items))).await?);
    let statuses: Vec<ItemStatus> = summary.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            ItemStatus::Processed,
            ItemStatus::Filtered,
            ItemStatus::Skipped,
            ItemStatus::Skipped,
            ItemStatus::Skipped,
            ItemStatus::Skipped,
            ItemStatus::Skipped,
        ]
    );
    assert_eq!(summary.results[3].reason.as_deref(), Some("missing rawData"));
    Ok(())
}

#[tokio::test]
async fn missing_rssi_is_recorded_as_default() -> Result<()> {
    let store = seeded_store().await;
    let body = json!({ "mac": "x", "rawData": frame(SERVICE_UUID, 1, 2) });
    completed(pipeline(&store).run(request(body)).await?);

    let activities = store.activities_for("dev-1").await;
    assert_eq!(activities[0].activity.rssi, -100);
    Ok(())
}

#[tokio::test]
async fn activity_failure_is_an_item_error_not_a_batch_failure() -> Result<()> {
    let store = seeded_store().await;
    store.fail_activity_appends(true);

    let body = json!([
        { "rawData": frame(SERVICE_UUID, 1, 2), "rssi": -70 },
        { "rawData": frame(OTHER_UUID, 1, 2) },
    ]);
    let summary = completed(pipeline(&store).run(request(body)).await?);

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.filtered_by_uuid, 1);
    assert_eq!(summary.results[0].status, ItemStatus::Error);
    assert!(summary.results[0]
        .reason
        .as_deref()
        .is_some_and(|reason| reason.contains("activity append")));

    // The device update that preceded the failed append is kept.
    let device = store.device("dev-1").await.expect("device exists");
    assert_eq!(device.last_rssi, Some(-70));
    assert_eq!(store.activity_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn allow_list_store_failure_fails_the_batch() -> Result<()> {
    let store = seeded_store().await;
    store.fail_allow_list(true);

    let err = pipeline(&store)
        .run(request(json!([{ "rawData": frame(SERVICE_UUID, 1, 2) }])))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Store(RepositoryError::Unavailable(_))));
    Ok(())
}

#[tokio::test]
async fn device_update_failure_skips_the_append_and_the_batch_continues() -> Result<()> {
    let store = seeded_store().await;
    store.fail_device_updates(true);

    let body = json!([
        { "rawData": frame(SERVICE_UUID, 1, 2), "rssi": -70 },
        { "rawData": frame(OTHER_UUID, 1, 2) },
    ]);
    let summary = completed(pipeline(&store).run(request(body)).await?);

    assert_eq!(summary.received, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.results[0].status, ItemStatus::Error);
    assert_eq!(summary.results[0].device_id.as_deref(), Some("dev-1"));
    assert!(summary.results[0]
        .reason
        .as_deref()
        .is_some_and(|reason| reason.contains("device update")));
    assert_eq!(summary.results[1].status, ItemStatus::Filtered);

    assert_eq!(store.activity_count().await, 0);
    assert_eq!(store.write_count(), 0);
    assert_eq!(store.device("dev-1").await.and_then(|d| d.last_rssi), None);
    Ok(())
}

#[tokio::test]
async fn loosely_typed_optional_fields_do_not_drop_reports() -> Result<()> {
    let store = seeded_store().await;
    let raw = frame(SERVICE_UUID, 1, 2);

    let body = json!([
        { "rawData": raw, "timestamp": 1_700_000_000_000_i64, "rssi": -55 },
        { "rawData": raw, "rssi": "-60" },
        { "rawData": raw, "bleName": 7, "mac": 12, "rssi": -65 },
    ]);
    let summary = completed(pipeline(&store).run(request(body)).await?);

    assert_eq!(summary.received, 3);
    assert_eq!(summary.processed, 3);

    let activities = store.activities_for("dev-1").await;
    let rssi: Vec<i32> = activities.iter().map(|a| a.activity.rssi).collect();
    assert!(rssi.contains(&-55));
    assert!(rssi.contains(&-60));
    assert!(rssi.contains(&-65));

    let epoch_millis = activities
        .iter()
        .find(|a| a.activity.rssi == -55)
        .map(|a| a.activity.timestamp.to_rfc3339());
    assert_eq!(epoch_millis.as_deref(), Some("2023-11-14T22:13:20+00:00"));
    Ok(())
}

/// Delegates to an in-memory store but stalls on gateway lookups.
struct SlowStore {
    inner: InMemoryRepository,
    delay: Duration,
}

#[async_trait]
impl GatewayStore for SlowStore {
    async fn find_active_gateway_by_mac(
        &self,
        normalized_mac: &str,
    ) -> Result<Option<Gateway>, RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_active_gateway_by_mac(normalized_mac).await
    }
}

#[async_trait]
impl DeviceStore for SlowStore {
    async fn find_active_device(
        &self,
        uuid: &str,
        major: u16,
        minor: u16,
    ) -> Result<Option<Device>, RepositoryError> {
        self.inner.find_active_device(uuid, major, minor).await
    }

    async fn update_last_seen(
        &self,
        device_id: &str,
        sighting: &DeviceSighting,
    ) -> Result<(), RepositoryError> {
        self.inner.update_last_seen(device_id, sighting).await
    }
}

#[async_trait]
impl ActivityStore for SlowStore {
    async fn append_activity(
        &self,
        device_id: &str,
        activity: &NewActivity,
    ) -> Result<Uuid, RepositoryError> {
        self.inner.append_activity(device_id, activity).await
    }
}

#[async_trait]
impl AllowListStore for SlowStore {
    async fn load_allowed_uuids(&self) -> Result<Vec<String>, RepositoryError> {
        self.inner.load_allowed_uuids().await
    }
}

#[async_trait]
impl ErrorLogStore for SlowStore {
    async fn append_error(&self, entry: &ErrorLogEntry) -> Result<(), RepositoryError> {
        self.inner.append_error(entry).await
    }
}

#[tokio::test(start_paused = true)]
async fn slow_batch_times_out() -> Result<()> {
    let inner = seeded_store().await;
    let store = Arc::new(SlowStore {
        inner: inner.clone(),
        delay: Duration::from_secs(120),
    });
    let pipeline = IngestionPipeline::new(
        store,
        PipelineConfig {
            batch_timeout: Duration::from_secs(5),
        },
    );

    let err = pipeline
        .run(request(json!([{ "rawData": frame(SERVICE_UUID, 1, 2) }])))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::TimedOut(budget) if budget == Duration::from_secs(5)));
    assert_eq!(inner.write_count(), 0);
    Ok(())
}
