use std::sync::Arc;
use std::time::{Duration, Instant};

use beacon_parser::{FrameDecoder, IBeaconDecoder};
use beacon_repository::{BeaconStore, Gateway, RepositoryError};
use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::allow_list::AllowList;
use crate::body::{RawReport, ReportBody};
use crate::device::DeviceResolver;
use crate::gateway::{extract_gateway_id, GatewayResolver, IngestRequest};
use crate::recorder::{ActivityRecorder, Observation};
use crate::summary::{BatchSummary, GatewaySummary, ItemResult};

pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub batch_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("gateway MAC address is required")]
    MissingGatewayId,

    #[error("gateway {0} is not registered or inactive")]
    GatewayNotFound(String),

    #[error(transparent)]
    Store(#[from] RepositoryError),

    #[error("ingestion did not finish within {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Completed(BatchSummary),
    /// The body held no reports.
    NoReports { gateway: GatewaySummary },
    /// Reports arrived but no service UUID is allow-listed, so none were
    /// looked at.
    NoAllowedUuids {
        gateway: GatewaySummary,
        received: usize,
    },
}

/// Drives one ingestion request end to end against a [`BeaconStore`].
pub struct IngestionPipeline<S: ?Sized = dyn BeaconStore> {
    store: Arc<S>,
    decoder: Arc<dyn FrameDecoder>,
    config: PipelineConfig,
}

impl<S> IngestionPipeline<S>
where
    S: BeaconStore + ?Sized,
{
    pub fn new(store: Arc<S>, config: PipelineConfig) -> Self {
        Self::with_decoder(store, Arc::new(IBeaconDecoder::new()), config)
    }

    pub fn with_decoder(
        store: Arc<S>,
        decoder: Arc<dyn FrameDecoder>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            decoder,
            config,
        }
    }

    /// Runs the batch under the configured timeout. When the timeout fires
    /// the in-flight batch is dropped and the whole request fails.
    pub async fn run(&self, request: IngestRequest) -> Result<IngestOutcome, IngestError> {
        let budget = self.config.batch_timeout;
        match tokio::time::timeout(budget, self.run_batch(request)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(timeout_ms = budget.as_millis() as u64, "ingestion batch timed out");
                Err(IngestError::TimedOut(budget))
            }
        }
    }

    async fn run_batch(&self, request: IngestRequest) -> Result<IngestOutcome, IngestError> {
        let started = Instant::now();
        let store = self.store.as_ref();

        let gateway_id = extract_gateway_id(&request).ok_or(IngestError::MissingGatewayId)?;
        let gateway = GatewayResolver::new(store)
            .resolve(&gateway_id)
            .await?
            .ok_or_else(|| IngestError::GatewayNotFound(gateway_id.normalized.clone()))?;
        let gateway_summary = GatewaySummary::from(&gateway);

        let body = ReportBody::from_value(request.body);
        let shape = body.shape();
        let items = body.into_items();
        debug!(
            gateway_mac = %gateway.mac_address,
            shape,
            received = items.len(),
            "parsed ingestion body"
        );
        if items.is_empty() {
            return Ok(IngestOutcome::NoReports {
                gateway: gateway_summary,
            });
        }

        let allow_list = AllowList::load(store).await?;
        if allow_list.is_empty() {
            warn!(gateway_mac = %gateway.mac_address, "allow-list is empty, ignoring batch");
            return Ok(IngestOutcome::NoAllowedUuids {
                gateway: gateway_summary,
                received: items.len(),
            });
        }

        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let result = self.process_item(index, item, &gateway, &allow_list).await;
            debug!(index, status = ?result.status, reason = ?result.reason, "processed report");
            results.push(result);
        }

        let summary = BatchSummary::from_results(gateway_summary, results, started.elapsed());
        info!(
            gateway_mac = %gateway.mac_address,
            received = summary.received,
            processed = summary.processed,
            skipped = summary.skipped,
            filtered = summary.filtered_by_uuid,
            errors = summary.errors,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "ingestion batch complete"
        );
        Ok(IngestOutcome::Completed(summary))
    }

    async fn process_item(
        &self,
        index: usize,
        item: Value,
        gateway: &Gateway,
        allow_list: &AllowList,
    ) -> ItemResult {
        let report = match RawReport::from_value(item) {
            Ok(report) => report,
            Err(reason) => return ItemResult::skipped(index, reason),
        };
        let Some(raw_data) = report.raw_data() else {
            return ItemResult::skipped(index, "missing rawData");
        };

        let beacon = match self.decoder.decode(raw_data) {
            Ok(beacon) => beacon,
            Err(err) => {
                debug!(index, decoder = err.decoder(), error = %err, "frame not decodable");
                return ItemResult::skipped(index, format!("not decodable: {err}"));
            }
        };

        if !allow_list.contains(&beacon.uuid) {
            return ItemResult::filtered(index, &beacon);
        }

        let store = self.store.as_ref();
        let device = match DeviceResolver::new(store).resolve(&beacon).await {
            Ok(Some(device)) => device,
            Ok(None) => {
                return ItemResult::skipped(index, "device not registered").with_beacon(&beacon);
            }
            Err(err) => {
                warn!(index, error = %err, "device lookup failed");
                return ItemResult::error(index, err.to_string()).with_beacon(&beacon);
            }
        };

        let observation = Observation {
            rssi: report.rssi_or_default(),
            observed_at: report.observed_at(Utc::now()),
            battery_level: beacon.battery_level,
        };
        match ActivityRecorder::new(store)
            .record(&device, gateway, observation)
            .await
        {
            Ok(activity_id) => ItemResult::processed(index, &beacon, &device.id, activity_id),
            Err(err) => {
                warn!(index, device_id = %device.id, error = %err, "failed to record activity");
                ItemResult::error(index, err.to_string())
                    .with_beacon(&beacon)
                    .with_device(&device.id)
            }
        }
    }
}
