//! Ingestion pipeline: resolve gateway -> parse body -> load allow-list ->
//! per report (decode -> allow-list check -> resolve device -> record).

mod allow_list;
mod body;
mod device;
mod gateway;
mod pipeline;
mod recorder;
mod summary;

pub use allow_list::AllowList;
pub use body::{RawReport, ReportBody, DEFAULT_RSSI};
pub use device::DeviceResolver;
pub use gateway::{
    extract_gateway_id, GatewayId, GatewayIdSource, GatewayResolver, IngestRequest,
    GATEWAY_MAC_BODY_FIELD, GATEWAY_MAC_HEADERS, GATEWAY_MAC_QUERY_PARAM,
};
pub use pipeline::{
    IngestError, IngestOutcome, IngestionPipeline, PipelineConfig, DEFAULT_BATCH_TIMEOUT,
};
pub use recorder::{ActivityRecorder, Observation};
pub use summary::{BatchSummary, GatewaySummary, ItemResult, ItemStatus};
