use std::sync::Arc;

use beacon_processing::{IngestionPipeline, PipelineConfig};
use beacon_repository::BeaconStore;

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<IngestionPipeline>,
    store: Arc<dyn BeaconStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn BeaconStore>, config: PipelineConfig) -> Self {
        let pipeline = Arc::new(IngestionPipeline::new(store.clone(), config));
        Self { pipeline, store }
    }

    pub fn pipeline(&self) -> &IngestionPipeline {
        &self.pipeline
    }

    /// Used for the error log, which sits outside the pipeline.
    pub fn store(&self) -> &dyn BeaconStore {
        self.store.as_ref()
    }
}
