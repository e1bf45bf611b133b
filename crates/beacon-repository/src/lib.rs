//! Storage for gateways, devices, movement activities, the service UUID
//! allow-list and the error log.
//!
//! The ingestion pipeline only talks to the traits in this crate, so the
//! Postgres backend and the in-memory backend are interchangeable.

mod memory;
mod models;
mod postgres;

use async_trait::async_trait;
use sqlx::migrate::MigrateError;
use thiserror::Error;
use uuid::Uuid;

pub use memory::InMemoryRepository;
pub use models::{ActivityRecord, Device, DeviceSighting, ErrorLogEntry, Gateway, NewActivity};
pub use postgres::PostgresRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] MigrateError),

    #[error("invalid {entity} record '{id}': {message}")]
    InvalidRecord {
        entity: &'static str,
        id: String,
        message: String,
    },

    #[error("{entity} not found for id '{id}'")]
    NotFound { entity: &'static str, id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait GatewayStore: Send + Sync {
    /// Looks up the active gateway owning an already-normalized MAC.
    async fn find_active_gateway_by_mac(
        &self,
        normalized_mac: &str,
    ) -> Result<Option<Gateway>, RepositoryError>;
}

#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// `uuid` must already be in the lower-case device form.
    async fn find_active_device(
        &self,
        uuid: &str,
        major: u16,
        minor: u16,
    ) -> Result<Option<Device>, RepositoryError>;

    async fn update_last_seen(
        &self,
        device_id: &str,
        sighting: &DeviceSighting,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn append_activity(
        &self,
        device_id: &str,
        activity: &NewActivity,
    ) -> Result<Uuid, RepositoryError>;
}

#[async_trait]
pub trait AllowListStore: Send + Sync {
    /// Returns the active service UUIDs exactly as stored.
    async fn load_allowed_uuids(&self) -> Result<Vec<String>, RepositoryError>;
}

#[async_trait]
pub trait ErrorLogStore: Send + Sync {
    async fn append_error(&self, entry: &ErrorLogEntry) -> Result<(), RepositoryError>;
}

/// Everything the ingestion pipeline needs from a backing store.
pub trait BeaconStore:
    GatewayStore + DeviceStore + ActivityStore + AllowListStore + ErrorLogStore
{
}

impl<T> BeaconStore for T where
    T: GatewayStore + DeviceStore + ActivityStore + AllowListStore + ErrorLogStore
{
}
