use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{Device, DeviceSighting, ErrorLogEntry, Gateway, NewActivity};
use crate::{
    ActivityStore, AllowListStore, DeviceStore, ErrorLogStore, GatewayStore, RepositoryError,
};

#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl GatewayStore for PostgresRepository {
    async fn find_active_gateway_by_mac(
        &self,
        normalized_mac: &str,
    ) -> Result<Option<Gateway>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                gateway_id,
                mac_address,
                name,
                gateway_type,
                latitude,
                longitude,
                is_active
            FROM gateways
            WHERE mac_address = $1
              AND is_active = TRUE
            LIMIT 1
            "#,
        )
        .bind(normalized_mac)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| gateway_from_row(&row)).transpose()
    }
}

#[async_trait]
impl DeviceStore for PostgresRepository {
    async fn find_active_device(
        &self,
        uuid: &str,
        major: u16,
        minor: u16,
    ) -> Result<Option<Device>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                device_id,
                uuid,
                major,
                minor,
                is_active,
                last_seen,
                last_rssi,
                battery_level,
                updated_at
            FROM devices
            WHERE uuid = $1
              AND major = $2
              AND minor = $3
              AND is_active = TRUE
            LIMIT 1
            "#,
        )
        .bind(uuid)
        .bind(i32::from(major))
        .bind(i32::from(minor))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| device_from_row(&row)).transpose()
    }

    async fn update_last_seen(
        &self,
        device_id: &str,
        sighting: &DeviceSighting,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE devices
            SET last_seen = $1,
                last_rssi = $2,
                updated_at = $3,
                battery_level = COALESCE($4, battery_level)
            WHERE device_id = $5
            "#,
        )
        .bind(sighting.last_seen)
        .bind(sighting.last_rssi)
        .bind(sighting.updated_at)
        .bind(sighting.battery_level.map(i16::from))
        .bind(device_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound {
                entity: "device",
                id: device_id.to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl ActivityStore for PostgresRepository {
    async fn append_activity(
        &self,
        device_id: &str,
        activity: &NewActivity,
    ) -> Result<Uuid, RepositoryError> {
        let activity_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO device_activities (
                activity_id,
                device_id,
                observed_at,
                gateway_id,
                gateway_name,
                gateway_type,
                latitude,
                longitude,
                rssi,
                triggered_notification,
                notification_type,
                notification_details,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(activity_id)
        .bind(device_id)
        .bind(activity.timestamp)
        .bind(&activity.gateway_id)
        .bind(&activity.gateway_name)
        .bind(&activity.gateway_type)
        .bind(activity.latitude)
        .bind(activity.longitude)
        .bind(activity.rssi)
        .bind(activity.triggered_notification)
        .bind(&activity.notification_type)
        .bind(activity.notification_details.clone())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(activity_id)
    }
}

#[async_trait]
impl AllowListStore for PostgresRepository {
    async fn load_allowed_uuids(&self) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT uuid
            FROM allowed_service_uuids
            WHERE is_active = TRUE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut uuids = Vec::with_capacity(rows.len());
        for row in rows {
            uuids.push(row.try_get("uuid")?);
        }

        Ok(uuids)
    }
}

#[async_trait]
impl ErrorLogStore for PostgresRepository {
    async fn append_error(&self, entry: &ErrorLogEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO error_logs (error_id, source, message, context, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&entry.source)
        .bind(&entry.message)
        .bind(entry.context.clone())
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn gateway_from_row(row: &PgRow) -> Result<Gateway, RepositoryError> {
    Ok(Gateway {
        id: row.try_get("gateway_id")?,
        mac_address: row.try_get("mac_address")?,
        name: row.try_get("name")?,
        gateway_type: row.try_get("gateway_type")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        is_active: row.try_get("is_active")?,
    })
}

fn device_from_row(row: &PgRow) -> Result<Device, RepositoryError> {
    let id: String = row.try_get("device_id")?;
    let major: i32 = row.try_get("major")?;
    let minor: i32 = row.try_get("minor")?;
    let battery_level: Option<i16> = row.try_get("battery_level")?;

    let invalid = |message: String| RepositoryError::InvalidRecord {
        entity: "device",
        id: id.clone(),
        message,
    };

    let major = u16::try_from(major).map_err(|_| invalid(format!("major {major} out of range")))?;
    let minor = u16::try_from(minor).map_err(|_| invalid(format!("minor {minor} out of range")))?;
    let battery_level = match battery_level {
        Some(level) => Some(
            u8::try_from(level)
                .map_err(|_| invalid(format!("battery level {level} out of range")))?,
        ),
        None => None,
    };

    Ok(Device {
        id,
        uuid: row.try_get("uuid")?,
        major,
        minor,
        is_active: row.try_get("is_active")?,
        last_seen: row.try_get("last_seen")?,
        last_rssi: row.try_get("last_rssi")?,
        battery_level,
        updated_at: row.try_get("updated_at")?,
    })
}
