use super::CameraStore;
use crate::db::models::{Camera, CameraWithIncidents, Incident, NewCamera};
use crate::error::Error;
use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Cameras repository for handling camera operations
#[derive(Clone)]
pub struct CamerasRepository {
    pool: Arc<PgPool>,
}

impl CamerasRepository {
    /// Create a new cameras repository
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CameraStore for CamerasRepository {
    async fn create(&self, camera: &NewCamera) -> Result<Camera> {
        info!("Creating new camera: {}", camera.name);

        let result = sqlx::query_as::<_, Camera>(
            r#"
            INSERT INTO cameras (name, location)
            VALUES ($1, $2)
            RETURNING id, name, location
            "#,
        )
        .bind(&camera.name)
        .bind(&camera.location)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create camera: {}", e)))?;

        Ok(result)
    }

    async fn get_all(&self) -> Result<Vec<Camera>> {
        let result = sqlx::query_as::<_, Camera>(
            r#"
            SELECT id, name, location
            FROM cameras
            ORDER BY id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get all cameras: {}", e)))?;

        Ok(result)
    }

    async fn get_all_with_open_incidents(&self) -> Result<Vec<CameraWithIncidents>> {
        let cameras = self.get_all().await?;

        let open = sqlx::query_as::<_, Incident>(
            r#"
            SELECT id, camera_id, incident_type, ts_start, ts_end, thumbnail_url, resolved
            FROM incidents
            WHERE resolved = FALSE
            ORDER BY ts_start DESC, id DESC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get open incidents: {}", e)))?;

        let mut by_camera: HashMap<i32, Vec<Incident>> = HashMap::new();
        for incident in open {
            by_camera.entry(incident.camera_id).or_default().push(incident);
        }

        Ok(cameras
            .into_iter()
            .map(|camera| CameraWithIncidents {
                incidents: by_camera.remove(&camera.id).unwrap_or_default(),
                camera,
            })
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cameras")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to count cameras: {}", e)))?;

        Ok(count)
    }
}
