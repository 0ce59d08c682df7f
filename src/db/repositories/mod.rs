use crate::db::models::{
    Camera, CameraWithIncidents, IncidentChanges, IncidentFilter, IncidentOrder,
    IncidentStats, IncidentWithCamera, NewCamera, NewIncident, PageRequest,
};
use anyhow::Result;
use async_trait::async_trait;

pub mod cameras;
pub mod incidents;
#[cfg(test)]
pub mod memory;

/// Camera persistence
#[async_trait]
pub trait CameraStore: Send + Sync {
    /// Insert a camera and return it with its assigned id
    async fn create(&self, camera: &NewCamera) -> Result<Camera>;

    /// All cameras in identifier order
    async fn get_all(&self) -> Result<Vec<Camera>>;

    /// All cameras, each with its unresolved incidents most recent first
    async fn get_all_with_open_incidents(&self) -> Result<Vec<CameraWithIncidents>>;

    async fn count(&self) -> Result<i64>;
}

/// Incident persistence
///
/// Every read returns the incident joined with its camera.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Insert an incident. Fails with `Error::NotFound` when the camera does not exist.
    async fn create(&self, incident: &NewIncident) -> Result<IncidentWithCamera>;

    async fn get_by_id(&self, id: i32) -> Result<Option<IncidentWithCamera>>;

    /// One page of the filtered set plus the size of the whole filtered set
    async fn search(
        &self,
        filter: &IncidentFilter,
        order: IncidentOrder,
        page: &PageRequest,
    ) -> Result<(Vec<IncidentWithCamera>, i64)>;

    /// Apply a partial update. `Ok(None)` when the incident does not exist.
    async fn update(
        &self,
        id: i32,
        changes: &IncidentChanges,
    ) -> Result<Option<IncidentWithCamera>>;

    /// Set `resolved` to true. `Ok(None)` when the incident does not exist.
    async fn resolve(&self, id: i32) -> Result<Option<IncidentWithCamera>>;

    /// `Ok(false)` when nothing was deleted
    async fn delete(&self, id: i32) -> Result<bool>;

    async fn stats(&self) -> Result<IncidentStats>;
}
