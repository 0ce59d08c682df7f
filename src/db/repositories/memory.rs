//! In-memory store used by the handler tests.
//!
//! Mirrors the constraints the PostgreSQL schema enforces: the camera foreign
//! key and `ts_end >= ts_start`.

use super::{CameraStore, IncidentStore};
use crate::db::models::{
    Camera, CameraSummary, CameraWithIncidents, Incident, IncidentChanges, IncidentFilter,
    IncidentOrder, IncidentStats, IncidentType, IncidentWithCamera, NewCamera, NewIncident,
    PageRequest,
};
use crate::error::Error;
use crate::validation::TS_ORDER_MESSAGE;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    cameras: Vec<Camera>,
    incidents: Vec<Incident>,
    next_camera_id: i32,
    next_incident_id: i32,
}

impl Tables {
    fn camera(&self, id: i32) -> Option<&Camera> {
        self.cameras.iter().find(|c| c.id == id)
    }

    fn join(&self, incident: &Incident) -> Result<IncidentWithCamera> {
        let camera = self
            .camera(incident.camera_id)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("Dangling camera {}", incident.camera_id)))?;
        Ok(IncidentWithCamera {
            incident: incident.clone(),
            camera: CameraSummary::from(camera),
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored incident, for assertions
    pub async fn incidents(&self) -> Vec<Incident> {
        self.tables.read().await.incidents.clone()
    }
}

#[async_trait]
impl CameraStore for MemoryStore {
    async fn create(&self, camera: &NewCamera) -> Result<Camera> {
        let mut tables = self.tables.write().await;
        tables.next_camera_id += 1;
        let camera = Camera {
            id: tables.next_camera_id,
            name: camera.name.clone(),
            location: camera.location.clone(),
        };
        tables.cameras.push(camera.clone());
        Ok(camera)
    }

    async fn get_all(&self) -> Result<Vec<Camera>> {
        Ok(self.tables.read().await.cameras.clone())
    }

    async fn get_all_with_open_incidents(&self) -> Result<Vec<CameraWithIncidents>> {
        let tables = self.tables.read().await;
        Ok(tables
            .cameras
            .iter()
            .map(|camera| {
                let mut incidents: Vec<Incident> = tables
                    .incidents
                    .iter()
                    .filter(|i| i.camera_id == camera.id && !i.resolved)
                    .cloned()
                    .collect();
                IncidentOrder::RecentFirst.sort(&mut incidents);
                CameraWithIncidents {
                    camera: camera.clone(),
                    incidents,
                }
            })
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.tables.read().await.cameras.len() as i64)
    }
}

#[async_trait]
impl IncidentStore for MemoryStore {
    async fn create(&self, incident: &NewIncident) -> Result<IncidentWithCamera> {
        let mut tables = self.tables.write().await;
        if tables.camera(incident.camera_id).is_none() {
            return Err(Error::NotFound(format!("Camera not found: {}", incident.camera_id)).into());
        }
        if incident.ts_end < incident.ts_start {
            return Err(Error::invalid(TS_ORDER_MESSAGE).into());
        }
        tables.next_incident_id += 1;
        let record = Incident {
            id: tables.next_incident_id,
            camera_id: incident.camera_id,
            incident_type: incident.incident_type,
            ts_start: incident.ts_start,
            ts_end: incident.ts_end,
            thumbnail_url: incident.thumbnail_url.clone(),
            resolved: incident.resolved,
        };
        tables.incidents.push(record.clone());
        tables.join(&record)
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<IncidentWithCamera>> {
        let tables = self.tables.read().await;
        tables
            .incidents
            .iter()
            .find(|i| i.id == id)
            .map(|i| tables.join(i))
            .transpose()
    }

    async fn search(
        &self,
        filter: &IncidentFilter,
        order: IncidentOrder,
        page: &PageRequest,
    ) -> Result<(Vec<IncidentWithCamera>, i64)> {
        let tables = self.tables.read().await;
        let mut matching: Vec<Incident> = tables
            .incidents
            .iter()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        order.sort(&mut matching);
        let total = matching.len() as i64;
        let rows = matching
            .iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .map(|i| tables.join(i))
            .collect::<Result<Vec<_>>>()?;
        Ok((rows, total))
    }

    async fn update(
        &self,
        id: i32,
        changes: &IncidentChanges,
    ) -> Result<Option<IncidentWithCamera>> {
        let mut tables = self.tables.write().await;
        let Some(position) = tables.incidents.iter().position(|i| i.id == id) else {
            return Ok(None);
        };
        if let Some(camera_id) = changes.camera_id {
            if tables.camera(camera_id).is_none() {
                return Err(Error::NotFound(format!("Camera not found: {}", camera_id)).into());
            }
        }
        let mut updated = tables.incidents[position].clone();
        changes.apply_to(&mut updated);
        if updated.ts_end < updated.ts_start {
            return Err(Error::invalid(TS_ORDER_MESSAGE).into());
        }
        tables.incidents[position] = updated.clone();
        tables.join(&updated).map(Some)
    }

    async fn resolve(&self, id: i32) -> Result<Option<IncidentWithCamera>> {
        let mut tables = self.tables.write().await;
        let Some(incident) = tables.incidents.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        incident.resolved = true;
        let incident = incident.clone();
        tables.join(&incident).map(Some)
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.incidents.len();
        tables.incidents.retain(|i| i.id != id);
        Ok(tables.incidents.len() < before)
    }

    async fn stats(&self) -> Result<IncidentStats> {
        let tables = self.tables.read().await;
        let mut incidents_by_type: BTreeMap<IncidentType, i64> =
            IncidentType::ALL.into_iter().map(|t| (t, 0)).collect();
        for incident in &tables.incidents {
            *incidents_by_type.entry(incident.incident_type).or_default() += 1;
        }
        Ok(IncidentStats {
            total_cameras: tables.cameras.len() as i64,
            total_incidents: tables.incidents.len() as i64,
            unresolved_incidents: tables.incidents.iter().filter(|i| !i.resolved).count() as i64,
            incidents_by_type,
            last_updated: Utc::now(),
        })
    }
}
