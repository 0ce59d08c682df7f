pub mod camera_models;
pub mod incident_models;

pub use camera_models::{Camera, CameraSummary, CameraWithIncidents, NewCamera};
pub use incident_models::{
    Incident, IncidentChanges, IncidentFilter, IncidentOrder, IncidentPage, IncidentRow,
    IncidentStats, IncidentType, IncidentWithCamera, NewIncident, PageRequest, Pagination,
    DEFAULT_THUMBNAIL_URL,
};
