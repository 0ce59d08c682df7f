use super::incident_models::Incident;
use serde::{Deserialize, Serialize};

/// Camera model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Camera {
    pub id: i32,
    pub name: String,
    pub location: String,
}

/// Camera fields embedded in every incident the API returns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSummary {
    pub id: i32,
    pub name: String,
    pub location: String,
}

impl From<Camera> for CameraSummary {
    fn from(camera: Camera) -> Self {
        Self {
            id: camera.id,
            name: camera.name,
            location: camera.location,
        }
    }
}

/// Validated payload for a new camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCamera {
    pub name: String,
    pub location: String,
}

/// Camera joined with its open incidents, most recent first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraWithIncidents {
    #[serde(flatten)]
    pub camera: Camera,
    pub incidents: Vec<Incident>,
}
