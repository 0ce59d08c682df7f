use crate::api::rest::incident_controller::parse_body;
use crate::api::rest::{ApiResult, AppState};
use crate::db::models::{Camera, CameraWithIncidents};
use crate::error::Error;
use crate::security::auth::CurrentUser;
use crate::validation::{validate_new_camera, Sanitize};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use log::info;
use serde::Serialize;
use std::collections::HashMap;

/// Camera list, optionally joined with open incidents
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CameraListing {
    Plain(Vec<Camera>),
    WithIncidents(Vec<CameraWithIncidents>),
}

/// Create camera controller router
pub fn create_router() -> Router<AppState> {
    Router::new().route("/api/cameras", get(list_cameras).post(create_camera))
}

/// List cameras; `?include=incidents` attaches each camera's unresolved incidents
pub async fn list_cameras(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<CameraListing>> {
    let listing = match params.get("include").map(|v| v.trim()) {
        None | Some("") => CameraListing::Plain(state.cameras.get_all().await?),
        Some("incidents") => {
            CameraListing::WithIncidents(state.cameras.get_all_with_open_incidents().await?)
        }
        Some(_) => {
            return Err(Error::invalid("\"include\" must be one of [incidents]").into());
        }
    };

    Ok(Json(listing))
}

/// Register a camera
pub async fn create_camera(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Camera>)> {
    let camera = validate_new_camera(&parse_body(&body)?)?.sanitize();

    let created = state.cameras.create(&camera).await?;

    info!(
        "Camera {} ({}) added by {}",
        created.id, created.name, caller.name
    );

    Ok((StatusCode::CREATED, Json(created)))
}
