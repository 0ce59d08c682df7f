use crate::api::rest::{ApiResult, AppState};
use crate::db::models::{IncidentPage, IncidentStats, IncidentWithCamera};
use crate::error::Error;
use crate::security::auth::CurrentUser;
use crate::validation::{
    parse_id, validate_incident_patch, validate_incident_query, validate_new_incident, Sanitize,
};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Response for a deleted incident
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// Create incident controller router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/incidents", get(list_incidents).post(create_incident))
        .route(
            "/api/incidents/:id",
            get(get_incident)
                .patch(update_incident)
                .delete(delete_incident),
        )
        .route("/api/incidents/:id/resolve", post(resolve_incident))
        .route("/api/stats", get(get_stats))
}

/// Decode a request body as JSON without committing to a shape yet
pub(crate) fn parse_body(body: &Bytes) -> Result<Value, Error> {
    serde_json::from_slice(body).map_err(|e| {
        debug!("Unparseable request body: {}", e);
        Error::invalid("Request body must be valid JSON")
    })
}

/// List incidents, filtered and paginated
pub async fn list_incidents(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<IncidentPage>> {
    let query = validate_incident_query(&params, &state.pagination)?;

    let (incidents, total) = state
        .incidents
        .search(&query.filter, query.order, &query.page)
        .await?;

    Ok(Json(IncidentPage {
        incidents,
        pagination: query.page.pagination(total),
    }))
}

/// Create an incident
pub async fn create_incident(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<IncidentWithCamera>)> {
    let incident = validate_new_incident(&parse_body(&body)?)?.sanitize();

    let created = state.incidents.create(&incident).await?;

    info!(
        "Incident {} ({}) recorded on camera {} by {}",
        created.incident.id, created.incident.incident_type, created.camera.id, caller.name
    );

    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a single incident
pub async fn get_incident(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<IncidentWithCamera>> {
    let id = parse_id(&id)?;

    let incident = state
        .incidents
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Incident not found".to_string()))?;

    Ok(Json(incident))
}

/// Partially update an incident
pub async fn update_incident(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<IncidentWithCamera>> {
    let id = parse_id(&id)?;
    let changes = validate_incident_patch(&parse_body(&body)?)?.sanitize();

    let updated = if changes.is_empty() {
        state.incidents.get_by_id(id).await?
    } else {
        state.incidents.update(id, &changes).await?
    };
    let updated = updated.ok_or_else(|| Error::NotFound("Incident not found".to_string()))?;

    info!("Incident {} updated by {}", id, caller.name);

    Ok(Json(updated))
}

/// Mark an incident resolved; resolving twice is not an error
pub async fn resolve_incident(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<IncidentWithCamera>> {
    let id = parse_id(&id)?;

    let resolved = state
        .incidents
        .resolve(id)
        .await?
        .ok_or_else(|| Error::NotFound("Incident not found".to_string()))?;

    info!("Incident {} resolved by {}", id, caller.name);

    Ok(Json(resolved))
}

/// Delete an incident
pub async fn delete_incident(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let id = parse_id(&id)?;

    if !state.incidents.delete(id).await? {
        return Err(Error::NotFound("Incident not found".to_string()).into());
    }

    info!("Incident {} deleted by {}", id, caller.name);

    Ok(Json(DeleteResponse {
        message: "Incident deleted successfully".to_string(),
    }))
}

/// Dashboard counters
pub async fn get_stats(
    State(state): State<AppState>,
    _caller: CurrentUser,
) -> ApiResult<Json<IncidentStats>> {
    Ok(Json(state.incidents.stats().await?))
}
