use super::IncidentStore;
use crate::db::models::{
    IncidentChanges, IncidentFilter, IncidentOrder, IncidentRow, IncidentStats, IncidentType,
    IncidentWithCamera, NewIncident, PageRequest,
};
use crate::error::Error;
use crate::validation::TS_ORDER_MESSAGE;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Columns of the incident/camera join, with the incident aliased `i` and camera `c`
const INCIDENT_COLUMNS: &str = r#"
    i.id, i.camera_id, i.incident_type, i.ts_start, i.ts_end, i.thumbnail_url, i.resolved,
    c.name AS camera_name, c.location AS camera_location
"#;

const FILTER_CLAUSE: &str = r#"
    ($1::BOOLEAN IS NULL OR i.resolved = $1)
    AND ($2::INTEGER IS NULL OR i.camera_id = $2)
"#;

/// Incidents repository backed by PostgreSQL
#[derive(Clone)]
pub struct IncidentsRepository {
    pool: Arc<PgPool>,
}

impl IncidentsRepository {
    /// Create a new incidents repository
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

/// Translate constraint violations into domain errors
fn write_error(e: sqlx::Error, camera_id: Option<i32>, action: &str) -> Error {
    if let sqlx::Error::Database(db_err) = &e {
        match db_err.code().as_deref() {
            // foreign_key_violation
            Some("23503") => {
                return Error::NotFound(match camera_id {
                    Some(id) => format!("Camera not found: {}", id),
                    None => "Camera not found".to_string(),
                })
            }
            // check_violation
            Some("23514") => return Error::invalid(TS_ORDER_MESSAGE),
            _ => {}
        }
    }
    Error::Database(format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl IncidentStore for IncidentsRepository {
    async fn create(&self, incident: &NewIncident) -> Result<IncidentWithCamera> {
        info!(
            "Creating {} incident for camera {}",
            incident.incident_type, incident.camera_id
        );

        let sql = format!(
            r#"
            WITH i AS (
                INSERT INTO incidents (camera_id, incident_type, ts_start, ts_end, thumbnail_url, resolved)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            )
            SELECT {INCIDENT_COLUMNS}
            FROM i
            JOIN cameras c ON c.id = i.camera_id
            "#
        );

        let row = sqlx::query_as::<_, IncidentRow>(&sql)
            .bind(incident.camera_id)
            .bind(incident.incident_type)
            .bind(incident.ts_start)
            .bind(incident.ts_end)
            .bind(&incident.thumbnail_url)
            .bind(incident.resolved)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| write_error(e, Some(incident.camera_id), "create incident"))?;

        Ok(row.into())
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<IncidentWithCamera>> {
        let sql = format!(
            r#"
            SELECT {INCIDENT_COLUMNS}
            FROM incidents i
            JOIN cameras c ON c.id = i.camera_id
            WHERE i.id = $1
            "#
        );

        let row = sqlx::query_as::<_, IncidentRow>(&sql)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to get incident by ID: {}", e)))?;

        Ok(row.map(IncidentWithCamera::from))
    }

    async fn search(
        &self,
        filter: &IncidentFilter,
        order: IncidentOrder,
        page: &PageRequest,
    ) -> Result<(Vec<IncidentWithCamera>, i64)> {
        let count_sql = format!("SELECT COUNT(*) FROM incidents i WHERE {FILTER_CLAUSE}");

        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.resolved)
            .bind(filter.camera_id)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to count incidents: {}", e)))?;

        let page_sql = format!(
            r#"
            SELECT {INCIDENT_COLUMNS}
            FROM incidents i
            JOIN cameras c ON c.id = i.camera_id
            WHERE {FILTER_CLAUSE}
            ORDER BY {}
            LIMIT $3 OFFSET $4
            "#,
            order.sql()
        );

        let rows = sqlx::query_as::<_, IncidentRow>(&page_sql)
            .bind(filter.resolved)
            .bind(filter.camera_id)
            .bind(i64::from(page.limit))
            .bind(page.offset())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to search incidents: {}", e)))?;

        debug!(
            "Incident search {:?} page {} returned {} of {}",
            filter,
            page.page,
            rows.len(),
            total
        );

        Ok((rows.into_iter().map(IncidentWithCamera::from).collect(), total))
    }

    async fn update(
        &self,
        id: i32,
        changes: &IncidentChanges,
    ) -> Result<Option<IncidentWithCamera>> {
        let sql = format!(
            r#"
            WITH i AS (
                UPDATE incidents
                SET camera_id = COALESCE($2, camera_id),
                    incident_type = COALESCE($3, incident_type),
                    ts_start = COALESCE($4, ts_start),
                    ts_end = COALESCE($5, ts_end),
                    thumbnail_url = COALESCE($6, thumbnail_url),
                    resolved = COALESCE($7, resolved)
                WHERE id = $1
                RETURNING *
            )
            SELECT {INCIDENT_COLUMNS}
            FROM i
            JOIN cameras c ON c.id = i.camera_id
            "#
        );

        let row = sqlx::query_as::<_, IncidentRow>(&sql)
            .bind(id)
            .bind(changes.camera_id)
            .bind(changes.incident_type)
            .bind(changes.ts_start)
            .bind(changes.ts_end)
            .bind(&changes.thumbnail_url)
            .bind(changes.resolved)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| write_error(e, changes.camera_id, "update incident"))?;

        Ok(row.map(IncidentWithCamera::from))
    }

    async fn resolve(&self, id: i32) -> Result<Option<IncidentWithCamera>> {
        let sql = format!(
            r#"
            WITH i AS (
                UPDATE incidents
                SET resolved = TRUE
                WHERE id = $1
                RETURNING *
            )
            SELECT {INCIDENT_COLUMNS}
            FROM i
            JOIN cameras c ON c.id = i.camera_id
            "#
        );

        let row = sqlx::query_as::<_, IncidentRow>(&sql)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to resolve incident: {}", e)))?;

        if row.is_some() {
            info!("Incident {} resolved", id);
        }

        Ok(row.map(IncidentWithCamera::from))
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM incidents
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to delete incident: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self) -> Result<IncidentStats> {
        let (total_cameras, total_incidents, unresolved_incidents): (i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM cameras),
                    COUNT(*),
                    COUNT(*) FILTER (WHERE NOT resolved)
                FROM incidents
                "#,
            )
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to count incidents: {}", e)))?;

        let by_type: Vec<(IncidentType, i64)> = sqlx::query_as(
            r#"
            SELECT incident_type, COUNT(*)
            FROM incidents
            GROUP BY incident_type
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to count incidents by type: {}", e)))?;

        let mut incidents_by_type: BTreeMap<IncidentType, i64> =
            IncidentType::ALL.into_iter().map(|t| (t, 0)).collect();
        incidents_by_type.extend(by_type);

        Ok(IncidentStats {
            total_cameras,
            total_incidents,
            unresolved_incidents,
            incidents_by_type,
            last_updated: Utc::now(),
        })
    }
}
