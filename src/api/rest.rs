use crate::config::{ApiConfig, PaginationConfig};
use crate::db::repositories::cameras::CamerasRepository;
use crate::db::repositories::incidents::IncidentsRepository;
use crate::db::repositories::{CameraStore, IncidentStore};
use crate::db::DatabaseService;
use crate::error::Error;
use crate::security::SecurityService;
use anyhow::Result;
use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::{error, info};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod camera_controller;
pub mod incident_controller;

/// Shared application state
///
/// Store handles are built once at startup and handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub cameras: Arc<dyn CameraStore>,
    pub incidents: Arc<dyn IncidentStore>,
    pub security: Arc<SecurityService>,
    pub pagination: PaginationConfig,
    pub database: Option<DatabaseService>,
}

impl AppState {
    /// State backed by the PostgreSQL repositories
    pub fn new(
        database: DatabaseService,
        security: Arc<SecurityService>,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            cameras: Arc::new(CamerasRepository::new(Arc::clone(&database.pool))),
            incidents: Arc::new(IncidentsRepository::new(Arc::clone(&database.pool))),
            security,
            pagination,
            database: Some(database),
        }
    }
}

impl FromRef<AppState> for Arc<SecurityService> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.security)
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    #[serde(skip)]
    pub status: u16,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            details: None,
            status: status.as_u16(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(details) => ApiError {
                details: Some(details),
                ..ApiError::new(StatusCode::BAD_REQUEST, "Validation failed")
            },
            Error::BadRequest(message) => ApiError::new(StatusCode::BAD_REQUEST, message),
            Error::Unauthorized(_) => ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized"),
            Error::NotFound(message) => ApiError::new(StatusCode::NOT_FOUND, message),
            failure @ (Error::Database(_) | Error::Config(_) | Error::Internal(_)) => {
                // Cause stays in the log, the caller gets a generic failure
                error!("Request failed: {}", failure);
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(err) = err.downcast_ref::<Error>() {
            return err.clone().into();
        }

        error!("Request failed: {:#}", err);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match &state.database {
        Some(db) => db.health_check().await,
        None => false,
    };

    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
    })
}

/// Build the API router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_credentials(false)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/api/health", get(health))
        .merge(incident_controller::create_router())
        .merge(camera_controller::create_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub struct RestApi {
    config: ApiConfig,
    state: AppState,
}

impl RestApi {
    pub fn new(config: &ApiConfig, state: AppState) -> Self {
        Self {
            config: config.clone(),
            state,
        }
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let app = router(self.state);

        let addr: SocketAddr = format!("{}:{}", self.config.address, self.config.port).parse()?;
        info!("API server listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;

        axum::Server::from_tcp(listener.into_std()?)?
            .serve(app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}
